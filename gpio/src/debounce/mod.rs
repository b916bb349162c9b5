//! Debouncing of raw switch readings.

mod consensus;

pub use consensus::*;
