//! Blocking delays.
//!
//! Everything that waits (column settle time, poll pacing, LED blinks) goes
//! through [Delay], so tests can swap in a delay that only records.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

/// A blocking delay provider.
pub trait Delay: Debug {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// [Delay] backed by [thread::sleep].
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
