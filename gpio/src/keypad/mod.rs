//! 4x4 matrix keypad: scanning, debouncing and keypress collection.
//!
//! The pipeline runs in one direction:
//! [MatrixLines] → [MatrixScanner] → [SampleHistory](crate::debounce::SampleHistory)
//! → [EdgeDetector] → [KeypadKey] → [MatrixKeypad].

mod collector;
mod edge;
mod gpio;
mod key;
mod scanner;
#[cfg(any(test, feature = "scripted"))]
mod scripted;

use std::fmt::Debug;
pub use collector::*;
pub use edge::*;
pub use gpio::*;
pub use key::*;
pub use scanner::*;
#[cfg(any(test, feature = "scripted"))]
pub use scripted::*;

/// Number of row lines (inputs).
pub const ROWS: usize = 4;
/// Number of column lines (outputs).
pub const COLS: usize = 4;

/// A single switch in the matrix, identified by its row and column.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MatrixPosition {
    row: u8,
    col: u8,
}

impl MatrixPosition {
    /// Creates a position, or `None` if it is outside the 4x4 matrix.
    pub const fn new(row: usize, col: usize) -> Option<Self> {
        if row < ROWS && col < COLS {
            Some(MatrixPosition { row: row as u8, col: col as u8 })
        } else {
            None
        }
    }

    pub const fn row(self) -> usize {
        self.row as usize
    }

    pub const fn col(self) -> usize {
        self.col as usize
    }

    /// All 16 positions in scan order: columns outer, rows inner.
    pub fn scan_order() -> impl Iterator<Item = MatrixPosition> {
        (0..COLS).flat_map(|col| {
            (0..ROWS).map(move |row| MatrixPosition { row: row as u8, col: col as u8 })
        })
    }
}

/// The hardware lines of a keypad matrix.
///
/// Levels are electrical: `true` is high. Rows are expected to be pulled up,
/// so an open switch reads high and a closed switch in a driven-low column
/// reads low.
///
/// Backends declare their own error type. In-memory backends use
/// [Infallible](std::convert::Infallible), which makes scanning them
/// statically error-free.
pub trait MatrixLines: Debug {
    type Error;

    /// Drives the column line `col` high or low.
    fn drive_column(&mut self, col: usize, high: bool) -> Result<(), Self::Error>;

    /// Reads all row lines in one snapshot.
    fn read_rows(&mut self) -> Result<[bool; ROWS], Self::Error>;
}

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Error;

    /// Runs one scan iteration and returns the key that was just pressed, if any.
    ///
    /// At most one key is reported per call, even if several were pressed
    /// in the same iteration.
    fn poll(&mut self) -> Result<Option<KeypadKey>, Self::Error>;

    /// Blocks until exactly `count` keypresses have been captured and returns
    /// their characters in press order.
    ///
    /// There is no timeout: this only returns early on a backend error.
    fn collect(&mut self, count: usize) -> Result<Vec<char>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_bounds() {
        assert!(MatrixPosition::new(3, 3).is_some());
        assert!(MatrixPosition::new(4, 0).is_none());
        assert!(MatrixPosition::new(0, 4).is_none());
    }

    #[test]
    fn scan_order_is_column_major() {
        let order: Vec<_> = MatrixPosition::scan_order()
            .map(|pos| (pos.row(), pos.col()))
            .collect();
        assert_eq!(order.len(), ROWS * COLS);
        assert_eq!(&order[..5], &[(0, 0), (1, 0), (2, 0), (3, 0), (0, 1)]);
        assert_eq!(order.last(), Some(&(3, 3)));
    }
}
