use crate::keypad::COLS;

/// Finds cells whose debounced state changed since the previous scan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EdgeDetector {
    previous: [u8; COLS],
}

impl EdgeDetector {
    pub const fn new() -> Self {
        EdgeDetector { previous: [0; COLS] }
    }

    /// The debounced state seen on the last [EdgeDetector::detect] call.
    pub fn previous(&self) -> &[u8; COLS] {
        &self.previous
    }

    /// Returns the per-column changed mask (`current ^ previous`) and
    /// remembers `current` for the next call.
    ///
    /// A changed bit that is also set in `current` is a press,
    /// one that is clear in `current` is a release.
    pub fn detect(&mut self, current: [u8; COLS]) -> [u8; COLS] {
        let mut changed = [0; COLS];
        for col in 0..COLS {
            changed[col] = current[col] ^ self.previous[col];
        }
        self.previous = current;
        changed
    }
}
