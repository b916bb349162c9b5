use crate::keypad::COLS;

/// Number of consecutive samples that must agree before a cell reads as pressed.
pub const DEFAULT_DEBOUNCE_DEPTH: usize = 5;

/// A consensus debounce filter over the whole keypad matrix.
///
/// Keeps the last `K` raw snapshots of every column. A snapshot is a row
/// mask where bit `r` is set if row `r` read as pressed. A cell is
/// debounced as pressed only when all `K` stored snapshots agree, so a
/// single bouncing read can never flip it, while `K` stable reads always do.
///
/// The write slot is shared by all columns and moves once per full matrix
/// scan. Only the scanner writes to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SampleHistory<const K: usize = DEFAULT_DEBOUNCE_DEPTH> {
    slots: [[u8; COLS]; K],
    cursor: usize,
}

impl<const K: usize> SampleHistory<K> {
    const NONZERO_DEPTH: () = assert!(K > 0, "debounce depth must be at least 1");

    /// Creates an empty history. Every slot starts as "not pressed".
    pub const fn new() -> Self {
        let () = Self::NONZERO_DEPTH;
        Self {
            slots: [[0; COLS]; K],
            cursor: 0,
        }
    }

    /// The debounce depth `K`.
    pub const fn depth(&self) -> usize {
        K
    }

    /// The slot the next scan writes to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Stores the row snapshot of `col` into the current slot,
    /// overwriting the oldest sample of that column.
    pub(crate) fn record(&mut self, col: usize, rows: u8) {
        self.slots[self.cursor][col] = rows;
    }

    /// Moves the write slot forward, wrapping after `K` scans.
    pub(crate) fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % K;
    }

    /// The debounced row mask of `col`: bitwise AND of all stored snapshots.
    pub(crate) fn debounced(&self, col: usize) -> u8 {
        self.slots
            .iter()
            .fold(u8::MAX, |acc, slot| acc & slot[col])
    }

    /// [SampleHistory::debounced] for every column.
    pub fn debounced_all(&self) -> [u8; COLS] {
        let mut state = [0; COLS];
        for (col, rows) in state.iter_mut().enumerate() {
            *rows = self.debounced(col);
        }
        state
    }
}

impl<const K: usize> Default for SampleHistory<K> {
    fn default() -> Self {
        Self::new()
    }
}
