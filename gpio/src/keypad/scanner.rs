use log::trace;
use crate::debounce::{SampleHistory, DEFAULT_DEBOUNCE_DEPTH};
use crate::delay::Delay;
use crate::keypad::{EdgeDetector, MatrixLines, MatrixPosition, COLS, ROWS};

/// Time to let a freshly driven column settle before the rows are sampled, in µs.
///
/// Sampling earlier picks up crosstalk from the previous column.
pub const SETTLE_TIME_US: u32 = 10;

/// Everything a keypad needs to remember between scans.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeypadState<const K: usize = DEFAULT_DEBOUNCE_DEPTH> {
    pub history: SampleHistory<K>,
    pub edges: EdgeDetector,
}

impl<const K: usize> KeypadState<K> {
    pub const fn new() -> Self {
        KeypadState {
            history: SampleHistory::new(),
            edges: EdgeDetector::new(),
        }
    }
}

/// The outcome of one full matrix scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScanReport {
    /// Debounced row mask per column, bit `r` set while row `r` is held.
    pub debounced: [u8; COLS],
    /// Rows whose debounced state flipped during this scan, per column.
    pub changed: [u8; COLS],
}

impl ScanReport {
    /// Whether the cell at `pos` is debounced as pressed.
    pub fn is_pressed(&self, pos: MatrixPosition) -> bool {
        self.debounced[pos.col()] & (1 << pos.row()) != 0
    }

    /// Whether the cell at `pos` went from released to pressed in this scan.
    pub fn is_rising(&self, pos: MatrixPosition) -> bool {
        self.changed[pos.col()] & self.debounced[pos.col()] & (1 << pos.row()) != 0
    }

    /// All newly pressed cells, in scan order.
    pub fn rising_edges(&self) -> impl Iterator<Item = MatrixPosition> + '_ {
        MatrixPosition::scan_order().filter(|&pos| self.is_rising(pos))
    }

    /// The first newly pressed cell in scan order.
    pub fn first_press(&self) -> Option<MatrixPosition> {
        self.rising_edges().next()
    }
}

/// Drives the matrix one column at a time and samples its rows.
#[derive(Debug)]
pub struct MatrixScanner<L> {
    lines: L,
}

impl<L: MatrixLines> MatrixScanner<L> {
    /// Wraps `lines`. The column lines should all be high already.
    pub fn new(lines: L) -> Self {
        MatrixScanner { lines }
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn into_lines(self) -> L {
        self.lines
    }

    /// Scans every column once, records the samples into `state` and
    /// returns the debounced state along with what changed.
    ///
    /// Each column is driven low, allowed to settle, sampled, and driven
    /// high again before the next one, so no two columns are ever low
    /// at the same time. A failed read still drives its column high
    /// before the error is returned.
    pub fn scan<D: Delay + ?Sized, const K: usize>(
        &mut self,
        delay: &mut D,
        state: &mut KeypadState<K>,
    ) -> Result<ScanReport, L::Error> {
        for col in 0..COLS {
            self.lines.drive_column(col, false)?;
            delay.delay_us(SETTLE_TIME_US);
            let levels = self.lines.read_rows();
            self.lines.drive_column(col, true)?;
            let levels = levels?;

            state.history.record(col, pressed_mask(&levels));
        }
        state.history.advance();

        let debounced = state.history.debounced_all();
        let changed = state.edges.detect(debounced);
        if changed != [0; COLS] {
            trace!("Matrix changed: debounced {:?}, changed {:?}", debounced, changed);
        }

        Ok(ScanReport { debounced, changed })
    }
}

/// Turns row levels into a pressed mask: a low row is a closed switch.
fn pressed_mask(levels: &[bool; ROWS]) -> u8 {
    levels
        .iter()
        .enumerate()
        .filter(|&(_, &high)| !high)
        .fold(0, |mask, (row, _)| mask | 1 << row)
}
