use std::convert::Infallible;
use crate::keypad::{MatrixLines, MatrixPosition, COLS, ROWS};

/// An in-memory keypad matrix that replays a script of held keys.
///
/// The script is a list of frames, one per matrix scan. A new frame starts
/// every time column 0 is driven low; once the script runs out, every key
/// reads as released.
///
/// Row levels are derived from the column levels the way real wiring
/// behaves: a row reads low if any low column has a held key on that row.
/// Leaving a column low therefore shows up as crosstalk in the next column.
#[derive(Clone, Debug)]
pub struct ScriptedLines {
    frames: Vec<[u8; COLS]>,
    scans: usize,
    columns: [bool; COLS],
    max_low: usize,
}

impl ScriptedLines {
    /// Creates an empty script with every column high.
    pub fn new() -> Self {
        ScriptedLines {
            frames: Vec::new(),
            scans: 0,
            columns: [true; COLS],
            max_low: 0,
        }
    }

    /// Appends `scans` frames in which exactly the keys in `keys` are held.
    pub fn hold(&mut self, keys: &[MatrixPosition], scans: usize) -> &mut Self {
        let mut frame = [0; COLS];
        for key in keys {
            frame[key.col()] |= 1 << key.row();
        }
        self.frames.extend(std::iter::repeat_n(frame, scans));
        self
    }

    /// Appends `scans` frames with no key held.
    pub fn idle(&mut self, scans: usize) -> &mut Self {
        self.hold(&[], scans)
    }

    /// How many scans have started so far.
    pub fn frames_consumed(&self) -> usize {
        self.scans
    }

    /// Whether the scans so far have used up the whole script.
    pub fn is_finished(&self) -> bool {
        self.scans >= self.frames.len()
    }

    /// The current column levels.
    pub fn column_levels(&self) -> [bool; COLS] {
        self.columns
    }

    /// The largest number of columns that were ever low at the same time.
    pub fn max_low_columns(&self) -> usize {
        self.max_low
    }

    fn current_frame(&self) -> [u8; COLS] {
        self.scans
            .checked_sub(1)
            .and_then(|index| self.frames.get(index))
            .copied()
            .unwrap_or([0; COLS])
    }
}

impl Default for ScriptedLines {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixLines for ScriptedLines {
    type Error = Infallible;

    fn drive_column(&mut self, col: usize, high: bool) -> Result<(), Infallible> {
        if col == 0 && !high {
            self.scans += 1;
        }
        self.columns[col] = high;

        let low = self.columns.iter().filter(|&&level| !level).count();
        self.max_low = self.max_low.max(low);
        Ok(())
    }

    fn read_rows(&mut self) -> Result<[bool; ROWS], Infallible> {
        let frame = self.current_frame();
        let mut levels = [true; ROWS];
        for (row, level) in levels.iter_mut().enumerate() {
            let shorted = (0..COLS).any(|col| !self.columns[col] && frame[col] & (1 << row) != 0);
            *level = !shorted;
        }
        Ok(levels)
    }
}
