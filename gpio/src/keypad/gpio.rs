use std::fmt::{Debug, Formatter};
use log::debug;
use crate::{GpioBusInput, GpioBusOutput, GpioError, GpioResult};
use crate::keypad::{MatrixLines, COLS, ROWS};

/// Keypad matrix lines backed by two GPIO buses.
///
/// Bus pin `i` of `cols` is column `i`, bus pin `i` of `rows` is row `i`.
/// The row bus should be an input with pull-ups enabled.
pub struct GpioMatrixLines<'a> {
    cols: &'a dyn GpioBusOutput<COLS>,
    rows: &'a dyn GpioBusInput<ROWS>,
    levels: [bool; COLS],
}

impl Debug for GpioMatrixLines<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioMatrixLines({:?}, {:?})", self.cols, self.rows)
    }
}

impl<'a> GpioMatrixLines<'a> {
    /// Creates the matrix lines and drives every column high.
    pub fn new(cols: &'a dyn GpioBusOutput<COLS>, rows: &'a dyn GpioBusInput<ROWS>) -> GpioResult<Self> {
        let levels = [true; COLS];
        cols.write(&levels)?;
        debug!("Keypad columns {:?} idle high.", cols);
        Ok(GpioMatrixLines { cols, rows, levels })
    }
}

impl MatrixLines for GpioMatrixLines<'_> {
    type Error = GpioError;

    fn drive_column(&mut self, col: usize, high: bool) -> GpioResult<()> {
        if col >= COLS {
            return Err(GpioError::InvalidArgument);
        }
        self.levels[col] = high;
        self.cols.write(&self.levels)
    }

    fn read_rows(&mut self) -> GpioResult<[bool; ROWS]> {
        self.rows.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct RecordingBus {
        writes: RefCell<Vec<[bool; COLS]>>,
    }

    impl GpioBusOutput<COLS> for RecordingBus {
        fn write(&self, values: &[bool; COLS]) -> GpioResult<()> {
            self.writes.borrow_mut().push(*values);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FixedRows([bool; ROWS]);

    impl GpioBusInput<ROWS> for FixedRows {
        fn read(&self) -> GpioResult<[bool; ROWS]> {
            Ok(self.0)
        }
    }

    #[test]
    fn drives_one_column_at_a_time() {
        let cols = RecordingBus::default();
        let rows = FixedRows([true, false, true, true]);
        let mut lines = GpioMatrixLines::new(&cols, &rows).unwrap();

        lines.drive_column(2, false).unwrap();
        assert_eq!(lines.read_rows().unwrap(), [true, false, true, true]);
        lines.drive_column(2, true).unwrap();

        assert_eq!(*cols.writes.borrow(), [
            [true, true, true, true],
            [true, true, false, true],
            [true, true, true, true],
        ]);
    }

    #[test]
    fn rejects_unknown_column() {
        let cols = RecordingBus::default();
        let rows = FixedRows([true; ROWS]);
        let mut lines = GpioMatrixLines::new(&cols, &rows).unwrap();
        assert_eq!(lines.drive_column(COLS, false), Err(GpioError::InvalidArgument));
    }
}
