use std::fmt::{Debug, Formatter};
use log::debug;
use crate::debounce::DEFAULT_DEBOUNCE_DEPTH;
use crate::delay::Delay;
use crate::keypad::{Keypad, KeypadKey, KeypadState, MatrixLines, MatrixScanner, ScanReport};

/// Pause between two scan iterations while waiting for keys, in ms.
///
/// Together with the debounce depth this sets how long a key must be held:
/// `POLL_INTERVAL_MS * K`, about 100 ms with the defaults.
pub const POLL_INTERVAL_MS: u32 = 20;

/// A debounced matrix keypad that turns keypresses into characters.
pub struct MatrixKeypad<L, D, const K: usize = DEFAULT_DEBOUNCE_DEPTH> {
    scanner: MatrixScanner<L>,
    delay: D,
    state: KeypadState<K>,
}

impl<L: MatrixLines, D: Delay> MatrixKeypad<L, D> {
    /// Creates a keypad with the default debounce depth.
    pub fn new(lines: L, delay: D) -> Self {
        Self::with_depth(lines, delay)
    }
}

impl<L: MatrixLines, D: Delay, const K: usize> MatrixKeypad<L, D, K> {
    /// Creates a keypad that debounces over `K` scans.
    pub fn with_depth(lines: L, delay: D) -> Self {
        MatrixKeypad {
            scanner: MatrixScanner::new(lines),
            delay,
            state: KeypadState::new(),
        }
    }

    pub fn lines(&self) -> &L {
        self.scanner.lines()
    }

    pub fn state(&self) -> &KeypadState<K> {
        &self.state
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Scans the matrix once without interpreting the result.
    pub fn scan(&mut self) -> Result<ScanReport, L::Error> {
        self.scanner.scan(&mut self.delay, &mut self.state)
    }
}

impl<L: Debug, D: Debug, const K: usize> Debug for MatrixKeypad<L, D, K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatrixKeypad<{}>({:?}, {:?})", K, self.scanner, self.delay)
    }
}

impl<L: MatrixLines, D: Delay, const K: usize> Keypad for MatrixKeypad<L, D, K> {
    type Error = L::Error;

    fn poll(&mut self) -> Result<Option<KeypadKey>, L::Error> {
        let report = self.scan()?;
        // Only the first press counts. Any other edge from this scan is
        // already stored as the previous state and will not fire again.
        let Some(pos) = report.first_press() else {
            return Ok(None);
        };

        let key = KeypadKey::from_position(pos);
        debug!("Key pressed at row {}, col {}.", pos.row(), pos.col());
        Ok(Some(key))
    }

    fn collect(&mut self, count: usize) -> Result<Vec<char>, L::Error> {
        let mut captured = Vec::with_capacity(count);

        while captured.len() < count {
            if let Some(key) = self.poll()? {
                captured.push(key.to_char());
                debug!("Captured {}/{} keys.", captured.len(), count);
                if captured.len() == count {
                    break;
                }
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }

        Ok(captured)
    }
}
