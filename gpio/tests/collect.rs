//! End-to-end keypress collection against the scripted matrix.
//!
//! These drive the whole pipeline (scanner, debounce, edges, key table)
//! through the public `Keypad` interface.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use keypass_gpio::delay::Delay;
use keypass_gpio::keypad::{
    Keypad, KeypadKey, MatrixKeypad, MatrixLines, MatrixPosition, ScriptedLines, COLS, ROWS,
    SETTLE_TIME_US,
};

/// Everything that happens on the lines or the clock, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Op {
    Drive(usize, bool),
    Read,
    Settle,
    Poll,
}

type Log = Rc<RefCell<Vec<Op>>>;

#[derive(Debug)]
struct TracedLines {
    inner: ScriptedLines,
    log: Log,
}

impl MatrixLines for TracedLines {
    type Error = Infallible;

    fn drive_column(&mut self, col: usize, high: bool) -> Result<(), Infallible> {
        self.log.borrow_mut().push(Op::Drive(col, high));
        self.inner.drive_column(col, high)
    }

    fn read_rows(&mut self) -> Result<[bool; ROWS], Infallible> {
        self.log.borrow_mut().push(Op::Read);
        self.inner.read_rows()
    }
}

#[derive(Debug)]
struct TracedDelay {
    log: Log,
}

impl Delay for TracedDelay {
    fn delay_us(&mut self, us: u32) {
        assert_eq!(us, SETTLE_TIME_US);
        self.log.borrow_mut().push(Op::Settle);
    }

    fn delay_ms(&mut self, _ms: u32) {
        self.log.borrow_mut().push(Op::Poll);
    }
}

#[derive(Debug, Default)]
struct NoDelay;

impl Delay for NoDelay {
    fn delay_us(&mut self, _us: u32) {}
}

fn pos(row: usize, col: usize) -> MatrixPosition {
    MatrixPosition::new(row, col).unwrap()
}

fn collect(lines: ScriptedLines, count: usize) -> Vec<char> {
    let mut keypad = MatrixKeypad::new(lines, NoDelay);
    match keypad.collect(count) {
        Ok(chars) => chars,
        Err(never) => match never {},
    }
}

#[test]
fn press_release_press_same_key() {
    let mut lines = ScriptedLines::new();
    lines.hold(&[pos(0, 0)], 5).idle(5).hold(&[pos(0, 0)], 5);

    assert_eq!(collect(lines, 2), ['1', '1']);
}

#[test]
fn simultaneous_completion_accepts_first_column() {
    let mut lines = ScriptedLines::new();
    // Both keys finish their debounce window on the same scan.
    lines.hold(&[pos(0, 0), pos(1, 1)], 8).idle(5).hold(&[pos(1, 1)], 5);

    let mut keypad = MatrixKeypad::new(lines, NoDelay);
    let first = (0..5).find_map(|_| keypad.poll().unwrap());
    assert_eq!(first, Some(KeypadKey::Key1));
    assert_eq!(keypad.lines().frames_consumed(), 5);

    // '5' was pressed in the same scan and is not reported while held.
    for _ in 0..3 {
        assert_eq!(keypad.poll(), Ok(None));
    }

    // It registers once its own edge shows up again.
    assert_eq!(keypad.collect(1), Ok(vec!['5']));
    assert_eq!(keypad.lines().frames_consumed(), 18);
}

#[test]
fn typing_a_password() {
    let mut lines = ScriptedLines::new();
    for key in [pos(0, 1), pos(3, 1), pos(2, 0), pos(3, 2)] {
        // Bounce a couple of times, then hold, then release.
        lines.hold(&[key], 2).idle(1).hold(&[key], 1).idle(1);
        lines.hold(&[key], 7).idle(6);
    }

    assert_eq!(collect(lines, 4), ['2', '0', '7', '#']);
}

#[test]
fn same_script_same_result() {
    let mut lines = ScriptedLines::new();
    for row in 0..ROWS {
        for col in (0..COLS).rev() {
            lines.hold(&[pos(row, col)], 5).idle(5);
        }
    }

    let first = collect(lines.clone(), 16);
    let second = collect(lines, 16);
    assert_eq!(first, second);
    assert_eq!(first.iter().collect::<String>(), "A321B654C987D#0*");
}

#[test]
fn collects_exactly_count() {
    let mut lines = ScriptedLines::new();
    for _ in 0..6 {
        lines.hold(&[pos(1, 3)], 5).idle(5);
    }

    for count in [1, 3, 6] {
        let chars = collect(lines.clone(), count);
        assert_eq!(chars.len(), count);
        assert!(chars.iter().all(|&c| c == 'B'));
    }
}

#[test]
fn settles_before_every_read_and_restores_columns() {
    let log = Log::default();
    let mut lines = ScriptedLines::new();
    lines.hold(&[pos(2, 3)], 5);
    let traced = TracedLines { inner: lines, log: log.clone() };
    let mut keypad = MatrixKeypad::new(traced, TracedDelay { log: log.clone() });

    assert_eq!(keypad.collect(1), Ok(vec!['C']));

    let ops = log.borrow();
    let scan: Vec<Op> = (0..COLS)
        .flat_map(|col| [Op::Drive(col, false), Op::Settle, Op::Read, Op::Drive(col, true)])
        .collect();
    let mut expected = Vec::new();
    for i in 0..5 {
        if i > 0 {
            expected.push(Op::Poll);
        }
        expected.extend(scan.iter().cloned());
    }
    assert_eq!(*ops, expected);
    assert_eq!(keypad.lines().inner.max_low_columns(), 1);
    assert_eq!(keypad.lines().inner.column_levels(), [true; COLS]);
}

#[test]
fn deeper_filter_waits_longer() {
    let mut lines = ScriptedLines::new();
    lines.hold(&[pos(0, 2)], 8);

    let mut keypad = MatrixKeypad::<_, _, 8>::with_depth(lines, NoDelay);
    let keys: Vec<_> = (0..8).map(|_| keypad.poll().unwrap()).collect();
    assert!(keys[..7].iter().all(Option::is_none));
    assert_eq!(keys[7], Some(KeypadKey::Key3));
}
