//! The module for the main app state and logic.

use log::{debug, info, warn};
use keypass_gpio::{GpioOutput, GpioResult};
use keypass_gpio::delay::Delay;
use keypass_gpio::keypad::Keypad;
use crate::config::Config;

/// The outcome of one password attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    Granted,
    Denied,
}

/// The main app state struct.
pub struct App<'a, P> {
    /// The configuration for the app.
    config: Config,
    /// The keypad passwords are typed on.
    keypad: &'a mut P,
    /// The LED used to show the verdict, if one is wired.
    status_led: Option<&'a dyn GpioOutput>,
    /// Paces the status LED blinks.
    delay: &'a mut dyn Delay,
}

impl<'a, P> App<'a, P>
where
    P: Keypad,
    P::Error: std::error::Error + Send + Sync + 'static,
{
    /// Creates a new instance of the App, starting locked.
    pub fn new(
        config: Config,
        keypad: &'a mut P,
        status_led: Option<&'a dyn GpioOutput>,
        delay: &'a mut dyn Delay,
    ) -> App<'a, P> {
        App {
            config,
            keypad,
            status_led,
            delay,
        }
    }

    /// Waits for a full password, checks it and shows the verdict.
    ///
    /// Blocks until as many keys as the configured password has were pressed.
    /// The lock stays locked between attempts, so the verdict is only shown.
    pub fn attempt(&mut self) -> eyre::Result<Verdict> {
        let length = self.config.password.len();
        info!("Locked, waiting for {} keys.", length);

        let input = self.keypad.collect(length)?;
        debug!("Entered {:?}.", input);

        let verdict = if input == self.config.password {
            info!("Unlocked with correct password.");
            Verdict::Granted
        } else {
            warn!("Incorrect password entered.");
            Verdict::Denied
        };

        self.show_verdict(verdict)?;
        Ok(verdict)
    }

    /// Blinks the status LED: one long blink when granted, three short ones when denied.
    fn show_verdict(&mut self, verdict: Verdict) -> GpioResult<()> {
        let Some(led) = self.status_led else {
            return Ok(());
        };

        let period = u32::try_from(self.config.blink_ms).unwrap_or(u32::MAX);
        let (blinks, on_ms) = match verdict {
            Verdict::Granted => (1, period),
            Verdict::Denied => (3, period / 4),
        };

        for _ in 0..blinks {
            led.write(true)?;
            self.delay.delay_ms(on_ms);
            led.write(false)?;
            self.delay.delay_ms(on_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use crate::config::MIN_BLINK_MS;
    use keypass_gpio::keypad::{KeypadKey, MatrixKeypad, MatrixPosition, ScriptedLines};

    #[derive(Debug, Default)]
    struct NoDelay;

    impl Delay for NoDelay {
        fn delay_us(&mut self, _us: u32) {}
    }

    #[derive(Debug, Default)]
    struct RecordingDelay(Vec<u32>);

    impl Delay for RecordingDelay {
        fn delay_us(&mut self, _us: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.0.push(ms);
        }
    }

    #[derive(Debug, Default)]
    struct RecordingLed(RefCell<Vec<bool>>);

    impl GpioOutput for RecordingLed {
        fn write(&self, value: bool) -> GpioResult<()> {
            self.0.borrow_mut().push(value);
            Ok(())
        }
    }

    fn typed(text: &str) -> ScriptedLines {
        let mut lines = ScriptedLines::new();
        for c in text.chars() {
            let pos = MatrixPosition::scan_order()
                .find(|&pos| KeypadKey::from_position(pos).to_char() == c)
                .unwrap();
            lines.hold(&[pos], 6).idle(6);
        }
        lines
    }

    fn config(password: &str) -> Config {
        Config { password: password.chars().collect(), blink_ms: 400 }
    }

    #[test]
    fn correct_password_blinks_once() {
        let mut keypad = MatrixKeypad::new(typed("1234"), NoDelay);
        let led = RecordingLed::default();
        let mut delay = RecordingDelay::default();
        let mut app = App::new(config("1234"), &mut keypad, Some(&led), &mut delay);

        assert_eq!(app.attempt().unwrap(), Verdict::Granted);
        drop(app);

        assert_eq!(*led.0.borrow(), [true, false]);
        assert_eq!(delay.0, [400, 400]);
    }

    #[test]
    fn wrong_password_blinks_three_times() {
        let mut keypad = MatrixKeypad::new(typed("1243"), NoDelay);
        let led = RecordingLed::default();
        let mut delay = RecordingDelay::default();
        let mut app = App::new(config("1234"), &mut keypad, Some(&led), &mut delay);

        assert_eq!(app.attempt().unwrap(), Verdict::Denied);
        drop(app);

        assert_eq!(*led.0.borrow(), [true, false, true, false, true, false]);
        assert_eq!(delay.0, [100; 6]);
    }

    #[test]
    fn shortest_blink_is_still_visible() {
        let mut keypad = MatrixKeypad::new(typed("9"), NoDelay);
        let led = RecordingLed::default();
        let mut delay = RecordingDelay::default();
        let config = Config { password: vec!['1'], blink_ms: MIN_BLINK_MS };
        config.validate().unwrap();
        let mut app = App::new(config, &mut keypad, Some(&led), &mut delay);

        assert_eq!(app.attempt().unwrap(), Verdict::Denied);
        drop(app);

        assert!(delay.0.iter().all(|&ms| ms > 0));
    }

    #[test]
    fn attempts_follow_each_other() {
        let mut keypad = MatrixKeypad::new(typed("0#0#*D"), NoDelay);
        let mut delay = RecordingDelay::default();
        let mut app = App::new(config("0#0"), &mut keypad, None, &mut delay);

        assert_eq!(app.attempt().unwrap(), Verdict::Granted);
        assert_eq!(app.attempt().unwrap(), Verdict::Denied);
        drop(app);

        assert!(delay.0.is_empty());
    }
}
