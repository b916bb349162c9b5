mod app;
mod config;
mod utils;

use std::env::var;
use dotenv::dotenv;
use log::{debug, info, warn};
use sysinfo::System;
use keypass_gpio::{GpioBias, GpioDriver};
use keypass_gpio::delay::StdDelay;
use keypass_gpio::keypad::{GpioMatrixLines, MatrixKeypad};
use keypass_gpio::raw::RawGpioDriver;
use crate::app::App;
use crate::config::Config;
use crate::utils::{env_pin, env_pin_bus};

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("KeyPass v.{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Running on {} ({}), host {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
    );

    // Get pin numbers from env
    let keypad_pin_col_nos = env_pin_bus("KEYPASS_KEYPAD_PINS_COLS")?;
    let keypad_pin_row_nos = env_pin_bus("KEYPASS_KEYPAD_PINS_ROWS")?;
    let status_led_pin_no = env_pin("KEYPASS_STATUS_LED_PIN")?;

    info!("Keypad @ Cols: {:?}, Rows: {:?}", keypad_pin_col_nos, keypad_pin_row_nos);
    match status_led_pin_no {
        Some(pin) => info!("Status LED @ {}", pin),
        None => info!("No status LED configured."),
    }

    debug!("Initializing GPIO driver...");
    let gpio = match var("KEYPASS_GPIO_DEVICE").as_deref() {
        Ok("mem") => RawGpioDriver::new_mem()?,
        Ok("gpiomem") | Err(_) => RawGpioDriver::new_gpiomem()?,
        Ok(other) => eyre::bail!("Unknown KEYPASS_GPIO_DEVICE {:?}, expected gpiomem or mem", other),
    };
    info!("Detected {:?} GPIO.", gpio.chip());
    debug!("{:?} initialized with {} pins.", gpio, gpio.count()?);

    debug!("Initializing keypad driver...");
    let mut keypad_col_bus = gpio.get_pin_bus(keypad_pin_col_nos)?;
    let mut keypad_row_bus = gpio.get_pin_bus(keypad_pin_row_nos)?;
    if keypad_row_bus.supports_bias() {
        keypad_row_bus.set_bias(GpioBias::PullUp)?;
    } else {
        warn!("GPIO backend cannot pull up keypad rows, external pull-ups are required.");
    }
    let keypad_col_out = keypad_col_bus.as_output()?;
    let keypad_row_in = keypad_row_bus.as_input()?;

    let keypad_lines = GpioMatrixLines::new(&*keypad_col_out, &*keypad_row_in)?;
    let mut keypad = MatrixKeypad::new(keypad_lines, StdDelay);

    debug!("{:?} initialized.", keypad);

    let mut status_led_pin = status_led_pin_no.map(|pin| gpio.get_pin(pin)).transpose()?;
    let status_led = status_led_pin.as_mut().map(|pin| pin.as_output()).transpose()?;
    if let Some(led) = &status_led {
        led.write(false)?;
        debug!("{:?} initialized.", led);
    }

    debug!("Trying to load config...");
    let config_path = Config::path();
    let config = if let Some(config) = Config::try_load(&config_path) {
        info!("Config loaded from {}.", config_path.display());
        config
    } else if config_path.exists() {
        warn!("Config at {} is unusable. Using default", config_path.display());
        Config::default()
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save(&config_path)?;
        info!("Default config saved.");
        config
    };
    config.validate()?;

    debug!("Password is {:?}.", config.password);

    info!("KeyPass initialized.");

    info!("Starting main loop...");

    let mut delay = StdDelay;
    let mut app = App::new(
        config,
        &mut keypad,
        status_led.as_deref(),
        &mut delay,
    );

    loop {
        app.attempt()?;
    }
}
