use std::env::var;
use eyre::WrapErr;

/// Parses a list of 4 pin numbers separated by commas, spaces or semicolons.
pub fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|pins: Vec<usize>| eyre::eyre!("Expected 4 pins, got {}", pins.len()))
}

/// Reads a required pin bus from the environment variable `name`.
pub fn env_pin_bus(name: &str) -> eyre::Result<[usize; 4]> {
    let value = var(name).wrap_err_with(|| format!("{} is not set", name))?;
    parse_pin_bus(&value).wrap_err_with(|| format!("Invalid {}", name))
}

/// Reads an optional pin number from the environment variable `name`.
pub fn env_pin(name: &str) -> eyre::Result<Option<usize>> {
    match var(name) {
        Ok(value) => {
            let pin = value.trim().parse().wrap_err_with(|| format!("Invalid {}", name))?;
            Ok(Some(pin))
        }
        Err(_) => Ok(None),
    }
}
