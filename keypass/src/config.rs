use std::env::var_os;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use log::warn;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use keypass_gpio::keypad::KeypadKey;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password character {0:?} is not on the keypad")]
    NotOnKeypad(char),
    #[error("blink_ms must be at least {}", MIN_BLINK_MS)]
    BlinkTooShort,
}

/// Shortest usable LED period. A denied verdict blinks at a quarter of it.
pub const MIN_BLINK_MS: u64 = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The password to unlock with. Its length is how many keys an attempt takes.
    pub password: Vec<char>,
    /// Status LED period in milliseconds.
    pub blink_ms: u64,
}

impl Config {
    /// The config file path, from `CONFIG_FILE` or `config.json`.
    pub fn path() -> PathBuf {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        PathBuf::from(config_str)
    }

    /// Loads the config, or `None` if there is no usable file at `path`.
    pub fn try_load(path: &Path) -> Option<Self> {
        let file = std::fs::File::open(path).ok()?;
        let reader = std::io::BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Checks that the password can actually be typed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        if let Some(&c) = self.password.iter().find(|&&c| KeypadKey::from_char(c).is_none()) {
            return Err(ConfigError::NotOnKeypad(c));
        }
        if self.blink_ms < MIN_BLINK_MS {
            return Err(ConfigError::BlinkTooShort);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            password: vec!['1', '2', '3', '4'],
            blink_ms: 1000,
        }
    }
}
