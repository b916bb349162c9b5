pub mod debounce;
pub mod delay;
pub mod keypad;
pub mod raw;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Gets the GPIO pin bus at the specific indices.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the bias of the GPIO pin.
///
/// Keypad rows need [GpioBias::PullUp], so that an open switch reads high
/// and a closed one is pulled low through the driven column.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBus<const N: usize>: Debug {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;

    fn supports_bias(&self) -> bool {
        false
    }
    /// Sets the bias of every pin in the bus.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the bus does not support bias.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    /// Reads the electrical levels of the pins in the bus, in bus order.
    fn read(&self) -> GpioResult<[bool; N]>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    /// Drives every pin in the bus to the given level, in bus order.
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}
