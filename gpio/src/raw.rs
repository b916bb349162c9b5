//! Memory-mapped GPIO for BCM2835/6/7 and BCM2711 (Raspberry Pi 1 to 4) chips.
//!
//! Only the pieces the keypad needs: pin function select, output set/clear,
//! level read and pull resistors. The chip is read from the device tree,
//! since the peripheral base and the pull registers differ between them.

use crate::delay::{Delay, StdDelay};
use crate::{GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// Word offsets of the GPIO registers inside the mapped block.
mod reg {
    /// GPFSEL0..5, 3 bits per pin, 10 pins per word.
    pub const FSEL: usize = 0x00 / 4;
    /// GPSET0..1, write 1 to drive high.
    pub const SET: usize = 0x1C / 4;
    /// GPCLR0..1, write 1 to drive low.
    pub const CLR: usize = 0x28 / 4;
    /// GPLEV0..1, current pin levels.
    pub const LEV: usize = 0x34 / 4;
    /// GPPUD, the pull to latch on BCM2835/6/7.
    pub const PUD: usize = 0x94 / 4;
    /// GPPUDCLK0..1, write 1 to latch GPPUD into a pin.
    pub const PUDCLK: usize = 0x98 / 4;
    /// GPIO_PUP_PDN_CNTRL_REG0..3 on BCM2711, 2 bits per pin, 16 pins per word.
    pub const PUP_PDN: usize = 0xE4 / 4;
}

/// Time the GPPUD control signal needs around each clock pulse, in µs.
const PULL_SETUP_US: u32 = 5;

/// The supported Broadcom SoCs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Chip {
    /// Pi 1 and Zero.
    Bcm2835,
    /// Pi 2 and 3 (BCM2836 and BCM2837 share a layout).
    Bcm2837,
    /// Pi 4.
    Bcm2711,
}

impl Chip {
    const COMPATIBLE_PATH: &'static str = "/proc/device-tree/compatible";

    /// Reads the chip from the device tree.
    ///
    /// Fails with [GpioError::NotSupported] on anything else, e.g. the Pi 5.
    pub fn detect() -> GpioResult<Chip> {
        let compatible = std::fs::read(Self::COMPATIBLE_PATH)?;
        Self::from_compatible(&compatible).ok_or(GpioError::NotSupported)
    }

    /// Picks the chip from a NUL-separated device tree `compatible` list.
    fn from_compatible(compatible: &[u8]) -> Option<Chip> {
        compatible
            .split(|&byte| byte == 0)
            .find_map(|entry| match entry {
                b"brcm,bcm2835" => Some(Chip::Bcm2835),
                b"brcm,bcm2836" | b"brcm,bcm2837" => Some(Chip::Bcm2837),
                b"brcm,bcm2711" => Some(Chip::Bcm2711),
                _ => None,
            })
    }

    /// Physical address of the GPIO block, used when mapping `/dev/mem`.
    const fn gpio_base(self) -> u64 {
        match self {
            Chip::Bcm2835 => 0x2020_0000,
            Chip::Bcm2837 => 0x3F20_0000,
            Chip::Bcm2711 => 0xFE20_0000,
        }
    }

    /// The pull field value for `bias`. The two register schemes encode
    /// pull-up and pull-down the other way round.
    const fn pull_bits(self, bias: GpioBias) -> u32 {
        match (self, bias) {
            (_, GpioBias::None) => 0b00,
            (Chip::Bcm2711, GpioBias::PullUp) => 0b01,
            (Chip::Bcm2711, GpioBias::PullDown) => 0b10,
            (_, GpioBias::PullDown) => 0b01,
            (_, GpioBias::PullUp) => 0b10,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum PinFunction {
    Input = 0b000,
    Output = 0b001,
}

pub struct RawGpioDriver {
    chip: Chip,
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const BLOCK_LEN: usize = 4096;
    const PIN_COUNT: usize = 58;

    fn create(chip: Chip, path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(Self::BLOCK_LEN)
            .map_raw(&file)?;

        debug!("Mapped {:?} GPIO registers from {}.", chip, path);

        Ok(RawGpioDriver {
            chip,
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps `/dev/gpiomem`, which exposes only the GPIO block and needs no root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create(Chip::detect()?, "/dev/gpiomem", 0)
    }

    /// Maps the GPIO block through `/dev/mem` at the detected chip's
    /// peripheral address. Needs root.
    pub fn new_mem() -> GpioResult<Self> {
        let chip = Chip::detect()?;
        Self::create(chip, "/dev/mem", chip.gpio_base())
    }

    pub fn chip(&self) -> Chip {
        self.chip
    }

    fn check_pin(pin_index: usize) -> GpioResult<()> {
        if pin_index < Self::PIN_COUNT {
            Ok(())
        } else {
            Err(GpioError::InvalidArgument)
        }
    }

    fn register(&self, word: usize) -> *mut u32 {
        debug_assert!(word * 4 < Self::BLOCK_LEN);
        // SAFETY: every register offset used here lies inside the mapped block.
        unsafe { (self.mmap.as_mut_ptr() as *mut u32).add(word) }
    }

    /// Replaces the `width`-bit field of `pin_index` in a register bank
    /// that packs `per_word` pins into each word.
    fn write_field(&self, bank: usize, pin_index: usize, per_word: usize, width: usize, value: u32) {
        let register = self.register(bank + pin_index / per_word);
        let shift = (pin_index % per_word) * width;
        let mask = ((1 << width) - 1) << shift;

        // SAFETY: volatile access to a mapped peripheral register.
        unsafe {
            let current = register.read_volatile();
            register.write_volatile((current & !mask) | ((value << shift) & mask));
        }
    }

    fn set_function(&self, pin_index: usize, function: PinFunction) -> GpioResult<()> {
        Self::check_pin(pin_index)?;
        self.write_field(reg::FSEL, pin_index, 10, 3, function as u32);
        Ok(())
    }

    fn set_bias(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        Self::check_pin(pin_index)?;
        let value = self.chip.pull_bits(bias);
        match self.chip {
            Chip::Bcm2711 => self.write_field(reg::PUP_PDN, pin_index, 16, 2, value),
            Chip::Bcm2835 | Chip::Bcm2837 => self.clock_in_pull(pin_index, value),
        }
        Ok(())
    }

    /// The BCM2835/6/7 pull sequence: set GPPUD, pulse the pin's GPPUDCLK
    /// bit, then clear both again.
    fn clock_in_pull(&self, pin_index: usize, value: u32) {
        let pud = self.register(reg::PUD);
        let clock = self.register(reg::PUDCLK + pin_index / 32);
        let mut delay = StdDelay;

        // SAFETY: volatile writes to mapped peripheral registers.
        unsafe { pud.write_volatile(value) };
        delay.delay_us(PULL_SETUP_US);
        unsafe { clock.write_volatile(1 << (pin_index % 32)) };
        delay.delay_us(PULL_SETUP_US);
        unsafe {
            pud.write_volatile(0);
            clock.write_volatile(0);
        }
    }

    fn set_level(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check_pin(pin_index)?;
        let bank = if high { reg::SET } else { reg::CLR };
        let register = self.register(bank + pin_index / 32);
        // SAFETY: SET/CLR only act on the bits written as 1.
        unsafe { register.write_volatile(1 << (pin_index % 32)) };
        Ok(())
    }

    fn level(&self, pin_index: usize) -> GpioResult<bool> {
        Self::check_pin(pin_index)?;
        let register = self.register(reg::LEV + pin_index / 32);
        // SAFETY: volatile read of a mapped peripheral register.
        let value = unsafe { register.read_volatile() };
        Ok((value >> (pin_index % 32)) & 1 != 0)
    }

    /// Marks `indices` as taken and resets them to plain inputs.
    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        for (i, &index) in indices.iter().enumerate() {
            Self::check_pin(index)?;
            if self.used_pins[index] || indices[..i].contains(&index) {
                return Err(GpioError::AlreadyInUse);
            }
        }
        for &index in indices {
            self.used_pins.set_aliased(index, true);
            self.set_function(index, PinFunction::Input)?;
            self.set_bias(index, GpioBias::None)?;
        }
        Ok(())
    }

    /// Returns `indices` to input mode and frees them.
    fn release(&self, indices: &[usize]) {
        for &index in indices {
            _ = self.set_function(index, PinFunction::Input);
            self.used_pins.set_aliased(index, false);
        }
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?}, {:?})", self.chip, self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        self.claim(&[index])?;
        Ok(Box::new(RawGpioPin { driver: self, pin_index: index }))
    }

    fn get_pin_bus<const N: usize>(&self, indices: [usize; N]) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        self.claim(&indices)?;
        Ok(Box::new(RawGpioBus { driver: self, pin_indices: indices }))
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.set_function(self.pin_index, PinFunction::Output)?;
        Ok(Box::new(RawGpioOutput { pin: self }))
    }
}

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        self.driver.release(&[self.pin_index]);
    }
}

struct RawGpioOutput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.set_level(self.pin.pin_index, value)
    }
}

struct RawGpioBus<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for RawGpioBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for RawGpioBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.set_function(pin_index, PinFunction::Input)?;
        }
        Ok(Box::new(RawGpioBusInput { bus: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.set_function(pin_index, PinFunction::Output)?;
        }
        Ok(Box::new(RawGpioBusOutput { bus: self }))
    }

    fn supports_bias(&self) -> bool {
        true
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        for &pin_index in &self.pin_indices {
            self.driver.set_bias(pin_index, bias)?;
        }
        Ok(())
    }
}

impl<const N: usize> Drop for RawGpioBus<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.pin_indices);
    }
}

struct RawGpioBusInput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for RawGpioBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let mut values = [false; N];
        for (value, &pin_index) in values.iter_mut().zip(&self.bus.pin_indices) {
            *value = self.bus.driver.level(pin_index)?;
        }
        Ok(values)
    }
}

struct RawGpioBusOutput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for RawGpioBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&value, &pin_index) in values.iter().zip(&self.bus.pin_indices) {
            self.bus.driver.set_level(pin_index, value)?;
        }
        Ok(())
    }
}
