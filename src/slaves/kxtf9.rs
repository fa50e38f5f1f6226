//! Kionix KXTF9 accelerometer
//!
//! 12-bit output, left-justified: each axis is a low byte (bits 7:4 hold the
//! four least significant bits) followed by a high byte. The cluster unpacks
//! that layout itself, so [`SlaveDriver::read`] returns the registers verbatim.

use embedded_hal::i2c::I2c;

use super::{SlaveConfig, SlaveDriver, SlavePlatformData};
use crate::interface::Bus;

/// Default KXTF9 I2C address
pub const KXTF9_I2C_ADDRESS: u8 = 0x0F;

/// X-axis output low byte, first of six data registers
pub const KXTF9_REG_XOUT_L: u8 = 0x06;

/// Control register 1 (`PC1`, `RES`, `GSEL`)
pub const KXTF9_REG_CTRL_REG1: u8 = 0x1B;

/// Output data rate control
pub const KXTF9_REG_DATA_CTRL: u8 = 0x21;

const CTRL_PC1: u8 = 0x80;
const CTRL_RES: u8 = 0x40;
const CTRL_GSEL_SHIFT: u8 = 3;

/// Number of data bytes returned by a read
pub const KXTF9_DATA_LEN: usize = 6;

/// Full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kxtf9Range {
    /// ±2 g
    G2 = 0,
    /// ±4 g
    G4 = 1,
    /// ±8 g
    G8 = 2,
}

impl Kxtf9Range {
    const fn from_g(g: u8) -> Option<Self> {
        match g {
            2 => Some(Self::G2),
            4 => Some(Self::G4),
            8 => Some(Self::G8),
            _ => None,
        }
    }

    /// Range in g
    #[must_use]
    pub const fn g(self) -> u8 {
        match self {
            Self::G2 => 2,
            Self::G4 => 4,
            Self::G8 => 8,
        }
    }
}

/// KXTF9 driver state
///
/// Settings are cached so they can be reprogrammed on every resume; the part
/// loses nothing across standby, but a board-level power cut would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Kxtf9 {
    range: Kxtf9Range,
    data_ctrl: u8,
    active: bool,
}

impl Kxtf9 {
    /// Configuration key: output data rate code for `DATA_CTRL_REG` (one byte, 0..=7)
    pub const KEY_ODR: u32 = 1;
    /// Configuration key: full-scale range in g (one byte: 2, 4 or 8)
    pub const KEY_RANGE: u32 = 2;

    /// Driver with ±2 g range at the 50 Hz data rate
    #[must_use]
    pub const fn new() -> Self {
        Self {
            range: Kxtf9Range::G2,
            data_ctrl: 0x02,
            active: false,
        }
    }

    /// Currently selected range
    #[must_use]
    pub const fn range(&self) -> Kxtf9Range {
        self.range
    }

    const fn ctrl_reg1(&self, operating: bool) -> u8 {
        let pc1 = if operating { CTRL_PC1 } else { 0 };
        pc1 | CTRL_RES | ((self.range as u8) << CTRL_GSEL_SHIFT)
    }

    /// Settings may only change with `PC1` cleared
    fn program<I2C: I2c>(
        &self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        bus.write(slave.address, KXTF9_REG_CTRL_REG1, self.ctrl_reg1(false))?;
        bus.write(slave.address, KXTF9_REG_DATA_CTRL, self.data_ctrl)?;
        if self.active {
            bus.write(slave.address, KXTF9_REG_CTRL_REG1, self.ctrl_reg1(true))?;
        }
        Ok(())
    }
}

impl Default for Kxtf9 {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaveDriver for Kxtf9 {
    fn name(&self) -> &'static str {
        "kxtf9"
    }

    fn data_register(&self) -> Option<u8> {
        Some(KXTF9_REG_XOUT_L)
    }

    fn suspend<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        bus.write(slave.address, KXTF9_REG_CTRL_REG1, self.ctrl_reg1(false))?;
        self.active = false;
        Ok(())
    }

    fn resume<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        self.active = true;
        if let Err(e) = self.program(bus, slave) {
            self.active = false;
            return Err(e);
        }
        Ok(())
    }

    fn read<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
        data: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        let Some(out) = data.get_mut(..KXTF9_DATA_LEN) else {
            return Ok(0);
        };
        bus.read(slave.address, KXTF9_REG_XOUT_L, out)?;
        Ok(KXTF9_DATA_LEN)
    }

    fn configure<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
        config: &SlaveConfig<'_>,
    ) -> Result<(), I2C::Error> {
        let Some(&value) = config.data.first() else {
            return Ok(());
        };

        match config.key {
            Self::KEY_ODR if value <= 0x07 => self.data_ctrl = value,
            Self::KEY_RANGE => match Kxtf9Range::from_g(value) {
                Some(range) => self.range = range,
                None => return Ok(()),
            },
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("kxtf9: ignoring key {} value {}", config.key, value);
                return Ok(());
            }
        }

        if config.apply {
            self.program(bus, slave)?;
        }
        Ok(())
    }

    fn get_configuration<I2C: I2c>(
        &mut self,
        _bus: &mut Bus<I2C>,
        _slave: &SlavePlatformData,
        key: u32,
        out: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        let value = match key {
            Self::KEY_ODR => self.data_ctrl,
            Self::KEY_RANGE => self.range.g(),
            _ => return Ok(0),
        };
        match out.first_mut() {
            Some(slot) => {
                *slot = value;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
