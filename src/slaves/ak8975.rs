//! AKM AK8975 magnetometer
//!
//! Runs in single-measurement mode: resume starts a conversion and every read
//! returns the previous result and immediately triggers the next one.

use embedded_hal::i2c::I2c;

use super::{SlaveDriver, SlavePlatformData};
use crate::interface::Bus;

/// Default AK8975 I2C address
pub const AK8975_I2C_ADDRESS: u8 = 0x0C;

/// Status 1 register (data ready in bit 0), followed by the six data registers
pub const AK8975_REG_ST1: u8 = 0x02;

/// Mode control register
pub const AK8975_REG_CNTL: u8 = 0x0A;

const MODE_POWER_DOWN: u8 = 0x00;
const MODE_SINGLE: u8 = 0x01;

/// Number of bytes returned by a read: ST1 plus X, Y, Z little-endian
pub const AK8975_DATA_LEN: usize = 7;

/// AK8975 driver (stateless)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ak8975;

impl Ak8975 {
    /// Create the driver
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SlaveDriver for Ak8975 {
    fn name(&self) -> &'static str {
        "ak8975"
    }

    fn suspend<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        bus.write(slave.address, AK8975_REG_CNTL, MODE_POWER_DOWN)
    }

    fn resume<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        bus.write(slave.address, AK8975_REG_CNTL, MODE_SINGLE)
    }

    fn read<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
        data: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        let Some(out) = data.get_mut(..AK8975_DATA_LEN) else {
            return Ok(0);
        };
        bus.read(slave.address, AK8975_REG_ST1, out)?;
        bus.write(slave.address, AK8975_REG_CNTL, MODE_SINGLE)?;
        Ok(AK8975_DATA_LEN)
    }
}
