//! Slave sensor drivers
//!
//! The gyroscope coordinates up to three slave sensors on the same bus: an
//! accelerometer, a compass and a pressure sensor. Each slave is described by a
//! [`SlaveDescriptor`], pairing a [`SlaveDriver`] implementation with its
//! [`SlavePlatformData`].
//!
//! Every driver capability is optional. The default implementations succeed
//! without touching the bus, so a driver only overrides what its hardware
//! actually supports.
//!
//! # Example
//!
//! ```ignore
//! use mpu3050::{SensorCluster, PlatformData, SlaveKind, SlavePlatformData};
//! use mpu3050::slaves::{Ak8975, Kxtf9};
//!
//! let cluster = SensorCluster::new(i2c, PlatformData::default())
//!     .with_accelerometer(Kxtf9::new(), SlavePlatformData::new(SlaveKind::Accelerometer, 0x0F))
//!     .with_compass(Ak8975::new(), SlavePlatformData::new(SlaveKind::Compass, 0x0C));
//! ```

mod ak8975;
mod kxtf9;

pub use ak8975::{AK8975_DATA_LEN, AK8975_I2C_ADDRESS, Ak8975};
pub use kxtf9::{KXTF9_DATA_LEN, KXTF9_I2C_ADDRESS, Kxtf9, Kxtf9Range};

use embedded_hal::i2c::I2c;

use crate::interface::Bus;
use crate::platform::Orientation;

/// Role of a slave sensor within the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlaveKind {
    /// Accelerometer, readable directly or through the gyroscope passthrough
    Accelerometer,
    /// Magnetometer
    Compass,
    /// Barometric pressure sensor
    Pressure,
}

/// Board-level description of a slave sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlavePlatformData {
    /// Role of the slave
    pub kind: SlaveKind,
    /// 7-bit I2C address
    pub address: u8,
    /// Mounting orientation
    pub orientation: Orientation,
    /// Adapter number the slave is wired to (informational on a single-bus host)
    pub adapter: u8,
    /// Interrupt line, if wired
    pub irq: Option<u16>,
}

impl SlavePlatformData {
    /// Slave at `address` with identity orientation on adapter 0
    #[must_use]
    pub const fn new(kind: SlaveKind, address: u8) -> Self {
        Self {
            kind,
            address,
            orientation: Orientation::IDENTITY,
            adapter: 0,
            irq: None,
        }
    }

    /// Set the mounting orientation
    #[must_use]
    pub const fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}

/// Driver-specific configuration request
///
/// `key` selects a driver-defined setting and `data` carries its payload.
/// When `apply` is false the driver should only record the value and program
/// it on the next resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig<'a> {
    /// Driver-defined setting selector
    pub key: u32,
    /// Program the hardware immediately
    pub apply: bool,
    /// Setting payload
    pub data: &'a [u8],
}

/// Capabilities of a slave sensor driver
///
/// All methods receive the shared bus and the slave's platform data. Missing
/// capabilities fall back to the default implementations, which do nothing
/// and report success.
pub trait SlaveDriver {
    /// Short human-readable driver name
    fn name(&self) -> &'static str;

    /// First data register the gyroscope should burst-read when it fetches
    /// samples from this slave on the DMP's behalf
    ///
    /// `None` disables the passthrough.
    fn data_register(&self) -> Option<u8> {
        None
    }

    /// Put the slave into its low-power state
    ///
    /// # Errors
    ///
    /// Returns the bus error if the slave could not be reached.
    fn suspend<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        let _ = (bus, slave);
        Ok(())
    }

    /// Bring the slave back to its measuring state
    ///
    /// # Errors
    ///
    /// Returns the bus error if the slave could not be reached.
    fn resume<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
    ) -> Result<(), I2C::Error> {
        let _ = (bus, slave);
        Ok(())
    }

    /// Read one sample into `data`
    ///
    /// Returns the number of bytes written. Zero means the driver has no read
    /// capability.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read failed.
    fn read<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
        data: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        let _ = (bus, slave, data);
        Ok(0)
    }

    /// Apply a driver-specific setting
    ///
    /// # Errors
    ///
    /// Returns the bus error if programming the hardware failed.
    fn configure<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
        config: &SlaveConfig<'_>,
    ) -> Result<(), I2C::Error> {
        let _ = (bus, slave, config);
        Ok(())
    }

    /// Report a driver-specific setting into `out`
    ///
    /// Returns the number of bytes written, zero if the key is unknown.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the setting had to be read from hardware and
    /// the read failed.
    fn get_configuration<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        slave: &SlavePlatformData,
        key: u32,
        out: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        let _ = (bus, slave, key, out);
        Ok(0)
    }
}

/// Placeholder for a slave slot with no sensor fitted
///
/// Never instantiated by the cluster; its slot stays `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Absent;

impl SlaveDriver for Absent {
    fn name(&self) -> &'static str {
        "absent"
    }
}

/// A slave driver bound to its platform data
#[derive(Debug, Clone)]
pub struct SlaveDescriptor<S> {
    /// Driver implementation
    pub driver: S,
    /// Board description
    pub platform: SlavePlatformData,
}

impl<S: SlaveDriver> SlaveDescriptor<S> {
    /// Bind `driver` to `platform`
    pub const fn new(driver: S, platform: SlavePlatformData) -> Self {
        Self { driver, platform }
    }

    pub(crate) fn suspend<I2C: I2c>(&mut self, bus: &mut Bus<I2C>) -> Result<(), I2C::Error> {
        self.driver.suspend(bus, &self.platform)
    }

    pub(crate) fn resume<I2C: I2c>(&mut self, bus: &mut Bus<I2C>) -> Result<(), I2C::Error> {
        self.driver.resume(bus, &self.platform)
    }

    pub(crate) fn read<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        data: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        self.driver.read(bus, &self.platform, data)
    }

    pub(crate) fn configure<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        config: &SlaveConfig<'_>,
    ) -> Result<(), I2C::Error> {
        self.driver.configure(bus, &self.platform, config)
    }

    pub(crate) fn get_configuration<I2C: I2c>(
        &mut self,
        bus: &mut Bus<I2C>,
        key: u32,
        out: &mut [u8],
    ) -> Result<usize, I2C::Error> {
        self.driver.get_configuration(bus, &self.platform, key, out)
    }
}
