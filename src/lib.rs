#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod device;
pub mod interface;
pub mod platform;
pub mod power;
pub mod registers;
pub mod slaves;

// Re-export main types
pub use calibration::{AccelData, CalibrationOffset, CalibrationStore};
pub use config::{
    ClockSource, ConfigField, ExtSync, FullScale, LowPassFilter, MEMORY_IMAGE_SIZE,
    SensorClusterConfig, propose_configuration,
};
pub use device::{ConfigurationOutcome, SensorCluster};
pub use interface::{Bus, GyroInterface, MAX_BURST_LEN};
pub use platform::{Orientation, PlatformData};
pub use power::{PowerState, SensorMask, SensorOutcome, SuspendState, TransitionReport};
pub use self_test::{SelfTestConfig, SelfTestFlags, SelfTestResult};
pub use slaves::{Absent, SlaveConfig, SlaveDescriptor, SlaveDriver, SlaveKind, SlavePlatformData};

/// MPU-3050 I2C address when AD0 pin is low (default: 0x68)
pub const I2C_ADDRESS_AD0_LOW: u8 = 0x68;

/// MPU-3050 I2C address when AD0 pin is high (alternative: 0x69)
pub const I2C_ADDRESS_AD0_HIGH: u8 = 0x69;

/// Mask of the `WHO_AM_I` bits that mirror the device's bus address (bits 6:1)
pub const WHO_AM_I_ADDRESS_MASK: u8 = 0x7E;

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Invalid `WHO_AM_I` register value (contains the actual value read)
    InvalidDevice(u8),
    /// Invalid configuration parameter
    InvalidConfig,
    /// Attempted to write a read-only identity field (product id, silicon revision, trim)
    ConfigRejected,
    /// No legal path to read the accelerometer (no accelerometer attached,
    /// or the attached driver produced no data)
    NoAccelPath,
    /// Calibration aborted before all samples were collected; no offset was stored
    CalibrationAborted {
        /// Number of samples successfully read before the failure
        completed: u8,
        /// Underlying bus error, `None` when the read had no legal path
        cause: Option<E>,
    },
    /// Calibration persistence failed to load or store the offset
    PersistenceUnavailable,
}

impl Error<()> {
    /// Re-type a validation error for a driver with a real bus error type
    pub(crate) fn lift<E>(self) -> Error<E> {
        match self {
            Self::InvalidDevice(id) => Error::InvalidDevice(id),
            Self::ConfigRejected => Error::ConfigRejected,
            Self::NoAccelPath => Error::NoAccelPath,
            Self::CalibrationAborted { completed, .. } => Error::CalibrationAborted {
                completed,
                cause: None,
            },
            Self::PersistenceUnavailable => Error::PersistenceUnavailable,
            Self::Bus(()) | Self::InvalidConfig => Error::InvalidConfig,
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
