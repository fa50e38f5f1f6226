//! Platform descriptor types
//!
//! Board-level facts supplied by the integrator: bus addresses, interrupt
//! lines and the mounting orientation of each sensor. The driver reads these
//! but only changes them through an explicit
//! [`SensorCluster::set_platform_data`](crate::SensorCluster::set_platform_data)
//! or [`SensorCluster::set_slave_platform_data`](crate::SensorCluster::set_slave_platform_data) call.

use crate::{Error, I2C_ADDRESS_AD0_LOW};

/// Sensor mounting orientation as a row-major 3×3 matrix
///
/// Every entry is -1, 0 or 1, so the matrix can only permute and negate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Orientation {
    matrix: [i8; 9],
}

impl Orientation {
    /// Sensor axes aligned with the body axes
    pub const IDENTITY: Self = Self {
        matrix: [1, 0, 0, 0, 1, 0, 0, 0, 1],
    };

    /// Create an orientation from a row-major matrix
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if any entry is outside {-1, 0, 1}.
    pub fn new(matrix: [i8; 9]) -> Result<Self, Error<()>> {
        if matrix.iter().any(|v| !(-1..=1).contains(v)) {
            return Err(Error::InvalidConfig);
        }
        Ok(Self { matrix })
    }

    /// Row-major matrix entries
    #[must_use]
    pub const fn matrix(&self) -> [i8; 9] {
        self.matrix
    }

    /// Rotate a sensor-frame vector into the body frame
    ///
    /// Results saturate at the `i16` range (only reachable for `i16::MIN` inputs).
    #[must_use]
    pub fn apply(&self, v: [i16; 3]) -> [i16; 3] {
        let mut out = [0i16; 3];
        for (row, value) in out.iter_mut().enumerate() {
            let sum: i32 = (0..3)
                .map(|col| i32::from(self.matrix[row * 3 + col]) * i32::from(v[col]))
                .sum();
            #[allow(clippy::cast_possible_truncation)]
            {
                *value = sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            }
        }
        out
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Gyroscope platform data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlatformData {
    /// Gyroscope I2C address
    pub address: u8,
    /// Board default for the `INT_CFG` register
    pub int_config: u8,
    /// Gyroscope mounting orientation
    pub orientation: Orientation,
    /// Whether the auxiliary bus runs through a level shifter
    pub level_shifter: bool,
    /// Interrupt line, if wired
    pub irq: Option<u16>,
}

impl Default for PlatformData {
    fn default() -> Self {
        Self {
            address: I2C_ADDRESS_AD0_LOW,
            int_config: 0x10,
            orientation: Orientation::IDENTITY,
            level_shifter: false,
            irq: None,
        }
    }
}
