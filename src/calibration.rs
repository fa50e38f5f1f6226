//! Accelerometer calibration
//!
//! The accelerometer can be read through two mutually exclusive paths:
//!
//! - **Direct**: from the slave's own output registers, whenever the DMP is
//!   not running or the accelerometer itself is suspended
//! - **Passthrough**: from the gyroscope's auxiliary output registers, which
//!   the gyroscope refreshes from the accelerometer while the DMP runs
//!
//! Calibration averages 100 consecutive raw samples into a per-axis offset
//! that is added to every caller-visible reading and handed to a
//! [`CalibrationStore`] for persistence.
//!
//! # Example
//!
//! ```ignore
//! // Device must be stationary
//! let offset = cluster.calibrate(true, &mut store, &mut delay)?;
//! let accel = cluster.read_accel()?;
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::Error;
use crate::device::SensorCluster;
use crate::registers::AUX_XOUT_H;
use crate::slaves::SlaveDriver;

/// Number of samples averaged by a calibration run
pub const CALIBRATION_SAMPLES: u8 = 100;

/// Accelerometer data (raw signed counts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelData {
    /// X-axis acceleration (raw)
    pub x: i16,
    /// Y-axis acceleration (raw)
    pub y: i16,
    /// Z-axis acceleration (raw)
    pub z: i16,
}

impl AccelData {
    /// Decode six bytes of left-justified 12-bit output (low byte first per axis)
    ///
    /// X and Y map `raw < 2048` to `-raw` and everything else to `4096 - raw`.
    /// Z is reported relative to its 1 g resting value as `3072 - raw`.
    #[must_use]
    pub fn from_raw(bytes: &[u8; 6]) -> Self {
        let x = unpack_raw(bytes[0], bytes[1]);
        let y = unpack_raw(bytes[2], bytes[3]);
        let z = unpack_raw(bytes[4], bytes[5]);

        Self {
            x: signed_horizontal(x),
            y: signed_horizontal(y),
            z: 3072 - z,
        }
    }

    /// As an `[x, y, z]` array
    #[must_use]
    pub const fn to_array(self) -> [i16; 3] {
        [self.x, self.y, self.z]
    }
}

/// Combine a data byte pair into the 12-bit raw value
fn unpack_raw(lo: u8, hi: u8) -> i16 {
    (i16::from(hi) << 4) | i16::from(lo >> 4)
}

const fn signed_horizontal(raw: i16) -> i16 {
    if raw < 2048 { -raw } else { 4096 - raw }
}

/// Per-axis accelerometer offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationOffset {
    /// X-axis offset (added to raw value)
    pub x: i16,
    /// Y-axis offset (added to raw value)
    pub y: i16,
    /// Z-axis offset (added to raw value)
    pub z: i16,
}

impl CalibrationOffset {
    /// No correction
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Apply the offset to a raw reading
    #[must_use]
    pub const fn apply(&self, raw: AccelData) -> AccelData {
        AccelData {
            x: raw.x.saturating_add(self.x),
            y: raw.y.saturating_add(self.y),
            z: raw.z.saturating_add(self.z),
        }
    }
}

/// Durable storage for the accelerometer offset
pub trait CalibrationStore {
    /// Storage error type
    type Error;

    /// Load the stored offset, `None` if nothing was ever stored
    ///
    /// # Errors
    ///
    /// Returns the storage error if the medium could not be read.
    fn load(&mut self) -> Result<Option<CalibrationOffset>, Self::Error>;

    /// Persist `offset`
    ///
    /// # Errors
    ///
    /// Returns the storage error if the medium could not be written.
    fn store(&mut self, offset: &CalibrationOffset) -> Result<(), Self::Error>;
}

impl<I2C, A, C, P> SensorCluster<I2C, A, C, P>
where
    I2C: I2c,
    A: SlaveDriver,
    C: SlaveDriver,
    P: SlaveDriver,
{
    /// Current accelerometer offset
    pub const fn accel_offset(&self) -> CalibrationOffset {
        self.accel_offset
    }

    /// Read the six raw accelerometer data bytes through whichever path is legal
    ///
    /// # Errors
    ///
    /// Returns `NoAccelPath` if no accelerometer is attached or its driver
    /// produced no data, or the bus error of the read.
    pub fn read_accel_bytes(&mut self) -> Result<[u8; 6], Error<I2C::Error>> {
        let accel = self.accel.as_mut().ok_or(Error::NoAccelPath)?;
        let mut bytes = [0u8; 6];

        if self.state.accel || !self.dmp_running {
            let len = accel.read(&mut self.bus, &mut bytes)?;
            if len < bytes.len() {
                return Err(Error::NoAccelPath);
            }
        } else {
            self.bus.read(self.config.addr, AUX_XOUT_H, &mut bytes)?;
        }

        Ok(bytes)
    }

    /// Read and decode one uncalibrated accelerometer sample
    ///
    /// # Errors
    ///
    /// See [`read_accel_bytes`](Self::read_accel_bytes).
    pub fn read_accel_raw(&mut self) -> Result<AccelData, Error<I2C::Error>> {
        let bytes = self.read_accel_bytes()?;
        Ok(AccelData::from_raw(&bytes))
    }

    /// Read one calibrated accelerometer sample
    ///
    /// # Errors
    ///
    /// See [`read_accel_bytes`](Self::read_accel_bytes).
    pub fn read_accel(&mut self) -> Result<AccelData, Error<I2C::Error>> {
        let raw = self.read_accel_raw()?;
        Ok(self.accel_offset.apply(raw))
    }

    /// Read one calibrated sample rotated into the body frame
    ///
    /// Uses the accelerometer's mounting orientation from its platform data.
    ///
    /// # Errors
    ///
    /// See [`read_accel_bytes`](Self::read_accel_bytes).
    pub fn read_accel_oriented(&mut self) -> Result<AccelData, Error<I2C::Error>> {
        let data = self.read_accel()?;
        let orientation = self
            .accel
            .as_ref()
            .map(|accel| accel.platform.orientation)
            .unwrap_or_default();
        let [x, y, z] = orientation.apply(data.to_array());
        Ok(AccelData { x, y, z })
    }

    /// Calibrate or clear the accelerometer offset
    ///
    /// With `enable` the device must be stationary: the offset becomes the
    /// per-axis mean of [`CALIBRATION_SAMPLES`] raw readings. Without it the
    /// offset is cleared. The result is kept in memory and passed to `store`.
    /// The cluster is woken for the run and every sensor is returned to its
    /// previous power state afterwards.
    ///
    /// # Errors
    ///
    /// - `CalibrationAborted` if any sample failed; the previous offset is kept
    /// - `PersistenceUnavailable` if `store` failed; the new offset is still in use
    pub fn calibrate<S: CalibrationStore, D: DelayNs>(
        &mut self,
        enable: bool,
        store: &mut S,
        delay: &mut D,
    ) -> Result<CalibrationOffset, Error<I2C::Error>> {
        let previous = self.state;
        self.force_active(delay)?;
        let result = self.calibrate_active(enable, store);

        // Leave the hardware as we found it, but report the calibration error first
        let restored = self.restore_power_state(previous, delay);
        let offset = result?;
        restored?;
        Ok(offset)
    }

    fn calibrate_active<S: CalibrationStore>(
        &mut self,
        enable: bool,
        store: &mut S,
    ) -> Result<CalibrationOffset, Error<I2C::Error>> {
        let offset = if enable {
            self.average_samples()?
        } else {
            CalibrationOffset::ZERO
        };

        self.accel_offset = offset;

        #[cfg(feature = "defmt")]
        defmt::info!("accel calibration ({}, {}, {})", offset.x, offset.y, offset.z);

        if store.store(&offset).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("failed to persist accel calibration");
            return Err(Error::PersistenceUnavailable);
        }

        Ok(offset)
    }

    fn average_samples(&mut self) -> Result<CalibrationOffset, Error<I2C::Error>> {
        let mut sum = [0i32; 3];

        for completed in 0..CALIBRATION_SAMPLES {
            let sample = self.read_accel_raw().map_err(|e| {
                #[cfg(feature = "defmt")]
                defmt::warn!("accel calibration aborted after {} samples", completed);
                let cause = match e {
                    Error::Bus(e) => Some(e),
                    _ => None,
                };
                Error::CalibrationAborted { completed, cause }
            })?;
            for (total, value) in sum.iter_mut().zip(sample.to_array()) {
                *total += i32::from(value);
            }
        }

        let n = i32::from(CALIBRATION_SAMPLES);
        // Mean of i16 samples always fits in i16
        #[allow(clippy::cast_possible_truncation)]
        let offset = CalibrationOffset {
            x: (sum[0] / n) as i16,
            y: (sum[1] / n) as i16,
            z: (sum[2] / n) as i16,
        };
        Ok(offset)
    }

    /// Load the persisted offset, falling back to no correction
    pub(crate) fn load_calibration<S: CalibrationStore>(&mut self, store: &mut S) {
        self.accel_offset = match store.load() {
            Ok(offset) => offset.unwrap_or(CalibrationOffset::ZERO),
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("accel calibration unavailable, using zero offset");
                CalibrationOffset::ZERO
            }
        };
    }
}
