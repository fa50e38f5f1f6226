//! High-level driver API for the MPU-3050 sensor cluster
//!
//! [`SensorCluster`] owns the shared I2C bus, the gyroscope's configuration and
//! up to three slave sensors. Every operation takes `&mut self`; callers that
//! share a cluster between contexts wrap it in their own lock.
//!
//! Power sequencing lives in [`crate::power`], accelerometer calibration in
//! [`crate::calibration`] and the factory self-test in [`crate::self_test`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::calibration::CalibrationOffset;
use crate::config::{MEMORY_BANK_SIZE, NUM_AXES, SensorClusterConfig, propose_configuration};
use crate::interface::{Bus, GyroInterface};
use crate::platform::PlatformData;
use crate::power::{SensorMask, SuspendState, TransitionReport};
use crate::registers::{GYRO_XOUT_H, Mpu3050, TEMP_OUT_H};
use crate::self_test::SelfTestResult;
use crate::slaves::{Absent, SlaveConfig, SlaveDescriptor, SlaveDriver, SlaveKind, SlavePlatformData};
use crate::{ConfigField, Error, WHO_AM_I_ADDRESS_MASK};

/// Temperature offset in LSB at 35 °C
const TEMP_OFFSET_LSB: f32 = 13200.0;

/// Temperature sensitivity in LSB/°C
const TEMP_SENSITIVITY: f32 = 280.0;

/// Temperature reference point in °C
const TEMP_REFERENCE_C: f32 = 35.0;

/// Typed register access for the gyroscope at `address`
pub(crate) fn gyro_registers<I2C>(
    bus: &mut Bus<I2C>,
    address: u8,
) -> Mpu3050<GyroInterface<'_, I2C>> {
    Mpu3050::new(GyroInterface::new(bus, address))
}

/// What happened to the hardware when a configuration was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationOutcome {
    /// Nothing differed from the stored configuration
    Unchanged,
    /// Stored while the gyroscope is suspended; programmed on the next resume
    Deferred,
    /// The gyroscope was active, so it was reset and reprogrammed immediately
    Reprogrammed,
}

/// MPU-3050 gyroscope with its attached slave sensors
///
/// The type parameters name the slave drivers; unfitted slots use [`Absent`].
pub struct SensorCluster<I2C, A = Absent, C = Absent, P = Absent> {
    pub(crate) bus: Bus<I2C>,
    pub(crate) config: SensorClusterConfig,
    pub(crate) platform: PlatformData,
    pub(crate) accel: Option<SlaveDescriptor<A>>,
    pub(crate) compass: Option<SlaveDescriptor<C>>,
    pub(crate) pressure: Option<SlaveDescriptor<P>>,
    pub(crate) state: SuspendState,
    pub(crate) gyro_needs_reset: bool,
    pub(crate) dmp_running: bool,
    pub(crate) requested: SensorMask,
    pub(crate) session_open: bool,
    pub(crate) accel_offset: CalibrationOffset,
    pub(crate) last_self_test: Option<SelfTestResult>,
}

impl<I2C> SensorCluster<I2C> {
    /// Create a cluster with no slaves attached
    ///
    /// Nothing is sent on the bus. Attach slaves with the `with_*` builders,
    /// then call [`init`](Self::init).
    pub fn new(i2c: I2C, platform: PlatformData) -> Self {
        let config = SensorClusterConfig {
            addr: platform.address,
            int_config: platform.int_config,
            ..SensorClusterConfig::default()
        };

        Self {
            bus: Bus::new(i2c),
            config,
            platform,
            accel: None,
            compass: None,
            pressure: None,
            state: SuspendState::default(),
            gyro_needs_reset: true,
            dmp_running: false,
            requested: SensorMask::GYRO,
            session_open: false,
            accel_offset: CalibrationOffset::ZERO,
            last_self_test: None,
        }
    }
}

impl<I2C, A, C, P> SensorCluster<I2C, A, C, P> {
    /// Attach an accelerometer
    pub fn with_accelerometer<S: SlaveDriver>(
        self,
        driver: S,
        platform: SlavePlatformData,
    ) -> SensorCluster<I2C, S, C, P> {
        SensorCluster {
            bus: self.bus,
            config: self.config,
            platform: self.platform,
            accel: Some(SlaveDescriptor::new(driver, platform)),
            compass: self.compass,
            pressure: self.pressure,
            state: self.state,
            gyro_needs_reset: true,
            dmp_running: self.dmp_running,
            requested: self.requested,
            session_open: self.session_open,
            accel_offset: self.accel_offset,
            last_self_test: self.last_self_test,
        }
    }

    /// Attach a compass
    pub fn with_compass<S: SlaveDriver>(
        self,
        driver: S,
        platform: SlavePlatformData,
    ) -> SensorCluster<I2C, A, S, P> {
        SensorCluster {
            bus: self.bus,
            config: self.config,
            platform: self.platform,
            accel: self.accel,
            compass: Some(SlaveDescriptor::new(driver, platform)),
            pressure: self.pressure,
            state: self.state,
            gyro_needs_reset: self.gyro_needs_reset,
            dmp_running: self.dmp_running,
            requested: self.requested,
            session_open: self.session_open,
            accel_offset: self.accel_offset,
            last_self_test: self.last_self_test,
        }
    }

    /// Attach a pressure sensor
    pub fn with_pressure<S: SlaveDriver>(
        self,
        driver: S,
        platform: SlavePlatformData,
    ) -> SensorCluster<I2C, A, C, S> {
        SensorCluster {
            bus: self.bus,
            config: self.config,
            platform: self.platform,
            accel: self.accel,
            compass: self.compass,
            pressure: Some(SlaveDescriptor::new(driver, platform)),
            state: self.state,
            gyro_needs_reset: self.gyro_needs_reset,
            dmp_running: self.dmp_running,
            requested: self.requested,
            session_open: self.session_open,
            accel_offset: self.accel_offset,
            last_self_test: self.last_self_test,
        }
    }

    /// Consume the cluster and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.bus.release()
    }

    /// Stored gyroscope configuration
    pub const fn configuration(&self) -> &SensorClusterConfig {
        &self.config
    }

    /// Gyroscope platform data
    pub const fn platform_data(&self) -> &PlatformData {
        &self.platform
    }

    /// Platform data of an attached slave
    pub fn slave_platform_data(&self, kind: SlaveKind) -> Option<&SlavePlatformData> {
        match kind {
            SlaveKind::Accelerometer => self.accel.as_ref().map(|s| &s.platform),
            SlaveKind::Compass => self.compass.as_ref().map(|s| &s.platform),
            SlaveKind::Pressure => self.pressure.as_ref().map(|s| &s.platform),
        }
    }

    /// Sensors that are fitted
    pub const fn present_sensors(&self) -> SensorMask {
        let mut bits = SensorMask::GYRO.bits();
        if self.accel.is_some() {
            bits |= SensorMask::ACCEL.bits();
        }
        if self.compass.is_some() {
            bits |= SensorMask::COMPASS.bits();
        }
        if self.pressure.is_some() {
            bits |= SensorMask::PRESSURE.bits();
        }
        SensorMask::from_bits(bits)
    }

    /// Last known suspend flags
    pub const fn suspend_state(&self) -> SuspendState {
        self.state
    }

    /// Whether the gyroscope will be reset and reprogrammed on its next resume
    pub const fn gyro_needs_reset(&self) -> bool {
        self.gyro_needs_reset
    }

    /// Whether the DMP is running
    pub const fn is_dmp_running(&self) -> bool {
        self.dmp_running
    }

    /// Whether a session is open
    pub const fn is_session_open(&self) -> bool {
        self.session_open
    }

    fn replace_slave_platform(&mut self, kind: SlaveKind, platform: SlavePlatformData) {
        let slot = match kind {
            SlaveKind::Accelerometer => self.accel.as_mut().map(|s| &mut s.platform),
            SlaveKind::Compass => self.compass.as_mut().map(|s| &mut s.platform),
            SlaveKind::Pressure => self.pressure.as_mut().map(|s| &mut s.platform),
        };
        if let Some(slot) = slot {
            *slot = platform;
        }
    }
}

impl<I2C, A, C, P> SensorCluster<I2C, A, C, P>
where
    I2C: I2c,
    A: SlaveDriver,
    C: SlaveDriver,
    P: SlaveDriver,
{
    pub(crate) fn registers(&mut self) -> Mpu3050<GyroInterface<'_, I2C>> {
        gyro_registers(&mut self.bus, self.config.addr)
    }

    /// Verify the gyroscope and put the whole cluster into a known state
    ///
    /// Checks that `WHO_AM_I` mirrors the configured bus address, records the
    /// product id and silicon revision, then suspends every sensor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDevice` if the identity register does not match, or the
    /// first bus error encountered.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C::Error>> {
        let who_am_i = self.read_who_am_i()?;
        if who_am_i & WHO_AM_I_ADDRESS_MASK != self.config.addr & WHO_AM_I_ADDRESS_MASK {
            #[cfg(feature = "defmt")]
            defmt::warn!("WHO_AM_I mismatch: 0x{:02x}", who_am_i);
            return Err(Error::InvalidDevice(who_am_i));
        }

        let product = self.registers().product_id().read()?;
        self.config.product_id = product.product();
        self.config.silicon_revision = product.revision();

        #[cfg(feature = "defmt")]
        defmt::info!(
            "MPU-3050 product {} revision {}",
            self.config.product_id,
            self.config.silicon_revision
        );

        self.gyro_needs_reset = true;
        self.suspend_all(delay).into_result()
    }

    /// Read the `WHO_AM_I` register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_who_am_i(&mut self) -> Result<u8, Error<I2C::Error>> {
        let reg = self.registers().who_am_i().read()?;
        Ok(reg.i_2_c_id() << 1)
    }

    /// Read consecutive registers of any device on the cluster bus
    ///
    /// Raw access bypasses the cluster's state tracking.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error<I2C::Error>> {
        Ok(self.bus.read(address, register, buffer)?)
    }

    /// Write one register of any device on the cluster bus
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_register(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> Result<(), Error<I2C::Error>> {
        Ok(self.bus.write(address, register, value)?)
    }

    /// Drain a port register, e.g. the FIFO or the memory window
    ///
    /// # Errors
    ///
    /// Returns the first failing transaction's error.
    pub fn read_burst(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error<I2C::Error>> {
        Ok(self.bus.read_burst(address, register, buffer)?)
    }

    /// Write `data` starting at `register`, split into bus-sized chunks
    ///
    /// # Errors
    ///
    /// Returns the first failing transaction's error.
    pub fn write_burst(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<(), Error<I2C::Error>> {
        Ok(self.bus.write_burst(address, register, data)?)
    }

    /// Replace the gyroscope configuration
    ///
    /// Identity fields of `proposed` are ignored. While the gyroscope is
    /// active any difference triggers an immediate suspend and resume of the
    /// active sensors, during which the gyroscope is reset and fully
    /// reprogrammed. While it is suspended the new values are stored and
    /// programmed on the next resume.
    ///
    /// # Errors
    ///
    /// Returns the first bus error of the restart. The configuration is
    /// stored regardless and the gyroscope stays marked for reset.
    pub fn set_configuration<D: DelayNs>(
        &mut self,
        proposed: &SensorClusterConfig,
        delay: &mut D,
    ) -> Result<ConfigurationOutcome, Error<I2C::Error>> {
        let diverges = self.config.diverges_from(proposed);
        let (needs_reset, merged) = propose_configuration(&self.config, proposed, self.state.gyro);

        if needs_reset {
            // Suspend at the old address, resume at the new one
            self.restart_active(delay, |cluster| cluster.config = merged)?;
            return Ok(ConfigurationOutcome::Reprogrammed);
        }

        self.config = merged;
        if !diverges {
            return Ok(ConfigurationOutcome::Unchanged);
        }
        self.gyro_needs_reset = true;
        Ok(ConfigurationOutcome::Deferred)
    }

    /// Read one configuration field
    pub fn field(&self, field: ConfigField) -> u16 {
        self.config.field(field)
    }

    /// Change one configuration field
    ///
    /// # Errors
    ///
    /// Returns `ConfigRejected` for identity fields, `InvalidConfig` for
    /// out-of-range values, or the bus error of the restart.
    pub fn set_field<D: DelayNs>(
        &mut self,
        field: ConfigField,
        value: u8,
        delay: &mut D,
    ) -> Result<ConfigurationOutcome, Error<I2C::Error>> {
        let mut proposed = self.config.clone();
        proposed.set_field(field, value).map_err(|e| e.lift())?;
        self.set_configuration(&proposed, delay)
    }

    /// Set the per-axis temperature compensation offsets
    ///
    /// # Errors
    ///
    /// Returns the bus error of the restart.
    pub fn set_offset_tc<D: DelayNs>(
        &mut self,
        offset_tc: [u8; NUM_AXES],
        delay: &mut D,
    ) -> Result<ConfigurationOutcome, Error<I2C::Error>> {
        let mut proposed = self.config.clone();
        proposed.offset_tc = offset_tc;
        self.set_configuration(&proposed, delay)
    }

    /// Set the per-axis static offsets
    ///
    /// # Errors
    ///
    /// Returns the bus error of the restart.
    pub fn set_offsets<D: DelayNs>(
        &mut self,
        offset: [i16; NUM_AXES],
        delay: &mut D,
    ) -> Result<ConfigurationOutcome, Error<I2C::Error>> {
        let mut proposed = self.config.clone();
        proposed.offset = offset;
        self.set_configuration(&proposed, delay)
    }

    /// Write `data` into the memory image, starting at `offset` within `bank`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the write does not fit inside the bank, or
    /// the bus error of the restart.
    pub fn set_memory<D: DelayNs>(
        &mut self,
        bank: usize,
        offset: usize,
        data: &[u8],
        delay: &mut D,
    ) -> Result<ConfigurationOutcome, Error<I2C::Error>> {
        if offset
            .checked_add(data.len())
            .is_none_or(|end| end > MEMORY_BANK_SIZE)
        {
            return Err(Error::InvalidConfig);
        }
        let start = bank
            .checked_mul(MEMORY_BANK_SIZE)
            .and_then(|base| base.checked_add(offset))
            .ok_or(Error::InvalidConfig)?;

        let mut proposed = self.config.clone();
        proposed
            .ram
            .get_mut(start..start + data.len())
            .ok_or(Error::InvalidConfig)?
            .copy_from_slice(data);
        self.set_configuration(&proposed, delay)
    }

    /// Replace the gyroscope platform data
    ///
    /// A new bus address or interrupt configuration is routed through
    /// [`set_configuration`](Self::set_configuration).
    ///
    /// # Errors
    ///
    /// Returns the bus error of the restart.
    pub fn set_platform_data<D: DelayNs>(
        &mut self,
        platform: PlatformData,
        delay: &mut D,
    ) -> Result<ConfigurationOutcome, Error<I2C::Error>> {
        let mut proposed = self.config.clone();
        proposed.addr = platform.address;
        proposed.int_config = platform.int_config;
        self.platform = platform;
        self.set_configuration(&proposed, delay)
    }

    /// Replace the platform data of an attached slave
    ///
    /// A new accelerometer address is programmed into the gyroscope's
    /// passthrough: immediately by restarting the active sensors while the
    /// gyroscope is active, otherwise on its next resume.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if no slave of that kind is attached or
    /// `platform.kind` does not match `kind`, or the first bus error of the
    /// restart.
    pub fn set_slave_platform_data<D: DelayNs>(
        &mut self,
        kind: SlaveKind,
        platform: SlavePlatformData,
        delay: &mut D,
    ) -> Result<(), Error<I2C::Error>> {
        if platform.kind != kind {
            return Err(Error::InvalidConfig);
        }
        let current = self.slave_platform_data(kind).ok_or(Error::InvalidConfig)?;
        let rewired = kind == SlaveKind::Accelerometer && current.address != platform.address;

        if rewired && !self.state.gyro {
            return self.restart_active(delay, |cluster| {
                cluster.replace_slave_platform(kind, platform);
            });
        }

        self.replace_slave_platform(kind, platform);
        if rewired {
            self.gyro_needs_reset = true;
        }
        Ok(())
    }

    /// Pass a driver-specific setting to a slave
    ///
    /// Succeeds without bus traffic if the slave is not fitted or its driver
    /// has no configure capability.
    ///
    /// # Errors
    ///
    /// Returns the bus error reported by the slave driver.
    pub fn configure_slave(
        &mut self,
        kind: SlaveKind,
        config: &SlaveConfig<'_>,
    ) -> Result<(), Error<I2C::Error>> {
        match kind {
            SlaveKind::Accelerometer => configure_slot(&mut self.bus, self.accel.as_mut(), config),
            SlaveKind::Compass => configure_slot(&mut self.bus, self.compass.as_mut(), config),
            SlaveKind::Pressure => configure_slot(&mut self.bus, self.pressure.as_mut(), config),
        }?;
        Ok(())
    }

    /// Ask a slave for a driver-specific setting
    ///
    /// Returns the number of bytes written to `out`; zero if the slave is not
    /// fitted or does not report that key.
    ///
    /// # Errors
    ///
    /// Returns the bus error reported by the slave driver.
    pub fn get_slave_configuration(
        &mut self,
        kind: SlaveKind,
        key: u32,
        out: &mut [u8],
    ) -> Result<usize, Error<I2C::Error>> {
        let len = match kind {
            SlaveKind::Accelerometer => {
                get_slot_configuration(&mut self.bus, self.accel.as_mut(), key, out)
            }
            SlaveKind::Compass => {
                get_slot_configuration(&mut self.bus, self.compass.as_mut(), key, out)
            }
            SlaveKind::Pressure => {
                get_slot_configuration(&mut self.bus, self.pressure.as_mut(), key, out)
            }
        }?;
        Ok(len)
    }

    /// Raw compass sample through the compass driver
    ///
    /// Returns the number of bytes written; zero if no compass is fitted.
    ///
    /// # Errors
    ///
    /// Returns the bus error reported by the compass driver.
    pub fn read_compass(&mut self, data: &mut [u8]) -> Result<usize, Error<I2C::Error>> {
        match self.compass.as_mut() {
            Some(compass) => Ok(compass.read(&mut self.bus, data)?),
            None => Ok(0),
        }
    }

    /// Raw pressure sample through the pressure driver
    ///
    /// Returns the number of bytes written; zero if no pressure sensor is fitted.
    ///
    /// # Errors
    ///
    /// Returns the bus error reported by the pressure driver.
    pub fn read_pressure(&mut self, data: &mut [u8]) -> Result<usize, Error<I2C::Error>> {
        match self.pressure.as_mut() {
            Some(pressure) => Ok(pressure.read(&mut self.bus, data)?),
            None => Ok(0),
        }
    }

    /// Read the gyroscope outputs
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_gyro_raw(&mut self) -> Result<[i16; NUM_AXES], Error<I2C::Error>> {
        let mut buffer = [0u8; 6];
        self.bus.read(self.config.addr, GYRO_XOUT_H, &mut buffer)?;
        Ok([
            i16::from_be_bytes([buffer[0], buffer[1]]),
            i16::from_be_bytes([buffer[2], buffer[3]]),
            i16::from_be_bytes([buffer[4], buffer[5]]),
        ])
    }

    /// Read the raw temperature output
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_temperature_raw(&mut self) -> Result<i16, Error<I2C::Error>> {
        let mut buffer = [0u8; 2];
        self.bus.read(self.config.addr, TEMP_OUT_H, &mut buffer)?;
        Ok(i16::from_be_bytes(buffer))
    }

    /// Read the die temperature in °C
    ///
    /// Wakes the gyroscope for the read and returns every sensor to its
    /// previous power state afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_temperature_celsius<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<f32, Error<I2C::Error>> {
        let previous = self.state;
        self.force_active(delay)?;
        let raw = self.read_temperature_raw();
        self.restore_power_state(previous, delay)?;
        Ok(raw_to_celsius(raw?))
    }

    /// Start a session
    ///
    /// Loads the accelerometer calibration from `store` (a load failure leaves
    /// the accelerometer uncalibrated) and requests every fitted sensor.
    pub fn open_session<S: crate::CalibrationStore>(&mut self, store: &mut S) {
        self.load_calibration(store);
        self.requested = self.present_sensors();
        self.session_open = true;

        #[cfg(feature = "defmt")]
        defmt::debug!("session open, requested {}", self.requested.bits());
    }

    /// End the session and suspend every sensor
    pub fn close_session<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        self.session_open = false;
        self.suspend_all(delay)
    }

    /// System suspend hook
    pub fn pm_suspend<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        self.suspend_all(delay)
    }

    /// System resume hook
    ///
    /// Resumes the requested sensors only while a session is open.
    pub fn pm_resume<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        let sensors = if self.session_open {
            self.requested
        } else {
            SensorMask::NONE
        };
        self.transition(sensors, crate::PowerState::Active, delay)
    }

    /// Shutdown hook; leaves every sensor suspended
    pub fn shutdown<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        self.suspend_all(delay)
    }

    /// Suspend whatever is active, apply `update`, then resume so the
    /// gyroscope is reset and reprogrammed from the updated state
    fn restart_active<D, F>(&mut self, delay: &mut D, update: F) -> Result<(), Error<I2C::Error>>
    where
        D: DelayNs,
        F: FnOnce(&mut Self),
    {
        let active = SensorMask::ALL.difference(self.state.suspended());

        #[cfg(feature = "defmt")]
        defmt::debug!("restarting sensors {}", active.bits());

        let suspended = self.transition(active, crate::PowerState::Suspended, delay);
        update(self);
        self.gyro_needs_reset = true;
        let resumed = self.transition(active, crate::PowerState::Active, delay);
        suspended.into_result()?;
        resumed.into_result()
    }
}

fn configure_slot<I2C: I2c, S: SlaveDriver>(
    bus: &mut Bus<I2C>,
    slot: Option<&mut SlaveDescriptor<S>>,
    config: &SlaveConfig<'_>,
) -> Result<(), I2C::Error> {
    match slot {
        Some(slave) => slave.configure(bus, config),
        None => Ok(()),
    }
}

fn get_slot_configuration<I2C: I2c, S: SlaveDriver>(
    bus: &mut Bus<I2C>,
    slot: Option<&mut SlaveDescriptor<S>>,
    key: u32,
    out: &mut [u8],
) -> Result<usize, I2C::Error> {
    match slot {
        Some(slave) => slave.get_configuration(bus, key, out),
        None => Ok(0),
    }
}

/// Convert a raw temperature reading to °C
#[must_use]
pub fn raw_to_celsius(raw: i16) -> f32 {
    TEMP_REFERENCE_C + (f32::from(raw) + TEMP_OFFSET_LSB) / TEMP_SENSITIVITY
}
