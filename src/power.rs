//! Cluster power management
//!
//! The gyroscope and its slaves are suspended and resumed as a group, in a
//! fixed order that keeps the gyroscope's passthrough reads valid:
//!
//! - **Suspend**: pressure, compass, accelerometer, gyroscope
//! - **Resume**: gyroscope, accelerometer, compass, pressure
//!
//! A sensor is only touched when it is requested, present and not already in
//! the target state. A failure on one sensor does not stop the others; the
//! outcome of each is collected in a [`TransitionReport`].
//!
//! # Example
//!
//! ```ignore
//! use mpu3050::{PowerState, SensorMask};
//!
//! let report = cluster.transition(SensorMask::GYRO | SensorMask::ACCEL, PowerState::Active, &mut delay);
//! if !report.is_ok() {
//!     // report.failed() tells which sensors are still in their old state
//! }
//! ```

use core::ops::BitOr;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::device::SensorCluster;
use crate::interface::Bus;
use crate::registers::{GYRO_STANDBY_MASK, MEM_R_W, X_OFFS_USRH, XG_OFFS_TC};
use crate::slaves::{SlaveDescriptor, SlaveDriver};
use crate::{Error, config::MEMORY_BANK_SIZE};

/// Settle time after a gyroscope hardware reset
const RESET_SETTLE_MS: u32 = 5;

/// Set of cluster sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorMask(u8);

impl SensorMask {
    /// No sensors
    pub const NONE: Self = Self(0);
    /// Gyroscope
    pub const GYRO: Self = Self(0x01);
    /// Accelerometer
    pub const ACCEL: Self = Self(0x02);
    /// Compass
    pub const COMPASS: Self = Self(0x04);
    /// Pressure sensor
    pub const PRESSURE: Self = Self(0x08);
    /// Every sensor
    pub const ALL: Self = Self(0x0F);

    /// Build a mask from raw bits, dropping unknown bits
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every sensor in `other` is in `self`
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sensors in `self` but not in `other`
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Whether the mask is empty
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SensorMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Target power state of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Measuring
    Active,
    /// Low-power standby
    Suspended,
}

/// Last known suspend flag of each sensor
///
/// A flag only changes after the sensor acknowledged the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SuspendState {
    /// Gyroscope suspended
    pub gyro: bool,
    /// Accelerometer suspended
    pub accel: bool,
    /// Compass suspended
    pub compass: bool,
    /// Pressure sensor suspended
    pub pressure: bool,
}

impl SuspendState {
    /// Every sensor marked suspended
    pub const ALL_SUSPENDED: Self = Self {
        gyro: true,
        accel: true,
        compass: true,
        pressure: true,
    };

    /// Sensors currently marked suspended
    #[must_use]
    pub fn suspended(&self) -> SensorMask {
        let mut mask = SensorMask::NONE;
        if self.gyro {
            mask = mask | SensorMask::GYRO;
        }
        if self.accel {
            mask = mask | SensorMask::ACCEL;
        }
        if self.compass {
            mask = mask | SensorMask::COMPASS;
        }
        if self.pressure {
            mask = mask | SensorMask::PRESSURE;
        }
        mask
    }
}

/// Result of one sensor's part in a transition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorOutcome<E> {
    /// Not in the requested mask
    NotRequested,
    /// Requested but no sensor is fitted
    NotPresent,
    /// Already in the target state; no bus traffic
    Unchanged,
    /// Moved to the target state
    Transitioned,
    /// The bus transaction failed; the sensor keeps its previous state
    Failed(E),
}

impl<E> SensorOutcome<E> {
    /// Whether this outcome is a failure
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-sensor outcome of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionReport<E> {
    /// Gyroscope outcome
    pub gyro: SensorOutcome<E>,
    /// Accelerometer outcome
    pub accel: SensorOutcome<E>,
    /// Compass outcome
    pub compass: SensorOutcome<E>,
    /// Pressure sensor outcome
    pub pressure: SensorOutcome<E>,
}

impl<E> TransitionReport<E> {
    const fn new() -> Self {
        Self {
            gyro: SensorOutcome::NotRequested,
            accel: SensorOutcome::NotRequested,
            compass: SensorOutcome::NotRequested,
            pressure: SensorOutcome::NotRequested,
        }
    }

    /// Whether no sensor failed
    pub const fn is_ok(&self) -> bool {
        !(self.gyro.is_failed()
            || self.accel.is_failed()
            || self.compass.is_failed()
            || self.pressure.is_failed())
    }

    /// Sensors whose transition failed
    pub fn failed(&self) -> SensorMask {
        [
            (&self.gyro, SensorMask::GYRO),
            (&self.accel, SensorMask::ACCEL),
            (&self.compass, SensorMask::COMPASS),
            (&self.pressure, SensorMask::PRESSURE),
        ]
        .into_iter()
        .filter(|(outcome, _)| outcome.is_failed())
        .fold(SensorMask::NONE, |mask, (_, bit)| mask | bit)
    }

    /// First failure in bus order (gyroscope, accelerometer, compass, pressure)
    pub fn first_error(self) -> Option<E> {
        [self.gyro, self.accel, self.compass, self.pressure]
            .into_iter()
            .find_map(|outcome| match outcome {
                SensorOutcome::Failed(e) => Some(e),
                _ => None,
            })
    }

    /// Collapse the report into a `Result`, keeping the first failure
    ///
    /// # Errors
    ///
    /// Returns `Error::Bus` with the first failure if any sensor failed.
    pub fn into_result(self) -> Result<(), Error<E>> {
        match self.first_error() {
            Some(e) => Err(Error::Bus(e)),
            None => Ok(()),
        }
    }
}

fn transition_slave<I2C, S>(
    bus: &mut Bus<I2C>,
    slave: Option<&mut SlaveDescriptor<S>>,
    suspended: &mut bool,
    requested: bool,
    target: PowerState,
) -> SensorOutcome<I2C::Error>
where
    I2C: I2c,
    S: SlaveDriver,
{
    if !requested {
        return SensorOutcome::NotRequested;
    }
    let Some(slave) = slave else {
        return SensorOutcome::NotPresent;
    };
    let suspend = target == PowerState::Suspended;
    if *suspended == suspend {
        return SensorOutcome::Unchanged;
    }

    let result = if suspend {
        slave.suspend(bus)
    } else {
        slave.resume(bus)
    };

    match result {
        Ok(()) => {
            *suspended = suspend;
            SensorOutcome::Transitioned
        }
        Err(e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("{} transition to {} failed", slave.driver.name(), target);
            SensorOutcome::Failed(e)
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
    /// Move the sensors in `sensors` to `target`
    ///
    /// Sensors outside the mask, absent sensors and sensors already in the
    /// target state are left alone. Every requested sensor is attempted even
    /// if an earlier one failed.
    pub fn transition<D: DelayNs>(
        &mut self,
        sensors: SensorMask,
        target: PowerState,
        delay: &mut D,
    ) -> TransitionReport<I2C::Error> {
        let mut report = TransitionReport::new();

        #[cfg(feature = "defmt")]
        defmt::debug!("transition {} -> {}", sensors.bits(), target);

        match target {
            PowerState::Suspended => {
                report.pressure = self.transition_pressure(sensors, target);
                report.compass = self.transition_compass(sensors, target);
                report.accel = self.transition_accel(sensors, target);
                report.gyro = self.transition_gyro(sensors, target, delay);
            }
            PowerState::Active => {
                report.gyro = self.transition_gyro(sensors, target, delay);
                report.accel = self.transition_accel(sensors, target);
                report.compass = self.transition_compass(sensors, target);
                report.pressure = self.transition_pressure(sensors, target);
            }
        }

        report
    }

    /// Select the sensors the current session wants running
    pub fn set_requested_sensors(&mut self, sensors: SensorMask) {
        self.requested = sensors;
    }

    /// Sensors the current session wants running
    pub const fn requested_sensors(&self) -> SensorMask {
        self.requested
    }

    /// Suspend every sensor outside the requested mask
    pub fn suspend_unrequested<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        let unrequested = SensorMask::ALL.difference(self.requested);
        self.transition(unrequested, PowerState::Suspended, delay)
    }

    /// Resume every sensor in the requested mask
    pub fn resume_requested<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        self.transition(self.requested, PowerState::Active, delay)
    }

    /// Suspend the whole cluster
    pub fn suspend_all<D: DelayNs>(&mut self, delay: &mut D) -> TransitionReport<I2C::Error> {
        self.transition(SensorMask::ALL, PowerState::Suspended, delay)
    }

    /// Resume the requested sensors so the gyroscope can be used directly
    ///
    /// Returns whether the gyroscope was suspended beforehand, so the caller
    /// can put it back afterwards.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the gyroscope failed to resume. Slave
    /// failures are logged but not returned.
    pub fn force_active<D: DelayNs>(&mut self, delay: &mut D) -> Result<bool, Error<I2C::Error>> {
        let was_suspended = self.state.gyro;
        let report = self.transition(self.requested | SensorMask::GYRO, PowerState::Active, delay);

        #[cfg(feature = "defmt")]
        if !report.is_ok() {
            defmt::warn!("force_active: sensors {} failed", report.failed().bits());
        }

        if let SensorOutcome::Failed(e) = report.gyro {
            return Err(Error::Bus(e));
        }
        Ok(was_suspended)
    }

    /// Return every sensor to the suspend flags recorded in `previous`
    ///
    /// Sensors suspended in `previous` but active now are suspended first,
    /// then sensors active in `previous` but suspended now are resumed.
    pub(crate) fn restore_power_state<D: DelayNs>(
        &mut self,
        previous: SuspendState,
        delay: &mut D,
    ) -> Result<(), Error<I2C::Error>> {
        let before = previous.suspended();
        let now = self.state.suspended();

        let suspended = self.transition(before.difference(now), PowerState::Suspended, delay);
        let resumed = self.transition(now.difference(before), PowerState::Active, delay);
        suspended.into_result()?;
        resumed.into_result()
    }

    fn transition_accel(&mut self, sensors: SensorMask, target: PowerState) -> SensorOutcome<I2C::Error> {
        transition_slave(
            &mut self.bus,
            self.accel.as_mut(),
            &mut self.state.accel,
            sensors.contains(SensorMask::ACCEL),
            target,
        )
    }

    fn transition_compass(&mut self, sensors: SensorMask, target: PowerState) -> SensorOutcome<I2C::Error> {
        transition_slave(
            &mut self.bus,
            self.compass.as_mut(),
            &mut self.state.compass,
            sensors.contains(SensorMask::COMPASS),
            target,
        )
    }

    fn transition_pressure(&mut self, sensors: SensorMask, target: PowerState) -> SensorOutcome<I2C::Error> {
        transition_slave(
            &mut self.bus,
            self.pressure.as_mut(),
            &mut self.state.pressure,
            sensors.contains(SensorMask::PRESSURE),
            target,
        )
    }

    fn transition_gyro<D: DelayNs>(
        &mut self,
        sensors: SensorMask,
        target: PowerState,
        delay: &mut D,
    ) -> SensorOutcome<I2C::Error> {
        if !sensors.contains(SensorMask::GYRO) {
            return SensorOutcome::NotRequested;
        }
        let suspend = target == PowerState::Suspended;
        if self.state.gyro == suspend {
            return SensorOutcome::Unchanged;
        }

        let result = if suspend {
            self.gyro_suspend()
        } else {
            self.gyro_resume(delay)
        };

        match result {
            Ok(()) => {
                self.state.gyro = suspend;
                SensorOutcome::Transitioned
            }
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("gyro transition to {} failed", target);
                SensorOutcome::Failed(e)
            }
        }
    }

    fn gyro_suspend(&mut self) -> Result<(), I2C::Error> {
        self.registers().pwr_mgm().modify(|w| {
            w.set_sleep(true);
            w.set_stby_xg(true);
            w.set_stby_yg(true);
            w.set_stby_zg(true);
        })?;
        self.dmp_running = false;
        Ok(())
    }

    fn gyro_resume<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), I2C::Error> {
        if self.gyro_needs_reset {
            #[cfg(feature = "defmt")]
            defmt::debug!("gyro reset and reconfigure");

            self.registers().pwr_mgm().write(|w| w.set_h_reset(true))?;
            delay.delay_ms(RESET_SETTLE_MS);
            self.write_configuration()?;
            self.gyro_needs_reset = false;
        }

        let clk_sel = self.config.clk_src as u8;
        let standby = self.config.gyro_power & GYRO_STANDBY_MASK;
        self.registers().pwr_mgm().write(|w| {
            w.set_clk_sel(clk_sel);
            w.set_stby_xg(standby & 0x20 != 0);
            w.set_stby_yg(standby & 0x10 != 0);
            w.set_stby_zg(standby & 0x08 != 0);
        })?;

        self.dmp_running = self.config.dmp_enable;
        Ok(())
    }

    /// Program every configuration register from the stored configuration
    fn write_configuration(&mut self) -> Result<(), I2C::Error> {
        let address = self.config.addr;
        let config = &self.config;

        {
            let mut regs = crate::device::gyro_registers(&mut self.bus, address);
            regs.smplrt_div().write(|w| w.set_smplrt_div(config.divider))?;
            regs.dlpf_fs_sync().write(|w| {
                w.set_dlpf_cfg(config.lpf as u8);
                w.set_fs_sel(config.full_scale as u8);
                w.set_ext_sync_set(config.ext_sync as u8);
            })?;
            regs.int_cfg().write(|w| w.set_int_cfg(config.int_config))?;
        }

        let mut offsets = [0u8; 6];
        for (bytes, offset) in offsets.chunks_exact_mut(2).zip(config.offset) {
            bytes.copy_from_slice(&offset.to_be_bytes());
        }
        self.bus.write_burst(address, X_OFFS_USRH, &offsets)?;
        self.bus.write_burst(address, XG_OFFS_TC, &config.offset_tc)?;

        {
            let mut regs = crate::device::gyro_registers(&mut self.bus, address);
            regs.dmp_cfg_1().write(|w| w.set_dmp_cfg_1(config.dmp_cfg1))?;
            regs.dmp_cfg_2().write(|w| w.set_dmp_cfg_2(config.dmp_cfg2))?;
        }

        for (bank, data) in (0u8..).zip(config.ram.chunks(MEMORY_BANK_SIZE)) {
            let mut regs = crate::device::gyro_registers(&mut self.bus, address);
            regs.bank_sel().write(|w| w.set_bank_sel(bank))?;
            regs.mem_start_addr().write(|w| w.set_mem_start_addr(0))?;
            self.bus.write_burst(address, MEM_R_W, data)?;
        }

        let passthrough = self
            .accel
            .as_ref()
            .and_then(|accel| Some((accel.platform.address, accel.driver.data_register()?)));

        let mut regs = crate::device::gyro_registers(&mut self.bus, address);
        if let Some((slave_address, data_register)) = passthrough {
            regs.aux_slv_addr().write(|w| w.set_aux_id(slave_address))?;
            regs.aux_burst_addr().write(|w| w.set_aux_burst_addr(data_register))?;
        }
        regs.user_ctrl().write(|w| {
            w.set_dmp_en(config.dmp_enable);
            w.set_fifo_en(config.fifo_enable);
            w.set_aux_if_en(passthrough.is_some());
        })?;

        Ok(())
    }
}
