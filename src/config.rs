//! Gyroscope configuration store
//!
//! [`SensorClusterConfig`] is the single source of truth for the gyroscope's
//! hardware settings. While the gyroscope is active every field, including the
//! DMP memory image, must match the device; a proposal that diverges from the
//! live configuration therefore requires a hardware reset before it can be
//! applied. [`propose_configuration`] makes that decision.

use crate::{Error, I2C_ADDRESS_AD0_LOW};

/// Size of one DMP memory bank in bytes
pub const MEMORY_BANK_SIZE: usize = 256;

/// Number of DMP RAM banks mirrored in the configuration
pub const MEMORY_BANK_COUNT: usize = 4;

/// Size of the mirrored DMP memory image
pub const MEMORY_IMAGE_SIZE: usize = MEMORY_BANK_SIZE * MEMORY_BANK_COUNT;

/// Number of gyroscope axes
pub const NUM_AXES: usize = 3;

/// External sync input routing (`EXT_SYNC_SET`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtSync {
    /// External sync disabled
    Disabled = 0,
    /// Sync latched into `TEMP_OUT_L[0]`
    TempOutL = 1,
    /// Sync latched into `GYRO_XOUT_L[0]`
    GyroXoutL = 2,
    /// Sync latched into `GYRO_YOUT_L[0]`
    GyroYoutL = 3,
    /// Sync latched into `GYRO_ZOUT_L[0]`
    GyroZoutL = 4,
    /// Sync latched into `AUX_XOUT_L[0]`
    AccelXoutL = 5,
    /// Sync latched into `AUX_YOUT_L[0]`
    AccelYoutL = 6,
    /// Sync latched into `AUX_ZOUT_L[0]`
    AccelZoutL = 7,
}

impl TryFrom<u8> for ExtSync {
    type Error = Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::TempOutL),
            2 => Ok(Self::GyroXoutL),
            3 => Ok(Self::GyroYoutL),
            4 => Ok(Self::GyroZoutL),
            5 => Ok(Self::AccelXoutL),
            6 => Ok(Self::AccelYoutL),
            7 => Ok(Self::AccelZoutL),
            _ => Err(Error::InvalidConfig),
        }
    }
}

/// Gyroscope full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FullScale {
    /// ±250 °/s
    Dps250 = 0,
    /// ±500 °/s
    Dps500 = 1,
    /// ±1000 °/s
    Dps1000 = 2,
    /// ±2000 °/s
    Dps2000 = 3,
}

impl FullScale {
    /// Get the sensitivity in LSB/(°/s)
    #[must_use]
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::Dps250 => 131.072,
            Self::Dps500 => 65.536,
            Self::Dps1000 => 32.768,
            Self::Dps2000 => 16.384,
        }
    }

    /// Get the full-scale range in °/s
    #[must_use]
    pub const fn max_dps(self) -> u16 {
        match self {
            Self::Dps250 => 250,
            Self::Dps500 => 500,
            Self::Dps1000 => 1000,
            Self::Dps2000 => 2000,
        }
    }
}

impl TryFrom<u8> for FullScale {
    type Error = Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Dps250),
            1 => Ok(Self::Dps500),
            2 => Ok(Self::Dps1000),
            3 => Ok(Self::Dps2000),
            _ => Err(Error::InvalidConfig),
        }
    }
}

/// Digital low pass filter (`DLPF_CFG`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LowPassFilter {
    /// 256 Hz bandwidth, 8 kHz internal sample rate
    Hz256 = 0,
    /// 188 Hz bandwidth
    Hz188 = 1,
    /// 98 Hz bandwidth
    Hz98 = 2,
    /// 42 Hz bandwidth
    Hz42 = 3,
    /// 20 Hz bandwidth
    Hz20 = 4,
    /// 10 Hz bandwidth
    Hz10 = 5,
    /// 5 Hz bandwidth
    Hz5 = 6,
    /// Filter bypassed, 2100 Hz bandwidth, 8 kHz internal sample rate
    Hz2100 = 7,
}

impl LowPassFilter {
    /// Internal sample rate feeding the sample rate divider, in Hz
    #[must_use]
    pub const fn internal_rate_hz(self) -> u16 {
        match self {
            Self::Hz256 | Self::Hz2100 => 8000,
            _ => 1000,
        }
    }
}

impl TryFrom<u8> for LowPassFilter {
    type Error = Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Hz256),
            1 => Ok(Self::Hz188),
            2 => Ok(Self::Hz98),
            3 => Ok(Self::Hz42),
            4 => Ok(Self::Hz20),
            5 => Ok(Self::Hz10),
            6 => Ok(Self::Hz5),
            7 => Ok(Self::Hz2100),
            _ => Err(Error::InvalidConfig),
        }
    }
}

/// Clock source selection (`CLK_SEL`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Internal oscillator
    Internal = 0,
    /// PLL with X gyro reference
    PllGyroX = 1,
    /// PLL with Y gyro reference
    PllGyroY = 2,
    /// PLL with Z gyro reference
    PllGyroZ = 3,
    /// PLL with external 32.768 kHz reference
    PllExternal32k = 4,
    /// PLL with external 19.2 MHz reference
    PllExternal19M = 5,
    /// Clock stopped
    Stop = 7,
}

impl ClockSource {
    /// PLL source referenced to the gyro axis with the given index (0 = X)
    #[must_use]
    pub const fn pll_for_axis(axis: usize) -> Self {
        match axis {
            0 => Self::PllGyroX,
            1 => Self::PllGyroY,
            _ => Self::PllGyroZ,
        }
    }
}

impl TryFrom<u8> for ClockSource {
    type Error = Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Internal),
            1 => Ok(Self::PllGyroX),
            2 => Ok(Self::PllGyroY),
            3 => Ok(Self::PllGyroZ),
            4 => Ok(Self::PllExternal32k),
            5 => Ok(Self::PllExternal19M),
            7 => Ok(Self::Stop),
            _ => Err(Error::InvalidConfig),
        }
    }
}

/// Individually addressable configuration fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigField {
    /// `INT_CFG` register value
    IntConfig,
    /// External sync routing
    ExtSync,
    /// Full-scale range
    FullScale,
    /// Low pass filter
    LowPassFilter,
    /// Clock source
    ClockSource,
    /// Sample rate divider
    Divider,
    /// DMP enable (0 or 1)
    DmpEnable,
    /// FIFO enable (0 or 1)
    FifoEnable,
    /// DMP configuration byte 1
    DmpCfg1,
    /// DMP configuration byte 2
    DmpCfg2,
    /// Gyro standby bits (`PWR_MGM` bits 5:3)
    GyroPower,
    /// Product identifier (read-only)
    ProductId,
    /// Silicon revision (read-only)
    SiliconRevision,
    /// Sensitivity trim (read-only)
    Trim,
}

impl ConfigField {
    /// Whether the field is an identity field that callers may never set
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::ProductId | Self::SiliconRevision | Self::Trim)
    }
}

/// Gyroscope hardware configuration
///
/// Everything up to and including `ram` is caller-settable. `product_id`,
/// `silicon_revision` and `trim` are identity fields read from the device at
/// bind time and are never taken from a caller-supplied configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorClusterConfig {
    /// Gyroscope I2C address
    pub addr: u8,
    /// `INT_CFG` register value
    pub int_config: u8,
    /// External sync routing
    pub ext_sync: ExtSync,
    /// Full-scale range
    pub full_scale: FullScale,
    /// Low pass filter
    pub lpf: LowPassFilter,
    /// Clock source used while active
    pub clk_src: ClockSource,
    /// Sample rate divider
    pub divider: u8,
    /// Run the DMP while active
    pub dmp_enable: bool,
    /// Enable the FIFO while active
    pub fifo_enable: bool,
    /// DMP configuration byte 1
    pub dmp_cfg1: u8,
    /// DMP configuration byte 2
    pub dmp_cfg2: u8,
    /// Gyro standby bits (`PWR_MGM` bits 5:3) applied while active
    pub gyro_power: u8,
    /// Per-axis temperature compensation offsets
    pub offset_tc: [u8; NUM_AXES],
    /// Per-axis static offsets
    pub offset: [i16; NUM_AXES],
    /// Mirror of the DMP memory banks
    pub ram: [u8; MEMORY_IMAGE_SIZE],
    /// Product identifier (read-only)
    pub product_id: u8,
    /// Silicon revision (read-only)
    pub silicon_revision: u8,
    /// Sensitivity trim in LSB/(°/s) at ±250 °/s (read-only)
    pub trim: u16,
}

impl Default for SensorClusterConfig {
    fn default() -> Self {
        Self {
            addr: I2C_ADDRESS_AD0_LOW,
            int_config: 0,
            ext_sync: ExtSync::Disabled,
            full_scale: FullScale::Dps2000,
            lpf: LowPassFilter::Hz42,
            clk_src: ClockSource::PllGyroZ,
            divider: 0,
            dmp_enable: false,
            fifo_enable: false,
            dmp_cfg1: 0,
            dmp_cfg2: 0,
            gyro_power: 0,
            offset_tc: [0; NUM_AXES],
            offset: [0; NUM_AXES],
            ram: [0; MEMORY_IMAGE_SIZE],
            product_id: 0,
            silicon_revision: 0,
            trim: DEFAULT_TRIM,
        }
    }
}

/// Default sensitivity trim (LSB/(°/s) at ±250 °/s)
pub const DEFAULT_TRIM: u16 = 131;

impl SensorClusterConfig {
    /// Whether any reset-relevant field differs from `proposed`
    ///
    /// Compares every caller-settable field, including the full memory image.
    /// Identity fields are ignored.
    #[must_use]
    pub fn diverges_from(&self, proposed: &Self) -> bool {
        self.addr != proposed.addr
            || self.int_config != proposed.int_config
            || self.ext_sync != proposed.ext_sync
            || self.full_scale != proposed.full_scale
            || self.lpf != proposed.lpf
            || self.clk_src != proposed.clk_src
            || self.divider != proposed.divider
            || self.dmp_enable != proposed.dmp_enable
            || self.fifo_enable != proposed.fifo_enable
            || self.dmp_cfg1 != proposed.dmp_cfg1
            || self.dmp_cfg2 != proposed.dmp_cfg2
            || self.gyro_power != proposed.gyro_power
            || self.offset_tc != proposed.offset_tc
            || self.offset != proposed.offset
            || self.ram != proposed.ram
    }

    /// Copy every caller-settable field from `proposed`, keeping identity fields
    pub fn adopt_settings(&mut self, proposed: &Self) {
        let product_id = self.product_id;
        let silicon_revision = self.silicon_revision;
        let trim = self.trim;

        self.clone_from(proposed);

        self.product_id = product_id;
        self.silicon_revision = silicon_revision;
        self.trim = trim;
    }

    /// One DMP memory bank of the mirrored image
    ///
    /// Returns `None` if `bank` is out of range.
    #[must_use]
    pub fn memory_bank(&self, bank: usize) -> Option<&[u8]> {
        let start = bank.checked_mul(MEMORY_BANK_SIZE)?;
        self.ram.get(start..start + MEMORY_BANK_SIZE)
    }

    /// Encoded `DLPF_FS_SYNC` register value
    #[must_use]
    pub const fn dlpf_fs_sync(&self) -> u8 {
        ((self.ext_sync as u8) << 5) | ((self.full_scale as u8) << 3) | self.lpf as u8
    }

    /// Output data rate in Hz for the current filter and divider
    #[must_use]
    pub fn sample_rate_hz(&self) -> f32 {
        f32::from(self.lpf.internal_rate_hz()) / (f32::from(self.divider) + 1.0)
    }

    /// Read a single field
    #[must_use]
    pub fn field(&self, field: ConfigField) -> u16 {
        match field {
            ConfigField::IntConfig => u16::from(self.int_config),
            ConfigField::ExtSync => self.ext_sync as u16,
            ConfigField::FullScale => self.full_scale as u16,
            ConfigField::LowPassFilter => self.lpf as u16,
            ConfigField::ClockSource => self.clk_src as u16,
            ConfigField::Divider => u16::from(self.divider),
            ConfigField::DmpEnable => u16::from(self.dmp_enable),
            ConfigField::FifoEnable => u16::from(self.fifo_enable),
            ConfigField::DmpCfg1 => u16::from(self.dmp_cfg1),
            ConfigField::DmpCfg2 => u16::from(self.dmp_cfg2),
            ConfigField::GyroPower => u16::from(self.gyro_power),
            ConfigField::ProductId => u16::from(self.product_id),
            ConfigField::SiliconRevision => u16::from(self.silicon_revision),
            ConfigField::Trim => self.trim,
        }
    }

    /// Set a single caller-settable field
    ///
    /// # Errors
    ///
    /// Returns `ConfigRejected` for identity fields and `InvalidConfig` for
    /// values outside the field's range.
    pub fn set_field(&mut self, field: ConfigField, value: u8) -> Result<(), Error<()>> {
        match field {
            ConfigField::IntConfig => self.int_config = value,
            ConfigField::ExtSync => self.ext_sync = ExtSync::try_from(value)?,
            ConfigField::FullScale => self.full_scale = FullScale::try_from(value)?,
            ConfigField::LowPassFilter => self.lpf = LowPassFilter::try_from(value)?,
            ConfigField::ClockSource => self.clk_src = ClockSource::try_from(value)?,
            ConfigField::Divider => self.divider = value,
            ConfigField::DmpEnable => self.dmp_enable = flag(value)?,
            ConfigField::FifoEnable => self.fifo_enable = flag(value)?,
            ConfigField::DmpCfg1 => self.dmp_cfg1 = value,
            ConfigField::DmpCfg2 => self.dmp_cfg2 = value,
            ConfigField::GyroPower => {
                if value & !crate::registers::GYRO_STANDBY_MASK != 0 {
                    return Err(Error::InvalidConfig);
                }
                self.gyro_power = value;
            }
            ConfigField::ProductId | ConfigField::SiliconRevision | ConfigField::Trim => {
                return Err(Error::ConfigRejected);
            }
        }
        Ok(())
    }
}

const fn flag(value: u8) -> Result<bool, Error<()>> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::InvalidConfig),
    }
}

/// Decide whether `proposed` requires a gyroscope reset and build the merged configuration
///
/// While the gyroscope is suspended there is no live hardware to diverge from,
/// so no reset is required. While it is active, any difference in a compared
/// field (including a single byte of the memory image) requires a reset.
///
/// The merged configuration always takes the caller-settable fields from
/// `proposed` and the identity fields from `current`.
#[must_use]
pub fn propose_configuration(
    current: &SensorClusterConfig,
    proposed: &SensorClusterConfig,
    gyro_suspended: bool,
) -> (bool, SensorClusterConfig) {
    let needs_reset = !gyro_suspended && current.diverges_from(proposed);

    let mut merged = current.clone();
    merged.adopt_settings(proposed);

    (needs_reset, merged)
}
