//! Register definitions for the MPU-3050
//!
//! Single-byte control registers are described with the `device-driver` DSL and
//! accessed through [`crate::interface::GyroInterface`]. Multi-byte data windows
//! (sensor outputs, offsets, FIFO and memory ports) are read and written as raw
//! bursts, so only their start addresses are listed below the generated device.

device_driver::create_device!(
    device_name: Mpu3050,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = BE;
        }

        /// WHO_AM_I - Device identity (0x00)
        /// Bits 6:1 mirror the device's I2C address
        register WhoAmI {
            const ADDRESS = 0x00;
            const SIZE_BITS = 8;

            reserved_0: uint = 0..1,
            /// I2C address bits 6:1
            i2c_id: uint = 1..7,
            reserved_7: uint = 7..8,
        },

        /// PRODUCT_ID - Product and silicon revision (0x01)
        register ProductId {
            const ADDRESS = 0x01;
            const SIZE_BITS = 8;

            /// Silicon revision
            revision: uint = 0..4,
            /// Product identifier
            product: uint = 4..8,
        },

        /// FIFO_EN1 - FIFO data selection (0x12)
        register FifoEn1 {
            const ADDRESS = 0x12;
            const SIZE_BITS = 8;

            /// Append FIFO footer
            fifo_footer: bool = 0,
            /// Auxiliary Z output to FIFO
            aux_zout: bool = 1,
            /// Auxiliary Y output to FIFO
            aux_yout: bool = 2,
            /// Auxiliary X output to FIFO
            aux_xout: bool = 3,
            /// Gyro Z output to FIFO
            gyro_zout: bool = 4,
            /// Gyro Y output to FIFO
            gyro_yout: bool = 5,
            /// Gyro X output to FIFO
            gyro_xout: bool = 6,
            /// Temperature output to FIFO
            temp_out: bool = 7,
        },

        /// FIFO_EN2 - Auxiliary FIFO selection (0x13)
        register FifoEn2 {
            const ADDRESS = 0x13;
            const SIZE_BITS = 8;

            fifo_en_2: uint = 0..8,
        },

        /// AUX_SLV_ADDR - Accelerometer slave address for passthrough reads (0x14)
        register AuxSlvAddr {
            const ADDRESS = 0x14;
            const SIZE_BITS = 8;

            /// 7-bit slave address
            aux_id: uint = 0..7,
            /// Drive the reference clock on CLKOUT
            clkout_en: bool = 7,
        },

        /// SMPLRT_DIV - Sample rate divider (0x15)
        /// Sample rate = internal rate / (divider + 1)
        register SmplrtDiv {
            const ADDRESS = 0x15;
            const SIZE_BITS = 8;

            smplrt_div: uint = 0..8,
        },

        /// DLPF_FS_SYNC - Low pass filter, full scale and external sync (0x16)
        register DlpfFsSync {
            const ADDRESS = 0x16;
            const SIZE_BITS = 8;

            /// Digital low pass filter configuration
            dlpf_cfg: uint = 0..3,
            /// Full scale range select
            fs_sel: uint = 3..5,
            /// External sync input routing
            ext_sync_set: uint = 5..8,
        },

        /// INT_CFG - Interrupt configuration (0x17)
        register IntCfg {
            const ADDRESS = 0x17;
            const SIZE_BITS = 8;

            int_cfg: uint = 0..8,
        },

        /// AUX_BURST_ADDR - First accelerometer data register for passthrough bursts (0x18)
        register AuxBurstAddr {
            const ADDRESS = 0x18;
            const SIZE_BITS = 8;

            aux_burst_addr: uint = 0..8,
        },

        /// DMP_CFG_1 - Digital motion processor configuration 1 (0x35)
        register DmpCfg1 {
            const ADDRESS = 0x35;
            const SIZE_BITS = 8;

            dmp_cfg_1: uint = 0..8,
        },

        /// DMP_CFG_2 - Digital motion processor configuration 2 (0x36)
        register DmpCfg2 {
            const ADDRESS = 0x36;
            const SIZE_BITS = 8;

            dmp_cfg_2: uint = 0..8,
        },

        /// BANK_SEL - Memory bank selection (0x37)
        register BankSel {
            const ADDRESS = 0x37;
            const SIZE_BITS = 8;

            bank_sel: uint = 0..8,
        },

        /// MEM_START_ADDR - Start address within the selected memory bank (0x38)
        register MemStartAddr {
            const ADDRESS = 0x38;
            const SIZE_BITS = 8;

            mem_start_addr: uint = 0..8,
        },

        /// USER_CTRL - User control (0x3D)
        register UserCtrl {
            const ADDRESS = 0x3D;
            const SIZE_BITS = 8;

            /// Gyro signal path reset
            gyro_rst: bool = 0,
            /// FIFO reset
            fifo_rst: bool = 1,
            /// DMP reset
            dmp_rst: bool = 2,
            /// Auxiliary interface reset
            aux_if_rst: bool = 3,
            reserved_4: uint = 4..5,
            /// Auxiliary interface enable (passthrough reads of the accelerometer)
            aux_if_en: bool = 5,
            /// FIFO enable
            fifo_en: bool = 6,
            /// DMP enable
            dmp_en: bool = 7,
        },

        /// PWR_MGM - Power management (0x3E)
        register PwrMgm {
            const ADDRESS = 0x3E;
            const SIZE_BITS = 8;

            /// Clock source select
            clk_sel: uint = 0..3,
            /// Gyro Z standby
            stby_zg: bool = 3,
            /// Gyro Y standby
            stby_yg: bool = 4,
            /// Gyro X standby
            stby_xg: bool = 5,
            /// Sleep mode
            sleep: bool = 6,
            /// Hardware reset
            h_reset: bool = 7,
        },
    }
);

/// Start of the temperature compensation offsets (X, Y, Z, one byte each)
pub const XG_OFFS_TC: u8 = 0x05;

/// Start of the user offset registers (X, Y, Z as big-endian `i16`)
pub const X_OFFS_USRH: u8 = 0x0C;

/// Temperature output, big-endian `i16`
pub const TEMP_OUT_H: u8 = 0x1B;

/// Start of the gyroscope outputs (X, Y, Z as big-endian `i16`)
pub const GYRO_XOUT_H: u8 = 0x1D;

/// Start of the auxiliary (accelerometer passthrough) outputs
pub const AUX_XOUT_H: u8 = 0x23;

/// Memory read/write port
pub const MEM_R_W: u8 = 0x39;

/// FIFO byte count, big-endian `u16`
pub const FIFO_COUNTH: u8 = 0x3A;

/// FIFO read port
pub const FIFO_R: u8 = 0x3C;

/// `PWR_MGM` standby bits for all three gyro axes
pub const GYRO_STANDBY_MASK: u8 = 0x38;
