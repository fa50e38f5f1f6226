//! Unit tests for slave driver capability dispatch

use crate::common::{
    ACCEL_ADDRESS, COMPASS_ADDRESS, MockDelay, PRESSURE_ADDRESS, create_initialized_cluster,
    create_mock_cluster,
};
use mpu3050::slaves::{AK8975_DATA_LEN, Kxtf9, Kxtf9Range};
use mpu3050::{Error, PowerState, SensorMask, SlaveConfig, SlaveKind};

#[test]
fn test_kxtf9_configure_and_report_range() {
    let (mut cluster, bus) = create_initialized_cluster();

    let config = SlaveConfig {
        key: Kxtf9::KEY_RANGE,
        apply: true,
        data: &[8],
    };
    cluster
        .configure_slave(SlaveKind::Accelerometer, &config)
        .unwrap();

    // PC1 cleared, RES set, GSEL = 8 g
    assert_eq!(bus.writes_to(ACCEL_ADDRESS, 0x1B), vec![vec![0x50]]);
    assert_eq!(bus.writes_to(ACCEL_ADDRESS, 0x21), vec![vec![0x02]]);

    let mut out = [0u8; 4];
    let len = cluster
        .get_slave_configuration(SlaveKind::Accelerometer, Kxtf9::KEY_RANGE, &mut out)
        .unwrap();
    assert_eq!(len, 1);
    assert_eq!(out[0], Kxtf9Range::G8.g());
}

#[test]
fn test_kxtf9_deferred_setting_applied_on_resume() {
    let (mut cluster, bus) = create_initialized_cluster();

    let config = SlaveConfig {
        key: Kxtf9::KEY_ODR,
        apply: false,
        data: &[0x04],
    };
    cluster
        .configure_slave(SlaveKind::Accelerometer, &config)
        .unwrap();
    assert!(bus.operations().is_empty());

    assert!(
        cluster
            .transition(SensorMask::ACCEL, PowerState::Active, &mut MockDelay)
            .is_ok()
    );
    assert_eq!(bus.register(ACCEL_ADDRESS, 0x21), 0x04);
    // Operating with 2 g range
    assert_eq!(bus.register(ACCEL_ADDRESS, 0x1B), 0xC0);
}

#[test]
fn test_kxtf9_ignores_invalid_setting() {
    let (mut cluster, bus) = create_initialized_cluster();

    let config = SlaveConfig {
        key: Kxtf9::KEY_RANGE,
        apply: true,
        data: &[3],
    };
    cluster
        .configure_slave(SlaveKind::Accelerometer, &config)
        .unwrap();
    assert!(bus.operations().is_empty());

    let mut out = [0u8; 1];
    let len = cluster
        .get_slave_configuration(SlaveKind::Accelerometer, 99, &mut out)
        .unwrap();
    assert_eq!(len, 0);
}

#[test]
fn test_missing_capability_is_success() {
    let (mut cluster, bus) = create_initialized_cluster();

    // AK8975 has no configuration keys
    let config = SlaveConfig {
        key: 1,
        apply: true,
        data: &[1],
    };
    cluster.configure_slave(SlaveKind::Compass, &config).unwrap();
    let mut out = [0u8; 4];
    assert_eq!(
        cluster
            .get_slave_configuration(SlaveKind::Compass, 1, &mut out)
            .unwrap(),
        0
    );

    // The mock pressure sensor cannot suspend or resume
    let report = cluster.transition(SensorMask::PRESSURE, PowerState::Active, &mut MockDelay);
    assert!(report.is_ok());
    assert!(!cluster.suspend_state().pressure);
    assert!(bus.first_operation_index(PRESSURE_ADDRESS).is_none());
}

#[test]
fn test_absent_slot_is_success() {
    let (mut cluster, bus) = create_mock_cluster();
    cluster.init(&mut MockDelay).unwrap();
    bus.clear_operations();

    let config = SlaveConfig {
        key: 1,
        apply: true,
        data: &[1],
    };
    cluster.configure_slave(SlaveKind::Pressure, &config).unwrap();

    let mut out = [0u8; 8];
    assert_eq!(
        cluster
            .get_slave_configuration(SlaveKind::Accelerometer, 1, &mut out)
            .unwrap(),
        0
    );
    assert_eq!(cluster.read_compass(&mut out).unwrap(), 0);
    assert_eq!(cluster.read_pressure(&mut out).unwrap(), 0);
    assert!(cluster.slave_platform_data(SlaveKind::Compass).is_none());
    assert!(bus.operations().is_empty());
}

#[test]
fn test_compass_read_triggers_next_measurement() {
    let (mut cluster, bus) = create_initialized_cluster();
    bus.set_register(COMPASS_ADDRESS, 0x03, 0x34);
    bus.set_register(COMPASS_ADDRESS, 0x04, 0x12);

    let mut data = [0u8; 8];
    let len = cluster.read_compass(&mut data).unwrap();
    assert_eq!(len, AK8975_DATA_LEN);
    assert_eq!(data[0], 0x01);
    assert_eq!(&data[1..3], &[0x34, 0x12]);
    assert_eq!(bus.writes_to(COMPASS_ADDRESS, 0x0A), vec![vec![0x01]]);
}

#[test]
fn test_short_buffer_reads_nothing() {
    let (mut cluster, bus) = create_initialized_cluster();

    let mut data = [0u8; 2];
    assert_eq!(cluster.read_compass(&mut data).unwrap(), 0);
    assert_eq!(cluster.read_pressure(&mut data).unwrap(), 0);
    assert!(bus.operations().is_empty());
}

#[test]
fn test_pressure_read() {
    let (mut cluster, bus) = create_initialized_cluster();
    bus.set_register(PRESSURE_ADDRESS, 0xF6, 0xAA);
    bus.set_register(PRESSURE_ADDRESS, 0xF7, 0xBB);
    bus.set_register(PRESSURE_ADDRESS, 0xF8, 0xCC);

    let mut data = [0u8; 3];
    assert_eq!(cluster.read_pressure(&mut data).unwrap(), 3);
    assert_eq!(data, [0xAA, 0xBB, 0xCC]);
}

#[test]
fn test_slave_bus_error_propagates() {
    let (mut cluster, bus) = create_initialized_cluster();
    bus.fail_address(COMPASS_ADDRESS);

    let mut data = [0u8; 8];
    assert!(matches!(cluster.read_compass(&mut data), Err(Error::Bus(_))));
}
