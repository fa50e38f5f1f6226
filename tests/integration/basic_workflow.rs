//! Integration tests for basic workflow scenarios

use crate::common::test_utils::assert_float_eq;
use crate::common::{
    ACCEL_ADDRESS, COMPASS_ADDRESS, GYRO_ADDRESS, MemoryStore, MockDelay, create_full_cluster,
    encode_accel,
};
use mpu3050::slaves::Kxtf9;
use mpu3050::{
    AccelData, CalibrationOffset, ConfigField, ConfigurationOutcome, SelfTestConfig, SensorMask,
    SlaveConfig, SlaveKind, SuspendState,
};

#[test]
fn test_complete_session_workflow() {
    let (mut cluster, bus) = create_full_cluster();
    let mut delay = MockDelay;
    let mut store = MemoryStore::with_offset(CalibrationOffset { x: 1, y: 1, z: 1 });

    // Identify and park the cluster
    cluster.init(&mut delay).unwrap();
    assert_eq!(cluster.suspend_state(), SuspendState::ALL_SUSPENDED);

    // Open a session and wake everything
    cluster.open_session(&mut store);
    assert_eq!(cluster.accel_offset(), CalibrationOffset { x: 1, y: 1, z: 1 });
    assert!(cluster.pm_resume(&mut delay).is_ok());
    assert_eq!(cluster.suspend_state(), SuspendState::default());

    // Read every sensor
    bus.set_gyro_data(10, -20, 30);
    bus.set_accel_bytes(encode_accel(100, -50, 1024));
    assert_eq!(cluster.read_gyro_raw().unwrap(), [10, -20, 30]);
    assert_eq!(
        cluster.read_accel().unwrap(),
        AccelData {
            x: 101,
            y: -49,
            z: 1025
        }
    );
    let mut compass = [0u8; 8];
    assert_eq!(cluster.read_compass(&mut compass).unwrap(), 7);

    // Reconfigure on the fly
    let outcome = cluster
        .set_field(ConfigField::Divider, 4, &mut delay)
        .unwrap();
    assert_eq!(outcome, ConfigurationOutcome::Reprogrammed);
    assert_eq!(bus.register(GYRO_ADDRESS, 0x15), 4);
    assert_eq!(cluster.suspend_state(), SuspendState::default());

    let range = SlaveConfig {
        key: Kxtf9::KEY_RANGE,
        apply: true,
        data: &[4],
    };
    cluster
        .configure_slave(SlaveKind::Accelerometer, &range)
        .unwrap();
    // Still operating, now at 4 g
    assert_eq!(bus.register(ACCEL_ADDRESS, 0x1B), 0xC8);

    // Recalibrate while stationary
    bus.set_accel_bytes(encode_accel(3, -4, 5));
    let offset = cluster.calibrate(true, &mut store, &mut delay).unwrap();
    assert_eq!(offset, CalibrationOffset { x: 3, y: -4, z: 5 });
    assert_eq!(store.stored, Some(offset));
    assert_eq!(cluster.suspend_state(), SuspendState::default());

    // Self-test and return to the session state
    for _ in 0..3 {
        bus.push_fifo_window(
            (0..75)
                .map(|i| {
                    let v = (i % 2) as i16;
                    [v, v, v]
                })
                .collect(),
        );
    }
    let result = cluster
        .self_test(&SelfTestConfig::default(), &mut delay)
        .unwrap();
    assert!(result.passed());
    assert_eq!(cluster.suspend_state(), SuspendState::default());
    assert_eq!(bus.register(GYRO_ADDRESS, 0x15), 4);

    // System sleep and wake
    assert!(cluster.pm_suspend(&mut delay).is_ok());
    assert_eq!(cluster.suspend_state(), SuspendState::ALL_SUSPENDED);
    assert_eq!(bus.register(COMPASS_ADDRESS, 0x0A), 0x00);
    assert!(cluster.pm_resume(&mut delay).is_ok());
    assert_eq!(cluster.suspend_state(), SuspendState::default());

    // Close and release the bus
    assert!(cluster.close_session(&mut delay).is_ok());
    assert_eq!(cluster.suspend_state(), SuspendState::ALL_SUSPENDED);
    let _bus = cluster.release();
}

#[test]
fn test_partial_session_only_wakes_requested() {
    let (mut cluster, bus) = create_full_cluster();
    let mut delay = MockDelay;
    let mut store = MemoryStore::default();

    cluster.init(&mut delay).unwrap();
    cluster.open_session(&mut store);
    cluster.set_requested_sensors(SensorMask::GYRO | SensorMask::ACCEL);
    bus.clear_operations();

    assert!(cluster.pm_resume(&mut delay).is_ok());
    let state = cluster.suspend_state();
    assert!(!state.gyro && !state.accel);
    assert!(state.compass && state.pressure);
    assert!(bus.first_operation_index(COMPASS_ADDRESS).is_none());

    let temp = cluster.read_temperature_celsius(&mut delay).unwrap();
    assert_float_eq(temp, mpu3050::device::raw_to_celsius(0), 0.001);
}
