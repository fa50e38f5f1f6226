//! Unit tests for error handling and recovery

use crate::common::{
    GYRO_ADDRESS, MockBus, MockDelay, MockError, create_full_cluster, create_initialized_cluster,
    create_mock_cluster,
};
use mpu3050::{
    ConfigField, Error, I2C_ADDRESS_AD0_HIGH, PlatformData, PowerState, SensorCluster, SensorMask,
};

#[test]
fn test_init_rejects_wrong_identity() {
    let (mut cluster, bus) = create_mock_cluster();
    bus.set_who_am_i(0x00);

    let result = cluster.init(&mut MockDelay);
    assert!(matches!(result, Err(Error::InvalidDevice(0x00))));
}

#[test]
fn test_init_ignores_non_address_identity_bits() {
    let (mut cluster, bus) = create_mock_cluster();
    bus.set_who_am_i(0xE9);

    cluster.init(&mut MockDelay).unwrap();
    assert_eq!(cluster.read_who_am_i().unwrap(), 0x68);
}

#[test]
fn test_init_at_alternate_address() {
    let bus = MockBus::new();
    bus.set_register(I2C_ADDRESS_AD0_HIGH, 0x00, I2C_ADDRESS_AD0_HIGH);
    let platform = PlatformData {
        address: I2C_ADDRESS_AD0_HIGH,
        ..PlatformData::default()
    };
    let mut cluster = SensorCluster::new(bus.clone(), platform);

    cluster.init(&mut MockDelay).unwrap();
    assert_eq!(cluster.configuration().addr, I2C_ADDRESS_AD0_HIGH);
    assert!(bus.first_operation_index(GYRO_ADDRESS).is_none());
}

#[test]
fn test_init_bus_failure() {
    let (mut cluster, bus) = create_full_cluster();
    bus.fail_next_read();

    let result = cluster.init(&mut MockDelay);
    assert!(matches!(result, Err(Error::Bus(MockError::Communication))));
}

#[test]
fn test_read_failure_recovery() {
    let (mut cluster, bus) = create_initialized_cluster();
    bus.set_gyro_data(10, -20, 30);

    bus.fail_next_read();
    assert!(cluster.read_gyro_raw().is_err());

    let data = cluster.read_gyro_raw().unwrap();
    assert_eq!(data, [10, -20, 30]);
}

#[test]
fn test_failed_restart_keeps_configuration_pending() {
    let (mut cluster, bus) = create_initialized_cluster();
    assert!(
        cluster
            .transition(SensorMask::GYRO, PowerState::Active, &mut MockDelay)
            .is_ok()
    );
    bus.fail_address(GYRO_ADDRESS);

    let result = cluster.set_field(ConfigField::Divider, 3, &mut MockDelay);
    assert!(matches!(result, Err(Error::Bus(MockError::Nack))));
    assert_eq!(cluster.configuration().divider, 3);
    assert!(cluster.gyro_needs_reset());

    // Once the bus recovers the next resume programs the new divider
    bus.clear_failures();
    assert!(cluster.suspend_all(&mut MockDelay).is_ok());
    assert!(
        cluster
            .transition(SensorMask::GYRO, PowerState::Active, &mut MockDelay)
            .is_ok()
    );
    assert_eq!(bus.register(GYRO_ADDRESS, 0x15), 3);
}

#[test]
fn test_self_test_restores_after_bus_error() {
    let (mut cluster, bus) = create_initialized_cluster();
    // The first FIFO count read fails
    bus.fail_read_after(GYRO_ADDRESS, 1);

    let result = cluster.self_test(&mpu3050::SelfTestConfig::default(), &mut MockDelay);
    assert!(matches!(result, Err(Error::Bus(MockError::Communication))));
    assert!(cluster.last_self_test().is_none());
    assert!(cluster.suspend_state().gyro);
    assert!(cluster.gyro_needs_reset());
}

#[test]
fn test_error_debug_format() {
    let error: Error<MockError> = Error::CalibrationAborted {
        completed: 3,
        cause: None,
    };
    let text = format!("{error:?}");
    assert!(text.contains("CalibrationAborted"));
}
