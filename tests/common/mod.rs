//! Common test utilities and mock implementations


pub use mock_interface::{
    ACCEL_ADDRESS, COMPASS_ADDRESS, GYRO_ADDRESS, MockBus, MockError, Operation, PRESSURE_ADDRESS,
};
pub use test_utils::{
    MemoryStore, MockDelay, MockPressure, create_full_cluster, create_initialized_cluster,
    create_mock_cluster, encode_accel, gyro_was_reset,
};
