//! Unit tests for the gyroscope self-test

use crate::common::test_utils::assert_float_eq;
use crate::common::{GYRO_ADDRESS, MockBus, MockDelay, create_initialized_cluster};
use mpu3050::self_test::{
    EXPECTED_PACKETS, GyroSamples, MAX_SAMPLES, timing_tolerance, window_accepted,
};
use mpu3050::{Error, PowerState, SelfTestConfig, SelfTestFlags, SensorMask};

/// Alternating 0/1 samples: alive, quiet and unbiased
fn quiet_window(packets: usize) -> Vec<[i16; 3]> {
    (0..packets)
        .map(|i| {
            let v = (i % 2) as i16;
            [v, v, v]
        })
        .collect()
}

fn script_windows(bus: &MockBus, packets: [usize; 3]) {
    for count in packets {
        bus.push_fifo_window(quiet_window(count));
    }
}

#[test]
fn test_timing_tolerance() {
    assert_eq!(timing_tolerance(EXPECTED_PACKETS), 4);
    assert!(window_accepted(75, EXPECTED_PACKETS));
    assert!(window_accepted(72, EXPECTED_PACKETS));
    assert!(window_accepted(79, EXPECTED_PACKETS));
    assert!(window_accepted(71, EXPECTED_PACKETS));
    assert!(!window_accepted(70, EXPECTED_PACKETS));
    assert!(!window_accepted(80, EXPECTED_PACKETS));
    assert!(!window_accepted(60, EXPECTED_PACKETS));
}

#[test]
fn test_config_validation() {
    assert_eq!(SelfTestConfig::default().windows().unwrap(), 1);
    assert_eq!(SelfTestConfig::new(2400).windows().unwrap(), 4);
    assert!(SelfTestConfig::new(0).windows().is_err());
    assert!(SelfTestConfig::new(700).windows().is_err());
    assert!(SelfTestConfig::new(3000).windows().is_err());
}

#[test]
fn test_invalid_duration_touches_nothing() {
    let (mut cluster, bus) = create_initialized_cluster();

    let result = cluster.self_test(&SelfTestConfig::new(700), &mut MockDelay);
    assert!(matches!(result, Err(Error::InvalidConfig)));
    assert!(bus.operations().is_empty());
    assert!(cluster.last_self_test().is_none());
}

#[test]
fn test_dead_sensor_detected() {
    let mut samples = GyroSamples::new();
    for _ in 0..75 {
        assert!(samples.push([5, -7, 0]));
    }

    let result = samples.evaluate(0, SelfTestFlags::empty());
    assert!(result.flags.contains(SelfTestFlags::DEAD_SENSOR));
    assert_eq!(result.bias, [5, -7, 0]);
    assert_eq!(result.rms_sq, [0, 0, 0]);
    assert!(!result.passed());
}

#[test]
fn test_noise_detected_per_axis() {
    let mut samples = GyroSamples::new();
    for i in 0..76 {
        let noisy = if i % 2 == 0 { 100 } else { -100 };
        let quiet = (i % 2) as i16;
        samples.push([noisy, quiet, noisy]);
    }

    let result = samples.evaluate(0, SelfTestFlags::empty());
    assert!(result.flags.contains(SelfTestFlags::NOISE_X));
    assert!(!result.flags.contains(SelfTestFlags::NOISE_Y));
    assert!(result.flags.contains(SelfTestFlags::NOISE_Z));
    assert!(!result.flags.contains(SelfTestFlags::DEAD_SENSOR));
    assert_eq!(result.rms_sq[0], 10_000);
    assert_float_eq(result.rms_dps()[0], 100.0 / 16.384, 0.001);
}

#[test]
fn test_sample_capacity() {
    let mut samples = GyroSamples::new();
    for _ in 0..MAX_SAMPLES {
        assert!(samples.push([1, 2, 3]));
    }
    assert!(!samples.push([1, 2, 3]));
    assert_eq!(samples.len(), MAX_SAMPLES);
}

#[test]
fn test_full_run_passes() {
    let (mut cluster, bus) = create_initialized_cluster();
    bus.set_temperature(-13200);
    script_windows(&bus, [75, 75, 75]);

    let result = cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    assert!(result.passed(), "flags: {:#06x}", result.flags.bits());
    assert!(!result.is_partial());
    assert_eq!(result.sample_count, 225);
    assert_eq!(result.bias, [0, 0, 0]);
    assert_eq!(result.temperature_raw, -13200);
    assert_float_eq(result.temperature_celsius(), 35.0, 0.01);
    assert_eq!(cluster.last_self_test(), Some(result));

    // Test settings: divider 7, 42 Hz filter at ±2000 °/s
    assert!(bus.writes_to(GYRO_ADDRESS, 0x15).contains(&vec![7]));
    assert!(bus.writes_to(GYRO_ADDRESS, 0x16).contains(&vec![0x1B]));

    // One pass per axis on that axis' PLL
    let power = bus.writes_to(GYRO_ADDRESS, 0x3E);
    let clocks: Vec<u8> = power
        .iter()
        .filter_map(|data| data.first().copied())
        .filter(|v| (1..=3).contains(v))
        .collect();
    assert!(
        clocks.windows(3).any(|w| w == [1, 2, 3]),
        "clock sequence: {clocks:?}"
    );
}

#[test]
fn test_boundary_window_accepted() {
    let (mut cluster, bus) = create_initialized_cluster();
    script_windows(&bus, [72, 79, 75]);

    let result = cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    assert!(!result.is_partial());
    assert_eq!(result.sample_count, 72 + 79 + 75);
}

#[test]
fn test_timing_failure_is_partial() {
    let (mut cluster, bus) = create_initialized_cluster();
    script_windows(&bus, [75, 60, 75]);

    let result = cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    assert!(result.flags.contains(SelfTestFlags::TIMING_Y));
    assert!(!result.flags.contains(SelfTestFlags::TIMING_X));
    assert!(!result.flags.contains(SelfTestFlags::TIMING_Z));
    assert!(result.is_partial());
    assert!(!result.passed());
    assert_eq!(result.sample_count, 150);
}

#[test]
fn test_empty_fifo_flags_every_axis() {
    let (mut cluster, _bus) = create_initialized_cluster();

    let result = cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    let timing = SelfTestFlags::TIMING_X | SelfTestFlags::TIMING_Y | SelfTestFlags::TIMING_Z;
    assert!(result.flags.contains(timing));
    assert_eq!(result.sample_count, 0);
}

#[test]
fn test_multiple_windows_per_axis() {
    let (mut cluster, bus) = create_initialized_cluster();
    for _ in 0..6 {
        bus.push_fifo_window(quiet_window(75));
    }

    let result = cluster.self_test(&SelfTestConfig::new(1200), &mut MockDelay).unwrap();
    assert!(result.passed());
    assert_eq!(result.sample_count, 450);
    assert_eq!(bus.fifo_len(), 0);
}

#[test]
fn test_restores_suspended_cluster() {
    let (mut cluster, bus) = create_initialized_cluster();
    script_windows(&bus, [75, 75, 75]);

    cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    assert!(cluster.suspend_state().gyro);
    assert!(cluster.gyro_needs_reset());
}

#[test]
fn test_restores_active_gyro() {
    let (mut cluster, bus) = create_initialized_cluster();
    assert!(
        cluster
            .transition(SensorMask::GYRO, PowerState::Active, &mut MockDelay)
            .is_ok()
    );
    script_windows(&bus, [75, 75, 75]);
    bus.clear_operations();

    cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    assert!(!cluster.suspend_state().gyro);
    assert!(!cluster.gyro_needs_reset());

    // Stored configuration reprogrammed after the test values
    assert_eq!(bus.writes_to(GYRO_ADDRESS, 0x15).last(), Some(&vec![0]));
    assert_eq!(bus.register(GYRO_ADDRESS, 0x17), 0x10);
}

#[test]
fn test_restores_sensors_outside_requested_mask() {
    let (mut cluster, bus) = create_initialized_cluster();
    cluster.set_requested_sensors(SensorMask::ACCEL);
    assert!(
        cluster
            .transition(
                SensorMask::GYRO | SensorMask::ACCEL | SensorMask::COMPASS,
                PowerState::Active,
                &mut MockDelay,
            )
            .is_ok()
    );
    let before = cluster.suspend_state();
    assert!(!before.gyro && !before.accel && !before.compass);
    assert!(before.pressure);
    script_windows(&bus, [75, 75, 75]);

    cluster.self_test(&SelfTestConfig::default(), &mut MockDelay).unwrap();
    assert_eq!(cluster.suspend_state(), before);
    assert!(!cluster.gyro_needs_reset());
}

#[test]
fn test_failed_run_restores_previous_state() {
    let (mut cluster, bus) = create_initialized_cluster();
    cluster.set_requested_sensors(SensorMask::GYRO | SensorMask::COMPASS);
    assert!(
        cluster
            .transition(SensorMask::COMPASS, PowerState::Active, &mut MockDelay)
            .is_ok()
    );
    let before = cluster.suspend_state();
    // Let the wake-up read through, fail the first FIFO read
    bus.fail_read_after(GYRO_ADDRESS, 1);

    assert!(matches!(
        cluster.self_test(&SelfTestConfig::default(), &mut MockDelay),
        Err(Error::Bus(_))
    ));
    bus.clear_failures();
    assert_eq!(cluster.suspend_state(), before);
}
