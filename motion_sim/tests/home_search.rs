//! Home-search strategies against a simulated axis with real switches.

mod common;

use common::{Rig, limited, stepper};
use motion_common::error::ErrorKind;
use motion_common::motor::{HomeSearchType, HomeSwitch};
use motion_common::status::{MotorStatus, MoveFlags};
use motion_core::motor::Motor;
use motion_sim::SimAxisConfig;

fn homing(rig: &Rig, axis: SimAxisConfig, strategy: HomeSearchType) -> Motor {
    let mut config = stepper(&axis.name);
    config.home_search = strategy;
    rig.axis(axis);
    rig.motor(&config)
}

fn physical(rig: &Rig, name: &str) -> f64 {
    rig.controller
        .with_named(name, |axis, _| Ok(axis.physical_position()))
        .unwrap()
}

#[test]
fn test_halfway_between_symmetric_limits() {
    let rig = Rig::new();
    let mut motor = homing(&rig, limited("m"), HomeSearchType::HalfwayBetweenLimitSwitches);

    motor.home_search(1, MoveFlags::empty()).unwrap();

    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert_eq!(physical(&rig, "m"), 0.0);
    assert_eq!(rig.controller.commanded("m").unwrap(), vec![0.0]);
    assert!(motor.home_search_succeeded().unwrap());
}

#[test]
fn test_halfway_between_asymmetric_limits() {
    let rig = Rig::new();
    let axis = SimAxisConfig::new("m").with_limit_switches(-30.0, 70.0);
    let mut motor = homing(&rig, axis, HomeSearchType::HalfwayBetweenLimitSwitches);

    motor.home_search(-1, MoveFlags::empty()).unwrap();

    assert_eq!(physical(&rig, "m"), 20.0);
    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert!(motor.home_search_succeeded().unwrap());
}

#[test]
fn test_halfway_fails_on_drive_fault() {
    let rig = Rig::new();
    let mut motor = homing(&rig, limited("m"), HomeSearchType::HalfwayBetweenLimitSwitches);
    rig.controller.inject_fault("m", MotorStatus::FOLLOWING_ERROR).unwrap();

    let err = motor.home_search(1, MoveFlags::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceActionFailed);
    assert!(err.message().contains("without hitting a limit switch"));
    assert!(!motor.home_search_succeeded().unwrap());
}

#[test]
fn test_raw_home_command_zeroes_on_switch() {
    let rig = Rig::new();
    let axis = SimAxisConfig {
        home_switch: 15.0,
        ..limited("m")
    };
    let mut motor = homing(&rig, axis, HomeSearchType::RawHomeCommand);

    motor.home_search(1, MoveFlags::empty()).unwrap();

    assert_eq!(physical(&rig, "m"), 15.0);
    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert!(motor.home_search_succeeded().unwrap());
    assert!((rig.elapsed() - 1.5).abs() < 0.02);
}

#[test]
fn test_same_direction_limit_then_home() {
    let rig = Rig::new();
    let axis = SimAxisConfig {
        home_switch: 15.0,
        ..limited("m")
    };
    let mut motor = homing(&rig, axis, HomeSearchType::SameDirLimitThenRawHome);

    // Limit at 50, push off to 40, then the home search passes the
    // positive limit once more before reversing onto the switch.
    motor.home_search(1, MoveFlags::empty()).unwrap();

    assert_eq!(physical(&rig, "m"), 15.0);
    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert!(motor.home_search_succeeded().unwrap());
}

#[test]
fn test_opposite_limit_then_limit_as_home() {
    let rig = Rig::new();
    let mut motor = homing(
        &rig,
        limited("m"),
        HomeSearchType::OppositeDirLimitThenLimitAsHome,
    );

    motor.home_search(1, MoveFlags::empty()).unwrap();

    assert_eq!(physical(&rig, "m"), 50.0);
    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert!(motor.home_search_succeeded().unwrap());
    let bound = rig
        .controller
        .with_named("m", |axis, _| Ok(axis.home_switch()))
        .unwrap();
    assert_eq!(bound, HomeSwitch::HomeInput);
    assert_eq!(motor.state().home_switch, HomeSwitch::HomeInput);
}

#[test]
fn test_nowait_limit_as_home_restores_binding_on_wait() {
    let rig = Rig::new();
    let mut motor = homing(
        &rig,
        limited("m"),
        HomeSearchType::OppositeDirLimitThenLimitAsHome,
    );

    motor.home_search(1, MoveFlags::NOWAIT).unwrap();
    assert!(motor.is_busy().unwrap());
    let bound = rig
        .controller
        .with_named("m", |axis, _| Ok(axis.home_switch()))
        .unwrap();
    assert_eq!(bound, HomeSwitch::PositiveLimit);

    motor.wait_for_motor_stop(MoveFlags::IGNORE_LIMIT_SWITCHES).unwrap();
    assert_eq!(physical(&rig, "m"), 50.0);
    assert_eq!(motor.get_position().unwrap(), 0.0);
    let bound = rig
        .controller
        .with_named("m", |axis, _| Ok(axis.home_switch()))
        .unwrap();
    assert_eq!(bound, HomeSwitch::HomeInput);
    assert!(!motor.home_search_succeeded().unwrap());
}

#[test]
fn test_special_home_search() {
    let rig = Rig::new();
    let axis = SimAxisConfig {
        home_switch: -5.0,
        ..limited("m")
    };
    let mut motor = homing(&rig, axis, HomeSearchType::Special);

    motor.home_search(-1, MoveFlags::empty()).unwrap();

    assert_eq!(physical(&rig, "m"), -5.0);
    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert!(motor.home_search_succeeded().unwrap());
}

#[test]
fn test_nowait_home_is_not_latched() {
    let rig = Rig::new();
    let axis = SimAxisConfig {
        home_switch: 10.0,
        ..limited("m")
    };
    let mut motor = homing(&rig, axis, HomeSearchType::RawHomeCommand);

    motor.home_search(1, MoveFlags::NOWAIT).unwrap();
    assert!(motor.is_busy().unwrap());

    rig.advance(2.0);
    assert!(!motor.is_busy().unwrap());
    assert_eq!(motor.get_position().unwrap(), 0.0);
    assert!(!motor.home_search_succeeded().unwrap());
}

#[test]
fn test_missing_home_slot_is_unsupported() {
    let rig = Rig::new();
    let mut config = stepper("m");
    config.home_search = HomeSearchType::Special;
    rig.axis(limited("m"));
    let mut motor = rig.masked_motor(&config, motion_sim::Capabilities::SPECIAL_HOME_SEARCH);

    let err = motor.home_search(1, MoveFlags::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}
