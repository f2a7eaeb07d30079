// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pedal-driven hovercar: brake double tap, reverse, limit adjustment and its persistence.

use hovercar::calibration::{
    CalibrationStore, MemoryStore, KEYS, LONG_PRESS_TICKS, SETTLE_TICKS,
};
use hovercar::config::{InputSource, DELAY_IN_MAIN_LOOP, FLASH_WRITE_KEY};
use hovercar::control::{MultiTapConfig, RawChannel};
use hovercar::{Config, DriveCore, MotorCommand, TickInputs};

const BRAKE_REST: i16 = -50;
const BRAKE_PRESS: i16 = 800;

struct Bench {
    core: DriveCore,
    now_ms: u32,
}

impl Bench {
    fn new(cfg: Config) -> Self {
        Self {
            core: DriveCore::new(cfg).unwrap(),
            now_ms: 0,
        }
    }

    fn tick(&mut self, brake: i16, throttle: i16, power_button: bool) -> MotorCommand {
        let out = self.core.tick(&TickInputs {
            analog: Some(RawChannel {
                input1: brake,
                input2: throttle,
            }),
            power_button,
            now_ms: self.now_ms,
            ..TickInputs::default()
        });
        self.now_ms += DELAY_IN_MAIN_LOOP;
        out
    }

    fn hold(&mut self, brake: i16, throttle: i16, ticks: usize) -> MotorCommand {
        let mut out = MotorCommand::default();
        for _ in 0..ticks {
            out = self.tick(brake, throttle, false);
        }
        out
    }

    /// One brake tap: 50 ms pressed, 50 ms released.
    fn tap(&mut self) -> MotorCommand {
        self.hold(BRAKE_PRESS, 0, 10);
        self.hold(BRAKE_REST, 0, 10)
    }
}

fn analog(taps: u8) -> Config {
    Config {
        input_source: InputSource::Analog,
        multi_tap: MultiTapConfig::default().taps(taps),
        ..Config::default()
    }
}

#[test]
fn double_tap_reverses_and_single_tap_does_not() {
    let mut bench = Bench::new(analog(2));
    assert!(!bench.tap().reverse);
    bench.hold(BRAKE_REST, 0, 500);
    assert!(!bench.tap().reverse);

    let mut bench = Bench::new(analog(2));
    bench.tap();
    assert!(bench.tap().reverse);

    // Another double tap switches back
    bench.hold(BRAKE_REST, 0, 10);
    bench.tap();
    assert!(!bench.tap().reverse);
}

#[test]
fn triple_tap_config_needs_three() {
    let mut bench = Bench::new(analog(3));
    bench.tap();
    assert!(!bench.tap().reverse);
    assert!(bench.tap().reverse);
}

#[test]
fn throttle_drives_backwards_in_reverse() {
    let mut bench = Bench::new(analog(2));
    let out = bench.hold(BRAKE_REST, 500, 200);
    assert!(out.wheels.left > 400);

    let mut bench = Bench::new(analog(2));
    bench.tap();
    bench.tap();
    let out = bench.hold(BRAKE_REST, 500, 200);
    assert!(out.reverse);
    assert!(out.wheels.left < -400);
    assert_eq!(out.wheels.left, out.wheels.right);
}

#[test]
fn brake_cuts_throttle_at_standstill() {
    let mut bench = Bench::new(analog(2));
    bench.hold(BRAKE_REST, 500, 200);
    let out = bench.hold(BRAKE_PRESS, 500, 200);
    assert_eq!(bench.core.commands(), (0, 0));
    assert!(out.brake_pressed);
    assert!(out.wheels.left.abs() < 5);
}

#[test]
fn limit_adjustment_is_saved_and_reloaded() {
    let cfg = analog(2);
    let mut bench = Bench::new(cfg);

    // Long press, release, second press at the end of the settle window
    for _ in 0..=LONG_PRESS_TICKS {
        assert!(!bench.tick(BRAKE_REST, 0, true).enable);
    }
    for _ in 0..SETTLE_TICKS {
        bench.tick(BRAKE_REST, 0, false);
    }
    bench.tick(BRAKE_REST, 0, true);
    bench.tick(1000, 500, false);
    assert!(bench.core.is_calibrating());

    // Pots at full current, half speed; button ends the adjustment
    for _ in 0..100 {
        assert!(!bench.tick(1000, 500, false).enable);
    }
    bench.tick(1000, 500, true);
    assert!(!bench.core.is_calibrating());
    assert_eq!(bench.core.calibration().i_max, 15199);
    assert_eq!(bench.core.calibration().n_max, 16376);

    // Motors stay off until the pedals are released
    assert!(!bench.tick(1000, 500, false).enable);
    assert!(bench.tick(BRAKE_REST, 0, false).enable);

    // Short press powers off; the new limits are written
    bench.tick(BRAKE_REST, 0, true);
    let out = bench.tick(BRAKE_REST, 0, false);
    assert!(out.power_off);

    let mut store = MemoryStore::<16>::new();
    assert_eq!(bench.core.save_calibration(&mut store), Ok(true));
    assert_eq!(store.read(KEYS[0]), Some(FLASH_WRITE_KEY));

    let reloaded = DriveCore::with_store(cfg, &store).unwrap();
    assert_eq!(reloaded.calibration(), bench.core.calibration());
    let out = Bench { core: reloaded, now_ms: 0 }.tick(BRAKE_REST, 0, false);
    assert_eq!((out.i_max, out.n_max), (15199, 16376));
}
