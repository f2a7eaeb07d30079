// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Persisted calibration and the procedures that produce it.
//!
//! ## Store layout
//!
//! | Slot | Key | Value |
//! | ---- | --- | ----- |
//! | 0 | `0x1300` | [`FLASH_WRITE_KEY`] when the record is valid |
//! | 1-4 | `1301..=1304` | input 1 type, min, mid, max |
//! | 5-8 | `1305..=1308` | input 2 type, min, mid, max |
//! | 9 | `1309` | current limit `i_max` |
//! | 10 | `1310` | speed limit `n_max` |
//!
//! Keys 1-10 are decimal. Signed values are stored as their `u16` bit pattern.
//!
//! ## Procedures
//!
//! Both procedures are driven one tick at a time by the main loop and never block:
//!
//! - [`PowerButton`] classifies presses of the power button into power off, input calibration and
//!   limit adjustment.
//! - [`Calibrator`] runs input calibration (track min/mid/max, then auto-detect the input type) or
//!   limit adjustment (pots select current and speed limits).

use crate::config::{A2BIT_CONV, FLASH_WRITE_KEY, I_MOT_MAX, N_MOT_MAX};
use crate::control::deadband::DETECT_THRESHOLD;
use crate::control::{DeadbandProfile, InputType, LowPass, RawChannel};
use crate::error::StoreError;
use crate::fixed::FilterCoef;

/// Store keys, indexed by slot.
pub const KEYS: [u16; 11] = [
    0x1300, 1301, 1302, 1303, 1304, 1305, 1306, 1307, 1308, 1309, 1310,
];

const SLOT_WRITE_KEY: usize = 0;
const SLOT_INPUT1: usize = 1;
const SLOT_INPUT2: usize = 5;
const SLOT_I_MAX: usize = 9;
const SLOT_N_MAX: usize = 10;

/// Speed above which calibration requests are ignored.
pub const CALIBRATION_MAX_SPEED: i16 = 5;

/// Ticks of input calibration before it finishes on its own (20 s at 5 ms).
pub const INPUT_CAL_TICKS: u16 = 4000;

/// Ticks of limit adjustment before it finishes on its own (10 s at 5 ms).
pub const LIMIT_CAL_TICKS: u16 = 2000;

/// Ticks the power button must be held for a long press (5 s at 5 ms).
pub const LONG_PRESS_TICKS: u16 = 1000;

/// Ticks between the end of a long press and the second-press check (1 s at 5 ms).
pub const SETTLE_TICKS: u16 = 200;

/// Key/value persistence, e.g. emulated EEPROM in flash.
pub trait CalibrationStore {
    fn read(&self, key: u16) -> Option<u16>;
    fn write(&mut self, key: u16, value: u16) -> Result<(), StoreError>;
}

/// Fixed-capacity store in RAM.
#[derive(Clone, Debug)]
pub struct MemoryStore<const N: usize> {
    entries: [Option<(u16, u16)>; N],
    read_only: bool,
}

impl<const N: usize> Default for MemoryStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MemoryStore<N> {
    pub const fn new() -> Self {
        Self {
            entries: [None; N],
            read_only: false,
        }
    }

    /// Make every write fail.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> CalibrationStore for MemoryStore<N> {
    fn read(&self, key: u16) -> Option<u16> {
        self.entries
            .iter()
            .flatten()
            .find(|(k, _)| *k == key)
            .map(|&(_, v)| v)
    }

    fn write(&mut self, key: u16, value: u16) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::WriteFailed { key });
        }
        let slot = match self.entries.iter().position(|e| matches!(e, Some((k, _)) if *k == key)) {
            Some(i) => i,
            None => self
                .entries
                .iter()
                .position(Option::is_none)
                .ok_or(StoreError::Full)?,
        };
        self.entries[slot] = Some((key, value));
        Ok(())
    }
}

/// Everything that survives a power cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredCalibration {
    pub input1: DeadbandProfile,
    pub input2: DeadbandProfile,
    /// Current limit, `fixdt(1,16,4)` in ADC counts.
    pub i_max: i16,
    /// Speed limit, `fixdt(1,16,4)` in rpm.
    pub n_max: i16,
}

impl StoredCalibration {
    /// Resolve `Auto` input types against their calibrated ranges.
    pub fn resolved(mut self) -> Self {
        self.input1 = self.input1.resolved(DETECT_THRESHOLD);
        self.input2 = self.input2.resolved(DETECT_THRESHOLD);
        self
    }
}

fn read_profile<S: CalibrationStore>(
    store: &S,
    slot: usize,
    fallback: DeadbandProfile,
) -> Option<DeadbandProfile> {
    let kind = InputType::try_from(store.read(KEYS[slot])?).ok()?;
    let profile = DeadbandProfile {
        kind,
        deadband: fallback.deadband,
        min: store.read(KEYS[slot + 1])? as i16,
        mid: store.read(KEYS[slot + 2])? as i16,
        max: store.read(KEYS[slot + 3])? as i16,
    }
    .resolved(DETECT_THRESHOLD);
    profile.validate().ok()?;
    Some(profile)
}

/// Load the stored calibration, falling back to `defaults`.
///
/// The record is adopted only when the write key matches. An input whose stored profile does not
/// validate keeps its default.
pub fn load<S: CalibrationStore>(store: &S, defaults: StoredCalibration) -> StoredCalibration {
    let defaults = defaults.resolved();

    if store.read(KEYS[SLOT_WRITE_KEY]) != Some(FLASH_WRITE_KEY) {
        crate::log_info!("no stored calibration, using defaults");
        return defaults;
    }

    let input1 = read_profile(store, SLOT_INPUT1, defaults.input1).unwrap_or_else(|| {
        crate::log_warn!("stored input1 calibration rejected");
        defaults.input1
    });
    let input2 = read_profile(store, SLOT_INPUT2, defaults.input2).unwrap_or_else(|| {
        crate::log_warn!("stored input2 calibration rejected");
        defaults.input2
    });

    let limit = |slot: usize, default: i16| match store.read(KEYS[slot]).map(|v| v as i16) {
        Some(v) if v > 0 => v,
        _ => default,
    };

    let cal = StoredCalibration {
        input1,
        input2,
        i_max: limit(SLOT_I_MAX, defaults.i_max),
        n_max: limit(SLOT_N_MAX, defaults.n_max),
    };
    crate::log_info!("calibration loaded: i_max={} n_max={}", cal.i_max, cal.n_max);
    cal
}

/// Persist `cal`. The write key goes last, so a partial save is never adopted.
pub fn save<S: CalibrationStore>(store: &mut S, cal: &StoredCalibration) -> Result<(), StoreError> {
    for (slot, p) in [(SLOT_INPUT1, &cal.input1), (SLOT_INPUT2, &cal.input2)] {
        store.write(KEYS[slot], u16::from(p.kind))?;
        store.write(KEYS[slot + 1], p.min as u16)?;
        store.write(KEYS[slot + 2], p.mid as u16)?;
        store.write(KEYS[slot + 3], p.max as u16)?;
    }
    store.write(KEYS[SLOT_I_MAX], cal.i_max as u16)?;
    store.write(KEYS[SLOT_N_MAX], cal.n_max as u16)?;
    store.write(KEYS[SLOT_WRITE_KEY], FLASH_WRITE_KEY)?;
    crate::log_info!("calibration saved");
    Ok(())
}

// ================================================================================================
// Power button
// ================================================================================================

/// Decision taken on a power button sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Button held past the long-press threshold (beep).
    LongPress,
    /// Short press.
    PowerOff,
    /// Long press, no second press.
    CalibrateInputs,
    /// Long press followed by a second press.
    AdjustLimits,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum ButtonState {
    #[default]
    Idle,
    Held(u16),
    Settle(u16),
    SecondPress,
}

/// Power button sequence classifier.
#[derive(Copy, Clone, Debug, Default)]
pub struct PowerButton {
    state: ButtonState,
}

impl PowerButton {
    pub const fn new() -> Self {
        Self {
            state: ButtonState::Idle,
        }
    }

    /// A sequence is in progress; motors stay disabled meanwhile.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.state != ButtonState::Idle
    }

    /// Sample the button once per tick.
    pub fn update(&mut self, pressed: bool) -> Option<ButtonEvent> {
        let (next, event) = match self.state {
            ButtonState::Idle if pressed => (ButtonState::Held(0), None),
            ButtonState::Idle => (ButtonState::Idle, None),
            ButtonState::Held(n) if pressed => {
                let n = n.saturating_add(1);
                let event = (n == LONG_PRESS_TICKS).then_some(ButtonEvent::LongPress);
                (ButtonState::Held(n), event)
            }
            ButtonState::Held(n) if n >= LONG_PRESS_TICKS => (ButtonState::Settle(0), None),
            ButtonState::Held(_) => (ButtonState::Idle, Some(ButtonEvent::PowerOff)),
            ButtonState::Settle(n) if n + 1 < SETTLE_TICKS => (ButtonState::Settle(n + 1), None),
            ButtonState::Settle(_) if pressed => (ButtonState::SecondPress, None),
            ButtonState::Settle(_) => (ButtonState::Idle, Some(ButtonEvent::CalibrateInputs)),
            ButtonState::SecondPress if pressed => (ButtonState::SecondPress, None),
            ButtonState::SecondPress => (ButtonState::Idle, Some(ButtonEvent::AdjustLimits)),
        };

        self.state = next;
        if let Some(e) = event {
            crate::log_info!("power button: {:?}", e);
        }
        event
    }
}

// ================================================================================================
// Calibrator
// ================================================================================================

/// Which procedure to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationKind {
    InputLimits,
    CurrentSpeedLimits,
}

/// Result of a finished procedure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationOutcome {
    Inputs {
        input1: DeadbandProfile,
        input2: DeadbandProfile,
    },
    Limits {
        i_max: Option<i16>,
        n_max: Option<i16>,
    },
}

#[derive(Copy, Clone, Debug)]
struct RangeTracker {
    filt: LowPass,
    min: i16,
    mid: i16,
    max: i16,
}

impl RangeTracker {
    fn new(coef: FilterCoef, raw: i16) -> Self {
        Self {
            filt: LowPass::with_value(coef, raw),
            min: i16::MAX,
            mid: 0,
            max: i16::MIN,
        }
    }

    fn update(&mut self, raw: i16) {
        self.filt.update(i32::from(raw));
        self.mid = self.filt.output();
        self.min = self.min.min(self.mid);
        self.max = self.max.max(self.mid);
    }

    /// Accept the detected type if it matches what is configured (or configured is auto).
    fn finish(&self, configured: InputType, current: DeadbandProfile) -> DeadbandProfile {
        let detected = InputType::detect(self.min, self.mid, self.max, DETECT_THRESHOLD);
        if detected == configured || configured == InputType::Auto {
            DeadbandProfile {
                kind: detected,
                deadband: current.deadband,
                min: self.min,
                mid: self.mid,
                max: self.max,
            }
        } else {
            crate::log_warn!("detected {:?}, configured {:?}: input disabled", detected, configured);
            DeadbandProfile {
                kind: InputType::Disabled,
                ..current
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum CalState {
    Idle,
    Inputs {
        ticks: u16,
        in1: RangeTracker,
        in2: RangeTracker,
    },
    Limits {
        ticks: u16,
        filt1: LowPass,
        filt2: LowPass,
    },
}

/// Tick-driven calibration procedures.
#[derive(Copy, Clone, Debug)]
pub struct Calibrator {
    state: CalState,
    coef: FilterCoef,
}

impl Calibrator {
    pub const fn new(coef: FilterCoef) -> Self {
        Self {
            state: CalState::Idle,
            coef,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self.state, CalState::Idle)
    }

    /// Begin a procedure. Refused while the vehicle moves or another one runs.
    pub fn start(&mut self, kind: CalibrationKind, raw: RawChannel, speed_avg_abs: i16) -> bool {
        if self.is_active() {
            return false;
        }
        if speed_avg_abs > CALIBRATION_MAX_SPEED {
            crate::log_warn!("calibration refused, speed {}", speed_avg_abs);
            return false;
        }

        self.state = match kind {
            CalibrationKind::InputLimits => CalState::Inputs {
                ticks: 0,
                in1: RangeTracker::new(self.coef, raw.input1),
                in2: RangeTracker::new(self.coef, raw.input2),
            },
            CalibrationKind::CurrentSpeedLimits => CalState::Limits {
                ticks: 0,
                filt1: LowPass::with_value(self.coef, raw.input1),
                filt2: LowPass::with_value(self.coef, raw.input2),
            },
        };
        crate::log_info!("{:?} calibration started", kind);
        true
    }

    /// Advance by one tick. Finishes on a button press or when the time runs out.
    ///
    /// `current` is the calibration in use and `configured` the input types the board was built
    /// for (may be `Auto`).
    pub fn tick(
        &mut self,
        raw: RawChannel,
        button: bool,
        current: &StoredCalibration,
        configured: [InputType; 2],
    ) -> Option<CalibrationOutcome> {
        match &mut self.state {
            CalState::Idle => None,
            CalState::Inputs { ticks, in1, in2 } => {
                if !button && *ticks < INPUT_CAL_TICKS {
                    *ticks += 1;
                    in1.update(raw.input1);
                    in2.update(raw.input2);
                    return None;
                }
                let outcome = CalibrationOutcome::Inputs {
                    input1: in1.finish(configured[0], current.input1),
                    input2: in2.finish(configured[1], current.input2),
                };
                self.state = CalState::Idle;
                crate::log_info!("input calibration done: {:?}", outcome);
                Some(outcome)
            }
            CalState::Limits {
                ticks,
                filt1,
                filt2,
            } => {
                if !button && *ticks < LIMIT_CAL_TICKS {
                    *ticks += 1;
                    filt1.update(i32::from(raw.input1));
                    filt2.update(i32::from(raw.input2));
                    return None;
                }
                let cur = factor(filt1.state().to_bits(), &current.input1, 6553);
                let spd = factor(filt2.state().to_bits(), &current.input2, 3276);

                let i_max = (current.input1.kind != InputType::Disabled)
                    .then(|| ((I_MOT_MAX * A2BIT_CONV * cur) >> 12) as i16);
                let n_max = (current.input2.kind != InputType::Disabled)
                    .then(|| ((N_MOT_MAX * spd) >> 12) as i16);

                let outcome = CalibrationOutcome::Limits { i_max, n_max };
                self.state = CalState::Idle;
                crate::log_info!("limit adjustment done: {:?}", outcome);
                Some(outcome)
            }
        }
    }
}

/// Pot position within its calibrated range as `fixdt(0,16,16)`, clamped to `[floor, 65535]`.
fn factor(filtered: i32, profile: &DeadbandProfile, floor: i32) -> i32 {
    let offset = i64::from(filtered) - (i64::from(profile.min) << 16);
    let span = i64::from(profile.max) - i64::from(profile.min);
    let ratio = offset.checked_div(span).unwrap_or(0);
    ratio.clamp(i64::from(floor), 65535) as i32
}
