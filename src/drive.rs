// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Per-tick drive core.
//!
//! [`DriveCore`] owns every piece of control state and turns one tick of inputs into one
//! [`MotorCommand`]. Serial links are fed from the receive interrupt through
//! [`DriveCore::poll_control`] and [`DriveCore::poll_sideboard`]; [`DriveCore::tick`] runs once per
//! main loop period.
//!
//! Tick order:
//!
//! 1. average speed from the measured motor speeds
//! 2. raw input read, supervisor tick
//! 3. power button / calibration procedures (motors disabled while they run)
//! 4. deadband, safe state override, cruise button
//! 5. sideboard sensors, standstill hold
//! 6. hovercar pedal shaping, electric brake
//! 7. rate limit, low-pass, mix

use crate::assist::{self, Assist};
use crate::calibration::{
    self, ButtonEvent, CalibrationKind, CalibrationOutcome, CalibrationStore, Calibrator,
    PowerButton, StoredCalibration,
};
use crate::config::{Config, InputSource, Variant};
use crate::control::mixer::average_speed;
use crate::control::{
    ConditioningPipeline, Conditioned, InputLimits, Mixer, MultiTap, RawChannel, WheelPair,
};
use crate::debug::Scope;
use crate::error::{Result, StoreError};
use crate::fixed::sat16;
use crate::protocol::{ControlLink, SerialLink, SideboardFeedback};
use crate::sideboard::SideboardSensors;
use crate::supervisor::{ControlMode, ControlType, Supervisor};

/// Brake pedal level reported as pressed.
const BRAKE_PRESSED: i16 = 50;
/// Brake pedal level that cuts the throttle.
const BRAKE_CUTS_THROTTLE: i16 = 30;
/// Multi-tap detection only runs below this speed.
const MULTI_TAP_MAX_SPEED: i16 = 60;
/// Both commands must be below this before motors are re-enabled.
const ENABLE_MAX_CMD: i16 = 50;

/// Everything sampled by the main loop for one tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct TickInputs {
    /// Measured speed of the left motor in rpm.
    pub n_left: i16,
    /// Measured speed of the right motor in rpm.
    pub n_right: i16,
    /// Fresh ADC sample when the input source is analog.
    pub analog: Option<RawChannel>,
    pub power_button: bool,
    /// Cruise control button level (acts on the rising edge).
    pub cruise_button: bool,
    /// Milliseconds since boot.
    pub now_ms: u32,
}

/// Output of one tick, handed to the motor controller.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorCommand {
    pub wheels: WheelPair,
    pub mode: ControlMode,
    pub ctrl_type: ControlType,
    pub field_weakening: bool,
    /// Speed tracking requested by cruise control or standstill hold.
    pub speed_hold: bool,
    /// Speed target while `speed_hold` is set.
    pub speed_target: i16,
    pub i_max: i16,
    pub n_max: i16,
    pub brake_pressed: bool,
    pub reverse: bool,
    pub enable: bool,
    /// Release the power latch. Persist calibration first.
    pub power_off: bool,
}

/// Control state of the whole board.
#[derive(Clone, Debug)]
pub struct DriveCore {
    cfg: Config,
    supervisor: Supervisor,
    control: Option<ControlLink>,
    sideboard: Option<SerialLink<SideboardFeedback>>,
    sensors: SideboardSensors,
    pipeline: ConditioningPipeline,
    assist: Assist,
    brake_tap: MultiTap,
    power: PowerButton,
    calibrator: Calibrator,
    calibration: StoredCalibration,
    calibration_dirty: bool,
    await_release: bool,
    limits: InputLimits,
    ctrl_mode: ControlMode,
    ctrl_type: ControlType,
    field_weakening: bool,
    raw: RawChannel,
    cmd: (i16, i16),
    wheels: WheelPair,
    speed_avg: i16,
    cruise_button_prev: bool,
    enable: bool,
    power_off: bool,
}

impl DriveCore {
    /// Build with the compiled-in calibration.
    pub fn new(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let calibration = cfg.stored_defaults().resolved();
        Ok(Self::build(cfg, calibration))
    }

    /// Build with calibration loaded from `store`.
    pub fn with_store<S: CalibrationStore>(cfg: Config, store: &S) -> Result<Self> {
        cfg.validate()?;
        let calibration = calibration::load(store, cfg.stored_defaults());
        Ok(Self::build(cfg, calibration))
    }

    fn build(cfg: Config, calibration: StoredCalibration) -> Self {
        let mut supervisor = Supervisor::new(cfg.serial_timeout, cfg.input_timeout);
        let control = match cfg.input_source {
            InputSource::Serial { protocol, channel } => {
                supervisor = supervisor.with_channel(channel);
                Some(ControlLink::new(protocol, channel))
            }
            InputSource::Analog => None,
        };
        if let Some(ch) = cfg.sideboard {
            supervisor = supervisor.with_channel(ch);
        }

        let mixer = Mixer::new(cfg.mixer, cfg.speed_coef, cfg.steer_coef);
        crate::log_info!("drive core up, {:?} variant", cfg.variant);

        Self {
            supervisor,
            control,
            sideboard: cfg.sideboard.map(SerialLink::new),
            sensors: SideboardSensors::new(),
            pipeline: ConditioningPipeline::new(cfg.rate, cfg.filter, mixer),
            assist: Assist::new(),
            brake_tap: MultiTap::new(cfg.multi_tap),
            power: PowerButton::new(),
            calibrator: Calibrator::new(cfg.filter),
            calibration,
            calibration_dirty: false,
            await_release: false,
            limits: InputLimits::new(cfg.field_weakening),
            ctrl_mode: cfg.ctrl_mode,
            ctrl_type: cfg.ctrl_type,
            field_weakening: cfg.field_weakening,
            raw: RawChannel::default(),
            cmd: (0, 0),
            wheels: WheelPair::ZERO,
            speed_avg: 0,
            cruise_button_prev: false,
            enable: true,
            power_off: false,
            cfg,
        }
    }

    // --------------------------------------------------------------------------------------------
    // Receive side
    // --------------------------------------------------------------------------------------------

    /// Check the control link's receive ring. `pos` is the DMA write position.
    pub fn poll_control(&mut self, ring: &[u8], pos: usize) -> bool {
        match &mut self.control {
            Some(link) => link.poll(ring, pos, &mut self.supervisor),
            None => false,
        }
    }

    /// Check the sideboard link's receive ring.
    pub fn poll_sideboard(&mut self, ring: &[u8], pos: usize) -> bool {
        match &mut self.sideboard {
            Some(link) => link.poll(ring, pos, &mut self.supervisor),
            None => false,
        }
    }

    // --------------------------------------------------------------------------------------------
    // Tick
    // --------------------------------------------------------------------------------------------

    pub fn tick(&mut self, input: &TickInputs) -> MotorCommand {
        self.speed_avg = average_speed(
            self.cfg.mixer,
            input.n_left,
            input.n_right,
            self.cfg.speed_coef,
        );
        let speed_abs = self.speed_avg.saturating_abs();

        self.read_input(input.analog);
        let is_unsafe = self.supervisor.tick();

        if self.power_off || !self.run_procedures(input.power_button, speed_abs) {
            return self.halted();
        }

        // Deadband
        let mut cmd1 = self.calibration.input1.apply(self.raw.input1, self.limits.min, self.limits.max);
        let mut cmd2 = self.calibration.input2.apply(self.raw.input2, self.limits.min, self.limits.max);
        let brake_pressed = cmd1 > BRAKE_PRESSED;

        if is_unsafe {
            cmd1 = 0;
            cmd2 = 0;
        }

        if !self.enable {
            if cmd1.abs() >= ENABLE_MAX_CMD || cmd2.abs() >= ENABLE_MAX_CMD {
                return self.halted();
            }
            self.pipeline.reset();
            self.enable = true;
            crate::log_info!("motors enabled");
        }

        // Buttons
        let cruise_pulse = input.cruise_button && !self.cruise_button_prev;
        self.cruise_button_prev = input.cruise_button;
        if self.cfg.cruise_control {
            self.assist.cruise_control(cruise_pulse, input.n_left);
        }
        self.sideboard_sensors(input.n_left);

        if self.cfg.standstill_hold {
            self.assist.standstill_hold(cmd1, cmd2, speed_abs);
        }

        let blend = assist::speed_blend(speed_abs);
        let hovercar = self.cfg.variant == Variant::Hovercar;

        if hovercar {
            if speed_abs < MULTI_TAP_MAX_SPEED {
                self.brake_tap.update(cmd1, input.now_ms);
            }
            if cmd1 > BRAKE_CUTS_THROTTLE {
                cmd2 = assist::scale(cmd2, blend);
                if self.cfg.cruise_control {
                    // Any brake touch cancels cruise
                    self.assist.cruise_control(self.assist.is_engaged(), input.n_left);
                }
            }
        }

        let reverse = self.brake_tap.is_toggled();
        if let Some(eb) = self.cfg.electric_brake {
            cmd2 = eb.apply(cmd2, blend, self.speed_avg, reverse, self.limits.min, self.limits.max);
        }

        if hovercar {
            cmd1 = assist::brake_command(cmd1, blend, self.speed_avg);
        }

        self.cmd = (cmd1, cmd2);
        let mut cond = self.pipeline.condition(cmd1, cmd2);

        if hovercar {
            let speed = if reverse {
                i32::from(cond.steer) - i32::from(cond.speed)
            } else {
                i32::from(cond.steer) + i32::from(cond.speed)
            };
            cond = Conditioned {
                steer: 0,
                speed: sat16(speed),
            };
        }

        self.wheels = if is_unsafe {
            WheelPair::ZERO
        } else {
            self.pipeline.mix(cond, self.limits)
        };

        MotorCommand {
            wheels: self.wheels,
            brake_pressed,
            reverse,
            ..self.command()
        }
    }

    fn read_input(&mut self, analog: Option<RawChannel>) {
        match (&self.control, analog) {
            (Some(link), _) => {
                self.raw = link.inputs();
                self.supervisor.input_sampled();
            }
            (None, Some(sample)) => {
                self.raw = sample;
                self.supervisor.input_sampled();
            }
            (None, None) => {}
        }
    }

    /// Power button and calibration. Returns `false` while they keep the motors off.
    fn run_procedures(&mut self, pressed: bool, speed_abs: i16) -> bool {
        if self.calibrator.is_active() {
            let configured = self.cfg.configured_types();
            if let Some(outcome) = self.calibrator.tick(self.raw, pressed, &self.calibration, configured) {
                self.apply_outcome(outcome);
                self.await_release = pressed;
            }
            return false;
        }

        if self.await_release {
            if pressed {
                return false;
            }
            self.await_release = false;
        }

        match self.power.update(pressed) {
            Some(ButtonEvent::PowerOff) => {
                crate::log_warn!("power off requested");
                self.power_off = true;
                return false;
            }
            Some(ButtonEvent::CalibrateInputs) => {
                self.calibrator.start(CalibrationKind::InputLimits, self.raw, speed_abs);
            }
            Some(ButtonEvent::AdjustLimits) => {
                self.calibrator.start(CalibrationKind::CurrentSpeedLimits, self.raw, speed_abs);
            }
            Some(ButtonEvent::LongPress) | None => {}
        }

        if self.power.is_busy() || self.calibrator.is_active() {
            if self.enable {
                crate::log_info!("motors disabled");
            }
            self.enable = false;
            return false;
        }
        true
    }

    fn apply_outcome(&mut self, outcome: CalibrationOutcome) {
        match outcome {
            CalibrationOutcome::Inputs { input1, input2 } => {
                self.calibration.input1 = input1;
                self.calibration.input2 = input2;
                self.calibration_dirty = true;
            }
            CalibrationOutcome::Limits { i_max, n_max } => {
                if let Some(i) = i_max {
                    self.calibration.i_max = i;
                    self.calibration_dirty = true;
                }
                if let Some(n) = n_max {
                    self.calibration.n_max = n;
                    self.calibration_dirty = true;
                }
            }
        }
    }

    fn sideboard_sensors(&mut self, n_mot: i16) {
        let Some(link) = &self.sideboard else {
            return;
        };
        let events = self.sensors.update(link.active().sensors);

        if let Some(sel) = events.selection {
            if let Some(t) = sel.ctrl_type {
                self.ctrl_type = t;
            }
            if let Some(m) = sel.mode {
                self.ctrl_mode = m;
            }
        }

        if events.button2 {
            if self.cfg.cruise_control {
                self.assist.cruise_control(true, n_mot);
            } else {
                self.field_weakening = !self.field_weakening;
                self.limits = InputLimits::new(self.field_weakening);
                crate::log_info!("field weakening {}", self.field_weakening);
            }
        }
    }

    /// Motors off, filters untouched.
    fn halted(&mut self) -> MotorCommand {
        self.wheels = WheelPair::ZERO;
        MotorCommand {
            enable: false,
            ..self.command()
        }
    }

    /// Open in the safe state, speed while an assist holds the target, else the requested mode.
    fn mode(&self) -> ControlMode {
        let mode = self.supervisor.effective_mode(self.ctrl_mode);
        if self.assist.is_engaged() && !self.supervisor.is_unsafe() {
            ControlMode::Speed
        } else {
            mode
        }
    }

    fn command(&self) -> MotorCommand {
        MotorCommand {
            wheels: self.wheels,
            mode: self.mode(),
            ctrl_type: self.ctrl_type,
            field_weakening: self.field_weakening,
            speed_hold: self.assist.is_engaged(),
            speed_target: self.assist.target(),
            i_max: self.calibration.i_max,
            n_max: self.calibration.n_max,
            brake_pressed: false,
            reverse: self.brake_tap.is_toggled(),
            enable: self.enable && !self.power_off,
            power_off: self.power_off,
        }
    }

    // --------------------------------------------------------------------------------------------
    // Persistence
    // --------------------------------------------------------------------------------------------

    /// Write calibration changed since boot. Returns `Ok(false)` if there was nothing to write.
    pub fn save_calibration<S: CalibrationStore>(&mut self, store: &mut S) -> core::result::Result<bool, StoreError> {
        if !self.calibration_dirty {
            return Ok(false);
        }
        calibration::save(store, &self.calibration)?;
        self.calibration_dirty = false;
        crate::log_info!("calibration saved");
        Ok(true)
    }

    // --------------------------------------------------------------------------------------------
    // Accessors
    // --------------------------------------------------------------------------------------------

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn assist(&self) -> &Assist {
        &self.assist
    }

    pub fn calibration(&self) -> &StoredCalibration {
        &self.calibration
    }

    pub fn limits(&self) -> InputLimits {
        self.limits
    }

    pub fn raw(&self) -> RawChannel {
        self.raw
    }

    /// Commands after deadband and shaping, before the conditioning chain.
    pub fn commands(&self) -> (i16, i16) {
        self.cmd
    }

    pub fn speed_avg(&self) -> i16 {
        self.speed_avg
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_active()
    }

    /// Debug snapshot: raw inputs, commands, wheel outputs, average speed, mode.
    pub fn scope(&self) -> Scope {
        Scope::from_values([
            self.raw.input1,
            self.raw.input2,
            self.cmd.0,
            self.cmd.1,
            self.wheels.left,
            self.wheels.right,
            self.speed_avg,
            self.mode() as i16,
        ])
    }
}
