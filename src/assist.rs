// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Driving assists layered on top of the conditioned command.
//!
//! Cruise control and standstill hold both work by asking the motor controller to track a speed
//! target, so they share one `engaged` flag. Each one's activation checks that flag, which is what
//! keeps the two from ever being active at the same time:
//!
//! - cruise activates only while nothing is engaged,
//! - standstill hold activates only while nothing is engaged,
//! - cruise refuses to disengage while standstill hold owns the flag.

use crate::error::{ConfigError, Result};
use crate::fixed::{sat16, Blend};

/// Cruise control and standstill hold.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Assist {
    engaged: bool,
    cruise: bool,
    standstill: bool,
    target: i16,
}

impl Assist {
    pub const fn new() -> Self {
        Self {
            engaged: false,
            cruise: false,
            standstill: false,
            target: 0,
        }
    }

    /// Speed tracking requested by either assist.
    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    #[inline]
    pub fn is_cruise_active(&self) -> bool {
        self.cruise
    }

    #[inline]
    pub fn is_standstill_active(&self) -> bool {
        self.standstill
    }

    /// Speed target the motor controller should track while engaged.
    #[inline]
    pub fn target(&self) -> i16 {
        self.target
    }

    /// Toggle cruise control on a button pulse.
    ///
    /// Activation latches `n_mot` as the target. Deactivation is refused while standstill hold is
    /// active.
    pub fn cruise_control(&mut self, pulse: bool, n_mot: i16) {
        if !pulse {
            return;
        }

        if !self.engaged {
            self.target = n_mot;
            self.engaged = true;
            self.cruise = true;
            crate::log_info!("cruise on, target {}", n_mot);
        } else if !self.standstill {
            self.engaged = false;
            self.cruise = false;
            crate::log_info!("cruise off");
        }
    }

    /// Hold the vehicle at zero speed when it is (nearly) stopped.
    ///
    /// `cmd1` is the brake, `cmd2` the throttle.
    pub fn standstill_hold(&mut self, cmd1: i16, cmd2: i16, speed_avg_abs: i16) {
        if !self.engaged {
            let braking = (cmd1 > 50 || cmd2 < -50) && speed_avg_abs < 30;
            let idle = cmd2 < 20 && speed_avg_abs < 5;
            if braking || idle {
                self.target = 0;
                self.engaged = true;
                self.standstill = true;
                crate::log_debug!("standstill hold on");
            }
        } else if cmd1 < 20 && cmd2 > 50 && !self.cruise {
            self.engaged = false;
            self.standstill = false;
            crate::log_debug!("standstill hold off");
        }
    }
}

/// Electric brake applied when the throttle is released.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ElectricBrake {
    /// Brake strength with the throttle fully released, `(0, 500]`.
    pub max: i16,
    /// Throttle level below which the brake starts to engage.
    pub thres: i16,
}

impl Default for ElectricBrake {
    fn default() -> Self {
        Self { max: 100, thres: 10 }
    }
}

impl ElectricBrake {
    pub fn validate(&self, input_max: i16) -> Result<()> {
        if self.max <= 0 || self.max > 500 {
            return Err(ConfigError::ElectricBrakeStrength(self.max));
        }
        if self.thres <= 0 || self.thres >= input_max {
            return Err(ConfigError::ElectricBrakeThreshold(self.thres));
        }
        Ok(())
    }

    /// Blend the brake into the throttle command.
    ///
    /// The brake opposes the direction of motion (flipped again when driving in reverse) and
    /// scales with `speed_blend` so it fades out at standstill. Four regions keyed by `thres`,
    /// where `b` is the brake term (negative while moving forward, positive while moving back):
    ///
    /// | `cmd2` | `b < 0` | `b > 0` |
    /// | ------ | ------- | ------- |
    /// | `[0, thres)` | `b` fading to zero as `cmd2` rises | full `b` |
    /// | `[-thres, 0)` | full `b` | `b` fading to zero as `cmd2` falls |
    /// | `>= thres` | throttle rescaled to start at zero, at least `b` | same |
    /// | `< -thres` | throttle rescaled to start at zero, at most `b` | same |
    pub fn apply(
        &self,
        cmd2: i16,
        speed_blend: Blend,
        speed_avg: i16,
        reverse: bool,
        input_min: i16,
        input_max: i16,
    ) -> i16 {
        let max = i32::from(self.max);
        let blend = i32::from(speed_blend.to_bits());
        let mut brake = if speed_avg > 0 {
            (-max * blend) >> 15
        } else {
            (max * blend) >> 15
        };
        if reverse {
            brake = -brake;
        }

        let cmd = i32::from(cmd2);
        let t = i32::from(self.thres);
        let (imin, imax) = (i32::from(input_min), i32::from(input_max));
        let div = |num: i32, den: i32| num.checked_div(den).unwrap_or(0);

        let out = if cmd >= 0 && cmd < t {
            brake.max(div((t - cmd) * brake, t))
        } else if cmd >= -t && cmd < 0 {
            brake.min(div((t + cmd) * brake, t))
        } else if cmd >= t {
            brake.max(div((cmd - t) * imax, imax - t))
        } else {
            brake.min(div((cmd + t) * imin, imin + t))
        };

        sat16(out)
    }
}

/// Speed dependent blend factor, `fixdt(0,16,15)`.
///
/// Zero below `|speed| = 10`, rising linearly to one at 60.
pub fn speed_blend(speed_avg_abs: i16) -> Blend {
    let v = (i32::from(speed_avg_abs).clamp(10, 60) - 10) << 15;
    Blend::from_bits((v / 50) as u16)
}

/// Scale a command by a blend factor.
#[inline]
pub fn scale(cmd: i16, blend: Blend) -> i16 {
    sat16((i32::from(cmd) * i32::from(blend.to_bits())) >> 15)
}

/// Turn a brake pedal value into a command opposing the direction of motion.
///
/// Goes to zero as the vehicle stops so braking never turns into reversing.
pub fn brake_command(cmd1: i16, blend: Blend, speed_avg: i16) -> i16 {
    let b = i32::from(blend.to_bits());
    let c = i32::from(cmd1);
    let v = if speed_avg > 0 {
        (-c * b) >> 15
    } else {
        (c * b) >> 15
    };
    sat16(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: Blend = Blend::from_bits(32768);

    #[test]
    fn cruise_latches_target_and_toggles_off() {
        let mut a = Assist::new();
        a.cruise_control(false, 300);
        assert!(!a.is_cruise_active());

        a.cruise_control(true, 300);
        assert!(a.is_cruise_active() && a.is_engaged());
        assert_eq!(a.target(), 300);

        a.cruise_control(true, 500);
        assert!(!a.is_cruise_active() && !a.is_engaged());
    }

    #[test]
    fn standstill_activates_when_braking_slowly() {
        let mut a = Assist::new();
        a.standstill_hold(100, 0, 25);
        assert!(a.is_standstill_active());
        assert_eq!(a.target(), 0);

        // Brake released and throttle pressed
        a.standstill_hold(10, 100, 0);
        assert!(!a.is_standstill_active() && !a.is_engaged());
    }

    #[test]
    fn standstill_activates_on_idle_throttle_at_rest() {
        let mut a = Assist::new();
        a.standstill_hold(0, 10, 10);
        assert!(!a.is_standstill_active());
        a.standstill_hold(0, 10, 4);
        assert!(a.is_standstill_active());
    }

    #[test]
    fn cruise_blocks_standstill_and_standstill_blocks_cruise_release() {
        let mut a = Assist::new();
        a.cruise_control(true, 0);
        a.standstill_hold(100, 0, 0);
        assert!(a.is_cruise_active() && !a.is_standstill_active());

        let mut b = Assist::new();
        b.standstill_hold(100, 0, 0);
        b.cruise_control(true, 200);
        assert!(b.is_standstill_active() && !b.is_cruise_active());
        assert_eq!(b.target(), 0);
    }

    #[test]
    fn speed_blend_ramps_between_10_and_60() {
        assert_eq!(speed_blend(0).to_bits(), 0);
        assert_eq!(speed_blend(10).to_bits(), 0);
        assert_eq!(speed_blend(35).to_bits(), 16384);
        assert_eq!(speed_blend(60).to_bits(), 32768);
        assert_eq!(speed_blend(i16::MAX).to_bits(), 32768);
    }

    #[test]
    fn electric_brake_regions() {
        let eb = ElectricBrake { max: 100, thres: 10 };
        let apply = |cmd2| eb.apply(cmd2, FULL, 100, false, -1000, 1000);

        assert_eq!(apply(0), -100);
        assert_eq!(apply(5), -50);
        assert_eq!(apply(10), 0);
        assert_eq!(apply(500), 494);
        assert_eq!(apply(1000), 1000);
        assert_eq!(apply(-5), -100);
        assert_eq!(apply(-10), -100);
        assert_eq!(apply(-500), -494);
        assert_eq!(apply(-1000), -1000);
    }

    #[test]
    fn electric_brake_opposes_motion_and_honours_reverse() {
        let eb = ElectricBrake { max: 100, thres: 10 };
        assert_eq!(eb.apply(0, FULL, -100, false, -1000, 1000), 100);
        assert_eq!(eb.apply(5, FULL, -100, false, -1000, 1000), 100);
        assert_eq!(eb.apply(-5, FULL, -100, false, -1000, 1000), 50);
        assert_eq!(eb.apply(-10, FULL, -100, false, -1000, 1000), 0);
        assert_eq!(eb.apply(0, FULL, 100, true, -1000, 1000), 100);
        assert_eq!(eb.apply(0, Blend::ZERO, 100, false, -1000, 1000), 0);
    }

    #[test]
    fn electric_brake_threshold_must_be_inside_range() {
        assert!(ElectricBrake { max: 100, thres: 10 }.validate(1000).is_ok());
        assert!(ElectricBrake { max: 100, thres: 0 }.validate(1000).is_err());
        assert!(ElectricBrake { max: 100, thres: 1000 }.validate(1000).is_err());
    }

    #[test]
    fn electric_brake_strength_must_be_positive_and_bounded() {
        assert!(ElectricBrake { max: 500, thres: 10 }.validate(1000).is_ok());
        assert_eq!(
            ElectricBrake { max: 0, thres: 10 }.validate(1000),
            Err(ConfigError::ElectricBrakeStrength(0))
        );
        assert_eq!(
            ElectricBrake { max: -400, thres: 10 }.validate(1000),
            Err(ConfigError::ElectricBrakeStrength(-400))
        );
        assert_eq!(
            ElectricBrake { max: 501, thres: 10 }.validate(1000),
            Err(ConfigError::ElectricBrakeStrength(501))
        );
    }

    #[test]
    fn brake_command_opposes_motion() {
        assert_eq!(brake_command(400, FULL, 50), -400);
        assert_eq!(brake_command(400, FULL, -50), 400);
        assert_eq!(brake_command(400, Blend::from_bits(16384), 50), -200);
        assert_eq!(scale(800, Blend::from_bits(16384)), 400);
    }
}
