// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Signal conditioning chain: rate limit, low-pass, mix.
//!
//! ```text
//! cmd1 ──► RateLimiter ──► LowPass ──► steer ─┐
//!                                             ├─► Mixer ──► (left, right)
//! cmd2 ──► RateLimiter ──► LowPass ──► speed ─┘
//! ```
//!
//! The conditioning and mixing halves are exposed separately so a drive variant can recombine
//! `steer` and `speed` in between (the hovercar adds the brake pedal onto the throttle there).

use crate::control::filter::{LowPass, RateLimiter};
use crate::control::mixer::{InputLimits, Mixer, WheelPair};
use crate::fixed::{FilterCoef, Speed};

/// Filtered integer commands, before mixing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Conditioned {
    pub steer: i16,
    pub speed: i16,
}

/// Per-channel filter state plus the mixer.
#[derive(Copy, Clone, Debug)]
pub struct ConditioningPipeline {
    steer_rate: RateLimiter,
    speed_rate: RateLimiter,
    steer_filt: LowPass,
    speed_filt: LowPass,
    mixer: Mixer,
}

impl ConditioningPipeline {
    pub fn new(rate: Speed, filter: FilterCoef, mixer: Mixer) -> Self {
        Self {
            steer_rate: RateLimiter::new(rate),
            speed_rate: RateLimiter::new(rate),
            steer_filt: LowPass::new(filter),
            speed_filt: LowPass::new(filter),
            mixer,
        }
    }

    /// Rate limit and low-pass both commands.
    pub fn condition(&mut self, cmd1: i16, cmd2: i16) -> Conditioned {
        let steer_rate = self.steer_rate.update(cmd1);
        let speed_rate = self.speed_rate.update(cmd2);

        self.steer_filt.update(i32::from(steer_rate.to_int()));
        self.speed_filt.update(i32::from(speed_rate.to_int()));

        Conditioned {
            steer: self.steer_filt.output(),
            speed: self.speed_filt.output(),
        }
    }

    /// Mix integer speed and steer into wheel commands.
    pub fn mix(&self, cmd: Conditioned, limits: InputLimits) -> WheelPair {
        self.mixer
            .mix(Speed::from_int(cmd.speed), Speed::from_int(cmd.steer), limits)
    }

    /// Full chain without any recombination step.
    pub fn run(&mut self, cmd1: i16, cmd2: i16, limits: InputLimits) -> WheelPair {
        let cmd = self.condition(cmd1, cmd2);
        self.mix(cmd, limits)
    }

    pub fn reset(&mut self) {
        self.steer_rate.reset();
        self.speed_rate.reset();
        self.steer_filt.reset();
        self.speed_filt.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::mixer::MixerKind;
    use crate::fixed::MixCoef;

    fn pipeline(kind: MixerKind) -> ConditioningPipeline {
        ConditioningPipeline::new(
            Speed::from_bits(480),
            FilterCoef::from_bits(6553),
            Mixer::new(kind, MixCoef::from_bits(16384), MixCoef::from_bits(768)),
        )
    }

    #[test]
    fn step_input_ramps_up_and_settles() {
        let mut p = pipeline(MixerKind::Single);
        let limits = InputLimits::default();

        let first = p.run(0, 1000, limits);
        assert!(first.left > 0 && first.left < 30);

        let mut prev = first.left;
        for _ in 0..500 {
            let out = p.run(0, 1000, limits);
            assert!(out.left >= prev);
            assert_eq!(out.left, out.right);
            prev = out.left;
        }
        assert!((999..=1000).contains(&prev));
    }

    #[test]
    fn zero_input_stays_zero() {
        let mut p = pipeline(MixerKind::Differential);
        for _ in 0..50 {
            assert_eq!(p.run(0, 0, InputLimits::default()), WheelPair::ZERO);
        }
    }

    #[test]
    fn reset_clears_filter_history() {
        let mut p = pipeline(MixerKind::Single);
        for _ in 0..100 {
            p.run(0, 800, InputLimits::default());
        }
        p.reset();
        assert_eq!(p.condition(0, 0), Conditioned::default());
    }
}
