// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Integer-only low-pass filter and rate limiter.
//!
//! Both work on caller-owned state and never allocate. The arithmetic matches the reference
//! fixed-point model bit for bit inside the representable range; outside it the results saturate.

use crate::fixed::{sat16, sat32, FilterCoef, FilterState, Speed};

/// Single-pole IIR low-pass step.
///
/// - `u`: new sample, plain integer
/// - `coef`: `fixdt(0,16,16)`, e.g. `0.1 * 2^16 = 6553`
/// - `y`: accumulator, `fixdt(1,32,16)`; the integer output is `y >> 16`
pub fn low_pass(u: i32, coef: FilterCoef, y: &mut FilterState) {
    let acc = y.to_bits();
    let err = (i64::from(u) << 4) - i64::from(acc >> 12);
    let step = sat32((err * i64::from(coef.to_bits())) >> 4);
    *y = FilterState::from_bits(step.saturating_add(acc));
}

/// Per-tick slew limit.
///
/// The target `u` is a plain integer; the state `y` is `fixdt(1,16,4)`. The output moves toward
/// `u << 4` by at most `rate` per call. `rate` must be non-negative.
pub fn rate_limit(u: i16, rate: Speed, y: &mut Speed) {
    let rate = i32::from(rate.to_bits());
    let prev = i32::from(y.to_bits());
    let mut delta = (i32::from(u) << 4) - prev;

    if delta > rate {
        delta = rate;
    } else if delta < -rate {
        delta = -rate;
    }

    *y = Speed::from_bits(sat16(prev + delta));
}

/// Low-pass filter with its own accumulator.
#[derive(Copy, Clone, Debug)]
pub struct LowPass {
    coef: FilterCoef,
    state: FilterState,
}

impl LowPass {
    pub const fn new(coef: FilterCoef) -> Self {
        Self {
            coef,
            state: FilterState::ZERO,
        }
    }

    /// Start from an already settled value instead of zero.
    pub fn with_value(coef: FilterCoef, value: i16) -> Self {
        Self {
            coef,
            state: FilterState::from_int(i32::from(value)),
        }
    }

    #[inline]
    pub fn update(&mut self, u: i32) -> FilterState {
        low_pass(u, self.coef, &mut self.state);
        self.state
    }

    #[inline]
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Integer part of the accumulator.
    #[inline]
    pub fn output(&self) -> i16 {
        self.state.to_int()
    }

    pub fn reset(&mut self) {
        self.state = FilterState::ZERO;
    }
}

/// Rate limiter with its own `fixdt(1,16,4)` state.
#[derive(Copy, Clone, Debug)]
pub struct RateLimiter {
    rate: Speed,
    state: Speed,
}

impl RateLimiter {
    pub const fn new(rate: Speed) -> Self {
        Self {
            rate,
            state: Speed::ZERO,
        }
    }

    #[inline]
    pub fn update(&mut self, u: i16) -> Speed {
        rate_limit(u, self.rate, &mut self.state);
        self.state
    }

    #[inline]
    pub fn state(&self) -> Speed {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = Speed::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COEF: FilterCoef = FilterCoef::from_bits(6553);

    #[test]
    fn low_pass_first_step_matches_reference() {
        let mut y = FilterState::ZERO;
        low_pass(100, COEF, &mut y);
        // ((100 << 4) * 6553) >> 4
        assert_eq!(y.to_bits(), 655_300);
    }

    #[test]
    fn low_pass_settles_on_constant_input_without_overshoot() {
        for &target in &[100_i16, -100, 1000, -1000, 1] {
            let mut filter = LowPass::new(COEF);
            for _ in 0..1000 {
                filter.update(i32::from(target));
                let out = filter.output();
                if target > 0 {
                    assert!(out <= target, "overshoot {} > {}", out, target);
                } else {
                    assert!(out >= target - 1, "overshoot {} < {}", out, target);
                }
            }
            assert!((filter.output() - target).abs() <= 1);
        }
    }

    #[test]
    fn low_pass_is_stable_once_settled() {
        let mut filter = LowPass::with_value(COEF, 250);
        for _ in 0..50 {
            filter.update(250);
        }
        assert_eq!(filter.state().to_bits(), 250 << 16);
    }

    #[test]
    fn low_pass_saturates_instead_of_wrapping() {
        let mut y = FilterState::from_bits(i32::MAX - 10);
        low_pass(i32::MAX / 16, FilterCoef::from_bits(u16::MAX), &mut y);
        assert_eq!(y.to_bits(), i32::MAX);
    }

    #[test]
    fn rate_limit_bounds_each_step() {
        let rate = Speed::from_bits(480);
        let mut y = Speed::ZERO;

        rate_limit(1000, rate, &mut y);
        assert_eq!(y.to_bits(), 480);

        rate_limit(-1000, rate, &mut y);
        assert_eq!(y.to_bits(), 0);

        rate_limit(10, rate, &mut y);
        assert_eq!(y.to_bits(), 160);
    }

    #[test]
    fn rate_limit_never_exceeds_rate_for_any_step() {
        let rate = Speed::from_bits(37);
        let mut limiter = RateLimiter::new(rate);
        let targets = [2047_i16, -2048, 0, 5, -5, 1000, i16::MAX, i16::MIN, 0];
        for &u in targets.iter().cycle().take(400) {
            let before = i32::from(limiter.state().to_bits());
            let after = i32::from(limiter.update(u).to_bits());
            assert!((after - before).abs() <= 37);
        }
    }

    #[test]
    fn rate_limit_reaches_target() {
        let mut limiter = RateLimiter::new(Speed::from_bits(480));
        for _ in 0..40 {
            limiter.update(-1000);
        }
        assert_eq!(limiter.state().to_int(), -1000);
    }
}
