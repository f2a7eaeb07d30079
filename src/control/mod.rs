// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Signal Conditioning
//!
//! Integer-only building blocks that turn raw inputs into motor-facing commands.
//!
//! ## Modules
//!
//! - [`filter`] - Low-pass filter and rate limiter.
//! - [`deadband`] - Input type, calibration and deadband mapping.
//! - [`mixer`] - Speed/steer mixer, working range and average speed.
//! - [`pipeline`] - Rate limit, filter and mix composed per tick.
//! - [`multi_tap`] - Multi-tap gesture detector.

pub mod deadband;
pub mod filter;
pub mod mixer;
pub mod multi_tap;
pub mod pipeline;

pub use deadband::{DeadbandProfile, InputType};
pub use filter::{LowPass, RateLimiter};
pub use mixer::{InputLimits, Mixer, MixerKind, WheelPair};
pub use multi_tap::{MultiTap, MultiTapConfig};
pub use pipeline::{Conditioned, ConditioningPipeline};

/// Two raw, non-normalized inputs as sampled or decoded this tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawChannel {
    pub input1: i16,
    pub input2: i16,
}
