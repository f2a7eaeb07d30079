// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-point number types.
//!
//! Every signal in the control core is an integer scaled by a power of two. The types here carry
//! the fractional bit count in the type so that a `fixdt(1,16,4)` speed can never be mixed up with
//! a `fixdt(1,32,16)` filter accumulator.
//!
//! | Type | Notation | Used for |
//! | ---- | -------- | -------- |
//! | [`Speed`] | `fixdt(1,16,4)` | rate limiter state, mixer inputs, current/speed limits |
//! | [`FilterState`] | `fixdt(1,32,16)` | low-pass accumulators |
//! | [`FilterCoef`] | `fixdt(0,16,16)` | low-pass coefficients, `[0, 1)` |
//! | [`MixCoef`] | `fixdt(1,16,14)` | mixer gains, `[-2, 2)` |
//! | [`Blend`] | `fixdt(0,16,15)` | electric brake speed blend, `[0, 1]` |
//!
//! Conversions that can overflow saturate instead of wrapping.

/// Signed 16-bit fixed-point value with `F` fractional bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fixed16<const F: u32>(i16);

/// Signed 32-bit fixed-point value with `F` fractional bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fixed32<const F: u32>(i32);

/// Unsigned 16-bit fixed-point value with `F` fractional bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UFixed16<const F: u32>(u16);

pub type Speed = Fixed16<4>;
pub type FilterState = Fixed32<16>;
pub type FilterCoef = UFixed16<16>;
pub type MixCoef = Fixed16<14>;
pub type Blend = UFixed16<15>;

/// Saturate a 32-bit intermediate into the `i16` range.
#[inline]
pub fn sat16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Saturate a 64-bit intermediate into the `i32` range.
#[inline]
pub fn sat32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl<const F: u32> Fixed16<F> {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(i16::MAX);
    pub const MIN: Self = Self(i16::MIN);

    #[inline]
    pub const fn from_bits(bits: i16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> i16 {
        self.0
    }

    /// Scale an integer up by `2^F`, saturating at the type bounds.
    #[inline]
    pub fn from_int(v: i16) -> Self {
        Self(sat16(i32::from(v) << F))
    }

    /// Integer part (floor, like an arithmetic right shift).
    #[inline]
    pub const fn to_int(self) -> i16 {
        self.0 >> F
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl<const F: u32> Fixed32<F> {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Scale an integer up by `2^F`, saturating at the type bounds.
    #[inline]
    pub fn from_int(v: i32) -> Self {
        Self(sat32(i64::from(v) << F))
    }

    /// Integer part saturated into `i16`.
    #[inline]
    pub fn to_int(self) -> i16 {
        sat16(self.0 >> F)
    }
}

impl<const F: u32> UFixed16<F> {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> u16 {
        self.0
    }
}
