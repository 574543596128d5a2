//! Device fixed-point formats
//!
//! The target cores have no floating-point unit for synaptic data, so
//! weights and synapse parameters are shipped as scaled integers.

use crate::error::{ConnectError, Result};
use core::fmt;

/// S16.15 signed fixed point (16 integer bits, 15 fractional bits, 1 sign bit)
///
/// Range: [-65536.0, 65535.99997] with ~0.00003 precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct S1615(i32);

impl S1615 {
    /// Number of fractional bits
    pub const FRAC_BITS: u32 = 15;
    /// Scale factor (2^15 = 32768)
    pub const SCALE: i32 = 1 << Self::FRAC_BITS;
    /// Maximum representable value
    pub const MAX: Self = Self(i32::MAX);
    /// Minimum representable value
    pub const MIN: Self = Self(i32::MIN);
    /// Zero value
    pub const ZERO: Self = Self(0);
    /// One value
    pub const ONE: Self = Self(Self::SCALE);

    /// Largest real value that converts without overflow
    pub const MAX_F64: f64 = i32::MAX as f64 / Self::SCALE as f64;
    /// Smallest real value that converts without overflow
    pub const MIN_F64: f64 = i32::MIN as f64 / Self::SCALE as f64;

    /// Create from raw i32 value
    #[inline(always)]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Get raw i32 value
    #[inline(always)]
    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// Convert from a real value, rounding to nearest; NaN and out-of-range values are rejected
    pub fn try_from_f64(value: f64) -> Result<Self> {
        if value.is_nan() {
            return Err(ConnectError::invalid_config("NaN cannot be represented in S16.15"));
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled > i32::MAX as f64 || scaled < i32::MIN as f64 {
            return Err(ConnectError::invalid_parameter(
                "S16.15 value",
                value.to_string(),
                format!("within [{}, {}]", Self::MIN_F64, Self::MAX_F64),
            ));
        }
        Ok(Self(scaled as i32))
    }

    /// Convert from a real value, saturating at the format limits (NaN maps to zero)
    pub fn from_f64_saturating(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else if value >= Self::MAX_F64 {
            Self::MAX
        } else if value <= Self::MIN_F64 {
            Self::MIN
        } else {
            Self((value * Self::SCALE as f64).round() as i32)
        }
    }

    /// Convert to a real value
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for S1615 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.to_f64())
    }
}

/// Unsigned 0.32 fraction, used for per-step decay and init multipliers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct U032(u32);

impl U032 {
    /// Scale factor (2^32)
    pub const SCALE: f64 = 4_294_967_296.0;

    /// Create from raw u32 value
    #[inline(always)]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get raw u32 value
    #[inline(always)]
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Convert a fraction in `[0, 1]`, saturating 1.0 to `u32::MAX`
    pub fn try_from_f64(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConnectError::invalid_parameter(
                "U0.32 value",
                value.to_string(),
                "within [0, 1]",
            ));
        }
        let scaled = (value * Self::SCALE).round();
        Ok(Self(if scaled >= Self::SCALE { u32::MAX } else { scaled as u32 }))
    }

    /// Convert to a real value
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s1615_conversion() {
        assert_eq!(S1615::try_from_f64(1.0).unwrap(), S1615::ONE);
        assert_eq!(S1615::try_from_f64(-0.5).unwrap().to_raw(), -16384);
        assert!((S1615::try_from_f64(3.14159).unwrap().to_f64() - 3.14159).abs() < 1.0 / 32768.0);
        assert_eq!(S1615::try_from_f64(S1615::MIN_F64).unwrap(), S1615::MIN);
    }

    #[test]
    fn test_s1615_rejects() {
        assert!(S1615::try_from_f64(f64::NAN).is_err());
        assert!(S1615::try_from_f64(65536.0).is_err());
        assert!(S1615::try_from_f64(-65537.0).is_err());
        assert!(S1615::try_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_s1615_saturating() {
        assert_eq!(S1615::from_f64_saturating(1e9), S1615::MAX);
        assert_eq!(S1615::from_f64_saturating(-1e9), S1615::MIN);
        assert_eq!(S1615::from_f64_saturating(f64::NAN), S1615::ZERO);
    }

    #[test]
    fn test_u032() {
        assert_eq!(U032::try_from_f64(0.5).unwrap().to_raw(), 1 << 31);
        assert_eq!(U032::try_from_f64(1.0).unwrap().to_raw(), u32::MAX);
        assert_eq!(U032::try_from_f64(0.0).unwrap().to_raw(), 0);
        assert!(U032::try_from_f64(1.5).is_err());
        assert!(U032::try_from_f64(f64::NAN).is_err());
    }
}
