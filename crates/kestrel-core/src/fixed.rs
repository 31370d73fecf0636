//! Fixed-point arithmetic for prices and quantities.
//!
//! Values are unsigned 64-bit integers scaled by a power of ten chosen
//! per instrument. Floats only appear at the encode/decode edges and in
//! the indicator kernels.

use core::ops::{Add, Sub};
use crate::error::EngineError;

/// Powers of ten that fit in a u64.
const POW10: [u64; 20] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
];

/// 2^64 as f64, the first value that no longer fits in a u64.
const U64_LIMIT_F64: f64 = 18_446_744_073_709_551_616.0;

/// Number of decimal places of a fixed-point value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Scale(u8);

impl Scale {
    /// Largest scale whose factor fits in a u64.
    pub const MAX_DECIMALS: u8 = 19;

    /// Canonical precision: 9 decimal places.
    pub const CANONICAL: Self = Self(9);

    /// Create a scale with the given number of decimal places.
    pub const fn new(decimals: u8) -> Result<Self, EngineError> {
        if decimals > Self::MAX_DECIMALS {
            return Err(EngineError::InvalidParameter);
        }
        Ok(Self(decimals))
    }

    /// Number of decimal places.
    #[inline(always)]
    pub const fn decimals(self) -> u8 {
        self.0
    }

    /// Scale factor (10^decimals).
    #[inline(always)]
    pub const fn factor(self) -> u64 {
        POW10[self.0 as usize]
    }

    /// Encode a float into scaled form, rounding half to even.
    pub fn encode(self, value: f64) -> Result<u64, EngineError> {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidParameter);
        }
        let scaled = (value * self.factor() as f64).round_ties_even();
        if scaled >= U64_LIMIT_F64 {
            return Err(EngineError::Overflow);
        }
        Ok(scaled as u64)
    }

    /// Decode a scaled value to a float.
    ///
    /// Integral and fractional parts are converted separately so the
    /// integral part is exact up to 2^53; each conversion rounds half to
    /// even (IEEE-754 default).
    #[inline]
    pub fn decode(self, raw: u64) -> f64 {
        let factor = self.factor();
        let whole = (raw / factor) as f64;
        let frac = (raw % factor) as f64 / factor as f64;
        whole + frac
    }

    /// Multiply two values of this scale, rescaling through 128 bits.
    #[inline]
    pub fn mul_raw(self, a: u64, b: u64) -> Result<u64, EngineError> {
        let product = a as u128 * b as u128;
        narrow(div_round_half_even(product, self.factor() as u128))
    }

    /// Divide two values of this scale, rescaling through 128 bits.
    #[inline]
    pub fn div_raw(self, a: u64, b: u64) -> Result<u64, EngineError> {
        if b == 0 {
            return Err(EngineError::InvalidParameter);
        }
        let numerator = a as u128 * self.factor() as u128;
        narrow(div_round_half_even(numerator, b as u128))
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Integer division rounding half to even.
#[inline(always)]
fn div_round_half_even(numerator: u128, denominator: u128) -> u128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice = remainder * 2;
    if twice > denominator || (twice == denominator && quotient & 1 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

#[inline(always)]
fn narrow(value: u128) -> Result<u64, EngineError> {
    u64::try_from(value).map_err(|_| EngineError::Overflow)
}

/// A scaled value tagged with its scale.
///
/// Arithmetic between two `Fixed` values requires equal scales.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fixed {
    raw: u64,
    scale: Scale,
}

impl Fixed {
    /// Wrap a raw scaled value.
    #[inline(always)]
    pub const fn from_raw(raw: u64, scale: Scale) -> Self {
        Self { raw, scale }
    }

    /// Zero at the given scale.
    #[inline(always)]
    pub const fn zero(scale: Scale) -> Self {
        Self { raw: 0, scale }
    }

    /// Encode a float.
    pub fn from_f64(value: f64, scale: Scale) -> Result<Self, EngineError> {
        Ok(Self { raw: scale.encode(value)?, scale })
    }

    /// Decode to a float.
    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        self.scale.decode(self.raw)
    }

    /// Raw scaled value.
    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.raw
    }

    /// Scale of this value.
    #[inline(always)]
    pub const fn scale(self) -> Scale {
        self.scale
    }

    #[inline(always)]
    fn same_scale(self, other: Self) -> Result<Scale, EngineError> {
        if self.scale != other.scale {
            return Err(EngineError::ScaleMismatch);
        }
        Ok(self.scale)
    }

    /// Checked addition.
    #[inline]
    pub fn checked_add(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        let raw = self.raw.checked_add(other.raw).ok_or(EngineError::Overflow)?;
        Ok(Self { raw, scale })
    }

    /// Checked subtraction. Results below zero overflow.
    #[inline]
    pub fn checked_sub(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        let raw = self.raw.checked_sub(other.raw).ok_or(EngineError::Overflow)?;
        Ok(Self { raw, scale })
    }

    /// Checked multiplication with rescale.
    #[inline]
    pub fn checked_mul(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        Ok(Self { raw: scale.mul_raw(self.raw, other.raw)?, scale })
    }

    /// Checked division with rescale. Division by zero is an invalid parameter.
    #[inline]
    pub fn checked_div(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        Ok(Self { raw: scale.div_raw(self.raw, other.raw)?, scale })
    }

    /// Saturating addition. Only a scale mismatch is reported.
    #[inline]
    pub fn saturating_add(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        Ok(Self { raw: self.raw.saturating_add(other.raw), scale })
    }

    /// Saturating subtraction, clamped at zero.
    #[inline]
    pub fn saturating_sub(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        Ok(Self { raw: self.raw.saturating_sub(other.raw), scale })
    }

    /// Saturating multiplication, clamped at `u64::MAX`.
    #[inline]
    pub fn saturating_mul(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        let raw = scale.mul_raw(self.raw, other.raw).unwrap_or(u64::MAX);
        Ok(Self { raw, scale })
    }

    /// Saturating division. Division by zero saturates to `u64::MAX`.
    #[inline]
    pub fn saturating_div(self, other: Self) -> Result<Self, EngineError> {
        let scale = self.same_scale(other)?;
        let raw = scale.div_raw(self.raw, other.raw).unwrap_or(u64::MAX);
        Ok(Self { raw, scale })
    }

    /// Convert to another scale. Widening is exact, narrowing rounds half to even.
    pub fn rescale(self, to: Scale) -> Result<Self, EngineError> {
        let raw = match to.0.cmp(&self.scale.0) {
            core::cmp::Ordering::Equal => self.raw,
            core::cmp::Ordering::Greater => {
                let factor = POW10[(to.0 - self.scale.0) as usize];
                self.raw.checked_mul(factor).ok_or(EngineError::Overflow)?
            }
            core::cmp::Ordering::Less => {
                let factor = POW10[(self.scale.0 - to.0) as usize];
                narrow(div_round_half_even(self.raw as u128, factor as u128))?
            }
        };
        Ok(Self { raw, scale: to })
    }
}

/// Fixed-point price, in the owning book's scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(pub u64);

impl Price {
    /// Zero price (empty side sentinel at the ABI).
    pub const ZERO: Self = Self(0);

    /// Maximum price.
    pub const MAX: Self = Self(u64::MAX);

    /// Get raw internal value.
    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Create from raw value (no conversion).
    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Check if price is zero.
    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating addition.
    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Price {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Price {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

/// Fixed-point quantity, in the owning book's scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(pub u64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Maximum quantity.
    pub const MAX: Self = Self(u64::MAX);

    /// Check if quantity is zero.
    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Get raw value.
    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Create from raw value.
    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Saturating addition.
    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(raw: u64) -> Fixed {
        Fixed::from_raw(raw, Scale::CANONICAL)
    }

    #[test]
    fn test_scale_bounds() {
        assert_eq!(Scale::new(19).unwrap().factor(), 10_000_000_000_000_000_000);
        assert_eq!(Scale::new(20), Err(EngineError::InvalidParameter));
        assert_eq!(Scale::default().factor(), 1_000_000_000);
    }

    #[test]
    fn test_encode_decode() {
        let s = Scale::CANONICAL;
        assert_eq!(s.encode(123.25).unwrap(), 123_250_000_000);
        assert_eq!(s.decode(123_250_000_000), 123.25);
        assert!((s.decode(s.encode(0.1).unwrap()) - 0.1).abs() < 1e-12);
        assert_eq!(s.encode(0.0).unwrap(), 0);
    }

    #[test]
    fn test_encode_rounds_half_to_even() {
        let s = Scale::new(0).unwrap();
        assert_eq!(s.encode(2.5).unwrap(), 2);
        assert_eq!(s.encode(3.5).unwrap(), 4);
        assert_eq!(s.encode(2.4).unwrap(), 2);
    }

    #[test]
    fn test_encode_rejects_bad_input() {
        let s = Scale::CANONICAL;
        assert_eq!(s.encode(-1.0), Err(EngineError::InvalidParameter));
        assert_eq!(s.encode(f64::NAN), Err(EngineError::InvalidParameter));
        assert_eq!(s.encode(f64::INFINITY), Err(EngineError::InvalidParameter));
        assert_eq!(s.encode(1e11), Err(EngineError::Overflow));
    }

    #[test]
    fn test_mul_rescales() {
        // 2.5 * 4.0 = 10.0
        let a = Fixed::from_f64(2.5, Scale::CANONICAL).unwrap();
        let b = Fixed::from_f64(4.0, Scale::CANONICAL).unwrap();
        assert_eq!(a.checked_mul(b).unwrap().raw(), 10_000_000_000);
    }

    #[test]
    fn test_mul_uses_wide_intermediate() {
        // Raw product overflows u64 but the rescaled result fits.
        let a = fx(10_000_000_000_000); // 10_000.0
        let b = fx(1_000_000_000_000); // 1_000.0
        assert_eq!(a.checked_mul(b).unwrap().raw(), 10_000_000_000_000_000);
    }

    #[test]
    fn test_mul_overflow() {
        let big = fx(u64::MAX);
        assert_eq!(big.checked_mul(fx(2_000_000_000)), Err(EngineError::Overflow));
        assert_eq!(big.saturating_mul(fx(2_000_000_000)).unwrap().raw(), u64::MAX);
    }

    #[test]
    fn test_mul_rounds_half_to_even() {
        let s = Scale::new(1).unwrap();
        // 0.5 * 0.5 = 0.25 -> 0.2
        assert_eq!(s.mul_raw(5, 5).unwrap(), 2);
        // 0.5 * 1.5 = 0.75 -> 0.8
        assert_eq!(s.mul_raw(5, 15).unwrap(), 8);
    }

    #[test]
    fn test_div() {
        let a = Fixed::from_f64(10.0, Scale::CANONICAL).unwrap();
        let b = Fixed::from_f64(4.0, Scale::CANONICAL).unwrap();
        assert_eq!(a.checked_div(b).unwrap().to_f64(), 2.5);
        assert_eq!(a.checked_div(fx(0)), Err(EngineError::InvalidParameter));
        assert_eq!(a.saturating_div(fx(0)).unwrap().raw(), u64::MAX);
    }

    #[test]
    fn test_add_sub() {
        assert_eq!(fx(5).checked_add(fx(7)).unwrap().raw(), 12);
        assert_eq!(fx(u64::MAX).checked_add(fx(1)), Err(EngineError::Overflow));
        assert_eq!(fx(3).checked_sub(fx(5)), Err(EngineError::Overflow));
        assert_eq!(fx(3).saturating_sub(fx(5)).unwrap().raw(), 0);
        assert_eq!(fx(u64::MAX).saturating_add(fx(1)).unwrap().raw(), u64::MAX);
    }

    #[test]
    fn test_scale_mismatch() {
        let a = Fixed::from_raw(1, Scale::new(2).unwrap());
        let b = Fixed::from_raw(1, Scale::new(3).unwrap());
        assert_eq!(a.checked_add(b), Err(EngineError::ScaleMismatch));
        assert_eq!(a.checked_mul(b), Err(EngineError::ScaleMismatch));
        assert_eq!(a.saturating_sub(b), Err(EngineError::ScaleMismatch));
    }

    #[test]
    fn test_rescale() {
        let cents = Fixed::from_raw(12_345, Scale::new(2).unwrap());
        let nanos = cents.rescale(Scale::CANONICAL).unwrap();
        assert_eq!(nanos.raw(), 123_450_000_000);
        assert_eq!(nanos.rescale(Scale::new(2).unwrap()).unwrap(), cents);

        // 0.125 -> 2dp rounds half to even: 0.12
        let eighth = Fixed::from_raw(125, Scale::new(3).unwrap());
        assert_eq!(eighth.rescale(Scale::new(2).unwrap()).unwrap().raw(), 12);

        let huge = Fixed::from_raw(u64::MAX, Scale::new(0).unwrap());
        assert_eq!(huge.rescale(Scale::new(1).unwrap()), Err(EngineError::Overflow));
    }

    #[test]
    fn test_price_quantity_newtypes() {
        let p = Price::from_raw(100);
        assert_eq!((p + Price(5)).as_raw(), 105);
        assert_eq!((p - Price(5)).as_raw(), 95);
        assert_eq!(Price(3).saturating_sub(Price(5)), Price::ZERO);
        assert!(Quantity::ZERO.is_zero());
        assert_eq!(Quantity(10).saturating_sub(Quantity(20)), Quantity::ZERO);
    }
}
