//! Exact decimal numbers for vote arithmetic.
//!
//! A `Decimal` is an arbitrary-precision integer mantissa with a base-10
//! scale: `value = mantissa × 10^-scale`. Addition, subtraction and
//! multiplication are exact. Division and explicit rounding always name a
//! target number of places and a `RoundingMode`, so every lossy step in the
//! tabulation is visible at the call site. No floating point anywhere.

use core::cmp::Ordering;
use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use core::str::FromStr;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::errors::CoreError;

/// Direction applied when a result has more digits than the target places.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundingMode {
    /// Toward zero (floor for the non-negative values the engine uses).
    Down,
    /// Away from zero (ceiling for non-negative values).
    Up,
}

#[derive(Clone, Debug)]
pub struct Decimal {
    mantissa: BigInt,
    scale: u32,
}

#[inline]
fn pow10(n: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), n as usize)
}

/// Integer division of `num / den` rounded per `mode`. `den` must be non-zero.
fn div_round(num: &BigInt, den: &BigInt, mode: RoundingMode) -> BigInt {
    let q = num / den; // truncates toward zero
    match mode {
        RoundingMode::Down => q,
        RoundingMode::Up => {
            if (num % den).is_zero() {
                q
            } else if num.is_negative() != den.is_negative() {
                q - BigInt::one()
            } else {
                q + BigInt::one()
            }
        }
    }
}

impl Decimal {
    pub fn new(mantissa: impl Into<BigInt>, scale: u32) -> Self {
        Self { mantissa: mantissa.into(), scale }
    }

    pub fn zero() -> Self {
        Self::new(0u8, 0)
    }

    pub fn one() -> Self {
        Self::new(1u8, 0)
    }

    pub fn from_integer(v: i64) -> Self {
        Self::new(v, 0)
    }

    /// Smallest positive value representable with `places` decimals: `10^-places`.
    pub fn unit(places: u32) -> Self {
        Self::new(1u8, places)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// Mantissa expressed at a larger-or-equal scale.
    fn mantissa_at(&self, scale: u32) -> BigInt {
        debug_assert!(scale >= self.scale);
        &self.mantissa * pow10(scale - self.scale)
    }

    /// Round (or widen) to exactly `places` decimals.
    pub fn round(&self, places: u32, mode: RoundingMode) -> Decimal {
        if places >= self.scale {
            return Decimal::new(self.mantissa_at(places), places);
        }
        let divisor = pow10(self.scale - places);
        Decimal::new(div_round(&self.mantissa, &divisor, mode), places)
    }

    /// `self / rhs` with `places` decimals. `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Decimal, places: u32, mode: RoundingMode) -> Option<Decimal> {
        if rhs.is_zero() {
            return None;
        }
        // (a·10^-sa) / (b·10^-sb) · 10^p  =  a·10^(p+sb) / (b·10^sa)
        let num = &self.mantissa * pow10(places + rhs.scale);
        let den = &rhs.mantissa * pow10(self.scale);
        Some(Decimal::new(div_round(&num, &den, mode), places))
    }

    /// Exact product rounded to `places` decimals.
    pub fn mul_rounded(&self, rhs: &Decimal, places: u32, mode: RoundingMode) -> Decimal {
        (self * rhs).round(places, mode)
    }

    /// Remove trailing fractional zeros (`1.2500` → `1.25`, `3.000` → `3`).
    pub fn normalized(&self) -> Decimal {
        let ten = BigInt::from(10u8);
        let mut mantissa = self.mantissa.clone();
        let mut scale = self.scale;
        while scale > 0 && !mantissa.is_zero() && (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }
        if mantissa.is_zero() {
            scale = 0;
        }
        Decimal { mantissa, scale }
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.mantissa_at(scale).cmp(&other.mantissa_at(scale))
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Decimal::zero()
    }
}

impl From<u64> for Decimal {
    fn from(v: u64) -> Self {
        Decimal::new(v, 0)
    }
}

impl From<u32> for Decimal {
    fn from(v: u32) -> Self {
        Decimal::new(v, 0)
    }
}

impl From<usize> for Decimal {
    fn from(v: usize) -> Self {
        Decimal::new(v as u64, 0)
    }
}

// ---- Exact arithmetic -------------------------------------------------------

impl<'a> Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;
    fn add(self, rhs: &'a Decimal) -> Decimal {
        let scale = self.scale.max(rhs.scale);
        Decimal::new(self.mantissa_at(scale) + rhs.mantissa_at(scale), scale)
    }
}

impl Add for Decimal {
    type Output = Decimal;
    fn add(self, rhs: Decimal) -> Decimal {
        &self + &rhs
    }
}

impl AddAssign<&Decimal> for Decimal {
    fn add_assign(&mut self, rhs: &Decimal) {
        *self = &*self + rhs;
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        *self = &*self + &rhs;
    }
}

impl<'a> Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;
    fn sub(self, rhs: &'a Decimal) -> Decimal {
        let scale = self.scale.max(rhs.scale);
        Decimal::new(self.mantissa_at(scale) - rhs.mantissa_at(scale), scale)
    }
}

impl Sub for Decimal {
    type Output = Decimal;
    fn sub(self, rhs: Decimal) -> Decimal {
        &self - &rhs
    }
}

impl SubAssign<&Decimal> for Decimal {
    fn sub_assign(&mut self, rhs: &Decimal) {
        *self = &*self - rhs;
    }
}

impl<'a> Mul<&'a Decimal> for &'a Decimal {
    type Output = Decimal;
    fn mul(self, rhs: &'a Decimal) -> Decimal {
        Decimal::new(&self.mantissa * &rhs.mantissa, self.scale + rhs.scale)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, v| &acc + v)
    }
}

// ---- Text form --------------------------------------------------------------

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.abs().to_string();
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl FromStr for Decimal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CoreError::InvalidDecimal(s.to_string());
        let t = s.trim();
        let (negative, body) = match t.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, t.strip_prefix('+').unwrap_or(t)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let joined = format!("{int_part}{frac_part}");
        let mut mantissa: BigInt = joined.parse().map_err(|_| bad())?;
        if negative {
            mantissa = -mantissa;
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| bad())?;
        Ok(Decimal::new(mantissa, scale))
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Decimal;
    use core::fmt;
    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Decimal {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(self)
        }
    }

    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal number or decimal string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            Ok(Decimal::from_integer(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            // f64 Display never uses exponent notation, so the shortest
            // round-trip text parses as a plain decimal literal.
            v.to_string().parse().map_err(E::custom)
        }
    }

    impl<'de> Deserialize<'de> for Decimal {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
            d.deserialize_any(DecimalVisitor)
        }
    }
}

// ---- Configured arithmetic ------------------------------------------------

/// Vote arithmetic at the contest's configured precision.
///
/// Every lossy operation rounds **down**, so transfers never move more vote
/// mass than the exact computation would.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VoteArithmetic {
    places: u32,
}

impl VoteArithmetic {
    pub fn new(places: u32) -> Self {
        Self { places }
    }

    pub fn places(&self) -> u32 {
        self.places
    }

    /// `10^-places`.
    pub fn unit(&self) -> Decimal {
        Decimal::unit(self.places)
    }

    /// `a / b` rounded down; zero when `b` is zero.
    pub fn divide(&self, a: &Decimal, b: &Decimal) -> Decimal {
        a.checked_div(b, self.places, RoundingMode::Down).unwrap_or_else(Decimal::zero)
    }

    /// `a × b` rounded down.
    pub fn multiply(&self, a: &Decimal, b: &Decimal) -> Decimal {
        a.mul_rounded(b, self.places, RoundingMode::Down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display_round_trip_text() {
        assert_eq!(d("12.5000").to_string(), "12.5000");
        assert_eq!(d("0.005").to_string(), "0.005");
        assert_eq!(d("-1.25").to_string(), "-1.25");
        assert_eq!(d("7").to_string(), "7");
        assert_eq!(d(".5").to_string(), "0.5");
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
        assert!("1e5".parse::<Decimal>().is_err());
    }

    #[test]
    fn equality_ignores_scale() {
        assert_eq!(d("1.0"), d("1"));
        assert_eq!(d("0.50"), d("0.5"));
        assert!(d("0.1") < d("0.10001"));
        assert_eq!(d("3.000").normalized().to_string(), "3");
        assert_eq!(d("1.2500").normalized().to_string(), "1.25");
    }

    #[test]
    fn exact_add_sub_mul() {
        assert_eq!(&d("0.8334") + &d("1"), d("1.8334"));
        assert_eq!(&d("1") - &d("0.1666"), d("0.8334"));
        assert_eq!(&d("0.25") * &d("0.5"), d("0.125"));
        let total: Decimal = [d("0.5"), d("0.25"), d("0.25")].into_iter().sum();
        assert_eq!(total, Decimal::one());
    }

    #[test]
    fn division_rounds_in_requested_direction() {
        let seven = Decimal::from(7u64);
        let two = Decimal::from(2u64);
        assert_eq!(seven.checked_div(&two, 0, RoundingMode::Down).unwrap(), d("3"));
        assert_eq!(seven.checked_div(&two, 0, RoundingMode::Up).unwrap(), d("4"));
        assert_eq!(d("2").checked_div(&d("12"), 4, RoundingMode::Down).unwrap(), d("0.1666"));
        assert_eq!(d("2").checked_div(&d("12"), 4, RoundingMode::Up).unwrap(), d("0.1667"));
        assert!(seven.checked_div(&Decimal::zero(), 4, RoundingMode::Down).is_none());
    }

    #[test]
    fn round_narrows_and_widens() {
        assert_eq!(d("0.16666").round(4, RoundingMode::Down).to_string(), "0.1666");
        assert_eq!(d("0.16661").round(4, RoundingMode::Up).to_string(), "0.1667");
        assert_eq!(d("1.5").round(3, RoundingMode::Down).to_string(), "1.500");
    }

    #[test]
    fn vote_arithmetic_truncates() {
        let arith = VoteArithmetic::new(4);
        assert_eq!(arith.unit(), d("0.0001"));
        assert_eq!(arith.divide(&d("2"), &d("3")), d("0.6666"));
        assert_eq!(arith.multiply(&d("0.8334"), &d("0.5")), d("0.4167"));
        assert_eq!(arith.divide(&d("2"), &Decimal::zero()), Decimal::zero());
    }
}
