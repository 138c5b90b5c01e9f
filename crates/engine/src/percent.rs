use std::{
    fmt,
    iter::Sum,
    ops::{Add, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// A percentage stored as **basis points** (hundredths of a percentage
/// point). `100%` is `10_000`.
///
/// ```rust
/// use engine::Percent;
///
/// let p: Percent = "33.33".parse().unwrap();
/// assert_eq!(p.basis_points(), 3333);
/// assert_eq!(Percent::HUNDRED.to_string(), "100.0");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);

    #[must_use]
    pub const fn from_basis_points(bp: i64) -> Self {
        Self(bp)
    }

    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Percent) -> Option<Percent> {
        self.0.checked_add(rhs.0).map(Percent)
    }
}

impl fmt::Display for Percent {
    /// Prints at least one decimal and drops a trailing zero: `60.0`,
    /// `99.91`, `0.5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / 100;
        let frac = abs % 100;
        if frac % 10 == 0 {
            write!(f, "{sign}{whole}.{}", frac / 10)
        } else {
            write!(f, "{sign}{whole}.{frac:02}")
        }
    }
}

impl Add for Percent {
    type Output = Percent;

    fn add(self, rhs: Percent) -> Self::Output {
        Percent(self.0 + rhs.0)
    }
}

impl Sub for Percent {
    type Output = Percent;

    fn sub(self, rhs: Percent) -> Self::Output {
        Percent(self.0 - rhs.0)
    }
}

impl Sum for Percent {
    fn sum<I: Iterator<Item = Percent>>(iter: I) -> Self {
        iter.fold(Percent::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Percent> for Percent {
    fn sum<I: Iterator<Item = &'a Percent>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Percent {
    type Err = EngineError;

    /// Parses a non-negative decimal with at most two fractional digits.
    /// A trailing `%` is tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidSplit(format!("invalid percentage: {s}"));

        let raw = s.trim();
        let raw = raw.strip_suffix('%').unwrap_or(raw).trim().replace(',', ".");
        if raw.is_empty() {
            return Err(invalid());
        }
        let (whole_str, frac_str) = match raw.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (raw.as_str(), ""),
        };
        if whole_str.is_empty()
            || frac_str.len() > 2
            || !whole_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole_str.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac_str.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .map(Percent)
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_to_one_decimal() {
        assert_eq!(Percent(6000).to_string(), "60.0");
        assert_eq!(Percent(9991).to_string(), "99.91");
        assert_eq!(Percent(50).to_string(), "0.5");
        assert_eq!(Percent(3333).to_string(), "33.33");
    }

    #[test]
    fn parse_accepts_plain_and_percent_suffix() {
        assert_eq!("60".parse::<Percent>().unwrap(), Percent(6000));
        assert_eq!("33.3".parse::<Percent>().unwrap(), Percent(3330));
        assert_eq!("12.5%".parse::<Percent>().unwrap(), Percent(1250));
    }

    #[test]
    fn parse_rejects_negative_and_precise_values() {
        assert!("-5".parse::<Percent>().is_err());
        assert!("33.333".parse::<Percent>().is_err());
        assert!("".parse::<Percent>().is_err());
    }
}
