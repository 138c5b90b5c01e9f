//! Split calculation.
//!
//! Pure functions that divide an amount among group members, either equally
//! or by custom percentages. Amounts are [`Money`] cents and percentages are
//! [`Percent`] basis points, so every comparison here is exact.

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, Percent, ResultEngine, error::Deviation};

/// Maximum distance from 100% a custom split may have, exclusive.
pub const DEFAULT_SPLIT_TOLERANCE: Percent = Percent::from_basis_points(10);

/// Tunables for split validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPolicy {
    pub tolerance: Percent,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SPLIT_TOLERANCE,
        }
    }
}

/// How a transaction amount is divided.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "percentages", rename_all = "snake_case")]
pub enum Split {
    /// Everyone in the group pays the same share, evaluated against the live
    /// roster.
    #[default]
    Equal,
    /// Explicit percentage per member `user_id`.
    Custom(BTreeMap<String, Percent>),
}

impl Split {
    pub fn split_type(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Custom(_) => "custom",
        }
    }

    pub fn custom_percentages(&self) -> Option<&BTreeMap<String, Percent>> {
        match self {
            Self::Equal => None,
            Self::Custom(splits) => Some(splits),
        }
    }

    /// Checks the split against `policy`. Equal splits are always valid.
    pub fn validate(&self, policy: &SplitPolicy) -> ResultEngine<()> {
        match self {
            Self::Equal => Ok(()),
            Self::Custom(splits) => validate_percentages(splits, policy).map(|_| ()),
        }
    }
}

/// Parses `equal` or a list of `user=percent` pairs such as
/// `alice=60,bob=40`. The totals are not checked here.
impl FromStr for Split {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("equal") {
            return Ok(Self::Equal);
        }
        let mut splits = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((user_id, pct)) = entry.split_once('=') else {
                return Err(EngineError::InvalidSplit(format!(
                    "expected user=percent, got {entry:?}"
                )));
            };
            let user_id = user_id.trim();
            if user_id.is_empty() {
                return Err(EngineError::InvalidSplit(format!(
                    "missing user in {entry:?}"
                )));
            }
            if splits.insert(user_id.to_string(), pct.parse()?).is_some() {
                return Err(EngineError::InvalidSplit(format!(
                    "{user_id} appears twice"
                )));
            }
        }
        if splits.is_empty() {
            return Err(EngineError::InvalidSplit("no split given".to_string()));
        }
        Ok(Self::Custom(splits))
    }
}

/// Per-member share of an equal split, truncated to the cent.
pub fn equal_share(amount: Money, member_count: usize) -> ResultEngine<Money> {
    if member_count == 0 {
        return Err(EngineError::DivisionByZero(
            "cannot split an amount among zero members".to_string(),
        ));
    }
    let count = i64::try_from(member_count)
        .map_err(|_| EngineError::InvalidInput("too many members".to_string()))?;
    Ok(Money::new(amount.cents() / count))
}

/// Equal split whose parts sum exactly to `amount`.
///
/// The cents lost to truncation go one each to the first members, in the
/// order given.
pub fn equal_allocation<I, S>(amount: Money, members: I) -> ResultEngine<BTreeMap<String, Money>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let members: Vec<String> = members.into_iter().map(Into::into).collect();
    let base = equal_share(amount, members.len())?;
    let allocated = base.cents() * members.len() as i64;
    let leftover = (amount.cents() - allocated).unsigned_abs() as usize;
    let step = Money::new(amount.cents().signum());

    Ok(members
        .into_iter()
        .enumerate()
        .map(|(idx, user_id)| {
            let share = if idx < leftover { base + step } else { base };
            (user_id, share)
        })
        .collect())
}

/// `amount × percentage / 100`, rounded half away from zero to the cent.
pub fn custom_share(amount: Money, percentage: Percent) -> Money {
    let numerator = i128::from(amount.cents()) * i128::from(percentage.basis_points());
    let denominator = i128::from(Percent::HUNDRED.basis_points());
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let rounded = if remainder.abs() * 2 >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    };
    Money::new(rounded as i64)
}

/// Validates a custom split and returns its total.
///
/// Passes when `|total - 100| < policy.tolerance`. Empty maps, negative
/// entries and entries above 100% are rejected outright.
pub fn validate_percentages(
    splits: &BTreeMap<String, Percent>,
    policy: &SplitPolicy,
) -> ResultEngine<Percent> {
    if splits.is_empty() {
        return Err(EngineError::InvalidSplit(
            "custom split needs at least one member".to_string(),
        ));
    }
    if let Some((user_id, pct)) = splits.iter().find(|(_, pct)| pct.is_negative()) {
        return Err(EngineError::InvalidSplit(format!(
            "negative percentage {pct} for {user_id}"
        )));
    }
    if let Some((user_id, pct)) = splits.iter().find(|(_, pct)| **pct > Percent::HUNDRED) {
        return Err(EngineError::InvalidSplit(format!(
            "percentage {pct} for {user_id} is above 100"
        )));
    }

    let total = splits
        .values()
        .try_fold(Percent::ZERO, |acc, pct| acc.checked_add(*pct))
        .ok_or_else(|| EngineError::InvalidSplit("percentages overflow".to_string()))?;
    let deviation = total.basis_points() - Percent::HUNDRED.basis_points();
    if deviation.abs() < policy.tolerance.basis_points() {
        Ok(total)
    } else {
        Err(EngineError::PercentageMismatch {
            total,
            deviation: Deviation(deviation),
        })
    }
}

/// Seeds a custom split with an even share per member.
///
/// Leftover basis points go to the first members so the seed totals
/// exactly 100%.
pub fn normalize_equal_split<I, S>(members: I) -> ResultEngine<BTreeMap<String, Percent>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full = Money::new(Percent::HUNDRED.basis_points());
    Ok(equal_allocation(full, members)?
        .into_iter()
        .map(|(user_id, bp)| (user_id, Percent::from_basis_points(bp.cents())))
        .collect())
}

/// Individual amounts for a custom split, always computed from scratch.
pub fn recompute_individual_amounts(
    amount: Money,
    splits: &BTreeMap<String, Percent>,
) -> BTreeMap<String, Money> {
    splits
        .iter()
        .map(|(user_id, pct)| (user_id.clone(), custom_share(amount, *pct)))
        .collect()
}
