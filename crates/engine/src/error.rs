//! The module contains the error the engine can throw.
//!
//! Every variant belongs to one [`ErrorKind`], which is what front ends match
//! on to decide how to present a failure:
//!
//! - [`InvalidAmount`], [`InvalidInput`], [`InvalidSplit`] and
//!   [`DivisionByZero`] are rejected before any store write.
//! - [`PercentageMismatch`] reports a custom split that does not add up.
//! - [`KeyNotFound`] thrown when an item is not found in the caller's scope.
//! - [`Persistence`] wraps a store failure with the operation that hit it.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`DivisionByZero`]: EngineError::DivisionByZero
//!  [`PercentageMismatch`]: EngineError::PercentageMismatch
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Persistence`]: EngineError::Persistence
use std::fmt;

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::Percent;

/// Coarse classification of [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvariantViolation,
    PermissionDenied,
    NotFound,
    Unauthenticated,
    Membership,
    Exhausted,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::InvariantViolation => "invariant_violation",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::Membership => "membership",
            Self::Exhausted => "exhausted",
            Self::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed distance between a split total and 100%.
///
/// Renders as `short by 1.0 percentage point` or `over by 0.5 percentage
/// point`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deviation(pub i64);

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.0 < 0 { "short" } else { "over" };
        let magnitude = Percent::from_basis_points(self.0.abs());
        write!(f, "{direction} by {magnitude} percentage point")
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Division by zero: {0}")]
    DivisionByZero(String),
    #[error("Split percentages total {total}%, {deviation}")]
    PercentageMismatch { total: Percent, deviation: Deviation },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("No active group")]
    NoGroup,
    #[error("Already a member of group \"{0}\"")]
    AlreadyMember(String),
    #[error("Invalid invite code: {0}")]
    InvalidInviteCode(String),
    #[error("Could not generate a unique invite code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: DbErr,
    },
}

impl EngineError {
    /// Returns the category the error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidInput(_)
            | Self::InvalidSplit(_)
            | Self::DivisionByZero(_) => ErrorKind::Validation,
            Self::PercentageMismatch { .. } => ErrorKind::InvariantViolation,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::NotAuthenticated | Self::NoGroup => ErrorKind::Unauthenticated,
            Self::AlreadyMember(_) | Self::InvalidInviteCode(_) => ErrorKind::Membership,
            Self::CodeGenerationExhausted { .. } => ErrorKind::Exhausted,
            Self::Database(_) | Self::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    /// Attaches operation context to a raw store error.
    ///
    /// Domain errors pass through untouched.
    pub(crate) fn with_context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Database(source) => Self::Persistence {
                context: context.into(),
                source,
            },
            other => other,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::DivisionByZero(a), Self::DivisionByZero(b)) => a == b,
            (
                Self::PercentageMismatch {
                    total: t1,
                    deviation: d1,
                },
                Self::PercentageMismatch {
                    total: t2,
                    deviation: d2,
                },
            ) => t1 == t2 && d1 == d2,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::NotAuthenticated, Self::NotAuthenticated) => true,
            (Self::NoGroup, Self::NoGroup) => true,
            (Self::AlreadyMember(a), Self::AlreadyMember(b)) => a == b,
            (Self::InvalidInviteCode(a), Self::InvalidInviteCode(b)) => a == b,
            (
                Self::CodeGenerationExhausted { attempts: a },
                Self::CodeGenerationExhausted { attempts: b },
            ) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (
                Self::Persistence {
                    context: c1,
                    source: s1,
                },
                Self::Persistence {
                    context: c2,
                    source: s2,
                },
            ) => c1 == c2 && s1.to_string() == s2.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deviation_reads_as_short_or_over() {
        assert_eq!(Deviation(-100).to_string(), "short by 1.0 percentage point");
        assert_eq!(Deviation(50).to_string(), "over by 0.5 percentage point");
        assert_eq!(Deviation(-11).to_string(), "short by 0.11 percentage point");
    }

    #[test]
    fn store_errors_gain_context() {
        let err = EngineError::Database(DbErr::Custom("disk full".to_string()))
            .with_context("update transaction t1");
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.to_string(), "update transaction t1: Custom Error: disk full");

        let domain = EngineError::NoGroup.with_context("ignored");
        assert_eq!(domain, EngineError::NoGroup);
    }
}
