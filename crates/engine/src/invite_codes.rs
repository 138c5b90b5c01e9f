//! Invite codes.
//!
//! A code is 8 characters from `[A-Z0-9]`. User input is trimmed and
//! upper-cased before matching. Codes are drawn from an [`InviteCodeSource`],
//! so tests can force collisions.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

pub const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteCode(String);

impl InviteCode {
    /// Normalizes and validates user input.
    ///
    /// ```rust
    /// use engine::InviteCode;
    ///
    /// let code = InviteCode::parse(" ab12cd34 ").unwrap();
    /// assert_eq!(code.as_str(), "AB12CD34");
    /// assert!(InviteCode::parse("short").is_err());
    /// ```
    pub fn parse(input: &str) -> ResultEngine<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        let well_formed = normalized.len() == INVITE_CODE_LEN
            && normalized
                .bytes()
                .all(|b| INVITE_CODE_ALPHABET.contains(&b));
        if !well_formed {
            return Err(EngineError::InvalidInviteCode(format!(
                "expected {INVITE_CODE_LEN} letters or digits, got \"{}\"",
                input.trim()
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces candidate invite codes. Uniqueness is enforced by the store, not
/// by the source.
pub trait InviteCodeSource: Send + Sync + fmt::Debug {
    fn next_code(&self) -> InviteCode;
}

/// Uniformly random codes from the thread-local generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomInviteCodes;

impl InviteCodeSource for RandomInviteCodes {
    fn next_code(&self) -> InviteCode {
        let mut rng = rand::rng();
        let code = (0..INVITE_CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..INVITE_CODE_ALPHABET.len());
                char::from(INVITE_CODE_ALPHABET[idx])
            })
            .collect();
        InviteCode(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_codes_are_well_formed() {
        let source = RandomInviteCodes;
        for _ in 0..64 {
            let code = source.next_code();
            assert_eq!(InviteCode::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn parse_rejects_symbols_and_wrong_length() {
        assert!(InviteCode::parse("ABCD-123").is_err());
        assert!(InviteCode::parse("ABCDEFGHI").is_err());
        assert!(InviteCode::parse("").is_err());
    }
}
