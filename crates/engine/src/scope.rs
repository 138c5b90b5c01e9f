use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// The actor and the group an operation runs against.
///
/// Both halves are optional so that a front end can pass whatever session
/// state it has; operations that need them fail with
/// [`EngineError::NotAuthenticated`] or [`EngineError::NoGroup`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub user_id: Option<String>,
    pub group_id: Option<Uuid>,
}

impl Scope {
    #[must_use]
    pub fn new(user_id: impl Into<String>, group_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id.into()),
            group_id: Some(group_id),
        }
    }

    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            group_id: None,
        }
    }

    pub fn require_user(&self) -> ResultEngine<&str> {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(EngineError::NotAuthenticated)
    }

    /// Returns `(user_id, group_id)`; the actor is checked first.
    pub fn require(&self) -> ResultEngine<(&str, Uuid)> {
        let user_id = self.require_user()?;
        let group_id = self.group_id.ok_or(EngineError::NoGroup)?;
        Ok((user_id, group_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_actor_wins_over_missing_group() {
        assert_eq!(Scope::default().require(), Err(EngineError::NotAuthenticated));
        assert_eq!(Scope::user("alice").require(), Err(EngineError::NoGroup));
        let group_id = Uuid::new_v4();
        assert_eq!(
            Scope::new("alice", group_id).require().unwrap(),
            ("alice", group_id)
        );
    }
}
