use sea_orm::{ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, InviteCode, ResultEngine, Scope, groups, util::is_unique_violation};

use super::{Engine, with_tx};

impl Engine {
    /// Issues a new invite code for the scoped group; any member may do it.
    ///
    /// The previous code stops working as soon as this returns. A candidate
    /// already owned by a group (or rejected by the unique index) costs one
    /// attempt; after the configured number of attempts the call fails with
    /// [`EngineError::CodeGenerationExhausted`].
    pub async fn generate_invite_code(&self, scope: &Scope) -> ResultEngine<InviteCode> {
        let (user_id, group_id) = scope.require()?;
        for attempt in 1..=self.invite_code_attempts {
            let code = self.invite_codes.next_code();
            if self.try_assign_invite_code(user_id, group_id, &code).await? {
                tracing::info!("group {group_id} has a new invite code (attempt {attempt})");
                return Ok(code);
            }
            tracing::warn!("invite code collision on attempt {attempt} for group {group_id}");
        }
        Err(EngineError::CodeGenerationExhausted {
            attempts: self.invite_code_attempts,
        })
    }

    /// One attempt in its own store transaction. `Ok(false)` means the code is
    /// taken.
    async fn try_assign_invite_code(
        &self,
        user_id: &str,
        group_id: Uuid,
        code: &InviteCode,
    ) -> ResultEngine<bool> {
        with_tx!(self, format!("assign invite code to group {group_id}"), |db_tx| {
            self.require_member(&db_tx, user_id, group_id).await?;
            let taken = groups::Entity::find()
                .filter(groups::Column::InviteCode.eq(code.as_str().to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if taken {
                tracing::debug!("invite code {code} already in use");
                Ok(false)
            } else {
                let assigned = groups::ActiveModel {
                    id: ActiveValue::Unchanged(group_id.to_string()),
                    invite_code: ActiveValue::Set(Some(code.as_str().to_string())),
                    ..Default::default()
                }
                .update(&db_tx)
                .await;
                match assigned {
                    Ok(_) => Ok(true),
                    Err(err) if is_unique_violation(&err) => Ok(false),
                    Err(err) => Err(err.into()),
                }
            }
        })
    }
}
