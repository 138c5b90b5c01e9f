use sea_orm::EntityTrait;

use crate::{EngineError, Identity, ResultEngine, users};

use super::{Engine, with_tx};

impl Engine {
    /// Creates or refreshes the profile of an authenticated user.
    pub async fn ensure_user(&self, identity: &Identity) -> ResultEngine<Identity> {
        let identity = identity.normalized()?;
        with_tx!(self, format!("ensure user {}", identity.user_id), |db_tx| {
            self.upsert_user(&db_tx, &identity).await?;
            Ok(identity.clone())
        })
    }

    /// The stored profile of `user_id`.
    pub async fn user(&self, user_id: &str) -> ResultEngine<Identity> {
        with_tx!(self, format!("load user {user_id}"), |db_tx| {
            users::Entity::find_by_id(user_id.to_string())
                .one(&db_tx)
                .await?
                .map(Identity::from)
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
        })
    }
}
