use sea_orm::{ActiveValue, ModelTrait, prelude::*};

use crate::{
    EngineError, Group, Identity, InviteCode, ResultEngine, Scope,
    group_memberships::MemberRole,
    groups,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Returns the caller's group, provisioning a personal one ("My Group",
    /// caller as admin) on first use. Safe to call on every session start.
    pub async fn ensure_group(&self, identity: &Identity) -> ResultEngine<Group> {
        let identity = identity.normalized()?;
        with_tx!(self, format!("ensure group for {}", identity.user_id), |db_tx| {
            self.upsert_user(&db_tx, &identity).await?;
            match self.membership_of(&db_tx, &identity.user_id).await? {
                Some(membership) => self.load_group(&db_tx, &membership.group_id).await,
                None => self.create_personal_group(&db_tx, &identity.user_id).await,
            }
        })
    }

    /// The group `user_id` currently belongs to, if any.
    pub async fn current_group(&self, user_id: &str) -> ResultEngine<Option<Group>> {
        with_tx!(self, format!("current group of {user_id}"), |db_tx| {
            match self.membership_of(&db_tx, user_id).await? {
                Some(membership) => self
                    .load_group(&db_tx, &membership.group_id)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        })
    }

    /// The scoped group with its roster; the actor must be a member.
    pub async fn group(&self, scope: &Scope) -> ResultEngine<Group> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("load group {group_id}"), |db_tx| {
            self.require_member(&db_tx, user_id, group_id).await
        })
    }

    /// Moves the caller into the group owning `code`.
    ///
    /// The previous membership is dropped in the same store transaction; the
    /// previous group itself is kept.
    pub async fn join_group(&self, identity: &Identity, code: &str) -> ResultEngine<Group> {
        let identity = identity.normalized()?;
        let code = InviteCode::parse(code)?;
        with_tx!(self, format!("join group with code {code}"), |db_tx| {
            self.upsert_user(&db_tx, &identity).await?;
            let target = groups::Entity::find()
                .filter(groups::Column::InviteCode.eq(code.as_str().to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::InvalidInviteCode(format!("no group uses code {code}"))
                })?;

            if let Some(current) = self.membership_of(&db_tx, &identity.user_id).await? {
                if current.group_id == target.id {
                    return Err(EngineError::AlreadyMember(target.name.clone()));
                }
                tracing::debug!(
                    "{} leaves group {} to join {}",
                    identity.user_id,
                    current.group_id,
                    target.id
                );
                current.delete(&db_tx).await?;
            }

            self.insert_membership(&db_tx, &target.id, &identity.user_id, MemberRole::Member)
                .await?;
            tracing::info!("{} joined group {}", identity.user_id, target.id);
            self.load_group(&db_tx, &target.id).await
        })
    }

    /// Removes `target_user_id` from the scoped group. Admin only, and an
    /// admin cannot remove themselves this way.
    pub async fn remove_member(&self, scope: &Scope, target_user_id: &str) -> ResultEngine<Group> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(
            self,
            format!("remove {target_user_id} from group {group_id}"),
            |db_tx| {
                let group = self
                    .require_admin(&db_tx, user_id, group_id, "remove members")
                    .await?;
                if target_user_id == user_id {
                    return Err(EngineError::PermissionDenied(
                        "admins cannot remove themselves, leave the group instead".to_string(),
                    ));
                }
                if !group.is_member(target_user_id) {
                    return Err(EngineError::KeyNotFound("member not exists".to_string()));
                }
                let membership = self
                    .membership_of(&db_tx, target_user_id)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
                membership.delete(&db_tx).await?;
                tracing::info!("{user_id} removed {target_user_id} from group {group_id}");
                self.load_group(&db_tx, &group_id.to_string()).await
            }
        )
    }

    /// Leaves the scoped group and lands the caller in a fresh personal
    /// group, which is returned.
    pub async fn leave_group(&self, scope: &Scope) -> ResultEngine<Group> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("leave group {group_id}"), |db_tx| {
            self.require_member(&db_tx, user_id, group_id).await?;
            if let Some(membership) = self.membership_of(&db_tx, user_id).await? {
                membership.delete(&db_tx).await?;
            }
            tracing::info!("{user_id} left group {group_id}");
            self.create_personal_group(&db_tx, user_id).await
        })
    }

    pub async fn rename_group(&self, scope: &Scope, name: &str) -> ResultEngine<Group> {
        let (user_id, group_id) = scope.require()?;
        let name = normalize_required_name(name, "group")?;
        with_tx!(self, format!("rename group {group_id}"), |db_tx| {
            self.require_admin(&db_tx, user_id, group_id, "rename the group")
                .await?;
            groups::ActiveModel {
                id: ActiveValue::Unchanged(group_id.to_string()),
                name: ActiveValue::Set(name.clone()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            self.load_group(&db_tx, &group_id.to_string()).await
        })
    }
}
