use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Group, Identity, Payer, ResultEngine, Split, TransactionPatch,
    commands::PaymentPatch,
    group_memberships::{self, Member, MemberRole},
    groups::{self, DEFAULT_GROUP_NAME},
    users,
};

use super::Engine;

impl Engine {
    /// Inserts or refreshes the caller's profile.
    pub(super) async fn upsert_user(
        &self,
        db: &DatabaseTransaction,
        identity: &Identity,
    ) -> ResultEngine<()> {
        let active = users::ActiveModel::from(identity);
        match users::Entity::find_by_id(identity.user_id.clone())
            .one(db)
            .await?
        {
            Some(existing)
                if existing.display_name == identity.display_name
                    && existing.email == identity.email => {}
            Some(_) => {
                active.update(db).await?;
            }
            None => {
                active.insert(db).await?;
            }
        }
        Ok(())
    }

    pub(super) async fn membership_of(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Option<group_memberships::Model>> {
        group_memberships::Entity::find()
            .filter(group_memberships::Column::UserId.eq(user_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Loads a group together with its roster, in join order.
    pub(super) async fn load_group(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Group> {
        let model = groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        let rows = group_memberships::Entity::find()
            .filter(group_memberships::Column::GroupId.eq(group_id.to_string()))
            .find_also_related(users::Entity)
            .order_by_asc(group_memberships::Column::JoinedAt)
            .all(db)
            .await?;
        let members = rows
            .into_iter()
            .map(|(membership, user)| Member::from_rows(membership, user))
            .collect::<ResultEngine<Vec<_>>>()?;
        Group::from_parts(model, members)
    }

    /// Loads the group and checks that `user_id` belongs to it.
    ///
    /// Groups the caller is not part of are reported as missing.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        group_id: Uuid,
    ) -> ResultEngine<Group> {
        let group = self.load_group(db, &group_id.to_string()).await?;
        if !group.is_member(user_id) {
            return Err(EngineError::KeyNotFound("group not exists".to_string()));
        }
        Ok(group)
    }

    pub(super) async fn require_admin(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        group_id: Uuid,
        action: &str,
    ) -> ResultEngine<Group> {
        let group = self.require_member(db, user_id, group_id).await?;
        if !group.is_admin(user_id) {
            return Err(EngineError::PermissionDenied(format!(
                "only an admin can {action}"
            )));
        }
        Ok(group)
    }

    pub(super) async fn insert_membership(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> ResultEngine<()> {
        group_memberships::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            group_id: ActiveValue::Set(group_id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            role: ActiveValue::Set(role.as_str().to_string()),
            joined_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    /// Creates a fresh group with `user_id` as its only member and admin.
    pub(super) async fn create_personal_group(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Group> {
        let group = Group {
            id: Uuid::new_v4(),
            name: DEFAULT_GROUP_NAME.to_string(),
            invite_code: None,
            created_by: user_id.to_string(),
            created_at: Utc::now(),
            members: Vec::new(),
        };
        let group_id = group.id.to_string();
        groups::ActiveModel::from(&group).insert(db).await?;
        self.insert_membership(db, &group_id, user_id, MemberRole::Admin)
            .await?;
        tracing::info!("created group {group_id} for {user_id}");
        self.load_group(db, &group_id).await
    }
}

/// Rejects payers and custom split entries that name someone outside the
/// roster. External payers are always accepted.
pub(super) fn check_roster(
    group: &Group,
    payer: Option<&Payer>,
    split: Option<&Split>,
) -> ResultEngine<()> {
    if let Some(Payer::Member(user_id)) = payer
        && !group.is_member(user_id)
    {
        return Err(EngineError::InvalidInput(format!(
            "payer {user_id} is not a member of the group"
        )));
    }
    if let Some(Split::Custom(splits)) = split
        && let Some(stranger) = splits.keys().find(|user_id| !group.is_member(user_id))
    {
        return Err(EngineError::InvalidSplit(format!(
            "{stranger} is not a member of the group"
        )));
    }
    Ok(())
}

/// Roster check for the fields a patch touches.
pub(super) fn check_patch_roster(group: &Group, patch: &TransactionPatch) -> ResultEngine<()> {
    let payer = match &patch.payment {
        Some(PaymentPatch::Paid(payer)) => Some(payer),
        _ => None,
    };
    check_roster(group, payer, patch.split.as_ref())
}
