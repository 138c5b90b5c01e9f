//! Groups: the unit transactions are shared in.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    InviteCode, Payer, ResultEngine,
    group_memberships::{Member, MemberRole},
    util::parse_uuid,
};

/// Name given to the personal group provisioned for every new user.
pub const DEFAULT_GROUP_NAME: &str = "My Group";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub invite_code: Option<InviteCode>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Roster in join order.
    pub members: Vec<Member>,
}

impl Group {
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.member(user_id).is_some_and(Member::is_admin)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.user_id.as_str())
    }

    pub fn admins(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.role == MemberRole::Admin)
    }

    /// Name shown for a payer: the member's display name, or the external
    /// label as typed.
    pub fn payer_name(&self, payer: &Payer) -> String {
        match payer {
            Payer::Member(user_id) => self
                .member(user_id)
                .map_or_else(|| user_id.clone(), |m| m.display_name.clone()),
            Payer::External(label) => label.clone(),
        }
    }

    /// Resolves free-text payer input against the roster.
    ///
    /// A `user_id` or a display name (case-insensitive) picks that member;
    /// anything else is kept as an external label.
    pub fn resolve_payer(&self, input: &str) -> Payer {
        let needle = input.trim();
        self.members
            .iter()
            .find(|m| m.user_id == needle)
            .or_else(|| {
                self.members
                    .iter()
                    .find(|m| m.display_name.eq_ignore_ascii_case(needle))
            })
            .map_or_else(
                || Payer::External(needle.to_string()),
                |m| Payer::Member(m.user_id.clone()),
            )
    }

    pub(crate) fn from_parts(model: Model, members: Vec<Member>) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "group")?,
            name: model.name,
            invite_code: model
                .invite_code
                .as_deref()
                .map(InviteCode::parse)
                .transpose()?,
            created_by: model.created_by,
            created_at: model.created_at,
            members,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub invite_code: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_memberships::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::group_memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.to_string()),
            name: ActiveValue::Set(group.name.clone()),
            invite_code: ActiveValue::Set(
                group.invite_code.as_ref().map(|c| c.as_str().to_string()),
            ),
            created_by: ActiveValue::Set(group.created_by.clone()),
            created_at: ActiveValue::Set(group.created_at),
        }
    }
}
