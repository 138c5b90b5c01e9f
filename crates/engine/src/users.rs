//! Users table.
//!
//! Identity comes from outside the engine; the row is refreshed on every
//! session start so display names in rosters stay current.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    ResultEngine,
    util::{normalize_optional_text, normalize_required_name},
};

/// The authenticated caller, as supplied by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub(crate) fn normalized(&self) -> ResultEngine<Self> {
        Ok(Self {
            user_id: normalize_required_name(&self.user_id, "user")?,
            display_name: normalize_required_name(&self.display_name, "display")?,
            email: normalize_optional_text(self.email.as_deref()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_memberships::Entity")]
    Memberships,
}

impl Related<super::group_memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Identity> for ActiveModel {
    fn from(identity: &Identity) -> Self {
        Self {
            id: ActiveValue::Set(identity.user_id.clone()),
            display_name: ActiveValue::Set(identity.display_name.clone()),
            email: ActiveValue::Set(identity.email.clone()),
        }
    }
}

impl From<Model> for Identity {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.id,
            display_name: model.display_name,
            email: model.email,
        }
    }
}
