//! Savings goals.
//!
//! A goal belongs to one user and may be shared with that user's group.
//! Progress only ever grows.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Category, EngineError, Money, ResultEngine,
    commands::{GoalPatch, NewGoal},
    util::{normalize_required_name, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: String,
    pub group_id: Option<Uuid>,
    pub name: String,
    pub category: Category,
    pub target_amount: Money,
    pub current_amount: Money,
    pub target_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        user_id: impl Into<String>,
        group_id: Option<Uuid>,
        draft: NewGoal,
    ) -> ResultEngine<Self> {
        if !draft.target_amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "goal target must be > 0".to_string(),
            ));
        }
        if draft.current_amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "goal starting amount must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            group_id,
            name: normalize_required_name(&draft.name, "goal")?,
            category: draft.category,
            target_amount: draft.target_amount,
            current_amount: draft.current_amount,
            target_date: draft.target_date,
            created_at: Utc::now(),
        })
    }

    pub fn is_completed(&self) -> bool {
        self.current_amount >= self.target_amount
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed() && self.target_date.is_some_and(|d| d < today)
    }

    /// Amount still missing, never negative.
    pub fn remaining(&self) -> Money {
        if self.is_completed() {
            Money::ZERO
        } else {
            self.target_amount - self.current_amount
        }
    }

    pub fn add_progress(&mut self, amount: Money) -> ResultEngine<()> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "goal progress must be > 0, got {amount}"
            )));
        }
        self.current_amount = self
            .current_amount
            .checked_add(amount)
            .ok_or_else(|| EngineError::InvalidAmount("goal amount too large".to_string()))?;
        Ok(())
    }

    /// Applies every field of `patch` or none of them. Returns whether
    /// anything changed.
    pub fn apply_patch(&mut self, patch: GoalPatch) -> ResultEngine<bool> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = normalize_required_name(&name, "goal")?;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(target) = patch.target_amount {
            if !target.is_positive() {
                return Err(EngineError::InvalidAmount(
                    "goal target must be > 0".to_string(),
                ));
            }
            next.target_amount = target;
        }
        if let Some(date) = patch.target_date {
            next.target_date = Some(date);
        }
        let changed = next != *self;
        *self = next;
        Ok(changed)
    }

    /// Raises the saved amount to the target. Returns whether anything
    /// changed.
    pub fn complete(&mut self) -> bool {
        if self.is_completed() {
            return false;
        }
        self.current_amount = self.target_amount;
        true
    }
}

/// Aggregates over a list of goals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GoalStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    pub target_sum: Money,
    pub saved_sum: Money,
    /// Completed goals over all goals, in whole percent.
    pub completion_rate: u8,
}

impl GoalStats {
    pub fn from_goals(goals: &[Goal], today: NaiveDate) -> Self {
        let total = goals.len();
        let completed = goals.iter().filter(|g| g.is_completed()).count();
        let completion_rate = if total == 0 {
            0
        } else {
            u8::try_from(completed * 100 / total).unwrap_or(100)
        };
        Self {
            total,
            completed,
            in_progress: total - completed,
            overdue: goals.iter().filter(|g| g.is_overdue(today)).count(),
            target_sum: goals.iter().map(|g| g.target_amount).sum(),
            saved_sum: goals.iter().map(|g| g.current_amount).sum(),
            completion_rate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub name: String,
    pub category: String,
    pub target_minor: i64,
    pub current_minor: i64,
    pub target_date: Option<Date>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Goal> for ActiveModel {
    fn from(goal: &Goal) -> Self {
        Self {
            id: ActiveValue::Set(goal.id.to_string()),
            user_id: ActiveValue::Set(goal.user_id.clone()),
            group_id: ActiveValue::Set(goal.group_id.map(|id| id.to_string())),
            name: ActiveValue::Set(goal.name.clone()),
            category: ActiveValue::Set(goal.category.as_str().to_string()),
            target_minor: ActiveValue::Set(goal.target_amount.cents()),
            current_minor: ActiveValue::Set(goal.current_amount.cents()),
            target_date: ActiveValue::Set(goal.target_date),
            created_at: ActiveValue::Set(goal.created_at),
        }
    }
}

impl TryFrom<Model> for Goal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "goal")?,
            user_id: model.user_id,
            group_id: model
                .group_id
                .as_deref()
                .map(|id| parse_uuid(id, "group"))
                .transpose()?,
            name: model.name,
            category: Category::try_from(model.category.as_str())?,
            target_amount: Money::new(model.target_minor),
            current_amount: Money::new(model.current_minor),
            target_date: model.target_date,
            created_at: model.created_at,
        })
    }
}
