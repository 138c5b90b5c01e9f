use sea_orm::{Condition, DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Goal, Money, ResultEngine, Scope,
    commands::{GoalPatch, NewGoal},
    goals,
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a goal owned by the scoped actor. Shared goals are attached to
    /// the scoped group.
    pub async fn create_goal(&self, scope: &Scope, draft: NewGoal) -> ResultEngine<Goal> {
        let user_id = scope.require_user()?;
        let group_id = if draft.shared {
            Some(scope.require()?.1)
        } else {
            None
        };
        let goal = Goal::new(user_id, group_id, draft)?;
        with_tx!(self, format!("create goal {}", goal.id), |db_tx| {
            if let Some(group_id) = group_id {
                self.require_member(&db_tx, user_id, group_id).await?;
            }
            goals::ActiveModel::from(&goal).insert(&db_tx).await?;
            tracing::info!("{user_id} created goal {}", goal.id);
            Ok(goal.clone())
        })
    }

    pub async fn add_goal_progress(
        &self,
        scope: &Scope,
        id: Uuid,
        amount: Money,
    ) -> ResultEngine<Goal> {
        let user_id = scope.require_user()?;
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "goal progress must be > 0, got {amount}"
            )));
        }
        with_tx!(self, format!("update goal {id}"), |db_tx| {
            let mut goal = self.find_visible_goal(&db_tx, user_id, id).await?;
            goal.add_progress(amount)?;
            goals::ActiveModel::from(&goal).update(&db_tx).await?;
            Ok(goal)
        })
    }

    /// Edits name, category, target or date. Saved progress is untouched.
    pub async fn update_goal(
        &self,
        scope: &Scope,
        id: Uuid,
        patch: GoalPatch,
    ) -> ResultEngine<Goal> {
        let user_id = scope.require_user()?;
        with_tx!(self, format!("update goal {id}"), |db_tx| {
            let mut goal = self.find_visible_goal(&db_tx, user_id, id).await?;
            if goal.apply_patch(patch)? {
                goals::ActiveModel::from(&goal).update(&db_tx).await?;
                tracing::info!("{user_id} edited goal {id}");
            }
            Ok(goal)
        })
    }

    /// Marks a goal as reached by raising its saved amount to the target.
    pub async fn complete_goal(&self, scope: &Scope, id: Uuid) -> ResultEngine<Goal> {
        let user_id = scope.require_user()?;
        with_tx!(self, format!("complete goal {id}"), |db_tx| {
            let mut goal = self.find_visible_goal(&db_tx, user_id, id).await?;
            if goal.complete() {
                goals::ActiveModel::from(&goal).update(&db_tx).await?;
                tracing::info!("{user_id} completed goal {id}");
            }
            Ok(goal)
        })
    }

    /// The actor's personal goals plus the goals shared with the scoped
    /// group, soonest target date first and undated goals last.
    pub async fn list_goals(&self, scope: &Scope) -> ResultEngine<Vec<Goal>> {
        let user_id = scope.require_user()?;
        with_tx!(self, format!("list goals of {user_id}"), |db_tx| {
            let mut visible = Condition::any().add(goals::Column::UserId.eq(user_id.to_string()));
            if let Some(group_id) = scope.group_id {
                self.require_member(&db_tx, user_id, group_id).await?;
                visible = visible.add(goals::Column::GroupId.eq(group_id.to_string()));
            }
            let mut out = goals::Entity::find()
                .filter(visible)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Goal::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            out.sort_by(|a, b| match (a.target_date, b.target_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.created_at.cmp(&b.created_at),
            });
            Ok(out)
        })
    }

    pub async fn delete_goal(&self, scope: &Scope, id: Uuid) -> ResultEngine<()> {
        let user_id = scope.require_user()?;
        with_tx!(self, format!("delete goal {id}"), |db_tx| {
            let goal = self.find_visible_goal(&db_tx, user_id, id).await?;
            goals::Entity::delete_by_id(goal.id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!("{user_id} deleted goal {id}");
            Ok(())
        })
    }

    /// A goal is visible to its owner and to the members of the group it is
    /// shared with.
    async fn find_visible_goal(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        id: Uuid,
    ) -> ResultEngine<Goal> {
        let not_found = || EngineError::KeyNotFound("goal not exists".to_string());
        let goal = goals::Entity::find_by_id(id.to_string())
            .one(db)
            .await?
            .map(Goal::try_from)
            .transpose()?
            .ok_or_else(not_found)?;
        if goal.user_id == user_id {
            return Ok(goal);
        }
        let shared_with_me = match (goal.group_id, self.membership_of(db, user_id).await?) {
            (Some(group_id), Some(membership)) => membership.group_id == group_id.to_string(),
            _ => false,
        };
        if !shared_with_me {
            return Err(not_found());
        }
        Ok(goal)
    }
}
