use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Ledger, ResultEngine, Scope, Transaction, TransactionPatch,
    commands::NewTransaction, transactions,
};

use super::{
    Engine,
    access::{check_patch_roster, check_roster},
    with_tx,
};

impl Engine {
    /// Persists a new transaction in the scoped group, authored by the scoped
    /// actor. Nothing is written when the draft is invalid.
    pub async fn create_transaction(
        &self,
        scope: &Scope,
        draft: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let (user_id, group_id) = scope.require()?;
        let tx = Transaction::new(group_id, user_id, draft, &self.split_policy)?;
        with_tx!(self, format!("create transaction {}", tx.id), |db_tx| {
            let group = self.require_member(&db_tx, user_id, group_id).await?;
            check_roster(&group, tx.paid_by.as_ref(), Some(&tx.split))?;
            transactions::ActiveModel::try_from(&tx)?
                .insert(&db_tx)
                .await?;
            tracing::info!("{user_id} added transaction {} to group {group_id}", tx.id);
            Ok(tx.clone())
        })
    }

    /// Applies `patch` to a transaction of the scoped group and returns the
    /// stored result. An empty or no-op patch skips the write.
    pub async fn update_transaction(
        &self,
        scope: &Scope,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("update transaction {id}"), |db_tx| {
            let group = self.require_member(&db_tx, user_id, group_id).await?;
            let mut tx = self.find_transaction(&db_tx, group_id, id).await?;
            check_patch_roster(&group, &patch)?;
            if tx.apply_patch(patch.clone(), &self.split_policy)? {
                transactions::ActiveModel::try_from(&tx)?
                    .update(&db_tx)
                    .await?;
                tracing::info!("{user_id} updated transaction {id}");
            } else {
                tracing::debug!("transaction {id} unchanged");
            }
            Ok(tx)
        })
    }

    pub async fn delete_transaction(&self, scope: &Scope, id: Uuid) -> ResultEngine<()> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("delete transaction {id}"), |db_tx| {
            self.require_member(&db_tx, user_id, group_id).await?;
            let res = transactions::Entity::delete_many()
                .filter(transactions::Column::Id.eq(id.to_string()))
                .filter(transactions::Column::GroupId.eq(group_id.to_string()))
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(
                    "transaction not exists".to_string(),
                ));
            }
            tracing::info!("{user_id} deleted transaction {id}");
            Ok(())
        })
    }

    pub async fn transaction(&self, scope: &Scope, id: Uuid) -> ResultEngine<Transaction> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("load transaction {id}"), |db_tx| {
            self.require_member(&db_tx, user_id, group_id).await?;
            self.find_transaction(&db_tx, group_id, id).await
        })
    }

    /// Every transaction of the scoped group, newest first.
    pub async fn list_transactions(&self, scope: &Scope) -> ResultEngine<Vec<Transaction>> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("list transactions of group {group_id}"), |db_tx| {
            self.require_member(&db_tx, user_id, group_id).await?;
            self.group_transactions(&db_tx, group_id).await
        })
    }

    /// Loads a fresh [`Ledger`] for the scoped group.
    pub async fn ledger(&self, scope: &Scope) -> ResultEngine<Ledger> {
        let (_, group_id) = scope.require()?;
        let transactions = self.list_transactions(scope).await?;
        Ok(Ledger::new(group_id, transactions))
    }

    async fn find_transaction(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        id: Uuid,
    ) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id.to_string())
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    pub(super) async fn group_transactions(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(transactions::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}
