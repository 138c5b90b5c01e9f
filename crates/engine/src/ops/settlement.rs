use crate::{Ledger, ResultEngine, Scope, SettlementReport};

use super::{Engine, with_tx};

impl Engine {
    /// Computes who owes whom in the scoped group from a consistent snapshot
    /// of roster and transactions.
    pub async fn settlement_report(&self, scope: &Scope) -> ResultEngine<SettlementReport> {
        let (user_id, group_id) = scope.require()?;
        with_tx!(self, format!("settle group {group_id}"), |db_tx| {
            let group = self.require_member(&db_tx, user_id, group_id).await?;
            let transactions = self.group_transactions(&db_tx, group_id).await?;
            SettlementReport::compute(&Ledger::new(group_id, transactions), &group)
        })
    }
}
