//! In-memory view of one group's transactions.
//!
//! The ledger never talks to the store by itself: every write goes through
//! [`Engine`] first and the local collection is patched only after the store
//! accepted it. Refreshes replace the whole collection.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    Category, Engine, Group, Money, Payer, ResultEngine, Scope, Split, Transaction,
    TransactionKind,
    commands::{NewTransaction, PaymentPatch, TransactionPatch},
};

/// Sums over a set of transactions. `pending` is always `total - paid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub total: Money,
    pub paid: Money,
    pub pending: Money,
    pub count: usize,
}

impl LedgerTotals {
    fn collect<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> Self {
        let mut out = Self::default();
        for tx in transactions {
            out.total += tx.amount;
            if tx.is_paid() {
                out.paid += tx.amount;
            }
            out.count += 1;
        }
        out.pending = out.total - out.paid;
        out
    }
}

/// Which transactions count towards per-category sums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Money that actually moved (reports).
    #[default]
    PaidOnly,
    /// Paid and pending alike (planning).
    All,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ledger {
    group_id: Uuid,
    /// Newest first by `created_at`.
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(group_id: Uuid, mut transactions: Vec<Transaction>) -> Self {
        transactions.retain(|tx| tx.group_id == group_id);
        sort_newest_first(&mut transactions);
        Self {
            group_id,
            transactions,
        }
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    fn scope(&self, actor: &str) -> Scope {
        Scope::new(actor, self.group_id)
    }

    /// Re-fetches every transaction of the group.
    pub async fn refresh(&mut self, engine: &Engine, actor: &str) -> ResultEngine<()> {
        let transactions = engine.list_transactions(&self.scope(actor)).await?;
        self.transactions = transactions;
        sort_newest_first(&mut self.transactions);
        Ok(())
    }

    /// Points the ledger at another group (after a join or leave) and loads
    /// it.
    pub async fn rescope(
        &mut self,
        engine: &Engine,
        actor: &str,
        group_id: Uuid,
    ) -> ResultEngine<()> {
        let mut transactions = engine
            .list_transactions(&Scope::new(actor, group_id))
            .await?;
        sort_newest_first(&mut transactions);
        self.group_id = group_id;
        self.transactions = transactions;
        Ok(())
    }

    /// Persists a new transaction in this ledger's group, authored by
    /// `actor`, and returns the stored record.
    pub async fn add(
        &mut self,
        engine: &Engine,
        actor: &str,
        draft: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let stored = engine
            .create_transaction(&self.scope(actor), draft)
            .await?;
        self.transactions.push(stored.clone());
        sort_newest_first(&mut self.transactions);
        Ok(stored)
    }

    pub async fn update(
        &mut self,
        engine: &Engine,
        actor: &str,
        id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let stored = engine
            .update_transaction(&self.scope(actor), id, patch)
            .await?;
        match self.transactions.iter_mut().find(|tx| tx.id == id) {
            Some(slot) => *slot = stored.clone(),
            None => {
                self.transactions.push(stored.clone());
                sort_newest_first(&mut self.transactions);
            }
        }
        Ok(stored)
    }

    pub async fn remove(&mut self, engine: &Engine, actor: &str, id: Uuid) -> ResultEngine<()> {
        engine.delete_transaction(&self.scope(actor), id).await?;
        self.transactions.retain(|tx| tx.id != id);
        Ok(())
    }

    pub async fn mark_paid(
        &mut self,
        engine: &Engine,
        actor: &str,
        id: Uuid,
        payer: Payer,
    ) -> ResultEngine<Transaction> {
        let patch = TransactionPatch::default().payment(PaymentPatch::Paid(payer));
        self.update(engine, actor, id, patch).await
    }

    pub async fn mark_pending(
        &mut self,
        engine: &Engine,
        actor: &str,
        id: Uuid,
    ) -> ResultEngine<Transaction> {
        let patch = TransactionPatch::default().payment(PaymentPatch::Pending);
        self.update(engine, actor, id, patch).await
    }

    pub async fn update_split(
        &mut self,
        engine: &Engine,
        actor: &str,
        id: Uuid,
        split: Split,
    ) -> ResultEngine<Transaction> {
        let patch = TransactionPatch::default().split(split);
        self.update(engine, actor, id, patch).await
    }

    pub async fn update_amount(
        &mut self,
        engine: &Engine,
        actor: &str,
        id: Uuid,
        amount: Money,
    ) -> ResultEngine<Transaction> {
        let patch = TransactionPatch::default().amount(amount);
        self.update(engine, actor, id, patch).await
    }

    pub fn totals(&self) -> LedgerTotals {
        LedgerTotals::collect(self.transactions.iter())
    }

    pub fn kind_totals(&self, kind: TransactionKind) -> LedgerTotals {
        LedgerTotals::collect(self.transactions.iter().filter(|tx| tx.kind == kind))
    }

    pub fn by_category(&self, filter: CategoryFilter) -> BTreeMap<Category, Money> {
        let mut out = BTreeMap::new();
        for tx in &self.transactions {
            if filter == CategoryFilter::PaidOnly && !tx.is_paid() {
                continue;
            }
            *out.entry(tx.category).or_insert(Money::ZERO) += tx.amount;
        }
        out
    }

    /// Paid amounts grouped by payer.
    pub fn by_payer(&self) -> BTreeMap<Payer, Money> {
        let mut out = BTreeMap::new();
        for tx in &self.transactions {
            if let Some(payer) = &tx.paid_by {
                *out.entry(payer.clone()).or_insert(Money::ZERO) += tx.amount;
            }
        }
        out
    }

    /// Like [`Ledger::by_payer`] but keyed by the name shown to users.
    pub fn by_member_name(&self, group: &Group) -> BTreeMap<String, Money> {
        let mut out = BTreeMap::new();
        for (payer, amount) in self.by_payer() {
            *out.entry(group.payer_name(&payer)).or_insert(Money::ZERO) += amount;
        }
        out
    }

    pub fn newest_first(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Pending transactions, soonest date first.
    pub fn upcoming(&self) -> Vec<&Transaction> {
        let mut pending: Vec<&Transaction> =
            self.transactions.iter().filter(|tx| !tx.is_paid()).collect();
        pending.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        pending
    }
}

fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::SplitPolicy;

    fn tx(
        group_id: Uuid,
        name: &str,
        cents: i64,
        category: Category,
        day: u32,
        paid_by: Option<Payer>,
        age_minutes: i64,
    ) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2026, 5, day).unwrap();
        let mut draft = NewTransaction::new(name, Money::new(cents), date).category(category);
        if let Some(payer) = paid_by {
            draft = draft.paid_by(payer);
        }
        let mut tx = Transaction::new(group_id, "u-alice", draft, &SplitPolicy::default()).unwrap();
        tx.created_at -= Duration::minutes(age_minutes);
        tx
    }

    fn alice() -> Option<Payer> {
        Some(Payer::Member("u-alice".to_string()))
    }

    fn mom() -> Option<Payer> {
        Some(Payer::External("Mom".to_string()))
    }

    fn sample() -> Ledger {
        let group_id = Uuid::new_v4();
        Ledger::new(
            group_id,
            vec![
                tx(group_id, "Rent", 80_000, Category::Housing, 1, alice(), 30),
                tx(group_id, "Groceries", 6000, Category::Food, 20, None, 20),
                tx(group_id, "Pizza", 2500, Category::Food, 10, mom(), 10),
                tx(group_id, "Bus", 150, Category::Transport, 5, None, 0),
                tx(Uuid::new_v4(), "Elsewhere", 999, Category::Other, 1, None, 0),
            ],
        )
    }

    #[test]
    fn foreign_rows_are_dropped_and_order_is_newest_first() {
        let ledger = sample();
        let names: Vec<&str> = ledger.newest_first().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Bus", "Pizza", "Groceries", "Rent"]);
    }

    #[test]
    fn totals_split_paid_and_pending() {
        let totals = sample().totals();
        assert_eq!(totals.total, Money::new(88_650));
        assert_eq!(totals.paid, Money::new(82_500));
        assert_eq!(totals.pending, Money::new(6150));
        assert_eq!(totals.count, 4);
        assert_eq!(sample().kind_totals(TransactionKind::Income), LedgerTotals::default());
    }

    #[test]
    fn category_sums_depend_on_filter() {
        let ledger = sample();
        let paid = ledger.by_category(CategoryFilter::PaidOnly);
        assert_eq!(paid[&Category::Food], Money::new(2500));
        assert!(!paid.contains_key(&Category::Transport));

        let all = ledger.by_category(CategoryFilter::All);
        assert_eq!(all[&Category::Food], Money::new(8500));
        assert_eq!(all[&Category::Transport], Money::new(150));
    }

    #[test]
    fn payer_sums_only_count_paid() {
        let by_payer = sample().by_payer();
        assert_eq!(by_payer.len(), 2);
        assert_eq!(by_payer[&Payer::Member("u-alice".to_string())], Money::new(80_000));
        assert_eq!(by_payer[&Payer::External("Mom".to_string())], Money::new(2500));
    }

    #[test]
    fn upcoming_lists_pending_by_date() {
        let ledger = sample();
        let names: Vec<&str> = ledger.upcoming().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Bus", "Groceries"]);
    }
}
