//! Transaction primitives.
//!
//! A `Transaction` is one shared expense or income inside a group. It is
//! either pending or paid (by a [`Payer`]), and it carries the [`Split`]
//! dividing its amount among members. For custom splits the per-member
//! amounts are derived and kept in `individual_amounts`.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Category, EngineError, Money, ResultEngine,
    commands::{NewTransaction, PaymentPatch, TransactionPatch},
    split::{self, Split, SplitPolicy},
    util::{normalize_required_name, parse_uuid},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[default]
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Who settled a transaction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payer {
    /// A group member, by `user_id`. The display name is resolved at read
    /// time from the roster.
    Member(String),
    /// Someone outside the roster, recorded by free-text label.
    External(String),
}

impl Payer {
    pub fn member_id(&self) -> Option<&str> {
        match self {
            Self::Member(user_id) => Some(user_id),
            Self::External(_) => None,
        }
    }

    fn validate(&self) -> ResultEngine<()> {
        let value = match self {
            Self::Member(value) | Self::External(value) => value,
        };
        if value.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "payer must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Payer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(user_id) => f.write_str(user_id),
            Self::External(label) => f.write_str(label),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub group_id: Uuid,
    pub created_by: String,
    pub name: String,
    pub amount: Money,
    pub kind: TransactionKind,
    pub category: Category,
    pub date: NaiveDate,
    pub paid_by: Option<Payer>,
    pub split: Split,
    /// Derived from a custom split; empty for equal splits.
    pub individual_amounts: BTreeMap<String, Money>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a validated transaction from a draft.
    pub fn new(
        group_id: Uuid,
        created_by: impl Into<String>,
        draft: NewTransaction,
        policy: &SplitPolicy,
    ) -> ResultEngine<Self> {
        let mut tx = Self {
            id: Uuid::new_v4(),
            group_id,
            created_by: created_by.into(),
            name: draft.name,
            amount: draft.amount,
            kind: draft.kind,
            category: draft.category,
            date: draft.date,
            paid_by: draft.paid_by,
            split: draft.split,
            individual_amounts: BTreeMap::new(),
            created_at: Utc::now(),
        };
        tx.name = normalize_required_name(&tx.name, "transaction")?;
        tx.validate(policy)?;
        tx.recompute_individual_amounts();
        Ok(tx)
    }

    pub fn is_paid(&self) -> bool {
        self.paid_by.is_some()
    }

    /// Records `payer` as having settled the transaction.
    ///
    /// Returns `false` when it was already paid by the same payer.
    pub fn mark_paid(&mut self, payer: Payer) -> ResultEngine<bool> {
        payer.validate()?;
        if self.paid_by.as_ref() == Some(&payer) {
            return Ok(false);
        }
        self.paid_by = Some(payer);
        Ok(true)
    }

    /// Returns `false` when it was already pending.
    pub fn mark_pending(&mut self) -> bool {
        self.paid_by.take().is_some()
    }

    /// Replaces the split. The current split stays in place when the new one
    /// is rejected.
    pub fn update_split(&mut self, split: Split, policy: &SplitPolicy) -> ResultEngine<()> {
        split.validate(policy)?;
        self.split = split;
        self.recompute_individual_amounts();
        Ok(())
    }

    pub fn update_amount(&mut self, amount: Money) -> ResultEngine<()> {
        validate_amount(amount)?;
        self.amount = amount;
        self.recompute_individual_amounts();
        Ok(())
    }

    /// Applies every field present in `patch` or none of them.
    ///
    /// Returns whether anything changed.
    pub fn apply_patch(
        &mut self,
        patch: TransactionPatch,
        policy: &SplitPolicy,
    ) -> ResultEngine<bool> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = normalize_required_name(&name, "transaction")?;
        }
        if let Some(amount) = patch.amount {
            next.amount = amount;
        }
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        match patch.payment {
            Some(PaymentPatch::Paid(payer)) => {
                next.mark_paid(payer)?;
            }
            Some(PaymentPatch::Pending) => {
                next.mark_pending();
            }
            None => {}
        }
        if let Some(split) = patch.split {
            next.split = split;
        }

        next.validate(policy)?;
        next.recompute_individual_amounts();

        let changed = next != *self;
        *self = next;
        Ok(changed)
    }

    fn validate(&self, policy: &SplitPolicy) -> ResultEngine<()> {
        validate_amount(self.amount)?;
        if let Some(payer) = &self.paid_by {
            payer.validate()?;
        }
        self.split.validate(policy)
    }

    fn recompute_individual_amounts(&mut self) {
        self.individual_amounts = match &self.split {
            Split::Equal => BTreeMap::new(),
            Split::Custom(splits) => split::recompute_individual_amounts(self.amount, splits),
        };
    }
}

fn validate_amount(amount: Money) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be > 0, got {amount}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub created_by: String,
    pub name: String,
    pub amount_minor: i64,
    pub kind: String,
    pub category: String,
    pub date: Date,
    pub is_paid: bool,
    pub paid_by_user_id: Option<String>,
    pub paid_by_label: Option<String>,
    pub split_type: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_splits: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub individual_amounts: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Transaction> for ActiveModel {
    type Error = EngineError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        let (paid_by_user_id, paid_by_label) = match &tx.paid_by {
            Some(Payer::Member(user_id)) => (Some(user_id.clone()), None),
            Some(Payer::External(label)) => (None, Some(label.clone())),
            None => (None, None),
        };
        let encode = |err: serde_json::Error| {
            EngineError::InvalidInput(format!("cannot encode split for {}: {err}", tx.id))
        };
        let custom_splits = tx
            .split
            .custom_percentages()
            .map(serde_json::to_string)
            .transpose()
            .map_err(encode)?;
        let individual_amounts = if tx.individual_amounts.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&tx.individual_amounts).map_err(encode)?)
        };

        Ok(Self {
            id: ActiveValue::Set(tx.id.to_string()),
            group_id: ActiveValue::Set(tx.group_id.to_string()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            name: ActiveValue::Set(tx.name.clone()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category: ActiveValue::Set(tx.category.as_str().to_string()),
            date: ActiveValue::Set(tx.date),
            is_paid: ActiveValue::Set(tx.is_paid()),
            paid_by_user_id: ActiveValue::Set(paid_by_user_id),
            paid_by_label: ActiveValue::Set(paid_by_label),
            split_type: ActiveValue::Set(tx.split.split_type().to_string()),
            custom_splits: ActiveValue::Set(custom_splits),
            individual_amounts: ActiveValue::Set(individual_amounts),
            created_at: ActiveValue::Set(tx.created_at),
        })
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let decode = |err: serde_json::Error| {
            EngineError::InvalidInput(format!("corrupt split on transaction {}: {err}", model.id))
        };

        let paid_by = match (model.is_paid, &model.paid_by_user_id, &model.paid_by_label) {
            (false, _, _) => None,
            (true, Some(user_id), _) => Some(Payer::Member(user_id.clone())),
            (true, None, Some(label)) => Some(Payer::External(label.clone())),
            (true, None, None) => {
                return Err(EngineError::InvalidInput(format!(
                    "transaction {} is paid without a payer",
                    model.id
                )));
            }
        };

        let split = match model.split_type.as_str() {
            "equal" => Split::Equal,
            "custom" => Split::Custom(
                serde_json::from_str(model.custom_splits.as_deref().unwrap_or("{}"))
                    .map_err(decode)?,
            ),
            other => {
                return Err(EngineError::InvalidSplit(format!("unknown split type: {other}")));
            }
        };
        let individual_amounts = match model.individual_amounts.as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(decode)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            created_by: model.created_by,
            name: model.name,
            amount: Money::new(model.amount_minor),
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category: Category::try_from(model.category.as_str())?,
            date: model.date,
            paid_by,
            split,
            individual_amounts,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Percent;

    fn custom(entries: &[(&str, i64)]) -> Split {
        Split::Custom(
            entries
                .iter()
                .map(|(u, bp)| ((*u).to_string(), Percent::from_basis_points(*bp)))
                .collect(),
        )
    }

    fn dinner(split: Split) -> ResultEngine<Transaction> {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        Transaction::new(
            Uuid::new_v4(),
            "alice",
            NewTransaction::new("Dinner", Money::new(20_000), date).split(split),
            &SplitPolicy::default(),
        )
    }

    #[test]
    fn new_rejects_non_positive_amounts() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        for cents in [0, -100] {
            let err = Transaction::new(
                Uuid::new_v4(),
                "alice",
                NewTransaction::new("Dinner", Money::new(cents), date),
                &SplitPolicy::default(),
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::InvalidAmount(_)));
        }
    }

    #[test]
    fn custom_split_derives_individual_amounts() {
        let tx = dinner(custom(&[("alice", 6000), ("bob", 4000)])).unwrap();
        assert_eq!(tx.individual_amounts["alice"], Money::new(12_000));
        assert_eq!(tx.individual_amounts["bob"], Money::new(8000));
        assert!(!tx.is_paid());
    }

    #[test]
    fn rejected_split_keeps_previous_state() {
        let mut tx = dinner(custom(&[("alice", 6000), ("bob", 4000)])).unwrap();
        let before = tx.clone();
        let err = tx
            .update_split(custom(&[("alice", 6000), ("bob", 3900)]), &SplitPolicy::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::PercentageMismatch { .. }));
        assert_eq!(tx, before);
    }

    #[test]
    fn amount_change_recomputes_custom_amounts() {
        let mut tx = dinner(custom(&[("alice", 5000), ("bob", 5000)])).unwrap();
        tx.update_amount(Money::new(5000)).unwrap();
        assert_eq!(tx.individual_amounts["alice"], Money::new(2500));
        assert!(tx.update_amount(Money::ZERO).is_err());
        assert_eq!(tx.amount, Money::new(5000));
    }

    #[test]
    fn payment_transitions_are_idempotent() {
        let mut tx = dinner(Split::Equal).unwrap();
        assert!(tx.mark_paid(Payer::External("Alice".to_string())).unwrap());
        assert!(!tx.mark_paid(Payer::External("Alice".to_string())).unwrap());
        assert!(tx.mark_paid(Payer::Member("bob".to_string())).unwrap());
        assert_eq!(tx.paid_by, Some(Payer::Member("bob".to_string())));

        assert!(tx.mark_pending());
        assert!(!tx.mark_pending());
        assert_eq!(tx.paid_by, None);
    }

    #[test]
    fn blank_payer_is_rejected() {
        let mut tx = dinner(Split::Equal).unwrap();
        assert!(tx.mark_paid(Payer::External("  ".to_string())).is_err());
        assert!(!tx.is_paid());
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut tx = dinner(Split::Equal).unwrap();
        let before = tx.clone();
        let patch = TransactionPatch::default()
            .name("Lunch")
            .payment(PaymentPatch::Paid(Payer::Member("alice".to_string())))
            .split(custom(&[("alice", 9000)]));
        assert!(tx.apply_patch(patch, &SplitPolicy::default()).is_err());
        assert_eq!(tx, before);

        let patch = TransactionPatch::default()
            .name("Lunch")
            .amount(Money::new(3000))
            .category(Category::Food);
        assert!(tx.apply_patch(patch, &SplitPolicy::default()).unwrap());
        assert_eq!(tx.name, "Lunch");
        assert_eq!(tx.amount, Money::new(3000));
        assert!(!tx
            .apply_patch(TransactionPatch::default(), &SplitPolicy::default())
            .unwrap());
    }

    #[test]
    fn model_conversion_keeps_payer_and_split() {
        let mut tx = dinner(custom(&[("alice", 6000), ("bob", 4000)])).unwrap();
        tx.mark_paid(Payer::External("Alice".to_string())).unwrap();
        let active = ActiveModel::try_from(&tx).unwrap();
        assert_eq!(active.paid_by_label.unwrap(), Some("Alice".to_string()));
        assert_eq!(active.paid_by_user_id.unwrap(), None);
        assert_eq!(active.split_type.unwrap(), "custom");
    }
}
