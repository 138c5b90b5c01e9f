//! Command structs for engine operations.
//!
//! These types group parameters for write operations (new transaction,
//! transaction patch, new goal, goal patch), keeping call sites readable and
//! avoiding long argument lists.

use chrono::NaiveDate;

use crate::{Category, Money, Payer, Split, TransactionKind};

/// Draft of a transaction. Group and author are stamped by the engine from
/// the caller's scope.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub name: String,
    pub amount: Money,
    pub kind: TransactionKind,
    pub category: Category,
    pub date: NaiveDate,
    pub paid_by: Option<Payer>,
    pub split: Split,
}

impl NewTransaction {
    #[must_use]
    pub fn new(name: impl Into<String>, amount: Money, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            amount,
            kind: TransactionKind::Expense,
            category: Category::Other,
            date,
            paid_by: None,
            split: Split::Equal,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn paid_by(mut self, payer: Payer) -> Self {
        self.paid_by = Some(payer);
        self
    }

    #[must_use]
    pub fn split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }
}

/// Payment change carried by a [`TransactionPatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentPatch {
    Paid(Payer),
    Pending,
}

/// Partial update of a transaction. Unset fields are left alone.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub name: Option<String>,
    pub amount: Option<Money>,
    pub kind: Option<TransactionKind>,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
    pub payment: Option<PaymentPatch>,
    pub split: Option<Split>,
}

impl TransactionPatch {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn payment(mut self, payment: PaymentPatch) -> Self {
        self.payment = Some(payment);
        self
    }

    #[must_use]
    pub fn split(mut self, split: Split) -> Self {
        self.split = Some(split);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.kind.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.payment.is_none()
            && self.split.is_none()
    }
}

/// Draft of a savings goal.
#[derive(Clone, Debug)]
pub struct NewGoal {
    pub name: String,
    pub category: Category,
    pub target_amount: Money,
    pub current_amount: Money,
    pub target_date: Option<NaiveDate>,
    /// Share the goal with the caller's group.
    pub shared: bool,
}

impl NewGoal {
    #[must_use]
    pub fn new(name: impl Into<String>, target_amount: Money) -> Self {
        Self {
            name: name.into(),
            category: Category::Other,
            target_amount,
            current_amount: Money::ZERO,
            target_date: None,
            shared: false,
        }
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn current_amount(mut self, amount: Money) -> Self {
        self.current_amount = amount;
        self
    }

    #[must_use]
    pub fn target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    #[must_use]
    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }
}

/// Edit of a goal's description. Progress is changed through
/// `add_goal_progress` and `complete_goal` only.
#[derive(Clone, Debug, Default)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub target_amount: Option<Money>,
    pub target_date: Option<NaiveDate>,
}

impl GoalPatch {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn target_amount(mut self, amount: Money) -> Self {
        self.target_amount = Some(amount);
        self
    }

    #[must_use]
    pub fn target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.target_amount.is_none()
            && self.target_date.is_none()
    }
}
