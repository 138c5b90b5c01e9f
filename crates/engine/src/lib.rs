//! Shared transaction splitting and settlement.
//!
//! A group of people records expenses and income, divides each amount among
//! its members (equally or by custom percentages), tracks which transactions
//! are paid and by whom, and derives who owes whom. Group membership and
//! invite codes decide who takes part in a split.
//!
//! Pure computations live in [`split`], [`Transaction`], [`Ledger`] and
//! [`SettlementReport`]; everything touching the store goes through
//! [`Engine`].

pub use categories::Category;
pub use commands::{GoalPatch, NewGoal, NewTransaction, PaymentPatch, TransactionPatch};
pub use error::{Deviation, EngineError, ErrorKind};
pub use goals::{Goal, GoalStats};
pub use group_memberships::{Member, MemberRole};
pub use groups::{DEFAULT_GROUP_NAME, Group};
pub use invite_codes::{INVITE_CODE_LEN, InviteCode, InviteCodeSource, RandomInviteCodes};
pub use ledger::{CategoryFilter, Ledger, LedgerTotals};
pub use money::Money;
pub use ops::{DEFAULT_INVITE_CODE_ATTEMPTS, Engine, EngineBuilder};
pub use percent::Percent;
pub use scope::Scope;
pub use settlement::{BalanceStatus, MemberBalance, SettlementReport, Transfer};
pub use split::{DEFAULT_SPLIT_TOLERANCE, Split, SplitPolicy};
pub use transactions::{Payer, Transaction, TransactionKind};
pub use users::Identity;

mod categories;
mod commands;
mod error;
mod goals;
mod group_memberships;
mod groups;
mod invite_codes;
mod ledger;
mod money;
mod ops;
mod percent;
mod scope;
mod settlement;
pub mod split;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
