use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{Category, Money, Split};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "spartito")]
#[command(about = "Split shared expenses inside a group and settle who owes whom")]
pub struct Cli {
    /// Optional config file path (TOML). Defaults to `spartito.toml`.
    #[arg(long, env = "SPARTITO_CONFIG")]
    pub config: Option<String>,

    /// Database connection string, overrides the configured database.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// User id of the caller.
    #[arg(long, env = "SPARTITO_USER")]
    pub user: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    User(User),
    Group(Group),
    Tx(Tx),
    /// Who owes whom in the current group.
    Report,
    Goal(Goal),
}

#[derive(Args, Debug)]
pub struct User {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Store the caller's profile and provision a personal group.
    Register(RegisterArgs),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    Show,
    Rename { name: String },
    /// Issue a new invite code; the previous one stops working.
    Invite,
    Join { code: String },
    Leave,
    RemoveMember { user_id: String },
}

#[derive(Args, Debug)]
pub struct Tx {
    #[command(subcommand)]
    pub command: TxCommand,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    Add(TxAddArgs),
    List(TxListArgs),
    /// Pending transactions, soonest first.
    Upcoming,
    Pay {
        id: Uuid,
        /// Member id, member name or any other label.
        #[arg(long)]
        by: String,
    },
    Unpay {
        id: Uuid,
    },
    /// `equal` or `alice=60,bob=40`.
    Split {
        id: Uuid,
        split: Split,
    },
    Amount {
        id: Uuid,
        amount: Money,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct TxAddArgs {
    pub name: String,
    pub amount: Money,
    /// Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long, default_value = "expense")]
    pub kind: String,
    #[arg(long, default_value = "other")]
    pub category: Category,
    #[arg(long)]
    pub paid_by: Option<String>,
    /// `equal` or `alice=60,bob=40`.
    #[arg(long, default_value = "equal")]
    pub split: Split,
}

#[derive(Args, Debug)]
pub struct TxListArgs {
    /// Also print totals per category.
    #[arg(long)]
    pub by_category: bool,
    /// Count pending transactions in the category totals.
    #[arg(long, requires = "by_category")]
    pub include_pending: bool,
}

#[derive(Args, Debug)]
pub struct Goal {
    #[command(subcommand)]
    pub command: GoalCommand,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAddArgs),
    Progress { id: Uuid, amount: Money },
    /// Change name, category, target or date.
    Edit(GoalEditArgs),
    /// Mark the goal as reached.
    Complete { id: Uuid },
    List,
    Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct GoalAddArgs {
    pub name: String,
    pub target: Money,
    #[arg(long, default_value = "other")]
    pub category: Category,
    #[arg(long)]
    pub current: Option<Money>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Share the goal with the current group.
    #[arg(long)]
    pub shared: bool,
}

#[derive(Args, Debug)]
pub struct GoalEditArgs {
    pub id: Uuid,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<Category>,
    #[arg(long)]
    pub target: Option<Money>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
}
