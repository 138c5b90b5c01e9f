use std::{collections::BTreeMap, fmt::Write as _};

use chrono::{NaiveDate, Utc};
use clap::Parser;
use engine::{
    Category, CategoryFilter, Engine, EngineError, Goal, GoalPatch, GoalStats, Group, Identity,
    LedgerTotals, Money, NewGoal, NewTransaction, Scope, SettlementReport, Transaction,
    TransactionKind,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;

use crate::{
    cli::{Cli, Command, GoalCommand, GroupCommand, TxCommand, UserCommand},
    error::{AppError, Result},
    settings::{Database, Settings},
};

mod cli;
mod error;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spartito={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(cli.database_url.as_deref(), &settings.database).await?;
    let engine = Engine::builder()
        .database(db)
        .split_tolerance(settings.splits.tolerance.parse()?)
        .invite_code_attempts(settings.invites.max_attempts)
        .build()
        .await?;

    let out = Output { json: cli.json };
    let caller = Scope {
        user_id: cli.user.clone(),
        ..Scope::default()
    };

    match cli.command {
        Command::User(cli::User {
            command: UserCommand::Register(args),
        }) => {
            let mut identity = Identity::new(caller.require_user()?, args.name);
            if let Some(email) = args.email {
                identity = identity.email(email);
            }
            let group = engine.ensure_group(&identity).await?;
            out.emit(&group, fmt_group)?;
        }
        Command::Group(cli::Group { command }) => {
            let session = Session::open(&engine, &caller).await?;
            run_group(&engine, &session, command, &out).await?;
        }
        Command::Tx(cli::Tx { command }) => {
            let session = Session::open(&engine, &caller).await?;
            run_tx(&engine, &session, command, &out).await?;
        }
        Command::Report => {
            let session = Session::open(&engine, &caller).await?;
            let report = engine.settlement_report(&session.scope()).await?;
            out.emit(&report, fmt_report)?;
        }
        Command::Goal(cli::Goal { command }) => {
            let session = Session::open(&engine, &caller).await?;
            run_goal(&engine, &session, command, &out).await?;
        }
    }

    Ok(())
}

async fn connect_db(
    url: Option<&str>,
    config: &Database,
) -> Result<sea_orm::DatabaseConnection> {
    let url = match (url, config) {
        (Some(url), _) => url.to_string(),
        (None, Database::Memory) => String::from("sqlite::memory:"),
        (None, Database::Sqlite(path)) => format!("sqlite:{path}?mode=rwc"),
    };
    tracing::debug!("connecting to {url}");

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// The registered caller and the group they currently belong to.
struct Session {
    identity: Identity,
    group: Group,
}

impl Session {
    async fn open(engine: &Engine, caller: &Scope) -> Result<Self> {
        let user_id = caller.require_user()?;
        let identity = engine.user(user_id).await.map_err(|err| match err {
            EngineError::KeyNotFound(_) => AppError::Usage(format!(
                "unknown user {user_id}, run `spartito user register` first"
            )),
            other => other.into(),
        })?;
        let group = engine.ensure_group(&identity).await?;
        Ok(Self { identity, group })
    }

    fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    fn scope(&self) -> Scope {
        Scope::new(self.user_id(), self.group.id)
    }
}

async fn run_group(
    engine: &Engine,
    session: &Session,
    command: GroupCommand,
    out: &Output,
) -> Result<()> {
    let scope = session.scope();
    let group = match command {
        GroupCommand::Show => session.group.clone(),
        GroupCommand::Rename { name } => engine.rename_group(&scope, &name).await?,
        GroupCommand::Invite => {
            let code = engine.generate_invite_code(&scope).await?;
            return out.emit(&code, |code| format!("invite code: {code}"));
        }
        GroupCommand::Join { code } => engine.join_group(&session.identity, &code).await?,
        GroupCommand::Leave => engine.leave_group(&scope).await?,
        GroupCommand::RemoveMember { user_id } => engine.remove_member(&scope, &user_id).await?,
    };
    out.emit(&group, fmt_group)
}

#[derive(Serialize)]
struct Listing<'a> {
    transactions: &'a [Transaction],
    totals: LedgerTotals,
    expenses: LedgerTotals,
    income: LedgerTotals,
    paid_by: BTreeMap<String, Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    by_category: Option<BTreeMap<Category, Money>>,
}

async fn run_tx(
    engine: &Engine,
    session: &Session,
    command: TxCommand,
    out: &Output,
) -> Result<()> {
    let group = &session.group;
    let actor = session.user_id();
    let mut ledger = engine.ledger(&session.scope()).await?;
    let show = |tx: &Transaction| fmt_transaction(tx, group);

    let changed = match command {
        TxCommand::Add(args) => {
            let kind = TransactionKind::try_from(args.kind.as_str())?;
            let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
            let mut draft = NewTransaction::new(args.name, args.amount, date)
                .kind(kind)
                .category(args.category)
                .split(args.split);
            if let Some(payer) = args.paid_by {
                draft = draft.paid_by(group.resolve_payer(&payer));
            }
            ledger.add(engine, actor, draft).await?
        }
        TxCommand::List(args) => {
            let filter = if args.include_pending {
                CategoryFilter::All
            } else {
                CategoryFilter::PaidOnly
            };
            let listing = Listing {
                transactions: ledger.newest_first(),
                totals: ledger.totals(),
                expenses: ledger.kind_totals(TransactionKind::Expense),
                income: ledger.kind_totals(TransactionKind::Income),
                paid_by: ledger.by_member_name(group),
                by_category: args.by_category.then(|| ledger.by_category(filter)),
            };
            return out.emit(&listing, |listing| fmt_listing(listing, group));
        }
        TxCommand::Upcoming => {
            let upcoming = ledger.upcoming();
            return out.emit(&upcoming, |txs| {
                txs.iter().map(|tx| show(*tx)).collect::<Vec<_>>().join("\n")
            });
        }
        TxCommand::Pay { id, by } => {
            ledger
                .mark_paid(engine, actor, id, group.resolve_payer(&by))
                .await?
        }
        TxCommand::Unpay { id } => ledger.mark_pending(engine, actor, id).await?,
        TxCommand::Split { id, split } => ledger.update_split(engine, actor, id, split).await?,
        TxCommand::Amount { id, amount } => {
            ledger.update_amount(engine, actor, id, amount).await?
        }
        TxCommand::Delete { id } => {
            ledger.remove(engine, actor, id).await?;
            return out.emit(&id, |id| format!("deleted {id}"));
        }
    };
    out.emit(&changed, |tx| show(tx))
}

#[derive(Serialize)]
struct GoalListing {
    goals: Vec<Goal>,
    stats: GoalStats,
}

async fn run_goal(
    engine: &Engine,
    session: &Session,
    command: GoalCommand,
    out: &Output,
) -> Result<()> {
    let scope = session.scope();
    let today = Utc::now().date_naive();
    let goal = match command {
        GoalCommand::Add(args) => {
            let mut draft = NewGoal::new(args.name, args.target)
                .category(args.category)
                .shared(args.shared);
            if let Some(current) = args.current {
                draft = draft.current_amount(current);
            }
            if let Some(date) = args.date {
                draft = draft.target_date(date);
            }
            engine.create_goal(&scope, draft).await?
        }
        GoalCommand::Progress { id, amount } => {
            engine.add_goal_progress(&scope, id, amount).await?
        }
        GoalCommand::Edit(args) => {
            let mut patch = GoalPatch::default();
            if let Some(name) = args.name {
                patch = patch.name(name);
            }
            if let Some(category) = args.category {
                patch = patch.category(category);
            }
            if let Some(target) = args.target {
                patch = patch.target_amount(target);
            }
            if let Some(date) = args.date {
                patch = patch.target_date(date);
            }
            if patch.is_empty() {
                return Err(AppError::Usage("nothing to edit".to_string()));
            }
            engine.update_goal(&scope, args.id, patch).await?
        }
        GoalCommand::Complete { id } => engine.complete_goal(&scope, id).await?,
        GoalCommand::List => {
            let goals = engine.list_goals(&scope).await?;
            let stats = GoalStats::from_goals(&goals, today);
            return out.emit(&GoalListing { goals, stats }, |listing| {
                fmt_goals(listing, today)
            });
        }
        GoalCommand::Delete { id } => {
            engine.delete_goal(&scope, id).await?;
            return out.emit(&id, |id| format!("deleted {id}"));
        }
    };
    out.emit(&goal, |goal| fmt_goal(goal, today))
}

struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize + ?Sized>(
        &self,
        value: &T,
        human: impl FnOnce(&T) -> String,
    ) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            let text = human(value);
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Ok(())
    }
}

fn fmt_group(group: &Group) -> String {
    let mut s = format!("{} ({})\n", group.name, group.id);
    if let Some(code) = &group.invite_code {
        let _ = writeln!(s, "invite code: {code}");
    }
    for member in &group.members {
        let _ = writeln!(
            s,
            "  {:<20} {:<12} {}",
            member.display_name,
            member.user_id,
            member.role.as_str()
        );
    }
    s.trim_end().to_string()
}

fn fmt_transaction(tx: &Transaction, group: &Group) -> String {
    let status = tx
        .paid_by
        .as_ref()
        .map_or_else(|| "pending".to_string(), |p| format!("paid by {}", group.payer_name(p)));
    let mut line = format!(
        "{}  {}  {:<24} {:>10}  {:<11} {:<7} {}",
        tx.id,
        tx.date,
        tx.name,
        tx.amount.to_string(),
        tx.category.as_str(),
        tx.kind.as_str(),
        status
    );
    for (user_id, amount) in &tx.individual_amounts {
        let _ = write!(line, "\n      {user_id}: {amount}");
    }
    line
}

fn fmt_listing(listing: &Listing<'_>, group: &Group) -> String {
    let mut s = String::new();
    for tx in listing.transactions {
        let _ = writeln!(s, "{}", fmt_transaction(tx, group));
    }
    let t = listing.totals;
    let _ = writeln!(
        s,
        "{} transactions, total {} (paid {}, pending {})",
        t.count, t.total, t.paid, t.pending
    );
    let _ = writeln!(
        s,
        "expenses {}, income {}",
        listing.expenses.total, listing.income.total
    );
    for (name, amount) in &listing.paid_by {
        let _ = writeln!(s, "  paid by {name}: {amount}");
    }
    if let Some(by_category) = &listing.by_category {
        for (category, amount) in by_category {
            let _ = writeln!(s, "  {category}: {amount}");
        }
    }
    s.trim_end().to_string()
}

fn fmt_report(report: &SettlementReport) -> String {
    let mut s = format!("total paid {}\n", report.total_paid);
    for b in &report.balances {
        let _ = writeln!(
            s,
            "  {:<20} paid {:>10}  net {:>10}  share {:>10}",
            b.display_name,
            b.paid.to_string(),
            b.net.to_string(),
            b.owed_share.to_string()
        );
    }
    for line in report.lines() {
        let _ = writeln!(s, "{line}");
    }
    if !report.split_transfers.is_empty() && report.split_transfers != report.transfers {
        let _ = writeln!(s, "by share:");
        for transfer in &report.split_transfers {
            let _ = writeln!(s, "  {transfer}");
        }
    }
    for (name, amount) in &report.external_paid {
        let _ = writeln!(s, "paid outside the group by {name}: {amount}");
    }
    if report.is_settled() {
        s.push_str("all settled");
    }
    s.trim_end().to_string()
}

fn fmt_goal(goal: &Goal, today: NaiveDate) -> String {
    let state = if goal.is_completed() {
        "done"
    } else if goal.is_overdue(today) {
        "overdue"
    } else {
        "open"
    };
    let due = goal
        .target_date
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    format!(
        "{}  {:<20} {:>10} / {:>10}  due {}  {}",
        goal.id,
        goal.name,
        goal.current_amount.to_string(),
        goal.target_amount.to_string(),
        due,
        state
    )
}

fn fmt_goals(listing: &GoalListing, today: NaiveDate) -> String {
    let mut s = String::new();
    for goal in &listing.goals {
        let _ = writeln!(s, "{}", fmt_goal(goal, today));
    }
    let stats = listing.stats;
    let _ = write!(
        s,
        "{} goals, {} done, {} overdue, saved {} of {} ({}%)",
        stats.total,
        stats.completed,
        stats.overdue,
        stats.saved_sum,
        stats.target_sum,
        stats.completion_rate
    );
    s
}
