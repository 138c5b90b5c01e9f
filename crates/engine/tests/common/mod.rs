#![allow(dead_code)]

use std::{collections::VecDeque, sync::Mutex};

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Engine, EngineBuilder, Group, Identity, InviteCode, InviteCodeSource, Scope};
use migration::MigratorTrait;

pub async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_from(Engine::builder()).await
}

pub async fn engine_from(builder: EngineBuilder) -> (Engine, DatabaseConnection) {
    let db = connect().await;
    let engine = builder.database(db.clone()).build().await.unwrap();
    (engine, db)
}

pub fn alice() -> Identity {
    Identity::new("alice", "Alice").email("alice@example.com")
}

pub fn bob() -> Identity {
    Identity::new("bob", "Bob")
}

pub fn carol() -> Identity {
    Identity::new("carol", "Carol")
}

pub fn scope(identity: &Identity, group: &Group) -> Scope {
    Scope::new(identity.user_id.clone(), group.id)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
}

/// Alice's group with every other identity joined through an invite code.
pub async fn shared_group(engine: &Engine, others: &[Identity]) -> Group {
    let mut group = engine.ensure_group(&alice()).await.unwrap();
    let code = engine
        .generate_invite_code(&scope(&alice(), &group))
        .await
        .unwrap();
    for identity in others {
        engine.ensure_group(identity).await.unwrap();
        group = engine.join_group(identity, code.as_str()).await.unwrap();
    }
    group
}

/// Hands out the given codes in order, then repeats the last one.
#[derive(Debug)]
pub struct ScriptedCodes {
    codes: Mutex<VecDeque<InviteCode>>,
}

impl ScriptedCodes {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| InviteCode::parse(c).unwrap()).collect()),
        }
    }
}

impl InviteCodeSource for ScriptedCodes {
    fn next_code(&self) -> InviteCode {
        let mut codes = self.codes.lock().unwrap();
        if codes.len() > 1 {
            codes.pop_front().unwrap()
        } else {
            codes.front().cloned().unwrap()
        }
    }
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}
