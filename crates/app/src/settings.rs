//! Handles settings for the application.
//!
//! Values are layered: built-in defaults, then the TOML file, then
//! `SPARTITO__*` environment variables. `spartito.toml` is optional; a file
//! named with `--config` must exist. Command line flags are applied on top by `main`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "spartito";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Splits {
    /// Allowed distance from 100%, in percentage points (`"0.1"`).
    pub tolerance: String,
}

#[derive(Debug, Deserialize)]
pub struct Invites {
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub splits: Splits,
    pub invites: Invites,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };
        Config::builder()
            .set_default("app.level", "info")?
            .set_default("database", "memory")?
            .set_default("splits.tolerance", "0.1")?
            .set_default("invites.max_attempts", 10)?
            .add_source(file)
            .add_source(Environment::with_prefix("SPARTITO").separator("__"))
            .build()?
            .try_deserialize()
    }
}
