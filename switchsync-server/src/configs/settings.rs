use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
}

/// Knobs of the state-synchronization core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sync {
    /// Field-debug mode: admit units with a wrong secret and accept unsigned
    /// report frames, with warnings. Never enable in a trusted deployment.
    pub permissive: bool,
    /// A fresh connection must identify within this window or is dropped.
    pub identify_timeout_secs: u64,
    /// Interval of the liveness sweep.
    pub sweep_interval_secs: u64,
    /// A unit silent for longer than this is marked unreachable.
    pub stale_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub sync: Sync,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::default().separator("_"))
            .build()?
            .try_deserialize()
    }
}
