//! Runtime settings for the `giving-engine` binary.
//!
//! Every flag falls back to an environment variable; a `.env` file in the
//! working directory is loaded first when present.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Input commands CSV file
    pub input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "GIVING_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "giving_engine=debug")
    #[arg(long, env = "GIVING_LOG", default_value = "warn")]
    pub log: String,

    #[arg(long, env = "GIVING_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// How long campaigns created from the command file stay open
    #[arg(long, env = "GIVING_CAMPAIGN_DAYS", default_value_t = 30)]
    pub campaign_days: u32,
}

impl Settings {
    pub fn load() -> Self {
        // Missing .env is fine.
        let _ = dotenvy::dotenv();
        Settings::parse()
    }
}
