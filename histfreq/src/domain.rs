use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One row of the `history` table, as far as this tool cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub command: String,
    pub timestamp: i64,
    pub deleted_at: Option<i64>,
}

/// Aggregated usage of one distinct command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: String,
    pub count: u64,
    pub last_used: i64,
    pub last_used_str: String,
}

/// Equality filters applied to the history query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub include_deleted: bool,
    pub cwd: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl DbConfig {
    /// atuin's default location under `home`, not the platform data dir.
    pub fn default_path(home: &Path) -> PathBuf {
        home.join(".local")
            .join("share")
            .join("atuin")
            .join("history.db")
    }
}

/// Unit of the integer stored in `history.timestamp`.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    Seconds,
    Millis,
    Micros,
    #[default]
    Nanos,
}

impl TimestampUnit {
    pub fn nanos_per_unit(self) -> i128 {
        match self {
            TimestampUnit::Seconds => 1_000_000_000,
            TimestampUnit::Millis => 1_000_000,
            TimestampUnit::Micros => 1_000,
            TimestampUnit::Nanos => 1,
        }
    }
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Auto,
    Always,
    #[default]
    Never,
}
