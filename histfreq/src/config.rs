use crate::domain::{ColorChoice, TimestampUnit};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional defaults read from `~/.histfreq.toml`. Flags always win.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db: Option<PathBuf>,
    pub separator: Option<String>,
    pub color: Option<ColorChoice>,
    pub header: Option<bool>,
    pub header_after: Option<bool>,
    pub timestamp_unit: Option<TimestampUnit>,
    pub utc: Option<bool>,
    pub include_deleted: Option<bool>,
    pub reverse: Option<bool>,
}

impl FileConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".histfreq.toml"))
    }

    /// Load `explicit` if given (it must exist), else the default file if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut cfg: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))?;

        if let Some(db) = cfg.db.take() {
            cfg.db = Some(expand_home(&db));
        }

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(cfg)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
