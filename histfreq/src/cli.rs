use crate::aggregate::Aggregator;
use crate::clock::Clock;
use crate::config::FileConfig;
use crate::db::{open_store, scan_history};
use crate::domain::{ColorChoice, DbConfig, QueryFilter, TimestampUnit};
use crate::report::{Palette, ReportOptions, Terminator, sort_entries, write_report};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use time::UtcOffset;
use tracing::debug;

pub const DEFAULT_SEPARATOR: &str = " │ ";
pub const SESSION_ENV: &str = "ATUIN_SESSION";

#[derive(Parser, Debug)]
#[command(
    name = "histfreq",
    version,
    about = "Most-used commands from atuin history, by last use"
)]
pub struct Cli {
    /// Path to the atuin SQLite database
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to ~/.histfreq.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Count soft-deleted history rows too
    #[arg(long, overrides_with = "no_include_deleted")]
    pub include_deleted: bool,

    /// Turn off `--include-deleted` set in the config file
    #[arg(long, overrides_with = "include_deleted")]
    pub no_include_deleted: bool,

    /// Oldest first
    #[arg(short, long, overrides_with = "no_reverse")]
    pub reverse: bool,

    /// Turn off `--reverse` set in the config file
    #[arg(long, overrides_with = "reverse")]
    pub no_reverse: bool,

    /// Terminate records with NUL instead of newline
    #[arg(short = '0', long)]
    pub null: bool,

    /// Only commands run in this directory
    #[arg(long, conflicts_with = "here")]
    pub cwd: Option<String>,

    /// Only commands run in the current directory
    #[arg(long, conflicts_with = "cwd")]
    pub here: bool,

    /// Only commands from this atuin session
    #[arg(long, conflicts_with = "current_session")]
    pub session: Option<String>,

    /// Only commands from the session in $ATUIN_SESSION
    #[arg(long, conflicts_with = "session")]
    pub current_session: bool,

    /// Field separator
    #[arg(short, long)]
    pub separator: Option<String>,

    /// Colorize output (bare flag means always)
    #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "always")]
    pub color: Option<ColorChoice>,

    /// Print a header line before the results
    #[arg(long, overrides_with = "no_header")]
    pub header: bool,

    /// Turn off `--header` set in the config file
    #[arg(long, overrides_with = "header")]
    pub no_header: bool,

    /// Print a header line after the results
    #[arg(long, overrides_with = "no_header_after")]
    pub header_after: bool,

    /// Turn off `--header-after` set in the config file
    #[arg(long, overrides_with = "header_after")]
    pub no_header_after: bool,

    /// Show at most N commands
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Unit of the stored timestamps
    #[arg(long, value_enum)]
    pub timestamp_unit: Option<TimestampUnit>,

    /// Show times in UTC instead of the local zone
    #[arg(long, overrides_with = "no_utc")]
    pub utc: bool,

    /// Turn off `--utc` set in the config file
    #[arg(long, overrides_with = "utc")]
    pub no_utc: bool,

    /// Debug logging to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything the pipeline needs, resolved once from flags, config file and
/// environment. Nothing downstream reads the environment.
#[derive(Debug)]
pub struct Settings {
    pub db: DbConfig,
    pub filter: QueryFilter,
    pub reverse: bool,
    pub limit: Option<usize>,
    pub clock: Clock,
    pub report: ReportOptions,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = FileConfig::load(cli.config.as_deref())?;

        let path = db_path(cli.db.clone().or(file.db), dirs::home_dir().as_deref())?;

        let cwd = if cli.here {
            let dir = std::env::current_dir().context("resolving current directory")?;
            Some(dir.to_string_lossy().into_owned())
        } else {
            cli.cwd.clone()
        };

        let session = if cli.current_session {
            let id = std::env::var(SESSION_ENV)
                .with_context(|| format!("--current-session needs ${SESSION_ENV} to be set"))?;
            Some(id)
        } else {
            cli.session.clone()
        };

        let unit = cli.timestamp_unit.or(file.timestamp_unit).unwrap_or_default();
        let clock = if switch(cli.utc, cli.no_utc, file.utc) {
            Clock::new(unit, UtcOffset::UTC)
        } else {
            Clock::local(unit)
        };

        let palette = match cli.color.or(file.color).unwrap_or_default() {
            ColorChoice::Always => Palette::ansi(),
            ColorChoice::Never => Palette::plain(),
            ColorChoice::Auto if std::io::stdout().is_terminal() => Palette::ansi(),
            ColorChoice::Auto => Palette::plain(),
        };

        Ok(Self {
            db: DbConfig { path },
            filter: QueryFilter {
                include_deleted: switch(
                    cli.include_deleted,
                    cli.no_include_deleted,
                    file.include_deleted,
                ),
                cwd,
                session,
            },
            reverse: switch(cli.reverse, cli.no_reverse, file.reverse),
            limit: cli.limit,
            clock,
            report: ReportOptions {
                separator: cli
                    .separator
                    .clone()
                    .or(file.separator)
                    .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
                terminator: if cli.null {
                    Terminator::Nul
                } else {
                    Terminator::Newline
                },
                palette,
                header_before: switch(cli.header, cli.no_header, file.header),
                header_after: switch(cli.header_after, cli.no_header_after, file.header_after),
            },
        })
    }
}

/// `--flag` / `--no-flag` beat the config file, which beats off.
fn switch(on: bool, off: bool, file: Option<bool>) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        file.unwrap_or(false)
    }
}

fn db_path(explicit: Option<PathBuf>, home: Option<&Path>) -> Result<PathBuf> {
    match (explicit, home) {
        (Some(path), _) => Ok(path),
        (None, Some(home)) => Ok(DbConfig::default_path(home)),
        (None, None) => anyhow::bail!("could not determine home directory; pass --db"),
    }
}

/// open store -> filtered scan -> aggregate -> sort -> render.
/// Nothing is written to `out` unless every row was read successfully.
pub fn run<W: Write>(settings: &Settings, out: &mut W) -> crate::error::Result<()> {
    let conn = open_store(&settings.db)?;

    let mut agg = Aggregator::new(settings.filter.include_deleted, settings.clock);
    let rows = scan_history(&conn, &settings.filter, |row, n| agg.push(row, n))?;
    drop(conn);
    debug!(
        rows,
        distinct = agg.distinct(),
        color = settings.report.palette.is_enabled(),
        "aggregated history"
    );

    let mut entries = agg.finish();
    sort_entries(&mut entries, settings.reverse);
    if let Some(limit) = settings.limit {
        entries.truncate(limit);
    }

    write_report(out, &entries, &settings.report)?;
    Ok(())
}
