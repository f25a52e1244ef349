use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of the report pipeline. None of them are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("opening history store at {}", path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("history store at {} is not usable: {detail}", path.display())]
    InvalidSchema { path: PathBuf, detail: String },

    #[error("querying history")]
    Query(#[source] rusqlite::Error),

    #[error("reading row {row}")]
    RowScan {
        row: u64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("row {row}: timestamp {value} cannot be represented as a date")]
    BadTimestamp { row: u64, value: i64 },

    #[error("iterating history rows")]
    RowIteration(#[source] rusqlite::Error),

    #[error("writing report")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
