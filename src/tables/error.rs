use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read table file '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("failed to write table file '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),

    #[error("failed to parse CSV table '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("missing required column '{column}' in table '{path}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("invalid date '{value}' in column '{column}' of table '{path}'")]
    InvalidDate {
        path: PathBuf,
        column: &'static str,
        value: String,
    },

    #[error("failed to parse station JSON dump '{0}'")]
    JsonParse(PathBuf, #[source] serde_json::Error),

    #[error("failed to encode CSV output")]
    CsvWrite(#[source] PolarsError),

    #[error("background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
