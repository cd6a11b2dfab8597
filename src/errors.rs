use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{DatasetName, SourceColumn};

/// Error type for download, archive, parsing, and persistence failures.
///
/// Malformed identities and timestamps are never reported here; they are
/// normalized to empty/sentinel values and dropped by the validity filter.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },
    #[error("archive {path} could not be unpacked: {reason}")]
    Archive { path: PathBuf, reason: String },
    #[error("dataset '{dataset}' is missing column '{column}' in {path}")]
    MissingColumn {
        dataset: DatasetName,
        column: SourceColumn,
        path: PathBuf,
    },
    #[error("artifact {path} is malformed: {details}")]
    MalformedArtifact { path: PathBuf, details: String },
    #[error("unrecognized dataset '{0}'; expects `enron` or `seattle`")]
    UnknownDataset(String),
    #[error("unrecognized dataset: select --enron and/or --seattle")]
    NoDatasetSelected,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
