//! Raw dataset acquisition and loading.
//!
//! Ownership model:
//! - `ArchiveFetcher` moves a dataset archive from its URL onto local disk.
//! - `remote` wraps fetching and unpacking in cache checks.
//! - `load_raw_records` reads the extracted CSV into canonical `RawRecord`s.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::config::{CanonicalColumn, DatasetConfig};
use crate::data::RawRecord;
use crate::errors::PipelineError;
use crate::transport::http::download_to;

/// Cached fetch and unpack stages.
pub mod remote;

/// Moves a dataset archive from `url` to a local file.
pub trait ArchiveFetcher {
    /// Write the resource at `url` to `target`, returning the byte count.
    fn fetch(&self, url: &str, target: &Path) -> Result<u64, PipelineError>;
}

/// Fetcher backed by a blocking HTTP GET.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpFetcher;

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, target: &Path) -> Result<u64, PipelineError> {
        download_to(url, target)
    }
}

/// Read `path` keeping only the dataset's columns, renamed to canonical names.
pub fn load_raw_records(
    path: &Path,
    dataset: &DatasetConfig,
) -> Result<Vec<RawRecord>, PipelineError> {
    let file = File::open(path)?;
    let records = read_raw_records(BufReader::new(file), path, dataset)?;
    info!(
        "[metaclean:load] {}: {} rows from {}",
        dataset.name,
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Reader-based variant of [`load_raw_records`]; `origin` is only used in errors.
///
/// Every configured source column must be present in the header row. Empty
/// cells load as `None`. Cells are read as bytes, so columns outside the
/// rename table are never decoded and invalid UTF-8 in a kept column is
/// replaced rather than failing the load.
pub fn read_raw_records<R: Read>(
    reader: R,
    origin: &Path,
    dataset: &DatasetConfig,
) -> Result<Vec<RawRecord>, PipelineError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.byte_headers()?.clone();

    let mut positions: Vec<(usize, CanonicalColumn)> = Vec::with_capacity(dataset.columns.len());
    for rename in &dataset.columns {
        let idx = headers
            .iter()
            .position(|header| header == rename.source.as_bytes())
            .ok_or_else(|| PipelineError::MissingColumn {
                dataset: dataset.name.to_string(),
                column: rename.source.to_string(),
                path: origin.to_path_buf(),
            })?;
        positions.push((idx, rename.canonical));
    }

    let mut records = Vec::new();
    let mut lossy_cells = 0usize;
    for result in rdr.byte_records() {
        let row = result?;
        let mut record = RawRecord::default();
        for (idx, column) in &positions {
            let value = row
                .get(*idx)
                .filter(|cell| !cell.is_empty())
                .map(|cell| match String::from_utf8_lossy(cell) {
                    Cow::Borrowed(text) => text.to_string(),
                    Cow::Owned(text) => {
                        lossy_cells += 1;
                        text
                    }
                });
            record.set(*column, value);
        }
        records.push(record);
    }
    if lossy_cells > 0 {
        warn!(
            "[metaclean:load] {}: replaced invalid UTF-8 in {lossy_cells} cells of {}",
            dataset.name,
            origin.display()
        );
    }
    Ok(records)
}
