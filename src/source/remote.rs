use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::artifacts::ArtifactPaths;
use crate::cache::{Cached, memoize};
use crate::config::DatasetConfig;
use crate::errors::PipelineError;
use crate::source::ArchiveFetcher;
use crate::transport::archive::extract_all;

/// Make sure `raw.zip` exists, fetching it from the dataset URL when absent.
pub fn ensure_archive(
    paths: &ArtifactPaths,
    dataset: &DatasetConfig,
    fetcher: &dyn ArchiveFetcher,
) -> Result<Cached<PathBuf>, PipelineError> {
    memoize(
        "fetch",
        &paths.raw_zip,
        || {
            info!(
                "[metaclean:fetch] downloading {} archive from {}",
                dataset.name, dataset.url
            );
            let bytes = fetcher.fetch(&dataset.url, &paths.raw_zip)?;
            info!(
                "[metaclean:fetch] {} archive ready ({bytes} bytes)",
                dataset.name
            );
            Ok(paths.raw_zip.clone())
        },
        |path| Ok(path.to_path_buf()),
    )
}

/// Make sure `raw.csv` exists, unpacking (and if needed fetching) the archive.
pub fn ensure_raw_csv(
    paths: &ArtifactPaths,
    dataset: &DatasetConfig,
    fetcher: &dyn ArchiveFetcher,
) -> Result<Cached<PathBuf>, PipelineError> {
    memoize(
        "unpack",
        &paths.raw_csv,
        || {
            let archive = ensure_archive(paths, dataset, fetcher)?.into_inner();
            let extracted = extract_all(&archive, &paths.dir)?;
            if !paths.raw_csv.exists() {
                adopt_single_csv(&archive, &extracted, &paths.raw_csv)?;
            }
            info!(
                "[metaclean:unpack] {} extracted {} entries",
                dataset.name,
                extracted.len()
            );
            Ok(paths.raw_csv.clone())
        },
        |path| Ok(path.to_path_buf()),
    )
}

/// Rename the archive's only CSV entry to `raw_csv`.
fn adopt_single_csv(
    archive: &Path,
    extracted: &[PathBuf],
    raw_csv: &Path,
) -> Result<(), PipelineError> {
    let csvs: Vec<&PathBuf> = extracted
        .iter()
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    match csvs.as_slice() {
        [only] => {
            warn!(
                "[metaclean:unpack] archive has no raw.csv; using {}",
                only.display()
            );
            fs::rename(only, raw_csv)?;
            Ok(())
        }
        _ => Err(PipelineError::Archive {
            path: archive.to_path_buf(),
            reason: format!(
                "expected raw.csv or exactly one CSV entry, found {}",
                csvs.len()
            ),
        }),
    }
}
