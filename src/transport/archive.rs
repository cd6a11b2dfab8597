use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::constants::artifacts::PARTIAL_WRITE_EXTENSION;
use crate::errors::PipelineError;
use crate::transport::fs::write_atomically;

/// Extract every file in `archive_path` under `destination`.
///
/// Entries whose names escape `destination` are skipped. Each file is written
/// through a temporary sibling, so a truncated entry never appears under its
/// final name. Returns the paths of the extracted files in archive order.
pub fn extract_all(
    archive_path: &Path,
    destination: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    let archive_error = |reason: String| PipelineError::Archive {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path)?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|err| archive_error(err.to_string()))?;
    fs::create_dir_all(destination)?;

    let mut extracted = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .map_err(|err| archive_error(format!("entry {idx}: {err}")))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(
                "[metaclean:unpack] skipping entry with unsafe path '{}'",
                entry.name()
            );
            continue;
        };
        let out_path = destination.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        let mut bytes = 0u64;
        write_atomically(&out_path, PARTIAL_WRITE_EXTENSION, |out| {
            bytes = io::copy(&mut entry, out)?;
            Ok(())
        })?;
        debug!(
            "[metaclean:unpack] extracted {} ({bytes} bytes)",
            out_path.display()
        );
        extracted.push(out_path);
    }
    Ok(extracted)
}
