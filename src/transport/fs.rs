use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;

/// Sibling path used while `target` is being produced (`clean.csv` -> `clean.csv.tmp`).
pub fn partial_path(target: &Path, extension: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".");
    name.push(extension);
    target.with_file_name(name)
}

/// Create the parent directory of `path` when it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `target` through a temporary sibling and rename it into place.
///
/// A failed `write` removes the temporary file and leaves `target` untouched,
/// so an existing `target` always holds a complete artifact.
pub fn write_atomically<F>(target: &Path, extension: &str, write: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), PipelineError>,
{
    ensure_parent_dir(target)?;
    let temp_target = partial_path(target, extension);
    if temp_target.exists() {
        let _ = fs::remove_file(&temp_target);
    }

    let result = File::create(&temp_target)
        .map_err(PipelineError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        });
    if let Err(err) = result {
        let _ = fs::remove_file(&temp_target);
        return Err(err);
    }

    fs::rename(&temp_target, target)?;
    Ok(())
}
