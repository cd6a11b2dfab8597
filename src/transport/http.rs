use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

use tracing::info;
use ureq::http::header::CONTENT_LENGTH;

use crate::constants::artifacts::PARTIAL_DOWNLOAD_EXTENSION;
use crate::constants::fetch::{DOWNLOAD_CHUNK_BYTES, DOWNLOAD_PROGRESS_INTERVAL};
use crate::errors::PipelineError;
use crate::transport::fs::{ensure_parent_dir, partial_path};

/// Stream `url` into `target`, returning the number of bytes written.
///
/// The body is written to `<target>.part` and renamed on completion. Any
/// transport failure or non-success status is returned as
/// [`PipelineError::Download`]; nothing is retried.
pub fn download_to(url: &str, target: &Path) -> Result<u64, PipelineError> {
    let download_error = |reason: String| PipelineError::Download {
        url: url.to_string(),
        reason,
    };

    ensure_parent_dir(target)?;
    let temp_target = partial_path(target, PARTIAL_DOWNLOAD_EXTENSION);
    if temp_target.exists() {
        let _ = fs::remove_file(&temp_target);
    }

    let response = ureq::get(url)
        .call()
        .map_err(|err| download_error(format!("request failed: {err}")))?;
    let expected_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let mut reader = response.into_body().into_reader();
    let mut file = File::create(&temp_target)?;
    info!(
        "[metaclean:fetch] downloading {url} -> {}",
        target.display()
    );

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut total_bytes = 0u64;
    let mut buffer = vec![0u8; DOWNLOAD_CHUNK_BYTES];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|err| download_error(format!("failed reading response body: {err}")))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        total_bytes = total_bytes.saturating_add(read as u64);
        if last_report.elapsed() >= DOWNLOAD_PROGRESS_INTERVAL {
            log_progress(target, total_bytes, expected_bytes, started);
            last_report = Instant::now();
        }
    }
    file.flush()?;
    drop(file);

    info!(
        "[metaclean:fetch] download complete {}: {:.1} MiB in {:.1}s",
        target.display(),
        mib(total_bytes),
        started.elapsed().as_secs_f64()
    );
    fs::rename(&temp_target, target)?;
    Ok(total_bytes)
}

fn log_progress(target: &Path, total_bytes: u64, expected_bytes: Option<u64>, started: Instant) {
    let elapsed = started.elapsed().as_secs_f64();
    match expected_bytes {
        Some(expected) if expected > 0 => {
            let pct = ((total_bytes as f64 / expected as f64) * 100.0).clamp(0.0, 100.0);
            let rate = if elapsed > 0.0 {
                total_bytes as f64 / elapsed
            } else {
                0.0
            };
            let eta_secs = if rate > 0.0 {
                expected.saturating_sub(total_bytes) as f64 / rate
            } else {
                0.0
            };
            info!(
                "[metaclean:fetch] download progress {}: {:.1}/{:.1} MiB ({:.1}%, {:.1}s elapsed, ETA {:.1}s)",
                target.display(),
                mib(total_bytes),
                mib(expected),
                pct,
                elapsed,
                eta_secs
            );
        }
        _ => {
            info!(
                "[metaclean:fetch] download progress {}: {:.1} MiB ({:.1}s)",
                target.display(),
                mib(total_bytes),
                elapsed
            );
        }
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
