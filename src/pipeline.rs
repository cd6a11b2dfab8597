//! Stage orchestration for one or more datasets.
//!
//! Stages run lazily from the last artifact backwards: an index is only
//! rebuilt when its file is missing, the clean table is only loaded when an
//! index needs it, and the archive is only fetched when `raw.csv` is absent.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::artifacts::{
    ArtifactPaths, read_clean_events, read_user_index, write_clean_events, write_identity_tables,
    write_user_index,
};
use crate::cache::memoize;
use crate::clean::{CleanOutput, CleanReport, clean_records};
use crate::config::{DatasetConfig, IndexDirection, ProcessingProfile};
use crate::data::CleanEvent;
use crate::errors::PipelineError;
use crate::factorize::{Factorized, factorize, sort_events};
use crate::index::{TieBreakStats, build_user_index};
use crate::metrics::retain_active_users;
use crate::source::remote::ensure_raw_csv;
use crate::source::{ArchiveFetcher, load_raw_records};
use crate::types::DatasetName;

/// Outcome of the index stage for one direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRun {
    /// Side of the events the index is keyed by.
    pub direction: IndexDirection,
    /// Index artifact location.
    pub path: PathBuf,
    /// Users serialized (after any activity filtering).
    pub users: usize,
    /// True when the artifact already existed.
    pub cached: bool,
    /// Tie-break adjustments; `None` on a cache hit.
    pub tie_break: Option<TieBreakStats>,
}

/// Outcome of every stage for one dataset.
#[derive(Clone, Debug)]
pub struct DatasetRun {
    /// Dataset short name.
    pub dataset: DatasetName,
    /// Every artifact location used by the run.
    pub paths: ArtifactPaths,
    /// Cleaning counts; `None` when the clean table was reused.
    pub clean_report: Option<CleanReport>,
    /// One entry per profile direction, in write order.
    pub indexes: Vec<IndexRun>,
}

impl DatasetRun {
    /// True when nothing had to be recomputed.
    pub fn fully_cached(&self) -> bool {
        self.clean_report.is_none() && self.indexes.iter().all(|index| index.cached)
    }
}

struct CleanStage {
    events: Vec<CleanEvent>,
    report: CleanReport,
}

/// Process each dataset in order under `data_dir`.
pub fn process_datasets(
    data_dir: &Path,
    datasets: &[DatasetConfig],
    profile: &ProcessingProfile,
    fetcher: &dyn ArchiveFetcher,
) -> Result<Vec<DatasetRun>, PipelineError> {
    if datasets.is_empty() {
        return Err(PipelineError::NoDatasetSelected);
    }
    datasets
        .iter()
        .map(|dataset| process_dataset(data_dir, dataset, profile, fetcher))
        .collect()
}

/// Bring every artifact of `dataset` under `profile` up to date.
pub fn process_dataset(
    data_dir: &Path,
    dataset: &DatasetConfig,
    profile: &ProcessingProfile,
    fetcher: &dyn ArchiveFetcher,
) -> Result<DatasetRun, PipelineError> {
    dataset.validate()?;
    profile.validate()?;
    let paths = ArtifactPaths::new(data_dir, dataset, profile);
    fs::create_dir_all(&paths.dir)?;
    info!(
        "[metaclean:pipeline] {} with profile '{}' in {}",
        dataset.name,
        profile.name,
        paths.dir.display()
    );

    let clean = memoize(
        "clean",
        &paths.clean,
        || run_clean_stage(&paths, dataset, profile, fetcher).map(Some),
        |_| Ok(None),
    )?
    .into_inner();
    let (mut events, clean_report) = match clean {
        Some(stage) => (Some(stage.events), Some(stage.report)),
        None => (None, None),
    };

    let mut indexes = Vec::with_capacity(paths.indexes.len());
    for (direction, path) in &paths.indexes {
        let direction = *direction;
        let built = memoize(
            "index",
            path,
            || {
                let events = cached_events(&mut events, &paths.clean)?;
                let built = build_user_index(events, direction, profile.tie_break);
                let users = match profile.activity {
                    Some(band) => retain_active_users(built.users, band),
                    None => built.users,
                };
                write_user_index(path, &users)?;
                Ok((users.len(), Some(built.tie_break)))
            },
            |path| Ok((read_user_index(path)?.len(), None)),
        )?;
        let cached = built.was_hit();
        let (users, tie_break) = built.into_inner();
        indexes.push(IndexRun {
            direction,
            path: path.clone(),
            users,
            cached,
            tie_break,
        });
    }

    Ok(DatasetRun {
        dataset: dataset.name.to_string(),
        paths,
        clean_report,
        indexes,
    })
}

/// Fetch, unpack, load, clean, factorize, sort, and persist.
///
/// Identity tables are written before the clean table so that the clean
/// table's presence implies both exist.
fn run_clean_stage(
    paths: &ArtifactPaths,
    dataset: &DatasetConfig,
    profile: &ProcessingProfile,
    fetcher: &dyn ArchiveFetcher,
) -> Result<CleanStage, PipelineError> {
    let raw_csv = ensure_raw_csv(paths, dataset, fetcher)?.into_inner();
    let records = load_raw_records(&raw_csv, dataset)?;
    let CleanOutput { events, report } =
        clean_records(&records, dataset, profile.single_recipient);
    report.log(&dataset.name);

    let Factorized { mut events, tables } = factorize(&events, profile.identity_layout);
    sort_events(&mut events);
    write_identity_tables(&paths.identities, &tables)?;
    write_clean_events(&paths.clean, &events)?;
    info!(
        "[metaclean:clean] {} wrote {}",
        dataset.name,
        paths.clean.display()
    );
    Ok(CleanStage { events, report })
}

/// Coded events from this run, or read back from `clean_path` on first use.
fn cached_events<'a>(
    slot: &'a mut Option<Vec<CleanEvent>>,
    clean_path: &Path,
) -> Result<&'a [CleanEvent], PipelineError> {
    if slot.is_none() {
        *slot = Some(read_clean_events(clean_path)?);
    }
    Ok(slot.as_deref().unwrap_or_default())
}
