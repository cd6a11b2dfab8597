#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Artifact locations and CSV/JSON persistence.
pub mod artifacts;
/// File-existence memoization for pipeline stages.
pub mod cache;
/// Row cleaning and validity filtering.
pub mod clean;
/// Command-line entry point.
pub mod cli;
/// Dataset presets and processing profiles.
pub mod config;
/// Centralized constants grouped by concern.
pub mod constants;
/// Record and event types passed between stages.
pub mod data;
/// Dense identity coding.
pub mod factorize;
/// Per-user index construction.
pub mod index;
/// Activity percentile filtering.
pub mod metrics;
/// Stage orchestration.
pub mod pipeline;
/// Raw dataset acquisition and loading.
pub mod source;
/// Byte transports: HTTP download, zip extraction, atomic file writes.
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use cache::{Cached, memoize};
pub use clean::{CleanOutput, CleanReport, clean_records};
pub use config::{
    ActivityBand, CanonicalColumn, DatasetConfig, IdentityLayout, IdentityRule, IndexDirection,
    ProcessingProfile, TieBreak,
};
pub use data::{CleanEvent, NamedEvent, RawRecord, UserIndex};
pub use errors::PipelineError;
pub use factorize::{IdentityTable, IdentityTables, factorize};
pub use index::{BuiltIndex, TieBreakStats, build_user_index};
pub use pipeline::{DatasetRun, IndexRun, process_dataset, process_datasets};
pub use source::{ArchiveFetcher, HttpFetcher};
pub use types::{DatasetName, EpochSeconds, Identity, SourceColumn, UserCode};
