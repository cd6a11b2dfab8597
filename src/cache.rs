//! File-existence memoization for pipeline stages.
//!
//! A stage's artifact is its cache key: when the file exists the stage is
//! skipped and the artifact is read back instead. There is no locking and no
//! staleness check; delete an artifact to force its stage to rerun.

use std::path::Path;

use tracing::{debug, info};

use crate::errors::PipelineError;

/// Result of a memoized stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cached<T> {
    /// The artifact already existed and was read back.
    Hit(T),
    /// The stage ran and produced the artifact.
    Computed(T),
}

impl<T> Cached<T> {
    /// True when the stage was skipped.
    pub fn was_hit(&self) -> bool {
        matches!(self, Cached::Hit(_))
    }

    /// Unwrap the stage value.
    pub fn into_inner(self) -> T {
        match self {
            Cached::Hit(value) | Cached::Computed(value) => value,
        }
    }
}

/// Run `compute` unless `artifact` exists, in which case `load` reads it back.
///
/// `compute` is responsible for writing `artifact`; it should write it last so
/// that its presence implies every sibling output of the stage is present too.
pub fn memoize<T, C, L>(
    stage: &str,
    artifact: &Path,
    compute: C,
    load: L,
) -> Result<Cached<T>, PipelineError>
where
    C: FnOnce() -> Result<T, PipelineError>,
    L: FnOnce(&Path) -> Result<T, PipelineError>,
{
    if artifact.exists() {
        info!(
            "[metaclean:{stage}] reusing {}",
            artifact.display()
        );
        return load(artifact).map(Cached::Hit);
    }
    debug!(
        "[metaclean:{stage}] {} missing, running stage",
        artifact.display()
    );
    compute().map(Cached::Computed)
}
