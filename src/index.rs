//! Per-user message histories built from coded events.
//!
//! Events are grouped by sender (outbound) or receiver (inbound); each
//! group is sorted by submit time with ties kept in input order.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::{IndexDirection, TieBreak};
use crate::constants::index::TIE_BREAK_DRIFT_WARN_SECONDS;
use crate::data::{CleanEvent, UserIndex};
use crate::types::{EpochSeconds, UserCode};

impl IndexDirection {
    /// `(key, counterpart)` for `event` under this direction.
    pub fn split_event(self, event: &CleanEvent) -> (UserCode, UserCode) {
        match self {
            IndexDirection::Outbound => (event.sender, event.receiver),
            IndexDirection::Inbound => (event.receiver, event.sender),
        }
    }

    /// Label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            IndexDirection::Outbound => "outbound",
            IndexDirection::Inbound => "inbound",
        }
    }
}

/// Timestamp adjustments made by the increment tie-breaker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TieBreakStats {
    /// Timestamps moved forward.
    pub adjusted: usize,
    /// Largest forward shift applied to a single timestamp.
    pub max_drift: EpochSeconds,
}

impl TieBreakStats {
    fn merge(&mut self, other: TieBreakStats) {
        self.adjusted += other.adjusted;
        self.max_drift = self.max_drift.max(other.max_drift);
    }
}

/// User histories in ascending user order plus tie-break statistics.
#[derive(Clone, Debug, Default)]
pub struct BuiltIndex {
    /// One history per user with at least one event.
    pub users: Vec<UserIndex>,
    /// Adjustments made by the increment tie-breaker (zero under `Preserve`).
    pub tie_break: TieBreakStats,
}

/// Group `events` by `direction` and order each user's history by time.
pub fn build_user_index(
    events: &[CleanEvent],
    direction: IndexDirection,
    tie_break: TieBreak,
) -> BuiltIndex {
    let mut grouped: BTreeMap<UserCode, Vec<(EpochSeconds, UserCode)>> = BTreeMap::new();
    for event in events {
        let (key, counterpart) = direction.split_event(event);
        grouped
            .entry(key)
            .or_default()
            .push((event.submit, counterpart));
    }

    let mut stats = TieBreakStats::default();
    let users = grouped
        .into_iter()
        .map(|(user, mut entries)| {
            entries.sort_by_key(|(submit, _)| *submit);
            let (mut timestamps, counterparts): (Vec<EpochSeconds>, Vec<UserCode>) =
                entries.into_iter().unzip();
            if tie_break == TieBreak::Increment {
                stats.merge(enforce_strictly_increasing(&mut timestamps));
            }
            UserIndex {
                user,
                counterparts,
                timestamps,
            }
        })
        .collect::<Vec<_>>();

    info!(
        "[metaclean:index] {} index: {} users over {} events",
        direction.label(),
        users.len(),
        events.len()
    );
    if stats.adjusted > 0 {
        info!(
            "[metaclean:index] {} tie-break moved {} timestamps (max drift {}s)",
            direction.label(),
            stats.adjusted,
            stats.max_drift
        );
    }
    if stats.max_drift > TIE_BREAK_DRIFT_WARN_SECONDS {
        warn!(
            "[metaclean:index] {} tie-break drift reached {}s; bursty users have shifted timestamps",
            direction.label(),
            stats.max_drift
        );
    }

    BuiltIndex {
        users,
        tie_break: stats,
    }
}

/// Rewrite non-decreasing `timestamps` so each is strictly greater than the last.
///
/// Any value `<=` the previous (already adjusted) value becomes `previous + 1`.
/// A burst of `n` equal timestamps therefore drifts the last one by `n - 1`.
pub fn enforce_strictly_increasing(timestamps: &mut [EpochSeconds]) -> TieBreakStats {
    let mut stats = TieBreakStats::default();
    let mut previous: Option<EpochSeconds> = None;
    for timestamp in timestamps.iter_mut() {
        if let Some(prev) = previous
            && *timestamp <= prev
        {
            let shifted = prev + 1;
            stats.adjusted += 1;
            stats.max_drift = stats.max_drift.max(shifted - *timestamp);
            *timestamp = shifted;
        }
        previous = Some(*timestamp);
    }
    stats
}
