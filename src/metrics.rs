use tracing::info;

use crate::config::ActivityBand;
use crate::data::UserIndex;

/// Count thresholds derived from an [`ActivityBand`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivityBounds {
    /// Minimum count kept (inclusive).
    pub low: f64,
    /// Maximum count kept (inclusive).
    pub high: f64,
}

impl ActivityBounds {
    /// True when `count` lies inside the band.
    pub fn contains(&self, count: usize) -> bool {
        let count = count as f64;
        self.low <= count && count <= self.high
    }
}

/// Percentile of already-sorted `values` with linear interpolation.
///
/// Rank is `percentile / 100 * (n - 1)`; the result interpolates between the
/// neighbouring order statistics. Returns `None` for empty input.
pub fn percentile(sorted: &[usize], percentile: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (percentile / 100.0 * last as f64).clamp(0.0, last as f64);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let low_value = sorted[lower] as f64;
    let high_value = sorted[upper] as f64;
    Some(low_value + (high_value - low_value) * (rank - lower as f64))
}

/// Thresholds for `band` over the distribution of `counts`.
pub fn activity_bounds(counts: &[usize], band: ActivityBand) -> Option<ActivityBounds> {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    Some(ActivityBounds {
        low: percentile(&sorted, band.min_percentile)?,
        high: percentile(&sorted, band.max_percentile)?,
    })
}

/// Keep only users whose message count falls inside `band`.
pub fn retain_active_users(users: Vec<UserIndex>, band: ActivityBand) -> Vec<UserIndex> {
    let counts: Vec<usize> = users.iter().map(UserIndex::len).collect();
    let Some(bounds) = activity_bounds(&counts, band) else {
        return users;
    };
    let before = users.len();
    let kept: Vec<UserIndex> = users
        .into_iter()
        .filter(|user| bounds.contains(user.len()))
        .collect();
    info!(
        "[metaclean:activity] kept {}/{} users with {:.1}..={:.1} messages (percentiles {}..={})",
        kept.len(),
        before,
        bounds.low,
        bounds.high,
        band.min_percentile,
        band.max_percentile
    );
    kept
}
