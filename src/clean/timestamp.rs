use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::constants::cleaning::INVALID_TIMESTAMP;
use crate::types::EpochSeconds;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a `<date> <time>` submit value into epoch seconds.
///
/// Returns [`INVALID_TIMESTAMP`] for absent or unreadable input.
pub fn parse_submit_time(raw: Option<&str>) -> EpochSeconds {
    raw.and_then(parse_epoch_seconds)
        .unwrap_or(INVALID_TIMESTAMP)
}

/// Parse `<date> <time>` (exactly one separating space) as ISO-8601.
///
/// Offset-less values are read as UTC. Fractional seconds round to the
/// nearest second, ties to even.
pub fn parse_epoch_seconds(raw: &str) -> Option<EpochSeconds> {
    let mut tokens = raw.split(' ');
    let (Some(date), Some(time), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return None;
    };
    let iso = format!("{date}T{time}");
    parse_iso_datetime(&iso).map(|parsed| round_to_second(&parsed))
}

/// Parse an ISO-8601 `date T time` string with an optional `Z`/numeric offset.
pub fn parse_iso_datetime(iso: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = match iso.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => iso.to_string(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, format) {
            return Some(parsed);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(parsed.and_utc().fixed_offset());
        }
    }
    None
}

fn round_to_second<Tz: TimeZone>(parsed: &DateTime<Tz>) -> EpochSeconds {
    let secs = parsed.timestamp();
    let nanos = parsed.timestamp_subsec_nanos();
    match nanos.cmp(&500_000_000) {
        std::cmp::Ordering::Less => secs,
        std::cmp::Ordering::Greater => secs + 1,
        std::cmp::Ordering::Equal if secs % 2 == 0 => secs,
        std::cmp::Ordering::Equal => secs + 1,
    }
}
