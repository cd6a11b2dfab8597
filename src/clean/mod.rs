//! Row cleaning: identity normalization, recipient expansion, timestamp
//! parsing, and validity filtering.
//!
//! Malformed data never errors here. Bad identities become `""`, bad
//! timestamps become the sentinel, and the validity filter drops both.

use tracing::info;

use crate::config::DatasetConfig;
use crate::data::{NamedEvent, RawRecord};

/// Validity checks applied to expanded events.
pub mod filter;
/// Per-dataset identity normalization and recipient splitting.
pub mod identity;
/// Submit-time parsing.
pub mod timestamp;

use filter::ValidityChecks;
use identity::split_recipients;
use timestamp::parse_submit_time;

/// Row counts observed while cleaning one dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Raw rows read.
    pub initial_rows: usize,
    /// Events after recipient expansion.
    pub expanded_rows: usize,
    /// Expanded events with a valid sender.
    pub valid_senders: usize,
    /// Expanded events with a valid receiver.
    pub valid_receivers: usize,
    /// Expanded events passing the cc/bcc check.
    pub valid_copies: usize,
    /// Expanded events with an in-range timestamp.
    pub valid_times: usize,
    /// Events kept.
    pub final_rows: usize,
}

impl CleanReport {
    /// Emit the report as log lines prefixed with `dataset`.
    pub fn log(&self, dataset: &str) {
        info!(
            "[metaclean:clean] {dataset} initial: {}, expansion: {}",
            self.initial_rows, self.expanded_rows
        );
        info!(
            "[metaclean:clean] {dataset} senders: {}/{}, receivers: {}/{}, copies: {}/{}, time: {}/{}",
            self.valid_senders,
            self.expanded_rows,
            self.valid_receivers,
            self.expanded_rows,
            self.valid_copies,
            self.expanded_rows,
            self.valid_times,
            self.expanded_rows
        );
        info!("[metaclean:clean] {dataset} final: {}", self.final_rows);
    }
}

/// Cleaned events in input order plus the counts that produced them.
#[derive(Clone, Debug, Default)]
pub struct CleanOutput {
    /// Events that passed every check, in input order.
    pub events: Vec<NamedEvent>,
    /// Counts observed while producing `events`.
    pub report: CleanReport,
}

/// Clean, expand, and filter `records`.
///
/// Each raw row expands into one candidate per recipient (sharing sender and
/// submit); candidates failing any validity check are dropped.
pub fn clean_records(
    records: &[RawRecord],
    dataset: &DatasetConfig,
    single_recipient: bool,
) -> CleanOutput {
    let rule = dataset.identity_rule;
    let valid_range = dataset.valid_range();
    let mut report = CleanReport {
        initial_rows: records.len(),
        ..CleanReport::default()
    };
    let mut events = Vec::new();

    for record in records {
        let sender = rule.clean(record.sender.as_deref());
        let receivers = split_recipients(
            record.receiver.as_deref(),
            rule,
            &dataset.recipient_delimiter,
            single_recipient,
        );
        let submit = parse_submit_time(record.submit.as_deref());

        for receiver in receivers {
            report.expanded_rows += 1;
            let checks = ValidityChecks::evaluate(
                &sender,
                &receiver,
                record.cc.as_deref(),
                record.bcc.as_deref(),
                submit,
                &valid_range,
                single_recipient,
            );
            report.valid_senders += usize::from(checks.sender);
            report.valid_receivers += usize::from(checks.receiver);
            report.valid_copies += usize::from(checks.copies);
            report.valid_times += usize::from(checks.time);
            if checks.passes() {
                events.push(NamedEvent {
                    sender: sender.clone(),
                    receiver,
                    submit,
                });
            }
        }
    }

    report.final_rows = events.len();
    CleanOutput { events, report }
}
