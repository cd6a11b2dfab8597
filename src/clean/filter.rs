use std::ops::RangeInclusive;

use crate::clean::identity::is_missing;
use crate::types::EpochSeconds;

/// Outcome of each validity check for one expanded event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidityChecks {
    /// Sender is non-empty and not `nan`.
    pub sender: bool,
    /// Receiver is non-empty and not `nan`.
    pub receiver: bool,
    /// No cc/bcc present, or single-recipient mode is off.
    pub copies: bool,
    /// Submit lies in the dataset's inclusive range.
    pub time: bool,
}

impl ValidityChecks {
    /// Evaluate every check; callers keep the event only if [`passes`](Self::passes).
    pub fn evaluate(
        sender: &str,
        receiver: &str,
        cc: Option<&str>,
        bcc: Option<&str>,
        submit: EpochSeconds,
        valid_range: &RangeInclusive<EpochSeconds>,
        single_recipient: bool,
    ) -> Self {
        Self {
            sender: !is_missing(sender),
            receiver: !is_missing(receiver),
            copies: !single_recipient || (!has_copies(cc) && !has_copies(bcc)),
            time: valid_range.contains(&submit),
        }
    }

    /// True when every check passed.
    pub fn passes(&self) -> bool {
        self.sender && self.receiver && self.copies && self.time
    }
}

/// True when a cc/bcc cell names at least one recipient.
pub fn has_copies(cell: Option<&str>) -> bool {
    cell.is_some_and(|value| !is_missing(value))
}
