use serde::{Deserialize, Serialize};

use crate::config::CanonicalColumn;
use crate::types::{EpochSeconds, Identity, UserCode};

/// One row of a raw export after column renaming.
///
/// Empty cells are `None`. Values are kept verbatim; all normalization happens
/// in the cleaner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Free-text sender.
    pub sender: Option<String>,
    /// Free-text receiver field, possibly delimiter-joined.
    pub receiver: Option<String>,
    /// Carbon-copy field.
    pub cc: Option<String>,
    /// Blind carbon-copy field.
    pub bcc: Option<String>,
    /// Free-text submit time (`<date> <time>`).
    pub submit: Option<String>,
}

impl RawRecord {
    /// Store `value` under its canonical column.
    pub fn set(&mut self, column: CanonicalColumn, value: Option<String>) {
        match column {
            CanonicalColumn::Sender => self.sender = value,
            CanonicalColumn::Receiver => self.receiver = value,
            CanonicalColumn::Cc => self.cc = value,
            CanonicalColumn::Bcc => self.bcc = value,
            CanonicalColumn::Submit => self.submit = value,
        }
    }
}

/// A validated single-receiver event whose identities are still strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedEvent {
    /// Cleaned sender identity.
    pub sender: Identity,
    /// Cleaned receiver identity.
    pub receiver: Identity,
    /// Submit time inside the dataset's valid range.
    pub submit: EpochSeconds,
}

/// A validated event with factorized identities; one row of `clean.csv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanEvent {
    /// Sender code.
    pub sender: UserCode,
    /// Receiver code.
    pub receiver: UserCode,
    /// Submit time in epoch seconds.
    pub submit: EpochSeconds,
}

/// Time-ordered message history of one user; one entry of `processed.json`.
///
/// `counterparts[i]` was exchanged at `timestamps[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIndex {
    /// Code of the user this history belongs to.
    pub user: UserCode,
    /// Receivers (outbound index) or senders (inbound index), in time order.
    pub counterparts: Vec<UserCode>,
    /// Submit times aligned with `counterparts`.
    pub timestamps: Vec<EpochSeconds>,
}

impl UserIndex {
    /// Number of messages in this history.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when the history holds no messages.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
