use std::borrow::Cow;
use std::ops::RangeInclusive;

use crate::constants::artifacts::SINGLE_RECIPIENT_SUFFIX;
use crate::constants::datasets::{
    ENRON_END, ENRON_NAME, ENRON_RECIPIENT_DELIMITER, ENRON_START, ENRON_URL, SEATTLE_END,
    SEATTLE_NAME, SEATTLE_RECIPIENT_DELIMITER, SEATTLE_START, SEATTLE_URL,
};
use crate::errors::PipelineError;
use crate::types::EpochSeconds;

/// Canonical column every dataset export is renamed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CanonicalColumn {
    /// Author of the message.
    Sender,
    /// Primary recipient field, possibly delimiter-joined.
    Receiver,
    /// Carbon-copy recipients.
    Cc,
    /// Blind carbon-copy recipients.
    Bcc,
    /// Submission time as free text.
    Submit,
}

impl CanonicalColumn {
    /// Every canonical column, in loader order.
    pub const ALL: [CanonicalColumn; 5] = [
        CanonicalColumn::Sender,
        CanonicalColumn::Receiver,
        CanonicalColumn::Cc,
        CanonicalColumn::Bcc,
        CanonicalColumn::Submit,
    ];

    /// Canonical column name.
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalColumn::Sender => "sender",
            CanonicalColumn::Receiver => "receiver",
            CanonicalColumn::Cc => "cc",
            CanonicalColumn::Bcc => "bcc",
            CanonicalColumn::Submit => "submit",
        }
    }
}

/// Maps one source column onto its canonical name.
#[derive(Clone, Debug)]
pub struct ColumnRename {
    /// Header as it appears in the raw CSV.
    pub source: Cow<'static, str>,
    /// Canonical column it is renamed to.
    pub canonical: CanonicalColumn,
}

impl ColumnRename {
    const fn new(source: &'static str, canonical: CanonicalColumn) -> Self {
        Self {
            source: Cow::Borrowed(source),
            canonical,
        }
    }
}

/// Identity normalization rule matching a dataset's export format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityRule {
    /// Strip brackets, quotes, and spaces.
    Enron,
    /// Truncate at `<` or `(`, then strip quotes and spaces.
    Seattle,
}

/// Static description of one published dataset.
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    /// Short name, also the artifact subdirectory.
    pub name: Cow<'static, str>,
    /// Archive download URL.
    pub url: Cow<'static, str>,
    /// Separator between recipients inside a receiver cell.
    pub recipient_delimiter: Cow<'static, str>,
    /// Source columns to load and their canonical names.
    pub columns: Vec<ColumnRename>,
    /// Identity normalization applied to senders and receivers.
    pub identity_rule: IdentityRule,
    /// Earliest valid submit time (inclusive).
    pub start: EpochSeconds,
    /// Latest valid submit time (inclusive).
    pub end: EpochSeconds,
}

impl DatasetConfig {
    /// The Enron corpus.
    pub fn enron() -> Self {
        Self {
            name: Cow::Borrowed(ENRON_NAME),
            url: Cow::Borrowed(ENRON_URL),
            recipient_delimiter: Cow::Borrowed(ENRON_RECIPIENT_DELIMITER),
            columns: vec![
                ColumnRename::new("From", CanonicalColumn::Sender),
                ColumnRename::new("To", CanonicalColumn::Receiver),
                ColumnRename::new("X-cc", CanonicalColumn::Cc),
                ColumnRename::new("X-bcc", CanonicalColumn::Bcc),
                ColumnRename::new("Date", CanonicalColumn::Submit),
            ],
            identity_rule: IdentityRule::Enron,
            start: ENRON_START,
            end: ENRON_END,
        }
    }

    /// The Seattle public-records corpus.
    pub fn seattle() -> Self {
        Self {
            name: Cow::Borrowed(SEATTLE_NAME),
            url: Cow::Borrowed(SEATTLE_URL),
            recipient_delimiter: Cow::Borrowed(SEATTLE_RECIPIENT_DELIMITER),
            columns: vec![
                ColumnRename::new("sender", CanonicalColumn::Sender),
                ColumnRename::new("to", CanonicalColumn::Receiver),
                ColumnRename::new("cc", CanonicalColumn::Cc),
                ColumnRename::new("bcc", CanonicalColumn::Bcc),
                ColumnRename::new("time", CanonicalColumn::Submit),
            ],
            identity_rule: IdentityRule::Seattle,
            start: SEATTLE_START,
            end: SEATTLE_END,
        }
    }

    /// Look up a preset by its short name.
    pub fn from_name(name: &str) -> Result<Self, PipelineError> {
        match name {
            ENRON_NAME => Ok(Self::enron()),
            SEATTLE_NAME => Ok(Self::seattle()),
            other => Err(PipelineError::UnknownDataset(other.to_string())),
        }
    }

    /// Override the download URL (mirrors, local test servers).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Cow::Owned(url.into());
        self
    }

    /// Source header renamed to `canonical`, if the dataset provides one.
    pub fn source_column(&self, canonical: CanonicalColumn) -> Option<&str> {
        self.columns
            .iter()
            .find(|rename| rename.canonical == canonical)
            .map(|rename| rename.source.as_ref())
    }

    /// Valid submit range, inclusive on both ends.
    pub fn valid_range(&self) -> RangeInclusive<EpochSeconds> {
        self.start..=self.end
    }

    /// Reject configurations the cleaner cannot apply.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.recipient_delimiter.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "dataset '{}' has an empty recipient delimiter",
                self.name
            )));
        }
        if self.start > self.end {
            return Err(PipelineError::Configuration(format!(
                "dataset '{}' has start {} after end {}",
                self.name, self.start, self.end
            )));
        }
        if CanonicalColumn::ALL
            .iter()
            .any(|canonical| self.source_column(*canonical).is_none())
        {
            return Err(PipelineError::Configuration(format!(
                "dataset '{}' does not map every canonical column",
                self.name
            )));
        }
        Ok(())
    }
}

/// How equal timestamps are handled when building a user index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep timestamps as-is (non-decreasing per user).
    Preserve,
    /// Bump each timestamp to `previous + 1` when it does not exceed the previous one.
    Increment,
}

/// How identities are enumerated into codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityLayout {
    /// One table shared by senders and receivers.
    Shared,
    /// Independent sender and receiver tables.
    Split,
}

/// Which side of an event a user index is keyed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexDirection {
    /// Keyed by sender; counterparts are receivers.
    Outbound,
    /// Keyed by receiver; counterparts are senders.
    Inbound,
}

/// Inclusive percentile band of per-user message counts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivityBand {
    /// Lower percentile in `[0, 100]`.
    pub min_percentile: f64,
    /// Upper percentile in `[0, 100]`.
    pub max_percentile: f64,
}

impl ActivityBand {
    /// Validate and build a band.
    pub fn new(min_percentile: f64, max_percentile: f64) -> Result<Self, PipelineError> {
        let in_range = |value: f64| (0.0..=100.0).contains(&value);
        if !in_range(min_percentile) || !in_range(max_percentile) {
            return Err(PipelineError::Configuration(format!(
                "percentiles must lie in [0, 100], got {min_percentile} and {max_percentile}"
            )));
        }
        if min_percentile > max_percentile {
            return Err(PipelineError::Configuration(format!(
                "min percentile {min_percentile} exceeds max percentile {max_percentile}"
            )));
        }
        Ok(Self {
            min_percentile,
            max_percentile,
        })
    }
}

/// Named bundle of filtering, identity, and indexing choices.
///
/// The historical cleaning scripts differ only along these axes, so each one
/// is a preset here rather than a separate pipeline.
#[derive(Clone, Debug)]
pub struct ProcessingProfile {
    /// Profile name used in logs.
    pub name: Cow<'static, str>,
    /// Keep only rows with exactly one receiver and no cc/bcc.
    pub single_recipient: bool,
    /// Timestamp tie handling inside each user index.
    pub tie_break: TieBreak,
    /// Identity table layout.
    pub identity_layout: IdentityLayout,
    /// User indexes to build, in write order.
    pub directions: Vec<IndexDirection>,
    /// Optional active-user band applied before an index is written.
    pub activity: Option<ActivityBand>,
}

impl ProcessingProfile {
    /// Expand multi-recipient rows; outbound index; shared identities.
    pub fn expanded() -> Self {
        Self {
            name: Cow::Borrowed("expanded"),
            single_recipient: false,
            tie_break: TieBreak::Preserve,
            identity_layout: IdentityLayout::Shared,
            directions: vec![IndexDirection::Outbound],
            activity: None,
        }
    }

    /// Point-to-point messages only, with strictly increasing per-user times.
    pub fn point_to_point() -> Self {
        Self {
            name: Cow::Borrowed("point-to-point"),
            single_recipient: true,
            tie_break: TieBreak::Increment,
            identity_layout: IdentityLayout::Shared,
            directions: vec![IndexDirection::Outbound],
            activity: None,
        }
    }

    /// Separate sender/receiver identities with outbound and inbound indexes.
    pub fn directional() -> Self {
        Self {
            name: Cow::Borrowed("directional"),
            single_recipient: false,
            tie_break: TieBreak::Increment,
            identity_layout: IdentityLayout::Split,
            directions: vec![IndexDirection::Outbound, IndexDirection::Inbound],
            activity: None,
        }
    }

    /// Override single-recipient mode.
    pub fn with_single_recipient(mut self, single_recipient: bool) -> Self {
        self.single_recipient = single_recipient;
        self
    }

    /// Override the active-user band.
    pub fn with_activity(mut self, activity: Option<ActivityBand>) -> Self {
        self.activity = activity;
        self
    }

    /// Reject profiles that would build nothing.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.directions.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "profile '{}' builds no index direction",
                self.name
            )));
        }
        Ok(())
    }

    /// Suffix appended to artifact stems (`_s` in single-recipient mode).
    pub fn artifact_suffix(&self) -> &'static str {
        if self.single_recipient {
            SINGLE_RECIPIENT_SUFFIX
        } else {
            ""
        }
    }
}

impl Default for ProcessingProfile {
    fn default() -> Self {
        Self::expanded()
    }
}
