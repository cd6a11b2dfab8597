/// Constants describing the published datasets.
pub mod datasets {
    use crate::types::EpochSeconds;

    /// Download location of the Enron metadata archive.
    pub const ENRON_URL: &str = "https://files.ssrc.us/data/enron.zip";
    /// Enron artifact subdirectory name.
    pub const ENRON_NAME: &str = "enron";
    /// Separator between recipients in Enron `To` cells.
    pub const ENRON_RECIPIENT_DELIMITER: &str = ",";
    /// July 16, 1985.
    pub const ENRON_START: EpochSeconds = 490_338_000;
    /// December 3, 2001.
    pub const ENRON_END: EpochSeconds = 1_007_337_600;

    /// Download location of the Seattle metadata archive.
    pub const SEATTLE_URL: &str = "https://files.ssrc.us/data/seattle.zip";
    /// Seattle artifact subdirectory name.
    pub const SEATTLE_NAME: &str = "seattle";
    /// Separator between recipients in Seattle `to` cells.
    pub const SEATTLE_RECIPIENT_DELIMITER: &str = ";";
    /// January 1, 2017.
    pub const SEATTLE_START: EpochSeconds = 1_483_228_800;
    /// April 1, 2017.
    pub const SEATTLE_END: EpochSeconds = 1_491_004_800;
}

/// Artifact file names written under each dataset directory.
pub mod artifacts {
    /// Downloaded archive.
    pub const RAW_ZIP: &str = "raw.zip";
    /// CSV extracted from the archive.
    pub const RAW_CSV: &str = "raw.csv";
    /// Stem of the coded event table.
    pub const CLEAN_STEM: &str = "clean";
    /// Stem of the coded event table under the split identity layout.
    pub const CLEAN_SPLIT_STEM: &str = "clean_split";
    /// Stem of the shared identity table.
    pub const USERS_STEM: &str = "users";
    /// Stem of the sender identity table (split layout).
    pub const SENDERS_STEM: &str = "senders";
    /// Stem of the receiver identity table (split layout).
    pub const RECEIVERS_STEM: &str = "receivers";
    /// Stem of the outbound index when it is the only index written.
    pub const PROCESSED_STEM: &str = "processed";
    /// Stem of the outbound index in the directional layout.
    pub const SENDERS_PROCESSED_STEM: &str = "senders_processed";
    /// Stem of the inbound index in the directional layout.
    pub const RECEIVERS_PROCESSED_STEM: &str = "receivers_processed";
    /// Suffix appended to stems in single-recipient mode.
    pub const SINGLE_RECIPIENT_SUFFIX: &str = "_s";
    /// Prefix of the percentile tag on band-filtered index stems (`_p5-95`).
    pub const ACTIVITY_BAND_PREFIX: &str = "_p";
    /// Extension used while a download is in flight.
    pub const PARTIAL_DOWNLOAD_EXTENSION: &str = "part";
    /// Extension used while an artifact is being written.
    pub const PARTIAL_WRITE_EXTENSION: &str = "tmp";
    /// Header row of the coded event table.
    pub const CLEAN_EVENT_HEADER: [&str; 3] = ["sender", "receiver", "submit"];
    /// Header of the code column in identity tables (pandas index export).
    pub const IDENTITY_CODE_HEADER: &str = "";
    /// Header of the identity column in identity tables.
    pub const IDENTITY_VALUE_HEADER: &str = "user";
}

/// Constants used while cleaning raw rows.
pub mod cleaning {
    use crate::types::EpochSeconds;

    /// Textual placeholder that marks a missing value in exported cells.
    pub const NAN_PLACEHOLDER: &str = "nan";
    /// Returned by the timestamp parser when a value cannot be read.
    pub const INVALID_TIMESTAMP: EpochSeconds = -1;
}

/// Constants used by the fetcher.
pub mod fetch {
    use std::time::Duration;

    /// Read buffer size used while streaming a download to disk.
    pub const DOWNLOAD_CHUNK_BYTES: usize = 8 * 1024;
    /// Minimum spacing between download progress log lines.
    pub const DOWNLOAD_PROGRESS_INTERVAL: Duration = Duration::from_secs(2);
}

/// Constants used by the per-user indexer.
pub mod index {
    use crate::types::EpochSeconds;

    /// Forward shift (seconds) above which tie-breaking drift is logged as a warning.
    pub const TIE_BREAK_DRIFT_WARN_SECONDS: EpochSeconds = 60;
}
