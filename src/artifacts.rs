use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer, WriterBuilder};

use crate::config::{DatasetConfig, IdentityLayout, IndexDirection, ProcessingProfile};
use crate::constants::artifacts::{
    ACTIVITY_BAND_PREFIX, CLEAN_EVENT_HEADER, CLEAN_SPLIT_STEM, CLEAN_STEM, IDENTITY_CODE_HEADER,
    IDENTITY_VALUE_HEADER, PARTIAL_WRITE_EXTENSION, PROCESSED_STEM, RAW_CSV, RAW_ZIP,
    RECEIVERS_PROCESSED_STEM, RECEIVERS_STEM, SENDERS_PROCESSED_STEM, SENDERS_STEM, USERS_STEM,
};
use crate::data::{CleanEvent, UserIndex};
use crate::errors::PipelineError;
use crate::factorize::{IdentityTable, IdentityTables};
use crate::transport::fs::write_atomically;
use crate::types::UserCode;

/// Where identity tables are written for a profile's layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityTablePaths {
    /// `users{suffix}.csv`
    Shared(PathBuf),
    /// `senders{suffix}.csv` and `receivers{suffix}.csv`
    Split {
        /// Sender table path.
        senders: PathBuf,
        /// Receiver table path.
        receivers: PathBuf,
    },
}

/// Every artifact path for one dataset under one processing profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Dataset directory (`<data>/<dataset>`).
    pub dir: PathBuf,
    /// Downloaded archive.
    pub raw_zip: PathBuf,
    /// Extracted source CSV.
    pub raw_csv: PathBuf,
    /// Coded event table.
    pub clean: PathBuf,
    /// Identity lookup table(s).
    pub identities: IdentityTablePaths,
    /// Per-user index files, in profile direction order.
    pub indexes: Vec<(IndexDirection, PathBuf)>,
}

impl ArtifactPaths {
    /// Resolve artifact locations under `data_dir`.
    pub fn new(data_dir: &Path, dataset: &DatasetConfig, profile: &ProcessingProfile) -> Self {
        let dir = data_dir.join(dataset.name.as_ref());
        let suffix = profile.artifact_suffix();
        let stem_path =
            |stem: &str, extension: &str| dir.join(format!("{stem}{suffix}.{extension}"));

        // Codes differ between layouts, so each layout owns its clean table.
        let (clean_stem, identities) = match profile.identity_layout {
            IdentityLayout::Shared => (
                CLEAN_STEM,
                IdentityTablePaths::Shared(stem_path(USERS_STEM, "csv")),
            ),
            IdentityLayout::Split => (
                CLEAN_SPLIT_STEM,
                IdentityTablePaths::Split {
                    senders: stem_path(SENDERS_STEM, "csv"),
                    receivers: stem_path(RECEIVERS_STEM, "csv"),
                },
            ),
        };

        // A filtered index holds fewer users, so the band is part of its name.
        let band_tag = profile
            .activity
            .map(|band| {
                format!(
                    "{ACTIVITY_BAND_PREFIX}{}-{}",
                    band.min_percentile, band.max_percentile
                )
            })
            .unwrap_or_default();
        let single_outbound = profile.directions == [IndexDirection::Outbound];
        let indexes = profile
            .directions
            .iter()
            .map(|direction| {
                let stem = match direction {
                    IndexDirection::Outbound if single_outbound => PROCESSED_STEM,
                    IndexDirection::Outbound => SENDERS_PROCESSED_STEM,
                    IndexDirection::Inbound => RECEIVERS_PROCESSED_STEM,
                };
                (*direction, dir.join(format!("{stem}{suffix}{band_tag}.json")))
            })
            .collect();

        Self {
            raw_zip: dir.join(RAW_ZIP),
            raw_csv: dir.join(RAW_CSV),
            clean: stem_path(clean_stem, "csv"),
            identities,
            indexes,
            dir,
        }
    }

    /// Index path for `direction`, when the profile builds that index.
    pub fn index_path(&self, direction: IndexDirection) -> Option<&Path> {
        self.indexes
            .iter()
            .find(|(candidate, _)| *candidate == direction)
            .map(|(_, path)| path.as_path())
    }
}

/// Write the coded event table (`sender,receiver,submit`).
pub fn write_clean_events(path: &Path, events: &[CleanEvent]) -> Result<(), PipelineError> {
    write_atomically(path, PARTIAL_WRITE_EXTENSION, |out| {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
        writer.write_record(CLEAN_EVENT_HEADER)?;
        for event in events {
            writer.serialize(event)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Read a coded event table written by [`write_clean_events`].
pub fn read_clean_events(path: &Path) -> Result<Vec<CleanEvent>, PipelineError> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));
    let events = reader
        .deserialize()
        .collect::<Result<Vec<CleanEvent>, _>>()?;
    Ok(events)
}

/// Write one identity table as `,user` / `<code>,<identity>` rows.
pub fn write_identity_table(path: &Path, table: &IdentityTable) -> Result<(), PipelineError> {
    write_atomically(path, PARTIAL_WRITE_EXTENSION, |out| {
        let mut writer = Writer::from_writer(out);
        writer.write_record([IDENTITY_CODE_HEADER, IDENTITY_VALUE_HEADER])?;
        for (code, identity) in table.iter() {
            writer.write_record([code.to_string().as_str(), identity])?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Read an identity table, requiring codes to be dense and in order.
pub fn read_identity_table(path: &Path) -> Result<IdentityTable, PipelineError> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new().from_reader(BufReader::new(file));
    let mut table = IdentityTable::new();
    for (expected, result) in reader.records().enumerate() {
        let row = result?;
        let malformed = |details: String| PipelineError::MalformedArtifact {
            path: path.to_path_buf(),
            details,
        };
        let code: UserCode = row
            .get(0)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| malformed(format!("row {expected} has no numeric code")))?;
        let identity = row
            .get(1)
            .ok_or_else(|| malformed(format!("row {expected} has no identity")))?;
        if code as usize != expected {
            return Err(malformed(format!(
                "expected code {expected}, found {code}"
            )));
        }
        if table.intern(identity) != code {
            return Err(malformed(format!("identity '{identity}' appears twice")));
        }
    }
    Ok(table)
}

/// Write every table in `tables` to its matching path.
pub fn write_identity_tables(
    paths: &IdentityTablePaths,
    tables: &IdentityTables,
) -> Result<(), PipelineError> {
    match (paths, tables) {
        (IdentityTablePaths::Shared(path), IdentityTables::Shared(table)) => {
            write_identity_table(path, table)
        }
        (
            IdentityTablePaths::Split { senders, receivers },
            IdentityTables::Split {
                senders: sender_table,
                receivers: receiver_table,
            },
        ) => {
            write_identity_table(senders, sender_table)?;
            write_identity_table(receivers, receiver_table)
        }
        _ => Err(PipelineError::Configuration(
            "identity table layout does not match artifact layout".to_string(),
        )),
    }
}

/// Write a per-user index as a JSON array.
pub fn write_user_index(path: &Path, users: &[UserIndex]) -> Result<(), PipelineError> {
    write_atomically(path, PARTIAL_WRITE_EXTENSION, |out| {
        serde_json::to_writer(out, users)?;
        Ok(())
    })
}

/// Read a per-user index written by [`write_user_index`].
pub fn read_user_index(path: &Path) -> Result<Vec<UserIndex>, PipelineError> {
    let file = File::open(path)?;
    let users = serde_json::from_reader(BufReader::new(file))?;
    Ok(users)
}
