/// Dense integer code assigned to a cleaned identity.
/// Example: `0` for the first sender seen in a cleaning pass.
pub type UserCode = u32;
/// Seconds since the Unix epoch.
/// Example: `1483265600` (`2017-01-01 10:13:20`)
pub type EpochSeconds = i64;
/// Cleaned identity string (address or display name after normalization).
/// Examples: `jane@x.com`, `JaneDoe`
pub type Identity = String;
/// Short dataset identifier, also used as the artifact subdirectory name.
/// Examples: `enron`, `seattle`
pub type DatasetName = String;
/// Column name as it appears in a raw dataset export.
/// Examples: `From`, `X-cc`, `time`
pub type SourceColumn = String;
