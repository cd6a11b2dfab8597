/// Zip extraction.
pub mod archive;
/// Local artifact file helpers.
pub mod fs;
/// Streaming HTTP downloads.
pub mod http;
