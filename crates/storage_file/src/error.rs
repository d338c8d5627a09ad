use thiserror::Error;

/// Failures raised while decoding or querying storage files.
///
/// "Not found" is never reported through this type: package and flag lookups
/// return `Ok(None)` for names that are absent from a well-formed file.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unable to find storage files for container `{0}`.")]
    ContainerNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("failed to map storage file: {0}")]
    MapFailed(String),

    #[error("truncated storage file: {0}")]
    TruncatedFile(String),

    #[error("unsupported storage file version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("malformed storage index: {0}")]
    MalformedIndex(String),

    #[error("invalid storage file offset: {0}")]
    OffsetOutOfRange(String),

    /// Raised only when building a table with more entries than the largest
    /// supported bucket count can hold.
    #[error("hash table size limit: {0}")]
    HashTableSizeLimit(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
