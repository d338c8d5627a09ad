pub mod create_flag_info;
pub mod list;
pub mod print;
pub mod query;
pub mod version;

use anyhow::Result;
use storage_file::StorageFileType;

/// Parses a `--type` value such as `flag_map`.
pub fn parse_file_type(value: &str) -> Result<StorageFileType> {
    StorageFileType::try_from(value)
}
