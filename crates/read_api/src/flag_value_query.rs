//! Flag value lookups by global index.

use storage_file::{StorageError, StorageFileType};

use crate::header::FileHeader;
use crate::Result;

/// Reads the boolean stored at global `index` in a flag value file.
///
/// # Errors
///
/// - `OffsetOutOfRange` when `index` is not below the declared flag count or
///   the slot lies past the declared file size.
/// - `MalformedIndex` when the data offset points into the header.
/// - `UnsupportedVersion` or `TruncatedFile` from the header checks.
pub fn find_boolean_flag_value(buf: &[u8], index: u32) -> Result<bool> {
    let mut header = FileHeader::read(buf, StorageFileType::FlagVal)?;
    let num_flags = header.next_field("num_flags")?;
    let value_offset = header.next_field("boolean_value_offset")? as usize;
    if value_offset < header.fields.position() {
        return Err(StorageError::MalformedIndex(format!(
            "flag value data offset {value_offset} points into the header"
        )));
    }

    let pos = value_offset + index as usize;
    if index >= num_flags || pos >= header.file_size {
        return Err(StorageError::OffsetOutOfRange(format!(
            "flag value index {index} goes beyond the end of the file ({num_flags} flags)"
        )));
    }
    Ok(buf[pos] == 1)
}
