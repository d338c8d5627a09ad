//! Flag attribute lookups by global index.

use std::fmt;

use storage_file::{FlagInfoBit, StorageError, StorageFileType};

use crate::header::FileHeader;
use crate::Result;

/// The attribute byte of one flag. Unknown bits are kept as stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FlagAttributes(pub u8);

impl FlagAttributes {
    pub fn is_set(&self, bit: FlagInfoBit) -> bool {
        (self.0 & bit as u8) != 0
    }

    pub fn is_sticky(&self) -> bool {
        self.is_set(FlagInfoBit::IsSticky)
    }

    pub fn is_read_write(&self) -> bool {
        self.is_set(FlagInfoBit::IsReadWrite)
    }

    pub fn has_override(&self) -> bool {
        self.is_set(FlagInfoBit::HasOverride)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl From<u8> for FlagAttributes {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::Display for FlagAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sticky: {}, read_write: {}, override: {}",
            self.is_sticky(),
            self.is_read_write(),
            self.has_override()
        )
    }
}

/// Reads the raw attribute byte stored at global `index` in a flag info file.
///
/// # Errors
///
/// - `OffsetOutOfRange` when `index` is not below the declared flag count or
///   the slot lies past the declared file size.
/// - `MalformedIndex` when the data offset points into the header.
/// - `UnsupportedVersion` or `TruncatedFile` from the header checks.
pub fn find_boolean_flag_attribute(buf: &[u8], index: u32) -> Result<u8> {
    let mut header = FileHeader::read(buf, StorageFileType::FlagInfo)?;
    let num_flags = header.next_field("num_flags")?;
    let info_offset = header.next_field("boolean_flag_offset")? as usize;
    if info_offset < header.fields.position() {
        return Err(StorageError::MalformedIndex(format!(
            "flag info data offset {info_offset} points into the header"
        )));
    }

    let pos = info_offset + index as usize;
    if index >= num_flags || pos >= header.file_size {
        return Err(StorageError::OffsetOutOfRange(format!(
            "flag info index {index} goes beyond the end of the file ({num_flags} flags)"
        )));
    }
    Ok(buf[pos])
}
