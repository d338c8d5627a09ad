//! Flag value file: one byte per flag, addressed by global flag index.
//!
//! ```text
//! [HEADER] prefix | num_flags u32 | boolean_value_offset u32
//! [VALUES] num_flags x u8 (1 = true, anything else = false)
//! ```

use crate::error::{Result, StorageError};
use crate::format::{ByteCursor, HeaderPrefix, StorageFileType, FILE_VERSION};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagValueHeader {
    pub prefix: HeaderPrefix,
    pub num_flags: u32,
    pub boolean_value_offset: u32,
}

impl FlagValueHeader {
    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.prefix.write_to(&mut out);
        out.extend_from_slice(&self.num_flags.to_le_bytes());
        out.extend_from_slice(&self.boolean_value_offset.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let prefix = HeaderPrefix::read_from(&mut cursor, StorageFileType::FlagVal)?;
        let truncated =
            || StorageError::TruncatedFile("flag value header is incomplete".to_string());
        Ok(Self {
            prefix,
            num_flags: cursor.read_u32().ok_or_else(truncated)?,
            boolean_value_offset: cursor.read_u32().ok_or_else(truncated)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagValueList {
    pub header: FlagValueHeader,
    pub booleans: Vec<bool>,
}

impl FlagValueList {
    pub fn new(container: &str, booleans: Vec<bool>) -> Self {
        let mut header = FlagValueHeader {
            prefix: HeaderPrefix {
                version: FILE_VERSION,
                container: container.to_string(),
                file_type: StorageFileType::FlagVal as u8,
                file_size: 0,
            },
            num_flags: booleans.len() as u32,
            boolean_value_offset: 0,
        };
        header.boolean_value_offset = header.into_bytes().len() as u32;
        header.prefix.file_size = header.boolean_value_offset + booleans.len() as u32;
        Self { header, booleans }
    }

    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = self.header.into_bytes();
        out.extend(self.booleans.iter().map(|&v| u8::from(v)));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = FlagValueHeader::from_bytes(bytes)?;
        let values = ByteCursor::at(bytes, header.boolean_value_offset as usize)
            .read_bytes(header.num_flags as usize)
            .ok_or_else(|| {
                StorageError::TruncatedFile(format!(
                    "flag value file declares {} flags past the end of the file",
                    header.num_flags
                ))
            })?;
        Ok(Self {
            booleans: values.iter().map(|&b| b == 1).collect(),
            header,
        })
    }
}
