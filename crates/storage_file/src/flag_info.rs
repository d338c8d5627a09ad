//! Flag info file: one attribute byte per flag, same order as the value file.
//!
//! ```text
//! [HEADER] prefix | num_flags u32 | boolean_flag_offset u32
//! [NODES]  num_flags x u8 attribute bits
//! ```

use crate::error::{Result, StorageError};
use crate::format::{ByteCursor, FlagInfoBit, HeaderPrefix, StorageFileType, FILE_VERSION};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagInfoHeader {
    pub prefix: HeaderPrefix,
    pub num_flags: u32,
    pub boolean_flag_offset: u32,
}

impl FlagInfoHeader {
    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.prefix.write_to(&mut out);
        out.extend_from_slice(&self.num_flags.to_le_bytes());
        out.extend_from_slice(&self.boolean_flag_offset.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let prefix = HeaderPrefix::read_from(&mut cursor, StorageFileType::FlagInfo)?;
        let truncated = || StorageError::TruncatedFile("flag info header is incomplete".to_string());
        Ok(Self {
            prefix,
            num_flags: cursor.read_u32().ok_or_else(truncated)?,
            boolean_flag_offset: cursor.read_u32().ok_or_else(truncated)?,
        })
    }
}

/// A single attribute byte. Reserved bits are carried through untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlagInfoNode {
    pub attributes: u8,
}

impl FlagInfoNode {
    pub fn create(is_read_write: bool) -> Self {
        let mut node = Self::default();
        node.set(FlagInfoBit::IsReadWrite, is_read_write);
        node
    }

    pub fn set(&mut self, bit: FlagInfoBit, on: bool) {
        if on {
            self.attributes |= bit as u8;
        } else {
            self.attributes &= !(bit as u8);
        }
    }

    pub fn is_set(&self, bit: FlagInfoBit) -> bool {
        (self.attributes & bit as u8) != 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagInfoList {
    pub header: FlagInfoHeader,
    pub nodes: Vec<FlagInfoNode>,
}

impl FlagInfoList {
    pub fn new(container: &str, nodes: Vec<FlagInfoNode>) -> Self {
        let mut header = FlagInfoHeader {
            prefix: HeaderPrefix {
                version: FILE_VERSION,
                container: container.to_string(),
                file_type: StorageFileType::FlagInfo as u8,
                file_size: 0,
            },
            num_flags: nodes.len() as u32,
            boolean_flag_offset: 0,
        };
        header.boolean_flag_offset = header.into_bytes().len() as u32;
        header.prefix.file_size = header.boolean_flag_offset + nodes.len() as u32;
        Self { header, nodes }
    }

    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = self.header.into_bytes();
        out.extend(self.nodes.iter().map(|n| n.attributes));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = FlagInfoHeader::from_bytes(bytes)?;
        let attrs = ByteCursor::at(bytes, header.boolean_flag_offset as usize)
            .read_bytes(header.num_flags as usize)
            .ok_or_else(|| {
                StorageError::TruncatedFile(format!(
                    "flag info file declares {} flags past the end of the file",
                    header.num_flags
                ))
            })?;
        Ok(Self {
            nodes: attrs
                .iter()
                .map(|&attributes| FlagInfoNode { attributes })
                .collect(),
            header,
        })
    }
}
