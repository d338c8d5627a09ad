//! Flag map: (package id, flag name) -> (flag type, flag index).
//!
//! ```text
//! [HEADER]  prefix | num_flags u32 | bucket_offset u32 | node_offset u32
//! [BUCKETS] num_buckets x u32 node offset (0 = empty)
//! [NODES]   package_id u32 | flag_name str | flag_type u16 | flag_index u16 | next_offset u32
//! ```
//!
//! `flag_index` is package-relative: add the package's boolean start index
//! from the package map to address the value and info files.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{Result, StorageError};
use crate::format::{
    flag_bucket_index, get_table_size, read_string, str_len, ByteCursor, HeaderPrefix,
    StorageFileType, StoredFlagType, FILE_VERSION,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagTableHeader {
    pub prefix: HeaderPrefix,
    pub num_flags: u32,
    pub bucket_offset: u32,
    pub node_offset: u32,
}

impl FlagTableHeader {
    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.prefix.write_to(&mut out);
        out.extend_from_slice(&self.num_flags.to_le_bytes());
        out.extend_from_slice(&self.bucket_offset.to_le_bytes());
        out.extend_from_slice(&self.node_offset.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut ByteCursor::new(bytes))
    }

    fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let prefix = HeaderPrefix::read_from(cursor, StorageFileType::FlagMap)?;
        let truncated = || StorageError::TruncatedFile("flag map header is incomplete".to_string());
        Ok(Self {
            prefix,
            num_flags: cursor.read_u32().ok_or_else(truncated)?,
            bucket_offset: cursor.read_u32().ok_or_else(truncated)?,
            node_offset: cursor.read_u32().ok_or_else(truncated)?,
        })
    }

    pub fn num_buckets(&self) -> Result<u32> {
        match self.node_offset.checked_sub(self.bucket_offset) {
            Some(span) if span % 4 == 0 => Ok(span / 4),
            _ => Err(StorageError::MalformedIndex(format!(
                "flag map bucket range {}..{} is invalid",
                self.bucket_offset, self.node_offset
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagTableNode {
    pub package_id: u32,
    pub flag_name: String,
    pub flag_type: StoredFlagType,
    pub flag_index: u16,
    pub next_offset: Option<u32>,
}

impl FlagTableNode {
    pub fn new(
        package_id: u32,
        flag_name: impl Into<String>,
        flag_type: StoredFlagType,
        flag_index: u16,
    ) -> Self {
        Self {
            package_id,
            flag_name: flag_name.into(),
            flag_type,
            flag_index,
            next_offset: None,
        }
    }

    fn byte_len(&self) -> usize {
        4 + str_len(&self.flag_name) + 2 + 2 + 4
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.package_id.to_le_bytes());
        crate::format::write_str(out, &self.flag_name);
        out.extend_from_slice(&(self.flag_type as u16).to_le_bytes());
        out.extend_from_slice(&self.flag_index.to_le_bytes());
        out.extend_from_slice(&self.next_offset.unwrap_or(0).to_le_bytes());
    }

    fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let short = || StorageError::MalformedIndex("flag node runs past end of file".into());
        let package_id = cursor.read_u32().ok_or_else(short)?;
        let flag_name = read_string(cursor, "flag name")?;
        let flag_type = StoredFlagType::try_from(cursor.read_u16().ok_or_else(short)?)?;
        let flag_index = cursor.read_u16().ok_or_else(short)?;
        let next_offset = cursor.read_u32().ok_or_else(short)?;
        Ok(Self {
            package_id,
            flag_name,
            flag_type,
            flag_index,
            next_offset: (next_offset != 0).then_some(next_offset),
        })
    }
}

impl fmt::Display for FlagTableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package_id: {}, flag: {}, type: {}, index: {}, next: {:?}",
            self.package_id, self.flag_name, self.flag_type, self.flag_index, self.next_offset
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagTable {
    pub header: FlagTableHeader,
    pub buckets: Vec<Option<u32>>,
    pub nodes: Vec<FlagTableNode>,
}

impl FlagTable {
    /// Lays out a flag map for `flags`.
    ///
    /// Within one package, flag names must be unique and flag indices must be
    /// exactly `0..n` for the package's `n` flags.
    pub fn new(container: &str, mut flags: Vec<FlagTableNode>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut indices: BTreeMap<u32, Vec<u16>> = BTreeMap::new();
        for f in &flags {
            if !keys.insert((f.package_id, f.flag_name.as_str())) {
                return Err(StorageError::MalformedIndex(format!(
                    "duplicate flag {} in package {}",
                    f.flag_name, f.package_id
                )));
            }
            indices.entry(f.package_id).or_default().push(f.flag_index);
        }
        for (package_id, mut idx) in indices {
            idx.sort_unstable();
            if idx.iter().enumerate().any(|(i, &v)| i != v as usize) {
                return Err(StorageError::MalformedIndex(format!(
                    "flag indices of package {package_id} are not dense from 0"
                )));
            }
        }

        let num_flags = flags.len() as u32;
        let num_buckets = get_table_size(num_flags)?;
        let bucket = |f: &FlagTableNode| flag_bucket_index(f.package_id, &f.flag_name, num_buckets);
        flags.sort_by_key(|f| (bucket(f), f.package_id, f.flag_index));

        let mut header = FlagTableHeader {
            prefix: HeaderPrefix {
                version: FILE_VERSION,
                container: container.to_string(),
                file_type: StorageFileType::FlagMap as u8,
                file_size: 0,
            },
            num_flags,
            bucket_offset: 0,
            node_offset: 0,
        };
        header.bucket_offset = header.into_bytes().len() as u32;
        header.node_offset = header.bucket_offset + num_buckets * 4;

        let bucket_of: Vec<u32> = flags.iter().map(bucket).collect();
        let mut offsets = Vec::with_capacity(flags.len());
        let mut offset = header.node_offset;
        for f in &flags {
            offsets.push(offset);
            offset += f.byte_len() as u32;
        }
        header.prefix.file_size = offset;

        let mut buckets = vec![None; num_buckets as usize];
        for (i, f) in flags.iter_mut().enumerate() {
            let b = bucket_of[i] as usize;
            if buckets[b].is_none() {
                buckets[b] = Some(offsets[i]);
            }
            f.next_offset = match bucket_of.get(i + 1) {
                Some(&next) if next == bucket_of[i] => Some(offsets[i + 1]),
                _ => None,
            };
        }

        Ok(Self {
            header,
            buckets,
            nodes: flags,
        })
    }

    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = self.header.into_bytes();
        for bucket in &self.buckets {
            out.extend_from_slice(&bucket.unwrap_or(0).to_le_bytes());
        }
        for node in &self.nodes {
            node.write_to(&mut out);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = FlagTableHeader::read_from(&mut ByteCursor::new(bytes))?;
        if header.prefix.file_size as usize > bytes.len() {
            return Err(StorageError::TruncatedFile(format!(
                "flag map declares {} bytes but only {} are present",
                header.prefix.file_size,
                bytes.len()
            )));
        }
        let num_buckets = header.num_buckets()?;

        let mut cursor = ByteCursor::at(bytes, header.bucket_offset as usize);
        let mut buckets = Vec::with_capacity(num_buckets as usize);
        for _ in 0..num_buckets {
            let offset = cursor.read_u32().ok_or_else(|| {
                StorageError::MalformedIndex("flag map buckets run past end of file".into())
            })?;
            buckets.push((offset != 0).then_some(offset));
        }

        let mut cursor = ByteCursor::at(bytes, header.node_offset as usize);
        let nodes = (0..header.num_flags)
            .map(|_| FlagTableNode::read_from(&mut cursor))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header,
            buckets,
            nodes,
        })
    }
}
