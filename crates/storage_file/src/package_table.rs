//! Package map: package name -> (package id, boolean start index).
//!
//! ```text
//! [HEADER]  prefix | num_packages u32 | bucket_offset u32 | node_offset u32
//! [BUCKETS] num_buckets x u32 node offset (0 = empty)
//! [NODES]   package_name str | package_id u32 | boolean_start_index u32 | next_offset u32
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, StorageError};
use crate::format::{
    get_table_size, package_bucket_index, read_string, str_len, ByteCursor, HeaderPrefix,
    StorageFileType, FILE_VERSION,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageTableHeader {
    pub prefix: HeaderPrefix,
    pub num_packages: u32,
    pub bucket_offset: u32,
    pub node_offset: u32,
}

impl PackageTableHeader {
    pub fn into_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.prefix.write_to(&mut out);
        out.extend_from_slice(&self.num_packages.to_le_bytes());
        out.extend_from_slice(&self.bucket_offset.to_le_bytes());
        out.extend_from_slice(&self.node_offset.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut ByteCursor::new(bytes))
    }

    fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let prefix = HeaderPrefix::read_from(cursor, StorageFileType::PackageMap)?;
        let truncated =
            || StorageError::TruncatedFile("package map header is incomplete".to_string());
        Ok(Self {
            prefix,
            num_packages: cursor.read_u32().ok_or_else(truncated)?,
            bucket_offset: cursor.read_u32().ok_or_else(truncated)?,
            node_offset: cursor.read_u32().ok_or_else(truncated)?,
        })
    }

    /// Number of buckets implied by the bucket and node offsets.
    pub fn num_buckets(&self) -> Result<u32> {
        match self.node_offset.checked_sub(self.bucket_offset) {
            Some(span) if span % 4 == 0 => Ok(span / 4),
            _ => Err(StorageError::MalformedIndex(format!(
                "package map bucket range {}..{} is invalid",
                self.bucket_offset, self.node_offset
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageTableNode {
    pub package_name: String,
    pub package_id: u32,
    pub boolean_start_index: u32,
    /// Offset of the next node in the same bucket.
    pub next_offset: Option<u32>,
}

impl PackageTableNode {
    pub fn new(package_name: impl Into<String>, package_id: u32, boolean_start_index: u32) -> Self {
        Self {
            package_name: package_name.into(),
            package_id,
            boolean_start_index,
            next_offset: None,
        }
    }

    fn byte_len(&self) -> usize {
        str_len(&self.package_name) + 12
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        crate::format::write_str(out, &self.package_name);
        out.extend_from_slice(&self.package_id.to_le_bytes());
        out.extend_from_slice(&self.boolean_start_index.to_le_bytes());
        out.extend_from_slice(&self.next_offset.unwrap_or(0).to_le_bytes());
    }

    fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let package_name = read_string(cursor, "package name")?;
        let short = || StorageError::MalformedIndex("package node runs past end of file".into());
        let package_id = cursor.read_u32().ok_or_else(short)?;
        let boolean_start_index = cursor.read_u32().ok_or_else(short)?;
        let next_offset = cursor.read_u32().ok_or_else(short)?;
        Ok(Self {
            package_name,
            package_id,
            boolean_start_index,
            next_offset: (next_offset != 0).then_some(next_offset),
        })
    }
}

impl fmt::Display for PackageTableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package: {}, id: {}, boolean_start_index: {}, next: {:?}",
            self.package_name, self.package_id, self.boolean_start_index, self.next_offset
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageTable {
    pub header: PackageTableHeader,
    pub buckets: Vec<Option<u32>>,
    pub nodes: Vec<PackageTableNode>,
}

impl PackageTable {
    /// Lays out a package map for `packages`, computing buckets and chains.
    ///
    /// Package names and ids must each be unique.
    pub fn new(container: &str, mut packages: Vec<PackageTableNode>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for p in &packages {
            if !names.insert(p.package_name.as_str()) {
                return Err(StorageError::MalformedIndex(format!(
                    "duplicate package {}",
                    p.package_name
                )));
            }
            if !ids.insert(p.package_id) {
                return Err(StorageError::MalformedIndex(format!(
                    "duplicate package id {}",
                    p.package_id
                )));
            }
        }

        let num_packages = packages.len() as u32;
        let num_buckets = get_table_size(num_packages)?;
        packages.sort_by_key(|p| (package_bucket_index(&p.package_name, num_buckets), p.package_id));

        let mut header = PackageTableHeader {
            prefix: HeaderPrefix {
                version: FILE_VERSION,
                container: container.to_string(),
                file_type: StorageFileType::PackageMap as u8,
                file_size: 0,
            },
            num_packages,
            bucket_offset: 0,
            node_offset: 0,
        };
        header.bucket_offset = header.into_bytes().len() as u32;
        header.node_offset = header.bucket_offset + num_buckets * 4;

        let bucket_of: Vec<u32> = packages
            .iter()
            .map(|p| package_bucket_index(&p.package_name, num_buckets))
            .collect();
        let mut offsets = Vec::with_capacity(packages.len());
        let mut offset = header.node_offset;
        for p in &packages {
            offsets.push(offset);
            offset += p.byte_len() as u32;
        }
        header.prefix.file_size = offset;

        let mut buckets = vec![None; num_buckets as usize];
        for (i, p) in packages.iter_mut().enumerate() {
            let bucket = bucket_of[i] as usize;
            if buckets[bucket].is_none() {
                buckets[bucket] = Some(offsets[i]);
            }
            p.next_offset = match bucket_of.get(i + 1) {
                Some(&next) if next == bucket_of[i] => Some(offsets[i + 1]),
                _ => None,
            };
        }

        Ok(Self {
            header,
            buckets,
            nodes: packages,
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
        let header = PackageTableHeader::read_from(&mut ByteCursor::new(bytes))?;
        if header.prefix.file_size as usize > bytes.len() {
            return Err(StorageError::TruncatedFile(format!(
                "package map declares {} bytes but only {} are present",
                header.prefix.file_size,
                bytes.len()
            )));
        }
        let num_buckets = header.num_buckets()?;

        let mut cursor = ByteCursor::at(bytes, header.bucket_offset as usize);
        let mut buckets = Vec::with_capacity(num_buckets as usize);
        for _ in 0..num_buckets {
            let offset = cursor.read_u32().ok_or_else(|| {
                StorageError::MalformedIndex("package map buckets run past end of file".into())
            })?;
            buckets.push((offset != 0).then_some(offset));
        }

        let mut cursor = ByteCursor::at(bytes, header.node_offset as usize);
        let nodes = (0..header.num_packages)
            .map(|_| PackageTableNode::read_from(&mut cursor))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header,
            buckets,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::read_file_version;
    use crate::test_utils::create_test_package_table;

    #[test]
    fn serialization_locks_down_layout() {
        let table = create_test_package_table();
        let bytes = table.into_bytes();
        assert_eq!(bytes.len(), table.header.prefix.file_size as usize);
        assert_eq!(PackageTable::from_bytes(&bytes).unwrap(), table);
    }

    #[test]
    fn version_is_at_the_top() {
        let bytes = create_test_package_table().into_bytes();
        assert_eq!(read_file_version(&bytes).unwrap(), FILE_VERSION);
    }

    #[test]
    fn every_package_reachable_through_its_bucket() {
        let names: Vec<String> = (0..40).map(|i| format!("com.example.pkg_{i}")).collect();
        let nodes = names
            .iter()
            .enumerate()
            .map(|(i, n)| PackageTableNode::new(n.clone(), i as u32, i as u32 * 2))
            .collect();
        let table = PackageTable::new("system", nodes).unwrap();
        let bytes = table.into_bytes();
        let num_buckets = table.header.num_buckets().unwrap();

        for (id, name) in names.iter().enumerate() {
            let bucket = package_bucket_index(name, num_buckets) as usize;
            let mut next = table.buckets[bucket];
            let mut found = None;
            while let Some(offset) = next {
                let node =
                    PackageTableNode::read_from(&mut ByteCursor::at(&bytes, offset as usize))
                        .unwrap();
                if &node.package_name == name {
                    found = Some(node.package_id);
                    break;
                }
                next = node.next_offset;
            }
            assert_eq!(found, Some(id as u32), "{name} not reachable");
        }
    }

    #[test]
    fn duplicate_packages_rejected() {
        let err = PackageTable::new(
            "system",
            vec![PackageTableNode::new("a", 0, 0), PackageTableNode::new("a", 1, 3)],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)));

        let err = PackageTable::new(
            "system",
            vec![PackageTableNode::new("a", 0, 0), PackageTableNode::new("b", 0, 3)],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)));
    }

    #[test]
    fn wrong_file_type_rejected() {
        let mut table = create_test_package_table();
        table.header.prefix.file_type = StorageFileType::FlagMap as u8;
        let err = PackageTable::from_bytes(&table.into_bytes()).unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)));
    }

    #[test]
    fn truncated_file_rejected() {
        let bytes = create_test_package_table().into_bytes();
        let err = PackageTable::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, StorageError::TruncatedFile(_)));
        let err = PackageTable::from_bytes(&bytes[..10]).unwrap_err();
        assert!(matches!(err, StorageError::TruncatedFile(_)));
    }
}
