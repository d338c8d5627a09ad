//! Storage file format constants, shared header helpers and bucket hashing.
//!
//! Every storage file starts with the same prefix:
//!
//! ```text
//! [version: u32 LE][container_len: u32 LE][container bytes][file_type: u8][file_size: u32 LE]
//! ```
//!
//! The version field is always the first four bytes, whatever the file kind.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;

use crate::error::{Result, StorageError};

/// The only storage file version this crate reads and writes.
pub const FILE_VERSION: u32 = 1;

/// Width of the version field at offset 0 of every storage file.
pub const VERSION_BYTES: usize = 4;

/// Bucket counts, each prime, roughly doubling.
pub(crate) const HASH_PRIMES: [u32; 29] = [
    7, 17, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319,
    201326611, 402653189, 805306457, 1610612741,
];

/// The four kinds of storage file a container publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageFileType {
    PackageMap = 0,
    FlagMap = 1,
    FlagVal = 2,
    FlagInfo = 3,
}

impl StorageFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageMap => "package_map",
            Self::FlagMap => "flag_map",
            Self::FlagVal => "flag_val",
            Self::FlagInfo => "flag_info",
        }
    }
}

impl fmt::Display for StorageFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StorageFileType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "package_map" => Ok(Self::PackageMap),
            "flag_map" => Ok(Self::FlagMap),
            "flag_val" => Ok(Self::FlagVal),
            "flag_info" => Ok(Self::FlagInfo),
            _ => anyhow::bail!(
                "invalid storage file type {value:?}, valid types are package_map|flag_map|flag_val|flag_info"
            ),
        }
    }
}

impl TryFrom<u8> for StorageFileType {
    type Error = StorageError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::PackageMap),
            1 => Ok(Self::FlagMap),
            2 => Ok(Self::FlagVal),
            3 => Ok(Self::FlagInfo),
            other => Err(StorageError::MalformedIndex(format!(
                "unknown storage file type tag {other}"
            ))),
        }
    }
}

/// Flag kind as recorded in the flag map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoredFlagType {
    ReadWriteBoolean = 0,
    ReadOnlyBoolean = 1,
    FixedReadOnlyBoolean = 2,
}

impl TryFrom<u16> for StoredFlagType {
    type Error = StorageError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::ReadWriteBoolean),
            1 => Ok(Self::ReadOnlyBoolean),
            2 => Ok(Self::FixedReadOnlyBoolean),
            other => Err(StorageError::MalformedIndex(format!(
                "unknown stored flag type tag {other}"
            ))),
        }
    }
}

impl fmt::Display for StoredFlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadWriteBoolean => "read_write",
            Self::ReadOnlyBoolean => "read_only",
            Self::FixedReadOnlyBoolean => "fixed_read_only",
        })
    }
}

/// Bits of a flag info attribute byte. Bits 3..=7 are reserved and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagInfoBit {
    IsSticky = 1 << 0,
    IsReadWrite = 1 << 1,
    HasOverride = 1 << 2,
}

/// Returns the bucket count for a table holding `entries` items (load factor 0.5).
pub fn get_table_size(entries: u32) -> Result<u32> {
    HASH_PRIMES
        .iter()
        .find(|&&num| u64::from(num) >= 2 * u64::from(entries))
        .copied()
        .ok_or_else(|| {
            StorageError::HashTableSizeLimit(format!(
                "{entries} entries exceed the largest supported table"
            ))
        })
}

/// Bucket of a package name in a package map with `num_buckets` buckets.
pub fn package_bucket_index(package: &str, num_buckets: u32) -> u32 {
    crc32fast::hash(package.as_bytes()) % num_buckets
}

/// Bucket of a `(package_id, flag_name)` key in a flag map.
///
/// The key is hashed as `package_id` (u32 LE) followed by the flag name bytes.
pub fn flag_bucket_index(package_id: u32, flag: &str, num_buckets: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&package_id.to_le_bytes());
    hasher.update(flag.as_bytes());
    hasher.finalize() % num_buckets
}

/// Bounds-checked little-endian reader over a borrowed byte slice.
///
/// Every read returns `None` instead of panicking when the requested range
/// runs past the end of the slice; callers decide which error that is.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// A cursor positioned at `pos`. Out-of-range positions fail on first read.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a [u8] {
        self.buf.get(self.pos..).unwrap_or(&[])
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let v = self.rest().read_u8().ok()?;
        self.pos += 1;
        Some(v)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let v = self.rest().read_u16::<LittleEndian>().ok()?;
        self.pos += 2;
        Some(v)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let v = self.rest().read_u32::<LittleEndian>().ok()?;
        self.pos += 4;
        Some(v)
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Reads a length-prefixed string as raw bytes, without UTF-8 validation.
    pub fn read_str_bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }
}

/// Reads the format version from the first four bytes of a storage file.
///
/// The value is returned as-is; deciding whether it is supported is up to
/// the caller.
pub fn read_file_version(bytes: &[u8]) -> Result<u32> {
    ByteCursor::new(bytes).read_u32().ok_or_else(|| {
        StorageError::TruncatedFile(format!(
            "file is {} bytes, shorter than the {VERSION_BYTES}-byte version header",
            bytes.len()
        ))
    })
}

/// Fields shared by the headers of all four file kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderPrefix {
    pub version: u32,
    pub container: String,
    pub file_type: u8,
    pub file_size: u32,
}

impl HeaderPrefix {
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        write_str(out, &self.container);
        out.push(self.file_type);
        out.extend_from_slice(&self.file_size.to_le_bytes());
    }

    /// Decodes the prefix and checks that it announces `expected`.
    pub(crate) fn read_from(cursor: &mut ByteCursor<'_>, expected: StorageFileType) -> Result<Self> {
        let truncated = || StorageError::TruncatedFile(format!("{expected} header is incomplete"));
        let version = cursor.read_u32().ok_or_else(truncated)?;
        let container = cursor.read_str_bytes().ok_or_else(truncated)?;
        let container = String::from_utf8(container.to_vec()).map_err(|e| {
            StorageError::MalformedIndex(format!("container name is not UTF-8: {e}"))
        })?;
        let file_type = cursor.read_u8().ok_or_else(truncated)?;
        let file_size = cursor.read_u32().ok_or_else(truncated)?;

        if StorageFileType::try_from(file_type)? != expected {
            return Err(StorageError::MalformedIndex(format!(
                "expected a {expected} file, found file type tag {file_type}"
            )));
        }

        Ok(Self {
            version,
            container,
            file_type,
            file_size,
        })
    }
}

/// Appends a u32-length-prefixed string.
pub(crate) fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Serialized length of a u32-length-prefixed string.
pub(crate) fn str_len(s: &str) -> usize {
    4 + s.len()
}

/// Decodes a length-prefixed string that must be valid UTF-8.
pub(crate) fn read_string(cursor: &mut ByteCursor<'_>, what: &str) -> Result<String> {
    let bytes = cursor
        .read_str_bytes()
        .ok_or_else(|| StorageError::MalformedIndex(format!("{what} runs past end of file")))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| StorageError::MalformedIndex(format!("{what} is not UTF-8: {e}")))
}
