//! Bucket and chain traversal shared by the package map and flag map.
//!
//! The mapped bytes are treated as an arena: every bucket entry and
//! `next_offset` is an index into it and is range-checked before use.

use storage_file::{ByteCursor, StorageError, StorageFileType};
use tracing::warn;

use crate::header::FileHeader;
use crate::Result;

/// Smallest encoded node of either map: an empty name plus three u32 fields,
/// or a u32, an empty name, two u16 and a u32.
const MIN_NODE_LEN: usize = 16;

pub(crate) struct BucketTable<'a> {
    kind: StorageFileType,
    /// File bytes limited to the declared file size.
    buf: &'a [u8],
    pub num_entries: u32,
    pub num_buckets: u32,
    /// Most nodes a chain walk may visit.
    pub max_chain_len: u32,
    bucket_offset: usize,
    node_offset: usize,
}

impl<'a> BucketTable<'a> {
    /// Reads `num_entries | bucket_offset | node_offset` after the common header.
    pub fn read(buf: &'a [u8], kind: StorageFileType) -> Result<Self> {
        let mut header = FileHeader::read(buf, kind)?;
        let num_entries = header.next_field("num_entries")?;
        let bucket_offset = header.next_field("bucket_offset")? as usize;
        let node_offset = header.next_field("node_offset")? as usize;
        let header_end = header.fields.position();
        let buf = &buf[..header.file_size];

        let valid = header_end <= bucket_offset
            && bucket_offset <= node_offset
            && node_offset <= buf.len()
            && (node_offset - bucket_offset) % 4 == 0;
        if !valid {
            return Err(malformed(
                kind,
                format!("bucket range {bucket_offset}..{node_offset} is outside the file"),
            ));
        }

        let fits = ((buf.len() - node_offset) / MIN_NODE_LEN).min(u32::MAX as usize) as u32;
        Ok(Self {
            kind,
            buf,
            num_entries,
            max_chain_len: num_entries.min(fits),
            num_buckets: ((node_offset - bucket_offset) / 4) as u32,
            bucket_offset,
            node_offset,
        })
    }

    /// Offset of the first node in `bucket`, or `None` for an empty bucket.
    pub fn bucket_head(&self, bucket: u32) -> Result<Option<u32>> {
        let offset = ByteCursor::at(self.buf, self.bucket_offset + bucket as usize * 4)
            .read_u32()
            .ok_or_else(|| malformed(self.kind, format!("bucket {bucket} is out of range")))?;
        Ok((offset != 0).then_some(offset))
    }

    /// A cursor at the node stored at `offset`.
    pub fn node(&self, offset: u32) -> Result<ByteCursor<'a>> {
        let offset = offset as usize;
        if offset < self.node_offset || offset >= self.buf.len() {
            return Err(malformed(
                self.kind,
                format!("node offset {offset} is outside the node region"),
            ));
        }
        Ok(ByteCursor::at(self.buf, offset))
    }

    pub fn malformed(&self, reason: impl Into<String>) -> StorageError {
        malformed(self.kind, reason.into())
    }

    /// Error for a chain that visits more nodes than the table can hold.
    pub fn chain_too_long(&self) -> StorageError {
        self.malformed(format!(
            "chain is longer than the {} nodes the table can hold",
            self.max_chain_len
        ))
    }
}

fn malformed(kind: StorageFileType, reason: String) -> StorageError {
    warn!(%kind, %reason, "rejecting malformed storage file");
    StorageError::MalformedIndex(format!("{kind}: {reason}"))
}
