//! Flag map lookups.

use storage_file::{flag_bucket_index, StorageFileType, StoredFlagType};

use crate::table::BucketTable;
use crate::Result;

/// A flag's kind and its package-relative index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlagReadContext {
    pub flag_type: StoredFlagType,
    /// Offset from the owning package's boolean start index.
    pub flag_index: u16,
}

/// Looks up `flag` within the package identified by `package_id`.
///
/// Returns `Ok(None)` when the package has no such flag, including when the
/// same name exists only under another package.
///
/// # Validation
///
/// The same header, bucket and chain checks as a package lookup, plus the
/// stored flag type must be a known tag.
///
/// # Errors
///
/// `UnsupportedVersion`, `TruncatedFile` or `MalformedIndex` on a file that
/// fails validation.
pub fn find_flag_read_context(
    buf: &[u8],
    package_id: u32,
    flag: &str,
) -> Result<Option<FlagReadContext>> {
    let table = BucketTable::read(buf, StorageFileType::FlagMap)?;
    if table.num_buckets == 0 {
        return Ok(None);
    }

    let bucket = flag_bucket_index(package_id, flag, table.num_buckets);
    let Some(mut offset) = table.bucket_head(bucket)? else {
        return Ok(None);
    };

    for _ in 0..table.max_chain_len {
        let mut node = table.node(offset)?;
        let short = || table.malformed(format!("flag node at {offset} is truncated"));
        let node_package_id = node.read_u32().ok_or_else(short)?;
        let name = node.read_str_bytes().ok_or_else(short)?;
        let flag_type = node.read_u16().ok_or_else(short)?;
        let flag_index = node.read_u16().ok_or_else(short)?;
        let next_offset = node.read_u32().ok_or_else(short)?;

        if node_package_id == package_id && name == flag.as_bytes() {
            return Ok(Some(FlagReadContext {
                flag_type: StoredFlagType::try_from(flag_type)?,
                flag_index,
            }));
        }
        if next_offset == 0 {
            return Ok(None);
        }
        offset = next_offset;
    }

    Err(table.chain_too_long())
}
