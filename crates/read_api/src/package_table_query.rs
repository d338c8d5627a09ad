//! Package map lookups.

use storage_file::{package_bucket_index, StorageFileType};

use crate::table::BucketTable;
use crate::Result;

/// Where a package's flags live in the value and info files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PackageReadContext {
    pub package_id: u32,
    /// Global index of the package's first flag.
    pub boolean_start_index: u32,
}

/// Looks up `package` in a package map.
///
/// Returns `Ok(None)` when the package is not in the file.
///
/// # Validation
///
/// - The version, file type tag and declared size are checked first.
/// - The bucket array must lie between the header and the end of the file.
/// - Every bucket head and `next_offset` must point into the node region.
/// - A chain may visit no more nodes than the table holds or the file fits.
///
/// # Errors
///
/// `UnsupportedVersion`, `TruncatedFile` or `MalformedIndex` when the file
/// fails any of the checks above.
pub fn find_package_read_context(buf: &[u8], package: &str) -> Result<Option<PackageReadContext>> {
    let table = BucketTable::read(buf, StorageFileType::PackageMap)?;
    if table.num_buckets == 0 {
        return Ok(None);
    }

    let bucket = package_bucket_index(package, table.num_buckets);
    let Some(mut offset) = table.bucket_head(bucket)? else {
        return Ok(None);
    };

    for _ in 0..table.max_chain_len {
        let mut node = table.node(offset)?;
        let short = || table.malformed(format!("package node at {offset} is truncated"));
        let name = node.read_str_bytes().ok_or_else(short)?;
        let package_id = node.read_u32().ok_or_else(short)?;
        let boolean_start_index = node.read_u32().ok_or_else(short)?;
        let next_offset = node.read_u32().ok_or_else(short)?;

        if name == package.as_bytes() {
            return Ok(Some(PackageReadContext {
                package_id,
                boolean_start_index,
            }));
        }
        if next_offset == 0 {
            return Ok(None);
        }
        offset = next_offset;
    }

    Err(table.chain_too_long())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_file::test_utils::create_test_package_table;
    use storage_file::{PackageTable, PackageTableNode, StorageError};

    #[test]
    fn finds_every_package() {
        let bytes = create_test_package_table().into_bytes();
        let expected = [("pkg1", 0, 0), ("pkg2", 1, 3), ("pkg3", 2, 6)];
        for (name, package_id, boolean_start_index) in expected {
            let ctx = find_package_read_context(&bytes, name).unwrap().unwrap();
            assert_eq!(
                ctx,
                PackageReadContext {
                    package_id,
                    boolean_start_index
                }
            );
        }
    }

    #[test]
    fn lookup_is_repeatable() {
        let bytes = create_test_package_table().into_bytes();
        let first = find_package_read_context(&bytes, "pkg2").unwrap();
        for _ in 0..10 {
            assert_eq!(find_package_read_context(&bytes, "pkg2").unwrap(), first);
        }
    }

    #[test]
    fn unknown_package_is_none() {
        let bytes = create_test_package_table().into_bytes();
        assert_eq!(find_package_read_context(&bytes, "pkg4").unwrap(), None);
        assert_eq!(find_package_read_context(&bytes, "").unwrap(), None);
        assert_eq!(find_package_read_context(&bytes, "pkg").unwrap(), None);
    }

    #[test]
    fn empty_table_finds_nothing() {
        let bytes = PackageTable::new("system", vec![]).unwrap().into_bytes();
        assert_eq!(find_package_read_context(&bytes, "pkg1").unwrap(), None);
    }

    #[test]
    fn large_table_resolves_through_chains() {
        let nodes = (0..500)
            .map(|i| PackageTableNode::new(format!("com.example.p{i}"), i, i * 4))
            .collect();
        let bytes = PackageTable::new("system", nodes).unwrap().into_bytes();
        for i in 0..500 {
            let ctx = find_package_read_context(&bytes, &format!("com.example.p{i}"))
                .unwrap()
                .unwrap();
            assert_eq!(ctx.package_id, i);
            assert_eq!(ctx.boolean_start_index, i * 4);
        }
    }

    #[test]
    fn bucket_pointing_outside_file_is_malformed() {
        let table = create_test_package_table();
        let mut bytes = table.into_bytes();
        let bucket = package_bucket_index("pkg2", table.header.num_buckets().unwrap());
        let pos = table.header.bucket_offset as usize + bucket as usize * 4;
        bytes[pos..pos + 4].copy_from_slice(&0xffff_u32.to_le_bytes());

        let err = find_package_read_context(&bytes, "pkg2").unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)), "{err}");
    }

    #[test]
    fn bucket_pointing_into_header_is_malformed() {
        let table = create_test_package_table();
        let mut bytes = table.into_bytes();
        let bucket = package_bucket_index("pkg1", table.header.num_buckets().unwrap());
        let pos = table.header.bucket_offset as usize + bucket as usize * 4;
        bytes[pos..pos + 4].copy_from_slice(&4u32.to_le_bytes());

        let err = find_package_read_context(&bytes, "pkg1").unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)), "{err}");
    }

    #[test]
    fn cyclic_chain_is_malformed() {
        let table = create_test_package_table();
        let mut bytes = table.into_bytes();
        let num_buckets = table.header.num_buckets().unwrap();
        let bucket = package_bucket_index("missing", num_buckets);

        // Point the bucket at the first node and make that node link to itself.
        let first = table.header.node_offset;
        let pos = table.header.bucket_offset as usize + bucket as usize * 4;
        bytes[pos..pos + 4].copy_from_slice(&first.to_le_bytes());
        let node = &table.nodes[0];
        let next_pos = first as usize + 4 + node.package_name.len() + 8;
        bytes[next_pos..next_pos + 4].copy_from_slice(&first.to_le_bytes());

        let err = find_package_read_context(&bytes, "missing").unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)), "{err}");
    }

    #[test]
    fn inflated_entry_count_still_stops_a_cycle() {
        let table = create_test_package_table();
        let mut bytes = table.into_bytes();
        let num_buckets = table.header.num_buckets().unwrap();

        // num_packages is the first field after the common prefix
        let count_pos = table.header.bucket_offset as usize - 12;
        bytes[count_pos..count_pos + 4].copy_from_slice(&u32::MAX.to_le_bytes());

        let first = table.header.node_offset;
        let bucket = package_bucket_index("missing", num_buckets);
        let pos = table.header.bucket_offset as usize + bucket as usize * 4;
        bytes[pos..pos + 4].copy_from_slice(&first.to_le_bytes());
        let next_pos = first as usize + 4 + table.nodes[0].package_name.len() + 8;
        bytes[next_pos..next_pos + 4].copy_from_slice(&first.to_le_bytes());

        let err = find_package_read_context(&bytes, "missing").unwrap_err();
        assert!(matches!(err, StorageError::MalformedIndex(_)), "{err}");
        // three nodes of at least 16 bytes each
        assert!(err.to_string().contains("the 3 nodes"), "{err}");
    }

    #[test]
    fn truncated_node_region_is_reported() {
        let bytes = create_test_package_table().into_bytes();
        let err = find_package_read_context(&bytes[..bytes.len() - 3], "pkg1").unwrap_err();
        assert!(matches!(err, StorageError::TruncatedFile(_)), "{err}");
    }
}
