use anyhow::{bail, Context, Result};
use std::fs::{self, rename, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::{FlagInfoList, FlagInfoNode, FlagTable, PackageTable, StoredFlagType};

/// Publishes `bytes` as a read-only storage file at `path`.
///
/// The bytes go to `<path>.tmp` first, are fsynced and made read-only, and the
/// temp file is then atomically renamed over `path`. Readers that map `path`
/// see either the previous file or the complete new one, never a partial write.
///
/// # Errors
///
/// Returns an error if the temp file cannot be created, written or renamed.
pub fn write_storage_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);
    if tmp_path.exists() {
        // a leftover from an interrupted publish is read-only
        fs::remove_file(tmp_path)
            .with_context(|| format!("failed to remove stale {}", tmp_path.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;
    let mut permissions = file.metadata()?.permissions();
    permissions.set_readonly(true);
    file.set_permissions(permissions)
        .with_context(|| format!("failed to make {} read-only", tmp_path.display()))?;

    rename(tmp_path, path)
        .with_context(|| format!("failed to move storage file into place at {}", path.display()))?;
    debug!(path = %path.display(), len = bytes.len(), "wrote storage file");
    Ok(())
}

/// Reads a whole storage file into memory.
pub fn read_file_to_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Derives a flag info file from a package map and a flag map.
///
/// Each flag's read-write bit mirrors its stored type; sticky and override
/// bits start cleared.
///
/// # Errors
///
/// Returns an error if either input cannot be decoded, the two disagree on
/// the container, or a flag's global index falls outside the flag count.
pub fn create_flag_info(package_map: &Path, flag_map: &Path, flag_info_out: &Path) -> Result<()> {
    let package_table = PackageTable::from_bytes(&read_file_to_bytes(package_map)?)?;
    let flag_table = FlagTable::from_bytes(&read_file_to_bytes(flag_map)?)?;

    if package_table.header.prefix.container != flag_table.header.prefix.container {
        bail!(
            "container for package map {} and flag map {} does not match",
            package_table.header.prefix.container,
            flag_table.header.prefix.container,
        );
    }

    let mut package_offsets = vec![None; package_table.header.num_packages as usize];
    for node in &package_table.nodes {
        let slot = package_offsets
            .get_mut(node.package_id as usize)
            .with_context(|| format!("package id {} out of range", node.package_id))?;
        *slot = Some(node.boolean_start_index);
    }

    let mut is_flag_rw = vec![false; flag_table.header.num_flags as usize];
    for node in &flag_table.nodes {
        let start = package_offsets
            .get(node.package_id as usize)
            .copied()
            .flatten()
            .with_context(|| {
                format!("flag {} refers to unknown package {}", node.flag_name, node.package_id)
            })?;
        let index = start
            .checked_add(u32::from(node.flag_index))
            .with_context(|| {
                format!("flag {} global index overflows past start {start}", node.flag_name)
            })? as usize;
        let slot = is_flag_rw
            .get_mut(index)
            .with_context(|| format!("flag {} has global index {index} past the end", node.flag_name))?;
        *slot = node.flag_type == StoredFlagType::ReadWriteBoolean;
    }

    let list = FlagInfoList::new(
        &flag_table.header.prefix.container,
        is_flag_rw.into_iter().map(FlagInfoNode::create).collect(),
    );
    write_storage_file(flag_info_out, &list.into_bytes())
}
