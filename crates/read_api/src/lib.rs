//! # Storage Read API
//!
//! Queries over the flag storage files described in [`storage_file`]. Every
//! query takes the raw file bytes, usually a [`MappedStorageFile`], and works
//! on them in place:
//!
//! ```text
//! package name ──► package map ──► (package id, start index)
//!                                        │
//! (package id, flag name) ──► flag map ──► flag index
//!                                        │
//!              start index + flag index ──► flag value / flag info
//! ```
//!
//! Package and flag lookups return `Ok(None)` for names that are not in the
//! file. Errors are reserved for files that cannot be read or trusted.
//!
//! [`ContainerStorage`] bundles the four lookups for one container resolved
//! through a [`StorageLocator`].

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

mod container;
mod flag_info_query;
mod flag_table_query;
mod flag_value_query;
mod header;
mod locator;
mod mapped_file;
mod package_table_query;
mod table;

pub use container::ContainerStorage;
pub use flag_info_query::FlagAttributes;
pub use flag_table_query::FlagReadContext;
pub use locator::{
    map_storage_file, LocatorError, StorageFileRecord, StorageLocator, StorageRecords,
};
pub use mapped_file::MappedStorageFile;
pub use package_table_query::PackageReadContext;
pub use storage_file::{
    read_file_version, FlagInfoBit, Result, StorageError, StorageFileType, StoredFlagType,
    FILE_VERSION,
};

/// Reads and checks the version of the storage file at `path` without mapping it.
pub fn get_storage_file_version(path: impl AsRef<Path>) -> Result<u32> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|e| StorageError::FileNotFound(format!("{}: {e}", path.display())))?;
    let version = file.read_u32::<LittleEndian>().map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            StorageError::TruncatedFile(format!("{} is shorter than its version field", path.display()))
        }
        _ => StorageError::FileNotFound(format!("{}: {e}", path.display())),
    })?;
    header::check_version(version)?;
    Ok(version)
}

/// Looks up `package` in package map bytes.
pub fn get_package_read_context(buf: &[u8], package: &str) -> Result<Option<PackageReadContext>> {
    package_table_query::find_package_read_context(buf, package)
}

/// Looks up `flag` under `package_id` in flag map bytes.
pub fn get_flag_read_context(
    buf: &[u8],
    package_id: u32,
    flag: &str,
) -> Result<Option<FlagReadContext>> {
    flag_table_query::find_flag_read_context(buf, package_id, flag)
}

/// Reads the boolean at global `index` in flag value bytes.
pub fn get_boolean_flag_value(buf: &[u8], index: u32) -> Result<bool> {
    flag_value_query::find_boolean_flag_value(buf, index)
}

/// Reads the attribute byte at global `index` in flag info bytes.
pub fn get_boolean_flag_attribute(buf: &[u8], index: u32) -> Result<u8> {
    flag_info_query::find_boolean_flag_attribute(buf, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_file::test_utils::create_test_flag_table;
    use tempfile::TempDir;

    #[test]
    fn version_of_written_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flag.map");
        std::fs::write(&path, create_test_flag_table().into_bytes()).unwrap();
        assert_eq!(get_storage_file_version(&path).unwrap(), FILE_VERSION);
    }

    #[test]
    fn version_of_short_file_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short");
        std::fs::write(&path, [1u8, 0, 0]).unwrap();
        let err = get_storage_file_version(&path).unwrap_err();
        assert!(matches!(err, StorageError::TruncatedFile(_)), "{err}");
    }

    #[test]
    fn version_of_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = get_storage_file_version(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound(_)), "{err}");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future");
        std::fs::write(&path, 2u32.to_le_bytes()).unwrap();
        let err = get_storage_file_version(&path).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 2, .. }));
    }
}
