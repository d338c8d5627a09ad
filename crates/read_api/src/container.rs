//! All storage files of one container, mapped together.

use storage_file::{read_file_version, StorageError, StorageFileType};
use tracing::debug;

use crate::flag_info_query::{find_boolean_flag_attribute, FlagAttributes};
use crate::flag_table_query::{find_flag_read_context, FlagReadContext};
use crate::flag_value_query::find_boolean_flag_value;
use crate::header::check_version;
use crate::locator::{StorageFileRecord, StorageLocator};
use crate::mapped_file::MappedStorageFile;
use crate::package_table_query::{find_package_read_context, PackageReadContext};
use crate::Result;

/// A snapshot of one generation of a container's storage files.
///
/// Republishing the container does not affect an open handle; re-open through
/// the locator to observe new files.
#[derive(Debug)]
pub struct ContainerStorage {
    record: StorageFileRecord,
    package_map: MappedStorageFile,
    flag_map: MappedStorageFile,
    flag_val: MappedStorageFile,
    flag_info: Option<MappedStorageFile>,
}

impl ContainerStorage {
    /// Maps every file the locator lists for `container` and checks their versions.
    ///
    /// # Errors
    ///
    /// - `ContainerNotFound` when the locator has no record for `container`.
    /// - Any [`MappedStorageFile::open`] error for a listed file.
    /// - `TruncatedFile` or `UnsupportedVersion` when a file's version cannot be
    ///   read or is not the current one.
    pub fn open(locator: &impl StorageLocator, container: &str) -> Result<Self> {
        let record = locator
            .locate(container)
            .ok_or_else(|| StorageError::ContainerNotFound(container.to_string()))?;

        let package_map = map_checked(&record.package_map)?;
        let flag_map = map_checked(&record.flag_map)?;
        let flag_val = map_checked(&record.flag_val)?;
        let flag_info = record.flag_info.as_deref().map(map_checked).transpose()?;

        debug!(
            container,
            version = record.version,
            flag_info = flag_info.is_some(),
            "opened container storage"
        );
        Ok(Self {
            record,
            package_map,
            flag_map,
            flag_val,
            flag_info,
        })
    }

    pub fn container(&self) -> &str {
        &self.record.container
    }

    pub fn record(&self) -> &StorageFileRecord {
        &self.record
    }

    pub fn file(&self, file_type: StorageFileType) -> Option<&MappedStorageFile> {
        match file_type {
            StorageFileType::PackageMap => Some(&self.package_map),
            StorageFileType::FlagMap => Some(&self.flag_map),
            StorageFileType::FlagVal => Some(&self.flag_val),
            StorageFileType::FlagInfo => self.flag_info.as_ref(),
        }
    }

    pub fn package_context(&self, package: &str) -> Result<Option<PackageReadContext>> {
        find_package_read_context(&self.package_map, package)
    }

    pub fn flag_context(&self, package_id: u32, flag: &str) -> Result<Option<FlagReadContext>> {
        find_flag_read_context(&self.flag_map, package_id, flag)
    }

    pub fn boolean_flag_value(&self, index: u32) -> Result<bool> {
        find_boolean_flag_value(&self.flag_val, index)
    }

    /// # Errors
    ///
    /// Returns `FileNotFound` when the container publishes no flag info file.
    pub fn boolean_flag_attribute(&self, index: u32) -> Result<u8> {
        let flag_info = self.flag_info.as_ref().ok_or_else(|| {
            StorageError::FileNotFound(format!(
                "container {} has no flag_info file",
                self.record.container
            ))
        })?;
        find_boolean_flag_attribute(flag_info, index)
    }

    /// Global index of `package`/`flag`, or `None` if either is absent.
    ///
    /// # Errors
    ///
    /// Returns `OffsetOutOfRange` when the package start plus the flag index
    /// does not fit in a `u32`, and any error from the two map lookups.
    pub fn flag_index(&self, package: &str, flag: &str) -> Result<Option<u32>> {
        let Some(package_ctx) = self.package_context(package)? else {
            return Ok(None);
        };
        let Some(flag_ctx) = self.flag_context(package_ctx.package_id, flag)? else {
            return Ok(None);
        };
        package_ctx
            .boolean_start_index
            .checked_add(u32::from(flag_ctx.flag_index))
            .map(Some)
            .ok_or_else(|| {
                StorageError::OffsetOutOfRange(format!(
                    "{package}/{flag}: flag index {} overflows past start index {}",
                    flag_ctx.flag_index, package_ctx.boolean_start_index
                ))
            })
    }

    /// Resolves `package`/`flag` and reads its value.
    pub fn flag_value(&self, package: &str, flag: &str) -> Result<Option<bool>> {
        self.flag_index(package, flag)?
            .map(|index| self.boolean_flag_value(index))
            .transpose()
    }

    /// Resolves `package`/`flag` and reads its attributes.
    pub fn flag_attribute(&self, package: &str, flag: &str) -> Result<Option<FlagAttributes>> {
        self.flag_index(package, flag)?
            .map(|index| self.boolean_flag_attribute(index).map(FlagAttributes))
            .transpose()
    }
}

fn map_checked(path: &std::path::Path) -> Result<MappedStorageFile> {
    let file = MappedStorageFile::open(path)?;
    check_version(read_file_version(&file)?)?;
    Ok(file)
}
