//! Resolving a container name to its storage files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storage_file::{StorageError, StorageFileType};
use thiserror::Error;
use tracing::debug;

use crate::mapped_file::MappedStorageFile;
use crate::Result;

/// Where one container's storage files live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFileRecord {
    pub version: u32,
    pub container: String,
    pub package_map: PathBuf,
    pub flag_map: PathBuf,
    pub flag_val: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_info: Option<PathBuf>,
    /// Seconds since the epoch when the files were published.
    #[serde(default)]
    pub timestamp: u64,
}

impl StorageFileRecord {
    /// Path of the file of kind `file_type`, if the record lists one.
    pub fn path(&self, file_type: StorageFileType) -> Option<&Path> {
        match file_type {
            StorageFileType::PackageMap => Some(&self.package_map),
            StorageFileType::FlagMap => Some(&self.flag_map),
            StorageFileType::FlagVal => Some(&self.flag_val),
            StorageFileType::FlagInfo => self.flag_info.as_deref(),
        }
    }
}

/// Finds the storage files published for a container.
pub trait StorageLocator {
    fn locate(&self, container: &str) -> Option<StorageFileRecord>;
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("failed to read storage records {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse storage records: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A set of storage file records, usually loaded from a JSON file.
///
/// ```json
/// { "files": [ { "version": 1, "container": "system", "package_map": "...", ... } ] }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecords {
    pub files: Vec<StorageFileRecord>,
}

impl StorageRecords {
    pub fn new(files: Vec<StorageFileRecord>) -> Self {
        Self { files }
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, LocatorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, LocatorError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LocatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records = Self::from_json(&json)?;
        debug!(path = %path.display(), containers = records.files.len(), "loaded storage records");
        Ok(records)
    }

    pub fn to_json(&self) -> std::result::Result<String, LocatorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl StorageLocator for StorageRecords {
    fn locate(&self, container: &str) -> Option<StorageFileRecord> {
        self.files.iter().find(|r| r.container == container).cloned()
    }
}

impl<L: StorageLocator + ?Sized> StorageLocator for &L {
    fn locate(&self, container: &str) -> Option<StorageFileRecord> {
        (**self).locate(container)
    }
}

/// Maps one file of `container`.
///
/// Fails with `ContainerNotFound` for an unknown container and with
/// `FileNotFound` when the record does not list a file of that kind.
pub fn map_storage_file(
    locator: &impl StorageLocator,
    container: &str,
    file_type: StorageFileType,
) -> Result<MappedStorageFile> {
    let record = locator
        .locate(container)
        .ok_or_else(|| StorageError::ContainerNotFound(container.to_string()))?;
    let path = record.path(file_type).ok_or_else(|| {
        StorageError::FileNotFound(format!("container {container} has no {file_type} file"))
    })?;
    MappedStorageFile::open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(container: &str, flag_info: Option<&str>) -> StorageFileRecord {
        StorageFileRecord {
            version: 1,
            container: container.to_string(),
            package_map: PathBuf::from(format!("/maps/{container}.package.map")),
            flag_map: PathBuf::from(format!("/maps/{container}.flag.map")),
            flag_val: PathBuf::from(format!("/boot/{container}.val")),
            flag_info: flag_info.map(PathBuf::from),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn locates_by_container_name() {
        let records = StorageRecords::new(vec![record("system", None), record("vendor", None)]);
        assert_eq!(records.locate("vendor").unwrap().container, "vendor");
        assert!(records.locate("product").is_none());
    }

    #[test]
    fn parses_json_without_optional_fields() {
        let json = r#"{
            "files": [{
                "version": 1,
                "container": "system",
                "package_map": "/maps/system.package.map",
                "flag_map": "/maps/system.flag.map",
                "flag_val": "/boot/system.val"
            }]
        }"#;
        let records = StorageRecords::from_json(json).unwrap();
        let system = records.locate("system").unwrap();
        assert_eq!(system.flag_info, None);
        assert_eq!(system.timestamp, 0);
        assert_eq!(system.path(StorageFileType::FlagVal), Some(Path::new("/boot/system.val")));
        assert_eq!(system.path(StorageFileType::FlagInfo), None);
    }

    #[test]
    fn json_survives_a_write_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let records = StorageRecords::new(vec![record("system", Some("/boot/system.info"))]);
        std::fs::write(&path, records.to_json().unwrap()).unwrap();
        assert_eq!(StorageRecords::load(&path).unwrap(), records);
    }

    #[test]
    fn load_reports_io_and_parse_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = StorageRecords::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, LocatorError::Io { .. }), "{missing}");

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let bad = StorageRecords::load(&path).unwrap_err();
        assert!(matches!(bad, LocatorError::Parse(_)), "{bad}");
    }

    #[test]
    fn map_storage_file_reports_missing_pieces() {
        let records = StorageRecords::new(vec![record("system", None)]);

        let err = map_storage_file(&records, "vendor", StorageFileType::PackageMap).unwrap_err();
        assert!(matches!(err, StorageError::ContainerNotFound(ref c) if c == "vendor"));

        let err = map_storage_file(&records, "system", StorageFileType::FlagInfo).unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound(_)), "{err}");

        let err = map_storage_file(&records, "system", StorageFileType::PackageMap).unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound(_)), "{err}");
    }
}
