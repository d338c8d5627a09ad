//! Read-only memory mapping of a single storage file.

use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use storage_file::StorageError;
use tracing::debug;

use crate::Result;

/// A storage file mapped read-only into the process.
///
/// The mapping lives as long as this value; queries borrow the bytes and
/// never copy them.
#[derive(Debug)]
pub struct MappedStorageFile {
    path: PathBuf,
    mmap: Mmap,
}

impl MappedStorageFile {
    /// Maps the file at `path`.
    ///
    /// # Validation
    ///
    /// - The file's permissions must not allow writing.
    /// - The file must not be empty.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` when the file cannot be opened, and `MapFailed`
    /// when it is writable, empty, or the mapping itself fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| StorageError::FileNotFound(format!("{}: {e}", path.display())))?;

        let metadata = file
            .metadata()
            .map_err(|e| StorageError::MapFailed(format!("{}: {e}", path.display())))?;
        if !metadata.permissions().readonly() {
            return Err(StorageError::MapFailed(format!(
                "{} is writable; only read-only storage files are mapped",
                path.display()
            )));
        }
        let len = metadata.len();
        if len == 0 {
            return Err(StorageError::MapFailed(format!(
                "{} is empty",
                path.display()
            )));
        }

        // SAFETY: Mmap::map is unsafe because the underlying file could be
        // changed by another process while mapped. This is sound here because:
        // 1. The file's permissions were checked above to be read-only, and a
        //    new generation is written to a new file and renamed into place
        // 2. The mapping is read-only, so this process never writes through it
        // 3. The mmap lifetime is tied to MappedStorageFile, preventing use-after-unmap
        // 4. Every offset read from the bytes is range-checked before use
        let mmap = unsafe {
            Mmap::map(&file)
                .map_err(|e| StorageError::MapFailed(format!("{}: {e}", path.display())))?
        };

        debug!(path = %path.display(), len, "mapped storage file");
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for MappedStorageFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.mmap
    }
}

impl AsRef<[u8]> for MappedStorageFile {
    fn as_ref(&self) -> &[u8] {
        &self.mmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_file::test_utils::create_test_package_table;
    use storage_file::write_storage_file;
    use tempfile::TempDir;

    #[test]
    fn maps_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.map");
        let bytes = create_test_package_table().into_bytes();
        write_storage_file(&path, &bytes).unwrap();

        let mapped = MappedStorageFile::open(&path).unwrap();
        assert_eq!(mapped.bytes(), &bytes[..]);
        assert_eq!(mapped.len(), bytes.len());
        assert!(!mapped.is_empty());
        assert_eq!(mapped.path(), path);
        assert_eq!(&mapped[..4], &1u32.to_le_bytes());
    }

    #[test]
    fn writable_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.map");
        std::fs::write(&path, create_test_package_table().into_bytes()).unwrap();

        let err = MappedStorageFile::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::MapFailed(_)), "{err}");
        assert!(err.to_string().contains("writable"), "{err}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = MappedStorageFile::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound(_)), "{err}");
    }

    #[test]
    fn empty_file_cannot_be_mapped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        write_storage_file(&path, b"").unwrap();
        let err = MappedStorageFile::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::MapFailed(_)), "{err}");
        assert!(err.to_string().contains("empty"), "{err}");
    }
}
