use storage_file::{read_file_version, ByteCursor, StorageError, StorageFileType, FILE_VERSION};

use crate::Result;

/// Rejects any version other than the one this crate understands.
pub(crate) fn check_version(version: u32) -> Result<()> {
    if version == FILE_VERSION {
        Ok(())
    } else {
        Err(StorageError::UnsupportedVersion {
            found: version,
            expected: FILE_VERSION,
        })
    }
}

/// The common header of a storage file, borrowed from its bytes.
pub(crate) struct FileHeader<'a> {
    /// Declared file size, already checked against the byte slice.
    pub file_size: usize,
    /// Positioned at the first kind-specific header field.
    pub fields: ByteCursor<'a>,
}

impl<'a> FileHeader<'a> {
    /// Validates version, file type and declared size without allocating.
    pub fn read(buf: &'a [u8], expected: StorageFileType) -> Result<Self> {
        check_version(read_file_version(buf)?)?;

        let mut cursor = ByteCursor::at(buf, storage_file::VERSION_BYTES);
        let truncated = || StorageError::TruncatedFile(format!("{expected} header is incomplete"));
        cursor.read_str_bytes().ok_or_else(truncated)?;
        let file_type = cursor.read_u8().ok_or_else(truncated)?;
        let file_size = cursor.read_u32().ok_or_else(truncated)? as usize;

        if StorageFileType::try_from(file_type)? != expected {
            return Err(StorageError::MalformedIndex(format!(
                "expected a {expected} file, found file type tag {file_type}"
            )));
        }
        if file_size > buf.len() {
            return Err(StorageError::TruncatedFile(format!(
                "{expected} declares {file_size} bytes but only {} are mapped",
                buf.len()
            )));
        }

        Ok(Self {
            file_size,
            fields: cursor,
        })
    }

    /// Reads the next u32 header field.
    pub fn next_field(&mut self, name: &str) -> Result<u32> {
        self.fields
            .read_u32()
            .ok_or_else(|| StorageError::TruncatedFile(format!("header field {name} is missing")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_file::test_utils::{create_test_flag_value_list, create_test_package_table};

    #[test]
    fn accepts_current_version() {
        let bytes = create_test_package_table().into_bytes();
        let mut header = FileHeader::read(&bytes, StorageFileType::PackageMap).unwrap();
        assert_eq!(header.file_size, bytes.len());
        assert_eq!(header.next_field("num_packages").unwrap(), 3);
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = create_test_package_table().into_bytes();
        bytes[..4].copy_from_slice(&2u32.to_le_bytes());
        let err = FileHeader::read(&bytes, StorageFileType::PackageMap).err().unwrap();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 2, expected: 1 }
        ));
    }

    #[test]
    fn rejects_wrong_kind() {
        let bytes = create_test_flag_value_list().into_bytes();
        let err = FileHeader::read(&bytes, StorageFileType::PackageMap).err().unwrap();
        assert!(matches!(err, StorageError::MalformedIndex(_)));
    }

    #[test]
    fn rejects_short_files() {
        let bytes = create_test_package_table().into_bytes();
        for len in [0, 3, 4, 9, 20] {
            let err = FileHeader::read(&bytes[..len], StorageFileType::PackageMap).err().unwrap();
            assert!(matches!(err, StorageError::TruncatedFile(_)), "len {len}: {err}");
        }
    }
}
