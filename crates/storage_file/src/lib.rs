//! # Storage File — flag storage on-disk format
//!
//! Immutable, read-only files that hold a container's feature flags. A
//! container publishes four files; a new generation is always written to new
//! files and swapped in, never edited in place.
//!
//! ## File kinds (v1)
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ PACKAGE MAP  package name -> (package id, start index)     │
//! │ FLAG MAP     (package id, flag name) -> (type, flag index) │
//! │ FLAG VALUE   global index -> boolean byte                  │
//! │ FLAG INFO    global index -> attribute byte                │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The global index of a flag is its package's start index plus its
//! package-relative flag index. Only the value and info files are addressed
//! by global index.
//!
//! Every file opens with the same prefix:
//!
//! ```text
//! version (u32 LE) | container (u32 len + bytes) | file_type (u8) | file_size (u32 LE)
//! ```
//!
//! Package and flag maps are open hash tables. A bucket array of u32 node
//! offsets follows the header; nodes chain through in-file `next_offset`
//! fields, so the table is valid wherever the file is mapped. All integers
//! are little-endian.

mod error;
mod flag_info;
mod flag_table;
mod flag_value;
mod format;
mod list;
mod package_table;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod writer;

pub use error::{Result, StorageError};
pub use flag_info::{FlagInfoHeader, FlagInfoList, FlagInfoNode};
pub use flag_table::{FlagTable, FlagTableHeader, FlagTableNode};
pub use flag_value::{FlagValueHeader, FlagValueList};
pub use format::{
    flag_bucket_index, get_table_size, package_bucket_index, read_file_version, ByteCursor,
    FlagInfoBit, HeaderPrefix, StorageFileType, StoredFlagType, FILE_VERSION, VERSION_BYTES,
};
pub use list::{list_flags, FlagSummary};
pub use package_table::{PackageTable, PackageTableHeader, PackageTableNode};
pub use writer::{create_flag_info, read_file_to_bytes, write_storage_file};
