//! Fixture tables for a three-package `system` container.
//!
//! | package | id | start | flags (index)                                       |
//! |---------|----|-------|-----------------------------------------------------|
//! | pkg1    | 0  | 0     | disabled_rw (0), enabled_ro (1), enabled_rw (2)     |
//! | pkg2    | 1  | 3     | disabled_ro (0), enabled_fixed_ro (1), enabled_ro (2) |
//! | pkg3    | 2  | 6     | enabled_fixed_ro (0), enabled_ro (1)                |

use crate::{
    FlagInfoList, FlagInfoNode, FlagTable, FlagTableNode, FlagValueList, PackageTable,
    PackageTableNode, StoredFlagType,
};

pub const TEST_CONTAINER: &str = "system";

/// Boolean values by global index.
pub const TEST_FLAG_VALUES: [bool; 8] = [false, true, true, false, true, true, true, true];

/// Read-write bit by global index.
pub const TEST_FLAG_IS_RW: [bool; 8] = [true, false, true, false, false, false, false, false];

pub fn create_test_package_table() -> PackageTable {
    PackageTable::new(
        TEST_CONTAINER,
        vec![
            PackageTableNode::new("pkg1", 0, 0),
            PackageTableNode::new("pkg2", 1, 3),
            PackageTableNode::new("pkg3", 2, 6),
        ],
    )
    .expect("fixture package table is valid")
}

/// `(package_id, flag_name, flag_type, flag_index)` for every fixture flag.
pub fn test_flags() -> Vec<(u32, &'static str, StoredFlagType, u16)> {
    use StoredFlagType::*;
    vec![
        (0, "disabled_rw", ReadWriteBoolean, 0),
        (0, "enabled_ro", ReadOnlyBoolean, 1),
        (0, "enabled_rw", ReadWriteBoolean, 2),
        (1, "disabled_ro", ReadOnlyBoolean, 0),
        (1, "enabled_fixed_ro", FixedReadOnlyBoolean, 1),
        (1, "enabled_ro", ReadOnlyBoolean, 2),
        (2, "enabled_fixed_ro", FixedReadOnlyBoolean, 0),
        (2, "enabled_ro", ReadOnlyBoolean, 1),
    ]
}

pub fn create_test_flag_table() -> FlagTable {
    let nodes = test_flags()
        .into_iter()
        .map(|(id, name, ty, index)| FlagTableNode::new(id, name, ty, index))
        .collect();
    FlagTable::new(TEST_CONTAINER, nodes).expect("fixture flag table is valid")
}

pub fn create_test_flag_value_list() -> FlagValueList {
    FlagValueList::new(TEST_CONTAINER, TEST_FLAG_VALUES.to_vec())
}

pub fn create_test_flag_info_list() -> FlagInfoList {
    FlagInfoList::new(
        TEST_CONTAINER,
        TEST_FLAG_IS_RW.iter().map(|&rw| FlagInfoNode::create(rw)).collect(),
    )
}
