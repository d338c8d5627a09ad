use anyhow::{Context, Result};
use std::path::Path;

use crate::writer::read_file_to_bytes;
use crate::{FlagInfoList, FlagTable, FlagValueList, PackageTable, StoredFlagType};

/// One resolved flag from a container's storage files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagSummary {
    pub package: String,
    pub flag: String,
    pub flag_type: StoredFlagType,
    pub value: bool,
    /// Attribute byte, present when a flag info file was supplied.
    pub attributes: Option<u8>,
}

/// Decodes the storage files of one container and lists every flag,
/// sorted by package then flag name.
///
/// # Errors
///
/// Returns an error if any file cannot be decoded, a flag names an unknown
/// package, or a flag's global index has no value (or attribute) slot.
pub fn list_flags(
    package_map: &Path,
    flag_map: &Path,
    flag_val: &Path,
    flag_info: Option<&Path>,
) -> Result<Vec<FlagSummary>> {
    let package_table = PackageTable::from_bytes(&read_file_to_bytes(package_map)?)?;
    let flag_table = FlagTable::from_bytes(&read_file_to_bytes(flag_map)?)?;
    let values = FlagValueList::from_bytes(&read_file_to_bytes(flag_val)?)?;
    let infos = flag_info
        .map(|path| -> Result<FlagInfoList> {
            Ok(FlagInfoList::from_bytes(&read_file_to_bytes(path)?)?)
        })
        .transpose()?;

    let mut packages = vec![None; package_table.header.num_packages as usize];
    for node in &package_table.nodes {
        let slot = packages
            .get_mut(node.package_id as usize)
            .with_context(|| format!("package id {} out of range", node.package_id))?;
        *slot = Some((node.package_name.as_str(), node.boolean_start_index));
    }

    let mut flags = Vec::with_capacity(flag_table.nodes.len());
    for node in &flag_table.nodes {
        let (package, start) = packages
            .get(node.package_id as usize)
            .copied()
            .flatten()
            .with_context(|| {
                format!("flag {} refers to unknown package {}", node.flag_name, node.package_id)
            })?;
        let index = start
            .checked_add(u32::from(node.flag_index))
            .with_context(|| {
                format!("{package}/{} global index overflows past start {start}", node.flag_name)
            })? as usize;
        let value = *values
            .booleans
            .get(index)
            .with_context(|| format!("no value for {package}/{}", node.flag_name))?;
        let attributes = match &infos {
            Some(list) => Some(
                list.nodes
                    .get(index)
                    .with_context(|| format!("no attributes for {package}/{}", node.flag_name))?
                    .attributes,
            ),
            None => None,
        };
        flags.push(FlagSummary {
            package: package.to_string(),
            flag: node.flag_name.clone(),
            flag_type: node.flag_type,
            value,
            attributes,
        });
    }

    flags.sort_by(|a, b| a.package.cmp(&b.package).then_with(|| a.flag.cmp(&b.flag)));
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        create_test_flag_info_list, create_test_flag_table, create_test_flag_value_list,
        create_test_package_table,
    };
    use crate::write_storage_file;
    use tempfile::tempdir;

    #[test]
    fn lists_every_flag_sorted() -> Result<()> {
        let dir = tempdir()?;
        let package_map = dir.path().join("package.map");
        let flag_map = dir.path().join("flag.map");
        let flag_val = dir.path().join("flag.val");
        write_storage_file(&package_map, &create_test_package_table().into_bytes())?;
        write_storage_file(&flag_map, &create_test_flag_table().into_bytes())?;
        write_storage_file(&flag_val, &create_test_flag_value_list().into_bytes())?;

        let flags = list_flags(&package_map, &flag_map, &flag_val, None)?;
        let got: Vec<_> = flags
            .iter()
            .map(|f| (f.package.as_str(), f.flag.as_str(), f.flag_type, f.value))
            .collect();

        use StoredFlagType::*;
        assert_eq!(
            got,
            vec![
                ("pkg1", "disabled_rw", ReadWriteBoolean, false),
                ("pkg1", "enabled_ro", ReadOnlyBoolean, true),
                ("pkg1", "enabled_rw", ReadWriteBoolean, true),
                ("pkg2", "disabled_ro", ReadOnlyBoolean, false),
                ("pkg2", "enabled_fixed_ro", FixedReadOnlyBoolean, true),
                ("pkg2", "enabled_ro", ReadOnlyBoolean, true),
                ("pkg3", "enabled_fixed_ro", FixedReadOnlyBoolean, true),
                ("pkg3", "enabled_ro", ReadOnlyBoolean, true),
            ]
        );
        assert!(flags.iter().all(|f| f.attributes.is_none()));
        Ok(())
    }

    #[test]
    fn attributes_included_with_flag_info() -> Result<()> {
        let dir = tempdir()?;
        let package_map = dir.path().join("package.map");
        let flag_map = dir.path().join("flag.map");
        let flag_val = dir.path().join("flag.val");
        let flag_info = dir.path().join("flag.info");
        write_storage_file(&package_map, &create_test_package_table().into_bytes())?;
        write_storage_file(&flag_map, &create_test_flag_table().into_bytes())?;
        write_storage_file(&flag_val, &create_test_flag_value_list().into_bytes())?;
        write_storage_file(&flag_info, &create_test_flag_info_list().into_bytes())?;

        let flags = list_flags(&package_map, &flag_map, &flag_val, Some(&flag_info))?;
        for f in &flags {
            let rw = f.attributes.unwrap() & 0b010 != 0;
            assert_eq!(rw, f.flag_type == StoredFlagType::ReadWriteBoolean, "{}", f.flag);
        }
        Ok(())
    }

    #[test]
    fn overflowing_start_index_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let package_map = dir.path().join("package.map");
        let flag_map = dir.path().join("flag.map");
        let flag_val = dir.path().join("flag.val");
        let corrupt = crate::PackageTable::new(
            "system",
            vec![
                crate::PackageTableNode::new("pkg1", 0, 0),
                crate::PackageTableNode::new("pkg2", 1, 3),
                crate::PackageTableNode::new("pkg3", 2, u32::MAX),
            ],
        )?;
        write_storage_file(&package_map, &corrupt.into_bytes())?;
        write_storage_file(&flag_map, &create_test_flag_table().into_bytes())?;
        write_storage_file(&flag_val, &create_test_flag_value_list().into_bytes())?;

        // index 0 lands past the values, index 1 overflows
        let err = list_flags(&package_map, &flag_map, &flag_val, None).unwrap_err();
        assert!(err.to_string().contains("pkg3/"), "{err}");
        Ok(())
    }
}
