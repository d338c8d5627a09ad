//! `flagstore print` -- Decode and print one storage file.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use storage_file::{
    read_file_to_bytes, FlagInfoList, FlagTable, FlagValueList, HeaderPrefix, PackageTable,
    StorageFileType,
};
use storage_read_api::FlagAttributes;

#[derive(Args)]
pub struct PrintArgs {
    /// Path to the storage file
    #[arg(long)]
    file: PathBuf,
    /// Kind of file: package_map, flag_map, flag_val or flag_info
    #[arg(long = "type", value_parser = super::parse_file_type)]
    file_type: StorageFileType,
}

fn print_prefix(prefix: &HeaderPrefix, file_type: StorageFileType) {
    println!(
        "{file_type} v{} container: {} size: {}",
        prefix.version, prefix.container, prefix.file_size
    );
}

pub fn run(args: PrintArgs) -> Result<()> {
    let bytes = read_file_to_bytes(&args.file)?;
    match args.file_type {
        StorageFileType::PackageMap => {
            let table = PackageTable::from_bytes(&bytes)?;
            print_prefix(&table.header.prefix, args.file_type);
            for node in &table.nodes {
                println!("{node}");
            }
        }
        StorageFileType::FlagMap => {
            let table = FlagTable::from_bytes(&bytes)?;
            print_prefix(&table.header.prefix, args.file_type);
            for node in &table.nodes {
                println!("{node}");
            }
        }
        StorageFileType::FlagVal => {
            let list = FlagValueList::from_bytes(&bytes)?;
            print_prefix(&list.header.prefix, args.file_type);
            for (index, value) in list.booleans.iter().enumerate() {
                println!("{index}: {value}");
            }
        }
        StorageFileType::FlagInfo => {
            let list = FlagInfoList::from_bytes(&bytes)?;
            print_prefix(&list.header.prefix, args.file_type);
            for (index, node) in list.nodes.iter().enumerate() {
                println!("{index}: {}", FlagAttributes(node.attributes));
            }
        }
    }
    Ok(())
}
