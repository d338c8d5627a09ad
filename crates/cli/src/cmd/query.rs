//! `flagstore query` -- Resolve one flag of a published container.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use storage_read_api::{ContainerStorage, FlagAttributes, StorageRecords};
use tracing::debug;

const DEFAULT_RECORDS: &str = "/metadata/flagstore/storage_records.json";

#[derive(Args)]
pub struct QueryArgs {
    /// Storage records listing each container's files
    #[arg(long, env = "FLAGSTORE_RECORDS", default_value = DEFAULT_RECORDS)]
    records: PathBuf,
    #[arg(long)]
    container: String,
    #[arg(long)]
    package: String,
    #[arg(long)]
    flag: String,
}

pub fn run(args: QueryArgs) -> Result<()> {
    debug!(records = %args.records.display(), container = %args.container, "querying flag");
    let records = StorageRecords::load(&args.records)?;
    let storage = ContainerStorage::open(&records, &args.container)?;

    let index = storage
        .flag_index(&args.package, &args.flag)?
        .with_context(|| {
            format!(
                "flag {}/{} not found in container {}",
                args.package, args.flag, args.container
            )
        })?;
    let value = storage.boolean_flag_value(index)?;
    print!("{}/{}: {value}", args.package, args.flag);
    if storage.record().flag_info.is_some() {
        let attrs = FlagAttributes(storage.boolean_flag_attribute(index)?);
        print!(" [{attrs}]");
    }
    println!();
    Ok(())
}
