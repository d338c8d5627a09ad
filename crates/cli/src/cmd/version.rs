//! `flagstore version` -- Print a storage file's format version.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct VersionArgs {
    /// Path to any storage file
    file: PathBuf,
}

pub fn run(args: VersionArgs) -> Result<()> {
    let version = storage_read_api::get_storage_file_version(&args.file)
        .with_context(|| format!("failed to read version of {}", args.file.display()))?;
    println!("{version}");
    Ok(())
}
