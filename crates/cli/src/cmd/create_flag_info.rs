//! `flagstore create-flag-info` -- Derive a flag info file.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct CreateFlagInfoArgs {
    /// Package map of the container
    #[arg(long)]
    package_map: PathBuf,
    /// Flag map of the container
    #[arg(long)]
    flag_map: PathBuf,
    /// Where to write the flag info file
    #[arg(long)]
    out: PathBuf,
}

pub fn run(args: CreateFlagInfoArgs) -> Result<()> {
    storage_file::create_flag_info(&args.package_map, &args.flag_map, &args.out)?;
    println!("wrote {}", args.out.display());
    Ok(())
}
