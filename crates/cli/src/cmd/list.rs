//! `flagstore list` -- List every flag of a container.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use storage_read_api::FlagAttributes;

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    package_map: PathBuf,
    #[arg(long)]
    flag_map: PathBuf,
    #[arg(long)]
    flag_val: PathBuf,
    /// Also print each flag's attributes
    #[arg(long)]
    flag_info: Option<PathBuf>,
}

pub fn run(args: ListArgs) -> Result<()> {
    let flags = storage_file::list_flags(
        &args.package_map,
        &args.flag_map,
        &args.flag_val,
        args.flag_info.as_deref(),
    )?;
    for flag in &flags {
        match flag.attributes {
            Some(bits) => println!(
                "{}/{} {} {} [{}]",
                flag.package,
                flag.flag,
                flag.flag_type,
                flag.value,
                FlagAttributes(bits)
            ),
            None => println!(
                "{}/{} {} {}",
                flag.package, flag.flag, flag.flag_type, flag.value
            ),
        }
    }
    Ok(())
}
