//! `flagstore`: inspect, list and query flag storage files.

use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cmd;

#[derive(Parser)]
#[command(name = "flagstore", version, about = "Flag storage file tool")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the format version of a storage file
    Version(cmd::version::VersionArgs),
    /// Decode and print a single storage file
    Print(cmd::print::PrintArgs),
    /// List every flag with its type and value
    List(cmd::list::ListArgs),
    /// Resolve one flag through a container's storage records
    Query(cmd::query::QueryArgs),
    /// Derive a flag info file from a package map and flag map
    CreateFlagInfo(cmd::create_flag_info::CreateFlagInfoArgs),
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Version(args) => cmd::version::run(args),
        Commands::Print(args) => cmd::print::run(args),
        Commands::List(args) => cmd::list::run(args),
        Commands::Query(args) => cmd::query::run(args),
        Commands::CreateFlagInfo(args) => cmd::create_flag_info::run(args),
    };
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
