use anyhow::Result;
use clap::Parser;

use flatconv::cli::{self, Args};

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides the flag-derived default
    let default_filter = if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Err(error) = cli::run(&args) {
        cli::handle_error(&error);
        std::process::exit(1);
    }

    Ok(())
}
