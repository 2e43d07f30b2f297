//! Command line executable for evaluating path expressions against JSON
//! documents. See the `cli` module documentation for usage.

use clap::Parser;
use treepath::cli::{Args, run_cli};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run_cli(args)?;
    Ok(())
}
