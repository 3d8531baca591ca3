//! mvs CLI binary.
//!
//! Entry point for the `mvs` command-line tool. It initializes logging via
//! `tracing`, parses arguments with `clap`, and dispatches to the command
//! handlers, which run the resolver over a TOML requirement table.

mod cli;
mod commands;

use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    commands::dispatch(args).await
}
