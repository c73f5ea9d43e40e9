//! OpenAPI Mock Server - Command-line front end of the mock engine.
//!
//! Serves responses synthesized from OpenAPI documents, or renders a single response
//! to stdout for inspection.
//!
//! # Usage
//!
//! ```bash
//! openapi-mock [OPTIONS] <COMMAND>
//! ```
//!
//! # Examples
//!
//! Serve every document under a directory:
//! ```bash
//! APIDOC_PATH=./apidoc openapi-mock serve --port 3000
//! ```
//!
//! Render one response:
//! ```bash
//! openapi-mock render GET /petstore/pets/1 --root ./apidoc
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-mock list --spec ./apidoc/petstore.yaml -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_mock::cli;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI mock server starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
