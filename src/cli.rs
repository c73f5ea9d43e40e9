use crate::engine::{DocumentSource, EngineConfig, MockEngine};
use crate::resolver::DEFAULT_MAX_DEPTH;
use crate::sampler::CompositionPolicy;
use crate::serializer::{serialize_json, write_to_file};
use crate::server::build_server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::net::TcpListener;
use std::path::PathBuf;

/// OpenAPI Mock Server - Answer HTTP requests with responses synthesized from OpenAPI documents
#[derive(Parser, Debug)]
#[command(name = "openapi-mock")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Directory of API documents; the first request path segment names the document
    #[arg(
        short = 'r',
        long = "root",
        env = "APIDOC_PATH",
        value_name = "DIR",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Single API document answering every request (takes precedence over --root)
    #[arg(short = 's', long = "spec", value_name = "FILE", global = true)]
    pub spec: Option<PathBuf>,

    /// Status codes tried in order, comma separated
    #[arg(
        long = "status",
        value_name = "CODES",
        value_delimiter = ',',
        global = true
    )]
    pub status_preference: Vec<u16>,

    /// Maximum $ref chain length
    #[arg(long = "max-depth", value_name = "N", default_value_t = DEFAULT_MAX_DEPTH, global = true)]
    pub max_depth: usize,

    /// How oneOf/anyOf alternatives are sampled
    #[arg(long = "composition", value_enum, default_value_t = CompositionPolicy::Enumerate, global = true)]
    pub composition: CompositionPolicy,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve mocked responses over HTTP
    Serve {
        /// Interface to bind
        #[arg(long = "host", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short = 'p', long = "port", default_value_t = 3000)]
        port: u16,

        /// Keep loaded documents in memory between requests
        #[arg(long = "cache")]
        cache: bool,
    },
    /// Run one request through the engine and print the response body
    Render {
        /// HTTP method, e.g. GET
        #[arg(value_name = "METHOD")]
        method: String,

        /// Request path, optionally with a query string
        #[arg(value_name = "PATH")]
        path: String,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,

        /// Print the body on a single line
        #[arg(long = "compact")]
        compact: bool,
    },
    /// List every endpoint of every document
    List,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    match (&args.spec, &args.root) {
        (Some(spec), _) => {
            if !spec.is_file() {
                anyhow::bail!("API document does not exist: {}", spec.display());
            }
            info!("API document: {}", spec.display());
        }
        (None, Some(root)) => {
            if !root.exists() {
                anyhow::bail!("Document root does not exist: {}", root.display());
            }
            if !root.is_dir() {
                anyhow::bail!("Document root is not a directory: {}", root.display());
            }
            info!("Document root: {}", root.display());
        }
        (None, None) => {
            anyhow::bail!("No API documents given. Use --root DIR (or APIDOC_PATH) or --spec FILE");
        }
    }

    if args.max_depth == 0 {
        anyhow::bail!("--max-depth must be at least 1");
    }
    info!("Composition policy: {:?}", args.composition);

    Ok(args)
}

/// Builds the engine configuration from validated arguments.
pub fn engine_config(args: &CliArgs) -> Result<EngineConfig> {
    let source = match (&args.spec, &args.root) {
        (Some(spec), _) => DocumentSource::File(spec.clone()),
        (None, Some(root)) => DocumentSource::Root(root.clone()),
        (None, None) => anyhow::bail!("No API documents given"),
    };

    let mut config = EngineConfig::new(source);
    if !args.status_preference.is_empty() {
        config.status_preference = args.status_preference.clone();
    }
    config.max_depth = args.max_depth;
    config.composition = args.composition;
    if let Command::Serve { cache, .. } = &args.command {
        config.cache_documents = *cache;
    }
    Ok(config)
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    let engine = MockEngine::new(engine_config(&args)?);

    match args.command {
        Command::Serve { host, port, .. } => serve(engine, &host, port),
        Command::Render {
            method,
            path,
            output_path,
            compact,
        } => {
            let response = engine
                .respond(&method, &path)
                .with_context(|| format!("Failed to mock {} {}", method.to_uppercase(), path))?;
            info!("Status: {}", response.status);

            let content = serialize_json(&response.body, !compact)?;
            if let Some(output_path) = &output_path {
                info!("Writing output to: {}", output_path.display());
                write_to_file(&content, output_path)?;
            } else {
                println!("{}", content);
            }
            Ok(())
        }
        Command::List => {
            for entry in engine.catalogue()? {
                println!("{}", entry.document.display());
                for endpoint in &entry.endpoints {
                    println!("  {}", endpoint);
                }
            }
            Ok(())
        }
    }
}

fn serve(engine: MockEngine, host: &str, port: u16) -> Result<()> {
    let catalogue = engine.catalogue()?;
    let total: usize = catalogue.iter().map(|entry| entry.endpoints.len()).sum();
    info!("Serving {} endpoints from {} documents", total, catalogue.len());
    for entry in &catalogue {
        for endpoint in &entry.endpoints {
            debug!("  {}", endpoint);
        }
    }

    let listener = TcpListener::bind((host, port))
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("Listening on http://{}", listener.local_addr()?);

    actix_web::rt::System::new()
        .block_on(async move { build_server(listener, engine)?.await })
        .context("Server stopped with an error")
}
