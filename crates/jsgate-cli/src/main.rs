//! # jsgate CLI entry point
//!
//! ## Usage
//!
//! ```bash
//! # Serve a directory of handler scripts
//! jsgate serve -d ./handlers -b 127.0.0.1:7000
//!
//! # Development mode: recompile scripts on every request
//! jsgate serve -d ./handlers --per-request
//!
//! # Run one handler locally (outputs raw JSON, pipeable to jq)
//! jsgate invoke -s ./handlers/hello.js -p "name=ana"
//! ```
//!
//! A handler script defines `function handle(params)` and returns
//! `{status, errCode, data}`; `retData(errCode, status, data)` builds that
//! shape in one call.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;

use jsgate_common::params::merge_request_params;
use jsgate_server::{ExecutionMode, HostRegistry, HttpServer, ResourceLimits, ScriptContext, ScriptHost};

/// jsgate - serve JavaScript request handlers over HTTP
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Invoke(InvokeArgs),
}

/// serve a directory of handler scripts over HTTP
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
struct ServeArgs {
    /// directory containing handler scripts; <name>.js is served at
    /// /handlers/<name>
    #[argh(option, short = 'd')]
    handlers: String,

    /// address to bind the HTTP server to
    #[argh(option, short = 'b', default = "\"127.0.0.1:7000\".into()")]
    bind: String,

    /// compile a fresh environment per request instead of caching, so
    /// script edits are picked up immediately
    #[argh(switch, long = "per-request")]
    per_request: bool,

    /// maximum handler execution time in milliseconds
    #[argh(option, long = "max-execution-time-ms", default = "30000")]
    max_execution_time_ms: u64,

    /// timeout for each gFetch call in milliseconds
    #[argh(option, long = "fetch-timeout-ms", default = "10000")]
    fetch_timeout_ms: u64,
}

/// invoke a handler script once and print the JSON result
#[derive(FromArgs)]
#[argh(subcommand, name = "invoke")]
struct InvokeArgs {
    /// path to the handler script
    #[argh(option, short = 's')]
    script: String,

    /// parameters as a query string, e.g. "name=ana&count=3"
    #[argh(option, short = 'p', default = "String::new()")]
    params: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // `invoke` prints raw JSON for piping; keep its stdout free of logs.
    if matches!(cli.command, Commands::Serve(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Invoke(args) => run_invoke(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let limits = ResourceLimits::new()
        .with_execution_timeout(Duration::from_millis(args.max_execution_time_ms));
    limits
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid resource limits: {e}"))?;

    let registry =
        HostRegistry::new().with_fetch_timeout(Duration::from_millis(args.fetch_timeout_ms));

    let mode = if args.per_request {
        ExecutionMode::PerRequest
    } else {
        ExecutionMode::Cached
    };

    tracing::info!("serving handlers from {}", args.handlers);
    tracing::info!(
        "execution mode: {:?}, timeout: {}ms",
        mode,
        args.max_execution_time_ms
    );

    let host = ScriptHost::new(PathBuf::from(&args.handlers), registry)?
        .with_mode(mode)
        .with_resource_limits(limits);

    let addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {}: {e}", args.bind))?;

    HttpServer::new(Arc::new(host)).run(addr).await?;

    Ok(())
}

async fn run_invoke(args: InvokeArgs) -> Result<()> {
    let source = std::fs::read_to_string(&args.script)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", args.script))?;

    let params = merge_request_params(Some(&args.params), &[], None);
    let registry = HostRegistry::new();

    let envelope = tokio::task::spawn_blocking(move || {
        let context = ScriptContext::from_source(&source, &registry)?;
        context.invoke(&params)
    })
    .await??;

    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({
            "status": envelope.status,
            "errCode": envelope.err_code,
            "data": envelope.data,
        }))?
    );

    Ok(())
}
