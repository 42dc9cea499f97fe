use std::path::PathBuf;

use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use msbuild_lsp::Backend;
use msbuild_lsp::config::Config;

/// Language server providing completions for MSBuild project files.
///
/// Speaks LSP over stdin/stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "msbuild-lsp", version, about)]
struct Args {
    /// Log filter, e.g. `debug` or `msbuild_lsp=trace`.
    ///
    /// Overrides `[logging] level` from the configuration file.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// Configuration file to use instead of the discovered ones.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // The workspace is not known yet; the workspace file is picked up at
    // initialize, but logging needs a level now.
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| Config::discover(args.config.as_deref(), None).logging.level);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let config_path = args.config;
    let (service, socket) = LspService::new(move |client| Backend::new(client, config_path));
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket)
        .serve(service)
        .await;
}
