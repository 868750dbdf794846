use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use postboard::api::ApiClient;
use postboard::cli::Shell;
use postboard::config::{has_flag, ClientConfig, DEFAULT_API_URL, ENV_API_URL, ENV_STORAGE};
use postboard::identity::{FileStorage, SessionManager, SystemClock};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api-url <url>] [--storage <path>]\n\nFlags:\n  --api-url <url>    Backend base URL (env {ENV_API_URL}, default {DEFAULT_API_URL})\n  --storage <path>   File holding the saved session (env {ENV_STORAGE}, default ~/.postboard/storage.json)\n  -h, --help         Show this help\n\nLogging is controlled by RUST_LOG (default: warn)."
    );
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with rendered output on stdout.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "postboard".to_string());
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage(&program);
        return Ok(());
    }

    let config = ClientConfig::from_args(&args)?;
    tracing::info!(target: "postboard::cli", "backend={} storage='{}'", config.api_url, config.storage_path.display());

    let storage = Arc::new(FileStorage::new(&config.storage_path));
    let session = Arc::new(SessionManager::new(storage, Arc::new(SystemClock)));
    let api = ApiClient::new(config.api_url.clone(), session)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let mut shell = Shell::new(rt, api, config.storage_path)?;
    shell.run()
}
