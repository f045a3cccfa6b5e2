//! CLI entrypoint for llm-ensemble
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use ensemble_application::{EventSink, RunEnsembleError, RunEnsembleUseCase};
use ensemble_domain::EnsembleRequest;
use ensemble_infrastructure::{ConfigLoader, FileConfig, HttpProviderFactory, JsonlResultStore};
use ensemble_infrastructure::config::FileLoggingConfig;
use ensemble_presentation::{AppState, Cli, Command, router, serve, write_events};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // === Load Configuration ===
    let config = ConfigLoader::load(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, &config.logging);

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            error!("Invalid configuration: {}", issue);
        }
        bail!("{} configuration error(s), see log output", issues.len());
    }

    // === Dependency Injection ===
    let use_case = Arc::new(build_use_case(&config)?);

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            serve_http(use_case, &bind, config.server.cors_permissive).await
        }
        Command::Run { request } => run_once(use_case, &request).await,
    }
}

/// Initialize tracing.
///
/// `RUST_LOG` wins over `-v`, which wins over `[logging] level`.
fn init_logging(verbose: u8, logging: &FileLoggingConfig) -> Option<WorkerGuard> {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new(logging.level.as_deref().unwrap_or("warn")),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"), // -vvv or more
        }
    };

    // stdout carries the event stream for `run`, so logs go to stderr
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match file_writer(logging) {
        Some((writer, guard)) => (
            Some(tracing_subscriber::fmt::layer().json().with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    guard
}

fn file_writer(
    logging: &FileLoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = logging.file.as_deref()?;
    let file_name = path.file_name()?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = tracing_appender::rolling::daily(dir, file_name);
    Some(tracing_appender::non_blocking(appender))
}

fn build_use_case(config: &FileConfig) -> Result<RunEnsembleUseCase> {
    let factory = HttpProviderFactory::new(config.providers.to_settings())
        .context("Failed to create HTTP clients")?;
    let mut use_case =
        RunEnsembleUseCase::new(Arc::new(factory)).with_params(config.ensemble.to_params());

    if let Some(path) = &config.storage.results_path {
        match JsonlResultStore::open(path) {
            Some(store) => {
                info!("Recording finished runs to {}", store.path().display());
                use_case = use_case.with_result_store(Arc::new(store));
            }
            None => warn!("Result recording disabled"),
        }
    }

    Ok(use_case)
}

async fn serve_http(use_case: Arc<RunEnsembleUseCase>, bind: &str, cors_permissive: bool) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("'{bind}' is not a socket address"))?;

    let app = router(AppState { use_case }, cors_permissive);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{}", listener.local_addr()?);
    serve(listener, app, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn run_once(use_case: Arc<RunEnsembleUseCase>, request_path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(request_path)
        .await
        .with_context(|| format!("Failed to read {}", request_path.display()))?;
    let request: EnsembleRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", request_path.display()))?;

    let run = use_case.prepare(request)?;

    let (sink, rx) = EventSink::channel(use_case.params().event_buffer);
    let writer = tokio::spawn(write_events(rx, tokio::io::stdout()));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let outcome = use_case.execute(run, sink, cancel).await;
    let frames = writer.await.context("Event writer task failed")??;
    info!(frames, "Event stream written");

    match outcome {
        Ok(_) => Ok(()),
        Err(RunEnsembleError::Cancelled) => bail!("Run cancelled"),
        Err(e) => Err(e.into()),
    }
}
