mod args;
mod commands;
mod config;
mod dirs;

use std::io;
use std::net::SocketAddr;
use std::process::Command;

use anyhow::{Context, Result};
use app_api::AppContext;
use clap::Parser;
use http_api::HttpState;
use jevons_app::{AppConfig, AppState, spawn_scheduler};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::{CliArgs, CliCommand};
use crate::commands::GraphArgs;

const DEFAULT_LOG_FILTER: &str = "warn,jevons_app=info,jevons_store=info,ingest=info,http_api=info";

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level.as_deref());
    let command = args.command();

    let loaded = config::load_or_create()?;
    if loaded.created {
        eprintln!(
            "Created config at {} (default port {}).",
            loaded.file.display(),
            loaded.config.port
        );
    }
    let port_flag = match &command {
        CliCommand::Web { port, .. } => *port,
        _ => None,
    };
    let settings = config::resolve(&args, port_flag, &loaded.config, |name| {
        std::env::var(name).ok()
    });

    let mut app_config = AppConfig::new(&settings.data_dir, &settings.source_dir);
    app_config.sync_interval_secs = settings.sync_interval_secs;
    app_config.account_file = ingest::default_account_file();
    let state = AppState::new(app_config);

    match command {
        CliCommand::Web { no_open, .. } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("start tokio runtime")?;
            runtime.block_on(run_web(state, settings.port, no_open))
        }
        CliCommand::Sync => commands::sync(&state),
        CliCommand::Status => commands::status(&state),
        CliCommand::Doctor { fix } => commands::doctor(&state, fix),
        CliCommand::Total { range, scope } => commands::total(&state, &range, scope.as_deref()),
        CliCommand::Graph {
            metric,
            range,
            points,
            bucket,
            scope,
        } => commands::graph(
            &state,
            GraphArgs {
                metric: &metric,
                range: &range,
                points,
                bucket: Some(bucket.as_str()),
                scope: scope.as_deref(),
            },
        ),
    }
}

async fn run_web(state: AppState, port: u16, no_open: bool) -> Result<()> {
    state.initialize().context("prepare data directory")?;
    println!("Using data dir: {}", state.config.data_dir.display());
    println!("Reading sessions from: {}", state.config.source_dir.display());

    let scheduler = spawn_scheduler(&state);
    let router = http_api::router(HttpState::new(AppContext::new(state)));

    let (listener, actual_port, used_fallback) = bind_port(port).await?;
    let url = format!("http://127.0.0.1:{actual_port}");
    if used_fallback {
        eprintln!("Configured port {port} was unavailable; using {actual_port} for this run.");
    }
    println!("Jevons is running at {url}");
    println!("Press Ctrl+C to stop.");

    if !no_open && let Err(err) = open_url(&url) {
        warn!(error = %err, "failed to open browser");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve http")?;

    info!("shutting down");
    scheduler.stop().await;
    Ok(())
}

async fn bind_port(port: u16) -> Result<(tokio::net::TcpListener, u16, bool), io::Error> {
    if port == 0 {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let actual_port = listener.local_addr()?.port();
        return Ok((listener, actual_port, false));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => Ok((listener, port, false)),
        Err(_) => {
            let listener =
                tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
            let actual_port = listener.local_addr()?.port();
            Ok((listener, actual_port, true))
        }
    }
}

fn open_url(url: &str) -> Result<(), io::Error> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    let status = command.arg(url).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other("open command failed"))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
