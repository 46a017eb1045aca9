//! Gateway entry point: CLI parsing, logging setup, and server wiring.
//! Grounded on `main.rs::setup_logging`/`run_server` in the teacher.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gatewatch::auth::{get_or_create_admin_token, StaticTokenAuthProvider};
use gatewatch::config::{self, CliOverrides, GatewayConfig, HotConfig};
use gatewatch::controller::stub::StubController;
use gatewatch::gateway::{run_cleanup_sweeper, transport};
use gatewatch::permissions::ROLE_ADMIN;
use gatewatch::GatewayContext;

#[derive(Parser, Debug)]
#[command(name = "gatewatch", version, about = "Camera-recording service API gateway")]
struct Cli {
    /// Bind address, overriding config.toml and the built-in default.
    #[arg(long, env = "GATEWATCH_HOST")]
    host: Option<String>,

    /// Bind port, overriding config.toml and the built-in default.
    #[arg(long, env = "GATEWATCH_PORT")]
    port: Option<u16>,

    /// Maximum concurrent WebSocket sessions.
    #[arg(long, env = "GATEWATCH_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Comma-separated list of allowed Origin header values ("*" for any).
    #[arg(long, env = "GATEWATCH_CORS_ORIGINS", value_delimiter = ',')]
    cors_origin: Vec<String>,

    /// Directory holding config.toml, the admin bootstrap token, and logs.
    #[arg(long, env = "GATEWATCH_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
}

fn setup_logging(data_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(data_dir)?;
    let file_appender = tracing_appender::rolling::daily(data_dir, "gatewatch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = setup_logging(&cli.data_dir)?;

    let toml_path = config::default_toml_path(&cli.data_dir);
    let overrides = CliOverrides {
        host: cli.host.clone(),
        port: cli.port,
        max_connections: cli.max_connections,
        cors_origins: if cli.cors_origin.is_empty() {
            None
        } else {
            Some(cli.cors_origin.clone())
        },
    };
    let gateway_config = GatewayConfig::from_sources(overrides, &toml_path)?;
    info!(
        host = %gateway_config.host,
        port = gateway_config.port,
        max_connections = gateway_config.max_connections,
        "gatewatch starting"
    );

    let admin_token = get_or_create_admin_token(&cli.data_dir)?;
    info!(data_dir = %cli.data_dir.display(), "admin bootstrap token ready");

    let mut tokens = std::collections::HashMap::new();
    tokens.insert(admin_token, ROLE_ADMIN.to_string());
    let auth_provider = Arc::new(StaticTokenAuthProvider::new(tokens, 100, 50));

    let controller = Arc::new(StubController::new());

    let ctx = GatewayContext::new(gateway_config.clone(), controller, auth_provider);

    let hot_config = HotConfig::from(&gateway_config);
    let _config_watcher = config::ConfigWatcher::start(toml_path, hot_config);

    let cleanup_ctx = ctx.clone();
    tokio::spawn(run_cleanup_sweeper(cleanup_ctx));

    let serve_ctx = ctx.clone();
    let serve_handle = tokio::spawn(transport::serve(serve_ctx));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    if let Err(err) = ctx.shutdown.stop(&ctx, ctx.config.shutdown_timeout).await {
        error!(%err, "graceful shutdown did not complete cleanly");
    }

    serve_handle.abort();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
