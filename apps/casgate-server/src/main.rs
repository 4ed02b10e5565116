//! Demo host wiring the CAS SSO plugin in front of an axum router.
//!
//! `GET /` is protected by the plugin chain; `GET /healthz` sits outside it.
//! On unix, SIGHUP re-reads the configuration file and hot-swaps it into the
//! plugin.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::Extension;
use axum::routing::get;
use axum::Router;
use cas_sso::{CasSsoPlugin, CasUsername, SsoConfig};
use clap::Parser;
use figment::Figment;
use figment::providers::{Format, Yaml};
use plugin_api::{PluginLayer, RouterPlugin};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "casgate-server", version, about = "CAS SSO gateway demo server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config/casgate.yaml")]
    config: PathBuf,

    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    plugin: SsoConfig,
}

fn load_config(path: &Path) -> Result<SsoConfig> {
    let config: FileConfig = Figment::new()
        .merge(Yaml::file(path))
        .extract()
        .with_context(|| format!("load configuration from {}", path.display()))?;
    Ok(config.plugin)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn whoami(username: Option<Extension<CasUsername>>) -> String {
    match username {
        Some(Extension(CasUsername(name))) => format!("hello, {name}\n"),
        None => "hello, anonymous\n".to_owned(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    let plugin = Arc::new(CasSsoPlugin::new(config).await);

    #[cfg(unix)]
    spawn_reload_task(cli.config.clone(), Arc::clone(&plugin));

    let protected = Router::new().route("/", get(whoami)).layer(PluginLayer::new(vec![
        Arc::clone(&plugin) as Arc<dyn RouterPlugin>,
    ]));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .merge(protected);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(addr = %cli.bind, "casgate server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

/// Re-reads the configuration file and swaps it into the plugin on SIGHUP.
#[cfg(unix)]
fn spawn_reload_task(path: PathBuf, plugin: Arc<CasSsoPlugin>) {
    use tracing::error;

    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};

        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                error!(error = %err, "failed to install SIGHUP handler");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            match reload(&path, &plugin).await {
                Ok(()) => info!("configuration reloaded"),
                Err(err) => {
                    error!(error = %err, "reload failed, keeping the active configuration");
                }
            }
        }
    });
}

#[cfg(unix)]
async fn reload(path: &Path, plugin: &CasSsoPlugin) -> Result<()> {
    let config = load_config(path)?;
    let value = serde_json::to_value(&config).context("serialize plugin configuration")?;
    plugin.update(value).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install CTRL+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
