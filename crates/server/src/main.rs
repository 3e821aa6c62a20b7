mod api;
mod router;
mod state;

use std::sync::Arc;

use tracing::{info, warn};

use graphsplit_core::{job_channel, Config};
use graphsplit_scheduler::{HttpWorkerClient, Scheduler, SchedulerConfig};
use graphsplit_store::{init_pg_pool, PgStore};

const DEFAULT_SCHEDULER_CONFIG: &str = "config/scheduler.toml";

fn load_config() -> Config {
    graphsplit_core::config::load_dotenv();
    Config::from_env()
}

/// Scheduler settings from `SCHEDULER_CONFIG` (or the default path); a
/// missing or invalid file falls back to built-in defaults.
fn load_scheduler_config() -> SchedulerConfig {
    let path = std::env::var("SCHEDULER_CONFIG").unwrap_or_else(|_| DEFAULT_SCHEDULER_CONFIG.to_string());
    match SchedulerConfig::from_file(&path) {
        Ok(cfg) => {
            info!(path = %path, "loaded scheduler config");
            cfg
        }
        Err(e) => {
            warn!(error = %e, path = %path, "failed to load scheduler config, using defaults");
            SchedulerConfig::default()
        }
    }
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    init_pg_pool(&config.postgres).await?;
    info!("migrations up to date");
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();
    let scheduler_config = load_scheduler_config();

    let pool = init_pg_pool(&config.postgres).await?;
    let (notifier, signals) = job_channel(scheduler_config.notify_capacity);
    let store = Arc::new(PgStore::new(pool).with_notifier(notifier));

    let client = HttpWorkerClient::from_config(&config.worker)?;
    info!(url = %client.url(), "worker endpoint configured");
    let scheduler = Scheduler::new(store.clone(), Arc::new(client), scheduler_config).spawn(signals);

    let state = Arc::new(state::AppState::new(store));
    let app = router::build_router(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(os_signal()).await?;

    info!("HTTP server stopped, waiting for scheduler");
    scheduler.shutdown().await;
    Ok(())
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C elsewhere.
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => warn!(error = %e, "failed to register signal handlers"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl_c");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config();
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("serve") => serve(&config).await,
        Some("migrate") => migrate(&config).await,
        Some(other) => {
            anyhow::bail!("unknown command '{}'. Usage: graphsplit-server [serve|migrate]", other)
        }
    }
}
