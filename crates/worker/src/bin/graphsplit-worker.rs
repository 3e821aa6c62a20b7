use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use graphsplit_worker::{
    serve, CommandExecutor, DrainReport, Executor, StatsExecutor, WorkerConfig, WorkerRunner,
    Workspace,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    graphsplit_core::config::load_dotenv();
    let config = WorkerConfig::parse();

    let executor: Arc<dyn Executor> = match config.command_line() {
        Some((program, args)) => Arc::new(CommandExecutor::new(program, args)),
        None => Arc::new(StatsExecutor),
    };

    let workspace = Workspace::new(&config.dir);
    workspace.ensure_root().await?;
    let runner = Arc::new(WorkerRunner::new(workspace, executor, config.max_concurrent));

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(
        addr = %config.addr(),
        dir = %config.dir.display(),
        max_concurrent = config.max_concurrent,
        executor = runner.executor_name(),
        "graphsplit-worker listening"
    );

    match serve(listener, runner, config.shutdown_grace(), os_signal()).await? {
        DrainReport::Drained => info!("graphsplit-worker exited"),
        DrainReport::TimedOut { in_flight } => {
            warn!(in_flight, "graphsplit-worker exited with tasks still running")
        }
    }
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
