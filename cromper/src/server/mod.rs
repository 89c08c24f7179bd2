//! HTTP service: axum router over the worker pool and the differ.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use cromper_core::config::{
    env_keys, PathsConfig, SandboxConfig, ServerConfig, TimeoutConfig, WorkerConfig,
};
use cromper_core::Registry;
use cromper_diff::{DiffWrapper, SandboxObjdumpRunner};
use cromper_executor::{RestartHook, WorkerCommand, WorkerPool};
use tokio::net::TcpListener;

use crate::observability;
use crate::worker::Handler;
use router::create_router;
use state::{AppState, InlineDispatch, JobDispatch};

pub struct ServeOptions {
    pub bind: Option<String>,
    pub workers: Option<usize>,
    pub inline: bool,
}

/// Start the worker pool and serve until Ctrl+C / SIGTERM.
pub fn serve(opts: ServeOptions) -> Result<()> {
    let paths = PathsConfig::from_env();
    let registry = Registry::init(paths.clone()).context("Failed to build the toolchain registry")?;
    let sandbox = SandboxConfig::from_env();
    let timeouts = TimeoutConfig::from_env();
    let server_cfg = ServerConfig::from_env();
    let worker_cfg = WorkerConfig::from_env();
    let bind = opts.bind.unwrap_or(server_cfg.bind);

    let jobs: Arc<dyn JobDispatch> = if opts.inline {
        tracing::info!("Running jobs inline, without worker processes");
        Arc::new(InlineDispatch::new(Handler::from_env(registry)))
    } else {
        let exe = std::env::current_exe().context("Cannot locate the cromper executable")?;
        let command = WorkerCommand::new(exe)
            .arg("worker")
            .env(env_keys::observability::QUIET, "1");
        let on_restart: RestartHook = Arc::new(observability::audit_worker_restarted);
        let count = opts.workers.unwrap_or(worker_cfg.worker_count);
        Arc::new(
            WorkerPool::with_restart_hook(command, count, worker_cfg.supervisor_interval, Some(on_restart))
                .context("Failed to start worker pool")?,
        )
    };

    let runner = SandboxObjdumpRunner::new(sandbox, paths, timeouts.objdump);
    let differ = Arc::new(DiffWrapper::new(Arc::new(runner)));
    let state = AppState::new(registry, jobs, differ, timeouts);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind {}", bind))?;
        tracing::info!("cromper listening on {}", bind);
        axum::serve(listener, create_router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;
        tracing::info!("cromper shutting down");
        Ok(())
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
