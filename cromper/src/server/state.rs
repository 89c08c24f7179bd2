//! Application state shared by the handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cromper_core::config::TimeoutConfig;
use cromper_core::Registry;
use cromper_diff::DiffWrapper;
use cromper_executor::{JobAction, JobHandler, PoolError, PoolHealth, WorkerPool};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::worker::Handler;

/// Where compile/assemble/decompile jobs run.
pub trait JobDispatch: Send + Sync {
    /// Blocks for at most `timeout` (pool) or until the job finishes (inline).
    fn dispatch(&self, action: JobAction, payload: Value, timeout: Duration) -> Result<Value, PoolError>;

    /// Worker states, when jobs run in worker processes.
    fn health(&self) -> Option<PoolHealth>;
}

impl JobDispatch for WorkerPool {
    fn dispatch(&self, action: JobAction, payload: Value, timeout: Duration) -> Result<Value, PoolError> {
        self.try_submit(action, payload, timeout)
    }

    fn health(&self) -> Option<PoolHealth> {
        Some(WorkerPool::health(self))
    }
}

/// Runs jobs on the calling thread. The sandbox timeout still applies.
pub struct InlineDispatch {
    handler: Handler,
    next_id: AtomicU64,
}

impl InlineDispatch {
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            next_id: AtomicU64::new(1),
        }
    }
}

impl JobDispatch for InlineDispatch {
    fn dispatch(&self, action: JobAction, payload: Value, _timeout: Duration) -> Result<Value, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handler
            .handle(action, payload)
            .map_err(|e| PoolError::Job {
                id,
                message: e.to_string(),
            })
    }

    fn health(&self) -> Option<PoolHealth> {
        None
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: &'static Registry,
    pub jobs: Arc<dyn JobDispatch>,
    /// Diffs run in the service process; only the disassembler is sandboxed
    pub differ: Arc<DiffWrapper>,
    /// One permit per diff running at once
    pub diff_permits: Arc<Semaphore>,
    pub timeouts: TimeoutConfig,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        registry: &'static Registry,
        jobs: Arc<dyn JobDispatch>,
        differ: Arc<DiffWrapper>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            registry,
            jobs,
            differ,
            diff_permits: Arc::new(Semaphore::new(max_concurrent_diffs())),
            timeouts,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// Caller-side wait: the job's sandbox timeout plus the pool grace period.
    pub fn job_timeout(&self, action: JobAction) -> Duration {
        let sandbox = match action {
            JobAction::Compile => self.timeouts.compilation,
            JobAction::Assemble => self.timeouts.assembly,
            JobAction::Decompile => self.timeouts.decompilation,
        };
        sandbox + self.timeouts.pool_grace
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

fn max_concurrent_diffs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}
