//! Bounded pool of worker processes fed from one shared job queue.
//!
//! The service process owns a [`WorkerPool`]; each slot runs a child process
//! (normally `cromper worker`) that reads [`JobRequest`]s as newline-delimited
//! JSON on stdin and answers each with one [`JobResponse`] line on stdout.
//! The worker side of that loop is [`worker::serve`].
//!
//! Timeouts are two-tier: the toolchain run inside a worker is killed by its
//! sandbox timeout, while [`WorkerPool::submit`] only bounds how long the
//! caller waits and never kills the worker itself.

pub mod error;
pub mod pool;
pub mod protocol;
pub mod worker;

pub use error::{JobError, PoolError};
pub use pool::{PoolHealth, RestartHook, WorkerCommand, WorkerHealth, WorkerPool, WorkerState};
pub use protocol::{JobAction, JobRequest, JobResponse};
pub use worker::{serve, serve_stdio, JobHandler};
