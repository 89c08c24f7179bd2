//! Process isolation for untrusted legacy toolchains.
//!
//! A [`Sandbox`] owns one ephemeral scratch directory for the duration of a
//! compile/assemble/diff call. With jailing enabled every command is wrapped
//! in an nsjail invocation; otherwise it runs directly inside the scratch dir.

pub mod common;
pub mod error;
pub mod jail;
pub mod log;
pub mod sandbox;

pub use common::ProcessOutput;
pub use error::SandboxError;
pub use sandbox::{RunOptions, RunOutput, Sandbox, SandboxCommand};
