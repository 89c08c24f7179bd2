use cromper_sandbox::SandboxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NmError {
    #[error("No nm command for platform {0}")]
    MissingCommand(String),

    #[error("nm failed: {0}")]
    Failed(String),

    #[error("nm: timeout expired")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum ObjdumpError {
    #[error("No objdump command for platform {0}")]
    MissingCommand(String),

    #[error("objdump failed: {0}")]
    Failed(String),

    #[error("objdump: timeout expired")]
    Timeout,

    #[error(transparent)]
    Nm(#[from] NmError),

    #[error("Sandbox failure: {0}")]
    Sandbox(#[source] SandboxError),

    #[error("Failed to stage object file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("No target object to diff against")]
    EmptyTarget,

    #[error("Error dumping target assembly: {0}")]
    Target(#[source] ObjdumpError),

    #[error("{side} has {rows} instructions; at most {limit} can be diffed")]
    TooLarge {
        side: &'static str,
        rows: usize,
        limit: usize,
    },
}
