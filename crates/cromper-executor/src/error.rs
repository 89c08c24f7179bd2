use thiserror::Error;

/// Pool-side failures; callers normally fall back to a default result.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to start worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Job queue is closed")]
    Closed,

    #[error("Job {id} timed out after {seconds:.2}s")]
    Timeout { id: u64, seconds: f64 },

    #[error("Job {id} lost: worker exited before replying")]
    Disconnected { id: u64 },

    #[error("Job {id} failed: {message}")]
    Job { id: u64, message: String },

    #[error("Job payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),
}

impl PoolError {
    /// The caller stopped waiting, as opposed to the job reporting an error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout { .. } | PoolError::Disconnected { .. })
    }
}

/// Worker-side failure of a single job; sent back as the `error` field.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid job payload: {0}")]
    BadPayload(#[from] serde_json::Error),

    #[error("Unsupported job action: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),
}
