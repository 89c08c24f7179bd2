use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    /// Scratch dir or jail command construction failed
    #[error("Sandbox setup failed: {0}")]
    Setup(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process killed: exceeded timeout of {seconds:.2} seconds")]
    Timeout { seconds: f64 },

    /// Merged stdout+stderr is kept so callers can report toolchain errors
    #[error("Process exited with code {code}")]
    NonZeroExit { code: i32, output: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SandboxError::Timeout { .. })
    }

    /// Captured process output, if the process got far enough to produce any.
    pub fn output(&self) -> Option<&str> {
        match self {
            SandboxError::NonZeroExit { output, .. } => Some(output),
            _ => None,
        }
    }
}
