use cromper_core::CatalogError;
use cromper_sandbox::SandboxError;
use thiserror::Error;

/// Infrastructure failures while compiling. Rejected user code is not an
/// error; it comes back as a `CompilationResult` with error text.
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Sandbox failure for compiler {compiler}: {source}")]
    Sandbox {
        compiler: String,
        #[source]
        source: SandboxError,
    },

    #[error("Failed to prepare sources: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Assemble command for platform {0} not found")]
    MissingAssembler(String),

    #[error("Sandbox failure for platform {platform}: {source}")]
    Sandbox {
        platform: String,
        #[source]
        source: SandboxError,
    },

    #[error("Failed to prepare assembly: {0}")]
    Io(#[from] std::io::Error),
}

impl CompilationError {
    /// The request named something that does not exist or is not provisioned.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CompilationError::Catalog(_))
    }
}

impl AssemblyError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AssemblyError::Catalog(_))
    }
}
