use thiserror::Error;

/// Catalog lookup and validation errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown compiler: {0}")]
    UnknownCompiler(String),

    #[error("Library not available: {0}")]
    UnknownLibrary(String),

    /// Known compiler whose binaries are not provisioned on this host
    #[error("Compiler {0} is not available")]
    CompilerUnavailable(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}
