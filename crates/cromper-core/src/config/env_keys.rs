//! Environment variable keys and their aliases.
//!
//! Primary variables use the `CROMPER_*` prefix. The un-prefixed names are
//! accepted as aliases so existing deployment files keep working.

/// Sandbox / jail settings
pub mod sandbox {
    pub const USE_SANDBOX_JAIL: &str = "CROMPER_USE_SANDBOX_JAIL";
    pub const USE_SANDBOX_JAIL_ALIASES: &[&str] = &["USE_SANDBOX_JAIL"];

    pub const NSJAIL_BIN_PATH: &str = "CROMPER_SANDBOX_NSJAIL_BIN_PATH";
    pub const NSJAIL_BIN_PATH_ALIASES: &[&str] = &["SANDBOX_NSJAIL_BIN_PATH"];

    pub const CHROOT_PATH: &str = "CROMPER_SANDBOX_CHROOT_PATH";
    pub const CHROOT_PATH_ALIASES: &[&str] = &["SANDBOX_CHROOT_PATH"];

    pub const TMP_PATH: &str = "CROMPER_SANDBOX_TMP_PATH";
    pub const TMP_PATH_ALIASES: &[&str] = &["SANDBOX_TMP_PATH"];

    pub const DISABLE_PROC: &str = "CROMPER_SANDBOX_DISABLE_PROC";
    pub const DISABLE_PROC_ALIASES: &[&str] = &["SANDBOX_DISABLE_PROC"];

    pub const WINEPREFIX: &str = "CROMPER_WINEPREFIX";
    pub const WINEPREFIX_ALIASES: &[&str] = &["WINEPREFIX"];

    pub const WINE: &str = "CROMPER_WINE";
    pub const WINE_ALIASES: &[&str] = &["WINE"];
}

/// Toolchain and library locations
pub mod paths {
    pub const COMPILER_BASE_PATH: &str = "CROMPER_COMPILER_BASE_PATH";
    pub const COMPILER_BASE_PATH_ALIASES: &[&str] = &["COMPILER_BASE_PATH"];

    pub const LIBRARY_BASE_PATH: &str = "CROMPER_LIBRARY_BASE_PATH";
    pub const LIBRARY_BASE_PATH_ALIASES: &[&str] = &["LIBRARY_BASE_PATH"];
}

/// Per-action timeouts (seconds)
pub mod timeouts {
    pub const COMPILATION: &str = "CROMPER_COMPILATION_TIMEOUT_SECONDS";
    pub const COMPILATION_ALIASES: &[&str] = &["COMPILATION_TIMEOUT_SECONDS"];

    pub const ASSEMBLY: &str = "CROMPER_ASSEMBLY_TIMEOUT_SECONDS";
    pub const ASSEMBLY_ALIASES: &[&str] = &["ASSEMBLY_TIMEOUT_SECONDS"];

    pub const OBJDUMP: &str = "CROMPER_OBJDUMP_TIMEOUT_SECONDS";
    pub const OBJDUMP_ALIASES: &[&str] = &["OBJDUMP_TIMEOUT_SECONDS"];

    pub const DECOMPILATION: &str = "CROMPER_DECOMPILATION_TIMEOUT_SECONDS";
    pub const DECOMPILATION_ALIASES: &[&str] = &["DECOMPILATION_TIMEOUT_SECONDS"];

    /// Extra seconds the caller waits on top of the sandbox timeout.
    pub const POOL_GRACE: &str = "CROMPER_POOL_TIMEOUT_GRACE_SECONDS";
}

/// Worker pool
pub mod workers {
    pub const WORKER_COUNT: &str = "CROMPER_WORKER_COUNT";
    pub const WORKER_COUNT_ALIASES: &[&str] = &["COMPILATION_WORKERS"];

    pub const SUPERVISOR_INTERVAL_SECS: &str = "CROMPER_SUPERVISOR_INTERVAL_SECS";
}

/// HTTP service
pub mod server {
    pub const BIND: &str = "CROMPER_BIND";
}

/// Decompiler collaborator
pub mod decompiler {
    pub const M2C_CMD: &str = "CROMPER_M2C_CMD";
}

/// Observability and logging
pub mod observability {
    pub const QUIET: &str = "CROMPER_QUIET";
    pub const LOG_LEVEL: &str = "CROMPER_LOG_LEVEL";
    pub const LOG_JSON: &str = "CROMPER_LOG_JSON";
    pub const AUDIT_LOG: &str = "CROMPER_AUDIT_LOG";
}
