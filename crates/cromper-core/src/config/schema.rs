//! Configuration structs grouped by concern, each loaded from the environment.

use super::env_keys::{decompiler, observability as obv_keys, paths, sandbox, server, timeouts, workers};
use super::loader::{env_bool, env_optional, env_or, env_secs, env_u64, load_dotenv};
use std::path::PathBuf;
use std::time::Duration;

/// Jail settings for the sandbox layer.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wrap every command in the isolation tool
    pub use_jail: bool,
    pub nsjail_bin: PathBuf,
    /// Root filesystem image the jailed process is chrooted into
    pub chroot_path: PathBuf,
    /// Parent directory for per-invocation scratch dirs when jailed
    pub tmp_path: PathBuf,
    /// Skip mounting /proc (some container runtimes refuse it)
    pub disable_proc: bool,
    /// Persistent Windows-compatibility prefix, mounted read-only
    pub wine_prefix: PathBuf,
    /// Launcher used by Windows-hosted toolchains (`wine`, `wibo`, ...)
    pub wine: String,
}

impl SandboxConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            use_jail: env_bool(sandbox::USE_SANDBOX_JAIL, sandbox::USE_SANDBOX_JAIL_ALIASES, false),
            nsjail_bin: PathBuf::from(env_or(
                sandbox::NSJAIL_BIN_PATH,
                sandbox::NSJAIL_BIN_PATH_ALIASES,
                || "/bin/nsjail".to_string(),
            )),
            chroot_path: PathBuf::from(env_or(
                sandbox::CHROOT_PATH,
                sandbox::CHROOT_PATH_ALIASES,
                || "/sandbox/root".to_string(),
            )),
            tmp_path: PathBuf::from(env_or(sandbox::TMP_PATH, sandbox::TMP_PATH_ALIASES, || {
                "/sandbox/tmp".to_string()
            })),
            disable_proc: env_bool(sandbox::DISABLE_PROC, sandbox::DISABLE_PROC_ALIASES, false),
            wine_prefix: PathBuf::from(env_or(sandbox::WINEPREFIX, sandbox::WINEPREFIX_ALIASES, || {
                "/tmp/wine".to_string()
            })),
            wine: env_or(sandbox::WINE, sandbox::WINE_ALIASES, || "wine".to_string()),
        }
    }

    /// Unjailed settings, used by tests and local development.
    pub fn unjailed() -> Self {
        Self {
            use_jail: false,
            nsjail_bin: PathBuf::from("/bin/nsjail"),
            chroot_path: PathBuf::from("/sandbox/root"),
            tmp_path: PathBuf::from("/sandbox/tmp"),
            disable_proc: false,
            wine_prefix: PathBuf::from("/tmp/wine"),
            wine: "wine".to_string(),
        }
    }
}

/// On-disk toolchain and library roots.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub compiler_base: PathBuf,
    pub library_base: PathBuf,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let compiler_base = env_optional(paths::COMPILER_BASE_PATH, paths::COMPILER_BASE_PATH_ALIASES)
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join("compilers"));
        let library_base = env_optional(paths::LIBRARY_BASE_PATH, paths::LIBRARY_BASE_PATH_ALIASES)
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join("libraries"));
        Self {
            compiler_base,
            library_base,
        }
    }
}

/// Sandbox-level (hard kill) timeouts per action.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    pub compilation: Duration,
    pub assembly: Duration,
    pub objdump: Duration,
    pub decompilation: Duration,
    /// Added to the sandbox timeout to form the caller-side pool wait
    pub pool_grace: Duration,
}

impl TimeoutConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            compilation: env_secs(timeouts::COMPILATION, timeouts::COMPILATION_ALIASES, 10),
            assembly: env_secs(timeouts::ASSEMBLY, timeouts::ASSEMBLY_ALIASES, 3),
            objdump: env_secs(timeouts::OBJDUMP, timeouts::OBJDUMP_ALIASES, 3),
            decompilation: env_secs(timeouts::DECOMPILATION, timeouts::DECOMPILATION_ALIASES, 5),
            pool_grace: env_secs(timeouts::POOL_GRACE, &[], 2),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            compilation: Duration::from_secs(10),
            assembly: Duration::from_secs(3),
            objdump: Duration::from_secs(3),
            decompilation: Duration::from_secs(5),
            pool_grace: Duration::from_secs(2),
        }
    }
}

/// Worker pool sizing and supervision.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub supervisor_interval: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get() as u64)
            .unwrap_or(4);
        let worker_count =
            env_u64(workers::WORKER_COUNT, workers::WORKER_COUNT_ALIASES, default_workers).max(1) as usize;
        Self {
            worker_count,
            supervisor_interval: env_secs(workers::SUPERVISOR_INTERVAL_SECS, &[], 5),
        }
    }
}

/// HTTP service settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Command line of the external decompiler
    pub m2c_cmd: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            bind: env_or(server::BIND, &[], || "127.0.0.1:8000".to_string()),
            m2c_cmd: env_or(decompiler::M2C_CMD, &[], || "python3 -m m2c.main".to_string()),
        }
    }
}

/// Observability: quiet, log_level, log_json, audit_log.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            load_dotenv();
            Self {
                quiet: env_bool(obv_keys::QUIET, &[], false),
                log_level: env_or(obv_keys::LOG_LEVEL, &[], || "cromper=info".to_string()),
                log_json: env_bool(obv_keys::LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::AUDIT_LOG, &[]),
            }
        })
    }
}
