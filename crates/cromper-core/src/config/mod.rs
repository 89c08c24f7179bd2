//! Unified configuration layer.
//!
//! All environment reads are centralised here; the rest of the workspace
//! reaches configuration through the typed structs.
//!
//! - `loader`: env_or, env_optional, env_bool, env_u64 helpers
//! - `schema`: SandboxConfig, PathsConfig, TimeoutConfig, WorkerConfig, ServerConfig, ObservabilityConfig
//! - `env_keys`: key constants (with legacy aliases)

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_secs, env_u64, init_worker_env, load_dotenv, set_env_var};
pub use schema::{
    ObservabilityConfig, PathsConfig, SandboxConfig, ServerConfig, TimeoutConfig, WorkerConfig,
};
