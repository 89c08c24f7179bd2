//! Environment variable loading helpers.
//!
//! Keeps the primary → alias fallback chain in one place so business code
//! never calls `std::env::var` directly.

use std::env;
use std::time::Duration;

/// Load `./.env` into the process environment once (existing variables win).
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        if let Ok(content) = std::fs::read_to_string(&path) {
            for (key, value) in parse_dotenv(&content) {
                if env::var(&key).is_err() {
                    set_env_var(&key, &value);
                }
            }
        }
    });
}

/// Parse `.env` content into key/value pairs.
///
/// Blank lines and `#` comments are skipped; surrounding quotes are stripped
/// and an inline `# comment` is dropped when the value is unquoted.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

fn lookup(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
}

/// Read the primary variable or the first alias that is set; fall back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    lookup(primary, aliases)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read the primary variable or an alias as `Option` (empty values count as unset).
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary, aliases).and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Boolean variable: 0/false/no/off are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match lookup(primary, aliases).as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}

/// Unsigned integer variable; unparsable values fall back to `default` with a warning.
pub fn env_u64(primary: &str, aliases: &[&str], default: u64) -> u64 {
    match env_optional(primary, aliases) {
        Some(s) => s.parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default {}", primary, s, default);
            default
        }),
        None => default,
    }
}

/// Timeout variable expressed in whole seconds.
pub fn env_secs(primary: &str, aliases: &[&str], default_secs: u64) -> Duration {
    Duration::from_secs(env_u64(primary, aliases, default_secs))
}

// ─── Centralised env::set_var / remove_var wrappers ──────────────────────────
//
// SAFETY contract: callers invoke these before any worker threads or the
// tokio runtime start.

/// Set a single environment variable (the `unsafe` lives here only).
#[allow(unsafe_code)]
pub fn set_env_var(key: &str, value: &str) {
    unsafe { env::set_var(key, value) };
}

/// Initialise the environment for a worker child process: logs go quiet so
/// stdout stays reserved for the job protocol.
pub fn init_worker_env() {
    set_env_var(super::env_keys::observability::QUIET, "1");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_strips_quotes_and_comments() {
        let pairs = parse_dotenv(
            "# comment\n\nCROMPER_BIND=0.0.0.0:9000 # public\nWINE=\"wibo\"\nEMPTY=\nnot a pair\n",
        );
        assert_eq!(
            pairs,
            vec![
                ("CROMPER_BIND".to_string(), "0.0.0.0:9000".to_string()),
                ("WINE".to_string(), "wibo".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_dotenv_keeps_hash_inside_quotes() {
        let pairs = parse_dotenv("FLAGS='-O2 #keep'\n");
        assert_eq!(pairs[0].1, "-O2 #keep");
    }

    #[test]
    fn test_env_helpers_fall_back_to_defaults() {
        let key = "CROMPER_TEST_UNSET_VARIABLE_7f3a";
        assert_eq!(env_or(key, &[], || "fallback".to_string()), "fallback");
        assert_eq!(env_optional(key, &[]), None);
        assert!(env_bool(key, &[], true));
        assert_eq!(env_u64(key, &[], 42), 42);
    }

    #[test]
    fn test_env_alias_chain() {
        set_env_var("CROMPER_TEST_ALIAS_B_91c2", "7");
        assert_eq!(
            env_u64("CROMPER_TEST_ALIAS_A_91c2", &["CROMPER_TEST_ALIAS_B_91c2"], 1),
            7
        );
        set_env_var("CROMPER_TEST_BOOL_91c2", "off");
        assert!(!env_bool("CROMPER_TEST_BOOL_91c2", &[], true));
    }
}
