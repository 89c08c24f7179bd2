//! Observability: tracing init and the JSONL audit log.
//!
//! Uses cromper_core::config::ObservabilityConfig for CROMPER_QUIET,
//! CROMPER_LOG_LEVEL, CROMPER_LOG_JSON and CROMPER_AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use cromper_core::config::ObservabilityConfig;
use serde_json::{json, Value};
use tracing_subscriber::{prelude::*, EnvFilter};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call once at process startup.
/// With CROMPER_QUIET=1 (always set for worker processes) only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "cromper=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // Workers own stdout for the job protocol; logs always go to stderr.
    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = ObservabilityConfig::from_env().audit_log.clone()?;
    if path.is_empty() {
        return None;
    }
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Append one audit event; `fields` must be a JSON object.
fn audit(event: &str, mut fields: Value) {
    let Some(path) = get_audit_path() else {
        return;
    };
    if let Some(map) = fields.as_object_mut() {
        map.insert("ts".into(), json!(now()));
        map.insert("event".into(), json!(event));
        map.insert("pid".into(), json!(std::process::id()));
    }
    append_jsonl(&path, &fields);
}

/// Audit: execution_started, right before a toolchain runs.
///
/// `action` is the job kind, `toolchain` the compiler or platform id.
pub fn audit_execution_started(action: &str, toolchain: &str, sandboxed: bool, cwd: &str) {
    audit(
        "execution_started",
        json!({
            "action": action,
            "toolchain": toolchain,
            "sandboxed": sandboxed,
            "cwd": cwd,
        }),
    );
}

pub fn audit_execution_completed(
    action: &str,
    toolchain: &str,
    success: bool,
    duration_ms: u64,
    output_len: usize,
) {
    audit(
        "execution_completed",
        json!({
            "action": action,
            "toolchain": toolchain,
            "success": success,
            "duration_ms": duration_ms,
            "output_len": output_len,
        }),
    );
}

/// Audit: worker_restarted (supervisor or on-demand replacement)
pub fn audit_worker_restarted(worker_id: usize, reason: &str) {
    tracing::warn!(worker_id, reason = %reason, "Worker restarted");
    audit("worker_restarted", json!({ "worker_id": worker_id, "reason": reason }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_jsonl_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let path = path.to_str().unwrap();
        append_jsonl(path, &json!({"event": "execution_started", "toolchain": "ido7.1"}));
        append_jsonl(path, &json!({"event": "execution_completed", "success": true}));

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["toolchain"], "ido7.1");
        assert_eq!(lines[1]["success"], true);
    }

    #[test]
    fn test_timestamps_are_rfc3339_millis() {
        let ts = now();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
