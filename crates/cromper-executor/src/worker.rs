//! Worker-process side of the pool: answer jobs read from stdin.

use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::error::JobError;
use crate::protocol::{read_line_limited, JobAction, JobRequest, JobResponse};

/// Executes one job. Implemented by the binary with the real wrappers.
pub trait JobHandler {
    fn handle(&self, action: JobAction, payload: Value) -> Result<Value, JobError>;
}

/// Serve jobs from `input` until EOF, one response line per request line.
///
/// A failing or panicking job becomes an `error` response; the loop only
/// stops on EOF or when `output` can no longer be written.
pub fn serve<R: BufRead, W: Write>(handler: &dyn JobHandler, mut input: R, mut output: W) -> io::Result<()> {
    loop {
        let line = match read_line_limited(&mut input) {
            Ok(None) => break,
            Ok(Some(line)) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                write_response(&mut output, &JobResponse::err(0, format!("Request error: {}", e)))?;
                continue;
            }
            Err(e) => return Err(e),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JobRequest>(line) {
            Ok(request) => run_job(handler, request),
            Err(e) => JobResponse::err(0, format!("Parse error: {}", e)),
        };
        write_response(&mut output, &response)?;
    }
    Ok(())
}

/// [`serve`] over the process's stdin/stdout.
pub fn serve_stdio(handler: &dyn JobHandler) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(handler, stdin.lock(), stdout.lock())
}

fn run_job(handler: &dyn JobHandler, request: JobRequest) -> JobResponse {
    let JobRequest {
        id,
        action,
        created_ms,
        payload,
    } = request;
    let waited = chrono::Utc::now().timestamp_millis() - created_ms;
    tracing::debug!("Job {} ({}) picked up after {}ms", id, action, waited);

    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(action, payload))) {
        Ok(Ok(result)) => JobResponse::ok(id, result),
        Ok(Err(e)) => JobResponse::err(id, e.to_string()),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Job {} ({}) panicked: {}", id, action, message);
            JobResponse::err(id, format!("Worker panicked: {}", message))
        }
    }
}

fn write_response<W: Write>(output: &mut W, response: &JobResponse) -> io::Result<()> {
    let line = serde_json::to_string(response)?;
    writeln!(output, "{}", line)?;
    output.flush()
}
