//! Process spawning shared by every sandboxed invocation.
//!
//! stdout and stderr of the child are pointed at the same pipe so the
//! captured text keeps the interleaving the toolchain produced. The child is
//! placed in its own process group; on timeout the whole group is killed so a
//! shell wrapper cannot leave a grandchild holding the pipe open.

use std::fs::File;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::fcntl::OFlag;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{pipe2, Pid};

use crate::error::SandboxError;

/// Poll interval while waiting for the child to exit
pub const WAIT_POLL_INTERVAL_MS: u64 = 10;

/// Captured output beyond this is drained and discarded
pub const MAX_OUTPUT_BYTES: u64 = 8 * 1024 * 1024;

pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Merged stdout + stderr
    pub output: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// Spawn `cmd` with merged output and wait for it, killing it after `timeout`.
pub fn run_merged(mut cmd: Command, timeout: Option<Duration>) -> Result<ProcessOutput, SandboxError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let (read_end, write_end) =
        pipe2(OFlag::O_CLOEXEC).map_err(|e| SandboxError::Setup(format!("pipe: {}", e)))?;
    let write_dup = write_end.try_clone()?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(write_end))
        .stderr(Stdio::from(write_dup))
        .process_group(0);

    let spawned = cmd.spawn();
    // The Command still owns our copies of the write end; drop it so the
    // reader sees EOF once the child exits.
    drop(cmd);
    let mut child = spawned.map_err(|source| SandboxError::Spawn { program, source })?;

    let reader = thread::spawn(move || capture(File::from(read_end), MAX_OUTPUT_BYTES));

    wait_with_timeout(&mut child, reader, timeout)
}

/// Read at most `limit` bytes, then keep draining so the writer never blocks.
fn capture<R: Read>(mut source: R, limit: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = (&mut source).take(limit).read_to_end(&mut buf);
    let dropped = io::copy(&mut source, &mut io::sink()).unwrap_or(0);
    if dropped > 0 {
        tracing::warn!("Discarded {} bytes of output past the {} byte cap", dropped, limit);
        buf.extend_from_slice(TRUNCATION_MARKER.as_bytes());
    }
    buf
}

/// Wait for child process with timeout.
///
/// The output pipe is drained on a background thread while the process runs;
/// without it a child writing more than the pipe buffer would block forever.
pub fn wait_with_timeout(
    child: &mut Child,
    reader: JoinHandle<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, SandboxError> {
    let start = Instant::now();
    let check_interval = Duration::from_millis(WAIT_POLL_INTERVAL_MS);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                // Reap anything the command left running in its group.
                kill_group(child);
                let output = reader.join().unwrap_or_default();
                return Ok(ProcessOutput {
                    output: String::from_utf8_lossy(&output).into_owned(),
                    exit_code: status.code().unwrap_or(-1),
                    timed_out: false,
                    elapsed: start.elapsed(),
                });
            }
            Ok(None) => {}
            Err(e) => {
                kill_group(child);
                let _ = child.wait();
                let _ = reader.join();
                return Err(SandboxError::Io(e));
            }
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                kill_group(child);
                let _ = child.kill();
                let _ = child.wait();
                let output = reader.join().unwrap_or_default();
                return Ok(ProcessOutput {
                    output: String::from_utf8_lossy(&output).into_owned(),
                    exit_code: -1,
                    timed_out: true,
                    elapsed: start.elapsed(),
                });
            }
        }

        thread::sleep(check_interval);
    }
}

fn kill_group(child: &Child) {
    let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
}
