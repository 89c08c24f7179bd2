use std::io::{self, BufReader, Write};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PoolError;
use crate::protocol::{read_line_limited, JobAction, JobRequest, JobResponse};

/// Called with `(worker id, reason)` after a worker process is replaced.
pub type RestartHook = Arc<dyn Fn(usize, &str) + Send + Sync>;

/// How to launch one worker process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn spawn(&self) -> Result<Process, PoolError> {
        let spawn_err = |source: io::Error| PoolError::Spawn {
            program: self.program.display().to_string(),
            source,
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .process_group(0)
            .spawn()
            .map_err(spawn_err)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => Ok(Process {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                Err(spawn_err(io::Error::new(io::ErrorKind::BrokenPipe, "worker stdio unavailable")))
            }
        }
    }
}

/// A running worker child, leading its own process group; the group is
/// killed and the child reaped on drop.
struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Process {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn call(&mut self, request: &JobRequest) -> io::Result<JobResponse> {
        let line = serde_json::to_string(request)?;
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;
        match read_line_limited(&mut self.stdout)? {
            Some(line) => Ok(serde_json::from_str(&line)?),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "worker closed its output")),
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        let _ = killpg(Pid::from_raw(self.child.id() as i32), Signal::SIGKILL);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Starting,
    Running,
    Dead,
    Restarting,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealth {
    pub id: usize,
    pub state: WorkerState,
    pub pid: Option<u32>,
    pub restarts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub workers: Vec<WorkerHealth>,
    pub queued: usize,
}

struct Slot {
    id: usize,
    state: Mutex<WorkerState>,
    /// Held by the slot thread for the whole of a job
    process: Mutex<Option<Process>>,
    pid: AtomicU32,
    restarts: AtomicU64,
}

impl Slot {
    fn set_state(&self, state: WorkerState) {
        *lock(&self.state) = state;
    }
}

struct Job {
    id: u64,
    action: JobAction,
    payload: Value,
    created_ms: i64,
    /// The submitter stops waiting at this point
    deadline: Instant,
    reply: SyncSender<Result<Value, String>>,
}

struct Shared {
    command: WorkerCommand,
    slots: Vec<Slot>,
    queue: Mutex<Receiver<Job>>,
    queued: AtomicUsize,
    shutdown: AtomicBool,
    on_restart: Option<RestartHook>,
}

/// Fixed-size set of supervised worker processes.
pub struct WorkerPool {
    shared: Arc<Shared>,
    sender: Option<Sender<Job>>,
    stop_supervisor: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
    next_id: AtomicU64,
}

impl WorkerPool {
    pub fn new(command: WorkerCommand, count: usize, supervisor_interval: Duration) -> Result<Self, PoolError> {
        Self::with_restart_hook(command, count, supervisor_interval, None)
    }

    /// Start `count` workers now; fails if any of them cannot be spawned.
    pub fn with_restart_hook(
        command: WorkerCommand,
        count: usize,
        supervisor_interval: Duration,
        on_restart: Option<RestartHook>,
    ) -> Result<Self, PoolError> {
        let count = count.max(1);
        let mut slots = Vec::with_capacity(count);
        for id in 0..count {
            let slot = Slot {
                id,
                state: Mutex::new(WorkerState::Starting),
                process: Mutex::new(None),
                pid: AtomicU32::new(0),
                restarts: AtomicU64::new(0),
            };
            let process = command.spawn()?;
            slot.pid.store(process.pid(), Ordering::SeqCst);
            *lock(&slot.process) = Some(process);
            slot.set_state(WorkerState::Running);
            slots.push(slot);
        }

        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            command,
            slots,
            queue: Mutex::new(receiver),
            queued: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            on_restart,
        });

        let mut threads = Vec::with_capacity(count + 1);
        for index in 0..count {
            let shared = Arc::clone(&shared);
            threads.push(thread::spawn(move || run_slot(shared, index)));
        }
        let (stop_supervisor, stop) = mpsc::channel();
        {
            let shared = Arc::clone(&shared);
            threads.push(thread::spawn(move || supervise(shared, stop, supervisor_interval)));
        }
        tracing::info!("Started {} workers", count);

        Ok(Self {
            shared,
            sender: Some(sender),
            stop_supervisor: Some(stop_supervisor),
            threads,
            next_id: AtomicU64::new(1),
        })
    }

    /// Enqueue a job and wait up to `timeout` for its result.
    ///
    /// The worker is never interrupted; after a timeout it finishes (or is
    /// stopped by its own sandbox timeout) and the late result is discarded.
    pub fn try_submit(&self, action: JobAction, payload: Value, timeout: Duration) -> Result<Value, PoolError> {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, result) = mpsc::sync_channel(1);
        let job = Job {
            id,
            action,
            payload,
            created_ms: chrono::Utc::now().timestamp_millis(),
            deadline: Instant::now() + timeout,
            reply,
        };

        self.shared.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(PoolError::Closed);
        }

        match result.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(PoolError::Job { id, message }),
            Err(RecvTimeoutError::Timeout) => Err(PoolError::Timeout {
                id,
                seconds: timeout.as_secs_f64(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::Disconnected { id }),
        }
    }

    /// [`try_submit`](Self::try_submit), answering `default` on any failure.
    pub fn submit(&self, action: JobAction, payload: Value, timeout: Duration, default: Value) -> Value {
        match self.try_submit(action, payload, timeout) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("{} job returned default result: {}", action, e);
                default
            }
        }
    }

    /// Typed [`try_submit`](Self::try_submit).
    pub fn run<P: Serialize, R: DeserializeOwned>(
        &self,
        action: JobAction,
        payload: &P,
        timeout: Duration,
    ) -> Result<R, PoolError> {
        let payload = serde_json::to_value(payload)?;
        let value = self.try_submit(action, payload, timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn health(&self) -> PoolHealth {
        let workers = self
            .shared
            .slots
            .iter()
            .map(|slot| WorkerHealth {
                id: slot.id,
                state: *lock(&slot.state),
                pid: match slot.pid.load(Ordering::SeqCst) {
                    0 => None,
                    pid => Some(pid),
                },
                restarts: slot.restarts.load(Ordering::SeqCst),
            })
            .collect();
        PoolHealth {
            workers,
            queued: self.shared.queued.load(Ordering::SeqCst),
        }
    }

    pub fn size(&self) -> usize {
        self.shared.slots.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.sender.take();
        self.stop_supervisor.take();
        // Unblocks slot threads waiting on a worker reply
        for slot in &self.shared.slots {
            let pid = slot.pid.load(Ordering::SeqCst);
            if pid != 0 {
                let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the slot's process (caller holds the process lock).
fn restart(shared: &Shared, slot: &Slot, process: &mut Option<Process>, reason: &str) {
    process.take();
    slot.set_state(WorkerState::Restarting);
    match shared.command.spawn() {
        Ok(fresh) => {
            slot.pid.store(fresh.pid(), Ordering::SeqCst);
            *process = Some(fresh);
            slot.restarts.fetch_add(1, Ordering::SeqCst);
            slot.set_state(WorkerState::Running);
            tracing::warn!("Restarted worker {} ({})", slot.id, reason);
            if let Some(hook) = &shared.on_restart {
                hook(slot.id, reason);
            }
        }
        Err(e) => {
            slot.pid.store(0, Ordering::SeqCst);
            slot.set_state(WorkerState::Dead);
            tracing::error!("Could not restart worker {}: {}", slot.id, e);
        }
    }
}

fn run_slot(shared: Arc<Shared>, index: usize) {
    let slot = &shared.slots[index];
    loop {
        let next = lock(&shared.queue).recv();
        let Ok(job) = next else {
            break;
        };
        shared.queued.fetch_sub(1, Ordering::SeqCst);

        if Instant::now() >= job.deadline {
            let waited = chrono::Utc::now().timestamp_millis() - job.created_ms;
            tracing::warn!("Dropping stale {} job {} after {}ms in queue", job.action, job.id, waited);
            continue;
        }

        let mut process = lock(&slot.process);
        if process.is_none() {
            if shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
            restart(&shared, slot, &mut process, "no running process");
        }
        let Some(worker) = process.as_mut() else {
            // Dropping the reply tells the caller the job was lost
            continue;
        };

        let request = JobRequest {
            id: job.id,
            action: job.action,
            created_ms: job.created_ms,
            payload: job.payload,
        };
        match worker.call(&request) {
            Ok(response) => {
                if response.id != job.id {
                    tracing::warn!("Worker {} answered job {} with id {}", slot.id, job.id, response.id);
                }
                let _ = job.reply.send(response.into_result());
            }
            Err(e) => {
                if !shared.shutdown.load(Ordering::SeqCst) {
                    tracing::warn!("Worker {} lost job {}: {}", slot.id, job.id, e);
                }
                process.take();
                slot.pid.store(0, Ordering::SeqCst);
                slot.set_state(WorkerState::Dead);
            }
        }
    }
}

fn supervise(shared: Arc<Shared>, stop: Receiver<()>, interval: Duration) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }
        for slot in &shared.slots {
            // A busy slot is mid-job; its own thread notices a dead worker.
            let Ok(mut process) = slot.process.try_lock() else {
                continue;
            };
            let reason = match process.as_mut().map(Process::is_alive) {
                Some(true) => continue,
                Some(false) => "process exited",
                None => "no running process",
            };
            if shared.shutdown.load(Ordering::SeqCst) {
                return;
            }
            slot.set_state(WorkerState::Dead);
            restart(&shared, slot, &mut process, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    /// Answers with the job's action; `"slow"` payloads sleep, `"fail"` errors.
    const SCRIPT: &str = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed 's/^{"id":\([0-9]*\).*/\1/')
  action=$(printf '%s' "$line" | sed 's/.*"action":"\([a-z]*\)".*/\1/')
  case "$line" in
    *'"payload":"slow"'*) sleep 5 ;;
    *'"payload":"fail"'*) printf '{"id":%s,"error":"boom"}\n' "$id"; continue ;;
  esac
  printf '{"id":%s,"result":"%s"}\n' "$id" "$action"
done
"#;

    fn command() -> WorkerCommand {
        WorkerCommand::new("/bin/sh").arg("-c").arg(SCRIPT)
    }

    fn pool(count: usize) -> WorkerPool {
        WorkerPool::new(command(), count, Duration::from_millis(100)).unwrap()
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_jobs_round_trip() {
        let pool = pool(2);
        let timeout = Duration::from_secs(5);
        assert_eq!(pool.try_submit(JobAction::Compile, json!({}), timeout).unwrap(), json!("compile"));
        let decompiled: String = pool.run(JobAction::Decompile, &json!({"asm": "nop"}), timeout).unwrap();
        assert_eq!(decompiled, "decompile");

        let pool = Arc::new(pool);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.submit(JobAction::Assemble, json!({}), timeout, json!(null)))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), json!("assemble"));
        }
    }

    #[test]
    fn test_timeout_returns_default() {
        let pool = pool(1);
        let default = json!({"success": false, "errors": "Compilation timeout expired"});
        let start = Instant::now();
        let result = pool.submit(JobAction::Compile, json!("slow"), Duration::from_millis(10), default.clone());
        assert_eq!(result, default);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_job_errors() {
        let pool = pool(1);
        let err = pool
            .try_submit(JobAction::Compile, json!("fail"), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, PoolError::Job { ref message, .. } if message == "boom"));
        assert!(!err.is_timeout());
        let fallback = pool.submit(JobAction::Compile, json!("fail"), Duration::from_secs(5), json!("default"));
        assert_eq!(fallback, json!("default"));
    }

    #[test]
    fn test_killed_worker_is_replaced() {
        let restarts = Arc::new(AtomicUsize::new(0));
        let hook: RestartHook = {
            let restarts = Arc::clone(&restarts);
            Arc::new(move |_, _| {
                restarts.fetch_add(1, Ordering::SeqCst);
            })
        };
        let pool = WorkerPool::with_restart_hook(command(), 1, Duration::from_millis(100), Some(hook)).unwrap();
        let health = pool.health();
        assert_eq!(health.workers[0].state, WorkerState::Running);
        let old_pid = health.workers[0].pid.unwrap();

        killpg(Pid::from_raw(old_pid as i32), Signal::SIGKILL).unwrap();
        assert!(wait_for(|| {
            let w = &pool.health().workers[0];
            w.restarts == 1 && w.state == WorkerState::Running
        }));
        let worker = &pool.health().workers[0];
        assert_ne!(worker.pid, Some(old_pid));
        assert_eq!(restarts.load(Ordering::SeqCst), 1);

        let result = pool.try_submit(JobAction::Compile, json!({}), Duration::from_secs(5));
        assert_eq!(result.unwrap(), json!("compile"));
    }

    #[test]
    fn test_worker_killed_mid_job() {
        let pool = Arc::new(pool(1));
        let submitter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let start = Instant::now();
                let result = pool.try_submit(JobAction::Compile, json!("slow"), Duration::from_secs(4));
                (result, start.elapsed())
            })
        };
        assert!(wait_for(|| pool.health().queued == 0));
        thread::sleep(Duration::from_millis(200));
        let pid = pool.health().workers[0].pid.unwrap();
        killpg(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();

        let (result, elapsed) = submitter.join().unwrap();
        assert!(matches!(result, Err(PoolError::Disconnected { .. })));
        assert!(elapsed < Duration::from_secs(4));

        let again = pool.try_submit(JobAction::Assemble, json!({}), Duration::from_secs(5));
        assert_eq!(again.unwrap(), json!("assemble"));
    }

    #[test]
    fn test_stale_jobs_never_reach_a_worker() {
        // Logs every action it receives; "slow" jobs hold the worker for a second.
        const LOGGING_SCRIPT: &str = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed 's/^{"id":\([0-9]*\).*/\1/')
  action=$(printf '%s' "$line" | sed 's/.*"action":"\([a-z]*\)".*/\1/')
  echo "$action" >> "$JOB_LOG"
  case "$line" in
    *'"payload":"slow"'*) sleep 1 ;;
  esac
  printf '{"id":%s,"result":"%s"}\n' "$id" "$action"
done
"#;
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("jobs.log");
        let command = WorkerCommand::new("/bin/sh")
            .arg("-c")
            .arg(LOGGING_SCRIPT)
            .env("JOB_LOG", log.to_string_lossy());
        let pool = Arc::new(WorkerPool::new(command, 1, Duration::from_secs(60)).unwrap());

        let busy = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.try_submit(JobAction::Compile, json!("slow"), Duration::from_secs(5)))
        };
        assert!(wait_for(|| pool.health().queued == 0));

        // Queued behind the slow job; its caller gives up long before a worker is free.
        let stale = pool.try_submit(JobAction::Assemble, json!({}), Duration::from_millis(50));
        assert!(matches!(stale, Err(PoolError::Timeout { .. })));
        assert_eq!(busy.join().unwrap().unwrap(), json!("compile"));

        let next = pool.try_submit(JobAction::Decompile, json!({}), Duration::from_secs(5));
        assert_eq!(next.unwrap(), json!("decompile"));
        let executed = std::fs::read_to_string(&log).unwrap();
        assert_eq!(executed.lines().collect::<Vec<_>>(), vec!["compile", "decompile"]);
    }

    #[test]
    fn test_spawn_failure() {
        let result = WorkerPool::new(WorkerCommand::new("/nonexistent/cromper"), 1, Duration::from_secs(1));
        assert!(matches!(result, Err(PoolError::Spawn { .. })));
    }

    #[test]
    fn test_health_serializes() {
        let pool = pool(2);
        assert_eq!(pool.size(), 2);
        let json = serde_json::to_value(pool.health()).unwrap();
        assert_eq!(json["workers"].as_array().unwrap().len(), 2);
        assert_eq!(json["workers"][0]["state"], "running");
        assert_eq!(json["queued"], 0);
    }
}
