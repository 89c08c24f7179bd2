use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use cromper_core::config::{PathsConfig, SandboxConfig};
use tempfile::TempDir;

use crate::common::run_merged;
use crate::error::SandboxError;
use crate::info_log;
use crate::jail::JailSpec;

const WINE_SCRATCH_DIR: &str = ".wine-tmp";

/// What to execute: a shell snippet (`sh -c`) or an argv list.
#[derive(Debug, Clone)]
pub enum SandboxCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl SandboxCommand {
    fn describe(&self) -> String {
        match self {
            SandboxCommand::Shell(s) => s.clone(),
            SandboxCommand::Argv(argv) => argv.join(" "),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Extra host paths mounted read-only inside the jail
    pub mounts: Vec<PathBuf>,
    /// Passed through the real environment; only the names reach the jail argv
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Merged stdout + stderr
    pub stdout: String,
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// One scoped scratch directory plus the means to run commands inside it.
///
/// The directory is removed when the sandbox is dropped, on every exit path.
#[derive(Debug)]
pub struct Sandbox {
    dir: TempDir,
    config: SandboxConfig,
    paths: PathsConfig,
}

impl Sandbox {
    pub fn enter(config: &SandboxConfig, paths: &PathsConfig) -> Result<Self, SandboxError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("cromper-");
            b
        };
        let dir = if config.use_jail {
            std::fs::create_dir_all(&config.tmp_path).map_err(|e| {
                SandboxError::Setup(format!("create {}: {}", config.tmp_path.display(), e))
            })?;
            builder.tempdir_in(&config.tmp_path)
        } else {
            builder.tempdir()
        }
        .map_err(|e| SandboxError::Setup(format!("create scratch dir: {}", e)))?;

        tracing::debug!("Entered sandbox {}", dir.path().display());
        Ok(Self {
            dir,
            config: config.clone(),
            paths: paths.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn is_jailed(&self) -> bool {
        self.config.use_jail
    }

    /// Host path as seen by the sandboxed process.
    ///
    /// Only paths inside the scratch dir move (onto the jail's `/tmp`); all
    /// others, and everything when unjailed, are returned unchanged.
    pub fn rewrite_path(&self, path: &Path) -> PathBuf {
        if !self.config.use_jail {
            return path.to_path_buf();
        }
        match path.strip_prefix(self.dir.path()) {
            Ok(rel) => Path::new("/tmp").join(rel),
            Err(_) => path.to_path_buf(),
        }
    }

    /// Wrapper argv to prepend to a command. Empty when jailing is disabled.
    pub fn sandbox_command(
        &self,
        mounts: &[PathBuf],
        env_names: &[String],
    ) -> Result<Vec<String>, SandboxError> {
        if !self.config.use_jail {
            return Ok(Vec::new());
        }
        let wine_scratch = self.dir.path().join(WINE_SCRATCH_DIR);
        std::fs::create_dir_all(&wine_scratch)
            .map_err(|e| SandboxError::Setup(format!("create {}: {}", wine_scratch.display(), e)))?;
        let spec = JailSpec {
            config: &self.config,
            paths: &self.paths,
            scratch: self.dir.path(),
            wine_scratch: &wine_scratch,
            uid: nix::unistd::getuid().as_raw(),
            extra_mounts: mounts,
            env_names,
        };
        Ok(spec.build())
    }

    /// Run `command` inside the sandbox.
    ///
    /// Non-zero exit and timeout are errors; the former carries the merged output.
    pub fn run(&self, command: &SandboxCommand, opts: &RunOptions) -> Result<RunOutput, SandboxError> {
        let env_names: Vec<String> = opts.env.keys().cloned().collect();
        let wrapper = self.sandbox_command(&opts.mounts, &env_names)?;

        let mut argv = wrapper;
        match command {
            SandboxCommand::Shell(script) => {
                argv.push("/bin/sh".to_string());
                argv.push("-c".to_string());
                argv.push(script.clone());
            }
            SandboxCommand::Argv(list) => {
                if list.is_empty() {
                    return Err(SandboxError::Setup("empty command".to_string()));
                }
                argv.extend(list.iter().cloned());
            }
        }

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).envs(&opts.env);
        if !self.config.use_jail {
            cmd.current_dir(self.dir.path());
        }

        info_log!("Sandbox run: {}", command.describe());
        let out = run_merged(cmd, opts.timeout)?;
        tracing::debug!(
            exit_code = out.exit_code,
            elapsed_ms = out.elapsed.as_millis() as u64,
            "Sandbox command finished"
        );

        if out.timed_out {
            return Err(SandboxError::Timeout {
                seconds: opts.timeout.unwrap_or_default().as_secs_f64(),
            });
        }
        if out.exit_code != 0 {
            return Err(SandboxError::NonZeroExit {
                code: out.exit_code,
                output: out.output,
            });
        }
        Ok(RunOutput {
            stdout: out.output,
            exit_code: out.exit_code,
            elapsed: out.elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> PathsConfig {
        PathsConfig {
            compiler_base: PathBuf::from("/srv/compilers"),
            library_base: PathBuf::from("/srv/libraries"),
        }
    }

    fn jailed(tmp: &Path) -> SandboxConfig {
        SandboxConfig {
            use_jail: true,
            tmp_path: tmp.to_path_buf(),
            ..SandboxConfig::unjailed()
        }
    }

    #[test]
    fn test_unjailed_sandbox_command_is_empty() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let cmd = sandbox
            .sandbox_command(&[PathBuf::from("/opt")], &["INPUT".to_string()])
            .unwrap();
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_rewrite_path_unjailed_is_identity() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let inside = sandbox.path().join("code.c");
        assert_eq!(sandbox.rewrite_path(&inside), inside);
    }

    #[test]
    fn test_rewrite_path_jailed() {
        let root = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::enter(&jailed(root.path()), &paths()).unwrap();
        assert!(sandbox.path().starts_with(root.path()));

        let inside = sandbox.path().join("x");
        assert_eq!(sandbox.rewrite_path(&inside), PathBuf::from("/tmp/x"));

        let outside = PathBuf::from("/srv/compilers/n64/ido5.3");
        let once = sandbox.rewrite_path(&outside);
        assert_eq!(once, outside);
        assert_eq!(sandbox.rewrite_path(&once), once);
    }

    #[test]
    fn test_jailed_command_passes_env_names_only() {
        let root = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::enter(&jailed(root.path()), &paths()).unwrap();
        let cmd = sandbox
            .sandbox_command(&[], &["COMPILER_FLAGS".to_string()])
            .unwrap();
        assert!(cmd.contains(&"COMPILER_FLAGS".to_string()));
        assert!(!cmd.iter().any(|a| a.contains("-O2")));
        assert!(sandbox.path().join(WINE_SCRATCH_DIR).is_dir());
    }

    #[test]
    fn test_run_shell_with_env() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let opts = RunOptions::default().env("GREETING", "it's $HOME");
        let out = sandbox
            .run(&SandboxCommand::Shell("printf '%s' \"$GREETING\"".to_string()), &opts)
            .unwrap();
        assert_eq!(out.stdout, "it's $HOME");
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn test_run_in_scratch_dir() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        sandbox
            .run(
                &SandboxCommand::Argv(vec!["touch".to_string(), "made".to_string()]),
                &RunOptions::default(),
            )
            .unwrap();
        assert!(sandbox.path().join("made").exists());
    }

    #[test]
    fn test_non_zero_exit_keeps_output() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let err = sandbox
            .run(
                &SandboxCommand::Shell("echo boom 1>&2; exit 3".to_string()),
                &RunOptions::default(),
            )
            .unwrap_err();
        match err {
            SandboxError::NonZeroExit { code, output } => {
                assert_eq!(code, 3);
                assert_eq!(output, "boom\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_is_distinct() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let err = sandbox
            .run(
                &SandboxCommand::Shell("sleep 30".to_string()),
                &RunOptions::with_timeout(Duration::from_millis(100)),
            )
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.output().is_none());
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let dir = sandbox.path().to_path_buf();
        std::fs::write(dir.join("a.o"), b"obj").unwrap();
        let _ = sandbox.run(
            &SandboxCommand::Shell("exit 1".to_string()),
            &RunOptions::default(),
        );
        drop(sandbox);
        assert!(!dir.exists());
    }

    #[test]
    fn test_empty_argv_is_setup_error() {
        let sandbox = Sandbox::enter(&SandboxConfig::unjailed(), &paths()).unwrap();
        let err = sandbox
            .run(&SandboxCommand::Argv(vec![]), &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, SandboxError::Setup(_)));
    }
}
