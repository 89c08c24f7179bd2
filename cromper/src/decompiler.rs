//! Decompiler collaborator: target assembly (plus optional context) in,
//! C source out. The production implementation shells out to m2c inside
//! the sandbox.

use std::path::Path;
use std::time::Duration;

use cromper_core::catalog::{Compiler, Platform};
use cromper_core::config::{PathsConfig, SandboxConfig};
use cromper_sandbox::{RunOptions, Sandbox, SandboxCommand, SandboxError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prepended when the decompiler only succeeded after dropping the context.
pub const CONTEXT_FAILED_PREAMBLE: &str = "/* Warning: failed to decompile with context, retrying without */";

#[derive(Debug, Error)]
pub enum M2CError {
    #[error("Decompiler command is not configured")]
    MissingCommand,

    #[error("{0}")]
    Failed(String),

    #[error("Decompiler timed out after {seconds:.2} seconds")]
    Timeout { seconds: f64 },

    #[error("Decompiler sandbox failure: {0}")]
    Sandbox(#[source] SandboxError),

    #[error("Failed to prepare decompiler input: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SandboxError> for M2CError {
    fn from(e: SandboxError) -> Self {
        match e {
            SandboxError::NonZeroExit { output, .. } => M2CError::Failed(output.trim().to_string()),
            SandboxError::Timeout { seconds } => M2CError::Timeout { seconds },
            other => M2CError::Sandbox(other),
        }
    }
}

pub trait Decompiler: Send + Sync {
    /// `triple` is `<arch>-<compiler family>`, e.g. `mips-ido`.
    fn decompile(&self, asm: &str, context: &str, triple: &str) -> Result<String, M2CError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompileRequest {
    pub platform_id: String,
    pub compiler_id: String,
    #[serde(default)]
    pub default_source_code: String,
    pub asm: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompileResult {
    pub decompiled_code: String,
}

pub fn triple(platform: &Platform, compiler: &Compiler) -> String {
    format!("{}-{}", platform.arch, compiler.family.m2c_name())
}

/// Default source annotated with why decompilation did not happen.
pub fn failure_source(default_source: &str, reason: &str) -> String {
    format!("/* Decompilation failure:\n\n{} */\n\n{}", reason, default_source)
}

/// Decompile, retrying without context if the context trips the decompiler.
/// Never fails: the default source (annotated) is the fallback.
pub fn decompile_or_default(decompiler: &dyn Decompiler, req: &DecompileRequest, triple: &str) -> String {
    if req.asm.trim().is_empty() {
        return req.default_source_code.clone();
    }
    match decompiler.decompile(&req.asm, &req.context, triple) {
        Ok(code) => code,
        Err(e) if !req.context.trim().is_empty() => {
            tracing::warn!("Decompiling with context failed, retrying without: {}", e);
            match decompiler.decompile(&req.asm, "", triple) {
                Ok(code) => format!("{}\n{}", CONTEXT_FAILED_PREAMBLE, code),
                Err(e) => failure_source(&req.default_source_code, &e.to_string()),
            }
        }
        Err(e) => failure_source(&req.default_source_code, &e.to_string()),
    }
}

pub struct M2cDecompiler {
    sandbox: SandboxConfig,
    paths: PathsConfig,
    command: String,
    timeout: Duration,
}

impl M2cDecompiler {
    pub fn new(sandbox: SandboxConfig, paths: PathsConfig, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            sandbox,
            paths,
            command: command.into(),
            timeout,
        }
    }
}

impl Decompiler for M2cDecompiler {
    fn decompile(&self, asm: &str, context: &str, triple: &str) -> Result<String, M2CError> {
        let mut argv: Vec<String> = self.command.split_whitespace().map(str::to_string).collect();
        if argv.is_empty() {
            return Err(M2CError::MissingCommand);
        }

        let sandbox = Sandbox::enter(&self.sandbox, &self.paths)?;
        let asm_path = sandbox.path().join("asm.s");
        std::fs::write(&asm_path, asm)?;

        argv.push("--target".to_string());
        argv.push(triple.to_string());
        if !context.trim().is_empty() {
            let ctx_path = sandbox.path().join("ctx.c");
            std::fs::write(&ctx_path, context)?;
            argv.push("--context".to_string());
            argv.push(path_str(&sandbox.rewrite_path(&ctx_path)));
        }
        argv.push(path_str(&sandbox.rewrite_path(&asm_path)));

        tracing::debug!("Decompiling for {}", triple);
        let out = sandbox.run(&SandboxCommand::Argv(argv), &RunOptions::with_timeout(self.timeout))?;
        Ok(out.stdout)
    }
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cromper_core::catalog::platforms;
    use cromper_core::Registry;
    use std::sync::Mutex;

    /// Fails whenever context is given; records the contexts it saw.
    struct ContextAllergic {
        seen: Mutex<Vec<String>>,
    }

    impl Decompiler for ContextAllergic {
        fn decompile(&self, _asm: &str, context: &str, triple: &str) -> Result<String, M2CError> {
            self.seen.lock().unwrap().push(context.to_string());
            if context.is_empty() {
                Ok(format!("s32 func(void) {{ return 5; }} // {}", triple))
            } else {
                Err(M2CError::Failed("Syntax error in context".to_string()))
            }
        }
    }

    struct AlwaysFails;

    impl Decompiler for AlwaysFails {
        fn decompile(&self, _: &str, _: &str, _: &str) -> Result<String, M2CError> {
            Err(M2CError::Failed("Unable to determine function".to_string()))
        }
    }

    fn request(asm: &str, context: &str) -> DecompileRequest {
        DecompileRequest {
            platform_id: "n64".to_string(),
            compiler_id: "ido7.1".to_string(),
            default_source_code: "void func(void) {}".to_string(),
            asm: asm.to_string(),
            context: context.to_string(),
        }
    }

    fn paths(dir: &Path) -> PathsConfig {
        PathsConfig {
            compiler_base: dir.join("compilers"),
            library_base: dir.join("libraries"),
        }
    }

    #[test]
    fn test_triple_uses_arch_and_family() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::builtin(paths(dir.path())).unwrap();
        let ido = registry.compiler("ido7.1").unwrap();
        assert_eq!(triple(&platforms::N64, ido), "mips-ido");
        let mwcc = registry.compiler("mwcc_233_163").unwrap();
        assert_eq!(triple(registry.platform_of(mwcc), mwcc), "ppc-mwcc");
    }

    #[test]
    fn test_retries_without_context() {
        let decompiler = ContextAllergic {
            seen: Mutex::new(Vec::new()),
        };
        let code = decompile_or_default(&decompiler, &request("jr $ra", "typedef int s32;"), "mips-ido");
        assert!(code.starts_with(CONTEXT_FAILED_PREAMBLE));
        assert!(code.contains("return 5;"));
        assert_eq!(*decompiler.seen.lock().unwrap(), vec!["typedef int s32;", ""]);
    }

    #[test]
    fn test_failure_falls_back_to_default_source() {
        let code = decompile_or_default(&AlwaysFails, &request("jr $ra", ""), "mips-ido");
        assert!(code.starts_with("/* Decompilation failure:"));
        assert!(code.contains("Unable to determine function"));
        assert!(code.ends_with("void func(void) {}"));

        let code = decompile_or_default(&AlwaysFails, &request("  \n", ""), "mips-ido");
        assert_eq!(code, "void func(void) {}");
    }

    #[test]
    fn test_m2c_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let echo = M2cDecompiler::new(SandboxConfig::unjailed(), paths(dir.path()), "echo", Duration::from_secs(5));
        let out = echo.decompile("jr $ra\n", "typedef int s32;", "mips-ido").unwrap();
        assert!(out.starts_with("--target mips-ido --context "));
        assert!(out.trim_end().ends_with("asm.s"));

        let out = echo.decompile("jr $ra\n", "", "mips-gcc").unwrap();
        assert!(!out.contains("--context"));
    }

    #[test]
    fn test_m2c_errors() {
        let dir = tempfile::tempdir().unwrap();
        let failing = M2cDecompiler::new(SandboxConfig::unjailed(), paths(dir.path()), "false", Duration::from_secs(5));
        assert!(matches!(failing.decompile("nop", "", "mips-ido"), Err(M2CError::Failed(_))));

        let missing = M2cDecompiler::new(SandboxConfig::unjailed(), paths(dir.path()), "  ", Duration::from_secs(5));
        assert!(matches!(missing.decompile("nop", "", "mips-ido"), Err(M2CError::MissingCommand)));
    }
}
