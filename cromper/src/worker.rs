//! Job dispatch inside a worker process (and for `serve --inline`).

use std::sync::Arc;
use std::time::Instant;

use cromper_compiler::{
    AssembleRequest, AssemblerWrapper, AssemblyCache, AssemblyError, CompilationError, CompileRequest,
    CompilerWrapper,
};
use cromper_core::config::{SandboxConfig, ServerConfig, TimeoutConfig};
use cromper_core::Registry;
use cromper_executor::{JobAction, JobError, JobHandler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::decompiler::{self, DecompileRequest, DecompileResult, Decompiler, M2cDecompiler};
use crate::observability;

pub struct Handler {
    registry: &'static Registry,
    sandbox: SandboxConfig,
    timeouts: TimeoutConfig,
    /// Per process; not shared between pool workers
    assembly_cache: Arc<AssemblyCache>,
    decompiler: Arc<dyn Decompiler>,
}

impl Handler {
    pub fn new(
        registry: &'static Registry,
        sandbox: SandboxConfig,
        timeouts: TimeoutConfig,
        decompiler: Arc<dyn Decompiler>,
    ) -> Self {
        Self {
            registry,
            sandbox,
            timeouts,
            assembly_cache: Arc::new(AssemblyCache::default()),
            decompiler,
        }
    }

    /// Sandbox, timeouts and the m2c command from the environment.
    pub fn from_env(registry: &'static Registry) -> Self {
        let sandbox = SandboxConfig::from_env();
        let timeouts = TimeoutConfig::from_env();
        let decompiler = M2cDecompiler::new(
            sandbox.clone(),
            registry.paths().clone(),
            ServerConfig::from_env().m2c_cmd,
            timeouts.decompilation,
        );
        Self::new(registry, sandbox, timeouts, Arc::new(decompiler))
    }

    fn compile(&self, req: CompileRequest) -> Result<Value, JobError> {
        let cwd = self.cwd();
        observability::audit_execution_started("compile", &req.compiler_id, self.sandbox.use_jail, &cwd);
        let start = Instant::now();
        let wrapper = CompilerWrapper::new(self.registry, self.sandbox.clone(), self.timeouts.compilation);
        let result = wrapper.compile(&req).map_err(compile_error)?;
        observability::audit_execution_completed(
            "compile",
            &req.compiler_id,
            result.success(),
            start.elapsed().as_millis() as u64,
            result.errors.len(),
        );
        to_value(&result)
    }

    fn assemble(&self, req: AssembleRequest) -> Result<Value, JobError> {
        let cwd = self.cwd();
        observability::audit_execution_started("assemble", &req.platform_id, self.sandbox.use_jail, &cwd);
        let start = Instant::now();
        let wrapper = AssemblerWrapper::new(
            self.registry,
            self.sandbox.clone(),
            self.timeouts.assembly,
            Arc::clone(&self.assembly_cache),
        );
        let result = wrapper.assemble(&req).map_err(assemble_error)?;
        observability::audit_execution_completed(
            "assemble",
            &req.platform_id,
            result.success(),
            start.elapsed().as_millis() as u64,
            result.errors.len(),
        );
        to_value(&result)
    }

    fn decompile(&self, req: DecompileRequest) -> Result<Value, JobError> {
        let platform = self
            .registry
            .platform(&req.platform_id)
            .map_err(|e| JobError::Unsupported(e.to_string()))?;
        let compiler = self
            .registry
            .compiler(&req.compiler_id)
            .map_err(|e| JobError::Unsupported(e.to_string()))?;
        let decompiled_code = if platform.has_decompiler {
            let triple = decompiler::triple(platform, compiler);
            decompiler::decompile_or_default(self.decompiler.as_ref(), &req, &triple)
        } else {
            decompiler::failure_source(
                &req.default_source_code,
                &format!("No decompiler is available for platform {}", platform.id),
            )
        };
        to_value(&DecompileResult { decompiled_code })
    }

    fn cwd(&self) -> String {
        std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl JobHandler for Handler {
    fn handle(&self, action: JobAction, payload: Value) -> Result<Value, JobError> {
        match action {
            JobAction::Compile => self.compile(from_value(payload)?),
            JobAction::Assemble => self.assemble(from_value(payload)?),
            JobAction::Decompile => self.decompile(from_value(payload)?),
        }
    }
}

fn from_value<T: DeserializeOwned>(payload: Value) -> Result<T, JobError> {
    Ok(serde_json::from_value(payload)?)
}

fn to_value<T: Serialize>(result: &T) -> Result<Value, JobError> {
    Ok(serde_json::to_value(result)?)
}

fn compile_error(e: CompilationError) -> JobError {
    if e.is_client_error() {
        JobError::Unsupported(e.to_string())
    } else {
        JobError::Failed(e.to_string())
    }
}

fn assemble_error(e: AssemblyError) -> JobError {
    if e.is_client_error() {
        JobError::Unsupported(e.to_string())
    } else {
        JobError::Failed(e.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::decompiler::M2CError;
    use cromper_compiler::{AssemblyResult, CompilationResult};
    use cromper_core::config::PathsConfig;
    use serde_json::json;

    pub(crate) struct CannedDecompiler;

    impl Decompiler for CannedDecompiler {
        fn decompile(&self, _asm: &str, _context: &str, triple: &str) -> Result<String, M2CError> {
            Ok(format!("? func(); // {}", triple))
        }
    }

    pub(crate) fn test_registry() -> &'static Registry {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            compiler_base: dir.path().join("compilers"),
            library_base: dir.path().join("libraries"),
        };
        // The registry outlives the test; keep the directory too.
        std::mem::forget(dir);
        Box::leak(Box::new(Registry::builtin(paths).unwrap()))
    }

    pub(crate) fn test_handler() -> Handler {
        Handler::new(
            test_registry(),
            SandboxConfig::unjailed(),
            TimeoutConfig::default(),
            Arc::new(CannedDecompiler),
        )
    }

    #[test]
    fn test_compile_job() {
        let handler = test_handler();
        let payload = json!({"compiler_id": "dummy", "code": "int x;", "compiler_flags": "-O2"});
        let value = handler.handle(JobAction::Compile, payload).unwrap();
        let result: CompilationResult = serde_json::from_value(value).unwrap();
        assert!(result.success());
        assert!(String::from_utf8(result.elf_object).unwrap().contains("int x;"));
    }

    #[test]
    fn test_assemble_job() {
        let handler = test_handler();
        let payload = json!({"platform_id": "dummy", "asm_data": "glabel func\njr $ra\n"});
        let value = handler.handle(JobAction::Assemble, payload.clone()).unwrap();
        let result: AssemblyResult = serde_json::from_value(value).unwrap();
        assert!(result.success());
        assert_eq!(result.arch, "dummy");
        handler.handle(JobAction::Assemble, payload).unwrap();
        assert_eq!(handler.assembly_cache.hits(), 1);
    }

    #[test]
    fn test_decompile_job() {
        let handler = test_handler();
        let payload = json!({
            "platform_id": "n64",
            "compiler_id": "ido7.1",
            "default_source_code": "void func(void) {}",
            "asm": "glabel func\njr $ra\nnop\n",
        });
        let value = handler.handle(JobAction::Decompile, payload).unwrap();
        assert_eq!(value["decompiled_code"], "? func(); // mips-ido");

        let payload = json!({
            "platform_id": "dummy",
            "compiler_id": "dummy",
            "default_source_code": "void func(void) {}",
            "asm": "nop",
        });
        let value = handler.handle(JobAction::Decompile, payload).unwrap();
        assert!(value["decompiled_code"].as_str().unwrap().contains("No decompiler"));
    }

    #[test]
    fn test_bad_payloads_are_job_errors() {
        let handler = test_handler();
        assert!(matches!(
            handler.handle(JobAction::Compile, json!({"code": 1})),
            Err(JobError::BadPayload(_))
        ));
        assert!(matches!(
            handler.handle(JobAction::Compile, json!({"compiler_id": "nope", "code": ""})),
            Err(JobError::Unsupported(_))
        ));
    }
}
