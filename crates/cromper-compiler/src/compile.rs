use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use cromper_core::catalog::{Compiler, Library, Registry};
use cromper_core::config::SandboxConfig;
use cromper_sandbox::{info_log, RunOptions, Sandbox, SandboxCommand, SandboxError};
use serde::{Deserialize, Serialize};

use crate::error::CompilationError;
use crate::flags::quote_options;
use crate::noise::filter_compile_errors;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    pub compiler_id: String,
    #[serde(default)]
    pub compiler_flags: String,
    pub code: String,
    #[serde(default)]
    pub context: String,
    /// Symbol being matched; only diff-target-aware toolchains look at it
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationResult {
    #[serde(with = "cromper_core::serde_b64")]
    pub elf_object: Vec<u8>,
    pub errors: String,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl CompilationResult {
    pub fn failed(errors: impl Into<String>) -> Self {
        Self {
            elf_object: Vec::new(),
            errors: errors.into(),
            elapsed_ms: 0,
        }
    }

    pub fn success(&self) -> bool {
        !self.elf_object.is_empty()
    }
}

pub struct CompilerWrapper<'r> {
    registry: &'r Registry,
    sandbox: SandboxConfig,
    timeout: Duration,
}

impl<'r> CompilerWrapper<'r> {
    pub fn new(registry: &'r Registry, sandbox: SandboxConfig, timeout: Duration) -> Self {
        Self {
            registry,
            sandbox,
            timeout,
        }
    }

    pub fn compile(&self, req: &CompileRequest) -> Result<CompilationResult, CompilationError> {
        let start = Instant::now();
        let compiler = self.registry.available_compiler(&req.compiler_id)?;
        let platform = self.registry.platform_of(compiler);
        let include_paths = self
            .registry
            .library_include_paths(platform.id, &req.libraries)?;

        let sandbox = Sandbox::enter(&self.sandbox, self.registry.paths()).map_err(|source| {
            CompilationError::Sandbox {
                compiler: compiler.id.to_string(),
                source,
            }
        })?;

        let ext = compiler.language.file_extension();
        let ctx_name = format!("ctx.{}", ext);
        let src_name = format!("src.{}", ext);
        let code_path = sandbox.path().join(format!("code.{}", ext));
        let object_path = sandbox.path().join("object.o");

        std::fs::write(
            &code_path,
            render_source(&ctx_name, &req.context, &src_name, &req.code),
        )?;
        if compiler.is_mwcc() {
            // DWARF line info is read back from the files the #line directives name.
            std::fs::write(sandbox.path().join(&ctx_name), &req.context)?;
            std::fs::write(sandbox.path().join(&src_name), &req.code)?;
        }

        let cc = render_cc(compiler, &req.compiler_flags);
        let library_flags: Vec<String> = include_paths
            .iter()
            .map(|p| {
                format!(
                    "{}{}",
                    compiler.library_include_flag(),
                    sandbox.rewrite_path(p).display()
                )
            })
            .collect();
        let all_flags = format!("{} {}", req.compiler_flags, library_flags.join(" "));

        let scratch = sandbox.rewrite_path(sandbox.path());
        let compiler_dir = sandbox.rewrite_path(&self.registry.compiler_dir(compiler));
        let mut env = BTreeMap::new();
        env.insert("WINE".to_string(), self.sandbox.wine.clone());
        env.insert("INPUT".to_string(), path_str(&sandbox.rewrite_path(&code_path)));
        env.insert("OUTPUT".to_string(), path_str(&sandbox.rewrite_path(&object_path)));
        env.insert("COMPILER_DIR".to_string(), path_str(&compiler_dir));
        env.insert("COMPILER_FLAGS".to_string(), quote_options(&all_flags));
        env.insert(
            "FUNCTION".to_string(),
            req.function.clone().unwrap_or_default(),
        );
        env.insert("MWCIncludes".to_string(), path_str(&scratch));
        env.insert("TMPDIR".to_string(), path_str(&scratch));
        if compiler.needs_wine() {
            env.insert("WINEDEBUG".to_string(), "-all".to_string());
        }

        let opts = RunOptions {
            mounts: Vec::new(),
            env,
            timeout: Some(self.timeout),
        };

        info_log!("Compiling with {} ({})", compiler.id, platform.id);
        let output = match sandbox.run(&SandboxCommand::Shell(cc), &opts) {
            Ok(out) => out.stdout,
            Err(SandboxError::NonZeroExit { output, .. }) => {
                tracing::debug!("Compilation failed: {}", output);
                return Ok(finish(
                    CompilationResult::failed(filter_compile_errors(&output)),
                    start,
                ));
            }
            Err(SandboxError::Timeout { .. }) => {
                return Ok(finish(
                    CompilationResult::failed("Compilation failed: timeout expired"),
                    start,
                ));
            }
            Err(source) => {
                return Err(CompilationError::Sandbox {
                    compiler: compiler.id.to_string(),
                    source,
                })
            }
        };

        // Some front ends exit 0 after an internal failure.
        if !object_path.exists() {
            return Ok(finish(
                CompilationResult::failed(format!(
                    "Compiler did not create an object file: {}",
                    filter_compile_errors(&output)
                )),
                start,
            ));
        }
        let elf_object = std::fs::read(&object_path)?;
        if elf_object.is_empty() {
            return Ok(finish(
                CompilationResult::failed(format!(
                    "Compiler created an empty object file: {}",
                    filter_compile_errors(&output)
                )),
                start,
            ));
        }

        Ok(finish(
            CompilationResult {
                elf_object,
                errors: filter_compile_errors(&output),
                elapsed_ms: 0,
            },
            start,
        ))
    }
}

/// Context and user code in one translation unit, each attributed to its own
/// virtual file so diagnostics point at the right source.
pub fn render_source(ctx_name: &str, context: &str, src_name: &str, code: &str) -> String {
    format!(
        "#line 1 \"{}\"\n{}\n#line 1 \"{}\"\n{}\n",
        ctx_name, context, src_name, code
    )
}

/// The compiler's command template with family-specific fixups applied.
pub fn render_cc(compiler: &Compiler, compiler_flags: &str) -> String {
    // IDO cannot combine -KPIC with -non_shared.
    if compiler.is_ido() && compiler_flags.contains("-KPIC") {
        return compiler.cc.replace("-non_shared", "");
    }
    compiler.cc.to_string()
}

fn finish(mut result: CompilationResult, start: Instant) -> CompilationResult {
    result.elapsed_ms = start.elapsed().as_millis() as u64;
    result
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cromper_core::catalog::{platforms, CompilerFamily};
    use cromper_core::config::PathsConfig;
    use cromper_core::CatalogError;

    /// Pretend GCC: accepts code that returns 5, rejects anything else with
    /// a diagnostic buried in wine noise.
    const FAKE_GCC: &str = r#"if grep -q 'return 5;' "${INPUT}"; then printf 'ELF%s' "${COMPILER_FLAGS}" > "${OUTPUT}"; else echo "wine: could not load kernel32.dll, status c0000135"; echo "src.c:1: error: expected ';' before '}' token" 1>&2; exit 1; fi"#;

    fn registry(dir: &Path, compilers: Vec<Compiler>) -> Registry {
        let paths = PathsConfig {
            compiler_base: dir.join("compilers"),
            library_base: dir.join("libraries"),
        };
        Registry::new(paths, platforms::ALL, compilers).unwrap()
    }

    fn request(compiler_id: &str, code: &str) -> CompileRequest {
        CompileRequest {
            compiler_id: compiler_id.to_string(),
            compiler_flags: "-O2".to_string(),
            code: code.to_string(),
            context: String::new(),
            function: Some("func".to_string()),
            libraries: Vec::new(),
        }
    }

    fn fake_gcc_registry(dir: &Path) -> Registry {
        std::fs::create_dir_all(dir.join("compilers/n64/fakegcc")).unwrap();
        registry(
            dir,
            vec![Compiler::new("fakegcc", "n64", CompilerFamily::Gcc, FAKE_GCC)],
        )
    }

    #[test]
    fn test_compile_success_produces_object() {
        let dir = tempfile::tempdir().unwrap();
        let reg = fake_gcc_registry(dir.path());
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let result = wrapper
            .compile(&request("fakegcc", "int func(void){return 5;}"))
            .unwrap();
        assert!(result.success());
        assert_eq!(result.elf_object, b"ELF-O2");
        assert_eq!(result.errors, "");
    }

    #[test]
    fn test_compile_failure_is_a_result_with_filtered_errors() {
        let dir = tempfile::tempdir().unwrap();
        let reg = fake_gcc_registry(dir.path());
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let result = wrapper
            .compile(&request("fakegcc", "int func(void){return 5}"))
            .unwrap();
        assert!(!result.success());
        assert!(result.elf_object.is_empty());
        assert_eq!(result.errors, "src.c:1: error: expected ';' before '}' token");
    }

    #[test]
    fn test_unknown_and_unavailable_compilers_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            dir.path(),
            vec![Compiler::new("ghost", "n64", CompilerFamily::Gcc, FAKE_GCC)],
        );
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let err = wrapper.compile(&request("nope", "")).unwrap_err();
        assert!(matches!(err, CompilationError::Catalog(CatalogError::UnknownCompiler(_))));
        let err = wrapper.compile(&request("ghost", "")).unwrap_err();
        assert!(matches!(err, CompilationError::Catalog(CatalogError::CompilerUnavailable(_))));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_timeout_becomes_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            dir.path(),
            vec![Compiler::new("slow", "dummy", CompilerFamily::Dummy, "sleep 30")],
        );
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_millis(200));
        let result = wrapper.compile(&request("slow", "")).unwrap();
        assert!(!result.success());
        assert_eq!(result.errors, "Compilation failed: timeout expired");
    }

    #[test]
    fn test_missing_or_empty_object_is_compiler_error() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            dir.path(),
            vec![
                Compiler::new("silent", "dummy", CompilerFamily::Dummy, "echo internal failure"),
                Compiler::new("empty", "dummy", CompilerFamily::Dummy, r#": > "${OUTPUT}""#),
            ],
        );
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let silent = wrapper.compile(&request("silent", "")).unwrap();
        assert_eq!(
            silent.errors,
            "Compiler did not create an object file: internal failure"
        );
        let empty = wrapper.compile(&request("empty", "")).unwrap();
        assert!(empty.errors.starts_with("Compiler created an empty object file"));
    }

    #[test]
    fn test_dummy_compiler_echoes_source() {
        let dir = tempfile::tempdir().unwrap();
        let reg = Registry::builtin(PathsConfig {
            compiler_base: dir.path().join("compilers"),
            library_base: dir.path().join("libraries"),
        })
        .unwrap();
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let mut req = request("dummy", "int x;");
        req.context = "typedef int s32;".to_string();
        let result = wrapper.compile(&req).unwrap();
        let text = String::from_utf8(result.elf_object).unwrap();
        assert!(text.contains("#line 1 \"ctx.c\"\ntypedef int s32;"));
        assert!(text.contains("#line 1 \"src.c\"\nint x;"));
    }

    #[test]
    fn test_library_include_flags_are_passed() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(
            dir.path(),
            vec![Compiler::new(
                "echoflags",
                "win32",
                CompilerFamily::Dummy,
                r#"printf '%s' "${COMPILER_FLAGS}" > "${OUTPUT}""#,
            )],
        );
        let include = dir.path().join("libraries/directx/8.0/win32/include");
        std::fs::create_dir_all(&include).unwrap();
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let mut req = request("echoflags", "");
        req.libraries = vec![Library::new("directx", "8.0")];
        let result = wrapper.compile(&req).unwrap();
        let flags = String::from_utf8(result.elf_object).unwrap();
        assert_eq!(flags, format!("-O2 -isystem{}", include.display()));

        req.libraries = vec![Library::new("directx", "9.0")];
        assert!(wrapper.compile(&req).is_err());
    }

    #[test]
    fn test_mwcc_materializes_line_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("compilers/gc_wii/fakemw")).unwrap();
        let reg = registry(
            dir.path(),
            vec![Compiler::new(
                "fakemw",
                "gc_wii",
                CompilerFamily::Mwcc,
                r#"cat ctx.c src.c > "${OUTPUT}""#,
            )],
        );
        let wrapper = CompilerWrapper::new(&reg, SandboxConfig::unjailed(), Duration::from_secs(10));
        let mut req = request("fakemw", "void f(void) {}");
        req.context = "#define X 1".to_string();
        let result = wrapper.compile(&req).unwrap();
        assert_eq!(result.elf_object, b"#define X 1void f(void) {}");
    }

    #[test]
    fn test_ido_kpic_drops_non_shared() {
        let ido = Compiler::new("ido", "n64", CompilerFamily::Ido, "cc -non_shared ${COMPILER_FLAGS}");
        assert_eq!(render_cc(&ido, "-O2 -KPIC"), "cc  ${COMPILER_FLAGS}");
        assert_eq!(render_cc(&ido, "-O2"), "cc -non_shared ${COMPILER_FLAGS}");
        let gcc = Compiler::new("gcc", "n64", CompilerFamily::Gcc, "cc -non_shared");
        assert_eq!(render_cc(&gcc, "-KPIC"), "cc -non_shared");
    }

    #[test]
    fn test_result_wire_format() {
        let result = CompilationResult {
            elf_object: b"ELF".to_vec(),
            errors: String::new(),
            elapsed_ms: 3,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["elf_object"], "RUxG");
        let back: CompilationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.elf_object, b"ELF");
    }
}
