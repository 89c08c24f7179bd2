//! One-shot CLI commands: run a single toolchain invocation without the pool.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cromper_compiler::{AssembleRequest, AssemblerWrapper, AssemblyCache, CompileRequest, CompilerWrapper};
use cromper_core::config::{PathsConfig, SandboxConfig, TimeoutConfig};
use cromper_core::{Library, Registry};
use cromper_diff::{DiffWrapper, SandboxObjdumpRunner};
use serde_json::json;

pub struct CompileArgs {
    pub compiler: String,
    pub source: String,
    pub flags: String,
    pub context: Option<String>,
    pub function: Option<String>,
    pub libraries: Vec<String>,
    pub output: Option<String>,
}

pub struct DiffArgs {
    pub platform: String,
    pub target: String,
    pub compiled: String,
    pub label: Option<String>,
    pub flags: Vec<String>,
    pub summary: bool,
}

fn registry() -> Result<&'static Registry> {
    Registry::init(PathsConfig::from_env()).context("Failed to build the toolchain registry")
}

/// File contents, or stdin for "-".
fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

fn default_output(input: &str) -> String {
    if input == "-" {
        return "out.o".to_string();
    }
    Path::new(input).with_extension("o").to_string_lossy().into_owned()
}

fn parse_library(spec: &str) -> Result<Library> {
    match spec.split_once('@') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => Ok(Library::new(name, version)),
        _ => bail!("Invalid library {:?}, expected NAME@VERSION", spec),
    }
}

pub fn compile(args: CompileArgs) -> Result<()> {
    let registry = registry()?;
    let code = read_input(&args.source)?;
    let context = match args.context.as_deref() {
        Some(path) => read_input(path)?,
        None => String::new(),
    };
    let libraries = args
        .libraries
        .iter()
        .map(|s| parse_library(s))
        .collect::<Result<Vec<_>>>()?;

    let req = CompileRequest {
        compiler_id: args.compiler,
        compiler_flags: args.flags,
        code,
        context,
        function: args.function,
        libraries,
    };
    let wrapper = CompilerWrapper::new(
        registry,
        SandboxConfig::from_env(),
        TimeoutConfig::from_env().compilation,
    );
    let result = wrapper.compile(&req)?;
    if !result.errors.is_empty() {
        eprintln!("{}", result.errors.trim_end());
    }
    if !result.success() {
        bail!("Compilation with {} failed", req.compiler_id);
    }

    let output = args.output.unwrap_or_else(|| default_output(&args.source));
    std::fs::write(&output, &result.elf_object).with_context(|| format!("Failed to write {}", output))?;
    println!("{} ({} bytes, {} ms)", output, result.elf_object.len(), result.elapsed_ms);
    Ok(())
}

pub fn assemble(platform: String, asm: String, output: Option<String>) -> Result<()> {
    let registry = registry()?;
    let req = AssembleRequest {
        platform_id: platform,
        asm_data: read_input(&asm)?,
        asm_hash: None,
    };
    let wrapper = AssemblerWrapper::new(
        registry,
        SandboxConfig::from_env(),
        TimeoutConfig::from_env().assembly,
        Arc::new(AssemblyCache::default()),
    );
    let result = wrapper.assemble(&req)?;
    if !result.success() {
        eprintln!("{}", result.errors.trim_end());
        bail!("Assembly for {} failed", req.platform_id);
    }

    let output = output.unwrap_or_else(|| default_output(&asm));
    std::fs::write(&output, &result.elf_object).with_context(|| format!("Failed to write {}", output))?;
    println!("{} ({} bytes, hash {})", output, result.elf_object.len(), result.hash);
    Ok(())
}

pub fn diff(args: DiffArgs) -> Result<()> {
    let registry = registry()?;
    let platform = registry.platform(&args.platform)?;
    let target = std::fs::read(&args.target).with_context(|| format!("Failed to read {}", args.target))?;
    let compiled =
        std::fs::read(&args.compiled).with_context(|| format!("Failed to read {}", args.compiled))?;

    let runner = SandboxObjdumpRunner::new(
        SandboxConfig::from_env(),
        registry.paths().clone(),
        TimeoutConfig::from_env().objdump,
    );
    let differ = DiffWrapper::new(Arc::new(runner));
    let result = differ.diff(&target, &compiled, platform, args.label.as_deref(), &args.flags)?;

    if args.summary {
        println!(
            "{}: {}/{} (penalty {}, {} mismatched rows)",
            result.arch,
            result.current_score,
            result.max_score,
            result.penalty,
            result.mismatches()
        );
        if let Some(e) = &result.candidate_error {
            println!("candidate: {}", e);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

pub fn catalog(platform: Option<String>, all: bool) -> Result<()> {
    let registry = registry()?;
    let value = match platform {
        Some(id) => {
            let platform = registry.platform(&id)?;
            let compilers: Vec<_> = registry
                .compilers_for_platform(platform.id, !all)
                .into_iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "family": c.family,
                        "language": c.language,
                        "available": registry.is_available(c),
                    })
                })
                .collect();
            json!({ "platform": platform, "compilers": compilers })
        }
        None => {
            let platforms: Vec<&cromper_core::Platform> = if all {
                registry.platforms().to_vec()
            } else {
                registry.available_platforms()
            };
            let platforms: Vec<_> = platforms
                .into_iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "arch": p.arch,
                        "compilers": registry.compilers_for_platform(p.id, !all).len(),
                    })
                })
                .collect();
            json!({ "platforms": platforms })
        }
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_library() {
        let lib = parse_library("libultra@2.0L").unwrap();
        assert_eq!(lib.name, "libultra");
        assert_eq!(lib.version, "2.0L");
        assert!(parse_library("libultra").is_err());
        assert!(parse_library("@1.0").is_err());
    }

    #[test]
    fn test_default_output() {
        assert_eq!(default_output("src/func.c"), "src/func.o");
        assert_eq!(default_output("-"), "out.o");
    }
}
