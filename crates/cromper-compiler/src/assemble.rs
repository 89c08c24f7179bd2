use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cromper_core::catalog::{Platform, Registry};
use cromper_core::config::SandboxConfig;
use cromper_core::hash::content_hash;
use cromper_sandbox::{info_log, RunOptions, Sandbox, SandboxCommand, SandboxError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;
use crate::noise::filter_compile_errors;

/// Cached objects kept before the cache is cleared wholesale
const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleRequest {
    pub platform_id: String,
    pub asm_data: String,
    /// Client-side hash; the server always recomputes its own
    #[serde(default)]
    pub asm_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub hash: String,
    pub arch: String,
    #[serde(with = "cromper_core::serde_b64")]
    pub elf_object: Vec<u8>,
    #[serde(default)]
    pub errors: String,
}

impl AssemblyResult {
    pub fn success(&self) -> bool {
        !self.elf_object.is_empty()
    }
}

/// Content-addressed object cache keyed by `(platform_id, asm_hash)`.
///
/// Lives in one process. Under the worker pool each worker holds its own, so
/// a given target is assembled at most once per worker.
#[derive(Debug)]
pub struct AssemblyCache {
    entries: DashMap<(String, String), Arc<Vec<u8>>>,
    capacity: usize,
    hits: AtomicU64,
}

impl Default for AssemblyCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl AssemblyCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
        }
    }

    pub fn get(&self, platform_id: &str, asm_hash: &str) -> Option<Arc<Vec<u8>>> {
        let hit = self
            .entries
            .get(&(platform_id.to_string(), asm_hash.to_string()))
            .map(|e| Arc::clone(e.value()));
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    pub fn insert(&self, platform_id: &str, asm_hash: &str, object: Vec<u8>) -> Arc<Vec<u8>> {
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        let object = Arc::new(object);
        self.entries.insert(
            (platform_id.to_string(), asm_hash.to_string()),
            Arc::clone(&object),
        );
        object
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct AssemblerWrapper<'r> {
    registry: &'r Registry,
    sandbox: SandboxConfig,
    timeout: Duration,
    cache: Arc<AssemblyCache>,
}

impl<'r> AssemblerWrapper<'r> {
    pub fn new(
        registry: &'r Registry,
        sandbox: SandboxConfig,
        timeout: Duration,
        cache: Arc<AssemblyCache>,
    ) -> Self {
        Self {
            registry,
            sandbox,
            timeout,
            cache,
        }
    }

    pub fn assemble(&self, req: &AssembleRequest) -> Result<AssemblyResult, AssemblyError> {
        let platform = self.registry.platform(&req.platform_id)?;
        if platform.assemble_cmd.is_empty() {
            return Err(AssemblyError::MissingAssembler(platform.id.to_string()));
        }

        let hash = content_hash(&[req.asm_data.as_bytes()]);
        if let Some(client_hash) = req.asm_hash.as_deref() {
            if client_hash != hash {
                tracing::debug!("Client asm hash {} differs from {}", client_hash, hash);
            }
        }

        let result = |elf_object: Vec<u8>, errors: String| AssemblyResult {
            hash: hash.clone(),
            arch: platform.arch.to_string(),
            elf_object,
            errors,
        };

        if let Some(object) = self.cache.get(platform.id, &hash) {
            tracing::debug!("Assembly cache hit for {} on {}", hash, platform.id);
            return Ok(result(object.as_ref().clone(), String::new()));
        }

        match self.run_assembler(platform, &req.asm_data)? {
            Ok(object) => {
                self.cache.insert(platform.id, &hash, object.clone());
                Ok(result(object, String::new()))
            }
            Err(errors) => Ok(result(Vec::new(), errors)),
        }
    }

    /// Outer error: infrastructure. Inner error: assembler rejected the input.
    fn run_assembler(
        &self,
        platform: &Platform,
        asm_data: &str,
    ) -> Result<Result<Vec<u8>, String>, AssemblyError> {
        let sandbox_err = |source: SandboxError| AssemblyError::Sandbox {
            platform: platform.id.to_string(),
            source,
        };
        let sandbox = Sandbox::enter(&self.sandbox, self.registry.paths()).map_err(sandbox_err)?;

        let prelude_path = sandbox.path().join("prelude.s");
        let asm_path = sandbox.path().join("asm.s");
        let object_path = sandbox.path().join("object.o");
        std::fs::write(&prelude_path, platform.asm_prelude)?;
        std::fs::write(&asm_path, format!("{}\n", normalize_asm(asm_data)))?;

        let mut env = BTreeMap::new();
        env.insert("PRELUDE".to_string(), path_str(&sandbox.rewrite_path(&prelude_path)));
        env.insert("INPUT".to_string(), path_str(&sandbox.rewrite_path(&asm_path)));
        env.insert("OUTPUT".to_string(), path_str(&sandbox.rewrite_path(&object_path)));
        env.insert(
            "COMPILER_BASE_PATH".to_string(),
            path_str(&sandbox.rewrite_path(&self.registry.paths().compiler_base)),
        );
        let opts = RunOptions {
            mounts: Vec::new(),
            env,
            timeout: Some(self.timeout),
        };

        info_log!("Assembling for {}", platform.id);
        match sandbox.run(&SandboxCommand::Shell(platform.assemble_cmd.to_string()), &opts) {
            Ok(_) => {}
            Err(SandboxError::NonZeroExit { output, .. }) => {
                return Ok(Err(filter_compile_errors(&output)));
            }
            Err(SandboxError::Timeout { .. }) => {
                return Ok(Err("Assembly failed: timeout expired".to_string()));
            }
            Err(other) => return Err(sandbox_err(other)),
        }

        if !object_path.exists() {
            return Ok(Err("Assembler did not create an object file".to_string()));
        }
        let object = std::fs::read(&object_path)?;
        if object.is_empty() {
            return Ok(Err("Assembler created an empty object file".to_string()));
        }
        Ok(Ok(object))
    }
}

/// Older snippets spell the late rodata section as a plain section switch.
pub fn normalize_asm(asm: &str) -> String {
    asm.replace(".section .late_rodata", ".late_rodata")
}

fn path_str(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
