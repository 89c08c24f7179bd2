//! Disassembly via the platform's objdump, with a memo cache in front.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cromper_core::catalog::Platform;
use cromper_core::config::{PathsConfig, SandboxConfig};
use cromper_core::hash::content_hash;
use cromper_sandbox::{RunOptions, Sandbox, SandboxCommand, SandboxError};
use dashmap::DashMap;

use crate::error::{NmError, ObjdumpError};

const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Always passed; `--disassemble` is dropped when disassembling by symbol.
const BASE_OBJDUMP_FLAGS: &[&str] = &["--disassemble", "--disassemble-zeroes", "--line-numbers", "--reloc"];

/// Everything that determines objdump's output.
#[derive(Debug, Clone, Copy)]
pub struct ObjdumpRequest<'a> {
    pub data: &'a [u8],
    pub platform: &'a Platform,
    pub arch_flags: &'a [String],
    pub label: Option<&'a str>,
    pub flags: &'a [String],
}

impl ObjdumpRequest<'_> {
    pub fn cache_key(&self) -> String {
        let arch_flags = self.arch_flags.join("\0");
        let flags = self.flags.join("\0");
        content_hash(&[
            self.data,
            self.platform.id.as_bytes(),
            arch_flags.as_bytes(),
            self.label.unwrap_or_default().as_bytes(),
            flags.as_bytes(),
        ])
    }
}

/// Produces raw disassembly text for an object.
pub trait ObjdumpRunner: Send + Sync {
    fn objdump(&self, req: &ObjdumpRequest<'_>) -> Result<String, ObjdumpError>;
}

/// Runs the platform's nm/objdump inside a fresh sandbox.
pub struct SandboxObjdumpRunner {
    sandbox: SandboxConfig,
    paths: PathsConfig,
    timeout: Duration,
}

impl SandboxObjdumpRunner {
    pub fn new(sandbox: SandboxConfig, paths: PathsConfig, timeout: Duration) -> Self {
        Self {
            sandbox,
            paths,
            timeout,
        }
    }

    fn options(&self) -> RunOptions {
        let mut env = BTreeMap::new();
        env.insert(
            "COMPILER_BASE_PATH".to_string(),
            self.paths.compiler_base.to_string_lossy().into_owned(),
        );
        RunOptions {
            mounts: Vec::new(),
            env,
            timeout: Some(self.timeout),
        }
    }

    /// Flags selecting where disassembly starts for `label`.
    fn target_function_flags(
        &self,
        sandbox: &Sandbox,
        target: &str,
        platform: &Platform,
        label: Option<&str>,
    ) -> Result<Vec<String>, NmError> {
        let Some(label) = label.filter(|l| !l.is_empty()) else {
            return Ok(vec!["--start-address=0".to_string()]);
        };
        if platform.supports_objdump_disassemble {
            return Ok(vec![format!("--disassemble={}", label)]);
        }
        if platform.nm_cmd.is_empty() {
            return Err(NmError::MissingCommand(platform.id.to_string()));
        }

        let mut argv: Vec<String> = platform.nm_cmd.split_whitespace().map(String::from).collect();
        argv.push(target.to_string());
        let out = match sandbox.run(&SandboxCommand::Argv(argv), &self.options()) {
            Ok(out) => out.stdout,
            Err(SandboxError::Timeout { .. }) => return Err(NmError::Timeout),
            Err(SandboxError::NonZeroExit { output, .. }) => return Err(NmError::Failed(output)),
            Err(e) => return Err(NmError::Failed(e.to_string())),
        };
        let start = parse_nm_start_address(&out, label).unwrap_or(0);
        Ok(vec![format!("--start-address={}", start)])
    }
}

impl ObjdumpRunner for SandboxObjdumpRunner {
    fn objdump(&self, req: &ObjdumpRequest<'_>) -> Result<String, ObjdumpError> {
        let platform = req.platform;
        if platform.objdump_cmd.is_empty() {
            return Err(ObjdumpError::MissingCommand(platform.id.to_string()));
        }

        let sandbox = Sandbox::enter(&self.sandbox, &self.paths).map_err(ObjdumpError::Sandbox)?;
        let target_path = sandbox.path().join("out.o");
        std::fs::write(&target_path, req.data)?;
        let target = sandbox.rewrite_path(&target_path).to_string_lossy().into_owned();

        let mut argv: Vec<String> = platform.objdump_cmd.split_whitespace().map(String::from).collect();
        if !platform.is_dummy() {
            let function_flags = self.target_function_flags(&sandbox, &target, platform, req.label)?;
            let by_symbol = function_flags.iter().any(|f| f.starts_with("--disassemble="));
            argv.extend(req.flags.iter().filter(|f| !f.starts_with("-DIFF")).cloned());
            argv.extend(
                BASE_OBJDUMP_FLAGS
                    .iter()
                    .filter(|f| !(by_symbol && **f == "--disassemble"))
                    .map(|f| f.to_string()),
            );
            argv.extend(function_flags);
            argv.extend(req.arch_flags.iter().cloned());
        }
        argv.push(target);

        tracing::debug!("objdump for {}: {}", platform.id, argv.join(" "));
        match sandbox.run(&SandboxCommand::Argv(argv), &self.options()) {
            Ok(out) => Ok(out.stdout),
            Err(SandboxError::Timeout { .. }) => Err(ObjdumpError::Timeout),
            Err(SandboxError::NonZeroExit { output, .. }) => Err(ObjdumpError::Failed(output)),
            Err(e) => Err(ObjdumpError::Sandbox(e)),
        }
    }
}

/// Address of the first symbol named exactly `label`, e.g. from
/// `00000010 T osEepromRead`.
pub fn parse_nm_start_address(nm_output: &str, label: &str) -> Option<u64> {
    nm_output.lines().find_map(|line| {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 3 && parts[2] == label {
            u64::from_str_radix(parts[0], 16).ok()
        } else {
            None
        }
    })
}

/// Memoised disassembly keyed by a hash of the full request.
///
/// Population races are harmless: the value is a pure function of the key.
#[derive(Debug)]
pub struct DisassemblyCache {
    entries: DashMap<String, Arc<str>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for DisassemblyCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl DisassemblyCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn get(&self, key: &str) -> Option<Arc<str>> {
        let hit = self.entries.get(key).map(|e| Arc::clone(e.value()));
        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    fn insert(&self, key: String, value: Arc<str>) {
        if self.entries.len() >= self.capacity {
            tracing::debug!("Disassembly cache full ({} entries), clearing", self.capacity);
            self.entries.clear();
        }
        self.entries.insert(key, value);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An [`ObjdumpRunner`] behind a [`DisassemblyCache`].
pub struct Disassembler {
    runner: Arc<dyn ObjdumpRunner>,
    cache: DisassemblyCache,
}

impl Disassembler {
    pub fn new(runner: Arc<dyn ObjdumpRunner>, cache: DisassemblyCache) -> Self {
        Self { runner, cache }
    }

    /// Failures are not cached.
    pub fn run_objdump(&self, req: &ObjdumpRequest<'_>) -> Result<Arc<str>, ObjdumpError> {
        let key = req.cache_key();
        if let Some(text) = self.cache.get(&key) {
            return Ok(text);
        }
        let text: Arc<str> = Arc::from(self.runner.objdump(req)?);
        self.cache.insert(key, Arc::clone(&text));
        Ok(text)
    }

    pub fn cache(&self) -> &DisassemblyCache {
        &self.cache
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cromper_core::catalog::platforms;
    use std::sync::atomic::AtomicUsize;

    /// Returns canned text and counts how often it was asked.
    pub struct CountingRunner {
        pub calls: AtomicUsize,
        pub text: String,
        pub fail_on: Option<Vec<u8>>,
    }

    impl CountingRunner {
        pub fn new(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                text: text.to_string(),
                fail_on: None,
            }
        }
    }

    impl ObjdumpRunner for CountingRunner {
        fn objdump(&self, req: &ObjdumpRequest<'_>) -> Result<String, ObjdumpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.as_deref() == Some(req.data) {
                return Err(ObjdumpError::Failed("file format not recognized".to_string()));
            }
            Ok(self.text.clone())
        }
    }

    fn request<'a>(data: &'a [u8], label: Option<&'a str>, flags: &'a [String]) -> ObjdumpRequest<'a> {
        ObjdumpRequest {
            data,
            platform: &platforms::N64,
            arch_flags: &[],
            label,
            flags,
        }
    }

    #[test]
    fn test_memoizes_identical_requests() {
        let runner = Arc::new(CountingRunner::new("   0:\t03e00008 \tjr\tra\n"));
        let disasm = Disassembler::new(runner.clone(), DisassemblyCache::default());
        let flags = vec!["-Mno-aliases".to_string()];

        let first = disasm.run_objdump(&request(b"elf", Some("func"), &flags)).unwrap();
        let second = disasm.run_objdump(&request(b"elf", Some("func"), &flags)).unwrap();
        assert_eq!(first, second);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(disasm.cache().hits(), 1);

        disasm.run_objdump(&request(b"elf", Some("other"), &flags)).unwrap();
        disasm.run_objdump(&request(b"elf2", Some("func"), &flags)).unwrap();
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut runner = CountingRunner::new("");
        runner.fail_on = Some(b"bad".to_vec());
        let runner = Arc::new(runner);
        let disasm = Disassembler::new(runner.clone(), DisassemblyCache::default());
        assert!(disasm.run_objdump(&request(b"bad", None, &[])).is_err());
        assert!(disasm.run_objdump(&request(b"bad", None, &[])).is_err());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
        assert!(disasm.cache().is_empty());
    }

    #[test]
    fn test_cache_key_covers_every_input() {
        let flags = vec!["-Mreg-names=32".to_string()];
        let base = request(b"elf", Some("f"), &flags).cache_key();
        assert_ne!(base, request(b"elf", Some("g"), &flags).cache_key());
        assert_ne!(base, request(b"elf", Some("f"), &[]).cache_key());
        let arch_flags = vec!["-m".to_string(), "mips:4300".to_string()];
        let mut with_arch = request(b"elf", Some("f"), &flags);
        with_arch.arch_flags = &arch_flags;
        assert_ne!(base, with_arch.cache_key());
    }

    #[test]
    fn test_parse_nm_start_address() {
        let nm = "00000000 T func_a\n         U osMemSize\n00000040 T func_b\n00000080 t func_b\n";
        assert_eq!(parse_nm_start_address(nm, "func_b"), Some(0x40));
        assert_eq!(parse_nm_start_address(nm, "osMemSize"), None);
        assert_eq!(parse_nm_start_address(nm, "missing"), None);
    }

    #[test]
    fn test_sandbox_runner_dummy_platform() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            compiler_base: dir.path().join("compilers"),
            library_base: dir.path().join("libraries"),
        };
        let runner = SandboxObjdumpRunner::new(SandboxConfig::unjailed(), paths, Duration::from_secs(5));
        let req = ObjdumpRequest {
            data: b"li a0, 5\njr ra\n",
            platform: &platforms::DUMMY,
            arch_flags: &[],
            label: Some("func"),
            flags: &[],
        };
        assert_eq!(runner.objdump(&req).unwrap(), "li a0, 5\njr ra\n");
    }
}
