//! Read-only toolchain registry, built once at startup.
//!
//! Compilers live in one flat table and reference their base compiler by id;
//! the registry resolves that id to an index when it is built.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use super::compiler::{Compiler, CompilerFamily};
use super::library::{self, Library, LibraryVersions};
use super::platform::Platform;
use super::{compilers, platforms};
use crate::config::PathsConfig;
use crate::error::CatalogError;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

#[derive(Debug)]
pub struct Registry {
    paths: PathsConfig,
    platforms: Vec<&'static Platform>,
    compilers: Vec<Compiler>,
    compiler_index: HashMap<&'static str, usize>,
    /// compiler index -> index of the compiler whose directory it uses
    dir_owner: Vec<usize>,
}

impl Registry {
    /// Build a registry over explicit tables, validating cross references.
    pub fn new(
        paths: PathsConfig,
        platforms: &[&'static Platform],
        compilers: Vec<Compiler>,
    ) -> Result<Self, CatalogError> {
        let mut compiler_index = HashMap::with_capacity(compilers.len());
        for (idx, compiler) in compilers.iter().enumerate() {
            if !platforms.iter().any(|p| p.id == compiler.platform) {
                return Err(CatalogError::UnknownPlatform(compiler.platform.to_string()));
            }
            if compiler_index.insert(compiler.id, idx).is_some() {
                return Err(CatalogError::Invalid(format!(
                    "duplicate compiler id {}",
                    compiler.id
                )));
            }
        }

        let mut dir_owner = Vec::with_capacity(compilers.len());
        for (idx, compiler) in compilers.iter().enumerate() {
            let owner = match compiler.base_compiler {
                None => idx,
                Some(base) => {
                    let base_idx = *compiler_index.get(base).ok_or_else(|| {
                        CatalogError::Invalid(format!(
                            "compiler {} references unknown base compiler {}",
                            compiler.id, base
                        ))
                    })?;
                    if compilers[base_idx].base_compiler.is_some() {
                        return Err(CatalogError::Invalid(format!(
                            "base compiler {} of {} has its own base",
                            base, compiler.id
                        )));
                    }
                    base_idx
                }
            };
            dir_owner.push(owner);
        }

        Ok(Self {
            paths,
            platforms: platforms.to_vec(),
            compilers,
            compiler_index,
            dir_owner,
        })
    }

    /// Registry over the built-in platform and compiler tables.
    pub fn builtin(paths: PathsConfig) -> Result<Self, CatalogError> {
        Self::new(paths, platforms::ALL, compilers::ALL.to_vec())
    }

    /// Initialise the process-wide registry. Later calls return the first one.
    pub fn init(paths: PathsConfig) -> Result<&'static Registry, CatalogError> {
        if let Some(existing) = GLOBAL.get() {
            return Ok(existing);
        }
        let registry = Self::builtin(paths)?;
        tracing::info!(
            platforms = registry.platforms.len(),
            compilers = registry.compilers.len(),
            "Toolchain registry initialised"
        );
        Ok(GLOBAL.get_or_init(|| registry))
    }

    /// The process-wide registry, if `init` has run.
    pub fn global() -> Option<&'static Registry> {
        GLOBAL.get()
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    pub fn platforms(&self) -> &[&'static Platform] {
        &self.platforms
    }

    pub fn compilers(&self) -> &[Compiler] {
        &self.compilers
    }

    pub fn platform(&self, id: &str) -> Result<&'static Platform, CatalogError> {
        self.platforms
            .iter()
            .copied()
            .find(|p| p.id == id)
            .ok_or_else(|| CatalogError::UnknownPlatform(id.to_string()))
    }

    pub fn compiler(&self, id: &str) -> Result<&Compiler, CatalogError> {
        self.compiler_index
            .get(id)
            .map(|&idx| &self.compilers[idx])
            .ok_or_else(|| CatalogError::UnknownCompiler(id.to_string()))
    }

    /// Owning platform of a registered compiler (validated at build time).
    pub fn platform_of(&self, compiler: &Compiler) -> &'static Platform {
        self.platforms
            .iter()
            .copied()
            .find(|p| p.id == compiler.platform)
            .unwrap_or(&platforms::DUMMY)
    }

    /// `<compiler_base>/<platform>/<id>` of the compiler, or of its base compiler.
    pub fn compiler_dir(&self, compiler: &Compiler) -> PathBuf {
        let owner = self
            .compiler_index
            .get(compiler.id)
            .map(|&idx| &self.compilers[self.dir_owner[idx]])
            .unwrap_or(compiler);
        self.paths.compiler_base.join(owner.platform).join(owner.id)
    }

    /// A compiler is available iff its resolved directory exists right now.
    pub fn is_available(&self, compiler: &Compiler) -> bool {
        if compiler.family == CompilerFamily::Dummy {
            return true;
        }
        let dir = self.compiler_dir(compiler);
        if !dir.is_dir() {
            tracing::debug!("Compiler {} not found at {}", compiler.id, dir.display());
            return false;
        }
        true
    }

    /// Look up a compiler and require it to be provisioned.
    pub fn available_compiler(&self, id: &str) -> Result<&Compiler, CatalogError> {
        let compiler = self.compiler(id)?;
        if !self.is_available(compiler) {
            return Err(CatalogError::CompilerUnavailable(id.to_string()));
        }
        Ok(compiler)
    }

    pub fn available_compilers(&self) -> Vec<&Compiler> {
        self.compilers.iter().filter(|c| self.is_available(c)).collect()
    }

    /// Platforms with at least one available compiler.
    pub fn available_platforms(&self) -> Vec<&'static Platform> {
        let available = self.available_compilers();
        self.platforms
            .iter()
            .copied()
            .filter(|p| available.iter().any(|c| c.platform == p.id))
            .collect()
    }

    pub fn compilers_for_platform(&self, platform_id: &str, only_available: bool) -> Vec<&Compiler> {
        self.compilers
            .iter()
            .filter(|c| c.platform == platform_id)
            .filter(|c| !only_available || self.is_available(c))
            .collect()
    }

    pub fn libraries(&self, platform_id: &str) -> Vec<LibraryVersions> {
        library::discover(&self.paths.library_base, platform_id)
    }

    /// Include paths for the requested libraries; every one must be provisioned.
    pub fn library_include_paths(
        &self,
        platform_id: &str,
        libraries: &[Library],
    ) -> Result<Vec<PathBuf>, CatalogError> {
        libraries
            .iter()
            .map(|lib| {
                if lib.available(&self.paths.library_base, platform_id) {
                    Ok(lib.include_path(&self.paths.library_base, platform_id))
                } else {
                    Err(CatalogError::UnknownLibrary(format!("{}@{}", lib.name, lib.version)))
                }
            })
            .collect()
    }
}
