use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A library requested for a compilation (name + version).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub version: String,
}

impl Library {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `<library_base>/<name>/<version>/<platform>/include`
    pub fn include_path(&self, library_base: &Path, platform: &str) -> PathBuf {
        library_base
            .join(&self.name)
            .join(&self.version)
            .join(platform)
            .join("include")
    }

    /// Name and version are each one plain directory name, so the include
    /// path cannot leave `library_base`.
    pub fn is_well_formed(&self) -> bool {
        is_plain_component(&self.name) && is_plain_component(&self.version)
    }

    /// Re-checked on every call; libraries are provisioned out-of-band.
    pub fn available(&self, library_base: &Path, platform: &str) -> bool {
        if !self.is_well_formed() || !is_plain_component(platform) {
            tracing::warn!("Rejected library {:?}@{:?}", self.name, self.version);
            return false;
        }
        let path = self.include_path(library_base, platform);
        if !path.is_dir() {
            tracing::debug!("Library {}@{} not found at {}", self.name, self.version, path.display());
            return false;
        }
        true
    }
}

fn is_plain_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
}

/// All provisioned versions of one library for a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryVersions {
    pub name: String,
    pub supported_versions: Vec<String>,
}

/// Scan `library_base` for libraries that have an include dir for `platform`.
pub fn discover(library_base: &Path, platform: &str) -> Vec<LibraryVersions> {
    let mut result = Vec::new();
    let Ok(names) = std::fs::read_dir(library_base) else {
        return result;
    };
    let mut names: Vec<_> = names.filter_map(|e| e.ok()).filter(|e| e.path().is_dir()).collect();
    names.sort_by_key(|e| e.file_name());
    for name_entry in names {
        let name = name_entry.file_name().to_string_lossy().to_string();
        let Ok(versions) = std::fs::read_dir(name_entry.path()) else {
            continue;
        };
        let mut supported: Vec<String> = versions
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|version| Library::new(&name, version).available(library_base, platform))
            .collect();
        if supported.is_empty() {
            continue;
        }
        supported.sort();
        result.push(LibraryVersions {
            name,
            supported_versions: supported,
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_path_layout() {
        let lib = Library::new("directx", "8.0");
        assert_eq!(
            lib.include_path(Path::new("/libs"), "win32"),
            PathBuf::from("/libs/directx/8.0/win32/include")
        );
    }

    #[test]
    fn test_discover_only_lists_platform_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("directx/8.0/win32/include")).unwrap();
        std::fs::create_dir_all(dir.path().join("directx/5.0/win32/include")).unwrap();
        std::fs::create_dir_all(dir.path().join("libultra/2.0I/n64/include")).unwrap();

        let win = discover(dir.path(), "win32");
        assert_eq!(
            win,
            vec![LibraryVersions {
                name: "directx".to_string(),
                supported_versions: vec!["5.0".to_string(), "8.0".to_string()],
            }]
        );
        assert!(Library::new("libultra", "2.0I").available(dir.path(), "n64"));
        assert!(!Library::new("libultra", "2.0I").available(dir.path(), "win32"));
    }

    #[test]
    fn test_traversal_components_are_never_available() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("libraries");
        std::fs::create_dir_all(base.join("directx/8.0/win32/include")).unwrap();
        std::fs::create_dir_all(dir.path().join("secret/win32/include")).unwrap();

        assert!(Library::new("directx", "8.0").available(&base, "win32"));
        for lib in [
            Library::new("..", "secret"),
            Library::new("directx/../..", "secret"),
            Library::new("directx", "../8.0"),
            Library::new("directx", "8.0\\x"),
            Library::new("", "8.0"),
            Library::new(".", "directx"),
        ] {
            assert!(!lib.is_well_formed(), "{:?}", lib);
            assert!(!lib.available(&base, "win32"), "{:?}", lib);
        }
        assert!(!Library::new("directx", "8.0").available(&base, "../win32"));
    }

    #[test]
    fn test_discover_missing_base_is_empty() {
        assert!(discover(Path::new("/nonexistent/cromper/libs"), "n64").is_empty());
    }
}
