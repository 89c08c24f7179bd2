use cromper_core::catalog::flags::{DIFF_DIFFLIB, DIFF_FUNCTION_SYMBOLS, DIFF_NO_SHOW_RODATA_REFS};

/// Prefix shared by every diff-engine flag; everything else goes to objdump.
const DIFF_FLAG_PREFIX: &str = "-DIFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Levenshtein,
    /// Longest-common-subsequence line diff
    Difflib,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    pub algorithm: Algorithm,
    pub show_rodata_refs: bool,
    /// Callee symbols take part in the comparison
    pub diff_function_symbols: bool,
    /// `-M...` and other passthrough options for objdump
    pub objdump_flags: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Levenshtein,
            show_rodata_refs: true,
            diff_function_symbols: false,
            objdump_flags: Vec::new(),
        }
    }
}

impl DiffConfig {
    pub fn from_flags<S: AsRef<str>>(flags: &[S]) -> Self {
        let mut config = Self::default();
        for flag in flags.iter().map(AsRef::as_ref) {
            match flag {
                DIFF_DIFFLIB => config.algorithm = Algorithm::Difflib,
                DIFF_NO_SHOW_RODATA_REFS => config.show_rodata_refs = false,
                DIFF_FUNCTION_SYMBOLS => config.diff_function_symbols = true,
                f if f.starts_with(DIFF_FLAG_PREFIX) => {}
                f if !f.trim().is_empty() => config.objdump_flags.push(f.to_string()),
                _ => {}
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiffConfig::from_flags::<&str>(&[]);
        assert_eq!(config, DiffConfig::default());
        assert_eq!(config.algorithm, Algorithm::Levenshtein);
    }

    #[test]
    fn test_parses_engine_and_passthrough_flags() {
        let config = DiffConfig::from_flags(&[
            "-DIFFdifflib",
            "-DIFFno_show_rodata_refs",
            "-DIFFdiff_function_symbols",
            "-DIFFlevenshtein_typo",
            "-Mreg-names=32",
            "-Mno-aliases",
        ]);
        assert_eq!(config.algorithm, Algorithm::Difflib);
        assert!(!config.show_rodata_refs);
        assert!(config.diff_function_symbols);
        assert_eq!(config.objdump_flags, vec!["-Mreg-names=32", "-Mno-aliases"]);
    }
}
