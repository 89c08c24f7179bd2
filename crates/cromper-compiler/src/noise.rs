//! Strip compatibility-layer chatter from toolchain output.

use regex::Regex;
use std::sync::OnceLock;

/// Patterns for lines that are infrastructure noise, not compiler diagnostics.
const NOISE_PATTERNS: &[&str] = &[
    r"(?m)^wine: could not load .*\.dll.*\n?",
    r"(?m)^wineserver: could not save registry .*\n?",
    r"(?m)^### .*\.exe Driver Error:.*\n?",
    r"(?m)^#   Cannot find my executable .*\n?",
    r"(?m)^### MWCPPC\.exe Driver Error:.*\n?",
    r"(?m)^[0-9a-f]{4}:(fixme|err):.*\n?",
];

static NOISE_RES: OnceLock<Vec<Regex>> = OnceLock::new();

pub fn filter_compile_errors(text: &str) -> String {
    let patterns = NOISE_RES.get_or_init(|| {
        NOISE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("noise regex"))
            .collect()
    });
    let mut out = text.to_string();
    for re in patterns {
        out = re.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_wine_noise() {
        let raw = "wine: could not load kernel32.dll, status c0000135\n\
                   code.c:3: error: parse error before '}'\n\
                   wineserver: could not save registry branch to system.reg\n\
                   0024:fixme:ntdll:NtQuerySystemInformation info_class SYSTEM_PERFORMANCE_INFORMATION\n";
        assert_eq!(filter_compile_errors(raw), "code.c:3: error: parse error before '}'");
    }

    #[test]
    fn test_strips_driver_banner() {
        let raw = "### mwcceppc.exe Driver Error:\n#   Cannot find my executable \"mwcceppc.exe\"\nreal error\n";
        assert_eq!(filter_compile_errors(raw), "real error");
    }

    #[test]
    fn test_keeps_plain_diagnostics() {
        assert_eq!(filter_compile_errors("warning: unused variable\n"), "warning: unused variable");
    }
}
