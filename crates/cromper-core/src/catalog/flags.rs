//! Flag descriptors shown next to a compiler or platform.
//!
//! A checkbox toggles a single flag; a flag set offers mutually exclusive
//! alternatives (e.g. optimisation levels).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Flag {
    Checkbox {
        id: &'static str,
        flag: &'static str,
    },
    FlagSet {
        id: &'static str,
        flags: &'static [&'static str],
    },
}

impl Flag {
    pub fn id(&self) -> &'static str {
        match self {
            Flag::Checkbox { id, .. } | Flag::FlagSet { id, .. } => id,
        }
    }

    /// Whether `candidate` is one of the flags this descriptor can produce.
    pub fn offers(&self, candidate: &str) -> bool {
        match self {
            Flag::Checkbox { flag, .. } => *flag == candidate,
            Flag::FlagSet { flags, .. } => flags.contains(&candidate),
        }
    }
}

const fn checkbox(id: &'static str, flag: &'static str) -> Flag {
    Flag::Checkbox { id, flag }
}

const fn flag_set(id: &'static str, flags: &'static [&'static str]) -> Flag {
    Flag::FlagSet { id, flags }
}

// ─── Diff flags ──────────────────────────────────────────────────────────────

/// Select the simpler line-diff algorithm instead of Levenshtein alignment.
pub const DIFF_DIFFLIB: &str = "-DIFFdifflib";
/// Collapse references into read-only data sections.
pub const DIFF_NO_SHOW_RODATA_REFS: &str = "-DIFFno_show_rodata_refs";
/// Treat differing call-target symbols as a mismatch.
pub const DIFF_FUNCTION_SYMBOLS: &str = "-DIFFdiff_function_symbols";

pub const COMMON_DIFF_FLAGS: &[Flag] = &[
    flag_set("diff_algorithm", &["-DIFFlevenshtein", DIFF_DIFFLIB]),
    checkbox("no_show_rodata_refs", DIFF_NO_SHOW_RODATA_REFS),
    checkbox("diff_function_symbols", DIFF_FUNCTION_SYMBOLS),
];

pub const COMMON_MIPS_DIFF_FLAGS: &[Flag] = &[
    flag_set("diff_algorithm", &["-DIFFlevenshtein", DIFF_DIFFLIB]),
    checkbox("no_show_rodata_refs", DIFF_NO_SHOW_RODATA_REFS),
    checkbox("diff_function_symbols", DIFF_FUNCTION_SYMBOLS),
    checkbox("mreg_names=32", "-Mreg-names=32"),
    checkbox("mno_aliases", "-Mno-aliases"),
];

// ─── Compiler flags ──────────────────────────────────────────────────────────

pub const COMMON_GCC_FLAGS: &[Flag] = &[
    flag_set("gcc_opt_level", &["-O0", "-O1", "-O2", "-O3", "-Os"]),
    flag_set("gcc_debug_level", &["-g0", "-g1", "-g2", "-g3"]),
    checkbox("gcc_signed_char", "-fsigned-char"),
    checkbox("gcc_force_addr", "-fforce-addr"),
    checkbox("gcc_no_inline", "-fno-inline"),
];

pub const COMMON_IDO_FLAGS: &[Flag] = &[
    flag_set("ido_opt_level", &["-O0", "-O1", "-O2", "-O3"]),
    flag_set("ido_debug_level", &["-g0", "-g1", "-g2", "-g3"]),
    flag_set("mips_version", &["-mips1", "-mips2", "-mips3"]),
    checkbox("kpic", "-KPIC"),
    checkbox("pass_through_ido", "-Wab,-r4300_mul"),
    checkbox("ido_signed", "-signed"),
];

pub const COMMON_MWCC_FLAGS: &[Flag] = &[
    flag_set("mwcc_opt_level", &["-O0", "-O1", "-O2", "-O3", "-O4", "-O4,p", "-O4,s"]),
    flag_set("mwcc_inline", &["-inline on", "-inline off", "-inline auto", "-inline deferred"]),
    checkbox("mwcc_sym_on", "-sym on"),
    checkbox("mwcc_enum_int", "-enum int"),
    checkbox("mwcc_char_signed", "-char signed"),
];

pub const COMMON_MSVC_FLAGS: &[Flag] = &[
    flag_set("msvc_opt_level", &["/Od", "/O1", "/O2", "/Ox"]),
    flag_set("msvc_codegen", &["/GB", "/G3", "/G4", "/G5", "/G6"]),
    checkbox("msvc_no_frame_pointer", "/Oy"),
    checkbox("msvc_cpp_exceptions", "/GX"),
];

pub const COMMON_ARMCC_FLAGS: &[Flag] = &[
    flag_set("armcc_opt_level", &["-O0", "-O1", "-O2", "-O3"]),
    flag_set("armcc_instset", &["--arm", "--thumb"]),
    checkbox("armcc_debug", "--debug"),
];

pub const COMMON_CLANG_FLAGS: &[Flag] = &[
    flag_set("clang_opt_level", &["-O0", "-O1", "-O2", "-O3", "-Os"]),
    checkbox("clang_no_exceptions", "-fno-exceptions"),
    checkbox("clang_no_rtti", "-fno-rtti"),
];

pub const COMMON_WATCOM_FLAGS: &[Flag] = &[
    flag_set("watcom_opt_level", &["-od", "-ot", "-ox", "-os"]),
    flag_set("watcom_cpu", &["-3r", "-4r", "-5r", "-6r"]),
];

pub const COMMON_SHC_FLAGS: &[Flag] = &[
    flag_set("shc_opt_level", &["-optimize=0", "-optimize=1"]),
    flag_set("shc_speed", &["-speed", "-size"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_offers() {
        let set = flag_set("opt", &["-O1", "-O2"]);
        assert!(set.offers("-O2"));
        assert!(!set.offers("-O3"));
        assert_eq!(set.id(), "opt");
        assert!(checkbox("kpic", "-KPIC").offers("-KPIC"));
    }

    #[test]
    fn test_flag_serializes_tagged() {
        let json = serde_json::to_value(checkbox("kpic", "-KPIC")).unwrap();
        assert_eq!(json["type"], "checkbox");
        assert_eq!(json["flag"], "-KPIC");
    }

    #[test]
    fn test_mips_diff_flags_extend_common() {
        for flag in COMMON_DIFF_FLAGS {
            assert!(COMMON_MIPS_DIFF_FLAGS.iter().any(|f| f == flag));
        }
    }
}
