//! Per-architecture disassembly conventions.

use std::sync::OnceLock;

use regex::Regex;

/// Used when a platform names an architecture with no settings of its own
pub const DEFAULT_ARCH: &str = "mips";

#[derive(Debug)]
pub struct ArchSettings {
    pub name: &'static str,
    /// Extra objdump arguments (`-m mips:4300`, ...)
    pub arch_flags: &'static [&'static str],
    /// Register operand
    pub re_reg: &'static str,
    /// Stack-pointer relative operand
    pub re_sprel: &'static str,
    /// Local branches; the last operand is a code address in the same function
    pub branch_instructions: &'static [&'static str],
    /// Branch mnemonics matched by prefix (condition-code families)
    pub branch_prefixes: &'static [&'static str],
    /// Mnemonics that look like branches but leave the function
    pub branch_exclusions: &'static [&'static str],
    /// Calls whose symbol operand names another function
    pub call_instructions: &'static [&'static str],
    /// objdump output is not available; every line is one opaque instruction
    pub plain_text: bool,
}

const MIPS_REG: &str = r"\$?\b(a[0-7]|t[0-9]|s[0-8]|at|v[01]|f[0-9]+|k[01]|fp|ra|zero|gp|sp|r[0-9]+)\b|\$[0-9]+";
const MIPS_SPREL: &str = r"-?(0x[0-9a-f]+|[0-9]+)\(\$?(sp|29)\)";
const MIPS_BRANCHES: &[&str] = &[
    "b", "beq", "bne", "beqz", "bnez", "bgez", "bgtz", "blez", "bltz", "bc1t", "bc1f", "beql",
    "bnel", "beqzl", "bnezl", "bgezl", "bgtzl", "blezl", "bltzl", "bc1tl", "bc1fl",
];

static ARCHES: &[ArchSettings] = &[
    ArchSettings {
        name: "mips",
        arch_flags: &["-m", "mips:4300"],
        re_reg: MIPS_REG,
        re_sprel: MIPS_SPREL,
        branch_instructions: MIPS_BRANCHES,
        branch_prefixes: &[],
        branch_exclusions: &[],
        call_instructions: &["jal", "jalr"],
        plain_text: false,
    },
    ArchSettings {
        name: "mipsel",
        arch_flags: &["-m", "mips:3000"],
        re_reg: MIPS_REG,
        re_sprel: MIPS_SPREL,
        branch_instructions: MIPS_BRANCHES,
        branch_prefixes: &[],
        branch_exclusions: &[],
        call_instructions: &["jal", "jalr"],
        plain_text: false,
    },
    ArchSettings {
        name: "mipsee",
        arch_flags: &["-m", "mips:5900"],
        re_reg: MIPS_REG,
        re_sprel: MIPS_SPREL,
        branch_instructions: MIPS_BRANCHES,
        branch_prefixes: &[],
        branch_exclusions: &[],
        call_instructions: &["jal", "jalr"],
        plain_text: false,
    },
    ArchSettings {
        name: "mips64",
        arch_flags: &["-m", "mips:4000"],
        re_reg: MIPS_REG,
        re_sprel: MIPS_SPREL,
        branch_instructions: MIPS_BRANCHES,
        branch_prefixes: &[],
        branch_exclusions: &[],
        call_instructions: &["jal", "jalr"],
        plain_text: false,
    },
    ArchSettings {
        name: "ppc",
        arch_flags: &[],
        re_reg: r"\b(r[0-9]+|f[0-9]+|cr[0-7]|lr|ctr)\b",
        re_sprel: r"-?(0x[0-9a-f]+|[0-9]+)\(r1\)",
        branch_instructions: &["b"],
        branch_prefixes: &["b"],
        branch_exclusions: &["bl", "blr", "bctr", "bctrl", "blrl", "bla"],
        call_instructions: &["bl"],
        plain_text: false,
    },
    ArchSettings {
        name: "arm32",
        arch_flags: &[],
        re_reg: r"\b(r[0-9]+|sp|lr|pc|ip|fp|sl|sb)\b",
        re_sprel: r"\[sp(, #-?(0x[0-9a-f]+|[0-9]+))?\]",
        branch_instructions: &["b"],
        branch_prefixes: &["b.", "beq", "bne", "bcs", "bcc", "bmi", "bpl", "bvs", "bvc", "bhi", "bls", "bge", "blt", "bgt", "ble", "bhs", "blo"],
        branch_exclusions: &["bl", "blx", "bx", "bic", "bics"],
        call_instructions: &["bl", "blx"],
        plain_text: false,
    },
    ArchSettings {
        name: "aarch64",
        arch_flags: &[],
        re_reg: r"\b([xw][0-9]+|sp|xzr|wzr|[qdsbh][0-9]+|v[0-9]+(\.[0-9]*[bhsdq])?)\b",
        re_sprel: r"\[sp(, #-?(0x[0-9a-f]+|[0-9]+))?\]!?",
        branch_instructions: &["b", "cbz", "cbnz", "tbz", "tbnz"],
        branch_prefixes: &["b."],
        branch_exclusions: &["bl", "blr", "br"],
        call_instructions: &["bl"],
        plain_text: false,
    },
    ArchSettings {
        name: "sh2",
        arch_flags: &[],
        re_reg: r"\b(r[0-9]+|pr|mach|macl|gbr|vbr|sr|pc)\b",
        re_sprel: r"@\(-?[0-9]+,r15\)",
        branch_instructions: &["bra", "bt", "bf", "bt.s", "bf.s", "bt/s", "bf/s"],
        branch_prefixes: &[],
        branch_exclusions: &[],
        call_instructions: &["bsr", "jsr"],
        plain_text: false,
    },
    ArchSettings {
        name: "m68k",
        arch_flags: &[],
        re_reg: r"%?\b([ad][0-7]|sp|fp[0-7]|pc)\b",
        re_sprel: r"%?sp@\(-?[0-9]+\)|\(-?[0-9]+,%?sp\)",
        branch_instructions: &["bra", "bras", "braw", "jbra"],
        branch_prefixes: &["b", "db", "jb"],
        branch_exclusions: &["bsr", "bsrs", "bsrw", "bset", "bclr", "bchg", "btst", "bfextu", "bfexts"],
        call_instructions: &["jsr", "bsr", "bsrs", "bsrw"],
        plain_text: false,
    },
    ArchSettings {
        name: "x86",
        arch_flags: &[],
        re_reg: r"%?\b([re]?[abcd]x|[abcd][lh]|[re]?[sd]il?|[re]?[sb]pl?|r[0-9]+[dwb]?|xmm[0-9]+|st\([0-7]\))\b",
        re_sprel: r"-?(0x[0-9a-f]+)?\(%[er]?sp\)|\[[er]?sp([+-]0x[0-9a-f]+)?\]",
        branch_instructions: &["jmp"],
        branch_prefixes: &["j"],
        branch_exclusions: &[],
        call_instructions: &["call", "calll"],
        plain_text: false,
    },
    ArchSettings {
        name: "dummy",
        arch_flags: &[],
        re_reg: r"$^",
        re_sprel: r"$^",
        branch_instructions: &[],
        branch_prefixes: &[],
        branch_exclusions: &[],
        call_instructions: &[],
        plain_text: true,
    },
];

fn compiled() -> &'static [Arch] {
    static COMPILED: OnceLock<Vec<Arch>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        ARCHES
            .iter()
            .map(|settings| Arch {
                settings,
                reg: Regex::new(settings.re_reg).expect("arch register regex"),
                sprel: Regex::new(settings.re_sprel).expect("arch sp-relative regex"),
            })
            .collect()
    })
}

/// Compiled settings for one architecture.
#[derive(Debug)]
pub struct Arch {
    pub settings: &'static ArchSettings,
    pub reg: Regex,
    pub sprel: Regex,
}

impl Arch {
    /// Settings for `name`, falling back to [`DEFAULT_ARCH`] with a warning.
    ///
    /// Regexes are compiled once per process.
    pub fn for_name(name: &str) -> &'static Arch {
        let table = compiled();
        match table.iter().find(|a| a.settings.name == name) {
            Some(arch) => arch,
            None => {
                tracing::warn!("No diff settings for arch {}, using {}", name, DEFAULT_ARCH);
                table
                    .iter()
                    .find(|a| a.settings.name == DEFAULT_ARCH)
                    .unwrap_or(&table[0])
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.settings.name
    }

    pub fn arch_flags(&self) -> Vec<String> {
        self.settings.arch_flags.iter().map(|s| s.to_string()).collect()
    }

    pub fn is_branch(&self, mnemonic: &str) -> bool {
        let s = self.settings;
        if s.branch_exclusions.contains(&mnemonic) {
            return false;
        }
        s.branch_instructions.contains(&mnemonic)
            || s.branch_prefixes.iter().any(|p| mnemonic.starts_with(p))
    }

    pub fn is_call(&self, mnemonic: &str) -> bool {
        self.settings.call_instructions.contains(&mnemonic)
    }

    /// The whole operand is a register.
    pub fn is_register(&self, operand: &str) -> bool {
        self.reg
            .find(operand)
            .map(|m| m.start() == 0 && m.end() == operand.len())
            .unwrap_or(false)
    }

    pub fn is_stack_ref(&self, operand: &str) -> bool {
        self.sprel.is_match(operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_arch_regex_compiles() {
        for settings in ARCHES {
            let arch = Arch::for_name(settings.name);
            assert_eq!(arch.name(), settings.name);
        }
    }

    #[test]
    fn test_unknown_arch_falls_back() {
        assert_eq!(Arch::for_name("z80").name(), DEFAULT_ARCH);
    }

    #[test]
    fn test_lookups_share_compiled_settings() {
        assert!(std::ptr::eq(Arch::for_name("ppc"), Arch::for_name("ppc")));
        assert!(std::ptr::eq(Arch::for_name("z80"), Arch::for_name(DEFAULT_ARCH)));
        assert_eq!(compiled().len(), ARCHES.len());
    }

    #[test]
    fn test_mips_operands() {
        let arch = Arch::for_name("mips");
        assert!(arch.is_register("a0"));
        assert!(arch.is_register("$v0"));
        assert!(arch.is_register("$29"));
        assert!(!arch.is_register("0x10"));
        assert!(arch.is_stack_ref("20(sp)"));
        assert!(!arch.is_stack_ref("20(a0)"));
        assert!(arch.is_branch("beqz"));
        assert!(!arch.is_branch("jal"));
        assert!(arch.is_call("jal"));
        assert_eq!(arch.arch_flags(), vec!["-m", "mips:4300"]);
    }

    #[test]
    fn test_ppc_branches() {
        let arch = Arch::for_name("ppc");
        assert!(arch.is_branch("bne"));
        assert!(arch.is_branch("bdnz"));
        assert!(!arch.is_branch("bl"));
        assert!(!arch.is_branch("blr"));
        assert!(arch.is_stack_ref("8(r1)"));
    }

    #[test]
    fn test_arm_branches() {
        let arch = Arch::for_name("arm32");
        assert!(arch.is_branch("beq"));
        assert!(!arch.is_branch("bx"));
        assert!(!arch.is_branch("bl"));
        assert!(arch.is_stack_ref("[sp, #4]"));
    }
}
