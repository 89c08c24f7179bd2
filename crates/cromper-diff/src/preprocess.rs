//! Turns raw objdump text into comparable instruction lines.

use std::sync::OnceLock;

use regex::Regex;

use crate::arch::Arch;
use crate::config::DiffConfig;

/// Key placeholder for a local branch destination
const TARGET_KEY: &str = "<target>";
const FUNC_KEY: &str = "<func>";
const RODATA_KEY: &str = "<rodata>";

/// One disassembled instruction.
///
/// `args` is what gets displayed; `key_args` is what gets compared, with
/// branch targets and (optionally) callee or rodata symbols masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Offset from the first instruction of the function
    pub offset: u64,
    pub mnemonic: String,
    pub args: String,
    pub key_args: String,
    pub source_line: Option<u32>,
    pub branch_target: Option<u64>,
}

impl Line {
    pub fn text(&self) -> String {
        if self.args.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{}\t{}", self.mnemonic, self.args)
        }
    }

    /// Full comparison key: mnemonic plus masked operands.
    pub fn key(&self) -> String {
        format!("{} {}", self.mnemonic, self.key_args)
    }

    pub fn key_fields(&self) -> Vec<&str> {
        split_operands(&self.key_args)
    }
}

struct Patterns {
    insn: Regex,
    reloc: Regex,
    symbol_header: Regex,
    source_line: Regex,
    annotation: Regex,
    rodata: Regex,
    imm_with_base: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        insn: Regex::new(r"^\s*([0-9a-f]+):\t(.*)$").expect("insn regex"),
        reloc: Regex::new(r"^([0-9a-f]+): (R_\S+)\s+(.+)$").expect("reloc regex"),
        symbol_header: Regex::new(r"^[0-9a-f]+ <(.+)>:$").expect("symbol header regex"),
        source_line: Regex::new(r"^\S.*:(\d+)( \(discriminator \d+\))?$").expect("source line regex"),
        annotation: Regex::new(r"\s*<[^>]*>").expect("annotation regex"),
        rodata: Regex::new(r"(\.late_rodata|\.rodata|jtbl_|\$LC|\.LC)[\w.$+]*").expect("rodata regex"),
        imm_with_base: Regex::new(r"^-?(0x[0-9a-f]+|[0-9]+)(\(.*\))$").expect("imm regex"),
    })
}

/// Comma-separated operands, ignoring commas inside brackets.
pub fn split_operands(args: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth <= 0 => {
                fields.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() || !fields.is_empty() {
        fields.push(last);
    }
    fields
}

/// Swap the last operand for `replacement`.
fn replace_last_operand(args: &str, replacement: &str) -> String {
    let fields = split_operands(args);
    match fields.split_last() {
        Some((_, init)) if !init.is_empty() => format!("{},{}", init.join(","), replacement),
        _ => replacement.to_string(),
    }
}

/// Swap the immediate of the last operand, keeping a `(base)` suffix.
fn replace_immediate(args: &str, replacement: &str) -> String {
    let fields = split_operands(args);
    let Some(last) = fields.last() else {
        return replacement.to_string();
    };
    let operand = match patterns().imm_with_base.captures(last) {
        Some(caps) => format!("{}{}", replacement, &caps[2]),
        None => replacement.to_string(),
    };
    replace_last_operand(args, &operand)
}

/// Rewrite operands according to a relocation objdump printed after them.
fn apply_reloc(args: &str, reloc_type: &str, symbol: &str) -> String {
    match reloc_type {
        "R_MIPS_HI16" => replace_immediate(args, &format!("%hi({})", symbol)),
        "R_MIPS_LO16" => replace_immediate(args, &format!("%lo({})", symbol)),
        "R_MIPS_26" | "R_MIPS_PC16" => replace_last_operand(args, symbol),
        "R_MIPS_GOT16" | "R_MIPS_CALL16" => replace_immediate(args, &format!("%got({})", symbol)),
        "R_MIPS_GPREL16" => replace_immediate(args, &format!("%gp_rel({})", symbol)),
        "R_PPC_REL24" | "R_PPC_REL14" => replace_last_operand(args, symbol),
        "R_PPC_ADDR16_HA" => replace_immediate(args, &format!("{}@ha", symbol)),
        "R_PPC_ADDR16_HI" => replace_immediate(args, &format!("{}@h", symbol)),
        "R_PPC_ADDR16_LO" => replace_immediate(args, &format!("{}@l", symbol)),
        "R_PPC_EMB_SDA21" => replace_immediate(args, &format!("{}@sda21", symbol)),
        "R_ARM_CALL" | "R_ARM_PC24" | "R_ARM_JUMP24" | "R_ARM_THM_CALL" | "R_AARCH64_CALL26"
        | "R_AARCH64_JUMP26" => replace_last_operand(args, symbol),
        _ if args.is_empty() => format!("# {} {}", reloc_type, symbol),
        _ => format!("{} # {} {}", args, reloc_type, symbol),
    }
}

fn parse_hex(s: &str) -> Option<u64> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}

/// Parse objdump output for one function.
///
/// With a `label`, parsing stops at the next symbol header after the
/// function's first instruction. Trailing `nop` padding is dropped.
pub fn parse(text: &str, arch: &Arch, config: &DiffConfig, label: Option<&str>) -> Vec<Line> {
    let (mut lines, base) = if arch.settings.plain_text {
        (parse_plain(text), 0)
    } else {
        parse_objdump(text, label)
    };

    while lines.last().map(|l| l.mnemonic == "nop").unwrap_or(false) {
        lines.pop();
    }

    for line in &mut lines {
        normalize(line, base, arch, config);
    }
    lines
}

fn parse_plain(text: &str) -> Vec<Line> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, l)| {
            let (mnemonic, args) = l.split_once(char::is_whitespace).unwrap_or((l, ""));
            Line {
                offset: i as u64,
                mnemonic: mnemonic.to_string(),
                args: args.trim().to_string(),
                key_args: String::new(),
                source_line: None,
                branch_target: None,
            }
        })
        .collect()
}

/// Lines plus the address of the first instruction.
fn parse_objdump(text: &str, label: Option<&str>) -> (Vec<Line>, u64) {
    let p = patterns();
    let mut lines: Vec<Line> = Vec::new();
    let mut start: Option<u64> = None;
    let mut pending_source: Option<u32> = None;

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        if p.symbol_header.is_match(trimmed) {
            if label.is_some() && !lines.is_empty() {
                break;
            }
            continue;
        }

        if let Some(caps) = p.reloc.captures(trimmed) {
            if let Some(prev) = lines.last_mut() {
                prev.args = apply_reloc(&prev.args, &caps[2], caps[3].trim());
            }
            continue;
        }

        if let Some(caps) = p.insn.captures(raw) {
            let Some(addr) = parse_hex(&caps[1]) else {
                continue;
            };
            // bytes \t mnemonic \t args; a bytes-only row continues the previous one
            let mut cols = caps[2].splitn(2, '\t');
            let _bytes = cols.next();
            let Some(insn) = cols.next().map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            let (mnemonic, args) = insn.split_once(char::is_whitespace).unwrap_or((insn, ""));
            let args = p.annotation.replace_all(args.trim(), "").trim().to_string();
            let base = *start.get_or_insert(addr);
            lines.push(Line {
                offset: addr.saturating_sub(base),
                mnemonic: mnemonic.to_string(),
                args,
                key_args: String::new(),
                source_line: pending_source.take(),
                branch_target: None,
            });
            continue;
        }

        if !raw.starts_with(char::is_whitespace) {
            if let Some(caps) = p.source_line.captures(trimmed) {
                pending_source = caps[1].parse().ok();
            }
        }
    }

    (lines, start.unwrap_or(0))
}

fn normalize(line: &mut Line, base: u64, arch: &Arch, config: &DiffConfig) {
    let mut key_args = line.args.clone();

    if arch.is_branch(&line.mnemonic) {
        let target = split_operands(&line.args).last().and_then(|a| parse_hex(a));
        if let Some(target) = target {
            let target = target.saturating_sub(base);
            line.branch_target = Some(target);
            line.args = replace_last_operand(&line.args, &format!(".L{:x}", target));
            key_args = replace_last_operand(&line.args, TARGET_KEY);
        }
    } else if arch.is_call(&line.mnemonic) && !config.diff_function_symbols {
        key_args = replace_last_operand(&line.args, FUNC_KEY);
    }

    if !config.show_rodata_refs {
        key_args = patterns().rodata.replace_all(&key_args, RODATA_KEY).into_owned();
    }
    line.key_args = key_args;
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIPS_DUMP: &str = "
out.o:     file format elf32-tradbigmips


Disassembly of section .text:

00000000 <func_80001000>:
func_80001000():
/tmp/src.c:3
   0:\t27bdffe8 \taddiu\tsp,sp,-24
   4:\tafbf0014 \tsw\tra,20(sp)
/tmp/src.c:4
   8:\t3c040000 \tlui\ta0,0x0
\t\t\t8: R_MIPS_HI16\tD_80010000
   c:\t0c000000 \tjal\t0 <func_80001000>
\t\t\tc: R_MIPS_26\tosSyncPrintf
  10:\t24840000 \taddiu\ta0,a0,0
\t\t\t10: R_MIPS_LO16\tD_80010000
  14:\t10400002 \tbeqz\tv0,20 <func_80001000+0x20>
  18:\t8c430000 \tlw\tv1,0(v0)
\t\t\t18: R_MIPS_LO16\t.rodata
  1c:\t00000000 \tnop
  20:\t8fbf0014 \tlw\tra,20(sp)
  24:\t03e00008 \tjr\tra
  28:\t27bd0018 \taddiu\tsp,sp,24
  2c:\t00000000 \tnop

00000030 <other_func>:
  30:\t03e00008 \tjr\tra
";

    fn parse_mips(config: &DiffConfig, label: Option<&str>) -> Vec<Line> {
        parse(MIPS_DUMP, &Arch::for_name("mips"), config, label)
    }

    #[test]
    fn test_parses_function_and_stops_at_next_symbol() {
        let lines = parse_mips(&DiffConfig::default(), Some("func_80001000"));
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0].text(), "addiu\tsp,sp,-24");
        assert_eq!(lines[0].source_line, Some(3));
        assert_eq!(lines[1].source_line, None);
        assert_eq!(lines[2].source_line, Some(4));
        assert_eq!(lines.last().unwrap().text(), "addiu\tsp,sp,24");
    }

    #[test]
    fn test_without_label_reads_every_symbol() {
        let lines = parse_mips(&DiffConfig::default(), None);
        assert_eq!(lines.last().unwrap().offset, 0x30);
    }

    #[test]
    fn test_relocations_rewrite_operands() {
        let lines = parse_mips(&DiffConfig::default(), Some("func_80001000"));
        assert_eq!(lines[2].args, "a0,%hi(D_80010000)");
        assert_eq!(lines[3].args, "osSyncPrintf");
        assert_eq!(lines[4].args, "a0,a0,%lo(D_80010000)");
        assert_eq!(lines[6].args, "v1,%lo(.rodata)(v0)");
    }

    #[test]
    fn test_branch_targets_are_relative_and_masked() {
        let lines = parse_mips(&DiffConfig::default(), Some("func_80001000"));
        let branch = &lines[5];
        assert_eq!(branch.mnemonic, "beqz");
        assert_eq!(branch.branch_target, Some(0x20));
        assert_eq!(branch.args, "v0,.L20");
        assert_eq!(branch.key_args, "v0,<target>");
    }

    #[test]
    fn test_call_symbols_masked_unless_requested() {
        let lines = parse_mips(&DiffConfig::default(), Some("func_80001000"));
        assert_eq!(lines[3].key_args, FUNC_KEY);

        let config = DiffConfig::from_flags(&["-DIFFdiff_function_symbols"]);
        let lines = parse_mips(&config, Some("func_80001000"));
        assert_eq!(lines[3].key_args, "osSyncPrintf");
    }

    #[test]
    fn test_rodata_refs_masked_when_hidden() {
        let config = DiffConfig::from_flags(&["-DIFFno_show_rodata_refs"]);
        let lines = parse_mips(&config, Some("func_80001000"));
        assert_eq!(lines[6].key_args, "v1,%lo(<rodata>)(v0)");
        assert_eq!(lines[6].args, "v1,%lo(.rodata)(v0)");
    }

    #[test]
    fn test_plain_text_lines() {
        let lines = parse(
            "li a0, 5\n\njr ra\nnop\n",
            &Arch::for_name("dummy"),
            &DiffConfig::default(),
            None,
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].mnemonic, "li");
        assert_eq!(lines[0].args, "a0, 5");
        assert_eq!(lines[1].offset, 1);
    }

    #[test]
    fn test_split_operands_respects_brackets() {
        assert_eq!(split_operands("r0, [sp, #4]"), vec!["r0", "[sp, #4]"]);
        assert_eq!(split_operands("v1,%lo(a,b)(v0)"), vec!["v1", "%lo(a,b)(v0)"]);
        assert!(split_operands("").is_empty());
    }

    #[test]
    fn test_unknown_reloc_is_appended() {
        assert_eq!(apply_reloc("r3,0", "R_PPC_ADDR32", "sym"), "r3,0 # R_PPC_ADDR32 sym");
        assert_eq!(apply_reloc("r3,0(r4)", "R_PPC_ADDR16_LO", "sym"), "r3,sym@l(r4)");
        assert_eq!(apply_reloc("0", "R_PPC_REL24", "func"), "func");
    }
}
