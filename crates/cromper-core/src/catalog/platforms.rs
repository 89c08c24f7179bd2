//! Static platform definitions.

use super::flags::{COMMON_DIFF_FLAGS, COMMON_MIPS_DIFF_FLAGS};
use super::platform::Platform;

const MIPS_PRELUDE: &str = r#"
.macro .late_rodata
    .section .rodata
.endm

.macro glabel label
    .global \label
    .type \label, @function
    \label:
.endm

.macro dlabel label
    .global \label
    \label:
.endm

.macro jlabel label
    \label:
.endm

.set noat
.set noreorder
.set gp=64
"#;

const MIPSEL_PRELUDE: &str = r#"
.macro .late_rodata
    .section .rodata
.endm

.macro glabel label
    .global \label
    .type \label, @function
    \label:
.endm

.macro jlabel label
    \label:
.endm

.set noat
.set noreorder
"#;

const PPC_PRELUDE: &str = r#"
.macro glabel label
    .global \label
    .type \label, @function
    \label:
.endm

.macro .fn name, visibility=global
    .\visibility "\name"
    .type "\name", @function
    "\name":
.endm

.macro .endfn name
    .size "\name", . - "\name"
.endm

.set r0, 0
.set r1, 1
.set r2, 2
.set r3, 3
.set r4, 4
.set r5, 5
.set r6, 6
.set r7, 7
.set r8, 8
.set r9, 9
.set r10, 10
.set r11, 11
.set r12, 12
.set r13, 13
.set r14, 14
.set r15, 15
.set r16, 16
.set r17, 17
.set r18, 18
.set r19, 19
.set r20, 20
.set r21, 21
.set r22, 22
.set r23, 23
.set r24, 24
.set r25, 25
.set r26, 26
.set r27, 27
.set r28, 28
.set r29, 29
.set r30, 30
.set r31, 31
.set f0, 0
.set f1, 1
.set f2, 2
.set f3, 3
.set f4, 4
.set f5, 5
.set f6, 6
.set f7, 7
.set f8, 8
.set f9, 9
.set f10, 10
.set f11, 11
.set f12, 12
.set f13, 13
.set f14, 14
.set f15, 15
.set f16, 16
.set f17, 17
.set f18, 18
.set f19, 19
.set f20, 20
.set f21, 21
.set f22, 22
.set f23, 23
.set f24, 24
.set f25, 25
.set f26, 26
.set f27, 27
.set f28, 28
.set f29, 29
.set f30, 30
.set f31, 31
.set qr0, 0
.set qr1, 1
.set qr2, 2
.set qr3, 3
.set qr4, 4
.set qr5, 5
.set qr6, 6
.set qr7, 7
"#;

const ARM_PRELUDE: &str = r#"
.macro glabel label
    .global \label
    .type \label, %function
    \label:
.endm

.macro arm_func_start name
    .align 2, 0
    .global \name
    .arm
    .type \name, %function
.endm

.macro arm_func_end name
.endm

.macro thumb_func_start name
    .align 2, 0
    .global \name
    .thumb
    .thumb_func
    .type \name, %function
.endm

.macro thumb_func_end name
.endm

.syntax unified
"#;

const AARCH64_PRELUDE: &str = r#"
.macro glabel label
    .global \label
    .type \label, %function
    \label:
.endm
"#;

const SH_PRELUDE: &str = r#"
.macro glabel label
    .global \label
    \label:
.endm
"#;

const X86_PRELUDE: &str = r#"
.macro glabel label
    .global \label
    \label:
.endm

.intel_syntax noprefix
"#;

/// No-op platform used by tests and local smoke runs: "assembling" copies
/// the input and nothing needs to be provisioned.
pub const DUMMY: Platform = Platform {
    id: "dummy",
    name: "Dummy System",
    description: "DMY",
    arch: "dummy",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" > "$OUTPUT""#,
    objdump_cmd: "cat",
    nm_cmd: "true",
    asm_prelude: "",
    supports_objdump_disassemble: false,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const IRIX: Platform = Platform {
    id: "irix",
    name: "IRIX",
    description: "MIPS (big-endian, PIC)",
    arch: "mips",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | mips-linux-gnu-as -march=vr4300 -mabi=32 -KPIC -o "$OUTPUT""#,
    objdump_cmd: "mips-linux-gnu-objdump",
    nm_cmd: "mips-linux-gnu-nm",
    asm_prelude: MIPS_PRELUDE,
    supports_objdump_disassemble: false,
    has_decompiler: true,
    diff_flags: COMMON_MIPS_DIFF_FLAGS,
};

pub const N64: Platform = Platform {
    id: "n64",
    name: "Nintendo 64",
    description: "MIPS (big-endian)",
    arch: "mips",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | mips-linux-gnu-as -march=vr4300 -mabi=32 -o "$OUTPUT""#,
    objdump_cmd: "mips-linux-gnu-objdump",
    nm_cmd: "mips-linux-gnu-nm",
    asm_prelude: MIPS_PRELUDE,
    supports_objdump_disassemble: false,
    has_decompiler: true,
    diff_flags: COMMON_MIPS_DIFF_FLAGS,
};

pub const PS1: Platform = Platform {
    id: "ps1",
    name: "PlayStation",
    description: "MIPS (little-endian)",
    arch: "mipsel",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | mips-linux-gnu-as -EL -march=r3000 -mabi=32 -no-pad-sections -o "$OUTPUT""#,
    objdump_cmd: "mips-linux-gnu-objdump",
    nm_cmd: "mips-linux-gnu-nm",
    asm_prelude: MIPSEL_PRELUDE,
    supports_objdump_disassemble: false,
    has_decompiler: true,
    diff_flags: COMMON_MIPS_DIFF_FLAGS,
};

pub const PS2: Platform = Platform {
    id: "ps2",
    name: "PlayStation 2",
    description: "MIPS (little-endian, r5900)",
    arch: "mipsee",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | mips-linux-gnu-as -EL -march=r5900 -mabi=eabi -G0 -no-pad-sections -o "$OUTPUT""#,
    objdump_cmd: "mips-linux-gnu-objdump",
    nm_cmd: "mips-linux-gnu-nm",
    asm_prelude: MIPSEL_PRELUDE,
    supports_objdump_disassemble: false,
    has_decompiler: true,
    diff_flags: COMMON_MIPS_DIFF_FLAGS,
};

pub const PSP: Platform = Platform {
    id: "psp",
    name: "PlayStation Portable",
    description: "MIPS (little-endian, allegrex)",
    arch: "mipsel",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | mips-linux-gnu-as -EL -march=r4000 -mabi=eabi -G0 -no-pad-sections -o "$OUTPUT""#,
    objdump_cmd: "mips-linux-gnu-objdump",
    nm_cmd: "mips-linux-gnu-nm",
    asm_prelude: MIPSEL_PRELUDE,
    supports_objdump_disassemble: false,
    has_decompiler: true,
    diff_flags: COMMON_MIPS_DIFF_FLAGS,
};

pub const GC_WII: Platform = Platform {
    id: "gc_wii",
    name: "GameCube / Wii",
    description: "PowerPC (Gekko/Broadway)",
    arch: "ppc",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | powerpc-eabi-as -mgekko -o "$OUTPUT""#,
    objdump_cmd: "powerpc-eabi-objdump -M broadway",
    nm_cmd: "powerpc-eabi-nm",
    asm_prelude: PPC_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: true,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const MACOSX: Platform = Platform {
    id: "macosx",
    name: "Mac OS X",
    description: "PowerPC",
    arch: "ppc",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | powerpc-linux-gnu-as -mregnames -o "$OUTPUT""#,
    objdump_cmd: "powerpc-linux-gnu-objdump",
    nm_cmd: "powerpc-linux-gnu-nm",
    asm_prelude: PPC_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const NDS_ARM9: Platform = Platform {
    id: "nds_arm9",
    name: "Nintendo DS",
    description: "ARMv5TE",
    arch: "arm32",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | sed 's/;/;@/' | arm-none-eabi-as -mcpu=arm946e-s -mfpu=softfpa -o "$OUTPUT""#,
    objdump_cmd: "arm-none-eabi-objdump",
    nm_cmd: "arm-none-eabi-nm",
    asm_prelude: ARM_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const N3DS: Platform = Platform {
    id: "n3ds",
    name: "Nintendo 3DS",
    description: "ARMv6K",
    arch: "arm32",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | arm-none-eabi-as -mfpu=vfpv2 -mcpu=mpcore -o "$OUTPUT""#,
    objdump_cmd: "arm-none-eabi-objdump",
    nm_cmd: "arm-none-eabi-nm",
    asm_prelude: ARM_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const GBA: Platform = Platform {
    id: "gba",
    name: "Game Boy Advance",
    description: "ARMv4T",
    arch: "arm32",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | arm-none-eabi-as -mcpu=arm7tdmi -o "$OUTPUT""#,
    objdump_cmd: "arm-none-eabi-objdump",
    nm_cmd: "arm-none-eabi-nm",
    asm_prelude: ARM_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const SWITCH: Platform = Platform {
    id: "switch",
    name: "Nintendo Switch",
    description: "AArch64",
    arch: "aarch64",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | aarch64-linux-gnu-as -mcpu=cortex-a57+fp+simd+crypto+crc -o "$OUTPUT""#,
    objdump_cmd: "aarch64-linux-gnu-objdump",
    nm_cmd: "aarch64-linux-gnu-nm",
    asm_prelude: AARCH64_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const SATURN: Platform = Platform {
    id: "saturn",
    name: "Sega Saturn",
    description: "SH2 (big-endian)",
    arch: "sh2",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | sh-elf-as --isa=sh2 --big -o "$OUTPUT""#,
    objdump_cmd: "sh-elf-objdump",
    nm_cmd: "sh-elf-nm",
    asm_prelude: SH_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const DREAMCAST: Platform = Platform {
    id: "dreamcast",
    name: "Dreamcast",
    description: "SH4 (little-endian)",
    arch: "sh2",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | sh-elf-as --isa=sh4 --little --relax -o "$OUTPUT""#,
    objdump_cmd: "sh-elf-objdump -EL",
    nm_cmd: "sh-elf-nm",
    asm_prelude: SH_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const MSDOS: Platform = Platform {
    id: "msdos",
    name: "MS-DOS",
    description: "x86 (32-bit protected mode)",
    arch: "x86",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | i686-linux-gnu-as --32 -mmnemonic=intel -msyntax=intel -mnaked-reg -o "$OUTPUT""#,
    objdump_cmd: "i686-linux-gnu-objdump -M intel",
    nm_cmd: "i686-linux-gnu-nm",
    asm_prelude: X86_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const WIN32: Platform = Platform {
    id: "win32",
    name: "Windows (9x/NT)",
    description: "x86 (32-bit)",
    arch: "x86",
    assemble_cmd: r#"cat "$PRELUDE" "$INPUT" | i686-w64-mingw32-as --32 -mmnemonic=intel -msyntax=intel -mnaked-reg -o "$OUTPUT""#,
    objdump_cmd: "i686-w64-mingw32-objdump -M intel",
    nm_cmd: "i686-w64-mingw32-nm",
    asm_prelude: X86_PRELUDE,
    supports_objdump_disassemble: true,
    has_decompiler: false,
    diff_flags: COMMON_DIFF_FLAGS,
};

pub const ALL: &[&Platform] = &[
    &DUMMY, &IRIX, &N64, &PS1, &PS2, &PSP, &GC_WII, &MACOSX, &NDS_ARM9, &N3DS, &GBA, &SWITCH,
    &SATURN, &DREAMCAST, &MSDOS, &WIN32,
];
