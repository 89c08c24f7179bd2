//! Static toolchain definitions.
//!
//! Entries that only differ in how the same binaries are driven point at a
//! `base_compiler` instead of duplicating the on-disk directory.

use super::compiler::{Compiler, CompilerFamily as F, Language};

// ─── Shared command templates ───────────────────────────────────────────────

const DUMMY_CC: &str = r#"echo "int func(void) { return 5; }" > "${OUTPUT}" && cat "${INPUT}" >> "${OUTPUT}""#;

const IDO_CC: &str = r#"IDO_CC="${COMPILER_DIR}/cc" "${COMPILER_DIR}/cc" -c -Xcpluscomm -G0 -non_shared -Wab,-r4300_mul -woff 649,838,712 -32 ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const IDO_IRIX_CC: &str = r#"IDO_CC="${COMPILER_DIR}/cc" "${COMPILER_DIR}/cc" -c -Xcpluscomm -G0 -non_shared -woff 649,838,712 -32 ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const IDO_PASCAL_CC: &str = r#"IDO_CC="${COMPILER_DIR}/cc" "${COMPILER_DIR}/cc" -c -G0 -non_shared -Wab,-r4300_mul -32 ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;

const GCC_N64_CC: &str = r#"COMPILER_PATH="${COMPILER_DIR}" "${COMPILER_DIR}"/gcc -c -G0 -mgp32 -mfp32 ${COMPILER_FLAGS} "${INPUT}" -o "${OUTPUT}""#;
const EGCS_N64_CC: &str = r#"COMPILER_PATH="${COMPILER_DIR}" "${COMPILER_DIR}"/gcc -c -G0 -fno-PIC -mgp32 -mfp32 -mcpu=4300 ${COMPILER_FLAGS} "${INPUT}" -o "${OUTPUT}""#;

const PSYQ_CC: &str = r#"cpp -P "${INPUT}" | unix2dos | ${WINE} "${COMPILER_DIR}"/CC1PSX.EXE -quiet ${COMPILER_FLAGS} -o "${OUTPUT}".s && ${WINE} "${COMPILER_DIR}"/ASPSX.EXE -quiet "${OUTPUT}".s -o "${OUTPUT}".obj && "${COMPILER_DIR}"/psyq-obj-parser "${OUTPUT}".obj -o "${OUTPUT}""#;
const GCC_PS1_CC: &str = r#"cpp -P "${INPUT}" | "${COMPILER_DIR}"/cc1 -mips1 -mcpu=3000 -quiet ${COMPILER_FLAGS} -o "${OUTPUT}".s && mips-linux-gnu-as -EL -march=r3000 -mtune=r3000 -no-pad-sections -O1 -o "${OUTPUT}" "${OUTPUT}".s"#;

const EE_GCC_CC: &str = r#""${COMPILER_DIR}"/bin/ee-gcc -c -B "${COMPILER_DIR}"/bin/ee- ${COMPILER_FLAGS} "${INPUT}" -o "${OUTPUT}""#;
const MWCC_PS2_CC: &str = r#"${WINE} "${COMPILER_DIR}/mwccps2.exe" -c -nostdinc -stderr ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const MWCC_PSP_CC: &str = r#"${WINE} "${COMPILER_DIR}/mwccpsp.exe" -c -nostdinc -stderr ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const GCC_PSP_CC: &str = r#""${COMPILER_DIR}"/bin/psp-gcc -c -G0 ${COMPILER_FLAGS} "${INPUT}" -o "${OUTPUT}""#;

const MWCC_GC_CC: &str = r#"${WINE} "${COMPILER_DIR}/mwcceppc.exe" -c -proc gekko -nostdinc -stderr ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const MWCC_MAC_CC: &str = r#"${WINE} "${COMPILER_DIR}/mwcc.exe" -c -nostdinc -stderr ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const GCC_MAC_CC: &str = r#""${COMPILER_DIR}"/powerpc-darwin-cc1 -quiet ${COMPILER_FLAGS} -o "${OUTPUT}".s "${INPUT}" && powerpc-linux-gnu-as -mregnames -o "${OUTPUT}" "${OUTPUT}".s"#;

const MWCC_NDS_CC: &str = r#"${WINE} "${COMPILER_DIR}/mwccarm.exe" -pragma "msg_show_realref off" -c -proc arm946e -nostdinc -stderr ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;
const ARMCC_CC: &str = r#"${WINE} "${COMPILER_DIR}/bin/armcc.exe" -c --cpu=MPCore --fpmode=fast --apcs=/interwork -I "${COMPILER_DIR}/include" ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;

const AGBCC_CC: &str = r#"cc -E -I "${COMPILER_DIR}"/include -iquote include -nostdinc -undef "${INPUT}" | "${COMPILER_DIR}"/bin/agbcc ${COMPILER_FLAGS} -o - | arm-none-eabi-as -mcpu=arm7tdmi -o "${OUTPUT}""#;
const AGBCCPP_CC: &str = r#"cc -E -I "${COMPILER_DIR}"/include -iquote include -nostdinc -undef "${INPUT}" | "${COMPILER_DIR}"/bin/agbcp -quiet ${COMPILER_FLAGS} -o - | arm-none-eabi-as -mcpu=arm7tdmi -o "${OUTPUT}""#;

const CLANG_SWITCH_CC: &str = r#"TOOLROOT="${COMPILER_DIR}" "${COMPILER_DIR}"/bin/clang++ -target aarch64-linux-elf --sysroot="${COMPILER_DIR}"/botw-lib-musl -D_LIBCPP_HAS_THREAD_API_PTHREAD -mcpu=cortex-a57+fp+simd+crypto+crc -mno-implicit-float -fstandalone-debug -fPIC -Wl,-Bsymbolic-functions -shared -stdlib=libc++ -nostdlib ${COMPILER_FLAGS} -o "${OUTPUT}" "${INPUT}""#;

const CYGNUS_SATURN_CC: &str = r#""${COMPILER_DIR}"/cpp.exe -P "${INPUT}" -o src.i && ${WINE} "${COMPILER_DIR}"/cc1.exe -quiet ${COMPILER_FLAGS} src.i -o "${OUTPUT}".s && sh-elf-as --isa=sh2 --big -o "${OUTPUT}" "${OUTPUT}".s"#;
const SHC_DREAMCAST_CC: &str = r#"${WINE} "${COMPILER_DIR}/bin/shc.exe" ${COMPILER_FLAGS} -comment=nonest -cpu=sh4 -division=cpu -fpu=single -endian=little -extra=a=1800 -pic=0 -macsave=0 -sjis -string=const -object="${OUTPUT}" "${INPUT}""#;

const WATCOM_CC: &str = r#"${WINE} "${COMPILER_DIR}/binnt/wcc386.exe" -q -i="${COMPILER_DIR}/h" ${COMPILER_FLAGS} -fo="${OUTPUT}" "${INPUT}""#;
const MSVC_CC: &str = r#"${WINE} "${COMPILER_DIR}/Bin/CL.EXE" /c /nologo /I"${COMPILER_DIR}/Include" ${COMPILER_FLAGS} /Fd"/tmp/" /Fo"${OUTPUT}" "${INPUT}""#;

/// Every known toolchain. Append-only; ids are unique.
pub static ALL: &[Compiler] = &[
    // dummy
    Compiler::new("dummy", "dummy", F::Dummy, DUMMY_CC),
    Compiler::new("dummy_longrunning", "dummy", F::Dummy, r#"sleep 3600"#),
    // irix
    Compiler::new("ido5.3_irix", "irix", F::Ido, IDO_IRIX_CC).with_base("ido5.3"),
    Compiler::new("ido7.1_irix", "irix", F::Ido, IDO_IRIX_CC).with_base("ido7.1"),
    Compiler::new("ido5.3Pascal_irix", "irix", F::Ido, IDO_PASCAL_CC)
        .with_base("ido5.3")
        .with_language(Language::Pascal),
    // n64
    Compiler::new("ido5.3", "n64", F::Ido, IDO_CC),
    Compiler::new("ido7.1", "n64", F::Ido, IDO_CC),
    Compiler::new("ido6.0", "n64", F::Ido, IDO_CC),
    Compiler::new("ido5.3Pascal", "n64", F::Ido, IDO_PASCAL_CC)
        .with_base("ido5.3")
        .with_language(Language::Pascal),
    Compiler::new("gcc2.7.2kmc", "n64", F::Gcc, GCC_N64_CC),
    Compiler::new("gcc2.7.2sn", "n64", F::Gcc, GCC_N64_CC),
    Compiler::new("gcc2.8.1pm", "n64", F::Gcc, GCC_N64_CC),
    Compiler::new("gcc2.9sn", "n64", F::Gcc, GCC_N64_CC),
    Compiler::new("egcs_1.1.2-4", "n64", F::Gcc, EGCS_N64_CC),
    Compiler::new("egcs_1.1.2-4c", "n64", F::Gcc, EGCS_N64_CC).with_base("egcs_1.1.2-4"),
    Compiler::new("gcc4.4.0-mips64-elf", "n64", F::Gcc, GCC_N64_CC),
    // ps1
    Compiler::new("psyq3.3", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("psyq3.5", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("psyq3.6", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("psyq4.0", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("psyq4.1", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("psyq4.3", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("psyq4.6", "ps1", F::Gcc, PSYQ_CC),
    Compiler::new("gcc2.6.3-psx", "ps1", F::Gcc, GCC_PS1_CC),
    Compiler::new("gcc2.7.2-psx", "ps1", F::Gcc, GCC_PS1_CC),
    Compiler::new("gcc2.8.1-psx", "ps1", F::Gcc, GCC_PS1_CC),
    Compiler::new("gcc2.95.2-psx", "ps1", F::Gcc, GCC_PS1_CC),
    // ps2
    Compiler::new("ee-gcc2.9-990721", "ps2", F::Gcc, EE_GCC_CC),
    Compiler::new("ee-gcc2.9-991111", "ps2", F::Gcc, EE_GCC_CC),
    Compiler::new("ee-gcc2.96", "ps2", F::Gcc, EE_GCC_CC),
    Compiler::new("ee-gcc3.2-040921", "ps2", F::Gcc, EE_GCC_CC),
    Compiler::new("mwcps2-2.3-991202", "ps2", F::Mwcc, MWCC_PS2_CC),
    Compiler::new("mwcps2-3.0b22-020123", "ps2", F::Mwcc, MWCC_PS2_CC),
    Compiler::new("mwcps2-3.0.1b44", "ps2", F::Mwcc, MWCC_PS2_CC),
    // psp
    Compiler::new("mwcpsp3.0.1_147", "psp", F::Mwcc, MWCC_PSP_CC),
    Compiler::new("mwcpsp3.0.1_180", "psp", F::Mwcc, MWCC_PSP_CC),
    Compiler::new("psp-gcc-4.0.1", "psp", F::Gcc, GCC_PSP_CC),
    // gc_wii
    Compiler::new("mwcc_233_144", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_233_159", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_233_163", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_233_163e", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_242_81", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_247_92", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_247_105", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_247_107", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_247_108", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_41_60831", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_42_127", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_43_151", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_43_172", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_43_213", "gc_wii", F::Mwcc, MWCC_GC_CC),
    Compiler::new("mwcc_233_163_cxx", "gc_wii", F::Mwcc, MWCC_GC_CC)
        .with_base("mwcc_233_163")
        .with_language(Language::Cxx),
    // macosx
    Compiler::new("mwcppc_23", "macosx", F::Mwcc, MWCC_MAC_CC),
    Compiler::new("mwcppc_24", "macosx", F::Mwcc, MWCC_MAC_CC),
    Compiler::new("gcc-5026", "macosx", F::Gcc, GCC_MAC_CC),
    Compiler::new("gcc-5370", "macosx", F::Gcc, GCC_MAC_CC),
    Compiler::new("gcc3-1041", "macosx", F::Gcc, GCC_MAC_CC),
    // nds_arm9
    Compiler::new("mwcc_20_72", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_20_79", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_20_82", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_20_84", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_20_87", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_114", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_123", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_126", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_131", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_133", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_134", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_136", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_137", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_138", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_30_139", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1018", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1024", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1026", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1027", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1028", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1034", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1036", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    Compiler::new("mwcc_40_1051", "nds_arm9", F::Mwcc, MWCC_NDS_CC),
    // n3ds
    Compiler::new("armcc_40_771", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_40_821", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_561", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_713", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_791", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_894", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_921", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_1049", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_1440", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_41_1454", "n3ds", F::Armcc, ARMCC_CC),
    Compiler::new("armcc_504_82", "n3ds", F::Armcc, ARMCC_CC),
    // gba
    Compiler::new("agbcc", "gba", F::Gcc, AGBCC_CC),
    Compiler::new("old_agbcc", "gba", F::Gcc, AGBCC_CC).with_base("agbcc"),
    Compiler::new("agbccpp", "gba", F::Gcc, AGBCCPP_CC)
        .with_base("agbcc")
        .with_language(Language::Cxx),
    // switch
    Compiler::new("clang-3.9.1", "switch", F::Clang, CLANG_SWITCH_CC).with_language(Language::Cxx),
    Compiler::new("clang-4.0.1", "switch", F::Clang, CLANG_SWITCH_CC).with_language(Language::Cxx),
    Compiler::new("clang-8.0.0", "switch", F::Clang, CLANG_SWITCH_CC).with_language(Language::Cxx),
    // saturn
    Compiler::new("cygnus-2.7-96Q3", "saturn", F::Gcc, CYGNUS_SATURN_CC),
    // dreamcast
    Compiler::new("shc-v5.0r16", "dreamcast", F::Shc, SHC_DREAMCAST_CC),
    Compiler::new("shc-v5.1r11", "dreamcast", F::Shc, SHC_DREAMCAST_CC),
    // msdos
    Compiler::new("wcc10.5", "msdos", F::Watcom, WATCOM_CC),
    Compiler::new("wcc10.6", "msdos", F::Watcom, WATCOM_CC),
    Compiler::new("wcc11.0", "msdos", F::Watcom, WATCOM_CC),
    // win32
    Compiler::new("msvc4.0", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc4.2", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc5.0", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc6.0", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc6.3", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc6.4", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc6.5", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc6.5pp", "win32", F::Msvc, MSVC_CC).with_base("msvc6.5"),
    Compiler::new("msvc6.6", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc7.0", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc7.1", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc8.0", "win32", F::Msvc, MSVC_CC),
    Compiler::new("msvc8.0p", "win32", F::Msvc, MSVC_CC).with_base("msvc8.0"),
];
