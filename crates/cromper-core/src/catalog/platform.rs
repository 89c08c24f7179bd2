use serde::Serialize;

use super::flags::Flag;

/// A target architecture plus the binutils commands used to assemble and
/// inspect objects built for it.
///
/// Command templates are executed through a shell inside the sandbox;
/// `$INPUT`, `$OUTPUT`, `$PRELUDE` and `$COMPILER_BASE_PATH` arrive as
/// environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct Platform {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Instruction-set tag used to pick diff settings (`mips`, `ppc`, ...)
    pub arch: &'static str,
    #[serde(skip)]
    pub assemble_cmd: &'static str,
    #[serde(skip)]
    pub objdump_cmd: &'static str,
    #[serde(skip)]
    pub nm_cmd: &'static str,
    /// Macros prepended to hand-written target assembly
    #[serde(skip)]
    pub asm_prelude: &'static str,
    /// objdump understands `--disassemble=<symbol>`
    pub supports_objdump_disassemble: bool,
    pub has_decompiler: bool,
    pub diff_flags: &'static [Flag],
}

impl Platform {
    pub fn is_dummy(&self) -> bool {
        self.id == super::platforms::DUMMY.id
    }
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Platform {}

impl std::hash::Hash for Platform {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
