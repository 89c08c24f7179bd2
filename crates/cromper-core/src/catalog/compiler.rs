use serde::Serialize;

use super::flags::{
    Flag, COMMON_ARMCC_FLAGS, COMMON_CLANG_FLAGS, COMMON_GCC_FLAGS, COMMON_IDO_FLAGS,
    COMMON_MSVC_FLAGS, COMMON_MWCC_FLAGS, COMMON_SHC_FLAGS, COMMON_WATCOM_FLAGS,
};

/// Source language accepted by a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    C,
    #[serde(rename = "c++")]
    Cxx,
    Pascal,
    Assembly,
}

impl Language {
    pub fn file_extension(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "cpp",
            Language::Pascal => "p",
            Language::Assembly => "s",
        }
    }
}

/// Toolchain family. Gates family-specific command handling and decides the
/// library include flag and the common flag descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerFamily {
    Gcc,
    Ido,
    Mwcc,
    Msvc,
    Armcc,
    Clang,
    Watcom,
    Shc,
    Dummy,
}

impl CompilerFamily {
    pub fn library_include_flag(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc | CompilerFamily::Clang | CompilerFamily::Dummy => "-isystem",
            CompilerFamily::Ido | CompilerFamily::Armcc => "-I",
            CompilerFamily::Mwcc => "-IR",
            CompilerFamily::Msvc => "/I",
            CompilerFamily::Watcom => "-i=",
            CompilerFamily::Shc => "-include=",
        }
    }

    pub fn flags(&self) -> &'static [Flag] {
        match self {
            CompilerFamily::Gcc => COMMON_GCC_FLAGS,
            CompilerFamily::Ido => COMMON_IDO_FLAGS,
            CompilerFamily::Mwcc => COMMON_MWCC_FLAGS,
            CompilerFamily::Msvc => COMMON_MSVC_FLAGS,
            CompilerFamily::Armcc => COMMON_ARMCC_FLAGS,
            CompilerFamily::Clang => COMMON_CLANG_FLAGS,
            CompilerFamily::Watcom => COMMON_WATCOM_FLAGS,
            CompilerFamily::Shc => COMMON_SHC_FLAGS,
            CompilerFamily::Dummy => &[],
        }
    }

    /// Windows-hosted toolchain, launched through `${WINE}`.
    pub fn needs_wine(&self) -> bool {
        matches!(
            self,
            CompilerFamily::Mwcc
                | CompilerFamily::Msvc
                | CompilerFamily::Armcc
                | CompilerFamily::Watcom
                | CompilerFamily::Shc
        )
    }

    /// Decompiler naming for the toolchain family (`<arch>-<family>` triples).
    pub fn m2c_name(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc | CompilerFamily::Clang => "gcc",
            CompilerFamily::Ido => "ido",
            CompilerFamily::Mwcc => "mwcc",
            _ => "unknown",
        }
    }
}

/// A single toolchain build and its invocation recipe.
///
/// `cc` is a shell template; `${INPUT}`, `${OUTPUT}`, `${COMPILER_DIR}`,
/// `${COMPILER_FLAGS}`, `${FUNCTION}` and `${WINE}` are supplied through the
/// environment at run time.
///
/// `base_compiler` names another catalog entry whose on-disk directory this
/// toolchain reuses; it is resolved through the registry, never copied.
#[derive(Debug, Clone, Serialize)]
pub struct Compiler {
    pub id: &'static str,
    /// Owning platform id
    pub platform: &'static str,
    pub family: CompilerFamily,
    pub language: Language,
    #[serde(skip)]
    pub cc: &'static str,
    #[serde(skip)]
    pub base_compiler: Option<&'static str>,
}

impl Compiler {
    pub const fn new(
        id: &'static str,
        platform: &'static str,
        family: CompilerFamily,
        cc: &'static str,
    ) -> Self {
        Self {
            id,
            platform,
            family,
            language: Language::C,
            cc,
            base_compiler: None,
        }
    }

    pub const fn with_base(self, base: &'static str) -> Self {
        Self {
            base_compiler: Some(base),
            ..self
        }
    }

    pub const fn with_language(self, language: Language) -> Self {
        Self { language, ..self }
    }

    pub fn is_gcc(&self) -> bool {
        self.family == CompilerFamily::Gcc
    }

    pub fn is_ido(&self) -> bool {
        self.family == CompilerFamily::Ido
    }

    pub fn is_mwcc(&self) -> bool {
        self.family == CompilerFamily::Mwcc
    }

    pub fn library_include_flag(&self) -> &'static str {
        self.family.library_include_flag()
    }

    pub fn flags(&self) -> &'static [Flag] {
        self.family.flags()
    }

    pub fn needs_wine(&self) -> bool {
        self.family.needs_wine()
    }
}
