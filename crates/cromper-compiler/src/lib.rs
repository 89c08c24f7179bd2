//! Compiler and assembler orchestration.
//!
//! Each toolchain is a shell template from the catalog. [`CompilerWrapper`]
//! and [`AssemblerWrapper`] render it against a fresh [`Sandbox`], run it and
//! turn the outcome into a result value. A toolchain rejecting user code is a
//! normal result with error text; only infrastructure problems are `Err`.
//!
//! [`Sandbox`]: cromper_sandbox::Sandbox

pub mod assemble;
pub mod compile;
pub mod error;
pub mod flags;
pub mod noise;

pub use assemble::{AssembleRequest, AssemblerWrapper, AssemblyCache, AssemblyResult};
pub use compile::{CompilationResult, CompileRequest, CompilerWrapper};
pub use error::{AssemblyError, CompilationError};
pub use flags::{filter_compiler_flags, quote_options};
