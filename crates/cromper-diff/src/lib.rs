//! Instruction-level diffing of two objects.
//!
//! Both sides are disassembled with the platform's objdump (memoised by
//! content), normalised into comparable lines, aligned on mnemonics and
//! scored with a penalty model. See [`DiffWrapper::diff`].

pub mod align;
pub mod arch;
pub mod config;
pub mod diff;
pub mod error;
pub mod objdump;
pub mod preprocess;
pub mod score;

pub use arch::Arch;
pub use config::{Algorithm, DiffConfig};
pub use diff::{DiffLine, DiffResult, DiffRow, DiffWrapper, MismatchReason, RowKind, MAX_ROWS};
pub use error::{DiffError, NmError, ObjdumpError};
pub use objdump::{DisassemblyCache, ObjdumpRequest, ObjdumpRunner, SandboxObjdumpRunner};
