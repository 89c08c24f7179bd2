//! Platform / compiler / library catalog.
//!
//! - `platform`, `compiler`, `library`, `flags`: data types
//! - `platforms`, `compilers`: the static definitions
//! - `registry`: validated, read-only lookup structure

pub mod compiler;
pub mod compilers;
pub mod flags;
pub mod library;
pub mod platform;
pub mod platforms;
pub mod registry;

pub use compiler::{Compiler, CompilerFamily, Language};
pub use flags::Flag;
pub use library::{Library, LibraryVersions};
pub use platform::Platform;
pub use registry::Registry;
