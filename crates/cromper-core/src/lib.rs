//! Shared foundation for cromper: environment-driven configuration, the
//! platform/compiler/library catalog and content hashing.

pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod serde_b64;

pub use catalog::{Compiler, CompilerFamily, Language, Library, Platform, Registry};
pub use error::CatalogError;
