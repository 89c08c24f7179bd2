//! API handlers

mod catalog;
mod health;
mod jobs;

pub use catalog::*;
pub use health::*;
pub use jobs::*;
