//! Infrastructure layer: file persistence and configuration.

pub mod config;
pub mod errors;
pub mod persistence;

pub use config::*;
pub use errors::*;
pub use persistence::*;
