//! Application layer: interactive session state between the domain and the
//! terminal UI.

pub mod state;

pub use state::*;
