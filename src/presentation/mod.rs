//! Presentation layer: ratatui rendering and keyboard handling.

pub mod input;
pub mod ui;

pub use input::*;
pub use ui::*;
