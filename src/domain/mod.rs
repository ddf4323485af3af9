//! Domain layer: cell addressing, formula parsing and evaluation, and the
//! grid that owns the cells.

pub mod address;
pub mod errors;
pub mod functions;
pub mod lexer;
pub mod models;
pub mod parser;
pub mod services;

pub use address::*;
pub use errors::*;
pub use functions::*;
pub use lexer::*;
pub use models::*;
pub use parser::*;
pub use services::*;
