//! sheetcalc - a small spreadsheet engine with a terminal front end.
//!
//! Cells hold raw text classified as empty, numeric, textual or formula.
//! Formulas support `+ - * /`, parentheses, cell references, ranges and the
//! aggregates `SUMA`, `MIN`, `MAX` and `PROMEDIO`, and are evaluated on demand
//! with circular references detected across the whole resolution chain.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
