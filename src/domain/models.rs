use super::address::CellAddress;
use super::errors::DomainResult;
use super::services::{FormulaEvaluator, GridAccess, DEFAULT_MAX_DEPTH};
use std::collections::HashMap;
use tracing::warn;

/// Marks the start of a formula in raw cell content.
pub const FORMULA_MARKER: char = '=';

/// Classification of a cell's raw content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Number,
    Text,
    Formula,
}

impl CellKind {
    /// Classifies trimmed raw content.
    pub fn classify(raw: &str) -> Self {
        if raw.is_empty() {
            CellKind::Empty
        } else if raw.starts_with(FORMULA_MARKER) {
            CellKind::Formula
        } else if parse_number(raw).is_some() {
            CellKind::Number
        } else {
            CellKind::Text
        }
    }
}

/// Reads numeric cell content.
///
/// Accepts decimal and exponent notation with an optional sign and an
/// optional `f`/`d` type suffix (`2.5e1`, `-.5`, `3d`), and the exact words
/// `Infinity` and `NaN` with an optional sign. Other spellings such as `inf`,
/// `nan` or `INFINITY` are not numbers.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::parse_number;
///
/// assert_eq!(parse_number("2.5e1"), Some(25.0));
/// assert_eq!(parse_number("-Infinity"), Some(f64::NEG_INFINITY));
/// assert_eq!(parse_number("inf"), None);
/// ```
pub fn parse_number(text: &str) -> Option<f64> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    match unsigned {
        "NaN" => Some(f64::NAN),
        "Infinity" if text.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ if unsigned.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.') => {
            let literal = text.strip_suffix(['f', 'F', 'd', 'D']).unwrap_or(text);
            literal.parse().ok()
        }
        _ => None,
    }
}

/// One cell: its raw text, how that text classifies, and the last number
/// computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    raw: String,
    kind: CellKind,
    cached: f64,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            raw: String::new(),
            kind: CellKind::Empty,
            cached: 0.0,
        }
    }
}

impl Cell {
    pub fn new(raw: &str) -> Self {
        let mut cell = Self::default();
        cell.set_raw(raw);
        cell
    }

    /// Replaces the content, trimming it and reclassifying.
    ///
    /// A number is cached immediately and blank content resets the cache; a
    /// formula keeps whatever was cached until it is next evaluated.
    pub fn set_raw(&mut self, content: &str) {
        self.raw = content.trim().to_string();
        self.kind = CellKind::classify(&self.raw);

        match self.kind {
            CellKind::Empty => self.cached = 0.0,
            CellKind::Number => self.cached = parse_number(&self.raw).unwrap_or_default(),
            CellKind::Text | CellKind::Formula => {}
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn cached_number(&self) -> f64 {
        self.cached
    }

    pub fn set_cached_number(&mut self, value: f64) {
        self.cached = value;
    }

    /// Formula text after the marker, for formula cells only.
    pub fn formula_body(&self) -> Option<&str> {
        match self.kind {
            CellKind::Formula => self.raw.strip_prefix(FORMULA_MARKER),
            _ => None,
        }
    }
}

/// The grid of cells, keyed by address.
///
/// Formula assignments are validated by evaluating them; a formula that
/// cannot be evaluated is never left in the grid.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::{DomainError, Spreadsheet};
///
/// let mut sheet = Spreadsheet::default();
/// sheet.set_cell("A1", "=B1+1").unwrap();
///
/// let err = sheet.set_cell("B1", "=A1+1").unwrap_err();
/// assert!(matches!(err, DomainError::CircularDependency(_)));
/// assert_eq!(sheet.raw("B1").unwrap(), "");
/// ```
#[derive(Debug, Clone)]
pub struct Spreadsheet {
    cells: HashMap<CellAddress, Cell>,
    max_depth: usize,
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}

impl Spreadsheet {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            cells: HashMap::new(),
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn get(&self, address: CellAddress) -> Option<&Cell> {
        self.cells.get(&address)
    }

    /// Raw content of a cell; empty for cells never written.
    pub fn raw(&self, reference: &str) -> DomainResult<&str> {
        let address = CellAddress::parse(reference)?;
        Ok(self.get(address).map(Cell::raw).unwrap_or(""))
    }

    /// Assigns new content to a cell.
    ///
    /// Formula content is evaluated straight away. If that fails for any
    /// reason the previous content is restored and the error returned.
    pub fn set_cell(&mut self, reference: &str, content: &str) -> DomainResult<()> {
        let address = CellAddress::parse(reference)?;
        let cell = self.cells.entry(address).or_default();
        let previous = cell.raw().to_string();
        cell.set_raw(content);

        if cell.kind() != CellKind::Formula {
            return Ok(());
        }

        if let Err(err) = self.evaluate_address(address) {
            warn!(cell = %address, error = %err, "rejected formula, restoring previous content");
            if let Some(cell) = self.cells.get_mut(&address) {
                cell.set_raw(&previous);
            }
            return Err(err);
        }

        Ok(())
    }

    /// Stores content without evaluating it. Used for bulk loads, which are
    /// followed by [`Spreadsheet::recompute_all`].
    pub fn insert_raw(&mut self, address: CellAddress, content: &str) {
        self.cells.entry(address).or_default().set_raw(content);
    }

    /// Evaluates a cell from a clean state.
    pub fn evaluate(&mut self, reference: &str) -> DomainResult<f64> {
        let max_depth = self.max_depth;
        FormulaEvaluator::with_max_depth(self, max_depth).evaluate(reference)
    }

    pub fn evaluate_address(&mut self, address: CellAddress) -> DomainResult<f64> {
        self.evaluate(&address.to_string())
    }

    /// Addresses with non-empty content, in row-major order.
    pub fn non_empty_cells(&self) -> Vec<CellAddress> {
        let mut addresses: Vec<CellAddress> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.kind() != CellKind::Empty)
            .map(|(address, _)| *address)
            .collect();
        addresses.sort();
        addresses
    }

    /// Largest column index and row number in use, if any cell has content.
    pub fn extent(&self) -> Option<(usize, usize)> {
        let cells = self.non_empty_cells();
        let max_col = cells.iter().map(|a| a.col).max()?;
        let max_row = cells.iter().map(|a| a.row).max()?;
        Some((max_col, max_row))
    }

    /// Re-evaluates every non-empty cell, stopping at the first failure.
    pub fn recompute_all(&mut self) -> DomainResult<()> {
        for address in self.non_empty_cells() {
            self.evaluate_address(address)?;
        }
        Ok(())
    }
}

impl GridAccess for Spreadsheet {
    fn kind(&self, address: CellAddress) -> CellKind {
        self.get(address).map(Cell::kind).unwrap_or(CellKind::Empty)
    }

    fn formula_body(&self, address: CellAddress) -> Option<String> {
        self.get(address)?.formula_body().map(str::to_string)
    }

    fn cached_number(&self, address: CellAddress) -> f64 {
        self.get(address).map(Cell::cached_number).unwrap_or(0.0)
    }

    fn set_cached_number(&mut self, address: CellAddress, value: f64) {
        self.cells.entry(address).or_default().set_cached_number(value);
    }
}
