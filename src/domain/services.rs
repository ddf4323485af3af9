//! Formula evaluation services.
//!
//! [`FormulaEvaluator`] resolves cells recursively. A formula is evaluated in
//! two steps: every function call in it is reduced to a number, which is
//! written back into the text as a compact decimal, and the remaining
//! arithmetic is converted to postfix and run on a value stack. References
//! met along the way are resolved the same way. A single visiting set is
//! threaded through the whole chain so that a cell reached again while it is
//! still being resolved is reported as a circular dependency, and a single
//! depth counter bounds how many formulas may be in progress at once.

use super::address::CellAddress;
use super::errors::{DomainError, DomainResult};
use super::functions::{format_number, MissingValuePolicy};
use super::models::CellKind;
use super::parser::{parse_arithmetic, segments, Argument, Expr, FunctionCall, Segment, Term};
use std::collections::HashSet;
use tracing::debug;

/// Limit on nested formula evaluations (cell references plus call
/// arguments) used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What the evaluator needs from the grid that owns the cells.
///
/// Addresses are always normalized before they reach the grid. Cells the
/// grid has never seen are [`CellKind::Empty`].
pub trait GridAccess {
    fn kind(&self, address: CellAddress) -> CellKind;

    /// Formula text without the leading `=`, or `None` for non-formula cells.
    fn formula_body(&self, address: CellAddress) -> Option<String>;

    fn cached_number(&self, address: CellAddress) -> f64;

    fn set_cached_number(&mut self, address: CellAddress, value: f64);
}

/// Cells currently being resolved on the active call path.
pub type VisitingSet = HashSet<CellAddress>;

/// Evaluates cells of a grid, caching each formula result on its cell.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::{FormulaEvaluator, Spreadsheet};
///
/// let mut sheet = Spreadsheet::default();
/// sheet.set_cell("A1", "4").unwrap();
/// sheet.set_cell("A2", "=A1*2+1").unwrap();
///
/// let mut evaluator = FormulaEvaluator::new(&mut sheet);
/// assert_eq!(evaluator.evaluate("a2").unwrap(), 9.0);
/// ```
pub struct FormulaEvaluator<'a, G: GridAccess> {
    grid: &'a mut G,
    max_depth: usize,
}

impl<'a, G: GridAccess> FormulaEvaluator<'a, G> {
    pub fn new(grid: &'a mut G) -> Self {
        Self::with_max_depth(grid, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(grid: &'a mut G, max_depth: usize) -> Self {
        Self { grid, max_depth }
    }

    /// Evaluates the cell named by `reference` from a clean state.
    pub fn evaluate(&mut self, reference: &str) -> DomainResult<f64> {
        let mut visiting = VisitingSet::new();
        self.resolve(reference, &mut visiting)
    }

    /// Evaluates a formula body as if it lived in no particular cell.
    pub fn evaluate_body(&mut self, body: &str) -> DomainResult<f64> {
        let mut visiting = VisitingSet::new();
        self.evaluate_formula(body, &mut visiting, 0)
    }

    /// Resolves one cell under the caller's visiting set.
    ///
    /// The address is in the set exactly while its own resolution is in
    /// progress, so sibling references to the same cell do not collide.
    pub fn resolve(&mut self, reference: &str, visiting: &mut VisitingSet) -> DomainResult<f64> {
        let address = CellAddress::parse(reference)?;
        self.resolve_address(address, visiting, 0)
    }

    fn resolve_address(
        &mut self,
        address: CellAddress,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<f64> {
        if visiting.contains(&address) {
            return Err(DomainError::CircularDependency(address.to_string()));
        }

        visiting.insert(address);
        let result = self.resolve_cell(address, visiting, depth);
        visiting.remove(&address);
        result
    }

    fn resolve_cell(
        &mut self,
        address: CellAddress,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<f64> {
        match self.grid.kind(address) {
            CellKind::Empty | CellKind::Text => Ok(0.0),
            CellKind::Number => Ok(self.grid.cached_number(address)),
            CellKind::Formula => {
                let body = self.grid.formula_body(address).unwrap_or_default();
                let value = self.evaluate_formula(&body, visiting, depth)?;
                debug!(cell = %address, value, "evaluated formula");
                self.grid.set_cached_number(address, value);
                Ok(value)
            }
        }
    }

    /// Every recursive step passes through here, so this is where the depth
    /// limit is enforced.
    fn evaluate_formula(
        &mut self,
        body: &str,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<f64> {
        if depth >= self.max_depth {
            return Err(DomainError::ExpressionTooDeep(self.max_depth));
        }

        let body: String = body.chars().filter(|ch| !ch.is_whitespace()).collect();
        let arithmetic = self.reduce_calls(&body, visiting, depth)?;
        let expr = parse_arithmetic(&arithmetic)?;
        self.evaluate_postfix(&expr, visiting, depth)
    }

    /// Replaces each function call in `body` with its formatted result.
    ///
    /// Calls are evaluated left to right before any of the surrounding text
    /// is tokenized. The result re-enters tokenization as written, so a
    /// negative result picks up the unary-sign rewrite and a non-finite one
    /// fails as an invalid token.
    fn reduce_calls(
        &mut self,
        body: &str,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<String> {
        let mut reduced = String::with_capacity(body.len());
        for segment in segments(body) {
            match segment? {
                Segment::Text(text) => reduced.push_str(text),
                Segment::Call(call) => {
                    let value = self.call_function(&call, visiting, depth)?;
                    reduced.push_str(&format_number(value));
                }
            }
        }
        Ok(reduced)
    }

    /// Runs a postfix sequence on a value stack.
    ///
    /// `depth` is that of the formula the expression came from; references
    /// are resolved one level deeper. An operator with fewer than two
    /// operands available is a [`DomainError::SyntaxError`]; anything but
    /// exactly one value left at the end is a [`DomainError::BadExpression`].
    pub fn evaluate_postfix(
        &mut self,
        expr: &Expr,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<f64> {
        let mut stack: Vec<f64> = Vec::new();

        for term in &expr.postfix {
            match term {
                Term::Number(text) => {
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| DomainError::InvalidToken(text.clone()))?;
                    stack.push(value);
                }
                Term::Cell(reference) => {
                    let address = CellAddress::parse(reference)?;
                    stack.push(self.resolve_address(address, visiting, depth + 1)?);
                }
                Term::Operator(operator) => {
                    let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                        return Err(DomainError::SyntaxError);
                    };
                    stack.push(operator.apply(left, right));
                }
            }
        }

        match stack.as_slice() {
            [value] => Ok(*value),
            _ => Err(DomainError::BadExpression),
        }
    }

    fn call_function(
        &mut self,
        call: &FunctionCall<'_>,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<f64> {
        let mut values = Vec::new();

        for arg in &call.args {
            match *arg {
                Argument::Range(start, end) => {
                    let start = CellAddress::parse(start)?;
                    let end = CellAddress::parse(end)?;
                    for address in CellAddress::span(start, end) {
                        self.collect_cell(call, address, &mut values, visiting, depth)?;
                    }
                }
                Argument::Cell(reference) => {
                    let address = CellAddress::parse(reference)?;
                    self.collect_cell(call, address, &mut values, visiting, depth)?;
                }
                Argument::Expression(text) => {
                    values.push(self.evaluate_formula(text, visiting, depth + 1)?);
                }
            }
        }

        call.function.apply(&values)
    }

    /// Adds one referenced cell to an aggregate's inputs, applying the
    /// function's policy for empty and text cells.
    fn collect_cell(
        &mut self,
        call: &FunctionCall<'_>,
        address: CellAddress,
        values: &mut Vec<f64>,
        visiting: &mut VisitingSet,
        depth: usize,
    ) -> DomainResult<()> {
        match (self.grid.kind(address), call.function.missing_value_policy()) {
            (CellKind::Empty | CellKind::Text, MissingValuePolicy::Zero) => values.push(0.0),
            (CellKind::Empty | CellKind::Text, MissingValuePolicy::Skip) => {}
            _ => values.push(self.resolve_address(address, visiting, depth + 1)?),
        }
        Ok(())
    }
}
