//! Aggregate functions available inside formulas.
//!
//! The registry is closed: a run of letters is only treated as a function
//! call when it names one of these and is directly followed by `(`.

use super::errors::{DomainError, DomainResult};
use std::fmt;
use std::str::FromStr;

/// A registered aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `SUMA` (alias `SUM`)
    Sum,
    Min,
    Max,
    /// `PROMEDIO` (alias `AVERAGE`)
    Average,
}

/// How an empty or textual cell named directly in an argument list
/// (alone or inside a range) contributes to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingValuePolicy {
    /// Contributes a zero.
    Zero,
    /// Contributes nothing and is not counted.
    Skip,
}

impl Function {
    pub const ALL: [Function; 4] = [Function::Sum, Function::Min, Function::Max, Function::Average];

    /// Looks up a function by name, ignoring case.
    pub fn lookup(name: &str) -> Option<Function> {
        match name.to_ascii_uppercase().as_str() {
            "SUMA" | "SUM" => Some(Function::Sum),
            "MIN" => Some(Function::Min),
            "MAX" => Some(Function::Max),
            "PROMEDIO" | "AVERAGE" => Some(Function::Average),
            _ => None,
        }
    }

    /// Canonical spelling used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "SUMA",
            Function::Min => "MIN",
            Function::Max => "MAX",
            Function::Average => "PROMEDIO",
        }
    }

    pub fn missing_value_policy(&self) -> MissingValuePolicy {
        match self {
            Function::Sum => MissingValuePolicy::Zero,
            Function::Min | Function::Max | Function::Average => MissingValuePolicy::Skip,
        }
    }

    /// Reduces the collected arguments to a single number.
    ///
    /// `SUMA` and `PROMEDIO` yield 0 for an empty list; `MIN` and `MAX` fail
    /// with [`DomainError::InsufficientArguments`] since an extremum of
    /// nothing is undefined. A NaN among the values makes `MIN` and `MAX`
    /// NaN as well.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetcalc::domain::Function;
    ///
    /// assert_eq!(Function::Average.apply(&[1.0, 2.0, 6.0]).unwrap(), 3.0);
    /// assert_eq!(Function::Average.apply(&[]).unwrap(), 0.0);
    /// assert!(Function::Max.apply(&[]).is_err());
    /// ```
    pub fn apply(&self, values: &[f64]) -> DomainResult<f64> {
        match self {
            Function::Sum => Ok(values.iter().sum()),
            Function::Average => {
                if values.is_empty() {
                    Ok(0.0)
                } else {
                    Ok(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
            Function::Min => self.extremum(values, nan_or(f64::min)),
            Function::Max => self.extremum(values, nan_or(f64::max)),
        }
    }

    fn extremum(&self, values: &[f64], pick: impl Fn(f64, f64) -> f64) -> DomainResult<f64> {
        let (first, rest) = values
            .split_first()
            .ok_or_else(|| DomainError::InsufficientArguments(self.name().to_string()))?;
        Ok(rest.iter().fold(*first, |acc, &value| pick(acc, value)))
    }
}

/// Wraps `f64::min`/`f64::max`, which ignore NaN, so that NaN wins instead.
fn nan_or(pick: fn(f64, f64) -> f64) -> impl Fn(f64, f64) -> f64 {
    move |a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { pick(a, b) }
}

impl FromStr for Function {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Function::lookup(s).ok_or_else(|| DomainError::UnknownFunction(s.to_string()))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders a number compactly.
///
/// A value less than 1e-12 away from its integer part (truncated toward
/// zero) renders as that integer. Everything else renders as the shortest
/// plain decimal that reads back to the same value, never in exponent form.
/// Non-finite values render as `NaN`, `Infinity` and `-Infinity`.
///
/// This is also the text a function call is replaced with inside a formula.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::format_number;
///
/// assert_eq!(format_number(34.0), "34");
/// assert_eq!(format_number(3.5), "3.5");
/// assert_eq!(format_number(f64::INFINITY), "Infinity");
/// ```
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    // saturates outside the i64 range, leaving a large difference
    let truncated = value as i64;
    if (value - truncated as f64).abs() < 1e-12 {
        truncated.to_string()
    } else {
        value.to_string()
    }
}
