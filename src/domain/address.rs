//! Cell reference addressing.
//!
//! Converts between textual references such as `A1`, `bb12` or `AA100` and
//! numeric coordinates. Columns use bijective base-26 (`A` = 1 ... `Z` = 26,
//! `AA` = 27) shifted to be zero-based; rows stay one-based as written.

use super::errors::{DomainError, DomainResult};
use std::fmt;
use std::str::FromStr;

/// A parsed cell position: zero-based column, one-based row.
///
/// Field order makes the derived ordering row-major, which is the order used
/// whenever cells are listed.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::CellAddress;
///
/// let address = CellAddress::parse("ab7").unwrap();
/// assert_eq!(address.col, 27);
/// assert_eq!(address.row, 7);
/// assert_eq!(address.to_string(), "AB7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub fn new(col: usize, row: usize) -> Self {
        Self { row, col }
    }

    /// Parses `letters` followed by `digits`, ignoring surrounding whitespace
    /// and letter case.
    ///
    /// Fails with [`DomainError::InvalidReference`] when either part is
    /// missing, when anything else appears, or when the row is not a positive
    /// integer.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let normalized = normalize_reference(text);
        let invalid = || DomainError::InvalidReference(normalized.clone());

        let split = normalized
            .find(|ch: char| !ch.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, digits) = normalized.split_at(split);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let row = digits.parse::<usize>().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        let col = column_index_of(letters)?;

        Ok(Self { row, col })
    }

    /// Returns the canonical textual form, e.g. `AA12`.
    pub fn to_reference(&self) -> String {
        to_reference(self.col, self.row)
    }

    /// Every address in the rectangle spanned by two corners, inclusive.
    ///
    /// The corners may be given in any order. Cells are listed column by
    /// column, top to bottom within each column.
    pub fn span(first: CellAddress, second: CellAddress) -> Vec<CellAddress> {
        let (col_start, col_end) = (first.col.min(second.col), first.col.max(second.col));
        let (row_start, row_end) = (first.row.min(second.row), first.row.max(second.row));

        (col_start..=col_end)
            .flat_map(|col| (row_start..=row_end).map(move |row| CellAddress::new(col, row)))
            .collect()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters_of(self.col), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Trims and uppercases a reference so it can be compared or looked up.
pub fn normalize_reference(text: &str) -> String {
    text.trim().to_ascii_uppercase()
}

/// Returns true for text shaped like a reference: one or more ASCII letters
/// followed by one or more ASCII digits and nothing else.
///
/// This is a purely lexical check; `A0` passes here and is rejected later by
/// [`CellAddress::parse`].
pub fn is_reference_syntax(text: &str) -> bool {
    let letters = text.bytes().take_while(u8::is_ascii_alphabetic).count();
    let digits = text[letters..].bytes().take_while(u8::is_ascii_digit).count();
    letters > 0 && digits > 0 && letters + digits == text.len()
}

/// Decodes column letters into a zero-based index (`A` = 0, `Z` = 25, `AA` = 26).
pub fn column_index_of(letters: &str) -> DomainResult<usize> {
    let invalid = || DomainError::InvalidReference(letters.to_string());
    if letters.is_empty() {
        return Err(invalid());
    }

    let mut value = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(invalid());
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(invalid)?;
    }

    Ok(value - 1)
}

/// Encodes a zero-based column index as letters (0 -> `A`, 25 -> `Z`, 26 -> `AA`).
pub fn column_letters_of(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index as u128 + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Builds the textual reference for a column index and row number.
pub fn to_reference(col: usize, row: usize) -> String {
    format!("{}{}", column_letters_of(col), row)
}
