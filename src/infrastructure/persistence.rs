//! Reading and writing spreadsheets.
//!
//! The native format (S2V) stores one line per row and separates columns with
//! `;`. Since `;` is also the argument separator inside formulas, formula
//! fields are written with `,` in its place and converted back on load.
//! Text containing `;` or `"` is quoted on save. On load a line is only read
//! as quoted when writing it back reproduces it exactly; anything else is
//! split on `;` as is, so files with stray quotes keep them.
//! Files ending in `.json` hold a snapshot of raw cell contents instead.

use super::errors::StorageResult;
use crate::domain::{Cell, CellAddress, CellKind, Spreadsheet, FORMULA_MARKER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Raw contents keyed by reference, as stored in a JSON snapshot.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SheetSnapshot {
    pub cells: BTreeMap<String, String>,
}

impl SheetSnapshot {
    pub fn capture(sheet: &Spreadsheet) -> Self {
        let cells = sheet
            .non_empty_cells()
            .into_iter()
            .filter_map(|address| {
                let cell = sheet.get(address)?;
                Some((address.to_reference(), cell.raw().to_string()))
            })
            .collect();
        Self { cells }
    }

    pub fn restore(&self, max_depth: usize) -> StorageResult<Spreadsheet> {
        let mut sheet = Spreadsheet::with_max_depth(max_depth);
        for (reference, raw) in &self.cells {
            sheet.insert_raw(CellAddress::parse(reference)?, raw);
        }
        sheet.recompute_all()?;
        Ok(sheet)
    }
}

pub struct FileRepository;

impl FileRepository {
    pub fn save_spreadsheet(sheet: &Spreadsheet, path: &Path) -> StorageResult<()> {
        let file = File::create(path)?;
        if is_snapshot(path) {
            serde_json::to_writer_pretty(file, &SheetSnapshot::capture(sheet))?;
        } else {
            write_s2v(sheet, file)?;
        }
        info!(path = %path.display(), cells = sheet.non_empty_cells().len(), "saved spreadsheet");
        Ok(())
    }

    /// Loads a file and evaluates every cell in it.
    ///
    /// Evaluation happens after all cells are in place, so the order of cells
    /// in the file does not matter. Any cell that fails to evaluate fails the
    /// whole load.
    pub fn load_spreadsheet(path: &Path, max_depth: usize) -> StorageResult<Spreadsheet> {
        let file = File::open(path)?;
        let loaded = if is_snapshot(path) {
            serde_json::from_reader::<_, SheetSnapshot>(file)
                .map_err(Into::into)
                .and_then(|snapshot| snapshot.restore(max_depth))
        } else {
            read_s2v(file, max_depth)
        };

        match loaded {
            Ok(sheet) => {
                info!(path = %path.display(), cells = sheet.non_empty_cells().len(), "loaded spreadsheet");
                Ok(sheet)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to load spreadsheet");
                Err(err)
            }
        }
    }
}

fn is_snapshot(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Writes rows `1..=max_row`, each with columns `0..=max_col`.
/// An empty sheet produces no output at all.
pub fn write_s2v<W: Write>(sheet: &Spreadsheet, writer: W) -> StorageResult<()> {
    let Some((max_col, max_row)) = sheet.extent() else {
        return Ok(());
    };

    let mut out = s2v_writer(writer);

    for row in 1..=max_row {
        let record: Vec<String> = (0..=max_col)
            .map(|col| {
                let cell = sheet.get(CellAddress::new(col, row));
                encode_field(cell.map(Cell::raw).unwrap_or(""))
            })
            .collect();
        out.write_record(&record)?;
    }

    out.flush()?;
    Ok(())
}

/// Reads S2V data into a new sheet, then evaluates every cell.
///
/// Each line is parsed on its own so that blank lines still count as rows.
pub fn read_s2v<R: Read>(mut reader: R, max_depth: usize) -> StorageResult<Spreadsheet> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut sheet = Spreadsheet::with_max_depth(max_depth);
    for (index, line) in text.lines().enumerate() {
        let row = index + 1;
        for (col, field) in parse_line(line)?.iter().enumerate() {
            if !field.is_empty() {
                sheet.insert_raw(CellAddress::new(col, row), &decode_field(field));
            }
        }
    }

    sheet.recompute_all()?;
    Ok(sheet)
}

fn s2v_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer)
}

/// Splits one line into fields, honoring quotes only where they are the
/// quoting [`write_s2v`] would have produced.
fn parse_line(line: &str) -> StorageResult<Vec<String>> {
    if let Some(record) = read_record(line, true)? {
        if write_record(&record)? == line {
            return Ok(record.iter().map(str::to_string).collect());
        }
    }

    let fields = read_record(line, false)?
        .map(|record| record.iter().map(str::to_string).collect())
        .unwrap_or_default();
    Ok(fields)
}

fn read_record(line: &str, quoting: bool) -> StorageResult<Option<csv::StringRecord>> {
    let mut fields = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(quoting)
        .from_reader(line.as_bytes());
    let record = fields.records().next().transpose()?;
    Ok(record)
}

fn write_record(record: &csv::StringRecord) -> StorageResult<String> {
    let mut out = s2v_writer(Vec::new());
    out.write_record(record)?;
    let bytes = out.into_inner().map_err(|err| err.into_error())?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_suffix('\n').unwrap_or(&text).to_string())
}

fn encode_field(raw: &str) -> String {
    if CellKind::classify(raw) == CellKind::Formula {
        raw.replace(';', ",")
    } else {
        raw.to_string()
    }
}

fn decode_field(field: &str) -> String {
    if field.starts_with(FORMULA_MARKER) {
        field.replace(',', ";")
    } else {
        field.to_string()
    }
}
