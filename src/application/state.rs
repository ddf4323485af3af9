//! Application state for the terminal front end.
//!
//! [`App`] owns the spreadsheet together with everything the UI needs between
//! frames: the selection, scroll offsets, the current mode and its input
//! buffers, column widths and the most recent evaluation of every cell.

use crate::domain::{format_number, CellAddress, CellKind, DomainResult, Spreadsheet};
use crate::infrastructure::{Config, StorageResult};
use std::collections::HashMap;

const DEFAULT_FILENAME: &str = "spreadsheet.s2v";
const MIN_COLUMN_WIDTH: u16 = 3;

/// Represents the current mode of the application.
///
/// The mode decides how key presses are interpreted and what the status bar
/// shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Arrow keys move the selection, shortcuts are active
    Normal,
    /// Typing into the selected cell
    Editing,
    /// Help popup is open
    Help,
    /// Prompting for a file name to save to
    SaveAs,
    /// Prompting for a file name to load from
    LoadFile,
}

/// Main application state.
///
/// # Examples
///
/// ```
/// use sheetcalc::application::App;
///
/// let mut app = App::default();
/// app.start_editing();
/// app.input = "=2+3".to_string();
/// app.finish_editing();
///
/// assert_eq!(app.display_value(0, 0), "5");
/// assert_eq!(app.selected_row, 1);
/// ```
#[derive(Debug)]
pub struct App {
    pub spreadsheet: Spreadsheet,
    /// Number of rows shown in the grid
    pub rows: usize,
    /// Number of columns shown in the grid
    pub cols: usize,
    /// Currently selected row (zero-based; row 1 of the sheet is 0)
    pub selected_row: usize,
    /// Currently selected column (zero-based)
    pub selected_col: usize,
    pub scroll_row: usize,
    pub scroll_col: usize,
    pub mode: AppMode,
    /// Cell content being edited
    pub input: String,
    /// Cursor position (in bytes) within whichever buffer is being edited
    pub cursor_position: usize,
    /// File last saved to or loaded from
    pub filename: Option<String>,
    pub help_scroll: usize,
    /// Message shown in the status bar until the next key press
    pub status_message: Option<String>,
    pub filename_input: String,
    pub viewport_rows: usize,
    pub viewport_cols: usize,
    default_column_width: u16,
    column_widths: HashMap<usize, u16>,
    values: HashMap<CellAddress, DomainResult<f64>>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            spreadsheet: Spreadsheet::with_max_depth(config.max_depth),
            rows: config.rows.max(1),
            cols: config.cols.max(1),
            selected_row: 0,
            selected_col: 0,
            scroll_row: 0,
            scroll_col: 0,
            mode: AppMode::Normal,
            input: String::new(),
            cursor_position: 0,
            filename: None,
            help_scroll: 0,
            status_message: None,
            filename_input: String::new(),
            viewport_rows: 20,
            viewport_cols: 8,
            default_column_width: config.column_width.max(MIN_COLUMN_WIDTH),
            column_widths: HashMap::new(),
            values: HashMap::new(),
        }
    }

    pub fn selected_address(&self) -> CellAddress {
        CellAddress::new(self.selected_col, self.selected_row + 1)
    }

    pub fn selected_raw(&self) -> &str {
        self.spreadsheet
            .get(self.selected_address())
            .map(|cell| cell.raw())
            .unwrap_or("")
    }

    /// Switches to editing mode with the selected cell's raw content loaded
    /// into the input buffer.
    pub fn start_editing(&mut self) {
        self.mode = AppMode::Editing;
        self.input = self.selected_raw().to_string();
        self.cursor_position = self.input.len();
        self.status_message = None;
    }

    /// Assigns the input buffer to the selected cell.
    ///
    /// A formula that cannot be evaluated is rejected: the cell keeps its
    /// previous content and the error is shown in the status bar. On success
    /// the selection moves down one row.
    pub fn finish_editing(&mut self) {
        let reference = self.selected_address().to_reference();

        match self.spreadsheet.set_cell(&reference, &self.input) {
            Ok(()) => {
                self.refresh_values();
                if self.selected_row + 1 < self.rows {
                    self.selected_row += 1;
                    self.ensure_cursor_visible();
                }
            }
            Err(err) => {
                self.status_message = Some(format!("ERROR: {err}"));
            }
        }

        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    pub fn cancel_editing(&mut self) {
        self.mode = AppMode::Normal;
        self.input.clear();
        self.cursor_position = 0;
    }

    pub fn clear_selected_cell(&mut self) {
        let reference = self.selected_address().to_reference();
        match self.spreadsheet.set_cell(&reference, "") {
            Ok(()) => self.refresh_values(),
            Err(err) => self.status_message = Some(format!("ERROR: {err}")),
        }
    }

    /// Re-evaluates every numeric and formula cell for display.
    pub fn refresh_values(&mut self) {
        self.values.clear();
        for address in self.spreadsheet.non_empty_cells() {
            let kind = self.spreadsheet.get(address).map(|cell| cell.kind());
            if matches!(kind, Some(CellKind::Number | CellKind::Formula)) {
                let value = self.spreadsheet.evaluate_address(address);
                self.values.insert(address, value);
            }
        }
    }

    /// Text shown in the grid for a cell: the number for numeric and formula
    /// cells, the raw text for text cells, `#ERR` for formulas that fail.
    pub fn display_value(&self, row: usize, col: usize) -> String {
        let address = CellAddress::new(col, row + 1);
        let Some(cell) = self.spreadsheet.get(address) else {
            return String::new();
        };

        match cell.kind() {
            CellKind::Empty => String::new(),
            CellKind::Text => cell.raw().to_string(),
            CellKind::Number | CellKind::Formula => match self.values.get(&address) {
                Some(Ok(value)) => format_number(*value),
                Some(Err(_)) => "#ERR".to_string(),
                None => String::new(),
            },
        }
    }

    /// Value of the selected cell for the header line, with the error
    /// message when evaluation fails.
    pub fn selected_value(&self) -> String {
        match self.values.get(&self.selected_address()) {
            Some(Err(err)) => format!("#ERR ({err})"),
            _ => self.display_value(self.selected_row, self.selected_col),
        }
    }

    pub fn start_save_as(&mut self) {
        self.mode = AppMode::SaveAs;
        self.filename_input = self.filename.clone().unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        self.cursor_position = self.filename_input.len();
        self.status_message = None;
    }

    pub fn start_load_file(&mut self) {
        self.mode = AppMode::LoadFile;
        self.filename_input = self.filename.clone().unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        self.cursor_position = self.filename_input.len();
        self.status_message = None;
    }

    pub fn cancel_filename_input(&mut self) {
        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    /// File name typed into the prompt, or the default when it is blank.
    pub fn target_filename(&self) -> String {
        let typed = self.filename_input.trim();
        if typed.is_empty() {
            DEFAULT_FILENAME.to_string()
        } else {
            typed.to_string()
        }
    }

    pub fn set_save_result(&mut self, filename: String, result: StorageResult<()>) {
        match result {
            Ok(()) => {
                self.status_message = Some(format!("Saved to {filename}"));
                self.filename = Some(filename);
            }
            Err(err) => {
                self.status_message = Some(format!("ERROR: save failed: {err}"));
            }
        }

        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    /// Installs a loaded sheet and resets the view. On failure the current
    /// sheet is kept.
    pub fn set_load_result(&mut self, filename: String, result: StorageResult<Spreadsheet>) {
        match result {
            Ok(spreadsheet) => {
                self.spreadsheet = spreadsheet;
                self.selected_row = 0;
                self.selected_col = 0;
                self.scroll_row = 0;
                self.scroll_col = 0;
                self.refresh_values();
                self.status_message = Some(format!("Loaded from {filename}"));
                self.filename = Some(filename);
            }
            Err(err) => {
                self.status_message = Some(format!("ERROR: load failed: {err}"));
            }
        }

        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    pub fn column_width(&self, col: usize) -> u16 {
        self.column_widths
            .get(&col)
            .copied()
            .unwrap_or(self.default_column_width)
    }

    pub fn set_column_width(&mut self, col: usize, width: u16) {
        self.column_widths.insert(col, width.max(MIN_COLUMN_WIDTH));
    }

    pub fn move_selection(&mut self, row_delta: isize, col_delta: isize) {
        self.selected_row = self
            .selected_row
            .saturating_add_signed(row_delta)
            .min(self.rows - 1);
        self.selected_col = self
            .selected_col
            .saturating_add_signed(col_delta)
            .min(self.cols - 1);
        self.ensure_cursor_visible();
    }

    pub fn update_viewport_size(&mut self, rows: usize, cols: usize) {
        self.viewport_rows = rows.max(1);
        self.viewport_cols = cols.max(1);
    }

    /// Adjusts the scroll offsets so the selected cell is on screen.
    pub fn ensure_cursor_visible(&mut self) {
        if self.selected_row < self.scroll_row {
            self.scroll_row = self.selected_row;
        } else if self.selected_row >= self.scroll_row + self.viewport_rows {
            self.scroll_row = self.selected_row + 1 - self.viewport_rows;
        }

        if self.selected_col < self.scroll_col {
            self.scroll_col = self.selected_col;
        } else if self.selected_col >= self.scroll_col + self.viewport_cols {
            self.scroll_col = self.selected_col + 1 - self.viewport_cols;
        }
    }
}
