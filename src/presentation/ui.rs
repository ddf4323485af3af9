use crate::application::{App, AppMode};
use crate::domain::column_letters_of;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

const ROW_LABEL_WIDTH: u16 = 5;

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_spreadsheet(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    if app.mode == AppMode::Help {
        render_help_popup(f, app.help_scroll);
    }
}

/// Rows and columns of cells that fit in a terminal of the given size.
pub fn viewport_for(app: &App, width: u16, height: u16) -> (usize, usize) {
    // header line and status bar
    visible_cells(app, width, height.saturating_sub(1 + 3))
}

/// Rows and columns of cells that fit inside the bordered table area.
fn visible_cells(app: &App, width: u16, height: u16) -> (usize, usize) {
    // borders and the column label row
    let rows = height.saturating_sub(2 + 1) as usize;

    let mut available = width.saturating_sub(2 + ROW_LABEL_WIDTH) as usize;
    let mut cols = 0;
    for col in app.scroll_col..app.cols {
        let needed = app.column_width(col) as usize + 1;
        if needed > available {
            break;
        }
        available -= needed;
        cols += 1;
    }

    (rows, cols)
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let header = Paragraph::new(format!(
        "sheetcalc | {} | raw: {} | value: {}",
        app.selected_address(),
        app.selected_raw(),
        app.selected_value()
    ))
    .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn render_spreadsheet(f: &mut Frame, app: &App, area: Rect) {
    let (visible_rows, visible_cols) = visible_cells(app, area.width, area.height);
    let last_col = (app.scroll_col + visible_cols).min(app.cols);
    let last_row = (app.scroll_row + visible_rows).min(app.rows);

    let mut headers = vec![Cell::from("")];
    for col in app.scroll_col..last_col {
        let style = if col == app.selected_col {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default().fg(Color::Yellow)
        };
        headers.push(Cell::from(column_letters_of(col)).style(style));
    }

    let mut rows = vec![Row::new(headers).height(1)];

    for row in app.scroll_row..last_row {
        let label_style = if row == app.selected_row {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let mut cells = vec![Cell::from(format!("{}", row + 1)).style(label_style)];

        for col in app.scroll_col..last_col {
            let text = app.display_value(row, col);
            let style = if row == app.selected_row && col == app.selected_col {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else if text == "#ERR" {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            cells.push(Cell::from(text).style(style));
        }

        rows.push(Row::new(cells).height(1));
    }

    let mut widths = vec![Constraint::Length(ROW_LABEL_WIDTH)];
    for col in app.scroll_col..last_col {
        widths.push(Constraint::Length(app.column_width(col)));
    }

    let table = Table::new(rows, widths)
        .block(Block::default().borders(Borders::ALL).title("Sheet"))
        .column_spacing(1);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let text = match app.mode {
        AppMode::Normal => match &app.status_message {
            Some(status) => status.clone(),
            None => {
                let filename = app.filename.as_deref().unwrap_or("unsaved");
                format!("File: {filename} | Enter: edit | Ctrl+S: save | Ctrl+O: load | F1/?: help | q: quit")
            }
        },
        AppMode::Editing => format!("Editing: {} (Enter to commit, Esc to cancel)", app.input),
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
        AppMode::SaveAs => format!("Save as: {} (Enter to save, Esc to cancel)", app.filename_input),
        AppMode::LoadFile => format!("Load file: {} (Enter to load, Esc to cancel)", app.filename_input),
    };

    let is_error = text.starts_with("ERROR:");
    let style = match app.mode {
        AppMode::Normal if is_error => Style::default().fg(Color::Red),
        AppMode::Normal => Style::default(),
        AppMode::Editing => Style::default().fg(Color::Green),
        AppMode::Help => Style::default().fg(Color::Cyan),
        AppMode::SaveAs | AppMode::LoadFile => Style::default().fg(Color::Yellow),
    };

    let status = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(style);
    f.render_widget(status, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let area = f.area();
    let popup_area = Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    };

    f.render_widget(Clear, popup_area);

    let help_lines: Vec<&str> = HELP_TEXT.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let help_widget = Paragraph::new(help_lines[start_line..end_line].join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Help (line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

const HELP_TEXT: &str = r#"SHEETCALC FORMULAS

=== CELLS ===
A cell holds a number, text, or a formula starting with =
Text and empty cells count as 0 in arithmetic
References are column letters then row number: A1, Z99, AA1 (case-insensitive)

=== ARITHMETIC ===
+  -  *  /        =A1+B1*2 uses the usual precedence
( )               =(A1+B1)*2
-x                A leading sign is read as 0-x
Division by zero gives Infinity or NaN

=== FUNCTIONS ===
Arguments are separated with ;   ranges are written A1:B3
SUMA(...)         Sum (alias SUM); empty and text cells count as 0
MIN(...)          Smallest value; empty and text cells are skipped
MAX(...)          Largest value; empty and text cells are skipped
PROMEDIO(...)     Average (alias AVERAGE); empty and text cells are skipped

MIN and MAX fail when no numeric argument is left
PROMEDIO of nothing is 0
Arguments may be expressions or nested calls: =SUMA(MAX(A1:A3);B1*2)

=== ERRORS ===
A formula that cannot be evaluated is rejected and the cell keeps
its previous content. Circular references are rejected the same way.
Cells whose formula stops working later show #ERR.

=== FILES ===
Ctrl+S            Save (.s2v: one line per row, columns separated by ;)
Ctrl+O            Load (.json files hold a snapshot of raw contents)

=== KEYS ===
Arrow keys, hjkl  Move selection
Enter / F2        Edit selected cell
Esc               Cancel edit
Backspace / Del   Clear selected cell
- / _             Shrink / grow column
F1 or ?           This help
q                 Quit"#;
