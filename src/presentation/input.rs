use crate::application::{App, AppMode};
use crate::infrastructure::FileRepository;
use crossterm::event::{KeyCode, KeyModifiers};
use std::path::Path;

pub struct InputHandler;

impl InputHandler {
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Editing => Self::handle_editing_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
            AppMode::SaveAs | AppMode::LoadFile => Self::handle_filename_input_mode(app, key),
        }
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('s') => app.start_save_as(),
                KeyCode::Char('o') => app.start_load_file(),
                _ => {}
            }
            return;
        }

        app.status_message = None;

        match key {
            KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => app.move_selection(1, 0),
            KeyCode::Left | KeyCode::Char('h') => app.move_selection(0, -1),
            KeyCode::Right | KeyCode::Char('l') => app.move_selection(0, 1),
            KeyCode::Enter | KeyCode::F(2) => app.start_editing(),
            KeyCode::Char('-') => {
                let width = app.column_width(app.selected_col);
                app.set_column_width(app.selected_col, width.saturating_sub(1));
            }
            KeyCode::Char('_') => {
                let width = app.column_width(app.selected_col);
                app.set_column_width(app.selected_col, width.saturating_add(1));
            }
            KeyCode::F(1) | KeyCode::Char('?') => {
                app.mode = AppMode::Help;
                app.help_scroll = 0;
            }
            KeyCode::Backspace | KeyCode::Delete => app.clear_selected_cell(),
            // 'q' is handled by the main loop
            _ => {}
        }
    }

    fn handle_editing_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => app.finish_editing(),
            KeyCode::Esc => app.cancel_editing(),
            _ => edit_buffer(&mut app.input, &mut app.cursor_position, key),
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.mode = AppMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.help_scroll = app.help_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_filename_input_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                let filename = app.target_filename();
                let path = Path::new(&filename);
                if app.mode == AppMode::SaveAs {
                    let result = FileRepository::save_spreadsheet(&app.spreadsheet, path);
                    app.set_save_result(filename, result);
                } else {
                    let result = FileRepository::load_spreadsheet(path, app.spreadsheet.max_depth());
                    app.set_load_result(filename, result);
                }
            }
            KeyCode::Esc => app.cancel_filename_input(),
            _ => edit_buffer(&mut app.filename_input, &mut app.cursor_position, key),
        }
    }
}

/// Line editing shared by the cell editor and the file name prompt.
/// `cursor` is a byte offset kept on a character boundary.
fn edit_buffer(buffer: &mut String, cursor: &mut usize, key: KeyCode) {
    match key {
        KeyCode::Backspace => {
            if let Some(ch) = buffer[..*cursor].chars().next_back() {
                *cursor -= ch.len_utf8();
                buffer.remove(*cursor);
            }
        }
        KeyCode::Delete => {
            if *cursor < buffer.len() {
                buffer.remove(*cursor);
            }
        }
        KeyCode::Left => {
            if let Some(ch) = buffer[..*cursor].chars().next_back() {
                *cursor -= ch.len_utf8();
            }
        }
        KeyCode::Right => {
            if let Some(ch) = buffer[*cursor..].chars().next() {
                *cursor += ch.len_utf8();
            }
        }
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = buffer.len(),
        KeyCode::Char(ch) => {
            buffer.insert(*cursor, ch);
            *cursor += ch.len_utf8();
        }
        _ => {}
    }
}
