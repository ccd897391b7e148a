//! The interactive grid view: modal keyboard input, viewport scrolling,
//! selection highlighting, status line, and the help/chart overlays.

use std::io::stdout;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use termgrid_chart::{Chart, ChartKind, Sample};
use termgrid_engine::cell::CellContent;
use termgrid_engine::reference::index_to_label;
use termgrid_engine::sheet::Sheet;
use termgrid_io::CsvMode;

use crate::commands::{self, Action};
use crate::settings::Settings;
use crate::util;

const ROW_GUTTER: usize = 4;
const PAGE_JUMP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Numbers and formulas ('=' key); commits via typed input rules
    InsertValue,
    /// Raw text ('"' key)
    InsertText,
    Command,
}

/// A csv command waiting for its flatten-or-preserve answer.
#[derive(Debug, Clone)]
enum PendingCsv {
    Save(String),
    Load(String),
}

struct TuiApp {
    sheet: Sheet,
    settings: Settings,
    mode: Mode,
    cursor_row: usize,
    cursor_col: usize,
    scroll_row: usize,
    scroll_col: usize,
    input: String,
    status: String,
    pending_csv: Option<PendingCsv>,
    chart_lines: Option<Vec<String>>,
    show_help: bool,
    should_quit: bool,
}

impl TuiApp {
    fn new(sheet: Sheet, settings: Settings) -> Self {
        Self {
            sheet,
            settings,
            mode: Mode::Normal,
            cursor_row: 0,
            cursor_col: 0,
            scroll_row: 0,
            scroll_col: 0,
            input: String::new(),
            status: String::from("Ready"),
            pending_csv: None,
            chart_lines: None,
            show_help: false,
            should_quit: false,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    // ---- input ------------------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Overlays swallow the next key.
        if self.chart_lines.is_some() {
            self.chart_lines = None;
            return;
        }
        if self.show_help {
            self.show_help = false;
            return;
        }
        if self.pending_csv.is_some() {
            self.answer_csv_prompt(key);
            return;
        }

        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            _ => self.handle_input_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Left if alt => self.resize_columns(-1),
            KeyCode::Right if alt => self.resize_columns(1),
            KeyCode::Up if alt => self.resize_rows(-1),
            KeyCode::Down if alt => self.resize_rows(1),

            KeyCode::Left => self.move_cursor(0, -1, shift),
            KeyCode::Right => self.move_cursor(0, 1, shift),
            KeyCode::Up => self.move_cursor(-1, 0, shift),
            KeyCode::Down => self.move_cursor(1, 0, shift),
            KeyCode::Char('h') | KeyCode::Char('H') if !ctrl => self.move_cursor(0, -1, shift),
            KeyCode::Char('l') | KeyCode::Char('L') if !ctrl => self.move_cursor(0, 1, shift),
            KeyCode::Char('j') | KeyCode::Char('J') if !ctrl => self.move_cursor(1, 0, shift),
            KeyCode::Char('k') | KeyCode::Char('K') if !ctrl => self.move_cursor(-1, 0, shift),

            KeyCode::PageUp => {
                self.cursor_row = self.cursor_row.saturating_sub(PAGE_JUMP);
                self.cancel_selection();
            }
            KeyCode::PageDown => {
                self.cursor_row = (self.cursor_row + PAGE_JUMP).min(self.sheet.rows() - 1);
                self.cancel_selection();
            }

            KeyCode::Char('=') => self.start_input(Mode::InsertValue),
            KeyCode::Char('"') => self.start_input(Mode::InsertText),
            KeyCode::Char(':') => self.start_input(Mode::Command),

            KeyCode::Char('x') => {
                self.sheet.record_cell(self.cursor_row, self.cursor_col);
                self.sheet.clear_cell(self.cursor_row, self.cursor_col);
                self.sheet.recalculate();
                self.set_status("Cell cleared");
            }

            KeyCode::Char('u') => {
                let message = if self.sheet.undo() { "Undone" } else { "Nothing to undo" };
                self.set_status(message);
            }
            KeyCode::Char('U') => {
                let message = if self.sheet.redo() { "Redone" } else { "Nothing to redo" };
                self.set_status(message);
            }

            KeyCode::Char('c') | KeyCode::Char('C') if ctrl && shift => {
                self.set_status("System clipboard is not wired up");
            }
            KeyCode::Char('v') | KeyCode::Char('V') if ctrl && shift => {
                self.set_status("System clipboard is not wired up");
            }
            KeyCode::Char('c') if ctrl => self.copy(),
            KeyCode::Char('v') if ctrl => self.paste(),
            KeyCode::Char('q') if ctrl => self.should_quit = true,

            // Excel-flavored format shortcuts (shifted digits arrive as symbols).
            KeyCode::Char('%') if ctrl => self.quick_format("format percentage"),
            KeyCode::Char('$') if ctrl => self.quick_format("format currency"),
            KeyCode::Char('!') if ctrl => self.quick_format("format number"),
            KeyCode::Char('#') if ctrl => {
                self.sheet.record_cell(self.cursor_row, self.cursor_col);
                if let Some(format) =
                    self.sheet.cycle_datetime_format(self.cursor_row, self.cursor_col)
                {
                    self.set_status(format!("Format: {}", format.name()));
                }
            }

            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Esc => self.cancel_selection(),
            _ => {}
        }
    }

    fn move_cursor(&mut self, drow: i32, dcol: i32, shift: bool) {
        if shift && !self.sheet.selection().is_active() {
            self.sheet.start_selection(self.cursor_row, self.cursor_col);
        }

        let rows = self.sheet.rows() as i32;
        let cols = self.sheet.cols() as i32;
        self.cursor_row = (self.cursor_row as i32 + drow).clamp(0, rows - 1) as usize;
        self.cursor_col = (self.cursor_col as i32 + dcol).clamp(0, cols - 1) as usize;

        if shift {
            self.sheet.extend_selection(self.cursor_row, self.cursor_col);
            if let Some(range) = self.sheet.selection().range() {
                self.set_status(format!("Selected: {}", range));
            }
        } else {
            self.cancel_selection();
        }
    }

    fn cancel_selection(&mut self) {
        if self.sheet.selection().is_active() {
            self.sheet.clear_selection();
            self.set_status("Selection cancelled");
        }
    }

    fn resize_columns(&mut self, delta: i16) {
        let (c0, c1) = match self.sheet.selection().range() {
            Some(range) => (range.start_col, range.end_col),
            None => (self.cursor_col, self.cursor_col),
        };
        self.sheet.record_column_resize(c0, c1);
        self.sheet.resize_columns(c0, c1, delta);
        self.set_status(if c0 == c1 { "Column resized" } else { "Columns resized" });
    }

    fn resize_rows(&mut self, delta: i16) {
        let (r0, r1) = match self.sheet.selection().range() {
            Some(range) => (range.start_row, range.end_row),
            None => (self.cursor_row, self.cursor_row),
        };
        self.sheet.record_row_resize(r0, r1);
        self.sheet.resize_rows(r0, r1, delta);
        self.set_status(if r0 == r1 { "Row resized" } else { "Rows resized" });
    }

    /// Range copy when a selection is active, single-cell otherwise.
    fn copy(&mut self) {
        if self.sheet.selection().is_active() {
            if self.sheet.copy_range() {
                self.set_status("Range copied");
            }
        } else {
            self.sheet.copy_cell_to_clipboard(self.cursor_row, self.cursor_col);
            self.set_status("Cell copied");
        }
    }

    fn paste(&mut self) {
        if let Some((rows, cols)) = self.sheet.range_clipboard_size() {
            // Undo covers the paste footprint, clipped to the grid.
            let range = termgrid_engine::reference::Range::new(
                self.cursor_row,
                self.cursor_col,
                (self.cursor_row + rows - 1).min(self.sheet.rows() - 1),
                (self.cursor_col + cols - 1).min(self.sheet.cols() - 1),
            );
            self.sheet.record_range(range);
            self.sheet.paste_range(self.cursor_row, self.cursor_col);
            self.set_status("Range pasted");
        } else if self.sheet.has_cell_clipboard() {
            self.sheet.record_cell(self.cursor_row, self.cursor_col);
            self.sheet.paste_cell(self.cursor_row, self.cursor_col);
            self.set_status("Cell pasted");
        } else {
            self.set_status("Nothing to paste");
        }
    }

    fn quick_format(&mut self, command: &str) {
        let action =
            commands::execute(&mut self.sheet, (self.cursor_row, self.cursor_col), command);
        if let Action::Status(message) = action {
            self.set_status(message);
        }
    }

    fn start_input(&mut self, mode: Mode) {
        self.mode = mode;
        self.input.clear();

        // Editing an existing value pre-fills the buffer.
        if mode == Mode::InsertValue {
            if let Some(cell) = self.sheet.get(self.cursor_row, self.cursor_col) {
                match &cell.content {
                    CellContent::Formula { source, .. } => self.input = source.clone(),
                    CellContent::Number(n) => self.input = format!("{}", n),
                    _ => {}
                }
            }
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.finish_input(),
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.input.clear();
                self.set_status("Cancelled");
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn finish_input(&mut self) {
        let input = std::mem::take(&mut self.input);
        match self.mode {
            Mode::InsertValue => {
                self.sheet.record_cell(self.cursor_row, self.cursor_col);
                self.sheet.set_input(self.cursor_row, self.cursor_col, &input);
                self.sheet.recalculate();
            }
            Mode::InsertText => {
                self.sheet.record_cell(self.cursor_row, self.cursor_col);
                self.sheet.set_text(self.cursor_row, self.cursor_col, &input);
                self.sheet.recalculate();
            }
            Mode::Command => self.run_command(&input),
            Mode::Normal => {}
        }
        self.mode = Mode::Normal;
    }

    fn run_command(&mut self, command: &str) {
        let action =
            commands::execute(&mut self.sheet, (self.cursor_row, self.cursor_col), command);
        match action {
            Action::Quit => self.should_quit = true,
            Action::Status(message) => self.set_status(message),
            Action::SaveCsv(path) => {
                self.pending_csv = Some(PendingCsv::Save(path));
                self.set_status(self.csv_prompt("Save"));
            }
            Action::LoadCsv(path) => {
                self.pending_csv = Some(PendingCsv::Load(path));
                self.set_status(self.csv_prompt("Load"));
            }
            Action::Chart { kind, size } => self.show_chart(kind, size),
        }
    }

    fn csv_prompt(&self, verb: &str) -> String {
        let default = match self.settings.csv_mode {
            CsvMode::Flatten => "flatten",
            CsvMode::Preserve => "preserve",
        };
        format!("{} CSV: [f]latten or [p]reserve formulas? (Enter = {}, Esc cancels)", verb, default)
    }

    fn answer_csv_prompt(&mut self, key: KeyEvent) {
        let mode = match key.code {
            KeyCode::Char('f') | KeyCode::Char('F') => Some(CsvMode::Flatten),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(CsvMode::Preserve),
            KeyCode::Enter => Some(self.settings.csv_mode),
            KeyCode::Esc => None,
            _ => return,
        };

        let Some(pending) = self.pending_csv.take() else {
            return;
        };
        let Some(mode) = mode else {
            self.set_status("Cancelled");
            return;
        };

        let tag = match mode {
            CsvMode::Flatten => "values flattened",
            CsvMode::Preserve => "formulas preserved",
        };
        let result = match &pending {
            PendingCsv::Save(path) => termgrid_io::save(&self.sheet, path.as_ref(), mode)
                .map(|_| format!("Saved to {} ({})", path, tag)),
            PendingCsv::Load(path) => termgrid_io::load(&mut self.sheet, path.as_ref(), mode)
                .map(|_| format!("Loaded from {} ({})", path, tag)),
        };
        match result {
            Ok(message) => self.set_status(message),
            Err(e) => self.set_status(format!("CSV error: {}", e)),
        }
    }

    fn show_chart(&mut self, kind: ChartKind, size: Option<(usize, usize)>) {
        let Some(range) = self.sheet.selection().range() else {
            self.set_status("No range selected");
            return;
        };
        let samples: Vec<Sample> = self
            .sheet
            .range_samples(range)
            .into_iter()
            .map(|(label, value)| Sample::new(label, value))
            .collect();

        let (w, h) = size.unwrap_or((self.settings.chart_width, self.settings.chart_height));
        let mut chart = Chart::with_size(kind, &range.to_string(), w, h);
        chart.plot(&samples);
        self.chart_lines = Some(chart.render());
        self.set_status("Any key closes the chart");
    }

    // ---- viewport ---------------------------------------------------------

    /// Columns that fit starting at `start_col` in `available` cells.
    fn visible_columns(&self, start_col: usize, available: usize) -> Vec<usize> {
        let mut cols = Vec::new();
        let mut used = 0usize;
        for c in start_col..self.sheet.cols() {
            let w = self.sheet.column_width(c) as usize + 1;
            if used + w > available && !cols.is_empty() {
                break;
            }
            used += w;
            cols.push(c);
        }
        cols
    }

    fn ensure_visible(&mut self, visible_rows: usize, area_width: u16) {
        if self.cursor_row < self.scroll_row {
            self.scroll_row = self.cursor_row;
        }
        if visible_rows > 0 && self.cursor_row >= self.scroll_row + visible_rows {
            self.scroll_row = self.cursor_row - visible_rows + 1;
        }

        let available = (area_width as usize).saturating_sub(ROW_GUTTER + 1);
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        }
        loop {
            let cols = self.visible_columns(self.scroll_col, available);
            match cols.last() {
                Some(&last) if last < self.cursor_col => {
                    self.scroll_col += 1;
                    if self.scroll_col >= self.sheet.cols() {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    // ---- drawing ----------------------------------------------------------

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);

        self.draw_grid(frame, chunks[0]);
        self.draw_status(frame, chunks[1]);

        if let Some(lines) = &self.chart_lines {
            self.draw_overlay(frame, area, lines, " Chart ");
        }
        if self.show_help {
            self.draw_help(frame, area);
        }
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect) {
        let available = (area.width as usize).saturating_sub(ROW_GUTTER + 1);
        let vis_cols = self.visible_columns(self.scroll_col, available);
        let data_height = area.height.saturating_sub(1) as usize;

        let mut lines: Vec<Line> = Vec::with_capacity(data_height + 1);

        // Column header
        let mut header = vec![Span::styled(
            " ".repeat(ROW_GUTTER + 1),
            Style::default().fg(Color::DarkGray),
        )];
        for &c in &vis_cols {
            let w = self.sheet.column_width(c) as usize;
            let name = termgrid_engine::reference::col_to_letters(c);
            let style = if c == self.cursor_col {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            };
            header.push(Span::styled(
                format!("{} ", util::pad_align(&name, w, termgrid_engine::cell::Alignment::Center)),
                style,
            ));
        }
        lines.push(Line::from(header));

        // Data rows, honoring per-row heights: content on the first visual
        // line, blank filler for the rest.
        let mut sheet_row = self.scroll_row;
        while lines.len() <= data_height && sheet_row < self.sheet.rows() {
            let height = self.sheet.row_height(sheet_row) as usize;
            for visual in 0..height {
                if lines.len() > data_height {
                    break;
                }
                let gutter = if visual == 0 {
                    format!("{:>width$} ", sheet_row + 1, width = ROW_GUTTER)
                } else {
                    " ".repeat(ROW_GUTTER + 1)
                };
                let gutter_style = if sheet_row == self.cursor_row {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let mut spans = vec![Span::styled(gutter, gutter_style)];

                for &c in &vis_cols {
                    let w = self.sheet.column_width(c) as usize;
                    let text = if visual == 0 {
                        self.sheet.display_value(sheet_row, c)
                    } else {
                        String::new()
                    };
                    let format = self.sheet.cell_format(sheet_row, c);
                    let padded =
                        format!("{} ", util::pad_align(&text, w, format.align));
                    spans.push(Span::styled(padded, self.cell_style(sheet_row, c, &format)));
                }
                lines.push(Line::from(spans));
            }
            sheet_row += 1;
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn cell_style(
        &self,
        row: usize,
        col: usize,
        format: &termgrid_engine::cell::CellFormat,
    ) -> Style {
        let is_cursor = row == self.cursor_row && col == self.cursor_col;
        let in_selection = self.sheet.is_in_selection(row, col);

        if in_selection && is_cursor {
            return Style::default().fg(Color::Yellow).bg(Color::Blue);
        }
        if in_selection {
            return Style::default().fg(Color::Black).bg(Color::Yellow);
        }
        if is_cursor {
            return Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD);
        }

        let mut style = Style::default();
        if let Some(idx) = format.text_color {
            style = style.fg(console_color(idx));
        }
        if let Some(idx) = format.background_color {
            style = style.bg(console_color(idx));
        }
        style
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let label = index_to_label(self.cursor_row, self.cursor_col);
        let text = match self.mode {
            Mode::Normal => {
                let cell = self.sheet.get(self.cursor_row, self.cursor_col);
                let detail = match cell.map(|c| &c.content) {
                    Some(CellContent::Formula { source, .. }) => format!(" {}", source),
                    _ => match cell.map(|c| c.format.number_format) {
                        Some(f) if f != termgrid_engine::cell::NumberFormat::General => {
                            format!(" ({})", f.name())
                        }
                        _ => String::new(),
                    },
                };
                format!(" [{}] {}{} | {}", self.sheet.name, label, detail, self.status)
            }
            Mode::Command => format!(" [{}] {} :{}_", self.sheet.name, label, self.input),
            Mode::InsertValue | Mode::InsertText => {
                format!(" [{}] {} > {}_", self.sheet.name, label, self.input)
            }
        };

        let para = Paragraph::new(Line::from(Span::styled(
            format!("{:<width$}", text, width = area.width as usize),
            Style::default().fg(Color::Black).bg(Color::Gray),
        )));
        frame.render_widget(para, area);
    }

    fn draw_overlay(&self, frame: &mut Frame, area: Rect, lines: &[String], title: &str) {
        let width = lines.iter().map(|l| util::display_width(l)).max().unwrap_or(0) as u16 + 4;
        let height = lines.len() as u16 + 2;
        let popup = centered(area, width.min(area.width), height.min(area.height));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title)
            .style(Style::default().bg(Color::Black));
        let text: Vec<Line> = lines.iter().map(|l| Line::from(l.as_str())).collect();

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(text).block(block), popup);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let help = [
            "",
            "  Navigation",
            "  ----------",
            "  arrows / hjkl     Move cursor",
            "  Shift+arrows      Select a range",
            "  PgUp / PgDn       Jump 10 rows",
            "",
            "  Editing",
            "  -------",
            "  =                 Enter number or formula",
            "  \"                 Enter text",
            "  x                 Clear cell",
            "  Ctrl+C / Ctrl+V   Copy / paste (range when selected)",
            "  u / U             Undo / redo",
            "  Alt+arrows        Resize column / row",
            "",
            "  Commands (:)",
            "  ------------",
            "  format <type> [style]    clrtx/clrbg <color>",
            "  savecsv/loadcsv <file>   chart <kind> [WxH]",
            "  q                        quit",
            "",
        ];
        let lines: Vec<String> = help.iter().map(|s| s.to_string()).collect();
        self.draw_overlay(frame, area, &lines, " Keybindings ");
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

/// Console color index (0-15) to a terminal color.
fn console_color(idx: u8) -> Color {
    match idx {
        0 => Color::Black,
        1 => Color::Blue,
        2 => Color::Green,
        3 => Color::Cyan,
        4 => Color::Red,
        5 => Color::Magenta,
        6 => Color::Yellow,
        7 => Color::Gray,
        8 => Color::DarkGray,
        9 => Color::LightBlue,
        10 => Color::LightGreen,
        11 => Color::LightCyan,
        12 => Color::LightRed,
        13 => Color::LightMagenta,
        14 => Color::LightYellow,
        _ => Color::White,
    }
}

/// Run the interactive view. Restores the terminal on exit or panic unwind.
pub fn run(sheet: Sheet, settings: Settings) -> Result<(), String> {
    terminal::enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    let mut app = TuiApp::new(sheet, settings);

    loop {
        let size = terminal
            .size()
            .map(|s| Rect::new(0, 0, s.width, s.height))
            .unwrap_or_default();
        // One line each for the column header and the status bar.
        let visible_rows = size.height.saturating_sub(2) as usize;
        app.ensure_visible(visible_rows, size.width);

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100)).map_err(|e| format!("event poll error: {}", e))?
        {
            if let Event::Key(key) = event::read().map_err(|e| format!("event read error: {}", e))?
            {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
