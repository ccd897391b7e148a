//! The sheet: sparse cell store, sizing, recalculation driver, selection,
//! clipboards, and the undo entry points. This is the engine surface the
//! presenter, CSV, and chart collaborators talk to.

use rustc_hash::FxHashMap;

use crate::cell::{Cell, CellContent, CellFormat, FormulaCache, NumberFormat};
use crate::clipboard::RangeClipboard;
use crate::formula::{self, CellReader, FormulaError, Value};
use crate::reference::Range;
use crate::selection::Selection;
use crate::undo::{UndoLog, UndoRecord};

pub const DEFAULT_ROWS: usize = 1000;
pub const DEFAULT_COLS: usize = 100;

pub const DEFAULT_COL_WIDTH: u16 = 10;
pub const MIN_COL_WIDTH: u16 = 1;
pub const MAX_COL_WIDTH: u16 = 50;

pub const DEFAULT_ROW_HEIGHT: u16 = 1;
pub const MIN_ROW_HEIGHT: u16 = 1;
pub const MAX_ROW_HEIGHT: u16 = 10;

pub struct Sheet {
    pub name: String,
    rows: usize,
    cols: usize,
    cells: FxHashMap<(usize, usize), Cell>,
    col_widths: Vec<u16>,
    row_heights: Vec<u16>,
    needs_recalc: bool,
    selection: Selection,
    cell_clipboard: Option<Cell>,
    range_clipboard: Option<RangeClipboard>,
    undo: UndoLog,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl CellReader for Sheet {
    fn grid_rows(&self) -> usize {
        self.rows
    }

    fn grid_cols(&self) -> usize {
        self.cols
    }

    fn read(&self, row: usize, col: usize) -> Result<Value, FormulaError> {
        if row >= self.rows || col >= self.cols {
            return Err(FormulaError::Ref);
        }
        match self.cells.get(&(row, col)) {
            None => Ok(Value::Empty),
            Some(cell) => match &cell.content {
                CellContent::Empty => Ok(Value::Empty),
                CellContent::Number(n) => Ok(Value::Number(*n)),
                CellContent::Text(s) => Ok(Value::Text(s.clone())),
                CellContent::Formula { cache, .. } => match cache {
                    FormulaCache::Number(n) => Ok(Value::Number(*n)),
                    FormulaCache::Text(s) => Ok(Value::Text(s.clone())),
                    FormulaCache::Error(e) => Err(*e),
                },
                CellContent::Error => Err(FormulaError::Value),
            },
        }
    }
}

impl Sheet {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            name: String::from("Sheet1"),
            rows,
            cols,
            cells: FxHashMap::default(),
            col_widths: vec![DEFAULT_COL_WIDTH; cols],
            row_heights: vec![DEFAULT_ROW_HEIGHT; rows],
            needs_recalc: false,
            selection: Selection::default(),
            cell_clipboard: None,
            range_clipboard: None,
            undo: UndoLog::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    // ---- cell store -------------------------------------------------------

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if !self.in_bounds(row, col) {
            return None;
        }
        self.cells.get(&(row, col))
    }

    /// Mutable handle, lazily allocating a default cell. None out of bounds.
    pub fn get_or_create(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if !self.in_bounds(row, col) {
            return None;
        }
        Some(self.cells.entry((row, col)).or_insert_with(Cell::new))
    }

    pub fn set_number(&mut self, row: usize, col: usize, value: f64) {
        if let Some(cell) = self.get_or_create(row, col) {
            cell.set_number(value);
            self.needs_recalc = true;
        }
    }

    pub fn set_text(&mut self, row: usize, col: usize, text: &str) {
        if let Some(cell) = self.get_or_create(row, col) {
            cell.set_text(text);
            self.needs_recalc = true;
        }
    }

    pub fn set_formula(&mut self, row: usize, col: usize, source: &str) {
        if let Some(cell) = self.get_or_create(row, col) {
            cell.set_formula(source);
            self.needs_recalc = true;
        }
    }

    /// Typed entry used by input handling and CSV load: `=` prefix makes a
    /// formula, a numeric parse makes a number, anything else is text.
    pub fn set_input(&mut self, row: usize, col: usize, input: &str) {
        if input.starts_with('=') {
            self.set_formula(row, col, input);
        } else if let Ok(n) = input.trim().parse::<f64>() {
            self.set_number(row, col, n);
        } else {
            self.set_text(row, col, input);
        }
    }

    /// Clear content; formatting stays.
    pub fn clear_cell(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.cells.get_mut(&(row, col)) {
            cell.clear();
            self.needs_recalc = true;
        }
    }

    /// Sheet-level clone by indices; an absent source clears the destination.
    pub fn copy_cell(&mut self, src_row: usize, src_col: usize, dst_row: usize, dst_col: usize) {
        if !self.in_bounds(dst_row, dst_col) {
            return;
        }
        match self.get(src_row, src_col).cloned() {
            Some(cell) => {
                self.cells.insert((dst_row, dst_col), cell);
            }
            None => self.clear_cell(dst_row, dst_col),
        }
        self.needs_recalc = true;
    }

    pub fn display_value(&self, row: usize, col: usize) -> String {
        self.get(row, col).map(Cell::display_value).unwrap_or_default()
    }

    /// The cell's formatting, or defaults for absent cells.
    pub fn cell_format(&self, row: usize, col: usize) -> CellFormat {
        self.get(row, col).map(|c| c.format.clone()).unwrap_or_default()
    }

    /// Bounding rectangle of non-empty cells: (max_row, max_col).
    pub fn used_extent(&self) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.is_empty())
            .fold(None, |acc, (&(r, c), _)| match acc {
                None => Some((r, c)),
                Some((mr, mc)) => Some((mr.max(r), mc.max(c))),
            })
    }

    /// Drop every cell (formatting included). Sizing and undo are kept.
    pub fn clear_all_cells(&mut self) {
        self.cells.clear();
        self.needs_recalc = true;
    }

    // ---- sizing -----------------------------------------------------------

    pub fn column_width(&self, col: usize) -> u16 {
        self.col_widths.get(col).copied().unwrap_or(DEFAULT_COL_WIDTH)
    }

    pub fn row_height(&self, row: usize) -> u16 {
        self.row_heights.get(row).copied().unwrap_or(DEFAULT_ROW_HEIGHT)
    }

    /// Adjust widths over an inclusive column span; indices and the
    /// resulting widths are clamped into their legal ranges.
    pub fn resize_columns(&mut self, c0: usize, c1: usize, delta: i16) {
        let (c0, c1) = clamp_span(c0, c1, self.cols);
        for c in c0..=c1 {
            let w = self.col_widths[c] as i16 + delta;
            self.col_widths[c] = w.clamp(MIN_COL_WIDTH as i16, MAX_COL_WIDTH as i16) as u16;
        }
    }

    pub fn resize_rows(&mut self, r0: usize, r1: usize, delta: i16) {
        let (r0, r1) = clamp_span(r0, r1, self.rows);
        for r in r0..=r1 {
            let h = self.row_heights[r] as i16 + delta;
            self.row_heights[r] = h.clamp(MIN_ROW_HEIGHT as i16, MAX_ROW_HEIGHT as i16) as u16;
        }
    }

    // ---- formatting -------------------------------------------------------

    pub fn set_format(&mut self, row: usize, col: usize, format: NumberFormat) {
        if let Some(cell) = self.get_or_create(row, col) {
            cell.format.number_format = format;
        }
    }

    /// Step the cell through the date/time format cycle; returns the new
    /// format for the status line.
    pub fn cycle_datetime_format(&mut self, row: usize, col: usize) -> Option<NumberFormat> {
        let cell = self.get_or_create(row, col)?;
        let next = cell.format.number_format.cycle_datetime();
        cell.format.number_format = next;
        Some(next)
    }

    pub fn set_text_color(&mut self, row: usize, col: usize, color: u8) {
        if let Some(cell) = self.get_or_create(row, col) {
            cell.format.text_color = Some(color);
        }
    }

    pub fn set_background_color(&mut self, row: usize, col: usize, color: u8) {
        if let Some(cell) = self.get_or_create(row, col) {
            cell.format.background_color = Some(color);
        }
    }

    // ---- selection --------------------------------------------------------

    pub fn start_selection(&mut self, row: usize, col: usize) {
        self.selection.start(row, col);
    }

    pub fn extend_selection(&mut self, row: usize, col: usize) {
        self.selection.extend(row, col);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_in_selection(&self, row: usize, col: usize) -> bool {
        self.selection.contains(row, col)
    }

    // ---- clipboards -------------------------------------------------------

    /// Deep-clone one cell into the single-cell clipboard. Copying an
    /// absent cell empties the clipboard.
    pub fn copy_cell_to_clipboard(&mut self, row: usize, col: usize) {
        self.cell_clipboard = self.get(row, col).cloned();
    }

    pub fn has_cell_clipboard(&self) -> bool {
        self.cell_clipboard.is_some()
    }

    /// Paste the single-cell clipboard; false when there is nothing to paste.
    pub fn paste_cell(&mut self, row: usize, col: usize) -> bool {
        let Some(cell) = self.cell_clipboard.clone() else {
            return false;
        };
        if !self.in_bounds(row, col) {
            return false;
        }
        self.cells.insert((row, col), cell);
        self.needs_recalc = true;
        self.recalculate();
        true
    }

    /// Snapshot the selected range into the range clipboard; false when no
    /// selection is active. The previous snapshot is replaced atomically.
    pub fn copy_range(&mut self) -> bool {
        let Some(range) = self.selection.range() else {
            return false;
        };
        let cells = range.cells().map(|(r, c)| self.get(r, c).cloned()).collect();
        self.range_clipboard = Some(RangeClipboard::new(range.rows(), range.cols(), cells));
        true
    }

    pub fn has_range_clipboard(&self) -> bool {
        self.range_clipboard.is_some()
    }

    /// Dimensions of the range clipboard, for paste-footprint bookkeeping.
    pub fn range_clipboard_size(&self) -> Option<(usize, usize)> {
        self.range_clipboard.as_ref().map(|clip| (clip.rows(), clip.cols()))
    }

    /// Paste the range clipboard with its top-left at (row, col). Cells
    /// falling outside the grid are silently skipped.
    pub fn paste_range(&mut self, row: usize, col: usize) -> bool {
        let Some(clip) = self.range_clipboard.clone() else {
            return false;
        };
        for (dr, dc, cell) in clip.iter() {
            let (r, c) = (row + dr, col + dc);
            if !self.in_bounds(r, c) {
                continue;
            }
            match cell {
                Some(cell) => {
                    self.cells.insert((r, c), cell.clone());
                }
                None => self.clear_cell(r, c),
            }
        }
        self.needs_recalc = true;
        self.recalculate();
        true
    }

    // ---- recalculation ----------------------------------------------------

    pub fn needs_recalc(&self) -> bool {
        self.needs_recalc
    }

    /// One pass over all formula cells in row-major order, refreshing each
    /// cache. No topological order and no fixpoint loop: a formula reading
    /// a later-in-scan formula sees the previous cycle's cached value, and
    /// deep chains settle over repeated recalculations.
    pub fn recalculate(&mut self) {
        if !self.needs_recalc {
            return;
        }

        let mut formulas: Vec<(usize, usize)> = self
            .cells
            .iter()
            .filter(|(_, cell)| matches!(cell.content, CellContent::Formula { .. }))
            .map(|(&pos, _)| pos)
            .collect();
        formulas.sort_unstable();

        for (row, col) in formulas {
            let ast = match self.cells.get(&(row, col)) {
                Some(Cell { content: CellContent::Formula { ast, .. }, .. }) => ast.clone(),
                _ => continue,
            };
            let cache = match ast {
                None => FormulaCache::Error(FormulaError::Parse),
                Some(expr) => match formula::evaluate(&expr, &*self) {
                    Ok(Value::Number(n)) => FormulaCache::Number(n),
                    Ok(Value::Text(s)) => FormulaCache::Text(s),
                    Ok(Value::Empty) => FormulaCache::Number(0.0),
                    Err(e) => FormulaCache::Error(e),
                },
            };
            if let Some(Cell { content: CellContent::Formula { cache: slot, .. }, .. }) =
                self.cells.get_mut(&(row, col))
            {
                *slot = cache;
            }
        }

        self.needs_recalc = false;
    }

    // ---- undo -------------------------------------------------------------

    /// Snapshot one cell's full before-state. Call before mutating it.
    pub fn record_cell(&mut self, row: usize, col: usize) {
        let before = self.cells.get(&(row, col)).cloned();
        self.undo.record(UndoRecord::Cell { row, col, before, after: None });
    }

    /// Snapshot every cell in a rectangle. Call before mutating them.
    pub fn record_range(&mut self, range: Range) {
        let before = range.cells().map(|(r, c)| self.cells.get(&(r, c)).cloned()).collect();
        self.undo.record(UndoRecord::Range { range, before, after: None });
    }

    pub fn record_column_resize(&mut self, c0: usize, c1: usize) {
        let (c0, c1) = clamp_span(c0, c1, self.cols);
        let before = self.col_widths[c0..=c1].to_vec();
        self.undo.record(UndoRecord::ColumnResize { start: c0, before, after: None });
    }

    pub fn record_row_resize(&mut self, r0: usize, r1: usize) {
        let (r0, r1) = clamp_span(r0, r1, self.rows);
        let before = self.row_heights[r0..=r1].to_vec();
        self.undo.record(UndoRecord::RowResize { start: r0, before, after: None });
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Capture the after-state into the record, then restore the
    /// before-state. False when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo.pop_for_undo() else {
            return false;
        };
        match record {
            UndoRecord::Cell { row, col, before, after } => {
                let (row, col) = (*row, *col);
                let restored = before.clone();
                *after = Some(self.cells.get(&(row, col)).cloned());
                restore_cell(&mut self.cells, row, col, restored);
            }
            UndoRecord::Range { range, before, after } => {
                let range = *range;
                let restored = before.clone();
                let mut current = Vec::with_capacity(range.cell_count());
                for (r, c) in range.cells() {
                    current.push(self.cells.get(&(r, c)).cloned());
                }
                *after = Some(current);
                for ((r, c), snap) in range.cells().zip(restored) {
                    restore_cell(&mut self.cells, r, c, snap);
                }
            }
            UndoRecord::ColumnResize { start, before, after } => {
                let start = *start;
                let restored = before.clone();
                *after = Some(self.col_widths[start..start + restored.len()].to_vec());
                self.col_widths[start..start + restored.len()].copy_from_slice(&restored);
            }
            UndoRecord::RowResize { start, before, after } => {
                let start = *start;
                let restored = before.clone();
                *after = Some(self.row_heights[start..start + restored.len()].to_vec());
                self.row_heights[start..start + restored.len()].copy_from_slice(&restored);
            }
        }
        self.needs_recalc = true;
        self.recalculate();
        true
    }

    /// Restore the after-state captured by the matching undo. False when
    /// there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(record) = self.undo.pop_for_redo() else {
            return false;
        };
        match record {
            UndoRecord::Cell { row, col, after, .. } => {
                let (row, col) = (*row, *col);
                let Some(restored) = after.clone() else {
                    return true;
                };
                restore_cell(&mut self.cells, row, col, restored);
            }
            UndoRecord::Range { range, after, .. } => {
                let range = *range;
                let Some(restored) = after.clone() else {
                    return true;
                };
                for ((r, c), snap) in range.cells().zip(restored) {
                    restore_cell(&mut self.cells, r, c, snap);
                }
            }
            UndoRecord::ColumnResize { start, after, .. } => {
                let start = *start;
                let Some(restored) = after.clone() else {
                    return true;
                };
                self.col_widths[start..start + restored.len()].copy_from_slice(&restored);
            }
            UndoRecord::RowResize { start, after, .. } => {
                let start = *start;
                let Some(restored) = after.clone() else {
                    return true;
                };
                self.row_heights[start..start + restored.len()].copy_from_slice(&restored);
            }
        }
        self.needs_recalc = true;
        self.recalculate();
        true
    }

    // ---- chart feed -------------------------------------------------------

    /// Typed samples for charting: one per selected row, labeled by the
    /// row's first text cell, valued by its first numeric cell. Rows with
    /// no numeric value are skipped.
    pub fn range_samples(&self, range: Range) -> Vec<(Option<String>, f64)> {
        let mut samples = Vec::new();
        for row in range.start_row..=range.end_row {
            let mut label = None;
            let mut value = None;
            for col in range.start_col..=range.end_col {
                match self.read(row, col) {
                    Ok(Value::Text(s)) if label.is_none() => label = Some(s),
                    Ok(Value::Number(n)) if value.is_none() => value = Some(n),
                    _ => {}
                }
                if label.is_some() && value.is_some() {
                    break;
                }
            }
            if let Some(v) = value {
                samples.push((label, v));
            }
        }
        samples
    }
}

fn clamp_span(a: usize, b: usize, len: usize) -> (usize, usize) {
    let hi = len.saturating_sub(1);
    let (a, b) = (a.min(hi), b.min(hi));
    (a.min(b), a.max(b))
}

fn restore_cell(
    cells: &mut FxHashMap<(usize, usize), Cell>,
    row: usize,
    col: usize,
    snapshot: Option<Cell>,
) {
    match snapshot {
        Some(cell) => {
            cells.insert((row, col), cell);
        }
        None => {
            cells.remove(&(row, col));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Alignment;

    #[test]
    fn lazy_creation_and_bounds() {
        let mut sheet = Sheet::new(10, 10);
        assert!(sheet.get(0, 0).is_none());
        sheet.set_number(0, 0, 1.5);
        assert!(sheet.get(0, 0).is_some());
        // Out-of-range writes are ignored.
        sheet.set_number(10, 0, 1.0);
        sheet.set_number(0, 10, 1.0);
        assert!(sheet.get_or_create(10, 10).is_none());
    }

    #[test]
    fn set_input_types_fields() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set_input(0, 0, "42");
        sheet.set_input(0, 1, "hello");
        sheet.set_input(0, 2, "=1+1");
        assert!(matches!(sheet.get(0, 0).unwrap().content, CellContent::Number(_)));
        assert!(matches!(sheet.get(0, 1).unwrap().content, CellContent::Text(_)));
        assert!(matches!(sheet.get(0, 2).unwrap().content, CellContent::Formula { .. }));
    }

    #[test]
    fn content_writes_preserve_formatting() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set_format(1, 1, NumberFormat::Percentage);
        sheet.set_text_color(1, 1, 4);
        sheet.set_number(1, 1, 0.5);
        let cell = sheet.get(1, 1).unwrap();
        assert_eq!(cell.format.number_format, NumberFormat::Percentage);
        assert_eq!(cell.format.text_color, Some(4));
    }

    #[test]
    fn text_write_left_aligns() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set_text(0, 0, "abc");
        assert_eq!(sheet.get(0, 0).unwrap().format.align, Alignment::Left);
    }

    #[test]
    fn resize_clamps_both_ends() {
        let mut sheet = Sheet::new(10, 10);
        sheet.resize_columns(0, 0, -20);
        assert_eq!(sheet.column_width(0), MIN_COL_WIDTH);
        sheet.resize_columns(0, 0, -1);
        assert_eq!(sheet.column_width(0), MIN_COL_WIDTH);
        sheet.resize_columns(0, 0, 100);
        assert_eq!(sheet.column_width(0), MAX_COL_WIDTH);
        sheet.resize_columns(0, 0, 1);
        assert_eq!(sheet.column_width(0), MAX_COL_WIDTH);

        sheet.resize_rows(3, 3, 100);
        assert_eq!(sheet.row_height(3), MAX_ROW_HEIGHT);
        sheet.resize_rows(3, 3, -100);
        assert_eq!(sheet.row_height(3), MIN_ROW_HEIGHT);
        // Span indices beyond the grid clamp in.
        sheet.resize_columns(5, 500, 2);
        assert_eq!(sheet.column_width(9), 12);
    }

    #[test]
    fn used_extent_tracks_nonempty_cells() {
        let mut sheet = Sheet::new(100, 100);
        assert_eq!(sheet.used_extent(), None);
        sheet.set_number(3, 7, 1.0);
        sheet.set_text(9, 2, "x");
        assert_eq!(sheet.used_extent(), Some((9, 7)));
        // A cleared cell keeps its slot but stops counting.
        sheet.clear_cell(9, 2);
        assert_eq!(sheet.used_extent(), Some((3, 7)));
    }

    #[test]
    fn copy_cell_from_absent_source_clears() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set_number(1, 1, 5.0);
        sheet.copy_cell(0, 0, 1, 1);
        assert!(sheet.get(1, 1).unwrap().is_empty());
    }

    #[test]
    fn recalc_flag_discipline() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set_number(0, 0, 2.0);
        sheet.set_formula(0, 1, "=A1*3");
        assert!(sheet.needs_recalc());
        sheet.recalculate();
        assert!(!sheet.needs_recalc());
        assert_eq!(sheet.display_value(0, 1), "6");
        // Recalculate without changes is a no-op.
        sheet.recalculate();
        assert_eq!(sheet.display_value(0, 1), "6");
    }

    #[test]
    fn range_samples_label_and_value() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set_text(0, 0, "apples");
        sheet.set_number(0, 1, 4.0);
        sheet.set_text(1, 0, "pears");
        sheet.set_number(1, 1, 2.0);
        sheet.set_text(2, 0, "no value");
        let samples = sheet.range_samples(Range::new(0, 0, 2, 1));
        assert_eq!(
            samples,
            vec![
                (Some("apples".to_string()), 4.0),
                (Some("pears".to_string()), 2.0),
            ]
        );
    }
}
