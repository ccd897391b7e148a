// CSV import/export

use std::path::Path;

use serde::{Deserialize, Serialize};
use termgrid_engine::sheet::Sheet;

/// What formula cells become on disk: their displayed value, or their
/// source expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvMode {
    #[default]
    Flatten,
    Preserve,
}

/// Write the minimal rectangle covering non-empty cells, row-major.
/// Quoting and quote-doubling are the csv crate's.
pub fn save(sheet: &Sheet, path: &Path, mode: CsvMode) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;

    if let Some((max_row, max_col)) = sheet.used_extent() {
        for row in 0..=max_row {
            let mut record: Vec<String> = Vec::with_capacity(max_col + 1);
            for col in 0..=max_col {
                let field = match mode {
                    CsvMode::Preserve => match sheet.get(row, col).and_then(|c| c.formula_source())
                    {
                        Some(source) => source.to_string(),
                        None => sheet.display_value(row, col),
                    },
                    CsvMode::Flatten => sheet.display_value(row, col),
                };
                record.push(field);
            }
            writer.write_record(&record).map_err(|e| e.to_string())?;
        }
    }

    writer.flush().map_err(|e| e.to_string())
}

/// Clear the grid, then type each non-empty field: a leading '=' makes a
/// formula in preserve mode, a numeric parse makes a number, anything else
/// is text. Recalculates before returning.
pub fn load(sheet: &mut Sheet, path: &Path, mode: CsvMode) -> Result<(), String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    sheet.clear_all_cells();

    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| e.to_string())?;
        for (col, field) in record.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            if field.starts_with('=') && mode == CsvMode::Preserve {
                sheet.set_formula(row, col, field);
            } else if let Ok(n) = field.trim().parse::<f64>() {
                sheet.set_number(row, col, n);
            } else {
                sheet.set_text(row, col, field);
            }
        }
    }

    sheet.recalculate();
    Ok(())
}
