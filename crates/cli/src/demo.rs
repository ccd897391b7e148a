//! The startup worksheet: a quick feature tour seeded into an empty sheet.

use termgrid_engine::cell::{DateStyle, NumberFormat, TimeStyle};
use termgrid_engine::sheet::Sheet;

pub fn seed(sheet: &mut Sheet) {
    sheet.set_text(0, 0, "termgrid quick tour");

    sheet.set_text(2, 0, "Shift+arrows selects a range");
    sheet.set_text(3, 0, "Ctrl+C / Ctrl+V copy and paste it");
    sheet.set_text(4, 0, "Alt+arrows resize columns and rows");
    sheet.set_text(5, 0, "u / U undo and redo");

    sheet.set_text(7, 0, "Formatting:");
    sheet.set_text(8, 0, "Percentage:");
    sheet.set_number(8, 1, 0.1234);
    sheet.set_format(8, 1, NumberFormat::Percentage);

    sheet.set_text(9, 0, "Currency:");
    sheet.set_number(9, 1, 1234.56);
    sheet.set_format(9, 1, NumberFormat::Currency);

    sheet.set_text(10, 0, "Date:");
    sheet.set_number(10, 1, 45000.0);
    sheet.set_format(10, 1, NumberFormat::Date { style: DateStyle::MmDdYyyy });

    sheet.set_text(11, 0, "Time:");
    sheet.set_number(11, 1, 0.5);
    sheet.set_format(11, 1, NumberFormat::Time { style: TimeStyle::Hour12 });

    sheet.set_text(13, 0, "Lookup table:");
    sheet.set_text(14, 0, "Apple");
    sheet.set_number(14, 1, 0.50);
    sheet.set_text(15, 0, "Orange");
    sheet.set_number(15, 1, 0.75);
    sheet.set_text(16, 0, "Banana");
    sheet.set_number(16, 1, 0.30);
    sheet.set_text(18, 0, "Orange price:");
    sheet.set_formula(18, 1, "=VLOOKUP(\"Orange\",A15:B17,2,1)");

    sheet.set_text(20, 0, "Commands (:)");
    sheet.set_text(21, 0, ":format percentage");
    sheet.set_text(22, 0, ":clrtx red   :clrbg #112233");
    sheet.set_text(23, 0, ":savecsv out.csv   :loadcsv in.csv");
    sheet.set_text(24, 0, ":chart bar  (with a selection)");

    sheet.recalculate();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_formulas_evaluate() {
        let mut sheet = Sheet::default();
        seed(&mut sheet);
        assert_eq!(sheet.display_value(18, 1), "0.75");
        assert_eq!(sheet.display_value(8, 1), "12.34%");
        assert_eq!(sheet.display_value(9, 1), "$1234.56");
    }
}
