//! The `:` command layer. Parsing and execution are kept out of the TUI so
//! they can be tested headless; anything that needs terminal interaction
//! (the CSV mode prompt, chart overlay) is returned as an [`Action`].

use termgrid_chart::ChartKind;
use termgrid_engine::cell::{DateStyle, DateTimeStyle, NumberFormat, TimeStyle};
use termgrid_engine::color::parse_color;
use termgrid_engine::sheet::Sheet;

/// What the presenter should do after a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Status(String),
    /// Ask flatten-or-preserve, then save/load
    SaveCsv(String),
    LoadCsv(String),
    Chart { kind: ChartKind, size: Option<(usize, usize)> },
}

pub fn execute(sheet: &mut Sheet, cursor: (usize, usize), command: &str) -> Action {
    let command = command.trim();
    let (head, rest) = match command.split_once(' ') {
        Some((head, rest)) => (head, rest.trim()),
        None => (command, ""),
    };

    match head {
        "q" | "quit" => Action::Quit,
        "savecsv" => {
            if rest.is_empty() {
                Action::Status("Usage: savecsv <filename>".into())
            } else {
                Action::SaveCsv(rest.to_string())
            }
        }
        "loadcsv" => {
            if rest.is_empty() {
                Action::Status("Usage: loadcsv <filename>".into())
            } else {
                Action::LoadCsv(rest.to_string())
            }
        }
        "range" => match rest.strip_prefix("format") {
            Some(args) if sheet.selection().range().is_some() => {
                apply_format(sheet, cursor, args.trim())
            }
            Some(_) => Action::Status("No range selected".into()),
            None => Action::Status(format!("Unknown command: {}", command)),
        },
        "format" => apply_format(sheet, cursor, rest),
        "clrtx" => apply_color(sheet, cursor, rest, true),
        "clrbg" => apply_color(sheet, cursor, rest, false),
        "chart" => chart_action(rest),
        _ => Action::Status(format!("Unknown command: {}", command)),
    }
}

/// Apply a `format <type> [style]` argument to the selection if one is
/// active, else the cursor cell. Records one undo entry.
fn apply_format(sheet: &mut Sheet, cursor: (usize, usize), args: &str) -> Action {
    let mut parts = args.splitn(2, ' ');
    let kind = parts.next().unwrap_or("");
    let style = parts.next().map(str::trim);

    let Some(format) = parse_format(kind, style) else {
        if kind.is_empty() {
            return Action::Status("Usage: format <type> [style]".into());
        }
        return Action::Status(format!("Unknown format: {}", args));
    };

    match sheet.selection().range() {
        Some(range) => {
            sheet.record_range(range);
            for (r, c) in range.cells() {
                sheet.set_format(r, c, format);
            }
            Action::Status(format!("Range formatted as {}", format.name().to_lowercase()))
        }
        None => {
            sheet.record_cell(cursor.0, cursor.1);
            sheet.set_format(cursor.0, cursor.1, format);
            Action::Status(format!("Cell formatted as {}", format.name().to_lowercase()))
        }
    }
}

fn parse_format(kind: &str, style: Option<&str>) -> Option<NumberFormat> {
    match kind {
        "general" => Some(NumberFormat::General),
        "number" => Some(NumberFormat::Number),
        "percentage" => Some(NumberFormat::Percentage),
        "currency" => Some(NumberFormat::Currency),
        "date" => {
            let style = match style.unwrap_or("mm/dd/yyyy") {
                "mm/dd/yyyy" => DateStyle::MmDdYyyy,
                "dd/mm/yyyy" => DateStyle::DdMmYyyy,
                "yyyy-mm-dd" => DateStyle::YyyyMmDd,
                "mm/dd/yy" => DateStyle::MmDdYy,
                "mon-dd-yyyy" => DateStyle::MonDdYyyy,
                "dd-mon-yyyy" => DateStyle::DdMonYyyy,
                "yyyy-mon-dd" => DateStyle::YyyyMonDd,
                _ => return None,
            };
            Some(NumberFormat::Date { style })
        }
        "time" => {
            let style = match style.unwrap_or("12hr") {
                "12hr" => TimeStyle::Hour12,
                "24hr" => TimeStyle::Hour24,
                "seconds" => TimeStyle::Hour24Seconds,
                "12hr-seconds" => TimeStyle::Hour12Seconds,
                _ => return None,
            };
            Some(NumberFormat::Time { style })
        }
        "datetime" => {
            let style = match style.unwrap_or("short") {
                "short" => DateTimeStyle::Short,
                "long" => DateTimeStyle::Long,
                "iso" => DateTimeStyle::Iso,
                _ => return None,
            };
            Some(NumberFormat::DateTime { style })
        }
        _ => None,
    }
}

fn apply_color(sheet: &mut Sheet, cursor: (usize, usize), arg: &str, text: bool) -> Action {
    let Some(color) = parse_color(arg) else {
        return Action::Status(format!("Invalid color: {}", arg));
    };

    let target = if text { "text" } else { "background" };
    match sheet.selection().range() {
        Some(range) => {
            sheet.record_range(range);
            for (r, c) in range.cells() {
                if text {
                    sheet.set_text_color(r, c, color);
                } else {
                    sheet.set_background_color(r, c, color);
                }
            }
            Action::Status(format!("Range {} color set to {}", target, arg))
        }
        None => {
            sheet.record_cell(cursor.0, cursor.1);
            if text {
                sheet.set_text_color(cursor.0, cursor.1, color);
            } else {
                sheet.set_background_color(cursor.0, cursor.1, color);
            }
            Action::Status(format!("Cell {} color set to {}", target, arg))
        }
    }
}

fn chart_action(args: &str) -> Action {
    let mut parts = args.split_whitespace();
    let Some(kind) = parts.next().and_then(ChartKind::parse) else {
        return Action::Status("Usage: chart <line|bar|pie|scatter> [WxH]".into());
    };

    let size = match parts.next() {
        None => None,
        Some(spec) => match parse_size(spec) {
            Some(size) => Some(size),
            None => return Action::Status(format!("Bad chart size: {}", spec)),
        },
    };

    Action::Chart { kind, size }
}

fn parse_size(spec: &str) -> Option<(usize, usize)> {
    let (w, h) = spec.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use termgrid_engine::cell::NumberFormat;

    fn sheet() -> Sheet {
        Sheet::new(20, 20)
    }

    #[test]
    fn quit_commands() {
        let mut s = sheet();
        assert_eq!(execute(&mut s, (0, 0), "q"), Action::Quit);
        assert_eq!(execute(&mut s, (0, 0), "quit"), Action::Quit);
    }

    #[test]
    fn csv_commands_return_paths() {
        let mut s = sheet();
        assert_eq!(
            execute(&mut s, (0, 0), "savecsv out.csv"),
            Action::SaveCsv("out.csv".into())
        );
        assert_eq!(
            execute(&mut s, (0, 0), "loadcsv in.csv"),
            Action::LoadCsv("in.csv".into())
        );
        assert!(matches!(execute(&mut s, (0, 0), "savecsv"), Action::Status(_)));
    }

    #[test]
    fn format_applies_to_cursor_cell() {
        let mut s = sheet();
        let action = execute(&mut s, (1, 2), "format percentage");
        assert_eq!(action, Action::Status("Cell formatted as percentage".into()));
        assert_eq!(s.cell_format(1, 2).number_format, NumberFormat::Percentage);
        // One undo entry was recorded.
        assert_eq!(s.undo_depth(), 1);
    }

    #[test]
    fn format_with_style() {
        let mut s = sheet();
        execute(&mut s, (0, 0), "format date yyyy-mm-dd");
        assert_eq!(
            s.cell_format(0, 0).number_format,
            NumberFormat::Date { style: DateStyle::YyyyMmDd }
        );
        execute(&mut s, (0, 0), "format time 24hr");
        assert_eq!(
            s.cell_format(0, 0).number_format,
            NumberFormat::Time { style: TimeStyle::Hour24 }
        );
    }

    #[test]
    fn format_applies_to_selection() {
        let mut s = sheet();
        s.start_selection(0, 0);
        s.extend_selection(1, 1);
        let action = execute(&mut s, (0, 0), "format currency");
        assert_eq!(action, Action::Status("Range formatted as currency".into()));
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert_eq!(s.cell_format(r, c).number_format, NumberFormat::Currency);
        }
        assert_eq!(s.undo_depth(), 1);
    }

    #[test]
    fn range_format_requires_selection() {
        let mut s = sheet();
        assert_eq!(
            execute(&mut s, (0, 0), "range format percentage"),
            Action::Status("No range selected".into())
        );
    }

    #[test]
    fn color_commands() {
        let mut s = sheet();
        execute(&mut s, (0, 0), "clrtx red");
        assert_eq!(s.cell_format(0, 0).text_color, Some(4));
        execute(&mut s, (0, 0), "clrbg #0000FF");
        assert_eq!(s.cell_format(0, 0).background_color, Some(1));

        let action = execute(&mut s, (0, 0), "clrtx mauve");
        assert_eq!(action, Action::Status("Invalid color: mauve".into()));
    }

    #[test]
    fn chart_directives() {
        let mut s = sheet();
        assert_eq!(
            execute(&mut s, (0, 0), "chart bar"),
            Action::Chart { kind: ChartKind::Bar, size: None }
        );
        assert_eq!(
            execute(&mut s, (0, 0), "chart line 80x24"),
            Action::Chart { kind: ChartKind::Line, size: Some((80, 24)) }
        );
        assert!(matches!(execute(&mut s, (0, 0), "chart donut"), Action::Status(_)));
    }

    #[test]
    fn unknown_commands_report() {
        let mut s = sheet();
        assert_eq!(
            execute(&mut s, (0, 0), "frobnicate"),
            Action::Status("Unknown command: frobnicate".into())
        );
        assert_eq!(
            execute(&mut s, (0, 0), "format sideways"),
            Action::Status("Unknown format: sideways".into())
        );
    }
}
