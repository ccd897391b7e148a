//! Cell model: content sum type, per-cell formatting, and the display
//! formatter (fixed-point, percentage, currency, serial date/time).

use serde::{Deserialize, Serialize};

use crate::formula::{parser, Expr, FormulaError};

/// Horizontal text alignment. Numbers default to right; text writes flip
/// the cell to left.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    #[default]
    Right,
}

/// Date rendering style
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateStyle {
    #[default]
    MmDdYyyy, // 03/14/2023
    DdMmYyyy,   // 14/03/2023
    YyyyMmDd,   // 2023-03-14
    MmDdYy,     // 03/14/23
    MonDdYyyy,  // Mar 14, 2023
    DdMonYyyy,  // 14 Mar 2023
    YyyyMonDd,  // 2023 Mar 14
}

/// Time rendering style
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeStyle {
    #[default]
    Hour12, // 1:30 PM
    Hour24,        // 13:30
    Hour24Seconds, // 13:30:05
    Hour12Seconds, // 1:30:05 PM
}

/// Combined date+time rendering style
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateTimeStyle {
    #[default]
    Short, // 3/14/23 1:30 PM
    Long,  // Mar 14, 2023 1:30:05 PM
    Iso,   // 2023-03-14T13:30:05
}

/// Number format type. Date/time variants carry their style.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum NumberFormat {
    #[default]
    General,
    Number,
    Percentage,
    Currency,
    Date { style: DateStyle },
    Time { style: TimeStyle },
    DateTime { style: DateTimeStyle },
}

/// The ordered format cycle: all date styles, then time, then datetime.
const FORMAT_CYCLE: [NumberFormat; 14] = [
    NumberFormat::Date { style: DateStyle::MmDdYyyy },
    NumberFormat::Date { style: DateStyle::DdMmYyyy },
    NumberFormat::Date { style: DateStyle::YyyyMmDd },
    NumberFormat::Date { style: DateStyle::MmDdYy },
    NumberFormat::Date { style: DateStyle::MonDdYyyy },
    NumberFormat::Date { style: DateStyle::DdMonYyyy },
    NumberFormat::Date { style: DateStyle::YyyyMonDd },
    NumberFormat::Time { style: TimeStyle::Hour12 },
    NumberFormat::Time { style: TimeStyle::Hour24 },
    NumberFormat::Time { style: TimeStyle::Hour24Seconds },
    NumberFormat::Time { style: TimeStyle::Hour12Seconds },
    NumberFormat::DateTime { style: DateTimeStyle::Short },
    NumberFormat::DateTime { style: DateTimeStyle::Long },
    NumberFormat::DateTime { style: DateTimeStyle::Iso },
];

impl NumberFormat {
    /// Next entry in the date/time format cycle. A cell not currently in a
    /// date/time format enters at the first entry.
    pub fn cycle_datetime(self) -> NumberFormat {
        match FORMAT_CYCLE.iter().position(|f| *f == self) {
            Some(i) => FORMAT_CYCLE[(i + 1) % FORMAT_CYCLE.len()],
            None => FORMAT_CYCLE[0],
        }
    }

    /// Human name for the status line.
    pub fn name(&self) -> &'static str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::Number => "Number",
            NumberFormat::Percentage => "Percentage",
            NumberFormat::Currency => "Currency",
            NumberFormat::Date { .. } => "Date",
            NumberFormat::Time { .. } => "Time",
            NumberFormat::DateTime { .. } => "DateTime",
        }
    }
}

/// Per-cell display properties. Preserved across content writes, clears,
/// copy/paste, and undo/redo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellFormat {
    /// Display column width hint
    pub width: u16,
    /// Decimal places for general/number/percentage rendering
    pub precision: u8,
    pub align: Alignment,
    pub number_format: NumberFormat,
    /// Console color index; None = terminal default
    pub text_color: Option<u8>,
    pub background_color: Option<u8>,
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            width: 10,
            precision: 2,
            align: Alignment::Right,
            number_format: NumberFormat::General,
            text_color: None,
            background_color: None,
        }
    }
}

/// Cached result of the last formula evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaCache {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Default for FormulaCache {
    fn default() -> Self {
        FormulaCache::Number(0.0)
    }
}

/// Cell content. The formula arm owns its source and the AST parsed from it
/// at write time; `ast: None` means the source failed to parse and the cache
/// holds the Parse error.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellContent {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Formula {
        source: String,
        ast: Option<Expr>,
        cache: FormulaCache,
    },
    /// Direct error injection; no write path produces this.
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub content: CellContent,
    pub format: CellFormat,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_number(&mut self, value: f64) {
        self.content = CellContent::Number(value);
    }

    pub fn set_text(&mut self, text: &str) {
        self.content = CellContent::Text(text.to_string());
        self.format.align = Alignment::Left;
    }

    pub fn set_formula(&mut self, source: &str) {
        let ast = parser::parse(source).ok();
        let cache = if ast.is_some() {
            FormulaCache::default()
        } else {
            FormulaCache::Error(FormulaError::Parse)
        };
        self.content = CellContent::Formula { source: source.to_string(), ast, cache };
    }

    /// Reset content to Empty; formatting is retained.
    pub fn clear(&mut self) {
        self.content = CellContent::Empty;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    pub fn formula_source(&self) -> Option<&str> {
        match &self.content {
            CellContent::Formula { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The formatter: what this cell shows in its grid slot.
    pub fn display_value(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Number(n) => format_number(*n, &self.format),
            CellContent::Formula { cache, .. } => match cache {
                FormulaCache::Error(e) => e.token().to_string(),
                FormulaCache::Text(s) => s.clone(),
                FormulaCache::Number(n) => format_number(*n, &self.format),
            },
            CellContent::Error => "#ERROR!".to_string(),
        }
    }
}

/// Render a numeric value under a cell's format.
pub fn format_number(n: f64, format: &CellFormat) -> String {
    match format.number_format {
        NumberFormat::General | NumberFormat::Number => {
            strip_trailing_zeros(format!("{:.*}", format.precision as usize, n))
        }
        NumberFormat::Percentage => {
            format!("{:.*}%", format.precision as usize, n * 100.0)
        }
        // Currency is always two decimals; negatives read -$x, not $-x.
        NumberFormat::Currency => {
            if n < 0.0 {
                format!("-${:.2}", n.abs())
            } else {
                format!("${:.2}", n)
            }
        }
        NumberFormat::Date { style } => format_date(n, style),
        NumberFormat::Time { style } => format_time(n, style),
        NumberFormat::DateTime { style } => format_datetime(n, style),
    }
}

fn strip_trailing_zeros(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

// Excel serial date system (1900): serial 1 = Jan 1, 1900. Excel treats
// 1900 as a leap year (it wasn't); serial 60 = the nonexistent Feb 29,
// 1900, and we replicate that for workbook compatibility.

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn days_in_months(year: i32) -> [u8; 12] {
    if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    }
}

/// Serial date number -> (year, month, day), 1900 system.
pub fn serial_to_date(serial: f64) -> (i32, u32, u32) {
    let serial = serial.floor() as i64;

    if serial < 1 {
        return (1900, 1, 1);
    }
    // Excel's phantom leap day.
    if serial == 60 {
        return (1900, 2, 29);
    }

    // Past the phantom day, shift back onto the real calendar.
    let adjusted = if serial > 60 { serial - 1 } else { serial };

    let mut remaining = adjusted - 1;
    let mut year = 1900i32;
    loop {
        let days = if is_leap_year(year) { 366 } else { 365 };
        if remaining < days {
            break;
        }
        remaining -= days;
        year += 1;
    }

    let mut month = 1u32;
    for &days in &days_in_months(year) {
        if remaining < days as i64 {
            break;
        }
        remaining -= days as i64;
        month += 1;
    }

    (year, month, remaining as u32 + 1)
}

/// (year, month, day) -> serial date number, 1900 system.
pub fn date_to_serial(year: i32, month: u32, day: u32) -> f64 {
    if year == 1900 && month == 2 && day == 29 {
        return 60.0;
    }

    let mut serial: i64 = 0;
    for y in 1900..year {
        serial += if is_leap_year(y) { 366 } else { 365 };
    }
    let months = days_in_months(year);
    for m in 1..month {
        serial += months[(m - 1) as usize] as i64;
    }
    serial += day as i64;

    // Everything on or after Mar 1, 1900 shifts by the phantom day.
    if year > 1900 || month >= 3 {
        serial += 1;
    }
    serial as f64
}

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn format_date(serial: f64, style: DateStyle) -> String {
    let (year, month, day) = serial_to_date(serial);
    let mon = MONTH_NAMES[(month - 1) as usize];
    match style {
        DateStyle::MmDdYyyy => format!("{:02}/{:02}/{:04}", month, day, year),
        DateStyle::DdMmYyyy => format!("{:02}/{:02}/{:04}", day, month, year),
        DateStyle::YyyyMmDd => format!("{:04}-{:02}-{:02}", year, month, day),
        DateStyle::MmDdYy => format!("{:02}/{:02}/{:02}", month, day, year % 100),
        DateStyle::MonDdYyyy => format!("{} {:02}, {:04}", mon, day, year),
        DateStyle::DdMonYyyy => format!("{:02} {} {:04}", day, mon, year),
        DateStyle::YyyyMonDd => format!("{:04} {} {:02}", year, mon, day),
    }
}

/// Split the fractional day into (h, m, s), rounding to whole seconds.
fn time_parts(serial: f64) -> (u32, u32, u32) {
    let total = (serial.fract().abs() * 86400.0).round() as u32 % 86400;
    (total / 3600, (total % 3600) / 60, total % 60)
}

fn twelve_hour(h: u32) -> (u32, &'static str) {
    let suffix = if h < 12 { "AM" } else { "PM" };
    let display = match h % 12 {
        0 => 12,
        x => x,
    };
    (display, suffix)
}

pub fn format_time(serial: f64, style: TimeStyle) -> String {
    let (h, m, s) = time_parts(serial);
    match style {
        TimeStyle::Hour12 => {
            let (h12, suffix) = twelve_hour(h);
            format!("{}:{:02} {}", h12, m, suffix)
        }
        TimeStyle::Hour24 => format!("{:02}:{:02}", h, m),
        TimeStyle::Hour24Seconds => format!("{:02}:{:02}:{:02}", h, m, s),
        TimeStyle::Hour12Seconds => {
            let (h12, suffix) = twelve_hour(h);
            format!("{}:{:02}:{:02} {}", h12, m, s, suffix)
        }
    }
}

pub fn format_datetime(serial: f64, style: DateTimeStyle) -> String {
    let (year, month, day) = serial_to_date(serial);
    let (h, m, s) = time_parts(serial);
    match style {
        DateTimeStyle::Short => {
            let (h12, suffix) = twelve_hour(h);
            format!("{}/{}/{:02} {}:{:02} {}", month, day, year % 100, h12, m, suffix)
        }
        DateTimeStyle::Long => {
            let (h12, suffix) = twelve_hour(h);
            format!(
                "{} {:02}, {:04} {}:{:02}:{:02} {}",
                MONTH_NAMES[(month - 1) as usize],
                day,
                year,
                h12,
                m,
                s,
                suffix
            )
        }
        DateTimeStyle::Iso => format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            year, month, day, h, m, s
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(precision: u8, number_format: NumberFormat) -> CellFormat {
        CellFormat { precision, number_format, ..Default::default() }
    }

    #[test]
    fn general_strips_trailing_zeros() {
        let f = fmt(2, NumberFormat::General);
        assert_eq!(format_number(21.0, &f), "21");
        assert_eq!(format_number(2.5, &f), "2.5");
        assert_eq!(format_number(2.25, &f), "2.25");
        assert_eq!(format_number(-3.10, &f), "-3.1");
        let f4 = fmt(4, NumberFormat::Number);
        assert_eq!(format_number(0.12345, &f4), "0.1235");
    }

    #[test]
    fn percentage_rendering() {
        let f = fmt(2, NumberFormat::Percentage);
        assert_eq!(format_number(0.1234, &f), "12.34%");
        let f0 = fmt(0, NumberFormat::Percentage);
        assert_eq!(format_number(0.5, &f0), "50%");
    }

    #[test]
    fn currency_is_two_decimals_with_sign_outside() {
        let f = fmt(5, NumberFormat::Currency);
        assert_eq!(format_number(1234.5, &f), "$1234.50");
        assert_eq!(format_number(-1234.5, &f), "-$1234.50");
        assert_eq!(format_number(0.0, &f), "$0.00");
    }

    #[test]
    fn serial_dates_basic() {
        assert_eq!(serial_to_date(1.0), (1900, 1, 1));
        assert_eq!(serial_to_date(59.0), (1900, 2, 28));
        // The phantom leap day Excel insists on.
        assert_eq!(serial_to_date(60.0), (1900, 2, 29));
        assert_eq!(serial_to_date(61.0), (1900, 3, 1));
        assert_eq!(serial_to_date(36526.0), (2000, 1, 1));
        assert_eq!(serial_to_date(45292.0), (2024, 1, 1));
    }

    #[test]
    fn serial_date_roundtrip() {
        for &(y, m, d) in &[
            (1900, 1, 1),
            (1900, 2, 29),
            (1900, 3, 1),
            (1999, 12, 31),
            (2000, 2, 29),
            (2023, 3, 14),
            (2024, 12, 31),
        ] {
            assert_eq!(serial_to_date(date_to_serial(y, m, d)), (y, m, d));
        }
    }

    #[test]
    fn date_styles() {
        let serial = date_to_serial(2023, 3, 14);
        assert_eq!(format_date(serial, DateStyle::MmDdYyyy), "03/14/2023");
        assert_eq!(format_date(serial, DateStyle::DdMmYyyy), "14/03/2023");
        assert_eq!(format_date(serial, DateStyle::YyyyMmDd), "2023-03-14");
        assert_eq!(format_date(serial, DateStyle::MmDdYy), "03/14/23");
        assert_eq!(format_date(serial, DateStyle::MonDdYyyy), "Mar 14, 2023");
        assert_eq!(format_date(serial, DateStyle::DdMonYyyy), "14 Mar 2023");
        assert_eq!(format_date(serial, DateStyle::YyyyMonDd), "2023 Mar 14");
    }

    #[test]
    fn time_styles() {
        // 0.5 = noon, 0.25 = 6:00 AM
        assert_eq!(format_time(0.5, TimeStyle::Hour12), "12:00 PM");
        assert_eq!(format_time(0.25, TimeStyle::Hour12), "6:00 AM");
        assert_eq!(format_time(0.75, TimeStyle::Hour24), "18:00");
        assert_eq!(format_time(0.0, TimeStyle::Hour12), "12:00 AM");
        let serial = (13.0 * 3600.0 + 30.0 * 60.0 + 5.0) / 86400.0;
        assert_eq!(format_time(serial, TimeStyle::Hour24Seconds), "13:30:05");
        assert_eq!(format_time(serial, TimeStyle::Hour12Seconds), "1:30:05 PM");
    }

    #[test]
    fn datetime_styles() {
        let serial = date_to_serial(2023, 3, 14) + 0.5625; // 13:30
        assert_eq!(format_datetime(serial, DateTimeStyle::Short), "3/14/23 1:30 PM");
        assert_eq!(
            format_datetime(serial, DateTimeStyle::Long),
            "Mar 14, 2023 1:30:00 PM"
        );
        assert_eq!(format_datetime(serial, DateTimeStyle::Iso), "2023-03-14T13:30:00");
    }

    #[test]
    fn format_cycle_wraps() {
        let mut f = NumberFormat::General;
        // Entering the cycle lands on the first date style.
        f = f.cycle_datetime();
        assert_eq!(f, NumberFormat::Date { style: DateStyle::MmDdYyyy });
        // One full lap over all 14 entries wraps back around.
        for _ in 0..14 {
            f = f.cycle_datetime();
        }
        assert_eq!(f, NumberFormat::Date { style: DateStyle::MmDdYyyy });
    }

    #[test]
    fn text_write_flips_alignment() {
        let mut cell = Cell::new();
        assert_eq!(cell.format.align, Alignment::Right);
        cell.set_text("hello");
        assert_eq!(cell.format.align, Alignment::Left);
        assert_eq!(cell.display_value(), "hello");
    }

    #[test]
    fn clear_preserves_formatting() {
        let mut cell = Cell::new();
        cell.format.number_format = NumberFormat::Percentage;
        cell.format.text_color = Some(4);
        cell.set_number(0.5);
        cell.clear();
        assert!(cell.is_empty());
        assert_eq!(cell.format.number_format, NumberFormat::Percentage);
        assert_eq!(cell.format.text_color, Some(4));
        assert_eq!(cell.display_value(), "");
    }

    #[test]
    fn bad_formula_caches_parse_error() {
        let mut cell = Cell::new();
        cell.set_formula("=1+");
        assert_eq!(cell.display_value(), "#PARSE!");
    }
}
