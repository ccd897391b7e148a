// Formula evaluator - walks the AST against a cell reader.

use std::fmt;

use super::parser::{Expr, Op};
use crate::reference::Range;

/// Tolerance used for numeric equality in comparisons, MODE bucketing, and
/// VLOOKUP exact matching.
pub const EQ_TOLERANCE: f64 = 1e-10;

/// Typed evaluation errors. Each cell caches at most one of these; rendering
/// shows the fixed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaError {
    DivZero,
    Ref,
    Value,
    Parse,
    Na,
}

impl FormulaError {
    pub fn token(&self) -> &'static str {
        match self {
            FormulaError::DivZero => "#DIV/0!",
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Parse => "#PARSE!",
            FormulaError::Na => "#N/A!",
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// The scalar a cell or subexpression produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric coercion: empty reads as 0, text is a Value error.
    pub fn as_number(&self) -> Result<f64, FormulaError> {
        match self {
            Value::Empty => Ok(0.0),
            Value::Number(n) => Ok(*n),
            Value::Text(_) => Err(FormulaError::Value),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    /// Comparison normalization: non-text operands compare as the empty string.
    fn text_or_empty(&self) -> &str {
        match self {
            Value::Text(s) => s,
            _ => "",
        }
    }
}

/// Read access the evaluator needs from the grid.
pub trait CellReader {
    fn grid_rows(&self) -> usize;
    fn grid_cols(&self) -> usize;

    /// Typed read: Empty for absent or cleared cells, the cached result for
    /// formulas (propagating a cached error), Err(Ref) out of bounds.
    fn read(&self, row: usize, col: usize) -> Result<Value, FormulaError>;
}

pub fn evaluate<L: CellReader>(expr: &Expr, cells: &L) -> Result<Value, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::CellRef { row, col } => {
            // Numeric context: a text cell here is a Value error.
            let v = cells.read(*row, *col)?;
            Ok(Value::Number(v.as_number()?))
        }
        // A bare range sums its numeric contents (legacy convenience).
        Expr::Range(range) => {
            let values = collect_range(*range, cells)?;
            Ok(Value::Number(values.iter().sum()))
        }
        Expr::Function { name, args } => call_function(name, args, cells),
        Expr::BinaryOp { op, left, right } if op.is_comparison() => {
            compare(*op, left, right, cells)
        }
        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, cells)?.as_number()?;
            let r = evaluate(right, cells)?.as_number()?;
            let result = match op {
                Op::Add => l + r,
                Op::Sub => l - r,
                Op::Mul => l * r,
                Op::Div => {
                    if r == 0.0 {
                        return Err(FormulaError::DivZero);
                    }
                    l / r
                }
                _ => unreachable!("comparison handled above"),
            };
            Ok(Value::Number(result))
        }
    }
}

/// Comparison over typed operands. If either side is text, both sides are
/// normalized to text (non-text reads as "") and compared lexicographically;
/// otherwise numerically, with tolerance-based equality. Yields 1.0 / 0.0.
fn compare<L: CellReader>(
    op: Op,
    left: &Expr,
    right: &Expr,
    cells: &L,
) -> Result<Value, FormulaError> {
    let lv = comparison_operand(left, cells)?;
    let rv = comparison_operand(right, cells)?;

    let truth = if lv.is_text() || rv.is_text() {
        let l = lv.text_or_empty();
        let r = rv.text_or_empty();
        match op {
            Op::Lt => l < r,
            Op::Gt => l > r,
            Op::Eq => l == r,
            Op::LtEq => l <= r,
            Op::GtEq => l >= r,
            Op::NotEq => l != r,
            _ => unreachable!(),
        }
    } else {
        let l = lv.as_number()?;
        let r = rv.as_number()?;
        match op {
            Op::Lt => l < r,
            Op::Gt => l > r,
            Op::Eq => (l - r).abs() < EQ_TOLERANCE,
            Op::LtEq => l <= r,
            Op::GtEq => l >= r,
            Op::NotEq => (l - r).abs() >= EQ_TOLERANCE,
            _ => unreachable!(),
        }
    };

    Ok(Value::Number(if truth { 1.0 } else { 0.0 }))
}

/// A comparison side keeps its stored type only when it is a direct
/// reference or a literal; compound expressions evaluate numerically.
fn comparison_operand<L: CellReader>(expr: &Expr, cells: &L) -> Result<Value, FormulaError> {
    match expr {
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::CellRef { row, col } => cells.read(*row, *col),
        other => evaluate(other, cells),
    }
}

fn call_function<L: CellReader>(
    name: &str,
    args: &[Expr],
    cells: &L,
) -> Result<Value, FormulaError> {
    match name {
        "SUM" => {
            let values = aggregate_arg(args, cells)?;
            Ok(Value::Number(values.iter().sum()))
        }
        "AVG" => {
            let values = aggregate_arg(args, cells)?;
            if values.is_empty() {
                Ok(Value::Number(0.0))
            } else {
                Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
            }
        }
        "MAX" => {
            let values = aggregate_arg(args, cells)?;
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Ok(Value::Number(if values.is_empty() { 0.0 } else { max }))
        }
        "MIN" => {
            let values = aggregate_arg(args, cells)?;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            Ok(Value::Number(if values.is_empty() { 0.0 } else { min }))
        }
        "MEDIAN" => {
            let mut values = aggregate_arg(args, cells)?;
            if values.is_empty() {
                return Ok(Value::Number(0.0));
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = values.len() / 2;
            let median = if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            };
            Ok(Value::Number(median))
        }
        "MODE" => {
            let values = aggregate_arg(args, cells)?;
            Ok(Value::Number(mode(&values)))
        }
        "POWER" => {
            if args.len() != 2 {
                return Err(FormulaError::Parse);
            }
            let base = evaluate(&args[0], cells)?.as_number()?;
            let exponent = evaluate(&args[1], cells)?.as_number()?;
            Ok(Value::Number(base.powf(exponent)))
        }
        "IF" => {
            if args.len() != 3 {
                return Err(FormulaError::Parse);
            }
            let cond = evaluate(&args[0], cells)?.as_number()?;
            let branch = if cond != 0.0 { &args[1] } else { &args[2] };
            // A string-literal branch makes the whole formula a string result.
            evaluate(branch, cells)
        }
        "VLOOKUP" => vlookup(args, cells),
        _ => Err(FormulaError::Parse),
    }
}

/// First value (in input order) whose frequency is maximal; equality is
/// tolerance-based. All-distinct input returns the first element.
fn mode(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut best = values[0];
    let mut best_count = 0;
    for (i, &v) in values.iter().enumerate() {
        let count = values[i..]
            .iter()
            .filter(|&&w| (v - w).abs() < EQ_TOLERANCE)
            .count();
        if count > best_count {
            best_count = count;
            best = v;
        }
    }
    best
}

/// Aggregates take one argument: a range, a single reference, or a scalar.
fn aggregate_arg<L: CellReader>(args: &[Expr], cells: &L) -> Result<Vec<f64>, FormulaError> {
    if args.len() != 1 {
        return Err(FormulaError::Parse);
    }
    match &args[0] {
        Expr::Range(range) => collect_range(*range, cells),
        Expr::CellRef { row, col } => {
            if *row >= cells.grid_rows() || *col >= cells.grid_cols() {
                return Ok(vec![0.0]);
            }
            match cells.read(*row, *col) {
                Ok(Value::Number(n)) => Ok(vec![n]),
                Ok(Value::Empty) => Ok(vec![0.0]),
                Ok(Value::Text(_)) => Err(FormulaError::Value),
                // Errored formulas contribute nothing.
                Err(_) => Ok(Vec::new()),
            }
        }
        other => {
            let n = evaluate(other, cells)?.as_number()?;
            Ok(vec![n])
        }
    }
}

/// Collect a range's numeric contents: numbers and cached formula numbers
/// contribute, empty slots contribute 0, text and errored formulas are
/// skipped. Overlap beyond the grid contributes 0.
fn collect_range<L: CellReader>(range: Range, cells: &L) -> Result<Vec<f64>, FormulaError> {
    let mut values = Vec::with_capacity(range.cell_count());
    for (row, col) in range.cells() {
        if row >= cells.grid_rows() || col >= cells.grid_cols() {
            values.push(0.0);
            continue;
        }
        match cells.read(row, col) {
            Ok(Value::Number(n)) => values.push(n),
            Ok(Value::Empty) => values.push(0.0),
            Ok(Value::Text(_)) => {}
            Err(_) => {}
        }
    }
    Ok(values)
}

enum LookupKey<'a> {
    Text(&'a str),
    Number(f64),
}

/// VLOOKUP(key, table, col_index, [exact]). Searches the table's first
/// column; returns the scalar from the matched row at `col_index` (one-based
/// within the table).
fn vlookup<L: CellReader>(args: &[Expr], cells: &L) -> Result<Value, FormulaError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(FormulaError::Parse);
    }

    let Expr::Range(table) = &args[1] else {
        return Err(FormulaError::Ref);
    };
    if table.end_row >= cells.grid_rows() || table.end_col >= cells.grid_cols() {
        return Err(FormulaError::Ref);
    }

    let col_index = evaluate(&args[2], cells)?.as_number()?;
    if col_index < 1.0 || (col_index as usize) > table.cols() {
        return Err(FormulaError::Ref);
    }
    let result_col = table.start_col + col_index as usize - 1;

    let exact = if args.len() == 4 {
        evaluate(&args[3], cells)?.as_number()? != 0.0
    } else {
        false
    };

    let key = match &args[0] {
        Expr::Text(s) => LookupKey::Text(s),
        other => LookupKey::Number(evaluate(other, cells)?.as_number()?),
    };

    let mut matched_row: Option<usize> = None;
    let mut best: Option<(usize, f64)> = None;

    for row in table.start_row..=table.end_row {
        let cell = cells.read(row, table.start_col).unwrap_or(Value::Empty);
        match (&key, cell) {
            // String keys match text cells and string-result formulas only.
            (LookupKey::Text(k), Value::Text(t)) => {
                if t == *k {
                    matched_row = Some(row);
                    break;
                }
            }
            (LookupKey::Number(k), Value::Number(n)) => {
                if exact {
                    if (n - k).abs() < EQ_TOLERANCE {
                        matched_row = Some(row);
                        break;
                    }
                } else if n <= *k && best.map_or(true, |(_, b)| n > b) {
                    best = Some((row, n));
                }
            }
            _ => {}
        }
    }

    if matched_row.is_none() {
        if let (LookupKey::Number(_), false) = (&key, exact) {
            matched_row = best.map(|(row, _)| row);
        }
    }

    let row = matched_row.ok_or(FormulaError::Na)?;
    match cells.read(row, result_col)? {
        Value::Empty => Ok(Value::Number(0.0)),
        v => Ok(v),
    }
}
