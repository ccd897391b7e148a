// Formula parser - converts formula source into an AST.
// Supports: numbers, cell refs (A1), ranges (A1:A5), functions (SUM),
// arithmetic (+, -, *, /), comparisons (<, >, =, <=, >=, <>), string literals.

use super::eval::FormulaError;
use crate::reference::Range;

/// Expression AST. Function arguments reuse `Expr`, so string literals and
/// ranges flow into calls without a separate argument type.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    CellRef { row: usize, col: usize },
    Range(Range),
    Function { name: String, args: Vec<Expr> },
    BinaryOp { op: Op, left: Box<Expr>, right: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
}

impl Op {
    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Lt | Op::Gt | Op::Eq | Op::LtEq | Op::GtEq | Op::NotEq)
    }
}

/// Parse a formula string into an AST. The leading '=' is required.
pub fn parse(formula: &str) -> Result<Expr, FormulaError> {
    let formula = formula.trim();
    let Some(body) = formula.strip_prefix('=') else {
        return Err(FormulaError::Parse);
    };

    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(FormulaError::Parse);
    }
    let (expr, pos) = parse_comparison(&tokens, 0)?;
    if pos != tokens.len() {
        return Err(FormulaError::Parse);
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    StringLit(String),
    CellRef { row: usize, col: usize },
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Colon,
    Comma,
    Lt,
    Gt,
    Eq,
    LtEq,
    GtEq,
    NotEq,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ':' => {
                tokens.push(Token::Colon);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        tokens.push(Token::LtEq);
                        chars.next();
                    }
                    Some('>') => {
                        tokens.push(Token::NotEq);
                        chars.next();
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    tokens.push(Token::GtEq);
                    chars.next();
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '=' => {
                tokens.push(Token::Eq);
                chars.next();
            }
            '"' => {
                // Closing quote required; no escape sequences inside.
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => s.push(ch),
                        None => return Err(FormulaError::Parse),
                    }
                }
                tokens.push(Token::StringLit(s));
            }
            'A'..='Z' | 'a'..='z' => {
                // Maximal alphanumeric run: all letters -> identifier,
                // letters-then-digits -> cell reference, anything else is
                // malformed. A reference's digits must follow the letters
                // with no intervening whitespace.
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(classify_word(&word)?);
            }
            '0'..='9' | '.' => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Exponent suffix, strtod-style: 1e3, 2.5E-2
                if let Some(&e) = chars.peek() {
                    if e == 'e' || e == 'E' {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        let mut exp = String::new();
                        if let Some(&sign) = lookahead.peek() {
                            if sign == '+' || sign == '-' {
                                exp.push(sign);
                                lookahead.next();
                            }
                        }
                        while let Some(&d) = lookahead.peek() {
                            if d.is_ascii_digit() {
                                exp.push(d);
                                lookahead.next();
                            } else {
                                break;
                            }
                        }
                        if exp.chars().any(|ch| ch.is_ascii_digit()) {
                            num.push(e);
                            num.push_str(&exp);
                            chars = lookahead;
                        }
                    }
                }
                let value: f64 = num.parse().map_err(|_| FormulaError::Parse)?;
                tokens.push(Token::Number(value));
            }
            _ => return Err(FormulaError::Parse),
        }
    }

    Ok(tokens)
}

fn classify_word(word: &str) -> Result<Token, FormulaError> {
    if word.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(Token::Ident(word.to_ascii_uppercase()));
    }
    try_cell_ref(word).ok_or(FormulaError::Parse)
}

fn try_cell_ref(word: &str) -> Option<Token> {
    let letters: String = word.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let rest = &word[letters.len()..];
    if letters.is_empty() || rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
        - 1;
    let row: usize = rest.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some(Token::CellRef { row: row - 1, col })
}

// Lowest precedence: a single optional comparison over arithmetic sides.
fn parse_comparison(tokens: &[Token], pos: usize) -> Result<(Expr, usize), FormulaError> {
    let (left, pos) = parse_add_sub(tokens, pos)?;

    let op = match tokens.get(pos) {
        Some(Token::Lt) => Op::Lt,
        Some(Token::Gt) => Op::Gt,
        Some(Token::Eq) => Op::Eq,
        Some(Token::LtEq) => Op::LtEq,
        Some(Token::GtEq) => Op::GtEq,
        Some(Token::NotEq) => Op::NotEq,
        _ => return Ok((left, pos)),
    };
    let (right, pos) = parse_add_sub(tokens, pos + 1)?;
    Ok((
        Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) },
        pos,
    ))
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), FormulaError> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), FormulaError> {
    let (mut left, mut pos) = parse_factor(tokens, pos)?;

    while pos < tokens.len() {
        let op = match tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_factor(tokens, pos + 1)?;
        left = Expr::BinaryOp { op, left: Box::new(left), right: Box::new(right) };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_factor(tokens: &[Token], pos: usize) -> Result<(Expr, usize), FormulaError> {
    match tokens.get(pos) {
        None => Err(FormulaError::Parse),
        Some(Token::Number(n)) => Ok((Expr::Number(*n), pos + 1)),
        Some(Token::StringLit(s)) => Ok((Expr::Text(s.clone()), pos + 1)),
        Some(Token::CellRef { row, col }) => {
            // A1:B5 -> range; bare A1 -> single reference.
            if let (Some(Token::Colon), Some(Token::CellRef { row: r2, col: c2 })) =
                (tokens.get(pos + 1), tokens.get(pos + 2))
            {
                return Ok((Expr::Range(Range::new(*row, *col, *r2, *c2)), pos + 3));
            }
            Ok((Expr::CellRef { row: *row, col: *col }, pos + 1))
        }
        Some(Token::Ident(name)) => {
            if tokens.get(pos + 1) == Some(&Token::LParen) {
                let (args, new_pos) = parse_args(tokens, pos + 2)?;
                return Ok((Expr::Function { name: name.clone(), args }, new_pos));
            }
            Err(FormulaError::Parse)
        }
        Some(Token::LParen) => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1)?;
            match tokens.get(pos) {
                Some(Token::RParen) => Ok((expr, pos + 1)),
                _ => Err(FormulaError::Parse),
            }
        }
        // Signed factors: strtod in the source language absorbed the sign
        // into the literal; fold to 0 - x (and unary + to a no-op).
        Some(Token::Minus) => {
            let (expr, pos) = parse_factor(tokens, pos + 1)?;
            Ok((
                Expr::BinaryOp {
                    op: Op::Sub,
                    left: Box::new(Expr::Number(0.0)),
                    right: Box::new(expr),
                },
                pos,
            ))
        }
        Some(Token::Plus) => parse_factor(tokens, pos + 1),
        Some(_) => Err(FormulaError::Parse),
    }
}

fn parse_args(tokens: &[Token], pos: usize) -> Result<(Vec<Expr>, usize), FormulaError> {
    let mut args = Vec::new();
    let mut pos = pos;

    if tokens.get(pos) == Some(&Token::RParen) {
        return Ok((args, pos + 1));
    }

    loop {
        let (arg, new_pos) = parse_comparison(tokens, pos)?;
        args.push(arg);
        pos = new_pos;

        match tokens.get(pos) {
            Some(Token::RParen) => return Ok((args, pos + 1)),
            Some(Token::Comma) => pos += 1,
            _ => return Err(FormulaError::Parse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Expr {
        Expr::Number(n)
    }

    #[test]
    fn parse_requires_equals() {
        assert_eq!(parse("1+2"), Err(FormulaError::Parse));
        assert_eq!(parse("="), Err(FormulaError::Parse));
    }

    #[test]
    fn parse_precedence() {
        // =1+2*3 groups the product first
        let expr = parse("=1+2*3").unwrap();
        match expr {
            Expr::BinaryOp { op: Op::Add, left, right } => {
                assert_eq!(*left, num(1.0));
                assert!(matches!(*right, Expr::BinaryOp { op: Op::Mul, .. }));
            }
            other => panic!("expected Add, got {:?}", other),
        }
    }

    #[test]
    fn parse_parenthesized() {
        let expr = parse("=(1+2)*3").unwrap();
        assert!(matches!(expr, Expr::BinaryOp { op: Op::Mul, .. }));
    }

    #[test]
    fn parse_cell_ref_and_range() {
        assert_eq!(parse("=B27").unwrap(), Expr::CellRef { row: 26, col: 1 });
        assert_eq!(
            parse("=B2:A1").unwrap(),
            Expr::Range(Range::new(0, 0, 1, 1))
        );
    }

    #[test]
    fn parse_function_with_range_arg() {
        let expr = parse("=sum(A1:A6)").unwrap();
        match expr {
            Expr::Function { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args, vec![Expr::Range(Range::new(0, 0, 5, 0))]);
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn parse_if_with_string_branches() {
        let expr = parse("=IF(A1>5,\"High\",\"Low\")").unwrap();
        match expr {
            Expr::Function { name, args } => {
                assert_eq!(name, "IF");
                assert_eq!(args.len(), 3);
                assert!(matches!(&args[0], Expr::BinaryOp { op: Op::Gt, .. }));
                assert_eq!(args[1], Expr::Text("High".into()));
                assert_eq!(args[2], Expr::Text("Low".into()));
            }
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn parse_comparison_single() {
        let expr = parse("=A1<=10").unwrap();
        assert!(matches!(expr, Expr::BinaryOp { op: Op::LtEq, .. }));
    }

    #[test]
    fn parse_unary_minus_folds_to_sub() {
        let expr = parse("=2*-3").unwrap();
        match expr {
            Expr::BinaryOp { op: Op::Mul, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: Op::Sub, .. }));
            }
            other => panic!("expected Mul, got {:?}", other),
        }
        assert_eq!(parse("=+5").unwrap(), num(5.0));
    }

    #[test]
    fn parse_scientific_notation() {
        assert_eq!(parse("=1.5e3").unwrap(), num(1500.0));
        assert_eq!(parse("=2E-2").unwrap(), num(0.02));
    }

    #[test]
    fn parse_errors() {
        // missing )
        assert_eq!(parse("=(1+2"), Err(FormulaError::Parse));
        // missing , or ) in call
        assert_eq!(parse("=POWER(2 3)"), Err(FormulaError::Parse));
        // unterminated string literal
        assert_eq!(parse("=IF(A1>0,\"yes,\"no\""), Err(FormulaError::Parse));
        // empty factor
        assert_eq!(parse("=1+"), Err(FormulaError::Parse));
        // letters-digits-letters is neither ident nor reference
        assert_eq!(parse("=A1B"), Err(FormulaError::Parse));
        // trailing garbage
        assert_eq!(parse("=1 2"), Err(FormulaError::Parse));
    }

    #[test]
    fn parse_case_insensitive_function_names() {
        let expr = parse("=vLoOkUp(\"k\",A1:B3,2)").unwrap();
        match expr {
            Expr::Function { name, .. } => assert_eq!(name, "VLOOKUP"),
            other => panic!("expected Function, got {:?}", other),
        }
    }

    #[test]
    fn parenthesized_subexpression_is_arithmetic_only() {
        // Comparisons are not grammar inside parentheses.
        assert_eq!(parse("=(A1>5)"), Err(FormulaError::Parse));
    }
}
