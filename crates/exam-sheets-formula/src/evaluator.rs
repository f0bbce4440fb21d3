//! Formula evaluator
//!
//! Evaluates a parsed [`FormulaExpr`] against a [`TabularSource`]. Referenced
//! formula cells contribute their cached value when they have one and are
//! evaluated recursively otherwise.

use std::fmt;

use exam_sheets_core::{CellAddress, CellError, CellRange, CellValue, TabularSource};

use crate::ast::{BinaryOp, FormulaExpr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::functions;
use crate::parser::parse_formula;

/// How many formula cells deep a reference chain may go before it is
/// treated as circular
const MAX_DEPTH: usize = 64;

/// Largest range a single reference may expand to
const MAX_RANGE_CELLS: u64 = 1_000_000;

/// Result of evaluating a formula or sub-expression
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Empty,
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
}

impl FormulaValue {
    /// Numeric view of the value; errors propagate as `Err`
    pub fn to_number(&self) -> Result<f64, CellError> {
        match self {
            FormulaValue::Empty => Ok(0.0),
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaValue::String(s) => s.trim().parse::<f64>().map_err(|_| CellError::Value),
            FormulaValue::Error(e) => Err(*e),
        }
    }

    /// Text view of the value; errors propagate as `Err`
    pub fn to_text(&self) -> Result<String, CellError> {
        match self {
            FormulaValue::Error(e) => Err(*e),
            other => Ok(other.to_string()),
        }
    }

    /// Truth view of the value; errors propagate as `Err`
    pub fn to_bool(&self) -> Result<bool, CellError> {
        match self {
            FormulaValue::Empty => Ok(false),
            FormulaValue::Boolean(b) => Ok(*b),
            FormulaValue::Number(n) => Ok(*n != 0.0),
            FormulaValue::String(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
            FormulaValue::String(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
            FormulaValue::String(_) => Err(CellError::Value),
            FormulaValue::Error(e) => Err(*e),
        }
    }

    /// Convert into a cell value
    pub fn into_cell_value(self) -> CellValue {
        match self {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::String(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
        }
    }

    fn from_cell_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Empty => Some(FormulaValue::Empty),
            CellValue::Number(n) => Some(FormulaValue::Number(*n)),
            CellValue::String(s) => Some(FormulaValue::String(s.clone())),
            CellValue::Boolean(b) => Some(FormulaValue::Boolean(*b)),
            CellValue::Error(e) => Some(FormulaValue::Error(*e)),
            CellValue::Formula { .. } => None,
        }
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Empty => Ok(()),
            FormulaValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FormulaValue::Number(n) => write!(f, "{}", n),
            FormulaValue::String(s) => f.write_str(s),
            FormulaValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            FormulaValue::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Source that cell references resolve against
    pub source: &'a dyn TabularSource,
    depth: usize,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context resolving references against `source`
    pub fn new(source: &'a dyn TabularSource) -> Self {
        Self { source, depth: 0 }
    }

    /// Whether serial dates in the source count from 1904
    pub fn date_1904(&self) -> bool {
        self.source.date_1904()
    }

    fn nested(&self) -> Self {
        Self {
            source: self.source,
            depth: self.depth + 1,
        }
    }

    /// Value of the cell at `addr`, evaluating it if it is an uncached formula
    pub fn cell_value(&self, addr: CellAddress) -> FormulaResult<FormulaValue> {
        let Some(cell) = self.source.cell_at(addr.row, addr.col) else {
            return Ok(FormulaValue::Empty);
        };

        match &cell.value {
            CellValue::Formula {
                cached: Some(cached),
                ..
            } if !cached.is_empty() => {
                Ok(FormulaValue::from_cell_value(cached).unwrap_or(FormulaValue::Empty))
            }
            CellValue::Formula { text, .. } => {
                if self.depth >= MAX_DEPTH {
                    return Err(FormulaError::CircularReference(addr.to_string()));
                }
                log::trace!("evaluating uncached formula at {}", addr);
                let expr = parse_formula(text)?;
                evaluate(&expr, &self.nested())
            }
            other => Ok(FormulaValue::from_cell_value(other).unwrap_or(FormulaValue::Empty)),
        }
    }

    /// Values of every cell in `range`, row by row
    pub fn range_values(&self, range: &CellRange) -> FormulaResult<Vec<FormulaValue>> {
        if range.cell_count() > MAX_RANGE_CELLS {
            return Err(FormulaError::InvalidReference(format!(
                "range {} is too large",
                range
            )));
        }
        range.cells().map(|addr| self.cell_value(addr)).collect()
    }
}

/// Parse and evaluate formula text against a source
pub fn evaluate_formula(text: &str, source: &dyn TabularSource) -> FormulaResult<FormulaValue> {
    let expr = parse_formula(text)?;
    evaluate(&expr, &EvaluationContext::new(source))
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    match expr {
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),
        FormulaExpr::Reference(addr) => ctx.cell_value(*addr),
        FormulaExpr::Range(range) => {
            // Outside of a function argument only a single-cell range is a value
            if range.cell_count() == 1 {
                ctx.cell_value(range.start)
            } else {
                Ok(FormulaValue::Error(CellError::Value))
            }
        }
        FormulaExpr::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            Ok(match value.to_number() {
                Ok(n) => FormulaValue::Number(match op {
                    UnaryOp::Neg => -n,
                    UnaryOp::Plus => n,
                    UnaryOp::Percent => n / 100.0,
                }),
                Err(e) => FormulaValue::Error(e),
            })
        }
        FormulaExpr::Binary { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(binary_op(*op, &left, &right))
        }
        FormulaExpr::Call { name, args } => functions::call(name, args, ctx),
    }
}

fn binary_op(op: BinaryOp, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    if op.is_comparison() {
        return compare(op, left, right);
    }
    if op == BinaryOp::Concat {
        return match (left.to_text(), right.to_text()) {
            (Ok(a), Ok(b)) => FormulaValue::String(a + &b),
            (Err(e), _) | (_, Err(e)) => FormulaValue::Error(e),
        };
    }

    let (a, b) = match (left.to_number(), right.to_number()) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return FormulaValue::Error(e),
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return FormulaValue::Error(CellError::DivZero),
        BinaryOp::Div => a / b,
        _ => a.powf(b),
    };
    if result.is_finite() {
        FormulaValue::Number(result)
    } else {
        log::trace!("{} {} {} is not finite", a, op, b);
        FormulaValue::Error(CellError::Num)
    }
}

/// Excel ordering across types: numbers < text < booleans; text compares
/// case-insensitively and empty behaves like the other side's zero value.
fn compare(op: BinaryOp, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    use std::cmp::Ordering;

    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Error(_) => 3,
        }
    }

    if let FormulaValue::Error(e) = left {
        return FormulaValue::Error(*e);
    }
    if let FormulaValue::Error(e) = right {
        return FormulaValue::Error(*e);
    }

    let widen = |v: &FormulaValue, other: &FormulaValue| match (v, other) {
        (FormulaValue::Empty, FormulaValue::String(_)) => FormulaValue::String(String::new()),
        (FormulaValue::Empty, FormulaValue::Boolean(_)) => FormulaValue::Boolean(false),
        _ => v.clone(),
    };
    let (left, right) = (widen(left, right), widen(right, left));

    let ordering = match (&left, &right) {
        (FormulaValue::String(a), FormulaValue::String(b)) => {
            a.to_lowercase().cmp(&b.to_lowercase())
        }
        (FormulaValue::Boolean(a), FormulaValue::Boolean(b)) => a.cmp(b),
        (a, b) if rank(a) == 0 && rank(b) == 0 => {
            let a = a.to_number().unwrap_or(0.0);
            let b = b.to_number().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (a, b) => rank(a).cmp(&rank(b)),
    };

    FormulaValue::Boolean(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_sheets_core::Worksheet;
    use pretty_assertions::assert_eq;

    fn eval(text: &str, sheet: &Worksheet) -> FormulaValue {
        evaluate_formula(text, sheet).unwrap()
    }

    #[test]
    fn test_arithmetic_and_concat() {
        let sheet = Worksheet::new("Sheet1");
        assert_eq!(eval("=1+2*3", &sheet), FormulaValue::Number(7.0));
        assert_eq!(eval("=-2^2", &sheet), FormulaValue::Number(4.0));
        assert_eq!(eval("=50%", &sheet), FormulaValue::Number(0.5));
        assert_eq!(eval("=1/0", &sheet), FormulaValue::Error(CellError::DivZero));
        assert_eq!(
            eval("=\"ITF\"&10214", &sheet),
            FormulaValue::String("ITF10214".into())
        );
        assert_eq!(eval("=\"a\"+1", &sheet), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_comparisons() {
        let sheet = Worksheet::new("Sheet1");
        assert_eq!(eval("=5>3", &sheet), FormulaValue::Boolean(true));
        assert_eq!(eval("=\"abc\"=\"ABC\"", &sheet), FormulaValue::Boolean(true));
        assert_eq!(eval("=1<\"a\"", &sheet), FormulaValue::Boolean(true));
        assert_eq!(eval("=A1=0", &sheet), FormulaValue::Boolean(true));
        assert_eq!(eval("=A1=\"\"", &sheet), FormulaValue::Boolean(true));
    }

    #[test]
    fn test_references_use_cached_values() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value("A1", 10.0).unwrap();
        sheet
            .set_cell_value(
                "A2",
                CellValue::formula_with_cached("=A1*100", CellValue::Number(999.0)),
            )
            .unwrap();

        assert_eq!(eval("=A2+1", &sheet), FormulaValue::Number(1000.0));
    }

    #[test]
    fn test_references_evaluate_uncached_formulas() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value("A1", 10.0).unwrap();
        sheet.set_cell_value("A2", CellValue::formula("=A1*2")).unwrap();
        sheet.set_cell_value("A3", CellValue::formula("A2+1")).unwrap();

        assert_eq!(eval("=A3", &sheet), FormulaValue::Number(21.0));
        assert_eq!(eval("=B7", &sheet), FormulaValue::Empty);
    }

    #[test]
    fn test_circular_reference_is_an_error() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value("A1", CellValue::formula("=B1")).unwrap();
        sheet.set_cell_value("B1", CellValue::formula("=A1")).unwrap();

        assert!(matches!(
            evaluate_formula("=A1", &sheet),
            Err(FormulaError::CircularReference(_))
        ));
    }

    #[test]
    fn test_multi_cell_range_outside_function() {
        let sheet = Worksheet::new("Sheet1");
        assert_eq!(eval("=A1:B2", &sheet), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_display_matches_general_format() {
        assert_eq!(FormulaValue::Number(42.0).to_string(), "42");
        assert_eq!(FormulaValue::Number(2.5).to_string(), "2.5");
        assert_eq!(FormulaValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(FormulaValue::Empty.to_string(), "");
    }
}
