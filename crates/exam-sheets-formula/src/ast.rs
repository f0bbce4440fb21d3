//! Parsed formula tree

use std::fmt;

use exam_sheets_core::{CellAddress, CellError, CellRange};

/// A parsed formula. References always point into the sheet the formula
/// lives on.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    Reference(CellAddress),
    /// Only meaningful as a function argument; elsewhere a one-cell range
    /// reads like a reference
    Range(CellRange),
    Unary {
        op: UnaryOp,
        operand: Box<FormulaExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Function name as written, matched case-insensitively when called
    Call {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

const BINARY_SYMBOLS: [(BinaryOp, &str); 12] = [
    (BinaryOp::Add, "+"),
    (BinaryOp::Sub, "-"),
    (BinaryOp::Mul, "*"),
    (BinaryOp::Div, "/"),
    (BinaryOp::Pow, "^"),
    (BinaryOp::Concat, "&"),
    (BinaryOp::Eq, "="),
    (BinaryOp::Ne, "<>"),
    (BinaryOp::Lt, "<"),
    (BinaryOp::Le, "<="),
    (BinaryOp::Gt, ">"),
    (BinaryOp::Ge, ">="),
];

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        BINARY_SYMBOLS
            .iter()
            .find(|(_, s)| *s == symbol)
            .map(|(op, _)| *op)
    }

    pub fn symbol(self) -> &'static str {
        BINARY_SYMBOLS
            .iter()
            .find(|(op, _)| *op == self)
            .map_or("?", |(_, s)| *s)
    }

    /// Comparisons yield booleans; everything else yields a number or text
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix `-` and `+`, postfix `%`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Percent,
}
