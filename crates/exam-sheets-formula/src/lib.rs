//! # exam-sheets-formula
//!
//! Formula parser and evaluator for exam-sheets.
//!
//! Exported workbooks normally carry the last computed value of every formula
//! cell. When that cached value is missing, this crate recomputes it against
//! the same [`TabularSource`](exam_sheets_core::TabularSource):
//! - Formula parsing (text → AST)
//! - Formula evaluation (AST → value), following references into other cells
//! - A small set of built-in functions (`SUM`, `IF`, `CONCATENATE`, `TRIM`,
//!   `UPPER`, `LOWER`, `DATE`, `TIME`)
//!
//! ## Example
//!
//! ```rust
//! use exam_sheets_core::Worksheet;
//! use exam_sheets_formula::{evaluate_formula, FormulaValue};
//!
//! let mut sheet = Worksheet::new("Sheet1");
//! sheet.set_cell_value("A1", "ITF").unwrap();
//! sheet.set_cell_value("B1", 10214.0).unwrap();
//!
//! let value = evaluate_formula("=A1&B1", &sheet).unwrap();
//! assert_eq!(value, FormulaValue::String("ITF10214".into()));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOp, FormulaExpr, UnaryOp};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_formula, EvaluationContext, FormulaValue};
pub use parser::parse_formula;
