//! Built-in functions
//!
//! Functions receive their arguments unevaluated so that `IF` only evaluates
//! the branch it takes and `SUM` can expand ranges.

use chrono::{Duration, NaiveDate, NaiveTime};
use exam_sheets_core::{datetime_to_serial, CellError};

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};

/// Function implementation signature
type FunctionImpl = fn(&[FormulaExpr], &EvaluationContext<'_>) -> FormulaResult<FormulaValue>;

/// Function definition
struct FunctionDef {
    name: &'static str,
    min_args: usize,
    /// `None` means unlimited
    max_args: Option<usize>,
    implementation: FunctionImpl,
}

const FUNCTIONS: &[FunctionDef] = &[
    FunctionDef { name: "SUM", min_args: 1, max_args: None, implementation: fn_sum },
    FunctionDef { name: "IF", min_args: 2, max_args: Some(3), implementation: fn_if },
    FunctionDef { name: "CONCATENATE", min_args: 1, max_args: None, implementation: fn_concat },
    FunctionDef { name: "CONCAT", min_args: 1, max_args: None, implementation: fn_concat },
    FunctionDef { name: "TRIM", min_args: 1, max_args: Some(1), implementation: fn_trim },
    FunctionDef { name: "UPPER", min_args: 1, max_args: Some(1), implementation: fn_upper },
    FunctionDef { name: "LOWER", min_args: 1, max_args: Some(1), implementation: fn_lower },
    FunctionDef { name: "DATE", min_args: 3, max_args: Some(3), implementation: fn_date },
    FunctionDef { name: "TIME", min_args: 3, max_args: Some(3), implementation: fn_time },
];

/// Call a built-in function by (uppercase) name
pub fn call(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext<'_>,
) -> FormulaResult<FormulaValue> {
    let def = FUNCTIONS
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    let too_few = args.len() < def.min_args;
    let too_many = def.max_args.is_some_and(|max| args.len() > max);
    if too_few || too_many {
        let expected = match def.max_args {
            Some(max) if max == def.min_args => max.to_string(),
            Some(max) => format!("{}..{}", def.min_args, max),
            None => format!("at least {}", def.min_args),
        };
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected,
            actual: args.len(),
        });
    }

    (def.implementation)(args, ctx)
}

fn eval_all(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<Vec<FormulaValue>> {
    args.iter().map(|a| evaluate(a, ctx)).collect()
}

/// Evaluate a single-valued argument as text
fn text_arg(arg: &FormulaExpr, ctx: &EvaluationContext<'_>) -> FormulaResult<Result<String, CellError>> {
    Ok(evaluate(arg, ctx)?.to_text())
}

fn int_arg(arg: &FormulaExpr, ctx: &EvaluationContext<'_>) -> FormulaResult<Result<i64, CellError>> {
    Ok(evaluate(arg, ctx)?.to_number().map(|n| n.trunc() as i64))
}

/// SUM(value1, ...)
///
/// Ranges contribute their numbers only; text and blanks inside a range are
/// skipped. Direct arguments are coerced.
fn fn_sum(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let mut sum = 0.0;

    for arg in args {
        match arg {
            FormulaExpr::Range(range) => {
                for value in ctx.range_values(range)? {
                    match value {
                        FormulaValue::Number(n) => sum += n,
                        FormulaValue::Error(e) => return Ok(FormulaValue::Error(e)),
                        _ => {}
                    }
                }
            }
            other => match evaluate(other, ctx)?.to_number() {
                Ok(n) => sum += n,
                Err(e) => return Ok(FormulaValue::Error(e)),
            },
        }
    }

    Ok(FormulaValue::Number(sum))
}

/// IF(condition, value_if_true, [value_if_false])
fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let condition = match evaluate(&args[0], ctx)?.to_bool() {
        Ok(b) => b,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    if condition {
        evaluate(&args[1], ctx)
    } else {
        match args.get(2) {
            Some(expr) => evaluate(expr, ctx),
            None => Ok(FormulaValue::Boolean(false)),
        }
    }
}

/// CONCATENATE(text1, ...) and CONCAT(text1, ...)
fn fn_concat(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let mut out = String::new();
    for value in eval_all(args, ctx)? {
        match value.to_text() {
            Ok(s) => out.push_str(&s),
            Err(e) => return Ok(FormulaValue::Error(e)),
        }
    }
    Ok(FormulaValue::String(out))
}

/// TRIM(text): strips the ends and collapses inner runs of spaces
fn fn_trim(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0], ctx)? {
        Ok(s) => {
            let words: Vec<&str> = s.split(' ').filter(|w| !w.is_empty()).collect();
            FormulaValue::String(words.join(" "))
        }
        Err(e) => FormulaValue::Error(e),
    })
}

fn fn_upper(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0], ctx)? {
        Ok(s) => FormulaValue::String(s.to_uppercase()),
        Err(e) => FormulaValue::Error(e),
    })
}

fn fn_lower(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    Ok(match text_arg(&args[0], ctx)? {
        Ok(s) => FormulaValue::String(s.to_lowercase()),
        Err(e) => FormulaValue::Error(e),
    })
}

/// DATE(year, month, day)
///
/// Years below 1900 are offset by 1900. Month and day overflow roll into the
/// following month or year.
fn fn_date(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let mut parts = [0i64; 3];
    for (slot, arg) in parts.iter_mut().zip(args) {
        match int_arg(arg, ctx)? {
            Ok(n) => *slot = n,
            Err(e) => return Ok(FormulaValue::Error(e)),
        }
    }
    let [mut year, month, day] = parts;

    if (0..1900).contains(&year) {
        year += 1900;
    }
    if !(0..=9999).contains(&year) || month.abs() > 120_000 || day.abs() > 4_000_000 {
        return Ok(FormulaValue::Error(CellError::Num));
    }

    let total_months = year * 12 + (month - 1);
    let norm_year = total_months.div_euclid(12) as i32;
    let norm_month = total_months.rem_euclid(12) as u32 + 1;

    let date = NaiveDate::from_ymd_opt(norm_year, norm_month, 1)
        .and_then(|first| first.checked_add_signed(Duration::days(day - 1)));
    let Some(date) = date else {
        return Ok(FormulaValue::Error(CellError::Num));
    };

    let serial = datetime_to_serial(date.and_time(NaiveTime::MIN), ctx.date_1904());
    if serial < 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    Ok(FormulaValue::Number(serial))
}

/// TIME(hour, minute, second) as a fraction of a day
fn fn_time(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> FormulaResult<FormulaValue> {
    let mut parts = [0i64; 3];
    for (slot, arg) in parts.iter_mut().zip(args) {
        match int_arg(arg, ctx)? {
            Ok(n) => *slot = n,
            Err(e) => return Ok(FormulaValue::Error(e)),
        }
    }
    let [hour, minute, second] = parts;

    let total = hour
        .checked_mul(3600)
        .and_then(|h| minute.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(second));
    match total {
        Some(total) if total >= 0 => Ok(FormulaValue::Number(
            total.rem_euclid(86_400) as f64 / 86_400.0,
        )),
        _ => Ok(FormulaValue::Error(CellError::Num)),
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate_formula;
    use crate::{FormulaError, FormulaValue};
    use exam_sheets_core::{CellError, Worksheet};
    use pretty_assertions::assert_eq;

    fn eval(text: &str, sheet: &Worksheet) -> FormulaValue {
        evaluate_formula(text, sheet).unwrap()
    }

    #[test]
    fn test_sum_ranges_and_scalars() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value("A1", 1000.0).unwrap();
        sheet.set_cell_value("A2", 500.0).unwrap();
        sheet.set_cell_value("A3", "n/a").unwrap();

        assert_eq!(eval("=SUM(A1:A4)", &sheet), FormulaValue::Number(1500.0));
        assert_eq!(eval("=SUM(A1, 2, TRUE)", &sheet), FormulaValue::Number(1003.0));
        assert_eq!(eval("=SUM(A3)", &sheet), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_if_only_evaluates_taken_branch() {
        let sheet = Worksheet::new("Sheet1");
        assert_eq!(eval("=IF(1>0, \"yes\", NOSUCH())", &sheet), FormulaValue::String("yes".into()));
        assert_eq!(eval("=IF(FALSE, 1)", &sheet), FormulaValue::Boolean(false));
        assert_eq!(eval("=IF(\"x\", 1, 2)", &sheet), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_text_functions() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value("A1", "  Lars   Hansen ").unwrap();

        assert_eq!(eval("=TRIM(A1)", &sheet), FormulaValue::String("Lars Hansen".into()));
        assert_eq!(eval("=UPPER(\"itf\")", &sheet), FormulaValue::String("ITF".into()));
        assert_eq!(eval("=LOWER(\"Digital\")", &sheet), FormulaValue::String("digital".into()));
        assert_eq!(
            eval("=CONCATENATE(\"ITF\", 10214)", &sheet),
            FormulaValue::String("ITF10214".into())
        );
        assert_eq!(eval("=CONCAT(\"a\", \"b\", 1.5)", &sheet), FormulaValue::String("ab1.5".into()));
    }

    #[test]
    fn test_date_and_time() {
        let sheet = Worksheet::new("Sheet1");
        assert_eq!(eval("=DATE(2024, 12, 16)", &sheet), FormulaValue::Number(45642.0));
        assert_eq!(eval("=DATE(2024, 13, 1)", &sheet), FormulaValue::Number(45658.0));
        assert_eq!(eval("=DATE(2025, 1, 0)", &sheet), FormulaValue::Number(45657.0));
        assert_eq!(eval("=TIME(12, 0, 0)", &sheet), FormulaValue::Number(0.5));
        assert_eq!(
            eval("=DATE(2024, 12, 16) + TIME(9, 0, 0)", &sheet),
            FormulaValue::Number(45642.375)
        );
        assert_eq!(eval("=DATE(10000, 1, 1)", &sheet), FormulaValue::Error(CellError::Num));
    }

    #[test]
    fn test_date_uses_1904_system() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_date_1904(true);
        assert_eq!(eval("=DATE(2024, 12, 16)", &sheet), FormulaValue::Number(44180.0));
    }

    #[test]
    fn test_unknown_function_and_arity() {
        let sheet = Worksheet::new("Sheet1");
        assert!(matches!(
            evaluate_formula("=VLOOKUP(1, A1:B2, 2)", &sheet),
            Err(FormulaError::UnknownFunction(name)) if name == "VLOOKUP"
        ));
        assert!(matches!(
            evaluate_formula("=TRIM()", &sheet),
            Err(FormulaError::ArgumentCount { actual: 0, .. })
        ));
        assert!(matches!(
            evaluate_formula("=IF(1, 2, 3, 4)", &sheet),
            Err(FormulaError::ArgumentCount { actual: 4, .. })
        ));
    }
}
