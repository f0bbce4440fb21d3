//! Formula parser
//!
//! The formula text is tokenized up front, then a recursive descent parser
//! builds the AST following Excel's operator precedence (lowest first):
//! comparison, `&`, `+ -`, `* /`, `^`, unary `- +`, postfix `%`, primary.

use crate::ast::{BinaryOp, FormulaExpr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use exam_sheets_core::{CellAddress, CellError, CellRange};

/// Deepest expression tree the parser will build. Parentheses, calls, signs
/// and every chained operator each count as a level.
const MAX_DEPTH: usize = 128;

/// Parse a formula string into an AST.
///
/// A leading `=` is optional, since XLSX stores formula text without it.
///
/// # Example
/// ```rust
/// use exam_sheets_formula::parse_formula;
///
/// assert!(parse_formula("=1+2").is_ok());
/// assert!(parse_formula("SUM(A1:A10)").is_ok());
/// assert!(parse_formula("=IF(A1>0,\"Yes\",\"No\")").is_ok());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    let body = formula.strip_prefix('=').unwrap_or(formula);
    if body.trim().is_empty() {
        return Err(FormulaError::Parse("empty formula".into()));
    }

    let tokens = tokenize(body)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_comparison()?;

    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(FormulaError::Parse(format!(
            "unexpected {:?} after expression",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    Identifier(String),
    CellRef(CellAddress),
    Operator(&'static str),
    LeftParen,
    RightParen,
    Separator,
    Colon,
    Eof,
}

fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            ',' | ';' => {
                tokens.push(Token::Separator);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '<' | '>' => {
                let op = match (c, chars.get(i + 1)) {
                    ('<', Some('=')) => "<=",
                    ('<', Some('>')) => "<>",
                    ('>', Some('=')) => ">=",
                    ('<', _) => "<",
                    _ => ">",
                };
                i += op.len();
                tokens.push(Token::Operator(op));
            }
            '+' | '-' | '*' | '/' | '^' | '%' | '&' | '=' => {
                let op = match c {
                    '+' => "+",
                    '-' => "-",
                    '*' => "*",
                    '/' => "/",
                    '^' => "^",
                    '%' => "%",
                    '&' => "&",
                    _ => "=",
                };
                tokens.push(Token::Operator(op));
                i += 1;
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('"') if chars.get(i + 1) == Some(&'"') => {
                            s.push('"');
                            i += 2;
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(FormulaError::Parse("unterminated string literal".into()))
                        }
                    }
                }
                tokens.push(Token::String(s));
            }
            '#' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '!' | '/' | '?'))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let err = CellError::parse(&text)
                    .ok_or_else(|| FormulaError::Parse(format!("unknown error literal {}", text)))?;
                tokens.push(Token::Error(err));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::Parse(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '$' | '.'))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'!') {
                    return Err(FormulaError::InvalidReference(format!(
                        "cross-sheet reference '{}!' is not supported",
                        text
                    )));
                }
                tokens.push(classify_word(text, chars.get(i) == Some(&'(')));
            }
            other => {
                return Err(FormulaError::Parse(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Decide whether a word is a boolean, a cell reference or a name.
/// A word directly followed by `(` is always a function name.
fn classify_word(text: String, before_paren: bool) -> Token {
    if before_paren {
        return Token::Identifier(text.to_uppercase());
    }
    if text.eq_ignore_ascii_case("TRUE") {
        return Token::Boolean(true);
    }
    if text.eq_ignore_ascii_case("FALSE") {
        return Token::Boolean(false);
    }
    match CellAddress::parse(&text) {
        Ok(addr) => Token::CellRef(addr),
        Err(_) => Token::Identifier(text.to_uppercase()),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::Parse(format!(
                "formula nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    fn eat_operator(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Token::Operator(op) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn binary(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> FormulaResult<FormulaExpr>,
    ) -> FormulaResult<FormulaExpr> {
        let mut left = next(self)?;
        let mut chained = 0;
        while let Some(symbol) = self.eat_operator(ops) {
            let op = BinaryOp::from_symbol(symbol)
                .ok_or_else(|| FormulaError::Parse(format!("unknown operator {}", symbol)))?;
            self.descend()?;
            chained += 1;
            let right = next(self)?;
            left = FormulaExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary(&["=", "<>", "<", "<=", ">", ">="], Self::parse_concatenation)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary(&["&"], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary(&["*", "/"], Self::parse_power)
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary(&["^"], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.eat_operator(&["-", "+"]) {
            Some(op) => {
                self.descend()?;
                let operand = self.parse_unary()?;
                self.depth -= 1;
                Ok(FormulaExpr::Unary {
                    op: if op == "-" {
                        UnaryOp::Neg
                    } else {
                        UnaryOp::Plus
                    },
                    operand: Box::new(operand),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_primary()?;
        let mut chained = 0;
        while self.eat_operator(&["%"]).is_some() {
            self.descend()?;
            chained += 1;
            expr = FormulaExpr::Unary {
                op: UnaryOp::Percent,
                operand: Box::new(expr),
            };
        }
        self.depth -= chained;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.next() {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::String(s) => Ok(FormulaExpr::String(s)),
            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Token::Error(e) => Ok(FormulaExpr::Error(e)),
            Token::CellRef(start) => {
                if self.peek() != &Token::Colon {
                    return Ok(FormulaExpr::Reference(start));
                }
                self.pos += 1;
                match self.next() {
                    Token::CellRef(end) => Ok(FormulaExpr::Range(CellRange::new(start, end))),
                    other => Err(FormulaError::Parse(format!(
                        "expected cell reference after ':', found {:?}",
                        other
                    ))),
                }
            }
            Token::Identifier(name) => {
                if self.peek() != &Token::LeftParen {
                    return Err(FormulaError::Parse(format!(
                        "defined names are not supported: {}",
                        name
                    )));
                }
                self.pos += 1;
                self.descend()?;
                let args = self.parse_arguments()?;
                self.depth -= 1;
                Ok(FormulaExpr::Call { name, args })
            }
            Token::LeftParen => {
                self.descend()?;
                let inner = self.parse_comparison()?;
                self.depth -= 1;
                match self.next() {
                    Token::RightParen => Ok(inner),
                    other => Err(FormulaError::Parse(format!(
                        "expected ')', found {:?}",
                        other
                    ))),
                }
            }
            other => Err(FormulaError::Parse(format!("unexpected {:?}", other))),
        }
    }

    /// Arguments after the opening parenthesis, consuming the closing one
    fn parse_arguments(&mut self) -> FormulaResult<Vec<FormulaExpr>> {
        let mut args = Vec::new();
        if self.peek() == &Token::RightParen {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.parse_comparison()?);
            match self.next() {
                Token::Separator => continue,
                Token::RightParen => return Ok(args),
                other => {
                    return Err(FormulaError::Parse(format!(
                        "expected ',' or ')' in argument list, found {:?}",
                        other
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Box<FormulaExpr> {
        Box::new(FormulaExpr::Number(n))
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("=1.5e2").unwrap(), FormulaExpr::Number(150.0));
        assert_eq!(
            parse_formula("=\"say \"\"hi\"\"\"").unwrap(),
            FormulaExpr::String("say \"hi\"".into())
        );
        assert_eq!(parse_formula("=true").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(
            parse_formula("=#N/A").unwrap(),
            FormulaExpr::Error(CellError::NotAvailable)
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse_formula("=1+2*3").unwrap(),
            FormulaExpr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(FormulaExpr::Binary {
                    op: BinaryOp::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );

        // Negation binds tighter than exponentiation in Excel
        assert_eq!(
            parse_formula("=-2^2").unwrap(),
            FormulaExpr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(FormulaExpr::Unary {
                    op: UnaryOp::Neg,
                    operand: num(2.0),
                }),
                right: num(2.0),
            }
        );
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(
            parse_formula("$B$2").unwrap(),
            FormulaExpr::Reference(CellAddress::parse("$B$2").unwrap())
        );
        assert_eq!(
            parse_formula("=SUM(A1:A3)").unwrap(),
            FormulaExpr::Call {
                name: "SUM".into(),
                args: vec![FormulaExpr::Range(CellRange::parse("A1:A3").unwrap())],
            }
        );
    }

    #[test]
    fn test_parse_function_calls() {
        let expr = parse_formula("=if(A1>=5, \"ok\", concatenate(B1, \"-\"))").unwrap();
        match expr {
            FormulaExpr::Call { name, args } => {
                assert_eq!(name, "IF");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected function, got {:?}", other),
        }
        assert_eq!(
            parse_formula("=TRIM()").unwrap(),
            FormulaExpr::Call {
                name: "TRIM".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_formula("=").is_err());
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=\"open").is_err());
        assert!(parse_formula("=Sheet2!A1").is_err());
        assert!(parse_formula("=MyName").is_err());
        assert!(parse_formula("=1 2").is_err());
        assert!(parse_formula("=@A1").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() {
        let nested = |n: usize| format!("={}1{}", "(".repeat(n), ")".repeat(n));
        assert!(parse_formula(&nested(50)).is_ok());
        assert!(matches!(
            parse_formula(&nested(3000)),
            Err(FormulaError::Parse(msg)) if msg.contains("nested deeper")
        ));

        let calls = format!("={}1{}", "SUM(".repeat(3000), ")".repeat(3000));
        assert!(parse_formula(&calls).is_err());
        assert!(parse_formula(&format!("={}1", "-".repeat(3000))).is_err());
        assert!(parse_formula(&format!("=1{}", "%".repeat(3000))).is_err());
        assert!(parse_formula(&format!("=1{}", "+1".repeat(3000))).is_err());

        // Sibling arguments and operands do not add up
        assert!(parse_formula(&format!("=SUM({})", vec!["((1))"; 200].join(","))).is_ok());
        assert!(parse_formula(&format!("={}", vec!["((1))"; 60].join("+"))).is_ok());
    }
}
