//! Branch condition evaluation
//!
//! A small dedicated expression interpreter for edge conditions like
//! `result.success == true` or `cleaned.text != '' and flag`. The grammar is
//! deliberately closed:
//!
//! - path lookups into the context (dotted keys; any miss resolves to null)
//! - literals: 'string' / "string", numbers, `true`, `false`, `null`
//! - comparisons: `==` `!=` `<` `<=` `>` `>=`
//! - connectives: `and`, `or`, `not`, parentheses
//!
//! There is no function-call syntax, no environment access, and no binding
//! other than the context itself, so a condition can never reach outside the
//! run's data.
//!
//! `evaluate` never fails: every parse or evaluation error folds to `false`,
//! so a misspelled path makes the condition false instead of failing the
//! run. The fold is logged at debug level only.

use serde_json::Value;
use tracing::debug;

use crate::context::ExecutionContext;

/// Evaluate a condition expression against the run context.
///
/// Returns `false` on any parse or evaluation error.
pub fn evaluate(expression: &str, ctx: &ExecutionContext) -> bool {
    match checked_evaluate(expression, ctx) {
        Ok(v) => truthy(&v),
        Err(e) => {
            debug!(expression, error = %e, "condition folded to false");
            false
        }
    }
}

/// Evaluate with errors surfaced. Internal to the crate: the public policy
/// is the silent fold in [`evaluate`].
pub(crate) fn checked_evaluate(expression: &str, ctx: &ExecutionContext) -> Result<Value, CondError> {
    let tokens = lex(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    eval(&expr, ctx)
}

/// Truthiness of a context value: null, false, 0, empty strings and empty
/// containers are false.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Internal evaluation error. Never surfaced as a run failure.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CondError {
    Lex { position: usize },
    Parse { detail: &'static str },
    Incomparable,
}

impl std::fmt::Display for CondError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CondError::Lex { position } => write!(f, "unexpected character at {position}"),
            CondError::Parse { detail } => write!(f, "parse error: {detail}"),
            CondError::Incomparable => write!(f, "values cannot be ordered"),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Lexer
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(String),
    Str(String),
    Num(f64),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, CondError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && bytes[j] as char != quote {
                    j += 1;
                }
                if j >= bytes.len() {
                    return Err(CondError::Lex { position: i });
                }
                tokens.push(Token::Str(input[start..j].to_string()));
                i = j + 1;
            }
            '-' | '0'..='9' => {
                let start = i;
                i += 1;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let text = &input[start..i];
                let num: f64 = text.parse().map_err(|_| CondError::Lex { position: start })?;
                tokens.push(Token::Num(num));
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' | '.')
                {
                    i += 1;
                }
                let word = &input[start..i];
                tokens.push(match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Path(word.to_string()),
                });
            }
            _ => return Err(CondError::Lex { position: i }),
        }
    }

    Ok(tokens)
}

// ─────────────────────────────────────────────────────────────
// Parser (precedence: or < and < not < comparison < primary)
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect_end(&self) -> Result<(), CondError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(CondError::Parse {
                detail: "trailing tokens after expression",
            })
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, CondError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, CondError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, CondError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, CondError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, CondError> {
        let lhs = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.parse_primary()?;
        Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_primary(&mut self) -> Result<Expr, CondError> {
        match self.bump() {
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(CondError::Parse {
                        detail: "missing closing parenthesis",
                    }),
                }
            }
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Num(n)) => Ok(Expr::Literal(
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            )),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Path(p)) => Ok(Expr::Path(p)),
            _ => Err(CondError::Parse {
                detail: "expected a value, path or '('",
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Interpreter
// ─────────────────────────────────────────────────────────────

fn eval(expr: &Expr, ctx: &ExecutionContext) -> Result<Value, CondError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path(p) => Ok(ctx.resolve_path(p)),
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, ctx)?))),
        Expr::And(lhs, rhs) => {
            // Short-circuit, result normalized to bool
            if !truthy(&eval(lhs, ctx)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(rhs, ctx)?)))
        }
        Expr::Or(lhs, rhs) => {
            if truthy(&eval(lhs, ctx)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(rhs, ctx)?)))
        }
        Expr::Cmp(op, lhs, rhs) => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            compare(*op, &l, &r).map(Value::Bool)
        }
    }
}

/// Equality is defined across all value types (different types are simply
/// unequal); ordering is defined for number/number and string/string pairs
/// only; anything else is an evaluation error, which the public entry point
/// folds to `false`.
fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, CondError> {
    match op {
        CmpOp::Eq => Ok(loose_eq(lhs, rhs)),
        CmpOp::Ne => Ok(!loose_eq(lhs, rhs)),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ord = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => {
                    let (a, b) = (
                        a.as_f64().ok_or(CondError::Incomparable)?,
                        b.as_f64().ok_or(CondError::Incomparable)?,
                    );
                    a.partial_cmp(&b).ok_or(CondError::Incomparable)?
                }
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => return Err(CondError::Incomparable),
            };
            Ok(match op {
                CmpOp::Lt => ord.is_lt(),
                CmpOp::Le => ord.is_le(),
                CmpOp::Gt => ord.is_gt(),
                CmpOp::Ge => ord.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            })
        }
    }
}

/// Equality with numeric widening (1 == 1.0) but no other coercion.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(pairs: &[(&str, Value)]) -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        for (k, v) in pairs {
            ctx.set(*k, v.clone());
        }
        ctx
    }

    #[test]
    fn equality_on_bool() {
        let ctx = ctx_with(&[("flag", json!(true))]);
        assert!(evaluate("flag == true", &ctx));
        assert!(!evaluate("flag == false", &ctx));
        assert!(evaluate("flag != false", &ctx));
    }

    #[test]
    fn nested_path_comparison() {
        let ctx = ctx_with(&[("result", json!({"success": true, "count": 3}))]);
        assert!(evaluate("result.success == true", &ctx));
        assert!(evaluate("result.count > 2", &ctx));
        assert!(evaluate("result.count >= 3", &ctx));
        assert!(!evaluate("result.count < 3", &ctx));
    }

    #[test]
    fn missing_path_is_null() {
        let ctx = ExecutionContext::new();
        assert!(evaluate("flag == null", &ctx));
        assert!(!evaluate("flag == true", &ctx));
        assert!(evaluate("flag != true", &ctx));
    }

    #[test]
    fn string_literals_both_quote_styles() {
        let ctx = ctx_with(&[("status", json!("done"))]);
        assert!(evaluate("status == 'done'", &ctx));
        assert!(evaluate("status == \"done\"", &ctx));
        assert!(evaluate("status != ''", &ctx));
    }

    #[test]
    fn connectives_and_precedence() {
        let ctx = ctx_with(&[("a", json!(1)), ("b", json!(0))]);
        assert!(evaluate("a == 1 and b == 0", &ctx));
        assert!(evaluate("a == 2 or b == 0", &ctx));
        assert!(evaluate("not b", &ctx));
        // and binds tighter than or
        assert!(evaluate("a == 2 or a == 1 and b == 0", &ctx));
        assert!(evaluate("(a == 2 or a == 1) and b == 0", &ctx));
    }

    #[test]
    fn bare_values_use_truthiness() {
        let ctx = ctx_with(&[
            ("yes", json!(true)),
            ("zero", json!(0)),
            ("text", json!("hi")),
            ("empty", json!("")),
            ("list", json!([1])),
        ]);
        assert!(evaluate("yes", &ctx));
        assert!(!evaluate("zero", &ctx));
        assert!(evaluate("text", &ctx));
        assert!(!evaluate("empty", &ctx));
        assert!(evaluate("list", &ctx));
        assert!(!evaluate("missing", &ctx));
    }

    #[test]
    fn numeric_widening_in_equality() {
        let ctx = ctx_with(&[("n", json!(1))]);
        assert!(evaluate("n == 1.0", &ctx));
        assert!(evaluate("n < 1.5", &ctx));
        assert!(evaluate("n > -1", &ctx));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let ctx = ctx_with(&[("s", json!("beta"))]);
        assert!(evaluate("s > 'alpha'", &ctx));
        assert!(evaluate("s < 'gamma'", &ctx));
    }

    #[test]
    fn errors_fold_to_false_silently() {
        let ctx = ctx_with(&[("n", json!(1))]);
        // parse errors
        assert!(!evaluate("", &ctx));
        assert!(!evaluate("n ==", &ctx));
        assert!(!evaluate("n == (1", &ctx));
        assert!(!evaluate("n @ 1", &ctx));
        assert!(!evaluate("'unterminated", &ctx));
        // incomparable ordering
        assert!(!evaluate("n < 'a'", &ctx));
        assert!(!evaluate("n > null", &ctx));
    }

    #[test]
    fn no_escape_hatches_in_the_grammar() {
        let ctx = ExecutionContext::new();
        // Anything resembling a call or import fails to parse and folds to
        // false rather than resolving a name.
        assert!(!evaluate("__import__('os')", &ctx));
        assert!(!evaluate("open('/etc/passwd')", &ctx));
        assert!(!evaluate("a(b)", &ctx));
    }

    #[test]
    fn checked_evaluate_reports_incomparable() {
        let ctx = ctx_with(&[("n", json!(1))]);
        assert_eq!(
            checked_evaluate("n < 'a'", &ctx).unwrap_err(),
            CondError::Incomparable
        );
    }

    #[test]
    fn cross_type_equality_is_false_not_error() {
        let ctx = ctx_with(&[("n", json!(1))]);
        assert!(!evaluate("n == '1'", &ctx));
        assert!(evaluate("n != '1'", &ctx));
    }
}
