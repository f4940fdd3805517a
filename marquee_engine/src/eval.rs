//! Expression evaluators for parenthesized spans in script text.
//!
//! Two implementations sit behind the [`Evaluator`] trait:
//!
//! * [`RestrictedEvaluator`] (the default) understands arithmetic, comparison
//!   and boolean logic over numbers, quoted strings and bare words. It cannot
//!   reach anything outside the expression.
//! * [`UnrestrictedEvaluator`] hands the text to a full `rhai` engine. Only use
//!   it for scripts you trust.

use std::fmt;

use rhai::{Dynamic, Engine};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Turns expression text into display text.
pub trait Evaluator {
    /// Evaluate `expression` and stringify the result.
    ///
    /// # Errors
    /// Returns an [`EvalError`] when the text is not a valid expression or
    /// an operation cannot be carried out.
    fn evaluate(&self, expression: &str) -> Result<String, EvalError>;
}

/// Which evaluator a runtime uses, as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    #[default]
    Restricted,
    Unrestricted,
}

impl EvaluatorKind {
    pub fn build(self) -> Box<dyn Evaluator> {
        match self {
            EvaluatorKind::Restricted => Box::new(RestrictedEvaluator),
            EvaluatorKind::Unrestricted => Box::new(UnrestrictedEvaluator::new()),
        }
    }
}

/// Format a number the way scripts expect: integral values have no decimal point.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{}", format_bool(*b)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Word(String),
    Op(&'static str),
    LParen,
    RParen,
}

const OPERATORS: [&str; 19] = [
    "**", "//", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!", "=", "&", "|",
];

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '"' || c == '\'' {
            let end = chars[i + 1..]
                .iter()
                .position(|&ch| ch == c)
                .ok_or_else(|| "unterminated string".to_string())?;
            tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
            i += end + 2;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
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
            let number = text.parse::<f64>().map_err(|_| format!("bad number '{text}'"))?;
            tokens.push(Token::Num(number));
        } else if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | ':' | '?')) {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(*op))
                .ok_or_else(|| format!("unexpected character '{c}'"))?;
            match *op {
                "=" | "&" | "|" => return Err(format!("unsupported operator '{op}'")),
                _ => tokens.push(Token::Op(*op)),
            }
            i += op.len();
        }
    }
    Ok(tokens)
}

/// Arithmetic/boolean evaluator with no access to anything but its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestrictedEvaluator;

impl Evaluator for RestrictedEvaluator {
    fn evaluate(&self, expression: &str) -> Result<String, EvalError> {
        let syntax = |reason: String| EvalError::Syntax {
            expression: expression.to_string(),
            reason,
        };
        let tokens = tokenize(expression).map_err(syntax)?;
        if tokens.is_empty() {
            return Ok(String::new());
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            source: expression,
        };
        let value = parser.or_expr()?;
        if let Some(extra) = parser.peek() {
            return Err(syntax(format!("unexpected {extra:?}")));
        }
        Ok(value.to_string())
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn syntax(&self, reason: impl Into<String>) -> EvalError {
        EvalError::Syntax {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn type_error(&self, reason: impl Into<String>) -> EvalError {
        EvalError::Type {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }

    /// Consume the next token if it is one of the given operators or keywords.
    fn eat(&mut self, ops: &[&str]) -> Option<&'static str> {
        let found = match self.peek()? {
            Token::Op(op) if ops.contains(op) => Some(*op),
            Token::Word(word) => ops
                .iter()
                .find(|op| op.chars().all(char::is_alphabetic) && word.eq_ignore_ascii_case(op))
                .map(|op| match op.to_ascii_lowercase().as_str() {
                    "and" => "and",
                    "or" => "or",
                    _ => "not",
                }),
            _ => None,
        };
        if found.is_some() {
            self.pos += 1;
        }
        found
    }

    fn or_expr(&mut self) -> Result<Value, EvalError> {
        let mut left = self.and_expr()?;
        while self.eat(&["or", "||"]).is_some() {
            let right = self.and_expr()?;
            if !left.truthy() {
                left = right;
            }
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Value, EvalError> {
        let mut left = self.not_expr()?;
        while self.eat(&["and", "&&"]).is_some() {
            let right = self.not_expr()?;
            if left.truthy() {
                left = right;
            }
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Value, EvalError> {
        if self.eat(&["not", "!"]).is_some() {
            let value = self.not_expr()?;
            return Ok(Value::Bool(!value.truthy()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        let mut left = self.additive()?;
        let mut verdict: Option<bool> = None;
        while let Some(op) = self.eat(&["==", "!=", "<=", ">=", "<", ">"]) {
            let right = self.additive()?;
            let holds = self.compare(op, &left, &right)?;
            verdict = Some(verdict.unwrap_or(true) && holds);
            left = right;
        }
        Ok(verdict.map_or(left, Value::Bool))
    }

    fn compare(&self, op: &str, left: &Value, right: &Value) -> Result<bool, EvalError> {
        use std::cmp::Ordering;
        let ordering = match (left.as_number(), right.as_number(), left, right) {
            (Some(a), Some(b), _, _) => a.partial_cmp(&b),
            (_, _, Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        };
        match (op, ordering) {
            ("==", ordering) => Ok(ordering == Some(Ordering::Equal)),
            ("!=", ordering) => Ok(ordering != Some(Ordering::Equal)),
            (_, None) => Err(self.type_error(format!("cannot compare {left} {op} {right}"))),
            ("<", Some(ord)) => Ok(ord == Ordering::Less),
            ("<=", Some(ord)) => Ok(ord != Ordering::Greater),
            (">", Some(ord)) => Ok(ord == Ordering::Greater),
            (_, Some(ord)) => Ok(ord != Ordering::Less),
        }
    }

    fn additive(&mut self) -> Result<Value, EvalError> {
        let mut left = self.term()?;
        while let Some(op) = self.eat(&["+", "-"]) {
            let right = self.term()?;
            left = match (op, left.as_number(), right.as_number()) {
                ("+", Some(a), Some(b)) => Value::Num(a + b),
                ("-", Some(a), Some(b)) => Value::Num(a - b),
                ("+", _, _) => Value::Str(format!("{left}{right}")),
                _ => return Err(self.type_error(format!("cannot subtract {right} from {left}"))),
            };
        }
        Ok(left)
    }

    fn numbers(&self, op: &str, left: &Value, right: &Value) -> Result<(f64, f64), EvalError> {
        match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(self.type_error(format!("'{op}' needs numbers, got {left} and {right}"))),
        }
    }

    fn term(&mut self) -> Result<Value, EvalError> {
        let mut left = self.unary()?;
        while let Some(op) = self.eat(&["*", "//", "/", "%"]) {
            let right = self.unary()?;
            let (a, b) = self.numbers(op, &left, &right)?;
            if op != "*" && b == 0.0 {
                return Err(EvalError::DivisionByZero(self.source.to_string()));
            }
            left = Value::Num(match op {
                "*" => a * b,
                "/" => a / b,
                "//" => (a / b).floor(),
                _ => a - b * (a / b).floor(),
            });
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Value, EvalError> {
        if let Some(op) = self.eat(&["-", "+"]) {
            let value = self.unary()?;
            let number = value
                .as_number()
                .ok_or_else(|| self.type_error(format!("bad operand for unary {op}: {value}")))?;
            return Ok(Value::Num(if op == "-" { -number } else { number }));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Value, EvalError> {
        let base = self.atom()?;
        if self.eat(&["**"]).is_some() {
            let exponent = self.unary()?;
            let (a, b) = self.numbers("**", &base, &exponent)?;
            return Ok(Value::Num(a.powf(b)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Value, EvalError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Value::Num(n)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Word(word)) => Ok(match word.to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::Str(word),
            }),
            Some(Token::LParen) => {
                let value = self.or_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(self.syntax("missing ')'")),
                }
            },
            Some(other) => Err(self.syntax(format!("unexpected {other:?}"))),
            None => Err(self.syntax("unexpected end of expression")),
        }
    }
}

/// Full `rhai` expression language. Not safe for untrusted scripts.
pub struct UnrestrictedEvaluator {
    engine: Engine,
}

impl UnrestrictedEvaluator {
    pub fn new() -> Self {
        Self { engine: Engine::new() }
    }
}

impl Default for UnrestrictedEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for UnrestrictedEvaluator {
    fn evaluate(&self, expression: &str) -> Result<String, EvalError> {
        let value = self
            .engine
            .eval::<Dynamic>(expression)
            .map_err(|err| EvalError::Engine {
                expression: expression.to_string(),
                reason: err.to_string(),
            })?;
        Ok(render_dynamic(&value))
    }
}

fn render_dynamic(value: &Dynamic) -> String {
    if let Ok(flag) = value.as_bool() {
        return format_bool(flag).to_string();
    }
    if let Ok(int) = value.as_int() {
        return int.to_string();
    }
    if let Ok(float) = value.as_float() {
        return format_number(float);
    }
    value.to_string()
}
