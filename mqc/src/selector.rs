//! Message selectors: the SQL-92 conditional subset used to filter deliveries.
//!
//! Evaluation uses three-valued logic; a message is selected only when the
//! expression is definitely true. Missing identifiers are `NULL`, and any
//! comparison between mismatched types is unknown.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::value::Value;

/// A parsed selector.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    expr: Expr,
}

impl Selector {
    /// Parse a selector expression.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSelector`] when the expression is malformed.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected {token} after expression")));
        }
        if matches!(expr, Expr::Literal(ref v) if !matches!(v, Operand::Bool(_)))
            || matches!(expr, Expr::Arith(..) | Expr::Neg(_))
        {
            return Err(invalid("selector must be a boolean expression"));
        }
        Ok(Self {
            source: source.to_owned(),
            expr,
        })
    }

    /// Parse an optional selector; `None` and blank strings select everything.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSelector`] when the expression is malformed.
    pub fn parse_optional(source: Option<&str>) -> Result<Option<Self>> {
        match source {
            Some(s) if !s.trim().is_empty() => Self::parse(s).map(Some),
            _ => Ok(None),
        }
    }

    /// The expression as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `message` satisfies the selector.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        truth(&self.expr.eval(message)) == Some(true)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidSelector(msg.into())
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Long(i64),
    Double(f64),
    Keyword(Keyword),
    Op(Op),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    And,
    Or,
    Not,
    Between,
    Like,
    Escape,
    In,
    Is,
    Null,
    True,
    False,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Op {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
        }
    }
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        Some(match word.to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "BETWEEN" => Self::Between,
            "LIKE" => Self::Like,
            "ESCAPE" => Self::Escape,
            "IN" => Self::In,
            "IS" => Self::Is,
            "NULL" => Self::Null,
            "TRUE" => Self::True,
            "FALSE" => Self::False,
            _ => return None,
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "identifier `{s}`"),
            Self::Str(s) => write!(f, "string '{s}'"),
            Self::Long(v) => write!(f, "number {v}"),
            Self::Double(v) => write!(f, "number {v}"),
            Self::Keyword(k) => write!(f, "keyword {k:?}"),
            Self::Op(op) => write!(f, "`{}`", op.symbol()),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::Comma => f.write_str("`,`"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' | '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(match c {
                    '=' => Op::Eq,
                    '+' => Op::Plus,
                    '-' => Op::Minus,
                    '*' => Op::Star,
                    _ => Op::Slash,
                }));
                i += 1;
            }
            '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('<', Some('>')) => (Op::Ne, 2),
                    ('<', Some('=')) => (Op::Le, 2),
                    ('>', Some('=')) => (Op::Ge, 2),
                    ('<', _) => (Op::Lt, 1),
                    _ => (Op::Gt, 1),
                };
                tokens.push(Token::Op(op));
                i += width;
            }
            '\'' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(invalid("unterminated string literal")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            s.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) =>
            {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric()
                        || chars[i] == '.'
                        || ((chars[i] == '+' || chars[i] == '-')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(number(&text)?);
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric()
                        || chars[i] == '_'
                        || chars[i] == '$'
                        || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(Keyword::lookup(&word).map_or(Token::Ident(word), Token::Keyword));
            }
            other => return Err(invalid(format!("unexpected character `{other}`"))),
        }
    }
    Ok(tokens)
}

fn number(text: &str) -> Result<Token> {
    let trimmed = text.trim_end_matches(['l', 'L']);
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(Token::Long(v));
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(Token::Long)
            .map_err(|_| invalid(format!("bad number `{text}`")));
    }
    text.trim_end_matches(['f', 'F', 'd', 'D'])
        .parse::<f64>()
        .map(Token::Double)
        .map_err(|_| invalid(format!("bad number `{text}`")))
}

// ---------------------------------------------------------------------------
// Syntax tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Str(String),
}

impl Operand {
    fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Bytes(_)) => Self::Null,
            Some(Value::Bool(v)) => Self::Bool(v),
            Some(Value::Byte(v)) => Self::Long(i64::from(v)),
            Some(Value::Short(v)) => Self::Long(i64::from(v)),
            Some(Value::Int(v)) => Self::Long(i64::from(v)),
            Some(Value::Long(v)) => Self::Long(v),
            Some(Value::Float(v)) => Self::Double(f64::from(v)),
            Some(Value::Double(v)) => Self::Double(v),
            Some(v @ (Value::Char(_) | Value::String(_))) => Self::Str(v.to_string()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Operand),
    Ident(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Regex,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    In {
        expr: Box<Expr>,
        list: Vec<String>,
        negated: bool,
    },
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek() == Some(&Token::Keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(invalid(format!("expected {keyword:?}")))
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        match self.next() {
            Some(ref t) if t == token => Ok(()),
            Some(t) => Err(invalid(format!("expected {token}, found {t}"))),
            None => Err(invalid(format!("expected {token}, found end of input"))),
        }
    }

    fn string_literal(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(s),
            Some(t) => Err(invalid(format!("expected string literal, found {t}"))),
            None => Err(invalid("expected string literal, found end of input")),
        }
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword(Keyword::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.not_expr()?;
        while self.eat_keyword(Keyword::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.eat_keyword(Keyword::Not) {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.predicate()
    }

    fn predicate(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;

        if let Some(&Token::Op(op)) = self.peek() {
            let op = match op {
                Op::Eq => Some(CmpOp::Eq),
                Op::Ne => Some(CmpOp::Ne),
                Op::Lt => Some(CmpOp::Lt),
                Op::Le => Some(CmpOp::Le),
                Op::Gt => Some(CmpOp::Gt),
                Op::Ge => Some(CmpOp::Ge),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 1;
                let rhs = self.additive()?;
                return Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)));
            }
        }

        if self.eat_keyword(Keyword::Is) {
            let negated = self.eat_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(lhs),
                negated,
            });
        }

        let negated = self.eat_keyword(Keyword::Not);
        if self.eat_keyword(Keyword::Like) {
            let pattern = self.string_literal()?;
            let escape = if self.eat_keyword(Keyword::Escape) {
                let escape = self.string_literal()?;
                let mut chars = escape.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => return Err(invalid("ESCAPE must be a single character")),
                }
            } else {
                None
            };
            return Ok(Expr::Like {
                expr: Box::new(lhs),
                pattern: like_regex(&pattern, escape)?,
                negated,
            });
        }
        if self.eat_keyword(Keyword::Between) {
            let low = self.additive()?;
            self.expect_keyword(Keyword::And)?;
            let high = self.additive()?;
            return Ok(Expr::Between {
                expr: Box::new(lhs),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if self.eat_keyword(Keyword::In) {
            self.expect(&Token::LParen)?;
            let mut list = vec![self.string_literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                list.push(self.string_literal()?);
            }
            self.expect(&Token::RParen)?;
            return Ok(Expr::In {
                expr: Box::new(lhs),
                list,
                negated,
            });
        }
        if negated {
            return Err(invalid("expected LIKE, BETWEEN or IN after NOT"));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(Op::Plus)) => ArithOp::Add,
                Some(Token::Op(Op::Minus)) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(Op::Star)) => ArithOp::Mul,
                Some(Token::Op(Op::Slash)) => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Op(Op::Minus)) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op(Op::Plus)) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Operand::Str(s))),
            Some(Token::Long(v)) => Ok(Expr::Literal(Operand::Long(v))),
            Some(Token::Double(v)) => Ok(Expr::Literal(Operand::Double(v))),
            Some(Token::Keyword(Keyword::True)) => Ok(Expr::Literal(Operand::Bool(true))),
            Some(Token::Keyword(Keyword::False)) => Ok(Expr::Literal(Operand::Bool(false))),
            Some(Token::Keyword(Keyword::Null)) => Ok(Expr::Literal(Operand::Null)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(t) => Err(invalid(format!("unexpected {t}"))),
            None => Err(invalid("unexpected end of input")),
        }
    }
}

/// Translate a LIKE pattern into an anchored regular expression.
fn like_regex(pattern: &str, escape: Option<char>) -> Result<Regex> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            let literal = chars
                .next()
                .ok_or_else(|| invalid("LIKE pattern ends with the escape character"))?;
            re.push_str(&regex::escape(&literal.to_string()));
        } else if c == '%' {
            re.push_str(".*");
        } else if c == '_' {
            re.push('.');
        } else {
            re.push_str(&regex::escape(&c.to_string()));
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| invalid(e.to_string()))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn truth(operand: &Operand) -> Option<bool> {
    match operand {
        Operand::Bool(v) => Some(*v),
        _ => None,
    }
}

fn unknown_or(value: Option<bool>) -> Operand {
    value.map_or(Operand::Null, Operand::Bool)
}

impl Expr {
    fn eval(&self, message: &Message) -> Operand {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Ident(name) => Operand::from_value(message.selector_value(name)),
            Self::Not(inner) => unknown_or(truth(&inner.eval(message)).map(|v| !v)),
            Self::And(lhs, rhs) => {
                let l = truth(&lhs.eval(message));
                if l == Some(false) {
                    return Operand::Bool(false);
                }
                match (l, truth(&rhs.eval(message))) {
                    (_, Some(false)) => Operand::Bool(false),
                    (Some(true), Some(true)) => Operand::Bool(true),
                    _ => Operand::Null,
                }
            }
            Self::Or(lhs, rhs) => {
                let l = truth(&lhs.eval(message));
                if l == Some(true) {
                    return Operand::Bool(true);
                }
                match (l, truth(&rhs.eval(message))) {
                    (_, Some(true)) => Operand::Bool(true),
                    (Some(false), Some(false)) => Operand::Bool(false),
                    _ => Operand::Null,
                }
            }
            Self::Compare(op, lhs, rhs) => {
                unknown_or(compare(*op, &lhs.eval(message), &rhs.eval(message)))
            }
            Self::Arith(op, lhs, rhs) => arith(*op, &lhs.eval(message), &rhs.eval(message)),
            Self::Neg(inner) => match inner.eval(message) {
                Operand::Long(v) => v.checked_neg().map_or(Operand::Null, Operand::Long),
                Operand::Double(v) => Operand::Double(-v),
                _ => Operand::Null,
            },
            Self::IsNull { expr, negated } => {
                Operand::Bool((expr.eval(message) == Operand::Null) != *negated)
            }
            Self::Like {
                expr,
                pattern,
                negated,
            } => match expr.eval(message) {
                Operand::Str(s) => Operand::Bool(pattern.is_match(&s) != *negated),
                _ => Operand::Null,
            },
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = expr.eval(message);
                let above = compare(CmpOp::Ge, &v, &low.eval(message));
                let below = compare(CmpOp::Le, &v, &high.eval(message));
                let within = match (above, below) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                };
                unknown_or(within.map(|w| w != *negated))
            }
            Self::In {
                expr,
                list,
                negated,
            } => match expr.eval(message) {
                Operand::Str(s) => Operand::Bool(list.contains(&s) != *negated),
                _ => Operand::Null,
            },
        }
    }
}

fn compare(op: CmpOp, lhs: &Operand, rhs: &Operand) -> Option<bool> {
    let ordering = match (lhs, rhs) {
        (Operand::Long(a), Operand::Long(b)) => Some(a.cmp(b)),
        (Operand::Str(a), Operand::Str(b)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Some(a.cmp(b))
        }
        (Operand::Bool(a), Operand::Bool(b)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Some(a.cmp(b))
        }
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }?;
    Some(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

fn arith(op: ArithOp, lhs: &Operand, rhs: &Operand) -> Operand {
    if let (Operand::Long(a), Operand::Long(b)) = (lhs, rhs) {
        let result = match op {
            ArithOp::Add => a.checked_add(*b),
            ArithOp::Sub => a.checked_sub(*b),
            ArithOp::Mul => a.checked_mul(*b),
            ArithOp::Div => a.checked_div(*b),
        };
        return result.map_or(Operand::Null, Operand::Long);
    }
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Operand::Double(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }),
        _ => Operand::Null,
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
