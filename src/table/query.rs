//! Row filtering with a small typed expression language
//!
//! `Table::query("sales > 100 and region == 'east'")` tokenizes and parses the
//! string into an [`Expr`] tree that is evaluated row by row against column
//! accessors. Nothing is evaluated as code.
//!
//! Supported syntax:
//! - column identifiers, number/string/boolean literals
//! - comparisons `== != < <= > >=`
//! - logical `and or not` (also `&& || !`)
//! - arithmetic `+ - * /` and parentheses
//! - `isnull(col)`, `notnull(col)`, `contains(col, "s")`, `matches(col, "regex")`
//!
//! A comparison with a missing value on either side is false, `!=` included.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use regex::Regex;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::table::Table;

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Number(f64),
    String(String),
    Boolean(bool),
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Multiply,
    Divide,
    LeftParen,
    RightParen,
    Function(String),
    Comma,
    Eof,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithOp {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Subtract => a - b,
            ArithOp::Multiply => a * b,
            ArithOp::Divide => a / b,
        }
    }
}

/// Expression tree
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Number(f64),
    Text(String),
    Boolean(bool),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IsNull(String),
    NotNull(String),
    Contains {
        column: String,
        needle: String,
    },
    Matches {
        column: String,
        pattern: Regex,
    },
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn num(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Expr::Text(value.into())
    }

    fn compare(self, op: CompareOp, other: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn eq(self, other: Expr) -> Self {
        self.compare(CompareOp::Equal, other)
    }

    pub fn ne(self, other: Expr) -> Self {
        self.compare(CompareOp::NotEqual, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        self.compare(CompareOp::LessThan, other)
    }

    pub fn le(self, other: Expr) -> Self {
        self.compare(CompareOp::LessThanOrEqual, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        self.compare(CompareOp::GreaterThan, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        self.compare(CompareOp::GreaterThanOrEqual, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name)
            | Expr::IsNull(name)
            | Expr::NotNull(name)
            | Expr::Contains { column: name, .. }
            | Expr::Matches { column: name, .. } => out.push(name),
            Expr::Compare { left, right, .. }
            | Expr::Arith { left, right, .. }
            | Expr::And(left, right)
            | Expr::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Negate(inner) | Expr::Not(inner) => inner.collect_columns(out),
            Expr::Number(_) | Expr::Text(_) | Expr::Boolean(_) => {}
        }
    }
}

/// Value of a sub-expression for one row
#[derive(Debug, Clone, PartialEq)]
enum Scalar<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
    Boolean(bool),
}

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Missing => write!(f, "missing value"),
            Scalar::Number(_) => write!(f, "number"),
            Scalar::Text(_) => write!(f, "string"),
            Scalar::Boolean(_) => write!(f, "boolean"),
        }
    }
}

/// Row predicate: an expression that evaluates to a boolean
#[derive(Debug, Clone)]
pub struct Predicate {
    expr: Expr,
}

impl Predicate {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Parses a query string
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Parser::new(tokens);
        let expr = parser.parse()?;
        Ok(Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluates the predicate for every row
    pub fn evaluate(&self, table: &Table) -> Result<Vec<bool>> {
        let mut referenced = Vec::new();
        self.expr.collect_columns(&mut referenced);
        for name in referenced {
            table.column(name)?;
        }

        (0..table.row_count())
            .map(|row| match eval(&self.expr, table, row)? {
                Scalar::Boolean(b) => Ok(b),
                other => Err(Error::InvalidInput(format!(
                    "query must evaluate to a boolean, found {}",
                    other
                ))),
            })
            .collect()
    }
}

fn column_scalar<'a>(column: &'a Column, row: usize) -> Scalar<'a> {
    match column {
        Column::Float64(col) => col.valid_value(row).map_or(Scalar::Missing, Scalar::Number),
        Column::String(col) => match col.get(row) {
            Ok(Some(s)) => Scalar::Text(s),
            _ => Scalar::Missing,
        },
    }
}

fn eval<'a>(expr: &'a Expr, table: &'a Table, row: usize) -> Result<Scalar<'a>> {
    match expr {
        Expr::Column(name) => Ok(column_scalar(table.column(name)?, row)),
        Expr::Number(v) => Ok(Scalar::Number(*v)),
        Expr::Text(s) => Ok(Scalar::Text(s)),
        Expr::Boolean(b) => Ok(Scalar::Boolean(*b)),
        Expr::Compare { op, left, right } => {
            let left = eval(left, table, row)?;
            let right = eval(right, table, row)?;
            compare(*op, &left, &right).map(Scalar::Boolean)
        }
        Expr::Arith { op, left, right } => {
            match (eval(left, table, row)?, eval(right, table, row)?) {
                (Scalar::Missing, _) | (_, Scalar::Missing) => Ok(Scalar::Missing),
                (Scalar::Number(a), Scalar::Number(b)) => {
                    let v = op.apply(a, b);
                    Ok(if v.is_nan() { Scalar::Missing } else { Scalar::Number(v) })
                }
                (a, b) => Err(Error::InvalidInput(format!(
                    "arithmetic on {} and {}",
                    a, b
                ))),
            }
        }
        Expr::Negate(inner) => match eval(inner, table, row)? {
            Scalar::Number(v) => Ok(Scalar::Number(-v)),
            Scalar::Missing => Ok(Scalar::Missing),
            other => Err(Error::InvalidInput(format!("cannot negate a {}", other))),
        },
        Expr::And(left, right) => {
            Ok(Scalar::Boolean(truth(eval(left, table, row)?)? && truth(eval(right, table, row)?)?))
        }
        Expr::Or(left, right) => {
            Ok(Scalar::Boolean(truth(eval(left, table, row)?)? || truth(eval(right, table, row)?)?))
        }
        Expr::Not(inner) => Ok(Scalar::Boolean(!truth(eval(inner, table, row)?)?)),
        Expr::IsNull(name) => Ok(Scalar::Boolean(table.column(name)?.is_missing(row))),
        Expr::NotNull(name) => Ok(Scalar::Boolean(!table.column(name)?.is_missing(row))),
        Expr::Contains { column, needle } => Ok(Scalar::Boolean(
            match column_scalar(table.column(column)?, row) {
                Scalar::Text(s) => s.contains(needle.as_str()),
                _ => false,
            },
        )),
        Expr::Matches { column, pattern } => Ok(Scalar::Boolean(
            match column_scalar(table.column(column)?, row) {
                Scalar::Text(s) => pattern.is_match(s),
                _ => false,
            },
        )),
    }
}

fn truth(value: Scalar<'_>) -> Result<bool> {
    match value {
        Scalar::Boolean(b) => Ok(b),
        other => Err(Error::InvalidInput(format!(
            "expected a boolean operand, found {}",
            other
        ))),
    }
}

fn compare(op: CompareOp, left: &Scalar<'_>, right: &Scalar<'_>) -> Result<bool> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Scalar::Missing, _) | (_, Scalar::Missing) => return Ok(false),
        (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
        (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
        (Scalar::Boolean(a), Scalar::Boolean(b)) => Some(a.cmp(b)),
        (a, b) => {
            return Err(Error::InvalidInput(format!("cannot compare {} with {}", a, b)));
        }
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };

    Ok(match op {
        CompareOp::Equal => ordering == Ordering::Equal,
        CompareOp::NotEqual => ordering != Ordering::Equal,
        CompareOp::LessThan => ordering == Ordering::Less,
        CompareOp::LessThanOrEqual => ordering != Ordering::Greater,
        CompareOp::GreaterThan => ordering == Ordering::Greater,
        CompareOp::GreaterThanOrEqual => ordering != Ordering::Less,
    })
}

/// Tokenizer for query strings
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Tokenizes the whole input, ending with `Token::Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Multiply),
            '/' => self.single(Token::Divide),
            '=' => self.pair('=', Token::Equal, None),
            '!' => self.pair('=', Token::NotEqual, Some(Token::Not)),
            '<' => self.pair('=', Token::LessThanOrEqual, Some(Token::LessThan)),
            '>' => self.pair('=', Token::GreaterThanOrEqual, Some(Token::GreaterThan)),
            '&' => self.pair('&', Token::And, None),
            '|' => self.pair('|', Token::Or, None),
            '\'' | '"' => self.read_string(),
            '0'..='9' | '.' => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            _ => Err(Error::InvalidInput(format!("unexpected character: {}", ch))),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.chars.next();
        Ok(token)
    }

    /// Two-character operator, or the one-character fallback
    fn pair(&mut self, second: char, token: Token, fallback: Option<Token>) -> Result<Token> {
        let first = self.chars.next();
        if self.chars.peek() == Some(&second) {
            self.chars.next();
            return Ok(token);
        }
        fallback.ok_or_else(|| {
            Error::InvalidInput(format!(
                "expected '{}{}'",
                first.unwrap_or_default(),
                second
            ))
        })
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        let quote = self.chars.next();
        let mut value = String::new();

        while let Some(ch) = self.chars.next() {
            if Some(ch) == quote {
                return Ok(Token::String(value));
            } else if ch == '\\' {
                if let Some(escaped) = self.chars.next() {
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        '"' => value.push('"'),
                        _ => {
                            value.push('\\');
                            value.push(escaped);
                        }
                    }
                }
            } else {
                value.push(ch);
            }
        }

        Err(Error::InvalidInput("unterminated string literal".to_string()))
    }

    fn read_number(&mut self) -> Result<Token> {
        let mut number = String::new();

        while let Some(&ch) = self.chars.peek() {
            let exponent_sign =
                (ch == '-' || ch == '+') && matches!(number.chars().last(), Some('e' | 'E'));
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                number.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }

        number
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| Error::InvalidInput(format!("invalid number: {}", number)))
    }

    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }

        match identifier.as_str() {
            "true" | "True" => Token::Boolean(true),
            "false" | "False" => Token::Boolean(false),
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => {
                self.skip_whitespace();
                if self.chars.peek() == Some(&'(') {
                    Token::Function(identifier)
                } else {
                    Token::Identifier(identifier)
                }
            }
        }
    }
}

/// Recursive-descent parser building an [`Expr`]
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the whole token stream
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or()?;
        match self.current() {
            None | Some(Token::Eof) => Ok(expr),
            Some(token) => Err(Error::InvalidInput(format!("unexpected token: {:?}", token))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.match_token(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.match_token(&Token::Not) {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.match_compare_operator() {
            let right = self.parse_additive()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Some(Token::Multiply) => ArithOp::Multiply,
                Some(Token::Divide) => ArithOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.match_token(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self
            .current()
            .cloned()
            .ok_or_else(|| Error::InvalidInput("unexpected end of input".to_string()))?;

        match token {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Token::String(value) => {
                self.advance();
                Ok(Expr::Text(value))
            }
            Token::Boolean(value) => {
                self.advance();
                Ok(Expr::Boolean(value))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Column(name))
            }
            Token::Function(name) => {
                self.advance();
                let args = self.parse_arguments()?;
                build_call(&name, args)
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_or()?;
                if !self.match_token(&Token::RightParen) {
                    return Err(Error::InvalidInput("expected ')' after expression".to_string()));
                }
                Ok(expr)
            }
            Token::Eof => Err(Error::InvalidInput("unexpected end of input".to_string())),
            other => Err(Error::InvalidInput(format!("unexpected token: {:?}", other))),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        if !self.match_token(&Token::LeftParen) {
            return Err(Error::InvalidInput("expected '(' after function name".to_string()));
        }
        let mut args = Vec::new();
        if !self.match_token(&Token::RightParen) {
            loop {
                args.push(self.parse_or()?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
            if !self.match_token(&Token::RightParen) {
                return Err(Error::InvalidInput(
                    "expected ')' after function arguments".to_string(),
                ));
            }
        }
        Ok(args)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_compare_operator(&mut self) -> Option<CompareOp> {
        let op = match self.current()? {
            Token::Equal => CompareOp::Equal,
            Token::NotEqual => CompareOp::NotEqual,
            Token::LessThan => CompareOp::LessThan,
            Token::LessThanOrEqual => CompareOp::LessThanOrEqual,
            Token::GreaterThan => CompareOp::GreaterThan,
            Token::GreaterThanOrEqual => CompareOp::GreaterThanOrEqual,
            _ => return None,
        };
        self.advance();
        Some(op)
    }
}

fn build_call(name: &str, args: Vec<Expr>) -> Result<Expr> {
    let mut args = args.into_iter();
    let (first, second, extra) = (args.next(), args.next(), args.next());
    match (name, first, second, extra) {
        ("isnull", Some(Expr::Column(column)), None, None) => Ok(Expr::IsNull(column)),
        ("notnull", Some(Expr::Column(column)), None, None) => Ok(Expr::NotNull(column)),
        ("contains", Some(Expr::Column(column)), Some(Expr::Text(needle)), None) => {
            Ok(Expr::Contains { column, needle })
        }
        ("matches", Some(Expr::Column(column)), Some(Expr::Text(pattern)), None) => {
            Ok(Expr::Matches {
                column,
                pattern: Regex::new(&pattern)?,
            })
        }
        ("isnull" | "notnull" | "contains" | "matches", ..) => Err(Error::InvalidInput(format!(
            "invalid arguments for {}()",
            name
        ))),
        _ => Err(Error::InvalidInput(format!("unknown function: {}", name))),
    }
}

impl Table {
    /// Rows matching a query string
    pub fn query(&self, expr: &str) -> Result<Table> {
        let predicate = Predicate::parse(expr)?;
        self.filter(&predicate)
    }

    /// Rows matching a predicate
    pub fn filter(&self, predicate: &Predicate) -> Result<Table> {
        let mask = predicate.evaluate(self)?;
        self.filter_mask(&mask)
    }
}
