//! Template parser: text with `${{ … }}` actions into a [`Template`].
//!
//! Inside an action the grammar is
//!
//! ```text
//! pipeline := command ('|' command)*
//! command  := operand+
//! operand  := string | int | ident | field.path | '(' pipeline ')'
//! ```
//!
//! A command whose first operand names a function is a call; `a | f b` is
//! `f b a`.

use crate::ast::{Expr, Literal, Part, Template};
use crate::context::is_namespace;
use crate::error::EvaluationError;
use crate::eval::is_function;

const OPEN: &str = "${{";
const CLOSE: &str = "}}";

/// Parse `source` into a [`Template`].
pub fn parse(source: &str) -> Result<Template, EvaluationError> {
    let mut parts = Vec::new();
    let mut pos = 0;

    while let Some(rel) = source[pos..].find(OPEN) {
        let open = pos + rel;
        if open > pos {
            parts.push(Part::Text(source[pos..open].to_string()));
        }
        let body_start = open + OPEN.len();
        let body_end = find_action_end(source, body_start)?;
        let tokens = Lexer::new(source, body_start, body_end).tokenize()?;
        let expr = Parser::new(source, tokens, body_end).parse_action()?;
        parts.push(Part::Action(expr));
        pos = body_end + CLOSE.len();
    }

    if pos < source.len() {
        parts.push(Part::Text(source[pos..].to_string()));
    }
    Ok(Template { parts })
}

fn syntax(source: &str, offset: usize, message: impl Into<String>) -> EvaluationError {
    EvaluationError::Syntax {
        template: source.to_string(),
        offset,
        message: message.into(),
    }
}

/// Byte offset of the `}}` closing the action that starts at `from`,
/// skipping over string literals.
fn find_action_end(source: &str, from: usize) -> Result<usize, EvaluationError> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'`' {
                    i += 1;
                }
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Ok(i),
            _ => {}
        }
        i += 1;
    }
    Err(syntax(source, from, "unclosed action"))
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
    Pipe,
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, start: usize, end: usize) -> Self {
        Self {
            source,
            pos: start,
            end,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..self.end].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, EvaluationError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.pos;
            let token = match c {
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '(' => {
                    self.bump();
                    Token::LParen
                }
                ')' => {
                    self.bump();
                    Token::RParen
                }
                '|' => {
                    self.bump();
                    Token::Pipe
                }
                '"' => self.quoted()?,
                '`' => self.raw()?,
                '-' | '0'..='9' => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.ident()?,
                other => {
                    return Err(syntax(
                        self.source,
                        start,
                        format!("unexpected character {other:?} in action"),
                    ))
                }
            };
            tokens.push((start, token));
        }
        Ok(tokens)
    }

    fn quoted(&mut self) -> Result<Token, EvaluationError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax(self.source, start, "unterminated quoted string")),
                Some('"') => return Ok(Token::Str(out)),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => {
                        return Err(syntax(
                            self.source,
                            self.pos,
                            format!("unknown escape sequence \\{other}"),
                        ))
                    }
                    None => return Err(syntax(self.source, start, "unterminated quoted string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn raw(&mut self) -> Result<Token, EvaluationError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax(self.source, start, "unterminated raw string")),
                Some('`') => return Ok(Token::Str(out)),
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Token, EvaluationError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some('0'..='9')) {
            self.bump();
        }
        let text = &self.source[start..self.pos];
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| syntax(self.source, start, format!("bad number {text:?}")))
    }

    fn ident(&mut self) -> Result<Token, EvaluationError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '.') {
            self.bump();
        }
        let text = &self.source[start..self.pos];
        if text.ends_with('.') || text.contains("..") {
            return Err(syntax(self.source, start, format!("bad field path {text:?}")));
        }
        Ok(Token::Ident(text.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// A command operand before call resolution.
enum Operand {
    Function(String),
    Value(Expr),
}

impl Operand {
    fn into_expr(self) -> Expr {
        match self {
            Operand::Function(name) => Expr::Call { name, args: vec![] },
            Operand::Value(expr) => expr,
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end_offset: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<(usize, Token)>, end_offset: usize) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            end_offset,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.end_offset)
    }

    fn parse_action(mut self) -> Result<Expr, EvaluationError> {
        let expr = self.pipeline()?;
        if self.peek().is_some() {
            return Err(syntax(self.source, self.offset(), "unexpected token in action"));
        }
        Ok(expr)
    }

    fn pipeline(&mut self) -> Result<Expr, EvaluationError> {
        let first = self.command()?;
        let mut expr = build_command(self.source, self.offset(), first)?;

        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            let at = self.offset();
            let mut operands = self.command()?.into_iter();
            let Some(Operand::Function(name)) = operands.next() else {
                return Err(syntax(self.source, at, "non-function command in pipeline"));
            };
            let mut args: Vec<Expr> = operands.map(Operand::into_expr).collect();
            args.push(expr);
            expr = Expr::Call { name, args };
        }
        Ok(expr)
    }

    fn command(&mut self) -> Result<Vec<Operand>, EvaluationError> {
        let start = self.offset();
        let mut operands = Vec::new();
        while let Some(token) = self.peek().cloned() {
            let at = self.offset();
            let operand = match token {
                Token::Pipe | Token::RParen => break,
                Token::Str(s) => {
                    self.pos += 1;
                    Operand::Value(Expr::Literal(Literal::Str(s)))
                }
                Token::Int(i) => {
                    self.pos += 1;
                    Operand::Value(Expr::Literal(Literal::Int(i)))
                }
                Token::Ident(name) => {
                    self.pos += 1;
                    resolve_ident(&name)?
                }
                Token::LParen => {
                    self.pos += 1;
                    let inner = self.pipeline()?;
                    if self.peek() != Some(&Token::RParen) {
                        return Err(syntax(self.source, at, "unclosed left paren"));
                    }
                    self.pos += 1;
                    Operand::Value(inner)
                }
            };
            operands.push(operand);
        }
        if operands.is_empty() {
            return Err(syntax(self.source, start, "missing value for command"));
        }
        Ok(operands)
    }
}

fn build_command(
    source: &str,
    offset: usize,
    operands: Vec<Operand>,
) -> Result<Expr, EvaluationError> {
    let mut operands = operands.into_iter();
    match operands.next() {
        Some(Operand::Function(name)) => Ok(Expr::Call {
            name,
            args: operands.map(Operand::into_expr).collect(),
        }),
        Some(Operand::Value(expr)) => {
            if operands.next().is_some() {
                return Err(syntax(source, offset, "can't give argument to non-function"));
            }
            Ok(expr)
        }
        None => Err(syntax(source, offset, "missing value for command")),
    }
}

fn resolve_ident(name: &str) -> Result<Operand, EvaluationError> {
    match name {
        "true" => return Ok(Operand::Value(Expr::Literal(Literal::Bool(true)))),
        "false" => return Ok(Operand::Value(Expr::Literal(Literal::Bool(false)))),
        _ => {}
    }

    let mut segments = name.split('.');
    let root = segments.next().unwrap_or_default();
    let path: Vec<String> = segments.map(str::to_string).collect();

    if is_namespace(root) {
        return Ok(Operand::Value(Expr::Field {
            root: root.to_string(),
            path,
        }));
    }
    if path.is_empty() && is_function(root) {
        return Ok(Operand::Function(root.to_string()));
    }
    Err(EvaluationError::UnknownFunction {
        name: root.to_string(),
    })
}
