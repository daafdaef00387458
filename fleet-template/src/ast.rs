//! Expression tree for condition templates.
//!
//! A [`Template`] is a sequence of literal text and `${{ … }}` actions. Each
//! action holds one [`Expr`]. `Display` on both prints the canonical source
//! form, which is what a deferred condition carries to the runtime.

use std::fmt;

/// Parsed template: text interleaved with actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Action(Expr),
}

/// A literal that can appear in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Literal),
    /// `root.path.to.field`; `path` may be empty for a bare namespace.
    Field { root: String, path: Vec<String> },
    /// `name arg…`; pipelines are desugared into trailing arguments.
    Call { name: String, args: Vec<Expr> },
}

/// A fully evaluated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    /// `false`, `0`, `""` and empty lists are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Bool(b) => *b,
            Value::List(l) => !l.is_empty(),
        }
    }

    /// Text this value contributes when an action is rendered.
    pub fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(l) => format!("[{}]", l.join(" ")),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    /// The equivalent source literal, if this value has one.
    pub fn to_literal(&self) -> Option<Literal> {
        match self {
            Value::Str(s) => Some(Literal::Str(s.clone())),
            Value::Int(i) => Some(Literal::Int(*i)),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::List(_) => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Int(i) => Value::Int(*i),
            Literal::Bool(b) => Value::Bool(*b),
        }
    }
}

impl Template {
    /// True when no actions remain.
    pub fn is_static(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Part::Text(_)))
    }

    /// Concatenated text; actions render in source form.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

// ---------------------------------------------------------------------------
// Source printing
// ---------------------------------------------------------------------------

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Text(t) => f.write_str(t)?,
                Part::Action(e) => write!(f, "${{{{ {e} }}}}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => lit.fmt(f),
            Expr::Field { root, path } => {
                f.write_str(root)?;
                for seg in path {
                    write!(f, ".{seg}")?;
                }
                Ok(())
            }
            Expr::Call { name, args } => {
                f.write_str(name)?;
                for arg in args {
                    match arg {
                        Expr::Call { args: inner, .. } if !inner.is_empty() => {
                            write!(f, " ({arg})")?
                        }
                        _ => write!(f, " {arg}")?,
                    }
                }
                Ok(())
            }
        }
    }
}
