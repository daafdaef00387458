//! Partial evaluation of expressions against [`PlanningFacts`].
//!
//! Anything that does not depend on an execution-time namespace is folded to
//! a [`Value`]. The rest is rebuilt as a smaller [`Expr`] with every
//! known sub-expression replaced by its literal.

use std::cmp::Ordering;

use fleet_core::glob;

use crate::ast::{Expr, Part, Template, Value};
use crate::context::PlanningFacts;
use crate::error::{type_err, EvaluationError};

/// Functions callable from an action.
pub const FUNCTIONS: &[&str] = &[
    "eq", "ne", "lt", "le", "gt", "ge", "not", "and", "or", "len", "matches", "join", "join_if",
    "split", "replace",
];

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

/// Result of evaluating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partial {
    Known(Value),
    Residual(Expr),
}

/// Evaluate every action in `template`, keeping the ones that cannot be
/// decided yet. Adjacent text is merged.
pub fn eval_template(
    template: &Template,
    facts: &PlanningFacts,
) -> Result<Template, EvaluationError> {
    let mut parts: Vec<Part> = Vec::with_capacity(template.parts.len());
    for part in &template.parts {
        let next = match part {
            Part::Text(t) => Part::Text(t.clone()),
            Part::Action(expr) => match eval_expr(expr, facts)? {
                Partial::Known(v) => Part::Text(v.render()),
                Partial::Residual(e) => Part::Action(e),
            },
        };
        match (parts.last_mut(), next) {
            (Some(Part::Text(prev)), Part::Text(t)) => prev.push_str(&t),
            (_, next) => parts.push(next),
        }
    }
    Ok(Template { parts })
}

pub fn eval_expr(expr: &Expr, facts: &PlanningFacts) -> Result<Partial, EvaluationError> {
    match expr {
        Expr::Literal(lit) => Ok(Partial::Known(lit.into())),
        Expr::Field { root, path } => Ok(match facts.lookup(root, path)? {
            Some(v) => Partial::Known(v),
            None => Partial::Residual(expr.clone()),
        }),
        Expr::Call { name, args } => {
            let function = FUNCTIONS
                .iter()
                .copied()
                .find(|f| *f == name)
                .ok_or_else(|| EvaluationError::UnknownFunction { name: name.clone() })?;
            check_arity(function, args.len())?;
            match function {
                "and" => logical(function, args, facts, false),
                "or" => logical(function, args, facts, true),
                _ => call(function, args, facts),
            }
        }
    }
}

fn check_arity(function: &'static str, got: usize) -> Result<(), EvaluationError> {
    let (min, max, expected) = match function {
        "eq" => (2, usize::MAX, "at least 2"),
        "ne" | "lt" | "le" | "gt" | "ge" | "matches" | "join" | "split" => (2, 2, "2"),
        "not" | "len" => (1, 1, "1"),
        "and" | "or" | "join_if" => (1, usize::MAX, "at least 1"),
        "replace" => (3, 3, "3"),
        _ => (0, usize::MAX, "any"),
    };
    if got < min || got > max {
        return Err(EvaluationError::Arity {
            function,
            expected,
            got,
        });
    }
    Ok(())
}

/// Source form of an evaluated argument. Lists have no literal form, so the
/// original expression is kept for them.
fn to_arg(partial: Partial, original: &Expr) -> Expr {
    match partial {
        Partial::Known(v) => v
            .to_literal()
            .map(Expr::Literal)
            .unwrap_or_else(|| original.clone()),
        Partial::Residual(e) => e,
    }
}

/// `and` returns its first falsy operand (or the last), `or` its first truthy
/// operand (or the last). `stop_on` is the truthiness that ends the scan.
fn logical(
    function: &'static str,
    args: &[Expr],
    facts: &PlanningFacts,
    stop_on: bool,
) -> Result<Partial, EvaluationError> {
    let mut residual: Vec<Expr> = Vec::new();
    let last = args.len() - 1;

    for (i, arg) in args.iter().enumerate() {
        match eval_expr(arg, facts)? {
            Partial::Known(v) if v.is_truthy() == stop_on || i == last => {
                if residual.is_empty() {
                    return Ok(Partial::Known(v));
                }
                residual.push(to_arg(Partial::Known(v), arg));
                break;
            }
            // Known and not deciding: the scan always continues past it.
            Partial::Known(_) => {}
            Partial::Residual(e) => residual.push(e),
        }
    }

    if residual.len() == 1 {
        return Ok(Partial::Residual(residual.remove(0)));
    }
    Ok(Partial::Residual(Expr::Call {
        name: function.to_string(),
        args: residual,
    }))
}

fn call(
    function: &'static str,
    args: &[Expr],
    facts: &PlanningFacts,
) -> Result<Partial, EvaluationError> {
    let evaluated = args
        .iter()
        .map(|a| eval_expr(a, facts))
        .collect::<Result<Vec<_>, _>>()?;

    if evaluated.iter().all(|p| matches!(p, Partial::Known(_))) {
        let values: Vec<Value> = evaluated
            .into_iter()
            .filter_map(|p| match p {
                Partial::Known(v) => Some(v),
                Partial::Residual(_) => None,
            })
            .collect();
        return apply(function, &values).map(Partial::Known);
    }

    Ok(Partial::Residual(Expr::Call {
        name: function.to_string(),
        args: evaluated
            .into_iter()
            .zip(args)
            .map(|(p, original)| to_arg(p, original))
            .collect(),
    }))
}

// ---------------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------------

fn apply(function: &'static str, args: &[Value]) -> Result<Value, EvaluationError> {
    match function {
        "eq" => {
            let (first, rest) = (&args[0], &args[1..]);
            for other in rest {
                if equal(function, first, other)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "ne" => Ok(Value::Bool(!equal(function, &args[0], &args[1])?)),
        "lt" => order(function, &args[0], &args[1]).map(|o| Value::Bool(o.is_lt())),
        "le" => order(function, &args[0], &args[1]).map(|o| Value::Bool(o.is_le())),
        "gt" => order(function, &args[0], &args[1]).map(|o| Value::Bool(o.is_gt())),
        "ge" => order(function, &args[0], &args[1]).map(|o| Value::Bool(o.is_ge())),
        "not" => Ok(Value::Bool(!args[0].is_truthy())),
        "len" => match &args[0] {
            Value::Str(s) => Ok(Value::Int(s.len() as i64)),
            Value::List(l) => Ok(Value::Int(l.len() as i64)),
            other => Err(type_err(
                function,
                format!("len of type {}", other.type_name()),
            )),
        },
        "matches" => {
            let text = string(function, &args[0])?;
            let pattern = string(function, &args[1])?;
            glob::matches(pattern, text)
                .map(Value::Bool)
                .map_err(|source| EvaluationError::Glob {
                    pattern: pattern.to_string(),
                    source,
                })
        }
        "join" => {
            let sep = string(function, &args[1])?;
            match &args[0] {
                Value::List(items) => Ok(Value::Str(items.join(sep))),
                other => Err(type_err(
                    function,
                    format!("expected list, got {}", other.type_name()),
                )),
            }
        }
        "join_if" => {
            let sep = string(function, &args[0])?;
            let mut kept = Vec::new();
            for v in &args[1..] {
                let s = string(function, v)?;
                if !s.is_empty() {
                    kept.push(s);
                }
            }
            Ok(Value::Str(kept.join(sep)))
        }
        "split" => {
            let s = string(function, &args[0])?;
            let sep = string(function, &args[1])?;
            Ok(Value::List(s.split(sep).map(str::to_string).collect()))
        }
        "replace" => {
            let s = string(function, &args[0])?;
            let old = string(function, &args[1])?;
            let new = string(function, &args[2])?;
            Ok(Value::Str(s.replace(old, new)))
        }
        other => Err(EvaluationError::UnknownFunction {
            name: other.to_string(),
        }),
    }
}

fn string<'v>(function: &'static str, v: &'v Value) -> Result<&'v str, EvaluationError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(type_err(
            function,
            format!("expected string, got {}", other.type_name()),
        )),
    }
}

fn equal(function: &'static str, a: &Value, b: &Value) -> Result<bool, EvaluationError> {
    match (a, b) {
        (Value::List(_), _) | (_, Value::List(_)) => {
            Err(type_err(function, "non-comparable type list"))
        }
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (x, y) => Err(type_err(
            function,
            format!(
                "incompatible types for comparison: {} and {}",
                x.type_name(),
                y.type_name()
            ),
        )),
    }
}

fn order(function: &'static str, a: &Value, b: &Value) -> Result<Ordering, EvaluationError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Bool(_), _) | (Value::List(_), _) => Err(type_err(
            function,
            format!("invalid type for comparison: {}", a.type_name()),
        )),
        (x, y) => Err(type_err(
            function,
            format!(
                "incompatible types for comparison: {} and {}",
                x.type_name(),
                y.type_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;
    use crate::parser::parse;

    fn facts() -> PlanningFacts {
        PlanningFacts {
            repository_name: "github.com/acme/widgets".into(),
            search_result_paths: vec!["go.mod".into(), "api/go.mod".into()],
            batch_change_name: "imports".into(),
            batch_change_description: String::new(),
        }
    }

    fn eval(src: &str) -> Result<Template, EvaluationError> {
        eval_template(&parse(src)?, &facts())
    }

    fn text(src: &str) -> String {
        eval(src).expect("eval").to_string()
    }

    #[test]
    fn folds_known_fields() {
        assert_eq!(text("${{ repository.name }}"), "github.com/acme/widgets");
        assert_eq!(text("${{ len repository.search_result_paths }}"), "2");
        assert_eq!(text("${{ join repository.search_result_paths \",\" }}"), "go.mod,api/go.mod");
        assert_eq!(text("${{ repository.search_result_paths }}"), "[go.mod api/go.mod]");
    }

    #[test]
    fn string_functions() {
        assert_eq!(text(r#"${{ replace "a-b-c" "-" "/" }}"#), "a/b/c");
        assert_eq!(text(r#"${{ join_if "-" "a" "" "b" }}"#), "a-b");
        assert_eq!(text(r#"${{ len (split "a/b/c" "/") }}"#), "3");
    }

    #[test]
    fn comparisons() {
        assert_eq!(text("${{ eq 1 2 1 }}"), "true");
        assert_eq!(text(r#"${{ ne "a" "b" }}"#), "true");
        assert_eq!(text("${{ lt 1 2 }}"), "true");
        assert_eq!(text(r#"${{ ge "a" "b" }}"#), "false");
        assert!(matches!(
            eval(r#"${{ eq 1 "1" }}"#).unwrap_err(),
            EvaluationError::Type { .. }
        ));
    }

    #[test]
    fn matches_takes_text_then_pattern() {
        assert_eq!(text(r#"${{ matches repository.name "github.com/acme/*" }}"#), "true");
        assert_eq!(text(r#"${{ matches repository.name "horse" }}"#), "false");
    }

    #[test]
    fn runtime_reference_is_kept() {
        let tpl = eval(r#"${{ eq outputs.value "foobar" }}"#).expect("eval");
        assert!(!tpl.is_static());
        assert_eq!(tpl.to_string(), r#"${{ eq outputs.value "foobar" }}"#);
    }

    #[test]
    fn known_subexpressions_fold_inside_residual() {
        let tpl = eval(r#"${{ eq outputs.value repository.name }}"#).expect("eval");
        assert_eq!(
            tpl.to_string(),
            r#"${{ eq outputs.value "github.com/acme/widgets" }}"#
        );
    }

    #[test]
    fn and_short_circuits_on_known_falsy() {
        assert_eq!(text("${{ and false outputs.ok }}"), "false");
        assert_eq!(text("${{ or true outputs.ok }}"), "true");
    }

    #[test]
    fn and_drops_known_truthy_operands() {
        let tpl = eval("${{ and (eq 1 1) outputs.ok }}").expect("eval");
        assert_eq!(tpl.to_string(), "${{ outputs.ok }}");

        let tpl = eval("${{ or false outputs.ok (not outputs.ok) }}").expect("eval");
        assert_eq!(tpl.to_string(), "${{ or outputs.ok (not outputs.ok) }}");
    }

    #[test]
    fn deciding_operand_after_residual_ends_scan() {
        let tpl = eval("${{ and outputs.ok false outputs.other }}").expect("eval");
        assert_eq!(tpl.to_string(), "${{ and outputs.ok false }}");
    }

    #[test]
    fn arity_is_checked_even_when_deferred() {
        let err = eval("${{ not outputs.a outputs.b }}").unwrap_err();
        assert!(matches!(err, EvaluationError::Arity { function: "not", .. }), "got: {err}");
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = eval(r#"${{ matches repository.name "[" }}"#).unwrap_err();
        assert!(matches!(err, EvaluationError::Glob { .. }), "got: {err}");
    }

    #[test]
    fn manual_unknown_call_is_rejected() {
        let expr = Expr::Call {
            name: "nope".into(),
            args: vec![Expr::Literal(Literal::Int(1))],
        };
        assert!(matches!(
            eval_expr(&expr, &facts()).unwrap_err(),
            EvaluationError::UnknownFunction { .. }
        ));
    }
}
