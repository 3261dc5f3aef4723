//! Parsing: `pest`-driven tokenization of `src/classad.pest`, and the `build_*`
//! tree-walk that folds the resulting parse tree into an `Expression`.

use std::sync::Arc;

use pest::iterators::Pair;
use pest::Parser;

use crate::ast::{BinaryOp, Expression, ScopeKind, UnaryOp};
use crate::error::ParseError;
use crate::record::Record;
use crate::value::Value;

#[derive(pest_derive::Parser)]
#[grammar = "classad.pest"]
pub struct ClassAdParser;

type BuildResult = Result<Expression, ParseError>;

/// Parse ClassAd source text (a standalone expression, a bracketed record, or a
/// stream-form attribute list) into an `Expression`.
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    let mut pairs = ClassAdParser::parse(Rule::program, text)?;
    let program = pairs.next().expect("program rule always produces a pair on success");
    let body = program
        .into_inner()
        .next()
        .expect("program always has a body before EOI");
    match body.as_rule() {
        Rule::stream_form => Ok(Expression::RecordLit(build_attrs(body)?)),
        Rule::expression => build_expression(body),
        other => unreachable!("unexpected top-level rule: {other:?}"),
    }
}

fn reserved_error(name: &str) -> ParseError {
    ParseError {
        message: format!("'{name}' is a reserved word and cannot be used as an attribute name"),
        line: 0,
        column: 0,
    }
}

/// Shared by `record` (bracketed) and `stream_form` (bracket-less): both are just a
/// sequence of `attr_def` children.
fn build_attrs(pair: Pair<Rule>) -> Result<Record, ParseError> {
    let mut record = Record::new();
    for attr in pair.into_inner() {
        let mut inner = attr.into_inner();
        let name_pair = inner.next().expect("attr_def always has a name");
        let expr_pair = inner.next().expect("attr_def always has a value expression");
        let name = attribute_name_text(&name_pair);
        let expr = build_expression(expr_pair)?;
        record.insert(&name, expr).map_err(|_| reserved_error(&name))?;
    }
    Ok(record)
}

fn attribute_name_text(pair: &Pair<Rule>) -> String {
    let raw = pair.as_str();
    match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => unescape_backslashes(quoted),
        None => raw.to_string(),
    }
}

fn unescape_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn build_expression(pair: Pair<Rule>) -> BuildResult {
    let mut inner = pair.into_inner();
    let or_pair = inner.next().expect("expression always has a logical_or");
    let cond = build_logical_or(or_pair)?;
    match inner.next() {
        None => Ok(cond),
        Some(tail) => {
            let mut tail_inner = tail.into_inner();
            let first = tail_inner.next().expect("ternary_tail always has an else/then branch");
            match tail_inner.next() {
                Some(second) => {
                    let then = build_expression(first)?;
                    let els = build_expression(second)?;
                    Ok(Expression::Ternary(Box::new(cond), Some(Box::new(then)), Box::new(els)))
                }
                None => {
                    let els = build_expression(first)?;
                    Ok(Expression::Ternary(Box::new(cond), None, Box::new(els)))
                }
            }
        }
    }
}

macro_rules! left_assoc_level {
    ($name:ident, $next:ident, $op_rule:path, $op_of:expr) => {
        fn $name(pair: Pair<Rule>) -> BuildResult {
            let mut inner = pair.into_inner();
            let mut expr = $next(inner.next().expect("level always has one operand"))?;
            loop {
                let Some(op_pair) = inner.next() else { break };
                debug_assert_eq!(op_pair.as_rule(), $op_rule);
                let op = $op_of(op_pair.as_str());
                let rhs_pair = inner.next().expect("binary operator always has a right operand");
                let rhs = $next(rhs_pair)?;
                expr = Expression::Binary(op, Box::new(expr), Box::new(rhs));
            }
            Ok(expr)
        }
    };
}

left_assoc_level!(build_logical_or, build_logical_and, Rule::or_op, |_| BinaryOp::Or);
left_assoc_level!(build_logical_and, build_equality, Rule::and_op, |_| BinaryOp::And);
left_assoc_level!(build_equality, build_relational, Rule::eq_op, eq_op_to_binop);
left_assoc_level!(build_relational, build_additive, Rule::rel_op, rel_op_to_binop);
left_assoc_level!(build_additive, build_multiplicative, Rule::add_op, add_op_to_binop);
left_assoc_level!(build_multiplicative, build_unary, Rule::mul_op, mul_op_to_binop);

fn eq_op_to_binop(text: &str) -> BinaryOp {
    match text {
        "=?=" => BinaryOp::Is,
        "=!=" => BinaryOp::Isnt,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        other if other.eq_ignore_ascii_case("isnt") => BinaryOp::Isnt,
        other if other.eq_ignore_ascii_case("is") => BinaryOp::Is,
        other => unreachable!("unexpected eq_op text: {other}"),
    }
}

fn rel_op_to_binop(text: &str) -> BinaryOp {
    match text {
        "<=" => BinaryOp::Le,
        ">=" => BinaryOp::Ge,
        "<" => BinaryOp::Lt,
        ">" => BinaryOp::Gt,
        other => unreachable!("unexpected rel_op text: {other}"),
    }
}

fn add_op_to_binop(text: &str) -> BinaryOp {
    match text {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        other => unreachable!("unexpected add_op text: {other}"),
    }
}

fn mul_op_to_binop(text: &str) -> BinaryOp {
    match text {
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        other => unreachable!("unexpected mul_op text: {other}"),
    }
}

fn build_unary(pair: Pair<Rule>) -> BuildResult {
    let mut inner = pair.into_inner();
    let first = inner.next().expect("unary always has at least one child");
    match first.as_rule() {
        Rule::unary_op => {
            let op = if first.as_str() == "!" { UnaryOp::Not } else { UnaryOp::Neg };
            let operand_pair = inner.next().expect("unary_op is always followed by an operand");
            let operand = build_unary(operand_pair)?;
            Ok(Expression::Unary(op, Box::new(operand)))
        }
        Rule::postfix => build_postfix(first),
        other => unreachable!("unexpected unary child: {other:?}"),
    }
}

/// The head of a postfix chain, before any `.name`/`[expr]` suffixes are folded in.
/// Kept distinct from `Expression` so the fold below can decide, once it sees the
/// first suffix, whether accumulated dotted names become a scope-walked `Dotted`
/// (for a plain name head) or a strictly-local chain of `Subscript`s (for anything
/// else), per SPEC_FULL.md §4.2/§4.3.
enum Head {
    Name(Arc<str>),
    Scope(ScopeKind),
    Expr(Expression),
}

fn build_postfix(pair: Pair<Rule>) -> BuildResult {
    let mut inner = pair.into_inner();
    let atom_pair = inner.next().expect("postfix always has an atom");
    let mut head = Some(classify_atom(atom_pair)?);
    let mut path: Vec<Arc<str>> = Vec::new();
    let mut current: Option<Expression> = None;

    for tail in inner {
        let step = tail.into_inner().next().expect("postfix_tail always wraps one step");
        match step.as_rule() {
            Rule::dot_tail => {
                let name_pair = step.into_inner().next().expect("dot_tail always has a name");
                let name: Arc<str> = attribute_name_text(&name_pair).into();
                if let Some(cur) = current.take() {
                    current = Some(Expression::Subscript(
                        Box::new(cur),
                        Box::new(Expression::Literal(Value::Str(name))),
                    ));
                } else if matches!(head, Some(Head::Name(_)) | Some(Head::Scope(_))) {
                    // Still accumulating a scope-walked/scope-rooted dotted path; the
                    // name joins `path` rather than forcing a strict Subscript.
                    path.push(name);
                } else {
                    // A dot directly off a non-name atom (record/list literal, call,
                    // parenthesized expression) has no scope-walk meaning: it's a
                    // strict field access, same as `[...]`.
                    let base = finalize_head(head.take().expect("head consumed only once"), std::mem::take(&mut path));
                    current = Some(Expression::Subscript(
                        Box::new(base),
                        Box::new(Expression::Literal(Value::Str(name))),
                    ));
                }
            }
            Rule::bracket_tail => {
                let expr_pair = step.into_inner().next().expect("bracket_tail always has an index");
                let index = build_expression(expr_pair)?;
                let base = match current.take() {
                    Some(cur) => cur,
                    None => finalize_head(head.take().expect("head consumed only once"), std::mem::take(&mut path)),
                };
                current = Some(Expression::Subscript(Box::new(base), Box::new(index)));
            }
            other => unreachable!("unexpected postfix_tail step: {other:?}"),
        }
    }

    Ok(current.unwrap_or_else(|| finalize_head(head.take().expect("head consumed only once"), path)))
}

fn finalize_head(head: Head, path: Vec<Arc<str>>) -> Expression {
    match head {
        Head::Name(name) => {
            if path.is_empty() {
                Expression::AttrRef(name)
            } else {
                let mut full = Vec::with_capacity(path.len() + 1);
                full.push(name);
                full.extend(path);
                Expression::Dotted(full)
            }
        }
        Head::Scope(kind) => {
            if path.is_empty() {
                // Bare `my`/`target`/`parent`/`super` with no further path: inert,
                // per SPEC_FULL.md §9.
                Expression::Literal(Value::Undefined)
            } else {
                Expression::ScopeRef(kind, path)
            }
        }
        Head::Expr(expr) => expr,
    }
}

fn classify_atom(pair: Pair<Rule>) -> Result<Head, ParseError> {
    Ok(match pair.as_rule() {
        Rule::identifier => {
            let text = pair.as_str();
            if text.eq_ignore_ascii_case("my") {
                Head::Scope(ScopeKind::My)
            } else {
                Head::Name(text.into())
            }
        }
        Rule::target_literal => Head::Scope(ScopeKind::Target),
        Rule::parent_literal => Head::Scope(ScopeKind::Parent),
        Rule::super_literal => Head::Scope(ScopeKind::Super),
        _ => Head::Expr(build_atom_literal(pair)?),
    })
}

fn build_atom_literal(pair: Pair<Rule>) -> BuildResult {
    match pair.as_rule() {
        Rule::boolean_literal => Ok(Expression::Literal(Value::Bool(pair.as_str().eq_ignore_ascii_case("true")))),
        Rule::error_literal => Ok(Expression::Literal(Value::Error)),
        Rule::undefined_literal => Ok(Expression::Literal(Value::Undefined)),
        Rule::real_literal => Ok(Expression::Literal(Value::Real(pair.as_str().parse().unwrap_or(f64::NAN)))),
        Rule::int_literal => Ok(Expression::Literal(parse_int_literal(pair.as_str()))),
        Rule::string_literal => Ok(Expression::Literal(Value::Str(unescape_string(pair.as_str()).into()))),
        Rule::record => Ok(Expression::RecordLit(build_attrs(pair)?)),
        Rule::list_literal => {
            let items = pair
                .into_inner()
                .map(build_expression)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expression::ListLit(items))
        }
        Rule::function_call => build_function_call(pair),
        Rule::absolute_ref => {
            let path = pair.into_inner().map(|p| Arc::from(p.as_str())).collect();
            Ok(Expression::AbsoluteRef(path))
        }
        Rule::expression => build_expression(pair),
        other => unreachable!("unexpected atom rule: {other:?}"),
    }
}

fn build_function_call(pair: Pair<Rule>) -> BuildResult {
    let mut inner = pair.into_inner();
    let name_pair = inner.next().expect("function_call always has a name");
    let name: Arc<str> = name_pair.as_str().into();
    let args = inner.map(build_expression).collect::<Result<Vec<_>, _>>()?;
    Ok(Expression::Call(name, args))
}

fn parse_int_literal(text: &str) -> Value {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8)
    } else {
        text.parse::<i64>()
    };
    parsed.map(Value::Int).unwrap_or(Value::Error)
}

fn unescape_string(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(d) if d.is_ascii_digit() => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(ch) = char::from_u32(value) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
