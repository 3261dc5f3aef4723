//! The tree-walking evaluator: scope-walk attribute resolution, cycle detection, and
//! the recursion-depth guard, per SPEC_FULL.md §4.3.
//!
//! An evaluation carries two pieces of state beyond the expression tree itself: the
//! `my`/`target` records (`EvalContext`) and a `path` describing where, inside `my`,
//! the expression currently being evaluated lives. The path is how an attribute's
//! reference to a sibling gets resolved by walking back up towards `my`'s root rather
//! than only looking in the record the reference's own expression happens to sit in.

use std::sync::Arc;

use crate::ast::{Expression, ScopeKind};
use crate::record::Record;
use crate::value::Value;

/// `my` and (optionally) `target`, threaded through the whole evaluation.
struct EvalContext<'a> {
    my: Option<&'a Record>,
    target: Option<&'a Record>,
}

/// Cycle-detection stack and recursion depth counter for one top-level `evaluate` call.
struct RecursionGuard {
    visiting: Vec<(usize, Arc<str>)>,
    depth: usize,
}

impl RecursionGuard {
    const LIMIT: usize = 256;

    fn new() -> Self {
        Self { visiting: Vec::new(), depth: 0 }
    }
}

impl Expression {
    /// Evaluate this expression. `path` is the attribute-name chain from `my`'s root
    /// to this expression's enclosing record, used to seed the scope walk for any
    /// unqualified name the expression references directly (an empty path means "this
    /// expression isn't nested inside any record", e.g. a one-off parsed expression).
    pub fn evaluate(&self, path: &[&str], my: Option<&Record>, target: Option<&Record>) -> Value {
        let owned_path: Vec<Arc<str>> = path.iter().map(|s| Arc::from(*s)).collect();
        let ctx = EvalContext { my, target };
        let mut guard = RecursionGuard::new();
        eval_inner(self, &owned_path, &ctx, &mut guard)
    }
}

impl Record {
    /// Evaluate one of this record's own attributes, as if this record were `my`
    /// (unless an explicit `my` override is given — e.g. when re-evaluating a nested
    /// record on its own terms). `name` may be a dotted key (`"b.d.f"`), walked the
    /// same way a parsed `Dotted` expression would be: the first segment via the
    /// scope walk, the rest strictly inside whatever record that resolved to.
    pub fn evaluate(&self, name: &str, my: Option<&Record>, target: Option<&Record>) -> Value {
        let my = my.unwrap_or(self);
        let ctx = EvalContext { my: Some(my), target };
        let mut guard = RecursionGuard::new();
        let segments: Vec<Arc<str>> = name.split('.').map(Arc::from).collect();
        eval_dotted(&segments, &[], &ctx, &mut guard)
    }
}

fn eval_inner(expr: &Expression, path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    if guard.depth >= RecursionGuard::LIMIT {
        return Value::Error;
    }
    guard.depth += 1;
    let result = eval_body(expr, path, ctx, guard);
    guard.depth -= 1;
    result
}

fn eval_body(expr: &Expression, path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    match expr {
        Expression::Literal(v) => v.clone(),
        Expression::AttrRef(name) => resolve_attr(name, path, ctx, guard).0,
        Expression::Dotted(names) => eval_dotted(names, path, ctx, guard),
        // Resolution begins at my's root: equivalent to a Dotted chain evaluated with
        // an empty path, since an empty path is exactly "start the scope walk at root".
        Expression::AbsoluteRef(names) => eval_dotted(names, &[], ctx, guard),
        Expression::ScopeRef(kind, names) => eval_scope_ref(*kind, names, ctx, guard),
        Expression::Subscript(base, index) => eval_subscript(base, index, path, ctx, guard),
        Expression::Call(name, args) => eval_call(name, args, path, ctx, guard),
        Expression::Unary(op, operand) => crate::value::unary(*op, &eval_inner(operand, path, ctx, guard)),
        Expression::Binary(op, l, r) => {
            let lv = eval_inner(l, path, ctx, guard);
            let rv = eval_inner(r, path, ctx, guard);
            crate::value::binary(*op, lv, rv)
        }
        Expression::Ternary(cond, then, els) => {
            let c = eval_inner(cond, path, ctx, guard);
            eval_ternary(c, then.as_deref(), els, path, ctx, guard)
        }
        Expression::ListLit(items) => Value::List(items.iter().map(|e| eval_inner(e, path, ctx, guard)).collect()),
        Expression::RecordLit(r) => Value::Record(r.clone()),
    }
}

// region:    --- Scope walk

/// Follows nested `RecordLit` literals down from `root`, one name per path segment.
/// Only ever used to re-find the static nesting structure rooted at `my`; an
/// attribute whose value isn't itself a literal nested record just ends the descent.
fn navigate<'a>(root: &'a Record, path: &[Arc<str>]) -> Option<&'a Record> {
    let mut cur = root;
    for name in path {
        match cur.get(name) {
            Some(Expression::RecordLit(r)) => cur = r,
            _ => return None,
        }
    }
    Some(cur)
}

/// Evaluate one `(record, name)` pair's attribute expression, guarding against cycles
/// via the record's address plus the case-folded name.
fn eval_attribute(record: &Record, name: &str, path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    let Some(expr) = record.get(name) else {
        return Value::Undefined;
    };
    let key = (record.identity(), Arc::<str>::from(name.to_ascii_lowercase()));
    if guard.visiting.iter().any(|(id, n)| *id == key.0 && n.as_ref() == key.1.as_ref()) {
        return Value::Undefined;
    }
    guard.visiting.push(key);
    let result = eval_inner(expr, path, ctx, guard);
    guard.visiting.pop();
    result
}

/// The five-step scope walk (SPEC_FULL.md §4.3): search `my`'s record at `path`, then
/// its enclosing records in turn back to the root, then fall over to `target`.
/// Returns the found path within `my` alongside the value, so `Dotted`'s tail can
/// keep extending it (that's what lets a deeply nested attribute's sibling references
/// keep ascending correctly instead of resolving only within the immediate record).
fn resolve_attr(name: &str, path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> (Value, Option<Vec<Arc<str>>>) {
    if let Some(my) = ctx.my {
        let mut len = path.len();
        loop {
            if let Some(record) = navigate(my, &path[..len]) {
                if record.contains(name) {
                    let found_path = path[..len].to_vec();
                    let v = eval_attribute(record, name, &found_path, ctx, guard);
                    return (v, Some(found_path));
                }
            }
            if len == 0 {
                break;
            }
            len -= 1;
        }
    }
    if let Some(target) = ctx.target {
        if target.contains(name) {
            let fresh_ctx = EvalContext { my: Some(target), target: ctx.target };
            let v = eval_attribute(target, name, &[], &fresh_ctx, guard);
            return (v, None);
        }
    }
    (Value::Undefined, None)
}

/// `a.b.c`: `a` via the full scope walk, then `b`, `c` strictly inside whatever record
/// resolved — extending the static path when the chain is still rooted inside `my`'s
/// literal nesting, otherwise falling back to a fresh self-contained scope (no further
/// ascend, no target fallback) once the chain runs through a value that isn't part of
/// that static structure.
fn eval_dotted(names: &[Arc<str>], path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    let (first, rest) = names.split_first().expect("Dotted always has at least one name");
    let (mut current, head_record_path) = resolve_attr(first, path, ctx, guard);
    // `current_value_path` tracks where *current*'s own value would sit within my's
    // static nesting, so the next step's lookup still uses the right ascend position.
    let mut current_value_path: Option<Vec<Arc<str>>> = head_record_path.map(|mut p| {
        p.push(first.clone());
        p
    });
    for name in rest {
        current = match current {
            Value::Record(r) => {
                if !r.contains(name) {
                    Value::Undefined
                } else if let Some(p) = &current_value_path {
                    let v = eval_attribute(&r, name, p, ctx, guard);
                    let mut updated = p.clone();
                    updated.push(name.clone());
                    current_value_path = Some(updated);
                    v
                } else {
                    let fresh_ctx = EvalContext { my: Some(&r), target: None };
                    eval_attribute(&r, name, &[], &fresh_ctx, guard)
                }
            }
            Value::Undefined => Value::Undefined,
            Value::Error => Value::Error,
            _ => Value::Error,
        };
    }
    current
}

/// `my.a.b` / `target.a.b` / `parent...` / `super...`: resolution starts at the named
/// peer's own root, descending strictly (no scope-walk ascend at any step).
fn eval_scope_ref(kind: ScopeKind, names: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    match kind {
        // Neither peer exists in this two-record (my/target) matchmaking model.
        ScopeKind::Parent | ScopeKind::Super => Value::Undefined,
        ScopeKind::My => match ctx.my {
            Some(my) => eval_record_path(my, names, ctx, guard),
            None => Value::Undefined,
        },
        ScopeKind::Target => match ctx.target {
            Some(target) => {
                let fresh_ctx = EvalContext { my: Some(target), target: ctx.target };
                eval_record_path(target, names, &fresh_ctx, guard)
            }
            None => Value::Undefined,
        },
    }
}

fn eval_record_path(root: &Record, names: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    let (first, rest) = match names.split_first() {
        Some(pair) => pair,
        // A bare scope keyword with no trailing `.name` folds to Literal(Undefined)
        // in the parser and never reaches here.
        None => return Value::Undefined,
    };
    if !root.contains(first) {
        return Value::Undefined;
    }
    let mut path: Vec<Arc<str>> = Vec::new();
    let mut current = eval_attribute(root, first, &path, ctx, guard);
    path.push(first.clone());
    for name in rest {
        current = match current {
            Value::Record(r) => {
                if !r.contains(name) {
                    Value::Undefined
                } else {
                    let v = eval_attribute(&r, name, &path, ctx, guard);
                    path.push(name.clone());
                    v
                }
            }
            Value::Undefined => Value::Undefined,
            Value::Error => Value::Error,
            _ => Value::Error,
        };
    }
    current
}

// endregion: --- Scope walk

// region:    --- Subscript, ternary, calls

/// `base[index]`, the generic form (list indexing, or an arbitrary record value's
/// field access). A record reached this way gets a fresh, self-contained scope for
/// its own attribute resolution — there is no static path to extend here, unlike the
/// literal `.name` chains `Dotted` handles.
fn eval_subscript(base: &Expression, index: &Expression, path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    match eval_inner(base, path, ctx, guard) {
        Value::Undefined => Value::Undefined,
        Value::Error => Value::Error,
        Value::List(items) => match eval_inner(index, path, ctx, guard) {
            Value::Undefined => Value::Undefined,
            Value::Error => Value::Error,
            Value::Int(i) if i >= 0 && (i as usize) < items.len() => items[i as usize].clone(),
            Value::Int(_) => Value::Error,
            _ => Value::Error,
        },
        Value::Record(r) => match eval_inner(index, path, ctx, guard) {
            Value::Undefined => Value::Undefined,
            Value::Error => Value::Error,
            Value::Str(name) => {
                if r.contains(&name) {
                    let fresh_ctx = EvalContext { my: Some(&r), target: None };
                    eval_attribute(&r, &name, &[], &fresh_ctx, guard)
                } else {
                    Value::Undefined
                }
            }
            _ => Value::Error,
        },
        _ => Value::Error,
    }
}

fn eval_ternary(
    cond: Value,
    then: Option<&Expression>,
    els: &Expression,
    path: &[Arc<str>],
    ctx: &EvalContext,
    guard: &mut RecursionGuard,
) -> Value {
    match cond {
        Value::Undefined => match then {
            Some(_) => Value::Undefined,
            None => eval_inner(els, path, ctx, guard),
        },
        Value::Bool(true) => match then {
            Some(t) => eval_inner(t, path, ctx, guard),
            // Elvis form `c ?: e` with no `then`: a true condition returns its own
            // value rather than evaluating anything further.
            None => Value::Bool(true),
        },
        Value::Bool(false) => eval_inner(els, path, ctx, guard),
        Value::Error => Value::Error,
        _ => Value::Error,
    }
}

fn eval_call(name: &str, args: &[Expression], path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    if name.eq_ignore_ascii_case("ifThenElse") {
        return eval_if_then_else(args, path, ctx, guard);
    }
    if name.eq_ignore_ascii_case("eval") {
        return eval_eval_builtin(args, path, ctx, guard);
    }
    if name.eq_ignore_ascii_case("unparse") {
        return eval_unparse_builtin(args);
    }
    let values: Vec<Value> = args.iter().map(|a| eval_inner(a, path, ctx, guard)).collect();
    crate::builtins::call(name, &values)
}

fn eval_if_then_else(args: &[Expression], path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    if args.len() != 3 {
        return Value::Error;
    }
    match eval_inner(&args[0], path, ctx, guard) {
        Value::Undefined => Value::Undefined,
        Value::Error | Value::Str(_) | Value::List(_) | Value::Record(_) => Value::Error,
        Value::Bool(false) | Value::Int(0) => eval_inner(&args[2], path, ctx, guard),
        Value::Real(r) if r == 0.0 => eval_inner(&args[2], path, ctx, guard),
        Value::Bool(true) | Value::Int(_) | Value::Real(_) => eval_inner(&args[1], path, ctx, guard),
    }
}

/// `eval(s)`: parse `s` as a fresh expression and evaluate it under the *current*
/// `my`/`target` but detached from the enclosing path (it isn't nested in any record).
fn eval_eval_builtin(args: &[Expression], path: &[Arc<str>], ctx: &EvalContext, guard: &mut RecursionGuard) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    match eval_inner(&args[0], path, ctx, guard) {
        Value::Str(s) => match crate::parser::parse(&s) {
            Ok(expr) => eval_inner(&expr, &[], ctx, guard),
            Err(_) => Value::Error,
        },
        Value::Undefined => Value::Undefined,
        Value::Error => Value::Error,
        _ => Value::Error,
    }
}

/// `unparse(e)`: the textual form of the *unevaluated* argument expression.
fn eval_unparse_builtin(args: &[Expression]) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    Value::str(args[0].to_string())
}

// endregion: --- Subscript, ternary, calls

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn record(src: &str) -> Record {
        match parse(src).unwrap() {
            Expression::RecordLit(r) => r,
            other => panic!("expected a record literal, got {other:?}"),
        }
    }

    #[test]
    fn simple_arithmetic_and_undefined_propagation() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Int(7));

        let expr = parse("a + 1").unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Undefined);
    }

    #[test]
    fn sibling_reference_ascends_through_nested_records() {
        let r = record("[a=3;b=[c=1;d=[e=5;f=a+c+e]]]");
        let expr = parse("b.d.f").unwrap();
        assert_eq!(expr.evaluate(&[], Some(&r), None), Value::Int(9));
    }

    #[test]
    fn record_evaluate_accepts_a_dotted_key() {
        let r = record("[a=3;b=[c=1;d=[e=5;f=a+c+e]]]");
        assert_eq!(r.evaluate("b.d.f", None, None), Value::Int(9));

        let r = record("[a=3;b=[a=2;c=1;d=[e=5;f=a+c+e]]]");
        assert_eq!(r.evaluate("b.d.f", None, None), Value::Int(8));

        let r = record("[a=3;b=[a=2;c=1;d=[e=5;f=a+b+c]]]");
        assert_eq!(r.evaluate("b.d.f", None, None), Value::Error);
    }

    #[test]
    fn direct_cycle_resolves_to_undefined() {
        let r = record("[a=b;b=a]");
        assert_eq!(r.evaluate("a", None, None), Value::Undefined);
    }

    #[test]
    fn matchmaking_rank_reads_target_attributes() {
        let my = record("[Rank = TARGET.Memory + TARGET.Mips]");
        let target = record("[Memory = 1024; Mips = 50]");
        assert_eq!(my.evaluate("Rank", None, Some(&target)), Value::Int(1074));
    }

    #[test]
    fn scope_walk_falls_over_to_target_when_my_lacks_the_name() {
        let my = record("[Requirements = Other]");
        let target = record("[Other = true]");
        assert_eq!(my.evaluate("Requirements", None, Some(&target)), Value::Bool(true));
    }

    #[test]
    fn elvis_form_short_circuits_on_undefined() {
        let expr = parse("undefinedAttr ?: 1").unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Int(1));
    }

    #[test]
    fn if_then_else_is_lazy_in_the_untaken_branch() {
        // the untaken branch divides by zero; laziness means it never gets evaluated.
        let expr = parse("ifThenElse(true, 1, 1/0)").unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Int(1));
    }

    #[test]
    fn unparse_does_not_evaluate_its_argument() {
        let expr = parse("unparse(1/0)").unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::str("(1 / 0)"));
    }

    #[test]
    fn eval_builtin_parses_and_evaluates_a_string() {
        let expr = parse(r#"eval("2 + 2")"#).unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Int(4));
    }

    #[test]
    fn deep_attribute_chain_past_the_recursion_limit_yields_error() {
        let mut attrs = String::new();
        for i in 0..300 {
            attrs.push_str(&format!("a{} = a{}; ", i, i + 1));
        }
        attrs.push_str("a300 = 1");
        let r = record(&format!("[{attrs}]"));
        assert_eq!(r.evaluate("a0", None, None), Value::Error);
    }

    #[test]
    fn subscript_into_list_and_record() {
        let expr = parse("{10, 20, 30}[1]").unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Int(20));

        let expr = parse(r#"[a = 5]["a"]"#).unwrap();
        assert_eq!(expr.evaluate(&[], None, None), Value::Int(5));
    }
}
