//! The fixed built-in function table (SPEC_FULL.md §4.4).
//!
//! `BuiltinsRegistry`/`BuiltinsProvider` keep the registration shape a larger host
//! integration would want (a provider just hands back a list of named closures),
//! narrowed to a single flat, unqualified-name table, since `Call` nodes in this
//! grammar carry no namespace. `ifThenElse`, `eval`, and `unparse` are not in this
//! table: they need access to the unevaluated AST and the evaluation context, and are
//! special-cased directly in `src/eval.rs`'s handling of `Call`.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use rand::Rng;

use crate::value::Value;

/// A built-in function signature. Total over the value lattice, never panics, never
/// an `Err` — unknown arity or a bad argument type just yields `Value::Error`.
pub type BuiltinFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Something that can hand a batch of named built-in functions to a registry. The
/// seam a host embedding this evaluator would use to add its own functions;
/// `CoreBuiltins` is the only implementor this crate ships.
pub trait BuiltinsProvider {
    fn functions(&self) -> Vec<(&'static str, BuiltinFn)>;
}

/// A fixed-name dispatch table from function name (case-insensitive) to implementation.
#[derive(Default)]
pub struct BuiltinsRegistry {
    functions: BTreeMap<String, BuiltinFn>,
}

impl BuiltinsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core() -> Self {
        let mut registry = Self::new();
        registry.register(&CoreBuiltins);
        registry
    }

    pub fn register(&mut self, provider: &dyn BuiltinsProvider) {
        for (name, f) in provider.functions() {
            self.functions.insert(name.to_ascii_lowercase(), f);
        }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Dispatch `name(args)`. An unregistered name yields `Error`, never panics.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        match self.functions.get(&name.to_ascii_lowercase()) {
            Some(f) => f(args),
            None => Value::Error,
        }
    }
}

static CORE_REGISTRY: OnceLock<BuiltinsRegistry> = OnceLock::new();

/// Entry point used by the evaluator for every `Call` node except the three
/// lazily-evaluated ones (`ifThenElse`, `eval`, `unparse`).
pub(crate) fn call(name: &str, args: &[Value]) -> Value {
    CORE_REGISTRY.get_or_init(BuiltinsRegistry::with_core).call(name, args)
}

/// The fixed-name built-ins required by SPEC_FULL.md §4.4.
pub struct CoreBuiltins;

impl BuiltinsProvider for CoreBuiltins {
    fn functions(&self) -> Vec<(&'static str, BuiltinFn)> {
        vec![
            ("isUndefined", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::Undefined)))),
            ("isError", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::Error)))),
            ("isString", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::Str(_))))),
            ("isInteger", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::Int(_))))),
            ("isReal", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::Real(_))))),
            ("isBoolean", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::Bool(_))))),
            ("isList", Arc::new(|a: &[Value]| type_predicate(a, |v| matches!(v, Value::List(_))))),
            ("int", Arc::new(coerce_int)),
            ("real", Arc::new(coerce_real)),
            ("string", Arc::new(coerce_string)),
            ("floor", Arc::new(|a: &[Value]| numeric_round(a, f64::floor))),
            ("ceiling", Arc::new(|a: &[Value]| numeric_round(a, f64::ceil))),
            ("round", Arc::new(|a: &[Value]| numeric_round(a, f64::round))),
            ("pow", Arc::new(builtin_pow)),
            ("quantize", Arc::new(builtin_quantize)),
            ("random", Arc::new(builtin_random)),
            ("strcat", Arc::new(builtin_strcat)),
            ("join", Arc::new(builtin_join)),
            ("split", Arc::new(builtin_split)),
            ("size", Arc::new(builtin_size)),
            ("substr", Arc::new(builtin_substr)),
            ("strcmp", Arc::new(|a: &[Value]| builtin_strcmp(a, false))),
            ("stricmp", Arc::new(|a: &[Value]| builtin_strcmp(a, true))),
            ("toUpper", Arc::new(|a: &[Value]| string_map(a, str::to_uppercase))),
            ("toLower", Arc::new(|a: &[Value]| string_map(a, str::to_lowercase))),
        ]
    }
}

// region:    --- Helpers

fn type_predicate(args: &[Value], pred: impl Fn(&Value) -> bool) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    Value::Bool(pred(&args[0]))
}

/// Undefined/Error propagation for the arithmetic-flavored built-ins: Error wins,
/// then Undefined, otherwise `None` (caller proceeds with real values).
fn propagate(args: &[Value]) -> Option<Value> {
    if args.iter().any(|a| matches!(a, Value::Error)) {
        return Some(Value::Error);
    }
    if args.iter().any(|a| matches!(a, Value::Undefined)) {
        return Some(Value::Undefined);
    }
    None
}

fn coerce_int(args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    match &args[0] {
        Value::Int(i) => Value::Int(*i),
        Value::Real(r) => Value::Int(r.trunc() as i64),
        Value::Bool(b) => Value::Int(i64::from(*b)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| Value::Int(f.trunc() as i64))
            .unwrap_or(Value::Error),
        _ => Value::Error,
    }
}

fn coerce_real(args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    match &args[0] {
        Value::Int(i) => Value::Real(*i as f64),
        Value::Real(r) => Value::Real(*r),
        Value::Bool(b) => Value::Real(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Real).unwrap_or(Value::Error),
        _ => Value::Error,
    }
}

fn coerce_string(args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    match &args[0] {
        Value::Str(s) => Value::Str(s.clone()),
        Value::Int(_) | Value::Real(_) | Value::Bool(_) => Value::str(args[0].to_string()),
        _ => Value::Error,
    }
}

fn numeric_round(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    if let Some(propagated) = propagate(args) {
        return propagated;
    }
    match &args[0] {
        Value::Int(i) => Value::Int(*i),
        Value::Real(r) => Value::Int(f(*r) as i64),
        _ => Value::Error,
    }
}

fn builtin_pow(args: &[Value]) -> Value {
    if args.len() != 2 {
        return Value::Error;
    }
    if let Some(propagated) = propagate(args) {
        return propagated;
    }
    match (args[0].as_f64(), args[1].as_f64()) {
        // Always a Real, even for two Ints, matching the original numeric tower.
        (Some(base), Some(exp)) => Value::Real(base.powf(exp)),
        _ => Value::Error,
    }
}

fn builtin_quantize(args: &[Value]) -> Value {
    if args.len() != 2 {
        return Value::Error;
    }
    if let Some(propagated) = propagate(&args[..1]) {
        return propagated;
    }
    let Some(a) = args[0].as_f64() else {
        return Value::Error;
    };
    match &args[1] {
        Value::Error => Value::Error,
        Value::Undefined => Value::Undefined,
        Value::Int(_) | Value::Real(_) => {
            let b = args[1].as_f64().unwrap();
            if b == 0.0 {
                return Value::Error;
            }
            let result = (a / b).ceil() * b;
            if matches!(args[1], Value::Int(_)) {
                Value::Int(result as i64)
            } else {
                Value::Real(result)
            }
        }
        Value::List(buckets) => quantize_against_buckets(a, buckets),
        _ => Value::Error,
    }
}

/// First bucket at or above `a` wins outright; past the last bucket, round `a` up to
/// the nearest multiple of that last bucket (its own size becomes the step).
fn quantize_against_buckets(a: f64, buckets: &[Value]) -> Value {
    if buckets.is_empty() {
        return Value::Error;
    }
    for bucket in buckets {
        let Some(b) = bucket.as_f64() else {
            return Value::Error;
        };
        if b >= a {
            return bucket.clone();
        }
    }
    let last = buckets.last().unwrap();
    let Some(step) = last.as_f64() else {
        return Value::Error;
    };
    if step == 0.0 {
        return Value::Error;
    }
    let multiple = (a / step).ceil() * step;
    if matches!(last, Value::Int(_)) {
        Value::Int(multiple as i64)
    } else {
        Value::Real(multiple)
    }
}

fn builtin_random(args: &[Value]) -> Value {
    match args.len() {
        0 => Value::Real(rand::thread_rng().gen::<f64>()),
        1 => {
            if let Some(propagated) = propagate(args) {
                return propagated;
            }
            match args[0] {
                Value::Int(n) if n > 0 => Value::Int(rand::thread_rng().gen_range(0..n)),
                Value::Int(_) => Value::Error,
                _ => Value::Error,
            }
        }
        _ => Value::Error,
    }
}

fn builtin_strcat(args: &[Value]) -> Value {
    let mut out = String::new();
    for a in args {
        match a {
            Value::Str(s) => out.push_str(s),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Real(r) => out.push_str(&r.to_string()),
            Value::Bool(b) => out.push_str(&b.to_string()),
            _ => return Value::Error,
        }
    }
    Value::str(out)
}

fn builtin_join(args: &[Value]) -> Value {
    if args.len() != 2 {
        return Value::Error;
    }
    let (Value::Str(sep), Value::List(items)) = (&args[0], &args[1]) else {
        return Value::Error;
    };
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Str(s) => parts.push(s.to_string()),
            _ => return Value::Error,
        }
    }
    Value::str(parts.join(sep))
}

fn builtin_split(args: &[Value]) -> Value {
    if args.len() != 2 {
        return Value::Error;
    }
    let (Value::Str(s), Value::Str(sep)) = (&args[0], &args[1]) else {
        return Value::Error;
    };
    if sep.is_empty() {
        return Value::Error;
    }
    Value::List(s.split(sep.as_ref()).map(Value::str).collect())
}

fn builtin_size(args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    match &args[0] {
        Value::List(items) => Value::Int(items.len() as i64),
        Value::Str(s) => Value::Int(s.chars().count() as i64),
        Value::Undefined => Value::Undefined,
        Value::Error => Value::Error,
        _ => Value::Error,
    }
}

fn builtin_substr(args: &[Value]) -> Value {
    if args.len() != 2 && args.len() != 3 {
        return Value::Error;
    }
    let Value::Str(s) = &args[0] else {
        return Value::Error;
    };
    let Value::Int(offset) = args[1] else {
        return Value::Error;
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
    let end = match args.get(2) {
        Some(Value::Int(n)) => (start + (*n).max(0)).clamp(start, len),
        Some(_) => return Value::Error,
        None => len,
    };
    let slice: String = chars[start as usize..end as usize].iter().collect();
    Value::str(slice)
}

fn builtin_strcmp(args: &[Value], case_insensitive: bool) -> Value {
    if args.len() != 2 {
        return Value::Error;
    }
    let (Value::Str(a), Value::Str(b)) = (&args[0], &args[1]) else {
        return Value::Error;
    };
    let (a, b) = if case_insensitive {
        (a.to_lowercase(), b.to_lowercase())
    } else {
        (a.to_string(), b.to_string())
    };
    Value::Int(match a.cmp(&b) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    })
}

fn string_map(args: &[Value], f: impl Fn(&str) -> String) -> Value {
    if args.len() != 1 {
        return Value::Error;
    }
    match &args[0] {
        Value::Str(s) => Value::str(f(s)),
        _ => Value::Error,
    }
}

// endregion: --- Helpers
