//! Integration tests exercising the fixed built-in function table end-to-end through
//! the parser and evaluator, rather than calling `builtins::call` directly.

use classad::{parse, Value};

fn eval(src: &str) -> Value {
    parse(src).unwrap().evaluate(&[], None, None)
}

#[test]
fn type_predicates() {
    assert_eq!(eval("isUndefined(x)"), Value::Bool(true));
    assert_eq!(eval(r#"isString("a")"#), Value::Bool(true));
    assert_eq!(eval("isInteger(1.0)"), Value::Bool(false));
    assert_eq!(eval("isList({1,2})"), Value::Bool(true));
}

#[test]
fn coercions() {
    assert_eq!(eval(r#"int("42")"#), Value::Int(42));
    assert_eq!(eval("real(3)"), Value::Real(3.0));
    assert_eq!(eval("string(7)"), Value::str("7"));
    assert_eq!(eval(r#"int("not a number")"#), Value::Error);
}

#[test]
fn rounding_family() {
    assert_eq!(eval("floor(3.7)"), Value::Int(3));
    assert_eq!(eval("ceiling(3.1)"), Value::Int(4));
    assert_eq!(eval("round(3.5)"), Value::Int(4));
}

#[test]
fn pow_always_yields_a_real() {
    assert_eq!(eval("pow(2, 10)"), Value::Real(1024.0));
}

#[test]
fn quantize_rounds_up_to_the_nearest_multiple() {
    assert_eq!(eval("quantize(23, 10)"), Value::Int(30));
    assert_eq!(eval("quantize(20, 10)"), Value::Int(20));
}

#[test]
fn quantize_against_a_bucket_list() {
    assert_eq!(eval("quantize(15, {10, 20, 30})"), Value::Int(20));
    assert_eq!(eval("quantize(55, {10, 20, 30})"), Value::Int(60));
}

#[test]
fn string_utilities() {
    assert_eq!(eval(r#"strcat("a", "b", "c")"#), Value::str("abc"));
    assert_eq!(eval(r#"join(",", split("a,b,c", ","))"#), Value::str("a,b,c"));
    assert_eq!(eval(r#"size("hello")"#), Value::Int(5));
    assert_eq!(eval(r#"substr("hello world", 6)"#), Value::str("world"));
    assert_eq!(eval(r#"substr("hello world", 0, 5)"#), Value::str("hello"));
    assert_eq!(eval(r#"strcmp("abc", "abd")"#), Value::Int(-1));
    assert_eq!(eval(r#"stricmp("ABC", "abc")"#), Value::Int(0));
    assert_eq!(eval(r#"toUpper("abc")"#), Value::str("ABC"));
    assert_eq!(eval(r#"toLower("ABC")"#), Value::str("abc"));
}

#[test]
fn unknown_function_name_is_error_not_a_panic() {
    assert_eq!(eval("totallyUnknownFunction(1, 2)"), Value::Error);
}

#[test]
fn random_with_a_bound_stays_in_range() {
    for _ in 0..20 {
        let v = eval("random(10)");
        match v {
            Value::Int(n) => assert!((0..10).contains(&n)),
            other => panic!("expected an Int, got {other:?}"),
        }
    }
}
