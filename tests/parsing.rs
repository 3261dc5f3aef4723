//! Integration tests for parsing: record-form vs. stream-form equivalence, operator
//! precedence, and the handful of source-text quirks (quoted identifiers, absolute
//! references, reserved words) that are easy to get wrong in a hand-written grammar.

use classad::{parse, Expression, Value};

#[test]
fn record_and_stream_form_are_structurally_equal() {
    let record_form = parse("[a = 1; b = 2; c = a + b]").unwrap();
    let stream_form = parse("a = 1; b = 2; c = a + b").unwrap();
    assert_eq!(record_form, stream_form);
}

#[test]
fn trailing_semicolons_and_missing_semicolons_both_parse() {
    let a = parse("[a = 1;]").unwrap();
    let b = parse("[a = 1]").unwrap();
    assert_eq!(a, b);
}

#[test]
fn operator_precedence_matches_arithmetic_convention() {
    let expr = parse("1 + 2 * 3 == 7 && true").unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::Bool(true));
}

#[test]
fn relational_chains_left_associate() {
    // (1 < 2) < 1 compares a Bool against an Int, which is a type mismatch.
    let expr = parse("1 < 2 < 1").unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::Error);
}

#[test]
fn quoted_identifiers_allow_attribute_names_with_special_characters() {
    let ad = parse(r#"['My Attribute' = 5]"#).unwrap();
    let Expression::RecordLit(ad) = ad else { unreachable!() };
    assert_eq!(ad.evaluate("My Attribute", None, None), Value::Int(5));
}

#[test]
fn reserved_words_cannot_be_used_as_attribute_names() {
    assert!(parse("[true = 1]").is_err());
    assert!(parse("[is = 1]").is_err());
}

#[test]
fn absolute_reference_resolution_begins_at_my_root() {
    let ad = parse("[a = 1; b = [a = 2; c = .a]]").unwrap();
    let Expression::RecordLit(ad) = ad else { unreachable!() };
    let expr = parse("b.c").unwrap();
    assert_eq!(expr.evaluate(&[], Some(&ad), None), Value::Int(1));
}

#[test]
fn string_escapes_decode_standard_sequences() {
    let expr = parse(r#""a\tb\nc\\d""#).unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::str("a\tb\nc\\d"));
}

#[test]
fn hex_and_octal_integer_literals() {
    assert_eq!(parse("0x1F").unwrap().evaluate(&[], None, None), Value::Int(31));
    assert_eq!(parse("017").unwrap().evaluate(&[], None, None), Value::Int(15));
}

#[test]
fn meta_equality_operators_parse_and_are_case_sensitive() {
    assert_eq!(
        parse(r#""ABC" =?= "abc""#).unwrap().evaluate(&[], None, None),
        Value::Bool(false)
    );
    assert_eq!(
        parse(r#""ABC" == "abc""#).unwrap().evaluate(&[], None, None),
        Value::Bool(true)
    );
    assert_eq!(parse(r#"1 isnt 1.0"#).unwrap().evaluate(&[], None, None), Value::Bool(true));
}
