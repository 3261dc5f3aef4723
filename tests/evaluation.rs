//! Integration tests for the evaluator: scope-walk attribute resolution, matchmaking
//! against a `target` record, cycle detection, and ternary/elvis laziness.

use classad::{parse, Expression, Record, Value};

fn record(src: &str) -> Record {
    match parse(src).unwrap() {
        Expression::RecordLit(r) => r,
        other => panic!("expected record literal, got {other:?}"),
    }
}

#[test]
fn sibling_attributes_resolve_via_scope_walk() {
    let ad = record("[a = 3; b = 4; c = a + b]");
    assert_eq!(ad.evaluate("c", None, None), Value::Int(7));
}

#[test]
fn nested_record_attribute_ascends_to_find_outer_siblings() {
    let ad = record("[a = 3; b = [c = 1; d = [e = 5; f = a + c + e]]]");
    let expr = parse("b.d.f").unwrap();
    assert_eq!(expr.evaluate(&[], Some(&ad), None), Value::Int(9));
}

#[test]
fn dotted_keys_passed_to_record_evaluate_walk_the_same_way() {
    let ad = record("[a = 3; b = [c = 1; d = [e = 5; f = a + c + e]]]");
    assert_eq!(ad.evaluate("b.d.f", None, None), Value::Int(9));

    let shadowed = record("[a = 3; b = [a = 2; c = 1; d = [e = 5; f = a + c + e]]]");
    assert_eq!(shadowed.evaluate("b.d.f", None, None), Value::Int(8));

    let mistyped = record("[a = 3; b = [a = 2; c = 1; d = [e = 5; f = a + b + c]]]");
    assert_eq!(mistyped.evaluate("b.d.f", None, None), Value::Error);
}

#[test]
fn matchmaking_reads_target_via_scoperef() {
    let job = record(
        r#"[
            Requirements = TARGET.HasGpu && TARGET.Memory > 2048;
            Rank = TARGET.Memory + TARGET.Mips
        ]"#,
    );
    let machine = record("[Memory = 4096; Mips = 1200; HasGpu = true]");

    assert_eq!(job.evaluate("Requirements", None, Some(&machine)), Value::Bool(true));
    assert_eq!(job.evaluate("Rank", None, Some(&machine)), Value::Int(5296));
}

#[test]
fn scope_walk_falls_over_to_target_for_an_unqualified_name() {
    let job = record("[Requirements = OpSys == \"LINUX\"]");
    let machine = record(r#"[OpSys = "LINUX"]"#);
    assert_eq!(job.evaluate("Requirements", None, Some(&machine)), Value::Bool(true));
}

#[test]
fn direct_and_indirect_cycles_resolve_to_undefined() {
    let direct = record("[a = b; b = a]");
    assert_eq!(direct.evaluate("a", None, None), Value::Undefined);

    let indirect = record("[a = b; b = c; c = a]");
    assert_eq!(indirect.evaluate("a", None, None), Value::Undefined);
}

#[test]
fn ternary_is_lazy_in_the_untaken_branch() {
    let expr = parse("ifThenElse(false, 1/0, 42)").unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::Int(42));

    let expr = parse("true ? 1 : 1/0").unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::Int(1));
}

#[test]
fn elvis_overrides_only_the_undefined_case() {
    let expr = parse("missingAttr ?: 99").unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::Int(99));

    let expr = parse("1 == 2 ?: 99").unwrap();
    assert_eq!(expr.evaluate(&[], None, None), Value::Int(99));
}

#[test]
fn list_and_record_subscripting() {
    assert_eq!(parse("{1,2,3}[2]").unwrap().evaluate(&[], None, None), Value::Int(3));
    assert_eq!(parse("{1,2,3}[9]").unwrap().evaluate(&[], None, None), Value::Error);
    assert_eq!(parse(r#"[x = 7]["x"]"#).unwrap().evaluate(&[], None, None), Value::Int(7));
}

#[test]
fn unparse_reflects_the_unevaluated_expression_structure() {
    let ad = record("[x = 1 + 2 * 3]");
    // evaluate("x") gives the numeric result; unparse on the raw expression gives
    // back its textual structure instead.
    assert_eq!(ad.evaluate("x", None, None), Value::Int(7));
    let unparse_expr = parse("unparse(1 + 2 * 3)").unwrap();
    assert_eq!(unparse_expr.evaluate(&[], None, None), Value::str("(1 + (2 * 3))"));
}
