//! A ClassAd expression language: parser, value lattice, and evaluator.
//!
//! ClassAds are self-describing, semi-structured records whose attributes are
//! arbitrary expressions rather than plain data — an attribute can reference its
//! siblings, a peer record being matched against, or stay unevaluated until asked
//! for. `parse` turns source text (either a bracketed record `[a = 1; b = 2]` or a
//! bare stream of `name = expr;` pairs) into an [`ast::Expression`]; [`Record::evaluate`]
//! and [`ast::Expression::evaluate`] walk that tree against an optional `my`/`target`
//! pair of records to produce a [`value::Value`].
//!
//! ```
//! use classad::parse;
//!
//! let ad = parse("[Memory = 1024; HasGpu = true]").unwrap();
//! let classad::ast::Expression::RecordLit(record) = ad else { unreachable!() };
//! assert_eq!(record.evaluate("Memory", None, None), classad::Value::Int(1024));
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
mod eval;
pub mod parser;
pub mod record;
pub mod value;

pub use ast::Expression;
pub use builtins::{BuiltinFn, BuiltinsProvider, BuiltinsRegistry, CoreBuiltins};
pub use error::ParseError;
pub use parser::parse;
pub use record::{Record, RecordError};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_stream_form_parse_to_the_same_ad() {
        let record_form = parse("[a = 1; b = 2]").unwrap();
        let stream_form = parse("a = 1; b = 2").unwrap();
        assert_eq!(record_form, stream_form);
    }

    #[test]
    fn matchmaking_rank_expression() {
        let my = parse("[Rank = TARGET.Memory + TARGET.Mips]").unwrap();
        let Expression::RecordLit(my) = my else { unreachable!() };
        let target = parse("[Memory = 1024; Mips = 50]").unwrap();
        let Expression::RecordLit(target) = target else { unreachable!() };

        assert_eq!(my.evaluate("Rank", None, Some(&target)), Value::Int(1074));
    }

    #[test]
    fn direct_attribute_cycle_is_undefined_not_a_hang() {
        let ad = parse("[a = b; b = a]").unwrap();
        let Expression::RecordLit(ad) = ad else { unreachable!() };
        assert_eq!(ad.evaluate("a", None, None), Value::Undefined);
    }

    #[test]
    fn undefined_propagates_but_type_errors_become_error() {
        let ad = parse("[x = Missing + 1; y = \"a\" + 1]").unwrap();
        let Expression::RecordLit(ad) = ad else { unreachable!() };
        assert_eq!(ad.evaluate("x", None, None), Value::Undefined);
        assert_eq!(ad.evaluate("y", None, None), Value::Error);
    }

    #[test]
    fn unparse_then_reparse_then_eval_is_idempotent() {
        let ad = parse("[x = 2 * (3 + 4)]").unwrap();
        let Expression::RecordLit(ad) = ad else { unreachable!() };
        let expr = ad.get("x").unwrap();
        let unparsed = expr.to_string();
        let reparsed = parse(&unparsed).unwrap();
        assert_eq!(reparsed.evaluate(&[], None, None), expr.evaluate(&[], None, None));
    }
}
