//! The parsed expression tree: `Expression` and its supporting operator enums.

use std::fmt;
use std::sync::Arc;

use crate::record::Record;
use crate::value::Value;

/// A parsed ClassAd expression.
///
/// Built fresh by the parser for every `parse` call; never shared or mutated after
/// construction (plain `Box` recursion, no `Rc`/`Arc` subtrees — the only cycles in
/// this system are name-based, detected at evaluation time, not structural ones).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// An unqualified name: resolved by the scope walk (§4.3).
    AttrRef(Arc<str>),
    /// `a.b.c`: first name via the scope walk, remaining names strictly inside the
    /// record that resolved.
    Dotted(Vec<Arc<str>>),
    /// `.a.b.c`: resolution begins at the root of `my`.
    AbsoluteRef(Vec<Arc<str>>),
    /// `my.a` / `target.a` / `parent.a` / `super.a`.
    ScopeRef(ScopeKind, Vec<Arc<str>>),
    Subscript(Box<Expression>, Box<Expression>),
    Call(Arc<str>, Vec<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    /// `cond ? then : else`; `then` is `None` for the elvis form `cond ?: else`.
    Ternary(Box<Expression>, Option<Box<Expression>>, Box<Expression>),
    ListLit(Vec<Expression>),
    RecordLit(Record),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    My,
    Target,
    Parent,
    Super,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Is,
    Isnt,
    And,
    Or,
}

impl fmt::Display for Expression {
    /// Textual form used for diagnostics and for the `unparse` built-in. Not required
    /// to byte-for-byte match the original source text, only to re-parse to an
    /// equivalent AST (`eval(parse(unparse(e))) == eval(e)`, per SPEC_FULL.md §8).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{v}"),
            Expression::AttrRef(name) => write!(f, "{name}"),
            Expression::Dotted(path) => write!(f, "{}", path.join(".")),
            Expression::AbsoluteRef(path) => write!(f, ".{}", path.join(".")),
            Expression::ScopeRef(kind, path) => {
                write!(f, "{}", scope_keyword(*kind))?;
                for name in path {
                    write!(f, ".{name}")?;
                }
                Ok(())
            }
            Expression::Subscript(base, index) => write!(f, "{base}[{index}]"),
            Expression::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expression::Unary(UnaryOp::Not, e) => write!(f, "!{e}"),
            Expression::Unary(UnaryOp::Neg, e) => write!(f, "-{e}"),
            Expression::Binary(op, l, r) => write!(f, "({l} {} {r})", binary_op_str(*op)),
            Expression::Ternary(c, Some(t), e) => write!(f, "({c} ? {t} : {e})"),
            Expression::Ternary(c, None, e) => write!(f, "({c} ? : {e})"),
            Expression::ListLit(items) => {
                write!(f, "{{")?;
                for (i, it) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{it}")?;
                }
                write!(f, "}}")
            }
            Expression::RecordLit(r) => write!(f, "{r}"),
        }
    }
}

fn scope_keyword(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::My => "my",
        ScopeKind::Target => "target",
        ScopeKind::Parent => "parent",
        ScopeKind::Super => "super",
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Is => "is",
        BinaryOp::Isnt => "isnt",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}
