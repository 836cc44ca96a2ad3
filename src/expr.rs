//! Constraint expression engine.
//!
//! Parses the small boolean language attached to ontologies, resolves field
//! references against the IR, type-checks, and classifies each constraint as
//! range-derivable, enum-derivable or opaque. Nothing here ever evaluates an
//! expression against data.
//!
//! ```text
//! expr       := orExpr
//! orExpr     := andExpr ("or" andExpr)*
//! andExpr    := comparison ("and" comparison)*
//! comparison := term (("=="|"!="|">"|">="|"<"|"<=") term)?
//! term       := call | identifier | literal | "(" expr ")" | "not" term
//! call       := "len" "(" identifier ")" | identifier "in" listLiteral
//! ```
pub mod lexer;
pub mod parser;
pub mod check;
pub mod classify;

use std::fmt;

use crate::ir::Literal;

pub use check::{check, compile, CheckedConstraint, ExprType};
pub use classify::{classify, Bound, Bounds, Disposition};
pub use parser::parse;

// ------------------------------- Tree ------------------------------------ //

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Field(FieldRef),
    /// `len(field)`
    Len(FieldRef),
    /// `field in [lit, ...]`
    In(FieldRef, Vec<Literal>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

/// `field` or `Entity.field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub entity: Option<String>,
    pub field: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct ExprError {
    pub message: String,
    pub offset: usize,
}

impl ExprError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self { message: message.into(), offset }
    }
}

// --------------------------- Implementation ------------------------------ //

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }

    /// `a op b` ⇔ `b op.flip() a`
    pub fn flip(self) -> Self {
        match self {
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            same => same,
        }
    }

    /// `not (a op b)` ⇔ `a op.negate() b`
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
        }
    }

    pub fn is_ordering(self) -> bool {
        !matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

impl Expr {
    /// Every field reference in source order (duplicates kept).
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a FieldRef>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(r) | Expr::Len(r) | Expr::In(r, _) => out.push(r),
            Expr::Not(e) => e.collect_refs(out),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Compare(_, a, b) => {
                a.collect_refs(out);
                b.collect_refs(out);
            }
        }
    }

    /// Distinct referenced field names, first-seen order.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for r in self.field_refs() {
            if !names.contains(&r.field) {
                names.push(r.field.clone());
            }
        }
        names
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(e) => write!(f, "{e}.{}", self.field),
            None => f.write_str(&self.field),
        }
    }
}

/// Canonical, fully parenthesized rendering. Used for guard predicates.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(l) => write!(f, "{l}"),
            Expr::Field(r) => write!(f, "{r}"),
            Expr::Len(r) => write!(f, "len({r})"),
            Expr::In(r, lits) => {
                let items = lits.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{r} in [{}]", items.join(", "))
            }
            Expr::Not(e) => write!(f, "not ({e})"),
            Expr::And(a, b) => write!(f, "({a}) and ({b})"),
            Expr::Or(a, b) => write!(f, "({a}) or ({b})"),
            Expr::Compare(op, a, b) => write!(f, "{a} {} {b}", op.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_reparseable() {
        let e = parse("not x > 3 or name in ['a', \"b\"] and len(tags) <= 2").unwrap();
        let again = parse(&e.to_string()).unwrap();
        assert_eq!(e, strip_offsets(again, &e));
    }

    // Offsets differ after re-rendering; compare structure only.
    fn strip_offsets(mut again: Expr, like: &Expr) -> Expr {
        fn walk(a: &mut Expr, b: &Expr) {
            match (a, b) {
                (Expr::Field(x), Expr::Field(y))
                | (Expr::Len(x), Expr::Len(y))
                | (Expr::In(x, _), Expr::In(y, _)) => x.offset = y.offset,
                (Expr::Not(x), Expr::Not(y)) => walk(x, y),
                (Expr::And(a1, b1), Expr::And(a2, b2))
                | (Expr::Or(a1, b1), Expr::Or(a2, b2))
                | (Expr::Compare(_, a1, b1), Expr::Compare(_, a2, b2)) => {
                    walk(a1, a2);
                    walk(b1, b2);
                }
                _ => {}
            }
        }
        walk(&mut again, like);
        again
    }

    #[test]
    fn ops_flip_and_negate() {
        assert_eq!(CmpOp::Gt.flip(), CmpOp::Lt);
        assert_eq!(CmpOp::Eq.flip(), CmpOp::Eq);
        assert_eq!(CmpOp::Lt.negate(), CmpOp::Ge);
        assert!(!CmpOp::Ne.is_ordering());
    }

    #[test]
    fn field_names_are_distinct_in_first_seen_order() {
        let e = parse("b > 1 and a < 2 and b != 0").unwrap();
        assert_eq!(e.field_names(), vec!["b".to_string(), "a".to_string()]);
    }
}
