//! Disposition of a checked constraint on one entity.
//!
//! - enum-derivable: `f in [...]`, `f == lit`, and `or`-chains of those on one field
//! - range-derivable: numeric `f <op> lit` (either side), `and`-chains on one field,
//!   negated ordering comparisons
//! - opaque: everything else

use super::{CmpOp, Expr};
use crate::ir::{Entity, FieldType, Literal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

/// Possibly half-open numeric interval. `None` on a side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Range { field: String, bounds: Bounds },
    Enum { field: String, values: Vec<Literal> },
    Opaque { fields: Vec<String> },
}

pub fn classify(expr: &Expr, entity: &Entity) -> Disposition {
    if let Some((field, values)) = enum_of(expr, entity) {
        return Disposition::Enum { field, values };
    }
    if let Some((field, bounds)) = range_of(expr, entity) {
        let is_int = entity.field(&field).is_some_and(|f| f.ty == FieldType::Int);
        let bounds = if is_int { bounds.to_integral() } else { bounds };
        return Disposition::Range { field, bounds };
    }
    Disposition::Opaque { fields: expr.field_names() }
}

fn enum_of(expr: &Expr, entity: &Entity) -> Option<(String, Vec<Literal>)> {
    let (name, lits) = match expr {
        Expr::In(r, lits) => (r.field.clone(), lits.clone()),
        Expr::Compare(CmpOp::Eq, a, b) => match (a.as_ref(), b.as_ref()) {
            (Expr::Field(r), Expr::Literal(l)) | (Expr::Literal(l), Expr::Field(r)) => {
                (r.field.clone(), vec![l.clone()])
            }
            _ => return None,
        },
        Expr::Or(a, b) => {
            let (fa, mut va) = enum_of(a, entity)?;
            let (fb, vb) = enum_of(b, entity)?;
            if fa != fb {
                return None;
            }
            va.extend(vb);
            (fa, va)
        }
        _ => return None,
    };

    let field = entity.field(&name)?;
    if !field.ty.permits_enum() {
        return None;
    }
    let scalar = field.ty.scalar()?;
    let mut values: Vec<Literal> = Vec::with_capacity(lits.len());
    for lit in lits {
        let lit = lit.coerce(scalar)?;
        if !values.contains(&lit) {
            values.push(lit);
        }
    }
    Some((name, values))
}

fn range_of(expr: &Expr, entity: &Entity) -> Option<(String, Bounds)> {
    match expr {
        Expr::Compare(op, a, b) if op.is_ordering() => {
            let (name, op, value) = match (a.as_ref(), b.as_ref()) {
                (Expr::Field(r), Expr::Literal(l)) => (&r.field, *op, l.as_f64()?),
                (Expr::Literal(l), Expr::Field(r)) => (&r.field, op.flip(), l.as_f64()?),
                _ => return None,
            };
            if !entity.field(name)?.ty.is_numeric() {
                return None;
            }
            Some((name.clone(), Bounds::from_comparison(op, value)))
        }
        Expr::Not(inner) => match inner.as_ref() {
            Expr::Compare(op, a, b) if op.is_ordering() => {
                range_of(&Expr::Compare(op.negate(), a.clone(), b.clone()), entity)
            }
            Expr::Not(e) => range_of(e, entity),
            _ => None,
        },
        Expr::And(a, b) => {
            let (fa, ba) = range_of(a, entity)?;
            let (fb, bb) = range_of(b, entity)?;
            if fa != fb {
                return None;
            }
            Some((fa, ba.intersect(bb)))
        }
        _ => None,
    }
}

impl Bounds {
    pub fn closed(min: f64, max: f64) -> Self {
        Self {
            lower: Some(Bound { value: min, inclusive: true }),
            upper: Some(Bound { value: max, inclusive: true }),
        }
    }

    fn from_comparison(op: CmpOp, value: f64) -> Self {
        let b = |inclusive| Some(Bound { value, inclusive });
        match op {
            CmpOp::Gt => Self { lower: b(false), upper: None },
            CmpOp::Ge => Self { lower: b(true), upper: None },
            CmpOp::Lt => Self { lower: None, upper: b(false) },
            CmpOp::Le => Self { lower: None, upper: b(true) },
            CmpOp::Eq | CmpOp::Ne => Self::default(),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn intersect(self, other: Self) -> Self {
        let lower = match (self.lower, other.lower) {
            (Some(a), Some(b)) => Some(tighter(a, b, |x, y| x > y)),
            (a, b) => a.or(b),
        };
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(tighter(a, b, |x, y| x < y)),
            (a, b) => a.or(b),
        };
        Self { lower, upper }
    }

    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) => {
                l.value > u.value || (l.value == u.value && !(l.inclusive && u.inclusive))
            }
            _ => false,
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        let above = self.lower.is_none_or(|l| if l.inclusive { v >= l.value } else { v > l.value });
        let below = self.upper.is_none_or(|u| if u.inclusive { v <= u.value } else { v < u.value });
        above && below
    }

    /// Inclusive integer bounds admitting exactly the same integers.
    pub fn to_integral(self) -> Self {
        let lower = self.lower.map(|l| {
            let v = if !l.inclusive && l.value.fract() == 0.0 { l.value + 1.0 } else { l.value.ceil() };
            Bound { value: v, inclusive: true }
        });
        let upper = self.upper.map(|u| {
            let v = if !u.inclusive && u.value.fract() == 0.0 { u.value - 1.0 } else { u.value.floor() };
            Bound { value: v, inclusive: true }
        });
        Self { lower, upper }
    }
}

/// Pick the stricter of two bounds on the same side; ties prefer exclusive.
fn tighter(a: Bound, b: Bound, stricter: impl Fn(f64, f64) -> bool) -> Bound {
    if stricter(a.value, b.value) {
        a
    } else if stricter(b.value, a.value) {
        b
    } else {
        Bound { value: a.value, inclusive: a.inclusive && b.inclusive }
    }
}
