//! Identifier resolution and type checking.
//!
//! Scoping is per entity: a bare name applies the constraint to every entity
//! that declares all bare names in the expression; `Entity.field` pins it to
//! one entity. Type errors are compile errors, never "evaluates to false".

use std::fmt;

use super::{CmpOp, Expr, ExprError, FieldRef};
use crate::ir::{Entity, FieldType, Literal, Ontology, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    Bool,
    Int,
    Float,
    String,
    List(Scalar),
}

/// A constraint whose identifiers resolve and whose types check on every entity it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedConstraint {
    pub expr: Expr,
    /// Entities in scope, declaration order. Never empty.
    pub entities: Vec<String>,
}

/// Parse + resolve + type-check in one go.
pub fn compile(src: &str, ontology: &Ontology) -> Result<CheckedConstraint, Vec<ExprError>> {
    let expr = super::parse(src).map_err(|e| vec![e])?;
    check(expr, ontology)
}

pub fn check(expr: Expr, ontology: &Ontology) -> Result<CheckedConstraint, Vec<ExprError>> {
    let scope = resolve_scope(&expr, ontology)?;

    let mut errors = Vec::new();
    for entity in &scope {
        let ctx = Ctx { entity, qualify: scope.len() > 1 };
        match ctx.type_of(&expr) {
            Ok(ExprType::Bool) => {}
            Ok(other) => errors.push(ctx.err(
                format!("constraint must be a boolean expression, found {other}"),
                0,
            )),
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let entities = scope.iter().map(|e| e.name.clone()).collect();
    Ok(CheckedConstraint { expr, entities })
}

fn resolve_scope<'a>(expr: &Expr, ontology: &'a Ontology) -> Result<Vec<&'a Entity>, Vec<ExprError>> {
    let refs = expr.field_refs();
    if refs.is_empty() {
        return Err(vec![ExprError::new("constraint references no fields", 0)]);
    }

    let mut errors = Vec::new();
    let mut pinned: Option<&FieldRef> = None;
    for r in &refs {
        match &r.entity {
            Some(entity_name) => {
                match ontology.entity(entity_name) {
                    None => errors.push(ExprError::new(
                        format!("unresolved identifier `{r}`: no entity named `{entity_name}`"),
                        r.offset,
                    )),
                    Some(entity) if entity.field(&r.field).is_none() => errors.push(ExprError::new(
                        format!("unresolved identifier `{r}`: `{entity_name}` has no field `{}`", r.field),
                        r.offset,
                    )),
                    Some(_) => {}
                }
                match pinned {
                    Some(p) if p.entity != r.entity => errors.push(ExprError::new(
                        format!("constraint spans entities `{}` and `{entity_name}`; cross-entity constraints are not supported", p.entity.as_deref().unwrap_or_default()),
                        r.offset,
                    )),
                    Some(_) => {}
                    None => pinned = Some(r),
                }
            }
            None => {
                if !ontology.entities.iter().any(|e| e.field(&r.field).is_some()) {
                    errors.push(ExprError::new(
                        format!("unresolved identifier `{}`: no entity declares it", r.field),
                        r.offset,
                    ));
                }
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let bare: Vec<&str> = refs
        .iter()
        .filter(|r| r.entity.is_none())
        .map(|r| r.field.as_str())
        .collect();
    let pinned_entity = pinned.and_then(|p| p.entity.as_deref());

    let scope: Vec<&Entity> = ontology
        .entities
        .iter()
        .filter(|e| pinned_entity.is_none_or(|p| p == e.name))
        .filter(|e| bare.iter().all(|f| e.field(f).is_some()))
        .collect();

    if scope.is_empty() {
        let mut names: Vec<&str> = Vec::new();
        for f in &bare {
            if !names.contains(f) {
                names.push(f);
            }
        }
        let listed = names.iter().map(|n| format!("`{n}`")).collect::<Vec<_>>().join(", ");
        let message = match pinned_entity {
            Some(p) => format!("`{p}` does not declare {listed}"),
            None => format!("fields {listed} are never declared together on one entity"),
        };
        return Err(vec![ExprError::new(message, 0)]);
    }
    Ok(scope)
}

struct Ctx<'a> {
    entity: &'a Entity,
    qualify: bool,
}

impl Ctx<'_> {
    fn err(&self, message: String, offset: usize) -> ExprError {
        if self.qualify {
            ExprError::new(format!("in `{}`: {message}", self.entity.name), offset)
        } else {
            ExprError::new(message, offset)
        }
    }

    fn field_type(&self, r: &FieldRef) -> Result<FieldType, ExprError> {
        self.entity
            .field(&r.field)
            .map(|f| f.ty)
            .ok_or_else(|| self.err(format!("unresolved identifier `{r}`"), r.offset))
    }

    fn type_of(&self, expr: &Expr) -> Result<ExprType, ExprError> {
        match expr {
            Expr::Literal(lit) => Ok(ExprType::of_literal(lit)),
            Expr::Field(r) => match self.field_type(r)? {
                FieldType::List(_) => Err(self.err(
                    format!("list field `{r}` can only be used inside len()"),
                    r.offset,
                )),
                ty => Ok(ExprType::from(ty)),
            },
            Expr::Len(r) => match self.field_type(r)? {
                FieldType::String | FieldType::List(_) => Ok(ExprType::Int),
                ty => Err(self.err(
                    format!("len() needs a string or list field, `{r}` is {ty}"),
                    r.offset,
                )),
            },
            Expr::In(r, lits) => {
                let ty = self.field_type(r)?;
                let Some(scalar) = ty.scalar() else {
                    return Err(self.err(format!("`in` needs a scalar field, `{r}` is {ty}"), r.offset));
                };
                for lit in lits {
                    if !scalar.admits(lit) {
                        return Err(self.err(
                            format!("`{r}` is {ty} but the list contains {} `{lit}`", lit.kind_name()),
                            r.offset,
                        ));
                    }
                }
                Ok(ExprType::Bool)
            }
            Expr::Not(inner) => match self.type_of(inner)? {
                ExprType::Bool => Ok(ExprType::Bool),
                other => Err(self.err(format!("`not` needs a boolean operand, found {other}"), 0)),
            },
            Expr::And(a, b) | Expr::Or(a, b) => {
                let word = if matches!(expr, Expr::And(..)) { "and" } else { "or" };
                for side in [a, b] {
                    let ty = self.type_of(side)?;
                    if ty != ExprType::Bool {
                        return Err(self.err(format!("`{word}` needs boolean operands, found {ty}"), 0));
                    }
                }
                Ok(ExprType::Bool)
            }
            Expr::Compare(op, a, b) => {
                let (lt, rt) = (self.type_of(a)?, self.type_of(b)?);
                if comparable(*op, lt, rt) {
                    Ok(ExprType::Bool)
                } else {
                    Err(self.err(
                        format!("cannot compare {lt} with {rt} using `{}`", op.symbol()),
                        first_offset(a).or_else(|| first_offset(b)).unwrap_or(0),
                    ))
                }
            }
        }
    }
}

fn comparable(op: CmpOp, lt: ExprType, rt: ExprType) -> bool {
    match (lt, rt) {
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (ExprType::String, ExprType::String) => true,
        (ExprType::Bool, ExprType::Bool) => !op.is_ordering(),
        _ => false,
    }
}

fn first_offset(e: &Expr) -> Option<usize> {
    e.field_refs().first().map(|r| r.offset)
}

impl ExprType {
    pub fn of_literal(lit: &Literal) -> Self {
        match lit {
            Literal::String(_) => ExprType::String,
            Literal::Int(_) => ExprType::Int,
            Literal::Float(_) => ExprType::Float,
            Literal::Bool(_) => ExprType::Bool,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ExprType::Int | ExprType::Float)
    }
}

impl From<FieldType> for ExprType {
    fn from(ty: FieldType) -> Self {
        match ty {
            FieldType::String => ExprType::String,
            FieldType::Int => ExprType::Int,
            FieldType::Float => ExprType::Float,
            FieldType::Bool => ExprType::Bool,
            FieldType::List(s) => ExprType::List(s),
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Bool => f.write_str("bool"),
            ExprType::Int => f.write_str("int"),
            ExprType::Float => f.write_str("float"),
            ExprType::String => f.write_str("string"),
            ExprType::List(s) => write!(f, "list[{}]", s.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Field;

    fn field(name: &str, ty: FieldType) -> Field {
        Field { name: name.into(), ty, description: None, required: true, enum_: None, range: None, default: None }
    }

    fn ontology() -> Ontology {
        Ontology {
            name: "shop".into(),
            description: None,
            version: None,
            root: None,
            entities: vec![
                Entity {
                    name: "Person".into(),
                    description: None,
                    fields: vec![
                        field("name", FieldType::String),
                        field("age", FieldType::Int),
                        field("tags", FieldType::List(Scalar::String)),
                        field("active", FieldType::Bool),
                    ],
                },
                Entity {
                    name: "Product".into(),
                    description: None,
                    fields: vec![field("name", FieldType::String), field("price", FieldType::Float)],
                },
            ],
            constraints: vec![],
            examples: vec![],
        }
    }

    fn scope_of(src: &str) -> Vec<String> {
        compile(src, &ontology()).map(|c| c.entities).unwrap_or_else(|e| panic!("{src}: {e:?}"))
    }

    fn error_of(src: &str) -> String {
        let errs = compile(src, &ontology()).expect_err(src);
        errs.iter().map(|e| e.message.clone()).collect::<Vec<_>>().join("; ")
    }

    #[test]
    fn bare_names_scope_to_every_declaring_entity() {
        assert_eq!(scope_of("len(name) <= 300"), vec!["Person", "Product"]);
        assert_eq!(scope_of("price > 0"), vec!["Product"]);
        assert_eq!(scope_of("age >= 18 and len(name) > 0"), vec!["Person"]);
    }

    #[test]
    fn qualified_names_pin_the_entity() {
        assert_eq!(scope_of("Product.name != ''"), vec!["Product"]);
        assert_eq!(scope_of("Person.age > 1 and len(name) < 5"), vec!["Person"]);
    }

    #[test]
    fn unresolved_identifiers_are_errors() {
        assert!(error_of("nonexistent_field > 0").contains("unresolved identifier `nonexistent_field`"));
        assert!(error_of("Order.total > 0").contains("no entity named `Order`"));
        assert!(error_of("Person.price > 0").contains("has no field `price`"));
        assert!(error_of("age > 0 and price > 0").contains("never declared together"));
        assert!(error_of("Person.age > Product.price").contains("cross-entity"));
        assert!(error_of("1 < 2").contains("references no fields"));
    }

    #[test]
    fn type_mismatches_fail_at_compile_time() {
        assert!(error_of("age > 'ten'").contains("cannot compare int with string"));
        assert!(error_of("active > false").contains("cannot compare bool with bool"));
        assert!(error_of("len(age) > 1").contains("len() needs a string or list field"));
        assert!(error_of("tags == 'x'").contains("only be used inside len()"));
        assert!(error_of("age in ['a']").contains("list contains string"));
        assert!(error_of("len(name)").contains("must be a boolean expression, found int"));
        assert!(error_of("age and active").contains("`and` needs boolean operands"));
    }

    #[test]
    fn mismatch_on_one_entity_names_it() {
        // `name` is a string everywhere, but comparing it to a number fails on both entities
        let msg = error_of("name > 3");
        assert!(msg.contains("in `Person`") && msg.contains("in `Product`"), "{msg}");
    }

    #[test]
    fn numeric_kinds_mix_freely() {
        assert_eq!(scope_of("price >= 1"), vec!["Product"]);
        assert_eq!(scope_of("age < 2.5"), vec!["Person"]);
        assert_eq!(scope_of("active == true or age in [1, 2]"), vec!["Person"]);
    }
}
