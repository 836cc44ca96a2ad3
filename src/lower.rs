// Lowering: validated IR + compiled constraints → one folded shape per field.
//
// Every emitter reads the same `Plan`, which is what keeps enum and bound
// rendering identical across targets.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Diagnostic;
use crate::expr::{self, Bounds, Disposition, Expr};
use crate::ir::{fmt_num, Constraint, Entity, Field, Literal, Ontology};

/// Largest bound magnitude the emitters spell out exactly.
pub const MAX_BOUND_MAGNITUDE: f64 = 1e30;

#[derive(Debug, Clone)]
pub struct Plan<'a> {
    pub ontology: &'a Ontology,
    pub entities: Vec<EntityPlan<'a>>,
    /// `<Ontology>Entity`, present when there is more than one entity.
    pub union_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntityPlan<'a> {
    pub entity: &'a Entity,
    /// snake_case rule prefix, e.g. `person`
    pub rule: String,
    pub fields: Vec<FieldPlan<'a>>,
    /// Constraints with no native form, declaration order.
    pub opaque: Vec<OpaqueConstraint<'a>>,
}

#[derive(Debug, Clone)]
pub struct FieldPlan<'a> {
    pub field: &'a Field,
    /// e.g. `person_age`
    pub rule: String,
    /// Folded enum. When set, `bounds` is unbounded.
    pub values: Option<Vec<Literal>>,
    /// Folded numeric interval; unbounded when none applies.
    pub bounds: Bounds,
    /// Generated constrained-value type, `<Entity><Field>`, for enum fields.
    pub type_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpaqueConstraint<'a> {
    /// Position in `Ontology::constraints`.
    pub index: usize,
    pub constraint: &'a Constraint,
    pub expr: Expr,
    pub fields: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// LOWERING
// ————————————————————————————————————————————————————————————————————————————

pub fn lower(ontology: &Ontology) -> Result<Plan<'_>, Vec<Diagnostic>> {
    let mut entities: Vec<EntityPlan> = ontology.entities.iter().map(seed_entity).collect();
    let mut diags = Vec::new();

    for (index, constraint) in ontology.constraints.iter().enumerate() {
        let path = format!("constraints[{index}].expr");
        let checked = match expr::compile(&constraint.expr, ontology) {
            Ok(c) => c,
            Err(errs) => {
                diags.extend(errs.into_iter().map(|e| Diagnostic::semantic(&path, e.to_string())));
                continue;
            }
        };
        for ep in entities.iter_mut().filter(|ep| checked.entities.contains(&ep.entity.name)) {
            match expr::classify(&checked.expr, ep.entity) {
                Disposition::Range { field, bounds } => {
                    debug!(entity = %ep.entity.name, %field, constraint = index, "folding range");
                    if let Some(fp) = ep.field_mut(&field) {
                        fp.bounds = fp.bounds.intersect(bounds);
                    }
                }
                Disposition::Enum { field, values } => {
                    debug!(entity = %ep.entity.name, %field, constraint = index, "folding enum");
                    if let Some(fp) = ep.field_mut(&field) {
                        fp.values = Some(match fp.values.take() {
                            Some(declared) => declared.into_iter().filter(|v| values.contains(v)).collect(),
                            None => values,
                        });
                    }
                }
                Disposition::Opaque { fields } => {
                    debug!(entity = %ep.entity.name, constraint = index, "opaque constraint");
                    ep.opaque.push(OpaqueConstraint {
                        index,
                        constraint,
                        expr: checked.expr.clone(),
                        fields,
                    });
                }
            }
        }
    }

    for ep in &mut entities {
        for fp in &mut ep.fields {
            finish_field(&ep.entity.name, fp, &mut diags);
        }
    }

    let union_name = (ontology.entities.len() > 1).then(|| format!("{}Entity", pascal_case(&ontology.name)));
    check_generated_names(&entities, union_name.as_deref(), &mut diags);

    if diags.is_empty() {
        Ok(Plan { ontology, entities, union_name })
    } else {
        Err(diags)
    }
}

fn seed_entity(entity: &Entity) -> EntityPlan<'_> {
    let rule = snake_case(&entity.name);
    let fields = entity
        .fields
        .iter()
        .map(|field| FieldPlan {
            field,
            rule: format!("{rule}_{}", snake_case(&field.name)),
            values: field.enum_.clone(),
            bounds: field.range.map(|r| Bounds::closed(r.min, r.max)).unwrap_or_default(),
            type_name: None,
        })
        .collect();
    EntityPlan { entity, rule, fields, opaque: Vec::new() }
}

fn finish_field(entity: &str, fp: &mut FieldPlan, diags: &mut Vec<Diagnostic>) {
    let field = fp.field;
    let path = format!("entities.{entity}.fields.{}", field.name);

    if let Some(values) = &mut fp.values {
        if !fp.bounds.is_unbounded() {
            let bounds = fp.bounds;
            values.retain(|v| v.as_f64().is_none_or(|x| bounds.contains(x)));
            fp.bounds = Bounds::default();
        }
        if values.is_empty() {
            diags.push(Diagnostic::semantic(&path, "no enum value survives the constraints on this field"));
        }
        fp.type_name = Some(format!("{entity}{}", pascal_case(&field.name)));
    }
    if fp.bounds.is_empty() {
        diags.push(Diagnostic::semantic(&path, "the constraints on this field leave an empty range"));
    }
    if [fp.bounds.lower, fp.bounds.upper].into_iter().flatten().any(|b| b.value.abs() > MAX_BOUND_MAGNITUDE) {
        diags.push(Diagnostic::semantic(
            &path,
            format!("numeric bounds must lie within ±{}", fmt_num(MAX_BOUND_MAGNITUDE)),
        ));
    }

    let Some(default) = &field.default else { return };
    if let (Some(values), Some(scalar)) = (&fp.values, field.ty.scalar()) {
        let lit = Literal::from_json(default).and_then(|l| l.coerce(scalar));
        if !lit.is_some_and(|l| values.contains(&l)) {
            diags.push(Diagnostic::semantic(
                format!("{path}.default"),
                format!("default {default} is not one of the allowed values after folding constraints"),
            ));
        }
    }
    if field.ty.is_numeric() {
        if let Some(x) = default.as_f64() {
            if !fp.bounds.contains(x) {
                diags.push(Diagnostic::semantic(
                    format!("{path}.default"),
                    format!("default {default} lies outside the range left by the constraints"),
                ));
            }
        }
    }
}

/// Type names the emitted code already uses: its own support items, the Rust
/// prelude types it spells out and TypeScript's primitive type keywords.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Bound", "UnrepresentedConstraint", "Serialize", "Deserialize", "String", "Vec", "Option", "Some", "None",
    "Result", "Ok", "Err", "Box", "TryFrom", "From", "Default", "Self", "string", "number", "boolean", "any",
    "unknown", "never", "object", "symbol", "bigint", "undefined", "null", "void",
];

/// Generated type names and grammar rule prefixes must not collide.
fn check_generated_names(entities: &[EntityPlan], union_name: Option<&str>, diags: &mut Vec<Diagnostic>) {
    let mut types: HashMap<String, String> = HashMap::new();
    let mut rules: HashMap<String, String> = HashMap::new();
    let mut claim = |table: &mut HashMap<String, String>, name: &str, owner: String, what: &str| {
        if what == "type name" && RESERVED_TYPE_NAMES.contains(&name) {
            diags.push(Diagnostic::semantic(&owner, format!("generated {what} `{name}` is reserved by the emitted code")));
        } else if let Some(first) = table.get(name) {
            diags.push(Diagnostic::semantic(
                &owner,
                format!("generated {what} `{name}` collides with the one for `{first}`"),
            ));
        } else {
            table.insert(name.to_string(), owner);
        }
    };

    for ep in entities {
        let name = &ep.entity.name;
        claim(&mut types, name, format!("entities.{name}"), "type name");
        claim(&mut rules, &ep.rule, format!("entities.{name}"), "rule prefix");
    }
    if let Some(union) = union_name {
        claim(&mut types, union, "name".to_string(), "type name");
    }
    for ep in entities {
        for fp in &ep.fields {
            let owner = format!("entities.{}.fields.{}", ep.entity.name, fp.field.name);
            if let Some(t) = &fp.type_name {
                claim(&mut types, t, owner.clone(), "type name");
            }
            claim(&mut rules, &fp.rule, owner, "rule prefix");
        }
    }
}

impl<'a> EntityPlan<'a> {
    fn field_mut(&mut self, name: &str) -> Option<&mut FieldPlan<'a>> {
        self.fields.iter_mut().find(|f| f.field.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &FieldPlan<'a>> {
        self.fields.iter().filter(|f| f.field.required)
    }
}

// ---- naming ----

/// `PersonRecord` → `person_record`, `HTTPServer` → `http_server`, `first-name` → `first_name`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit());
            let acronym_end = prev.is_some_and(|p| p.is_ascii_uppercase()) && next.is_some_and(|n| n.is_ascii_lowercase());
            if (after_lower || acronym_end) && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `first_name` → `FirstName`, `person-registry` → `PersonRegistry`; existing capitals kept.
pub fn pascal_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut cs = part.chars();
            match cs.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + cs.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
