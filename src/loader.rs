//! Loader / validator: source text → validated [`Ontology`] or every diagnostic at once.
//!
//! Passes, in order:
//! 1. structural shape (allowed keys, nesting, scalar kinds); stops here on failure
//! 2. names: entity/field uniqueness, identifier syntax, version, root
//! 3. types: field types, enum/range permissions, defaults, severities
//! 4. constraint expressions (needs 2 clean and every field type known)
//! 5. folding (needs 1–4 clean)

pub mod node;

use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Diagnostic, LoadError};
use crate::ir::{Constraint, Entity, Example, Field, FieldType, Literal, Ontology, Range, Severity};
use node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
}

impl SourceFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(SourceFormat::Yaml),
            "json" => Ok(SourceFormat::Json),
            other => Err(format!("unknown source format `{other}` (expected yaml or json)")),
        }
    }
}

static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid regex"));
static ONTOLOGY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("invalid regex"));
static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$")
        .expect("invalid regex")
});

const TOP_KEYS: &[&str] = &["name", "description", "version", "root", "entities", "constraints", "examples"];
const ENTITY_KEYS: &[&str] = &["description", "fields"];
const FIELD_KEYS: &[&str] = &["type", "description", "required", "enum", "range", "default"];
const CONSTRAINT_KEYS: &[&str] = &["expr", "message", "severity"];
const EXAMPLE_KEYS: &[&str] = &["input", "output", "description"];

pub fn load(source: &str, format: SourceFormat) -> Result<Ontology, LoadError> {
    let root = parse_source(source, format).map_err(|d| LoadError::new(vec![d]))?;

    let mut diags = Vec::new();
    let raw = read_ontology(&root, &mut diags);
    let raw = match raw {
        Some(raw) if diags.is_empty() => raw,
        _ => return Err(LoadError::new(diags)),
    };

    let names_ok = check_names(&raw, &mut diags);
    let (ontology, types_known) = build(&raw, &mut diags);

    if names_ok && types_known {
        for (i, c) in ontology.constraints.iter().enumerate() {
            if let Err(errs) = crate::expr::compile(&c.expr, &ontology) {
                let path = format!("constraints[{i}].expr");
                diags.extend(errs.into_iter().map(|e| Diagnostic::semantic(&path, e.to_string())));
            }
        }
    }

    if diags.is_empty() {
        if let Err(errs) = crate::lower::lower(&ontology) {
            diags.extend(errs);
        }
    }

    if !diags.is_empty() {
        debug!(problems = diags.len(), "ontology rejected");
        return Err(LoadError::new(diags));
    }
    debug!(
        name = %ontology.name,
        entities = ontology.entities.len(),
        constraints = ontology.constraints.len(),
        "ontology loaded"
    );
    Ok(ontology)
}

fn parse_source(source: &str, format: SourceFormat) -> Result<Node, Diagnostic> {
    let parsed = match format {
        SourceFormat::Yaml => serde_yaml::from_str::<Node>(source).map_err(|e| format!("invalid YAML: {e}")),
        SourceFormat::Json => serde_json::from_str::<Node>(source).map_err(|e| format!("invalid JSON: {e}")),
    };
    match parsed {
        Ok(Node::Null) => Err(Diagnostic::structural("", "document is empty")),
        Ok(node) => Ok(node),
        Err(msg) => Err(Diagnostic::structural("", msg)),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PASS 1: STRUCTURE
// ————————————————————————————————————————————————————————————————————————————

struct RawOntology<'n> {
    name: String,
    description: Option<String>,
    version: Option<String>,
    root: Option<String>,
    entities: Vec<RawEntity<'n>>,
    constraints: Vec<RawConstraint>,
    examples: Vec<Example>,
}

struct RawEntity<'n> {
    name: String,
    description: Option<String>,
    fields: Vec<RawField<'n>>,
}

struct RawField<'n> {
    name: String,
    ty: String,
    description: Option<String>,
    required: bool,
    enum_: Option<&'n [Node]>,
    range: Option<(f64, f64)>,
    default: Option<&'n Node>,
}

struct RawConstraint {
    expr: String,
    message: Option<String>,
    severity: Option<String>,
}

fn read_ontology<'n>(root: &'n Node, diags: &mut Vec<Diagnostic>) -> Option<RawOntology<'n>> {
    let top = mapping(root, "", diags)?;
    check_keys(top, TOP_KEYS, "", diags);

    let name = match get(top, "name") {
        Some(n) => string(n, "name", diags),
        None => {
            diags.push(Diagnostic::structural("name", "missing required key `name`"));
            None
        }
    };
    let description = opt_string(top, "description", "", diags);
    let version = opt_string(top, "version", "", diags);
    let root_entity = opt_string(top, "root", "", diags);

    let entities = match get(top, "entities") {
        None => {
            diags.push(Diagnostic::structural("entities", "missing required key `entities`"));
            Vec::new()
        }
        Some(node) => read_entities(node, diags),
    };

    let constraints = match get(top, "constraints") {
        None | Some(Node::Null) => Vec::new(),
        Some(node) => sequence(node, "constraints", diags)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| read_constraint(c, &format!("constraints[{i}]"), diags))
            .collect(),
    };

    let examples = match get(top, "examples") {
        None | Some(Node::Null) => Vec::new(),
        Some(node) => sequence(node, "examples", diags)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter_map(|(i, e)| read_example(e, &format!("examples[{i}]"), diags))
            .collect(),
    };

    Some(RawOntology {
        name: name?,
        description,
        version,
        root: root_entity,
        entities,
        constraints,
        examples,
    })
}

fn read_entities<'n>(node: &'n Node, diags: &mut Vec<Diagnostic>) -> Vec<RawEntity<'n>> {
    let Some(entries) = mapping(node, "entities", diags) else {
        return Vec::new();
    };
    if entries.iter().all(|(k, _)| is_extension(k)) {
        diags.push(Diagnostic::structural("entities", "an ontology must declare at least one entity"));
    }
    let mut out = Vec::with_capacity(entries.len());
    for (name, body) in entries.iter().filter(|(k, _)| !is_extension(k)) {
        let path = format!("entities.{name}");
        let Some(body) = mapping(body, &path, diags) else { continue };
        check_keys(body, ENTITY_KEYS, &path, diags);

        let description = opt_string(body, "description", &path, diags);
        let fields_path = format!("{path}.fields");
        let fields = match get(body, "fields") {
            None => {
                diags.push(Diagnostic::structural(&fields_path, "missing required key `fields`"));
                Vec::new()
            }
            Some(fields) => match mapping(fields, &fields_path, diags) {
                Some(fields) if fields.iter().all(|(k, _)| is_extension(k)) => {
                    diags.push(Diagnostic::structural(&fields_path, "an entity must declare at least one field"));
                    Vec::new()
                }
                Some(fields) => fields
                    .iter()
                    .filter(|(fname, _)| !is_extension(fname))
                    .filter_map(|(fname, def)| read_field(fname, def, &format!("{fields_path}.{fname}"), diags))
                    .collect(),
                None => Vec::new(),
            },
        };
        out.push(RawEntity { name: name.clone(), description, fields });
    }
    out
}

fn read_field<'n>(name: &str, def: &'n Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<RawField<'n>> {
    // shorthand: `email: string`
    if let Node::String(ty) = def {
        return Some(RawField {
            name: name.to_string(),
            ty: ty.clone(),
            description: None,
            required: true,
            enum_: None,
            range: None,
            default: None,
        });
    }
    let body = mapping(def, path, diags)?;
    check_keys(body, FIELD_KEYS, path, diags);

    let ty = match get(body, "type") {
        Some(t) => string(t, &format!("{path}.type"), diags),
        None => {
            diags.push(Diagnostic::structural(format!("{path}.type"), "missing required key `type`"));
            None
        }
    };
    let description = opt_string(body, "description", path, diags);
    let required = match get(body, "required") {
        None => true,
        Some(Node::Bool(b)) => *b,
        Some(other) => {
            diags.push(expected(&format!("{path}.required"), "a boolean", other));
            true
        }
    };
    let enum_ = match get(body, "enum") {
        None => None,
        Some(node) => sequence(node, &format!("{path}.enum"), diags),
    };
    let range = get(body, "range").and_then(|node| read_range(node, &format!("{path}.range"), diags));

    Some(RawField {
        name: name.to_string(),
        ty: ty?,
        description,
        required,
        enum_,
        range,
        default: get(body, "default"),
    })
}

fn read_range(node: &Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<(f64, f64)> {
    match node {
        Node::Seq(items) => match items.as_slice() {
            [lo, hi] => match (lo.as_f64(), hi.as_f64()) {
                (Some(lo), Some(hi)) => Some((lo, hi)),
                _ => {
                    diags.push(Diagnostic::structural(path, "range bounds must be numbers"));
                    None
                }
            },
            _ => {
                diags.push(Diagnostic::structural(
                    path,
                    format!("range must be `[min, max]`, found {} item(s)", items.len()),
                ));
                None
            }
        },
        other => {
            diags.push(expected(path, "a `[min, max]` sequence", other));
            None
        }
    }
}

fn read_constraint(node: &Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<RawConstraint> {
    let body = mapping(node, path, diags)?;
    check_keys(body, CONSTRAINT_KEYS, path, diags);
    let expr = match get(body, "expr") {
        Some(e) => string(e, &format!("{path}.expr"), diags),
        None => {
            diags.push(Diagnostic::structural(format!("{path}.expr"), "missing required key `expr`"));
            None
        }
    };
    Some(RawConstraint {
        expr: expr?,
        message: opt_string(body, "message", path, diags),
        severity: opt_string(body, "severity", path, diags),
    })
}

fn read_example(node: &Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<Example> {
    let body = mapping(node, path, diags)?;
    check_keys(body, EXAMPLE_KEYS, path, diags);
    let mut side = |key: &str| match get(body, key) {
        Some(v) if v.has_non_finite() => {
            diags.push(non_finite(format!("{path}.{key}")));
            None
        }
        Some(v) => Some(v.to_json()),
        None => {
            diags.push(Diagnostic::structural(format!("{path}.{key}"), format!("missing required key `{key}`")));
            None
        }
    };
    let input = side("input");
    let output = side("output");
    let description = opt_string(body, "description", path, diags);
    Some(Example { input: input?, output: output?, description })
}

// ---- node helpers ----

fn expected(path: &str, what: &str, found: &Node) -> Diagnostic {
    Diagnostic::structural(path, format!("expected {what}, found a {}", found.kind_name()))
}

fn mapping<'n>(node: &'n Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<&'n [(String, Node)]> {
    match node {
        Node::Map(entries) => Some(entries),
        other => {
            diags.push(expected(path, "a mapping", other));
            None
        }
    }
}

fn sequence<'n>(node: &'n Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<&'n [Node]> {
    match node {
        Node::Seq(items) => Some(items),
        other => {
            diags.push(expected(path, "a sequence", other));
            None
        }
    }
}

fn string(node: &Node, path: &str, diags: &mut Vec<Diagnostic>) -> Option<String> {
    match node {
        Node::String(s) => Some(s.clone()),
        other => {
            diags.push(expected(path, "a string", other));
            None
        }
    }
}

fn opt_string(entries: &[(String, Node)], key: &str, parent: &str, diags: &mut Vec<Diagnostic>) -> Option<String> {
    match get(entries, key)? {
        Node::Null => None,
        node => string(node, &join(parent, key), diags),
    }
}

fn get<'n>(entries: &'n [(String, Node)], key: &str) -> Option<&'n Node> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn is_extension(key: &str) -> bool {
    key.starts_with("x-")
}

/// Unknown keys are errors unless namespaced `x-`; repeated keys are always errors.
fn check_keys(entries: &[(String, Node)], allowed: &[&str], parent: &str, diags: &mut Vec<Diagnostic>) {
    for (i, (key, _)) in entries.iter().enumerate() {
        if is_extension(key) {
            continue;
        }
        if !allowed.contains(&key.as_str()) {
            diags.push(Diagnostic::structural(
                join(parent, key),
                format!("unknown key `{key}` (allowed: {}; use an `x-` prefix for extensions)", allowed.join(", ")),
            ));
        } else if entries[..i].iter().any(|(k, _)| k == key) {
            diags.push(Diagnostic::structural(join(parent, key), format!("key `{key}` appears more than once")));
        }
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() { key.to_string() } else { format!("{parent}.{key}") }
}

// ————————————————————————————————————————————————————————————————————————————
// PASS 2: NAMES
// ————————————————————————————————————————————————————————————————————————————

fn check_names(raw: &RawOntology, diags: &mut Vec<Diagnostic>) -> bool {
    let before = diags.len();

    if !ONTOLOGY_NAME.is_match(&raw.name) {
        diags.push(Diagnostic::semantic("name", format!("`{}` is not a valid ontology name", raw.name)));
    }
    if let Some(v) = &raw.version {
        if !SEMVER.is_match(v) {
            diags.push(Diagnostic::semantic("version", format!("`{v}` is not a semantic version (MAJOR.MINOR.PATCH)")));
        }
    }

    for (i, entity) in raw.entities.iter().enumerate() {
        let path = format!("entities.{}", entity.name);
        if !IDENT.is_match(&entity.name) {
            diags.push(Diagnostic::semantic(&path, format!("`{}` is not a valid identifier", entity.name)));
        }
        if raw.entities[..i].iter().any(|e| e.name == entity.name) {
            diags.push(Diagnostic::semantic(&path, format!("duplicate entity name `{}`", entity.name)));
        }
        for (j, field) in entity.fields.iter().enumerate() {
            let fpath = format!("{path}.fields.{}", field.name);
            if !IDENT.is_match(&field.name) {
                diags.push(Diagnostic::semantic(&fpath, format!("`{}` is not a valid identifier", field.name)));
            }
            if entity.fields[..j].iter().any(|f| f.name == field.name) {
                diags.push(Diagnostic::semantic(
                    &fpath,
                    format!("duplicate field name `{}` in entity `{}`", field.name, entity.name),
                ));
            }
        }
    }

    if let Some(root) = &raw.root {
        if !raw.entities.iter().any(|e| &e.name == root) {
            diags.push(Diagnostic::semantic("root", format!("root entity `{root}` is not declared")));
        }
    }

    diags.len() == before
}

// ————————————————————————————————————————————————————————————————————————————
// PASS 3: TYPES (and IR assembly)
// ————————————————————————————————————————————————————————————————————————————

/// Assembles the IR, dropping fields whose type is unknown. The flag says whether none were dropped.
fn build(raw: &RawOntology, diags: &mut Vec<Diagnostic>) -> (Ontology, bool) {
    let mut types_known = true;
    let mut entities = Vec::with_capacity(raw.entities.len());
    for entity in &raw.entities {
        let mut fields = Vec::with_capacity(entity.fields.len());
        for raw_field in &entity.fields {
            let path = format!("entities.{}.fields.{}", entity.name, raw_field.name);
            match build_field(raw_field, &path, diags) {
                Some(f) => fields.push(f),
                None => types_known = false,
            }
        }
        entities.push(Entity { name: entity.name.clone(), description: entity.description.clone(), fields });
    }

    let constraints = raw
        .constraints
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let severity = match c.severity.as_deref() {
                None => Severity::Error,
                Some(s) => Severity::parse(s).unwrap_or_else(|| {
                    diags.push(Diagnostic::semantic(
                        format!("constraints[{i}].severity"),
                        format!("unknown severity `{s}` (expected error or warning)"),
                    ));
                    Severity::Error
                }),
            };
            Constraint { expr: c.expr.clone(), message: c.message.clone(), severity }
        })
        .collect();

    let ontology = Ontology {
        name: raw.name.clone(),
        description: raw.description.clone(),
        version: raw.version.clone(),
        root: raw.root.clone(),
        entities,
        constraints,
        examples: raw.examples.clone(),
    };
    (ontology, types_known)
}

fn build_field(raw: &RawField, path: &str, diags: &mut Vec<Diagnostic>) -> Option<Field> {
    let Some(ty) = FieldType::parse(&raw.ty) else {
        diags.push(Diagnostic::semantic(
            format!("{path}.type"),
            format!("unknown type `{}` (expected string, int, float, bool or list[<scalar>])", raw.ty),
        ));
        return None;
    };

    if raw.enum_.is_some() && raw.range.is_some() {
        diags.push(Diagnostic::semantic(path, "a field may carry `enum` or `range`, not both"));
    }

    let enum_ = raw.enum_.and_then(|items| build_enum(ty, items, &format!("{path}.enum"), diags));

    let range = raw.range.and_then(|(min, max)| {
        let rpath = format!("{path}.range");
        if !ty.permits_range() {
            diags.push(Diagnostic::semantic(&rpath, format!("`range` is only allowed on int or float fields, not {ty}")));
            return None;
        }
        if !min.is_finite() || !max.is_finite() {
            diags.push(Diagnostic::semantic(&rpath, format!("range bounds must be finite, found [{min}, {max}]")));
            return None;
        }
        if min >= max {
            diags.push(Diagnostic::semantic(&rpath, format!("range min ({min}) must be less than max ({max})")));
            return None;
        }
        if ty == FieldType::Int && (min.fract() != 0.0 || max.fract() != 0.0) {
            diags.push(Diagnostic::semantic(&rpath, "range bounds of an int field must be integers"));
            return None;
        }
        Some(Range { min, max })
    });

    let default = raw
        .default
        .and_then(|node| build_default(ty, enum_.as_deref(), range, node, &format!("{path}.default"), diags));

    Some(Field {
        name: raw.name.clone(),
        ty,
        description: raw.description.clone(),
        required: raw.required,
        enum_,
        range,
        default,
    })
}

fn build_enum(ty: FieldType, items: &[Node], path: &str, diags: &mut Vec<Diagnostic>) -> Option<Vec<Literal>> {
    if !ty.permits_enum() {
        diags.push(Diagnostic::semantic(path, format!("`enum` is only allowed on string, int or float fields, not {ty}")));
        return None;
    }
    if items.is_empty() {
        diags.push(Diagnostic::semantic(path, "enum must list at least one value"));
        return None;
    }
    let scalar = ty.scalar()?;
    let mut values: Vec<Literal> = Vec::with_capacity(items.len());
    let mut ok = true;
    for (i, item) in items.iter().enumerate() {
        if item.has_non_finite() {
            diags.push(non_finite(format!("{path}[{i}]")));
            ok = false;
            continue;
        }
        let lit = node_literal(item).and_then(|l| l.coerce(scalar));
        match lit {
            Some(lit) if values.contains(&lit) => {
                diags.push(Diagnostic::semantic(format!("{path}[{i}]"), format!("duplicate enum value {lit}")));
                ok = false;
            }
            Some(lit) => values.push(lit),
            None => {
                diags.push(Diagnostic::semantic(
                    format!("{path}[{i}]"),
                    format!("enum value of kind {} does not match field type {ty}", item.kind_name()),
                ));
                ok = false;
            }
        }
    }
    ok.then_some(values)
}

fn build_default(
    ty: FieldType,
    enum_: Option<&[Literal]>,
    range: Option<Range>,
    node: &Node,
    path: &str,
    diags: &mut Vec<Diagnostic>,
) -> Option<serde_json::Value> {
    let mismatch = || Diagnostic::semantic(path, format!("default of kind {} does not match field type {ty}", node.kind_name()));
    if node.has_non_finite() {
        diags.push(non_finite(path));
        return None;
    }

    let Some(scalar) = ty.scalar() else {
        // list[T]: every element must inhabit T
        let FieldType::List(elem) = ty else { return None };
        let items = match node {
            Node::Seq(items) => items,
            _ => {
                diags.push(mismatch());
                return None;
            }
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match node_literal(item).and_then(|l| l.coerce(elem)) {
                Some(l) => out.push(l.to_json()),
                None => {
                    diags.push(mismatch());
                    return None;
                }
            }
        }
        return Some(serde_json::Value::Array(out));
    };

    let Some(lit) = node_literal(node).and_then(|l| l.coerce(scalar)) else {
        diags.push(mismatch());
        return None;
    };
    if let Some(values) = enum_ {
        if !values.contains(&lit) {
            diags.push(Diagnostic::semantic(path, format!("default {lit} is not one of the enum values")));
            return None;
        }
    }
    if let (Some(r), Some(x)) = (range, lit.as_f64()) {
        if x < r.min || x > r.max {
            diags.push(Diagnostic::semantic(path, format!("default {lit} lies outside range [{}, {}]", r.min, r.max)));
            return None;
        }
    }
    Some(lit.to_json())
}

fn non_finite(path: impl Into<String>) -> Diagnostic {
    Diagnostic::semantic(path, "non-finite numbers (inf, nan) cannot be represented in the generated artifacts")
}

fn node_literal(node: &Node) -> Option<Literal> {
    match node {
        Node::String(s) => Some(Literal::String(s.clone())),
        Node::Int(i) => Some(Literal::Int(*i)),
        Node::Float(f) => Some(Literal::Float(ordered_float::OrderedFloat(*f))),
        Node::Bool(b) => Some(Literal::Bool(*b)),
        _ => None,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PERSON: &str = r#"
name: people
version: 1.2.0
entities:
  Person:
    description: A human.
    fields:
      name: string
      age: {type: int, range: [0, 150]}
      email: {type: string, required: false}
      status: {type: string, enum: [active, inactive, pending], default: active}
      tags: {type: "list[string]", required: false, default: [a, b]}
constraints:
  - expr: "age >= 18"
    message: adults only
    severity: warning
examples:
  - input: {name: Ada}
    output: {name: Ada, age: 36}
"#;

    fn load_yaml(src: &str) -> Result<Ontology, LoadError> {
        load(src, SourceFormat::Yaml)
    }

    #[test]
    fn loads_a_well_formed_ontology() {
        let o = load_yaml(PERSON).unwrap();
        assert_eq!(o.name, "people");
        assert_eq!(o.version.as_deref(), Some("1.2.0"));
        let person = &o.entities[0];
        let names: Vec<&str> = person.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "email", "status", "tags"]);
        assert_eq!(person.fields[0].ty, FieldType::String);
        assert!(person.fields[0].required);
        assert!(!person.fields[2].required);
        assert_eq!(person.fields[1].range, Some(Range { min: 0.0, max: 150.0 }));
        assert_eq!(person.fields[3].default, Some(json!("active")));
        assert_eq!(person.fields[4].default, Some(json!(["a", "b"])));
        assert_eq!(o.constraints[0].severity, Severity::Warning);
        assert_eq!(o.examples[0].output, json!({"name": "Ada", "age": 36}));
    }

    #[test]
    fn json_and_yaml_agree() {
        let json_src = r#"{
            "name": "people",
            "version": "1.2.0",
            "entities": {
                "Person": {
                    "description": "A human.",
                    "fields": {
                        "name": "string",
                        "age": {"type": "int", "range": [0, 150]},
                        "email": {"type": "string", "required": false},
                        "status": {"type": "string", "enum": ["active", "inactive", "pending"], "default": "active"},
                        "tags": {"type": "list[string]", "required": false, "default": ["a", "b"]}
                    }
                }
            },
            "constraints": [{"expr": "age >= 18", "message": "adults only", "severity": "warning"}],
            "examples": [{"input": {"name": "Ada"}, "output": {"name": "Ada", "age": 36}}]
        }"#;
        assert_eq!(load(json_src, SourceFormat::Json).unwrap(), load_yaml(PERSON).unwrap());
    }

    #[test]
    fn duplicate_entities_fail_with_a_semantic_error() {
        let src = r#"{"name": "jobs", "entities": {
            "Job": {"fields": {"title": "string"}},
            "Job": {"fields": {"salary": "float"}}
        }}"#;
        let err = load(src, SourceFormat::Json).unwrap_err();
        assert!(!err.is_structural());
        assert!(err.mentions("duplicate entity name `Job`"), "{err}");
    }

    #[test]
    fn yaml_duplicate_entities_fail_with_a_semantic_error() {
        let src = "name: jobs\nentities:\n  Job:\n    fields:\n      title: string\n  Job:\n    fields:\n      salary: float\n";
        let err = load_yaml(src).unwrap_err();
        assert!(!err.is_structural());
        assert_eq!(err.diagnostics[0].path, "entities.Job");
        assert!(err.mentions("duplicate entity name `Job`"), "{err}");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let field = |def: &str| format!("name: x\nentities:\n  A:\n    fields:\n      n: {def}\n");

        for def in ["{type: float, range: [0, .inf]}", "{type: float, range: [.nan, 5]}", "{type: float, range: [-.inf, 0]}"] {
            let err = load_yaml(&field(def)).unwrap_err();
            assert_eq!(err.diagnostics[0].path, "entities.A.fields.n.range", "{def}");
            assert!(err.mentions("range bounds must be finite"), "{err}");
        }

        let err = load_yaml(&field("{type: float, default: .nan}")).unwrap_err();
        assert_eq!(err.diagnostics[0].path, "entities.A.fields.n.default");
        assert!(err.mentions("non-finite"), "{err}");

        let err = load_yaml(&field("{type: float, enum: [1.5, .inf]}")).unwrap_err();
        assert_eq!(err.diagnostics[0].path, "entities.A.fields.n.enum[1]");

        let src = format!("{}constraints:\n  - expr: n < 1e999\n", field("float"));
        let err = load_yaml(&src).unwrap_err();
        assert_eq!(err.diagnostics[0].path, "constraints[0].expr");
        assert!(err.mentions("`1e999` is out of range"), "{err}");

        let src = format!("{}examples:\n  - input: {{n: .inf}}\n    output: {{n: 1}}\n", field("float"));
        let err = load_yaml(&src).unwrap_err();
        assert_eq!(err.diagnostics[0].path, "examples[0].input");
    }

    #[test]
    fn unresolved_constraint_identifier_is_rejected() {
        let src = "name: x\nentities:\n  A:\n    fields:\n      price: float\nconstraints:\n  - expr: nonexistent_field > 0\n";
        let err = load_yaml(src).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].path, "constraints[0].expr");
        assert!(err.mentions("unresolved identifier `nonexistent_field`"));
    }

    #[test]
    fn structural_problems_stop_before_semantics() {
        let src = "name: x\nbogus: 1\nx-owner: team\nentities:\n  A:\n    fields:\n      f: {type: int, requird: false}\n      g: {type: nope}\n";
        let err = load_yaml(src).unwrap_err();
        assert!(err.diagnostics.iter().all(|d| d.kind == DiagnosticKind::Structural), "{err}");
        assert!(err.mentions("unknown key `bogus`"));
        assert!(err.mentions("unknown key `requird`"));
        // forward-compat keys pass; the bad type is a semantic problem and is not reached
        assert!(!err.mentions("x-owner"));
        assert!(!err.mentions("nope"));
    }

    #[test]
    fn extension_keys_are_skipped_in_name_maps() {
        let src = "name: x\nentities:\n  x-draft: {notes: wip}\n  A:\n    fields:\n      x-owner: team\n      f: int\n";
        let o = load_yaml(src).unwrap();
        assert_eq!(o.entities.len(), 1);
        assert_eq!(o.entities[0].fields.len(), 1);

        let err = load_yaml("name: x\nentities:\n  A:\n    fields:\n      x-owner: team\n").unwrap_err();
        assert!(err.mentions("at least one field"));
    }

    #[test]
    fn missing_keys_and_bad_nesting() {
        let err = load_yaml("description: nothing\n").unwrap_err();
        assert!(err.mentions("missing required key `name`"));
        assert!(err.mentions("missing required key `entities`"));

        let err = load_yaml("name: x\nentities: [A, B]\n").unwrap_err();
        assert!(err.mentions("expected a mapping, found a sequence"));

        let err = load_yaml("name: x\nentities: {}\n").unwrap_err();
        assert!(err.mentions("at least one entity"));

        let err = load_yaml("name: x\nentities:\n  A:\n    fields:\n      r: {type: int, range: [1]}\n").unwrap_err();
        assert!(err.mentions("found 1 item(s)"));

        assert!(load_yaml("").is_err());
        assert!(load_yaml("~\n").unwrap_err().mentions("document is empty"));
        assert!(load("{", SourceFormat::Json).unwrap_err().mentions("invalid JSON"));
    }

    #[test]
    fn semantic_problems_are_batched() {
        let src = r#"
name: x
version: "1.0"
root: Nowhere
entities:
  A:
    fields:
      s: {type: string, range: [0, 1]}
      b: {type: bool, enum: [true]}
      i: {type: int, range: [5, 1]}
      j: {type: int, range: [0.5, 2]}
      e: {type: string, enum: [a, a]}
      d: {type: int, range: [0, 10], default: 11}
      k: {type: float, enum: [1], range: [0, 2]}
      l: {type: "list[int]", default: [1, x]}
      m: {type: string, enum: []}
      "bad name": string
constraints:
  - expr: "s != ''"
    severity: fatal
"#;
        let err = load_yaml(src).unwrap_err();
        let text = err.to_string();
        for needle in [
            "is not a semantic version",
            "root entity `Nowhere` is not declared",
            "`range` is only allowed on int or float fields, not string",
            "`enum` is only allowed on string, int or float fields, not bool",
            "range min (5) must be less than max (1)",
            "range bounds of an int field must be integers",
            "duplicate enum value \"a\"",
            "default 11 lies outside range [0, 10]",
            "`enum` or `range`, not both",
            "default of kind sequence does not match field type list[int]",
            "enum must list at least one value",
            "`bad name` is not a valid identifier",
            "unknown severity `fatal`",
        ] {
            assert!(text.contains(needle), "missing {needle:?} in:\n{text}");
        }
        assert!(!err.is_structural());
    }

    #[test]
    fn unknown_type_blocks_constraint_resolution_only() {
        let src = "name: x\nentities:\n  A:\n    fields:\n      f: {type: integer}\nconstraints:\n  - expr: f > 0\n";
        let err = load_yaml(src).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1, "{err}");
        assert!(err.mentions("unknown type `integer`"));
    }

    #[test]
    fn folding_problems_surface_as_load_errors() {
        let src = "name: x\nentities:\n  A:\n    fields:\n      n: {type: int, range: [0, 10]}\nconstraints:\n  - expr: n > 20\n";
        let err = load_yaml(src).unwrap_err();
        assert!(err.mentions("empty range"), "{err}");
    }

    #[test]
    fn source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension(Path::new("a/b.YML")), Some(SourceFormat::Yaml));
        assert_eq!(SourceFormat::from_extension(Path::new("o.json")), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_extension(Path::new("o.toml")), None);
        assert_eq!("yaml".parse::<SourceFormat>(), Ok(SourceFormat::Yaml));
        assert!("xml".parse::<SourceFormat>().is_err());
    }
}
