//! Cross-target agreement check.
//!
//! Every artifact is re-read into the same per-entity shape (field order,
//! required set, enum literals, numeric bounds where the target exposes them)
//! and compared with what lowering derived from the IR. Never part of the
//! compile path: a report with discrepancies signals an emitter regression.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::emit::{self, grammar, numeric, rust, Artifact, Target};
use crate::error::InvariantViolation;
use crate::expr::{Bound, Bounds};
use crate::ir::{fmt_num, Literal, Ontology};
use crate::lower::{EntityPlan, Plan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    /// Entity or field absent from the artifact, or the artifact is unreadable.
    Missing,
    FieldOrder,
    Required,
    Enum,
    Bounds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub entity: String,
    /// `None` for entity-level findings (missing entity, field order).
    pub field: Option<String>,
    pub target: Target,
    pub aspect: Aspect,
    pub expected: String,
    pub found: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Targets that were compared, in the order given.
    pub checked: Vec<Target>,
    pub discrepancies: Vec<Discrepancy>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn for_target(&self, target: Target) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(move |d| d.target == target)
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aspect::Missing => "missing",
            Aspect::FieldOrder => "field order",
            Aspect::Required => "required",
            Aspect::Enum => "enum",
            Aspect::Bounds => "bounds",
        })
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} {}.{}", self.target, self.entity, field)?,
            None => write!(f, "{} {}", self.target, self.entity)?,
        }
        write!(f, ": {} mismatch, expected {}, found {}", self.aspect, self.expected, self.found)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

pub fn check(artifacts: &IndexMap<Target, String>, ontology: &Ontology) -> Result<ConsistencyReport, InvariantViolation> {
    let plan = emit::plan_for(ontology)?;
    let mut report = ConsistencyReport::default();
    for (&target, text) in artifacts {
        report.checked.push(target);
        let parsed = match target {
            Target::JsonSchema => parse_schema(text),
            Target::Rust => Ok(parse_rust(text, &plan)),
            Target::TypeScript => Ok(parse_typescript(text)),
            Target::Grammar => Ok(parse_grammar(text, &plan)),
        };
        let before = report.discrepancies.len();
        match parsed {
            Ok(shapes) => {
                for ep in &plan.entities {
                    compare_entity(target, ep, shapes.get(&ep.entity.name), &mut report.discrepancies);
                }
            }
            Err(message) => {
                for ep in &plan.entities {
                    report.discrepancies.push(Discrepancy {
                        entity: ep.entity.name.clone(),
                        field: None,
                        target,
                        aspect: Aspect::Missing,
                        expected: "a readable artifact".to_string(),
                        found: message.clone(),
                    });
                }
            }
        }
        let found = report.discrepancies.len() - before;
        if found == 0 {
            debug!(%target, "artifact agrees with the ontology");
        } else {
            warn!(%target, discrepancies = found, "artifact disagrees with the ontology");
        }
    }
    Ok(report)
}

/// Same as [`check`] over the output of [`emit::emit_all`].
pub fn check_artifacts(artifacts: &[Artifact], ontology: &Ontology) -> Result<ConsistencyReport, InvariantViolation> {
    let map: IndexMap<Target, String> = artifacts.iter().map(|a| (a.target, a.text.clone())).collect();
    check(&map, ontology)
}

// ---- comparison ----

#[derive(Debug, Clone, Default)]
struct EntityShape {
    fields: Vec<FieldShape>,
}

#[derive(Debug, Clone)]
struct FieldShape {
    name: String,
    required: bool,
    /// Canonical JSON text of each literal.
    values: Option<Vec<String>>,
    /// `None` when the target has no way to state bounds.
    bounds: Option<Bounds>,
}

type Shapes = IndexMap<String, EntityShape>;

fn compare_entity(target: Target, ep: &EntityPlan, found: Option<&EntityShape>, out: &mut Vec<Discrepancy>) {
    let entity = &ep.entity.name;
    let mut report = |field: Option<&str>, aspect: Aspect, expected: String, found: String| {
        out.push(Discrepancy {
            entity: entity.clone(),
            field: field.map(str::to_string),
            target,
            aspect,
            expected,
            found,
        });
    };
    let Some(shape) = found else {
        report(None, Aspect::Missing, format!("entity `{entity}`"), "nothing".to_string());
        return;
    };

    let expected_order: Vec<&str> = ep.fields.iter().map(|f| f.field.name.as_str()).collect();
    let found_order: Vec<&str> = shape.fields.iter().map(|f| f.name.as_str()).collect();
    if expected_order != found_order {
        report(None, Aspect::FieldOrder, list(&expected_order), list(&found_order));
    }

    for fp in &ep.fields {
        let name = fp.field.name.as_str();
        let Some(fs) = shape.fields.iter().find(|f| f.name == name) else {
            report(Some(name), Aspect::Missing, format!("field `{name}`"), "nothing".to_string());
            continue;
        };
        if fs.required != fp.field.required {
            report(Some(name), Aspect::Required, optionality(fp.field.required), optionality(fs.required));
        }
        let expected_values: Option<Vec<String>> =
            fp.values.as_ref().map(|vs| vs.iter().map(Literal::to_string).collect());
        if expected_values != fs.values {
            report(Some(name), Aspect::Enum, values_text(&expected_values), values_text(&fs.values));
        }
        if let Some(bounds) = fs.bounds.filter(|b| *b != fp.bounds) {
            report(Some(name), Aspect::Bounds, grammar::bounds_text(&fp.bounds), grammar::bounds_text(&bounds));
        }
    }
}

fn optionality(required: bool) -> String {
    if required { "required" } else { "optional" }.to_string()
}

fn list(items: &[&str]) -> String {
    format!("[{}]", items.join(", "))
}

fn values_text(values: &Option<Vec<String>>) -> String {
    match values {
        Some(vs) => format!("[{}]", vs.join(", ")),
        None => "no enum".to_string(),
    }
}

/// Literal spelling shared by every target: JSON text, integral floats without `.0`.
fn canonical(v: &Value) -> String {
    Literal::from_json(v).map_or_else(|| v.to_string(), |l| l.to_string())
}

// ————————————————————————————————————————————————————————————————————————————
// READERS
// ————————————————————————————————————————————————————————————————————————————

// ---- JSON Schema ----

fn parse_schema(text: &str) -> Result<Shapes, String> {
    let doc: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    let definitions = doc
        .get("definitions")
        .and_then(Value::as_object)
        .ok_or_else(|| "no `definitions` object".to_string())?;

    let mut shapes = Shapes::new();
    for (name, def) in definitions {
        let required: Vec<&str> = def
            .get("required")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let mut fields = Vec::new();
        for (field, prop) in def.get("properties").and_then(Value::as_object).into_iter().flatten() {
            fields.push(FieldShape {
                name: field.clone(),
                required: required.contains(&field.as_str()),
                values: prop.get("enum").and_then(Value::as_array).map(|vs| vs.iter().map(canonical).collect()),
                bounds: Some(schema_bounds(prop)),
            });
        }
        shapes.insert(name.clone(), EntityShape { fields });
    }
    Ok(shapes)
}

fn schema_bounds(prop: &Value) -> Bounds {
    let num = |key: &str| prop.get(key).and_then(Value::as_f64);
    let side = |incl: &str, excl: &str| {
        num(incl)
            .map(|value| Bound { value, inclusive: true })
            .or_else(|| num(excl).map(|value| Bound { value, inclusive: false }))
    };
    Bounds { lower: side("minimum", "exclusiveMinimum"), upper: side("maximum", "exclusiveMaximum") }
}

// ---- Rust models ----

static CHECK_RANGE: Lazy<Regex> = Lazy::new(|| {
    let bound = r"(None|Some\(Bound \{ value: ([^,]+), inclusive: (true|false) \}\))";
    Regex::new(&format!(r#"check_range\(&mut errors, "([^"]*)", [^,]+, {bound}, {bound}\);"#)).expect("invalid regex")
});

fn parse_rust(text: &str, plan: &Plan) -> Shapes {
    let lines: Vec<&str> = text.lines().collect();
    let mut shapes = Shapes::new();
    for ep in &plan.entities {
        let ty = rust::ident(&ep.entity.name);
        let Some(body) = block(&lines, &format!("pub struct {ty} {{")) else { continue };
        let checks = rust_bounds(&block(&lines, &format!("impl {ty} {{")).unwrap_or_default());

        let mut fields = Vec::new();
        let mut rename: Option<String> = None;
        for line in body {
            let t = line.trim();
            if let Some(rest) = t.strip_prefix("#[serde(rename = ") {
                rename = rust_string(rest);
                continue;
            }
            let Some((member, field_ty)) = t.strip_prefix("pub ").and_then(|d| d.trim_end_matches(',').split_once(": "))
            else {
                continue;
            };
            let name = rename.take().unwrap_or_else(|| member.trim_start_matches("r#").to_string());
            let (required, inner) = match field_ty.strip_prefix("Option<").and_then(|t| t.strip_suffix('>')) {
                Some(inner) => (false, inner),
                None => (true, field_ty),
            };
            fields.push(FieldShape {
                values: rust_enum(&lines, inner),
                bounds: Some(checks.get(&name).copied().unwrap_or_default()),
                name,
                required,
            });
        }
        shapes.insert(ep.entity.name.clone(), EntityShape { fields });
    }
    shapes
}

/// Lines strictly between a top-level `header` line and its closing `}`.
fn block<'t>(lines: &[&'t str], header: &str) -> Option<Vec<&'t str>> {
    let start = lines.iter().position(|l| *l == header)?;
    Some(lines[start + 1..].iter().take_while(|l| **l != "}").copied().collect())
}

fn rust_bounds(impl_body: &[&str]) -> HashMap<String, Bounds> {
    let mut out = HashMap::new();
    for line in impl_body {
        let Some(c) = CHECK_RANGE.captures(line) else { continue };
        let side = |value: Option<regex::Match>, inclusive: Option<regex::Match>| -> Option<Bound> {
            let value = value?.as_str().parse::<f64>().ok()?;
            Some(Bound { value, inclusive: inclusive?.as_str() == "true" })
        };
        out.insert(
            c[1].to_string(),
            Bounds { lower: side(c.get(3), c.get(4)), upper: side(c.get(6), c.get(7)) },
        );
    }
    out
}

/// Allowed literals of a generated enum type named `ty`, if there is one.
fn rust_enum(lines: &[&str], ty: &str) -> Option<Vec<String>> {
    if let Some(body) = block(lines, &format!("pub enum {ty} {{")) {
        let values = body
            .iter()
            .filter_map(|l| l.trim().strip_prefix("#[serde(rename = ").and_then(rust_string))
            .map(|s| Literal::String(s).to_string())
            .collect();
        return Some(values);
    }
    let newtype = lines.iter().any(|l| l.starts_with(&format!("pub struct {ty}(")));
    if !newtype {
        return None;
    }
    let body = block(lines, &format!("impl {ty} {{"))?;
    let allowed = body.iter().find_map(|l| l.trim().strip_prefix("pub const ALLOWED: "))?;
    let items = allowed.split_once("= &[")?.1.strip_suffix("];")?;
    Some(
        items
            .split(", ")
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.trim().parse::<f64>().ok())
            .map(fmt_num)
            .collect(),
    )
}

/// Reads the Rust string literal at the start of `s`.
fn rust_string(s: &str) -> Option<String> {
    let mut chars = s.strip_prefix('"')?.chars();
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out),
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '0' => out.push('\0'),
                'u' => {
                    let rest: String = chars.by_ref().skip(1).take_while(|c| *c != '}').collect();
                    out.push(char::from_u32(u32::from_str_radix(&rest, 16).ok()?)?);
                }
                other => out.push(other),
            },
            c => out.push(c),
        }
    }
    None
}

// ---- TypeScript interfaces ----

fn parse_typescript(text: &str) -> Shapes {
    let lines: Vec<&str> = text.lines().collect();
    let mut shapes = Shapes::new();
    for (i, line) in lines.iter().enumerate() {
        let Some(name) = line.strip_prefix("export interface ").and_then(|l| l.strip_suffix(" {")) else {
            continue;
        };
        let mut fields = Vec::new();
        for member in lines[i + 1..].iter().take_while(|l| **l != "}") {
            let t = member.trim();
            if t.is_empty() || t.starts_with('/') || t.starts_with('*') {
                continue;
            }
            let Some((lhs, ty)) = t.trim_end_matches(';').split_once(": ") else { continue };
            fields.push(FieldShape {
                name: lhs.trim_end_matches('?').to_string(),
                required: !lhs.ends_with('?'),
                values: literal_union(ty),
                bounds: None,
            });
        }
        shapes.insert(name.to_string(), EntityShape { fields });
    }
    shapes
}

/// `"a" | "b"` or `1 | 2`; `None` for plain types.
fn literal_union(ty: &str) -> Option<Vec<String>> {
    let ty = ty.trim();
    if ["string", "number", "boolean", "unknown"].contains(&ty) || ty.ends_with("[]") {
        return None;
    }
    let mut out = Vec::new();
    let mut rest = ty;
    loop {
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        out.push(canonical(&stream.next()?.ok()?));
        let tail = rest[stream.byte_offset()..].trim_start();
        if tail.is_empty() {
            return Some(out);
        }
        rest = tail.strip_prefix('|')?.trim_start();
    }
}

// ---- PEG grammar ----

fn parse_grammar(text: &str, plan: &Plan) -> Shapes {
    let rules: HashMap<&str, &str> = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once(" <- "))
        .collect();

    let mut shapes = Shapes::new();
    for ep in &plan.entities {
        let e = &ep.rule;
        let Some(object) = rules.get(format!("{e}_object").as_str()) else { continue };
        let mut shape = EntityShape::default();
        if let Some(members) = rules.get(format!("{e}_members").as_str()) {
            let all_optional = object.contains(&format!("{e}_members?"));
            let alts: Vec<&str> = members.split(" / ").collect();
            let order = pair_tokens(alts.first().copied().unwrap_or_default(), false);
            let required = if all_optional {
                Vec::new()
            } else {
                pair_tokens(alts.last().copied().unwrap_or_default(), true)
            };
            for pair in order {
                let Some(field) = rules.get(pair).and_then(|body| peg_literal(body)).and_then(|key| {
                    serde_json::from_str::<String>(&key).ok()
                }) else {
                    continue;
                };
                let prefix = pair.trim_end_matches("_pair");
                let value = rules.get(format!("{prefix}_value").as_str()).copied().unwrap_or_default();
                shape.fields.push(FieldShape {
                    name: field,
                    required: required.contains(&pair),
                    values: grammar_enum(value),
                    bounds: Some(terminal_bounds(value)),
                });
            }
        }
        shapes.insert(ep.entity.name.clone(), shape);
    }
    shapes
}

/// `*_pair` references in one members alternative; `top_level_only` skips
/// the ones wrapped in an optional group.
fn pair_tokens(alt: &str, top_level_only: bool) -> Vec<&str> {
    let mut depth = 0usize;
    let mut out = Vec::new();
    for tok in alt.split_whitespace() {
        match tok {
            "(" => depth += 1,
            ")" | ")?" | ")*" => depth = depth.saturating_sub(1),
            t if t.ends_with("_pair") && (depth == 0 || !top_level_only) => out.push(t),
            _ => {}
        }
    }
    out
}

fn terminal_bounds(value: &str) -> Bounds {
    value
        .strip_prefix("int_")
        .or_else(|| value.strip_prefix("number_"))
        .and_then(numeric::parse_bound_tags)
        .unwrap_or_default()
}

/// Literal alternation `( '"a"' / '"b"' )`.
fn grammar_enum(value: &str) -> Option<Vec<String>> {
    if !value.starts_with("( '") {
        return None;
    }
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('\'') {
        let (lit, len) = peg_literal_at(&rest[start..])?;
        let v: Value = serde_json::from_str(&lit).ok()?;
        out.push(canonical(&v));
        rest = &rest[start + len..];
    }
    Some(out)
}

/// Contents of the first single-quoted literal in `body`.
fn peg_literal(body: &str) -> Option<String> {
    let start = body.find('\'')?;
    peg_literal_at(&body[start..]).map(|(lit, _)| lit)
}

/// Unescaped contents and byte length of the literal starting at `s[0] == '\''`.
fn peg_literal_at(s: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => return Some((out, i + 1)),
            '\\' => out.push(chars.next()?.1),
            c => out.push(c),
        }
    }
    None
}
