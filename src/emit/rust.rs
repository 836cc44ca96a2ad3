// Typed value-object emitter: serde structs, one per entity.
//
// Required fields are plain members, optional ones `Option<T>`. Enums become
// their own types; numeric bounds become a generated `validate()` since the
// type system cannot carry them.

use crate::expr::Bound;
use crate::ir::{FieldType, Literal, Scalar};
use crate::lower::{pascal_case, snake_case, EntityPlan, FieldPlan, Plan};

const PREAMBLE: &str = r#"use serde::{Deserialize, Serialize};

/// One end of a numeric interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

/// A constraint that has no native representation in these types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnrepresentedConstraint {
    /// Position in the ontology's constraint list.
    pub index: usize,
    pub expr: &'static str,
    pub message: Option<&'static str>,
    pub severity: &'static str,
    pub fields: &'static [&'static str],
}

#[allow(dead_code)]
fn check_range(errors: &mut Vec<String>, field: &str, value: f64, lower: Option<Bound>, upper: Option<Bound>) {
    if let Some(b) = lower {
        if value < b.value || (!b.inclusive && value == b.value) {
            let op = if b.inclusive { ">=" } else { ">" };
            errors.push(format!("{field}: {value} violates {field} {op} {}", b.value));
        }
    }
    if let Some(b) = upper {
        if value > b.value || (!b.inclusive && value == b.value) {
            let op = if b.inclusive { "<=" } else { "<" };
            errors.push(format!("{field}: {value} violates {field} {op} {}", b.value));
        }
    }
}
"#;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for",
    "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static",
    "struct", "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
    "final", "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Names that cannot be raw identifiers.
const PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate", "_"];

pub fn emit(plan: &Plan) -> String {
    let ontology = plan.ontology;
    let mut out = String::with_capacity(8 * 1024);
    out.push_str(&format!("// {}\n", super::banner(ontology)));
    if let Some(d) = &ontology.description {
        for line in d.lines() {
            out.push_str(&format!("// {line}\n"));
        }
    }
    out.push('\n');
    out.push_str(PREAMBLE);

    for ep in &plan.entities {
        for fp in &ep.fields {
            if let (Some(values), Some(type_name)) = (&fp.values, &fp.type_name) {
                out.push('\n');
                out.push_str(&enum_type(type_name, fp, values));
            }
        }
        out.push('\n');
        out.push_str(&entity_struct(ep));
        out.push('\n');
        out.push_str(&entity_impl(ep));
    }

    if let Some(union) = &plan.union_name {
        out.push_str(&format!("\n/// Any entity of the `{}` ontology.\n", ontology.name));
        out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        out.push_str("#[serde(untagged)]\n");
        out.push_str(&format!("pub enum {union} {{\n"));
        for ep in &plan.entities {
            let ty = ident(&ep.entity.name);
            out.push_str(&format!("    {ty}({ty}),\n"));
        }
        out.push_str("}\n");
    }
    out
}

// ---- structs ----

fn entity_struct(ep: &EntityPlan) -> String {
    let name = ident(&ep.entity.name);
    let mut out = doc_lines(ep.entity.description.as_deref(), "");
    out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
    out.push_str("#[serde(deny_unknown_fields)]\n");
    out.push_str(&format!("pub struct {name} {{\n"));
    for fp in &ep.fields {
        let field = fp.field;
        let member = member_name(&field.name);
        out.push_str(&doc_lines(field.description.as_deref(), "    "));
        if member.trim_start_matches("r#") != field.name {
            out.push_str(&format!("    #[serde(rename = {:?})]\n", field.name));
        }
        let default_fn = field.default.as_ref().map(|_| format!("{name}::{}", default_fn_name(&field.name)));
        let ty = rust_type(fp);
        match (field.required, default_fn) {
            (true, None) => {}
            (true, Some(f)) => out.push_str(&format!("    #[serde(default = \"{f}\")]\n")),
            (false, None) => out.push_str("    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n"),
            (false, Some(f)) => {
                out.push_str(&format!("    #[serde(default = \"{f}\", skip_serializing_if = \"Option::is_none\")]\n"))
            }
        }
        if field.required {
            out.push_str(&format!("    pub {member}: {ty},\n"));
        } else {
            out.push_str(&format!("    pub {member}: Option<{ty}>,\n"));
        }
    }
    out.push_str("}\n");
    out
}

fn entity_impl(ep: &EntityPlan) -> String {
    let name = ident(&ep.entity.name);
    let mut out = format!("impl {name} {{\n");

    out.push_str("    pub const UNREPRESENTED_CONSTRAINTS: &'static [UnrepresentedConstraint] = &[");
    if ep.opaque.is_empty() {
        out.push_str("];\n");
    } else {
        out.push('\n');
        for oc in &ep.opaque {
            let message = match &oc.constraint.message {
                Some(m) => format!("Some({m:?})"),
                None => "None".to_string(),
            };
            let fields: Vec<String> = oc.fields.iter().map(|f| format!("{f:?}")).collect();
            out.push_str(&format!(
                "        UnrepresentedConstraint {{ index: {}, expr: {:?}, message: {message}, severity: {:?}, fields: &[{}] }},\n",
                oc.index,
                oc.constraint.expr,
                oc.constraint.severity.as_str(),
                fields.join(", ")
            ));
        }
        out.push_str("    ];\n");
    }

    out.push_str("\n    /// Checks the numeric bounds the field types cannot carry.\n");
    out.push_str("    pub fn validate(&self) -> Result<(), Vec<String>> {\n");
    let bounded: Vec<&FieldPlan> = ep.fields.iter().filter(|fp| !fp.bounds.is_unbounded()).collect();
    if bounded.is_empty() {
        out.push_str("        Ok(())\n");
    } else {
        out.push_str("        let mut errors = Vec::new();\n");
        for fp in bounded {
            out.push_str(&range_check(fp));
        }
        out.push_str("        if errors.is_empty() { Ok(()) } else { Err(errors) }\n");
    }
    out.push_str("    }\n");

    for fp in &ep.fields {
        if let Some(default) = &fp.field.default {
            let expr = default_expr(fp, default);
            let expr = if fp.field.required { expr } else { format!("Some({expr})") };
            let ty = if fp.field.required { rust_type(fp) } else { format!("Option<{}>", rust_type(fp)) };
            out.push_str(&format!("\n    fn {}() -> {ty} {{\n        {expr}\n    }}\n", default_fn_name(&fp.field.name)));
        }
    }
    out.push_str("}\n");
    out
}

fn range_check(fp: &FieldPlan) -> String {
    let member = member_name(&fp.field.name);
    let args = format!("{}, {}", bound_arg(fp.bounds.lower), bound_arg(fp.bounds.upper));
    let name = &fp.field.name;
    let cast = if fp.field.ty == FieldType::Int { " as f64" } else { "" };
    if fp.field.required {
        format!("        check_range(&mut errors, {name:?}, self.{member}{cast}, {args});\n")
    } else {
        format!(
            "        if let Some(v) = self.{member} {{\n            check_range(&mut errors, {name:?}, v{cast}, {args});\n        }}\n"
        )
    }
}

fn bound_arg(b: Option<Bound>) -> String {
    match b {
        Some(b) => format!("Some(Bound {{ value: {:?}, inclusive: {} }})", b.value, b.inclusive),
        None => "None".to_string(),
    }
}

fn default_expr(fp: &FieldPlan, default: &serde_json::Value) -> String {
    if let (Some(type_name), Some(values), Some(scalar)) = (&fp.type_name, &fp.values, fp.field.ty.scalar()) {
        let lit = Literal::from_json(default).and_then(|l| l.coerce(scalar));
        return match (scalar, lit) {
            (Scalar::String, Some(Literal::String(s))) => {
                let variants = variant_names(values);
                let at = values.iter().position(|v| v == &Literal::String(s.clone())).unwrap_or(0);
                format!("{type_name}::{}", variants[at])
            }
            (_, Some(l)) => format!("{type_name}({})", numeric_literal(scalar, &l)),
            (_, None) => format!("{type_name}::ALLOWED[0]"),
        };
    }
    match (fp.field.ty, default) {
        (FieldType::String, serde_json::Value::String(s)) => format!("{s:?}.to_string()"),
        (FieldType::Int, v) => v.as_i64().map_or_else(|| "0".to_string(), |i| i.to_string()),
        (FieldType::Float, v) => format!("{:?}", v.as_f64().unwrap_or_default()),
        (FieldType::Bool, v) => v.as_bool().unwrap_or_default().to_string(),
        (FieldType::List(s), serde_json::Value::Array(items)) => {
            let items: Vec<String> = items
                .iter()
                .filter_map(|v| Literal::from_json(v).and_then(|l| l.coerce(s)))
                .map(|l| match l {
                    Literal::String(s) => format!("{s:?}.to_string()"),
                    other => numeric_literal(s, &other),
                })
                .collect();
            format!("vec![{}]", items.join(", "))
        }
        _ => "Default::default()".to_string(),
    }
}

// ---- enums ----

fn enum_type(type_name: &str, fp: &FieldPlan, values: &[Literal]) -> String {
    let field = fp.field;
    let mut out = format!("/// Allowed values of `{}`.\n", field.name);
    match field.ty.scalar() {
        Some(Scalar::String) => {
            out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]\n");
            out.push_str(&format!("pub enum {type_name} {{\n"));
            for (value, variant) in values.iter().zip(variant_names(values)) {
                if let Literal::String(s) = value {
                    out.push_str(&format!("    #[serde(rename = {s:?})]\n    {variant},\n"));
                }
            }
            out.push_str("}\n");
        }
        Some(scalar @ (Scalar::Int | Scalar::Float)) => {
            let (prim, derives) = match scalar {
                Scalar::Int => ("i64", "Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize"),
                _ => ("f64", "Debug, Clone, Copy, PartialEq, Serialize, Deserialize"),
            };
            let allowed: Vec<String> = values.iter().map(|v| numeric_literal(scalar, v)).collect();
            out.push_str(&format!("#[derive({derives})]\n"));
            out.push_str(&format!("#[serde(try_from = \"{prim}\", into = \"{prim}\")]\n"));
            out.push_str(&format!("pub struct {type_name}({prim});\n\n"));
            out.push_str(&format!("impl {type_name} {{\n"));
            out.push_str(&format!("    pub const ALLOWED: &'static [{prim}] = &[{}];\n\n", allowed.join(", ")));
            out.push_str(&format!("    pub fn get(self) -> {prim} {{\n        self.0\n    }}\n}}\n\n"));
            out.push_str(&format!("impl TryFrom<{prim}> for {type_name} {{\n"));
            out.push_str("    type Error = String;\n\n");
            out.push_str(&format!("    fn try_from(value: {prim}) -> Result<Self, Self::Error> {{\n"));
            out.push_str("        if Self::ALLOWED.contains(&value) {\n");
            out.push_str("            Ok(Self(value))\n");
            out.push_str("        } else {\n");
            out.push_str(&format!(
                "            Err(format!(\"{{value}} is not an allowed {}\"))\n",
                field.name
            ));
            out.push_str("        }\n    }\n}\n\n");
            out.push_str(&format!("impl From<{type_name}> for {prim} {{\n"));
            out.push_str(&format!("    fn from(v: {type_name}) -> {prim} {{\n        v.0\n    }}\n}}\n"));
        }
        // enums only exist on string and numeric scalars
        _ => {}
    }
    out
}

/// PascalCase variant per string value; collisions get a numeric suffix.
fn variant_names(values: &[Literal]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let raw = match v {
            Literal::String(s) => s.clone(),
            other => other.to_string(),
        };
        let cleaned: String = raw.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
        let mut name = pascal_case(&cleaned);
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            name = format!("V{name}");
        }
        if name == "Self" {
            name.push('_');
        }
        let mut candidate = name.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{name}{n}");
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}

fn numeric_literal(scalar: Scalar, v: &Literal) -> String {
    match (scalar, v.as_f64()) {
        (Scalar::Int, Some(x)) => format!("{}", x as i64),
        (_, Some(x)) => format!("{x:?}"),
        _ => v.to_string(),
    }
}

// ---- naming ----

fn rust_type(fp: &FieldPlan) -> String {
    if let Some(t) = &fp.type_name {
        return t.clone();
    }
    match fp.field.ty {
        FieldType::List(s) => format!("Vec<{}>", scalar_type(s)),
        ty => ty.scalar().map_or("()", scalar_type).to_string(),
    }
}

fn scalar_type(s: Scalar) -> &'static str {
    match s {
        Scalar::String => "String",
        Scalar::Int => "i64",
        Scalar::Float => "f64",
        Scalar::Bool => "bool",
    }
}

fn member_name(field: &str) -> String {
    ident(&snake_case(field))
}

fn default_fn_name(field: &str) -> String {
    format!("default_{}", snake_case(field))
}

pub(crate) fn ident(name: &str) -> String {
    if PATH_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

fn doc_lines(text: Option<&str>, indent: &str) -> String {
    let Some(text) = text else { return String::new() };
    text.lines().map(|l| format!("{indent}/// {l}\n").replace("/// \n", "///\n")).collect()
}
