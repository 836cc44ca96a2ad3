// Typed interface emitter: one `export interface` per entity.
//
// Interfaces carry no numeric bounds. Folded bounds and opaque constraints
// are surfaced as `@unrepresented {json}` TSDoc tags instead.

use serde_json::{json, Value};

use crate::ir::{json_num_pref_i64, FieldType, Scalar};
use crate::lower::{EntityPlan, FieldPlan, Plan};

pub fn emit(plan: &Plan) -> String {
    let ontology = plan.ontology;
    let mut out = String::with_capacity(4 * 1024);
    out.push_str(&format!("// {}\n", super::banner(ontology)));
    if let Some(d) = &ontology.description {
        for line in d.lines() {
            out.push_str(&format!("// {line}\n"));
        }
    }

    for ep in &plan.entities {
        out.push('\n');
        out.push_str(&interface(ep));
    }

    if let Some(union) = &plan.union_name {
        let arms: Vec<&str> = plan.entities.iter().map(|ep| ep.entity.name.as_str()).collect();
        out.push_str(&format!("\nexport type {union} = {};\n", arms.join(" | ")));
    }
    out
}

fn interface(ep: &EntityPlan) -> String {
    let mut doc: Vec<String> = description_lines(ep.entity.description.as_deref());
    for oc in &ep.opaque {
        doc.push(format!("@unrepresented {}", compact(&super::unrepresented(oc))));
    }
    let mut out = doc_block(&doc, "");
    out.push_str(&format!("export interface {} {{\n", ep.entity.name));
    for fp in &ep.fields {
        out.push_str(&property(fp));
    }
    out.push_str("}\n");
    out
}

fn property(fp: &FieldPlan) -> String {
    let field = fp.field;
    let mut doc = description_lines(field.description.as_deref());
    if let Some(range) = range_annotation(fp) {
        doc.push(format!("@unrepresented {}", compact(&range)));
    }
    if let Some(default) = &field.default {
        doc.push(format!("@default {}", compact(default)));
    }
    let marker = if field.required { "" } else { "?" };
    let mut out = doc_block(&doc, "  ");
    out.push_str(&format!("  {}{marker}: {};\n", field.name, ts_type(fp)));
    out
}

/// `{"kind":"range","field":..}` with draft-07 style bound keys.
fn range_annotation(fp: &FieldPlan) -> Option<Value> {
    if fp.bounds.is_unbounded() {
        return None;
    }
    let mut o = json!({ "kind": "range", "field": fp.field.name });
    if let Some(l) = fp.bounds.lower {
        let key = if l.inclusive { "minimum" } else { "exclusiveMinimum" };
        o[key] = json_num_pref_i64(l.value);
    }
    if let Some(u) = fp.bounds.upper {
        let key = if u.inclusive { "maximum" } else { "exclusiveMaximum" };
        o[key] = json_num_pref_i64(u.value);
    }
    Some(o)
}

fn ts_type(fp: &FieldPlan) -> String {
    if let Some(values) = &fp.values {
        return values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" | ");
    }
    match fp.field.ty {
        FieldType::List(s) => format!("{}[]", scalar_type(s)),
        ty => ty.scalar().map_or("unknown", scalar_type).to_string(),
    }
}

fn scalar_type(s: Scalar) -> &'static str {
    match s {
        Scalar::String => "string",
        Scalar::Int | Scalar::Float => "number",
        Scalar::Bool => "boolean",
    }
}

// ---- TSDoc ----

fn description_lines(text: Option<&str>) -> Vec<String> {
    text.map(|t| t.lines().map(str::to_string).collect()).unwrap_or_default()
}

fn doc_block(lines: &[String], indent: &str) -> String {
    match lines {
        [] => String::new(),
        [one] => format!("{indent}/** {} */\n", escape_doc(one)),
        many => {
            let mut out = format!("{indent}/**\n");
            for l in many {
                let l = escape_doc(l);
                if l.is_empty() {
                    out.push_str(&format!("{indent} *\n"));
                } else {
                    out.push_str(&format!("{indent} * {l}\n"));
                }
            }
            out.push_str(&format!("{indent} */\n"));
            out
        }
    }
}

fn escape_doc(s: &str) -> String {
    s.replace("*/", "*\\/")
}

fn compact(v: &Value) -> String {
    v.to_string()
}
