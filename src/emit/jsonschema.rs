// JSON Schema (draft-07) emitter.
//
// One `definitions` entry per entity, root `oneOf` over all of them unless a
// root entity is designated. A designated root goes through `allOf` because
// draft-07 ignores every sibling of a bare `$ref`. Opaque constraints are listed under
// `x-unrepresented-constraints` on the entity they apply to.

use serde_json::{json, Map, Value};

use crate::expr::Bounds;
use crate::ir::{json_num_pref_i64, FieldType, Scalar};
use crate::lower::{EntityPlan, FieldPlan, Plan};

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

pub fn emit(plan: &Plan) -> String {
    let schema = emit_schema(plan);
    // a Value built from strings and finite numbers always serializes
    let mut text = serde_json::to_string_pretty(&schema).unwrap_or_default();
    text.push('\n');
    text
}

pub fn emit_schema(plan: &Plan) -> Value {
    let ontology = plan.ontology;
    let mut root = json!({
        "$schema": DRAFT_07,
        "$id": format!("{}.schema.json", ontology.name),
        "title": ontology.name,
    });
    if let Some(d) = &ontology.description {
        root["description"] = Value::from(d.as_str());
    }
    if let Some(v) = &ontology.version {
        root["version"] = Value::from(v.as_str());
    }

    let mut definitions = Map::new();
    for ep in &plan.entities {
        definitions.insert(ep.entity.name.clone(), entity_schema(ep));
    }
    root["definitions"] = Value::Object(definitions);

    match &ontology.root {
        Some(r) => root["allOf"] = json!([{ "$ref": definition_ref(r) }]),
        None => {
            let arms: Vec<Value> = plan
                .entities
                .iter()
                .map(|ep| json!({ "$ref": definition_ref(&ep.entity.name) }))
                .collect();
            root["oneOf"] = Value::Array(arms);
        }
    }
    root
}

fn definition_ref(entity: &str) -> String {
    format!("#/definitions/{entity}")
}

fn entity_schema(ep: &EntityPlan) -> Value {
    let mut props = Map::new();
    for fp in &ep.fields {
        props.insert(fp.field.name.clone(), field_schema(fp));
    }
    let required: Vec<Value> = ep.required().map(|fp| Value::from(fp.field.name.as_str())).collect();

    let mut o = json!({ "title": ep.entity.name });
    if let Some(d) = &ep.entity.description {
        o["description"] = Value::from(d.as_str());
    }
    o["type"] = Value::from("object");
    o["properties"] = Value::Object(props);
    o["required"] = Value::Array(required);
    o["additionalProperties"] = Value::Bool(false);
    if !ep.opaque.is_empty() {
        o["x-unrepresented-constraints"] = Value::Array(ep.opaque.iter().map(super::unrepresented).collect());
    }
    o
}

fn field_schema(fp: &FieldPlan) -> Value {
    let field = fp.field;
    let mut o = match field.ty {
        FieldType::List(elem) => json!({ "type": "array", "items": { "type": scalar_type(elem) } }),
        ty => json!({ "type": ty.scalar().map_or("null", scalar_type) }),
    };
    if let Some(d) = &field.description {
        o["description"] = Value::from(d.as_str());
    }
    if let Some(values) = &fp.values {
        o["enum"] = Value::Array(values.iter().map(|v| v.to_json()).collect());
    }
    write_bounds(&mut o, fp.bounds);
    if let Some(default) = &field.default {
        o["default"] = default.clone();
    }
    o
}

/// Draft-07: numeric `exclusiveMinimum` / `exclusiveMaximum`.
fn write_bounds(o: &mut Value, b: Bounds) {
    if let Some(l) = b.lower {
        let key = if l.inclusive { "minimum" } else { "exclusiveMinimum" };
        o[key] = json_num_pref_i64(l.value);
    }
    if let Some(u) = b.upper {
        let key = if u.inclusive { "maximum" } else { "exclusiveMaximum" };
        o[key] = json_num_pref_i64(u.value);
    }
}

fn scalar_type(s: Scalar) -> &'static str {
    match s {
        Scalar::String => "string",
        Scalar::Int => "integer",
        Scalar::Float => "number",
        Scalar::Bool => "boolean",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::fixtures;
    use crate::lower::lower;
    use pretty_assertions::assert_eq;

    fn schema() -> Value {
        let o = fixtures::people();
        emit_schema(&lower(&o).unwrap())
    }

    #[test]
    fn document_header_and_root_one_of() {
        let s = schema();
        assert_eq!(s["$schema"], DRAFT_07);
        assert_eq!(s["$id"], "people.schema.json");
        assert_eq!(s["version"], "1.0.0");
        assert_eq!(
            s["oneOf"],
            json!([{ "$ref": "#/definitions/Person" }, { "$ref": "#/definitions/Product" }])
        );
        assert!(s.get("$ref").is_none());
    }

    #[test]
    fn person_definition() {
        let s = schema();
        let person = &s["definitions"]["Person"];
        assert_eq!(person["required"], json!(["name", "age", "status"]));
        assert_eq!(person["additionalProperties"], json!(false));
        let keys: Vec<&String> = person["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["name", "age", "email", "status"]);
        assert_eq!(person["properties"]["age"], json!({ "type": "integer", "minimum": 0, "maximum": 150 }));
        assert_eq!(
            person["properties"]["status"],
            json!({ "type": "string", "enum": ["active", "inactive", "pending"], "default": "active" })
        );
        assert_eq!(person["properties"]["name"]["description"], "Full name.");
    }

    #[test]
    fn folded_and_unrepresented_constraints() {
        let s = schema();
        let product = &s["definitions"]["Product"];
        assert_eq!(
            product["properties"]["price"],
            json!({ "type": "number", "exclusiveMinimum": 0, "maximum": 1000000 })
        );
        assert_eq!(product["properties"]["tags"], json!({ "type": "array", "items": { "type": "string" } }));
        assert_eq!(product["properties"]["rating"]["enum"], json!([1, 2, 3, 4, 5]));
        let gaps = product["x-unrepresented-constraints"].as_array().unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[1]["expr"], "cost < price");
        assert_eq!(gaps[1]["fields"], json!(["cost", "price"]));
        assert_eq!(gaps[0]["severity"], "warning");
    }

    #[test]
    fn designated_root_is_wrapped_in_all_of() {
        let mut o = fixtures::people();
        o.root = Some("Person".into());
        let s = emit_schema(&lower(&o).unwrap());
        assert_eq!(s["allOf"], json!([{ "$ref": "#/definitions/Person" }]));
        assert!(s.get("$ref").is_none());
        assert!(s.get("oneOf").is_none());
        assert_eq!(s["title"], "people");
    }

    #[test]
    fn text_is_pretty_and_newline_terminated() {
        let o = fixtures::people();
        let text = emit(&lower(&o).unwrap());
        assert!(text.starts_with("{\n  \"$schema\""));
        assert!(text.ends_with("}\n"));
    }
}
