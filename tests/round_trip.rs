use indexmap::IndexMap;
use ontoc::consistency::{self, Aspect};
use ontoc::emit::{emit_all, Target};
use ontoc::ir::Ontology;
use ontoc::loader::{load, SourceFormat};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const EXAMPLE: &str = include_str!("../fixtures/example.yaml");

fn example() -> Ontology {
    load(EXAMPLE, SourceFormat::Yaml).unwrap()
}

fn compile(o: &Ontology) -> IndexMap<Target, String> {
    emit_all(&Target::ALL, o).unwrap().into_iter().map(|a| (a.target, a.text)).collect()
}

fn rule<'g>(grammar: &'g str, name: &str) -> &'g str {
    let prefix = format!("{name} <- ");
    grammar
        .lines()
        .find_map(|l| l.strip_prefix(prefix.as_str()))
        .unwrap_or_else(|| panic!("no rule `{name}`"))
}

#[test]
fn every_target_is_produced_with_its_file_name() {
    let artifacts = emit_all(&Target::ALL, &example()).unwrap();
    let names: Vec<&str> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, ["people.schema.json", "people_models.rs", "people_interfaces.ts", "people.peg"]);
    assert!(artifacts.iter().all(|a| a.text.contains("1.2.0")));
}

#[test]
fn schema_carries_required_set_enum_and_bounds() {
    let arts = compile(&example());
    let schema: Value = serde_json::from_str(&arts[&Target::JsonSchema]).unwrap();
    let person = &schema["definitions"]["Person"];
    assert_eq!(person["required"], json!(["name", "age", "status"]));
    assert_eq!(person["properties"]["age"]["minimum"], json!(0));
    assert_eq!(person["properties"]["age"]["maximum"], json!(150));
    assert_eq!(person["properties"]["status"]["enum"], json!(["active", "inactive", "pending"]));
    let keys: Vec<&String> = person["properties"].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["name", "age", "email", "status"]);

    let product = &schema["definitions"]["Product"];
    assert_eq!(product["properties"]["price"]["exclusiveMinimum"], json!(0));
    assert_eq!(product["properties"]["category"]["enum"], json!(["electronics", "clothing", "books", "other"]));
    assert_eq!(schema["oneOf"].as_array().map(Vec::len), Some(2));
}

#[test]
fn interface_marks_email_optional_and_status_as_three_literals() {
    let arts = compile(&example());
    let ts = &arts[&Target::TypeScript];
    assert!(ts.contains("  email?: string;\n"));
    let status = ts.lines().find_map(|l| l.strip_prefix("  status: ")).unwrap();
    assert_eq!(status, "\"active\" | \"inactive\" | \"pending\";");
    assert_eq!(status.split(" | ").count(), 3);
    assert!(!ts.contains("age?:"));
}

#[test]
fn grammar_bounds_age_to_its_declared_range() {
    let arts = compile(&example());
    let g = &arts[&Target::Grammar];
    assert_eq!(rule(g, "person_age_value"), "int_ge0_le150");
    assert!(rule(g, "int_ge0_le150").contains("'1' [0-4] [0-9]"));
    assert_eq!(rule(g, "person_status_value"), "( '\"active\"' / '\"inactive\"' / '\"pending\"' )");
    assert!(rule(g, "product_object").contains("product_guard_3"));
}

#[test]
fn compilation_is_deterministic() {
    let o = example();
    assert_eq!(compile(&o), compile(&o));
}

#[test]
fn all_targets_agree() {
    let o = example();
    let report = consistency::check(&compile(&o), &o).unwrap();
    assert_eq!(report.discrepancies, vec![]);
}

#[test]
fn drift_in_one_target_is_caught() {
    let o = example();
    let mut arts = compile(&o);
    let ts = arts.get_mut(&Target::TypeScript).unwrap();
    *ts = ts.replace("  email?: string;", "  email: string;");
    let report = consistency::check(&arts, &o).unwrap();
    assert_eq!(report.discrepancies.len(), 1);
    assert_eq!(report.discrepancies[0].aspect, Aspect::Required);
    assert_eq!(report.discrepancies[0].field.as_deref(), Some("email"));
}

#[test]
fn duplicate_entity_fails_closed() {
    let src = r#"{"name": "jobs", "entities": {
        "Job": {"fields": {"title": "string"}},
        "Job": {"fields": {"salary": "float"}}
    }}"#;
    let err = load(src, SourceFormat::Json).unwrap_err();
    assert!(!err.is_structural());
    assert!(err.semantic().any(|d| d.message.contains("`Job`")), "{err}");
}

#[test]
fn unresolved_constraint_identifier_never_reaches_emission() {
    let src = EXAMPLE.replacen("expr: \"price > 0\"", "expr: \"nonexistent_field > 0\"", 1);
    let err = load(&src, SourceFormat::Yaml).unwrap_err();
    assert!(err.mentions("nonexistent_field"), "{err}");
}

#[test]
fn yaml_and_json_sources_are_equivalent() {
    let o = example();
    let as_json = r#"{
      "name": "people", "description": "People and the products they buy.", "version": "1.2.0",
      "entities": {
        "Person": {"description": "A registered customer.", "fields": {
          "name": {"type": "string", "description": "Full display name."},
          "age": {"type": "int", "range": [0, 150]},
          "email": {"type": "string", "required": false},
          "status": {"type": "string", "enum": ["active", "inactive", "pending"], "default": "pending"}
        }},
        "Product": {"description": "Something on sale.", "fields": {
          "id": "string", "name": "string",
          "price": {"type": "float", "range": [0, 1000000]},
          "category": {"type": "string", "enum": ["electronics", "clothing", "books", "other"]},
          "tags": {"type": "list[string]", "required": false},
          "cost": {"type": "float", "required": false}
        }}
      }
    }"#;
    let j = load(as_json, SourceFormat::Json).unwrap();
    assert_eq!(j.entities, o.entities);
}
