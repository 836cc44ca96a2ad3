// PEG ruleset emitter.
//
// Rule layout per entity `Person`:
//   person_object   <- '{' ws person_members ws '}' person_guard_<i>...
//   person_members  <- ordered choice over the possible first member
//   person_<f>_pair <- '"f"' ws ':' ws person_<f>_value
//   person_<f>_value
// Bounded numbers and enums are dedicated terminal productions; opaque
// constraints become `&{ ... }` predicate rules flagged as constraint-derived.

use indexmap::IndexMap;

use super::numeric::{self, Terminal, NUMBER_END};
use crate::ir::{fmt_num, FieldType, Literal, Scalar};
use crate::lower::{EntityPlan, FieldPlan, Plan};

const BASE_RULES: &str = "\
ws      <- [ \\t\\n\\r]*
hex     <- [0-9a-fA-F]
string  <- '\"' ( '\\\\' ( [\"\\\\/bfnrt] / 'u' hex hex hex hex ) / ![\"\\\\] . )* '\"'
integer <- '-'? ( '0' / [1-9] [0-9]* ) ![0-9.eE]
number  <- '-'? ( '0' / [1-9] [0-9]* ) ( '.' [0-9]+ )? ( [eE] [+-]? [0-9]+ )? ![0-9.eE]
boolean <- ( 'true' / 'false' ) ![A-Za-z0-9_]
";

pub fn emit(plan: &Plan) -> String {
    let ontology = plan.ontology;
    let mut terminals: IndexMap<String, Terminal> = IndexMap::new();
    let mut entity_blocks: Vec<String> = Vec::with_capacity(plan.entities.len());
    for ep in &plan.entities {
        entity_blocks.push(entity_rules(ep, &mut terminals));
    }

    let mut out = String::with_capacity(4 * 1024);
    out.push_str(&format!("# {}\n", super::banner(ontology)));
    if let Some(d) = &ontology.description {
        out.push_str(&format!("# {}\n", one_line(d)));
    }
    out.push_str("# `&{ ... }` rules are guards derived from ontology constraints.\n\n");

    let start = match ontology.root.as_deref().and_then(|r| plan.entities.iter().find(|e| e.entity.name == r)) {
        Some(root) => format!("{}_object", root.rule),
        None => {
            let objects: Vec<String> = plan.entities.iter().map(|e| format!("{}_object", e.rule)).collect();
            if objects.len() == 1 { objects[0].clone() } else { format!("( {} )", objects.join(" / ")) }
        }
    };
    out.push_str(&format!("start <- ws {start} ws !.\n\n"));

    for block in entity_blocks {
        out.push_str(&block);
        out.push('\n');
    }

    out.push_str("# ---- lexical ----\n");
    out.push_str(BASE_RULES);

    if !terminals.is_empty() {
        out.push_str("\n# ---- bounded numbers ----\n");
        for t in terminals.values() {
            out.push_str(&format!("# exactly {}\n", interval_text(&t.name)));
            out.push_str(&format!("{} <- {}\n", t.name, t.body));
        }
    }
    out
}

fn entity_rules(ep: &EntityPlan, terminals: &mut IndexMap<String, Terminal>) -> String {
    let e = &ep.rule;
    let mut out = format!("# ---- {} ----\n", ep.entity.name);

    let guards: String = ep.opaque.iter().map(|oc| format!(" {e}_guard_{}", oc.index)).collect();
    if ep.fields.is_empty() {
        out.push_str(&format!("{e}_object <- '{{' ws '}}'{guards}\n"));
    } else {
        let members = if ep.fields.iter().any(|f| f.field.required) {
            format!("{e}_members")
        } else {
            format!("{e}_members?")
        };
        out.push_str(&format!("{e}_object <- '{{' ws {members} ws '}}'{guards}\n"));

        // a member list may start with any field up to and including the first required one
        let last_leader = ep.fields.iter().position(|f| f.field.required).unwrap_or(ep.fields.len() - 1);
        let alts: Vec<String> = (0..=last_leader).map(|lead| member_sequence(ep, lead)).collect();
        out.push_str(&format!("{e}_members <- {}\n", alts.join(" / ")));
    }

    for fp in &ep.fields {
        out.push_str(&format!(
            "{}_pair <- {} ws ':' ws {}_value\n",
            fp.rule,
            peg_quote(&serde_json::Value::from(fp.field.name.as_str()).to_string()),
            fp.rule
        ));
        out.push_str(&format!("{}_value <- {}\n", fp.rule, value_expr(fp, terminals)));
    }

    for oc in &ep.opaque {
        out.push_str(&format!(
            "# constraint-derived guard: constraints[{}] `{}` ({})\n",
            oc.index,
            oc.constraint.expr,
            oc.constraint.severity.as_str()
        ));
        out.push_str(&format!("{e}_guard_{} <- &{{ {} }}\n", oc.index, oc.expr));
    }
    out
}

fn member_sequence(ep: &EntityPlan, lead: usize) -> String {
    let mut parts = vec![format!("{}_pair", ep.fields[lead].rule)];
    for fp in &ep.fields[lead + 1..] {
        if fp.field.required {
            parts.push(format!("ws ',' ws {}_pair", fp.rule));
        } else {
            parts.push(format!("( ws ',' ws {}_pair )?", fp.rule));
        }
    }
    parts.join(" ")
}

fn value_expr(fp: &FieldPlan, terminals: &mut IndexMap<String, Terminal>) -> String {
    if let Some(values) = &fp.values {
        return enum_choice(values);
    }
    match fp.field.ty {
        FieldType::String => "string".to_string(),
        FieldType::Bool => "boolean".to_string(),
        FieldType::Int if fp.bounds.is_unbounded() => "integer".to_string(),
        FieldType::Float if fp.bounds.is_unbounded() => "number".to_string(),
        FieldType::Int => intern(numeric::int_terminal(fp.bounds), terminals),
        FieldType::Float => intern(numeric::number_terminal(fp.bounds), terminals),
        FieldType::List(elem) => {
            let t = scalar_rule(elem);
            format!("'[' ws ( {t} ( ws ',' ws {t} )* )? ws ']'")
        }
    }
}

/// Alternatives in declared order. Numeric literals carry their own end check,
/// so `15` cannot shadow `150`.
fn enum_choice(values: &[Literal]) -> String {
    let alts: Vec<String> = values
        .iter()
        .map(|v| match v {
            Literal::Int(_) | Literal::Float(_) => format!("{} {NUMBER_END}", peg_quote(&v.to_string())),
            _ => peg_quote(&v.to_string()),
        })
        .collect();
    format!("( {} )", alts.join(" / "))
}

fn intern(t: Terminal, terminals: &mut IndexMap<String, Terminal>) -> String {
    let name = t.name.clone();
    terminals.entry(name.clone()).or_insert(t);
    name
}

fn scalar_rule(s: Scalar) -> &'static str {
    match s {
        Scalar::String => "string",
        Scalar::Int => "integer",
        Scalar::Float => "number",
        Scalar::Bool => "boolean",
    }
}

/// PEG single-quoted literal.
fn peg_quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn interval_text(terminal_name: &str) -> String {
    terminal_name
        .split_once('_')
        .and_then(|(_, tags)| numeric::parse_bound_tags(tags))
        .map(|b| bounds_text(&b))
        .unwrap_or_default()
}

pub(crate) fn bounds_text(b: &crate::expr::Bounds) -> String {
    let lo = match b.lower {
        Some(l) => format!("{}{}", if l.inclusive { "[" } else { "(" }, fmt_num(l.value)),
        None => "(-inf".to_string(),
    };
    let hi = match b.upper {
        Some(u) => format!("{}{}", fmt_num(u.value), if u.inclusive { "]" } else { ")" }),
        None => "+inf)".to_string(),
    };
    format!("{lo}, {hi}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::fixtures;
    use crate::lower::lower;

    fn grammar() -> String {
        let o = fixtures::people();
        emit(&lower(&o).unwrap())
    }

    fn rule<'g>(g: &'g str, name: &str) -> &'g str {
        let prefix = format!("{name} <- ");
        g.lines()
            .find_map(|l| l.strip_prefix(prefix.as_str()))
            .unwrap_or_else(|| panic!("no rule {name} in\n{g}"))
    }

    #[test]
    fn one_object_rule_per_entity_and_start_over_all() {
        let g = grammar();
        assert_eq!(rule(&g, "start"), "ws ( person_object / product_object ) ws !.");
        assert_eq!(rule(&g, "person_object"), "'{' ws person_members ws '}' person_guard_1");
        assert_eq!(
            rule(&g, "product_object"),
            "'{' ws product_members ws '}' product_guard_1 product_guard_2"
        );
    }

    #[test]
    fn members_keep_declared_order_and_optionality() {
        let g = grammar();
        assert_eq!(
            rule(&g, "person_members"),
            "person_name_pair ws ',' ws person_age_pair ( ws ',' ws person_email_pair )? ws ',' ws person_status_pair"
        );
        assert_eq!(rule(&g, "person_email_pair"), "'\"email\"' ws ':' ws person_email_value");
    }

    #[test]
    fn range_folds_into_a_bounded_terminal() {
        let g = grammar();
        assert_eq!(rule(&g, "person_age_value"), "int_ge0_le150");
        assert!(rule(&g, "int_ge0_le150").ends_with("![0-9.eE]"));
        // `price > 0` tightens the declared [0, 1000000]
        assert_eq!(rule(&g, "product_price_value"), "number_gt0_le1000000");
        assert!(g.contains("# exactly [0, 150]"));
        assert!(g.contains("# exactly (0, 1000000]"));
    }

    #[test]
    fn enums_are_ordered_alternations() {
        let g = grammar();
        assert_eq!(rule(&g, "person_status_value"), "( '\"active\"' / '\"inactive\"' / '\"pending\"' )");
        assert!(rule(&g, "product_rating_value").starts_with("( '1' ![0-9.eE] / '2' ![0-9.eE]"));
        assert_eq!(
            rule(&g, "product_tags_value"),
            "'[' ws ( string ( ws ',' ws string )* )? ws ']'"
        );
    }

    #[test]
    fn opaque_constraints_become_flagged_guards() {
        let g = grammar();
        assert_eq!(rule(&g, "product_guard_2"), "&{ cost < price }");
        assert_eq!(rule(&g, "person_guard_1"), "&{ len(name) <= 200 }");
        assert!(g.contains("# constraint-derived guard: constraints[2] `cost < price` (error)"));
        assert!(g.contains("# constraint-derived guard: constraints[1] `len(name) <= 200` (warning)"));
        assert!(!g.contains("TODO"));
    }

    #[test]
    fn root_designation_narrows_start_and_all_optional_members_are_optional() {
        let mut o = fixtures::people();
        o.root = Some("Product".into());
        for f in &mut o.entities[0].fields {
            f.required = false;
        }
        let g = emit(&lower(&o).unwrap());
        assert_eq!(rule(&g, "start"), "ws product_object ws !.");
        assert!(rule(&g, "person_object").contains("person_members?"));
        // every field may lead when none is required
        let members = rule(&g, "person_members");
        assert_eq!(members.split(" / ").count(), 4, "{members}");
        assert!(members.split(" / ").last().is_some_and(|alt| alt == "person_status_pair"));
    }
}
