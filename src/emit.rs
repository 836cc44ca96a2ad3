//! Emitter framework: one pure function per target over the lowered [`Plan`].
//!
//! Entity and field order always follow declaration order. Lowering happens
//! once per ontology; targets then fan out over rayon and join before
//! anything is handed back, so callers write files only after every target
//! succeeded.

pub mod grammar;
pub mod jsonschema;
pub mod numeric;
pub mod rust;
pub mod typescript;

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::InvariantViolation;
use crate::ir::Ontology;
use crate::lower::{self, OpaqueConstraint, Plan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    JsonSchema,
    /// Typed value-object set (serde structs).
    Rust,
    /// Typed interface set.
    TypeScript,
    /// PEG ruleset for constrained generation.
    Grammar,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("unknown target `{0}` (expected one of: jsonschema, rust, typescript, grammar)")]
    Unknown(String),
    #[error("no emit targets requested")]
    Empty,
}

/// One compiled output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target: Target,
    pub file_name: String,
    pub text: String,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::JsonSchema, Target::Rust, Target::TypeScript, Target::Grammar];

    pub fn id(self) -> &'static str {
        match self {
            Target::JsonSchema => "jsonschema",
            Target::Rust => "rust",
            Target::TypeScript => "typescript",
            Target::Grammar => "grammar",
        }
    }

    pub fn file_name(self, ontology: &str) -> String {
        match self {
            Target::JsonSchema => format!("{ontology}.schema.json"),
            Target::Rust => format!("{}_models.rs", lower::snake_case(ontology)),
            Target::TypeScript => format!("{ontology}_interfaces.ts"),
            Target::Grammar => format!("{ontology}.peg"),
        }
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonschema" | "json-schema" | "schema" => Ok(Target::JsonSchema),
            "rust" | "models" => Ok(Target::Rust),
            "typescript" | "ts" => Ok(Target::TypeScript),
            "grammar" | "peg" => Ok(Target::Grammar),
            _ => Err(TargetError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Parses a target selection. Repeats collapse, first mention wins the position.
pub fn parse_targets<I, S>(ids: I) -> Result<Vec<Target>, TargetError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for id in ids {
        let t: Target = id.as_ref().parse()?;
        if !out.contains(&t) {
            out.push(t);
        }
    }
    if out.is_empty() {
        return Err(TargetError::Empty);
    }
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

pub fn emit(target: Target, ontology: &Ontology) -> Result<Artifact, InvariantViolation> {
    let plan = plan_for(ontology)?;
    Ok(emit_plan(target, &plan))
}

/// Emits every requested target concurrently; results keep the request order.
pub fn emit_all(targets: &[Target], ontology: &Ontology) -> Result<Vec<Artifact>, InvariantViolation> {
    let plan = plan_for(ontology)?;
    Ok(targets.par_iter().map(|t| emit_plan(*t, &plan)).collect())
}

pub(crate) fn plan_for(ontology: &Ontology) -> Result<Plan<'_>, InvariantViolation> {
    lower::lower(ontology).map_err(|diags| {
        let rendered = diags.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        InvariantViolation(format!("emitters were handed an unvalidated ontology: {rendered}"))
    })
}

fn emit_plan(target: Target, plan: &Plan) -> Artifact {
    let text = match target {
        Target::JsonSchema => jsonschema::emit(plan),
        Target::Rust => rust::emit(plan),
        Target::TypeScript => typescript::emit(plan),
        Target::Grammar => grammar::emit(plan),
    };
    debug!(%target, bytes = text.len(), "artifact emitted");
    Artifact { target, file_name: target.file_name(&plan.ontology.name), text }
}

// ---- shared by the emitters ----

/// Structured record of a constraint a target cannot express natively.
pub(crate) fn unrepresented(oc: &OpaqueConstraint) -> Value {
    json!({
        "kind": "constraint",
        "constraint": oc.index,
        "expr": oc.constraint.expr,
        "message": oc.constraint.message,
        "severity": oc.constraint.severity.as_str(),
        "fields": oc.fields,
    })
}

/// First line of every text artifact, after the comment leader.
pub(crate) fn banner(ontology: &Ontology) -> String {
    match &ontology.version {
        Some(v) => format!("Generated by ontoc from ontology `{}` (version {v}). Do not edit.", ontology.name),
        None => format!("Generated by ontoc from ontology `{}`. Do not edit.", ontology.name),
    }
}
