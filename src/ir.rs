// Strongly-typed ontology IR. Built once by the loader, never mutated after validation.

use std::fmt;

use ordered_float::OrderedFloat;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Ontology {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Designated root entity; `None` means "any entity" (`oneOf` / ordered choice).
    pub root: Option<String>,
    pub entities: Vec<Entity>,     // declaration order
    pub constraints: Vec<Constraint>,
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,        // declaration order == emission order
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub description: Option<String>,
    pub required: bool,
    pub enum_: Option<Vec<Literal>>,
    pub range: Option<Range>,
    pub default: Option<Value>,
}

/// Scalars a field (or a list element) can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    String,
    Int,
    Float,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    List(Scalar),
}

/// Closed numeric interval `[min, max]` as declared in the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: String,
    pub message: Option<String>,
    pub severity: Severity,
}

/// Documentation / testgen seed. Not consumed by emitters.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub input: Value,
    pub output: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Ontology {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Scalar {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Scalar::String),
            "int" => Some(Scalar::Int),
            "float" => Some(Scalar::Float),
            "bool" => Some(Scalar::Bool),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scalar::String => "string",
            Scalar::Int => "int",
            Scalar::Float => "float",
            Scalar::Bool => "bool",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Scalar::Int | Scalar::Float)
    }

    /// Does `lit` inhabit this scalar? Ints are accepted where floats are expected.
    pub fn admits(self, lit: &Literal) -> bool {
        match (self, lit) {
            (Scalar::String, Literal::String(_)) => true,
            (Scalar::Int, Literal::Int(_)) => true,
            (Scalar::Float, Literal::Int(_) | Literal::Float(_)) => true,
            (Scalar::Bool, Literal::Bool(_)) => true,
            _ => false,
        }
    }
}

impl FieldType {
    /// Parses `string | int | float | bool | list[<scalar>]`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("list[").and_then(|r| r.strip_suffix(']')) {
            return Scalar::parse(inner.trim()).map(FieldType::List);
        }
        Scalar::parse(s).map(FieldType::from)
    }

    /// The scalar carried directly by the field, `None` for lists.
    pub fn scalar(self) -> Option<Scalar> {
        match self {
            FieldType::String => Some(Scalar::String),
            FieldType::Int => Some(Scalar::Int),
            FieldType::Float => Some(Scalar::Float),
            FieldType::Bool => Some(Scalar::Bool),
            FieldType::List(_) => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.scalar().is_some_and(Scalar::is_numeric)
    }

    /// Enums are allowed on strings and scalar numbers only.
    pub fn permits_enum(self) -> bool {
        matches!(self, FieldType::String | FieldType::Int | FieldType::Float)
    }

    pub fn permits_range(self) -> bool {
        self.is_numeric()
    }
}

impl From<Scalar> for FieldType {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::String => FieldType::String,
            Scalar::Int => FieldType::Int,
            Scalar::Float => FieldType::Float,
            Scalar::Bool => FieldType::Bool,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::List(s) => write!(f, "list[{}]", s.name()),
            other => f.write_str(other.scalar().map_or("", Scalar::name)),
        }
    }
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl Literal {
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Literal::Int(i)),
                None => n.as_f64().map(|f| Literal::Float(OrderedFloat(f))),
            },
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::String(s) => Value::from(s.clone()),
            Literal::Int(i) => Value::from(*i),
            Literal::Float(f) => json_num_pref_i64(f.0),
            Literal::Bool(b) => Value::from(*b),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(f.0),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::String(_) => "string",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
        }
    }

    /// Re-types a numeric literal for a field of scalar `s` so that `5` and `5.0`
    /// compare equal on float fields and integral floats become ints on int fields.
    pub fn coerce(&self, s: Scalar) -> Option<Literal> {
        match (s, self) {
            (Scalar::Float, Literal::Int(i)) => Some(Literal::Float(OrderedFloat(*i as f64))),
            (Scalar::Int, Literal::Float(f)) if f.0.fract() == 0.0 && f.0.is_finite() => {
                Some(Literal::Int(f.0 as i64))
            }
            _ if s.admits(self) => Some(self.clone()),
            _ => None,
        }
    }
}

/// JSON text of the literal; the canonical spelling every artifact agrees on.
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

// Helper: prefer emitting integers when exact
pub fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Text form of a bound, integral values without a trailing `.0`.
pub fn fmt_num(n: f64) -> String {
    json_num_pref_i64(n).to_string()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
