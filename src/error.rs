//! Diagnostic taxonomy.
//!
//! - `Structural` / `Semantic` diagnostics are user-facing and batched into a `LoadError`.
//! - `InvariantViolation` is a core bug surfaced by the emitters; never a user input error.
//! - Representation gaps live inside artifacts, and consistency warnings in `ConsistencyReport`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Malformed source, unknown key, bad nesting. No IR is produced.
    Structural,
    /// Duplicate names, type/enum/range mismatch, bad constraint expression.
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Dotted location in the source document, e.g. `entities.Person.fields.age.range`.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: DiagnosticKind::Structural, path: path.into(), message: message.into() }
    }

    pub fn semantic(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: DiagnosticKind::Semantic, path: path.into(), message: message.into() }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Structural => f.write_str("structural"),
            DiagnosticKind::Semantic => f.write_str("semantic"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
        }
    }
}

/// Everything wrong with one source document, reported in one pass.
#[derive(Debug, Clone, thiserror::Error)]
#[error("ontology rejected with {} problem(s):\n{}", .diagnostics.len(), render_lines(.diagnostics))]
pub struct LoadError {
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn is_structural(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Structural)
    }

    pub fn semantic(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Semantic)
    }

    /// True when some diagnostic message mentions `needle`; handy for asserting on batches.
    pub fn mentions(&self, needle: &str) -> bool {
        self.diagnostics.iter().any(|d| d.message.contains(needle) || d.path.contains(needle))
    }
}

fn render_lines(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("  {d}")).collect::<Vec<_>>().join("\n")
}

/// An emitter was handed an IR that should never have passed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal invariant violated: {0}")]
pub struct InvariantViolation(pub String);
