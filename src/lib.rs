//! Ontology compiler core.
//!
//! source text → [`loader::load`] → validated [`ir::Ontology`] → [`emit::emit_all`]
//! → artifact texts → [`consistency::check`] (test-time only).

pub mod cli;
pub mod consistency;
pub mod emit;
pub mod error;
pub mod expr;
pub mod ir;
pub mod loader;
pub mod logging;
pub mod lower;

pub use emit::{Artifact, Target};
pub use error::{Diagnostic, DiagnosticKind, InvariantViolation, LoadError};
pub use ir::Ontology;
pub use loader::{load, SourceFormat};
