//! Minimal CLI: load → validate → (emit targets | report)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, info};

use crate::consistency;
use crate::emit::{self, Artifact};
use crate::error::{Diagnostic, DiagnosticKind, LoadError};
use crate::ir::Ontology;
use crate::loader::{self, SourceFormat};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile declarative ontologies into JSON Schema, Rust models, TypeScript interfaces and a PEG grammar
#[derive(Parser, Debug)]
#[command(name = "ontoc", version)]
pub struct CommandLineInterface {
    /// debug logging on stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate and write one artifact per requested target
    Compile(CompileOut),
    /// validate only; print every diagnostic
    Validate(InputSettings),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more ontology files. May be literal paths or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    inputs: Vec<String>,

    /// source format (yaml | json); taken from the file extension when omitted
    #[arg(long)]
    format: Option<SourceFormat>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// comma separated targets: jsonschema, rust, typescript, grammar
    #[arg(long, value_delimiter = ',', default_value = "jsonschema,rust,typescript,grammar")]
    emit: Vec<String>,

    /// output directory
    #[arg(short, long, env = "ONTOC_BUILD_DIR", default_value = "build")]
    out: PathBuf,

    /// re-read the artifacts and report cross-target disagreement (never blocks output)
    #[arg(long, default_value_t = false)]
    check_consistency: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Loads every input, printing diagnostics as it goes. Failed inputs are counted, not fatal.
    fn load_process(&self, mut apply: impl FnMut(&Path, Ontology) -> anyhow::Result<()>) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.inputs).context("failed to resolve input file paths")?;
        let total = source_paths.len();
        let mut failed = 0usize;
        for source_path in &source_paths {
            let outcome = self.load_one(source_path).and_then(|ontology| apply(source_path, ontology));
            if let Err(error) = outcome {
                failed += 1;
                eprintln!("{} {}: {error:#}", "error:".red().bold(), source_path.display());
            }
        }
        if failed > 0 {
            bail!("{failed} of {total} input(s) failed");
        }
        Ok(())
    }

    fn load_one(&self, source_path: &Path) -> anyhow::Result<Ontology> {
        let format = match self.format {
            Some(format) => format,
            None => SourceFormat::from_extension(source_path).with_context(|| {
                format!("cannot tell the format of {}; pass --format yaml|json", source_path.display())
            })?,
        };
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read {}", source_path.display()))?;
        debug!(path = %source_path.display(), ?format, "loading ontology");
        match loader::load(&source, format) {
            Ok(ontology) => Ok(ontology),
            Err(error) => {
                print_diagnostics(source_path, &error);
                bail!("{} problem(s), nothing emitted", error.diagnostics.len())
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Validate(input_settings) => input_settings.load_process(|path, ontology| {
                println!(
                    "{} {} ({} entities, {} constraints)",
                    "ok".green().bold(),
                    path.display(),
                    ontology.entities.len(),
                    ontology.constraints.len()
                );
                Ok(())
            }),
            Command::Compile(target) => {
                let targets = emit::parse_targets(&target.emit)?;
                target.input_settings.load_process(|_, ontology| {
                    // 1) every target first; nothing touches the disk unless all succeed
                    let artifacts = emit::emit_all(&targets, &ontology)?;

                    // 2) optional cross-check
                    if target.check_consistency {
                        report_consistency(&artifacts, &ontology)?;
                    }

                    // 3) write
                    write_artifacts(&target.out, &artifacts)
                })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_artifacts(out_dir: &Path, artifacts: &[Artifact]) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    for artifact in artifacts {
        let path = out_dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.text).with_context(|| format!("failed to write {}", path.display()))?;
        info!(artifact = %artifact.target, path = %path.display(), "artifact written");
        println!("{} {}", "wrote".green(), path.display());
    }
    Ok(())
}

fn report_consistency(artifacts: &[Artifact], ontology: &Ontology) -> anyhow::Result<()> {
    let report = consistency::check_artifacts(artifacts, ontology)?;
    for d in &report.discrepancies {
        eprintln!("{} {d}", "warning:".yellow().bold());
    }
    if report.is_consistent() {
        println!("{} {} target(s) agree", "consistent".green(), report.checked.len());
    }
    Ok(())
}

fn print_diagnostics(source_path: &Path, error: &LoadError) {
    for d in &error.diagnostics {
        eprintln!("{} {}", tag(d), located(source_path, d));
    }
}

fn tag(d: &Diagnostic) -> String {
    match d.kind {
        DiagnosticKind::Structural => "error[structural]".red().bold().to_string(),
        DiagnosticKind::Semantic => "error[semantic]".red().bold().to_string(),
    }
}

fn located(source_path: &Path, d: &Diagnostic) -> String {
    if d.path.is_empty() {
        format!("{}: {}", source_path.display(), d.message)
    } else {
        format!("{}: {}: {}", source_path.display(), d.path.cyan(), d.message)
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        format!("{}/fixtures/example.yaml", env!("CARGO_MANIFEST_DIR"))
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ontoc-cli-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn compile_arguments_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "ontoc", "compile", "a.yaml", "b.json", "--emit", "ts,peg", "--out", "x", "--check-consistency", "-v",
        ])
        .unwrap();
        assert!(cli.verbose());
        let Command::Compile(c) = cli.cmd else { panic!("expected compile") };
        assert_eq!(c.input_settings.inputs, ["a.yaml", "b.json"]);
        assert_eq!(c.emit, ["ts", "peg"]);
        assert_eq!(c.out, PathBuf::from("x"));
        assert!(c.check_consistency);
    }

    #[test]
    fn inputs_are_required() {
        assert!(CommandLineInterface::try_parse_from(["ontoc", "validate"]).is_err());
    }

    #[test]
    fn literal_paths_pass_through_and_empty_globs_fail() {
        let paths = resolve_file_path_patterns(["some/file.yaml"]).unwrap();
        assert_eq!(paths, [PathBuf::from("some/file.yaml")]);
        assert!(resolve_file_path_patterns(["/nonexistent-ontoc-dir/*.yaml"]).is_err());
    }

    #[test]
    fn compile_writes_every_requested_target() {
        let out = scratch_dir("compile");
        let cli = CommandLineInterface::try_parse_from([
            "ontoc".to_string(),
            "compile".to_string(),
            fixture(),
            "--emit".to_string(),
            "jsonschema,grammar".to_string(),
            "--out".to_string(),
            out.display().to_string(),
            "--check-consistency".to_string(),
        ])
        .unwrap();
        cli.run().unwrap();
        assert!(out.join("people.schema.json").is_file());
        assert!(out.join("people.peg").is_file());
        assert!(!out.join("people_models.rs").exists());
        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn unknown_target_fails_before_anything_is_written() {
        let out = scratch_dir("unknown");
        let cli = CommandLineInterface::try_parse_from([
            "ontoc".to_string(),
            "compile".to_string(),
            fixture(),
            "--emit".to_string(),
            "jsonschema,xml".to_string(),
            "--out".to_string(),
            out.display().to_string(),
        ])
        .unwrap();
        let err = cli.run().unwrap_err();
        assert!(err.to_string().contains("unknown target `xml`"), "{err}");
        assert!(!out.exists());
    }
}
