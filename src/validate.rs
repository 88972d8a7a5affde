//! Validation utilities for architecture files
//!
//! Provides batch validation with detailed error reporting.
//! Two levels of validation:
//! - Parse validation (always runs): syntax, step parameters, connections
//! - Deep validation (with `--deep`): structural lints over the parsed graph
//!
//! # Example
//!
//! ```ignore
//! use dynfield::validate::{validate_directory, ValidationResult};
//!
//! let results = validate_directory("path/to/architectures")?;
//! for result in &results {
//!     match result {
//!         ValidationResult::Ok { path, architecture, diagnostics } => {
//!             println!("✓ {}: {} steps, {} diagnostics",
//!                 path.display(), architecture.structure.len(), diagnostics.len());
//!         }
//!         ValidationResult::Err { path, error } => {
//!             eprintln!("✗ {}: {}", path.display(), error);
//!         }
//!     }
//! }
//! ```

use crate::ir::{parse_architecture, Architecture, ParseError, ParseMode, ARCHITECTURE_EXTENSION};
use crate::steps::{ParamValue, StepKind};
use crate::structure::NeuralStructure;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Finding from deep validation
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// Step the finding is about
    pub step: Option<String>,
    pub message: String,
}

/// Result of validating a single architecture file
#[derive(Debug)]
pub enum ValidationResult {
    /// File parsed successfully (and optionally deep-validated)
    Ok {
        path: PathBuf,
        architecture: Architecture,
        /// Empty if deep validation was not run
        diagnostics: Vec<Diagnostic>,
    },
    /// File failed to parse
    Err { path: PathBuf, error: ValidationError },
}

impl ValidationResult {
    /// Parsed, with no error-level diagnostics
    pub fn is_ok(&self) -> bool {
        !self.has_errors()
    }

    pub fn is_err(&self) -> bool {
        self.has_errors()
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Ok { path, .. } => path,
            Self::Err { path, .. } => path,
        }
    }

    /// Empty for the Err variant
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Ok { diagnostics, .. } => diagnostics,
            Self::Err { .. } => &[],
        }
    }

    pub fn has_errors(&self) -> bool {
        match self {
            Self::Ok { diagnostics, .. } => diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error),
            Self::Err { .. } => true,
        }
    }
}

/// Validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Line number (if available)
    pub line: Option<usize>,
    pub message: String,
    /// Offending source line (if available)
    pub snippet: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: {}", line, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, "\n  | {}", snippet)?;
        }
        Ok(())
    }
}

impl From<ParseError> for ValidationError {
    fn from(e: ParseError) -> Self {
        Self {
            line: Some(e.line),
            message: e.message,
            snippet: None,
        }
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(e: std::io::Error) -> Self {
        Self {
            line: None,
            message: e.to_string(),
            snippet: None,
        }
    }
}

/// Parse `source` and attach the offending line on failure.
pub fn validate_source(source: &str) -> Result<Architecture, ValidationError> {
    parse_architecture(source, ParseMode::Initial).map_err(|e| {
        let snippet = source
            .lines()
            .nth(e.line.saturating_sub(1))
            .map(|s| s.trim().to_string());
        ValidationError {
            snippet,
            ..ValidationError::from(e)
        }
    })
}

/// Structural lints over a parsed graph.
pub fn lint(structure: &NeuralStructure) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut has_outgoing = vec![false; structure.len()];
    for connection in structure.connections() {
        has_outgoing[connection.input_step.index()] = true;
    }

    for (id, step) in structure.step_ids().zip(structure.steps()) {
        let diag = |level, message: String| Diagnostic {
            level,
            step: Some(step.name().to_string()),
            message,
        };

        for (param, value) in step.params() {
            if let ParamValue::Dimensions(dimensions) = value {
                for warning in dimensions.iter().filter_map(|d| d.compatibility_warning()) {
                    diagnostics.push(diag(DiagnosticLevel::Warning, format!("{}: {}", param, warning)));
                }
            }
        }

        let incoming = structure.connections_into(id);
        if incoming.is_empty() && !has_outgoing[id.index()] {
            diagnostics.push(diag(DiagnosticLevel::Warning, "step is not connected".to_string()));
        }
        if step.is_input() && !incoming.is_empty() {
            diagnostics.push(diag(
                DiagnosticLevel::Warning,
                format!("input step has {} incoming connection(s)", incoming.len()),
            ));
        }
        if let StepKind::Field(field) = step.kind() {
            if field.interaction_kernel.is_none() {
                diagnostics.push(diag(DiagnosticLevel::Info, "field has no interaction kernel".to_string()));
            }
        }
    }

    diagnostics
}

/// Validate a single architecture file (parse only).
pub fn validate_file<P: AsRef<Path>>(path: P) -> ValidationResult {
    validate_file_with_lints(path, false)
}

/// Validate a single architecture file, running [`lint`] when `deep` is set.
pub fn validate_file_with_lints<P: AsRef<Path>>(path: P, deep: bool) -> ValidationResult {
    let path = path.as_ref().to_path_buf();

    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            return ValidationResult::Err {
                path,
                error: e.into(),
            };
        }
    };

    match validate_source(&source) {
        Ok(architecture) => {
            let diagnostics = if deep {
                lint(&architecture.structure)
            } else {
                Vec::new()
            };
            ValidationResult::Ok {
                path,
                architecture,
                diagnostics,
            }
        }
        Err(error) => ValidationResult::Err { path, error },
    }
}

/// Validate all architecture files in a directory (recursive, parse only).
pub fn validate_directory<P: AsRef<Path>>(dir: P) -> std::io::Result<Vec<ValidationResult>> {
    validate_directory_with_lints(dir, false)
}

pub fn validate_directory_with_lints<P: AsRef<Path>>(
    dir: P,
    deep: bool,
) -> std::io::Result<Vec<ValidationResult>> {
    let mut results = Vec::new();
    validate_directory_recursive(dir.as_ref(), deep, &mut results)?;

    // Sorted for stable output
    results.sort_by(|a, b| a.path().cmp(b.path()));

    Ok(results)
}

fn validate_directory_recursive(
    dir: &Path,
    deep: bool,
    results: &mut Vec<ValidationResult>,
) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            validate_directory_recursive(&path, deep, results)?;
        } else if path.extension().is_some_and(|e| e == ARCHITECTURE_EXTENSION) {
            results.push(validate_file_with_lints(&path, deep));
        }
    }

    Ok(())
}

/// Summary of validation results
#[derive(Debug, Default)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: Vec<(PathBuf, ValidationError)>,
    pub diag_errors: usize,
    pub diag_warnings: usize,
    pub diag_info: usize,
}

impl ValidationSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            if result.has_errors() {
                summary.failed += 1;
            } else {
                summary.passed += 1;
            }
            match result {
                ValidationResult::Ok { diagnostics, .. } => {
                    for d in diagnostics {
                        match d.level {
                            DiagnosticLevel::Error => summary.diag_errors += 1,
                            DiagnosticLevel::Warning => summary.diag_warnings += 1,
                            DiagnosticLevel::Info => summary.diag_info += 1,
                        }
                    }
                }
                ValidationResult::Err { path, error } => {
                    summary.errors.push((path.clone(), error.clone()));
                }
            }
        }

        summary
    }

    /// Print summary to stderr
    pub fn print_report(&self) {
        if !self.errors.is_empty() {
            eprintln!("\n{} PARSE ERRORS:", self.errors.len());
            for (path, error) in &self.errors {
                eprintln!("\n  {}", path.display());
                if let Some(line) = error.line {
                    eprintln!("    line {}: {}", line, error.message);
                } else {
                    eprintln!("    {}", error.message);
                }
                if let Some(snippet) = &error.snippet {
                    eprintln!("    | {}", snippet);
                }
            }
            eprintln!();
        }

        eprintln!(
            "Validated {} files: {} passed, {} failed",
            self.total, self.passed, self.failed
        );

        if self.diag_errors + self.diag_warnings + self.diag_info > 0 {
            eprintln!(
                "Diagnostics: {} errors, {} warnings, {} info",
                self.diag_errors, self.diag_warnings, self.diag_info
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
.step field "F"
    dimensions [11]

.step node "N"

.connect "F" -> "N"
"#;

    #[test]
    fn test_validate_valid_source() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", VALID).unwrap();

        let result = validate_file(file.path());
        assert!(result.is_ok());
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn test_validate_invalid_source() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
.step field "F"
    dimensions [11]
    bogus_param 3
"#
        )
        .unwrap();

        let result = validate_file(file.path());
        assert!(result.is_err());

        if let ValidationResult::Err { error, .. } = result {
            assert_eq!(error.line, Some(4));
            assert_eq!(error.snippet.as_deref(), Some("bogus_param 3"));
            assert!(error.message.contains("bogus_param"));
        }
    }

    #[test]
    fn test_missing_file() {
        let result = validate_file("/nonexistent/scene.dfa");
        let ValidationResult::Err { error, .. } = result else {
            panic!("expected an error");
        };
        assert!(error.line.is_none());
    }

    #[test]
    fn test_lints() {
        let source = r#"
.step field "F"
    dimensions [10]

.step node "lonely"

.step gauss_input "in"
    dimensions [10]

.step field "G"
    dimensions [10]

.connect "F" -> "in"
.connect "in" -> "G"
"#;
        let arch = validate_source(source).unwrap();
        let diagnostics = lint(&arch.structure);
        let about = |name: &str| -> Vec<&Diagnostic> {
            diagnostics.iter().filter(|d| d.step.as_deref() == Some(name)).collect()
        };

        // Even size on every 10-wide step
        assert!(about("F").iter().any(|d| d.level == DiagnosticLevel::Warning));
        assert!(about("lonely").iter().any(|d| d.message.contains("not connected")));
        assert!(about("in").iter().any(|d| d.message.contains("incoming")));
        assert!(about("G").iter().any(|d| d.level == DiagnosticLevel::Info));
        assert!(!diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error));
    }

    #[test]
    fn test_directory_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dfa"), VALID).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/b.dfa"), ".step nonsense \"X\"\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an architecture").unwrap();

        let results = validate_directory_with_lints(dir.path(), true).unwrap();
        assert_eq!(results.len(), 2);

        let summary = ValidationSummary::from_results(&results);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        // F has no interaction kernel
        assert!(summary.diag_info > 0);
    }
}
