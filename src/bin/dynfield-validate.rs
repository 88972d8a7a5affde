//! dynfield-validate - Pre-simulation validation tool for .dfa architecture files
//!
//! # Usage
//!
//! ```bash
//! # Validate all .dfa files in a directory (parse only)
//! dynfield-validate path/to/architectures
//!
//! # Deep validation (structural lints over the parsed graph)
//! dynfield-validate --deep path/to/architectures
//!
//! # Print a JSON snapshot of every valid file
//! dynfield-validate --json scene.dfa
//! ```
//!
//! # Exit Codes
//!
//! - 0: All files validated successfully (no errors)
//! - 1: One or more files failed validation
//! - 2: Invalid arguments or IO error

use dynfield::snapshot::ArchitectureSnapshot;
use dynfield::validate::{
    validate_directory_with_lints, validate_file_with_lints, DiagnosticLevel, ValidationResult,
    ValidationSummary,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut verbose = false;
    let mut deep = false;
    let mut json = false;
    let mut paths = Vec::new();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "--deep" | "-d" => deep = true,
            "--json" | "-j" => json = true,
            "-dv" | "-vd" => {
                deep = true;
                verbose = true;
            }
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown option: {}\n", arg);
                print_help();
                return ExitCode::from(2);
            }
            _ => paths.push(arg.clone()),
        }
    }

    if paths.is_empty() {
        eprintln!("Error: No path specified\n");
        print_help();
        return ExitCode::from(2);
    }

    let mut all_results = Vec::new();

    for path_str in &paths {
        let path = Path::new(path_str);

        if !path.exists() {
            eprintln!("Error: Path does not exist: {}", path.display());
            return ExitCode::from(2);
        }

        if path.is_file() {
            let result = validate_file_with_lints(path, deep);
            print_result(&result, verbose, json);
            all_results.push(result);
        } else if path.is_dir() {
            match validate_directory_with_lints(path, deep) {
                Ok(results) => {
                    for result in &results {
                        print_result(result, verbose, json);
                    }
                    all_results.extend(results);
                }
                Err(e) => {
                    eprintln!("Error reading directory {}: {}", path.display(), e);
                    return ExitCode::from(2);
                }
            }
        }
    }

    let summary = ValidationSummary::from_results(&all_results);
    eprintln!();
    summary.print_report();

    if summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_result(result: &ValidationResult, verbose: bool, json: bool) {
    match result {
        ValidationResult::Ok {
            path,
            architecture,
            diagnostics,
        } => {
            let marker = if result.has_errors() { "!" } else { "+" };
            let structure = &architecture.structure;

            if verbose {
                println!(
                    "{} {} ({} steps, {} connections)",
                    marker,
                    path.display(),
                    structure.len(),
                    structure.connections().count()
                );
            } else {
                println!("{} {}", marker, path.display());
            }

            for d in diagnostics {
                let level_str = match d.level {
                    DiagnosticLevel::Error => "  ERROR",
                    DiagnosticLevel::Warning => "  WARN ",
                    DiagnosticLevel::Info => "  INFO ",
                };
                match &d.step {
                    Some(step) => eprintln!("  {} [{}]: {}", level_str, step, d.message),
                    None => eprintln!("  {}: {}", level_str, d.message),
                }
            }

            if json {
                match ArchitectureSnapshot::capture(structure).to_json() {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("  could not serialize snapshot: {}", e),
                }
            }
        }
        ValidationResult::Err { path, error } => {
            eprintln!("x {}", path.display());
            if let Some(line) = error.line {
                eprintln!("  line {}: {}", line, error.message);
            } else {
                eprintln!("  {}", error.message);
            }
            if let Some(snippet) = &error.snippet {
                eprintln!("  | {}", snippet);
            }
        }
    }
}

fn print_help() {
    eprintln!("dynfield-validate - Validate .dfa architecture files");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    dynfield-validate [OPTIONS] <PATH>...");
    eprintln!();
    eprintln!("ARGS:");
    eprintln!("    <PATH>    File or directory to validate (recursive for directories)");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -v, --verbose    Show step and connection counts");
    eprintln!("    -d, --deep       Run structural lints on parsed architectures");
    eprintln!("    -j, --json       Print a JSON snapshot of each valid architecture");
    eprintln!("    -h, --help       Print this help message");
    eprintln!();
    eprintln!("EXIT CODES:");
    eprintln!("    0    All files validated successfully");
    eprintln!("    1    One or more files failed validation");
    eprintln!("    2    Invalid arguments or IO error");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    dynfield-validate scenes/           Parse check all .dfa files");
    eprintln!("    dynfield-validate --deep scenes/    Parse and lint");
    eprintln!("    dynfield-validate -dv scenes/       Deep + verbose");
}
