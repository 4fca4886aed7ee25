//! Binary entry point for the imp CLI.
//!
//! ```bash
//! # Print src/main.js with missing imports inserted
//! imp import src/main.js
//!
//! # Update the file in place, report as JSON
//! imp import src/main.js --write --json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imptool::engine::resolve_and_insert;
use imptool::error::ImpError;
use imptool::output::{emit_response, ErrorResponse, ImportResponse, SCHEMA_VERSION};
use imptool::project::{find_root_dir, open_root_dir, RootDir, DEFAULT_FILE_PATTERN};

// ============================================================================
// CLI Structure
// ============================================================================

/// Automatic import insertion for Flow-typed JavaScript projects.
#[derive(Parser)]
#[command(name = "imp", version, about, long_about = None)]
struct Cli {
    /// Project root directory (default: discovered from the file)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve unresolved identifiers in a file and insert their imports.
    Import {
        /// The file to update
        file: PathBuf,

        /// Write the updated text back to the file (default: print it)
        #[arg(long)]
        write: bool,

        /// Glob pattern for candidate project files
        #[arg(long, default_value = DEFAULT_FILE_PATTERN)]
        pattern: String,

        /// Emit a JSON response instead of the updated text
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Import {
            file,
            write,
            pattern,
            json,
        } => match run_import(&file, cli.root.as_deref(), &pattern, write, json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                if json {
                    let _ = emit_response(&mut std::io::stdout(), &ErrorResponse::from_error(&err));
                } else {
                    eprintln!("error: {err}");
                }
                ExitCode::from(err.error_code().code())
            }
        },
    }
}

fn run_import(
    file: &Path,
    root_override: Option<&Path>,
    pattern: &str,
    write: bool,
    json: bool,
) -> Result<(), ImpError> {
    let file = fs::canonicalize(file)?;
    let root: RootDir = match root_override {
        Some(dir) => open_root_dir(&fs::canonicalize(dir)?)?,
        None => find_root_dir(&file)?,
    };

    let text = fs::read_to_string(&file)?;
    let outcome = resolve_and_insert(&text, &file, &root, pattern)?;

    if write {
        fs::write(&file, &outcome.text)?;
    }

    if json {
        let response = ImportResponse {
            status: "ok",
            schema_version: SCHEMA_VERSION,
            file: file.display().to_string(),
            written: write,
            resolved: outcome.resolved,
            unresolved: outcome.unresolved,
            oracle_error: outcome.oracle_error.map(|e| e.to_string()),
            text: if write { None } else { Some(outcome.text) },
        };
        emit_response(&mut std::io::stdout(), &response)?;
    } else {
        if !write {
            print!("{}", outcome.text);
        }
        for identifier in &outcome.unresolved {
            eprintln!("unresolved: {identifier}");
        }
        if let Some(e) = &outcome.oracle_error {
            eprintln!("warning: {e}");
        }
    }

    Ok(())
}
