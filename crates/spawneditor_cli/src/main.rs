//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `spawneditor_core` linkage.
//! - Load and validate a spawn file from the shell for quick sanity checks.

use spawneditor_core::{load_document, SchemaConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("spawneditor_core version={}", spawneditor_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    match load_document(&path, &text, &SchemaConfig::default()) {
        Ok(loaded) => {
            println!("{path}: {} entries", loaded.document.entry_count());
            for violation in &loaded.warnings {
                println!("warning: {violation}");
            }
            if loaded.warnings.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("{path}: {err}");
            ExitCode::FAILURE
        }
    }
}
