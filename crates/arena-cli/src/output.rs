//! Text and JSON reporting shared by all commands.

use colored::Colorize;
use serde::Serialize;

use crate::OutputFormat;

/// Print a serializable report to stdout. Text mode gets single-line JSON;
/// commands with a text layout print it themselves.
pub fn print<T: Serialize + ?Sized>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: {}", "Error".red().bold(), e),
        },
        OutputFormat::Text => {
            if let Ok(json) = serde_json::to_string(value) {
                println!("{}", json);
            }
        }
    }
}

/// Status line for a completed step. Suppressed in JSON mode.
pub fn success(message: &str, format: OutputFormat, quiet: bool) {
    if !quiet && matches!(format, OutputFormat::Text) {
        println!("{} {}", "✓".green().bold(), message);
    }
}

/// Progress note on stderr. Suppressed in JSON mode.
pub fn info(message: &str, format: OutputFormat, quiet: bool) {
    if !quiet && matches!(format, OutputFormat::Text) {
        eprintln!("{} {}", "→".blue(), message);
    }
}

/// Non-fatal problem on stderr, shown in every format.
pub fn warning(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}: {}", "Warning".yellow().bold(), message);
    }
}
