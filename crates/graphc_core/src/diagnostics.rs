//! Parses C++ compiler diagnostics and resolves each to the smallest
//! enclosing mapped span.

use crate::mapping::MappingEntry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One parsed `file:line[:col]: (warning|error): message` diagnostic line.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub col: Option<usize>,
    pub kind: String,
    pub message: String,
}

/// A [`Diagnostic`] resolved against a mapping table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MappedDiagnostic {
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
    pub node_id: Option<String>,
    pub function: Option<String>,
    pub port: Option<String>,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^(?P<file>[^:\n]+):(?P<line>\d+)(?::(?P<col>\d+))?: (?P<kind>warning|error): (?P<message>.*)$")
            .expect("diagnostic pattern is a valid regex")
    })
}

/// Parse every `file:line[:col]: (warning|error): message` line out of raw
/// compiler output. Lines that don't match the pattern are ignored.
pub fn parse_diagnostics(raw: &str) -> Vec<Diagnostic> {
    pattern()
        .captures_iter(raw)
        .map(|c| Diagnostic {
            file: c["file"].to_string(),
            line: c["line"].parse().unwrap_or(0),
            col: c.name("col").and_then(|m| m.as_str().parse().ok()),
            kind: c["kind"].to_string(),
            message: c["message"].to_string(),
        })
        .collect()
}

/// Resolve each diagnostic against `mapping`: a column-enclosing match wins
/// if one exists (smallest span), else the smallest line-enclosing entry,
/// else the diagnostic maps to `node_id: None`.
pub fn map_diagnostics(diagnostics: &[Diagnostic], mapping: &[MappingEntry]) -> Vec<MappedDiagnostic> {
    diagnostics
        .iter()
        .map(|d| map_one(d.clone(), mapping))
        .collect()
}

fn map_one(diagnostic: Diagnostic, mapping: &[MappingEntry]) -> MappedDiagnostic {
    let best = best_column_match(&diagnostic, mapping).or_else(|| best_line_match(&diagnostic, mapping));
    match best {
        Some(entry) => MappedDiagnostic {
            diagnostic,
            node_id: Some(entry.node_id.clone()),
            function: entry.function.clone(),
            port: entry.port.clone(),
        },
        None => MappedDiagnostic {
            diagnostic,
            node_id: None,
            function: None,
            port: None,
        },
    }
}

fn best_column_match<'a>(d: &Diagnostic, mapping: &'a [MappingEntry]) -> Option<&'a MappingEntry> {
    let col = d.col?;
    mapping
        .iter()
        .filter(|e| e.has_columns() && e.contains(d.line, Some(col)))
        .min_by_key(|e| e.span_area())
}

fn best_line_match<'a>(d: &Diagnostic, mapping: &'a [MappingEntry]) -> Option<&'a MappingEntry> {
    mapping
        .iter()
        .filter(|e| d.line >= e.start_line && d.line <= e.end_line)
        .min_by_key(|e| e.end_line - e.start_line)
}
