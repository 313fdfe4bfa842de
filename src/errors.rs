//! Faults raised while deriving values, and their human-readable rendering.
//!
//! This module provides:
//! - The `Fault` taxonomy carried on the failure channel of every deferred value
//! - ANSI color support with TTY auto-detection
//! - Levenshtein distance for "did you mean?" suggestions
//! - Report formatting with a header, access path and hints

use std::io::IsTerminal;

use thiserror::Error;

use crate::value::{PropertyKey, Value};

/// Why a deferred value failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    /// A member was read off null or undefined
    #[error("can not read property '{key}' of {receiver}")]
    AbsentReceiver {
        key: PropertyKey,
        receiver: &'static str,
        /// Access path of the absent value
        path: String,
    },

    #[error("requested prop is not a function ({type_name})")]
    NotCallable {
        type_name: &'static str,
        /// Access path of the value that was invoked
        path: String,
    },

    /// A lookup that assumed the member exists found nothing
    #[error("invalid object member \"{key}\"")]
    InvalidMember {
        key: PropertyKey,
        suggestions: Vec<String>,
    },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("range error: {0}")]
    RangeError(String),

    /// An arbitrary value raised by a native function
    #[error("uncaught {0}")]
    Thrown(Value),

    #[error("deferred value was dropped before it settled")]
    Abandoned,
}

impl Fault {
    pub fn thrown(value: impl Into<Value>) -> Self {
        Fault::Thrown(value.into())
    }

    /// Error class name handed to value-level failure handlers
    pub fn name(&self) -> &'static str {
        match self {
            Fault::AbsentReceiver { .. }
            | Fault::NotCallable { .. }
            | Fault::InvalidMember { .. }
            | Fault::TypeError(_) => "TypeError",
            Fault::RangeError(_) => "RangeError",
            Fault::Thrown(_) | Fault::Abandoned => "Error",
        }
    }

    /// Report header
    pub fn label(&self) -> &'static str {
        match self {
            Fault::AbsentReceiver { .. } => "ABSENT RECEIVER",
            Fault::NotCallable { .. } => "NOT INVOCABLE",
            Fault::InvalidMember { .. } => "INVALID MEMBER",
            Fault::TypeError(_) => "TYPE ERROR",
            Fault::RangeError(_) => "RANGE ERROR",
            Fault::Thrown(_) => "UNCAUGHT VALUE",
            Fault::Abandoned => "ABANDONED",
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Fault::AbsentReceiver { path, .. } | Fault::NotCallable { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Fault::InvalidMember { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// The value a value-level failure handler receives.
    ///
    /// Thrown values come back unchanged; everything else becomes an
    /// error-like object with `name` and `message`.
    pub fn to_value(&self) -> Value {
        match self {
            Fault::Thrown(value) => value.clone(),
            other => Value::object([
                ("name", Value::from(other.name())),
                ("message", Value::from(other.to_string())),
            ]),
        }
    }
}

/// ANSI color codes for terminal output
#[derive(Debug, Clone)]
pub struct Colors {
    pub enabled: bool,
}

impl Colors {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn red(&self) -> &'static str {
        if self.enabled { "\x1b[31m" } else { "" }
    }

    pub fn cyan(&self) -> &'static str {
        if self.enabled { "\x1b[36m" } else { "" }
    }

    pub fn bold(&self) -> &'static str {
        if self.enabled { "\x1b[1m" } else { "" }
    }

    pub fn dim(&self) -> &'static str {
        if self.enabled { "\x1b[2m" } else { "" }
    }

    pub fn reset(&self) -> &'static str {
        if self.enabled { "\x1b[0m" } else { "" }
    }
}

impl Default for Colors {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Configuration for fault reports
#[derive(Debug, Clone)]
pub struct ErrorConfig {
    pub colors: Colors,
    /// Include the access path of the failing step
    pub show_paths: bool,
}

impl ErrorConfig {
    pub fn new(use_color: bool) -> Self {
        Self {
            colors: Colors::new(use_color),
            show_paths: true,
        }
    }

    /// Colors on when stderr is a terminal
    pub fn for_stderr() -> Self {
        Self::new(std::io::stderr().is_terminal())
    }

    pub fn with_paths(mut self, show_paths: bool) -> Self {
        self.show_paths = show_paths;
        self
    }
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

// ============================================================================
// Levenshtein Distance for "Did you mean?" suggestions
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        row[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[b.len()]
}

/// Find similar names from a list of candidates.
///
/// Returns up to 3 suggestions within the given max edit distance,
/// sorted by distance (closest first).
pub fn find_similar<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Vec<String> {
    let mut suggestions: Vec<(String, usize)> = candidates
        .into_iter()
        .filter_map(|c| {
            let dist = levenshtein_distance(name, c);
            if dist > 0 && dist <= max_distance {
                Some((c.to_string(), dist))
            } else {
                None
            }
        })
        .collect();

    suggestions.sort_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.cmp(b)));
    suggestions.dedup();

    suggestions.into_iter().map(|(s, _)| s).take(3).collect()
}

// ============================================================================
// Report Formatting
// ============================================================================

/// Format the "did you mean?" hint.
pub fn format_suggestions(suggestions: &[String], colors: &Colors) -> String {
    if suggestions.is_empty() {
        return String::new();
    }

    if suggestions.len() == 1 {
        format!(
            "\n\nDid you mean {}{}{}?",
            colors.bold(),
            suggestions[0],
            colors.reset()
        )
    } else {
        let formatted: Vec<String> = suggestions
            .iter()
            .map(|s| format!("{}{}{}", colors.bold(), s, colors.reset()))
            .collect();
        format!("\n\nDid you mean one of: {}?", formatted.join(", "))
    }
}

/// Format the report header line.
///
/// Example: "-- NOT INVOCABLE -------------------------------------------"
pub fn format_header(kind: &str, colors: &Colors) -> String {
    let dashes = "-".repeat(60usize.saturating_sub(kind.len() + 4));
    format!("{}-- {} {}{}", colors.cyan(), kind, dashes, colors.reset())
}

/// Format the access path line.
///
/// Example: "at $.user.name[0]"
pub fn format_path(path: &str, colors: &Colors) -> String {
    format!(
        "{}at{} {}{}{}",
        colors.dim(),
        colors.reset(),
        colors.bold(),
        path,
        colors.reset()
    )
}

/// Render a full report for a fault
pub fn format_fault(fault: &Fault, config: &ErrorConfig) -> String {
    let colors = &config.colors;
    let mut out = format_header(fault.label(), colors);

    out.push_str("\n\n");
    out.push_str(colors.red());
    out.push_str(&fault.to_string());
    out.push_str(colors.reset());

    if config.show_paths {
        if let Some(path) = fault.path() {
            out.push_str("\n\n");
            out.push_str(&format_path(path, colors));
        }
    }

    out.push_str(&format_suggestions(fault.suggestions(), colors));
    out
}

// ============================================================================
// Tests
// ============================================================================
