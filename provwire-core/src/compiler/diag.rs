use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Line and column, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A problem found in a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            document: None,
            position: None,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position { line, column });
        self
    }

    pub fn with_document(mut self, document: impl AsRef<Path>) -> Self {
        self.document = Some(document.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(doc) = &self.document {
            write!(f, "{}", doc.display())?;
            if let Some(pos) = &self.position {
                write!(f, ":{}:{}", pos.line, pos.column)?;
            }
            write!(f, ": ")?;
        }
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

/// Receives diagnostics instead of failing the process.
pub trait DiagSink {
    fn report(&mut self, diag: Diagnostic);
    fn errors(&self) -> usize;
    fn warnings(&self) -> usize;
}

/// Sink that keeps every diagnostic and logs it as it arrives.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl DiagSink for CollectingSink {
    fn report(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => error!("{}", diag),
            Severity::Warning => warn!("{}", diag),
        }
        self.diagnostics.push(diag);
    }

    fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_position() {
        let diag = Diagnostic::error("unexpected token")
            .with_document("Mu.json")
            .at(3, 7);
        assert_eq!(diag.to_string(), "Mu.json:3:7: error: unexpected token");
    }

    #[test]
    fn test_display_without_document() {
        assert_eq!(Diagnostic::warning("unused").to_string(), "warning: unused");
    }

    #[test]
    fn test_sink_counts() {
        let mut sink = CollectingSink::new();
        sink.report(Diagnostic::error("a"));
        sink.report(Diagnostic::warning("b"));
        sink.report(Diagnostic::error("c"));
        assert_eq!(sink.errors(), 2);
        assert_eq!(sink.warnings(), 1);
        assert_eq!(sink.diagnostics().len(), 3);
    }
}
