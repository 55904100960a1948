//! Diagnostic message types.

use treadle_core::Span;

use super::kind::DiagnosticKind;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A follow-up attached to a diagnostic, in report order: either free
/// text or a pointer at another stretch of source.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Note {
    Text(String),
    Span(Span),
}

/// A diagnostic with kind, location, message, and ordered notes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DiagnosticMessage {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    pub notes: Vec<Note>,
}

impl DiagnosticMessage {
    pub fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            span,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.span, self.message)?;
        for note in &self.notes {
            match note {
                Note::Text(text) => write!(f, " (note: {})", text)?,
                Note::Span(span) => write!(f, " (see {})", span)?,
            }
        }
        Ok(())
    }
}
