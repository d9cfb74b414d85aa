use std::fmt;

use thiserror::Error;

use crate::constants::messages::{message, MessageKey};
use crate::models::Lang;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SublinkError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Override error for key '{key}': {reason}")]
    Override { key: String, reason: String },

    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Nothing usable was left. Carries every failure recovered on the way.
    #[error("{summary} ({} failures reported)", .diagnostics.len())]
    Exhausted {
        summary: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Emit error: {0}")]
    Emit(String),

    #[error("Group assembly error: {0}")]
    Assembly(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

impl SublinkError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        SublinkError::Protocol(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        SublinkError::Decode(msg.into())
    }

    pub fn exhausted(lang: Lang, diagnostics: Vec<Diagnostic>) -> Self {
        SublinkError::Exhausted {
            summary: message(lang, MessageKey::NoProxies).to_string(),
            diagnostics,
        }
    }

    /// The diagnostic category of a recoverable error, `None` for fatal ones.
    pub fn diagnostic_kind(&self) -> Option<DiagnosticKind> {
        match self {
            SublinkError::Decode(_) => Some(DiagnosticKind::Decode),
            SublinkError::Protocol(_) => Some(DiagnosticKind::Protocol),
            SublinkError::Override { .. } => Some(DiagnosticKind::Override),
            SublinkError::Fetch(_) => Some(DiagnosticKind::Fetch),
            SublinkError::Emit(_) => Some(DiagnosticKind::Emit),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SublinkError {
    fn from(e: serde_json::Error) -> Self {
        SublinkError::Serialize(e.to_string())
    }
}

impl From<serde_yaml::Error> for SublinkError {
    fn from(e: serde_yaml::Error) -> Self {
        SublinkError::Serialize(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Decode,
    Protocol,
    Override,
    Fetch,
    Emit,
}

impl DiagnosticKind {
    fn message_key(self) -> MessageKey {
        match self {
            DiagnosticKind::Decode => MessageKey::DecodeFailed,
            DiagnosticKind::Protocol => MessageKey::InvalidProxy,
            DiagnosticKind::Override => MessageKey::OverrideSkipped,
            DiagnosticKind::Fetch => MessageKey::FetchFailed,
            DiagnosticKind::Emit => MessageKey::UnsupportedByTarget,
        }
    }
}

/// A recovered failure, reported to the caller instead of aborting the build.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The candidate, key or tag the failure is about.
    pub subject: String,
    /// Localized summary followed by the underlying error text.
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Build a diagnostic from a recovered error, localizing the summary for `lang`.
    ///
    /// Fatal errors are filed under `Decode`; callers should not route them here.
    pub fn from_error(err: &SublinkError, subject: impl Into<String>, lang: Lang) -> Self {
        let kind = err.diagnostic_kind().unwrap_or(DiagnosticKind::Decode);
        Diagnostic {
            kind,
            subject: subject.into(),
            message: format!("{}: {}", message(lang, kind.message_key()), err),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} ({})", self.kind, self.message, self.subject)
    }
}
