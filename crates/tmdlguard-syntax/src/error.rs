//! Format errors raised while lexing and parsing

use tmdlguard_core::{ErrorCategory, Failure, SourcePosition};

/// A definition file could not be turned into an object tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({position})")]
pub struct FormatError {
    /// Human-readable message
    pub message: String,

    /// Offending line
    pub position: SourcePosition,
}

impl FormatError {
    pub fn new(message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Convert to a failure diagnostic
    pub fn to_failure(&self) -> Failure {
        Failure::new(ErrorCategory::FormatError, self.message.clone())
            .with_position(self.position.clone())
    }
}

/// A textual reference is not written in a recognised form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference is empty")]
    Empty,

    #[error("unterminated quoted name in '{0}'")]
    UnterminatedQuote(String),

    #[error("empty name segment in '{0}'")]
    EmptySegment(String),

    #[error("unexpected text after quoted name in '{0}'")]
    TrailingText(String),

    #[error("expected {expected} name parts in '{text}', found {found}")]
    WrongArity {
        text: String,
        expected: usize,
        found: usize,
    },
}
