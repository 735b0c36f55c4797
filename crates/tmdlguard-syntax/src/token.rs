//! Positioned tokens produced by the lexer

use tmdlguard_core::SourcePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    QuotedIdentifier,
    StringLiteral,
    /// Trimmed remainder of a line after a top-level `:`
    Literal,
    Colon,
    Equals,
    Dot,
    Indent,
    Dedent,
    Newline,
    Comment,
    Description,
    ExpressionBlockStart,
    /// One captured line of an expression block, block indentation removed
    ExpressionLine,
    ExpressionBlockEnd,
    InlineExpression,
    Eof,
}

/// A token with the line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: SourcePosition,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Structural token that carries no text
    pub fn marker(kind: TokenKind, position: SourcePosition) -> Self {
        Self::new(kind, String::new(), position)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whether this token can start or continue a declaration header
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::QuotedIdentifier)
    }
}
