//! Line-oriented lexer
//!
//! Indentation is tracked as a stack of whitespace prefixes rather than
//! column counts, so any consistent mix of tabs and spaces nests correctly.
//! Expression blocks are captured verbatim and never reach the indentation
//! stack.

use crate::error::FormatError;
use crate::token::{Token, TokenKind};
use tmdlguard_core::{LintCode, LintWarning, SourcePosition};

const FENCE: &str = "```";

/// Tokens of one document plus the lint warnings raised along the way
#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub warnings: Vec<LintWarning>,
}

pub struct Lexer<'a> {
    lines: Vec<&'a str>,
    document: String,
    lints: bool,
    stack: Vec<&'a str>,
    tokens: Vec<Token>,
    warnings: Vec<LintWarning>,
    mixed_reported: bool,
}

fn is_indent_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Characters allowed in an unquoted name or keyword
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '#' | '@' | '&' | '?' | '!' | '%')
}

fn split_prefix(line: &str) -> (&str, &str) {
    let content = line.trim_start_matches(is_indent_char);
    (&line[..line.len() - content.len()], content)
}

/// Scan a quoted run starting at `rest[0]`, doubling the quote to escape it.
/// Returns the unescaped value and the byte length consumed.
fn scan_quoted(rest: &str, quote: char) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = rest.char_indices().skip(1).peekable();

    while let Some((i, c)) = chars.next() {
        if c == quote {
            if matches!(chars.peek(), Some((_, next)) if *next == quote) {
                chars.next();
                value.push(quote);
                continue;
            }
            return Some((value, i + c.len_utf8()));
        }
        value.push(c);
    }

    None
}

impl<'a> Lexer<'a> {
    /// Create a lexer over one document's text
    pub fn new(text: &'a str, document: impl Into<String>) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        Self {
            lines: text.lines().collect(),
            document: document.into(),
            lints: false,
            stack: vec![""],
            tokens: Vec::new(),
            warnings: Vec::new(),
            mixed_reported: false,
        }
    }

    /// Collect lint warnings while lexing
    pub fn with_lints(mut self, enabled: bool) -> Self {
        self.lints = enabled;
        self
    }

    /// Tokenize the document, discarding warnings
    pub fn tokenize(self) -> Result<Vec<Token>, FormatError> {
        self.tokenize_with_warnings().map(|output| output.tokens)
    }

    pub fn tokenize_with_warnings(mut self) -> Result<LexOutput, FormatError> {
        let mut index = 0;

        while index < self.lines.len() {
            let line = self.lines[index];
            if is_blank(line) {
                index += 1;
                continue;
            }

            let (prefix, content) = split_prefix(line);
            let position = self.position(index);

            if content.starts_with("//") && !content.starts_with("///") {
                self.tokens
                    .push(Token::new(TokenKind::Comment, content[2..].trim(), position));
                index += 1;
                continue;
            }

            self.indent_to(prefix, &position)?;

            if let Some(text) = content.strip_prefix("///") {
                self.tokens
                    .push(Token::new(TokenKind::Description, text.trim(), position.clone()));
                self.tokens.push(Token::marker(TokenKind::Newline, position));
                index += 1;
                continue;
            }

            index = self.lex_line(index, prefix, content)?;
            self.tokens.push(Token::marker(TokenKind::Newline, position));
        }

        let end = if self.lines.is_empty() {
            SourcePosition::new(self.document.clone(), 1, "")
        } else {
            self.position(self.lines.len() - 1)
        };
        for _ in 1..self.stack.len() {
            self.tokens.push(Token::marker(TokenKind::Dedent, end.clone()));
        }
        self.tokens.push(Token::marker(TokenKind::Eof, end));

        Ok(LexOutput {
            tokens: self.tokens,
            warnings: self.warnings,
        })
    }

    fn position(&self, index: usize) -> SourcePosition {
        SourcePosition::new(self.document.clone(), index + 1, self.lines[index])
    }

    fn indent_to(&mut self, prefix: &'a str, position: &SourcePosition) -> Result<(), FormatError> {
        if self.lints && !self.mixed_reported && prefix.contains(' ') && prefix.contains('\t') {
            self.mixed_reported = true;
            self.warnings.push(LintWarning::new(
                LintCode::MixedIndentation,
                "Indentation mixes tabs and spaces.",
                position.clone(),
            ));
        }

        let top = self.stack.last().copied().unwrap_or("");
        if prefix == top {
            return Ok(());
        }

        if prefix.starts_with(top) {
            self.stack.push(prefix);
            self.tokens
                .push(Token::marker(TokenKind::Indent, position.clone()));
            return Ok(());
        }

        match self.stack.iter().position(|entry| *entry == prefix) {
            Some(level) => {
                while self.stack.len() > level + 1 {
                    self.stack.pop();
                    self.tokens
                        .push(Token::marker(TokenKind::Dedent, position.clone()));
                }
                Ok(())
            }
            None => Err(FormatError::new("Invalid indentation.", position.clone())),
        }
    }

    /// Tokenize one structural line and return the index of the next unread line
    fn lex_line(&mut self, index: usize, prefix: &'a str, content: &str) -> Result<usize, FormatError> {
        let position = self.position(index);
        let mut pos = 0;

        while let Some(c) = content[pos..].chars().next() {
            let rest = &content[pos..];
            match c {
                ' ' | '\t' => pos += 1,
                '.' => {
                    self.tokens
                        .push(Token::new(TokenKind::Dot, ".", position.clone()));
                    pos += 1;
                }
                ':' => {
                    self.tokens
                        .push(Token::new(TokenKind::Colon, ":", position.clone()));
                    let literal = rest[1..].trim();
                    if !literal.is_empty() {
                        self.tokens
                            .push(Token::new(TokenKind::Literal, literal, position));
                    }
                    return Ok(index + 1);
                }
                '=' => {
                    self.tokens
                        .push(Token::new(TokenKind::Equals, "=", position));
                    return self.lex_assignment(index, prefix, rest[1..].trim());
                }
                '\'' | '"' => {
                    let (value, len) = scan_quoted(rest, c).ok_or_else(|| {
                        let what = if c == '\'' { "quoted name" } else { "string" };
                        FormatError::new(format!("Unterminated {what}."), position.clone())
                    })?;

                    if c == '\'' {
                        if self.lints && value.trim() != value {
                            self.warnings.push(LintWarning::new(
                                LintCode::PaddedName,
                                format!("Quoted name '{value}' has leading or trailing whitespace."),
                                position.clone(),
                            ));
                        }
                        self.tokens
                            .push(Token::new(TokenKind::QuotedIdentifier, value, position.clone()));
                    } else {
                        self.tokens
                            .push(Token::new(TokenKind::StringLiteral, value, position.clone()));
                    }
                    pos += len;
                }
                c if is_identifier_char(c) => {
                    let len = rest
                        .find(|ch: char| !is_identifier_char(ch))
                        .unwrap_or(rest.len());
                    self.tokens
                        .push(Token::new(TokenKind::Identifier, &rest[..len], position.clone()));
                    pos += len;
                }
                other => {
                    return Err(FormatError::new(
                        format!("Unexpected character '{other}'."),
                        position,
                    ));
                }
            }
        }

        Ok(index + 1)
    }

    fn lex_assignment(&mut self, index: usize, prefix: &'a str, value: &str) -> Result<usize, FormatError> {
        let opener = self.position(index);

        if value == FENCE {
            return self.lex_fence(index, opener);
        }

        if !value.is_empty() {
            self.tokens
                .push(Token::new(TokenKind::InlineExpression, value, opener));
            return Ok(index + 1);
        }

        let first = (index + 1..self.lines.len()).find(|&i| !is_blank(self.lines[i]));
        let block_prefix = match first {
            Some(i) => {
                let (candidate, _) = split_prefix(self.lines[i]);
                if candidate.len() > prefix.len() && candidate.starts_with(prefix) {
                    Some((i, candidate))
                } else {
                    None
                }
            }
            None => None,
        };

        let Some((first, block_prefix)) = block_prefix else {
            return Err(FormatError::new("Missing expression.", opener));
        };

        let mut last = first;
        let mut cursor = first;
        while cursor < self.lines.len() {
            let line = self.lines[cursor];
            if is_blank(line) {
                cursor += 1;
                continue;
            }
            if !line.starts_with(block_prefix) {
                break;
            }
            last = cursor;
            cursor += 1;
        }

        self.tokens
            .push(Token::marker(TokenKind::ExpressionBlockStart, opener));
        for i in first..=last {
            let line = self.lines[i];
            let text = if is_blank(line) {
                ""
            } else {
                &line[block_prefix.len()..]
            };
            let position = self.position(i);
            self.tokens
                .push(Token::new(TokenKind::ExpressionLine, text, position));
        }
        let end = self.position(last);
        self.tokens
            .push(Token::marker(TokenKind::ExpressionBlockEnd, end));

        Ok(last + 1)
    }

    fn lex_fence(&mut self, index: usize, opener: SourcePosition) -> Result<usize, FormatError> {
        let close = (index + 1..self.lines.len())
            .find(|&i| self.lines[i].trim() == FENCE)
            .ok_or_else(|| FormatError::new("Unterminated expression fence.", opener.clone()))?;

        self.tokens
            .push(Token::marker(TokenKind::ExpressionBlockStart, opener));
        for i in index + 1..close {
            let position = self.position(i);
            self.tokens
                .push(Token::new(TokenKind::ExpressionLine, self.lines[i], position));
        }
        let end = self.position(close);
        self.tokens
            .push(Token::marker(TokenKind::ExpressionBlockEnd, end));

        Ok(close + 1)
    }
}
