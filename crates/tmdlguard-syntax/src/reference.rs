//! Parsing of textual object references
//!
//! References are stored as raw text by the parser and split here when the
//! resolver needs them. Segments are separated by `.` outside quotes and may
//! be wrapped in `'...'` with `''` as the escape.

use crate::error::ReferenceError;

/// Split a dotted reference into its name segments
pub fn parse_qualified(text: &str) -> Result<Vec<String>, ReferenceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ReferenceError::Empty);
    }

    let mut segments = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let segment = if chars.peek() == Some(&'\'') {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        value.push('\'');
                    }
                    Some('\'') => break,
                    Some(c) => value.push(c),
                    None => return Err(ReferenceError::UnterminatedQuote(text.to_string())),
                }
            }
            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }
            if !matches!(chars.peek(), None | Some('.')) {
                return Err(ReferenceError::TrailingText(text.to_string()));
            }
            value
        } else {
            let mut value = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                if c == '\'' {
                    return Err(ReferenceError::TrailingText(text.to_string()));
                }
                value.push(c);
                chars.next();
            }
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ReferenceError::EmptySegment(text.to_string()));
            }
            trimmed.to_string()
        };

        segments.push(segment);

        match chars.next() {
            Some('.') => continue,
            _ => break,
        }
    }

    Ok(segments)
}

/// Parse a single, possibly quoted, name
pub fn parse_name(text: &str) -> Result<String, ReferenceError> {
    let mut segments = parse_qualified(text)?;
    if segments.len() != 1 {
        return Err(ReferenceError::WrongArity {
            text: text.trim().to_string(),
            expected: 1,
            found: segments.len(),
        });
    }
    Ok(segments.remove(0))
}

/// Parse a `Table.Column` reference into its two names
pub fn parse_column_reference(text: &str) -> Result<(String, String), ReferenceError> {
    let segments = parse_qualified(text)?;
    match <[String; 2]>::try_from(segments) {
        Ok([table, column]) => Ok((table, column)),
        Err(segments) => Err(ReferenceError::WrongArity {
            text: text.trim().to_string(),
            expected: 2,
            found: segments.len(),
        }),
    }
}

/// Quote a name for messages when it would not survive as a bare word
pub fn quote_name(name: &str) -> String {
    let bare = !name.is_empty() && name.chars().all(crate::lexer::is_identifier_char);
    if bare {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
