//! Definition-file syntax
//!
//! This crate handles:
//! - Lexing indentation-structured text into positioned tokens
//! - Capturing inline, block and fenced expressions
//! - Building per-document object trees checked against the schema table
//! - Splitting textual references such as `'Sales Data'.Amount`

pub mod error;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod reference;
pub mod token;

pub use error::{FormatError, ReferenceError};
pub use lexer::{LexOutput, Lexer};
pub use node::{ObjectNode, ParsedDocument, Property, PropertyValue};
pub use parser::{parse_document, TmdlParser};
pub use reference::{parse_column_reference, parse_name, parse_qualified, quote_name};
pub use token::{Token, TokenKind};
