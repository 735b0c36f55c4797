//! Recursive-descent parser over the lexer's token stream
//!
//! Builds one `ObjectNode` forest per document. Structure is checked against
//! the schema table (kinds, nesting, names, property keys and operators);
//! property values and cross-object references are left for later stages.

use crate::error::FormatError;
use crate::lexer::Lexer;
use crate::node::{ObjectNode, ParsedDocument, Property, PropertyValue};
use crate::token::{Token, TokenKind};
use tmdlguard_core::{DefaultValue, NameRule, ObjectKind, SourcePosition, ValueType};
use tracing::debug;

/// Definition-file parser
#[derive(Debug, Clone, Default)]
pub struct TmdlParser {
    lints: bool,
}

impl TmdlParser {
    /// Create a parser that does not collect lint warnings
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect lint warnings while parsing
    pub fn with_lints(mut self, enabled: bool) -> Self {
        self.lints = enabled;
        self
    }

    /// Parse one document into its top-level objects
    pub fn parse(&self, text: &str, document: &str) -> Result<ParsedDocument, FormatError> {
        let output = Lexer::new(text, document)
            .with_lints(self.lints)
            .tokenize_with_warnings()?;

        let objects = Parser::new(output.tokens).parse_document()?;
        debug!(document, objects = objects.len(), "parsed document");

        Ok(ParsedDocument {
            document: document.to_string(),
            objects,
            warnings: output.warnings,
        })
    }
}

/// Parse one document without lint warnings
pub fn parse_document(text: &str, document: &str) -> Result<ParsedDocument, FormatError> {
    TmdlParser::new().parse(text, document)
}

enum Assign {
    None,
    Colon(Option<String>),
    Equals(String),
}

struct Line {
    head: Vec<Token>,
    assign: Assign,
    position: SourcePosition,
}

enum Item {
    Declaration(ObjectNode),
    Property(Property),
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

fn unexpected_line(position: &SourcePosition) -> FormatError {
    FormatError::new("Unexpected line type.", position.clone())
}

fn scope_error(kind: ObjectKind, parent: Option<ObjectKind>, position: &SourcePosition) -> FormatError {
    let message = match parent {
        None => format!("Object type '{kind}' is not allowed at the top level."),
        Some(parent) => format!("Object type '{kind}' is not allowed under '{parent}'."),
    };
    FormatError::new(message, position.clone())
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().map_or(false, |t| t.is(kind))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn skip_comments(&mut self) {
        while self.peek_is(TokenKind::Comment) {
            self.cursor += 1;
        }
    }

    fn parse_document(mut self) -> Result<Vec<ObjectNode>, FormatError> {
        self.parse_items(None)
    }

    /// Parse sibling lines until the enclosing level ends
    fn parse_items(&mut self, mut parent: Option<&mut ObjectNode>) -> Result<Vec<ObjectNode>, FormatError> {
        let parent_kind = parent.as_ref().map(|p| p.kind);
        let mut children = Vec::new();
        let mut description: Option<(String, SourcePosition)> = None;

        loop {
            self.skip_comments();
            let Some(token) = self.peek() else {
                break;
            };

            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Dedent => {
                    self.cursor += 1;
                    if parent.is_some() {
                        break;
                    }
                }
                TokenKind::Indent => {
                    let position = token.position.clone();
                    return Err(match description {
                        Some((_, at)) => orphan_description(at),
                        None => FormatError::new("Unexpected indentation.", position),
                    });
                }
                TokenKind::Description => {
                    let token = token.clone();
                    self.cursor += 1;
                    self.expect_newline(&token.position)?;
                    description = Some(match description.take() {
                        Some((text, at)) => (format!("{text}\n{}", token.text), at),
                        None => (token.text, token.position),
                    });
                }
                _ => {
                    let line = self.read_line()?;
                    match self.classify(line, parent_kind)? {
                        Item::Declaration(mut node) => {
                            node.description = description.take().map(|(text, _)| text);
                            self.skip_comments();
                            if self.peek_is(TokenKind::Indent) {
                                if node.is_reference {
                                    return Err(self.unexpected_indent());
                                }
                                self.cursor += 1;
                                let nested = self.parse_items(Some(&mut node))?;
                                node.children = nested;
                            }
                            children.push(node);
                        }
                        Item::Property(property) => {
                            if let Some((_, at)) = description.take() {
                                return Err(orphan_description(at));
                            }
                            let Some(owner) = parent.as_deref_mut() else {
                                return Err(FormatError::new(
                                    format!("Property '{}' is not inside an object.", property.key),
                                    property.position,
                                ));
                            };
                            if owner.property(&property.key).is_some() {
                                return Err(FormatError::new(
                                    format!("Duplicate property '{}'.", property.key),
                                    property.position,
                                ));
                            }
                            owner.properties.push(property);

                            self.skip_comments();
                            if self.peek_is(TokenKind::Indent) {
                                return Err(self.unexpected_indent());
                            }
                        }
                    }
                }
            }
        }

        if let Some((_, at)) = description {
            return Err(orphan_description(at));
        }

        Ok(children)
    }

    fn unexpected_indent(&self) -> FormatError {
        let position = self
            .peek()
            .map(|t| t.position.clone())
            .unwrap_or_else(|| SourcePosition::new("", 0, ""));
        FormatError::new("Unexpected indentation.", position)
    }

    fn expect_newline(&mut self, position: &SourcePosition) -> Result<(), FormatError> {
        match self.advance() {
            Some(token) if token.is(TokenKind::Newline) => Ok(()),
            Some(token) => Err(FormatError::new(
                format!("Unexpected '{}'.", token.text),
                token.position,
            )),
            None => Err(FormatError::new("Unexpected end of document.", position.clone())),
        }
    }

    /// Read the tokens of one structural line, including its trailing newline
    fn read_line(&mut self) -> Result<Line, FormatError> {
        let mut head = Vec::new();
        let mut assign = Assign::None;
        let mut position = None;

        while let Some(token) = self.advance() {
            position.get_or_insert_with(|| token.position.clone());
            match token.kind {
                TokenKind::Newline => break,
                TokenKind::Identifier
                | TokenKind::QuotedIdentifier
                | TokenKind::Dot
                | TokenKind::StringLiteral => head.push(token),
                TokenKind::Colon => {
                    let literal = if self.peek_is(TokenKind::Literal) {
                        self.advance().map(|t| t.text)
                    } else {
                        None
                    };
                    assign = Assign::Colon(literal);
                }
                TokenKind::Equals => {
                    assign = Assign::Equals(self.read_expression(&token.position)?);
                }
                _ => {
                    return Err(FormatError::new(
                        format!("Unexpected '{}'.", token.text),
                        token.position,
                    ));
                }
            }
        }

        let position = position.unwrap_or_else(|| SourcePosition::new("", 0, ""));
        Ok(Line {
            head,
            assign,
            position,
        })
    }

    fn read_expression(&mut self, position: &SourcePosition) -> Result<String, FormatError> {
        match self.advance() {
            Some(token) if token.is(TokenKind::InlineExpression) => Ok(token.text),
            Some(token) if token.is(TokenKind::ExpressionBlockStart) => {
                let mut lines = Vec::new();
                while let Some(token) = self.advance() {
                    match token.kind {
                        TokenKind::ExpressionLine => lines.push(token.text),
                        TokenKind::ExpressionBlockEnd => return Ok(lines.join("\n")),
                        _ => break,
                    }
                }
                Err(FormatError::new("Unterminated expression.", position.clone()))
            }
            _ => Err(FormatError::new("Missing expression.", position.clone())),
        }
    }

    fn classify(&self, line: Line, parent: Option<ObjectKind>) -> Result<Item, FormatError> {
        let Line {
            head,
            assign,
            position,
        } = line;

        let Some(first) = head.first() else {
            return Err(unexpected_line(&position));
        };
        if !first.is(TokenKind::Identifier) {
            return Err(unexpected_line(&position));
        }
        let keyword = first.text.as_str();

        if keyword == "ref" && head.len() > 1 {
            return reference(&head[1..], assign, parent, position);
        }

        if let Assign::Colon(value) = assign {
            if head.len() != 1 {
                return Err(unexpected_line(&position));
            }
            return colon_property(keyword, value, parent, position);
        }

        if let Some(kind) = ObjectKind::from_keyword(keyword) {
            return declaration(kind, &head[1..], assign, parent, position);
        }

        if head.len() > 1 {
            return Err(FormatError::new(
                format!("Unknown object type '{keyword}'."),
                position,
            ));
        }

        match assign {
            Assign::Equals(expression) => expression_property(keyword, expression, parent, position),
            _ => flag_property(keyword, parent, position),
        }
    }
}

fn orphan_description(position: SourcePosition) -> FormatError {
    FormatError::new(
        "Description must be followed by an object declaration.",
        position,
    )
}

fn name_from(kind: ObjectKind, rest: &[Token], position: &SourcePosition) -> Result<Option<String>, FormatError> {
    match rest {
        [] => Ok(None),
        [token] if token.is_word() => Ok(Some(token.text.clone())),
        _ => Err(FormatError::new(
            format!("Unexpected text after {kind} name."),
            position.clone(),
        )),
    }
}

fn declaration(
    kind: ObjectKind,
    rest: &[Token],
    assign: Assign,
    parent: Option<ObjectKind>,
    position: SourcePosition,
) -> Result<Item, FormatError> {
    if !kind.allowed_under(parent) {
        return Err(scope_error(kind, parent, &position));
    }

    let name = name_from(kind, rest, &position)?;
    match (kind.name_rule(), &name) {
        (NameRule::Required, None) => {
            return Err(FormatError::new(
                format!("Object type '{kind}' requires a name."),
                position,
            ));
        }
        (NameRule::Forbidden, Some(_)) => {
            return Err(FormatError::new(
                format!("Object type '{kind}' does not take a name."),
                position,
            ));
        }
        _ => {}
    }

    let mut node = ObjectNode::new(kind, name, position);
    match assign {
        Assign::Equals(expression) => {
            if kind.default_value() == DefaultValue::Forbidden {
                return Err(FormatError::new(
                    format!("Object type '{kind}' does not take a value."),
                    node.position,
                ));
            }
            node.expression = Some(expression);
        }
        _ if kind.default_value() == DefaultValue::Required => {
            return Err(FormatError::new(
                format!("Object type '{kind}' requires a value."),
                node.position,
            ));
        }
        _ => {}
    }

    Ok(Item::Declaration(node))
}

fn reference(
    rest: &[Token],
    assign: Assign,
    parent: Option<ObjectKind>,
    position: SourcePosition,
) -> Result<Item, FormatError> {
    let Some(kind) = rest
        .first()
        .filter(|t| t.is(TokenKind::Identifier))
        .and_then(|t| ObjectKind::from_keyword(&t.text))
    else {
        return Err(FormatError::new("Unknown object type after 'ref'.", position));
    };

    if !kind.can_be_referenced() {
        return Err(FormatError::new(
            format!("Object type '{kind}' cannot be referenced."),
            position,
        ));
    }
    if parent.is_some() {
        return Err(FormatError::new(
            "Reference declarations are only allowed at the top level.",
            position,
        ));
    }
    if !matches!(assign, Assign::None) {
        return Err(FormatError::new(
            "Reference declarations do not take a value.",
            position,
        ));
    }

    let Some(name) = name_from(kind, &rest[1..], &position)? else {
        return Err(FormatError::new(
            format!("Reference to '{kind}' requires a name."),
            position,
        ));
    };

    let mut node = ObjectNode::new(kind, Some(name), position);
    node.is_reference = true;
    Ok(Item::Declaration(node))
}

fn property_owner(key: &str, parent: Option<ObjectKind>, position: &SourcePosition) -> Result<ObjectKind, FormatError> {
    parent.ok_or_else(|| {
        FormatError::new(
            format!("Property '{key}' is not inside an object."),
            position.clone(),
        )
    })
}

fn unknown_property(key: &str, owner: ObjectKind, position: SourcePosition) -> FormatError {
    FormatError::new(
        format!("Unknown property '{key}' for '{owner}'."),
        position,
    )
}

fn colon_property(
    key: &str,
    value: Option<String>,
    parent: Option<ObjectKind>,
    position: SourcePosition,
) -> Result<Item, FormatError> {
    let owner = property_owner(key, parent, &position)?;
    let Some(def) = owner.property(key) else {
        return Err(unknown_property(key, owner, position));
    };
    if def.ty.is_expression() {
        return Err(FormatError::new(
            format!("Property '{key}' must be assigned with '='."),
            position,
        ));
    }

    let Some(raw) = value else {
        return Err(FormatError::new(
            format!("Missing value for property '{key}'."),
            position,
        ));
    };

    let value = if let Some(inner) = raw.strip_prefix('"') {
        let Some(inner) = inner.strip_suffix('"') else {
            return Err(FormatError::new("Unterminated string.", position));
        };
        PropertyValue::Quoted(inner.replace("\"\"", "\""))
    } else {
        PropertyValue::Scalar(raw)
    };

    Ok(Item::Property(Property {
        key: key.to_string(),
        value,
        position,
    }))
}

fn expression_property(
    key: &str,
    expression: String,
    parent: Option<ObjectKind>,
    position: SourcePosition,
) -> Result<Item, FormatError> {
    let owner = property_owner(key, parent, &position)?;
    let Some(def) = owner.property(key) else {
        return Err(unknown_property(key, owner, position));
    };
    if !def.ty.is_expression() {
        return Err(FormatError::new(
            format!("Property '{key}' must be assigned with ':'."),
            position,
        ));
    }

    Ok(Item::Property(Property {
        key: key.to_string(),
        value: PropertyValue::Expression(expression),
        position,
    }))
}

fn flag_property(key: &str, parent: Option<ObjectKind>, position: SourcePosition) -> Result<Item, FormatError> {
    let def = parent.and_then(|owner| owner.property(key));
    match def {
        Some(def) if def.ty == ValueType::Bool => Ok(Item::Property(Property {
            key: key.to_string(),
            value: PropertyValue::Flag,
            position,
        })),
        Some(_) => Err(FormatError::new(
            format!("Missing value for property '{key}'."),
            position,
        )),
        None => Err(unexpected_line(&position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Vec<ObjectNode> {
        parse_document(text, "test.tmdl").unwrap().objects
    }

    fn parse_err(text: &str) -> FormatError {
        parse_document(text, "test.tmdl").unwrap_err()
    }

    // ==================== structure ====================

    #[test]
    fn table_with_members() {
        let text = "\
/// Fact table
table Sales
\tlineageTag: 1f2e

\tcolumn Amount
\t\tdataType: decimal
\t\tisHidden
\t\tsummarizeBy: sum

\tmeasure 'Total Amount' = SUM(Sales[Amount])
\t\tformatString: \"#,0.00\"

\tpartition Sales = m
\t\tmode: import
\t\tsource =
\t\t\t\tlet
\t\t\t\t    Source = 1
\t\t\t\tin
\t\t\t\t    Source
";
        let objects = parse(text);
        assert_eq!(objects.len(), 1);

        let table = &objects[0];
        assert_eq!(table.kind, ObjectKind::Table);
        assert_eq!(table.name.as_deref(), Some("Sales"));
        assert_eq!(table.description.as_deref(), Some("Fact table"));
        assert_eq!(table.property_text("lineageTag"), Some("1f2e"));
        assert_eq!(table.children.len(), 3);

        let column = &table.children[0];
        assert_eq!(column.property("isHidden").unwrap().value, PropertyValue::Flag);
        assert_eq!(column.position.line, 5);

        let measure = &table.children[1];
        assert_eq!(measure.name.as_deref(), Some("Total Amount"));
        assert_eq!(measure.expression.as_deref(), Some("SUM(Sales[Amount])"));
        assert_eq!(
            measure.property("formatString").unwrap().value,
            PropertyValue::Quoted("#,0.00".to_string())
        );

        let partition = &table.children[2];
        assert_eq!(partition.expression.as_deref(), Some("m"));
        assert_eq!(
            partition.property_text("source"),
            Some("let\n    Source = 1\nin\n    Source")
        );
    }

    #[test]
    fn anonymous_and_reference_declarations() {
        let text = "\
model Model
\tculture: en-US
\tdataAccessOptions
\t\tlegacyRedirects
\tannotation PBI_QueryOrder = [\"Sales\"]

ref table Sales
ref cultureInfo en-US
";
        let objects = parse(text);
        assert_eq!(objects.len(), 3);

        let model = &objects[0];
        assert_eq!(model.children[0].kind, ObjectKind::DataAccessOptions);
        assert_eq!(model.children[0].name, None);
        assert_eq!(model.children[1].expression.as_deref(), Some("[\"Sales\"]"));

        assert!(objects[1].is_reference);
        assert_eq!(objects[2].kind, ObjectKind::CultureInfo);
    }

    #[test]
    fn changed_property_and_comments() {
        let text = "\
table Sales
\t// hidden by default
\tcolumn Key
\t\tisHidden
\t\tchangedProperty = IsHidden
";
        let objects = parse(text);
        let column = &objects[0].children[0];
        assert_eq!(column.children[0].kind, ObjectKind::ChangedProperty);
        assert_eq!(column.children[0].expression.as_deref(), Some("IsHidden"));
    }

    // ==================== errors ====================

    #[test]
    fn unknown_keyword() {
        let err = parse_err("tabel Sales\n");
        assert_eq!(err.message, "Unknown object type 'tabel'.");
        assert_eq!(err.position.line, 1);
    }

    #[test]
    fn unknown_bare_word() {
        let err = parse_err("table Sales\n\tcolumn A\n\t\tbogus\n");
        assert_eq!(err.message, "Unexpected line type.");
        assert_eq!(err.position.line_text, "\t\tbogus");
    }

    #[test]
    fn misplaced_kind() {
        let err = parse_err("table Sales\n\tcolumn A\n\t\tmeasure B = 1\n");
        assert_eq!(err.message, "Object type 'measure' is not allowed under 'column'.");

        let err = parse_err("column A\n");
        assert_eq!(err.message, "Object type 'column' is not allowed at the top level.");
    }

    #[test]
    fn name_rules() {
        assert_eq!(parse_err("table\n").message, "Object type 'table' requires a name.");
        assert_eq!(
            parse_err("table T\n\tmeasure M = 1\n\t\tkpi Extra\n").message,
            "Object type 'kpi' does not take a name."
        );
        assert_eq!(
            parse_err("table Sales Extra\n").message,
            "Unexpected text after table name."
        );
    }

    #[test]
    fn value_rules() {
        let err = parse_err("model Model\n\tannotation Owner\n");
        assert_eq!(err.message, "Object type 'annotation' requires a value.");
        assert_eq!(err.position.line, 2);

        let err = parse_err("table T\n\tcolumn X\n\t\tchangedProperty\n");
        assert_eq!(err.message, "Object type 'changedProperty' requires a value.");
        assert_eq!(err.position.line_text, "\t\tchangedProperty");

        assert_eq!(
            parse_err("table T\n\tmeasure Total\n").message,
            "Object type 'measure' requires a value."
        );
        assert_eq!(
            parse_err("table T = 1\n").message,
            "Object type 'table' does not take a value."
        );

        let objects = parse("table T\n\tcolumn X\n\tcolumn Y = 1 + 1\n");
        assert_eq!(objects[0].children[0].expression, None);
        assert_eq!(objects[0].children[1].expression.as_deref(), Some("1 + 1"));
    }

    #[test]
    fn property_errors() {
        assert_eq!(
            parse_err("table T\n\tcolumn C\n\t\tcolour: red\n").message,
            "Unknown property 'colour' for 'column'."
        );
        assert_eq!(
            parse_err("table T\n\tpartition P = m\n\t\tsource: x\n").message,
            "Property 'source' must be assigned with '='."
        );
        assert_eq!(
            parse_err("table T\n\tcolumn C\n\t\tdataType = int64\n").message,
            "Property 'dataType' must be assigned with ':'."
        );
        assert_eq!(
            parse_err("table T\n\tcolumn C\n\t\tisHidden\n\t\tisHidden: false\n").message,
            "Duplicate property 'isHidden'."
        );
        assert_eq!(
            parse_err("culture: en-US\n").message,
            "Property 'culture' is not inside an object."
        );
    }

    #[test]
    fn indentation_under_property() {
        let err = parse_err("table T\n\tcolumn C\n\t\tdataType: int64\n\t\t\tisHidden\n");
        assert_eq!(err.message, "Unexpected indentation.");
        assert_eq!(err.position.line, 4);
    }

    #[test]
    fn dangling_description() {
        let err = parse_err("table T\n\t/// about nothing\n\tisHidden\n");
        assert_eq!(err.message, "Description must be followed by an object declaration.");
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn reference_only_at_top_level() {
        let err = parse_err("model Model\n\tref table Sales\n");
        assert_eq!(
            err.message,
            "Reference declarations are only allowed at the top level."
        );
        assert_eq!(
            parse_err("ref column Sales\n").message,
            "Object type 'column' cannot be referenced."
        );
    }
}
