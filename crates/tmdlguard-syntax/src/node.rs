//! Object tree produced by the parser

use tmdlguard_core::{LintWarning, ObjectKind, SourcePosition};

/// Value of a property line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Unquoted text after `key:`
    Scalar(String),
    /// `"..."` text after `key:`, with `""` unescaped
    Quoted(String),
    /// Bare keyword, meaning `true`
    Flag,
    /// Inline or block text after `key =`
    Expression(String),
}

impl PropertyValue {
    /// Text of the value as the validator sees it
    pub fn as_text(&self) -> &str {
        match self {
            Self::Scalar(text) | Self::Quoted(text) | Self::Expression(text) => text,
            Self::Flag => "true",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,
    pub position: SourcePosition,
}

/// One declared object and everything nested under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNode {
    pub kind: ObjectKind,
    pub name: Option<String>,
    /// Declared with the `ref` prefix
    pub is_reference: bool,
    /// Joined `///` lines preceding the declaration
    pub description: Option<String>,
    /// Value after `=` on the declaration line
    pub expression: Option<String>,
    pub properties: Vec<Property>,
    pub children: Vec<ObjectNode>,
    pub position: SourcePosition,
}

impl ObjectNode {
    pub fn new(kind: ObjectKind, name: Option<String>, position: SourcePosition) -> Self {
        Self {
            kind,
            name,
            is_reference: false,
            description: None,
            expression: None,
            properties: Vec::new(),
            children: Vec::new(),
            position,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// Text of a property value, if the property is set
    pub fn property_text(&self, key: &str) -> Option<&str> {
        self.property(key).map(|p| p.value.as_text())
    }

    /// Direct children of the given kind, in declaration order
    pub fn children_of(&self, kind: ObjectKind) -> impl Iterator<Item = &ObjectNode> + '_ {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    pub fn has_child(&self, kind: ObjectKind) -> bool {
        self.children.iter().any(|child| child.kind == kind)
    }

    /// Name for messages; anonymous objects fall back to their keyword
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.keyword())
    }

    /// Whether the body carries nothing but annotation-like children
    pub fn is_metadata_only(&self) -> bool {
        self.properties.is_empty()
            && self.expression.is_none()
            && self.children.iter().all(|child| child.kind.is_metadata())
    }

    /// Visit this node and all descendants depth-first, parents before children
    pub fn walk<'n, F>(&'n self, visit: &mut F)
    where
        F: FnMut(&'n ObjectNode, Option<&'n ObjectNode>),
    {
        fn inner<'n, F>(node: &'n ObjectNode, parent: Option<&'n ObjectNode>, visit: &mut F)
        where
            F: FnMut(&'n ObjectNode, Option<&'n ObjectNode>),
        {
            visit(node, parent);
            for child in &node.children {
                inner(child, Some(node), visit);
            }
        }

        inner(self, None, visit);
    }
}

/// All top-level objects of one definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Path relative to the definition folder, `/` separated
    pub document: String,
    pub objects: Vec<ObjectNode>,
    pub warnings: Vec<LintWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize) -> SourcePosition {
        SourcePosition::new("t.tmdl", line, "")
    }

    #[test]
    fn metadata_only_body() {
        let mut table = ObjectNode::new(ObjectKind::Table, Some("Sales".into()), pos(1));
        table
            .children
            .push(ObjectNode::new(ObjectKind::Annotation, Some("A".into()), pos(2)));
        assert!(table.is_metadata_only());

        table
            .children
            .push(ObjectNode::new(ObjectKind::Column, Some("C".into()), pos(3)));
        assert!(!table.is_metadata_only());
    }

    #[test]
    fn walk_visits_parents_first() {
        let mut table = ObjectNode::new(ObjectKind::Table, Some("Sales".into()), pos(1));
        let mut column = ObjectNode::new(ObjectKind::Column, Some("Amount".into()), pos(2));
        column
            .children
            .push(ObjectNode::new(ObjectKind::Annotation, Some("A".into()), pos(3)));
        table.children.push(column);

        let mut seen = Vec::new();
        table.walk(&mut |node, parent| {
            seen.push((node.display_name().to_string(), parent.map(|p| p.kind)));
        });

        assert_eq!(
            seen,
            vec![
                ("Sales".to_string(), None),
                ("Amount".to_string(), Some(ObjectKind::Table)),
                ("A".to_string(), Some(ObjectKind::Column)),
            ]
        );
    }
}
