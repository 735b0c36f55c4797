//! Cross-file merge of parsed documents
//!
//! Top-level objects are grouped by kind, and the merge also remembers the
//! order in which they were first declared. A later declaration of an
//! existing object is accepted only when its body carries nothing but
//! annotation-like children; those children are appended to the first
//! declaration.

use std::collections::HashMap;
use tmdlguard_core::{ErrorCategory, Failure, ObjectKind, RuleCode, SourcePosition};
use tmdlguard_syntax::{ObjectNode, ParsedDocument};
use tracing::debug;

/// The fully assembled project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedModel {
    pub database: Option<ObjectNode>,
    pub model: Option<ObjectNode>,
    pub tables: Vec<ObjectNode>,
    pub relationships: Vec<ObjectNode>,
    pub perspectives: Vec<ObjectNode>,
    pub cultures: Vec<ObjectNode>,
    pub roles: Vec<ObjectNode>,
    pub expressions: Vec<ObjectNode>,
    pub data_sources: Vec<ObjectNode>,
    pub query_groups: Vec<ObjectNode>,
    /// Top-level annotations and extended properties
    pub annotations: Vec<ObjectNode>,
    /// `ref` declarations
    pub references: Vec<ObjectNode>,
    /// (kind, index into the kind's bucket) in first-declaration order
    order: Vec<(ObjectKind, usize)>,
}

impl MergedModel {
    /// Merge documents in the order given
    pub fn from_documents(documents: Vec<ParsedDocument>) -> Result<Self, MergeError> {
        let mut merger = Merger::default();
        for document in documents {
            for node in document.objects {
                merger.add(node)?;
            }
        }

        let model = merger.model;
        debug!(
            tables = model.tables.len(),
            relationships = model.relationships.len(),
            "merged model"
        );
        Ok(model)
    }

    /// All declared top-level objects in merged order: file order, then
    /// position within the file
    pub fn top_level(&self) -> impl Iterator<Item = &ObjectNode> + '_ {
        self.order
            .iter()
            .filter_map(move |&(kind, at)| self.declared(kind, at))
    }

    fn declared(&self, kind: ObjectKind, at: usize) -> Option<&ObjectNode> {
        match kind {
            ObjectKind::Database => self.database.as_ref(),
            ObjectKind::Model => self.model.as_ref(),
            kind => self.bucket(kind)?.get(at),
        }
    }

    /// Find a table by exact name
    pub fn table(&self, name: &str) -> Option<&ObjectNode> {
        self.tables.iter().find(|t| t.name.as_deref() == Some(name))
    }

    fn bucket(&self, kind: ObjectKind) -> Option<&Vec<ObjectNode>> {
        match kind {
            ObjectKind::Table => Some(&self.tables),
            ObjectKind::Relationship => Some(&self.relationships),
            ObjectKind::Perspective => Some(&self.perspectives),
            ObjectKind::CultureInfo => Some(&self.cultures),
            ObjectKind::Role => Some(&self.roles),
            ObjectKind::Expression => Some(&self.expressions),
            ObjectKind::DataSource => Some(&self.data_sources),
            ObjectKind::QueryGroup => Some(&self.query_groups),
            ObjectKind::Annotation | ObjectKind::ExtendedProperty => Some(&self.annotations),
            _ => None,
        }
    }

    fn bucket_mut(&mut self, kind: ObjectKind) -> Option<&mut Vec<ObjectNode>> {
        match kind {
            ObjectKind::Table => Some(&mut self.tables),
            ObjectKind::Relationship => Some(&mut self.relationships),
            ObjectKind::Perspective => Some(&mut self.perspectives),
            ObjectKind::CultureInfo => Some(&mut self.cultures),
            ObjectKind::Role => Some(&mut self.roles),
            ObjectKind::Expression => Some(&mut self.expressions),
            ObjectKind::DataSource => Some(&mut self.data_sources),
            ObjectKind::QueryGroup => Some(&mut self.query_groups),
            ObjectKind::Annotation | ObjectKind::ExtendedProperty => Some(&mut self.annotations),
            _ => None,
        }
    }
}

/// Merge conflicts between top-level declarations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("Duplicate declaration of {kind} '{name}' (first declared at {first})")]
    DuplicateDeclaration {
        kind: ObjectKind,
        name: String,
        first: SourcePosition,
        position: SourcePosition,
    },

    #[error("Duplicate reference to {kind} '{name}' (first declared at {first})")]
    DuplicateReference {
        kind: ObjectKind,
        name: String,
        first: SourcePosition,
        position: SourcePosition,
    },

    #[error("Object type '{kind}' cannot be declared at the top level")]
    Misplaced {
        kind: ObjectKind,
        position: SourcePosition,
    },
}

impl MergeError {
    /// Position of the later, offending declaration
    pub fn position(&self) -> &SourcePosition {
        match self {
            Self::DuplicateDeclaration { position, .. }
            | Self::DuplicateReference { position, .. }
            | Self::Misplaced { position, .. } => position,
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure::new(ErrorCategory::SerializationError, self.to_string())
            .with_position(self.position().clone())
            .with_rule(RuleCode::DuplicateDeclaration)
    }
}

#[derive(Default)]
struct Merger {
    model: MergedModel,
    /// (kind, name) -> index into the kind's bucket
    index: HashMap<(ObjectKind, String), usize>,
    references: HashMap<(ObjectKind, String), SourcePosition>,
}

impl Merger {
    fn add(&mut self, node: ObjectNode) -> Result<(), MergeError> {
        if node.is_reference {
            return self.add_reference(node);
        }

        match node.kind {
            kind @ (ObjectKind::Database | ObjectKind::Model) => {
                let slot = if kind == ObjectKind::Database {
                    &mut self.model.database
                } else {
                    &mut self.model.model
                };
                let fresh = slot.is_none();
                merge_singleton(slot, node)?;
                if fresh {
                    self.model.order.push((kind, 0));
                }
                Ok(())
            }
            kind => self.add_named(kind, node),
        }
    }

    fn add_reference(&mut self, node: ObjectNode) -> Result<(), MergeError> {
        let key = (node.kind, node.display_name().to_string());
        if let Some(first) = self.references.get(&key) {
            return Err(MergeError::DuplicateReference {
                kind: key.0,
                name: key.1,
                first: first.clone(),
                position: node.position,
            });
        }
        self.references.insert(key, node.position.clone());
        self.model.references.push(node);
        Ok(())
    }

    fn add_named(&mut self, kind: ObjectKind, node: ObjectNode) -> Result<(), MergeError> {
        let key = (kind, node.display_name().to_string());
        let Some(bucket) = self.model.bucket_mut(kind) else {
            return Err(MergeError::Misplaced {
                kind,
                position: node.position,
            });
        };

        match self.index.get(&key).copied() {
            Some(at) => {
                let canonical = &mut bucket[at];
                if kind.is_metadata() || !node.is_metadata_only() {
                    return Err(MergeError::DuplicateDeclaration {
                        kind,
                        name: key.1,
                        first: canonical.position.clone(),
                        position: node.position,
                    });
                }
                debug!(%kind, name = %key.1, at = %node.position, "continuation block");
                canonical.children.extend(node.children);
            }
            None => {
                let at = bucket.len();
                bucket.push(node);
                self.index.insert(key, at);
                self.model.order.push((kind, at));
            }
        }
        Ok(())
    }
}

fn merge_singleton(slot: &mut Option<ObjectNode>, node: ObjectNode) -> Result<(), MergeError> {
    if let Some(canonical) = slot.as_mut() {
        if canonical.name != node.name || !node.is_metadata_only() {
            return Err(MergeError::DuplicateDeclaration {
                kind: node.kind,
                name: node.display_name().to_string(),
                first: canonical.position.clone(),
                position: node.position,
            });
        }
        canonical.children.extend(node.children);
        return Ok(());
    }

    *slot = Some(node);
    Ok(())
}
