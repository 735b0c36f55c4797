//! Symbol table and cross-object reference resolution
//!
//! Pass 1 registers every named object under its qualified name. Pass 2
//! walks each reference site in a fixed order and checks that its target
//! exists, recording what it found for the validator.

use crate::merged::MergedModel;
use std::collections::BTreeMap;
use tmdlguard_core::{ErrorCategory, Failure, ObjectKind, RuleCode, SourcePosition};
use tmdlguard_syntax::{
    parse_column_reference, parse_name, quote_name, ObjectNode, Property, ReferenceError,
};
use tracing::debug;

/// Chain of (kind, name) pairs from the model root to an object
///
/// Anonymous objects use an empty name, so at most one of them may exist
/// per parent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct QualifiedName(Vec<(ObjectKind, String)>);

impl QualifiedName {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, kind: ObjectKind, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push((kind, name.into()));
        Self(segments)
    }

    pub fn top(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::root().child(kind, name)
    }

    pub fn table(name: &str) -> Self {
        Self::top(ObjectKind::Table, name)
    }

    /// A member (column, measure, hierarchy, ...) of a table
    pub fn member(table: &str, kind: ObjectKind, name: &str) -> Self {
        Self::table(table).child(kind, name)
    }

    pub fn segments(&self) -> &[(ObjectKind, String)] {
        &self.0
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(kind, name)| {
                if name.is_empty() {
                    kind.keyword().to_string()
                } else {
                    format!("{kind} '{name}'")
                }
            })
            .collect();
        write!(f, "{}", parts.join(" > "))
    }
}

/// Index of every named object, built once per run
#[derive(Debug, Clone, Default)]
pub struct SymbolTable<'m> {
    entries: BTreeMap<QualifiedName, &'m ObjectNode>,
}

impl<'m> SymbolTable<'m> {
    pub fn get(&self, name: &QualifiedName) -> Option<&'m ObjectNode> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &'m ObjectNode)> + '_ {
        self.entries.iter().map(|(name, node)| (name, *node))
    }

    fn insert(&mut self, name: QualifiedName, node: &'m ObjectNode) -> Result<(), ResolveError> {
        if let Some(first) = self.entries.get(&name) {
            return Err(ResolveError::DuplicateName {
                name: name.to_string(),
                first: first.position.clone(),
                position: node.position.clone(),
            });
        }
        self.entries.insert(name, node);
        Ok(())
    }
}

/// One end of a relationship
#[derive(Debug, Clone)]
pub struct ColumnTarget<'m> {
    pub table: String,
    pub column: String,
    pub node: &'m ObjectNode,
}

#[derive(Debug, Clone)]
pub struct RelationshipEndpoints<'m> {
    pub relationship: &'m ObjectNode,
    pub from: ColumnTarget<'m>,
    pub to: ColumnTarget<'m>,
}

/// A resolved reference: `site.key` names `target`
#[derive(Debug, Clone)]
pub struct ResolvedLink<'m> {
    pub site: &'m ObjectNode,
    pub key: &'static str,
    pub target: &'m ObjectNode,
}

/// A merged model whose references all point at existing objects
#[derive(Debug, Clone)]
pub struct ResolvedModel<'m> {
    pub model: &'m MergedModel,
    pub symbols: SymbolTable<'m>,
    /// Relationships with both endpoints declared, in declaration order
    pub endpoints: Vec<RelationshipEndpoints<'m>>,
    pub links: Vec<ResolvedLink<'m>>,
}

impl<'m> ResolvedModel<'m> {
    /// Resolved target of `site.key`, if it was a reference
    pub fn link(&self, site: &ObjectNode, key: &str) -> Option<&'m ObjectNode> {
        self.links
            .iter()
            .find(|link| std::ptr::eq(link.site, site) && link.key == key)
            .map(|link| link.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Duplicate name: {name} is already declared at {first}")]
    DuplicateName {
        name: String,
        first: SourcePosition,
        position: SourcePosition,
    },

    #[error("Unresolved reference '{text}': {target} does not exist")]
    Unresolved {
        text: String,
        target: String,
        position: SourcePosition,
    },

    #[error("Malformed reference in '{key}': {source}")]
    Malformed {
        key: String,
        source: ReferenceError,
        position: SourcePosition,
    },
}

impl ResolveError {
    pub fn position(&self) -> &SourcePosition {
        match self {
            Self::DuplicateName { position, .. }
            | Self::Unresolved { position, .. }
            | Self::Malformed { position, .. } => position,
        }
    }

    pub fn rule(&self) -> RuleCode {
        match self {
            Self::DuplicateName { .. } => RuleCode::DuplicateName,
            Self::Unresolved { .. } => RuleCode::UnresolvedReference,
            Self::Malformed { .. } => RuleCode::MalformedReference,
        }
    }

    pub fn to_failure(&self) -> Failure {
        Failure::new(ErrorCategory::SerializationError, self.to_string())
            .with_position(self.position().clone())
            .with_rule(self.rule())
    }
}

fn malformed(property: &Property, source: ReferenceError) -> ResolveError {
    ResolveError::Malformed {
        key: property.key.clone(),
        source,
        position: property.position.clone(),
    }
}

fn unresolved(property: &Property, target: String) -> ResolveError {
    ResolveError::Unresolved {
        text: property.value.as_text().to_string(),
        target,
        position: property.position.clone(),
    }
}

fn describe(kind: ObjectKind, name: &str) -> String {
    format!("{kind} '{name}'")
}

/// Two-pass resolver over a merged model
pub struct Resolver<'m> {
    model: &'m MergedModel,
    symbols: SymbolTable<'m>,
    endpoints: Vec<RelationshipEndpoints<'m>>,
    links: Vec<ResolvedLink<'m>>,
}

impl<'m> Resolver<'m> {
    /// Build the symbol table and resolve every reference
    pub fn resolve(model: &'m MergedModel) -> Result<ResolvedModel<'m>, ResolveError> {
        let mut resolver = Self {
            model,
            symbols: SymbolTable::default(),
            endpoints: Vec::new(),
            links: Vec::new(),
        };

        resolver.register_all()?;
        debug!(symbols = resolver.symbols.len(), "registered symbols");

        resolver.resolve_relationships()?;
        resolver.resolve_sort_by_columns()?;
        resolver.resolve_levels()?;
        resolver.resolve_expression_sources()?;
        resolver.resolve_model_references()?;
        resolver.resolve_perspectives()?;
        resolver.resolve_roles()?;
        resolver.resolve_variations()?;
        resolver.resolve_culture()?;
        resolver.resolve_query_groups()?;
        debug!(links = resolver.links.len(), "resolved references");

        Ok(ResolvedModel {
            model: resolver.model,
            symbols: resolver.symbols,
            endpoints: resolver.endpoints,
            links: resolver.links,
        })
    }

    // ==================== pass 1 ====================

    fn register_all(&mut self) -> Result<(), ResolveError> {
        for node in self.model.top_level() {
            self.register(&QualifiedName::root(), node)?;
        }
        Ok(())
    }

    fn register(&mut self, parent: &QualifiedName, node: &'m ObjectNode) -> Result<(), ResolveError> {
        if node.kind == ObjectKind::ChangedProperty {
            return Ok(());
        }

        let name = parent.child(node.kind, node.name.clone().unwrap_or_default());
        self.symbols.insert(name.clone(), node)?;

        for child in &node.children {
            self.register(&name, child)?;
        }
        Ok(())
    }

    // ==================== pass 2 ====================

    fn lookup(&self, name: &QualifiedName) -> Option<&'m ObjectNode> {
        self.symbols.get(name)
    }

    fn link(&mut self, site: &'m ObjectNode, key: &'static str, target: &'m ObjectNode) {
        self.links.push(ResolvedLink { site, key, target });
    }

    /// Resolve `Table.Column` text against the whole model
    fn model_column(&self, property: &Property) -> Result<ColumnTarget<'m>, ResolveError> {
        let (table, column) =
            parse_column_reference(property.value.as_text()).map_err(|e| malformed(property, e))?;

        if !self.symbols.contains(&QualifiedName::table(&table)) {
            return Err(unresolved(property, describe(ObjectKind::Table, &table)));
        }

        let node = self
            .lookup(&QualifiedName::member(&table, ObjectKind::Column, &column))
            .ok_or_else(|| unresolved(property, format!("column '{column}' in table '{table}'")))?;

        Ok(ColumnTarget {
            table,
            column,
            node,
        })
    }

    /// Resolve a single name against a member kind of one table
    fn table_member(
        &self,
        table: &str,
        kind: ObjectKind,
        property: &Property,
    ) -> Result<&'m ObjectNode, ResolveError> {
        let name = parse_name(property.value.as_text()).map_err(|e| malformed(property, e))?;
        self.lookup(&QualifiedName::member(table, kind, &name))
            .ok_or_else(|| unresolved(property, format!("{kind} '{name}' in table '{table}'")))
    }

    fn top_level_object(&self, kind: ObjectKind, property: &Property) -> Result<&'m ObjectNode, ResolveError> {
        let name = parse_name(property.value.as_text()).map_err(|e| malformed(property, e))?;
        self.lookup(&QualifiedName::top(kind, &name))
            .ok_or_else(|| unresolved(property, describe(kind, &name)))
    }

    fn resolve_relationships(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for relationship in &model.relationships {
            let from = relationship
                .property("fromColumn")
                .map(|p| self.model_column(p))
                .transpose()?;
            let to = relationship
                .property("toColumn")
                .map(|p| self.model_column(p))
                .transpose()?;

            if let (Some(from), Some(to)) = (from, to) {
                self.endpoints.push(RelationshipEndpoints {
                    relationship,
                    from,
                    to,
                });
            }
        }
        Ok(())
    }

    fn resolve_sort_by_columns(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for table in &model.tables {
            let table_name = table.display_name();
            for column in table.children_of(ObjectKind::Column) {
                if let Some(property) = column.property("sortByColumn") {
                    let target = self.table_member(table_name, ObjectKind::Column, property)?;
                    self.link(column, "sortByColumn", target);
                }
            }
        }
        Ok(())
    }

    fn resolve_levels(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for table in &model.tables {
            let table_name = table.display_name();
            for hierarchy in table.children_of(ObjectKind::Hierarchy) {
                for level in hierarchy.children_of(ObjectKind::Level) {
                    if let Some(property) = level.property("column") {
                        let target = self.table_member(table_name, ObjectKind::Column, property)?;
                        self.link(level, "column", target);
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_expression_sources(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for table in &model.tables {
            for partition in table.children_of(ObjectKind::Partition) {
                if let Some(property) = partition.property("expressionSource") {
                    let target = self.top_level_object(ObjectKind::Expression, property)?;
                    self.link(partition, "expressionSource", target);
                }
            }
        }
        Ok(())
    }

    fn resolve_model_references(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for reference in &model.references {
            let name = reference.display_name();
            if self.lookup(&QualifiedName::top(reference.kind, name)).is_none() {
                return Err(ResolveError::Unresolved {
                    text: format!("ref {} {}", reference.kind, quote_name(name)),
                    target: describe(reference.kind, name),
                    position: reference.position.clone(),
                });
            }
        }
        Ok(())
    }

    fn resolve_perspectives(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for perspective in &model.perspectives {
            for entry in perspective.children_of(ObjectKind::PerspectiveTable) {
                let table = entry.display_name();
                if !self.symbols.contains(&QualifiedName::table(table)) {
                    return Err(ResolveError::Unresolved {
                        text: table.to_string(),
                        target: describe(ObjectKind::Table, table),
                        position: entry.position.clone(),
                    });
                }

                for member in &entry.children {
                    let kind = match member.kind {
                        ObjectKind::PerspectiveColumn => ObjectKind::Column,
                        ObjectKind::PerspectiveMeasure => ObjectKind::Measure,
                        ObjectKind::PerspectiveHierarchy => ObjectKind::Hierarchy,
                        _ => continue,
                    };
                    let name = member.display_name();
                    if self.lookup(&QualifiedName::member(table, kind, name)).is_none() {
                        return Err(ResolveError::Unresolved {
                            text: format!("{}.{}", quote_name(table), quote_name(name)),
                            target: format!("{kind} '{name}' in table '{table}'"),
                            position: member.position.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_roles(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for role in &model.roles {
            for permission in role.children_of(ObjectKind::TablePermission) {
                let table = permission.display_name();
                if !self.symbols.contains(&QualifiedName::table(table)) {
                    return Err(ResolveError::Unresolved {
                        text: table.to_string(),
                        target: describe(ObjectKind::Table, table),
                        position: permission.position.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve_variations(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        for table in &model.tables {
            for column in table.children_of(ObjectKind::Column) {
                for variation in column.children_of(ObjectKind::Variation) {
                    if let Some(property) = variation.property("relationship") {
                        let target = self.top_level_object(ObjectKind::Relationship, property)?;
                        self.link(variation, "relationship", target);
                    }

                    if let Some(property) = variation.property("defaultHierarchy") {
                        let (table, hierarchy) = parse_column_reference(property.value.as_text())
                            .map_err(|e| malformed(property, e))?;
                        let target = self
                            .lookup(&QualifiedName::member(&table, ObjectKind::Hierarchy, &hierarchy))
                            .ok_or_else(|| {
                                unresolved(
                                    property,
                                    format!("hierarchy '{hierarchy}' in table '{table}'"),
                                )
                            })?;
                        self.link(variation, "defaultHierarchy", target);
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_culture(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        if model.cultures.is_empty() {
            return Ok(());
        }

        if let Some(node) = &model.model {
            if let Some(property) = node.property("culture") {
                let target = self.top_level_object(ObjectKind::CultureInfo, property)?;
                self.link(node, "culture", target);
            }
        }
        Ok(())
    }

    fn resolve_query_groups(&mut self) -> Result<(), ResolveError> {
        let model = self.model;
        let partitions = model
            .tables
            .iter()
            .flat_map(|table| table.children_of(ObjectKind::Partition));

        for site in partitions.chain(model.expressions.iter()) {
            if let Some(property) = site.property("queryGroup") {
                let target = self.top_level_object(ObjectKind::QueryGroup, property)?;
                self.link(site, "queryGroup", target);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmdlguard_syntax::parse_document;

    fn merged(files: &[(&str, &str)]) -> MergedModel {
        let docs = files
            .iter()
            .map(|(name, text)| parse_document(text, name).unwrap())
            .collect();
        MergedModel::from_documents(docs).unwrap()
    }

    const SALES: &str = "\
table Sales
\tcolumn ProductKey
\tcolumn Amount
\t\tsortByColumn: ProductKey
\tmeasure Total = SUM(Sales[Amount])
";

    const PRODUCT: &str = "table Product\n\tcolumn ProductKey\n";

    #[test]
    fn qualified_name_display() {
        let name = QualifiedName::member("Sales", ObjectKind::Column, "Amount");
        assert_eq!(name.to_string(), "table 'Sales' > column 'Amount'");
        assert_eq!(
            QualifiedName::top(ObjectKind::Model, "").to_string(),
            "model"
        );
    }

    #[test]
    fn resolves_relationship_endpoints_and_links() {
        let model = merged(&[
            ("model.tmdl", "model Model\n"),
            (
                "relationships.tmdl",
                "relationship r1\n\tfromColumn: Sales.ProductKey\n\ttoColumn: Product.ProductKey\n",
            ),
            ("tables/Product.tmdl", PRODUCT),
            ("tables/Sales.tmdl", SALES),
        ]);

        let resolved = Resolver::resolve(&model).unwrap();
        assert_eq!(resolved.endpoints.len(), 1);
        assert_eq!(resolved.endpoints[0].from.table, "Sales");
        assert_eq!(resolved.endpoints[0].to.table, "Product");

        let sales = model.table("Sales").unwrap();
        let amount = &sales.children[1];
        let target = resolved.link(amount, "sortByColumn").unwrap();
        assert_eq!(target.name.as_deref(), Some("ProductKey"));

        assert!(resolved
            .symbols
            .contains(&QualifiedName::member("Sales", ObjectKind::Measure, "Total")));
    }

    #[test]
    fn duplicate_column_reports_second_position() {
        let model = merged(&[(
            "tables/Sales.tmdl",
            "table Sales\n\tcolumn Amount\n\tcolumn Amount\n",
        )]);

        let err = Resolver::resolve(&model).unwrap_err();
        assert_eq!(err.rule(), RuleCode::DuplicateName);
        assert_eq!(err.position().line, 3);
        assert!(err.to_string().starts_with("Duplicate name: table 'Sales' > column 'Amount'"));
    }

    #[test]
    fn column_and_measure_scopes_are_separate() {
        let model = merged(&[(
            "tables/Sales.tmdl",
            "table Sales\n\tcolumn Amount\n\tmeasure Amount = 1\n",
        )]);
        assert!(Resolver::resolve(&model).is_ok());
    }

    #[test]
    fn unresolved_table_is_named() {
        let model = merged(&[
            (
                "relationships.tmdl",
                "relationship r1\n\tfromColumn: Orders.ProductKey\n\ttoColumn: Product.ProductKey\n",
            ),
            ("tables/Product.tmdl", PRODUCT),
        ]);

        let err = Resolver::resolve(&model).unwrap_err();
        assert_eq!(err.rule(), RuleCode::UnresolvedReference);
        assert_eq!(
            err.to_string(),
            "Unresolved reference 'Orders.ProductKey': table 'Orders' does not exist"
        );
        assert_eq!(err.position().line, 2);
    }

    #[test]
    fn malformed_column_reference() {
        let model = merged(&[(
            "relationships.tmdl",
            "relationship r1\n\tfromColumn: ProductKey\n",
        )]);
        let err = Resolver::resolve(&model).unwrap_err();
        assert_eq!(err.rule(), RuleCode::MalformedReference);
    }

    #[test]
    fn model_references_must_exist() {
        let model = merged(&[("model.tmdl", "model Model\n\nref table Missing\n")]);
        let err = Resolver::resolve(&model).unwrap_err();
        assert!(err.to_string().contains("table 'Missing' does not exist"));
    }

    #[test]
    fn culture_checked_only_when_cultures_exist() {
        let model = merged(&[("model.tmdl", "model Model\n\tculture: en-US\n")]);
        assert!(Resolver::resolve(&model).is_ok());

        let model = merged(&[
            ("model.tmdl", "model Model\n\tculture: en-US\n"),
            ("cultures/de-DE.tmdl", "cultureInfo de-DE\n"),
        ]);
        let err = Resolver::resolve(&model).unwrap_err();
        assert!(err.to_string().contains("cultureInfo 'en-US'"));
    }

    #[test]
    fn perspective_members() {
        let perspective = "\
perspective Sales
\tperspectiveTable Sales
\t\tperspectiveColumn Amount
\t\tperspectiveMeasure Missing
";
        let model = merged(&[
            ("perspectives/Sales.tmdl", perspective),
            ("tables/Sales.tmdl", SALES),
        ]);
        let err = Resolver::resolve(&model).unwrap_err();
        assert!(err.to_string().contains("measure 'Missing' in table 'Sales'"));
        assert_eq!(err.position().line, 4);
    }

    fn resolve_err(files: &[(&str, &str)]) -> ResolveError {
        Resolver::resolve(&merged(files)).unwrap_err()
    }

    #[test]
    fn level_column_in_same_table() {
        let table = "table T\n\tcolumn Year\n\thierarchy H\n\t\tlevel Year\n\t\t\tcolumn: Nope\n";
        let err = resolve_err(&[("tables/T.tmdl", table)]);
        assert_eq!(
            err.to_string(),
            "Unresolved reference 'Nope': column 'Nope' in table 'T' does not exist"
        );
        assert_eq!(err.position().line, 5);
    }

    #[test]
    fn expression_source_names_an_expression() {
        let table = "table T\n\tpartition P = entity\n\t\tentityName: T\n\t\texpressionSource: Missing\n";
        let err = resolve_err(&[("tables/T.tmdl", table)]);
        assert!(err.to_string().ends_with("expression 'Missing' does not exist"));
        assert_eq!(err.position().line, 4);

        let model = merged(&[
            ("expressions.tmdl", "expression Missing = 1\n"),
            ("tables/T.tmdl", table),
        ]);
        let resolved = Resolver::resolve(&model).unwrap();
        let partition = &model.table("T").unwrap().children[0];
        let target = resolved.link(partition, "expressionSource").unwrap();
        assert_eq!(target.kind, ObjectKind::Expression);
    }

    #[test]
    fn table_permission_names_a_table() {
        let err = resolve_err(&[
            ("roles/Reader.tmdl", "role Reader\n\ttablePermission Sales\n\ttablePermission Missing\n"),
            ("tables/Sales.tmdl", SALES),
        ]);
        assert_eq!(
            err.to_string(),
            "Unresolved reference 'Missing': table 'Missing' does not exist"
        );
        assert_eq!(err.position().document, "roles/Reader.tmdl");
        assert_eq!(err.position().line, 3);
    }

    #[test]
    fn variation_targets() {
        let date = "table Date\n\tcolumn Day\n\thierarchy Calendar\n\t\tlevel Day\n\t\t\tcolumn: Day\n";
        let variation = |relationship: &str, hierarchy: &str| {
            format!(
                "table Sales\n\tcolumn OrderDate\n\t\tvariation Variation\n\t\t\tisDefault\n\t\t\trelationship: {relationship}\n\t\t\tdefaultHierarchy: {hierarchy}\n"
            )
        };
        let relationships = "relationship r1\n\tfromColumn: Sales.OrderDate\n\ttoColumn: Date.Day\n";

        let err = resolve_err(&[
            ("relationships.tmdl", relationships),
            ("tables/Date.tmdl", date),
            ("tables/Sales.tmdl", &variation("r2", "Date.Calendar")),
        ]);
        assert!(err.to_string().ends_with("relationship 'r2' does not exist"));
        assert_eq!(err.position().line, 5);

        let err = resolve_err(&[
            ("relationships.tmdl", relationships),
            ("tables/Date.tmdl", date),
            ("tables/Sales.tmdl", &variation("r1", "Date.Fiscal")),
        ]);
        assert!(err.to_string().ends_with("hierarchy 'Fiscal' in table 'Date' does not exist"));
        assert_eq!(err.position().line, 6);

        let sales = variation("r1", "Date.Calendar");
        let model = merged(&[
            ("relationships.tmdl", relationships),
            ("tables/Date.tmdl", date),
            ("tables/Sales.tmdl", &sales),
        ]);
        let resolved = Resolver::resolve(&model).unwrap();
        let variation = &model.table("Sales").unwrap().children[0].children[0];
        assert_eq!(
            resolved.link(variation, "defaultHierarchy").unwrap().kind,
            ObjectKind::Hierarchy
        );
    }

    #[test]
    fn query_groups_for_partitions_and_expressions() {
        let table = "table T\n\tpartition P = m\n\t\tqueryGroup: Facts\n\t\tsource = Source\n";
        let err = resolve_err(&[("tables/T.tmdl", table)]);
        assert!(err.to_string().ends_with("queryGroup 'Facts' does not exist"));
        assert_eq!(err.position().line, 3);

        let err = resolve_err(&[
            ("expressions.tmdl", "expression Server = 1\n\tqueryGroup: Parameters\n\nqueryGroup Facts\n"),
            ("tables/T.tmdl", table),
        ]);
        assert!(err.to_string().ends_with("queryGroup 'Parameters' does not exist"));
        assert_eq!(err.position().document, "expressions.tmdl");
        assert_eq!(err.position().line, 2);
    }

    #[test]
    fn pass_one_walks_files_in_merged_order() {
        let err = resolve_err(&[
            ("perspectives/A.tmdl", "perspective A\n\tperspectiveTable T\n\tperspectiveTable T\n"),
            ("tables/T.tmdl", "table T\n\tcolumn X\n\tcolumn X\n"),
        ]);
        assert_eq!(err.rule(), RuleCode::DuplicateName);
        assert_eq!(err.position().document, "perspectives/A.tmdl");
    }
}
