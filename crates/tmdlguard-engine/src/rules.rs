//! Semantic rule battery
//!
//! Rules run in table order and the first violation ends the run. The order
//! is part of the observable behaviour: changing it, or the meaning of a
//! rule, requires bumping [`RULESET_VERSION`].

use std::collections::{HashMap, HashSet};
use tmdlguard_core::{
    Config, ErrorCategory, Failure, ObjectKind, RuleCode, SourcePosition, ValueType,
    MIN_COMPATIBILITY_LEVEL, PARTITION_TYPES,
};
use tmdlguard_model::ResolvedModel;
use tmdlguard_syntax::{ObjectNode, Property, PropertyValue};

/// Version of the rule table below
pub const RULESET_VERSION: u32 = 1;

/// A semantic rule failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RuleViolation {
    pub code: RuleCode,
    pub message: String,
    pub position: Option<SourcePosition>,
}

impl RuleViolation {
    pub fn new(code: RuleCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: &SourcePosition) -> Self {
        self.position = Some(position.clone());
        self
    }

    pub fn to_failure(&self) -> Failure {
        Failure::new(ErrorCategory::SerializationError, self.message.clone())
            .with_optional_position(self.position.clone())
            .with_rule(self.code)
    }
}

/// Everything a rule may look at
pub struct RuleContext<'a, 'm> {
    pub resolved: &'a ResolvedModel<'m>,
    pub config: &'a Config,
    /// Effective compatibility level
    pub level: u32,
    /// Every object in the model, parents before children
    pub nodes: Vec<&'m ObjectNode>,
}

impl<'a, 'm> RuleContext<'a, 'm> {
    pub fn new(resolved: &'a ResolvedModel<'m>, config: &'a Config) -> Self {
        let model = resolved.model;
        let mut nodes = Vec::new();
        for top in model.top_level() {
            top.walk(&mut |node, _| nodes.push(node));
        }

        let level = model
            .database
            .as_ref()
            .and_then(|db| db.property_text("compatibilityLevel"))
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(config.default_compatibility_level);

        Self {
            resolved,
            config,
            level,
            nodes,
        }
    }

    fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &'m ObjectNode> + '_ {
        self.nodes.iter().copied().filter(move |node| node.kind == kind)
    }
}

/// One entry of the rule table
pub trait Rule: Sync {
    fn code(&self) -> RuleCode;

    fn description(&self) -> &'static str;

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation>;
}

/// The rule table, in evaluation order
pub static RULES: &[&dyn Rule] = &[
    &ModelPresent,
    &CompatibilityLevelRange,
    &PropertyTypes,
    &RequiredProperties,
    &NameConflicts,
    &RelationshipEndpointRule,
    &SortBySelf,
    &FeatureGates,
    &PartitionSources,
];

fn object_label(node: &ObjectNode) -> String {
    format!("{} '{}'", node.kind, node.display_name())
}

/// R001
pub struct ModelPresent;

impl Rule for ModelPresent {
    fn code(&self) -> RuleCode {
        RuleCode::ModelMissing
    }

    fn description(&self) -> &'static str {
        "exactly one model object exists"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        if ctx.resolved.model.model.is_none() {
            return Err(RuleViolation::new(
                self.code(),
                "No model object is declared in the project",
            ));
        }
        Ok(())
    }
}

/// R002
pub struct CompatibilityLevelRange;

impl Rule for CompatibilityLevelRange {
    fn code(&self) -> RuleCode {
        RuleCode::CompatibilityLevelRange
    }

    fn description(&self) -> &'static str {
        "compatibility level is a supported integer"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        let Some(database) = &ctx.resolved.model.database else {
            return Ok(());
        };
        let Some(property) = database.property("compatibilityLevel") else {
            return Ok(());
        };

        let text = property.value.as_text().trim();
        let level: u32 = text.parse().map_err(|_| {
            RuleViolation::new(
                self.code(),
                format!("Compatibility level '{text}' is not a number"),
            )
            .at(&property.position)
        })?;

        if level < MIN_COMPATIBILITY_LEVEL {
            return Err(RuleViolation::new(
                self.code(),
                format!(
                    "Compatibility level {level} is below the minimum of {MIN_COMPATIBILITY_LEVEL}"
                ),
            )
            .at(&property.position));
        }

        if let Some(max) = ctx.config.max_compatibility_level {
            if level > max {
                return Err(RuleViolation::new(
                    self.code(),
                    format!("Compatibility level {level} is above the supported maximum of {max}"),
                )
                .at(&property.position));
            }
        }
        Ok(())
    }
}

/// R003
pub struct PropertyTypes;

impl PropertyTypes {
    fn check_value(
        &self,
        node: &ObjectNode,
        property: &Property,
        ty: ValueType,
    ) -> Result<(), RuleViolation> {
        let text = property.value.as_text();
        let is_flag = matches!(property.value, PropertyValue::Flag);

        let expected = match ty {
            ValueType::Bool if text == "true" || text == "false" => return Ok(()),
            ValueType::Bool => "true or false".to_string(),
            ValueType::Int if !is_flag && text.trim().parse::<i64>().is_ok() => return Ok(()),
            ValueType::Int => "an integer".to_string(),
            ValueType::Enum(values) if !is_flag && values.contains(&text) => return Ok(()),
            ValueType::Enum(values) => format!("one of {}", values.join(", ")),
            ValueType::String | ValueType::Reference(_) if !is_flag => return Ok(()),
            ValueType::String | ValueType::Reference(_) => "a value".to_string(),
            ValueType::Expression => return Ok(()),
        };

        let found = if is_flag {
            "a bare flag".to_string()
        } else {
            format!("'{text}'")
        };
        Err(RuleViolation::new(
            self.code(),
            format!(
                "Property '{}' of {} must be {expected}, found {found}",
                property.key,
                object_label(node)
            ),
        )
        .at(&property.position))
    }
}

impl Rule for PropertyTypes {
    fn code(&self) -> RuleCode {
        RuleCode::PropertyType
    }

    fn description(&self) -> &'static str {
        "property values conform to their declared types"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        for node in &ctx.nodes {
            for property in &node.properties {
                if let Some(def) = node.kind.property(&property.key) {
                    self.check_value(node, property, def.ty)?;
                }
            }

            if node.kind == ObjectKind::Partition {
                let source_type = node.expression.as_deref().map(str::trim).unwrap_or_default();
                if !PARTITION_TYPES.contains(&source_type) {
                    return Err(RuleViolation::new(
                        self.code(),
                        format!(
                            "Partition '{}' has unknown source type '{source_type}'",
                            node.display_name()
                        ),
                    )
                    .at(&node.position));
                }
            }
        }
        Ok(())
    }
}

/// R004
pub struct RequiredProperties;

impl RequiredProperties {
    fn require(&self, node: &ObjectNode, key: &str) -> Result<(), RuleViolation> {
        if node.property(key).is_some() {
            return Ok(());
        }
        Err(RuleViolation::new(
            self.code(),
            format!("{} is missing required property '{key}'", object_label(node)),
        )
        .at(&node.position))
    }
}

impl Rule for RequiredProperties {
    fn code(&self) -> RuleCode {
        RuleCode::RequiredProperty
    }

    fn description(&self) -> &'static str {
        "required properties and expressions are present"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        for node in &ctx.nodes {
            match node.kind {
                ObjectKind::Relationship => {
                    self.require(node, "fromColumn")?;
                    self.require(node, "toColumn")?;
                }
                ObjectKind::Level => self.require(node, "column")?,
                ObjectKind::Measure | ObjectKind::CalculationItem | ObjectKind::Expression => {
                    let empty = node.expression.as_deref().map_or(true, |e| e.trim().is_empty());
                    if empty {
                        return Err(RuleViolation::new(
                            self.code(),
                            format!("{} has an empty expression", object_label(node)),
                        )
                        .at(&node.position));
                    }
                }
                ObjectKind::Partition => match node.expression.as_deref().map(str::trim) {
                    Some("entity") => {
                        self.require(node, "entityName")?;
                        self.require(node, "expressionSource")?;
                    }
                    // Calculation group partitions are generated from their items
                    Some("calculationGroup") => {}
                    _ => self.require(node, "source")?,
                },
                _ => {}
            }
        }
        Ok(())
    }
}

/// R005
pub struct NameConflicts;

impl Rule for NameConflicts {
    fn code(&self) -> RuleCode {
        RuleCode::NameConflict
    }

    fn description(&self) -> &'static str {
        "measure names are unique and do not shadow columns or hierarchies"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        let mut measures: HashMap<&str, &ObjectNode> = HashMap::new();

        for table in &ctx.resolved.model.tables {
            let members: HashSet<&str> = table
                .children
                .iter()
                .filter(|c| matches!(c.kind, ObjectKind::Column | ObjectKind::Hierarchy))
                .map(|c| c.display_name())
                .collect();

            for measure in table.children_of(ObjectKind::Measure) {
                let name = measure.display_name();
                if members.contains(name) {
                    return Err(RuleViolation::new(
                        self.code(),
                        format!(
                            "Measure '{name}' has the same name as a column or hierarchy of table '{}'",
                            table.display_name()
                        ),
                    )
                    .at(&measure.position));
                }

                if let Some(first) = measures.insert(name, measure) {
                    return Err(RuleViolation::new(
                        self.code(),
                        format!(
                            "Measure name '{name}' is already used at {}",
                            first.position
                        ),
                    )
                    .at(&measure.position));
                }
            }
        }
        Ok(())
    }
}

/// R006
pub struct RelationshipEndpointRule;

impl Rule for RelationshipEndpointRule {
    fn code(&self) -> RuleCode {
        RuleCode::RelationshipEndpoints
    }

    fn description(&self) -> &'static str {
        "relationships join two different tables, once per column pair"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        let mut pairs: HashMap<((&str, &str), (&str, &str)), &ObjectNode> = HashMap::new();

        for endpoints in &ctx.resolved.endpoints {
            let relationship = endpoints.relationship;
            let (from, to) = (&endpoints.from, &endpoints.to);

            if from.table == to.table {
                return Err(RuleViolation::new(
                    self.code(),
                    format!(
                        "Relationship '{}' connects table '{}' to itself",
                        relationship.display_name(),
                        from.table
                    ),
                )
                .at(&relationship.position));
            }

            // Unordered: A.K -> B.K and B.K -> A.K join the same pair
            let ends = (
                (from.table.as_str(), from.column.as_str()),
                (to.table.as_str(), to.column.as_str()),
            );
            let key = if ends.0 <= ends.1 { ends } else { (ends.1, ends.0) };
            if let Some(first) = pairs.insert(key, relationship) {
                return Err(RuleViolation::new(
                    self.code(),
                    format!(
                        "Relationship '{}' duplicates relationship '{}' between '{}'.'{}' and '{}'.'{}'",
                        relationship.display_name(),
                        first.display_name(),
                        from.table,
                        from.column,
                        to.table,
                        to.column
                    ),
                )
                .at(&relationship.position));
            }
        }
        Ok(())
    }
}

/// R007
pub struct SortBySelf;

impl Rule for SortBySelf {
    fn code(&self) -> RuleCode {
        RuleCode::SortBySelf
    }

    fn description(&self) -> &'static str {
        "a column does not sort by itself"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        for column in ctx.of_kind(ObjectKind::Column) {
            let Some(target) = ctx.resolved.link(column, "sortByColumn") else {
                continue;
            };
            if std::ptr::eq(target, column) {
                let position = column
                    .property("sortByColumn")
                    .map_or(&column.position, |p| &p.position);
                return Err(RuleViolation::new(
                    self.code(),
                    format!("Column '{}' cannot sort by itself", column.display_name()),
                )
                .at(position));
            }
        }
        Ok(())
    }
}

/// R008
pub struct FeatureGates;

impl FeatureGates {
    fn gate(
        &self,
        feature: &str,
        required: u32,
        level: u32,
        position: &SourcePosition,
    ) -> Result<(), RuleViolation> {
        if level >= required {
            return Ok(());
        }
        Err(RuleViolation::new(
            self.code(),
            format!("{feature} requires compatibility level {required} or higher (model is at {level})"),
        )
        .at(position))
    }
}

impl Rule for FeatureGates {
    fn code(&self) -> RuleCode {
        RuleCode::FeatureGate
    }

    fn description(&self) -> &'static str {
        "features are used at or above their minimum compatibility level"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        for node in &ctx.nodes {
            if let Some(required) = node.kind.min_compatibility() {
                self.gate(
                    &format!("Object type '{}'", node.kind),
                    required,
                    ctx.level,
                    &node.position,
                )?;
            }

            for property in &node.properties {
                let required = node
                    .kind
                    .property(&property.key)
                    .and_then(|def| def.min_compatibility);
                if let Some(required) = required {
                    self.gate(
                        &format!("Property '{}'", property.key),
                        required,
                        ctx.level,
                        &property.position,
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// R009
pub struct PartitionSources;

impl Rule for PartitionSources {
    fn code(&self) -> RuleCode {
        RuleCode::PartitionSource
    }

    fn description(&self) -> &'static str {
        "calculation group partitions and tables belong together"
    }

    fn check(&self, ctx: &RuleContext<'_, '_>) -> Result<(), RuleViolation> {
        for table in &ctx.resolved.model.tables {
            let is_calculation_group = table.has_child(ObjectKind::CalculationGroup);

            for partition in table.children_of(ObjectKind::Partition) {
                let source_type = partition.expression.as_deref().map(str::trim).unwrap_or_default();

                if source_type == "calculationGroup" && !is_calculation_group {
                    return Err(RuleViolation::new(
                        self.code(),
                        format!(
                            "Partition '{}' is a calculationGroup partition but table '{}' declares no calculationGroup",
                            partition.display_name(),
                            table.display_name()
                        ),
                    )
                    .at(&partition.position));
                }

                if is_calculation_group && source_type != "calculationGroup" {
                    return Err(RuleViolation::new(
                        self.code(),
                        format!(
                            "Calculation group table '{}' cannot carry a '{source_type}' partition",
                            table.display_name()
                        ),
                    )
                    .at(&partition.position));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmdlguard_model::{MergedModel, Resolver};
    use tmdlguard_syntax::parse_document;

    fn merged(files: &[(&str, &str)]) -> MergedModel {
        let docs = files
            .iter()
            .map(|(name, text)| parse_document(text, name).unwrap())
            .collect();
        MergedModel::from_documents(docs).unwrap()
    }

    fn run(model: &MergedModel) -> Result<(), RuleViolation> {
        let resolved = Resolver::resolve(model).unwrap();
        let config = Config::default();
        let ctx = RuleContext::new(&resolved, &config);
        for rule in RULES {
            rule.check(&ctx)?;
        }
        Ok(())
    }

    const MODEL: (&str, &str) = ("model.tmdl", "model Model\n");

    #[test]
    fn table_codes_are_in_order() {
        let codes: Vec<RuleCode> = RULES.iter().map(|r| r.code()).collect();
        assert_eq!(
            codes,
            vec![
                RuleCode::ModelMissing,
                RuleCode::CompatibilityLevelRange,
                RuleCode::PropertyType,
                RuleCode::RequiredProperty,
                RuleCode::NameConflict,
                RuleCode::RelationshipEndpoints,
                RuleCode::SortBySelf,
                RuleCode::FeatureGate,
                RuleCode::PartitionSource,
            ]
        );
        assert!(RULES.iter().all(|r| !r.description().is_empty()));
    }

    #[test]
    fn missing_model() {
        let model = merged(&[("tables/A.tmdl", "table A\n\tcolumn X\n")]);
        assert_eq!(run(&model).unwrap_err().code, RuleCode::ModelMissing);
    }

    #[test]
    fn compatibility_level_below_minimum() {
        let model = merged(&[
            ("database.tmdl", "database Sales\n\tcompatibilityLevel: 1100\n"),
            MODEL,
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::CompatibilityLevelRange);
        assert_eq!(err.position.unwrap().line, 2);
    }

    #[test]
    fn enum_and_bool_values() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tcolumn X\n\t\tdataType: text\n"),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::PropertyType);
        assert!(err.message.contains("Property 'dataType' of column 'X'"));

        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tcolumn X\n\t\tisHidden\n\t\tisKey: false\n"),
        ]);
        assert!(run(&model).is_ok());
    }

    #[test]
    fn partition_requires_source() {
        let model = merged(&[MODEL, ("tables/A.tmdl", "table A\n\tpartition A = m\n\t\tmode: import\n")]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::RequiredProperty);
        assert!(err.message.contains("'source'"));
    }

    #[test]
    fn measure_shadows_column() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tcolumn Total\n\tmeasure Total = 1\n"),
        ]);
        assert_eq!(run(&model).unwrap_err().code, RuleCode::NameConflict);
    }

    #[test]
    fn measure_names_unique_across_tables() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tmeasure Total = 1\n"),
            ("tables/B.tmdl", "table B\n\tmeasure Total = 2\n"),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::NameConflict);
        assert_eq!(err.position.unwrap().document, "tables/B.tmdl");
    }

    #[test]
    fn relationship_to_same_table() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tcolumn X\n\tcolumn Y\n"),
            ("relationships.tmdl", "relationship r\n\tfromColumn: A.X\n\ttoColumn: A.Y\n"),
        ]);
        assert_eq!(run(&model).unwrap_err().code, RuleCode::RelationshipEndpoints);
    }

    #[test]
    fn column_sorting_by_itself() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tcolumn X\n\t\tsortByColumn: X\n"),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::SortBySelf);
        assert_eq!(err.position.unwrap().line, 3);
    }

    #[test]
    fn feature_gate_names_feature_and_level() {
        let model = merged(&[
            ("database.tmdl", "database Sales\n\tcompatibilityLevel: 1400\n"),
            MODEL,
            (
                "tables/A.tmdl",
                "table A\n\tcalculationGroup\n\t\tcalculationItem Current = SELECTEDMEASURE()\n\tpartition A = calculationGroup\n",
            ),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::FeatureGate);
        assert_eq!(
            err.message,
            "Object type 'calculationGroup' requires compatibility level 1470 or higher (model is at 1400)"
        );
    }

    #[test]
    fn calculation_group_partition_needs_group() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tpartition A = calculationGroup\n"),
        ]);
        assert_eq!(run(&model).unwrap_err().code, RuleCode::PartitionSource);
    }

    #[test]
    fn calculation_group_table_with_other_partition() {
        let model = merged(&[
            MODEL,
            (
                "tables/A.tmdl",
                "table A\n\tcalculationGroup\n\t\tcalculationItem Current = SELECTEDMEASURE()\n\tpartition B = m\n\t\tsource = Source\n",
            ),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::PartitionSource);
        assert_eq!(err.message, "Calculation group table 'A' cannot carry a 'm' partition");
        assert_eq!(err.position.unwrap().line, 4);
    }

    #[test]
    fn unknown_partition_source_type() {
        let model = merged(&[MODEL, ("tables/A.tmdl", "table A\n\tpartition A = csv\n")]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::PropertyType);
        assert_eq!(err.message, "Partition 'A' has unknown source type 'csv'");
    }

    #[test]
    fn entity_partition_requirements() {
        let expression = ("expressions.tmdl", "expression Source = 1\n");

        let model = merged(&[
            MODEL,
            expression,
            ("tables/A.tmdl", "table A\n\tpartition A = entity\n\t\texpressionSource: Source\n"),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::RequiredProperty);
        assert_eq!(err.message, "partition 'A' is missing required property 'entityName'");

        let model = merged(&[
            MODEL,
            expression,
            (
                "tables/A.tmdl",
                "table A\n\tpartition A = entity\n\t\tentityName: A\n\t\texpressionSource: Source\n",
            ),
        ]);
        assert!(run(&model).is_ok());
    }

    #[test]
    fn reversed_relationship_is_a_duplicate() {
        let model = merged(&[
            MODEL,
            ("tables/A.tmdl", "table A\n\tcolumn K\n"),
            ("tables/B.tmdl", "table B\n\tcolumn K\n"),
            (
                "relationships.tmdl",
                "relationship r1\n\tfromColumn: A.K\n\ttoColumn: B.K\n\nrelationship r2\n\tfromColumn: B.K\n\ttoColumn: A.K\n",
            ),
        ]);
        let err = run(&model).unwrap_err();
        assert_eq!(err.code, RuleCode::RelationshipEndpoints);
        assert!(err.message.starts_with("Relationship 'r2' duplicates relationship 'r1'"));
        assert_eq!(err.position.unwrap().line, 5);
    }
}
