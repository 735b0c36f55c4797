//! Object kinds and the property schema table
//!
//! This table is the single source of truth for which keywords exist, where
//! they may appear, what properties they carry and which compatibility level
//! they need. The parser consults it for structure, the validator for value
//! types and feature gates.

use serde::{Deserialize, Serialize};

/// Lowest compatibility level the definition format accepts
pub const MIN_COMPATIBILITY_LEVEL: u32 = 1200;

/// Compatibility level assumed when no database object declares one
pub const DEFAULT_COMPATIBILITY_LEVEL: u32 = 1567;

/// Kind of a declared object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectKind {
    Database,
    Model,
    DataAccessOptions,
    Table,
    Column,
    Measure,
    Hierarchy,
    Level,
    Partition,
    CalculationGroup,
    CalculationItem,
    FormatStringDefinition,
    DetailRowsDefinition,
    Kpi,
    Variation,
    Relationship,
    Perspective,
    PerspectiveTable,
    PerspectiveColumn,
    PerspectiveMeasure,
    PerspectiveHierarchy,
    CultureInfo,
    LinguisticMetadata,
    Role,
    TablePermission,
    Member,
    Expression,
    DataSource,
    QueryGroup,
    Annotation,
    ExtendedProperty,
    ChangedProperty,
}

/// Whether a declaration header carries a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    Required,
    Optional,
    Forbidden,
}

/// Whether a declaration header carries a `= value` part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Required,
    Optional,
    Forbidden,
}

/// What a reference-typed property points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    /// `Table.Column` anywhere in the model
    ModelColumn,
    /// A column of the table that owns the referencing object
    SiblingColumn,
    /// A named expression
    Expression,
    /// A declared culture
    Culture,
    /// A declared query group
    QueryGroup,
    /// A relationship by name
    Relationship,
    /// `Table.Hierarchy` anywhere in the model
    ModelHierarchy,
}

/// Declared type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Bool,
    Int,
    Enum(&'static [&'static str]),
    Reference(RefTarget),
    /// Written with `=`, inline or as a block
    Expression,
}

impl ValueType {
    /// Whether the property is assigned with `=` rather than `:`
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression)
    }
}

/// One entry of a kind's property table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    pub key: &'static str,
    pub ty: ValueType,
    pub min_compatibility: Option<u32>,
}

const fn prop(key: &'static str, ty: ValueType) -> PropertyDef {
    PropertyDef {
        key,
        ty,
        min_compatibility: None,
    }
}

const fn gated(key: &'static str, ty: ValueType, level: u32) -> PropertyDef {
    PropertyDef {
        key,
        ty,
        min_compatibility: Some(level),
    }
}

use ValueType::{Bool, Int, String as Str};

const DATA_TYPES: &[&str] = &[
    "automatic", "string", "int64", "double", "dateTime", "decimal", "boolean", "binary",
    "unknown", "variant",
];
const SUMMARIZE_BY: &[&str] = &[
    "default", "none", "sum", "min", "max", "count", "average", "distinctCount",
];
const COLUMN_TYPES: &[&str] = &["data", "calculated", "rowNumber", "calculatedTableColumn"];
const ALIGNMENTS: &[&str] = &["default", "left", "right", "center"];
const ENCODING_HINTS: &[&str] = &["default", "hash", "value"];
const MODES: &[&str] = &["import", "directQuery", "dual", "push", "default", "directLake"];
const DATA_VIEWS: &[&str] = &["full", "sample", "default"];
const CARDINALITIES: &[&str] = &["none", "one", "many"];
const CROSS_FILTERING: &[&str] = &["oneDirection", "bothDirections", "automatic"];
const SECURITY_FILTERING: &[&str] = &["oneDirection", "bothDirections", "none"];
const JOIN_ON_DATE: &[&str] = &["dateAndTime", "datePartOnly"];
const MODEL_PERMISSIONS: &[&str] = &["none", "read", "readRefresh", "refresh", "administrator"];
const METADATA_PERMISSIONS: &[&str] = &["default", "none", "read"];
const MEMBER_TYPES: &[&str] = &["auto", "user", "group"];
const EXPRESSION_KINDS: &[&str] = &["m", "dax"];
const HIDE_MEMBERS: &[&str] = &["default", "hideBlankMembers"];
const COMPATIBILITY_MODES: &[&str] = &["unknown", "analysisServices", "powerBI", "excel"];
const DATA_SOURCE_VERSIONS: &[&str] = &["powerBI_V1", "powerBI_V2", "powerBI_V3"];
const VALUE_FILTER_BEHAVIORS: &[&str] = &["automatic", "independent", "coalesced"];
const DIRECT_LAKE_BEHAVIORS: &[&str] = &["automatic", "directLakeOnly", "directQueryOnly"];
const DATA_SOURCE_TYPES: &[&str] = &["provider", "structured"];
const CONTENT_TYPES: &[&str] = &["json", "xml"];

/// Values accepted after `partition <name> =`
pub const PARTITION_TYPES: &[&str] = &[
    "m", "calculated", "query", "entity", "calculationGroup", "policyRange", "inferred",
];

const DATABASE_PROPS: &[PropertyDef] = &[
    prop("compatibilityLevel", Int),
    prop("compatibilityMode", ValueType::Enum(COMPATIBILITY_MODES)),
    prop("language", Int),
    prop("collation", Str),
    prop("id", Str),
];

const MODEL_PROPS: &[PropertyDef] = &[
    prop("culture", ValueType::Reference(RefTarget::Culture)),
    prop("defaultPowerBIDataSourceVersion", ValueType::Enum(DATA_SOURCE_VERSIONS)),
    prop("sourceQueryCulture", Str),
    prop("discourageImplicitMeasures", Bool),
    prop("defaultMode", ValueType::Enum(MODES)),
    prop("defaultDataView", ValueType::Enum(DATA_VIEWS)),
    prop("collation", Str),
    prop("valueFilterBehavior", ValueType::Enum(VALUE_FILTER_BEHAVIORS)),
    prop("forceUniqueNames", Bool),
    prop("disableAutoExists", Int),
    prop("maxParallelismPerQuery", Int),
    prop("maxParallelismPerRefresh", Int),
    prop("dataSourceDefaultMaxConnections", Int),
    prop("storageLocation", Str),
    prop("directLakeBehavior", ValueType::Enum(DIRECT_LAKE_BEHAVIORS)),
];

const DATA_ACCESS_OPTIONS_PROPS: &[PropertyDef] = &[
    prop("legacyRedirects", Bool),
    prop("returnErrorValuesAsNull", Bool),
    prop("fastCombine", Bool),
];

const TABLE_PROPS: &[PropertyDef] = &[
    prop("lineageTag", Str),
    gated("sourceLineageTag", Str, 1550),
    prop("isHidden", Bool),
    prop("isPrivate", Bool),
    prop("showAsVariationsOnly", Bool),
    prop("dataCategory", Str),
    prop("excludeFromModelRefresh", Bool),
    prop("systemManaged", Bool),
    prop("alternateSourcePrecedence", Int),
    prop("excludeFromAutomaticAggregations", Bool),
];

const COLUMN_PROPS: &[PropertyDef] = &[
    prop("dataType", ValueType::Enum(DATA_TYPES)),
    prop("formatString", Str),
    prop("lineageTag", Str),
    gated("sourceLineageTag", Str, 1550),
    prop("summarizeBy", ValueType::Enum(SUMMARIZE_BY)),
    prop("sourceColumn", Str),
    prop("sortByColumn", ValueType::Reference(RefTarget::SiblingColumn)),
    prop("isHidden", Bool),
    prop("isKey", Bool),
    prop("isNullable", Bool),
    prop("isUnique", Bool),
    prop("isDefaultLabel", Bool),
    prop("isDefaultImage", Bool),
    prop("isAvailableInMdx", Bool),
    prop("isNameInferred", Bool),
    prop("isDataTypeInferred", Bool),
    prop("keepUniqueRows", Bool),
    prop("dataCategory", Str),
    prop("displayFolder", Str),
    prop("type", ValueType::Enum(COLUMN_TYPES)),
    prop("alignment", ValueType::Enum(ALIGNMENTS)),
    prop("tableDetailPosition", Int),
    prop("displayOrdinal", Int),
    prop("sourceProviderType", Str),
    prop("encodingHint", ValueType::Enum(ENCODING_HINTS)),
    prop("errorMessage", Str),
];

const MEASURE_PROPS: &[PropertyDef] = &[
    prop("formatString", Str),
    prop("displayFolder", Str),
    prop("lineageTag", Str),
    gated("sourceLineageTag", Str, 1550),
    prop("isHidden", Bool),
    prop("isSimpleMeasure", Bool),
    prop("dataCategory", Str),
];

const HIERARCHY_PROPS: &[PropertyDef] = &[
    prop("lineageTag", Str),
    gated("sourceLineageTag", Str, 1550),
    prop("isHidden", Bool),
    prop("displayFolder", Str),
    prop("hideMembers", ValueType::Enum(HIDE_MEMBERS)),
];

const LEVEL_PROPS: &[PropertyDef] = &[
    prop("column", ValueType::Reference(RefTarget::SiblingColumn)),
    prop("lineageTag", Str),
    gated("sourceLineageTag", Str, 1550),
    prop("ordinal", Int),
];

const PARTITION_PROPS: &[PropertyDef] = &[
    prop("mode", ValueType::Enum(MODES)),
    prop("source", ValueType::Expression),
    prop("dataView", ValueType::Enum(DATA_VIEWS)),
    prop("queryGroup", ValueType::Reference(RefTarget::QueryGroup)),
    prop("expressionSource", ValueType::Reference(RefTarget::Expression)),
    prop("entityName", Str),
    prop("schemaName", Str),
    prop("dataSource", Str),
];

const CALCULATION_GROUP_PROPS: &[PropertyDef] = &[prop("precedence", Int)];

const CALCULATION_ITEM_PROPS: &[PropertyDef] = &[prop("ordinal", Int)];

const KPI_PROPS: &[PropertyDef] = &[
    prop("targetExpression", ValueType::Expression),
    prop("statusExpression", ValueType::Expression),
    prop("trendExpression", ValueType::Expression),
    prop("targetFormatString", Str),
    prop("statusGraphic", Str),
    prop("trendGraphic", Str),
    prop("targetDescription", Str),
    prop("statusDescription", Str),
    prop("trendDescription", Str),
];

const VARIATION_PROPS: &[PropertyDef] = &[
    prop("isDefault", Bool),
    prop("relationship", ValueType::Reference(RefTarget::Relationship)),
    prop("defaultHierarchy", ValueType::Reference(RefTarget::ModelHierarchy)),
];

const RELATIONSHIP_PROPS: &[PropertyDef] = &[
    prop("fromColumn", ValueType::Reference(RefTarget::ModelColumn)),
    prop("toColumn", ValueType::Reference(RefTarget::ModelColumn)),
    prop("fromCardinality", ValueType::Enum(CARDINALITIES)),
    prop("toCardinality", ValueType::Enum(CARDINALITIES)),
    prop("crossFilteringBehavior", ValueType::Enum(CROSS_FILTERING)),
    prop("securityFilteringBehavior", ValueType::Enum(SECURITY_FILTERING)),
    prop("joinOnDateBehavior", ValueType::Enum(JOIN_ON_DATE)),
    prop("isActive", Bool),
    gated("relyOnReferentialIntegrity", Bool, 1200),
];

const PERSPECTIVE_TABLE_PROPS: &[PropertyDef] = &[prop("includeAll", Bool)];

const LINGUISTIC_METADATA_PROPS: &[PropertyDef] =
    &[prop("contentType", ValueType::Enum(CONTENT_TYPES))];

const ROLE_PROPS: &[PropertyDef] = &[prop("modelPermission", ValueType::Enum(MODEL_PERMISSIONS))];

const TABLE_PERMISSION_PROPS: &[PropertyDef] =
    &[prop("metadataPermission", ValueType::Enum(METADATA_PERMISSIONS))];

const MEMBER_PROPS: &[PropertyDef] = &[
    prop("memberId", Str),
    prop("identityProvider", Str),
    prop("memberType", ValueType::Enum(MEMBER_TYPES)),
];

const EXPRESSION_PROPS: &[PropertyDef] = &[
    prop("kind", ValueType::Enum(EXPRESSION_KINDS)),
    prop("lineageTag", Str),
    gated("sourceLineageTag", Str, 1550),
    prop("queryGroup", ValueType::Reference(RefTarget::QueryGroup)),
    prop("resultType", Str),
];

const DATA_SOURCE_PROPS: &[PropertyDef] = &[
    prop("type", ValueType::Enum(DATA_SOURCE_TYPES)),
    prop("provider", Str),
    prop("connectionString", Str),
    prop("impersonationMode", Str),
    prop("account", Str),
    prop("isolation", Str),
    prop("maxConnections", Int),
    prop("timeout", Int),
    prop("connectionDetails", ValueType::Expression),
    prop("credential", ValueType::Expression),
    prop("options", ValueType::Expression),
];

const QUERY_GROUP_PROPS: &[PropertyDef] = &[prop("folder", Str)];

const NO_PROPS: &[PropertyDef] = &[];

impl ObjectKind {
    /// Every kind, in declaration order
    pub const ALL: [ObjectKind; 32] = [
        Self::Database,
        Self::Model,
        Self::DataAccessOptions,
        Self::Table,
        Self::Column,
        Self::Measure,
        Self::Hierarchy,
        Self::Level,
        Self::Partition,
        Self::CalculationGroup,
        Self::CalculationItem,
        Self::FormatStringDefinition,
        Self::DetailRowsDefinition,
        Self::Kpi,
        Self::Variation,
        Self::Relationship,
        Self::Perspective,
        Self::PerspectiveTable,
        Self::PerspectiveColumn,
        Self::PerspectiveMeasure,
        Self::PerspectiveHierarchy,
        Self::CultureInfo,
        Self::LinguisticMetadata,
        Self::Role,
        Self::TablePermission,
        Self::Member,
        Self::Expression,
        Self::DataSource,
        Self::QueryGroup,
        Self::Annotation,
        Self::ExtendedProperty,
        Self::ChangedProperty,
    ];

    /// Keyword that introduces this kind in a definition file
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Model => "model",
            Self::DataAccessOptions => "dataAccessOptions",
            Self::Table => "table",
            Self::Column => "column",
            Self::Measure => "measure",
            Self::Hierarchy => "hierarchy",
            Self::Level => "level",
            Self::Partition => "partition",
            Self::CalculationGroup => "calculationGroup",
            Self::CalculationItem => "calculationItem",
            Self::FormatStringDefinition => "formatStringDefinition",
            Self::DetailRowsDefinition => "detailRowsDefinition",
            Self::Kpi => "kpi",
            Self::Variation => "variation",
            Self::Relationship => "relationship",
            Self::Perspective => "perspective",
            Self::PerspectiveTable => "perspectiveTable",
            Self::PerspectiveColumn => "perspectiveColumn",
            Self::PerspectiveMeasure => "perspectiveMeasure",
            Self::PerspectiveHierarchy => "perspectiveHierarchy",
            Self::CultureInfo => "cultureInfo",
            Self::LinguisticMetadata => "linguisticMetadata",
            Self::Role => "role",
            Self::TablePermission => "tablePermission",
            Self::Member => "member",
            Self::Expression => "expression",
            Self::DataSource => "dataSource",
            Self::QueryGroup => "queryGroup",
            Self::Annotation => "annotation",
            Self::ExtendedProperty => "extendedProperty",
            Self::ChangedProperty => "changedProperty",
        }
    }

    /// Look up a kind by keyword (case-sensitive)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.keyword() == keyword)
    }

    pub fn name_rule(&self) -> NameRule {
        match self {
            Self::Database => NameRule::Optional,
            Self::DataAccessOptions
            | Self::CalculationGroup
            | Self::FormatStringDefinition
            | Self::DetailRowsDefinition
            | Self::Kpi
            | Self::LinguisticMetadata
            | Self::ChangedProperty => NameRule::Forbidden,
            _ => NameRule::Required,
        }
    }

    pub fn default_value(&self) -> DefaultValue {
        match self {
            Self::Measure
            | Self::CalculationItem
            | Self::FormatStringDefinition
            | Self::DetailRowsDefinition
            | Self::LinguisticMetadata
            | Self::Expression
            | Self::Annotation
            | Self::ExtendedProperty
            | Self::ChangedProperty
            | Self::Partition => DefaultValue::Required,
            Self::Column | Self::TablePermission => DefaultValue::Optional,
            _ => DefaultValue::Forbidden,
        }
    }

    /// Whether this kind may be nested under `parent` (`None` is file top level)
    pub fn allowed_under(&self, parent: Option<ObjectKind>) -> bool {
        use ObjectKind::*;

        match self {
            Database | Model | Table | Relationship | Perspective | CultureInfo | Role
            | Expression | DataSource | QueryGroup => parent.is_none(),
            DataAccessOptions => parent == Some(Model),
            Column | Measure | Hierarchy | Partition | CalculationGroup => parent == Some(Table),
            Level => parent == Some(Hierarchy),
            CalculationItem => parent == Some(CalculationGroup),
            FormatStringDefinition => matches!(parent, Some(Measure | CalculationItem)),
            DetailRowsDefinition => matches!(parent, Some(Measure | Table)),
            Kpi => parent == Some(Measure),
            Variation => parent == Some(Column),
            PerspectiveTable => parent == Some(Perspective),
            PerspectiveColumn | PerspectiveMeasure | PerspectiveHierarchy => {
                parent == Some(PerspectiveTable)
            }
            LinguisticMetadata => parent == Some(CultureInfo),
            TablePermission | Member => parent == Some(Role),
            Annotation | ExtendedProperty => !matches!(
                parent,
                Some(Annotation | ExtendedProperty | ChangedProperty)
            ),
            ChangedProperty => !matches!(
                parent,
                None | Some(Annotation | ExtendedProperty | ChangedProperty)
            ),
        }
    }

    /// Whether `ref <keyword> <name>` may point at this kind
    pub fn can_be_referenced(&self) -> bool {
        matches!(
            self,
            Self::Table
                | Self::CultureInfo
                | Self::Perspective
                | Self::Role
                | Self::Expression
                | Self::QueryGroup
                | Self::DataSource
        )
    }

    /// Annotation-like kinds that may extend an object from another file
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Self::Annotation | Self::ExtendedProperty | Self::ChangedProperty
        )
    }

    pub fn properties(&self) -> &'static [PropertyDef] {
        match self {
            Self::Database => DATABASE_PROPS,
            Self::Model => MODEL_PROPS,
            Self::DataAccessOptions => DATA_ACCESS_OPTIONS_PROPS,
            Self::Table => TABLE_PROPS,
            Self::Column => COLUMN_PROPS,
            Self::Measure => MEASURE_PROPS,
            Self::Hierarchy => HIERARCHY_PROPS,
            Self::Level => LEVEL_PROPS,
            Self::Partition => PARTITION_PROPS,
            Self::CalculationGroup => CALCULATION_GROUP_PROPS,
            Self::CalculationItem => CALCULATION_ITEM_PROPS,
            Self::Kpi => KPI_PROPS,
            Self::Variation => VARIATION_PROPS,
            Self::Relationship => RELATIONSHIP_PROPS,
            Self::PerspectiveTable => PERSPECTIVE_TABLE_PROPS,
            Self::LinguisticMetadata => LINGUISTIC_METADATA_PROPS,
            Self::Role => ROLE_PROPS,
            Self::TablePermission => TABLE_PERMISSION_PROPS,
            Self::Member => MEMBER_PROPS,
            Self::Expression => EXPRESSION_PROPS,
            Self::DataSource => DATA_SOURCE_PROPS,
            Self::QueryGroup => QUERY_GROUP_PROPS,
            _ => NO_PROPS,
        }
    }

    /// Look up a property of this kind by key (case-sensitive)
    pub fn property(&self, key: &str) -> Option<&'static PropertyDef> {
        self.properties().iter().find(|spec| spec.key == key)
    }

    /// Minimum compatibility level at which this kind may be used
    pub fn min_compatibility(&self) -> Option<u32> {
        match self {
            Self::CalculationGroup => Some(1470),
            Self::DetailRowsDefinition => Some(1400),
            Self::FormatStringDefinition => Some(1601),
            Self::Variation => Some(1400),
            Self::QueryGroup => Some(1480),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}
