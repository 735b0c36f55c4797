//! Error categories, rule codes and the validation outcome
//!
//! IMPORTANT: Rule codes and lint codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Position of a parsed line inside a definition file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePosition {
    /// Document identifier (path relative to the definition folder, `/` separated)
    pub document: String,

    /// Line number (1-indexed)
    #[serde(rename = "lineNumber")]
    pub line: usize,

    /// Raw text of the line, without the line terminator
    pub line_text: String,
}

impl SourcePosition {
    /// Create a new position
    pub fn new(document: impl Into<String>, line: usize, line_text: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            line,
            line_text: line_text.into(),
        }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.document, self.line)
    }
}

/// Failure category of a validation run
///
/// Categories are mutually exclusive. When several could apply they are
/// checked in declaration order, so `PathNotFound` wins over everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The project root does not exist
    PathNotFound,

    /// The required definition folder is missing
    InvalidStructure,

    /// A definition file could not be turned into an object tree
    FormatError,

    /// The files parsed but the model is not semantically valid
    SerializationError,

    /// A directory disappeared while the project was being read
    DirectoryNotFound,

    /// The pipeline itself failed
    UnexpectedError,
}

impl ErrorCategory {
    /// Get the category as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathNotFound => "PathNotFound",
            Self::InvalidStructure => "InvalidStructure",
            Self::FormatError => "FormatError",
            Self::SerializationError => "SerializationError",
            Self::DirectoryNotFound => "DirectoryNotFound",
            Self::UnexpectedError => "UnexpectedError",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCode {
    // Assembly and resolution
    /// The same top-level object is declared in more than one place
    DuplicateDeclaration,

    /// Two objects claim the same qualified name
    DuplicateName,

    /// A reference names an object that does not exist
    UnresolvedReference,

    /// A reference is not written in the expected form
    MalformedReference,

    // Semantic rules, in evaluation order
    /// No model object was declared
    ModelMissing,

    /// Compatibility level is missing, malformed or out of range
    CompatibilityLevelRange,

    /// A property value does not match its declared type
    PropertyType,

    /// A required property or expression is missing
    RequiredProperty,

    /// Two objects of different kinds share a name where that is not allowed
    NameConflict,

    /// A relationship has invalid endpoints
    RelationshipEndpoints,

    /// A column sorts by itself
    SortBySelf,

    /// A feature is used below its minimum compatibility level
    FeatureGate,

    /// A partition's type does not fit its table
    PartitionSource,
}

impl RuleCode {
    /// Get the rule code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateDeclaration => "DUPLICATE_DECLARATION",
            Self::DuplicateName => "DUPLICATE_NAME",
            Self::UnresolvedReference => "UNRESOLVED_REFERENCE",
            Self::MalformedReference => "MALFORMED_REFERENCE",
            Self::ModelMissing => "MODEL_MISSING",
            Self::CompatibilityLevelRange => "COMPATIBILITY_LEVEL_RANGE",
            Self::PropertyType => "PROPERTY_TYPE",
            Self::RequiredProperty => "REQUIRED_PROPERTY",
            Self::NameConflict => "NAME_CONFLICT",
            Self::RelationshipEndpoints => "RELATIONSHIP_ENDPOINTS",
            Self::SortBySelf => "SORT_BY_SELF",
            Self::FeatureGate => "FEATURE_GATE",
            Self::PartitionSource => "PARTITION_SOURCE",
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lint code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LintCode {
    /// Structural indentation mixes tabs and spaces
    MixedIndentation,

    /// A quoted name starts or ends with whitespace
    PaddedName,
}

impl LintCode {
    /// Get the lint code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MixedIndentation => "MIXED_INDENTATION",
            Self::PaddedName => "PADDED_NAME",
        }
    }
}

impl std::fmt::Display for LintCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-fatal observation about a definition file
///
/// Warnings never change the validity of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintWarning {
    /// Stable lint code
    pub code: LintCode,

    /// Human-readable message
    pub message: String,

    /// Where the warning was raised
    #[serde(flatten)]
    pub position: SourcePosition,
}

impl LintWarning {
    /// Create a new warning
    pub fn new(code: LintCode, message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            code,
            message: message.into(),
            position,
        }
    }
}

/// A failed validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    /// Failure category
    pub category: ErrorCategory,

    /// Human-readable message
    pub message: String,

    /// Offending line, when one is known
    pub position: Option<SourcePosition>,

    /// Rule that produced the failure (semantic failures only)
    pub rule: Option<RuleCode>,

    /// Pipeline context for `UnexpectedError`
    pub detail: Option<String>,
}

impl Failure {
    /// Create a new failure with minimal fields
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            position: None,
            rule: None,
            detail: None,
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the position if one is available
    pub fn with_optional_position(mut self, position: Option<SourcePosition>) -> Self {
        self.position = position;
        self
    }

    /// Set the rule code
    pub fn with_rule(mut self, rule: RuleCode) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Set pipeline detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of one validation run
///
/// Exactly one diagnostic is produced per top-level validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Diagnostic {
    /// The project is valid
    #[serde(rename_all = "camelCase")]
    Success {
        /// Declared database (or model) name
        model_name: String,

        /// Effective compatibility level
        compatibility_level: u32,
    },

    /// The project is invalid
    Failure(Failure),
}

impl Diagnostic {
    /// Create a success diagnostic
    pub fn success(model_name: impl Into<String>, compatibility_level: u32) -> Self {
        Self::Success {
            model_name: model_name.into(),
            compatibility_level,
        }
    }

    /// Create a failure diagnostic
    pub fn failure(failure: Failure) -> Self {
        Self::Failure(failure)
    }

    /// Whether the run succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure category, if the run failed
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure.category),
        }
    }

    /// Failure details, if the run failed
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

impl From<Failure> for Diagnostic {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}
