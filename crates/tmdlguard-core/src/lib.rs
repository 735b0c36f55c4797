//! tmdlguard Core
//!
//! Core domain model with stable, versioned types.
//! Never rename rule or lint codes - they are part of the public API.

pub mod diagnostic;
pub mod schema;
pub mod report;
pub mod config;

pub use diagnostic::{
    Diagnostic, ErrorCategory, Failure, LintCode, LintWarning, RuleCode, SourcePosition,
};
pub use schema::{
    DefaultValue, NameRule, ObjectKind, PropertyDef, RefTarget, ValueType,
    DEFAULT_COMPATIBILITY_LEVEL, MIN_COMPATIBILITY_LEVEL, PARTITION_TYPES,
};
pub use report::{ValidationReport, SUCCESS_MESSAGE};
pub use config::{Config, ConfigError, LintConfig, CONFIG_FILE_NAME};
