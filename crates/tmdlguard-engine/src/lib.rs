//! Semantic validation and the end-to-end pipeline
//!
//! This crate implements:
//! - The ordered rule battery
//! - Model identity (reported name and compatibility level)
//! - `validate_project`, which turns a directory into exactly one diagnostic

pub mod pipeline;
pub mod rules;
pub mod validator;

pub use pipeline::{validate_project, ValidationOutcome};
pub use rules::{Rule, RuleContext, RuleViolation, RULES, RULESET_VERSION};
pub use validator::{ModelIdentity, Validator};
