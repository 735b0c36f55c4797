//! Validation report record (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Field names are camelCase and absent optional fields are omitted.

use crate::diagnostic::{Diagnostic, ErrorCategory, LintWarning, RuleCode};
use serde::{Deserialize, Serialize};

/// Message carried by a successful report
pub const SUCCESS_MESSAGE: &str = "TMDL project is valid and can be opened in Power BI Desktop.";

/// Result record of one validation run (report.json v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Whether the project passed every check
    pub is_valid: bool,

    /// Project root as given by the caller
    pub path: String,

    /// Timestamp (RFC 3339, UTC)
    pub timestamp: String,

    /// Human-readable outcome
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_level: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LintWarning>,
}

impl ValidationReport {
    /// Build a report from the outcome of a run
    pub fn from_diagnostic(
        path: impl Into<String>,
        diagnostic: &Diagnostic,
        warnings: Vec<LintWarning>,
    ) -> Self {
        let mut report = Self {
            is_valid: diagnostic.is_success(),
            path: path.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            message: String::new(),
            error_type: None,
            document: None,
            line_number: None,
            line_text: None,
            database_name: None,
            compatibility_level: None,
            rule: None,
            detail: None,
            warnings,
        };

        match diagnostic {
            Diagnostic::Success {
                model_name,
                compatibility_level,
            } => {
                report.message = SUCCESS_MESSAGE.to_string();
                report.database_name = Some(model_name.clone());
                report.compatibility_level = Some(*compatibility_level);
            }
            Diagnostic::Failure(failure) => {
                report.message = failure.message.clone();
                report.error_type = Some(failure.category);
                report.rule = failure.rule;
                report.detail = failure.detail.clone();

                if let Some(position) = &failure.position {
                    report.document = Some(position.document.clone());
                    report.line_number = Some(position.line);
                    report.line_text = Some(position.line_text.clone());
                }
            }
        }

        report
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
