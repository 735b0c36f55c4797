//! End-to-end validation of one project directory
//!
//! Each stage maps its own error type onto a failure category. A panic in
//! any stage becomes an `UnexpectedError` naming that stage.

use crate::validator::{ModelIdentity, Validator};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tmdlguard_core::{Config, Diagnostic, ErrorCategory, Failure, LintWarning, ValidationReport};
use tmdlguard_model::{ProjectLoader, Resolver};
use tracing::{info, instrument, warn};

/// Diagnostic plus the lint warnings collected on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub diagnostic: Diagnostic,
    pub warnings: Vec<LintWarning>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.diagnostic.is_success()
    }

    /// Build the report record for `path`, stamped with the current time
    pub fn to_report(&self, path: impl Into<String>) -> ValidationReport {
        ValidationReport::from_diagnostic(path, &self.diagnostic, self.warnings.clone())
    }
}

/// Validate the project rooted at `root`
#[instrument(skip_all, fields(root = %root.display()))]
pub fn validate_project(root: &Path, config: &Config) -> ValidationOutcome {
    let mut warnings = Vec::new();

    let diagnostic = match run(root, config, &mut warnings) {
        Ok(identity) => {
            info!(model = %identity.name, level = identity.compatibility_level, "project is valid");
            Diagnostic::success(identity.name, identity.compatibility_level)
        }
        Err(failure) => {
            warn!(category = %failure.category, message = %failure.message, "project is invalid");
            Diagnostic::failure(failure)
        }
    };

    ValidationOutcome {
        diagnostic,
        warnings,
    }
}

fn run(
    root: &Path,
    config: &Config,
    warnings: &mut Vec<LintWarning>,
) -> Result<ModelIdentity, Failure> {
    let project = guarded("load", || {
        ProjectLoader::new(config)
            .load(root)
            .map_err(|e| e.to_failure())
    })?;
    warnings.extend(project.warnings.iter().cloned());

    let resolved = guarded("resolve", || {
        Resolver::resolve(&project.model).map_err(|e| e.to_failure())
    })?;

    guarded("validate", || {
        Validator::new(config)
            .validate(&resolved)
            .map_err(|e| e.to_failure())
    })
}

fn guarded<T>(stage: &'static str, f: impl FnOnce() -> Result<T, Failure>) -> Result<T, Failure> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        Err(
            Failure::new(ErrorCategory::UnexpectedError, format!("Internal error during {stage}"))
                .with_detail(format!("stage: {stage}; panic: {reason}")),
        )
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_become_unexpected_errors() {
        let result: Result<(), Failure> = guarded("resolve", || panic!("boom"));
        let failure = result.unwrap_err();
        assert_eq!(failure.category, ErrorCategory::UnexpectedError);
        assert_eq!(failure.detail.as_deref(), Some("stage: resolve; panic: boom"));
    }

    #[test]
    fn formatted_panic_payload() {
        let result: Result<(), Failure> = guarded("load", || panic!("bad {}", 7));
        assert!(result.unwrap_err().detail.unwrap().ends_with("bad 7"));
    }
}
