//! Runs the rule table over a resolved model

use crate::rules::{RuleContext, RuleViolation, RULES, RULESET_VERSION};
use tmdlguard_core::Config;
use tmdlguard_model::ResolvedModel;
use tracing::debug;

/// Name and level reported for a valid project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdentity {
    pub name: String,
    pub compatibility_level: u32,
}

pub struct Validator<'c> {
    config: &'c Config,
}

impl<'c> Validator<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Check every rule in order, stopping at the first violation
    pub fn validate(&self, resolved: &ResolvedModel<'_>) -> Result<ModelIdentity, RuleViolation> {
        let ctx = RuleContext::new(resolved, self.config);
        debug!(
            ruleset = RULESET_VERSION,
            level = ctx.level,
            objects = ctx.nodes.len(),
            "running rules"
        );

        for rule in RULES {
            rule.check(&ctx)?;
            debug!(rule = %rule.code(), "rule passed");
        }

        Ok(identity(&ctx))
    }
}

/// Database name when declared, otherwise the model name
fn identity(ctx: &RuleContext<'_, '_>) -> ModelIdentity {
    let model = ctx.resolved.model;
    let name = model
        .database
        .as_ref()
        .and_then(|db| db.name.clone())
        .or_else(|| model.model.as_ref().and_then(|m| m.name.clone()))
        .unwrap_or_default();

    ModelIdentity {
        name,
        compatibility_level: ctx.level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmdlguard_model::{MergedModel, Resolver};
    use tmdlguard_syntax::parse_document;

    fn validate(files: &[(&str, &str)], config: &Config) -> Result<ModelIdentity, RuleViolation> {
        let docs = files
            .iter()
            .map(|(name, text)| parse_document(text, name).unwrap())
            .collect();
        let model = MergedModel::from_documents(docs).unwrap();
        let resolved = Resolver::resolve(&model).unwrap();
        Validator::new(config).validate(&resolved)
    }

    #[test]
    fn database_name_and_level_win() {
        let identity = validate(
            &[
                ("database.tmdl", "database Sales\n\tcompatibilityLevel: 1600\n"),
                ("model.tmdl", "model Model\n"),
            ],
            &Config::default(),
        )
        .unwrap();
        assert_eq!(identity.name, "Sales");
        assert_eq!(identity.compatibility_level, 1600);
    }

    #[test]
    fn falls_back_to_model_and_default_level() {
        let config = Config {
            default_compatibility_level: 1550,
            ..Config::default()
        };
        let identity = validate(&[("model.tmdl", "model Model\n")], &config).unwrap();
        assert_eq!(identity.name, "Model");
        assert_eq!(identity.compatibility_level, 1550);
    }

    #[test]
    fn configured_maximum_level() {
        let config = Config {
            max_compatibility_level: Some(1567),
            ..Config::default()
        };
        let err = validate(
            &[
                ("database.tmdl", "database Sales\n\tcompatibilityLevel: 1601\n"),
                ("model.tmdl", "model Model\n"),
            ],
            &config,
        )
        .unwrap_err();
        assert!(err.message.contains("maximum of 1567"));
    }
}
