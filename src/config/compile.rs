//! Build a `Registry` from loaded configuration

use crate::access_control::rules::RulePredicate;
use crate::access_control::predicate::SharedPredicate;
use crate::config::types::{AppConfig, EntityConfig, FieldConfig, RuleConfig};
use crate::entity::{
    AdminSettings, EntityAccess, EntityDefinition, EntityKind, FieldAccess, FieldDefinition,
    Registry,
};
use crate::error::ConfigError;

/// Compile every configured entity and rule into a validated registry
pub fn build_registry(config: &AppConfig) -> Result<Registry, ConfigError> {
    let collections = config
        .collections
        .iter()
        .map(|c| compile_entity(EntityKind::Collection, c))
        .collect::<Result<Vec<_>, _>>()?;

    let globals = config
        .globals
        .iter()
        .map(|g| compile_entity(EntityKind::Global, g))
        .collect::<Result<Vec<_>, _>>()?;

    let admin = AdminSettings {
        user_collection: config.admin.user_collection.clone(),
        access: compile_rule(config.admin.access.as_ref())?,
    };

    Registry::new(collections, globals, admin)
}

fn compile_entity(kind: EntityKind, config: &EntityConfig) -> Result<EntityDefinition, ConfigError> {
    let access = &config.access;
    let definition = match kind {
        EntityKind::Collection => EntityDefinition::collection(config.slug.clone()),
        EntityKind::Global => EntityDefinition::global(config.slug.clone()),
    };

    Ok(definition
        .with_versions(config.versions)
        .with_auth(config.auth)
        .with_access(EntityAccess {
            create: compile_rule(access.create.as_ref())?,
            read: compile_rule(access.read.as_ref())?,
            update: compile_rule(access.update.as_ref())?,
            delete: compile_rule(access.delete.as_ref())?,
            read_versions: compile_rule(access.read_versions.as_ref())?,
            unlock: compile_rule(access.unlock.as_ref())?,
        })
        .with_fields(
            config
                .fields
                .iter()
                .map(compile_field)
                .collect::<Result<Vec<_>, _>>()?,
        ))
}

fn compile_field(config: &FieldConfig) -> Result<FieldDefinition, ConfigError> {
    let fields = config
        .fields
        .as_ref()
        .map(|children| children.iter().map(compile_field).collect::<Result<Vec<_>, _>>())
        .transpose()?;

    Ok(FieldDefinition {
        name: config.name.clone(),
        access: FieldAccess {
            create: compile_rule(config.access.create.as_ref())?,
            read: compile_rule(config.access.read.as_ref())?,
            update: compile_rule(config.access.update.as_ref())?,
        },
        fields,
    })
}

fn compile_rule(rule: Option<&RuleConfig>) -> Result<Option<SharedPredicate>, ConfigError> {
    rule.map(RulePredicate::shared).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{EntityAccessConfig, FieldAccessConfig};
    use crate::error::GrammarError;

    #[test]
    fn test_build_registry_preserves_order_and_nesting() {
        let config = AppConfig {
            collections: vec![
                EntityConfig {
                    slug: "pages".to_string(),
                    fields: vec![FieldConfig {
                        name: "meta".to_string(),
                        fields: Some(vec![FieldConfig {
                            name: "title".to_string(),
                            access: FieldAccessConfig {
                                read: Some(RuleConfig::Authenticated),
                                ..Default::default()
                            },
                            fields: None,
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                EntityConfig {
                    slug: "media".to_string(),
                    access: EntityAccessConfig {
                        delete: Some(RuleConfig::Deny),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let registry = build_registry(&config).unwrap();
        let slugs: Vec<&str> = registry
            .collections()
            .iter()
            .map(|c| c.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["pages", "media"]);

        let pages = registry.collection("pages").unwrap();
        let meta = &pages.fields[0];
        assert!(meta.is_group());
        assert!(meta.fields.as_ref().unwrap()[0].access.read.is_some());

        let media = registry.collection("media").unwrap();
        assert!(media.access.delete.is_some());
        assert!(media.access.read.is_none());
    }

    #[test]
    fn test_build_registry_rejects_collision() {
        let config = AppConfig {
            globals: vec![
                EntityConfig {
                    slug: "site-settings".to_string(),
                    ..Default::default()
                },
                EntityConfig {
                    slug: "site_settings".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert!(matches!(
            build_registry(&config),
            Err(ConfigError::Grammar(GrammarError::Collision { .. }))
        ));
    }

    #[test]
    fn test_build_registry_rejects_bad_pattern() {
        let config = AppConfig {
            collections: vec![EntityConfig {
                slug: "pages".to_string(),
                access: EntityAccessConfig {
                    read: Some(RuleConfig::Roles {
                        patterns: vec!["[".to_string()],
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(matches!(
            build_registry(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
