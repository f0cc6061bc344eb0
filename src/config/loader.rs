//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (ACCESS_SURFACE__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::access_control::roles::RoleMatcher;
use crate::config::types::{AppConfig, EntityConfig, FieldConfig, RuleConfig};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "access-surface.toml",
    ".access-surface.toml",
    "~/.config/access-surface/config.toml",
    "/etc/access-surface/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with ACCESS_SURFACE__ prefix
    // e.g., ACCESS_SURFACE__ACCESS__TIMEOUT_MS, ACCESS_SURFACE__LOGGING__FORMAT
    // Double underscore (__) maps to nested keys (access.timeout_ms)
    builder = builder.add_source(
        Environment::with_prefix("ACCESS_SURFACE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
///
/// Slug grammar and formatted-name collisions are checked when the registry
/// is built; this pass covers everything that does not need compiled rules.
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.admin.user_collection.is_empty() {
        return Err(ConfigError::Missing {
            field: "admin.user_collection".to_string(),
        });
    }

    if let Some(rule) = &config.admin.access {
        validate_rule(rule, "admin.access")?;
    }

    for (index, entity) in config.collections.iter().enumerate() {
        validate_entity(entity, &format!("collections[{}]", index))?;
    }
    for (index, entity) in config.globals.iter().enumerate() {
        validate_entity(entity, &format!("globals[{}]", index))?;
    }

    Ok(())
}

fn validate_entity(entity: &EntityConfig, field_path: &str) -> Result<(), ConfigError> {
    if entity.slug.is_empty() {
        return Err(ConfigError::Missing {
            field: format!("{}.slug", field_path),
        });
    }

    let path = format!("{}.access", entity.slug);
    for rule in entity.access.rules() {
        validate_rule(rule, &path)?;
    }

    validate_fields(&entity.fields, &entity.slug)
}

fn validate_fields(fields: &[FieldConfig], field_path: &str) -> Result<(), ConfigError> {
    for field in fields {
        if field.name.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("{}.fields[].name", field_path),
            });
        }

        let path = format!("{}.{}", field_path, field.name);
        for rule in field.access.rules() {
            validate_rule(rule, &path)?;
        }

        if let Some(children) = &field.fields {
            validate_fields(children, &path)?;
        }
    }
    Ok(())
}

/// Validate that role patterns are valid regex and rule parameters are present
fn validate_rule(rule: &RuleConfig, field_path: &str) -> Result<(), ConfigError> {
    match rule {
        RuleConfig::Roles { patterns } => {
            if patterns.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("roles rule in {} has no patterns", field_path),
                });
            }
            if let Err(ConfigError::InvalidPattern { pattern, reason }) =
                RoleMatcher::new(patterns)
            {
                return Err(ConfigError::InvalidPattern {
                    pattern,
                    reason: format!("in {}: {}", field_path, reason),
                });
            }
        }
        RuleConfig::Owner { field } if field.is_empty() => {
            return Err(ConfigError::Missing {
                field: format!("{}.field", field_path),
            });
        }
        RuleConfig::DocumentFlag {
            collection,
            id,
            field,
        } if collection.is_empty() || id.is_empty() || field.is_empty() => {
            return Err(ConfigError::Invalid {
                message: format!(
                    "document_flag rule in {} needs collection, id and field",
                    field_path
                ),
            });
        }
        _ => {}
    }
    Ok(())
}
