//! Configuration types for access-surface
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access_control::types::FanOut;
use crate::entity::registry::DEFAULT_ADMIN_COLLECTION;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Access computation settings
    pub access: AccessSettings,

    /// Admin panel access
    pub admin: AdminConfig,

    /// Registered collections, in order
    pub collections: Vec<EntityConfig>,

    /// Registered globals, in order
    pub globals: Vec<EntityConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Access computation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    /// How entity and field evaluations are scheduled
    pub fan_out: FanOut,

    /// Abort the computation after this many milliseconds (0 = no limit)
    pub timeout_ms: Option<u64>,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            fan_out: FanOut::Concurrent,
            timeout_ms: Some(10_000),
        }
    }
}

/// Admin panel access configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Collection whose members may enter the admin panel
    pub user_collection: String,

    /// Additional rule the actor must satisfy
    pub access: Option<RuleConfig>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            user_collection: DEFAULT_ADMIN_COLLECTION.to_string(),
            access: None,
        }
    }
}

/// A declarative access rule
///
/// ```toml
/// read = { rule = "roles", patterns = ["^editor$"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Always permitted
    Allow,
    /// Never permitted
    Deny,
    /// Permitted for any signed-in actor
    Authenticated,
    /// Permitted when any actor role matches any pattern (regex)
    Roles { patterns: Vec<String> },
    /// Scoped to documents whose `field` equals the actor id
    Owner { field: String },
    /// Boolean `field` of one stored document
    DocumentFlag {
        collection: String,
        id: String,
        field: String,
    },
}

/// Collection or global configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub slug: String,

    /// Report `readVersions`
    pub versions: bool,

    /// Report `unlock` (collections only)
    pub auth: bool,

    pub access: EntityAccessConfig,

    pub fields: Vec<FieldConfig>,
}

/// Entity-level rules; an absent rule allows everything
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityAccessConfig {
    pub create: Option<RuleConfig>,
    pub read: Option<RuleConfig>,
    pub update: Option<RuleConfig>,
    pub delete: Option<RuleConfig>,
    pub read_versions: Option<RuleConfig>,
    pub unlock: Option<RuleConfig>,
}

/// Field configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub name: String,

    pub access: FieldAccessConfig,

    /// Nested field group (group, array and block fields)
    pub fields: Option<Vec<FieldConfig>>,
}

/// Field-level rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldAccessConfig {
    pub create: Option<RuleConfig>,
    pub read: Option<RuleConfig>,
    pub update: Option<RuleConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

impl EntityAccessConfig {
    /// All configured rules (for validation)
    pub fn rules(&self) -> impl Iterator<Item = &RuleConfig> {
        [
            &self.create,
            &self.read,
            &self.update,
            &self.delete,
            &self.read_versions,
            &self.unlock,
        ]
        .into_iter()
        .flatten()
    }
}

impl FieldAccessConfig {
    /// All configured rules (for validation)
    pub fn rules(&self) -> impl Iterator<Item = &RuleConfig> {
        [&self.create, &self.read, &self.update].into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.collections.is_empty());
        assert!(config.globals.is_empty());
        assert_eq!(config.access.fan_out, FanOut::Concurrent);
        assert_eq!(config.access.timeout_ms, Some(10_000));
        assert_eq!(config.admin.user_collection, "users");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_rules() {
        let rule: RuleConfig = serde_json::from_str(r#"{ "rule": "allow" }"#).unwrap();
        assert_eq!(rule, RuleConfig::Allow);

        let rule: RuleConfig =
            serde_json::from_str(r#"{ "rule": "roles", "patterns": ["^admin$"] }"#).unwrap();
        assert_eq!(
            rule,
            RuleConfig::Roles {
                patterns: vec!["^admin$".to_string()]
            }
        );

        let rule: RuleConfig =
            serde_json::from_str(r#"{ "rule": "owner", "field": "author" }"#).unwrap();
        assert_eq!(
            rule,
            RuleConfig::Owner {
                field: "author".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_unknown_rule_fails() {
        let result: Result<RuleConfig, _> = serde_json::from_str(r#"{ "rule": "maybe" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rules_iterator_skips_absent() {
        let access = EntityAccessConfig {
            read: Some(RuleConfig::Authenticated),
            delete: Some(RuleConfig::Deny),
            ..Default::default()
        };
        assert_eq!(access.rules().count(), 2);
    }
}
