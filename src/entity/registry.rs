//! Validated, immutable set of entity definitions
//!
//! A `Registry` is built once at startup and then shared behind an `Arc`.
//! Construction rejects every configuration whose slugs would not render to
//! distinct external identifiers, so formatting at the aggregation boundary
//! can never merge two entities into one key.

use crate::access_control::format::{format_name, is_valid_identifier, is_valid_slug};
use crate::access_control::predicate::SharedPredicate;
use crate::entity::definition::{EntityDefinition, EntityKind, FieldDefinition};
use crate::error::{ConfigError, GrammarError};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Default slug of the collection whose members may enter the admin panel
pub const DEFAULT_ADMIN_COLLECTION: &str = "users";

/// Settings for the global-level `canAccessAdmin` operation
#[derive(Clone)]
pub struct AdminSettings {
    /// Collection the actor must belong to
    pub user_collection: String,
    /// Optional predicate; absent means any member of `user_collection` is admitted
    pub access: Option<SharedPredicate>,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            user_collection: DEFAULT_ADMIN_COLLECTION.to_string(),
            access: None,
        }
    }
}

impl fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSettings")
            .field("user_collection", &self.user_collection)
            .field("access", &self.access.is_some())
            .finish()
    }
}

/// Validated collection and global definitions
#[derive(Debug, Clone)]
pub struct Registry {
    collections: Vec<EntityDefinition>,
    globals: Vec<EntityDefinition>,
    admin: AdminSettings,
}

impl Registry {
    /// Build a registry, validating slugs and field trees
    pub fn new(
        collections: Vec<EntityDefinition>,
        globals: Vec<EntityDefinition>,
        admin: AdminSettings,
    ) -> Result<Self, ConfigError> {
        validate_namespace(EntityKind::Collection, &collections)?;
        validate_namespace(EntityKind::Global, &globals)?;

        for entity in collections.iter().chain(globals.iter()) {
            validate_fields(&entity.slug, "", &entity.fields)?;
        }

        if !collections
            .iter()
            .any(|c| c.slug == admin.user_collection)
        {
            warn!(
                user_collection = %admin.user_collection,
                "Admin user collection is not registered; canAccessAdmin will always be false"
            );
        }

        debug!(
            collections = collections.len(),
            globals = globals.len(),
            "Registry built"
        );

        Ok(Self {
            collections,
            globals,
            admin,
        })
    }

    /// Registry with no entities (useful for testing)
    pub fn empty() -> Self {
        Self {
            collections: Vec::new(),
            globals: Vec::new(),
            admin: AdminSettings::default(),
        }
    }

    pub fn collections(&self) -> &[EntityDefinition] {
        &self.collections
    }

    pub fn globals(&self) -> &[EntityDefinition] {
        &self.globals
    }

    pub fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub fn collection(&self, slug: &str) -> Option<&EntityDefinition> {
        self.collections.iter().find(|c| c.slug == slug)
    }

    pub fn global(&self, slug: &str) -> Option<&EntityDefinition> {
        self.globals.iter().find(|g| g.slug == slug)
    }
}

fn validate_namespace(kind: EntityKind, entities: &[EntityDefinition]) -> Result<(), GrammarError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entities.len());
    let mut formatted: HashMap<String, &str> = HashMap::with_capacity(entities.len());

    for entity in entities {
        let name = format_name(&entity.slug);
        if !is_valid_slug(&entity.slug) || !is_valid_identifier(&name) {
            return Err(GrammarError::InvalidSlug {
                kind,
                slug: entity.slug.clone(),
            });
        }

        if !seen.insert(entity.slug.as_str()) {
            return Err(GrammarError::DuplicateSlug {
                kind,
                slug: entity.slug.clone(),
            });
        }

        if let Some(first) = formatted.insert(name.clone(), entity.slug.as_str()) {
            return Err(GrammarError::Collision {
                kind,
                first: first.to_string(),
                second: entity.slug.clone(),
                formatted: name,
            });
        }
    }

    Ok(())
}

fn validate_fields(slug: &str, prefix: &str, fields: &[FieldDefinition]) -> Result<(), ConfigError> {
    let mut names: HashSet<&str> = HashSet::with_capacity(fields.len());

    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };

        if field.name.is_empty() || field.name.contains('.') {
            return Err(ConfigError::Invalid {
                message: format!("entity '{}' has an invalid field name at '{}'", slug, path),
            });
        }

        if !names.insert(field.name.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("entity '{}' declares field '{}' more than once", slug, path),
            });
        }

        if let Some(children) = &field.fields {
            validate_fields(slug, &path, children)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collections(slugs: &[&str]) -> Vec<EntityDefinition> {
        slugs.iter().map(|s| EntityDefinition::collection(*s)).collect()
    }

    #[test]
    fn test_valid_registry() {
        let registry = Registry::new(
            collections(&["pages", "blog-posts"]),
            vec![EntityDefinition::global("site-settings")],
            AdminSettings::default(),
        )
        .unwrap();

        assert_eq!(registry.collections().len(), 2);
        assert!(registry.collection("blog-posts").is_some());
        assert!(registry.global("site-settings").is_some());
        assert!(registry.global("pages").is_none());
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let result = Registry::new(
            collections(&["pages", "pages"]),
            vec![],
            AdminSettings::default(),
        );
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Grammar(GrammarError::DuplicateSlug { .. })
        ));
    }

    #[test]
    fn test_formatted_collision_rejected() {
        let result = Registry::new(
            collections(&["blog-posts", "blog_posts"]),
            vec![],
            AdminSettings::default(),
        );
        match result.unwrap_err() {
            ConfigError::Grammar(GrammarError::Collision {
                first,
                second,
                formatted,
                ..
            }) => {
                assert_eq!(first, "blog-posts");
                assert_eq!(second, "blog_posts");
                assert_eq!(formatted, "BlogPosts");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_slug_in_both_namespaces_allowed() {
        let registry = Registry::new(
            collections(&["settings"]),
            vec![EntityDefinition::global("settings")],
            AdminSettings::default(),
        );
        assert!(registry.is_ok());
    }

    #[test]
    fn test_invalid_slug_rejected() {
        let result = Registry::new(collections(&["bad slug!"]), vec![], AdminSettings::default());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::Grammar(GrammarError::InvalidSlug { .. })
        ));
    }

    #[test]
    fn test_duplicate_nested_field_rejected() {
        let entity = EntityDefinition::collection("pages").with_field(FieldDefinition::group(
            "meta",
            vec![FieldDefinition::new("title"), FieldDefinition::new("title")],
        ));
        let result = Registry::new(vec![entity], vec![], AdminSettings::default());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("meta.title"));
    }

    #[test]
    fn test_same_field_name_in_different_groups_allowed() {
        let entity = EntityDefinition::collection("pages").with_fields([
            FieldDefinition::new("title"),
            FieldDefinition::group("meta", vec![FieldDefinition::new("title")]),
        ]);
        assert!(Registry::new(vec![entity], vec![], AdminSettings::default()).is_ok());
    }
}
