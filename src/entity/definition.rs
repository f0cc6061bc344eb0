//! Collection, global and field definitions

use crate::access_control::predicate::SharedPredicate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Multi-document collection
    Collection,
    /// Single-document global
    Global,
}

impl EntityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Collection => "collection",
            EntityKind::Global => "global",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity-level access predicates
///
/// An absent predicate means "allow all".
#[derive(Clone, Default)]
pub struct EntityAccess {
    pub create: Option<SharedPredicate>,
    pub read: Option<SharedPredicate>,
    pub update: Option<SharedPredicate>,
    pub delete: Option<SharedPredicate>,
    pub read_versions: Option<SharedPredicate>,
    pub unlock: Option<SharedPredicate>,
}

impl fmt::Debug for EntityAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityAccess")
            .field("create", &self.create.is_some())
            .field("read", &self.read.is_some())
            .field("update", &self.update.is_some())
            .field("delete", &self.delete.is_some())
            .field("read_versions", &self.read_versions.is_some())
            .field("unlock", &self.unlock.is_some())
            .finish()
    }
}

/// Field-level access predicates
#[derive(Clone, Default)]
pub struct FieldAccess {
    pub create: Option<SharedPredicate>,
    pub read: Option<SharedPredicate>,
    pub update: Option<SharedPredicate>,
}

impl fmt::Debug for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccess")
            .field("create", &self.create.is_some())
            .field("read", &self.read.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

/// One field of an entity
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub access: FieldAccess,
    /// `None` for a leaf field, `Some` for a group/array/block field
    pub fields: Option<Vec<FieldDefinition>>,
}

impl FieldDefinition {
    /// Leaf field with default (allow-all) access
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: FieldAccess::default(),
            fields: None,
        }
    }

    /// Field holding a nested field group
    pub fn group(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            access: FieldAccess::default(),
            fields: Some(fields),
        }
    }

    pub fn with_create(mut self, predicate: SharedPredicate) -> Self {
        self.access.create = Some(predicate);
        self
    }

    pub fn with_read(mut self, predicate: SharedPredicate) -> Self {
        self.access.read = Some(predicate);
        self
    }

    pub fn with_update(mut self, predicate: SharedPredicate) -> Self {
        self.access.update = Some(predicate);
        self
    }

    pub fn is_group(&self) -> bool {
        self.fields.is_some()
    }
}

/// A collection or global definition
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub kind: EntityKind,
    pub slug: String,
    pub fields: Vec<FieldDefinition>,
    pub access: EntityAccess,
    /// Versioned entities also report `readVersions`
    pub versions: bool,
    /// Auth-enabled collections also report `unlock`
    pub auth: bool,
}

impl EntityDefinition {
    pub fn collection(slug: impl Into<String>) -> Self {
        Self::new(EntityKind::Collection, slug)
    }

    pub fn global(slug: impl Into<String>) -> Self {
        Self::new(EntityKind::Global, slug)
    }

    fn new(kind: EntityKind, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
            fields: Vec::new(),
            access: EntityAccess::default(),
            versions: false,
            auth: false,
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_access(mut self, access: EntityAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_versions(mut self, enabled: bool) -> Self {
        self.versions = enabled;
        self
    }

    /// Only meaningful for collections; globals never report `unlock`
    pub fn with_auth(mut self, enabled: bool) -> Self {
        self.auth = enabled;
        self
    }

    pub fn reports_unlock(&self) -> bool {
        self.auth && self.kind == EntityKind::Collection
    }
}
