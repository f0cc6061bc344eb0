//! Access control types
//!
//! Core types produced and consumed by the evaluator and the aggregator.

use crate::error::InvalidDecision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operation an access predicate decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    /// Read historical versions of a versioned entity
    ReadVersions,
    /// Unlock a locked-out account in an auth collection
    Unlock,
    /// Enter the administration panel
    Admin,
}

impl Operation {
    /// Get the operation name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::ReadVersions => "readVersions",
            Operation::Unlock => "unlock",
            Operation::Admin => "admin",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How sibling evaluations are scheduled
///
/// Both modes produce identical results; predicates read one immutable
/// snapshot and each result lands in its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    /// Poll sibling evaluations concurrently within the request task
    #[default]
    Concurrent,
    /// Run one predicate at a time, in configuration order
    Sequential,
}

/// What an access decision was computed for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessTarget {
    Collection(String),
    Global(String),
    /// The global-level admin panel operation
    Admin,
}

impl fmt::Display for AccessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessTarget::Collection(slug) => write!(f, "collection '{}'", slug),
            AccessTarget::Global(slug) => write!(f, "global '{}'", slug),
            AccessTarget::Admin => write!(f, "admin panel"),
        }
    }
}

/// Field-to-condition map of a scope expression
pub type ScopeFilter = serde_json::Map<String, serde_json::Value>;

/// Opaque query constraint returned by a predicate granting partial access
///
/// Always a JSON object, so it can never be mistaken for a flat `true` or
/// `false`. The engine never reduces it to a boolean; it is handed to the
/// caller as-is so that later queries can be filtered with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeExpression(ScopeFilter);

impl ScopeExpression {
    pub fn new(filter: ScopeFilter) -> Self {
        Self(filter)
    }

    pub fn filter(&self) -> &ScopeFilter {
        &self.0
    }
}

/// Result of one predicate invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessDecision {
    Permitted(bool),
    Scoped(ScopeExpression),
}

impl AccessDecision {
    pub const ALLOW: AccessDecision = AccessDecision::Permitted(true);
    pub const DENY: AccessDecision = AccessDecision::Permitted(false);

    /// Scope expression built from a filter object
    pub fn scoped(filter: ScopeFilter) -> Self {
        AccessDecision::Scoped(ScopeExpression::new(filter))
    }

    /// True unless the decision is a flat `false`
    ///
    /// A scope expression grants access to some documents and counts as granted.
    pub fn is_granted(&self) -> bool {
        !matches!(self, AccessDecision::Permitted(false))
    }

    pub fn scope(&self) -> Option<&ScopeExpression> {
        match self {
            AccessDecision::Scoped(scope) => Some(scope),
            AccessDecision::Permitted(_) => None,
        }
    }
}

/// Decision from predicate-produced JSON: a boolean or a filter object
impl TryFrom<serde_json::Value> for AccessDecision {
    type Error = InvalidDecision;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(permitted) => Ok(AccessDecision::Permitted(permitted)),
            Value::Object(filter) => Ok(AccessDecision::scoped(filter)),
            Value::Null => Err(InvalidDecision::new("null")),
            Value::Number(_) => Err(InvalidDecision::new("number")),
            Value::String(_) => Err(InvalidDecision::new("string")),
            Value::Array(_) => Err(InvalidDecision::new("array")),
        }
    }
}

impl From<bool> for AccessDecision {
    fn from(value: bool) -> Self {
        AccessDecision::Permitted(value)
    }
}

impl From<ScopeExpression> for AccessDecision {
    fn from(value: ScopeExpression) -> Self {
        AccessDecision::Scoped(value)
    }
}

/// Decisions for one field, mirroring the field tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAccessResult {
    pub create: AccessDecision,
    pub read: AccessDecision,
    pub update: AccessDecision,
    /// Present only for fields that declare a nested field group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldAccessResult>>,
}

impl FieldAccessResult {
    /// Every operation allowed, as for a field with no configured rules
    pub(crate) fn allow_all(fields: Option<BTreeMap<String, FieldAccessResult>>) -> Self {
        Self {
            create: AccessDecision::ALLOW,
            read: AccessDecision::ALLOW,
            update: AccessDecision::ALLOW,
            fields,
        }
    }

    pub(crate) fn set(&mut self, operation: Operation, decision: AccessDecision) {
        match operation {
            Operation::Create => self.create = decision,
            Operation::Read => self.read = decision,
            Operation::Update => self.update = decision,
            _ => {}
        }
    }

    pub fn decision(&self, operation: Operation) -> Option<&AccessDecision> {
        match operation {
            Operation::Create => Some(&self.create),
            Operation::Read => Some(&self.read),
            Operation::Update => Some(&self.update),
            _ => None,
        }
    }
}

/// Decisions for one collection or global
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAccessResult {
    pub create: AccessDecision,
    pub read: AccessDecision,
    pub update: AccessDecision,
    pub delete: AccessDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_versions: Option<AccessDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock: Option<AccessDecision>,
    pub fields: BTreeMap<String, FieldAccessResult>,
}

impl EntityAccessResult {
    /// Every operation allowed; optional operations present only when reported
    pub(crate) fn allow_all(
        read_versions: bool,
        unlock: bool,
        fields: BTreeMap<String, FieldAccessResult>,
    ) -> Self {
        Self {
            create: AccessDecision::ALLOW,
            read: AccessDecision::ALLOW,
            update: AccessDecision::ALLOW,
            delete: AccessDecision::ALLOW,
            read_versions: read_versions.then_some(AccessDecision::ALLOW),
            unlock: unlock.then_some(AccessDecision::ALLOW),
            fields,
        }
    }

    pub(crate) fn set(&mut self, operation: Operation, decision: AccessDecision) {
        match operation {
            Operation::Create => self.create = decision,
            Operation::Read => self.read = decision,
            Operation::Update => self.update = decision,
            Operation::Delete => self.delete = decision,
            Operation::ReadVersions => self.read_versions = Some(decision),
            Operation::Unlock => self.unlock = Some(decision),
            Operation::Admin => {}
        }
    }

    pub fn decision(&self, operation: Operation) -> Option<&AccessDecision> {
        match operation {
            Operation::Create => Some(&self.create),
            Operation::Read => Some(&self.read),
            Operation::Update => Some(&self.update),
            Operation::Delete => Some(&self.delete),
            Operation::ReadVersions => self.read_versions.as_ref(),
            Operation::Unlock => self.unlock.as_ref(),
            Operation::Admin => None,
        }
    }

    /// Look up a field result by dotted path (`meta.title`)
    pub fn field(&self, path: &str) -> Option<&FieldAccessResult> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.fields.as_ref()?.get(segment)?;
        }
        Some(current)
    }
}

/// The complete access surface for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedAccessResponse {
    pub can_access_admin: bool,
    pub collections: BTreeMap<String, EntityAccessResult>,
    pub globals: BTreeMap<String, EntityAccessResult>,
}
