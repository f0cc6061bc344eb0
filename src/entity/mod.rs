//! Entity registry
//!
//! Collection and global definitions, validated once and shared read-only
//! across every request.

pub mod definition;
pub mod registry;

pub use definition::{EntityAccess, EntityDefinition, EntityKind, FieldAccess, FieldDefinition};
pub use registry::{AdminSettings, Registry};
