//! Access Surface
//!
//! Computes, for one inbound request, the complete map of what the requesting
//! actor may do across every registered collection and global, down to each
//! field.
//!
//! ## Features
//!
//! - **Transaction isolation** - every predicate of a request reads through one
//!   transaction, reused from the request or opened and released per call
//! - **Entity evaluation** - entity operations and nested field trees, each
//!   predicate invoked once, scope expressions passed through untouched
//! - **Aggregation** - collections, globals and admin access fanned out and
//!   merged, with collision-checked external identifiers
//! - **Declarative rules** via TOML files and environment variables
//!
//! ## Response Shape
//!
//! ```text
//! { canAccessAdmin, collections: { <FormattedSlug>: { create, read, update, delete, fields } }, globals: { ... } }
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [access]
//! fan_out = "concurrent"
//! timeout_ms = 5000
//!
//! [admin]
//! user_collection = "users"
//! access = { rule = "roles", patterns = ["^(admin|editor)$"] }
//!
//! [[collections]]
//! slug = "pages"
//! versions = true
//!
//! [collections.access]
//! read = { rule = "allow" }
//! update = { rule = "owner", field = "author" }
//!
//! [[collections.fields]]
//! name = "title"
//! ```

pub mod access_control;
pub mod config;
pub mod entity;
pub mod error;
pub mod isolation;
pub mod service;
pub mod storage;

// Re-export main types
pub use access_control::{AccessDecision, AggregatedAccessResponse, FanOut, aggregate};
pub use config::{AppConfig, build_registry, load_config};
pub use entity::Registry;
pub use error::{AccessError, AppError, Result};
pub use isolation::{AccessRequest, Actor, EvaluationContext};
pub use service::AccessService;
pub use storage::{MemoryStore, StorageEngine, TransactionId};
