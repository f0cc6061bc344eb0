//! Access control module
//!
//! Computes the per-request access surface: for every collection and global,
//! whether the actor may create, read, update or delete, down to each field.
//!
//! ## Evaluation Model
//!
//! ```text
//! request → isolated transaction → aggregate → evaluate (per entity, per field) → format keys
//! ```
//!
//! - Each configured predicate is invoked once with the shared context and its
//!   return value (`true`, `false`, or a scope expression) is recorded as-is
//! - A missing predicate resolves to `true`
//! - Results are merged by internal slug first; external identifiers are
//!   rendered only once merging is complete
//! - A single failing predicate fails the whole request
//!
//! ## Example Configuration
//!
//! ```toml
//! [[collections]]
//! slug = "pages"
//!
//! [collections.access]
//! update = { rule = "roles", patterns = ["^editor$"] }
//! delete = { rule = "deny" }
//!
//! [[collections.fields]]
//! name = "title"
//! ```

pub mod aggregator;
pub mod evaluator;
pub mod format;
pub mod predicate;
pub mod roles;
pub mod rules;
pub mod types;

pub use aggregator::aggregate;
pub use evaluator::EntityEvaluator;
pub use format::format_name;
pub use predicate::{AccessPredicate, SharedPredicate, constant, predicate_async, predicate_fn};
pub use roles::RoleMatcher;
pub use rules::RulePredicate;
pub use types::{
    AccessDecision, AccessTarget, AggregatedAccessResponse, EntityAccessResult, FanOut,
    FieldAccessResult, Operation, ScopeExpression, ScopeFilter,
};
