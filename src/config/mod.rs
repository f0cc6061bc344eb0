//! Configuration module
//!
//! Handles loading and validating configuration from TOML files and environment
//! variables, and compiling it into a `Registry`.

pub mod compile;
pub mod loader;
pub mod types;

pub use compile::build_registry;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
