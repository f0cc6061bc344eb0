//! Transaction isolation
//!
//! Every access computation reads storage through exactly one transaction,
//! so all collections and fields evaluated for a request observe the same
//! snapshot and nothing committed by a concurrent request in between.

pub mod context;
pub mod transaction;

pub use context::{AccessRequest, Actor, EvaluationContext};
pub use transaction::{IsolatedTransaction, Ownership};
