//! Persistence façade over the engine.
//!
//! # Responsibility
//! - Expose entity-level operations instead of raw statements.
//! - Translate store failures into the façade error taxonomy.
//!
//! # Invariants
//! - Every operation runs inside its own session and resolves it before
//!   returning; returned entities are detached.
//! - Absence of rows is an empty result, never an error.

pub mod error;
pub mod user_repo;
