//! In-memory stores owned by the engine.
//!
//! # Responsibility
//! - Own the canonical tree document and the format type registry.
//! - Expose structural primitives that validate before committing.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NodeNotFound`, `DuplicateFormatType`)
//!   and never panic on caller input.
//! - A failed mutation leaves the store unchanged.

pub mod format_registry;
pub mod tree_repo;
