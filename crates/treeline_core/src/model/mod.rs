//! Document domain model.
//!
//! # Responsibility
//! - Define canonical node and format type structures used by the engine.
//! - Keep typed field coercion next to the schema shapes it serves.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeId`.
//! - Field values are stored typed and rendered through one canonical text form.

pub mod format;
pub mod node;
