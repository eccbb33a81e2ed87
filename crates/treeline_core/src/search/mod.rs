//! Search entry points.
//!
//! # Responsibility
//! - Expose text search over the live tree, independent of the mutation path.
//! - Keep result shaping (metadata vs. full snapshots) inside core.

pub mod text;
