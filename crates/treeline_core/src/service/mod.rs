//! Caller-facing services shared by every action kind.
//!
//! # Responsibility
//! - Resolve node references against the live tree.
//! - Carry the session context supplied by the surrounding application.

pub mod resolver;
pub mod session;
