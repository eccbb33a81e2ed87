//! Action layer: request parsing, validation, execution and batching.
//!
//! # Responsibility
//! - Turn agent action requests into tree and registry operations.
//! - Report one typed result per action, never a batch-level fault.
//!
//! # See also
//! - `service::resolver` for reference resolution.

pub mod batch;
pub mod executor;
pub mod params;
pub mod request;
pub mod result;
