//! Error handling for SCQL.
//!
//! This module provides a unified error type and result alias used
//! across all SCQL components.

mod engine;

pub use engine::{ErrorCode, FailureKind, ScqlError};

/// Result type alias for SCQL operations.
pub type ScqlResult<T> = std::result::Result<T, ScqlError>;
