//! # scql-common
//!
//! Common types, errors, and limits for the SCQL engine.
//!
//! This crate provides the foundational pieces shared by every SCQL crate:
//!
//! - **Types**: object names and the stable object ids used as weak references
//! - **Errors**: unified error handling with `ScqlError` and its ISO7816 status words
//! - **Config**: engine configuration and the capacity limits it enforces
//! - **Constants**: the card limits and image format markers
//!
//! ## Example
//!
//! ```rust
//! use scql_common::error::{ScqlError, ScqlResult};
//! use scql_common::types::ObjectName;
//!
//! fn lookup(name: &ObjectName) -> ScqlResult<()> {
//!     Err(ScqlError::TableNotFound { name: name.clone() })
//! }
//!
//! let err = lookup(&ObjectName::from("T")).unwrap_err();
//! assert_eq!(err.status_word(), 0x6A88);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::{EngineConfig, Limits};
pub use constants::*;
pub use error::{ErrorCode, FailureKind, ScqlError, ScqlResult};
pub use types::{ObjectId, ObjectName, TableId, ViewId};
