//! Core types for SCQL.
//!
//! This module contains the fundamental types shared by every SCQL crate.

mod ids;
mod name;

pub use ids::{ObjectId, TableId, ViewId};
pub use name::ObjectName;
