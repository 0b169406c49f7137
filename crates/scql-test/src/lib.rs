//! # scql-test
//!
//! Integration tests for SCQL.
//!
//! This crate contains:
//! - End-to-end tests through the [`scql_engine::Database`] API
//! - Command APDU tests through the [`scql_apdu::ScqlApplet`]
//! - Shared fixtures for both

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;
