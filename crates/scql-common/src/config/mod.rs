//! Configuration for SCQL.
//!
//! This module provides the engine configuration and the capacity limits it
//! carries.

mod engine;

pub use engine::{EngineConfig, Limits};
