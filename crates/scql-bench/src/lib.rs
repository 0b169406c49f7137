//! SCQL Performance Benchmarks
//!
//! This crate contains benchmarks for the SCQL components:
//! - Filter evaluation over table rows
//! - Cursor open and scan through tables and views
//! - Command APDU dispatch through the applet
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p scql-bench
//! ```

pub mod utils;
