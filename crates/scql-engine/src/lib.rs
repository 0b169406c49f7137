//! # scql-engine
//!
//! The relational core of SCQL: a compact row codec, bounded tables, views
//! over them, filter predicates and a single snapshot cursor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Database                          │
//! │        (catalog + one cursor + transaction savepoint)    │
//! └──────────────────────────────────────────────────────────┘
//!          │                                   │
//!          ▼                                   ▼
//! ┌──────────────────┐                ┌──────────────────┐
//! │     Catalog      │ ◄── dispatch ──│      Cursor      │
//! │ tables │ views   │   (ObjectId)   │ snapshot, index  │
//! └──────────────────┘                └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │ Table / View     │──►│ Predicate, Codec │
//! └──────────────────┘   └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use scql_engine::{Database, Filter, Operator};
//!
//! let mut db = Database::default();
//! db.create_table("T", ["name", "age"]).unwrap();
//! db.insert(b"T", ["ann", "30"]).unwrap();
//! db.insert(b"T", ["bob", "25"]).unwrap();
//!
//! db.declare_cursor(b"T", ["name"], vec![Filter::new("age", Operator::Less, "30")])
//!     .unwrap();
//! db.open().unwrap();
//! let row = db.fetch_next().unwrap();
//! assert_eq!(row.values().unwrap(), vec![b"bob".as_slice()]);
//! assert!(db.fetch().unwrap_err().is_end_of_table());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod codec;
pub mod cursor;
pub mod database;
mod image;
pub mod predicate;
pub mod table;
pub mod view;

pub use catalog::Catalog;
pub use cursor::{Cursor, CursorState};
pub use database::{Database, FetchedRow};
pub use predicate::{Filter, Operator};
pub use table::{Row, Table};
pub use view::View;
