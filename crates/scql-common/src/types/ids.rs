//! Object identifier types for SCQL.
//!
//! Views and the cursor never hold a table or a view directly; they hold one
//! of these ids and the catalog resolves it on every use. Ids are handed out
//! by a monotonic counter and never reused, so a reference that survives its
//! object can only ever resolve to "not found".

use serde::{Deserialize, Serialize};
use std::fmt;

/// Table identifier.
///
/// # Example
///
/// ```rust
/// use scql_common::types::TableId;
///
/// let table = TableId::new(3);
/// assert_eq!(table.as_u32(), 3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u32);

impl TableId {
    /// Creates a new `TableId` from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// View identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ViewId(u32);

impl ViewId {
    /// Creates a new `ViewId` from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// A reference to one of the two kinds of queryable objects.
///
/// The set is closed: a cursor binds to exactly a table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectId {
    /// A base table.
    Table(TableId),
    /// A view over a base table.
    View(ViewId),
}

impl ObjectId {
    /// Returns true if this refers to the given table.
    #[inline]
    #[must_use]
    pub fn is_table(self, id: TableId) -> bool {
        self == Self::Table(id)
    }

    /// Returns true if this refers to the given view.
    #[inline]
    #[must_use]
    pub fn is_view(self, id: ViewId) -> bool {
        self == Self::View(id)
    }
}

impl From<TableId> for ObjectId {
    fn from(id: TableId) -> Self {
        Self::Table(id)
    }
}

impl From<ViewId> for ObjectId {
    fn from(id: ViewId) -> Self {
        Self::View(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(id) => id.fmt(f),
            Self::View(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id() {
        let id = TableId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(format!("{id}"), "table#7");
        assert_eq!(format!("{id:?}"), "TableId(7)");
    }

    #[test]
    fn test_object_id_matching() {
        let table = ObjectId::from(TableId::new(1));
        let view = ObjectId::from(ViewId::new(1));

        assert!(table.is_table(TableId::new(1)));
        assert!(!table.is_table(TableId::new(2)));
        assert!(!table.is_view(ViewId::new(1)));
        assert!(view.is_view(ViewId::new(1)));
        assert_ne!(table, view);
    }
}
