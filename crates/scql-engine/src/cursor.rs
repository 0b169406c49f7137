//! The cursor protocol.
//!
//! A cursor is declared against one table or view with a projection and a
//! filter list. Opening it materializes a snapshot of the matching rows;
//! `next`, `fetch`, `delete` and `update` then operate on that snapshot.
//!
//! ```text
//!   declare ──► Unopened ──open──► Open { position: 0 }
//!                                     │ next / fetch_next / delete
//!                                     ▼
//!                               Open { position: i }
//!                                     │ ...
//!                                     ▼
//!                               Open { position: len }   (exhausted)
//! ```
//!
//! The snapshot is fixed at open time. Rows inserted afterwards are not
//! seen; rows deleted through the cursor stay in the snapshot but later
//! storage positions are renumbered so subsequent deletes hit the right
//! rows.

use bytes::Bytes;
use tracing::{debug, trace};

use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::ObjectId;

use crate::catalog::Catalog;
use crate::codec;
use crate::predicate::Filter;
use crate::table::Row;

/// State of a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// Declared, not yet opened.
    Unopened,
    /// Opened on a snapshot.
    Open {
        /// Rows matched at open time, in the bound object's column space.
        snapshot: Vec<Row>,
        /// Current index into the snapshot; equal to its length when
        /// exhausted.
        position: usize,
    },
}

/// A declared cursor.
#[derive(Debug, Clone)]
pub struct Cursor {
    object: Option<ObjectId>,
    column_indexes: Vec<usize>,
    filters: Vec<Filter>,
    state: CursorState,
}

impl Cursor {
    /// Declares a cursor on `object`.
    ///
    /// `column_indexes` index the bound object's own columns.
    #[must_use]
    pub fn new(object: ObjectId, column_indexes: Vec<usize>, filters: Vec<Filter>) -> Self {
        Self {
            object: Some(object),
            column_indexes,
            filters,
            state: CursorState::Unopened,
        }
    }

    /// Returns the bound object, if still attached.
    #[inline]
    #[must_use]
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// Returns the projection.
    #[inline]
    #[must_use]
    pub fn column_indexes(&self) -> &[usize] {
        &self.column_indexes
    }

    /// Returns the number of columns a fetch yields.
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_indexes.len()
    }

    /// Returns the declared filters.
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Returns the snapshot index, if open.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match &self.state {
            CursorState::Open { position, .. } => Some(*position),
            CursorState::Unopened => None,
        }
    }

    /// Returns true if the cursor is open and past its last row.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        match &self.state {
            CursorState::Open { snapshot, position } => *position >= snapshot.len(),
            CursorState::Unopened => false,
        }
    }

    fn bound_object(&self) -> ScqlResult<ObjectId> {
        self.object.ok_or(ScqlError::CursorDetached)
    }

    /// Opens the cursor, taking a snapshot of the matching rows.
    ///
    /// Fails with [`ScqlError::EndOfTable`] when nothing matches; the cursor
    /// is then open on an empty snapshot.
    pub fn open(&mut self, catalog: &Catalog) -> ScqlResult<()> {
        let object = self.bound_object()?;
        let snapshot = catalog.filter(object, &self.filters)?;
        let empty = snapshot.is_empty();

        debug!(object = %object, rows = snapshot.len(), "cursor opened");
        self.state = CursorState::Open {
            snapshot,
            position: 0,
        };

        if empty {
            return Err(ScqlError::EndOfTable);
        }
        Ok(())
    }

    /// Advances to the next row.
    ///
    /// Stepping onto the end of the snapshot succeeds; stepping past it
    /// fails with [`ScqlError::EndOfTable`].
    pub fn next(&mut self) -> ScqlResult<()> {
        match &mut self.state {
            CursorState::Unopened => Err(ScqlError::CursorNotOpen),
            CursorState::Open { snapshot, position } => {
                if *position >= snapshot.len() {
                    return Err(ScqlError::EndOfTable);
                }
                *position += 1;
                trace!(position = *position, "cursor advanced");
                Ok(())
            }
        }
    }

    fn current(&self) -> ScqlResult<&Row> {
        match &self.state {
            CursorState::Unopened => Err(ScqlError::CursorNotOpen),
            CursorState::Open { snapshot, position } => {
                snapshot.get(*position).ok_or(ScqlError::EndOfTable)
            }
        }
    }

    /// Returns the current row projected to the cursor's columns.
    pub fn fetch(&self) -> ScqlResult<Bytes> {
        let row = self.current()?;
        codec::project(&row.data, &self.column_indexes)
    }

    /// Fetches the current row, then advances.
    pub fn fetch_next(&mut self) -> ScqlResult<Bytes> {
        let data = self.fetch()?;
        self.next()?;
        Ok(data)
    }

    /// Deletes the current row from the bound object, then advances.
    pub fn delete(&mut self, catalog: &mut Catalog) -> ScqlResult<()> {
        let target = self.current()?.position;
        let object = self.bound_object()?;
        catalog.delete(object, target)?;

        if let CursorState::Open { snapshot, .. } = &mut self.state {
            for row in snapshot.iter_mut() {
                if row.position > target {
                    row.position -= 1;
                }
            }
        }

        debug!(object = %object, position = target, "row deleted through cursor");
        self.next()
    }

    /// Replaces one column of the current row in the bound object.
    ///
    /// The snapshot row is re-read from storage, so a following fetch sees
    /// the new value in every column that shows it.
    pub fn update(
        &mut self,
        catalog: &mut Catalog,
        data: &[u8],
        column_name: &[u8],
    ) -> ScqlResult<()> {
        if data.is_empty() {
            return Err(ScqlError::EmptyValue { what: "update value" });
        }
        if column_name.is_empty() {
            return Err(ScqlError::EmptyValue { what: "column name" });
        }
        let object = self.bound_object()?;
        if self.state == CursorState::Unopened {
            return Err(ScqlError::CursorNotOpen);
        }

        let column_index = catalog.resolve_column_index(object, column_name)?;
        let target = self.current()?.position;
        catalog.update(object, target, column_index, data)?;

        let refreshed = catalog.row(object, target)?;
        if let CursorState::Open { snapshot, position } = &mut self.state {
            snapshot[*position].data = refreshed;
        }

        debug!(
            object = %object,
            position = target,
            column = column_index,
            "row updated through cursor"
        );
        Ok(())
    }

    /// Detaches the cursor and discards its snapshot.
    pub fn remove_reference(&mut self) {
        self.object = None;
        self.state = CursorState::Unopened;
    }

    /// Detaches the cursor if it is bound to `object`. Returns true if it
    /// was.
    pub fn detach_if(&mut self, object: ObjectId) -> bool {
        if self.object == Some(object) {
            self.remove_reference();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Operator;
    use scql_common::config::Limits;
    use scql_common::types::ObjectName;

    fn catalog_with_rows(values: &[&str]) -> (Catalog, ObjectId) {
        let mut catalog = Catalog::new(Limits::default());
        let id = catalog
            .create_table(
                ObjectName::from("T"),
                vec![ObjectName::from("a"), ObjectName::from("b")],
            )
            .unwrap();
        for (i, v) in values.iter().enumerate() {
            let index = i.to_string();
            let row = codec::encode_row([*v, index.as_str()]).unwrap();
            catalog.table_mut(id).unwrap().append(row).unwrap();
        }
        (catalog, ObjectId::Table(id))
    }

    #[test]
    fn test_fetch_before_open() {
        let (_, object) = catalog_with_rows(&["x"]);
        let cursor = Cursor::new(object, vec![0, 1], vec![]);
        assert!(matches!(cursor.fetch(), Err(ScqlError::CursorNotOpen)));
    }

    #[test]
    fn test_next_before_open() {
        let (_, object) = catalog_with_rows(&["x"]);
        let mut cursor = Cursor::new(object, vec![0], vec![]);
        assert!(matches!(cursor.next(), Err(ScqlError::CursorNotOpen)));
    }

    #[test]
    fn test_open_empty_result() {
        let (catalog, object) = catalog_with_rows(&["x"]);
        let filters = vec![Filter::new("a", Operator::Equal, "nope")];
        let mut cursor = Cursor::new(object, vec![0], filters);
        assert!(matches!(cursor.open(&catalog), Err(ScqlError::EndOfTable)));
        assert!(matches!(cursor.fetch(), Err(ScqlError::EndOfTable)));
    }

    #[test]
    fn test_iterate_to_end() {
        let (catalog, object) = catalog_with_rows(&["x", "y"]);
        let mut cursor = Cursor::new(object, vec![0], vec![]);
        cursor.open(&catalog).unwrap();

        assert_eq!(cursor.fetch_next().unwrap(), codec::encode_row(["x"]).unwrap());
        assert_eq!(cursor.fetch_next().unwrap(), codec::encode_row(["y"]).unwrap());
        assert!(cursor.is_exhausted());
        assert!(matches!(cursor.fetch(), Err(ScqlError::EndOfTable)));
        assert!(matches!(cursor.next(), Err(ScqlError::EndOfTable)));
        assert!(matches!(cursor.next(), Err(ScqlError::EndOfTable)));
    }

    #[test]
    fn test_fetch_does_not_advance() {
        let (catalog, object) = catalog_with_rows(&["x", "y"]);
        let mut cursor = Cursor::new(object, vec![1, 0], vec![]);
        cursor.open(&catalog).unwrap();
        assert_eq!(cursor.fetch().unwrap(), cursor.fetch().unwrap());
        assert_eq!(cursor.fetch().unwrap(), codec::encode_row(["0", "x"]).unwrap());
        assert_eq!(cursor.position(), Some(0));
    }

    #[test]
    fn test_repeated_delete_hits_right_rows() {
        let (mut catalog, object) = catalog_with_rows(&["p", "q", "r", "s"]);
        let mut cursor = Cursor::new(object, vec![0], vec![]);
        cursor.open(&catalog).unwrap();

        cursor.next().unwrap();
        cursor.delete(&mut catalog).unwrap();
        cursor.delete(&mut catalog).unwrap();

        let remaining: Vec<Bytes> = catalog
            .filter(object, &[])
            .unwrap()
            .into_iter()
            .map(|row| codec::project(&row.data, &[0]).unwrap())
            .collect();
        assert_eq!(
            remaining,
            vec![codec::encode_row(["p"]).unwrap(), codec::encode_row(["s"]).unwrap()]
        );
        assert_eq!(cursor.fetch().unwrap(), codec::encode_row(["s"]).unwrap());
    }

    #[test]
    fn test_delete_last_row_exhausts() {
        let (mut catalog, object) = catalog_with_rows(&["only"]);
        let mut cursor = Cursor::new(object, vec![0], vec![]);
        cursor.open(&catalog).unwrap();

        cursor.delete(&mut catalog).unwrap();
        assert!(cursor.is_exhausted());
        assert!(matches!(cursor.delete(&mut catalog), Err(ScqlError::EndOfTable)));
    }

    #[test]
    fn test_update_current_row() {
        let (mut catalog, object) = catalog_with_rows(&["x", "y"]);
        let mut cursor = Cursor::new(object, vec![0, 1], vec![]);

        assert!(matches!(
            cursor.update(&mut catalog, b"v", b"a"),
            Err(ScqlError::CursorNotOpen)
        ));

        cursor.open(&catalog).unwrap();
        cursor.next().unwrap();
        cursor.update(&mut catalog, b"new", b"a").unwrap();

        assert_eq!(cursor.fetch().unwrap(), codec::encode_row(["new", "1"]).unwrap());
        let rows = catalog.filter(object, &[]).unwrap();
        assert_eq!(rows[1].data, codec::encode_row(["new", "1"]).unwrap());
        assert_eq!(rows[0].data, codec::encode_row(["x", "0"]).unwrap());

        assert!(matches!(
            cursor.update(&mut catalog, b"v", b"zz"),
            Err(ScqlError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            cursor.update(&mut catalog, b"", b"a"),
            Err(ScqlError::EmptyValue { .. })
        ));
    }

    #[test]
    fn test_remove_reference() {
        let (catalog, object) = catalog_with_rows(&["x"]);
        let mut cursor = Cursor::new(object, vec![0], vec![]);
        cursor.open(&catalog).unwrap();

        assert!(!cursor.detach_if(ObjectId::Table(scql_common::types::TableId::new(99))));
        assert!(cursor.detach_if(object));
        assert_eq!(cursor.object(), None);
        assert_eq!(cursor.state(), &CursorState::Unopened);
        assert!(matches!(cursor.open(&catalog), Err(ScqlError::CursorDetached)));
    }
}
