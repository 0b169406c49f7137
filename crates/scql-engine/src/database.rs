//! The database context.
//!
//! [`Database`] owns everything a card session needs: the catalog, the one
//! active cursor and an optional transaction savepoint. There is no global
//! state; every operation goes through a `&mut Database`.

use bytes::Bytes;
use std::path::Path;
use tracing::{debug, warn};

use scql_common::config::EngineConfig;
use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::{ObjectId, ObjectName, TableId, ViewId};

use crate::catalog::Catalog;
use crate::codec;
use crate::cursor::Cursor;
use crate::predicate::Filter;

/// A row returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRow {
    /// Number of columns in `data`.
    pub column_count: usize,
    /// The row projected to the cursor's columns.
    pub data: Bytes,
}

impl FetchedRow {
    /// Decodes the column values.
    pub fn values(&self) -> ScqlResult<Vec<&[u8]>> {
        codec::columns(&self.data).collect()
    }

    /// Encodes the row as `column count || data`, as sent on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.data.len() + 1);
        out.push(self.column_count as u8);
        out.extend_from_slice(&self.data);
        Bytes::from(out)
    }
}

#[derive(Debug, Clone)]
struct Savepoint {
    catalog: Catalog,
    cursor: Option<Cursor>,
}

/// A relational database session.
///
/// # Example
///
/// ```rust
/// use scql_engine::Database;
///
/// let mut db = Database::default();
/// db.create_table("T", ["a", "b"]).unwrap();
/// db.insert(b"T", ["x", "y"]).unwrap();
/// db.declare_cursor(b"T", Vec::<&str>::new(), Vec::new()).unwrap();
/// db.open().unwrap();
///
/// let row = db.fetch().unwrap();
/// assert_eq!(row.column_count, 2);
/// assert_eq!(row.values().unwrap(), vec![b"x".as_slice(), b"y".as_slice()]);
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    config: EngineConfig,
    catalog: Catalog,
    cursor: Option<Cursor>,
    savepoint: Option<Savepoint>,
}

impl Database {
    /// Creates an empty database with the given configuration.
    pub fn new(config: EngineConfig) -> ScqlResult<Self> {
        config.validate()?;
        let catalog = Catalog::new(config.limits);
        Ok(Self {
            config,
            catalog,
            cursor: None,
            savepoint: None,
        })
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the catalog.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the declared cursor, if any.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Creates a table.
    pub fn create_table<N, I>(&mut self, name: N, columns: I) -> ScqlResult<TableId>
    where
        N: Into<ObjectName>,
        I: IntoIterator,
        I::Item: Into<ObjectName>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.catalog.create_table(name.into(), columns)
    }

    /// Creates a view over `table_name`.
    ///
    /// No column names selects every table column.
    pub fn create_view<N, I>(
        &mut self,
        name: N,
        table_name: &[u8],
        column_names: I,
        filters: Vec<Filter>,
    ) -> ScqlResult<ViewId>
    where
        N: Into<ObjectName>,
        I: IntoIterator,
        I::Item: Into<ObjectName>,
    {
        let column_names: Vec<ObjectName> = column_names.into_iter().map(Into::into).collect();
        self.catalog
            .create_view(name.into(), table_name, &column_names, filters)
    }

    /// Drops a table, detaching views and the cursor that reference it.
    pub fn drop_table(&mut self, name: &[u8]) -> ScqlResult<()> {
        let id = self.catalog.drop_table(name)?;
        self.detach_cursor(ObjectId::Table(id));
        Ok(())
    }

    /// Drops a view, detaching the cursor if bound to it.
    pub fn drop_view(&mut self, name: &[u8]) -> ScqlResult<()> {
        let id = self.catalog.drop_view(name)?;
        self.detach_cursor(ObjectId::View(id));
        Ok(())
    }

    fn detach_cursor(&mut self, object: ObjectId) {
        if let Some(cursor) = self.cursor.as_mut() {
            if cursor.detach_if(object) {
                debug!(object = %object, "cursor detached from dropped object");
            }
        }
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Inserts one row into a table and returns its position.
    ///
    /// There must be exactly one value per table column.
    pub fn insert<I>(&mut self, table_name: &[u8], values: I) -> ScqlResult<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let id = self.catalog.find_table(table_name)?;
        let table = self.catalog.table(id)?;

        let values: Vec<I::Item> = values.into_iter().collect();
        if values.len() != table.column_count() {
            return Err(ScqlError::WrongLength {
                expected: table.column_count(),
                actual: values.len(),
            });
        }
        let max = self.config.limits.max_data_column_length;
        for (column, value) in values.iter().enumerate() {
            let size = value.as_ref().len();
            if size > max {
                return Err(ScqlError::ValueTooLong { column, size, max });
            }
        }

        let row = codec::encode_row(&values)?;
        self.catalog.table_mut(id)?.append(row)
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    /// Declares the cursor, replacing any previous one.
    ///
    /// No column names selects every column of the object.
    pub fn declare_cursor<I>(
        &mut self,
        object_name: &[u8],
        column_names: I,
        filters: Vec<Filter>,
    ) -> ScqlResult<()>
    where
        I: IntoIterator,
        I::Item: Into<ObjectName>,
    {
        let object = self.catalog.resolve_object(object_name)?;
        let column_names: Vec<ObjectName> = column_names.into_iter().map(Into::into).collect();
        let column_indexes = self.catalog.select_columns(object, &column_names)?;
        self.catalog.validate_filters(object, &filters)?;

        debug!(
            object = %ObjectName::from_bytes(object_name),
            columns = column_indexes.len(),
            filters = filters.len(),
            "cursor declared"
        );
        self.cursor = Some(Cursor::new(object, column_indexes, filters));
        Ok(())
    }

    fn declared(&mut self) -> ScqlResult<&mut Cursor> {
        self.cursor.as_mut().ok_or(ScqlError::CursorNotDeclared)
    }

    /// Opens the cursor.
    pub fn open(&mut self) -> ScqlResult<()> {
        let cursor = self.cursor.as_mut().ok_or(ScqlError::CursorNotDeclared)?;
        cursor.open(&self.catalog)
    }

    /// Advances the cursor.
    pub fn next(&mut self) -> ScqlResult<()> {
        self.declared()?.next()
    }

    /// Returns the current row without advancing.
    pub fn fetch(&mut self) -> ScqlResult<FetchedRow> {
        let cursor = self.declared()?;
        Ok(FetchedRow {
            column_count: cursor.column_count(),
            data: cursor.fetch()?,
        })
    }

    /// Returns the current row, then advances.
    pub fn fetch_next(&mut self) -> ScqlResult<FetchedRow> {
        let cursor = self.declared()?;
        let column_count = cursor.column_count();
        let data = cursor.fetch_next()?;
        Ok(FetchedRow { column_count, data })
    }

    /// Deletes the current row, then advances.
    pub fn delete(&mut self) -> ScqlResult<()> {
        let cursor = self.cursor.as_mut().ok_or(ScqlError::CursorNotDeclared)?;
        cursor.delete(&mut self.catalog)
    }

    /// Replaces one column of the current row.
    pub fn update(&mut self, data: &[u8], column_name: &[u8]) -> ScqlResult<()> {
        let cursor = self.cursor.as_mut().ok_or(ScqlError::CursorNotDeclared)?;
        cursor.update(&mut self.catalog, data, column_name)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Returns true while a transaction is active.
    #[inline]
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.savepoint.is_some()
    }

    /// Begins a transaction.
    pub fn begin_transaction(&mut self) -> ScqlResult<()> {
        if self.savepoint.is_some() {
            warn!("begin rejected: transaction already active");
            return Err(ScqlError::TransactionState {
                message: "transaction already active".to_string(),
            });
        }
        self.savepoint = Some(Savepoint {
            catalog: self.catalog.clone(),
            cursor: self.cursor.clone(),
        });
        debug!("transaction begun");
        Ok(())
    }

    /// Commits the active transaction.
    pub fn commit_transaction(&mut self) -> ScqlResult<()> {
        if self.savepoint.take().is_none() {
            warn!("commit rejected: no active transaction");
            return Err(ScqlError::TransactionState {
                message: "no active transaction".to_string(),
            });
        }
        debug!("transaction committed");
        Ok(())
    }

    /// Aborts the active transaction, restoring the state at begin.
    pub fn abort_transaction(&mut self) -> ScqlResult<()> {
        let Some(savepoint) = self.savepoint.take() else {
            warn!("abort rejected: no active transaction");
            return Err(ScqlError::TransactionState {
                message: "no active transaction".to_string(),
            });
        };
        self.catalog = savepoint.catalog;
        self.cursor = savepoint.cursor;
        debug!("transaction aborted");
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Serializes the catalog into an image.
    pub fn to_image(&self) -> ScqlResult<Bytes> {
        self.catalog.to_image()
    }

    /// Creates a database from an image.
    pub fn from_image(image: &[u8], config: EngineConfig) -> ScqlResult<Self> {
        config.validate()?;
        let catalog = Catalog::from_image(image, config.limits)?;
        Ok(Self {
            config,
            catalog,
            cursor: None,
            savepoint: None,
        })
    }

    /// Writes the catalog image to `path`.
    ///
    /// The image goes to a sibling temporary file first and is renamed into
    /// place.
    pub fn save(&self, path: &Path) -> ScqlResult<()> {
        let image = self.to_image()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &image)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), bytes = image.len(), "image saved");
        Ok(())
    }

    /// Loads a database from the image at `path`.
    pub fn load(path: &Path, config: EngineConfig) -> ScqlResult<Self> {
        let image = std::fs::read(path)?;
        debug!(path = %path.display(), bytes = image.len(), "image loaded");
        Self::from_image(&image, config)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: Catalog::default(),
            cursor: None,
            savepoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Operator;
    use scql_common::error::FailureKind;
    use tempfile::TempDir;

    const NONE: [&str; 0] = [];

    fn people() -> Database {
        let mut db = Database::default();
        db.create_table("P", ["name", "age"]).unwrap();
        for (name, age) in [("ann", "30"), ("bob", "25"), ("cat", "30")] {
            db.insert(b"P", [name, age]).unwrap();
        }
        db
    }

    fn drain(db: &mut Database) -> Vec<Vec<Vec<u8>>> {
        let mut rows = Vec::new();
        loop {
            match db.fetch_next() {
                Ok(row) => rows.push(
                    row.values()
                        .unwrap()
                        .into_iter()
                        .map(<[u8]>::to_vec)
                        .collect(),
                ),
                Err(e) if e.is_end_of_table() => return rows,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }

    #[test]
    fn test_insert_width_and_length() {
        let mut db = people();
        let err = db.insert(b"P", ["only"]).unwrap_err();
        assert_eq!(err.status_word(), 0x6700);

        let err = db.insert(b"P", ["0123456789abcdef", "1"]).unwrap_err();
        assert_eq!(err.status_word(), 0x6700);

        let err = db.insert(b"Q", ["a", "b"]).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_cursor_before_declare() {
        let mut db = people();
        assert!(matches!(db.open(), Err(ScqlError::CursorNotDeclared)));
        assert!(matches!(db.fetch(), Err(ScqlError::CursorNotDeclared)));
        assert_eq!(db.next().unwrap_err().kind(), FailureKind::NotReady);
    }

    #[test]
    fn test_declare_validation() {
        let mut db = people();
        let err = db.declare_cursor(b"nope", NONE, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);

        let err = db.declare_cursor(b"P", ["zz"], Vec::new()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);

        let err = db
            .declare_cursor(b"P", NONE, vec![Filter::new("zz", Operator::Equal, "1")])
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_select_with_filter_and_projection() {
        let mut db = people();
        let filters = vec![Filter::new("age", Operator::Equal, "30")];
        db.declare_cursor(b"P", ["name"], filters).unwrap();
        db.open().unwrap();
        assert_eq!(
            drain(&mut db),
            vec![vec![b"ann".to_vec()], vec![b"cat".to_vec()]]
        );
    }

    #[test]
    fn test_cursor_over_view() {
        let mut db = people();
        let filters = vec![Filter::new("age", Operator::Less, "30")];
        db.create_view("V", b"P", ["age", "name"], filters).unwrap();
        db.declare_cursor(b"V", ["name"], Vec::new()).unwrap();
        db.open().unwrap();
        assert_eq!(drain(&mut db), vec![vec![b"bob".to_vec()]]);

        db.open().unwrap();
        assert_eq!(db.delete().unwrap_err().kind(), FailureKind::Disallowed);

        db.update(b"26", b"age").unwrap();
        let filters = vec![Filter::new("name", Operator::Equal, "bob")];
        db.declare_cursor(b"P", ["age"], filters).unwrap();
        db.open().unwrap();
        assert_eq!(db.fetch().unwrap().values().unwrap(), vec![b"26".as_slice()]);
    }

    #[test]
    fn test_drop_detaches_cursor() {
        let mut db = people();
        db.declare_cursor(b"P", NONE, Vec::new()).unwrap();
        db.open().unwrap();
        db.drop_table(b"P").unwrap();

        assert_eq!(db.cursor().unwrap().object(), None);
        assert_eq!(db.open().unwrap_err().kind(), FailureKind::NotFound);
        assert_eq!(db.fetch().unwrap_err().kind(), FailureKind::NotReady);

        let err = db.update(b"26", b"age").unwrap_err();
        assert!(matches!(err, ScqlError::CursorDetached));
        assert_eq!(err.status_word(), 0x6A88);
    }

    #[test]
    fn test_drop_view_detaches_cursor_for_update() {
        let mut db = people();
        db.create_view("V", b"P", NONE, Vec::new()).unwrap();
        db.declare_cursor(b"V", NONE, Vec::new()).unwrap();
        db.open().unwrap();
        db.drop_view(b"V").unwrap();

        let err = db.update(b"26", b"age").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_view_cursor_filters_on_table_columns() {
        let mut db = people();
        db.create_view("V", b"P", ["name"], Vec::new()).unwrap();

        let filters = vec![Filter::new("age", Operator::Equal, "25")];
        db.declare_cursor(b"V", NONE, filters).unwrap();
        db.open().unwrap();
        assert_eq!(drain(&mut db), vec![vec![b"bob".to_vec()]]);

        let filters = vec![Filter::new("zip", Operator::Equal, "1")];
        let err = db.declare_cursor(b"V", NONE, filters).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_update_through_view_with_repeated_column() {
        let mut db = people();
        db.create_view("V", b"P", ["name", "name"], Vec::new()).unwrap();
        db.declare_cursor(b"V", NONE, Vec::new()).unwrap();
        db.open().unwrap();

        db.update(b"amy", b"name").unwrap();
        let fetched = db.fetch().unwrap();
        assert_eq!(fetched.values().unwrap(), vec![b"amy".as_slice(), b"amy".as_slice()]);

        db.open().unwrap();
        assert_eq!(db.fetch().unwrap().values().unwrap(), fetched.values().unwrap());
    }

    #[test]
    fn test_delete_all_through_cursor() {
        let mut db = people();
        db.declare_cursor(b"P", NONE, Vec::new()).unwrap();
        db.open().unwrap();
        for _ in 0..3 {
            db.delete().unwrap();
        }
        assert!(db.delete().unwrap_err().is_end_of_table());
        let table = db.catalog().find_table(b"P").unwrap();
        assert_eq!(db.catalog().table(table).unwrap().row_count(), 0);
    }

    #[test]
    fn test_transaction_abort_restores() {
        let mut db = people();
        db.begin_transaction().unwrap();
        db.insert(b"P", ["dan", "41"]).unwrap();
        db.drop_table(b"P").unwrap();
        db.abort_transaction().unwrap();

        db.declare_cursor(b"P", NONE, Vec::new()).unwrap();
        db.open().unwrap();
        assert_eq!(drain(&mut db).len(), 3);
    }

    #[test]
    fn test_transaction_commit_keeps() {
        let mut db = people();
        db.begin_transaction().unwrap();
        db.insert(b"P", ["dan", "41"]).unwrap();
        db.commit_transaction().unwrap();
        assert!(!db.in_transaction());

        db.declare_cursor(b"P", NONE, Vec::new()).unwrap();
        db.open().unwrap();
        assert_eq!(drain(&mut db).len(), 4);
    }

    #[test]
    fn test_transaction_state_errors() {
        let mut db = Database::default();
        assert_eq!(db.commit_transaction().unwrap_err().status_word(), 0x6985);
        assert_eq!(db.abort_transaction().unwrap_err().status_word(), 0x6985);
        db.begin_transaction().unwrap();
        assert_eq!(db.begin_transaction().unwrap_err().kind(), FailureKind::NotReady);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("card.img");

        let db = people();
        db.save(&path).unwrap();

        let mut loaded = Database::load(&path, EngineConfig::default()).unwrap();
        loaded.declare_cursor(b"P", ["name"], Vec::new()).unwrap();
        loaded.open().unwrap();
        assert_eq!(drain(&mut loaded).len(), 3);
    }

    #[test]
    fn test_fetched_row_wire_form() {
        let row = FetchedRow {
            column_count: 2,
            data: codec::encode_row(["x", "y"]).unwrap(),
        };
        assert_eq!(&row.to_bytes()[..], &[2, 1, b'x', 1, b'y']);
    }
}
