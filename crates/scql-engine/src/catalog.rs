//! The catalog of tables and views.
//!
//! Tables and views live in two bounded, dense registries. Names are unique
//! across both registries. Every object gets an id from one monotonic
//! counter; ids are never reused, so a view or cursor that kept an id past
//! a drop resolves to "not found" instead of to a newer object.
//!
//! The catalog is also the dispatch point for the operations a cursor can
//! route to a table or a view ([`ObjectId`] is the closed set of the two).

use bytes::Bytes;
use tracing::debug;

use scql_common::config::Limits;
use scql_common::constants::MAX_LP_LENGTH;
use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::{ObjectId, ObjectName, TableId, ViewId};

use crate::codec;
use crate::predicate::Filter;
use crate::table::{Row, Table};
use crate::view::View;

/// Bounded registries of tables and views.
#[derive(Debug, Clone)]
pub struct Catalog {
    limits: Limits,
    tables: Vec<(TableId, Table)>,
    views: Vec<(ViewId, View)>,
    next_id: u32,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            tables: Vec::new(),
            views: Vec::new(),
            next_id: 1,
        }
    }

    /// Returns the limits in force.
    #[inline]
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Iterates over the tables in creation order.
    pub fn tables(&self) -> impl Iterator<Item = (TableId, &Table)> {
        self.tables.iter().map(|(id, table)| (*id, table))
    }

    /// Iterates over the views in creation order.
    pub fn views(&self) -> impl Iterator<Item = (ViewId, &View)> {
        self.views.iter().map(|(id, view)| (*id, view))
    }

    /// Returns the number of tables.
    #[inline]
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns the number of views.
    #[inline]
    #[must_use]
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Returns true if a table or a view has this name.
    #[must_use]
    pub fn contains_name(&self, name: &[u8]) -> bool {
        self.tables.iter().any(|(_, t)| t.name().as_bytes() == name)
            || self.views.iter().any(|(_, v)| v.name().as_bytes() == name)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Finds a table by name.
    pub fn find_table(&self, name: &[u8]) -> ScqlResult<TableId> {
        self.tables
            .iter()
            .find(|(_, table)| table.name().as_bytes() == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| ScqlError::TableNotFound {
                name: ObjectName::from_bytes(name),
            })
    }

    /// Finds a view by name.
    pub fn find_view(&self, name: &[u8]) -> ScqlResult<ViewId> {
        self.views
            .iter()
            .find(|(_, view)| view.name().as_bytes() == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| ScqlError::ViewNotFound {
                name: ObjectName::from_bytes(name),
            })
    }

    /// Finds a table or a view by name, tables first.
    pub fn resolve_object(&self, name: &[u8]) -> ScqlResult<ObjectId> {
        if let Ok(id) = self.find_table(name) {
            return Ok(ObjectId::Table(id));
        }
        if let Ok(id) = self.find_view(name) {
            return Ok(ObjectId::View(id));
        }
        Err(ScqlError::ObjectNotFound {
            name: ObjectName::from_bytes(name),
        })
    }

    /// Returns the table with this id.
    pub fn table(&self, id: TableId) -> ScqlResult<&Table> {
        self.tables
            .iter()
            .find(|(tid, _)| *tid == id)
            .map(|(_, table)| table)
            .ok_or_else(|| missing(ObjectId::Table(id)))
    }

    /// Returns the table with this id, mutably.
    pub fn table_mut(&mut self, id: TableId) -> ScqlResult<&mut Table> {
        self.tables
            .iter_mut()
            .find(|(tid, _)| *tid == id)
            .map(|(_, table)| table)
            .ok_or_else(|| missing(ObjectId::Table(id)))
    }

    /// Returns the view with this id.
    pub fn view(&self, id: ViewId) -> ScqlResult<&View> {
        self.views
            .iter()
            .find(|(vid, _)| *vid == id)
            .map(|(_, view)| view)
            .ok_or_else(|| missing(ObjectId::View(id)))
    }

    /// Returns the name of a table or view.
    pub fn object_name(&self, object: ObjectId) -> ScqlResult<&ObjectName> {
        match object {
            ObjectId::Table(id) => Ok(self.table(id)?.name()),
            ObjectId::View(id) => Ok(self.view(id)?.name()),
        }
    }

    fn view_and_table(&self, id: ViewId) -> ScqlResult<(&View, &Table)> {
        let view = self.view(id)?;
        let table = self.table(view.table_id()?)?;
        Ok((view, table))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Creates a table.
    pub fn create_table(
        &mut self,
        name: ObjectName,
        columns: Vec<ObjectName>,
    ) -> ScqlResult<TableId> {
        if self.tables.len() >= self.limits.max_tables {
            return Err(ScqlError::CatalogFull {
                kind: "tables",
                max: self.limits.max_tables,
            });
        }
        check_name(&name, MAX_LP_LENGTH)?;
        if self.contains_name(&name) {
            return Err(ScqlError::ObjectExists { name });
        }
        if columns.is_empty() || columns.len() > self.limits.max_columns {
            return Err(ScqlError::ColumnCount {
                count: columns.len(),
                max: self.limits.max_columns,
            });
        }
        for (i, column) in columns.iter().enumerate() {
            check_name(column, self.limits.max_column_name_length)?;
            if columns[..i].contains(column) {
                return Err(ScqlError::wrong_data(format!(
                    "duplicate column {column} in table {name}"
                )));
            }
        }

        let id = TableId::new(self.allocate_id());
        debug!(table = %name, id = %id, columns = columns.len(), "table created");
        self.tables.push((id, Table::new(name, columns, &self.limits)));
        Ok(id)
    }

    /// Creates a view over `table_name`.
    ///
    /// An empty `column_names` selects every table column in schema order.
    /// Filters must name columns of the table.
    pub fn create_view(
        &mut self,
        name: ObjectName,
        table_name: &[u8],
        column_names: &[ObjectName],
        filters: Vec<Filter>,
    ) -> ScqlResult<ViewId> {
        if self.views.len() >= self.limits.max_views {
            return Err(ScqlError::CatalogFull {
                kind: "views",
                max: self.limits.max_views,
            });
        }
        check_name(&name, MAX_LP_LENGTH)?;
        if self.contains_name(&name) {
            return Err(ScqlError::ObjectExists { name });
        }

        let table_id = self.find_table(table_name)?;
        let object = ObjectId::Table(table_id);
        let column_indexes = self.select_columns(object, column_names)?;
        self.validate_filters(object, &filters)?;

        let id = ViewId::new(self.allocate_id());
        debug!(
            view = %name,
            id = %id,
            table = %ObjectName::from_bytes(table_name),
            columns = column_indexes.len(),
            filters = filters.len(),
            "view created"
        );
        self.views
            .push((id, View::new(name, table_id, column_indexes, filters)));
        Ok(id)
    }

    /// Drops a table and detaches every view that references it.
    ///
    /// The caller detaches a cursor bound to the returned id.
    pub fn drop_table(&mut self, name: &[u8]) -> ScqlResult<TableId> {
        let id = self.find_table(name)?;

        let mut detached = 0;
        for (_, view) in &mut self.views {
            if view.table() == Some(id) {
                view.detach();
                detached += 1;
            }
        }

        if let Some(index) = self.tables.iter().position(|(tid, _)| *tid == id) {
            let (_, mut table) = self.tables.remove(index);
            table.clear();
        }

        debug!(
            table = %ObjectName::from_bytes(name),
            id = %id,
            views_detached = detached,
            "table dropped"
        );
        Ok(id)
    }

    /// Drops a view.
    ///
    /// The caller detaches a cursor bound to the returned id.
    pub fn drop_view(&mut self, name: &[u8]) -> ScqlResult<ViewId> {
        let id = self.find_view(name)?;
        if let Some(index) = self.views.iter().position(|(vid, _)| *vid == id) {
            let (_, mut view) = self.views.remove(index);
            view.drop_references();
        }

        debug!(view = %ObjectName::from_bytes(name), id = %id, "view dropped");
        Ok(id)
    }

    /// Appends an encoded row to a table.
    pub fn insert(&mut self, table_name: &[u8], row: Bytes) -> ScqlResult<usize> {
        let id = self.find_table(table_name)?;
        self.table_mut(id)?.append(row)
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn push_view(&mut self, view: View) -> ViewId {
        let id = ViewId::new(self.allocate_id());
        self.views.push((id, view));
        id
    }

    // =========================================================================
    // Dispatch over tables and views
    // =========================================================================

    /// Returns the number of columns `object` exposes.
    pub fn column_count(&self, object: ObjectId) -> ScqlResult<usize> {
        match object {
            ObjectId::Table(id) => Ok(self.table(id)?.column_count()),
            ObjectId::View(id) => Ok(self.view(id)?.column_count()),
        }
    }

    /// Returns the names of the columns `object` exposes.
    pub fn column_names(&self, object: ObjectId) -> ScqlResult<Vec<ObjectName>> {
        match object {
            ObjectId::Table(id) => Ok(self.table(id)?.columns().to_vec()),
            ObjectId::View(id) => {
                let (view, table) = self.view_and_table(id)?;
                Ok(view.column_names(table).into_iter().cloned().collect())
            }
        }
    }

    /// Resolves a column name in `object`'s own column space.
    pub fn resolve_column_index(&self, object: ObjectId, name: &[u8]) -> ScqlResult<usize> {
        match object {
            ObjectId::Table(id) => self.table(id)?.resolve_column_index(name),
            ObjectId::View(id) => {
                let (view, table) = self.view_and_table(id)?;
                view.resolve_column_index(table, name)
            }
        }
    }

    /// Resolves a projection by name.
    ///
    /// Empty selects every column in order. Fails with
    /// [`ScqlError::WrongData`] when wider than the object or naming an
    /// unknown column.
    pub fn select_columns(
        &self,
        object: ObjectId,
        column_names: &[ObjectName],
    ) -> ScqlResult<Vec<usize>> {
        let width = self.column_count(object)?;
        if column_names.is_empty() {
            return Ok((0..width).collect());
        }
        if column_names.len() > width {
            return Err(ScqlError::wrong_data(format!(
                "{} columns selected from {} available",
                column_names.len(),
                width
            )));
        }

        column_names
            .iter()
            .map(|column| match self.resolve_column_index(object, column) {
                Ok(index) => Ok(index),
                Err(ScqlError::ColumnNotFound { column, object: owner }) => Err(
                    ScqlError::wrong_data(format!("unknown column {column} in {owner}")),
                ),
                Err(e) => Err(e),
            })
            .collect()
    }

    /// Checks that every filter names a column filters are evaluated on.
    ///
    /// Filters on a view run against its table, so they may name table
    /// columns the view does not project.
    pub fn validate_filters(&self, object: ObjectId, filters: &[Filter]) -> ScqlResult<()> {
        let table = match object {
            ObjectId::Table(id) => self.table(id)?,
            ObjectId::View(id) => self.view_and_table(id)?.1,
        };
        for filter in filters {
            table.resolve_column_index(filter.column())?;
        }
        Ok(())
    }

    /// Returns the row at a storage position of `object`, in the object's
    /// own column space.
    pub fn row(&self, object: ObjectId, position: usize) -> ScqlResult<Bytes> {
        match object {
            ObjectId::Table(id) => Ok(self.table(id)?.row(position)?.clone()),
            ObjectId::View(id) => {
                let (view, table) = self.view_and_table(id)?;
                let data = table.row(position)?;
                if view.is_identity(table) {
                    Ok(data.clone())
                } else {
                    codec::project(data, view.column_indexes())
                }
            }
        }
    }

    /// Returns the rows of `object` matching `filters`.
    pub fn filter(&self, object: ObjectId, filters: &[Filter]) -> ScqlResult<Vec<Row>> {
        match object {
            ObjectId::Table(id) => self.table(id)?.filter(filters),
            ObjectId::View(id) => {
                let (view, table) = self.view_and_table(id)?;
                view.filter(table, filters)
            }
        }
    }

    /// Deletes the row at a storage position of `object`.
    pub fn delete(&mut self, object: ObjectId, position: usize) -> ScqlResult<()> {
        match object {
            ObjectId::Table(id) => self.table_mut(id)?.delete_at(position).map(|_| ()),
            ObjectId::View(id) => self.view(id)?.delete(position),
        }
    }

    /// Replaces one column of the row at a storage position of `object`.
    ///
    /// For a view, `column_index` is in the view's column space and is
    /// translated to the table's before the update.
    pub fn update(
        &mut self,
        object: ObjectId,
        position: usize,
        column_index: usize,
        value: &[u8],
    ) -> ScqlResult<()> {
        let (table_id, table_column) = match object {
            ObjectId::Table(id) => (id, column_index),
            ObjectId::View(id) => {
                let view = self.view(id)?;
                (view.table_id()?, view.table_column_index(column_index)?)
            }
        };
        self.table_mut(table_id)?
            .update_column(position, table_column, value)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

fn check_name(name: &ObjectName, max: usize) -> ScqlResult<()> {
    if name.is_empty() || name.len() > max {
        return Err(ScqlError::NameLength {
            name: name.clone(),
            len: name.len(),
            max,
        });
    }
    Ok(())
}

fn missing(object: ObjectId) -> ScqlError {
    ScqlError::ObjectNotFound {
        name: ObjectName::from(object.to_string().into_bytes()),
    }
}
