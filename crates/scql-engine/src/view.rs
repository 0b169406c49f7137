//! Views over base tables.
//!
//! A view names one table, a projection of that table's columns and a fixed
//! filter list. It never owns rows. The table is held by id and resolved by
//! the catalog on every use; once the table is dropped the view keeps its
//! name but every operation that needs rows fails.

use tracing::trace;

use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::{ObjectName, TableId};

use crate::codec;
use crate::predicate::Filter;
use crate::table::{Row, Table};

/// A named projection and filter over one table.
#[derive(Debug, Clone)]
pub struct View {
    name: ObjectName,
    table: Option<TableId>,
    column_indexes: Vec<usize>,
    filters: Vec<Filter>,
}

impl View {
    /// Creates a view.
    ///
    /// `column_indexes` are indexes into the table's columns; `filters` name
    /// table columns.
    #[must_use]
    pub fn new(
        name: ObjectName,
        table: TableId,
        column_indexes: Vec<usize>,
        filters: Vec<Filter>,
    ) -> Self {
        Self {
            name,
            table: Some(table),
            column_indexes,
            filters,
        }
    }

    pub(crate) fn restore(
        name: ObjectName,
        table: Option<TableId>,
        column_indexes: Vec<usize>,
        filters: Vec<Filter>,
    ) -> Self {
        Self {
            name,
            table,
            column_indexes,
            filters,
        }
    }

    /// Returns the view name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// Returns the referenced table, if still attached.
    #[inline]
    #[must_use]
    pub fn table(&self) -> Option<TableId> {
        self.table
    }

    /// Returns the referenced table or fails if it was dropped.
    pub fn table_id(&self) -> ScqlResult<TableId> {
        self.table.ok_or_else(|| ScqlError::TableDetached {
            view: self.name.clone(),
        })
    }

    /// Returns the projection into the table's columns.
    #[inline]
    #[must_use]
    pub fn column_indexes(&self) -> &[usize] {
        &self.column_indexes
    }

    /// Returns the view's own filters.
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the number of columns the view exposes.
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_indexes.len()
    }

    /// Returns true if the projection re-emits every table column in order.
    #[must_use]
    pub fn is_identity(&self, table: &Table) -> bool {
        self.column_indexes.len() == table.column_count()
            && self
                .column_indexes
                .iter()
                .enumerate()
                .all(|(i, &index)| i == index)
    }

    /// Returns the names of the exposed columns.
    #[must_use]
    pub fn column_names<'t>(&self, table: &'t Table) -> Vec<&'t ObjectName> {
        self.column_indexes
            .iter()
            .filter_map(|&index| table.columns().get(index))
            .collect()
    }

    /// Applies the view's filters and `caller_filters` to `table`, then
    /// projects each surviving row.
    ///
    /// Returned rows keep their table storage positions.
    pub fn filter(&self, table: &Table, caller_filters: &[Filter]) -> ScqlResult<Vec<Row>> {
        self.table_id()?;

        let mut merged = Vec::with_capacity(self.filters.len() + caller_filters.len());
        merged.extend_from_slice(&self.filters);
        merged.extend_from_slice(caller_filters);

        let rows = table.filter(&merged)?;
        if self.is_identity(table) {
            return Ok(rows);
        }

        let projected = rows
            .into_iter()
            .map(|row| {
                let data = codec::project(&row.data, &self.column_indexes)?;
                Ok(Row::new(row.position, data))
            })
            .collect::<ScqlResult<Vec<_>>>()?;

        trace!(view = %self.name, rows = projected.len(), "view projected");
        Ok(projected)
    }

    /// Resolves a column name into the view's own column space.
    pub fn resolve_column_index(&self, table: &Table, name: &[u8]) -> ScqlResult<usize> {
        self.table_id()?;

        let table_index = table.resolve_column_index(name)?;
        self.column_indexes
            .iter()
            .position(|&index| index == table_index)
            .ok_or_else(|| ScqlError::ColumnNotFound {
                column: ObjectName::from_bytes(name),
                object: self.name.clone(),
            })
    }

    /// Translates a view column index into the table's column space.
    pub fn table_column_index(&self, view_index: usize) -> ScqlResult<usize> {
        self.column_indexes
            .get(view_index)
            .copied()
            .ok_or_else(|| {
                ScqlError::wrong_data(format!(
                    "column index {view_index} outside view {}",
                    self.name
                ))
            })
    }

    /// Row deletion through a view is never allowed.
    pub fn delete(&self, _position: usize) -> ScqlResult<()> {
        Err(ScqlError::not_allowed(format!("delete through view {}", self.name)))
    }

    /// Clears the table reference. Idempotent.
    pub fn detach(&mut self) {
        self.table = None;
    }

    /// Clears the table reference and the view's filters. Idempotent.
    pub fn drop_references(&mut self) {
        self.detach();
        self.filters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Operator;
    use scql_common::config::Limits;

    fn people() -> Table {
        let mut table = Table::new(
            ObjectName::from("P"),
            ["name", "age", "city"]
                .into_iter()
                .map(ObjectName::from)
                .collect(),
            &Limits::default(),
        );
        for values in [["ann", "30", "oslo"], ["bob", "25", "rome"], ["cat", "30", "kiev"]] {
            table.append(codec::encode_row(values).unwrap()).unwrap();
        }
        table
    }

    #[test]
    fn test_identity_view_returns_table_rows() {
        let table = people();
        let view = View::new(ObjectName::from("V"), TableId::new(1), vec![0, 1, 2], vec![]);
        assert!(view.is_identity(&table));
        assert_eq!(view.filter(&table, &[]).unwrap(), table.filter(&[]).unwrap());
    }

    #[test]
    fn test_permutation_is_projected() {
        let table = people();
        let view = View::new(ObjectName::from("V"), TableId::new(1), vec![2, 1, 0], vec![]);
        assert!(!view.is_identity(&table));

        let rows = view.filter(&table, &[]).unwrap();
        assert_eq!(rows[0].data, codec::encode_row(["oslo", "30", "ann"]).unwrap());
    }

    #[test]
    fn test_filters_merge_and_positions_survive() {
        let table = people();
        let view = View::new(
            ObjectName::from("V"),
            TableId::new(1),
            vec![0],
            vec![Filter::new("age", Operator::Equal, "30")],
        );

        let rows = view
            .filter(&table, &[Filter::new("name", Operator::NotEqual, "ann")])
            .unwrap();
        assert_eq!(rows, vec![Row::new(2, codec::encode_row(["cat"]).unwrap())]);
    }

    #[test]
    fn test_resolve_in_view_space() {
        let table = people();
        let view = View::new(ObjectName::from("V"), TableId::new(1), vec![2, 0], vec![]);
        assert_eq!(view.resolve_column_index(&table, b"name").unwrap(), 1);
        assert_eq!(view.resolve_column_index(&table, b"city").unwrap(), 0);
        assert!(matches!(
            view.resolve_column_index(&table, b"age"),
            Err(ScqlError::ColumnNotFound { .. })
        ));
        assert_eq!(view.table_column_index(1).unwrap(), 0);
    }

    #[test]
    fn test_detached_view_fails() {
        let table = people();
        let mut view = View::new(ObjectName::from("V"), TableId::new(1), vec![0], vec![]);
        view.drop_references();
        view.drop_references();

        let err = view.filter(&table, &[]).unwrap_err();
        assert!(matches!(err, ScqlError::TableDetached { .. }));
        assert_eq!(err.status_word(), 0x6A88);
        assert!(view.filters().is_empty());
    }

    #[test]
    fn test_delete_not_allowed() {
        let view = View::new(ObjectName::from("V"), TableId::new(1), vec![0], vec![]);
        assert_eq!(view.delete(0).unwrap_err().status_word(), 0x6986);
    }
}
