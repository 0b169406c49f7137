//! Base tables.
//!
//! A table owns its rows in a dense, order-preserving list. The position of
//! a row is its index in that list, so positions are always the contiguous
//! range `[0, row_count)`: deleting position `i` shifts every later row one
//! place to the left.

use bytes::Bytes;
use tracing::{debug, trace};

use scql_common::config::Limits;
use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::ObjectName;

use crate::codec;
use crate::predicate::{BoundFilter, Filter};

/// A row together with its storage position at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Position in the owning table.
    pub position: usize,
    /// Encoded column values.
    pub data: Bytes,
}

impl Row {
    /// Creates a row.
    #[must_use]
    pub fn new(position: usize, data: Bytes) -> Self {
        Self { position, data }
    }
}

/// A base table: a name, a column schema and bounded row storage.
#[derive(Debug, Clone)]
pub struct Table {
    name: ObjectName,
    columns: Vec<ObjectName>,
    rows: Vec<Bytes>,
    max_rows: usize,
    max_value_length: usize,
}

impl Table {
    /// Creates an empty table.
    ///
    /// The catalog validates names and column counts before calling this.
    #[must_use]
    pub fn new(name: ObjectName, columns: Vec<ObjectName>, limits: &Limits) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
            max_rows: limits.max_rows,
            max_value_length: limits.max_data_column_length,
        }
    }

    /// Returns the table name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// Returns the column names in schema order.
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[ObjectName] {
        &self.columns
    }

    /// Returns the number of columns.
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the number of stored rows.
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no more rows fit.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.max_rows
    }

    /// Returns the encoded row at `position`.
    pub fn row(&self, position: usize) -> ScqlResult<&Bytes> {
        self.rows.get(position).ok_or(ScqlError::RowNotFound {
            position,
            count: self.rows.len(),
        })
    }

    /// Iterates over the stored rows in position order.
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(position, data)| Row::new(position, data.clone()))
    }

    /// Appends an encoded row and returns its position.
    pub fn append(&mut self, row: Bytes) -> ScqlResult<usize> {
        if self.is_full() {
            return Err(ScqlError::TableFull {
                table: self.name.clone(),
                max: self.max_rows,
            });
        }
        codec::validate(&row, self.column_count(), self.max_value_length)?;

        let position = self.rows.len();
        self.rows.push(row);
        trace!(table = %self.name, position, "row appended");
        Ok(position)
    }

    /// Deletes the row at `position`, shifting later rows left.
    pub fn delete_at(&mut self, position: usize) -> ScqlResult<Bytes> {
        if position >= self.rows.len() {
            return Err(ScqlError::RowNotFound {
                position,
                count: self.rows.len(),
            });
        }

        let removed = self.rows.remove(position);
        debug!(table = %self.name, position, remaining = self.rows.len(), "row deleted");
        Ok(removed)
    }

    /// Replaces one column of the row at `position`.
    pub fn update_column(
        &mut self,
        position: usize,
        column_index: usize,
        value: &[u8],
    ) -> ScqlResult<()> {
        if value.is_empty() {
            return Err(ScqlError::EmptyValue { what: "update value" });
        }
        if value.len() > self.max_value_length {
            return Err(ScqlError::ValueTooLong {
                column: column_index,
                size: value.len(),
                max: self.max_value_length,
            });
        }
        if column_index >= self.column_count() {
            return Err(ScqlError::wrong_data(format!(
                "column index {column_index} outside table {}",
                self.name
            )));
        }

        let current = self.row(position)?;
        let updated = codec::replace_column(current, column_index, value)?;
        self.rows[position] = updated;
        debug!(table = %self.name, position, column = column_index, "column updated");
        Ok(())
    }

    /// Resolves a column name to its index.
    pub fn resolve_column_index(&self, name: &[u8]) -> ScqlResult<usize> {
        self.columns
            .iter()
            .position(|column| column.as_bytes() == name)
            .ok_or_else(|| ScqlError::ColumnNotFound {
                column: ObjectName::from_bytes(name),
                object: self.name.clone(),
            })
    }

    /// Returns the rows satisfying every filter, in storage order.
    ///
    /// An empty filter list returns all rows.
    pub fn filter(&self, filters: &[Filter]) -> ScqlResult<Vec<Row>> {
        let bound = filters
            .iter()
            .map(|filter| Ok(filter.bind(self.resolve_column_index(filter.column())?)))
            .collect::<ScqlResult<Vec<BoundFilter<'_>>>>()?;

        let mut selected: Vec<Row> = self.rows().collect();
        for filter in &bound {
            if selected.is_empty() {
                break;
            }
            let mut kept = Vec::with_capacity(selected.len());
            for row in selected {
                if filter.matches(&row.data)? {
                    kept.push(row);
                }
            }
            selected = kept;
        }

        trace!(
            table = %self.name,
            filters = filters.len(),
            matched = selected.len(),
            "table filtered"
        );
        Ok(selected)
    }

    /// Clears all rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
