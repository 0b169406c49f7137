//! Catalog images.
//!
//! An image is a flat binary snapshot of every table, its rows and every
//! view. It lets a host keep the card's state across process restarts.
//!
//! # Format
//!
//! ```text
//! magic "SCQL" | version u8
//! table count u8
//!   Lp name | column count u8 | column count × Lp column
//!   row count u16 | row count × (row length u16, encoded row)
//! view count u8
//!   Lp name | Lp table name (length 0 when detached)
//!   index count u8 | index count × u8
//!   filter count u8 | filter count × (Lp column, operator u8, Lp operand)
//! ```
//!
//! `Lp` is a one-byte length followed by that many bytes. Multi-byte
//! integers are big-endian. Loading rebuilds the catalog through the same
//! validation as live commands, so an image can never hold more than the
//! configured limits allow.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use scql_common::config::Limits;
use scql_common::constants::{IMAGE_MAGIC, IMAGE_VERSION, MAX_LP_LENGTH};
use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::ObjectName;

use crate::catalog::Catalog;
use crate::predicate::{Filter, Operator};
use crate::view::View;

impl Catalog {
    /// Serializes the catalog into an image.
    pub fn to_image(&self) -> ScqlResult<Bytes> {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_slice(&IMAGE_MAGIC);
        buf.put_u8(IMAGE_VERSION);

        put_count(&mut buf, self.table_count(), "tables")?;
        for (_, table) in self.tables() {
            put_lp(&mut buf, table.name())?;
            put_count(&mut buf, table.column_count(), "columns")?;
            for column in table.columns() {
                put_lp(&mut buf, column)?;
            }

            let rows = u16::try_from(table.row_count())
                .map_err(|_| ScqlError::corruption("too many rows for an image"))?;
            buf.put_u16(rows);
            for row in table.rows() {
                let len = u16::try_from(row.data.len())
                    .map_err(|_| ScqlError::corruption("row too long for an image"))?;
                buf.put_u16(len);
                buf.put_slice(&row.data);
            }
        }

        put_count(&mut buf, self.view_count(), "views")?;
        for (_, view) in self.views() {
            put_lp(&mut buf, view.name())?;
            match view.table() {
                Some(id) => put_lp(&mut buf, self.table(id)?.name())?,
                None => buf.put_u8(0),
            }

            put_count(&mut buf, view.column_count(), "view columns")?;
            for &index in view.column_indexes() {
                let index = u8::try_from(index)
                    .map_err(|_| ScqlError::corruption("column index too large"))?;
                buf.put_u8(index);
            }

            put_count(&mut buf, view.filters().len(), "filters")?;
            for filter in view.filters() {
                put_lp(&mut buf, filter.column())?;
                buf.put_u8(filter.operator().code());
                put_lp(&mut buf, filter.operand())?;
            }
        }

        debug!(
            tables = self.table_count(),
            views = self.view_count(),
            bytes = buf.len(),
            "catalog image written"
        );
        Ok(buf.freeze())
    }

    /// Rebuilds a catalog from an image, enforcing `limits`.
    pub fn from_image(bytes: &[u8], limits: Limits) -> ScqlResult<Self> {
        let mut reader = ImageReader::new(bytes);

        let magic = reader.take(IMAGE_MAGIC.len(), "magic")?;
        if magic != IMAGE_MAGIC {
            return Err(ScqlError::corruption("bad image magic"));
        }
        let version = reader.u8("version")?;
        if version != IMAGE_VERSION {
            return Err(ScqlError::corruption(format!(
                "unsupported image version {version}"
            )));
        }

        let mut catalog = Catalog::new(limits);

        let tables = reader.u8("table count")?;
        for _ in 0..tables {
            let name = reader.lp_name("table name")?;
            let column_count = reader.u8("column count")?;
            let columns = (0..column_count)
                .map(|_| reader.lp_name("column name"))
                .collect::<ScqlResult<Vec<_>>>()?;
            let id = catalog
                .create_table(name, columns)
                .map_err(|e| rejected("table", &e))?;

            let rows = reader.u16("row count")?;
            for _ in 0..rows {
                let len = usize::from(reader.u16("row length")?);
                let row = Bytes::copy_from_slice(reader.take(len, "row")?);
                catalog
                    .table_mut(id)?
                    .append(row)
                    .map_err(|e| rejected("row", &e))?;
            }
        }

        let views = reader.u8("view count")?;
        for _ in 0..views {
            let name = reader.lp_name("view name")?;
            let table_name = reader.lp("view table")?;

            let index_count = reader.u8("index count")?;
            let indexes = (0..index_count)
                .map(|_| reader.u8("column index").map(usize::from))
                .collect::<ScqlResult<Vec<_>>>()?;

            let filter_count = reader.u8("filter count")?;
            let mut filters = Vec::with_capacity(usize::from(filter_count));
            for _ in 0..filter_count {
                let column = reader.lp_name("filter column")?;
                let code = reader.u8("filter operator")?;
                let operand = Bytes::copy_from_slice(reader.lp("filter operand")?);
                let operator =
                    Operator::try_from(code).map_err(|e| rejected("filter", &e))?;
                filters.push(Filter::new(column, operator, operand));
            }

            restore_view(&mut catalog, name, table_name, indexes, filters)?;
        }

        if !reader.is_empty() {
            return Err(ScqlError::corruption(format!(
                "{} trailing bytes after image",
                reader.remaining()
            )));
        }

        debug!(
            tables = catalog.table_count(),
            views = catalog.view_count(),
            "catalog image loaded"
        );
        Ok(catalog)
    }
}

fn restore_view(
    catalog: &mut Catalog,
    name: ObjectName,
    table_name: &[u8],
    indexes: Vec<usize>,
    filters: Vec<Filter>,
) -> ScqlResult<()> {
    if table_name.is_empty() {
        if catalog.view_count() >= catalog.limits().max_views {
            return Err(ScqlError::corruption("image holds too many views"));
        }
        if name.is_empty() || catalog.contains_name(&name) {
            return Err(ScqlError::corruption(format!("invalid view name {name}")));
        }
        catalog.push_view(View::restore(name, None, indexes, filters));
        return Ok(());
    }

    let table_id = catalog
        .find_table(table_name)
        .map_err(|e| rejected("view", &e))?;
    let table = catalog.table(table_id)?;
    let column_names = indexes
        .iter()
        .map(|&index| {
            table.columns().get(index).cloned().ok_or_else(|| {
                ScqlError::corruption(format!("view {name} projects missing column {index}"))
            })
        })
        .collect::<ScqlResult<Vec<_>>>()?;

    catalog
        .create_view(name, table_name, &column_names, filters)
        .map_err(|e| rejected("view", &e))?;
    Ok(())
}

fn rejected(what: &str, err: &ScqlError) -> ScqlError {
    ScqlError::corruption(format!("image {what} rejected: {err}"))
}

fn put_lp(buf: &mut BytesMut, value: &[u8]) -> ScqlResult<()> {
    if value.len() > MAX_LP_LENGTH {
        return Err(ScqlError::corruption("value too long for a length prefix"));
    }
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
    Ok(())
}

fn put_count(buf: &mut BytesMut, count: usize, what: &str) -> ScqlResult<()> {
    let count =
        u8::try_from(count).map_err(|_| ScqlError::corruption(format!("too many {what}")))?;
    buf.put_u8(count);
    Ok(())
}

/// Bounds-checked reader over an image.
struct ImageReader<'a> {
    buf: &'a [u8],
}

impl<'a> ImageReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn need(&self, len: usize, what: &str) -> ScqlResult<()> {
        if self.buf.remaining() < len {
            return Err(ScqlError::corruption(format!("image truncated in {what}")));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> ScqlResult<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, what: &str) -> ScqlResult<u16> {
        self.need(2, what)?;
        Ok(self.buf.get_u16())
    }

    fn take(&mut self, len: usize, what: &str) -> ScqlResult<&'a [u8]> {
        self.need(len, what)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn lp(&mut self, what: &str) -> ScqlResult<&'a [u8]> {
        let len = usize::from(self.u8(what)?);
        self.take(len, what)
    }

    fn lp_name(&mut self, what: &str) -> ScqlResult<ObjectName> {
        self.lp(what).map(ObjectName::from_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use scql_common::error::FailureKind;
    use scql_common::types::ObjectId;

    fn names(values: &[&str]) -> Vec<ObjectName> {
        values.iter().map(|v| ObjectName::from(*v)).collect()
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::default();
        catalog
            .create_table(ObjectName::from("T"), names(&["a", "b"]))
            .unwrap();
        catalog
            .create_table(ObjectName::from("U"), names(&["k"]))
            .unwrap();
        for row in [["1", "x"], ["2", "y"]] {
            catalog
                .insert(b"T", codec::encode_row(row).unwrap())
                .unwrap();
        }
        catalog
            .create_view(
                ObjectName::from("V"),
                b"T",
                &names(&["b"]),
                vec![Filter::new("a", Operator::GreaterOrEqual, "2")],
            )
            .unwrap();
        catalog
            .create_view(ObjectName::from("W"), b"U", &[], Vec::new())
            .unwrap();
        catalog.drop_table(b"U").unwrap();
        catalog
    }

    #[test]
    fn test_image_restores_rows_and_views() {
        let catalog = sample();
        let image = catalog.to_image().unwrap();
        let restored = Catalog::from_image(&image, Limits::default()).unwrap();

        assert_eq!(restored.table_count(), 1);
        assert_eq!(restored.view_count(), 2);

        let view = restored.find_view(b"V").unwrap();
        let rows = restored.filter(ObjectId::View(view), &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data, codec::encode_row(["y"]).unwrap());

        let detached = restored.find_view(b"W").unwrap();
        assert_eq!(restored.view(detached).unwrap().table(), None);

        assert_eq!(restored.to_image().unwrap(), image);
    }

    #[test]
    fn test_bad_magic() {
        let err = Catalog::from_image(b"NOPE\x01\x00\x00", Limits::default()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Storage);
    }

    #[test]
    fn test_truncated_image() {
        let image = sample().to_image().unwrap();
        for len in [3, 5, image.len() / 2, image.len() - 1] {
            let err = Catalog::from_image(&image[..len], Limits::default()).unwrap_err();
            assert!(matches!(err, ScqlError::Corruption { .. }), "len {len}");
        }
    }

    #[test]
    fn test_limits_rechecked_on_load() {
        let image = sample().to_image().unwrap();
        let tight = Limits {
            max_rows: 1,
            ..Limits::default()
        };
        let err = Catalog::from_image(&image, tight).unwrap_err();
        assert!(matches!(err, ScqlError::Corruption { .. }));
    }
}
