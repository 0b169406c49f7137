//! Row encoding and decoding.
//!
//! A row is the concatenation of its column values in schema order, each
//! written as a one-byte length followed by that many value bytes. There is
//! no padding, no type tag and no column count header:
//!
//! ```text
//! ┌─────┬──────────┬─────┬──────────┬─────┬──────────┐
//! │ len │  value0  │ len │  value1  │ ... │ valueN-1 │
//! └─────┴──────────┴─────┴──────────┴─────┴──────────┘
//! ```
//!
//! Offsets are re-derived on every call by hopping `len + 1` bytes per
//! column. Rows hold at most a handful of short columns, so nothing is
//! cached.

use bytes::{BufMut, Bytes, BytesMut};

use scql_common::constants::MAX_LP_LENGTH;
use scql_common::error::{ScqlError, ScqlResult};

/// Encodes column values into a row.
///
/// # Example
///
/// ```rust
/// use scql_engine::codec;
///
/// let row = codec::encode_row(["x", "yz"]).unwrap();
/// assert_eq!(&row[..], &[1, b'x', 2, b'y', b'z']);
/// ```
pub fn encode_row<I, V>(values: I) -> ScqlResult<Bytes>
where
    I: IntoIterator<Item = V>,
    V: AsRef<[u8]>,
{
    let mut buf = BytesMut::new();
    for (column, value) in values.into_iter().enumerate() {
        let value = value.as_ref();
        if value.len() > MAX_LP_LENGTH {
            return Err(ScqlError::ValueTooLong {
                column,
                size: value.len(),
                max: MAX_LP_LENGTH,
            });
        }
        buf.put_u8(value.len() as u8);
        buf.put_slice(value);
    }
    Ok(buf.freeze())
}

/// Iterator over the column values of an encoded row.
///
/// Yields an error and then stops if a length byte runs past the row.
#[derive(Debug, Clone)]
pub struct Columns<'a> {
    row: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for Columns<'a> {
    type Item = ScqlResult<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.row.len() {
            return None;
        }

        let len = usize::from(self.row[self.offset]);
        let start = self.offset + 1;
        let end = start + len;
        if end > self.row.len() {
            self.failed = true;
            return Some(Err(ScqlError::data_invalid(format!(
                "column at offset {} declares {} bytes, only {} remain",
                self.offset,
                len,
                self.row.len() - start
            ))));
        }

        self.offset = end;
        Some(Ok(&self.row[start..end]))
    }
}

/// Returns an iterator over the column values of `row`.
#[must_use]
pub fn columns(row: &[u8]) -> Columns<'_> {
    Columns {
        row,
        offset: 0,
        failed: false,
    }
}

/// Returns the offset of the length byte of column `column_index`.
pub fn column_offset(row: &[u8], column_index: usize) -> ScqlResult<usize> {
    let mut offset = 0;
    for _ in 0..column_index {
        if offset >= row.len() {
            return Err(column_out_of_range(column_index));
        }
        offset += usize::from(row[offset]) + 1;
    }

    if offset >= row.len() {
        return Err(column_out_of_range(column_index));
    }
    Ok(offset)
}

/// Returns the value bytes of column `column_index`.
pub fn decode_column(row: &[u8], column_index: usize) -> ScqlResult<&[u8]> {
    let offset = column_offset(row, column_index)?;
    let len = usize::from(row[offset]);
    let start = offset + 1;
    row.get(start..start + len).ok_or_else(|| {
        ScqlError::data_invalid(format!(
            "column {column_index} declares {len} bytes past the end of the row"
        ))
    })
}

/// Re-emits the requested columns, in the requested order.
///
/// Indexes may repeat or appear in any order.
pub fn project(row: &[u8], column_indexes: &[usize]) -> ScqlResult<Bytes> {
    let mut buf = BytesMut::with_capacity(row.len());
    for &index in column_indexes {
        let value = decode_column(row, index)?;
        buf.put_u8(value.len() as u8);
        buf.put_slice(value);
    }
    Ok(buf.freeze())
}

/// Counts the columns of a row, failing if the row is not prefix-sound.
pub fn column_count(row: &[u8]) -> ScqlResult<usize> {
    let mut count = 0;
    for column in columns(row) {
        column?;
        count += 1;
    }
    Ok(count)
}

/// Checks that `row` holds exactly `expected_columns` prefix-sound columns,
/// none longer than `max_value_length`.
pub fn validate(row: &[u8], expected_columns: usize, max_value_length: usize) -> ScqlResult<()> {
    let mut count = 0;
    for (index, column) in columns(row).enumerate() {
        let value = column?;
        if value.len() > max_value_length {
            return Err(ScqlError::ValueTooLong {
                column: index,
                size: value.len(),
                max: max_value_length,
            });
        }
        count += 1;
    }

    if count != expected_columns {
        return Err(ScqlError::WrongLength {
            expected: expected_columns,
            actual: count,
        });
    }
    Ok(())
}

/// Returns a copy of `row` with column `column_index` replaced by `value`.
///
/// The whole row is re-encoded, so the new value may differ in length.
pub fn replace_column(row: &[u8], column_index: usize, value: &[u8]) -> ScqlResult<Bytes> {
    if value.len() > MAX_LP_LENGTH {
        return Err(ScqlError::ValueTooLong {
            column: column_index,
            size: value.len(),
            max: MAX_LP_LENGTH,
        });
    }

    let mut buf = BytesMut::with_capacity(row.len() + value.len());
    let mut found = false;
    for (index, column) in columns(row).enumerate() {
        let current = if index == column_index {
            found = true;
            value
        } else {
            column?
        };
        buf.put_u8(current.len() as u8);
        buf.put_slice(current);
    }

    if !found {
        return Err(column_out_of_range(column_index));
    }
    Ok(buf.freeze())
}

fn column_out_of_range(column_index: usize) -> ScqlError {
    ScqlError::data_invalid(format!("column {column_index} is beyond the encoded row"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Bytes {
        encode_row(values.iter().copied()).unwrap()
    }

    #[test]
    fn test_decode_each_column() {
        let row = row(&["alpha", "", "z"]);
        assert_eq!(decode_column(&row, 0).unwrap(), b"alpha");
        assert_eq!(decode_column(&row, 1).unwrap(), b"");
        assert_eq!(decode_column(&row, 2).unwrap(), b"z");
        assert!(decode_column(&row, 3).is_err());
    }

    #[test]
    fn test_column_offset() {
        let row = row(&["ab", "c"]);
        assert_eq!(column_offset(&row, 0).unwrap(), 0);
        assert_eq!(column_offset(&row, 1).unwrap(), 3);
        assert!(column_offset(&row, 2).is_err());
    }

    #[test]
    fn test_truncated_row_is_invalid() {
        let truncated = [3u8, b'a', b'b'];
        let err = decode_column(&truncated, 0).unwrap_err();
        assert!(matches!(err, ScqlError::DataInvalid { .. }));
        assert!(column_count(&truncated).is_err());
    }

    #[test]
    fn test_identity_projection_is_noop() {
        let row = row(&["x", "yy", "zzz"]);
        assert_eq!(project(&row, &[0, 1, 2]).unwrap(), row);
    }

    #[test]
    fn test_projection_reorders() {
        let source = row(&["x", "yy", "zzz"]);
        assert_eq!(project(&source, &[2, 0]).unwrap(), row(&["zzz", "x"]));
        assert_eq!(project(&source, &[1, 1]).unwrap(), row(&["yy", "yy"]));
    }

    #[test]
    fn test_validate() {
        let row = row(&["x", "y"]);
        assert!(validate(&row, 2, 15).is_ok());
        assert!(matches!(
            validate(&row, 3, 15),
            Err(ScqlError::WrongLength {
                expected: 3,
                actual: 2
            })
        ));

        let long = encode_row(["0123456789abcdef"]).unwrap();
        assert!(matches!(
            validate(&long, 1, 15),
            Err(ScqlError::ValueTooLong { size: 16, .. })
        ));
    }

    #[test]
    fn test_replace_column_changes_length() {
        let source = row(&["a", "b", "c"]);
        let replaced = replace_column(&source, 1, b"longer").unwrap();
        assert_eq!(replaced, row(&["a", "longer", "c"]));
        assert_eq!(column_count(&replaced).unwrap(), 3);
        assert!(replace_column(&source, 3, b"x").is_err());
    }

    #[test]
    fn test_columns_iterator() {
        let row = row(&["one", "two"]);
        let values: Vec<&[u8]> = columns(&row).collect::<ScqlResult<_>>().unwrap();
        assert_eq!(values, vec![b"one".as_slice(), b"two".as_slice()]);
        assert_eq!(columns(&[]).count(), 0);
    }
}
