//! Command decoding.
//!
//! Turns a [`CommandApdu`] into a typed [`Command`] and back. Data fields
//! are sequences of one-byte counts and `Lp` values (a one-byte length
//! followed by that many bytes):
//!
//! ```text
//! create table    Lp name | N | N × Lp column
//! create view     Lp name | Lp table | N | N × Lp column | [F | F × filter]
//! declare cursor  Lp object | N | N × Lp column | [F | F × filter]
//! insert          Lp table | N | N × Lp value
//! update          Lp column | Lp value
//! drop            Lp name
//! filter          Lp column | Lp operator (length 1) | Lp operand
//! ```
//!
//! The filter block is optional: a data field that ends right after the
//! column list declares no filters. Bytes left over after a complete data
//! field are rejected.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::trace;

use scql_common::constants::MAX_LP_LENGTH;
use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::ObjectName;
use scql_engine::Filter;

use crate::command::CommandApdu;

/// Class byte used for every command this crate builds.
pub const CLA_INTERINDUSTRY: u8 = 0x00;

// =============================================================================
// Op codes
// =============================================================================

/// Instruction bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    /// SELECT FILE; accepted and ignored.
    Select = 0xA4,
    /// SCQL operation, selected by P2.
    Scql = 0x10,
    /// Transaction control, selected by P2.
    Transaction = 0x12,
}

impl TryFrom<u8> for Instruction {
    type Error = ScqlError;

    fn try_from(ins: u8) -> ScqlResult<Self> {
        match ins {
            0xA4 => Ok(Self::Select),
            0x10 => Ok(Self::Scql),
            0x12 => Ok(Self::Transaction),
            _ => Err(ScqlError::InsNotSupported { ins }),
        }
    }
}

/// SCQL operation codes carried in P2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScqlOp {
    /// Create a table.
    CreateTable = 0x80,
    /// Create a view.
    CreateView = 0x81,
    /// Drop a table.
    DropTable = 0x83,
    /// Drop a view.
    DropView = 0x84,
    /// Declare the cursor.
    DeclareCursor = 0x87,
    /// Open the cursor.
    Open = 0x88,
    /// Advance the cursor.
    Next = 0x89,
    /// Fetch the current row.
    Fetch = 0x8A,
    /// Fetch the current row and advance.
    FetchNext = 0x8B,
    /// Insert a row.
    Insert = 0x8C,
    /// Update a column of the current row.
    Update = 0x8D,
    /// Delete the current row.
    Delete = 0x8E,
}

impl TryFrom<u8> for ScqlOp {
    type Error = ScqlError;

    fn try_from(p2: u8) -> ScqlResult<Self> {
        Ok(match p2 {
            0x80 => Self::CreateTable,
            0x81 => Self::CreateView,
            0x83 => Self::DropTable,
            0x84 => Self::DropView,
            0x87 => Self::DeclareCursor,
            0x88 => Self::Open,
            0x89 => Self::Next,
            0x8A => Self::Fetch,
            0x8B => Self::FetchNext,
            0x8C => Self::Insert,
            0x8D => Self::Update,
            0x8E => Self::Delete,
            _ => return Err(ScqlError::FuncNotSupported { p2 }),
        })
    }
}

/// Transaction operations carried in P2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransactionOp {
    /// Begin a transaction.
    Begin = 0x80,
    /// Commit the active transaction.
    Commit = 0x81,
    /// Abort the active transaction.
    Abort = 0x82,
}

impl TryFrom<u8> for TransactionOp {
    type Error = ScqlError;

    fn try_from(p2: u8) -> ScqlResult<Self> {
        match p2 {
            0x80 => Ok(Self::Begin),
            0x81 => Ok(Self::Commit),
            0x82 => Ok(Self::Abort),
            _ => Err(ScqlError::InsNotSupported {
                ins: Instruction::Transaction as u8,
            }),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A decoded SCQL operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScqlRequest {
    /// Create a table.
    CreateTable {
        /// Table name.
        name: ObjectName,
        /// Column names.
        columns: Vec<ObjectName>,
    },
    /// Create a view.
    CreateView {
        /// View name.
        name: ObjectName,
        /// Base table name.
        table: ObjectName,
        /// Selected columns; empty selects all.
        columns: Vec<ObjectName>,
        /// Filters.
        filters: Vec<Filter>,
    },
    /// Drop a table.
    DropTable {
        /// Table name.
        name: ObjectName,
    },
    /// Drop a view.
    DropView {
        /// View name.
        name: ObjectName,
    },
    /// Declare the cursor.
    DeclareCursor {
        /// Table or view name.
        object: ObjectName,
        /// Selected columns; empty selects all.
        columns: Vec<ObjectName>,
        /// Filters.
        filters: Vec<Filter>,
    },
    /// Open the cursor.
    Open,
    /// Advance the cursor.
    Next,
    /// Fetch the current row.
    Fetch,
    /// Fetch the current row and advance.
    FetchNext,
    /// Insert a row.
    Insert {
        /// Table name.
        table: ObjectName,
        /// One value per column.
        values: Vec<Bytes>,
    },
    /// Update one column of the current row.
    Update {
        /// Column name.
        column: ObjectName,
        /// New value.
        value: Bytes,
    },
    /// Delete the current row.
    Delete,
}

impl ScqlRequest {
    /// Returns the operation code.
    #[must_use]
    pub fn op(&self) -> ScqlOp {
        match self {
            Self::CreateTable { .. } => ScqlOp::CreateTable,
            Self::CreateView { .. } => ScqlOp::CreateView,
            Self::DropTable { .. } => ScqlOp::DropTable,
            Self::DropView { .. } => ScqlOp::DropView,
            Self::DeclareCursor { .. } => ScqlOp::DeclareCursor,
            Self::Open => ScqlOp::Open,
            Self::Next => ScqlOp::Next,
            Self::Fetch => ScqlOp::Fetch,
            Self::FetchNext => ScqlOp::FetchNext,
            Self::Insert { .. } => ScqlOp::Insert,
            Self::Update { .. } => ScqlOp::Update,
            Self::Delete => ScqlOp::Delete,
        }
    }

    /// Decodes the data field of operation `p2`.
    pub fn decode(p2: u8, data: &[u8]) -> ScqlResult<Self> {
        let op = ScqlOp::try_from(p2)?;
        let mut reader = DataReader::new(data);

        let request = match op {
            ScqlOp::CreateTable => Self::CreateTable {
                name: reader.lp_name("table name")?,
                columns: reader.names("column name")?,
            },
            ScqlOp::CreateView => Self::CreateView {
                name: reader.lp_name("view name")?,
                table: reader.lp_name("table name")?,
                columns: reader.names("column name")?,
                filters: reader.filters()?,
            },
            ScqlOp::DropTable => Self::DropTable {
                name: reader.lp_name("table name")?,
            },
            ScqlOp::DropView => Self::DropView {
                name: reader.lp_name("view name")?,
            },
            ScqlOp::DeclareCursor => Self::DeclareCursor {
                object: reader.lp_name("object name")?,
                columns: reader.names("column name")?,
                filters: reader.filters()?,
            },
            ScqlOp::Open => Self::Open,
            ScqlOp::Next => Self::Next,
            ScqlOp::Fetch => Self::Fetch,
            ScqlOp::FetchNext => Self::FetchNext,
            ScqlOp::Insert => {
                let table = reader.lp_name("table name")?;
                let count = reader.u8("value count")?;
                let values = (0..count)
                    .map(|_| reader.lp("value").map(Bytes::copy_from_slice))
                    .collect::<ScqlResult<Vec<_>>>()?;
                Self::Insert { table, values }
            }
            ScqlOp::Update => Self::Update {
                column: reader.lp_name("column name")?,
                value: Bytes::copy_from_slice(reader.lp("value")?),
            },
            ScqlOp::Delete => Self::Delete,
        };

        reader.finish()?;
        Ok(request)
    }

    /// Encodes the data field.
    pub fn encode_data(&self) -> ScqlResult<Bytes> {
        let mut buf = BytesMut::new();
        match self {
            Self::CreateTable { name, columns } => {
                put_lp(&mut buf, name)?;
                put_names(&mut buf, columns)?;
            }
            Self::CreateView {
                name,
                table,
                columns,
                filters,
            } => {
                put_lp(&mut buf, name)?;
                put_lp(&mut buf, table)?;
                put_names(&mut buf, columns)?;
                put_filters(&mut buf, filters)?;
            }
            Self::DropTable { name } | Self::DropView { name } => put_lp(&mut buf, name)?,
            Self::DeclareCursor {
                object,
                columns,
                filters,
            } => {
                put_lp(&mut buf, object)?;
                put_names(&mut buf, columns)?;
                put_filters(&mut buf, filters)?;
            }
            Self::Insert { table, values } => {
                put_lp(&mut buf, table)?;
                put_count(&mut buf, values.len())?;
                for value in values {
                    put_lp(&mut buf, value)?;
                }
            }
            Self::Update { column, value } => {
                put_lp(&mut buf, column)?;
                put_lp(&mut buf, value)?;
            }
            Self::Open | Self::Next | Self::Fetch | Self::FetchNext | Self::Delete => {}
        }
        Ok(buf.freeze())
    }

    /// Builds the command APDU for this request.
    pub fn to_apdu(&self) -> ScqlResult<CommandApdu> {
        Command::Scql(self.clone()).to_apdu()
    }
}

// =============================================================================
// Commands
// =============================================================================

/// A decoded command APDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SELECT; a no-op.
    Select,
    /// An SCQL operation.
    Scql(ScqlRequest),
    /// A transaction operation.
    Transaction(TransactionOp),
}

impl Command {
    /// Decodes a command APDU.
    ///
    /// The class byte must be interindustry, the instruction known and P2 a
    /// valid operation of that instruction.
    pub fn decode(apdu: &CommandApdu) -> ScqlResult<Self> {
        if !apdu.is_interindustry() {
            return Err(ScqlError::ClaNotSupported { cla: apdu.cla });
        }
        match Instruction::try_from(apdu.ins)? {
            Instruction::Select => Ok(Self::Select),
            Instruction::Scql => ScqlRequest::decode(apdu.p2, &apdu.data).map(Self::Scql),
            Instruction::Transaction => TransactionOp::try_from(apdu.p2).map(Self::Transaction),
        }
    }

    /// Builds the command APDU.
    pub fn to_apdu(&self) -> ScqlResult<CommandApdu> {
        let cla = CLA_INTERINDUSTRY;
        Ok(match self {
            Self::Select => CommandApdu::new(cla, Instruction::Select as u8, 0, 0, Bytes::new()),
            Self::Scql(request) => CommandApdu::new(
                cla,
                Instruction::Scql as u8,
                0,
                request.op() as u8,
                request.encode_data()?,
            ),
            Self::Transaction(op) => {
                CommandApdu::new(cla, Instruction::Transaction as u8, 0, *op as u8, Bytes::new())
            }
        })
    }
}

impl From<ScqlRequest> for Command {
    fn from(request: ScqlRequest) -> Self {
        Self::Scql(request)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Scql(request) => write!(f, "{:?}", request.op()),
            Self::Transaction(op) => write!(f, "{op:?}"),
        }
    }
}

// =============================================================================
// Data field codec
// =============================================================================

/// Bounds-checked reader over a command data field.
struct DataReader<'a> {
    buf: &'a [u8],
}

impl<'a> DataReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn need(&self, len: usize, what: &str) -> ScqlResult<()> {
        if self.buf.remaining() < len {
            trace!(field = what, "data field truncated");
            return Err(ScqlError::WrongLength {
                expected: len,
                actual: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> ScqlResult<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn lp(&mut self, what: &str) -> ScqlResult<&'a [u8]> {
        let len = usize::from(self.u8(what)?);
        self.need(len, what)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn lp_name(&mut self, what: &str) -> ScqlResult<ObjectName> {
        self.lp(what).map(ObjectName::from_bytes)
    }

    fn names(&mut self, what: &str) -> ScqlResult<Vec<ObjectName>> {
        let count = self.u8("name count")?;
        (0..count).map(|_| self.lp_name(what)).collect()
    }

    fn filters(&mut self) -> ScqlResult<Vec<Filter>> {
        if self.buf.is_empty() {
            return Ok(Vec::new());
        }
        let count = self.u8("filter count")?;
        (0..count).map(|_| self.filter()).collect()
    }

    fn filter(&mut self) -> ScqlResult<Filter> {
        let column = self.lp_name("filter column")?;
        let operator = self.lp("filter operator")?;
        let &[code] = operator else {
            return Err(ScqlError::wrong_data(format!(
                "filter operator must be one byte, got {}",
                operator.len()
            )));
        };
        let operand = Bytes::copy_from_slice(self.lp("filter operand")?);
        Filter::from_code(column, code, operand)
    }

    fn finish(self) -> ScqlResult<()> {
        if !self.buf.is_empty() {
            return Err(ScqlError::wrong_data(format!(
                "{} trailing bytes in data field",
                self.buf.len()
            )));
        }
        Ok(())
    }
}

fn put_lp(buf: &mut BytesMut, value: &[u8]) -> ScqlResult<()> {
    if value.len() > MAX_LP_LENGTH {
        return Err(ScqlError::WrongLength {
            expected: MAX_LP_LENGTH,
            actual: value.len(),
        });
    }
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
    Ok(())
}

fn put_count(buf: &mut BytesMut, count: usize) -> ScqlResult<()> {
    let count = u8::try_from(count).map_err(|_| ScqlError::WrongLength {
        expected: usize::from(u8::MAX),
        actual: count,
    })?;
    buf.put_u8(count);
    Ok(())
}

fn put_names(buf: &mut BytesMut, names: &[ObjectName]) -> ScqlResult<()> {
    put_count(buf, names.len())?;
    for name in names {
        put_lp(buf, name)?;
    }
    Ok(())
}

fn put_filters(buf: &mut BytesMut, filters: &[Filter]) -> ScqlResult<()> {
    if filters.is_empty() {
        return Ok(());
    }
    put_count(buf, filters.len())?;
    for filter in filters {
        put_lp(buf, filter.column())?;
        buf.put_u8(1);
        buf.put_u8(filter.operator().code());
        put_lp(buf, filter.operand())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scql_common::error::FailureKind;
    use scql_engine::Operator;

    fn names(values: &[&str]) -> Vec<ObjectName> {
        values.iter().map(|v| ObjectName::from(*v)).collect()
    }

    #[test]
    fn test_decode_create_table() {
        let data = [0x01, b'T', 0x02, 0x01, b'a', 0x01, b'b'];
        let request = ScqlRequest::decode(0x80, &data).unwrap();
        assert_eq!(
            request,
            ScqlRequest::CreateTable {
                name: ObjectName::from("T"),
                columns: names(&["a", "b"]),
            }
        );
        assert_eq!(&request.encode_data().unwrap()[..], &data);
    }

    #[test]
    fn test_decode_view_with_filters() {
        let mut data = vec![0x01, b'V', 0x01, b'T', 0x01, 0x01, b'b'];
        data.extend_from_slice(&[0x01, 0x01, b'a', 0x01, 0x3E, 0x01, b'1']);
        let request = ScqlRequest::decode(0x81, &data).unwrap();
        let ScqlRequest::CreateView { filters, columns, .. } = &request else {
            panic!("expected create view, got {request:?}");
        };
        assert_eq!(columns, &names(&["b"]));
        assert_eq!(filters, &vec![Filter::new("a", Operator::Greater, "1")]);
        assert_eq!(request.encode_data().unwrap(), Bytes::from(data));
    }

    #[test]
    fn test_filter_block_is_optional() {
        let data = [0x01, b'T', 0x00];
        let request = ScqlRequest::decode(0x87, &data).unwrap();
        assert_eq!(
            request,
            ScqlRequest::DeclareCursor {
                object: ObjectName::from("T"),
                columns: Vec::new(),
                filters: Vec::new(),
            }
        );
    }

    #[test]
    fn test_bad_filter_operator() {
        let data = [0x01, b'T', 0x00, 0x01, 0x01, b'a', 0x01, 0x99, 0x01, b'1'];
        let err = ScqlRequest::decode(0x87, &data).unwrap_err();
        assert_eq!(err.kind(), FailureKind::MalformedOperator);
        assert_eq!(err.status_word(), 0x6A80);

        let data = [0x01, b'T', 0x00, 0x01, 0x01, b'a', 0x02, 0x3D, 0x3D, 0x01, b'1'];
        let err = ScqlRequest::decode(0x87, &data).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);
    }

    #[test]
    fn test_truncated_and_trailing_data() {
        let err = ScqlRequest::decode(0x80, &[0x05, b'T']).unwrap_err();
        assert_eq!(err.status_word(), 0x6700);

        let err = ScqlRequest::decode(0x83, &[0x01, b'T', 0xFF]).unwrap_err();
        assert_eq!(err.status_word(), 0x6A80);

        let err = ScqlRequest::decode(0x88, &[0x00]).unwrap_err();
        assert_eq!(err.status_word(), 0x6A80);
    }

    #[test]
    fn test_unknown_op_codes() {
        let err = ScqlRequest::decode(0x85, &[]).unwrap_err();
        assert_eq!(err.status_word(), 0x6A81);
        assert_eq!(TransactionOp::try_from(0x90).unwrap_err().status_word(), 0x6D00);
        assert_eq!(Instruction::try_from(0xB0).unwrap_err().status_word(), 0x6D00);
    }

    #[test]
    fn test_command_decode_checks_class() {
        let apdu = CommandApdu::new(0x80, 0x10, 0x00, 0x88, Bytes::new());
        assert_eq!(Command::decode(&apdu).unwrap_err().status_word(), 0x6E00);

        let apdu = CommandApdu::new(0x00, 0xA4, 0x04, 0x00, vec![0xA0, 0x00]);
        assert_eq!(Command::decode(&apdu).unwrap(), Command::Select);
    }

    #[test]
    fn test_command_to_apdu() {
        let insert = ScqlRequest::Insert {
            table: ObjectName::from("T"),
            values: vec![Bytes::from_static(b"x"), Bytes::from_static(b"yz")],
        };
        let apdu = insert.to_apdu().unwrap();
        assert_eq!(apdu.to_string(), "0010008C08015402017802797A");
        assert_eq!(Command::decode(&apdu).unwrap(), Command::Scql(insert));

        let apdu = Command::Transaction(TransactionOp::Abort).to_apdu().unwrap();
        assert_eq!((apdu.ins, apdu.p2), (0x12, 0x82));
    }

    #[test]
    fn test_encode_rejects_long_names() {
        let request = ScqlRequest::DropTable {
            name: ObjectName::from(vec![b'n'; 300]),
        };
        assert_eq!(request.encode_data().unwrap_err().status_word(), 0x6700);
    }
}
