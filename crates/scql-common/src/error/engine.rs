//! Engine error types.
//!
//! Every failure of the engine, the command layer and the image codec is a
//! [`ScqlError`]. Each error carries a stable [`ErrorCode`], a coarse
//! [`FailureKind`] and the ISO7816 status word the card answers with.

use std::fmt;
use thiserror::Error;

use crate::types::ObjectName;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Invalid configuration.
    InvalidConfig = 0x0001,

    // Input errors (0x0100 - 0x01FF)
    /// Malformed or out of range command data.
    WrongData = 0x0100,
    /// A length field or value length is wrong.
    WrongLength = 0x0101,
    /// Encoded data is not prefix-sound.
    DataInvalid = 0x0102,
    /// Unknown filter operator.
    MalformedOperator = 0x0103,

    // Lookup errors (0x0200 - 0x02FF)
    /// Name already used by a table or view.
    ObjectExists = 0x0200,
    /// Referenced table, view, column or row is absent.
    ReferencedObjectNotFound = 0x0201,

    // Capacity errors (0x0300 - 0x03FF)
    /// Catalog is full.
    FileFull = 0x0300,
    /// Table storage is full.
    EndOfCapacity = 0x0301,

    // State errors (0x0400 - 0x04FF)
    /// Prerequisite state missing.
    ConditionsNotSatisfied = 0x0400,
    /// Operation structurally forbidden.
    CommandNotAllowed = 0x0401,
    /// Cursor stepped or positioned past the last row.
    EndOfTable = 0x0402,

    // Transport errors (0x0500 - 0x05FF)
    /// Class byte not supported.
    ClaNotSupported = 0x0500,
    /// Instruction byte not supported.
    InsNotSupported = 0x0501,
    /// Operation selector not supported.
    FuncNotSupported = 0x0502,

    // I/O errors (0x0600 - 0x06FF)
    /// General I/O error.
    Io = 0x0600,
    /// Persisted image is corrupted.
    Corruption = 0x0601,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Input",
            0x02 => "Lookup",
            0x03 => "Capacity",
            0x04 => "State",
            0x05 => "Transport",
            0x06 => "I/O",
            _ => "Unknown",
        }
    }

    /// Returns the ISO7816 status word reported for this code.
    #[must_use]
    pub const fn status_word(self) -> u16 {
        match self {
            Self::WrongData | Self::MalformedOperator => 0x6A80,
            Self::WrongLength => 0x6700,
            Self::DataInvalid => 0x6984,
            Self::ObjectExists => 0x6A89,
            Self::ReferencedObjectNotFound => 0x6A88,
            Self::FileFull | Self::EndOfCapacity => 0x6A84,
            Self::ConditionsNotSatisfied => 0x6985,
            Self::CommandNotAllowed => 0x6986,
            Self::EndOfTable => 0x6282,
            Self::ClaNotSupported => 0x6E00,
            Self::InsNotSupported => 0x6D00,
            Self::FuncNotSupported => 0x6A81,
            Self::InvalidConfig | Self::Io | Self::Corruption => 0x6F00,
        }
    }

    /// Returns the failure kind of this code.
    #[must_use]
    pub const fn kind(self) -> FailureKind {
        match self {
            Self::WrongData | Self::WrongLength | Self::DataInvalid | Self::InvalidConfig => {
                FailureKind::InvalidInput
            }
            Self::MalformedOperator => FailureKind::MalformedOperator,
            Self::ObjectExists => FailureKind::AlreadyExists,
            Self::ReferencedObjectNotFound => FailureKind::NotFound,
            Self::FileFull | Self::EndOfCapacity => FailureKind::CapacityExceeded,
            Self::ConditionsNotSatisfied => FailureKind::NotReady,
            Self::EndOfTable => FailureKind::EndOfSequence,
            Self::CommandNotAllowed
            | Self::ClaNotSupported
            | Self::InsNotSupported
            | Self::FuncNotSupported => FailureKind::Disallowed,
            Self::Io | Self::Corruption => FailureKind::Storage,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Coarse failure taxonomy shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Malformed or empty arguments.
    InvalidInput,
    /// Referenced table, view, column or row is absent.
    NotFound,
    /// Name collision.
    AlreadyExists,
    /// Table, view or row limit hit.
    CapacityExceeded,
    /// Operation attempted before its prerequisite state.
    NotReady,
    /// Cursor advanced or positioned past the last row.
    EndOfSequence,
    /// Operation structurally forbidden.
    Disallowed,
    /// Unknown filter operator.
    MalformedOperator,
    /// Persistence failure.
    Storage,
}

/// The main error type for SCQL.
///
/// # Example
///
/// ```rust
/// use scql_common::error::{FailureKind, ScqlError};
///
/// let err = ScqlError::EndOfTable;
/// assert_eq!(err.kind(), FailureKind::EndOfSequence);
/// assert_eq!(err.status_word(), 0x6282);
/// ```
#[derive(Debug, Error)]
pub enum ScqlError {
    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// Invalid argument provided.
    #[error("wrong data: {message}")]
    WrongData {
        /// Error message.
        message: String,
    },

    /// Column count outside the allowed range.
    #[error("column count {count} outside 1..={max}")]
    ColumnCount {
        /// Requested column count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A name is empty or longer than allowed.
    #[error("name {name} has invalid length {len} (max {max})")]
    NameLength {
        /// The offending name.
        name: ObjectName,
        /// Actual length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// A length field does not match.
    #[error("wrong length: expected {expected}, got {actual}")]
    WrongLength {
        /// Expected length or count.
        expected: usize,
        /// Actual length or count.
        actual: usize,
    },

    /// A column value is too long.
    #[error("column {column} value of {size} bytes exceeds maximum {max}")]
    ValueTooLong {
        /// Column index.
        column: usize,
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Encoded data is not prefix-sound.
    #[error("invalid data: {message}")]
    DataInvalid {
        /// Description of the defect.
        message: String,
    },

    /// Unknown filter operator code.
    #[error("unknown filter operator {code:#04x}")]
    UnknownOperator {
        /// The operator byte.
        code: u8,
    },

    // ==========================================================================
    // Lookup Errors
    // ==========================================================================
    /// Name already used by a table or a view.
    #[error("object {name} already exists")]
    ObjectExists {
        /// The colliding name.
        name: ObjectName,
    },

    /// Table not found.
    #[error("table {name} not found")]
    TableNotFound {
        /// The missing table.
        name: ObjectName,
    },

    /// View not found.
    #[error("view {name} not found")]
    ViewNotFound {
        /// The missing view.
        name: ObjectName,
    },

    /// Neither a table nor a view has this name.
    #[error("object {name} not found")]
    ObjectNotFound {
        /// The missing object.
        name: ObjectName,
    },

    /// Column not found.
    #[error("column {column} not found in {object}")]
    ColumnNotFound {
        /// The missing column.
        column: ObjectName,
        /// The table or view searched.
        object: ObjectName,
    },

    /// Row position outside the table.
    #[error("row {position} not found, table holds {count} rows")]
    RowNotFound {
        /// Requested position.
        position: usize,
        /// Current row count.
        count: usize,
    },

    /// The view's table was dropped.
    #[error("view {view} no longer references a table")]
    TableDetached {
        /// The inert view.
        view: ObjectName,
    },

    /// The cursor's bound object was dropped.
    #[error("cursor is not bound to a table or view")]
    CursorDetached,

    // ==========================================================================
    // Capacity Errors
    // ==========================================================================
    /// Catalog registry is full.
    #[error("cannot create more than {max} {kind}")]
    CatalogFull {
        /// "tables" or "views".
        kind: &'static str,
        /// The registry limit.
        max: usize,
    },

    /// Table storage is full.
    #[error("table {table} is full ({max} rows)")]
    TableFull {
        /// The full table.
        table: ObjectName,
        /// The row limit.
        max: usize,
    },

    // ==========================================================================
    // State Errors
    // ==========================================================================
    /// No cursor was declared.
    #[error("no cursor declared")]
    CursorNotDeclared,

    /// The cursor was declared but not opened.
    #[error("cursor is not open")]
    CursorNotOpen,

    /// A required value is empty.
    #[error("{what} must not be empty")]
    EmptyValue {
        /// What was empty.
        what: &'static str,
    },

    /// Transaction begin/commit/abort out of order.
    #[error("transaction error: {message}")]
    TransactionState {
        /// Error message.
        message: String,
    },

    /// The cursor stepped or is positioned past the last row.
    #[error("end of table")]
    EndOfTable,

    /// Operation structurally forbidden.
    #[error("operation not allowed: {operation}")]
    NotAllowed {
        /// The forbidden operation.
        operation: String,
    },

    // ==========================================================================
    // Transport Errors
    // ==========================================================================
    /// Class byte not supported.
    #[error("class {cla:#04x} not supported")]
    ClaNotSupported {
        /// The class byte.
        cla: u8,
    },

    /// Instruction byte not supported.
    #[error("instruction {ins:#04x} not supported")]
    InsNotSupported {
        /// The instruction byte.
        ins: u8,
    },

    /// Operation selector not supported.
    #[error("function {p2:#04x} not supported")]
    FuncNotSupported {
        /// The P2 selector.
        p2: u8,
    },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Persisted image is corrupted.
    #[error("image corrupted: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl ScqlError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::WrongData { .. } | Self::ColumnCount { .. } | Self::NameLength { .. } => {
                ErrorCode::WrongData
            }
            Self::WrongLength { .. } | Self::ValueTooLong { .. } => ErrorCode::WrongLength,
            Self::DataInvalid { .. } => ErrorCode::DataInvalid,
            Self::UnknownOperator { .. } => ErrorCode::MalformedOperator,
            Self::ObjectExists { .. } => ErrorCode::ObjectExists,
            Self::TableNotFound { .. }
            | Self::ViewNotFound { .. }
            | Self::ObjectNotFound { .. }
            | Self::ColumnNotFound { .. }
            | Self::RowNotFound { .. }
            | Self::TableDetached { .. }
            | Self::CursorDetached => ErrorCode::ReferencedObjectNotFound,
            Self::CatalogFull { .. } => ErrorCode::FileFull,
            Self::TableFull { .. } => ErrorCode::EndOfCapacity,
            Self::CursorNotDeclared
            | Self::CursorNotOpen
            | Self::EmptyValue { .. }
            | Self::TransactionState { .. } => ErrorCode::ConditionsNotSatisfied,
            Self::EndOfTable => ErrorCode::EndOfTable,
            Self::NotAllowed { .. } => ErrorCode::CommandNotAllowed,
            Self::ClaNotSupported { .. } => ErrorCode::ClaNotSupported,
            Self::InsNotSupported { .. } => ErrorCode::InsNotSupported,
            Self::FuncNotSupported { .. } => ErrorCode::FuncNotSupported,
            Self::Io { .. } => ErrorCode::Io,
            Self::Corruption { .. } => ErrorCode::Corruption,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns the failure kind of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.code().kind()
    }

    /// Returns the ISO7816 status word for this error.
    #[must_use]
    pub const fn status_word(&self) -> u16 {
        self.code().status_word()
    }

    /// Returns true if this error means a cursor ran off its snapshot.
    #[must_use]
    pub const fn is_end_of_table(&self) -> bool {
        matches!(self, Self::EndOfTable)
    }

    /// Creates a wrong data error.
    #[must_use]
    pub fn wrong_data(message: impl Into<String>) -> Self {
        Self::WrongData {
            message: message.into(),
        }
    }

    /// Creates a data invalid error.
    #[must_use]
    pub fn data_invalid(message: impl Into<String>) -> Self {
        Self::DataInvalid {
            message: message.into(),
        }
    }

    /// Creates a not allowed error.
    #[must_use]
    pub fn not_allowed(operation: impl Into<String>) -> Self {
        Self::NotAllowed {
            operation: operation.into(),
        }
    }

    /// Creates a corruption error.
    #[must_use]
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = ScqlError::TableNotFound {
            name: ObjectName::from("T"),
        };
        assert_eq!(err.code(), ErrorCode::ReferencedObjectNotFound);
        assert_eq!(err.code().category(), "Lookup");
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_error_display() {
        let err = ScqlError::TableNotFound {
            name: ObjectName::from("T"),
        };
        assert_eq!(err.to_string(), "table 'T' not found");
    }

    #[test]
    fn test_status_words() {
        assert_eq!(ScqlError::EndOfTable.status_word(), 0x6282);
        assert_eq!(ScqlError::CursorNotOpen.status_word(), 0x6985);
        assert_eq!(ScqlError::not_allowed("delete").status_word(), 0x6986);
        assert_eq!(ScqlError::UnknownOperator { code: 0x21 }.status_word(), 0x6A80);
        assert_eq!(
            ScqlError::CatalogFull {
                kind: "tables",
                max: 8
            }
            .status_word(),
            0x6A84
        );
    }

    #[test]
    fn test_kinds_cover_taxonomy() {
        assert_eq!(ScqlError::EmptyValue { what: "data" }.kind(), FailureKind::NotReady);
        assert_eq!(
            ScqlError::UnknownOperator { code: 0 }.kind(),
            FailureKind::MalformedOperator
        );
        assert_eq!(
            ScqlError::ObjectExists {
                name: ObjectName::from("V")
            }
            .kind(),
            FailureKind::AlreadyExists
        );
        assert_eq!(
            ScqlError::TableFull {
                table: ObjectName::from("T"),
                max: 25
            }
            .kind(),
            FailureKind::CapacityExceeded
        );
        assert_eq!(ScqlError::not_allowed("x").kind(), FailureKind::Disallowed);
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScqlError = io_err.into();
        assert_eq!(err.code(), ErrorCode::Io);
    }
}
