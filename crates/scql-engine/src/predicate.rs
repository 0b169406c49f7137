//! Filter predicates.
//!
//! A filter compares one column of a row against a constant operand.
//! Values are opaque bytes, compared as unsigned bytes in lexicographic
//! order; when one value is a prefix of the other, the shorter sorts first.

use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;

use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::ObjectName;

use crate::codec;

/// Comparison operator of a filter, with its wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    /// `=`
    Equal = 0x3D,
    /// `<`
    Less = 0x3C,
    /// `>`
    Greater = 0x3E,
    /// `<=`, coded as `L`.
    LessOrEqual = 0x4C,
    /// `>=`, coded as `G`.
    GreaterOrEqual = 0x47,
    /// `!=`, coded as `#`.
    NotEqual = 0x23,
}

impl Operator {
    /// All operators.
    pub const ALL: [Operator; 6] = [
        Operator::Equal,
        Operator::Less,
        Operator::Greater,
        Operator::LessOrEqual,
        Operator::GreaterOrEqual,
        Operator::NotEqual,
    ];

    /// Returns the wire code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns the conventional symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::NotEqual => "!=",
        }
    }

    /// Returns true if `ordering` (of column against operand) satisfies
    /// this operator.
    #[inline]
    #[must_use]
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::Less => ordering == Ordering::Less,
            Self::Greater => ordering == Ordering::Greater,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
            Self::NotEqual => ordering != Ordering::Equal,
        }
    }
}

impl TryFrom<u8> for Operator {
    type Error = ScqlError;

    fn try_from(code: u8) -> ScqlResult<Self> {
        match code {
            0x3D => Ok(Self::Equal),
            0x3C => Ok(Self::Less),
            0x3E => Ok(Self::Greater),
            0x4C => Ok(Self::LessOrEqual),
            0x47 => Ok(Self::GreaterOrEqual),
            0x23 => Ok(Self::NotEqual),
            _ => Err(ScqlError::UnknownOperator { code }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Compares two values as unsigned bytes, lexicographically.
#[inline]
#[must_use]
pub fn compare_bytes(left: &[u8], right: &[u8]) -> Ordering {
    // Slice ordering on u8 is exactly unsigned lexicographic.
    left.cmp(right)
}

/// Evaluates `column operator operand` against one encoded row.
///
/// # Example
///
/// ```rust
/// use scql_engine::codec;
/// use scql_engine::predicate::{evaluate, Operator};
///
/// let row = codec::encode_row(["b", "7"]).unwrap();
/// assert!(evaluate(&row, 0, Operator::Greater, b"a").unwrap());
/// assert!(!evaluate(&row, 1, Operator::Equal, b"8").unwrap());
/// ```
pub fn evaluate(
    row: &[u8],
    column_index: usize,
    operator: Operator,
    operand: &[u8],
) -> ScqlResult<bool> {
    let value = codec::decode_column(row, column_index)?;
    Ok(operator.matches(compare_bytes(value, operand)))
}

/// A filter condition: `column operator operand`.
///
/// Filters name their column; the table resolves the name against its own
/// schema at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: ObjectName,
    operator: Operator,
    operand: Bytes,
}

impl Filter {
    /// Creates a filter.
    pub fn new(
        column: impl Into<ObjectName>,
        operator: Operator,
        operand: impl Into<Bytes>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            operand: operand.into(),
        }
    }

    /// Creates a filter from a raw operator code.
    ///
    /// Fails with [`ScqlError::UnknownOperator`] for unknown codes.
    pub fn from_code(
        column: impl Into<ObjectName>,
        code: u8,
        operand: impl Into<Bytes>,
    ) -> ScqlResult<Self> {
        Ok(Self::new(column, Operator::try_from(code)?, operand))
    }

    /// Returns the column name.
    #[inline]
    #[must_use]
    pub fn column(&self) -> &ObjectName {
        &self.column
    }

    /// Returns the operator.
    #[inline]
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operand.
    #[inline]
    #[must_use]
    pub fn operand(&self) -> &Bytes {
        &self.operand
    }

    /// Binds the filter to a resolved column index.
    #[must_use]
    pub fn bind(&self, column_index: usize) -> BoundFilter<'_> {
        BoundFilter {
            column_index,
            operator: self.operator,
            operand: &self.operand,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.column, self.operator, self.operand)
    }
}

/// A filter whose column has been resolved to an index.
#[derive(Debug, Clone, Copy)]
pub struct BoundFilter<'a> {
    column_index: usize,
    operator: Operator,
    operand: &'a [u8],
}

impl BoundFilter<'_> {
    /// Evaluates the filter against one encoded row.
    pub fn matches(&self, row: &[u8]) -> ScqlResult<bool> {
        evaluate(row, self.column_index, self.operator, self.operand)
    }
}
