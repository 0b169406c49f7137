//! System-wide constants for SCQL.
//!
//! The capacity limits mirror the values of the original card profile. Every
//! conforming engine enforces them identically; [`crate::config::Limits`]
//! defaults to exactly these numbers.

// =============================================================================
// Catalog Limits
// =============================================================================

/// Maximum number of tables the catalog can hold.
pub const MAX_TABLES: usize = 8;

/// Maximum number of views the catalog can hold.
pub const MAX_VIEWS: usize = 5;

/// Maximum number of columns in a table.
pub const MAX_COLUMNS: usize = 10;

/// Maximum length of a column name in bytes.
pub const MAX_COLUMN_NAME_LENGTH: usize = 8;

/// Maximum length of a single column value in bytes.
pub const MAX_DATA_COLUMN_LENGTH: usize = 15;

/// Maximum number of rows stored in one table.
pub const MAX_ROWS: usize = 25;

// =============================================================================
// Encoding Limits
// =============================================================================

/// Largest value a one-byte length prefix can describe.
///
/// Object names, column names and column values are all encoded as
/// `(length_byte, bytes)`, so nothing may exceed this.
pub const MAX_LP_LENGTH: usize = u8::MAX as usize;

// =============================================================================
// Image Format
// =============================================================================

/// Magic bytes at the start of a persisted catalog image.
pub const IMAGE_MAGIC: [u8; 4] = *b"SCQL";

/// Version number of the catalog image layout.
pub const IMAGE_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_fit_length_prefix() {
        assert!(MAX_COLUMN_NAME_LENGTH <= MAX_LP_LENGTH);
        assert!(MAX_DATA_COLUMN_LENGTH <= MAX_LP_LENGTH);
        assert!(MAX_COLUMNS <= MAX_LP_LENGTH);
    }

    #[test]
    fn test_row_fits_in_short_apdu() {
        // A fetched row is prefixed by one column count byte and must fit
        // the 255 byte data field of a short response.
        let widest_row = MAX_COLUMNS * (MAX_DATA_COLUMN_LENGTH + 1);
        assert!(widest_row < MAX_LP_LENGTH);
    }
}
