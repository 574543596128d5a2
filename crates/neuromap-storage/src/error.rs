//! Error types for the storage layer

use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Invalid magic number in binary format
    #[error("Invalid magic number: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Expected magic number
        expected: [u8; 4],
        /// Found magic number
        found: [u8; 4],
    },

    /// Unsupported version
    #[error("Unsupported version: {version}, supported: {supported}")]
    UnsupportedVersion {
        /// Version found
        version: u32,
        /// Supported version
        supported: u32,
    },

    /// Checksum verification failed
    #[error("Checksum verification failed: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Expected checksum
        expected: u32,
        /// Computed checksum
        computed: u32,
    },

    /// Invalid file format or corrupted data
    #[error("Invalid format: {reason}")]
    InvalidFormat {
        /// Reason for invalid format
        reason: String,
    },

    /// A value does not fit the fixed width of its record field
    #[error("Field '{field}' value {value} exceeds the representable maximum {max}")]
    FieldOverflow {
        /// Field name
        field: &'static str,
        /// Offending value
        value: u64,
        /// Largest representable value
        max: u64,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Source I/O error
        source: std::io::Error,
    },
}

impl StorageError {
    /// Create an invalid format error
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Create a field overflow error
    pub fn field_overflow(field: &'static str, value: u64, max: u64) -> Self {
        Self::FieldOverflow { field, value, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StorageError::invalid_format("test reason");
        assert!(matches!(err, StorageError::InvalidFormat { .. }));

        let err = StorageError::field_overflow("delay", 70_000, u16::MAX as u64);
        assert!(matches!(err, StorageError::FieldOverflow { field: "delay", .. }));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::InvalidMagic {
            expected: [0x53, 0x59, 0x4E, 0x42],
            found: [0x00, 0x00, 0x00, 0x00],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid magic number"));

        let err = StorageError::field_overflow("source", 5_000_000_000, u32::MAX as u64);
        assert!(err.to_string().contains("'source'"));
    }
}
