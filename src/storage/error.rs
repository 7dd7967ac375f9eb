//! Error types for storage operations

use std::fmt;
use std::path::PathBuf;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while constructing a backend or sending a record
#[derive(Debug)]
pub enum StorageError {
    /// Invalid configuration
    InvalidConfig(String),

    /// The configured time zone identifier is unknown
    UnknownTimeZone { location: String, reason: String },

    /// The configured time pattern contains an invalid specifier
    InvalidTimeFormat(String),

    /// The destination file could not be opened
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error while writing a record
    IoError(std::io::Error),

    /// The backend does not accept this kind of record.
    ///
    /// This is an integration fault, not a runtime failure.
    Unsupported { backend: &'static str },

    /// The backend sink was already released
    Closed,
}

impl StorageError {
    /// True for errors caused by calling a backend outside its capabilities
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, StorageError::Unsupported { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidConfig(msg) => write!(f, "invalid storage configuration: {}", msg),
            StorageError::UnknownTimeZone { location, reason } => {
                write!(f, "unknown time zone {:?}: {}", location, reason)
            }
            StorageError::InvalidTimeFormat(format) => {
                write!(f, "invalid time format {:?}", format)
            }
            StorageError::Open { path, source } => {
                write!(f, "failed to open {}: {}", path.display(), source)
            }
            StorageError::IoError(err) => write!(f, "I/O error: {}", err),
            StorageError::Unsupported { backend } => write!(
                f,
                "contract violation: the {} backend does not accept events",
                backend
            ),
            StorageError::Closed => write!(f, "storage sink is closed"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(err) => Some(err),
            StorageError::Open { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}
