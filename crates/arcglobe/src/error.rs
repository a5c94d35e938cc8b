//! Error types for the arcglobe crate.

use std::fmt;

/// Result type for arcglobe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in arcglobe operations.
#[derive(Debug)]
pub enum Error {
    /// The scheduler was given no points to sample flight endpoints from.
    EmptyPointSet,
    /// A configuration value is out of range.
    InvalidConfig {
        /// The offending field.
        field: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// The land-mask image could not be read or decoded.
    MapImage {
        /// Where the image came from.
        source: String,
        /// The error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyPointSet => write!(f, "no surface points available for flights"),
            Error::InvalidConfig { field, detail } => {
                write!(f, "invalid {field}: {detail}")
            }
            Error::MapImage { source, message } => {
                write!(f, "failed to read map image {source}: {message}")
            }
        }
    }
}

impl std::error::Error for Error {}
