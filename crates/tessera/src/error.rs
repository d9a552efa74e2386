//! Error types for Tessera.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or loading gesture configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The long-press delay factor is outside its allowed range.
    #[error("delay factor {value} is outside the allowed range [{min}, {max}]")]
    DelayFactorOutOfRange {
        /// The rejected value.
        value: f64,
        /// Smallest accepted factor.
        min: f64,
        /// Largest accepted factor.
        max: f64,
    },

    /// The movement threshold is negative or not a number.
    #[error("movement threshold {0} must be a finite, non-negative distance")]
    InvalidMovementThreshold(f32),

    /// The settings text is not valid TOML for this schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The settings file could not be read or written.
    #[error("settings file {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised by file attribute persistence.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The filesystem does not support extended attributes.
    #[error("extended attributes are not supported on this platform or filesystem")]
    Unsupported,

    /// An attribute could not be read, written or removed.
    #[error("attribute {key} on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The attribute key.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A stored attribute value could not be decoded.
    #[error("attribute {key} holds an invalid value: {value:?}")]
    InvalidValue {
        /// The attribute key.
        key: String,
        /// The raw stored text.
        value: String,
    },
}

/// A specialized Result type for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A specialized Result type for attribute persistence.
pub type AttributeResult<T> = std::result::Result<T, AttributeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_factor_message_names_range() {
        let err = ConfigError::DelayFactorOutOfRange {
            value: 5.0,
            min: 0.5,
            max: 4.0,
        };
        assert_eq!(
            err.to_string(),
            "delay factor 5 is outside the allowed range [0.5, 4]"
        );
    }

    #[test]
    fn test_attribute_io_keeps_source() {
        use std::error::Error as _;

        let err = AttributeError::Io {
            path: PathBuf::from("/tmp/doc.txt"),
            key: "user.sugar.title".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("user.sugar.title"));
        assert!(err.source().is_some());
    }
}
