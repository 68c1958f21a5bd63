//! Error types and utilities for configuration lookup.
//!
//! Absence of a key is never an error: lookups return `Ok(None)`. Every variant
//! below is a configuration error that aborts the current lookup, and no layer
//! is allowed to turn one back into absence.

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading, resolving or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing failed
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// A required configuration key has no value
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// A present value could not be converted to the requested type
    #[error("Type conversion error for '{key}': cannot convert {from} to {to}")]
    TypeConversion {
        key: String,
        from: String,
        to: String,
    },

    /// No registered format handles the given file name
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Candidate resolution found nothing usable for a required configuration
    #[error("No supported configuration resource found (searched: {searched})")]
    NoSupportedResource { searched: String },

    /// A directory-service lookup failed for a reason other than a missing name
    #[error("Directory lookup failed for '{key}': {message}")]
    Directory { key: String, message: String },

    /// File watching operation failed
    #[error("File watching error: {0}")]
    FileWatch(String),

    /// Deserialization into a user type failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Unsupported operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}

impl ConfigError {
    /// Creates a new parse error with context.
    pub fn parse_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new type conversion error for `key`.
    pub fn type_conversion(
        key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::TypeConversion {
            key: key.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates a new unsupported format error.
    pub fn unsupported_format(name: impl Into<String>) -> Self {
        Self::UnsupportedFormat(name.into())
    }

    /// Creates the error reported when no candidate could back a required configuration.
    pub fn no_supported_resource(searched: impl Into<String>) -> Self {
        Self::NoSupportedResource {
            searched: searched.into(),
        }
    }

    /// Creates a new directory lookup error.
    pub fn directory(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Directory {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new file watch error.
    pub fn file_watch(message: impl Into<String>) -> Self {
        Self::FileWatch(message.into())
    }

    /// Creates a new deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Creates a new invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Creates a new unsupported operation error.
    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// Returns true if this error reports a missing required key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, ConfigError::KeyNotFound { .. })
    }

    /// Returns the missing key carried by a [`ConfigError::KeyNotFound`].
    pub fn missing_key(&self) -> Option<&str> {
        match self {
            ConfigError::KeyNotFound { key } => Some(key),
            _ => None,
        }
    }

    /// Returns true if this error is related to type conversion.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self, ConfigError::TypeConversion { .. })
    }

    /// Returns true if this error is related to parsing.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ConfigError::Parse { .. })
    }

    /// Returns true if this error is related to IO operations.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ConfigError::Io(_))
    }

    /// Returns true if this error is an unsupported operation such as `save`.
    pub fn is_unsupported_operation(&self) -> bool {
        matches!(self, ConfigError::UnsupportedOperation(_))
    }
}

/// Extension trait for adding context to Results.
pub trait ConfigResultExt<T> {
    /// Adds context to a ConfigError if the result is an error.
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ConfigResultExt<T> for ConfigResult<T> {
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| match err {
            ConfigError::Parse {
                source_name,
                message,
            } => ConfigError::Parse {
                source_name,
                message: format!("{}: {}", f(), message),
            },
            other => other,
        })
    }
}
