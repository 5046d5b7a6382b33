//! Error types for the sb3-scrambler library.
//!
//! Fatal conditions (bad configuration, exhausted name spaces, package I/O)
//! are represented here and propagated with `?`. Structural problems found
//! inside a manifest are not errors: the walker records them as
//! [`Anomaly`](crate::api::results::Anomaly) values and keeps going.

use std::io;

use thiserror::Error;

/// Main result type for scrambler operations.
pub type Result<T> = std::result::Result<T, ScramblerError>;

/// Error type for all scrambler operations.
#[derive(Error, Debug)]
pub enum ScramblerError {
    /// I/O related errors (reading or writing packages and config files)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Malformed configuration, raised before any manifest mutation
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration key that caused the error
        field: Option<String>,
    },

    /// A scope needs more unique names than the strategy can produce
    #[error(
        "Name space exhausted for {category} in {scope}: {required} unique names required, {available} available"
    )]
    GenerationExhausted {
        /// Symbol category being renamed
        category: String,
        /// Scope that ran out of names
        scope: String,
        /// Number of distinct names the scope needs
        required: u128,
        /// Number of distinct names the strategy can produce
        available: u128,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data type being serialized
        data_type: Option<String>,
        /// Additional context
        context: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The input path is not a Scratch 3 project package
    #[error("Not a Scratch project: {path}")]
    NotAScratchFile {
        /// Offending path
        path: String,
    },

    /// Errors reading or writing the zip container
    #[error("Package error: {message}")]
    Package {
        /// Error description
        message: String,
        /// Additional context (usually the archive entry)
        context: Option<String>,
    },
}

impl ScramblerError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new exhaustion error
    pub fn exhausted(
        category: impl ToString,
        scope: impl ToString,
        required: u128,
        available: u128,
    ) -> Self {
        Self::GenerationExhausted {
            category: category.to_string(),
            scope: scope.to_string(),
            required,
            available,
        }
    }

    /// Create a new not-a-project error
    pub fn not_a_scratch_file(path: impl Into<String>) -> Self {
        Self::NotAScratchFile { path: path.into() }
    }

    /// Create a new package error
    pub fn package(message: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Package { context: ctx, .. } | Self::Serialization { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            _ => {}
        }
        self
    }

    /// Whether the error was raised by configuration parsing or validation
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<io::Error> for ScramblerError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for ScramblerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            context: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for ScramblerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            context: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<zip::result::ZipError> for ScramblerError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(source) => Self::io("Zip archive I/O failed", source),
            other => Self::package(format!("Zip archive error: {other}")),
        }
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ScramblerError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}
