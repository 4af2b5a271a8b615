//! Error types module
//!
//! Every error the uploader reports is scoped to a single file (validation
//! time) or a single unit (upload time). The `Display` output of each error is
//! the human-readable message carried by the `error` event.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes such as size limits
    Debug,
    /// Warning level - for per-file or per-unit failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Failure to decode a file or render its thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("fetch file info error.")]
    Info,

    #[error("fetch file thumbnail error.")]
    Thumbnail,
}

/// Per-file validation rejection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("file type not allowed.")]
    UnsupportedType { content_type: String },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("file size must under {max} bytes.")]
    TooLarge { size: u64, max: u64 },

    #[error("file width must be bigger than {min}px.")]
    TooNarrow { width: u32, min: u32 },

    #[error("file height must be bigger than {min}px.")]
    TooShort { height: u32, min: u32 },

    #[error("file duration must be smaller than {max}s.")]
    TooLong { duration: f64, max: f64 },
}

/// Per-unit upload failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Credential(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Registration(String),
}

impl ErrorMetadata for ProbeError {
    fn error_code(&self) -> &'static str {
        "PROBE_ERROR"
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

impl ErrorMetadata for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
            ValidationError::Probe(e) => e.error_code(),
            ValidationError::TooLarge { .. } => "TOO_LARGE",
            ValidationError::TooNarrow { .. } => "TOO_NARROW",
            ValidationError::TooShort { .. } => "TOO_SHORT",
            ValidationError::TooLong { .. } => "TOO_LONG",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ValidationError::Probe(_) => LogLevel::Warn,
            _ => LogLevel::Debug,
        }
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            UploadError::Credential(_) => "CREDENTIAL_ERROR",
            UploadError::Storage(_) => "STORAGE_ERROR",
            UploadError::Registration(_) => "REGISTRATION_ERROR",
        }
    }

    // No layer retries; the caller re-selects the file instead.
    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}
