//! Pixelframe Core Library
//!
//! This crate provides the domain models, error types, configuration and event
//! types shared by every Pixelframe uploader component.

pub mod accept;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use accept::AcceptList;
pub use config::{
    Limits, ProbeConfig, RegistrationServiceConfig, ServicesConfig, StorageConfig,
    TokenServiceConfig, UploaderConfig,
};
pub use error::{ErrorMetadata, LogLevel, ProbeError, UploadError, ValidationError};
pub use events::{EventSink, UploaderEvent};
pub use models::{
    AcceptedFile, Batch, MediaKind, PickedUnit, ProbedFile, RawFile, Unit, UnitId, UnitState,
    UnitSummary,
};
pub use storage_types::StorageBackend;
