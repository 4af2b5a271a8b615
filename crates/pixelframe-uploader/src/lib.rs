//! Pixelframe Uploader
//!
//! Turns a user's file selection into a batch of uploads. Files are validated
//! and capped by [`pixelframe_processing`], then each accepted unit is taken
//! through credentials, storage and registration concurrently. Progress and
//! outcomes are published as [`UploaderEvent`]s.
//!
//! [`UploaderEvent`]: pixelframe_core::UploaderEvent

pub mod events;
pub mod gate;
pub mod pipeline;
pub mod services;
pub mod uploader;

// Re-export commonly used types
pub use events::EventBus;
pub use gate::{ProcessingGate, BUSY_MESSAGE};
pub use pipeline::{BatchHandle, UnitTable, UploadPipeline, UploadServices};
pub use services::{
    split_service_error, AssetRegistrar, CredentialProvider, HttpServiceClient,
    DEFAULT_SERVICE_ERROR,
};
pub use uploader::Uploader;
