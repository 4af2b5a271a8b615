//! Pixelframe Media Processing Library
//!
//! Client-side media introspection and batch formation: probing files for
//! dimensions/duration, rendering square thumbnails, validating files against
//! per-kind limits and selecting the final ordered batch.

pub mod probe;
pub mod selector;
pub mod thumbnail;
pub mod validator;

// Re-export commonly used types
pub use probe::{ImageProbe, MediaProbe, NativeProbe, VideoProbe};
pub use selector::{BatchSelector, Selection, ValidationPolicy};
pub use thumbnail::{square_crop, CropRect, THUMBNAIL_QUALITY, THUMBNAIL_SIZE};
pub use validator::MediaValidator;
