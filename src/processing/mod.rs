//! # Processing Module
//!
//! Client-side image preparation performed before any network call.

pub mod preprocess;

// Re-export commonly used types for convenience
pub use preprocess::{ImagePreprocessor, PreparedImage, MAX_UPLOAD_BYTES, validate_upload};
