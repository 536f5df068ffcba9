//! `fieldorder-media` — normalization of uploaded images.
//!
//! Converts arbitrary uploaded raster formats (including camera-native
//! HEIC/HEIF, via an injected pre-decoder) into one canonical storable
//! encoding: base64 JPEG at quality 90, flattened onto an opaque white
//! background. Failures are per-file; a batch never aborts because one file
//! is bad.

pub mod normalizer;

pub use normalizer::{
    is_image_file, BatchOutcome, CameraDecoder, NormalizeError, NormalizedImage, Normalizer,
    RejectedFile, UploadedFile,
};
