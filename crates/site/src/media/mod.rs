//! Local media processing: square cropping and storage path naming.

pub mod crop;
pub mod storage_path;

pub use crop::{CropError, CropRect, JPEG_QUALITY, crop_to_jpeg, crop_to_jpeg_blocking};
pub use storage_path::{file_extension, gallery_object_path, profile_object_path};
