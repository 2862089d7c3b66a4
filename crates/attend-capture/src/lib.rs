//! attend-capture — V4L2 camera access for the attendance scanner.
//!
//! Produces the grayscale [`attend_core::Frame`]s the provider consumes,
//! with pixel-format conversion and a brightness floor so enrollment never
//! accepts an unusable capture.

pub mod camera;
pub mod convert;

pub use camera::{CameraError, CameraSource, DeviceInfo};
pub use convert::{is_too_dark, yuyv_to_gray, MIN_MEAN_LUMA};
