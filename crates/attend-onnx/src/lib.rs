//! attend-onnx — embedding provider backed by ONNX Runtime.
//!
//! Two models: a face detector (fused-NMS export emitting one `[N, 15]`
//! detection tensor) and a 128-dimensional face embedder. Both load once at
//! startup — a failed load aborts before any recognition can start — and run
//! on a dedicated worker thread behind a channel, so the scan loop's async
//! ticks never block on CPU inference.

pub mod detector;
pub mod embedder;
mod resize;
pub mod runtime;

pub use detector::{DetectorError, FaceDetector};
pub use embedder::{EmbedderError, FaceEmbedder};
pub use runtime::{spawn_provider, InitError, ProviderHandle};
