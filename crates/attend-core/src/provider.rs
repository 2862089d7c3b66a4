//! Contracts for the frame source and the embedding provider.
//!
//! The embedding model is an external capability: given a frame it yields
//! zero or more detected faces, each with a bounding box and a fixed-length
//! embedding. Providers do their one-time initialization (model load)
//! before a handle exists — holding a provider value implies readiness, and
//! a failed load is surfaced to the operator before any scan starts.

use crate::types::{Embedding, FaceBox};
use thiserror::Error;

/// A captured grayscale frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Grayscale pixels, `width * height` bytes, row-major.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

impl Frame {
    /// Average pixel brightness (0.0–255.0).
    pub fn mean_luma(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

/// One detected face with its embedding.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: FaceBox,
    pub embedding: Embedding,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("embedding extraction failed: {0}")]
    Embedding(String),
    #[error("provider worker exited")]
    WorkerExited,
}

/// Source of camera frames for capture and scanning.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    async fn next_frame(&mut self) -> Result<Frame, ProviderError>;
}

/// Face detection + embedding extraction capability.
#[allow(async_fn_in_trait)]
pub trait EmbeddingProvider {
    /// Detect faces in a frame and extract one embedding per face.
    /// An empty result means no face was found; it is not an error.
    async fn detect_faces(&self, frame: &Frame) -> Result<Vec<DetectedFace>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_luma() {
        let frame = Frame {
            data: vec![0, 255, 128, 127],
            width: 2,
            height: 2,
            sequence: 0,
        };
        assert!((frame.mean_luma() - 127.5).abs() < 1e-3);
    }

    #[test]
    fn test_mean_luma_empty() {
        let frame = Frame {
            data: vec![],
            width: 0,
            height: 0,
            sequence: 0,
        };
        assert_eq!(frame.mean_luma(), 0.0);
    }
}
