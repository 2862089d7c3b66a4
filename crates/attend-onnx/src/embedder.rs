//! 128-dimensional face embedder via ONNX Runtime.
//!
//! The detected box is cropped with a margin, resized to the model input,
//! and embedded; outputs are L2-normalized so Euclidean distance behaves as
//! the attendance matching metric.

use crate::resize::resize_bilinear;
use attend_core::{Embedding, FaceBox, Frame};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const EMB_INPUT_SIZE: usize = 112;
const EMB_DIM: usize = 128;
const EMB_MEAN: f32 = 127.5;
const EMB_STD: f32 = 127.5;
/// Context kept around the detector box before cropping.
const CROP_MARGIN: f32 = 0.25;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the embedding ONNX model. Fails fast when the file is missing.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "loaded face embedding model");

        Ok(Self { session })
    }

    /// Extract the embedding for one detected face.
    pub fn extract(&mut self, frame: &Frame, bbox: &FaceBox) -> Result<Embedding, EmbedderError> {
        let crop = crop_face(frame, bbox);
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding: {e}")))?;

        if raw.len() != EMB_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {EMB_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        let mut embedding = Embedding::new(raw.to_vec());
        embedding.normalize();
        Ok(embedding)
    }
}

/// Crop the face region with margin, clamped to the frame, resized to the
/// model input size.
fn crop_face(frame: &Frame, bbox: &FaceBox) -> Vec<u8> {
    let fw = frame.width as f32;
    let fh = frame.height as f32;

    let mx = bbox.width * CROP_MARGIN;
    let my = bbox.height * CROP_MARGIN;
    // Clamp so the region always stays inside the frame, even for boxes
    // touching the border.
    let x0 = ((bbox.x - mx).max(0.0) as usize).min(fw as usize - 1);
    let y0 = ((bbox.y - my).max(0.0) as usize).min(fh as usize - 1);
    let x1 = ((bbox.x + bbox.width + mx).clamp(0.0, fw) as usize).max(x0 + 1);
    let y1 = ((bbox.y + bbox.height + my).clamp(0.0, fh) as usize).max(y0 + 1);

    let w = x1 - x0;
    let h = y1 - y0;

    let mut region = vec![0u8; w * h];
    let stride = frame.width as usize;
    for (row, y) in (y0..y1).enumerate() {
        let src = y * stride;
        region[row * w..(row + 1) * w].copy_from_slice(&frame.data[src + x0..src + x0 + w]);
    }

    resize_bilinear(&region, w, h, EMB_INPUT_SIZE, EMB_INPUT_SIZE)
}

/// NCHW float tensor from a grayscale crop, channel-replicated and
/// symmetrically normalized.
fn preprocess(crop: &[u8]) -> Array4<f32> {
    let size = EMB_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let pixel = crop.get(y * size + x).copied().unwrap_or(0) as f32;
            let normalized = (pixel - EMB_MEAN) / EMB_STD;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, fill: u8) -> Frame {
        Frame {
            data: vec![fill; (width * height) as usize],
            width,
            height,
            sequence: 0,
        }
    }

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
            score: 0.9,
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let crop = vec![128u8; EMB_INPUT_SIZE * EMB_INPUT_SIZE];
        let tensor = preprocess(&crop);
        assert_eq!(tensor.shape(), &[1, 3, EMB_INPUT_SIZE, EMB_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let crop = vec![255u8; EMB_INPUT_SIZE * EMB_INPUT_SIZE];
        let tensor = preprocess(&crop);
        let expected = (255.0 - EMB_MEAN) / EMB_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
        // Mid-gray lands at zero under symmetric normalization.
        let crop = vec![128u8; EMB_INPUT_SIZE * EMB_INPUT_SIZE];
        let tensor = preprocess(&crop);
        assert!(tensor[[0, 1, 5, 5]].abs() < 0.01);
    }

    #[test]
    fn test_crop_uniform_frame_stays_uniform() {
        let crop = crop_face(&frame(200, 200, 77), &bbox(50.0, 50.0, 60.0, 60.0));
        assert_eq!(crop.len(), EMB_INPUT_SIZE * EMB_INPUT_SIZE);
        assert!(crop.iter().all(|&p| p == 77));
    }

    #[test]
    fn test_crop_clamps_at_frame_edges() {
        // Box with margin spilling past the top-left corner.
        let crop = crop_face(&frame(100, 100, 42), &bbox(0.0, 0.0, 40.0, 40.0));
        assert_eq!(crop.len(), EMB_INPUT_SIZE * EMB_INPUT_SIZE);
        assert!(crop.iter().all(|&p| p == 42));
    }
}
