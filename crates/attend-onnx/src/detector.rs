//! Face detector via ONNX Runtime.
//!
//! Expects a fused-NMS detection export: a single `[N, 15]` float output
//! per image, each row `[x, y, w, h, lmk0x, lmk0y, ..., lmk4y, score]` in
//! input-tensor coordinates. A light IoU pass is still applied on top in
//! case the export keeps overlapping boxes.

use crate::resize::resize_bilinear;
use attend_core::{FaceBox, Frame};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const DET_INPUT_SIZE: usize = 320;
const DET_SCORE_THRESHOLD: f32 = 0.6;
const DET_NMS_IOU: f32 = 0.3;
/// x, y, w, h, five landmark pairs, score.
const DET_FIELDS: usize = 15;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Fused-NMS face detector.
pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    /// Load the detection ONNX model. Fails fast when the file is missing.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face detection model"
        );

        Ok(Self { session })
    }

    /// Detect faces in a grayscale frame, in frame pixel coordinates,
    /// sorted by descending score.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, DetectorError> {
        let (input, scale_x, scale_y) = preprocess(frame);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("detections: {e}")))?;

        let boxes = decode(
            data,
            scale_x,
            scale_y,
            frame.width as f32,
            frame.height as f32,
            DET_SCORE_THRESHOLD,
        );

        Ok(nms(boxes, DET_NMS_IOU))
    }
}

/// Resize to the model input and replicate the grayscale channel into NCHW
/// RGB. Returns the tensor plus the per-axis factors that map input-tensor
/// coordinates back to frame pixels.
fn preprocess(frame: &Frame) -> (Array4<f32>, f32, f32) {
    let size = DET_INPUT_SIZE;
    let resized = resize_bilinear(
        &frame.data,
        frame.width as usize,
        frame.height as usize,
        size,
        size,
    );

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            let v = resized[y * size + x] as f32;
            tensor[[0, 0, y, x]] = v;
            tensor[[0, 1, y, x]] = v;
            tensor[[0, 2, y, x]] = v;
        }
    }

    let scale_x = frame.width as f32 / size as f32;
    let scale_y = frame.height as f32 / size as f32;
    (tensor, scale_x, scale_y)
}

/// Decode `[N, 15]` rows into frame-space boxes above the score threshold.
fn decode(
    data: &[f32],
    scale_x: f32,
    scale_y: f32,
    frame_w: f32,
    frame_h: f32,
    threshold: f32,
) -> Vec<FaceBox> {
    let mut boxes = Vec::new();

    for row in data.chunks_exact(DET_FIELDS) {
        let score = row[DET_FIELDS - 1];
        if score < threshold {
            continue;
        }

        let x = (row[0] * scale_x).clamp(0.0, frame_w);
        let y = (row[1] * scale_y).clamp(0.0, frame_h);
        let w = (row[2] * scale_x).min(frame_w - x);
        let h = (row[3] * scale_y).min(frame_h - y);
        if w <= 0.0 || h <= 0.0 {
            continue;
        }

        boxes.push(FaceBox {
            x,
            y,
            width: w,
            height: h,
            score,
        });
    }

    boxes
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Greedy non-maximum suppression, keeping the highest-scoring box of each
/// overlapping cluster.
fn nms(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}
