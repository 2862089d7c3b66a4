//! Dedicated inference thread and its async handle.
//!
//! Model load happens before the thread spawns, so a handle only exists for
//! a fully initialized provider — the readiness gate the scan loop relies
//! on. Requests cross an mpsc channel and replies come back on oneshots,
//! keeping ONNX inference off the async runtime.

use crate::detector::{DetectorError, FaceDetector};
use crate::embedder::{EmbedderError, FaceEmbedder};
use attend_core::{DetectedFace, EmbeddingProvider, Frame, ProviderError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum InitError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("embedder: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("inference thread: {0}")]
    Thread(#[from] std::io::Error),
}

enum Request {
    Detect {
        frame: Frame,
        reply: oneshot::Sender<Result<Vec<DetectedFace>, ProviderError>>,
    },
}

/// Clone-safe handle to the inference thread.
#[derive(Clone)]
pub struct ProviderHandle {
    tx: mpsc::Sender<Request>,
}

impl EmbeddingProvider for ProviderHandle {
    async fn detect_faces(&self, frame: &Frame) -> Result<Vec<DetectedFace>, ProviderError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Detect {
                frame: frame.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProviderError::WorkerExited)?;
        reply_rx.await.map_err(|_| ProviderError::WorkerExited)?
    }
}

/// Load both models and spawn the inference thread.
///
/// Fails fast: an unloadable model returns an error here and recognition
/// never starts. The thread exits when the last handle is dropped.
pub fn spawn_provider(
    detector_path: &str,
    embedder_path: &str,
) -> Result<ProviderHandle, InitError> {
    let mut detector = FaceDetector::load(detector_path)?;
    let mut embedder = FaceEmbedder::load(embedder_path)?;

    let (tx, mut rx) = mpsc::channel::<Request>(2);

    std::thread::Builder::new()
        .name("attend-inference".into())
        .spawn(move || {
            tracing::info!("inference thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    Request::Detect { frame, reply } => {
                        let _ = reply.send(analyze(&mut detector, &mut embedder, &frame));
                    }
                }
            }
            tracing::info!("inference thread exiting");
        })?;

    Ok(ProviderHandle { tx })
}

/// Detect every face in the frame and embed each one. A face whose
/// embedding fails is skipped with a warning; the tick still sees the rest.
fn analyze(
    detector: &mut FaceDetector,
    embedder: &mut FaceEmbedder,
    frame: &Frame,
) -> Result<Vec<DetectedFace>, ProviderError> {
    let boxes = detector
        .detect(frame)
        .map_err(|e| ProviderError::Detection(e.to_string()))?;

    let mut faces = Vec::with_capacity(boxes.len());
    for bbox in boxes {
        match embedder.extract(frame, &bbox) {
            Ok(embedding) => faces.push(DetectedFace { bbox, embedding }),
            Err(err) => {
                tracing::warn!(error = %err, "embedding extraction failed for a face; skipping it");
            }
        }
    }

    Ok(faces)
}
