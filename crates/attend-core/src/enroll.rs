//! Enrollment capture session — sample collection rules and submission gates.
//!
//! A capture is accepted only when the provider reports exactly one face;
//! ambiguous frames never enter the sample set. Submission is gated on the
//! minimum sample count locally, before any network call, and tolerates
//! partial re-embedding failure as long as at least one descriptor survives.

use crate::provider::{DetectedFace, Frame};
use crate::types::Embedding;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const DEFAULT_MIN_SAMPLES: usize = 5;
pub const DEFAULT_MAX_SAMPLES: usize = 10;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no face found in the captured frame")]
    NoFace,
    #[error("{0} faces found — enrollment captures must contain exactly one")]
    MultipleFaces(usize),
    #[error("sample limit reached ({0})")]
    AtCapacity(usize),
    #[error("need at least {min} samples, have {have}")]
    BelowMinimum { min: usize, have: usize },
    #[error("no usable descriptors could be extracted from any sample")]
    NoDescriptors,
}

/// One collected enrollment capture, kept until submission succeeds.
#[derive(Debug, Clone)]
pub struct PendingSample {
    pub frame: Frame,
    pub embedding: Embedding,
    pub captured_at: DateTime<Utc>,
}

/// In-progress face registration: collects validated single-face captures
/// until the configured sample range is satisfied.
#[derive(Debug)]
pub struct CaptureSession {
    min: usize,
    max: usize,
    samples: Vec<PendingSample>,
}

impl CaptureSession {
    pub fn new(min: usize, max: usize) -> Self {
        debug_assert!(min >= 1 && min <= max);
        Self {
            min,
            max,
            samples: Vec::new(),
        }
    }

    /// Validate a capture attempt and store it as a sample.
    ///
    /// Returns the new sample count on success. Rejections leave the
    /// previously collected samples untouched.
    pub fn accept(
        &mut self,
        frame: Frame,
        mut detections: Vec<DetectedFace>,
    ) -> Result<usize, CaptureError> {
        if self.samples.len() >= self.max {
            return Err(CaptureError::AtCapacity(self.max));
        }
        let face = match detections.len() {
            0 => return Err(CaptureError::NoFace),
            1 => detections.remove(0),
            n => return Err(CaptureError::MultipleFaces(n)),
        };

        self.samples.push(PendingSample {
            frame,
            embedding: face.embedding,
            captured_at: Utc::now(),
        });
        tracing::debug!(count = self.samples.len(), min = self.min, "enrollment sample accepted");
        Ok(self.samples.len())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Captures still needed before submission unlocks.
    pub fn remaining(&self) -> usize {
        self.min.saturating_sub(self.samples.len())
    }

    pub fn can_submit(&self) -> bool {
        self.samples.len() >= self.min
    }

    pub fn samples(&self) -> &[PendingSample] {
        &self.samples
    }

    /// The local gate called before any network call: submission with fewer
    /// than the minimum number of samples is rejected here.
    pub fn require_submittable(&self) -> Result<(), CaptureError> {
        if self.samples.len() < self.min {
            return Err(CaptureError::BelowMinimum {
                min: self.min,
                have: self.samples.len(),
            });
        }
        Ok(())
    }

    /// Validate per-sample re-embedding results at submission time.
    ///
    /// Each entry is the outcome of re-running extraction on one stored
    /// sample (`None` when no usable descriptor came out). Partial success
    /// is accepted — the matcher is robust to a smaller reference set — and
    /// only a fully empty outcome fails the submission, leaving the samples
    /// in place for retry.
    pub fn usable_descriptors(
        results: Vec<Option<Embedding>>,
    ) -> Result<Vec<Embedding>, CaptureError> {
        let total = results.len();
        let usable: Vec<Embedding> = results.into_iter().flatten().collect();
        if usable.is_empty() {
            return Err(CaptureError::NoDescriptors);
        }
        if usable.len() < total {
            tracing::warn!(
                usable = usable.len(),
                total,
                "some enrollment samples failed re-embedding; continuing with subset"
            );
        }
        Ok(usable)
    }
}
