//! Core domain types — embeddings, face samples, roster projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric student identifier, as assigned by the campus backend.
pub type StudentId = i64;

/// Face embedding vector (128-dimensional in the reference deployment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance to another embedding.
    ///
    /// Embeddings are L2-normalized at extraction time, so for same-model
    /// vectors the distance behaves as a normalized metric: roughly 0 for
    /// the same face, approaching 1 for unrelated faces.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// L2-normalize in place. Zero vectors are left untouched.
    pub fn normalize(&mut self) {
        let norm: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }
}

/// Confidence for a match distance: `1 − distance`, clamped at zero so
/// distances above 1 never produce a negative score.
pub fn confidence_from_distance(distance: f32) -> f32 {
    (1.0 - distance).max(0.0)
}

/// Bounding box of a detected face, in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detector score for this box, unrelated to match confidence.
    pub score: f32,
}

/// One enrollment capture's derived embedding. Immutable once created;
/// deleted only in bulk when the user deletes their face data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSample {
    pub user_id: StudentId,
    pub embedding: Embedding,
    pub captured_at: DateTime<Utc>,
}

/// A user's complete face registration. Mutated only by
/// delete-and-re-register; there is no partial update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentProfile {
    pub user_id: StudentId,
    pub samples: Vec<FaceSample>,
    pub trained_at: Option<DateTime<Utc>>,
    pub registered: bool,
}

/// Read-only roster projection for one scan session, built once at session
/// start from the backend's roster and face-descriptor endpoints.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub user_id: StudentId,
    pub name: String,
    /// Student number / matriculation identifier shown to the operator.
    pub identifier: String,
    pub references: Vec<Embedding>,
    /// Whether the backend already holds a mark for this student, so the
    /// scan loop never re-confirms them.
    pub already_present: bool,
}

/// Attendance status committed by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
}

/// A requested attendance write. The sink owns idempotence per
/// (session, student); the scan loop avoids duplicate requests by
/// construction.
#[derive(Debug, Clone)]
pub struct AttendanceMark {
    pub session_id: i64,
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    /// Match confidence at commit time.
    pub confidence: f32,
    /// JPEG-encoded evidence frame captured at confirmation.
    pub evidence_jpeg: Vec<u8>,
    /// Client-generated reference for the evidence frame.
    pub evidence_ref: String,
    pub device_info: String,
    pub marked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        let a = Embedding::new(vec![0.5, 0.5, 0.0]);
        let b = Embedding::new(vec![0.5, 0.5, 0.0]);
        assert!(a.distance(&b).abs() < 1e-6);
    }

    #[test]
    fn test_distance_known_value() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![0.3, 0.4]);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Embedding::new(vec![0.1, 0.9, 0.2]);
        let b = Embedding::new(vec![0.7, 0.3, 0.4]);
        assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut e = Embedding::new(vec![3.0, 4.0]);
        e.normalize();
        let norm: f32 = e.values.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((e.values[0] - 0.6).abs() < 1e-6);
        assert!((e.values[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut e = Embedding::new(vec![0.0, 0.0, 0.0]);
        e.normalize();
        assert_eq!(e.values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_confidence_from_distance() {
        assert!((confidence_from_distance(0.3) - 0.7).abs() < 1e-6);
        assert!((confidence_from_distance(0.0) - 1.0).abs() < 1e-6);
        // Distances above 1 clamp to zero confidence.
        assert_eq!(confidence_from_distance(1.2), 0.0);
    }

    #[test]
    fn test_attendance_status_wire_format() {
        let json = serde_json::to_string(&AttendanceStatus::Present).unwrap();
        assert_eq!(json, "\"PRESENT\"");
    }
}
