//! Wire DTOs for the campus backend and their projection into core types.

use attend_core::{Embedding, RosterEntry, StudentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One roster row from `GET /sessions/{id}/roster`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStudentDto {
    pub user_id: StudentId,
    pub name: String,
    pub identifier: String,
    /// Existing attendance status, e.g. "PRESENT"; absent when unmarked.
    #[serde(default)]
    pub attendance_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRosterDto {
    pub students: Vec<RosterStudentDto>,
}

/// One student's reference descriptors from
/// `GET /sessions/{id}/face-descriptors`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDescriptorsDto {
    pub user_id: StudentId,
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub descriptors: Vec<Vec<f32>>,
}

/// Enrollment lifecycle state from `GET /face/{userId}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceStatusDto {
    pub registered: bool,
    pub sample_count: usize,
    pub trained_at: Option<DateTime<Utc>>,
}

/// Body of `POST /face/descriptors` (phase two of enrollment submission).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDescriptorsDto {
    pub descriptors: Vec<Vec<f32>>,
}

/// Merge the roster with the descriptor payload into the scan session's
/// read-only roster projection. Students without descriptors stay on the
/// roster (they can be marked manually elsewhere) but carry no references,
/// so the matcher skips them.
pub fn build_roster(
    roster: SessionRosterDto,
    descriptors: Vec<FaceDescriptorsDto>,
) -> Vec<RosterEntry> {
    roster
        .students
        .into_iter()
        .map(|s| {
            let references = descriptors
                .iter()
                .find(|d| d.user_id == s.user_id)
                .map(|d| {
                    d.descriptors
                        .iter()
                        .map(|v| Embedding::new(v.clone()))
                        .collect()
                })
                .unwrap_or_default();
            RosterEntry {
                user_id: s.user_id,
                name: s.name,
                identifier: s.identifier,
                references,
                already_present: s.attendance_status.as_deref() == Some("PRESENT"),
            }
        })
        .collect()
}
