//! attend-core — face matching and enrollment primitives for the practicum
//! attendance scanner.
//!
//! Matching is nearest-reference over Euclidean distance with the attendance
//! convention `confidence = 1 − distance`. Enrollment enforces the
//! single-face capture rule and the min/max sample range before anything
//! touches the network.

pub mod enroll;
pub mod matcher;
pub mod provider;
pub mod types;

pub use matcher::{LabeledDescriptorSet, MatchResult, Matcher, NearestMatcher};
pub use provider::{DetectedFace, EmbeddingProvider, Frame, FrameSource, ProviderError};
pub use types::{
    AttendanceMark, AttendanceStatus, Embedding, EnrollmentProfile, FaceBox, FaceSample,
    RosterEntry, StudentId,
};
