//! attend-backend — HTTP client for the campus practicum REST API.
//!
//! The backend is a black box to the scanner: it serves roster data and
//! face descriptors at session start, persists attendance marks (and owns
//! their idempotence), and stores enrollment uploads. All JSON is camelCase
//! on the wire.

pub mod client;
pub mod models;

pub use client::{ApiClient, BackendError};
pub use models::{build_roster, FaceDescriptorsDto, FaceStatusDto, RosterStudentDto, SessionRosterDto};
