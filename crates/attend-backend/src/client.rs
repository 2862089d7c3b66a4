//! The HTTP client. Bearer-token auth on every request; non-2xx responses
//! are surfaced with the backend's body text for the operator.

use crate::models::{
    build_roster, FaceDescriptorsDto, FaceStatusDto, SaveDescriptorsDto, SessionRosterDto,
};
use attend_core::{AttendanceMark, Embedding, RosterEntry, StudentId};
use attend_session::{AttendanceSink, SinkError};
use reqwest::multipart::{Form, Part};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Roster with existing attendance status, used to seed which students
    /// are already marked present.
    pub async fn get_session_roster(
        &self,
        session_id: i64,
    ) -> Result<SessionRosterDto, BackendError> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}/roster")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Reference descriptors for every enrolled student on the roster.
    pub async fn get_session_face_descriptors(
        &self,
        session_id: i64,
    ) -> Result<Vec<FaceDescriptorsDto>, BackendError> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}/face-descriptors")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch both session endpoints and merge them into the scan roster.
    pub async fn load_session_roster(
        &self,
        session_id: i64,
    ) -> Result<Vec<RosterEntry>, BackendError> {
        let roster = self.get_session_roster(session_id).await?;
        let descriptors = self.get_session_face_descriptors(session_id).await?;
        tracing::info!(
            session_id,
            students = roster.students.len(),
            enrolled = descriptors.len(),
            "session roster loaded"
        );
        Ok(build_roster(roster, descriptors))
    }

    /// Phase one of enrollment submission: raw capture images.
    pub async fn upload_enrollment_samples(
        &self,
        images: Vec<Vec<u8>>,
    ) -> Result<(), BackendError> {
        let mut form = Form::new();
        for (i, jpeg) in images.into_iter().enumerate() {
            let part = Part::bytes(jpeg)
                .file_name(format!("sample-{i}.jpg"))
                .mime_str("image/jpeg")?;
            form = form.part("samples", part);
        }
        let response = self
            .http
            .post(self.url("/face/samples"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Phase two of enrollment submission: the derived descriptors.
    pub async fn save_face_descriptors(
        &self,
        descriptors: &[Embedding],
    ) -> Result<(), BackendError> {
        let body = SaveDescriptorsDto {
            descriptors: descriptors.iter().map(|e| e.values.clone()).collect(),
        };
        let response = self
            .http
            .post(self.url("/face/descriptors"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn get_face_status(&self, user_id: StudentId) -> Result<FaceStatusDto, BackendError> {
        let response = self
            .http
            .get(self.url(&format!("/face/{user_id}/status")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Delete-and-re-register is the only mutation the enrollment profile
    /// supports; this is the delete half.
    pub async fn delete_face_data(&self, user_id: StudentId) -> Result<(), BackendError> {
        let response = self
            .http
            .delete(self.url(&format!("/face/{user_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

impl AttendanceSink for ApiClient {
    /// `POST /sessions/{id}/attendance` as multipart: the mark fields plus
    /// the JPEG evidence frame.
    async fn mark_attendance(&self, mark: &AttendanceMark) -> Result<(), SinkError> {
        let evidence = Part::bytes(mark.evidence_jpeg.clone())
            .file_name(format!("{}.jpg", mark.evidence_ref))
            .mime_str("image/jpeg")
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let form = Form::new()
            .text("studentId", mark.student_id.to_string())
            .text("status", "PRESENT")
            .text("confidence", format!("{:.4}", mark.confidence))
            .text("evidenceRef", mark.evidence_ref.clone())
            .text("deviceInfo", mark.device_info.clone())
            .text("markedAt", mark.marked_at.to_rfc3339())
            .part("evidence", evidence);

        let response = self
            .http
            .post(self.url(&format!("/sessions/{}/attendance", mark.session_id)))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected(format!("{status}: {body}")))
    }
}
