//! The scan loop: a fixed-interval detection tick driving the debounce
//! tracker, with attendance writes on confirmation.
//!
//! One tick = capture a frame, run the provider, match every detected face,
//! apply the tracker transitions, commit any confirmed label. The tick body
//! is awaited to completion before the next tick is admitted, so a slow
//! provider can never pile up overlapping work; late ticks are delayed, not
//! queued.

use attend_core::{
    AttendanceMark, AttendanceStatus, EmbeddingProvider, FaceBox, Frame, FrameSource,
    LabeledDescriptorSet, Matcher, StudentId,
};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::state::{LabelState, ObservedMatch, SessionTracker};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("backend rejected the mark: {0}")]
    Rejected(String),
    #[error("transport: {0}")]
    Transport(String),
}

/// Attendance persistence. The backend owns idempotence per
/// (session, student); the loop avoids duplicate calls by construction.
#[allow(async_fn_in_trait)]
pub trait AttendanceSink {
    async fn mark_attendance(&self, mark: &AttendanceMark) -> Result<(), SinkError>;
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub session_id: i64,
    /// Detection tick interval (500 ms in the reference deployment).
    pub tick_interval: Duration,
    /// Uninterrupted presence required before a mark is committed.
    pub confirm_delay: Duration,
    /// Minimum match confidence (`1 − distance`) to accept a label.
    pub min_confidence: f32,
    /// Device/user-agent string recorded on every mark.
    pub device_info: String,
}

/// Operator feedback emitted during scanning. Best-effort: a slow consumer
/// drops frames of feedback, never stalls the loop.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A face the matcher could not attribute to any enrolled student.
    Unmatched { bbox: FaceBox, best_confidence: f32 },
    /// Candidate under confirmation, with time left until commit.
    Confirming {
        bbox: FaceBox,
        label: StudentId,
        name: String,
        confidence: f32,
        remaining: Duration,
    },
    /// Student already marked present in this session.
    AlreadyMarked {
        bbox: FaceBox,
        label: StudentId,
        name: String,
    },
    /// Attendance write succeeded.
    Marked {
        label: StudentId,
        name: String,
        confidence: f32,
    },
    /// Attendance write failed; the operator retries by re-presenting.
    MarkFailed {
        label: StudentId,
        name: String,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub ticks: u64,
    /// Students marked present by this scan session, in commit order.
    pub marked: Vec<StudentId>,
}

/// One live recognition session over a roster's descriptor set.
pub struct ScanSession<M, P, F, S> {
    config: ScanConfig,
    matcher: M,
    set: LabeledDescriptorSet,
    provider: P,
    frames: F,
    sink: S,
    tracker: SessionTracker,
    events: mpsc::Sender<ScanEvent>,
    marked: Vec<StudentId>,
}

impl<M, P, F, S> ScanSession<M, P, F, S>
where
    M: Matcher,
    P: EmbeddingProvider,
    F: FrameSource,
    S: AttendanceSink,
{
    pub fn new(
        config: ScanConfig,
        matcher: M,
        set: LabeledDescriptorSet,
        provider: P,
        frames: F,
        sink: S,
        already_present: impl IntoIterator<Item = StudentId>,
        events: mpsc::Sender<ScanEvent>,
    ) -> Self {
        let tracker = SessionTracker::new(config.confirm_delay, already_present);
        Self {
            config,
            matcher,
            set,
            provider,
            frames,
            sink,
            tracker,
            events,
            marked: Vec::new(),
        }
    }

    /// Run the scan loop until `stop` fires or its sender is dropped.
    ///
    /// Stopping drops all pending confirmation state with the session; no
    /// sink call can happen after this returns.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> ScanSummary {
        let mut ticks = interval(self.config.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            session_id = self.config.session_id,
            roster = self.set.len(),
            tick_ms = self.config.tick_interval.as_millis() as u64,
            confirm_ms = self.config.confirm_delay.as_millis() as u64,
            "scan session started"
        );

        let mut tick_count = 0u64;
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = ticks.tick() => {
                    tick_count += 1;
                    self.tick().await;
                }
            }
        }

        tracing::info!(
            session_id = self.config.session_id,
            ticks = tick_count,
            marked = self.marked.len(),
            "scan session stopped"
        );

        ScanSummary {
            ticks: tick_count,
            marked: self.marked,
        }
    }

    /// One detection tick. Acquisition or detection errors are logged and
    /// the tick is treated as a no-detection result — one bad frame never
    /// halts the session.
    async fn tick(&mut self) {
        let frame = match self.frames.next_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "frame capture failed; treating tick as no detection");
                self.tracker.observe(&[], Instant::now());
                return;
            }
        };

        let faces = match self.provider.detect_faces(&frame).await {
            Ok(faces) => faces,
            Err(err) => {
                tracing::warn!(error = %err, "detection failed; treating tick as no detection");
                Vec::new()
            }
        };

        let mut observed = Vec::new();
        let mut boxes: HashMap<StudentId, FaceBox> = HashMap::new();

        for face in &faces {
            let result = self
                .matcher
                .best_match(&face.embedding, &self.set, self.config.min_confidence);
            match result.label {
                Some(label) => {
                    observed.push(ObservedMatch {
                        label,
                        confidence: result.confidence,
                    });
                    boxes.entry(label).or_insert(face.bbox);
                }
                None => {
                    self.emit(ScanEvent::Unmatched {
                        bbox: face.bbox,
                        best_confidence: result.confidence,
                    });
                }
            }
        }

        let states = self.tracker.observe(&observed, Instant::now());
        for state in states {
            match state {
                LabelState::Confirming {
                    label,
                    confidence,
                    remaining,
                } => {
                    self.emit(ScanEvent::Confirming {
                        bbox: boxes[&label],
                        label,
                        name: self.name_of(label),
                        confidence,
                        remaining,
                    });
                }
                LabelState::AlreadyMarked { label } => {
                    self.emit(ScanEvent::AlreadyMarked {
                        bbox: boxes[&label],
                        label,
                        name: self.name_of(label),
                    });
                }
                LabelState::Confirmed { label, confidence } => {
                    self.commit(label, confidence, &frame).await;
                }
            }
        }
    }

    /// Write the attendance mark for a confirmed label, with the current
    /// frame as evidence. Success is what moves the label into the present
    /// set; a failure is reported and the label falls back to `Unseen`, so
    /// re-presenting the face starts a fresh candidacy (no automatic retry).
    async fn commit(&mut self, label: StudentId, confidence: f32, frame: &Frame) {
        let name = self.name_of(label);

        let evidence_jpeg = match encode_evidence(frame) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(student_id = label, error = %err, "evidence encoding failed; marking without evidence");
                Vec::new()
            }
        };

        let mark = AttendanceMark {
            session_id: self.config.session_id,
            student_id: label,
            status: AttendanceStatus::Present,
            confidence,
            evidence_jpeg,
            evidence_ref: uuid::Uuid::new_v4().to_string(),
            device_info: self.config.device_info.clone(),
            marked_at: chrono::Utc::now(),
        };

        match self.sink.mark_attendance(&mark).await {
            Ok(()) => {
                self.tracker.complete(label);
                self.marked.push(label);
                tracing::info!(
                    session_id = self.config.session_id,
                    student_id = label,
                    confidence,
                    "attendance marked"
                );
                self.emit(ScanEvent::Marked {
                    label,
                    name,
                    confidence,
                });
            }
            Err(err) => {
                tracing::warn!(
                    session_id = self.config.session_id,
                    student_id = label,
                    error = %err,
                    "attendance write failed"
                );
                self.emit(ScanEvent::MarkFailed {
                    label,
                    name,
                    error: err.to_string(),
                });
            }
        }
    }

    fn name_of(&self, label: StudentId) -> String {
        self.set.name_of(label).unwrap_or("<unknown>").to_string()
    }

    fn emit(&self, event: ScanEvent) {
        // Overlay feedback is presentation, not correctness: drop on a full
        // channel rather than stall the tick.
        let _ = self.events.try_send(event);
    }
}

/// JPEG-encode a grayscale frame for evidence upload.
fn encode_evidence(frame: &Frame) -> Result<Vec<u8>, String> {
    let img = image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| "frame buffer does not match dimensions".to_string())?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}
