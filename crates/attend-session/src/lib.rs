//! attend-session — the recognition session: per-label debounce state and
//! the periodic scan loop that drives detection, matching, and attendance
//! writes.
//!
//! The state machine lives in [`state`] and is pure (time is passed in), so
//! every debounce law is unit-testable without a camera, a model, or a
//! running clock. The loop in [`scan`] owns the tick timer, the provider
//! calls, and the sink writes.

pub mod scan;
pub mod state;

pub use scan::{
    AttendanceSink, ScanConfig, ScanEvent, ScanSession, ScanSummary, SinkError,
};
pub use state::{LabelState, ObservedMatch, PendingConfirmation, SessionTracker};
