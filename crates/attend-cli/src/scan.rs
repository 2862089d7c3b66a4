//! The `scan` subcommand: live recognition for one class session.

use crate::config::Config;
use anyhow::Context;
use attend_backend::ApiClient;
use attend_core::{LabeledDescriptorSet, NearestMatcher, StudentId};
use attend_capture::CameraSource;
use attend_session::{ScanConfig, ScanEvent, ScanSession};
use tokio::sync::{mpsc, watch};

pub async fn run(config: &Config, session_id: i64) -> anyhow::Result<()> {
    let client = ApiClient::new(&config.api_base_url, &config.api_token);

    let roster = client
        .load_session_roster(session_id)
        .await
        .context("failed to load the session roster")?;
    let already_present: Vec<StudentId> = roster
        .iter()
        .filter(|e| e.already_present)
        .map(|e| e.user_id)
        .collect();
    let set = LabeledDescriptorSet::from_roster(&roster);
    if set.is_empty() {
        anyhow::bail!("no student on this roster has registered face data — nothing to recognize");
    }
    println!(
        "session {session_id}: {} students, {} with face data, {} already marked",
        roster.len(),
        set.len(),
        already_present.len()
    );

    // One-time model load; a failure here disables recognition for the
    // session and the operator is told to fix the models and retry.
    let provider = attend_onnx::spawn_provider(
        &config.detector_model_path(),
        &config.embedder_model_path(),
    )
    .context("face recognition is unavailable (model initialization failed) — fix the model files and retry")?;

    let camera = CameraSource::open(
        &config.camera_device,
        config.camera_width,
        config.camera_height,
    )
    .context("camera initialization failed")?;

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (stop_tx, stop_rx) = watch::channel(false);

    let session = ScanSession::new(
        ScanConfig {
            session_id,
            tick_interval: config.tick_interval(),
            confirm_delay: config.confirm_delay(),
            min_confidence: config.match_threshold,
            device_info: device_info(),
        },
        NearestMatcher,
        set,
        provider,
        camera,
        client,
        already_present,
        event_tx,
    );

    let feedback = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            render(&event);
        }
    });
    let scan = tokio::spawn(session.run(stop_rx));

    println!("scanning — press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    let _ = stop_tx.send(true);

    let summary = scan.await?;
    feedback.abort();

    println!(
        "stopped after {} ticks; {} students marked this run",
        summary.ticks,
        summary.marked.len()
    );
    Ok(())
}

/// Terminal rendering of operator feedback. The three outcomes the
/// operator watches for — marking in progress, already marked, and
/// unmatched — each get a distinct prefix.
fn render(event: &ScanEvent) {
    match event {
        ScanEvent::Confirming {
            name,
            confidence,
            remaining,
            ..
        } => {
            println!(
                "[hold] {name} ({:.0}%) — {} ms to mark",
                confidence * 100.0,
                remaining.as_millis()
            );
        }
        ScanEvent::AlreadyMarked { name, .. } => {
            println!("[done] {name} — already marked");
        }
        ScanEvent::Unmatched {
            best_confidence, ..
        } => {
            println!("[????] unrecognized face (best {:.0}%)", best_confidence * 100.0);
        }
        ScanEvent::Marked {
            name, confidence, ..
        } => {
            println!("[MARK] {name} marked present ({:.0}%)", confidence * 100.0);
        }
        ScanEvent::MarkFailed { name, error, .. } => {
            println!("[FAIL] could not mark {name}: {error} — have them face the camera again");
        }
    }
}

fn device_info() -> String {
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string());
    format!("attend-cli/{} ({host})", env!("CARGO_PKG_VERSION"))
}
