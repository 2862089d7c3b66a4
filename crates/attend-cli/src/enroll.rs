//! The `enroll` subcommand: capture face samples and submit the
//! registration in two phases (raw images, then derived descriptors).

use crate::config::Config;
use anyhow::Context;
use attend_backend::ApiClient;
use attend_capture::{is_too_dark, CameraSource, MIN_MEAN_LUMA};
use attend_core::enroll::{CaptureError, CaptureSession};
use attend_core::{EmbeddingProvider, Frame, FrameSource};
use std::time::Duration;

/// Pause between capture attempts so the subject can adjust pose.
const CAPTURE_PACE: Duration = Duration::from_millis(400);

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let client = ApiClient::new(&config.api_base_url, &config.api_token);

    let provider = attend_onnx::spawn_provider(
        &config.detector_model_path(),
        &config.embedder_model_path(),
    )
    .context("face recognition is unavailable (model initialization failed)")?;

    let mut camera = CameraSource::open(
        &config.camera_device,
        config.camera_width,
        config.camera_height,
    )
    .context("camera initialization failed")?;

    let mut session = CaptureSession::new(config.min_samples, config.max_samples);
    println!(
        "capturing {} enrollment samples — look straight at the camera",
        config.min_samples
    );

    let max_attempts = config.min_samples * 8;
    let mut attempts = 0;
    while session.sample_count() < config.min_samples && attempts < max_attempts {
        attempts += 1;
        tokio::time::sleep(CAPTURE_PACE).await;

        let frame = camera.next_frame().await.context("frame capture failed")?;
        if is_too_dark(&frame.data, MIN_MEAN_LUMA) {
            println!("  capture too dark — improve the lighting");
            continue;
        }

        let faces = provider
            .detect_faces(&frame)
            .await
            .context("face detection failed")?;

        match session.accept(frame, faces) {
            Ok(count) => println!("  sample {count}/{}", config.min_samples),
            Err(err @ (CaptureError::NoFace | CaptureError::MultipleFaces(_))) => {
                println!("  rejected: {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    // Local gate: nothing goes to the network below the minimum.
    session
        .require_submittable()
        .context("not enough usable samples were captured")?;

    // Phase one: raw capture images.
    let images: Vec<Vec<u8>> = session
        .samples()
        .iter()
        .map(|s| encode_jpeg(&s.frame))
        .collect::<Result<_, _>>()?;
    client
        .upload_enrollment_samples(images)
        .await
        .context("sample upload failed — samples kept, run enroll again to retry")?;

    // Phase two: every sample is independently re-validated and embedded;
    // a subset surviving is fine, zero survivors fails the submission.
    let mut results = Vec::with_capacity(session.sample_count());
    for sample in session.samples() {
        let outcome = provider.detect_faces(&sample.frame).await;
        results.push(match outcome {
            Ok(mut faces) if faces.len() == 1 => Some(faces.remove(0).embedding),
            _ => None,
        });
    }
    let descriptors = CaptureSession::usable_descriptors(results)?;
    client
        .save_face_descriptors(&descriptors)
        .await
        .context("descriptor upload failed — samples kept, run enroll again to retry")?;

    println!(
        "face registration complete: {} of {} samples produced descriptors",
        descriptors.len(),
        session.sample_count()
    );
    Ok(())
}

fn encode_jpeg(frame: &Frame) -> anyhow::Result<Vec<u8>> {
    let img = image::GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame buffer does not match dimensions")?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}
