//! Pixel-format conversion and capture-quality heuristics.

use thiserror::Error;

/// Mean luma below which a capture is considered unusable for enrollment.
pub const MIN_MEAN_LUMA: f32 = 40.0;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

/// Extract the Y channel from packed YUYV 4:2:2.
///
/// YUYV packs two pixels per 4 bytes as [Y0, U, Y1, V]; grayscale is every
/// even-indexed byte.
pub fn yuyv_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let expected = (width * height * 2) as usize;
    if buf.len() < expected {
        return Err(ConvertError::TooShort {
            expected,
            actual: buf.len(),
        });
    }
    Ok(buf[..expected].iter().step_by(2).copied().collect())
}

/// Whether a grayscale buffer is too dark to be useful.
pub fn is_too_dark(gray: &[u8], min_mean_luma: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let mean = gray.iter().map(|&p| p as f32).sum::<f32>() / gray.len() as f32;
    mean < min_mean_luma
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_extracts_y_channel() {
        // 2x1 image: [Y0=50, U=128, Y1=220, V=128]
        let gray = yuyv_to_gray(&[50, 128, 220, 128], 2, 1).unwrap();
        assert_eq!(gray, vec![50, 220]);
    }

    #[test]
    fn test_yuyv_rejects_short_buffer() {
        assert!(yuyv_to_gray(&[1, 2], 2, 1).is_err());
    }

    #[test]
    fn test_dark_detection() {
        assert!(is_too_dark(&vec![5u8; 100], MIN_MEAN_LUMA));
        assert!(!is_too_dark(&vec![120u8; 100], MIN_MEAN_LUMA));
        assert!(is_too_dark(&[], MIN_MEAN_LUMA));
    }

    #[test]
    fn test_dark_detection_borderline() {
        // Mean exactly at the floor counts as usable.
        let gray = vec![MIN_MEAN_LUMA as u8; 64];
        assert!(!is_too_dark(&gray, MIN_MEAN_LUMA));
    }
}
