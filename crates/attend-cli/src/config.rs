//! Configuration: an optional TOML file overlaid with `ATTEND_*` env
//! variables. Env wins, so a deployment can tune the threshold or timing
//! without touching the file.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the campus REST API, e.g. "https://api.kampus.example/v1".
    pub api_base_url: String,
    /// Bearer token for the API.
    pub api_token: String,
    pub camera_device: String,
    pub camera_width: u32,
    pub camera_height: u32,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Minimum match confidence (`1 − distance`) to accept a label.
    pub match_threshold: f32,
    /// Detection tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Uninterrupted presence required before marking, in milliseconds.
    pub confirm_delay_ms: u64,
    pub min_samples: usize,
    pub max_samples: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            api_token: String::new(),
            camera_device: "/dev/video0".to_string(),
            camera_width: 640,
            camera_height: 480,
            model_dir: PathBuf::from("models"),
            match_threshold: 0.6,
            tick_interval_ms: 500,
            confirm_delay_ms: 2000,
            min_samples: attend_core::enroll::DEFAULT_MIN_SAMPLES,
            max_samples: attend_core::enroll::DEFAULT_MAX_SAMPLES,
        }
    }
}

impl Config {
    /// Load from `ATTEND_CONFIG` (or `./attend.toml` if present), then apply
    /// env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("ATTEND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("attend.toml"));

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let parsed: Config = toml::from_str(&text)?;
            tracing::info!(path = %path.display(), "configuration file loaded");
            parsed
        } else {
            Config::default()
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        env_string("ATTEND_API_BASE_URL", &mut self.api_base_url);
        env_string("ATTEND_API_TOKEN", &mut self.api_token);
        env_string("ATTEND_CAMERA_DEVICE", &mut self.camera_device);
        if let Some(dir) = std::env::var("ATTEND_MODEL_DIR").ok().map(PathBuf::from) {
            self.model_dir = dir;
        }
        env_parse("ATTEND_CAMERA_WIDTH", &mut self.camera_width);
        env_parse("ATTEND_CAMERA_HEIGHT", &mut self.camera_height);
        env_parse("ATTEND_MATCH_THRESHOLD", &mut self.match_threshold);
        env_parse("ATTEND_TICK_INTERVAL_MS", &mut self.tick_interval_ms);
        env_parse("ATTEND_CONFIRM_DELAY_MS", &mut self.confirm_delay_ms);
        env_parse("ATTEND_MIN_SAMPLES", &mut self.min_samples);
        env_parse("ATTEND_MAX_SAMPLES", &mut self.max_samples);
    }

    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("face_det_320.onnx")
            .to_string_lossy()
            .into_owned()
    }

    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join("face_emb_128.onnx")
            .to_string_lossy()
            .into_owned()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}

fn env_string(key: &str, slot: &mut String) {
    if let Ok(v) = std::env::var(key) {
        *slot = v;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Some(v) = std::env::var(key).ok().and_then(|v| v.parse().ok()) {
        *slot = v;
    }
}
