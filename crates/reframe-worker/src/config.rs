//! Worker configuration.

use std::path::PathBuf;

use reframe_media::tracking::config::{DEFAULT_FACE_MODEL_PATH, DEFAULT_OBJECT_MODEL_PATH};
use reframe_media::TrackingConfig;
use reframe_models::{DetectionMode, TargetResolution};
use tracing::warn;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum videos processed at once
    pub max_concurrent_jobs: usize,
    /// Sampling stride preset
    pub detection_mode: DetectionMode,
    /// EMA weight of the previous center
    pub smoothing: f64,
    /// Face detection model
    pub face_model_path: PathBuf,
    /// Object detection model
    pub object_model_path: PathBuf,
    /// Where `<stem>_reframed.mp4` files are written
    pub output_dir: PathBuf,
    /// Output resolution
    pub target: TargetResolution,
    /// Track per frame (`true`) or crop once around the midpoint subject
    pub track: bool,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            detection_mode: DetectionMode::default(),
            smoothing: 0.7,
            face_model_path: PathBuf::from(DEFAULT_FACE_MODEL_PATH),
            object_model_path: PathBuf::from(DEFAULT_OBJECT_MODEL_PATH),
            output_dir: PathBuf::from("."),
            target: TargetResolution::VERTICAL_1080,
            track: true,
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup. Unparseable values
    /// fall back to the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            max_concurrent_jobs: parse_or(&lookup, "REFRAME_MAX_JOBS", defaults.max_concurrent_jobs)
                .max(1),
            detection_mode: parse_or(&lookup, "REFRAME_MODE", defaults.detection_mode),
            smoothing: parse_or(&lookup, "REFRAME_SMOOTHING", defaults.smoothing),
            face_model_path: lookup("REFRAME_FACE_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.face_model_path),
            object_model_path: lookup("REFRAME_OBJECT_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.object_model_path),
            output_dir: lookup("REFRAME_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            target: parse_or(&lookup, "REFRAME_TARGET", defaults.target),
            track: parse_or(&lookup, "REFRAME_TRACK", defaults.track),
            metrics_port: lookup("METRICS_PORT").and_then(|s| s.parse().ok()),
        }
    }

    /// Tracking configuration derived from this worker config.
    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            detection_mode: self.detection_mode,
            smoothing: self.smoothing,
            face_model_path: self.face_model_path.clone(),
            object_model_path: self.object_model_path.clone(),
            ..Default::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Invalid value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.detection_mode, DetectionMode::Balanced);
        assert_eq!(config.target, TargetResolution::VERTICAL_1080);
        assert!(config.track);
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("REFRAME_MAX_JOBS", "8"),
            ("REFRAME_MODE", "accurate"),
            ("REFRAME_SMOOTHING", "0.5"),
            ("REFRAME_OUTPUT_DIR", "/tmp/out"),
            ("REFRAME_TARGET", "1080x1080"),
            ("REFRAME_TRACK", "false"),
            ("METRICS_PORT", "9100"),
        ]);
        assert_eq!(config.max_concurrent_jobs, 8);
        assert_eq!(config.detection_mode, DetectionMode::Accurate);
        assert!((config.smoothing - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.target, TargetResolution::new(1080, 1080));
        assert!(!config.track);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("REFRAME_MAX_JOBS", "0"),
            ("REFRAME_MODE", "turbo"),
            ("REFRAME_TARGET", "wide"),
        ]);
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.detection_mode, DetectionMode::Balanced);
        assert_eq!(config.target, TargetResolution::VERTICAL_1080);
    }

    #[test]
    fn test_tracking_config() {
        let config = config_from(&[("REFRAME_MODE", "fast"), ("REFRAME_FACE_MODEL", "/models/face.onnx")]);
        let tracking = config.tracking_config();
        assert_eq!(tracking.frame_skip(), 10);
        assert_eq!(tracking.face_model_path, PathBuf::from("/models/face.onnx"));
    }
}
