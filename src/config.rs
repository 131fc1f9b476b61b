use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::detect::{BackendKind, ModelAssets};
use crate::ingest::RtspConfig;
use crate::presence::{ClassFilter, StatusMode, DEFAULT_STATUS_INTERVAL};
use crate::roi::Rect;

pub const CONFIG_PATH_ENV: &str = "MONITOR_CONFIG";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_WINDOW_TITLE: &str = "Camera Stream";

const DEFAULT_RTSP_FPS: u32 = 10;
const DEFAULT_RTSP_WIDTH: u32 = 640;
const DEFAULT_RTSP_HEIGHT: u32 = 480;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("RTSP_URL must be set")]
    MissingUrl,
    #[error("ROI must be set (ROI_X1, ROI_Y1, ROI_X2, ROI_Y2 are all zero)")]
    DegenerateRoi,
    #[error("ROI {0} must satisfy x1 < x2 and y1 < y2")]
    InvertedRoi(Rect),
    #[error("confidence threshold {0} must be within [0, 1]")]
    ThresholdOutOfRange(f32),
    #[error("status interval must be greater than zero")]
    ZeroStatusInterval,
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read config file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {reason}", .path.display())]
    ParseFile { path: PathBuf, reason: String },
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MonitorConfigFile {
    rtsp: Option<RtspConfigFile>,
    roi: Option<Rect>,
    detection: Option<DetectionConfigFile>,
    model: Option<ModelConfigFile>,
    status: Option<StatusConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RtspConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectionConfigFile {
    class_filter: Option<String>,
    confidence_threshold: Option<f32>,
    backend: Option<BackendKind>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    weights: Option<PathBuf>,
    config: Option<PathBuf>,
    classes: Option<PathBuf>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StatusConfigFile {
    interval: Option<u64>,
    mode: Option<StatusMode>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DisplayConfigFile {
    enabled: Option<bool>,
    window_title: Option<String>,
}

/// Everything the monitor needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub rtsp: RtspConfig,
    /// Fixed for the whole run.
    pub roi: Rect,
    pub detection: DetectionSettings,
    pub model: ModelAssets,
    pub status: StatusSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub class_filter: ClassFilter,
    /// Detections must score strictly above this.
    pub confidence_threshold: f32,
    pub backend: BackendKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSettings {
    pub interval: u64,
    pub mode: StatusMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub enabled: bool,
    pub window_title: String,
}

impl MonitorConfig {
    /// Defaults, then the file named by `MONITOR_CONFIG`, then environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env_value(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Like `load`, with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => MonitorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Self {
        let rtsp_file = file.rtsp.unwrap_or_default();
        let detection_file = file.detection.unwrap_or_default();
        let model_file = file.model.unwrap_or_default();
        let status_file = file.status.unwrap_or_default();
        let display_file = file.display.unwrap_or_default();
        let model_defaults = ModelAssets::default();

        Self {
            rtsp: RtspConfig {
                url: rtsp_file.url.unwrap_or_default(),
                target_fps: rtsp_file.target_fps.unwrap_or(DEFAULT_RTSP_FPS),
                width: rtsp_file.width.unwrap_or(DEFAULT_RTSP_WIDTH),
                height: rtsp_file.height.unwrap_or(DEFAULT_RTSP_HEIGHT),
                frame_limit: rtsp_file.frame_limit,
            },
            roi: file.roi.unwrap_or_default(),
            detection: DetectionSettings {
                class_filter: detection_file
                    .class_filter
                    .map(|raw| ClassFilter::from(raw.as_str()))
                    .unwrap_or_default(),
                confidence_threshold: detection_file
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                backend: detection_file.backend.unwrap_or_default(),
            },
            model: ModelAssets {
                weights: model_file.weights.unwrap_or(model_defaults.weights),
                network_config: model_file.config.unwrap_or(model_defaults.network_config),
                classes: model_file.classes.unwrap_or(model_defaults.classes),
                input_size: model_file.input_size.unwrap_or(model_defaults.input_size),
            },
            status: StatusSettings {
                interval: status_file.interval.unwrap_or(DEFAULT_STATUS_INTERVAL),
                mode: status_file.mode.unwrap_or_default(),
            },
            display: DisplaySettings {
                enabled: display_file.enabled.unwrap_or(true),
                window_title: display_file
                    .window_title
                    .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
            },
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = env_value("RTSP_URL") {
            self.rtsp.url = url;
        }
        if let Some(x1) = parse_env("ROI_X1")? {
            self.roi.x1 = x1;
        }
        if let Some(y1) = parse_env("ROI_Y1")? {
            self.roi.y1 = y1;
        }
        if let Some(x2) = parse_env("ROI_X2")? {
            self.roi.x2 = x2;
        }
        if let Some(y2) = parse_env("ROI_Y2")? {
            self.roi.y2 = y2;
        }
        if let Some(filter) = env_value("CLASS_FILTER") {
            self.detection.class_filter = ClassFilter::from(filter.as_str());
        }
        if let Some(threshold) = parse_env("CONFIDENCE_THRESHOLD")? {
            self.detection.confidence_threshold = threshold;
        }
        if let Some(backend) = parse_env("DETECTOR_BACKEND")? {
            self.detection.backend = backend;
        }
        if let Some(weights) = env_value("MODEL_WEIGHTS") {
            self.model.weights = PathBuf::from(weights);
        }
        if let Some(network_config) = env_value("MODEL_CONFIG") {
            self.model.network_config = PathBuf::from(network_config);
        }
        if let Some(classes) = env_value("MODEL_CLASSES") {
            self.model.classes = PathBuf::from(classes);
        }
        if let Some(interval) = parse_env("STATUS_INTERVAL")? {
            self.status.interval = interval;
        }
        if let Some(mode) = parse_env("STATUS_MODE")? {
            self.status.mode = mode;
        }
        if let Some(limit) = parse_env("STREAM_FRAME_LIMIT")? {
            self.rtsp.frame_limit = Some(limit);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rtsp.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.roi.is_zero() {
            return Err(ConfigError::DegenerateRoi);
        }
        if !self.roi.is_well_formed() {
            return Err(ConfigError::InvertedRoi(self.roi));
        }
        let threshold = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        if self.status.interval == 0 {
            return Err(ConfigError::ZeroStatusInterval);
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        toml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| ConfigError::ParseFile {
        path: path.to_path_buf(),
        reason,
    })
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env_value(key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MonitorConfig {
        let mut cfg = MonitorConfig::from_file(MonitorConfigFile::default());
        cfg.rtsp.url = "stub://cam".to_string();
        cfg.roi = Rect::new(118, 6, 218, 206);
        cfg
    }

    #[test]
    fn defaults() {
        let cfg = valid();
        assert_eq!(cfg.detection.class_filter, ClassFilter::Label("person".into()));
        assert_eq!(cfg.detection.confidence_threshold, 0.5);
        assert_eq!(cfg.detection.backend, BackendKind::default());
        assert_eq!(cfg.model, ModelAssets::default());
        assert_eq!(cfg.status.interval, 30);
        assert_eq!(cfg.status.mode, StatusMode::Sampled);
        assert!(cfg.display.enabled);
        assert_eq!(cfg.display.window_title, "Camera Stream");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_errors() {
        let mut cfg = valid();
        cfg.rtsp.url = "  ".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingUrl)));

        let mut cfg = valid();
        cfg.roi = Rect::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::DegenerateRoi)));

        let mut cfg = valid();
        cfg.roi = Rect::new(218, 6, 118, 206);
        assert!(matches!(cfg.validate(), Err(ConfigError::InvertedRoi(_))));

        let mut cfg = valid();
        cfg.detection.confidence_threshold = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));

        let mut cfg = valid();
        cfg.detection.confidence_threshold = f32::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.status.interval = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroStatusInterval)));
    }

    #[test]
    fn error_messages_name_the_problem() {
        assert_eq!(ConfigError::MissingUrl.to_string(), "RTSP_URL must be set");
        let err = ConfigError::InvalidValue {
            key: "ROI_X1",
            value: "left".into(),
            reason: "invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "ROI_X1 has invalid value 'left': invalid digit found in string"
        );
    }
}
