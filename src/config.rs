use anyhow::Result;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timing: Timing,
    pub paths: Paths,
    pub models: Models,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Head pose warm-up window
    pub calibration_secs: f64,
    /// Continuous adverse time before a snapshot is taken
    pub debounce_secs: f64,
    /// Length of the on-screen warning window
    pub warning_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub log_dir: PathBuf,
    pub csv_log: PathBuf,
    pub alert_sound: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Models {
    pub face_detection: PathBuf,
    pub face_mesh: PathBuf,
    pub head_pose: PathBuf,
    pub phone: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Degrees of yaw away from the baseline before the head counts as turned
    pub head_yaw_deg: f32,
    /// Degrees of pitch away from the baseline before the head counts as tilted
    pub head_pitch_deg: f32,
    /// Normalized pupil offset (-1..1) that counts as looking sideways
    pub gaze_horizontal: f32,
    pub gaze_vertical: f32,
    pub phone_confidence: f32,
    pub phone_class: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            calibration_secs: 5.0,
            debounce_secs: 3.0,
            warning_secs: 5.0,
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("log"),
            csv_log: PathBuf::from("cheating_log.csv"),
            alert_sound: PathBuf::from("beep.wav"),
        }
    }
}

impl Default for Models {
    fn default() -> Self {
        Self {
            face_detection: PathBuf::from("models/face_detection.onnx"),
            face_mesh: PathBuf::from("models/face_mesh.onnx"),
            head_pose: PathBuf::from("models/head_pose.onnx"),
            phone: PathBuf::from("models/phone_yolo.onnx"),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            head_yaw_deg: 15.0,
            head_pitch_deg: 12.0,
            gaze_horizontal: 0.35,
            gaze_vertical: 0.4,
            phone_confidence: 0.8,
            phone_class: 0,
        }
    }
}

impl Timing {
    pub fn calibration(&self) -> TimeDelta {
        secs_to_delta(self.calibration_secs)
    }

    pub fn debounce(&self) -> TimeDelta {
        secs_to_delta(self.debounce_secs)
    }

    pub fn warning(&self) -> TimeDelta {
        secs_to_delta(self.warning_secs)
    }
}

fn secs_to_delta(secs: f64) -> TimeDelta {
    TimeDelta::milliseconds((secs.max(0.0) * 1000.0).round() as i64)
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.json";

    /// Reads the config file if present. A missing or unparsable file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        // Missing fields fall back to Default via #[serde(default)]
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(c) => {
                tracing::info!("Loaded configuration from {}", path.display());
                Ok(c)
            }
            Err(e) => {
                tracing::warn!("Error parsing config: {}. Loading defaults.", e);
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
