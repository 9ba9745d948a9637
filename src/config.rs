use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub ffmpeg: FfmpegConfig,
    pub detector: DetectorConfig,
    pub coach: CoachConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Frames extracted per second of video
    pub sample_fps: f64,
    pub max_upload_bytes: u64,
    /// Lowercase file extensions accepted as video
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub intra_threads: usize,
    /// Mean keypoint score below which a frame counts as "no pose"
    pub min_pose_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Helper process argv. `None` uses the built-in offline generator.
    pub command: Option<Vec<String>>,
    pub model: String,
    pub temperature: f32,
    pub feedback_max_tokens: u32,
    pub chat_max_tokens: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_fps: 10.0,
            max_upload_bytes: 20 * 1024 * 1024,
            allowed_extensions: ["mp4", "mov", "m4v", "webm", "avi", "mkv"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/movenet_lightning.onnx"),
            input_size: 192,
            intra_threads: 4,
            min_pose_score: 0.2,
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            command: None,
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            feedback_max_tokens: 500,
            chat_max_tokens: 300,
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "tennis-coach.json";

    /// Loads the config at `path`. A missing file yields defaults; so does a
    /// file that fails to parse, with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            // Missing fields fall back to Default thanks to #[serde(default)]
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    info!("Loaded configuration from {}", path.display());
                    c
                }
                Err(e) => {
                    warn!("Error parsing config {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            }
        } else {
            info!("No configuration at {}, using defaults", path.display());
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.analysis.sample_fps > 0.0 && self.analysis.sample_fps.is_finite()) {
            bail!("analysis.sample_fps must be a positive number, got {}", self.analysis.sample_fps);
        }
        if self.analysis.max_upload_bytes == 0 {
            bail!("analysis.max_upload_bytes must be greater than zero");
        }
        if self.detector.input_size == 0 {
            bail!("detector.input_size must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.detector.min_pose_score) {
            bail!("detector.min_pose_score must lie in [0, 1], got {}", self.detector.min_pose_score);
        }
        if let Some(command) = &self.coach.command {
            if command.is_empty() {
                bail!("coach.command must name a program when set");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();

        assert_eq!(config.analysis.sample_fps, 10.0);
        assert_eq!(config.analysis.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.detector.input_size, 192);
        assert!(config.coach.command.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "analysis": { "sample_fps": 5.0 }, "coach": { "model": "local" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.analysis.sample_fps, 5.0);
        assert_eq!(config.analysis.allowed_extensions.len(), 6);
        assert_eq!(config.coach.model, "local");
        assert_eq!(config.coach.chat_max_tokens, 300);
    }

    #[test]
    fn test_garbage_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json at all").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.analysis.sample_fps, 10.0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.coach.command = Some(vec!["python3".into(), "scripts/coach_server.py".into()]);
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.coach.command, config.coach.command);
    }

    #[test]
    fn test_rejects_non_positive_fps() {
        let mut config = AppConfig::default();
        config.analysis.sample_fps = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_coach_command() {
        let mut config = AppConfig::default();
        config.coach.command = Some(Vec::new());
        assert!(config.validate().is_err());
    }
}
