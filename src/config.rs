// src/config.rs - Application settings, loaded from JSON with defaults for every field
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dwell::DwellConfig;
use crate::error::{QuizError, Result};
use crate::gestures::GestureConfig;
use crate::levels::LevelConfig;
use crate::quiz::QuizConfig;
use crate::scene::SceneConfig;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Requested capture format; the device may grant something smaller.
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Pixel space that selection regions and the pointer live in.
    pub stage_width: f64,
    pub stage_height: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 60,
            stage_width: 1920.0,
            stage_height: 1080.0,
        }
    }
}

impl VideoConfig {
    pub fn stage(&self) -> (f64, f64) {
        (self.stage_width, self.stage_height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gestures: GestureConfig,
    pub dwell: DwellConfig,
    pub quiz: QuizConfig,
    pub levels: LevelConfig,
    pub scene: SceneConfig,
    pub video: VideoConfig,
    /// Session exports go here; nothing is written when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gestures: GestureConfig::default(),
            dwell: DwellConfig::default(),
            quiz: QuizConfig::default(),
            levels: LevelConfig::default(),
            scene: SceneConfig::default(),
            video: VideoConfig::default(),
            output_dir: None,
        }
    }
}

impl AppConfig {
    /// Per-user config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "pinchquiz", "PinchQuiz")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Read `path` if given (it must exist), else the per-user file if present,
    /// else built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gestures.pinch_threshold <= 0.0 {
            return Err(QuizError::InvalidConfig(
                "pinch_threshold must be positive".to_string(),
            ));
        }
        if self.video.stage_width <= 0.0 || self.video.stage_height <= 0.0 {
            return Err(QuizError::InvalidConfig("stage size must be positive".to_string()));
        }
        self.quiz.validate()?;
        self.levels.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = AppConfig::default();
        assert_eq!(config.gestures.pinch_threshold, 0.05);
        assert_eq!(config.gestures.thumbs_up_hold_ms, 5000);
        assert_eq!(config.dwell.dwell_ms, 2000);
        assert_eq!(config.quiz.feedback_window_ms, 1500);
        assert_eq!((config.video.width, config.video.height, config.video.fps), (1920, 1080, 60));
        assert!(config.output_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = AppConfig::from_json(r#"{ "dwell": { "dwell_ms": 750 } }"#).unwrap();
        assert_eq!(config.dwell.dwell_ms, 750);
        assert_eq!(config.quiz.questions.len(), 4);
        assert_eq!(config.scene.models.len(), 2);
    }

    #[test]
    fn unknown_answer_letter_is_rejected() {
        let json = r#"{ "quiz": { "questions": [
            { "prompt": "?", "options": ["a", "b", "c"], "correct": "D" }
        ] } }"#;
        assert!(matches!(AppConfig::from_json(json), Err(QuizError::Json(_))));
    }

    #[test]
    fn empty_question_list_fails_validation() {
        let config = AppConfig::from_json(r#"{ "quiz": { "questions": [] } }"#).unwrap();
        assert!(matches!(config.validate(), Err(QuizError::EmptyQuiz)));
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.gestures.pinch_threshold = 0.08;
        config.output_dir = Some(dir.path().join("sessions"));
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.gestures.pinch_threshold, 0.08);
        assert_eq!(loaded.output_dir, Some(dir.path().join("sessions")));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(QuizError::Io(_))));
    }
}
