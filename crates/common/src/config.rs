//! Pipeline configuration.
//!
//! Every option is optional in the file so that "not configured" can be told
//! apart from "configured to the default value". Accessors fold in the
//! defaults; the CLI layer merges explicit flags on top via [`crate::Setting`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MontageResult;

/// Built-in defaults used when neither the CLI nor the config file sets a value.
pub mod defaults {
    pub const CLIP_PRE_SECONDS: f64 = 3.0;
    pub const CLIP_POST_SECONDS: f64 = 2.0;
    pub const AUDIO_PEAK_THRESHOLD: f64 = 0.1;
    pub const GRID_SIZE: &str = "3x3";
    pub const OUTPUT_VIDEO_FPS: u32 = 30;
    pub const OUTPUT_VIDEO_CODEC: &str = "libx264";
    pub const OUTPUT_VIDEO_BITRATE: &str = "5000k";
    pub const OUTPUT_AUDIO_CODEC: &str = "aac";
    pub const PRE_ROLL_DURATION_SECONDS: f64 = 0.0;
    pub const OUTPUT_VIDEO_WIDTH_PHONE: u32 = 1080;
    pub const OUTPUT_VIDEO_HEIGHT_PHONE: u32 = 1920;
}

/// How per-event audio is assembled into the montage soundtrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMixMode {
    /// Segments play back-to-back in event order from t=0, ignoring their
    /// scheduled start times.
    #[default]
    Concatenate,
    /// Segments are delayed to their scheduled start and summed.
    Mix,
}

impl std::str::FromStr for AudioMixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concatenate" | "concat" => Ok(Self::Concatenate),
            "mix" => Ok(Self::Mix),
            other => Err(format!("unknown audio mix mode: {other} (use concatenate|mix)")),
        }
    }
}

/// Contents of the pipeline configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MontageConfig {
    pub clip_pre_seconds: Option<f64>,
    pub clip_post_seconds: Option<f64>,
    pub post_sec_preview_values: Option<Vec<f64>>,
    pub audio_peak_threshold: Option<f64>,
    pub default_grid_size: Option<String>,
    pub output_video_fps: Option<u32>,
    pub output_video_codec: Option<String>,
    pub output_video_bitrate: Option<String>,
    pub pre_roll_duration_seconds: Option<f64>,
    pub output_video_width_phone: Option<u32>,
    pub output_video_height_phone: Option<u32>,
    pub rotate_final_video_ccw_90: Option<bool>,
    pub audio_mix_mode: Option<AudioMixMode>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl MontageConfig {
    /// Read and parse the config at `path`.
    pub fn read(path: &Path) -> MontageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load config from `path`, falling back to defaults when the file is
    /// missing, unreadable, or malformed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// A config with every option set to its built-in default.
    pub fn populated() -> Self {
        Self {
            clip_pre_seconds: Some(defaults::CLIP_PRE_SECONDS),
            clip_post_seconds: Some(defaults::CLIP_POST_SECONDS),
            post_sec_preview_values: Some(vec![defaults::CLIP_POST_SECONDS]),
            audio_peak_threshold: Some(defaults::AUDIO_PEAK_THRESHOLD),
            default_grid_size: Some(defaults::GRID_SIZE.to_string()),
            output_video_fps: Some(defaults::OUTPUT_VIDEO_FPS),
            output_video_codec: Some(defaults::OUTPUT_VIDEO_CODEC.to_string()),
            output_video_bitrate: Some(defaults::OUTPUT_VIDEO_BITRATE.to_string()),
            pre_roll_duration_seconds: Some(defaults::PRE_ROLL_DURATION_SECONDS),
            output_video_width_phone: Some(defaults::OUTPUT_VIDEO_WIDTH_PHONE),
            output_video_height_phone: Some(defaults::OUTPUT_VIDEO_HEIGHT_PHONE),
            rotate_final_video_ccw_90: Some(false),
            audio_mix_mode: Some(AudioMixMode::default()),
            logging: LoggingConfig::default(),
        }
    }

    /// Write this config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Post-roll values to extract when no CLI override is given.
    pub fn post_sec_values(&self) -> Vec<f64> {
        match &self.post_sec_preview_values {
            Some(values) if !values.is_empty() => values.clone(),
            _ => vec![self
                .clip_post_seconds
                .unwrap_or(defaults::CLIP_POST_SECONDS)],
        }
    }

    pub fn output_video_fps(&self) -> u32 {
        self.output_video_fps.unwrap_or(defaults::OUTPUT_VIDEO_FPS)
    }

    pub fn output_video_codec(&self) -> String {
        self.output_video_codec
            .clone()
            .unwrap_or_else(|| defaults::OUTPUT_VIDEO_CODEC.to_string())
    }

    pub fn output_video_bitrate(&self) -> String {
        self.output_video_bitrate
            .clone()
            .unwrap_or_else(|| defaults::OUTPUT_VIDEO_BITRATE.to_string())
    }

    pub fn pre_roll_duration_seconds(&self) -> f64 {
        self.pre_roll_duration_seconds
            .unwrap_or(defaults::PRE_ROLL_DURATION_SECONDS)
    }

    pub fn output_video_width_phone(&self) -> u32 {
        self.output_video_width_phone
            .unwrap_or(defaults::OUTPUT_VIDEO_WIDTH_PHONE)
    }

    pub fn output_video_height_phone(&self) -> u32 {
        self.output_video_height_phone
            .unwrap_or(defaults::OUTPUT_VIDEO_HEIGHT_PHONE)
    }

    pub fn rotate_final_video_ccw_90(&self) -> bool {
        self.rotate_final_video_ccw_90.unwrap_or(false)
    }

    pub fn audio_mix_mode(&self) -> AudioMixMode {
        self.audio_mix_mode.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_unset_fields_empty() {
        let config: MontageConfig =
            serde_json::from_str(r#"{"clip_pre_seconds": 1.5, "rotate_final_video_ccw_90": true}"#)
                .unwrap();
        assert_eq!(config.clip_pre_seconds, Some(1.5));
        assert_eq!(config.audio_peak_threshold, None);
        assert!(config.rotate_final_video_ccw_90());
        assert_eq!(config.output_video_fps(), 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_post_sec_values_precedence() {
        let mut config = MontageConfig::default();
        assert_eq!(config.post_sec_values(), vec![2.0]);

        config.clip_post_seconds = Some(4.0);
        assert_eq!(config.post_sec_values(), vec![4.0]);

        config.post_sec_preview_values = Some(vec![1.0, 2.5]);
        assert_eq!(config.post_sec_values(), vec![1.0, 2.5]);
    }

    #[test]
    fn test_audio_mix_mode_parsing() {
        assert_eq!("mix".parse::<AudioMixMode>(), Ok(AudioMixMode::Mix));
        assert_eq!(
            "concatenate".parse::<AudioMixMode>(),
            Ok(AudioMixMode::Concatenate)
        );
        assert!("blend".parse::<AudioMixMode>().is_err());

        let config: MontageConfig = serde_json::from_str(r#"{"audio_mix_mode": "mix"}"#).unwrap();
        assert_eq!(config.audio_mix_mode(), AudioMixMode::Mix);
    }

    #[test]
    fn test_load_missing_and_malformed_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(MontageConfig::load(&missing), MontageConfig::default());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert_eq!(MontageConfig::load(&broken), MontageConfig::default());
        assert!(MontageConfig::read(&broken).is_err());
        assert!(MontageConfig::read(&missing).is_err());
    }

    #[test]
    fn test_save_and_load_populated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = MontageConfig::populated();
        config.save(&path).unwrap();

        let loaded = MontageConfig::load(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.default_grid_size.as_deref(), Some("3x3"));
    }
}
