use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arpline_types::{NonPlayingMode, Pattern, PlaybackSettings, VelocitySource};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    pattern: PatternConfig,
    #[serde(default)]
    playback: PlaybackConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct PatternConfig {
    timebase: Option<u32>,
    loop_beats: Option<u32>,
}

#[derive(Serialize, Deserialize, Default)]
struct PlaybackConfig {
    non_playing_mode: Option<String>,
    octave_transposition: Option<bool>,
    velocity_source: Option<String>,
}

/// Process-wide preferences. Built once at startup and passed explicitly to
/// whatever needs it; nothing reads it through a global.
pub struct Config {
    pattern: PatternConfig,
    playback: PlaybackConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if there is one.
    /// A missing or malformed user file only logs a warning.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                if let Err(e) = config.merge_file(&path) {
                    log::warn!(target: "config", "ignoring config {}: {}", path.display(), e);
                }
            }
        }
        config
    }

    /// Embedded defaults merged with an explicit file. Errors are returned.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::embedded();
        config.merge_file(path)?;
        Ok(config)
    }

    fn embedded() -> Self {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is malformed: {}", e);
            ConfigFile::default()
        });
        Config {
            pattern: base.pattern,
            playback: base.playback,
        }
    }

    fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let user: ConfigFile = toml::from_str(&contents)?;
        merge_pattern(&mut self.pattern, user.pattern);
        merge_playback(&mut self.playback, user.playback);
        log::debug!(target: "config", "merged {}", path.display());
        Ok(())
    }

    /// Write the merged values so they load back identically.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let file = ConfigFile {
            pattern: PatternConfig {
                timebase: Some(self.timebase()),
                loop_beats: Some(self.loop_beats()),
            },
            playback: PlaybackConfig {
                non_playing_mode: Some(self.default_non_playing_mode().name().to_string()),
                octave_transposition: Some(self.octave_transposition()),
                velocity_source: Some(self.velocity_source().name().to_string()),
            },
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Ticks per beat for new patterns (at least 1).
    pub fn timebase(&self) -> u32 {
        self.pattern.timebase.unwrap_or(96).max(1)
    }

    /// Loop length of new patterns, in beats (1..=64).
    pub fn loop_beats(&self) -> u32 {
        self.pattern.loop_beats.unwrap_or(4).clamp(1, 64)
    }

    pub fn default_non_playing_mode(&self) -> NonPlayingMode {
        self.playback
            .non_playing_mode
            .as_deref()
            .and_then(NonPlayingMode::from_name)
            .unwrap_or(NonPlayingMode::Silence)
    }

    pub fn octave_transposition(&self) -> bool {
        self.playback.octave_transposition.unwrap_or(true)
    }

    pub fn velocity_source(&self) -> VelocitySource {
        self.playback
            .velocity_source
            .as_deref()
            .and_then(VelocitySource::from_name)
            .unwrap_or_default()
    }

    /// Engine settings with no per-instance override.
    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            octave_transposition: self.octave_transposition(),
            velocity_source: self.velocity_source(),
            non_playing_mode: NonPlayingMode::None,
            default_non_playing_mode: self.default_non_playing_mode(),
        }
    }

    pub fn default_pattern(&self) -> Pattern {
        Pattern::with_length(self.timebase(), self.loop_beats())
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("arpline").join("config.toml"))
}

fn merge_pattern(base: &mut PatternConfig, user: PatternConfig) {
    if user.timebase.is_some() {
        base.timebase = user.timebase;
    }
    if user.loop_beats.is_some() {
        base.loop_beats = user.loop_beats;
    }
}

fn merge_playback(base: &mut PlaybackConfig, user: PlaybackConfig) {
    if user.non_playing_mode.is_some() {
        base.non_playing_mode = user.non_playing_mode;
    }
    if user.octave_transposition.is_some() {
        base.octave_transposition = user.octave_transposition;
    }
    if user.velocity_source.is_some() {
        base.velocity_source = user.velocity_source;
    }
}
