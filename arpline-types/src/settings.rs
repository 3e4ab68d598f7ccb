use serde::{Deserialize, Serialize};

/// What to do with held keys while the host transport is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NonPlayingMode {
    /// Defer to the process-wide default.
    #[default]
    None,
    Silence,
    Passthrough,
    Pattern,
}

impl NonPlayingMode {
    pub const ALL: [NonPlayingMode; 4] = [
        NonPlayingMode::None,
        NonPlayingMode::Silence,
        NonPlayingMode::Passthrough,
        NonPlayingMode::Pattern,
    ];

    /// Resolve an instance setting against the global default.
    /// A global default of `None` means silence.
    pub fn resolve(self, global: NonPlayingMode) -> NonPlayingMode {
        match (self, global) {
            (NonPlayingMode::None, NonPlayingMode::None) => NonPlayingMode::Silence,
            (NonPlayingMode::None, global) => global,
            (mode, _) => mode,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NonPlayingMode::None => "none",
            NonPlayingMode::Silence => "silence",
            NonPlayingMode::Passthrough => "passthrough",
            NonPlayingMode::Pattern => "pattern",
        }
    }

    pub fn from_name(s: &str) -> Option<NonPlayingMode> {
        match s.to_lowercase().as_str() {
            "none" | "default" => Some(NonPlayingMode::None),
            "silence" | "silent" => Some(NonPlayingMode::Silence),
            "passthrough" | "thru" => Some(NonPlayingMode::Passthrough),
            "pattern" => Some(NonPlayingMode::Pattern),
            _ => None,
        }
    }
}

/// Where an output note takes its velocity from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocitySource {
    /// Velocity stored on the pattern note.
    #[default]
    Pattern,
    /// Velocity of the held key the note resolved to.
    Input,
}

impl VelocitySource {
    pub fn name(&self) -> &'static str {
        match self {
            VelocitySource::Pattern => "pattern",
            VelocitySource::Input => "input",
        }
    }

    pub fn from_name(s: &str) -> Option<VelocitySource> {
        match s.to_lowercase().as_str() {
            "pattern" => Some(VelocitySource::Pattern),
            "input" => Some(VelocitySource::Input),
            _ => None,
        }
    }
}

/// Settings the playback engine reads every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Shift by whole octaves when a note index exceeds the held-note count.
    pub octave_transposition: bool,
    pub velocity_source: VelocitySource,
    /// Per-instance override.
    pub non_playing_mode: NonPlayingMode,
    /// Process-wide default, from config.
    pub default_non_playing_mode: NonPlayingMode,
}

impl PlaybackSettings {
    pub fn effective_non_playing_mode(&self) -> NonPlayingMode {
        self.non_playing_mode.resolve(self.default_non_playing_mode)
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            octave_transposition: true,
            velocity_source: VelocitySource::Pattern,
            non_playing_mode: NonPlayingMode::None,
            default_non_playing_mode: NonPlayingMode::Silence,
        }
    }
}
