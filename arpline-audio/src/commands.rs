use arpline_types::{NonPlayingMode, PlaybackSettings};

/// Messages from the UI thread to the audio processor, drained at the top of each block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArpCommand {
    SetSettings(PlaybackSettings),
    /// Per-instance override; `NonPlayingMode::None` defers to the global default.
    SetNonPlayingMode(NonPlayingMode),
    SetOctaveTransposition(bool),
}
