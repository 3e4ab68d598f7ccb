//! # arpline-types
//!
//! Shared data model for the arpline arpeggiator.
//! Everything here is plain data: the editable pattern, the compiled timeline
//! the audio thread plays, and the note events flowing in and out of a block.

mod midi;
pub mod pattern;
pub mod settings;
pub mod timeline;

pub use midi::{InputEvent, InputEventKind, NoteEventKind, OutputNoteEvent, PASSTHROUGH_NOTE_INDEX};
pub use pattern::{NoteDatum, Pattern, PatternNote, DEFAULT_TIMEBASE};
pub use settings::{NonPlayingMode, PlaybackSettings, VelocitySource};
pub use timeline::{CompiledEvent, NoteMeta, Timeline};

/// Highest valid MIDI note number.
pub const MIDI_NOTE_MAX: u8 = 127;
