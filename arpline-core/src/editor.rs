//! Editing entry points used by the pattern editor UI.
//!
//! `PatternEditor` owns the shared pattern on the UI thread. Every edit clamps
//! its input, mutates under a single lock, recompiles, and hands the new
//! `Timeline` to a `TimelinePublisher` (the audio handle in practice).

use std::path::Path;

use arpline_types::{NoteDatum, Pattern, PatternNote, Timeline};

use crate::compiler::compile;
use crate::persistence::{self, PresetError};
use crate::store::SharedPattern;

/// Receiver of freshly compiled timelines and stop requests.
pub trait TimelinePublisher {
    fn publish(&mut self, timeline: Timeline);
    fn request_stop(&mut self);
}

/// Latest start tick that still leaves room for a one-tick note.
const LAST_START: i64 = i64::MAX - 1;

pub struct PatternEditor<P: TimelinePublisher> {
    pattern: SharedPattern,
    publisher: P,
    /// Set when the last preset load failed; the UI marks the editor invalid.
    load_error: Option<String>,
}

impl<P: TimelinePublisher> PatternEditor<P> {
    /// Create an editor and publish the initial timeline.
    pub fn new(pattern: SharedPattern, publisher: P) -> Self {
        let mut editor = Self {
            pattern,
            publisher,
            load_error: None,
        };
        editor.build_pattern();
        editor
    }

    pub fn pattern(&self) -> &SharedPattern {
        &self.pattern
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn notes(&self) -> Vec<PatternNote> {
        self.pattern.with(|p| p.notes.clone())
    }

    pub fn timebase(&self) -> u32 {
        self.pattern.with(|p| p.timebase)
    }

    pub fn loop_length(&self) -> i64 {
        self.pattern.with(|p| p.loop_length)
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Recompile the current pattern and publish it.
    pub fn build_pattern(&mut self) {
        let timeline = self.pattern.with(compile);
        log::debug!(
            target: "editor",
            "built timeline: {} notes, {} events, loop {}",
            timeline.note_count(), timeline.events.len(), timeline.loop_length
        );
        self.publisher.publish(timeline);
    }

    /// Draw a new note. Start is clamped to 0 and length to at least one tick.
    /// Ends past `i64::MAX` saturate.
    pub fn create_note(
        &mut self,
        input_index: i32,
        start_tick: i64,
        length: i64,
        velocity: f32,
        pan: f32,
    ) -> usize {
        let start = start_tick.clamp(0, LAST_START);
        let note = PatternNote::new(
            NoteDatum::new(input_index, velocity, pan),
            start,
            start.saturating_add(length.max(1)),
        );
        let index = self.pattern.with_mut(|p| p.insert_note(note));
        self.build_pattern();
        index
    }

    /// Move a note's end. The note keeps at least one tick of length.
    pub fn resize_note(&mut self, index: usize, new_end: i64) -> bool {
        let changed = self.pattern.with_mut(|p| match p.note_mut(index) {
            Some(note) => {
                note.end_tick = new_end.max(note.start_tick.saturating_add(1));
                true
            }
            None => false,
        });
        if changed {
            self.build_pattern();
        }
        changed
    }

    /// Move a note in time and/or to another input row, preserving its length.
    pub fn move_note(&mut self, index: usize, new_start: i64, new_input_index: i32) -> bool {
        let changed = self.pattern.with_mut(|p| match p.note_mut(index) {
            Some(note) => {
                let length = note.length().max(1);
                note.start_tick = new_start.clamp(0, LAST_START);
                note.end_tick = note.start_tick.saturating_add(length);
                note.data = NoteDatum {
                    input_index: new_input_index,
                    ..note.data
                };
                true
            }
            None => false,
        });
        if changed {
            self.build_pattern();
        }
        changed
    }

    pub fn set_note_velocity(&mut self, index: usize, velocity: f32) -> bool {
        let changed = self.pattern.with_mut(|p| match p.note_mut(index) {
            Some(note) => {
                note.data = NoteDatum::new(note.data.input_index, velocity, note.data.pan);
                true
            }
            None => false,
        });
        if changed {
            self.build_pattern();
        }
        changed
    }

    pub fn delete_note(&mut self, index: usize) -> Option<PatternNote> {
        let removed = self.pattern.with_mut(|p| p.remove_note(index));
        if removed.is_some() {
            self.build_pattern();
        }
        removed
    }

    /// Copy a note so the copy starts where the original ends. Returns the copy's index.
    pub fn duplicate_note(&mut self, index: usize) -> Option<usize> {
        let copy = self.pattern.with_mut(|p| {
            let note = *p.notes.get(index)?;
            let length = note.length().max(1);
            let start = note.end_tick.clamp(0, LAST_START);
            let copy = PatternNote::new(note.data, start, start.saturating_add(length));
            Some(p.insert_note(copy))
        });
        if copy.is_some() {
            self.build_pattern();
        }
        copy
    }

    pub fn set_loop_bounds(&mut self, start: i64, end: i64) {
        let start = start.clamp(0, LAST_START);
        let end = end.max(start + 1);
        self.pattern.with_mut(|p| p.set_loop_bounds(start, end));
        self.build_pattern();
    }

    pub fn set_timebase(&mut self, timebase: u32) {
        self.pattern.with_mut(|p| p.set_timebase(timebase.max(1)));
        self.build_pattern();
    }

    /// Swap in a whole new pattern (e.g. from a preset) and rebuild.
    pub fn replace_pattern(&mut self, pattern: Pattern) {
        self.pattern.replace(pattern);
        self.load_error = None;
        self.build_pattern();
    }

    /// Load a preset. On failure the current pattern is left untouched and the
    /// error is remembered so the UI can flag the editor.
    pub fn load_preset(&mut self, path: &Path) -> Result<(), PresetError> {
        match persistence::load_preset(path) {
            Ok(pattern) => {
                self.replace_pattern(pattern);
                Ok(())
            }
            Err(e) => {
                log::warn!(target: "editor", "preset load failed for {}: {}", path.display(), e);
                self.load_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn save_preset(&self, path: &Path) -> Result<(), PresetError> {
        let pattern = self.pattern.snapshot();
        persistence::save_preset(path, &pattern)
    }

    /// Ask the audio side to silence everything at the next block.
    pub fn request_stop(&mut self) {
        self.publisher.request_stop();
    }
}
