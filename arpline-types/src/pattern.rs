use serde::{Deserialize, Serialize};

/// Ticks per beat for newly created patterns.
pub const DEFAULT_TIMEBASE: u32 = 96;

/// What a pattern note plays: which held input note, how loud, where in the stereo field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteDatum {
    pub input_index: i32,
    pub velocity: f32, // 0.0-1.0
    pub pan: f32,      // -1.0-1.0
}

impl NoteDatum {
    pub fn new(input_index: i32, velocity: f32, pan: f32) -> Self {
        Self {
            input_index,
            velocity: velocity.clamp(0.0, 1.0),
            pan: pan.clamp(-1.0, 1.0),
        }
    }
}

impl Default for NoteDatum {
    fn default() -> Self {
        Self {
            input_index: 0,
            velocity: 0.8,
            pan: 0.0,
        }
    }
}

/// A note placed on the pattern grid. Ticks are absolute; the compiler
/// reduces them modulo the loop length, so a note may wrap across the loop end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternNote {
    pub data: NoteDatum,
    pub start_tick: i64,
    pub end_tick: i64,
}

impl PatternNote {
    pub fn new(data: NoteDatum, start_tick: i64, end_tick: i64) -> Self {
        Self {
            data,
            start_tick,
            end_tick,
        }
    }

    pub fn length(&self) -> i64 {
        self.end_tick.saturating_sub(self.start_tick)
    }

    /// Zero-length and negative-start notes are not allowed in a well-formed pattern.
    pub fn is_valid(&self) -> bool {
        self.start_tick >= 0 && self.end_tick > self.start_tick
    }
}

/// The user-authored, editable pattern.
///
/// This is a thin value container: mutators do not validate. The editor clamps
/// before it mutates, and the compiler copes with whatever it is handed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub timebase: u32,
    pub loop_length: i64,
    pub loop_start: i64,
    pub loop_end: i64,
    pub notes: Vec<PatternNote>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::with_length(DEFAULT_TIMEBASE, 4)
    }

    /// Empty pattern looping over `beats` beats.
    pub fn with_length(timebase: u32, beats: u32) -> Self {
        let loop_length = (timebase as i64 * beats as i64).max(1);
        Self {
            timebase,
            loop_length,
            loop_start: 0,
            loop_end: loop_length,
            notes: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[PatternNote] {
        &self.notes
    }

    pub fn timebase(&self) -> u32 {
        self.timebase
    }

    pub fn note_mut(&mut self, index: usize) -> Option<&mut PatternNote> {
        self.notes.get_mut(index)
    }

    /// Append a note and return its index (storage order is the compiled note index).
    pub fn insert_note(&mut self, note: PatternNote) -> usize {
        self.notes.push(note);
        self.notes.len() - 1
    }

    /// Insert a note at a specific storage position, shifting later notes up.
    pub fn insert_note_at(&mut self, index: usize, note: PatternNote) -> usize {
        let index = index.min(self.notes.len());
        self.notes.insert(index, note);
        index
    }

    pub fn remove_note(&mut self, index: usize) -> Option<PatternNote> {
        if index < self.notes.len() {
            Some(self.notes.remove(index))
        } else {
            None
        }
    }

    /// Set the loop markers; the loop length follows them.
    pub fn set_loop_bounds(&mut self, start: i64, end: i64) {
        self.loop_start = start;
        self.loop_end = end;
        self.loop_length = end.saturating_sub(start).max(1);
    }

    pub fn set_timebase(&mut self, timebase: u32) {
        self.timebase = timebase;
    }

    /// Loop length in beats (float, for display).
    pub fn loop_beats(&self) -> f64 {
        if self.timebase == 0 {
            return 0.0;
        }
        self.loop_length as f64 / self.timebase as f64
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pattern_is_four_beats() {
        let p = Pattern::new();
        assert_eq!(p.timebase, 96);
        assert_eq!(p.loop_length, 384);
        assert_eq!(p.loop_end, 384);
        assert!(p.notes.is_empty());
    }

    #[test]
    fn note_datum_clamps() {
        let d = NoteDatum::new(2, 1.5, -3.0);
        assert_eq!(d.velocity, 1.0);
        assert_eq!(d.pan, -1.0);
    }

    #[test]
    fn extreme_ranges_saturate() {
        let note = PatternNote::new(NoteDatum::default(), i64::MIN, i64::MAX);
        assert_eq!(note.length(), i64::MAX);
        assert!(!note.is_valid());
        let mut p = Pattern::new();
        p.set_loop_bounds(i64::MIN, i64::MAX);
        assert_eq!(p.loop_length, i64::MAX);
    }

    #[test]
    fn insert_and_remove_keep_storage_order() {
        let mut p = Pattern::new();
        let a = p.insert_note(PatternNote::new(NoteDatum::default(), 0, 24));
        let b = p.insert_note(PatternNote::new(NoteDatum::new(1, 0.5, 0.0), 24, 48));
        assert_eq!((a, b), (0, 1));
        let removed = p.remove_note(0).unwrap();
        assert_eq!(removed.start_tick, 0);
        assert_eq!(p.notes[0].data.input_index, 1);
        assert!(p.remove_note(5).is_none());
    }

    #[test]
    fn loop_bounds_drive_length() {
        let mut p = Pattern::new();
        p.set_loop_bounds(96, 288);
        assert_eq!(p.loop_length, 192);
        p.set_loop_bounds(10, 10);
        assert_eq!(p.loop_length, 1);
    }

    #[test]
    fn validity() {
        let d = NoteDatum::default();
        assert!(PatternNote::new(d, 0, 1).is_valid());
        assert!(!PatternNote::new(d, 5, 5).is_valid());
        assert!(!PatternNote::new(d, -1, 5).is_valid());
    }
}
