use serde::{Deserialize, Serialize};

use crate::pattern::DEFAULT_TIMEBASE;

/// All on/off transitions that happen at one tick of the loop.
/// `on` and `off` hold compiled note indices, sorted and without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledEvent {
    pub tick: i64,
    pub on: Vec<usize>,
    pub off: Vec<usize>,
}

/// Static data needed to turn a compiled note index into a sounding note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteMeta {
    pub source_note_index: usize,
    pub input_index: i32,
    pub velocity: f32,
    pub pan: f32,
}

/// Immutable per-loop schedule built from a `Pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub timebase: u32,
    pub loop_length: i64,
    /// Ascending by tick, one entry per distinct tick.
    pub events: Vec<CompiledEvent>,
    pub note_meta: Vec<NoteMeta>,
}

impl Timeline {
    pub fn empty() -> Self {
        Self {
            timebase: DEFAULT_TIMEBASE,
            loop_length: DEFAULT_TIMEBASE as i64 * 4,
            events: Vec::new(),
            note_meta: Vec::new(),
        }
    }

    pub fn note_count(&self) -> usize {
        self.note_meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn note_meta(&self, index: usize) -> Option<&NoteMeta> {
        self.note_meta.get(index)
    }

    /// Events with `lo <= tick < hi`, in ascending order.
    pub fn events_in(&self, lo: i64, hi: i64) -> &[CompiledEvent] {
        if hi <= lo {
            return &[];
        }
        let start = self.events.partition_point(|e| e.tick < lo);
        let end = self.events.partition_point(|e| e.tick < hi);
        &self.events[start..end]
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::empty()
    }
}
