use arpline_types::{InputEvent, InputEventKind};

/// Every MIDI note can be held at once; the buffer never grows past this.
const MAX_HELD_NOTES: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldNote {
    pub midi_note: u8,
    pub velocity: f32,
}

/// Currently held keys, kept sorted by MIDI note (ascending).
///
/// Owned by the audio thread. Storage is reserved up front so key presses
/// never allocate.
#[derive(Debug, Clone)]
pub struct InputTracker {
    notes: Vec<HeldNote>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self {
            notes: Vec::with_capacity(MAX_HELD_NOTES),
        }
    }

    /// Press a key. Pressing an already held key only refreshes its velocity.
    pub fn note_on(&mut self, midi_note: u8, velocity: f32) {
        let velocity = velocity.clamp(0.0, 1.0);
        match self.notes.binary_search_by_key(&midi_note, |n| n.midi_note) {
            Ok(pos) => self.notes[pos].velocity = velocity,
            Err(pos) => self.notes.insert(pos, HeldNote { midi_note, velocity }),
        }
    }

    /// Release a key. Releasing a key that is not held is a no-op.
    pub fn note_off(&mut self, midi_note: u8) {
        if let Ok(pos) = self.notes.binary_search_by_key(&midi_note, |n| n.midi_note) {
            self.notes.remove(pos);
        }
    }

    pub fn apply(&mut self, event: &InputEvent) {
        match event.kind {
            InputEventKind::NoteOn { note, velocity } => self.note_on(note, velocity),
            InputEventKind::NoteOff { note } => self.note_off(note),
        }
    }

    pub fn get(&self, slot: usize) -> Option<&HeldNote> {
        self.notes.get(slot)
    }

    pub fn contains(&self, midi_note: u8) -> bool {
        self.notes
            .binary_search_by_key(&midi_note, |n| n.midi_note)
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeldNote> {
        self.notes.iter()
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitches(tracker: &InputTracker) -> Vec<u8> {
        tracker.iter().map(|n| n.midi_note).collect()
    }

    #[test]
    fn keeps_ascending_order() {
        let mut t = InputTracker::new();
        t.note_on(67, 0.5);
        t.note_on(60, 0.5);
        t.note_on(64, 0.5);
        assert_eq!(pitches(&t), vec![60, 64, 67]);
        assert_eq!(t.get(1).unwrap().midi_note, 64);
    }

    #[test]
    fn repeated_press_updates_velocity() {
        let mut t = InputTracker::new();
        t.note_on(60, 0.5);
        t.note_on(60, 0.9);
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0).unwrap().velocity, 0.9);
    }

    #[test]
    fn release() {
        let mut t = InputTracker::new();
        t.apply(&InputEvent::note_on(0, 60, 1.0));
        t.apply(&InputEvent::note_on(0, 62, 1.0));
        t.apply(&InputEvent::note_off(0, 60));
        t.note_off(99);
        assert_eq!(pitches(&t), vec![62]);
        assert!(t.contains(62));
        assert!(!t.contains(60));
    }

    #[test]
    fn holding_every_key_does_not_grow() {
        let mut t = InputTracker::new();
        let cap = t.notes.capacity();
        for n in 0..=127u8 {
            t.note_on(n, 1.0);
        }
        assert_eq!(t.len(), 128);
        assert_eq!(t.notes.capacity(), cap);
    }
}
