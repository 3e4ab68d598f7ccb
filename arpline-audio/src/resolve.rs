//! Map a compiled note's input index onto the keys held right now.
//!
//! With `N` keys held, index `i` plays key `i mod N`, shifted by `i / N`
//! octaves when transposition is on. Both use floor semantics so negative
//! indices count down octaves instead of snapping toward zero.

use arpline_types::{PlaybackSettings, VelocitySource, MIDI_NOTE_MAX};

use crate::input_tracker::InputTracker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedNote {
    pub midi_note: u8,
    pub velocity: f32,
    pub slot: usize,
    pub octave: i32,
}

/// Resolve one note. `None` when nothing is held or the transposed pitch
/// falls outside the MIDI range (or outside `i32`); the note makes no sound.
pub fn resolve_note(
    input_index: i32,
    stored_velocity: f32,
    tracker: &InputTracker,
    settings: &PlaybackSettings,
) -> Option<ResolvedNote> {
    let held = tracker.len() as i32;
    if held == 0 {
        return None;
    }

    let octave = input_index.div_euclid(held);
    let slot = input_index.rem_euclid(held) as usize;
    let key = tracker.get(slot)?;

    let shift = if settings.octave_transposition {
        octave.checked_mul(12)?
    } else {
        0
    };
    let pitch = (key.midi_note as i32).checked_add(shift)?;
    if !(0..=MIDI_NOTE_MAX as i32).contains(&pitch) {
        return None;
    }

    let velocity = match settings.velocity_source {
        VelocitySource::Pattern => stored_velocity,
        VelocitySource::Input => key.velocity,
    };

    Some(ResolvedNote {
        midi_note: pitch as u8,
        velocity,
        slot,
        octave,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(notes: &[(u8, f32)]) -> InputTracker {
        let mut t = InputTracker::new();
        for &(n, v) in notes {
            t.note_on(n, v);
        }
        t
    }

    fn pitch(index: i32, tracker: &InputTracker, settings: &PlaybackSettings) -> Option<u8> {
        resolve_note(index, 0.8, tracker, settings).map(|r| r.midi_note)
    }

    #[test]
    fn octave_resolution_with_two_keys() {
        let t = held(&[(60, 1.0), (64, 1.0)]);
        let s = PlaybackSettings::default();
        let resolved: Vec<Option<u8>> = (0..4).map(|i| pitch(i, &t, &s)).collect();
        assert_eq!(resolved, vec![Some(60), Some(64), Some(72), Some(76)]);
    }

    #[test]
    fn overflow_wraps_without_transposition() {
        let t = held(&[(60, 1.0), (64, 1.0)]);
        let s = PlaybackSettings {
            octave_transposition: false,
            ..PlaybackSettings::default()
        };
        let resolved: Vec<Option<u8>> = (0..4).map(|i| pitch(i, &t, &s)).collect();
        assert_eq!(resolved, vec![Some(60), Some(64), Some(60), Some(64)]);
    }

    #[test]
    fn negative_indices_floor() {
        let t = held(&[(60, 1.0), (64, 1.0), (67, 1.0)]);
        let s = PlaybackSettings::default();
        // -1 → slot 2, octave -1
        let r = resolve_note(-1, 0.8, &t, &s).unwrap();
        assert_eq!((r.slot, r.octave, r.midi_note), (2, -1, 55));
        assert_eq!(pitch(-3, &t, &s), Some(48));
        assert_eq!(pitch(-4, &t, &s), Some(43));
    }

    #[test]
    fn nothing_held_is_silent() {
        let t = InputTracker::new();
        assert_eq!(pitch(0, &t, &PlaybackSettings::default()), None);
    }

    #[test]
    fn out_of_range_pitch_is_silent() {
        let t = held(&[(120, 1.0)]);
        let s = PlaybackSettings::default();
        assert_eq!(pitch(0, &t, &s), Some(120));
        assert_eq!(pitch(1, &t, &s), None);
        let low = held(&[(5, 1.0)]);
        assert_eq!(pitch(-1, &low, &s), None);
    }

    #[test]
    fn extreme_indices_are_silent() {
        let t = held(&[(60, 1.0)]);
        let s = PlaybackSettings::default();
        assert_eq!(pitch(i32::MAX, &t, &s), None);
        assert_eq!(pitch(i32::MIN, &t, &s), None);

        let flat = PlaybackSettings {
            octave_transposition: false,
            ..PlaybackSettings::default()
        };
        assert_eq!(pitch(i32::MAX, &t, &flat), Some(60));
        assert_eq!(pitch(i32::MIN, &t, &flat), Some(60));
    }

    #[test]
    fn velocity_source() {
        let t = held(&[(60, 0.3)]);
        let mut s = PlaybackSettings::default();
        assert_eq!(resolve_note(0, 0.9, &t, &s).unwrap().velocity, 0.9);
        s.velocity_source = VelocitySource::Input;
        assert_eq!(resolve_note(0, 0.9, &t, &s).unwrap().velocity, 0.3);
    }

    #[test]
    fn shrinking_input_wraps_instead_of_dropping() {
        let mut t = held(&[(60, 1.0), (62, 1.0), (64, 1.0)]);
        let s = PlaybackSettings::default();
        assert_eq!(pitch(2, &t, &s), Some(64));
        t.note_off(64);
        // index 2 now overflows two held keys: slot 0, one octave up
        assert_eq!(pitch(2, &t, &s), Some(72));
    }
}
