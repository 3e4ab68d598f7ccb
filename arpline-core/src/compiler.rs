//! Pattern → Timeline compilation.
//!
//! Each note contributes an "on" at `start mod loop_length`, an "off" at
//! `end mod loop_length`, and an extra "off" at tick 0. The tick-0 off forces
//! any note whose interval straddles the loop end to stop when the loop wraps;
//! off is idempotent, so other notes are unaffected.

use std::collections::{BTreeMap, BTreeSet};

use arpline_types::{CompiledEvent, NoteMeta, Pattern, Timeline};

use crate::store::SharedPattern;

#[derive(Default)]
struct TickEntry {
    on: BTreeSet<usize>,
    off: BTreeSet<usize>,
}

/// Compile a pattern snapshot into a timeline. Deterministic and infallible.
pub fn compile(pattern: &Pattern) -> Timeline {
    if pattern.loop_length <= 0 {
        log::debug!(target: "compiler", "loop length {} is not positive, compiling empty timeline", pattern.loop_length);
        return Timeline {
            timebase: pattern.timebase,
            loop_length: 1,
            events: Vec::new(),
            note_meta: Vec::new(),
        };
    }

    let loop_length = pattern.loop_length;
    let mut ticks: BTreeMap<i64, TickEntry> = BTreeMap::new();
    let mut note_meta = Vec::with_capacity(pattern.notes.len());

    for (i, note) in pattern.notes.iter().enumerate() {
        if !note.is_valid() {
            log::debug!(
                target: "compiler",
                "note {} has malformed range [{}, {})",
                i, note.start_tick, note.end_tick
            );
        }
        let on_tick = note.start_tick.rem_euclid(loop_length);
        let off_tick = note.end_tick.rem_euclid(loop_length);

        ticks.entry(on_tick).or_default().on.insert(i);
        ticks.entry(off_tick).or_default().off.insert(i);
        ticks.entry(0).or_default().off.insert(i);

        note_meta.push(NoteMeta {
            source_note_index: i,
            input_index: note.data.input_index,
            velocity: note.data.velocity,
            pan: note.data.pan,
        });
    }

    let events = ticks
        .into_iter()
        .map(|(tick, entry)| CompiledEvent {
            tick,
            on: entry.on.into_iter().collect(),
            off: entry.off.into_iter().collect(),
        })
        .collect();

    Timeline {
        timebase: pattern.timebase,
        loop_length,
        events,
        note_meta,
    }
}

/// Compile while holding the pattern lock for the whole read.
pub fn compile_shared(pattern: &SharedPattern) -> Timeline {
    pattern.with(compile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpline_types::{NoteDatum, PatternNote};

    fn pattern_with(notes: &[(i32, i64, i64)], loop_length: i64) -> Pattern {
        let mut p = Pattern::new();
        p.set_loop_bounds(0, loop_length);
        for &(input, start, end) in notes {
            p.insert_note(PatternNote::new(NoteDatum::new(input, 0.8, 0.0), start, end));
        }
        p
    }

    fn ons_at(timeline: &Timeline, tick: i64) -> Vec<usize> {
        timeline
            .events
            .iter()
            .find(|e| e.tick == tick)
            .map(|e| e.on.clone())
            .unwrap_or_default()
    }

    fn offs_at(timeline: &Timeline, tick: i64) -> Vec<usize> {
        timeline
            .events
            .iter()
            .find(|e| e.tick == tick)
            .map(|e| e.off.clone())
            .unwrap_or_default()
    }

    #[test]
    fn empty_pattern_compiles_to_no_events() {
        let timeline = compile(&Pattern::new());
        assert!(timeline.events.is_empty());
        assert!(timeline.note_meta.is_empty());
        assert_eq!(timeline.loop_length, 384);
    }

    #[test]
    fn single_note_has_on_off_and_wrap_off() {
        let timeline = compile(&pattern_with(&[(0, 24, 48)], 96));
        assert_eq!(timeline.events.len(), 3);
        assert_eq!(offs_at(&timeline, 0), vec![0]);
        assert_eq!(ons_at(&timeline, 24), vec![0]);
        assert_eq!(offs_at(&timeline, 48), vec![0]);
    }

    #[test]
    fn events_are_ascending_and_grouped() {
        let timeline = compile(&pattern_with(&[(0, 0, 24), (1, 24, 48), (2, 24, 72)], 96));
        let ticks: Vec<i64> = timeline.events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 24, 48, 72]);
        assert_eq!(ons_at(&timeline, 24), vec![1, 2]);
        assert_eq!(offs_at(&timeline, 24), vec![0]);
        assert_eq!(ons_at(&timeline, 0), vec![0]);
        assert_eq!(offs_at(&timeline, 0), vec![0, 1, 2]);
    }

    #[test]
    fn ticks_reduce_modulo_loop_length() {
        let timeline = compile(&pattern_with(&[(0, 100, 130)], 96));
        assert_eq!(ons_at(&timeline, 4), vec![0]);
        assert_eq!(offs_at(&timeline, 34), vec![0]);
    }

    #[test]
    fn wrapping_note_is_forced_off_at_origin() {
        // [80, 110) wraps to on=80, off=14; the tick-0 off stops it at the loop end.
        let timeline = compile(&pattern_with(&[(0, 80, 110)], 96));
        assert_eq!(offs_at(&timeline, 0), vec![0]);
        assert_eq!(offs_at(&timeline, 14), vec![0]);
        assert_eq!(ons_at(&timeline, 80), vec![0]);
    }

    #[test]
    fn full_loop_note_collapses_to_one_tick() {
        let timeline = compile(&pattern_with(&[(0, 0, 96)], 96));
        assert_eq!(timeline.events.len(), 1);
        assert_eq!(timeline.events[0].on, vec![0]);
        assert_eq!(timeline.events[0].off, vec![0]);
    }

    #[test]
    fn non_positive_loop_length_is_empty() {
        let mut p = pattern_with(&[(0, 0, 24)], 96);
        p.loop_length = 0;
        let timeline = compile(&p);
        assert!(timeline.events.is_empty());
        assert_eq!(timeline.loop_length, 1);
        p.loop_length = -5;
        assert!(compile(&p).events.is_empty());
    }

    #[test]
    fn negative_ticks_floor_into_range() {
        let timeline = compile(&pattern_with(&[(0, -24, -12)], 96));
        assert_eq!(ons_at(&timeline, 72), vec![0]);
        assert_eq!(offs_at(&timeline, 84), vec![0]);
    }

    #[test]
    fn note_meta_follows_storage_order() {
        let mut p = pattern_with(&[], 96);
        p.insert_note(PatternNote::new(NoteDatum::new(3, 0.25, -0.5), 0, 10));
        p.insert_note(PatternNote::new(NoteDatum::new(1, 1.0, 0.5), 10, 20));
        let timeline = compile(&p);
        assert_eq!(timeline.note_meta[0].source_note_index, 0);
        assert_eq!(timeline.note_meta[0].input_index, 3);
        assert_eq!(timeline.note_meta[0].velocity, 0.25);
        assert_eq!(timeline.note_meta[1].pan, 0.5);
    }

    #[test]
    fn compile_is_deterministic() {
        let p = pattern_with(&[(0, 0, 24), (1, 12, 60), (2, 90, 130)], 96);
        assert_eq!(compile(&p), compile(&p));
    }

    #[test]
    fn compile_shared_reads_under_lock() {
        let shared = SharedPattern::new(pattern_with(&[(0, 0, 48)], 96));
        let timeline = compile_shared(&shared);
        assert_eq!(timeline.note_count(), 1);
    }
}
