use std::collections::BTreeSet;

use arpline_core::compiler::{compile, compile_shared};
use arpline_core::persistence::{preset_from_str, preset_to_string};
use arpline_core::SharedPattern;
use arpline_types::{NoteDatum, Pattern, PatternNote};

/// Small deterministic generator so failures reproduce.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn random_pattern(rng: &mut XorShift) -> Pattern {
    let beats = 1 + rng.below(8) as u32;
    let mut pattern = Pattern::with_length(96, beats);
    let span = pattern.loop_length as u64 * 2;
    for _ in 0..rng.below(24) {
        let start = rng.below(span) as i64;
        let len = 1 + rng.below(span) as i64;
        let data = NoteDatum::new(rng.below(8) as i32 - 2, rng.below(101) as f32 / 100.0, 0.0);
        pattern.insert_note(PatternNote::new(data, start, start + len));
    }
    pattern
}

#[test]
fn test_every_note_has_on_off_and_tick_zero_off() {
    let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
    for _ in 0..200 {
        let pattern = random_pattern(&mut rng);
        let timeline = compile(&pattern);
        let l = pattern.loop_length;

        assert_eq!(timeline.note_count(), pattern.notes.len());
        for (i, note) in pattern.notes.iter().enumerate() {
            let on_tick = note.start_tick.rem_euclid(l);
            let off_tick = note.end_tick.rem_euclid(l);
            let ons: Vec<i64> = timeline.events.iter().filter(|e| e.on.contains(&i)).map(|e| e.tick).collect();
            assert_eq!(ons, vec![on_tick], "note {} on", i);
            let offs: BTreeSet<i64> = timeline.events.iter().filter(|e| e.off.contains(&i)).map(|e| e.tick).collect();
            assert!(offs.contains(&off_tick), "note {} off", i);
            assert!(offs.contains(&0), "note {} tick-0 off", i);
            assert!(offs.len() <= 2);
        }
    }
}

#[test]
fn test_events_are_ascending_and_in_range() {
    let mut rng = XorShift(42);
    for _ in 0..200 {
        let pattern = random_pattern(&mut rng);
        let timeline = compile(&pattern);
        for pair in timeline.events.windows(2) {
            assert!(pair[0].tick < pair[1].tick);
        }
        for event in &timeline.events {
            assert!((0..timeline.loop_length).contains(&event.tick));
            assert!(event.on.windows(2).all(|w| w[0] < w[1]));
            assert!(event.off.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

#[test]
fn test_compile_is_deterministic() {
    let mut rng = XorShift(7);
    for _ in 0..50 {
        let pattern = random_pattern(&mut rng);
        let shared = SharedPattern::new(pattern.clone());
        assert_eq!(compile(&pattern), compile_shared(&shared));
        assert_eq!(compile(&pattern), compile(&pattern.clone()));
    }
}

#[test]
fn test_preset_round_trip_compiles_identically() {
    let mut rng = XorShift(1234);
    for _ in 0..50 {
        let pattern = random_pattern(&mut rng);
        let json = preset_to_string(&pattern).unwrap();
        let restored = preset_from_str(&json).unwrap();
        assert_eq!(compile(&restored), compile(&pattern));
    }
}
