#![allow(dead_code)]

use arpline_audio::{create, ArpHandle, ArpProcessor, HostTransport};
use arpline_core::{PatternEditor, SharedPattern};
use arpline_types::{InputEvent, NoteEventKind, OutputNoteEvent, Pattern, PlaybackSettings};

pub const SAMPLE_RATE: f64 = 48000.0;
/// At 120 bpm and 48 kHz with timebase 96.
pub const SAMPLES_PER_TICK: u32 = 250;

pub fn host(playing: bool, ppq: f64) -> HostTransport {
    HostTransport {
        is_playing: playing,
        ppq_position: ppq,
        tempo_bpm: 120.0,
        sample_rate: SAMPLE_RATE,
        ..HostTransport::default()
    }
}

/// Host transport positioned at an absolute tick (timebase 96).
pub fn host_at_tick(tick: i64) -> HostTransport {
    host(true, tick as f64 / 96.0)
}

/// Editor wired to a processor, on an empty pattern of `beats` beats at timebase 96.
pub fn rig(beats: u32) -> (PatternEditor<ArpHandle>, ArpProcessor) {
    rig_with(beats, PlaybackSettings::default())
}

pub fn rig_with(beats: u32, settings: PlaybackSettings) -> (PatternEditor<ArpHandle>, ArpProcessor) {
    let (handle, processor) = create(settings, arpline_types::Timeline::empty());
    let editor = PatternEditor::new(SharedPattern::new(Pattern::with_length(96, beats)), handle);
    (editor, processor)
}

/// Run one block covering ticks `[start, end)`.
pub fn run_ticks(
    processor: &mut ArpProcessor,
    start: i64,
    end: i64,
    input: &[InputEvent],
) -> Vec<OutputNoteEvent> {
    let mut out = Vec::new();
    let samples = ((end - start) as u32) * SAMPLES_PER_TICK;
    processor.process(&host_at_tick(start), samples, input, &mut out);
    out
}

pub fn pitches(events: &[OutputNoteEvent], kind: NoteEventKind) -> Vec<u8> {
    events.iter().filter(|e| e.kind == kind).map(|e| e.midi_note).collect()
}
