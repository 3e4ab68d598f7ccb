//! Block-by-block playback of a compiled `Timeline`.
//!
//! Each block the engine:
//! 1. flushes every sounding note at offset 0 if a stop was requested or a new
//!    timeline was installed;
//! 2. follows the host transport (start/stop/seek flush the same way);
//! 3. walks the timeline events crossed by the block, splitting the walk at
//!    loop wraps, applying offs before ons at each tick;
//! 4. while the host is stopped, applies the non-playing mode instead.
//!
//! Every "on" the engine emits is recorded in `sounding` until the matching
//! "off" is emitted, so no note can be left hanging across a flush.

use std::sync::Arc;

use arpline_types::{
    CompiledEvent, InputEvent, InputEventKind, NonPlayingMode, OutputNoteEvent, PlaybackSettings,
    Timeline, PASSTHROUGH_NOTE_INDEX,
};

use crate::input_tracker::InputTracker;
use crate::resolve::resolve_note;
use crate::transport::{beats_for_samples, HostTransport};

/// Compiled notes the engine can play and highlight. Storage for this many is
/// reserved up front; notes with a higher index stay silent.
pub const MAX_TRACKED_NOTES: usize = 1024;
/// Block starts further than this (in ticks) from the previous block end count as a seek.
const SEEK_TOLERANCE_TICKS: f64 = 0.5;
/// Tempo for the virtual transport when the host never reported one.
const FALLBACK_TEMPO_BPM: f64 = 120.0;
/// Slack for float positions that should sit exactly on a tick.
const TICK_EPSILON: f64 = 1e-6;
/// Upper bound on loop iterations walked in one block.
const MAX_LOOP_PASSES: usize = 4096;

/// Where output note events go.
pub trait NoteSink {
    fn push_note(&mut self, event: OutputNoteEvent);
}

impl NoteSink for Vec<OutputNoteEvent> {
    fn push_note(&mut self, event: OutputNoteEvent) {
        self.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SoundingNote {
    timeline_index: usize,
    midi_note: u8,
}

pub struct PlaybackEngine {
    timeline: Arc<Timeline>,
    settings: PlaybackSettings,
    tracker: InputTracker,
    state: TransportState,
    /// Pattern notes currently on, keyed by compiled note index.
    sounding: Vec<SoundingNote>,
    /// Keys echoed in passthrough mode.
    echoed: Vec<u8>,
    /// Compiled notes inside their on/off window (sounding or not), for highlighting.
    active: Vec<bool>,
    stop_requested: bool,
    timeline_swapped: bool,
    last_position: f64,
    prev_block_end: Option<f64>,
    /// Non-playing mode applied in the previous stopped block.
    idle_mode: Option<NonPlayingMode>,
    /// Position of the virtual transport in `Pattern` non-playing mode.
    virtual_position: Option<f64>,
    last_tempo: f64,
}

impl PlaybackEngine {
    pub fn new(settings: PlaybackSettings, timeline: Arc<Timeline>) -> Self {
        let mut active = Vec::with_capacity(MAX_TRACKED_NOTES);
        active.resize(timeline.note_count().min(MAX_TRACKED_NOTES), false);
        Self {
            timeline,
            settings,
            tracker: InputTracker::new(),
            state: TransportState::Stopped,
            sounding: Vec::with_capacity(MAX_TRACKED_NOTES),
            echoed: Vec::with_capacity(128),
            active,
            stop_requested: false,
            timeline_swapped: false,
            last_position: 0.0,
            prev_block_end: None,
            idle_mode: None,
            virtual_position: None,
            last_tempo: FALLBACK_TEMPO_BPM,
        }
    }

    /// Install a new timeline; sounding notes are flushed at the next block.
    /// Returns the previous timeline so the caller decides where it is freed.
    pub fn install_timeline(&mut self, timeline: Arc<Timeline>) -> Arc<Timeline> {
        self.timeline_swapped = true;
        std::mem::replace(&mut self.timeline, timeline)
    }

    /// Silence everything at the start of the next block.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn set_settings(&mut self, settings: PlaybackSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn tracker(&self) -> &InputTracker {
        &self.tracker
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Absolute (unwrapped) tick reached by the last block.
    pub fn last_position(&self) -> f64 {
        self.last_position
    }

    /// Per compiled note: is it inside its on/off window right now.
    pub fn active(&self) -> &[bool] {
        &self.active
    }

    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
    }

    /// Number of output notes currently on (pattern and passthrough).
    pub fn sounding_count(&self) -> usize {
        self.sounding.len() + self.echoed.len()
    }

    /// Run one block. `input` must be ordered by sample offset.
    pub fn process_block<S: NoteSink>(
        &mut self,
        transport: &HostTransport,
        num_samples: u32,
        input: &[InputEvent],
        out: &mut S,
    ) {
        if self.stop_requested || self.timeline_swapped {
            if self.timeline_swapped {
                log::debug!(
                    target: "audio::engine",
                    "timeline swapped ({} notes), flushing {} notes",
                    self.timeline.note_count(), self.sounding_count()
                );
            }
            self.flush_all(out);
            self.reset_active();
            self.stop_requested = false;
            self.timeline_swapped = false;
        }

        if transport.tempo_bpm > 0.0 && transport.tempo_bpm.is_finite() {
            self.last_tempo = transport.tempo_bpm;
        }

        let playing = transport.is_playing;
        if playing != self.is_playing() {
            log::debug!(target: "audio::engine", "transport {}", if playing { "started" } else { "stopped" });
            self.flush_all(out);
            self.reset_active();
            self.state = if playing {
                TransportState::Playing
            } else {
                TransportState::Stopped
            };
            self.prev_block_end = None;
            self.idle_mode = None;
            self.virtual_position = None;
        }

        if num_samples == 0 {
            for event in input {
                self.tracker.apply(event);
            }
            return;
        }

        if playing {
            self.play_host_block(transport, num_samples, input, out);
        } else {
            self.play_idle_block(transport, num_samples, input, out);
        }
    }

    fn play_host_block<S: NoteSink>(
        &mut self,
        transport: &HostTransport,
        num_samples: u32,
        input: &[InputEvent],
        out: &mut S,
    ) {
        for event in input {
            self.tracker.apply(event);
        }

        let (start, end) = transport.block_ticks(num_samples, self.timeline.timebase);
        if let Some(prev_end) = self.prev_block_end {
            if (start - prev_end).abs() > SEEK_TOLERANCE_TICKS {
                log::trace!(target: "audio::engine", "transport jumped {} -> {}", prev_end, start);
                self.flush_pattern(out);
                self.reset_active();
            }
        }

        self.walk(start, end, num_samples, out);
        self.prev_block_end = Some(end);
        self.last_position = end;
    }

    fn play_idle_block<S: NoteSink>(
        &mut self,
        transport: &HostTransport,
        num_samples: u32,
        input: &[InputEvent],
        out: &mut S,
    ) {
        let mode = self.settings.effective_non_playing_mode();
        if self.idle_mode != Some(mode) {
            if self.idle_mode.is_some() {
                log::debug!(target: "audio::engine", "non-playing mode -> {}", mode.name());
            }
            self.flush_all(out);
            self.reset_active();
            self.virtual_position = None;
            self.idle_mode = Some(mode);
        }

        match mode {
            NonPlayingMode::Passthrough => self.passthrough(input, out),
            NonPlayingMode::Pattern => self.play_virtual(transport, num_samples, input, out),
            NonPlayingMode::Silence | NonPlayingMode::None => {
                for event in input {
                    self.tracker.apply(event);
                }
                self.flush_all(out);
            }
        }
    }

    /// Echo held keys 1:1, bypassing the pattern.
    fn passthrough<S: NoteSink>(&mut self, input: &[InputEvent], out: &mut S) {
        for i in 0..self.tracker.len() {
            if let Some(&key) = self.tracker.get(i) {
                if !self.echoed.contains(&key.midi_note) {
                    out.push_note(OutputNoteEvent::on(0, key.midi_note, key.velocity, PASSTHROUGH_NOTE_INDEX));
                    self.echoed.push(key.midi_note);
                }
            }
        }

        for event in input {
            self.tracker.apply(event);
            match event.kind {
                InputEventKind::NoteOn { note, velocity } => {
                    if let Some(pos) = self.echoed.iter().position(|&n| n == note) {
                        out.push_note(OutputNoteEvent::off(event.sample_offset, note, PASSTHROUGH_NOTE_INDEX));
                        self.echoed.swap_remove(pos);
                    }
                    out.push_note(OutputNoteEvent::on(event.sample_offset, note, velocity, PASSTHROUGH_NOTE_INDEX));
                    self.echoed.push(note);
                }
                InputEventKind::NoteOff { note } => {
                    if let Some(pos) = self.echoed.iter().position(|&n| n == note) {
                        out.push_note(OutputNoteEvent::off(event.sample_offset, note, PASSTHROUGH_NOTE_INDEX));
                        self.echoed.swap_remove(pos);
                    }
                }
            }
        }
    }

    /// Keep the arpeggio cycling from a virtual transport while keys are held.
    fn play_virtual<S: NoteSink>(
        &mut self,
        transport: &HostTransport,
        num_samples: u32,
        input: &[InputEvent],
        out: &mut S,
    ) {
        for event in input {
            self.tracker.apply(event);
        }

        if self.tracker.is_empty() {
            if self.virtual_position.take().is_some() {
                self.flush_pattern(out);
                self.reset_active();
            }
            return;
        }

        let timebase = self.timeline.timebase;
        let start = self.virtual_position.unwrap_or(0.0);
        let span = beats_for_samples(num_samples, self.last_tempo * timebase as f64, transport.sample_rate);
        let end = start + span;

        self.walk(start, end, num_samples, out);
        self.virtual_position = Some(end);
        self.last_position = end;
    }

    /// Emit every timeline event with a tick in `[start, end)`, wrapping at the loop length.
    fn walk<S: NoteSink>(&mut self, start: f64, end: f64, num_samples: u32, out: &mut S) {
        let timeline = Arc::clone(&self.timeline);
        let loop_length = timeline.loop_length;
        if loop_length <= 0 || timeline.timebase == 0 || timeline.is_empty() {
            return;
        }
        let span = end - start;
        if span.is_nan() || span <= 0.0 || !start.is_finite() || !end.is_finite() {
            return;
        }

        let loop_len = loop_length as f64;
        let mut pos = start;
        let mut passes = 0;
        while pos < end && passes < MAX_LOOP_PASSES {
            let base = (pos / loop_len).floor() * loop_len;
            let seg_lo = (pos - base).max(0.0);
            let seg_hi = (end - base).min(loop_len);
            let lo = (seg_lo - TICK_EPSILON).ceil() as i64;
            let hi = (seg_hi - TICK_EPSILON).ceil() as i64;

            for event in timeline.events_in(lo, hi) {
                let abs_tick = base + event.tick as f64;
                let offset = sample_offset(abs_tick, start, span, num_samples);
                self.apply_event(event, &timeline, offset, out);
            }

            let next = base + loop_len;
            if next <= pos {
                break;
            }
            pos = next;
            passes += 1;
        }
    }

    fn apply_event<S: NoteSink>(
        &mut self,
        event: &CompiledEvent,
        timeline: &Timeline,
        offset: u32,
        out: &mut S,
    ) {
        for &index in &event.off {
            self.release(index, offset, out);
        }

        for &index in &event.on {
            if index >= MAX_TRACKED_NOTES {
                continue;
            }
            let Some(meta) = timeline.note_meta(index) else {
                continue;
            };
            // A note still on here missed its off (e.g. after a seek); retrigger it.
            self.release(index, offset, out);

            if let Some(resolved) = resolve_note(meta.input_index, meta.velocity, &self.tracker, &self.settings) {
                out.push_note(OutputNoteEvent::on(offset, resolved.midi_note, resolved.velocity, index));
                self.sounding.push(SoundingNote {
                    timeline_index: index,
                    midi_note: resolved.midi_note,
                });
            }
            if let Some(flag) = self.active.get_mut(index) {
                *flag = true;
            }
        }
    }

    /// Turn off the output note mapped to a compiled note index, if any.
    fn release<S: NoteSink>(&mut self, index: usize, offset: u32, out: &mut S) {
        if let Some(pos) = self.sounding.iter().position(|s| s.timeline_index == index) {
            let note = self.sounding.swap_remove(pos);
            out.push_note(OutputNoteEvent::off(offset, note.midi_note, index));
        }
        if let Some(flag) = self.active.get_mut(index) {
            *flag = false;
        }
    }

    fn flush_pattern<S: NoteSink>(&mut self, out: &mut S) {
        for note in self.sounding.drain(..) {
            out.push_note(OutputNoteEvent::off(0, note.midi_note, note.timeline_index));
        }
    }

    fn flush_all<S: NoteSink>(&mut self, out: &mut S) {
        self.flush_pattern(out);
        for note in self.echoed.drain(..) {
            out.push_note(OutputNoteEvent::off(0, note, PASSTHROUGH_NOTE_INDEX));
        }
    }

    /// Clear highlights and size them to the installed timeline.
    fn reset_active(&mut self) {
        self.active.clear();
        self.active.resize(self.timeline.note_count().min(MAX_TRACKED_NOTES), false);
    }
}

/// Linear interpolation of a tick onto the block's sample range.
fn sample_offset(tick: f64, start: f64, span: f64, num_samples: u32) -> u32 {
    let frac = ((tick - start) / span).clamp(0.0, 1.0);
    let offset = (frac * num_samples as f64).floor() as u32;
    offset.min(num_samples.saturating_sub(1))
}
