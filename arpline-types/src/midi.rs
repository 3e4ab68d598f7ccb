use serde::{Deserialize, Serialize};

/// `timeline_note_index` of notes echoed straight from the input.
pub const PASSTHROUGH_NOTE_INDEX: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteEventKind {
    On,
    Off,
}

/// A note message produced by the playback engine for one audio block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputNoteEvent {
    /// Offset into the block, always in `[0, block_size)`.
    pub sample_offset: u32,
    pub midi_note: u8,
    pub velocity: f32, // 0.0-1.0
    pub kind: NoteEventKind,
    /// Compiled note that produced this event, or `PASSTHROUGH_NOTE_INDEX`.
    pub timeline_note_index: usize,
}

impl OutputNoteEvent {
    pub fn on(sample_offset: u32, midi_note: u8, velocity: f32, timeline_note_index: usize) -> Self {
        Self {
            sample_offset,
            midi_note,
            velocity,
            kind: NoteEventKind::On,
            timeline_note_index,
        }
    }

    pub fn off(sample_offset: u32, midi_note: u8, timeline_note_index: usize) -> Self {
        Self {
            sample_offset,
            midi_note,
            velocity: 0.0,
            kind: NoteEventKind::Off,
            timeline_note_index,
        }
    }

    pub fn is_on(&self) -> bool {
        self.kind == NoteEventKind::On
    }

    /// Velocity as a 7-bit MIDI value. A note-on never goes below 1,
    /// since velocity 0 means note-off on the wire.
    pub fn midi_velocity(&self) -> u8 {
        let v = (self.velocity.clamp(0.0, 1.0) * 127.0).round() as u8;
        match self.kind {
            NoteEventKind::On => v.max(1),
            NoteEventKind::Off => v,
        }
    }

    /// Raw three-byte MIDI message on the given channel (0-15).
    pub fn to_midi_bytes(&self, channel: u8) -> [u8; 3] {
        let status = match self.kind {
            NoteEventKind::On => 0x90,
            NoteEventKind::Off => 0x80,
        };
        [status | (channel & 0x0F), self.midi_note & 0x7F, self.midi_velocity()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEventKind {
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8 },
}

/// Incoming MIDI from the host, already placed within the block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub sample_offset: u32,
    pub kind: InputEventKind,
}

impl InputEvent {
    pub fn note_on(sample_offset: u32, note: u8, velocity: f32) -> Self {
        Self {
            sample_offset,
            kind: InputEventKind::NoteOn { note, velocity },
        }
    }

    pub fn note_off(sample_offset: u32, note: u8) -> Self {
        Self {
            sample_offset,
            kind: InputEventKind::NoteOff { note },
        }
    }

    /// Decode a raw MIDI message. Anything other than note-on/off is ignored;
    /// a note-on with velocity 0 is a note-off.
    pub fn from_midi_bytes(sample_offset: u32, bytes: &[u8]) -> Option<Self> {
        let (&status, rest) = bytes.split_first()?;
        let note = *rest.first()? & 0x7F;
        match status & 0xF0 {
            0x80 => Some(Self::note_off(sample_offset, note)),
            0x90 => {
                let velocity = *rest.get(1)? & 0x7F;
                if velocity == 0 {
                    Some(Self::note_off(sample_offset, note))
                } else {
                    Some(Self::note_on(sample_offset, note, velocity as f32 / 127.0))
                }
            }
            _ => None,
        }
    }
}
