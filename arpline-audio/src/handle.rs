//! ArpHandle: UI-thread interface to the playback processor.
//!
//! Owns the sending ends of the timeline slot, stop flag and command channel,
//! plus the reading end of the status buffer. Replaced timelines come back
//! over the retired channel and are dropped here, never on the audio thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use arpline_core::TimelinePublisher;
use arpline_types::{NonPlayingMode, PlaybackSettings, Timeline};

use crate::commands::ArpCommand;
use crate::engine::MAX_TRACKED_NOTES;
use crate::status_buffer::StatusReader;
use crate::timeline_slot::TimelineSlot;

/// What the audio side last reported. Read by the editor for the playhead
/// and note highlighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStatus {
    pub playing: bool,
    /// Absolute tick reached by the last processed block.
    pub last_position: f64,
    /// Per compiled note index: inside its on/off window.
    pub active: Vec<bool>,
}

impl EngineStatus {
    /// Empty status with room for `notes` highlight flags.
    pub fn with_capacity(notes: usize) -> Self {
        Self {
            active: Vec::with_capacity(notes),
            ..Self::default()
        }
    }
}

pub struct ArpHandle {
    slot: Arc<TimelineSlot>,
    stop_flag: Arc<AtomicBool>,
    cmd_tx: Sender<ArpCommand>,
    retired_rx: Receiver<Arc<Timeline>>,
    status: StatusReader<EngineStatus>,
}

impl ArpHandle {
    pub(crate) fn new(
        slot: Arc<TimelineSlot>,
        stop_flag: Arc<AtomicBool>,
        cmd_tx: Sender<ArpCommand>,
        retired_rx: Receiver<Arc<Timeline>>,
        status: StatusReader<EngineStatus>,
    ) -> Self {
        Self {
            slot,
            stop_flag,
            cmd_tx,
            retired_rx,
            status,
        }
    }

    /// Drop timelines the audio thread has finished with. Returns how many were freed.
    pub fn collect_garbage(&self) -> usize {
        let mut freed = 0;
        while let Ok(old) = self.retired_rx.try_recv() {
            drop(old);
            freed += 1;
        }
        if freed > 0 {
            log::trace!(target: "audio::handle", "freed {} retired timelines", freed);
        }
        freed
    }

    fn send(&self, cmd: ArpCommand) {
        match self.cmd_tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                log::warn!(target: "audio::handle", "command queue full, dropped {:?}", cmd);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!(target: "audio::handle", "processor gone, command dropped");
            }
        }
    }

    pub fn set_settings(&self, settings: PlaybackSettings) {
        self.send(ArpCommand::SetSettings(settings));
    }

    pub fn set_non_playing_mode(&self, mode: NonPlayingMode) {
        self.send(ArpCommand::SetNonPlayingMode(mode));
    }

    pub fn set_octave_transposition(&self, enabled: bool) {
        self.send(ArpCommand::SetOctaveTransposition(enabled));
    }

    /// The timeline most recently published, whether or not the audio side has picked it up.
    pub fn current_timeline(&self) -> Arc<Timeline> {
        self.slot.load()
    }

    pub fn status(&self) -> EngineStatus {
        self.status.read()
    }

    pub fn last_position(&self) -> f64 {
        self.status.with(|s| s.last_position)
    }

    pub fn is_playing(&self) -> bool {
        self.status.with(|s| s.playing)
    }

    /// Compiled note indices currently inside their on/off window.
    pub fn active_notes(&self) -> Vec<usize> {
        self.status.with(|s| {
            s.active
                .iter()
                .enumerate()
                .filter_map(|(i, &on)| on.then_some(i))
                .collect()
        })
    }
}

impl TimelinePublisher for ArpHandle {
    fn publish(&mut self, timeline: Timeline) {
        log::debug!(
            target: "audio::handle",
            "publishing timeline: {} notes, {} events, loop {}",
            timeline.note_count(), timeline.events.len(), timeline.loop_length
        );
        if timeline.note_count() > MAX_TRACKED_NOTES {
            log::warn!(
                target: "audio::handle",
                "timeline has {} notes, only the first {} will play",
                timeline.note_count(), MAX_TRACKED_NOTES
            );
        }
        self.slot.publish(timeline);
        self.collect_garbage();
    }

    fn request_stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }
}
