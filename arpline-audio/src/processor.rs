//! Audio-thread half of the arpeggiator.
//!
//! `process()` is called once per host block. It drains pending settings,
//! picks up stop requests and newly published timelines, runs the engine and
//! publishes status for the UI. It never locks, and it hands replaced
//! timelines back to the UI thread instead of freeing them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use arpline_types::{InputEvent, Timeline};

use crate::commands::ArpCommand;
use crate::engine::{NoteSink, PlaybackEngine};
use crate::handle::EngineStatus;
use crate::status_buffer::StatusWriter;
use crate::timeline_slot::TimelineSlot;
use crate::transport::HostTransport;

/// Settings changes applied per block at most.
const MAX_COMMANDS_PER_BLOCK: usize = 64;

pub struct ArpProcessor {
    engine: PlaybackEngine,
    slot: Arc<TimelineSlot>,
    stop_flag: Arc<AtomicBool>,
    cmd_rx: Receiver<ArpCommand>,
    retired_tx: Sender<Arc<Timeline>>,
    status: StatusWriter<EngineStatus>,
}

impl ArpProcessor {
    pub(crate) fn new(
        engine: PlaybackEngine,
        slot: Arc<TimelineSlot>,
        stop_flag: Arc<AtomicBool>,
        cmd_rx: Receiver<ArpCommand>,
        retired_tx: Sender<Arc<Timeline>>,
        status: StatusWriter<EngineStatus>,
    ) -> Self {
        Self {
            engine,
            slot,
            stop_flag,
            cmd_rx,
            retired_tx,
            status,
        }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Run one host block. `input` must be ordered by sample offset.
    pub fn process<S: NoteSink>(
        &mut self,
        transport: &HostTransport,
        num_samples: u32,
        input: &[InputEvent],
        out: &mut S,
    ) {
        self.drain_commands();

        if self.stop_flag.swap(false, Ordering::AcqRel) {
            self.engine.request_stop();
        }

        if let Some(fresh) = self.slot.newer_than(self.engine.timeline()) {
            let old = self.engine.install_timeline(fresh);
            self.retire(old);
        }

        self.engine.process_block(transport, num_samples, input, out);
        self.publish_status();
    }

    fn drain_commands(&mut self) {
        for _ in 0..MAX_COMMANDS_PER_BLOCK {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => self.handle_cmd(cmd),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
            }
        }
    }

    fn handle_cmd(&mut self, cmd: ArpCommand) {
        let mut settings = *self.engine.settings();
        match cmd {
            ArpCommand::SetSettings(next) => settings = next,
            ArpCommand::SetNonPlayingMode(mode) => settings.non_playing_mode = mode,
            ArpCommand::SetOctaveTransposition(enabled) => settings.octave_transposition = enabled,
        }
        self.engine.set_settings(settings);
    }

    fn retire(&self, old: Arc<Timeline>) {
        match self.retired_tx.try_send(old) {
            Ok(()) => {}
            // Freed on this thread; only when the UI stopped collecting.
            Err(TrySendError::Full(_)) => {
                log::warn!(target: "audio::processor", "retired timeline queue full");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn publish_status(&mut self) {
        let engine = &self.engine;
        self.status.modify(|s| {
            s.playing = engine.is_playing();
            s.last_position = engine.last_position();
            // engine.active() never exceeds the slot's reserved capacity
            s.active.clear();
            s.active.extend_from_slice(engine.active());
        });
    }
}
