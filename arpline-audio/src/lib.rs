//! # arpline-audio
//!
//! Audio-thread side of the arpline arpeggiator.
//!
//! `create()` returns a connected pair: an [`ArpHandle`] for the UI thread
//! (publishes timelines, requests stops, reads playhead/highlight status) and an
//! [`ArpProcessor`] the host's audio callback drives once per block. Nothing on
//! the processor side locks or blocks.

pub mod commands;
pub mod engine;
pub mod handle;
pub mod input_tracker;
pub mod processor;
pub mod resolve;
pub mod status_buffer;
pub mod timeline_slot;
pub mod transport;

pub use engine::{NoteSink, PlaybackEngine, TransportState, MAX_TRACKED_NOTES};
pub use handle::{ArpHandle, EngineStatus};
pub use input_tracker::{HeldNote, InputTracker};
pub use processor::ArpProcessor;
pub use transport::HostTransport;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use arpline_types::{PlaybackSettings, Timeline};

use status_buffer::status_buffer;
use timeline_slot::TimelineSlot;

/// Room for pending settings changes from the UI.
const COMMAND_QUEUE_CAPACITY: usize = 64;
/// Room for replaced timelines waiting to be freed on the UI thread.
const RETIRED_QUEUE_CAPACITY: usize = 16;

/// Build a connected UI handle / audio processor pair.
pub fn create(settings: PlaybackSettings, initial: Timeline) -> (ArpHandle, ArpProcessor) {
    let slot = Arc::new(TimelineSlot::new(initial));
    let stop_flag = Arc::new(AtomicBool::new(false));
    let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(COMMAND_QUEUE_CAPACITY);
    let (retired_tx, retired_rx) = crossbeam_channel::bounded(RETIRED_QUEUE_CAPACITY);
    let (status_writer, status_reader) = status_buffer(|| EngineStatus::with_capacity(MAX_TRACKED_NOTES));

    let handle = ArpHandle::new(
        Arc::clone(&slot),
        Arc::clone(&stop_flag),
        cmd_tx,
        retired_rx,
        status_reader,
    );
    let processor = ArpProcessor::new(
        PlaybackEngine::new(settings, slot.load()),
        slot,
        stop_flag,
        cmd_rx,
        retired_tx,
        status_writer,
    );
    (handle, processor)
}
