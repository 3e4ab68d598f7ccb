//! Single-writer hand-off of compiled timelines to the audio thread.
//!
//! The UI thread stores a new `Arc<Timeline>`; the audio thread compares the
//! slot against the timeline it has installed at the top of every block. A
//! `load()` is a lock-free pointer read, so the audio callback never waits on
//! the editor.

use std::sync::Arc;

use arc_swap::ArcSwap;

use arpline_types::Timeline;

pub struct TimelineSlot {
    current: ArcSwap<Timeline>,
}

impl TimelineSlot {
    pub fn new(initial: Timeline) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Make `timeline` the one the audio thread picks up next.
    pub fn publish(&self, timeline: Timeline) {
        self.current.store(Arc::new(timeline));
    }

    pub fn load(&self) -> Arc<Timeline> {
        self.current.load_full()
    }

    /// The published timeline if it is not `installed`. No refcount traffic
    /// when nothing changed.
    pub fn newer_than(&self, installed: &Arc<Timeline>) -> Option<Arc<Timeline>> {
        let guard = self.current.load();
        if Arc::ptr_eq(&*guard, installed) {
            None
        } else {
            Some(Arc::clone(&*guard))
        }
    }
}
