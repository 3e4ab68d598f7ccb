//! Mutex-guarded pattern shared between the editor and anything that needs a snapshot.
//!
//! Composite edits take the lock once and work on `&mut Pattern`; the helper
//! methods they call are plain `&mut` methods that never lock again, so no
//! re-entrant locking is needed.

use std::sync::{Arc, Mutex, MutexGuard};

use arpline_types::Pattern;

#[derive(Debug, Clone, Default)]
pub struct SharedPattern {
    inner: Arc<Mutex<Pattern>>,
}

impl SharedPattern {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pattern)),
        }
    }

    /// Lock the pattern. A poisoned lock is recovered: the pattern is plain
    /// data and stays usable after a panicking editor operation.
    pub fn lock(&self) -> MutexGuard<'_, Pattern> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a read-only closure under the lock.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Pattern) -> R,
    {
        f(&self.lock())
    }

    /// Run a mutating closure under the lock.
    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Pattern) -> R,
    {
        f(&mut self.lock())
    }

    /// Clone of the current pattern.
    pub fn snapshot(&self) -> Pattern {
        self.lock().clone()
    }

    /// Replace the whole pattern in one locked step.
    pub fn replace(&self, pattern: Pattern) -> Pattern {
        std::mem::replace(&mut *self.lock(), pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpline_types::{NoteDatum, PatternNote};

    #[test]
    fn edits_are_visible_through_clones() {
        let shared = SharedPattern::new(Pattern::new());
        let other = shared.clone();
        shared.with_mut(|p| {
            p.insert_note(PatternNote::new(NoteDatum::default(), 0, 24));
        });
        assert_eq!(other.with(|p| p.notes.len()), 1);
    }

    #[test]
    fn replace_returns_previous() {
        let shared = SharedPattern::new(Pattern::with_length(96, 2));
        let old = shared.replace(Pattern::with_length(96, 8));
        assert_eq!(old.loop_length, 192);
        assert_eq!(shared.snapshot().loop_length, 768);
    }

    #[test]
    fn lock_survives_poisoning() {
        let shared = SharedPattern::new(Pattern::new());
        let poisoner = shared.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("editor panicked");
        })
        .join();
        assert_eq!(shared.with(|p| p.timebase), 96);
    }
}
