//! Lock-free triple buffer carrying engine status from the audio thread to the UI.
//!
//! Three slots rotate between the writer (back), the hand-off position
//! (middle) and the reader (front). The writer fills its back slot in place and
//! swaps it into the middle; the reader swaps the middle into the front only
//! when something new was published. Neither side ever waits on the other, and
//! the writer reuses slot storage instead of allocating.

use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

// State byte: [unused:1][fresh:1][back:2][middle:2][front:2]
const FRONT: u8 = 0;
const MIDDLE: u8 = 2;
const BACK: u8 = 4;
const FRESH: u8 = 0b0100_0000;
const INDEX_MASK: u8 = 0b11;
const INITIAL_STATE: u8 = (2 << BACK) | (1 << MIDDLE) | (0 << FRONT);

struct Shared<T> {
    slots: [UnsafeCell<T>; 3],
    state: AtomicU8,
}

// Safety: a slot is only touched by the side that currently owns its index,
// and ownership changes hands through the atomic state.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send + Sync> Sync for Shared<T> {}

fn index(state: u8, shift: u8) -> usize {
    ((state >> shift) & INDEX_MASK) as usize
}

impl<T> Shared<T> {
    fn swap_back_into_middle(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                let back = index(s, BACK) as u8;
                let middle = index(s, MIDDLE) as u8;
                let front = index(s, FRONT) as u8;
                Some((middle << BACK) | (back << MIDDLE) | (front << FRONT) | FRESH)
            });
    }

    /// Returns false when nothing new was published.
    fn swap_middle_into_front(&self) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                if s & FRESH == 0 {
                    return None;
                }
                let back = index(s, BACK) as u8;
                let middle = index(s, MIDDLE) as u8;
                let front = index(s, FRONT) as u8;
                Some((back << BACK) | (front << MIDDLE) | (middle << FRONT))
            })
            .is_ok()
    }
}

/// Audio-thread half.
pub struct StatusWriter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> StatusWriter<T> {
    /// Update the back slot in place, then publish it.
    pub fn modify<F>(&mut self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let back = index(self.shared.state.load(Ordering::Acquire), BACK);
        // Safety: only the writer changes which slot is back, and there is one writer.
        unsafe { f(&mut *self.shared.slots[back].get()) }
        self.shared.swap_back_into_middle();
    }
}

/// UI-thread half. Reading rotates the front slot, so the reader can move
/// between threads but cannot be shared by them.
///
/// ```compile_fail
/// use arpline_audio::status_buffer::status_buffer;
/// fn shared<T: Sync>(_: &T) {}
/// let (_writer, reader) = status_buffer(|| 0_u32);
/// shared(&reader);
/// ```
pub struct StatusReader<T> {
    shared: Arc<Shared<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> StatusReader<T> {
    pub fn has_fresh(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) & FRESH != 0
    }

    /// Look at the most recently published value.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.shared.swap_middle_into_front();
        let front = index(self.shared.state.load(Ordering::Acquire), FRONT);
        // Safety: only the reader changes which slot is front, and there is one reader.
        unsafe { f(&*self.shared.slots[front].get()) }
    }

    pub fn read(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }
}

/// Create a writer/reader pair, building each slot with `init`. Building
/// rather than cloning keeps any capacity `init` reserves.
pub fn status_buffer<T, F>(init: F) -> (StatusWriter<T>, StatusReader<T>)
where
    F: Fn() -> T,
{
    let shared = Arc::new(Shared {
        slots: [UnsafeCell::new(init()), UnsafeCell::new(init()), UnsafeCell::new(init())],
        state: AtomicU8::new(INITIAL_STATE),
    });
    (
        StatusWriter {
            shared: Arc::clone(&shared),
        },
        StatusReader {
            shared,
            _not_sync: PhantomData,
        },
    )
}
