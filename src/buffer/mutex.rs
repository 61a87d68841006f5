use std::{fmt, mem};

use crate::{buffer::Buffer, loom::Mutex};

/// A [`Buffer`] protected by a blocking [`Mutex`](std::sync::Mutex).
///
/// Every operation is a critical section, so the buffer contract holds without exception: an
/// addition entered before a flush acquires the lock belongs to that flush, an addition entered
/// after belongs to the next one, and [`add_range`](Buffer::add_range) batches are never split.
///
/// Contended threads are parked by the OS, which makes this buffer the choice for high
/// contention.
///
/// # Panics
/// Operations panic if the mutex has been poisoned, i.e. if a thread panicked while holding it.
///
/// # Examples
/// ```
/// # use drain_buffer::{Buffer, MutexBuffer};
/// let buffer = MutexBuffer::new();
/// buffer.add(0);
/// buffer.add_range([1, 2]);
/// assert_eq!(buffer.flush(), vec![0, 1, 2]);
/// assert!(buffer.flush().is_empty());
/// ```
pub struct MutexBuffer<T> {
    items: Mutex<Vec<T>>,
}

impl<T> MutexBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of items of the current epoch.
    ///
    /// The value may be outdated as soon as it is returned.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Returns `true` if the current epoch has no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Buffer<T> for MutexBuffer<T> {
    fn add(&self, item: T) {
        self.items.lock().unwrap().push(item);
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        // iterator code must not run inside the critical section
        let mut items = items.into_iter().collect::<Vec<_>>();
        if items.is_empty() {
            return;
        }
        self.items.lock().unwrap().append(&mut items);
    }

    fn flush(&self) -> Vec<T> {
        let items = mem::take(&mut *self.items.lock().unwrap());
        #[cfg(feature = "tracing")]
        tracing::trace!(len = items.len(), "mutex buffer flushed");
        items
    }
}

impl<T> Default for MutexBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MutexBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexBuffer")
            .field("len", &self.len())
            .finish()
    }
}
