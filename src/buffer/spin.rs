use std::{fmt, mem};

use crate::{buffer::Buffer, spin::SpinLock};

/// A [`Buffer`] protected by a [`SpinLock`].
///
/// It behaves exactly like [`MutexBuffer`](crate::MutexBuffer), but contended threads busy-wait
/// instead of being parked. Critical sections are reduced to a vector push, append or swap, so
/// this buffer is the choice for low contention, where avoiding context switches pays off.
///
/// # Examples
/// ```
/// # use std::{sync::Arc, thread};
/// # use drain_buffer::{Buffer, SpinLockBuffer};
/// let buffer = Arc::new(SpinLockBuffer::new());
/// let producers: Vec<_> = (0..4)
///     .map(|i| {
///         let buffer = buffer.clone();
///         thread::spawn(move || buffer.add(i))
///     })
///     .collect();
/// for producer in producers {
///     producer.join().unwrap();
/// }
/// let mut items = buffer.flush();
/// items.sort();
/// assert_eq!(items, vec![0, 1, 2, 3]);
/// ```
pub struct SpinLockBuffer<T> {
    items: SpinLock<Vec<T>>,
}

impl<T> SpinLockBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            items: SpinLock::new(Vec::new()),
        }
    }

    /// Returns the number of items of the current epoch.
    ///
    /// The value may be outdated as soon as it is returned.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if the current epoch has no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Buffer<T> for SpinLockBuffer<T> {
    fn add(&self, item: T) {
        self.items.lock().push(item);
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        // collect first, others spin while the lock is held
        let mut items = items.into_iter().collect::<Vec<_>>();
        if items.is_empty() {
            return;
        }
        self.items.lock().append(&mut items);
    }

    fn flush(&self) -> Vec<T> {
        let items = mem::take(&mut *self.items.lock());
        #[cfg(feature = "tracing")]
        tracing::trace!(len = items.len(), "spin-lock buffer flushed");
        items
    }
}

impl<T> Default for SpinLockBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SpinLockBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpinLockBuffer")
            .field("len", &self.len())
            .finish()
    }
}
