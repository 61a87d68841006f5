use std::{fmt, iter, mem};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use crossbeam_queue::SegQueue;
use crossbeam_utils::CachePadded;

use crate::{
    buffer::Buffer,
    loom::{yield_point, AtomicUsize, Backoff, Ordering},
};

/// Items of one epoch, appended concurrently without lock.
struct Epoch<T> {
    items: SegQueue<T>,
    /// Guarded additions currently pushing into this epoch.
    writers: CachePadded<AtomicUsize>,
}

impl<T> Epoch<T> {
    fn new() -> Self {
        Self {
            items: SegQueue::new(),
            writers: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

/// Atomically replaceable pointer to the current [`Epoch`].
///
/// Replaced epochs are destroyed through `crossbeam_epoch` deferred reclamation, so a thread which
/// has loaded the pointer can keep using it while pinned, even after a flush has replaced it.
/// Under `cfg(loom)`, they are kept until the slot is dropped instead, as the model objects they
/// hold must not outlive the model.
struct EpochSlot<T> {
    current: Atomic<Epoch<T>>,
    #[cfg(loom)]
    retired: std::sync::Mutex<Vec<Owned<Epoch<T>>>>,
}

impl<T> EpochSlot<T> {
    fn new() -> Self {
        Self {
            current: Atomic::new(Epoch::new()),
            #[cfg(loom)]
            retired: Default::default(),
        }
    }

    fn load<'g>(&self, guard: &'g Guard) -> Shared<'g, Epoch<T>> {
        self.current.load(Ordering::SeqCst, guard)
    }

    fn len(&self) -> usize {
        let guard = epoch::pin();
        // SAFETY: the pointer is never null and the epoch cannot be destroyed while pinned
        unsafe { self.load(&guard).deref() }.items.len()
    }

    /// Pushes into the epoch `current`, whatever happened to it since it was loaded.
    fn push_unguarded(&self, current: Shared<'_, Epoch<T>>, item: T) {
        // SAFETY: `current` has been loaded with a guard still pinned, see `len`
        unsafe { current.deref() }.items.push(item);
    }

    /// Pushes into the current epoch, `current` being a possibly outdated load of it.
    ///
    /// The writer count of the epoch is incremented before the pointer is validated, so the flush
    /// which replaces the epoch after the validation waits for the push to complete.
    fn push_guarded<'g>(&self, mut current: Shared<'g, Epoch<T>>, item: T, guard: &'g Guard) {
        loop {
            // SAFETY: see `push_unguarded`
            let epoch = unsafe { current.deref() };
            epoch.writers.fetch_add(1, Ordering::SeqCst);
            yield_point();
            let latest = self.load(guard);
            if latest == current {
                epoch.items.push(item);
                epoch.writers.fetch_sub(1, Ordering::Release);
                return;
            }
            epoch.writers.fetch_sub(1, Ordering::Release);
            #[cfg(feature = "tracing")]
            tracing::debug!("guarded swap buffer add retried on a new epoch");
            current = latest;
        }
    }
}

impl<T: Send + 'static> EpochSlot<T> {
    /// Replaces the current epoch with an empty one and returns its items.
    ///
    /// If `wait_writers` is set, guarded pushes validated on the replaced epoch are awaited before
    /// draining it.
    fn flush(&self, wait_writers: bool) -> Vec<T> {
        let guard = epoch::pin();
        let mut next = Owned::new(Epoch::new());
        let mut current = self.load(&guard);
        let replaced = loop {
            match self.current.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
                &guard,
            ) {
                Ok(_) => break current,
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("swap buffer flush raced with another flush, retrying");
                    current = err.current;
                    next = err.new;
                }
            }
        };
        // SAFETY: see `len`
        let epoch = unsafe { replaced.deref() };
        if wait_writers {
            let backoff = Backoff::new();
            while epoch.writers.load(Ordering::SeqCst) != 0 {
                #[cfg(feature = "tracing")]
                {
                    if backoff.is_completed() {
                        tracing::debug!(
                            "guarded swap buffer flush waiting for in-flight additions"
                        );
                    }
                }
                backoff.snooze();
            }
        }
        let mut items = Vec::with_capacity(epoch.items.len());
        items.extend(iter::from_fn(|| epoch.items.pop()));
        self.retire(replaced, &guard);
        items
    }

    /// Destroys a replaced epoch once no pinned thread can access it anymore.
    ///
    /// An unguarded push may still land in the epoch after it has been drained, so it can hold
    /// items, which are then dropped on whatever thread runs the collection, possibly after the
    /// buffer itself is gone.
    #[cfg(not(loom))]
    fn retire(&self, replaced: Shared<'_, Epoch<T>>, guard: &Guard) {
        // SAFETY: the epoch is no longer reachable from the slot, and only the winner of the CAS
        // retires it. Its destructor may run on another thread after the slot is dropped, which
        // `T: Send + 'static` allows.
        unsafe { guard.defer_destroy(replaced) };
    }

    #[cfg(loom)]
    fn retire(&self, replaced: Shared<'_, Epoch<T>>, _guard: &Guard) {
        // SAFETY: retired epochs are only destroyed with the slot, which nobody accesses anymore
        let replaced = unsafe { replaced.into_owned() };
        self.retired.lock().unwrap().push(replaced);
    }
}

impl<T> Drop for EpochSlot<T> {
    fn drop(&mut self) {
        let current = mem::replace(&mut self.current, Atomic::null());
        // SAFETY: `&mut self` guarantees no other thread holds the pointer
        drop(unsafe { current.into_owned() });
    }
}

/// A lock-free [`Buffer`] swapping its storage on flush, on a best-effort basis.
///
/// Items are pushed into a concurrent queue, without any buffer-wide lock. A flush atomically
/// replaces the queue by an empty one, and returns the content of the replaced queue.
///
/// # Lost items
/// An addition first loads the current queue, then pushes into it. If a flush replaces and
/// drains the queue in between, the item lands in a queue which will never be flushed again.
/// It is dropped, silently, when the replaced queue is reclaimed by `crossbeam_epoch`. That may
/// happen on another thread, and after the buffer itself has been dropped, hence the
/// `T: Send + 'static` bound of the [`Buffer`] implementation. Use [`GuardedSwapBuffer`] if
/// losing items is not acceptable.
///
/// Items borrowing local data are thus rejected:
/// ```compile_fail
/// # use drain_buffer::{Buffer, SwapBuffer};
/// let buffer = SwapBuffer::new();
/// let value = 0;
/// buffer.add(&value);
/// # buffer.flush();
/// ```
///
/// For the same reason, and because items are pushed one by one,
/// [`add_range`](Buffer::add_range) batches may be split between two flushes.
///
/// # Examples
/// ```
/// # use drain_buffer::{Buffer, SwapBuffer};
/// let buffer = SwapBuffer::new();
/// buffer.add_range([0, 1, 2]);
/// let mut items = buffer.flush();
/// items.sort();
/// assert_eq!(items, vec![0, 1, 2]);
/// assert!(buffer.flush().is_empty());
/// ```
pub struct SwapBuffer<T> {
    slot: EpochSlot<T>,
}

impl<T> SwapBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            slot: EpochSlot::new(),
        }
    }

    /// Returns the number of items of the current epoch.
    ///
    /// The value may be outdated as soon as it is returned.
    pub fn len(&self) -> usize {
        self.slot.len()
    }

    /// Returns `true` if the current epoch has no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + 'static> Buffer<T> for SwapBuffer<T> {
    fn add(&self, item: T) {
        let guard = epoch::pin();
        self.slot.push_unguarded(self.slot.load(&guard), item);
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let guard = epoch::pin();
        for item in items {
            // reload for each item, the epoch may have been replaced since the previous one
            self.slot.push_unguarded(self.slot.load(&guard), item);
        }
    }

    fn flush(&self) -> Vec<T> {
        let items = self.slot.flush(false);
        #[cfg(feature = "tracing")]
        tracing::trace!(len = items.len(), "swap buffer flushed");
        items
    }
}

impl<T> Default for SwapBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SwapBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapBuffer")
            .field("len", &self.len())
            .finish()
    }
}

/// A lock-free [`Buffer`] swapping its storage on flush, without losing items.
///
/// It works like [`SwapBuffer`], except that additions register themselves on the queue they
/// push into, then check that the queue is still the current one, retrying on the new queue
/// otherwise. A flush waits for the registered additions of the queue it has replaced before
/// draining it. Additions never wait; a flush only waits for pushes already in progress.
///
/// [`add_range`](Buffer::add_range) batches may still be split between two flushes.
///
/// Replaced queues are reclaimed the same way as [`SwapBuffer`] ones, so items must also be
/// `Send + 'static`, even though a replaced queue is always empty by then.
///
/// # Examples
/// ```
/// # use std::{sync::Arc, thread};
/// # use drain_buffer::{Buffer, GuardedSwapBuffer};
/// let buffer = Arc::new(GuardedSwapBuffer::new());
/// let buffer2 = buffer.clone();
/// let producer = thread::spawn(move || buffer2.add_range(0..100));
/// let mut items = buffer.flush();
/// producer.join().unwrap();
/// items.extend(buffer.flush());
/// items.sort();
/// assert_eq!(items, (0..100).collect::<Vec<_>>());
/// ```
pub struct GuardedSwapBuffer<T> {
    slot: EpochSlot<T>,
}

impl<T> GuardedSwapBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            slot: EpochSlot::new(),
        }
    }

    /// Returns the number of items of the current epoch.
    ///
    /// The value may be outdated as soon as it is returned.
    pub fn len(&self) -> usize {
        self.slot.len()
    }

    /// Returns `true` if the current epoch has no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + 'static> Buffer<T> for GuardedSwapBuffer<T> {
    fn add(&self, item: T) {
        let guard = epoch::pin();
        self.slot.push_guarded(self.slot.load(&guard), item, &guard);
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let guard = epoch::pin();
        let mut current = self.slot.load(&guard);
        for item in items {
            self.slot.push_guarded(current, item, &guard);
            current = self.slot.load(&guard);
        }
    }

    fn flush(&self) -> Vec<T> {
        let items = self.slot.flush(true);
        #[cfg(feature = "tracing")]
        tracing::trace!(len = items.len(), "guarded swap buffer flushed");
        items
    }
}

impl<T> Default for GuardedSwapBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for GuardedSwapBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedSwapBuffer")
            .field("len", &self.len())
            .finish()
    }
}
