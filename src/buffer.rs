//! [`Buffer`] contract and its implementations.

mod mutex;
mod spin;
mod swap;

pub use mutex::MutexBuffer;
pub use spin::SpinLockBuffer;
pub use swap::{GuardedSwapBuffer, SwapBuffer};

/// An append/flush buffer shared between producers and consumers.
///
/// Producers [`add`](Buffer::add) items, consumers periodically [`flush`](Buffer::flush) all the
/// items accumulated since the previous flush, the *epoch*. Every implementation guarantees that:
/// - an item returned by a flush is never returned by another one;
/// - once a flush has returned, and without concurrent addition, the next flush is empty;
/// - an item whose addition has completed is returned by exactly one later flush.
///
/// The last point has one documented exception: [`SwapBuffer`] may lose an item added
/// concurrently to a flush.
///
/// The order of flushed items is not part of the contract.
pub trait Buffer<T> {
    /// Adds an item to the current epoch.
    fn add(&self, item: T);

    /// Adds multiple items.
    ///
    /// Locked implementations add the whole batch to a single epoch; lock-free ones add the items
    /// one by one, so a concurrent flush may split the batch.
    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            self.add(item);
        }
    }

    /// Removes and returns all the items of the current epoch, starting a new one.
    fn flush(&self) -> Vec<T>;
}

/// A [`Buffer`] which can be shared between threads.
///
/// It is implemented for every `Send + Sync` buffer.
pub trait ConcurrentBuffer<T>: Buffer<T> + Send + Sync {}

impl<T, B> ConcurrentBuffer<T> for B where B: Buffer<T> + Send + Sync {}

impl<T, B> Buffer<T> for &B
where
    B: Buffer<T>,
{
    fn add(&self, item: T) {
        (**self).add(item);
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        (**self).add_range(items);
    }

    fn flush(&self) -> Vec<T> {
        (**self).flush()
    }
}

impl<T, B> Buffer<T> for std::sync::Arc<B>
where
    B: Buffer<T>,
{
    fn add(&self, item: T) {
        (**self).add(item);
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        (**self).add_range(items);
    }

    fn flush(&self) -> Vec<T> {
        (**self).flush()
    }
}
