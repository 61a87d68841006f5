//! Run-time selection of a [`Buffer`] implementation.

use std::{fmt, str::FromStr};

use crate::{
    buffer::{Buffer, GuardedSwapBuffer, MutexBuffer, SpinLockBuffer, SwapBuffer},
    error::ParseStrategyError,
};

/// Synchronization strategy of a buffer.
///
/// # Examples
/// ```
/// # use drain_buffer::{Buffer, Strategy};
/// let strategy: Strategy = "spin-lock".parse().unwrap();
/// let buffer = strategy.build();
/// buffer.add("item");
/// assert_eq!(buffer.flush(), vec!["item"]);
/// assert_eq!(buffer.strategy(), Strategy::SpinLock);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Strategy {
    /// [`MutexBuffer`], for high contention or long critical sections.
    Mutex,
    /// [`SpinLockBuffer`], for low contention.
    SpinLock,
    /// [`SwapBuffer`], for producer throughput when losing concurrent additions is tolerable.
    Swap,
    /// [`GuardedSwapBuffer`], for lock-free producers without loss.
    GuardedSwap,
}

impl Strategy {
    /// All the strategies.
    pub const ALL: [Strategy; 4] = [
        Strategy::Mutex,
        Strategy::SpinLock,
        Strategy::Swap,
        Strategy::GuardedSwap,
    ];

    /// Returns the strategy name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Mutex => "mutex",
            Self::SpinLock => "spin-lock",
            Self::Swap => "swap",
            Self::GuardedSwap => "guarded-swap",
        }
    }

    /// Returns `true` if additions never take a buffer-wide lock.
    pub fn is_lock_free(self) -> bool {
        matches!(self, Self::Swap | Self::GuardedSwap)
    }

    /// Returns `true` if every added item is guaranteed to be flushed, even with concurrent
    /// flushes.
    pub fn is_lossless(self) -> bool {
        !matches!(self, Self::Swap)
    }

    /// Builds an empty buffer using this strategy.
    ///
    /// Items must be `Send + 'static` whatever the strategy, as the swap buffers may drop them
    /// on another thread, after the buffer itself:
    /// ```compile_fail
    /// # use drain_buffer::{Buffer, Strategy};
    /// let buffer = Strategy::Mutex.build();
    /// let value = 0;
    /// buffer.add(&value);
    /// # buffer.flush();
    /// ```
    pub fn build<T: Send + 'static>(self) -> AnyBuffer<T> {
        match self {
            Self::Mutex => MutexBuffer::new().into(),
            Self::SpinLock => SpinLockBuffer::new().into(),
            Self::Swap => SwapBuffer::new().into(),
            Self::GuardedSwap => GuardedSwapBuffer::new().into(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mutex" => Ok(Self::Mutex),
            "spin-lock" | "spin" => Ok(Self::SpinLock),
            "swap" => Ok(Self::Swap),
            "guarded-swap" => Ok(Self::GuardedSwap),
            _ => Err(ParseStrategyError(s.to_owned())),
        }
    }
}

/// A [`Buffer`] whose [`Strategy`] is chosen at construction.
pub enum AnyBuffer<T> {
    /// See [`MutexBuffer`].
    Mutex(MutexBuffer<T>),
    /// See [`SpinLockBuffer`].
    SpinLock(SpinLockBuffer<T>),
    /// See [`SwapBuffer`].
    Swap(SwapBuffer<T>),
    /// See [`GuardedSwapBuffer`].
    GuardedSwap(GuardedSwapBuffer<T>),
}

impl<T> AnyBuffer<T> {
    /// Returns the buffer strategy.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Mutex(_) => Strategy::Mutex,
            Self::SpinLock(_) => Strategy::SpinLock,
            Self::Swap(_) => Strategy::Swap,
            Self::GuardedSwap(_) => Strategy::GuardedSwap,
        }
    }

    /// Returns the number of items of the current epoch.
    ///
    /// The value may be outdated as soon as it is returned.
    pub fn len(&self) -> usize {
        match self {
            Self::Mutex(buffer) => buffer.len(),
            Self::SpinLock(buffer) => buffer.len(),
            Self::Swap(buffer) => buffer.len(),
            Self::GuardedSwap(buffer) => buffer.len(),
        }
    }

    /// Returns `true` if the current epoch has no item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + 'static> Buffer<T> for AnyBuffer<T> {
    fn add(&self, item: T) {
        match self {
            Self::Mutex(buffer) => buffer.add(item),
            Self::SpinLock(buffer) => buffer.add(item),
            Self::Swap(buffer) => buffer.add(item),
            Self::GuardedSwap(buffer) => buffer.add(item),
        }
    }

    fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        match self {
            Self::Mutex(buffer) => buffer.add_range(items),
            Self::SpinLock(buffer) => buffer.add_range(items),
            Self::Swap(buffer) => buffer.add_range(items),
            Self::GuardedSwap(buffer) => buffer.add_range(items),
        }
    }

    fn flush(&self) -> Vec<T> {
        match self {
            Self::Mutex(buffer) => buffer.flush(),
            Self::SpinLock(buffer) => buffer.flush(),
            Self::Swap(buffer) => buffer.flush(),
            Self::GuardedSwap(buffer) => buffer.flush(),
        }
    }
}

impl<T> From<MutexBuffer<T>> for AnyBuffer<T> {
    fn from(buffer: MutexBuffer<T>) -> Self {
        Self::Mutex(buffer)
    }
}

impl<T> From<SpinLockBuffer<T>> for AnyBuffer<T> {
    fn from(buffer: SpinLockBuffer<T>) -> Self {
        Self::SpinLock(buffer)
    }
}

impl<T> From<SwapBuffer<T>> for AnyBuffer<T> {
    fn from(buffer: SwapBuffer<T>) -> Self {
        Self::Swap(buffer)
    }
}

impl<T> From<GuardedSwapBuffer<T>> for AnyBuffer<T> {
    fn from(buffer: GuardedSwapBuffer<T>) -> Self {
        Self::GuardedSwap(buffer)
    }
}

impl<T> fmt::Debug for AnyBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutex(buffer) => fmt::Debug::fmt(buffer, f),
            Self::SpinLock(buffer) => fmt::Debug::fmt(buffer, f),
            Self::Swap(buffer) => fmt::Debug::fmt(buffer, f),
            Self::GuardedSwap(buffer) => fmt::Debug::fmt(buffer, f),
        }
    }
}
