#![forbid(clippy::dbg_macro)]
#![forbid(clippy::semicolon_if_nothing_returned)]
#![forbid(missing_docs)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![forbid(clippy::undocumented_unsafe_blocks)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! # drain-buffer
//! Concurrent append/flush buffers.
//!
//! Many producers [`add`](Buffer::add) items to a shared buffer, and consumers periodically
//! [`flush`](Buffer::flush) it, taking all the items accumulated since the previous flush while
//! atomically resetting the buffer to empty. Typical use is batching: metrics, log records or
//! database writes collected from many threads and processed in bulk.
//!
//! The [`Buffer`] contract comes with several synchronization strategies:
//! - [`MutexBuffer`] parks contended threads, it suits high contention;
//! - [`SpinLockBuffer`] busy-waits instead, it suits low contention and short critical sections;
//! - [`SwapBuffer`] takes no lock at all: producers push into a concurrent queue which is
//!   atomically swapped on flush. An addition concurrent to a flush may be lost;
//! - [`GuardedSwapBuffer`] is the lossless version of the latter, flushes waiting for in-flight
//!   additions.
//!
//! [`Strategy`] allows selecting the implementation at run time, with [`AnyBuffer`].
//!
//! # Examples
//!
//! ```rust
//! # use std::{sync::Arc, thread};
//! # use drain_buffer::{Buffer, MutexBuffer};
//! let buffer = Arc::new(MutexBuffer::new());
//! // 10 producers add a disjoint slice of 1..=1000 each
//! let producers: Vec<_> = (0..10)
//!     .map(|i| {
//!         let buffer = buffer.clone();
//!         thread::spawn(move || buffer.add_range(i * 100 + 1..=(i + 1) * 100))
//!     })
//!     .collect();
//! for producer in producers {
//!     producer.join().unwrap();
//! }
//! let mut items = buffer.flush();
//! items.sort();
//! assert_eq!(items, (1..=1000).collect::<Vec<_>>());
//! // the buffer is drained
//! assert!(buffer.flush().is_empty());
//! ```

pub mod buffer;
pub mod error;
mod loom;
pub mod spin;
mod strategy;

pub use buffer::{
    Buffer, ConcurrentBuffer, GuardedSwapBuffer, MutexBuffer, SpinLockBuffer, SwapBuffer,
};
pub use spin::{SpinLock, SpinLockGuard};
pub use strategy::{AnyBuffer, Strategy};
