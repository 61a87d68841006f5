#![allow(unused_imports)]
//! Synchronization primitives of the buffers, swapped for `loom` ones under `cfg(loom)`.
// Do not export UnsafeCell because the spin lock hands out plain references, so not compatible
// with loom model

#[cfg(not(loom))]
pub(crate) use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

#[cfg(not(loom))]
pub(crate) use crossbeam_utils::Backoff;

#[cfg(loom)]
pub(crate) use loom::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

/// `crossbeam_utils::Backoff` spins on hint instructions, which loom cannot preempt; every wait
/// must go through the loom scheduler instead.
#[cfg(loom)]
#[derive(Debug, Default)]
pub(crate) struct Backoff;

#[cfg(loom)]
impl Backoff {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn snooze(&self) {
        loom::thread::yield_now();
    }

    pub(crate) fn is_completed(&self) -> bool {
        false
    }
}

/// Lets loom switch threads where the shared state touched next is not made of loom objects.
#[cfg(not(loom))]
#[inline(always)]
pub(crate) fn yield_point() {}

#[cfg(loom)]
pub(crate) fn yield_point() {
    loom::thread::yield_now();
}
