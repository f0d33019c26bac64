//! Atomics used by the refcount. Built with `--cfg loom`, these come from loom
//! so the model checker can explore every interleaving of count updates.

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{fence, AtomicUsize, Ordering};

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{fence, AtomicUsize, Ordering};
