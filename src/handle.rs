//! `SharedHandle<T>` is an atomically refcounted owner of one heap value that,
//! unlike `std::sync::Arc<T>`, may also be empty.
//!
//! See the crate docs for the full contract.
//!
//! All operations are associated functions (`SharedHandle::use_count(&h)`
//! rather than `h.use_count()`), so they never shadow methods of `T` reached
//! through `Deref`.
use alloc::boxed::Box;
use core::{
    cmp, fmt, hash,
    marker::PhantomData,
    mem,
    ops::Deref,
    ptr::{self, NonNull},
};

use crate::sync::{
    fence, AtomicUsize,
    Ordering::{Acquire, Relaxed, Release},
};

// The count and the value share one allocation, so they can never disagree
// about whether the other exists.
struct Block<T> {
    count: AtomicUsize,
    value: T,
}

// Same limit as `Arc`: far beyond any real number of handles, and leaves
// headroom so racing increments cannot wrap past zero before one panics.
const MAX_COUNT: usize = isize::MAX as usize;

impl<T> Block<T> {
    // Add one share.
    fn add_share(&self) {
        let old = self.count.fetch_add(1, Relaxed);
        debug_assert!(old != 0, "cloned a handle whose value was already freed");
        if old > MAX_COUNT {
            count_overflow();
        }
    }
}

/// Shared-ownership handle to a heap-allocated `T`.
///
/// A handle is either *empty* or *populated*. All populated handles cloned
/// from the same original form one ownership group; the value is dropped and
/// its block freed when the last handle of the group is reset or dropped.
pub struct SharedHandle<T> {
    block: Option<NonNull<Block<T>>>,
    phantom: PhantomData<Block<T>>,
}

// Like `Arc<T>`: sharing a handle across threads shares `&T`, and the last
// handle may drop `T` on any thread.
unsafe impl<T: Send + Sync> Send for SharedHandle<T> {}
unsafe impl<T: Send + Sync> Sync for SharedHandle<T> {}

impl<T> SharedHandle<T> {
    /// Returns an empty handle. Does not allocate.
    pub const fn empty() -> Self {
        SharedHandle {
            block: None,
            phantom: PhantomData,
        }
    }

    /// Moves `value` to the heap and returns the first handle of a new
    /// ownership group, with a count of 1.
    pub fn new(value: T) -> Self {
        let b = Box::new(Block {
            count: AtomicUsize::new(1),
            value,
        });
        SharedHandle {
            block: Some(NonNull::from(Box::leak(b))),
            phantom: PhantomData,
        }
    }

    /// Takes ownership of a boxed value.
    ///
    /// The value is moved into a new allocation that also holds the count;
    /// the original box is freed.
    pub fn from_box(value: Box<T>) -> Self {
        SharedHandle::new(*value)
    }

    /// Takes ownership of a raw pointer obtained from [`Box::into_raw`]. A null
    /// pointer gives an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::<T>::into_raw`, and the caller
    /// must give up all ownership of it: passing the same pointer to two
    /// handles (or freeing it elsewhere) is a double free.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        if ptr.is_null() {
            return SharedHandle::empty();
        }
        SharedHandle::from_box(unsafe { Box::from_raw(ptr) })
    }

    /// Moves ownership out of `this`, leaving it empty. The count is not
    /// touched.
    pub fn take(this: &mut Self) -> Self {
        SharedHandle {
            block: this.block.take(),
            phantom: PhantomData,
        }
    }

    /// Makes `this` share ownership of `source`'s value, releasing whatever
    /// `this` held before. A no-op if both are already in the same group.
    pub fn assign(this: &mut Self, source: &Self) {
        if SharedHandle::ptr_eq(this, source) {
            return;
        }
        SharedHandle::reset(this);
        if let Some(b) = source.block() {
            b.add_share();
        }
        this.block = source.block;
    }

    /// Moves `source`'s share into `this`, releasing whatever `this` held
    /// before. `source` is left empty and its count is not touched.
    ///
    /// If both are in the same group, `this` keeps its share and `source`'s
    /// share is released, so the value is never freed here.
    pub fn assign_from(this: &mut Self, source: &mut Self) {
        if SharedHandle::ptr_eq(this, source) {
            SharedHandle::reset(source);
            return;
        }
        SharedHandle::reset(this);
        this.block = source.block.take();
    }

    /// Returns true if the handle owns nothing.
    pub fn is_empty(this: &Self) -> bool {
        this.block.is_none()
    }

    /// Returns a reference to the value, or `None` if the handle is empty.
    pub fn get(this: &Self) -> Option<&T> {
        this.block().map(|b| &b.value)
    }

    /// Returns a reference to the value without checking for emptiness.
    ///
    /// # Safety
    ///
    /// The handle must not be empty.
    pub unsafe fn get_unchecked(this: &Self) -> &T {
        debug_assert!(this.block.is_some(), "get_unchecked on an empty SharedHandle");
        match this.block() {
            Some(b) => &b.value,
            None => unsafe { core::hint::unreachable_unchecked() },
        }
    }

    /// Returns the address of the value, or null if the handle is empty.
    /// Ownership is unaffected.
    pub fn as_ptr(this: &Self) -> *const T {
        match this.block {
            // Safety: a populated handle's block is live.
            Some(b) => unsafe { ptr::addr_of!((*b.as_ptr()).value) },
            None => ptr::null(),
        }
    }

    /// Returns a mutable reference to the value if this is the only handle in
    /// its group.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        let mut b = this.block?;
        // Safety: the block is live while we hold a share of it.
        if unsafe { b.as_ref() }.count.load(Relaxed) != 1 {
            return None;
        }
        // Synchronize with the Release decrements of handles dropped on other
        // threads before we hand out `&mut`.
        fence(Acquire);
        // Safety: count is 1 and we hold `&mut` to the only handle.
        Some(unsafe { &mut b.as_mut().value })
    }

    /// Number of handles in this handle's group, or 0 if it is empty.
    ///
    /// This is a snapshot: other threads may change it before the caller
    /// acts on it.
    pub fn use_count(this: &Self) -> usize {
        // relaxed ordering as this is only advisory
        this.block().map_or(0, |b| b.count.load(Relaxed))
    }

    /// Returns true if both handles are in the same ownership group, or both
    /// are empty.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.block == other.block
    }

    /// Gives up this handle's share, leaving it empty. If it was the last
    /// share, the value is dropped and its block freed on this thread.
    pub fn reset(this: &mut Self) {
        if let Some(b) = this.block.take() {
            // Safety: `b` came from a populated handle, whose share we now own.
            unsafe { SharedHandle::release(b) };
        }
    }

    /// Like [`reset`](SharedHandle::reset), then starts a new group holding
    /// `value`.
    pub fn reset_with(this: &mut Self, value: T) {
        SharedHandle::reset(this);
        *this = SharedHandle::new(value);
    }

    /// Like [`reset`](SharedHandle::reset), then takes ownership of `ptr` as
    /// with [`from_raw`](SharedHandle::from_raw).
    ///
    /// # Safety
    ///
    /// Same as [`from_raw`](SharedHandle::from_raw).
    pub unsafe fn reset_raw(this: &mut Self, ptr: *mut T) {
        SharedHandle::reset(this);
        *this = unsafe { SharedHandle::from_raw(ptr) };
    }

    /// Exchanges what the two handles point at. No count changes.
    pub fn swap(this: &mut Self, other: &mut Self) {
        mem::swap(&mut this.block, &mut other.block);
    }

    fn block(&self) -> Option<&Block<T>> {
        // Safety: a populated handle keeps its block alive, there's just no
        // way to spell the lifetime in Rust.
        self.block.map(|b| unsafe { &*b.as_ptr() })
    }

    // Drop one share of `b`, freeing it if that was the last one.
    //
    // Safety: the caller must own a share of `b` and not use it afterwards.
    unsafe fn release(b: NonNull<Block<T>>) {
        let old = unsafe { b.as_ref() }.count.fetch_sub(1, Release);
        debug_assert!(old != 0, "refcount underflow");
        if old != 1 {
            return;
        }
        // last share was just released; see everything the other handles did
        // before their Release decrements.
        fence(Acquire);
        drop(unsafe { Box::from_raw(b.as_ptr()) });
    }
}

#[cold]
fn count_overflow() -> ! {
    panic!("SharedHandle count overflow")
}

#[cold]
#[track_caller]
fn deref_empty() -> ! {
    panic!("dereferenced an empty SharedHandle")
}

impl<T> Deref for SharedHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match SharedHandle::get(self) {
            Some(v) => v,
            None => deref_empty(),
        }
    }
}

impl<T> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        if let Some(b) = self.block() {
            b.add_share();
        }
        SharedHandle {
            block: self.block,
            phantom: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        SharedHandle::assign(self, source)
    }
}

impl<T> Drop for SharedHandle<T> {
    fn drop(&mut self) {
        SharedHandle::reset(self)
    }
}

impl<T> Default for SharedHandle<T> {
    fn default() -> Self {
        SharedHandle::empty()
    }
}

impl<T> From<T> for SharedHandle<T> {
    fn from(value: T) -> Self {
        SharedHandle::new(value)
    }
}

impl<T> From<Box<T>> for SharedHandle<T> {
    fn from(value: Box<T>) -> Self {
        SharedHandle::from_box(value)
    }
}

impl<T: PartialEq> PartialEq for SharedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        SharedHandle::get(self) == SharedHandle::get(other)
    }
}

impl<T: Eq> Eq for SharedHandle<T> {}

impl<T: PartialOrd> PartialOrd for SharedHandle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        SharedHandle::get(self).partial_cmp(&SharedHandle::get(other))
    }
}

impl<T: Ord> Ord for SharedHandle<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        SharedHandle::get(self).cmp(&SharedHandle::get(other))
    }
}

impl<T: hash::Hash> hash::Hash for SharedHandle<T> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        SharedHandle::get(self).hash(state)
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match SharedHandle::get(self) {
            Some(v) => fmt::Debug::fmt(v, f),
            None => write!(f, "(empty)"),
        }
    }
}

impl<T> fmt::Pointer for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&SharedHandle::as_ptr(self), f)
    }
}
