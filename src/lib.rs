/*!
This crate provides [`SharedHandle<T>`], an atomically refcounted pointer that
behaves like C++'s [`shared_ptr`](https://en.cppreference.com/w/cpp/memory/shared_ptr):
every handle cloned from the same original shares one heap value, the value is
dropped when the last of them goes away, and a handle can also be *empty*.

```rust
    use shared_handle::SharedHandle;

    let a = SharedHandle::new(123);
    assert_eq!(SharedHandle::use_count(&a), 1);
    {
        let b = a.clone();
        assert_eq!(SharedHandle::use_count(&a), 2);
        assert_eq!(SharedHandle::as_ptr(&a), SharedHandle::as_ptr(&b));
    }
    assert_eq!(SharedHandle::use_count(&a), 1);
    assert_eq!(*a, 123);
```

# Empty handles

`SharedHandle::empty()` (also `Default`) owns nothing and does not allocate.
Its use count is 0 and [`as_ptr`][SharedHandle::as_ptr] returns null.
Operations that give up ownership leave an empty handle behind:

```
    use shared_handle::SharedHandle;

    let mut a = SharedHandle::new(String::from("hi"));
    let b = SharedHandle::take(&mut a);
    assert!(SharedHandle::is_empty(&a));
    assert_eq!(SharedHandle::use_count(&b), 1);

    let mut c = b.clone();
    SharedHandle::reset(&mut c);
    assert!(SharedHandle::get(&c).is_none());
    assert_eq!(SharedHandle::use_count(&b), 1);
```

Dereferencing an empty handle panics. Check with
[`is_empty`][SharedHandle::is_empty] or use [`get`][SharedHandle::get] first.

# Assignment

[`assign`][SharedHandle::assign] (also `Clone::clone_from`) and
[`assign_from`][SharedHandle::assign_from] replace what a handle owns. Both
release the old share first, which may drop the old value. If the two handles
are already in the same group, nothing is released early:

```
    use shared_handle::SharedHandle;

    let mut a = SharedHandle::new(1);
    let mut b = a.clone();
    SharedHandle::assign_from(&mut a, &mut b);
    assert!(SharedHandle::is_empty(&b));
    assert_eq!(SharedHandle::use_count(&a), 1);
    assert_eq!(*a, 1);
```

# Threads

Handles are `Send` and `Sync` when `T: Send + Sync`. The count is updated only
with atomic read-modify-write operations, and exactly one thread (the one whose
decrement takes the count from 1 to 0) drops the value.

```
    use shared_handle::SharedHandle;
    use std::sync::Mutex;

    let v = SharedHandle::new(Mutex::new(vec![]));
    std::thread::scope(|s| {
        for i in 0..4 {
            let v = v.clone();
            s.spawn(move || v.lock().unwrap().push(i));
        }
    });
    assert_eq!(v.lock().unwrap().len(), 4);
    assert_eq!(SharedHandle::use_count(&v), 1);
```

The handle adds no locking of its own: mutating the value through several
handles needs interior synchronization such as the `Mutex` above.

[`use_count`][SharedHandle::use_count] is a relaxed snapshot. With other
threads cloning or dropping handles of the same group it may be out of date by
the time you look at it, so don't use it for synchronization.

# Notes

## Differences from `std::sync::Arc`

`SharedHandle<T>` is one pointer wide like `Arc<T>`, but can be empty, and the
contract-level operations (`reset`, `swap`, `assign`) exist as functions.

`SharedHandle::from_box` and `from_raw` move the value into a new allocation
that holds the count next to it, so the value's address changes. The count and
value are always allocated together, never separately.

If you leak so many handles that the count would pass `isize::MAX`, `Arc`
aborts. There is no `abort()` in `no_std`, so `SharedHandle` panics instead;
the leaked count stays where it is, so the value is never freed early.

Weak pointers, custom allocators, unsized values and projection to subobjects
are not supported.

## Testing

When built with `--cfg loom` the atomics come from
[`loom`](https://docs.rs/loom). This is a compiler flag rather than a Cargo
feature, so no dependent crate can switch it on. Only the library's own tests
run under it (doc tests and `tests/` would call loom atomics outside a model):

```text
RUSTFLAGS="--cfg loom" cargo test --release --lib loom
```
*/
#![no_std]
#[cfg(test)]
extern crate std;

extern crate alloc;

pub mod handle;
mod sync;


pub use self::handle::SharedHandle;
