//! Volatile memory access for interrupt-shared and memory-mapped storage.
//!
//! [`volatile_read`] and [`volatile_write`] perform exactly one memory access
//! that the compiler may not elide, cache in a register, or reorder relative
//! to other volatile accesses. They are restricted to [`Integral`] types.
//!
//! ## What this is not
//!
//! Volatile accesses are **not** atomics. They provide no read-modify-write
//! indivisibility and no fencing between CPU cores. The intended target is a
//! single core where an interrupt handler and the main loop share memory and
//! the only reordering risk is the compiler.
//!
//! ```ignore
//! let mut tick_count = 0u32;
//! unsafe { volta::volatile_write(&mut tick_count, 45) };
//! let snapshot = unsafe { volta::volatile_read(&tick_count) };
//! ```

use core::cell::UnsafeCell;
use core::ptr;

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width integral types (and `bool`) accepted by the volatile primitives.
///
/// This trait is sealed: it cannot be implemented outside this crate, so
/// passing a float, a struct or a pointer is rejected at compile time.
pub trait Integral: Copy + sealed::Sealed {
    /// The all-zero value of the type (`false` for `bool`).
    const ZERO: Self;
}

macro_rules! impl_integral {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Integral for $ty {
                const ZERO: Self = $zero;
            }
        )*
    };
}

impl_integral! {
    bool => false,
    i8 => 0, u8 => 0,
    i16 => 0, u16 => 0,
    i32 => 0, u32 => 0,
    i64 => 0, u64 => 0,
    i128 => 0, u128 => 0,
    isize => 0, usize => 0,
}

/// Read the value at `source` with a single non-elidable load.
///
/// # Safety
///
/// - `source` must be non-null and properly aligned for `T`.
/// - `source` must point to live memory that is valid for reads of `T`.
///
/// Debug builds assert the non-null precondition.
#[inline(always)]
pub unsafe fn volatile_read<T: Integral>(source: *const T) -> T {
    debug_assert!(!source.is_null(), "volatile_read from null pointer");
    // SAFETY: Caller guarantees `source` is valid, aligned and initialized.
    unsafe { ptr::read_volatile(source) }
}

/// Store `value` at `dest` with a single non-elidable write.
///
/// The write happens even if nothing in the current control flow ever reads
/// the location back.
///
/// # Safety
///
/// - `dest` must be non-null and properly aligned for `T`.
/// - `dest` must point to live memory that is valid for writes of `T`.
///
/// Debug builds assert the non-null precondition.
#[inline(always)]
pub unsafe fn volatile_write<T: Integral>(dest: *mut T, value: T) {
    debug_assert!(!dest.is_null(), "volatile_write to null pointer");
    // SAFETY: Caller guarantees `dest` is valid and aligned.
    unsafe { ptr::write_volatile(dest, value) }
}

/// A single integral value whose every access is volatile.
///
/// Reads and writes go through [`volatile_read`] / [`volatile_write`] on the
/// owned cell, so they are safe to call. `set` takes `&self`, which lets the
/// cell live in a `static` touched from both an interrupt handler and the
/// main loop.
///
/// # Contract
///
/// Single core only. Sharing a cell between cores, or writing it from more
/// than one context at a time, is a data race.
#[repr(transparent)]
pub struct VolatileCell<T: Integral>(UnsafeCell<T>);

// SAFETY: `T: Integral` values are plain `Copy` integers with no destructor.
// Every access is a single volatile load or store of the cell, and the
// single-core / single-writer contract above rules out concurrent mutation.
unsafe impl<T: Integral> Sync for VolatileCell<T> {}

impl<T: Integral> VolatileCell<T> {
    /// Create a cell holding `value`.
    pub const fn new(value: T) -> Self {
        VolatileCell(UnsafeCell::new(value))
    }

    /// Volatile read of the current value.
    #[inline(always)]
    pub fn get(&self) -> T {
        // SAFETY: The pointer comes from our own UnsafeCell and is always valid.
        unsafe { volatile_read(self.0.get()) }
    }

    /// Volatile write of a new value.
    #[inline(always)]
    pub fn set(&self, value: T) {
        // SAFETY: The pointer comes from our own UnsafeCell and is always valid.
        unsafe { volatile_write(self.0.get(), value) }
    }

    /// Address of the underlying value. Stable for the lifetime of the cell.
    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut T {
        self.0.get()
    }

    /// Plain mutable access. The exclusive borrow rules out any concurrent
    /// access, so no volatile load is needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }

    /// Consume the cell and return the value.
    pub fn into_inner(self) -> T {
        self.0.into_inner()
    }
}
