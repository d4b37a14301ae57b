//! Type-erased contiguous component storage.
//!
//! A [`Column`] owns one aligned heap buffer holding a homogeneous
//! sequence of values of a single registered component type, addressed by
//! element index. All lifecycle work (default construction, cloning,
//! destruction) goes through the [`TypeInfo`] vtable captured at
//! registration; element transfer is a bitwise relocation, which is what
//! a move is in Rust.
//!
//! ## Invariants
//! - The buffer is allocated with the element type's alignment; slot `i`
//!   starts at byte offset `i * size`.
//! - Exactly the first `len` slots hold live values; no slot is leaked or
//!   double-dropped.
//! - Element addresses are stable between mutations that do not grow the
//!   buffer.
//!
//! ## Unsafe code
//! This module manages raw allocations and constructs values through
//! erased function pointers. Typed access is only sound for the type
//! registered to this column's id; debug builds assert the [`TypeId`]
//! matches.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::any::TypeId;
use std::ptr::{self, NonNull};

use crate::engine::component::TypeInfo;

/// Growable, type-erased array of one component type.
pub struct Column {
    info: TypeInfo,
    data: NonNull<u8>,
    len: usize,
    capacity: usize,
}

// Only types bounded `Send + Sync` by the `Component` trait are ever
// registered, so the erased contents inherit those guarantees.
unsafe impl Send for Column {}
unsafe impl Sync for Column {}

impl Column {
    /// Creates an empty column for the component type described by
    /// `info`. No allocation happens until the first insertion.
    pub fn new(info: TypeInfo) -> Self {
        debug_assert!(info.size > 0, "zero-sized types are rejected at registration");
        Self {
            info,
            data: NonNull::dangling(),
            len: 0,
            capacity: 0,
        }
    }

    /// Number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the column holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current capacity in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The [`TypeInfo`] this column was created with.
    #[inline]
    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut u8 {
        self.data.as_ptr().wrapping_add(index * self.info.size)
    }

    fn layout_for(&self, elements: usize) -> Layout {
        Layout::from_size_align(elements * self.info.size, self.info.align)
            .expect("column capacity overflow")
    }

    /// Grows capacity to at least `required` elements: doubling, floored
    /// by the request. Relocates the live range with one byte copy.
    fn grow(&mut self, required: usize) {
        if required <= self.capacity {
            return;
        }
        let new_capacity = required.max(self.capacity * 2).max(4);
        let new_layout = self.layout_for(new_capacity);

        unsafe {
            let new_data = alloc(new_layout);
            if new_data.is_null() {
                handle_alloc_error(new_layout);
            }
            if self.len > 0 {
                ptr::copy_nonoverlapping(self.data.as_ptr(), new_data, self.len * self.info.size);
            }
            if self.capacity > 0 {
                dealloc(self.data.as_ptr(), self.layout_for(self.capacity));
            }
            self.data = NonNull::new_unchecked(new_data);
        }
        self.capacity = new_capacity;
    }

    /// Appends a value by relocating its bytes into the new tail slot.
    ///
    /// # Safety
    /// `src` must point to a live, aligned value of this column's element
    /// type. Ownership of the pointed-to bytes transfers to the column:
    /// the caller must treat the source slot as moved out and must not
    /// drop it.
    pub unsafe fn push(&mut self, src: *const u8) {
        self.grow(self.len + 1);
        unsafe {
            ptr::copy_nonoverlapping(src, self.slot(self.len), self.info.size);
        }
        self.len += 1;
    }

    /// Appends a clone of the value at `src`. The source stays live and
    /// owned by the caller.
    ///
    /// # Safety
    /// `src` must point to a live, aligned value of this column's element
    /// type, not aliasing this column's buffer.
    pub unsafe fn push_cloned(&mut self, src: *const u8) {
        self.grow(self.len + 1);
        unsafe {
            (self.info.clone_fn)(src, self.slot(self.len));
        }
        self.len += 1;
    }

    /// Appends a default-constructed element.
    pub fn push_default(&mut self) {
        self.grow(self.len + 1);
        unsafe {
            (self.info.default_fn)(self.slot(self.len));
        }
        self.len += 1;
    }

    /// Destroys the tail element and shrinks the count by one.
    pub fn pop(&mut self) {
        debug_assert!(self.len > 0, "pop on empty column");
        if self.len == 0 {
            return;
        }
        self.len -= 1;
        if self.info.needs_drop {
            unsafe {
                (self.info.drop_fn)(self.slot(self.len));
            }
        }
    }

    /// Removes the element at `index` by swap-and-pop: the removed slot
    /// is destroyed, then the last element is relocated over it. Removing
    /// the last element performs no relocation.
    pub fn swap_remove(&mut self, index: usize) {
        debug_assert!(index < self.len, "swap_remove index out of bounds");
        let last = self.len - 1;
        if self.info.needs_drop {
            unsafe {
                (self.info.drop_fn)(self.slot(index));
            }
        }
        if index != last {
            unsafe {
                ptr::copy_nonoverlapping(self.slot(last), self.slot(index), self.info.size);
            }
        }
        self.len = last;
    }

    /// As [`swap_remove`](Self::swap_remove), for a slot whose value was
    /// already relocated elsewhere: the slot is compacted over without
    /// being destroyed.
    pub fn swap_forget(&mut self, index: usize) {
        debug_assert!(index < self.len, "swap_forget index out of bounds");
        let last = self.len - 1;
        if index != last {
            unsafe {
                ptr::copy_nonoverlapping(self.slot(last), self.slot(index), self.info.size);
            }
        }
        self.len = last;
    }

    /// Grows capacity to at least `elements` without changing the length.
    pub fn reserve(&mut self, elements: usize) {
        self.grow(elements);
    }

    /// Resizes the column to exactly `new_len` elements,
    /// default-constructing the tail on growth and destroying the excess
    /// on shrink.
    pub fn resize(&mut self, new_len: usize) {
        if new_len > self.len {
            self.grow(new_len);
            for index in self.len..new_len {
                unsafe {
                    (self.info.default_fn)(self.slot(index));
                }
            }
        } else if self.info.needs_drop {
            for index in new_len..self.len {
                unsafe {
                    (self.info.drop_fn)(self.slot(index));
                }
            }
        }
        self.len = new_len;
    }

    /// Untyped pointer to slot `index`. Valid until the next mutation
    /// that grows the buffer.
    pub fn get_ptr(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.len, "get_ptr index out of bounds");
        self.slot(index)
    }

    /// Base pointer of the live range, for bulk typed iteration.
    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.data
    }

    /// Typed shared reference to the element at `index`.
    ///
    /// # Safety
    /// `T` must be the type registered to this column's id and `index`
    /// must be in bounds. No `&mut` to the same element may be live.
    pub unsafe fn get<T: 'static>(&self, index: usize) -> &T {
        debug_assert_eq!(TypeId::of::<T>(), self.info.type_id, "column type mismatch");
        debug_assert!(index < self.len);
        unsafe { &*self.slot(index).cast::<T>() }
    }

    /// Typed exclusive reference to the element at `index`.
    ///
    /// # Safety
    /// `T` must be the type registered to this column's id and `index`
    /// must be in bounds.
    pub unsafe fn get_mut<T: 'static>(&mut self, index: usize) -> &mut T {
        debug_assert_eq!(TypeId::of::<T>(), self.info.type_id, "column type mismatch");
        debug_assert!(index < self.len);
        unsafe { &mut *self.slot(index).cast::<T>() }
    }

    /// Destroys every element and releases the buffer.
    pub fn clear(&mut self) {
        if self.info.needs_drop {
            for index in 0..self.len {
                unsafe {
                    (self.info.drop_fn)(self.slot(index));
                }
            }
        }
        self.len = 0;
        if self.capacity > 0 {
            unsafe {
                dealloc(self.data.as_ptr(), self.layout_for(self.capacity));
            }
            self.data = NonNull::dangling();
            self.capacity = 0;
        }
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        self.clear();
    }
}
