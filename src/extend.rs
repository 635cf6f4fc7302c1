use std::ptr::NonNull;

use crate::error::HeapError;

/// Source of heap memory. Behaves like `sbrk(2)`: the region only grows, and
/// every successful [`HeapExtender::extend`] returns the old break, which is
/// where the newly usable bytes begin.
pub trait HeapExtender {
  /// Grows the region by `increment` bytes. Returns the start of the new
  /// bytes, or `None` if the region cannot grow.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>>;

  /// First byte of the region.
  fn low(&self) -> NonNull<u8>;

  /// Last valid byte of the region. One byte before [`HeapExtender::low`]
  /// while the region is empty.
  fn high(&self) -> *mut u8 {
    self.low().as_ptr().wrapping_add(self.size()).wrapping_sub(1)
  }

  /// Current size of the region in bytes.
  fn size(&self) -> usize;
}

/// Bump region over a fixed reservation. Memory is reserved up front and
/// handed out in order, the way `sbrk` moves the program break, but without
/// fighting the process allocator over the real break.
///
/// ```text
///   ┌───────────────────────────────┬───────────────────────────────┐
///   │        extended (heap)        │           reserved            │
///   └───────────────────────────────┴───────────────────────────────┘
///   ▲                               ▲                               ▲
///   low                            break                        capacity
/// ```
pub struct Arena {
  start: NonNull<u8>,
  brk: usize,
  capacity: usize,
}

impl Arena {
  /// Reserves `capacity` bytes. Nothing is part of the heap until
  /// [`HeapExtender::extend`] is called.
  pub fn with_capacity(capacity: usize) -> Result<Self, HeapError> {
    if capacity == 0 {
      return Err(HeapError::Reserve { capacity });
    }

    if capacity > u32::MAX as usize {
      return Err(HeapError::TooLarge { capacity });
    }

    let start = unsafe { platform::reserve(capacity) }.ok_or(HeapError::Reserve { capacity })?;

    log::debug!("Arena::with_capacity({capacity:#x}) -> {:p}", start.as_ptr());

    Ok(Self {
      start,
      brk: 0,
      capacity,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl HeapExtender for Arena {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Option<NonNull<u8>> {
    if increment > self.capacity - self.brk {
      log::warn!(
        "Arena::extend({increment:#x}): out of memory, {:#x} of {:#x} bytes in use",
        self.brk,
        self.capacity
      );
      return None;
    }

    // SAFETY: `brk <= capacity`, so the result stays inside the reservation.
    let old_brk = unsafe { self.start.add(self.brk) };
    self.brk += increment;

    Some(old_brk)
  }

  fn low(&self) -> NonNull<u8> {
    self.start
  }

  fn size(&self) -> usize {
    self.brk
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    unsafe { platform::release(self.start, self.capacity) }
  }
}

#[cfg(all(unix, not(miri)))]
mod platform {
  use std::ptr::{self, NonNull};

  pub unsafe fn reserve(length: usize) -> Option<NonNull<u8>> {
    // Private, anonymous, read-write. Anonymous mappings start zeroed.
    let protection = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

    match unsafe { libc::mmap(ptr::null_mut(), length, protection, flags, -1, 0) } {
      libc::MAP_FAILED => None,
      address => NonNull::new(address.cast()),
    }
  }

  pub unsafe fn release(
    address: NonNull<u8>,
    length: usize,
  ) {
    if unsafe { libc::munmap(address.as_ptr().cast(), length) } != 0 {
      log::warn!("munmap({:p}, {length:#x}) failed", address.as_ptr());
    }
  }
}

#[cfg(any(not(unix), miri))]
mod platform {
  //! No `mmap` under Miri or off unix, so the global allocator provides the
  //! reservation instead.

  use std::{alloc, ptr::NonNull};

  const PAGE_SIZE: usize = 4096;

  fn layout(length: usize) -> Option<alloc::Layout> {
    alloc::Layout::from_size_align(length, PAGE_SIZE).ok()
  }

  pub unsafe fn reserve(length: usize) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { alloc::alloc_zeroed(layout(length)?) })
  }

  pub unsafe fn release(
    address: NonNull<u8>,
    length: usize,
  ) {
    if let Some(layout) = layout(length) {
      unsafe { alloc::dealloc(address.as_ptr(), layout) }
    }
  }
}
