//! Compressed pointers.
//!
//! The heap never grows past 4 GiB, so any block inside it can be named by a
//! 32-bit offset from the heap base. Free blocks store their list links as
//! such offsets, which lets two links fit in the 8 bytes a minimum block has
//! between its header and footer. Offset `0` is the heap base itself, which
//! always holds the bucket table, so it doubles as "no link".

use std::{num::NonZeroU32, ptr::NonNull};

/// Encodes a block offset as a link word. `None` is encoded as `0`.
#[inline]
pub fn encode(offset: Option<usize>) -> u32 {
  match offset {
    Some(offset) => {
      debug_assert!(offset != 0, "offset 0 cannot be linked");
      debug_assert!(offset <= u32::MAX as usize, "offset {offset:#x} exceeds 32 bits");
      offset as u32
    }
    None => 0,
  }
}

/// Decodes a link word back into a block offset.
#[inline]
pub fn decode(word: u32) -> Option<usize> {
  NonZeroU32::new(word).map(|link| link.get() as usize)
}

/// Converts native addresses to heap offsets and back, checking them against
/// the current heap bounds.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
  base: NonNull<u8>,
  size: usize,
}

impl Compressor {
  pub fn new(
    base: NonNull<u8>,
    size: usize,
  ) -> Self {
    Self { base, size }
  }

  /// Offset of `address` from the heap base, or `None` if `address` lies
  /// outside the heap.
  pub fn compress(
    &self,
    address: *const u8,
  ) -> Option<u32> {
    let offset = (address as usize).checked_sub(self.base.as_ptr() as usize)?;

    if offset >= self.size {
      return None;
    }

    u32::try_from(offset).ok()
  }

  /// Native address of `offset`, or `None` if it lies outside the heap.
  pub fn expand(
    &self,
    offset: u32,
  ) -> Option<NonNull<u8>> {
    let offset = offset as usize;

    if offset >= self.size {
      return None;
    }

    // SAFETY: `offset` is within the `size` bytes starting at `base`.
    Some(unsafe { self.base.add(offset) })
  }
}
