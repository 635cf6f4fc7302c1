//! Boundary tag layout.
//!
//! Blocks are addressed by the offset of their payload ("block pointer", `bp`)
//! from the heap base. The tag word sits right before the payload and, for
//! every block, a copy of it closes the block:
//!
//! ```text
//!            bp - 4         bp                          bp + size - 8
//!   ┌───────────────┬──────────────┬──────────────┬─ ─ ─┬───────────────┐
//!   │ header        │ prev link    │ next link    │     │ footer        │
//!   │ size | alloc  │ (free only)  │ (free only)  │     │ size | alloc  │
//!   └───────────────┴──────────────┴──────────────┴─ ─ ─┴───────────────┘
//!      4 bytes          4 bytes        4 bytes                4 bytes
//! ```
//!
//! Sizes are multiples of 8, so the low three bits of a tag are free and the
//! lowest one holds the allocation bit.

/// Word size, also the size of a header or footer.
pub const WSIZE: usize = 4;

/// Double word size. Payload alignment and size granularity.
pub const DSIZE: usize = 8;

/// Smallest block able to hold a header, two links and a footer.
pub const MIN_BLOCK_SIZE: usize = 2 * DSIZE;

/// Header plus footer.
pub const OVERHEAD: usize = DSIZE;

/// Largest request the heap accepts. Anything bigger could never be addressed
/// with 32-bit offsets anyway.
pub const MAX_REQUEST: usize = u32::MAX as usize - 2 * DSIZE;

const ALLOC_BIT: u32 = 0x1;
const SIZE_MASK: u32 = !0x7;

/// Decoded header or footer word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
  pub size: usize,
  pub allocated: bool,
}

impl Tag {
  pub const fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self { size, allocated }
  }

  pub const fn free(size: usize) -> Self {
    Self::new(size, false)
  }

  pub const fn allocated(size: usize) -> Self {
    Self::new(size, true)
  }

  #[inline]
  pub fn pack(self) -> u32 {
    pack(self.size, self.allocated)
  }

  #[inline]
  pub fn unpack(word: u32) -> Self {
    Self::new(unpack_size(word), unpack_allocated(word))
  }
}

/// Packs a size and an allocation bit into a tag word.
#[inline]
pub fn pack(
  size: usize,
  allocated: bool,
) -> u32 {
  debug_assert_eq!(size % DSIZE, 0, "block size {size} is not double word aligned");
  debug_assert!(size <= u32::MAX as usize, "block size {size} does not fit a tag");
  size as u32 | if allocated { ALLOC_BIT } else { 0 }
}

#[inline]
pub fn unpack_size(word: u32) -> usize {
  (word & SIZE_MASK) as usize
}

#[inline]
pub fn unpack_allocated(word: u32) -> bool {
  word & ALLOC_BIT != 0
}

/// Offset of the header of the block at `bp`.
#[inline]
pub const fn header(bp: usize) -> usize {
  bp - WSIZE
}

/// Offset of the footer of the block at `bp` with the given size.
#[inline]
pub const fn footer(
  bp: usize,
  size: usize,
) -> usize {
  bp + size - DSIZE
}

/// Offset of the footer of the block physically before `bp`.
#[inline]
pub const fn prev_footer(bp: usize) -> usize {
  bp - DSIZE
}

/// Block pointer of the block physically after `bp`.
#[inline]
pub const fn next_block(
  bp: usize,
  size: usize,
) -> usize {
  bp + size
}

/// Block pointer of the block physically before `bp`, given the size read
/// from its footer.
#[inline]
pub const fn prev_block(
  bp: usize,
  prev_size: usize,
) -> usize {
  bp - prev_size
}

/// Usable bytes of a block of `size` bytes.
#[inline]
pub const fn payload_size(size: usize) -> usize {
  size - OVERHEAD
}

/// Block size needed for a payload of `size` bytes, boundary tags included.
/// Returns `None` for requests the heap can never satisfy.
pub fn adjusted_size(size: usize) -> Option<usize> {
  if size > MAX_REQUEST {
    return None;
  }

  if size <= DSIZE {
    Some(MIN_BLOCK_SIZE)
  } else {
    Some(crate::align!(size + OVERHEAD))
  }
}
