//! Size classes for segregated fits.
//!
//! Classes are keyed by the block size in words (4 bytes):
//!
//! ```text
//!   class  0..=14   exact word counts 4, 6, 8, ..., 32
//!   class  15       34..64 words
//!   class  16       [2^6,  2^7)
//!   class  17       [2^7,  2^8)
//!   ...
//!   class  28       [2^18, inf)
//! ```

use crate::block::WSIZE;

/// Number of segregated classes.
pub const CLASS_COUNT: usize = LINEAR_CLASSES + POW2_CLASSES;

/// Classes holding a single word count each.
const LINEAR_CLASSES: usize = 15;

/// Classes covering a power of two range of word counts each.
const POW2_CLASSES: usize = 14;

/// Largest word count with its own linear class.
const LINEAR_LIMIT: usize = 32;

/// Word counts below `2^POW2_SHIFT` past the linear classes share one class.
const POW2_SHIFT: u32 = 6;

/// Maps a block size in bytes to its class.
pub fn class_of(size: usize) -> usize {
  let words = size / WSIZE;

  if words <= LINEAR_LIMIT {
    return words.saturating_sub(4) / 2;
  }

  let magnitude = (usize::BITS - (words >> POW2_SHIFT).leading_zeros()) as usize;
  LINEAR_CLASSES + magnitude.min(POW2_CLASSES - 1)
}
