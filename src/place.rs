use crate::{
  block::{self, MIN_BLOCK_SIZE, Tag},
  extend::HeapExtender,
  heap::Heap,
};

/// Bytes left over when a block of `size` bytes serves a request of `asize`
/// bytes, if they are enough to stand alone as a block.
pub(crate) fn remainder(
  size: usize,
  asize: usize,
) -> Option<usize> {
  let rest = size - asize;
  (rest >= MIN_BLOCK_SIZE).then_some(rest)
}

impl<E: HeapExtender> Heap<E> {
  /// Allocates `asize` bytes at the start of the free block at `bp`, splitting
  /// the tail off as a new free block when it is big enough.
  pub(crate) fn place(
    &mut self,
    bp: usize,
    asize: usize,
  ) {
    let size = self.block_size(bp);
    debug_assert!(asize <= size, "block {bp:#x} of {size} bytes cannot hold {asize}");

    self.remove(bp);

    match remainder(size, asize) {
      Some(rest) => {
        self.write_tags(bp, Tag::allocated(asize));

        // The split may land in a smaller class than the original block.
        let tail = block::next_block(bp, asize);
        self.write_tags(tail, Tag::free(rest));
        self.insert(tail);
      }
      None => self.write_tags(bp, Tag::allocated(size)),
    }
  }
}
