//! Explicit free lists threaded through free blocks.
//!
//! A free block keeps two compressed links right after its header. List heads
//! live in the table at the very start of the heap, one word per class:
//!
//! ```text
//!   heads                        free blocks (any address order)
//!   ┌──────┐     ┌──────┬──────┬──────┐     ┌──────┬──────┬──────┐
//!   │ c[0] │ ──▶ │ hdr  │ prev │ next │ ──▶ │ hdr  │ prev │ next │ ──▶ 0
//!   ├──────┤     └──────┴──────┴──────┘ ◀── └──────┴──────┴──────┘
//!   │ c[1] │ ──▶ 0     prev = 0
//!   ├──────┤
//!   │ ...  │
//!   └──────┘
//! ```
//!
//! Insertion is LIFO at the head. Both operations are O(1).

use crate::{
  block::WSIZE,
  extend::HeapExtender,
  heap::Heap,
  link,
};

impl<E: HeapExtender> Heap<E> {
  pub(crate) fn head(
    &self,
    class: usize,
  ) -> Option<usize> {
    link::decode(self.get(class * WSIZE))
  }

  pub(crate) fn set_head(
    &mut self,
    class: usize,
    bp: Option<usize>,
  ) {
    self.put(class * WSIZE, link::encode(bp));
  }

  pub(crate) fn prev_free(
    &self,
    bp: usize,
  ) -> Option<usize> {
    link::decode(self.get(bp))
  }

  pub(crate) fn next_free(
    &self,
    bp: usize,
  ) -> Option<usize> {
    link::decode(self.get(bp + WSIZE))
  }

  fn set_prev_free(
    &mut self,
    bp: usize,
    prev: Option<usize>,
  ) {
    self.put(bp, link::encode(prev));
  }

  fn set_next_free(
    &mut self,
    bp: usize,
    next: Option<usize>,
  ) {
    self.put(bp + WSIZE, link::encode(next));
  }

  /// Pushes the free block at `bp` onto the list of its size class.
  pub(crate) fn insert(
    &mut self,
    bp: usize,
  ) {
    let class = self.class_for(self.block_size(bp));
    let head = self.head(class);

    self.set_prev_free(bp, None);
    self.set_next_free(bp, head);

    if let Some(head) = head {
      self.set_prev_free(head, Some(bp));
    }

    self.set_head(class, Some(bp));
  }

  /// Unlinks the free block at `bp`. Its header must still hold the size it
  /// was inserted with.
  pub(crate) fn remove(
    &mut self,
    bp: usize,
  ) {
    let prev = self.prev_free(bp);
    let next = self.next_free(bp);

    match prev {
      Some(prev) => self.set_next_free(prev, next),
      None => {
        let class = self.class_for(self.block_size(bp));
        self.set_head(class, next);
      }
    }

    if let Some(next) = next {
      self.set_prev_free(next, prev);
    }
  }

  /// Iterates the blocks of one free list from its head.
  pub(crate) fn free_list(
    &self,
    class: usize,
  ) -> FreeListIter<'_, E> {
    FreeListIter {
      heap: self,
      next: self.head(class),
    }
  }
}

pub(crate) struct FreeListIter<'h, E: HeapExtender> {
  heap: &'h Heap<E>,
  next: Option<usize>,
}

impl<E: HeapExtender> Iterator for FreeListIter<'_, E> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let bp = self.next?;
    self.next = self.heap.next_free(bp);
    Some(bp)
  }
}
