//! Boundary tag coalescing.
//!
//! The footer of the block before and the header of the block after tell
//! whether the neighbors are free. Four cases:
//!
//! ```text
//!   Neither   [ A ][ F ][ A ]   ->   [ A ][ F ][ A ]
//!   Next      [ A ][ F ][ f ]   ->   [ A ][ F      ]
//!   Prev      [ f ][ F ][ A ]   ->   [      F ][ A ]
//!   Both      [ f ][ F ][ f ]   ->   [      F      ]
//! ```

use crate::{
  block::{self, Tag},
  extend::HeapExtender,
  heap::Heap,
};

/// Which physical neighbors of a block are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Neighbors {
  Neither,
  Next,
  Prev,
  Both,
}

impl Neighbors {
  pub fn classify(
    prev_free: bool,
    next_free: bool,
  ) -> Self {
    match (prev_free, next_free) {
      (false, false) => Neighbors::Neither,
      (false, true) => Neighbors::Next,
      (true, false) => Neighbors::Prev,
      (true, true) => Neighbors::Both,
    }
  }

  pub fn prev_free(self) -> bool {
    matches!(self, Neighbors::Prev | Neighbors::Both)
  }

  pub fn next_free(self) -> bool {
    matches!(self, Neighbors::Next | Neighbors::Both)
  }
}

/// A run of bytes starting at block pointer `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
  pub start: usize,
  pub size: usize,
}

impl Span {
  pub fn end(self) -> usize {
    self.start + self.size
  }
}

/// The span covered by `block` once merged with its free neighbors.
pub(crate) fn merge(
  neighbors: Neighbors,
  prev: Span,
  block: Span,
  next: Span,
) -> Span {
  match neighbors {
    Neighbors::Neither => block,
    Neighbors::Next => Span {
      start: block.start,
      size: block.size + next.size,
    },
    Neighbors::Prev => Span {
      start: prev.start,
      size: prev.size + block.size,
    },
    Neighbors::Both => Span {
      start: prev.start,
      size: prev.size + block.size + next.size,
    },
  }
}

impl<E: HeapExtender> Heap<E> {
  /// Merges the free block at `bp` with its free neighbors and returns the
  /// block pointer of the result. Absorbed neighbors leave their free lists;
  /// the result itself is not inserted anywhere.
  pub(crate) fn coalesce(
    &mut self,
    bp: usize,
  ) -> usize {
    let size = self.block_size(bp);
    let prev_tag = Tag::unpack(self.get(block::prev_footer(bp)));
    let next_bp = block::next_block(bp, size);
    let next_tag = self.tag(next_bp);

    let prev = Span {
      start: block::prev_block(bp, prev_tag.size),
      size: prev_tag.size,
    };
    let current = Span { start: bp, size };
    let next = Span {
      start: next_bp,
      size: next_tag.size,
    };

    let neighbors = Neighbors::classify(!prev_tag.allocated, !next_tag.allocated);

    // Unlink while the old headers still name the right classes.
    if neighbors.prev_free() {
      self.remove(prev.start);
    }
    if neighbors.next_free() {
      self.remove(next.start);
    }

    let merged = merge(neighbors, prev, current, next);
    self.write_tags(merged.start, Tag::free(merged.size));

    if self.rover > merged.start && self.rover < merged.end() {
      self.rover = merged.start;
    }

    merged.start
  }
}
