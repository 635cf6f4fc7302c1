//! Heap consistency checker.
//!
//! Read-only. Walks the heap twice, once in address order through the
//! boundary tags and once through every free list, and cross-checks the two.
//! Reads are bounds checked so a corrupt heap yields a [`Violation`] instead
//! of a wild read.

use std::panic::Location;

use crate::{
  block::{self, DSIZE, MIN_BLOCK_SIZE, Tag, WSIZE},
  config::FitPolicy,
  error::Violation,
  extend::HeapExtender,
  heap::Heap,
};

/// One block of the heap image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Block pointer relative to the heap base.
  pub offset: usize,
  /// Total size including the boundary tags.
  pub size: usize,
  pub allocated: bool,
}

impl BlockInfo {
  /// Address handed out (or to be handed out) for this block.
  pub fn address<E: HeapExtender>(
    &self,
    heap: &Heap<E>,
  ) -> *mut u8 {
    heap.address(self.offset)
  }
}

/// Totals gathered by a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
  pub heap_size: usize,
  pub blocks: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
}

/// Address order walk over the blocks between prologue and epilogue. Stops
/// early at anything that does not look like a block.
pub struct Blocks<'h, E: HeapExtender> {
  heap: &'h Heap<E>,
  bp: usize,
}

impl<E: HeapExtender> Iterator for Blocks<'_, E> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    let tag = Tag::unpack(self.heap.try_get(block::header(self.bp))?);

    if tag.size < MIN_BLOCK_SIZE || self.bp + tag.size > self.heap.heap_size() {
      return None;
    }

    let info = BlockInfo {
      offset: self.bp,
      size: tag.size,
      allocated: tag.allocated,
    };
    self.bp += tag.size;

    Some(info)
  }
}

impl<E: HeapExtender> Heap<E> {
  /// Blocks in address order, prologue and epilogue excluded.
  pub fn blocks(&self) -> Blocks<'_, E> {
    Blocks {
      heap: self,
      bp: self.first_block(),
    }
  }

  /// Totals over [`Heap::blocks`] without checking anything.
  pub fn stats(&self) -> HeapStats {
    self.blocks().fold(
      HeapStats {
        heap_size: self.heap_size(),
        ..HeapStats::default()
      },
      |mut stats, block| {
        stats.blocks += 1;
        if !block.allocated {
          stats.free_blocks += 1;
          stats.free_bytes += block.size;
        }
        stats
      },
    )
  }

  /// Verifies every heap invariant.
  pub fn verify(&self) -> Result<HeapStats, Violation> {
    self.check_bounds()?;
    let stats = self.walk_blocks()?;
    let listed = self.walk_lists()?;

    if listed != stats.free_blocks {
      return Err(Violation::FreeCount {
        walked: stats.free_blocks,
        listed,
      });
    }

    Ok(stats)
  }

  /// Runs [`Heap::verify`] and panics on the first violation, naming the
  /// caller. With `verbose` set the heap image goes to the log first.
  #[track_caller]
  pub fn check(
    &self,
    verbose: bool,
  ) {
    if verbose {
      self.log_image();
    }

    if let Err(violation) = self.verify() {
      let caller = Location::caller();
      log::error!("heap check failed at {caller}: {violation}");
      panic!("heap check failed at {caller}: {violation}");
    }
  }

  fn check_bounds(&self) -> Result<(), Violation> {
    let prologue = self.prologue;

    if prologue + 2 * WSIZE > self.heap_size() {
      return Err(Violation::PrologueOutOfBounds { offset: prologue });
    }

    let padding = self.get(prologue - DSIZE);
    if padding != 0 {
      return Err(Violation::Padding { found: padding });
    }

    let header = self.get(block::header(prologue));
    let footer = self.get(block::footer(prologue, DSIZE));
    let expected = block::pack(DSIZE, true);
    if header != expected || footer != expected {
      return Err(Violation::Prologue { header, footer });
    }

    let epilogue = self.get(self.epilogue());
    if epilogue != block::pack(0, true) {
      return Err(Violation::Epilogue { found: epilogue });
    }

    Ok(())
  }

  fn walk_blocks(&self) -> Result<HeapStats, Violation> {
    let heap_size = self.heap_size();
    let mut stats = HeapStats {
      heap_size,
      ..HeapStats::default()
    };

    let mut rover_seen = self.config.policy != FitPolicy::NextFit || self.rover == self.prologue;
    let mut last_free = None;
    let mut bp = self.first_block();

    loop {
      if (self.low().as_ptr() as usize + bp) % DSIZE != 0 {
        return Err(Violation::Misaligned { offset: bp });
      }

      let header = self.try_get(block::header(bp)).ok_or(Violation::OutOfBounds { offset: bp, size: 0 })?;
      let tag = Tag::unpack(header);

      if tag.size == 0 {
        // Only the epilogue may be empty.
        if block::header(bp) != self.epilogue() {
          return Err(Violation::Undersized { offset: bp, size: 0 });
        }
        break;
      }

      if tag.size < MIN_BLOCK_SIZE {
        return Err(Violation::Undersized {
          offset: bp,
          size: tag.size,
        });
      }

      if bp + tag.size > heap_size {
        return Err(Violation::OutOfBounds {
          offset: bp,
          size: tag.size,
        });
      }

      let footer = self.get(block::footer(bp, tag.size));
      if footer != header {
        return Err(Violation::TagMismatch {
          offset: bp,
          header,
          footer,
        });
      }

      if bp == self.rover {
        rover_seen = true;
      }

      stats.blocks += 1;

      if tag.allocated {
        last_free = None;
      } else {
        if let Some(first) = last_free {
          return Err(Violation::Uncoalesced { first, second: bp });
        }
        last_free = Some(bp);
        stats.free_blocks += 1;
        stats.free_bytes += tag.size;
      }

      bp += tag.size;
    }

    if !rover_seen {
      return Err(Violation::Rover { offset: self.rover });
    }

    Ok(stats)
  }

  /// Walks every free list and returns how many blocks they hold.
  fn walk_lists(&self) -> Result<usize, Violation> {
    let limit = self.heap_size() / MIN_BLOCK_SIZE;
    let mut listed = 0;

    for class in 0..self.classes() {
      let mut prev = None;
      let mut cursor = self.head(class);
      let mut steps = 0;

      while let Some(bp) = cursor {
        steps += 1;
        if steps > limit {
          return Err(Violation::Cycle { class });
        }

        if bp < self.first_block() || bp % DSIZE != 0 || bp + MIN_BLOCK_SIZE > self.epilogue() + WSIZE {
          return Err(Violation::ListOutOfBounds { class, offset: bp });
        }

        let tag = self.tag(bp);
        if tag.allocated {
          return Err(Violation::ListAllocated { class, offset: bp });
        }

        let expected = self.class_for(tag.size);
        if expected != class {
          return Err(Violation::WrongClass {
            offset: bp,
            size: tag.size,
            class,
            expected,
          });
        }

        let back = self.prev_free(bp);
        if back != prev {
          return Err(match prev {
            None => Violation::HeadHasPrev { class, offset: bp },
            Some(expected) => Violation::BrokenLink {
              offset: bp,
              found: back.unwrap_or(0),
              expected,
            },
          });
        }

        listed += 1;
        prev = Some(bp);
        cursor = self.next_free(bp);
      }
    }

    Ok(listed)
  }

  fn log_image(&self) {
    log::debug!("heap image [offset, size, alloc], {:#x} bytes:", self.heap_size());
    log::debug!("  [padding, {:#x}]", self.get(self.prologue - DSIZE));
    log::debug!("  [{:#x}, {}, 1] prologue", self.prologue, DSIZE);

    for block in self.blocks() {
      log::debug!("  [{:#x}, {}, {}]", block.offset, block.size, block.allocated as u8);
    }

    log::debug!("  [{:#x}, 0, 1] epilogue", self.epilogue() + WSIZE);

    for class in 0..self.classes() {
      if self.head(class).is_none() {
        continue;
      }

      log::debug!("free list {class} [offset, size] (prev, next):");

      // Bounded in case the list is what is broken.
      for bp in self.free_list(class).take(self.heap_size() / MIN_BLOCK_SIZE) {
        log::debug!(
          "  [{bp:#x}, {}] ({:?}, {:?})",
          self.block_size(bp),
          self.prev_free(bp),
          self.next_free(bp)
        );
      }
    }
  }
}
