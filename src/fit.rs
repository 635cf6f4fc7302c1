use crate::{config::FitPolicy, extend::HeapExtender, heap::Heap};

impl<E: HeapExtender> Heap<E> {
  /// Finds a free block of at least `asize` bytes under the configured
  /// policy. `None` means the heap has to grow.
  pub(crate) fn find_fit(
    &mut self,
    asize: usize,
  ) -> Option<usize> {
    match self.config.policy {
      FitPolicy::FirstFit | FitPolicy::Segregated => self.list_fit(asize),
      FitPolicy::NextFit => self.next_fit(asize),
    }
  }

  /// First block that fits, scanning the lists from the class of `asize`
  /// upwards. Lower classes only hold smaller blocks. With a single list this
  /// is plain first fit.
  fn list_fit(
    &self,
    asize: usize,
  ) -> Option<usize> {
    (self.class_for(asize)..self.classes())
      .find_map(|class| self.free_list(class).find(|&bp| self.block_size(bp) >= asize))
  }

  /// Address order search starting at the rover and wrapping around once.
  fn next_fit(
    &mut self,
    asize: usize,
  ) -> Option<usize> {
    let start = self.rover;

    let mut bp = start;
    while self.block_size(bp) > 0 {
      if self.fits(bp, asize) {
        self.rover = bp;
        return Some(bp);
      }
      bp = self.next_block(bp);
    }

    let mut bp = self.prologue;
    while bp < start {
      if self.fits(bp, asize) {
        self.rover = bp;
        return Some(bp);
      }
      bp = self.next_block(bp);
    }

    None
  }

  fn fits(
    &self,
    bp: usize,
    asize: usize,
  ) -> bool {
    let tag = self.tag(bp);
    !tag.allocated && tag.size >= asize
  }
}
