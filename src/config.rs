use crate::class::CLASS_COUNT;

/// Default heap growth when no free block fits.
pub const CHUNK_SIZE: usize = 1 << 12;

/// Default arena reservation.
pub const DEFAULT_CAPACITY: usize = 20 * (1 << 20);

/// Where the allocator looks for a free block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitPolicy {
  /// One explicit free list, scanned from its head.
  FirstFit,
  /// One explicit free list for bookkeeping; searches walk the heap in
  /// address order, resuming where the previous search stopped.
  NextFit,
  /// One free list per size class, scanned from the smallest class that can
  /// hold the request upwards.
  #[default]
  Segregated,
}

impl FitPolicy {
  /// Number of free lists this policy keeps.
  pub const fn class_count(self) -> usize {
    match self {
      FitPolicy::FirstFit | FitPolicy::NextFit => 1,
      FitPolicy::Segregated => CLASS_COUNT,
    }
  }
}

/// Heap settings, fixed once the heap is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  pub policy: FitPolicy,
  /// Minimum number of bytes requested from the extender on growth.
  pub chunk_size: usize,
  /// Bytes reserved by the default arena.
  pub capacity: usize,
  /// Run the consistency checker after every mutating call.
  pub check_every_op: bool,
}

impl HeapConfig {
  pub fn with_policy(
    mut self,
    policy: FitPolicy,
  ) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  pub fn with_capacity(
    mut self,
    capacity: usize,
  ) -> Self {
    self.capacity = capacity;
    self
  }

  pub fn with_checks(
    mut self,
    check_every_op: bool,
  ) -> Self {
    self.check_every_op = check_every_op;
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      policy: FitPolicy::default(),
      chunk_size: CHUNK_SIZE,
      capacity: DEFAULT_CAPACITY,
      check_every_op: false,
    }
  }
}
