use thiserror::Error;

/// Failures while setting a heap up. Once a heap exists, running out of
/// memory is reported with null pointers instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeapError {
  #[error("failed to reserve {capacity} bytes for the heap")]
  Reserve { capacity: usize },

  #[error("heap capacity {capacity} cannot be addressed with 32-bit offsets")]
  TooLarge { capacity: usize },

  #[error("heap extension by {requested} bytes failed")]
  Exhausted { requested: usize },

  #[error("heap extender already holds {size} bytes")]
  NotEmpty { size: usize },
}

/// Broken heap invariant found by the consistency checker. Offsets are block
/// pointers relative to the heap base.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
  #[error("prologue at {offset:#x} is outside the heap")]
  PrologueOutOfBounds { offset: usize },

  #[error("alignment padding is {found:#x}, expected 0")]
  Padding { found: u32 },

  #[error("prologue tags are {header:#x}/{footer:#x}, expected an allocated 8 byte block")]
  Prologue { header: u32, footer: u32 },

  #[error("epilogue tag is {found:#x}, expected an allocated 0 byte block")]
  Epilogue { found: u32 },

  #[error("block at {offset:#x} is not double word aligned")]
  Misaligned { offset: usize },

  #[error("block at {offset:#x} with size {size} runs outside the heap")]
  OutOfBounds { offset: usize, size: usize },

  #[error("block at {offset:#x} has size {size}, below the minimum block size")]
  Undersized { offset: usize, size: usize },

  #[error("block at {offset:#x} has header {header:#x} but footer {footer:#x}")]
  TagMismatch { offset: usize, header: u32, footer: u32 },

  #[error("free blocks at {first:#x} and {second:#x} are adjacent")]
  Uncoalesced { first: usize, second: usize },

  #[error("next-fit cursor at {offset:#x} is not on a block boundary")]
  Rover { offset: usize },

  #[error("class {class} list links {offset:#x}, which is not a block in the heap")]
  ListOutOfBounds { class: usize, offset: usize },

  #[error("class {class} list holds allocated block {offset:#x}")]
  ListAllocated { class: usize, offset: usize },

  #[error("block {offset:#x} of size {size} is listed in class {class}, expected {expected}")]
  WrongClass {
    offset: usize,
    size: usize,
    class: usize,
    expected: usize,
  },

  #[error("class {class} list head {offset:#x} has a previous link")]
  HeadHasPrev { class: usize, offset: usize },

  #[error("block {offset:#x} links back to {found:#x}, expected {expected:#x}")]
  BrokenLink {
    offset: usize,
    found: usize,
    expected: usize,
  },

  /// Bound on the list walk. A loop revisits some block from a predecessor
  /// its back link does not name, so it is reported as
  /// [`Violation::BrokenLink`] or [`Violation::HeadHasPrev`] first.
  #[error("class {class} list does not terminate")]
  Cycle { class: usize },

  #[error("heap walk found {walked} free blocks, free lists hold {listed}")]
  FreeCount { walked: usize, listed: usize },
}
