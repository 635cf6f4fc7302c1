use std::ptr::{self, NonNull};

use crate::{
  align,
  block::{self, DSIZE, MIN_BLOCK_SIZE, Tag, WSIZE},
  class,
  config::{FitPolicy, HeapConfig},
  error::HeapError,
  extend::{Arena, HeapExtender},
  link::Compressor,
};

/// Allocator context. Owns the heap region and every piece of allocator
/// state: bounds (through the extender), free list heads (stored in the heap
/// itself) and the next-fit cursor.
///
/// ```text
///   offset 0                        table
///   ┌──────────────────────────┬─────────┬──────────┬──────────┬─ ─ ─ ─┬──────────┐
///   │ free list heads (u32 ×N) │ padding │ prologue │ prologue │ blocks │ epilogue │
///   │ N = 1 or 29, 8-aligned   │    0    │ hdr 8|1  │ ftr 8|1  │  ...   │ hdr 0|1  │
///   └──────────────────────────┴─────────┴──────────┴──────────┴─ ─ ─ ─┴──────────┘
/// ```
pub struct Heap<E: HeapExtender = Arena> {
  pub(crate) extender: E,
  pub(crate) config: HeapConfig,
  /// Block pointer of the prologue.
  pub(crate) prologue: usize,
  /// Next-fit cursor. Always the block pointer of some block.
  pub(crate) rover: usize,
  /// Bytes formatted as heap. Only accepted extensions move it, so it can
  /// trail the extender's own size.
  pub(crate) size: usize,
}

impl Heap<Arena> {
  /// Creates a heap with the default configuration over a fresh [`Arena`].
  pub fn new() -> Result<Self, HeapError> {
    Self::with_config(HeapConfig::default())
  }

  pub fn with_config(config: HeapConfig) -> Result<Self, HeapError> {
    let arena = Arena::with_capacity(config.capacity)?;
    Self::init(arena, config)
  }
}

impl<E: HeapExtender> Heap<E> {
  /// Lays out the bucket table, prologue and epilogue on an empty extender and
  /// grows the heap by one chunk.
  #[track_caller]
  pub fn init(
    mut extender: E,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    if extender.size() != 0 {
      return Err(HeapError::NotEmpty { size: extender.size() });
    }

    let classes = config.policy.class_count();
    let table = align!(classes * WSIZE);
    let requested = table + 4 * WSIZE;

    extender.extend(requested).ok_or(HeapError::Exhausted { requested })?;

    let mut heap = Self {
      extender,
      config,
      prologue: table + DSIZE,
      rover: table + DSIZE,
      size: requested,
    };

    for class in 0..classes {
      heap.set_head(class, None);
    }

    heap.put(table, 0);
    heap.put(table + WSIZE, block::pack(DSIZE, true));
    heap.put(table + 2 * WSIZE, block::pack(DSIZE, true));
    heap.put(table + 3 * WSIZE, block::pack(0, true));

    let chunk = heap.config.chunk_size;
    if heap.extend_heap(chunk).is_none() {
      return Err(HeapError::Exhausted { requested: chunk });
    }

    log::debug!(
      "Heap::init({:?}): {} free list(s), {:#x} bytes",
      heap.config.policy,
      classes,
      heap.heap_size()
    );

    heap.after_op();

    Ok(heap)
  }

  /// Returns a pointer to at least `size` usable bytes aligned to 8, or null
  /// if `size` is 0 or the heap cannot grow.
  #[track_caller]
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let Some(asize) = block::adjusted_size(size) else {
      log::warn!("Heap::allocate({size}) -> null, request too large");
      return ptr::null_mut();
    };

    let bp = match self.find_fit(asize) {
      Some(bp) => bp,
      None => match self.extend_heap(asize.max(self.config.chunk_size)) {
        Some(bp) => bp,
        None => {
          log::warn!("Heap::allocate({size}) -> null, heap exhausted");
          return ptr::null_mut();
        }
      },
    };

    self.place(bp, asize);

    let address = self.address(bp);
    log::trace!("Heap::allocate({size}) -> {address:p}");

    self.after_op();

    address
  }

  /// Returns the block at `address` to the heap. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this heap.
  #[track_caller]
  pub unsafe fn free(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    let bp = self.block_of(address);
    let size = self.block_size(bp);

    self.write_tags(bp, Tag::free(size));
    let bp = self.coalesce(bp);
    self.insert(bp);

    log::trace!("Heap::free({address:p})");

    self.after_op();
  }

  /// Moves the contents of `address` to a block of `size` bytes. A null
  /// `address` allocates, a zero `size` frees and returns null. On failure
  /// null is returned and the original block is left untouched.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this heap.
  #[track_caller]
  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> *mut u8 {
    unsafe {
      if size == 0 {
        self.free(address);
        return ptr::null_mut();
      }

      if address.is_null() {
        return self.allocate(size);
      }

      let old_size = block::payload_size(self.block_size(self.block_of(address)));

      let new_address = self.allocate(size);
      if new_address.is_null() {
        log::warn!("Heap::resize({address:p}, {size}) -> null, original kept");
        return ptr::null_mut();
      }

      ptr::copy_nonoverlapping(address, new_address, old_size.min(size));
      self.free(address);

      log::trace!("Heap::resize({address:p}, {size}) -> {new_address:p}");

      new_address
    }
  }

  /// Allocates room for `count` elements of `size` bytes, zero filled.
  #[track_caller]
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    let Some(bytes) = count.checked_mul(size) else {
      log::warn!("Heap::zero_allocate({count}, {size}) -> null, size overflows");
      return ptr::null_mut();
    };

    let address = self.allocate(bytes);

    if !address.is_null() {
      unsafe { address.write_bytes(0, bytes) };
    }

    address
  }

  /// Bytes the caller may use at `address`, 0 for null.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    address: *const u8,
  ) -> usize {
    if address.is_null() {
      return 0;
    }

    block::payload_size(self.block_size(self.block_of(address)))
  }

  pub fn policy(&self) -> FitPolicy {
    self.config.policy
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  /// First byte of the heap.
  pub fn low(&self) -> NonNull<u8> {
    self.extender.low()
  }

  /// Last byte of the heap.
  pub fn high(&self) -> *mut u8 {
    self.low().as_ptr().wrapping_add(self.size).wrapping_sub(1)
  }

  pub fn heap_size(&self) -> usize {
    self.size
  }

  /// Grows the heap by at least `bytes`, formats the new space as one free
  /// block, merges it with a trailing free block and puts the result on its
  /// free list.
  pub(crate) fn extend_heap(
    &mut self,
    bytes: usize,
  ) -> Option<usize> {
    let size = align!(bytes.min(block::MAX_REQUEST)).max(MIN_BLOCK_SIZE);

    // The new block starts where the old epilogue sat.
    let bp = self.size;

    if bp.checked_add(size).is_none_or(|end| end > u32::MAX as usize) {
      log::warn!("Heap::extend_heap({bytes:#x}): heap would exceed 32-bit offsets");
      return None;
    }

    let expected = self.high().wrapping_add(1);
    let start = self.extender.extend(size)?;

    // Whatever the extender handed out stays unused; the heap keeps its old
    // end and epilogue.
    if start.as_ptr() != expected {
      log::error!(
        "Heap::extend_heap({bytes:#x}): extender returned {:p}, expected {expected:p}",
        start.as_ptr()
      );
      return None;
    }

    self.size = bp + size;
    self.write_tags(bp, Tag::free(size));
    self.put(block::header(block::next_block(bp, size)), block::pack(0, true));

    log::debug!("Heap::extend_heap({bytes:#x}): heap is now {:#x} bytes", self.heap_size());

    let bp = self.coalesce(bp);
    self.insert(bp);

    Some(bp)
  }

  #[track_caller]
  fn after_op(&self) {
    if self.config.check_every_op {
      self.check(false);
    }
  }

  pub(crate) fn classes(&self) -> usize {
    self.config.policy.class_count()
  }

  /// Free list a block of `size` bytes belongs to.
  pub(crate) fn class_for(
    &self,
    size: usize,
  ) -> usize {
    match self.classes() {
      1 => 0,
      _ => class::class_of(size),
    }
  }

  pub(crate) fn first_block(&self) -> usize {
    self.prologue + DSIZE
  }

  /// Offset of the epilogue header.
  pub(crate) fn epilogue(&self) -> usize {
    self.heap_size() - WSIZE
  }

  pub(crate) fn compressor(&self) -> Compressor {
    Compressor::new(self.extender.low(), self.size)
  }

  /// Native address of an offset inside the heap, null outside of it.
  pub(crate) fn address(
    &self,
    offset: usize,
  ) -> *mut u8 {
    u32::try_from(offset)
      .ok()
      .and_then(|offset| self.compressor().expand(offset))
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// Block pointer of a caller address. Panics when `address` cannot belong
  /// to an allocated block of this heap.
  #[track_caller]
  pub(crate) fn block_of(
    &self,
    address: *const u8,
  ) -> usize {
    let bp = self.compressor().compress(address).map(|bp| bp as usize);

    match bp {
      Some(bp) if bp >= self.first_block() && bp < self.epilogue() && bp % DSIZE == 0 => bp,
      _ => panic!("{address:p} does not point into a block of this heap"),
    }
  }

  #[inline]
  pub(crate) fn get(
    &self,
    offset: usize,
  ) -> u32 {
    debug_assert!(
      offset % WSIZE == 0 && offset + WSIZE <= self.size,
      "word at {offset:#x} outside heap of {:#x} bytes",
      self.size
    );

    unsafe { self.extender.low().as_ptr().add(offset).cast::<u32>().read() }
  }

  /// Bounds checked read for walking a heap that may be corrupt.
  #[inline]
  pub(crate) fn try_get(
    &self,
    offset: usize,
  ) -> Option<u32> {
    if offset % WSIZE != 0 || offset.checked_add(WSIZE)? > self.size {
      return None;
    }

    Some(self.get(offset))
  }

  #[inline]
  pub(crate) fn put(
    &mut self,
    offset: usize,
    word: u32,
  ) {
    debug_assert!(
      offset % WSIZE == 0 && offset + WSIZE <= self.size,
      "word at {offset:#x} outside heap of {:#x} bytes",
      self.size
    );

    unsafe { self.extender.low().as_ptr().add(offset).cast::<u32>().write(word) }
  }

  #[inline]
  pub(crate) fn tag(
    &self,
    bp: usize,
  ) -> Tag {
    Tag::unpack(self.get(block::header(bp)))
  }

  #[inline]
  pub(crate) fn block_size(
    &self,
    bp: usize,
  ) -> usize {
    self.tag(bp).size
  }

  /// Writes the same tag to the header and footer of the block at `bp`.
  #[inline]
  pub(crate) fn write_tags(
    &mut self,
    bp: usize,
    tag: Tag,
  ) {
    let word = tag.pack();
    self.put(block::header(bp), word);
    self.put(block::footer(bp, tag.size), word);
  }

  #[inline]
  pub(crate) fn next_block(
    &self,
    bp: usize,
  ) -> usize {
    block::next_block(bp, self.block_size(bp))
  }
}
