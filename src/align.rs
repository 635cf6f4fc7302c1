/// Rounds the given size up to the allocator's double word (8 bytes).
///
/// Every block size and every payload address handed out by the heap is a
/// multiple of this value.
///
/// # Examples
///
/// ```rust
/// use segalloc::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::DSIZE - 1) & !($crate::DSIZE - 1)
  };
}
