use proptest::prelude::*;
use segalloc::{Arena, DSIZE, FitPolicy, Heap, HeapConfig, HeapError};

const POLICIES: [FitPolicy; 3] = [FitPolicy::FirstFit, FitPolicy::NextFit, FitPolicy::Segregated];

fn heap(policy: FitPolicy) -> Heap {
  let _ = env_logger::try_init();
  Heap::with_config(HeapConfig::default().with_policy(policy).with_checks(true)).unwrap()
}

fn overlaps(
  a: *mut u8,
  a_len: usize,
  b: *mut u8,
  b_len: usize,
) -> bool {
  let (a, b) = (a as usize, b as usize);
  a < b + b_len && b < a + a_len
}

#[test]
fn allocations_are_aligned_and_large_enough() {
  for policy in POLICIES {
    let mut heap = heap(policy);

    for size in [1, 7, 8, 9, 15, 16, 17, 100, 255, 1000, 4096, 5000] {
      let ptr = heap.allocate(size);
      assert!(!ptr.is_null(), "{policy:?}: allocate({size}) failed");
      assert_eq!(ptr as usize % DSIZE, 0);
      assert!(unsafe { heap.usable_size(ptr) } >= size);

      unsafe { ptr.write_bytes(0xA5, size) };
    }
  }
}

#[test]
fn live_allocations_do_not_overlap() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let mut live: Vec<(*mut u8, usize)> = Vec::new();

    for i in 0..64 {
      let size = 8 + (i * 37) % 300;
      let ptr = heap.allocate(size);

      for &(other, other_size) in &live {
        assert!(!overlaps(ptr, size, other, other_size));
      }
      live.push((ptr, size));

      if i % 3 == 0 {
        let (ptr, _) = live.remove(live.len() / 2);
        unsafe { heap.free(ptr) };
      }
    }
  }
}

#[test]
fn free_null_is_a_no_op() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let before = heap.verify().unwrap();

    unsafe { heap.free(std::ptr::null_mut()) };

    assert_eq!(heap.verify().unwrap(), before);
  }
}

#[test]
fn allocate_zero_is_a_no_op() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let before = heap.verify().unwrap();

    assert!(heap.allocate(0).is_null());
    assert_eq!(heap.verify().unwrap(), before);
  }
}

#[test]
fn freed_space_is_reused_before_growing() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let size = heap.heap_size();

    let ptr = heap.allocate(200);
    unsafe { heap.free(ptr) };
    let again = heap.allocate(200);

    assert!(overlaps(ptr, 200, again, 200), "{policy:?}");
    assert_eq!(heap.heap_size(), size);
  }
}

#[test]
fn resize_to_zero_frees() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let fresh = heap.verify().unwrap();

    let ptr = heap.allocate(64);
    let resized = unsafe { heap.resize(ptr, 0) };

    assert!(resized.is_null());
    assert_eq!(heap.verify().unwrap(), fresh);
  }
}

#[test]
fn resize_null_allocates() {
  for policy in POLICIES {
    let mut heap = heap(policy);

    let ptr = unsafe { heap.resize(std::ptr::null_mut(), 48) };

    assert!(!ptr.is_null());
    assert!(unsafe { heap.usable_size(ptr) } >= 48);
    assert_eq!(heap.verify().unwrap().blocks, 2);
  }
}

#[test]
fn resize_keeps_contents() {
  for policy in POLICIES {
    let mut heap = heap(policy);

    unsafe {
      let ptr = heap.allocate(32);
      for i in 0..32 {
        ptr.add(i).write(i as u8);
      }

      let grown = heap.resize(ptr, 300);
      assert!((0..32).all(|i| *grown.add(i) == i as u8));

      let shrunk = heap.resize(grown, 10);
      assert!((0..10).all(|i| *shrunk.add(i) == i as u8));

      heap.free(shrunk);
    }

    assert_eq!(heap.verify().unwrap().free_blocks, 1);
  }
}

#[test]
fn failed_resize_keeps_original() {
  let config = HeapConfig::default().with_capacity(64 * 1024).with_checks(true);
  let mut heap = Heap::with_config(config).unwrap();

  unsafe {
    let ptr = heap.allocate(100);
    ptr.write_bytes(0x77, 100);
    let before = heap.verify().unwrap();

    assert!(heap.resize(ptr, 1 << 20).is_null());

    assert_eq!(heap.verify().unwrap(), before);
    assert!((0..100).all(|i| *ptr.add(i) == 0x77));
    heap.free(ptr);
  }
}

#[test]
fn exhaustion_leaves_heap_unchanged() {
  for policy in POLICIES {
    let config = HeapConfig::default()
      .with_policy(policy)
      .with_capacity(16 * 1024)
      .with_checks(true);
    let mut heap = Heap::with_config(config).unwrap();

    let mut live = Vec::new();
    loop {
      let before = heap.verify().unwrap();
      let ptr = heap.allocate(1000);
      if ptr.is_null() {
        assert_eq!(heap.verify().unwrap(), before);
        break;
      }
      live.push(ptr);
    }

    assert!(live.len() >= 10);
    assert!(heap.zero_allocate(100, 100).is_null());

    for ptr in live {
      unsafe { heap.free(ptr) };
    }
    assert_eq!(heap.verify().unwrap().free_blocks, 1);
  }
}

#[test]
fn adjacent_frees_merge_into_one_block() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let a = heap.allocate(40);
    let b = heap.allocate(72);
    let _guard = heap.allocate(8);

    unsafe {
      heap.free(a);
      heap.free(b);
    }

    let stats = heap.verify().unwrap();
    assert_eq!(stats.free_blocks, 2);
    let merged = heap.blocks().find(|b| !b.allocated).unwrap();
    assert_eq!(merged.address(&heap), a);
    assert_eq!(merged.size, 48 + 80);
  }
}

#[test]
fn walkthrough_scenario() {
  for policy in POLICIES {
    let mut heap = heap(policy);
    let size = heap.heap_size();

    let a = heap.allocate(100);
    let b = heap.allocate(200);
    assert!(!overlaps(a, 100, b, 200));

    unsafe { heap.free(a) };
    let c = heap.allocate(90);
    assert_eq!(heap.heap_size(), size);

    // Next fit resumes past `b` and takes the tail instead.
    match policy {
      FitPolicy::NextFit => assert!(c > b),
      _ => assert_eq!(c, a, "{policy:?}"),
    }

    unsafe {
      heap.free(b);
      heap.free(c);
    }

    // Everything merged back into the initial chunk.
    let stats = heap.verify().unwrap();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes, 4096);
  }
}

#[test]
fn large_segregated_blocks_are_found() {
  let mut heap = heap(FitPolicy::Segregated);
  let sizes = [152, 1000, 5000, 70_000, 8];
  let ptrs: Vec<*mut u8> = sizes.iter().map(|&n| heap.allocate(n)).collect();
  let _guard = heap.allocate(8);

  for &ptr in &ptrs {
    unsafe { heap.free(ptr) };
  }

  for &size in sizes.iter().rev() {
    let ptr = heap.allocate(size);
    assert!(!ptr.is_null());
    assert!(unsafe { heap.usable_size(ptr) } >= size);
  }
}

#[test]
fn works_over_a_custom_extender() {
  let arena = Arena::with_capacity(1 << 16).unwrap();
  let config = HeapConfig::default().with_policy(FitPolicy::NextFit).with_chunk_size(256);
  let mut heap = Heap::init(arena, config).unwrap();
  assert_eq!(heap.policy(), FitPolicy::NextFit);
  assert_eq!(heap.config().chunk_size, 256);

  let ptrs: Vec<*mut u8> = (1..50).map(|n| heap.zero_allocate(n, 4)).collect();
  assert!(ptrs.iter().all(|ptr| !ptr.is_null()));
  heap.check(true);

  for ptr in ptrs {
    unsafe { heap.free(ptr) };
  }
  assert_eq!(heap.verify().unwrap().free_blocks, 1);
}

#[test]
fn init_reports_exhaustion() {
  let config = HeapConfig::default().with_capacity(1024);

  assert_eq!(Heap::with_config(config).err(), Some(HeapError::Exhausted { requested: 4096 }));
  assert!(matches!(
    Heap::with_config(HeapConfig::default().with_capacity(0)),
    Err(HeapError::Reserve { .. })
  ));
}

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Free(usize),
  Resize(usize, usize),
  ZeroAllocate(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (1usize..2048).prop_map(Op::Allocate),
    3 => any::<usize>().prop_map(Op::Free),
    2 => (any::<usize>(), 0usize..4096).prop_map(|(i, n)| Op::Resize(i, n)),
    1 => (0usize..64, 0usize..64).prop_map(|(c, n)| Op::ZeroAllocate(c, n)),
  ]
}

fn policy() -> impl Strategy<Value = FitPolicy> {
  prop_oneof![Just(FitPolicy::FirstFit), Just(FitPolicy::NextFit), Just(FitPolicy::Segregated)]
}

proptest! {
  /// Any sequence of calls leaves a consistent heap, live blocks keep their
  /// contents, and once everything is freed the heap coalesces back into a
  /// single free block.
  #[test]
  #[cfg_attr(miri, ignore)]
  fn random_operations_keep_heap_consistent(
    policy in policy(),
    ops in prop::collection::vec(op(), 1..200),
  ) {
    let _ = env_logger::try_init();
    let mut heap = Heap::with_config(HeapConfig::default().with_policy(policy)).unwrap();

    // Live blocks with the byte they were filled with.
    let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

    for (step, op) in ops.into_iter().enumerate() {
      let fill = step as u8;

      match op {
        Op::Allocate(size) => {
          let ptr = heap.allocate(size);
          prop_assert!(!ptr.is_null());
          unsafe { ptr.write_bytes(fill, size) };
          live.push((ptr, size, fill));
        }
        Op::Free(index) => {
          if !live.is_empty() {
            let (ptr, size, fill) = live.swap_remove(index % live.len());
            prop_assert!((0..size).all(|i| unsafe { *ptr.add(i) } == fill), "freed block contents preserved");
            unsafe { heap.free(ptr) };
          }
        }
        Op::Resize(index, size) => {
          if !live.is_empty() {
            let (ptr, old_size, old_fill) = live.swap_remove(index % live.len());
            let new = unsafe { heap.resize(ptr, size) };

            if size == 0 {
              prop_assert!(new.is_null());
            } else {
              prop_assert!(!new.is_null());
              let kept = old_size.min(size);
              prop_assert!((0..kept).all(|i| unsafe { *new.add(i) } == old_fill), "resized block contents preserved");
              unsafe { new.write_bytes(fill, size) };
              live.push((new, size, fill));
            }
          }
        }
        Op::ZeroAllocate(count, size) => {
          let ptr = heap.zero_allocate(count, size);
          if count * size == 0 {
            prop_assert!(ptr.is_null());
          } else {
            prop_assert!((0..count * size).all(|i| unsafe { *ptr.add(i) } == 0), "zero_allocate returns zeroed memory");
            unsafe { ptr.write_bytes(fill, count * size) };
            live.push((ptr, count * size, fill));
          }
        }
      }

      prop_assert_eq!(heap.verify().map(|_| ()), Ok(()));
    }

    for (ptr, _, _) in live {
      unsafe { heap.free(ptr) };
    }

    let stats = heap.verify().unwrap();
    prop_assert_eq!(stats.free_blocks, 1);
    prop_assert_eq!(stats.blocks, 1);
  }
}
