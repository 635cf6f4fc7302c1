use std::io::Read;

use segalloc::{FitPolicy, Heap, HeapConfig};

/// Waits for ENTER when the demo runs with `--step`, so the heap can be
/// inspected between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

/// Prints every block between prologue and epilogue.
fn print_heap(
  label: &str,
  heap: &Heap,
) {
  println!(
    "[{label}] {:?} heap {:p}..{:p}, {} bytes, grows by {}",
    heap.policy(),
    heap.low(),
    heap.high(),
    heap.heap_size(),
    heap.config().chunk_size
  );

  for block in heap.blocks() {
    println!(
      "    {:p}  {:>6} bytes  {}",
      block.address(heap),
      block.size,
      if block.allocated { "allocated" } else { "free" }
    );
  }
}

fn run(
  policy: FitPolicy,
  step: bool,
) {
  println!("\n==================== {policy:?} ====================");

  let config = HeapConfig::default().with_policy(policy).with_checks(true);
  let mut heap = match Heap::with_config(config) {
    Ok(heap) => heap,
    Err(err) => {
      eprintln!("cannot create heap: {err}");
      return;
    }
  };

  print_heap("init", &heap);
  pause(step);

  // 1) Two neighbouring blocks.
  let a = heap.allocate(100);
  let b = heap.allocate(200);
  println!("\n[1] allocate(100) = {a:p}, allocate(200) = {b:p}");
  print_heap("1", &heap);
  pause(step);

  // 2) Freeing `a` leaves a hole in front of `b`.
  unsafe { heap.free(a) };
  println!("\n[2] free({a:p})");
  print_heap("2", &heap);
  pause(step);

  // 3) A smaller request may reuse the hole, depending on the policy.
  let c = heap.allocate(90);
  println!("\n[3] allocate(90) = {c:p}, reused the hole: {}", c == a);
  print_heap("3", &heap);
  pause(step);

  // 4) Growing `c` moves it and keeps its contents.
  let c = unsafe {
    c.write_bytes(0x2A, 90);
    heap.resize(c, 5000)
  };
  println!("\n[4] resize to 5000 = {c:p}, first byte = {:#x}", unsafe { *c });
  print_heap("4", &heap);
  pause(step);

  // 5) Everything merges back into free space.
  unsafe {
    heap.free(b);
    heap.free(c);
  }
  println!("\n[5] freed everything");
  print_heap("5", &heap);

  heap.check(true);
  match heap.verify() {
    Ok(stats) => println!("[5] {stats:?}"),
    Err(violation) => println!("[5] {violation}"),
  }
}

fn main() {
  env_logger::init();

  let step = std::env::args().any(|arg| arg == "--step");

  for policy in [FitPolicy::FirstFit, FitPolicy::NextFit, FitPolicy::Segregated] {
    run(policy, step);
  }
}
