//! # segalloc - A Boundary Tag Heap Allocator
//!
//! This crate provides a `malloc`-style allocator over a single contiguous
//! region that only ever grows. Free space is tracked with boundary tags and
//! explicit free lists threaded through the free blocks themselves.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              HEAP REGION                             │
//!   │                                                                      │
//!   │   ┌───────┬─────┬─────┬────────┬─────┬──────────────┬─────┬───┐      │
//!   │   │ heads │ pro │ A1  │  free  │ A2  │     free     │ A3  │ e │      │
//!   │   └───────┴─────┴─────┴────────┴─────┴──────────────┴─────┴───┘      │
//!   │       │                  ▲                 ▲                  ▲      │
//!   │       └──────────────────┴─────────────────┘                  │      │
//!   │        free list heads point at free blocks,             Epilogue    │
//!   │        free blocks point at each other                  (grows here) │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - align! macro (double word rounding)
//!   ├── block      - Boundary tag encoding and block arithmetic
//!   ├── link       - 32-bit compressed pointers
//!   ├── class      - Size classes for segregated fits
//!   ├── extend     - HeapExtender trait and the mmap backed Arena
//!   ├── config     - FitPolicy and HeapConfig
//!   ├── error      - HeapError and checker Violations
//!   ├── heap       - Heap: allocate, free, resize, zero_allocate
//!   ├── freelist   - Free list insertion and removal
//!   ├── coalesce   - Merging with free neighbors
//!   ├── place      - Allocation inside a free block, splitting
//!   ├── fit        - First fit, next fit and segregated search
//!   └── check      - Consistency checker and heap image
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::{FitPolicy, Heap, HeapConfig};
//!
//! let config = HeapConfig::default().with_policy(FitPolicy::Segregated);
//! let mut heap = Heap::with_config(config).unwrap();
//!
//! let ptr = heap.allocate(100);
//! assert!(!ptr.is_null());
//!
//! unsafe {
//!     ptr.write_bytes(0x2A, 100);
//!     heap.free(ptr);
//! }
//!
//! heap.check(false);
//! ```
//!
//! ## How It Works
//!
//! Every block starts with a header word holding its size and an allocation
//! bit, and ends with a footer holding the same word:
//!
//! ```text
//!   Allocated Block:                     Free Block:
//!   ┌─────────────────────┐              ┌─────────────────────┐
//!   │ header  size | 1    │              │ header  size | 0    │
//!   ├─────────────────────┤ ◀── pointer  ├─────────────────────┤
//!   │                     │   returned   │ prev free (u32)     │
//!   │     user data       │   to user    │ next free (u32)     │
//!   │                     │              │       unused        │
//!   ├─────────────────────┤              ├─────────────────────┤
//!   │ footer  size | 1    │              │ footer  size | 0    │
//!   └─────────────────────┘              └─────────────────────┘
//! ```
//!
//! Freeing a block reads the footer before it and the header after it, merges
//! with whichever neighbor is free and pushes the result onto a free list.
//! Links are offsets from the heap base, so a 16 byte block is enough to hold
//! both of them.
//!
//! ## Policies
//!
//! - **First fit**: one free list, first block large enough wins.
//! - **Next fit**: like first fit over the whole heap in address order, but
//!   each search resumes where the last one stopped.
//! - **Segregated**: 29 lists by size class; the search starts at the class of
//!   the request and climbs.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Never shrinks**: Memory is only returned when the heap is dropped
//! - **4 GiB**: Offsets are 32 bits wide
//!
//! ## Safety
//!
//! `free`, `resize` and `usable_size` take raw pointers and are `unsafe`:
//! handing them anything other than a live pointer from the same heap is
//! undefined behaviour. The checker catches most such mistakes after the
//! fact.

pub mod align;
mod block;
mod check;
mod class;
mod coalesce;
mod config;
mod error;
mod extend;
mod fit;
mod freelist;
mod heap;
mod link;
mod place;

pub use block::DSIZE;
pub use check::{BlockInfo, Blocks, HeapStats};
pub use config::{CHUNK_SIZE, DEFAULT_CAPACITY, FitPolicy, HeapConfig};
pub use error::{HeapError, Violation};
pub use extend::{Arena, HeapExtender};
pub use heap::Heap;
