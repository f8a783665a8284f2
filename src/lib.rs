//! # chainalloc - A Linked-Chunk Memory Allocator Library
//!
//! This crate provides a general-purpose heap allocator that manages
//! OS-backed memory as a singly linked list of variable-size **chunks**,
//! with four interchangeable block-reuse strategies and two
//! interchangeable OS backends.
//!
//! ## Overview
//!
//! Every allocation is one chunk: a fixed header followed by the
//! caller's payload.
//!
//! ```text
//!   Single Chunk:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Chunk Header       │         User Payload           │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ used: true      │  │  │                          │  │
//!   │  │ record: index   │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  │   (power of two >= 8)    │  │
//!   │      24 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── pointer returned to the caller
//! ```
//!
//! Chunks are threaded into lists through a record table rather than
//! through raw in-header pointers; every chunk belongs to exactly one
//! list at any time:
//!
//! ```text
//!   Live list:  head ─▶ [A] ─▶ [B] ─▶ [E] ─▶ null   ◀─ tail
//!   Free list:  head ─▶ [C] ─▶ [D] ─▶ null          ◀─ tail
//!                       (free-list mode only)
//! ```
//!
//! On allocation the engine first asks the active search strategy for a
//! reusable chunk and only falls back to the OS on a miss:
//!
//! - **First-fit** - first free chunk in the live list that is big
//!   enough.
//! - **Next-fit** - same, but resumes where the last match was found.
//! - **Best-fit** - smallest sufficient chunk, via power-of-two size
//!   classes.
//! - **Free-list** - freed chunks move to their own list and only that
//!   list is searched.
//!
//! ## Crate Structure
//!
//! ```text
//!   chainalloc
//!   ├── align      - power-of-two size alignment
//!   ├── chunk      - header layout and payload <-> header arithmetic
//!   ├── region     - OS backends (program break / anonymous mapping)
//!   ├── engine     - the allocator engine and search strategies
//!   ├── adapter    - GlobalAlloc wrapper and typed container adapter
//!   └── error      - the AllocError taxonomy
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use chainalloc::{BackendMode, ChunkAllocator, SearchMode};
//!
//! let mut allocator =
//!   ChunkAllocator::new(SearchMode::FirstFit, BackendMode::MemoryMap).unwrap();
//!
//! let ptr = allocator.allocate(100).unwrap();
//! unsafe {
//!   ptr.as_ptr().write(42);
//!   assert_eq!(ptr.as_ptr().read(), 42);
//!   allocator.free(ptr.as_ptr());
//! }
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded engine**: [`ChunkAllocator`] has no internal
//!   locking; wrap it in [`LockedEngine`] to share it.
//! - **No coalescing or splitting**: a chunk keeps its size for the
//!   life of the process.
//! - **Memory is never returned to the OS** before process exit.
//! - **8-byte alignment only**: anything stricter is refused by the
//!   `GlobalAlloc` surface.
//! - **Unix-only**: requires `libc` (`sbrk`, `mmap`).
//! - **Undetected caller contract violations**: double frees, foreign
//!   pointers and use-after-free are undefined behavior.
//!
//! ## Logging
//!
//! The engine logs through the `log` crate, but only while the crate
//! wide switch is on (see [`enable_logging`]); the switch is off by
//! default so the crate can serve as `#[global_allocator]` without
//! re-entering itself through a logging formatter.

use std::sync::atomic::{AtomicBool, Ordering};

#[macro_use]
#[allow(unused_macros)]
pub(crate) mod alog;

pub mod adapter;
pub mod align;
pub mod chunk;
pub mod engine;
pub mod error;
pub mod region;

pub(crate) mod list;
pub(crate) mod table;

pub use adapter::{LockedEngine, TypedAllocator};
pub use align::align;
pub use chunk::{HEADER_SIZE, Header, get_header};
pub use engine::{ChunkAllocator, ChunkInfo, Config, SearchMode};
pub use error::AllocError;
pub use region::BackendMode;

pub(crate) static ALLOC_LOG: AtomicBool = AtomicBool::new(false);

/// Enables logging for the allocator.
pub fn enable_logging() {
  ALLOC_LOG.store(true, Ordering::Relaxed);
}

/// Disables logging for the allocator.
pub fn disable_logging() {
  ALLOC_LOG.store(false, Ordering::Relaxed);
}

pub(crate) fn should_log() -> bool {
  ALLOC_LOG.load(Ordering::Relaxed)
}

#[cfg(test)]
pub(crate) mod test_common {
  use std::sync::Mutex;

  /// Serializes tests that move the program break. The test harness
  /// runs threads in parallel, and two concurrent `sbrk` calls can
  /// hand both tests the same region.
  pub(crate) static PROGRAM_BREAK_LOCK: Mutex<()> = Mutex::new(());

  /// One logger for the whole unit-test binary; `RUST_LOG` controls
  /// what the gated macros actually emit.
  #[ctor::ctor]
  fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
    crate::enable_logging();
  }
}
