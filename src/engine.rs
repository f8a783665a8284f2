use std::fmt::{self, Debug};
use std::ptr::NonNull;

use crate::align::align;
use crate::chunk::{Header, alloc_size, get_header, payload_of};
use crate::error::AllocError;
use crate::list::ListLinks;
use crate::region::{self, BackendMode};
use crate::table::{ChunkRecord, INITIAL_RECORDS, RecordTable};

/// Block-reuse strategy consulted before asking the OS for memory.
/// Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
  /// First chunk in the live list with `!used && size >= requested`.
  FirstFit,
  /// Same predicate, but the scan starts at the previous match and
  /// wraps once past the end of the live list.
  NextFit,
  /// Smallest sufficient chunk, found by probing power-of-two size
  /// classes from the requested size upward.
  BestFit,
  /// Freed chunks move to a dedicated list and only that list is
  /// scanned, trading list surgery for shorter scans.
  FreeList,
}

/// Engine configuration. A config with no search mode is rejected when
/// the engine is built, never at first allocation.
#[derive(Debug, Clone, Copy)]
pub struct Config {
  pub search_mode: Option<SearchMode>,
  pub backend_mode: BackendMode,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      search_mode: None,
      backend_mode: BackendMode::ProgramBreak,
    }
  }
}

/// One entry of a chunk dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
  /// Payload address handed to the caller.
  pub address: *const u8,
  /// Payload capacity in bytes.
  pub size: usize,
  pub used: bool,
}

/// The allocator engine: a record table plus the live-chunk list and,
/// in free-list mode, the free-chunk list.
///
/// One engine per allocation domain; it lives for the life of the
/// process and never returns memory to the OS. All state is mutable
/// with no internal locking, so concurrent use must be serialized by
/// the caller (see [`LockedEngine`](crate::LockedEngine)).
pub struct ChunkAllocator {
  records: RecordTable,
  live: ListLinks,
  free: ListLinks,
  /// Record index of the last next-fit match.
  cursor: Option<usize>,
  search_mode: SearchMode,
  backend_mode: BackendMode,
  allocation_balance: isize,
}

// The engine exclusively owns every region it acquires.
unsafe impl Send for ChunkAllocator {}

impl ChunkAllocator {
  /// Builds an engine with the given modes, acquiring the initial
  /// record table from the backend.
  pub fn new(
    search_mode: SearchMode,
    backend_mode: BackendMode,
  ) -> Result<Self, AllocError> {
    Ok(Self {
      records: RecordTable::with_capacity(backend_mode, INITIAL_RECORDS)?,
      live: ListLinks::new(),
      free: ListLinks::new(),
      cursor: None,
      search_mode,
      backend_mode,
      allocation_balance: 0,
    })
  }

  /// Builds an engine from a [`Config`], failing fast with
  /// [`AllocError::InvalidConfiguration`] if no search mode is set.
  pub fn from_config(config: Config) -> Result<Self, AllocError> {
    let Some(search_mode) = config.search_mode else {
      aerror!("rejecting configuration with no search mode");
      return Err(AllocError::InvalidConfiguration);
    };

    Self::new(search_mode, config.backend_mode)
  }

  pub fn search_mode(&self) -> SearchMode {
    self.search_mode
  }

  /// Switches the reuse strategy. Safe between allocations; chunks
  /// already parked on the free list stay there and are only found
  /// again under [`SearchMode::FreeList`]. The next-fit cursor is
  /// dropped, since it may point at a record the new mode's list no
  /// longer owns; next-fit restarts from the live head.
  pub fn set_search_mode(&mut self, mode: SearchMode) {
    if mode != self.search_mode {
      self.cursor = None;
    }
    self.search_mode = mode;
  }

  pub fn backend_mode(&self) -> BackendMode {
    self.backend_mode
  }

  pub fn set_backend_mode(&mut self, mode: BackendMode) {
    self.backend_mode = mode;
  }

  /// Allocations minus frees since the engine was built.
  pub fn allocation_balance(&self) -> isize {
    self.allocation_balance
  }

  /// Services a request for `size` bytes and returns the payload
  /// pointer. The request is rounded up to a power of two of at least
  /// 8 bytes; a reusable chunk is preferred, and only when the search
  /// misses is the OS asked for a fresh region.
  pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
    let aligned = align(size);

    if let Some(index) = self.find_chunk(aligned) {
      if self.search_mode == SearchMode::FreeList {
        self.free.unlink(&mut self.records, index);
        self.live.push_back(&mut self.records, index);
      }

      let header = self.records[index].header;
      unsafe {
        (*header).used = true;
      }
      self.allocation_balance += 1;

      atrace!(
        "reused chunk #{} ({} bytes) for a {} byte request",
        index,
        unsafe { (*header).size },
        size
      );
      return Ok(unsafe { NonNull::new_unchecked(payload_of(header)) });
    }

    // Search miss: a fresh chunk from the OS, appended to the live tail.
    let raw = region::acquire(self.backend_mode, alloc_size(aligned))?;
    let header = raw.as_ptr().cast::<Header>();
    let index = self.records.push(
      self.backend_mode,
      ChunkRecord {
        header,
        next: None,
      },
    )?;

    unsafe {
      header.write(Header {
        size: aligned,
        used: true,
        record: index,
      });
    }

    self.live.push_back(&mut self.records, index);
    if self.cursor.is_none() {
      self.cursor = Some(index);
    }
    self.allocation_balance += 1;

    adebug!(
      "fresh chunk #{} at {:p}, {} payload bytes",
      index,
      header,
      aligned
    );
    Ok(unsafe { NonNull::new_unchecked(payload_of(header)) })
  }

  /// Releases the chunk behind `payload` for reuse.
  ///
  /// Under first/next/best-fit the chunk stays in the live list with
  /// its used flag cleared; under free-list mode it is spliced out of
  /// the live list and appended to the free list.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by [`ChunkAllocator::allocate`]
  /// on this engine and not freed since. Double frees and foreign
  /// pointers are undefined behavior and are not detected.
  pub unsafe fn free(&mut self, payload: *mut u8) {
    let header = unsafe { get_header(payload) };
    let index = unsafe { (*header).record };

    if self.search_mode == SearchMode::FreeList {
      self.live.unlink(&mut self.records, index);
      // A record already on the free list must not be appended again:
      // the tail would link to itself and every later scan would loop.
      if !self.free.contains(&self.records, index) {
        self.free.push_back(&mut self.records, index);
      }
    }

    unsafe {
      (*header).used = false;
    }
    self.allocation_balance -= 1;

    atrace!("freed chunk #{} at {:p}", index, header);
  }

  fn find_chunk(&mut self, size: usize) -> Option<usize> {
    match self.search_mode {
      SearchMode::FirstFit => self.first_fit(size),
      SearchMode::NextFit => self.next_fit(size),
      SearchMode::BestFit => self.best_fit(size),
      SearchMode::FreeList => self.free_fit(size),
    }
  }

  /// Linear scan of the live list from its head.
  fn first_fit(&self, size: usize) -> Option<usize> {
    self.live.iter(&self.records).find(|&index| {
      let header = unsafe { &*self.records[index].header };
      !header.used && header.size >= size
    })
  }

  /// First-fit scan starting at the cursor, wrapping once past the
  /// tail; a match moves the cursor onto the matched chunk.
  fn next_fit(&mut self, size: usize) -> Option<usize> {
    let start = self.cursor.or(self.live.head)?;

    let mut current = Some(start);
    let mut wrapped = false;
    while let Some(index) = current {
      let header = unsafe { &*self.records[index].header };
      if !header.used && header.size >= size {
        self.cursor = Some(index);
        return Some(index);
      }

      current = self.records[index].next;
      if current.is_none() && !wrapped {
        current = self.live.head;
        wrapped = true;
      }
      if wrapped && current == Some(start) {
        break;
      }
    }

    None
  }

  /// Best fit over power-of-two size classes. One pass finds the
  /// largest chunk present; the probe then doubles from the requested
  /// class until it matches or passes that maximum. Exact class match
  /// is the smallest sufficient chunk because every size is a power of
  /// two.
  fn best_fit(&self, size: usize) -> Option<usize> {
    let max_size = self
      .live
      .iter(&self.records)
      .map(|index| unsafe { (*self.records[index].header).size })
      .max()
      .unwrap_or(0);

    if size > max_size {
      return None;
    }

    let mut class = size;
    loop {
      for index in self.live.iter(&self.records) {
        let header = unsafe { &*self.records[index].header };
        if !header.used && header.size == class {
          return Some(index);
        }
      }

      if class >= max_size {
        return None;
      }
      class *= 2;
    }
  }

  /// Scans only the free-chunk list; membership alone signals
  /// availability there.
  fn free_fit(&self, size: usize) -> Option<usize> {
    self
      .free
      .iter(&self.records)
      .find(|&index| unsafe { (*self.records[index].header).size } >= size)
  }

  /// All chunks in the live list, head to tail.
  pub fn live_chunks(&self) -> impl Iterator<Item = ChunkInfo> + '_ {
    self.chunks_in(self.live)
  }

  /// All chunks in the free list (empty outside free-list mode).
  pub fn free_chunks(&self) -> impl Iterator<Item = ChunkInfo> + '_ {
    self.chunks_in(self.free)
  }

  fn chunks_in(&self, list: ListLinks) -> impl Iterator<Item = ChunkInfo> + '_ {
    list.iter(&self.records).map(|index| {
      let record = &self.records[index];
      let header = unsafe { &*record.header };
      ChunkInfo {
        address: unsafe { payload_of(record.header) }.cast_const(),
        size: header.size,
        used: header.used,
      }
    })
  }

  /// Dumps every chunk in the live list to stdout.
  pub fn print_live_chunks(&self) {
    for info in self.live_chunks() {
      Self::print_chunk(&info);
    }
  }

  /// Dumps every chunk in the free list to stdout.
  pub fn print_free_chunks(&self) {
    for info in self.free_chunks() {
      Self::print_chunk(&info);
    }
  }

  fn print_chunk(info: &ChunkInfo) {
    println!("---------------------");
    println!("address: {:p}", info.address);
    println!("size:    {}", info.size);
    println!("used:    {}", info.used);
  }
}

impl Debug for ChunkAllocator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ChunkAllocator")
      .field("search_mode", &self.search_mode)
      .field("backend_mode", &self.backend_mode)
      .field("chunks", &self.records.len())
      .field("live", &self.live_chunks().count())
      .field("free", &self.free_chunks().count())
      .field("allocation_balance", &self.allocation_balance)
      .finish()
  }
}
