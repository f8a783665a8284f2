//! The chunk-record arena backing both lists.
//!
//! Records are addressed by index and never removed, so an index handed
//! out once stays valid for the life of the engine. The table's own
//! storage comes from the region acquirer, never from the Rust global
//! allocator, which keeps the engine usable behind
//! `#[global_allocator]` without re-entering itself.

use std::{
  mem,
  ops::{Deref, DerefMut},
  ptr,
};

use crate::chunk::Header;
use crate::error::AllocError;
use crate::region::{self, BackendMode};

/// One chunk's bookkeeping entry: where its header lives and which
/// record follows it in whichever list currently owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkRecord {
  pub header: *mut Header,
  pub next: Option<usize>,
}

/// Record capacity of a freshly built table.
pub(crate) const INITIAL_RECORDS: usize = 128;

/// Push-only growable table of [`ChunkRecord`]s with stable indices.
pub(crate) struct RecordTable {
  base: *mut ChunkRecord,
  len: usize,
  capacity: usize,
}

impl RecordTable {
  /// Builds a table for `capacity` records on a fresh OS region.
  pub fn with_capacity(
    backend: BackendMode,
    capacity: usize,
  ) -> Result<Self, AllocError> {
    let base = Self::acquire_storage(backend, capacity)?;

    Ok(Self {
      base,
      len: 0,
      capacity,
    })
  }

  /// Appends a record, growing the table if it is full. Returns the
  /// record's index, which stays valid forever.
  pub fn push(
    &mut self,
    backend: BackendMode,
    record: ChunkRecord,
  ) -> Result<usize, AllocError> {
    if self.len == self.capacity {
      self.grow(backend)?;
    }

    unsafe {
      self.base.add(self.len).write(record);
    }
    self.len += 1;

    Ok(self.len - 1)
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Moves the records onto a region twice the size. Indices are
  /// unaffected; the old region is abandoned until process exit, like
  /// every other region the engine acquires.
  fn grow(&mut self, backend: BackendMode) -> Result<(), AllocError> {
    let new_capacity = self.capacity * 2;
    let new_base = Self::acquire_storage(backend, new_capacity)?;

    unsafe {
      ptr::copy_nonoverlapping(self.base, new_base, self.len);
    }

    adebug!(
      "record table grown from {} to {} entries",
      self.capacity,
      new_capacity
    );

    self.base = new_base;
    self.capacity = new_capacity;
    Ok(())
  }

  fn acquire_storage(
    backend: BackendMode,
    capacity: usize,
  ) -> Result<*mut ChunkRecord, AllocError> {
    // Over-acquire by one alignment unit; the break pointer in
    // particular carries no alignment promise.
    let align = mem::align_of::<ChunkRecord>();
    let bytes = capacity * mem::size_of::<ChunkRecord>() + align;
    let raw = region::acquire(backend, bytes)?.as_ptr();

    Ok(unsafe { raw.add(raw.align_offset(align)) }.cast::<ChunkRecord>())
  }
}

impl Deref for RecordTable {
  type Target = [ChunkRecord];

  fn deref(&self) -> &Self::Target {
    unsafe { std::slice::from_raw_parts(self.base, self.len) }
  }
}

impl DerefMut for RecordTable {
  fn deref_mut(&mut self) -> &mut Self::Target {
    unsafe { std::slice::from_raw_parts_mut(self.base, self.len) }
  }
}
