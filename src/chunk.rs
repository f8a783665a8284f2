use std::mem;

/// Per-chunk metadata, written into the bytes immediately preceding the
/// payload of every allocation.
///
/// ```text
///   ┌────────────────────────────┬────────────────────────────┐
///   │          Header            │          Payload           │
///   │  size | used | record idx  │   `size` bytes, caller's   │
///   └────────────────────────────┴────────────────────────────┘
///                                ▲
///                                └── pointer returned to the caller
/// ```
///
/// The forward link lives in the engine's record table rather than in
/// the header itself; `record` is the index of this chunk's entry there,
/// so `free` recovers the list position without scanning either list.
#[derive(Debug)]
#[repr(C)]
pub struct Header {
  /// Usable payload capacity in bytes. Always a power of two >= 8, set
  /// once at creation and never changed (no splitting or coalescing).
  pub size: usize,
  /// True while the payload is live from the caller's point of view.
  pub used: bool,
  /// Index of this chunk's record in the engine's record table.
  pub record: usize,
}

/// Byte overhead of one chunk header.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Alignment every payload pointer is guaranteed to have. Anything
/// stricter is out of scope for this allocator.
pub const PAYLOAD_ALIGN: usize = mem::align_of::<Header>();

/// Total region size needed for a chunk with `aligned` payload bytes.
pub const fn alloc_size(aligned: usize) -> usize {
  aligned + HEADER_SIZE
}

/// Returns the payload address of `header`.
///
/// Exact inverse of [`get_header`]; the two are kept side by side so the
/// offset cannot drift.
///
/// # Safety
///
/// `header` must point at a header at the start of a region of at least
/// [`alloc_size`] bytes.
pub unsafe fn payload_of(header: *mut Header) -> *mut u8 {
  unsafe { header.cast::<u8>().add(HEADER_SIZE) }
}

/// Recovers the chunk header from a payload pointer previously returned
/// by the engine. Pure address arithmetic, no side effects.
///
/// # Safety
///
/// `payload` must have been returned by `ChunkAllocator::allocate` and
/// not freed since.
pub unsafe fn get_header(payload: *mut u8) -> *mut Header {
  unsafe { payload.sub(HEADER_SIZE) }.cast::<Header>()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_roundtrip() {
    // Carve a chunk out of a plain buffer; the arithmetic must not care
    // where the region came from.
    let mut buffer = [0u64; 8];
    let header = buffer.as_mut_ptr().cast::<Header>();

    unsafe {
      header.write(Header {
        size: 32,
        used: true,
        record: 0,
      });

      let payload = payload_of(header);
      assert_eq!(payload, header.cast::<u8>().add(HEADER_SIZE));
      assert_eq!(get_header(payload), header);
      assert_eq!((*get_header(payload)).size, 32);
    }
  }

  #[test]
  fn test_alloc_size_includes_header() {
    assert_eq!(alloc_size(8), 8 + HEADER_SIZE);
    assert_eq!(alloc_size(1024), 1024 + HEADER_SIZE);
  }

  #[test]
  fn test_payload_keeps_minimum_alignment() {
    // The header is a multiple of 8 bytes long, so an 8-aligned region
    // start yields an 8-aligned payload.
    assert_eq!(HEADER_SIZE % PAYLOAD_ALIGN, 0);
  }
}
