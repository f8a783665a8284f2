use std::ptr::{self, NonNull};

use libc::{c_void, intptr_t};

use crate::error::AllocError;

/// How raw memory is obtained from the operating system. Selected per
/// engine, not per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
  /// Extends the program break with `sbrk(2)`. Cheap, but cannot
  /// coexist with any other break-pointer consumer in the process.
  ProgramBreak,
  /// Maps an anonymous, private, read/write region with `mmap(2)`.
  /// Regions are not contiguous with each other and the engine never
  /// assumes adjacency.
  MemoryMap,
}

/// Obtains `total_size` raw bytes from the OS via the chosen backend.
///
/// The returned region is never handed back to the OS; it is released
/// only when the process exits.
pub fn acquire(
  mode: BackendMode,
  total_size: usize,
) -> Result<NonNull<u8>, AllocError> {
  match mode {
    BackendMode::ProgramBreak => {
      let address = unsafe { libc::sbrk(total_size as intptr_t) };

      if address == usize::MAX as *mut c_void {
        aerror!("sbrk refused to extend the break by {} bytes", total_size);
        return Err(AllocError::OutOfMemory);
      }

      atrace!("extended program break by {} bytes at {:p}", total_size, address);
      NonNull::new(address.cast::<u8>()).ok_or(AllocError::OutOfMemory)
    }
    BackendMode::MemoryMap => {
      let address = unsafe {
        libc::mmap(
          ptr::null_mut(),
          total_size,
          libc::PROT_READ | libc::PROT_WRITE,
          libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
          -1,
          0,
        )
      };

      if address == libc::MAP_FAILED {
        aerror!("mmap refused a {} byte anonymous mapping", total_size);
        return Err(AllocError::OutOfMemory);
      }

      atrace!("mapped {} bytes at {:p}", total_size, address);
      NonNull::new(address.cast::<u8>()).ok_or(AllocError::OutOfMemory)
    }
  }
}
