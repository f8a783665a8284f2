//! External allocation surfaces over the engine.
//!
//! [`LockedEngine`] is the serialization boundary the engine itself
//! does not provide: a `const`-constructible wrapper that can back a
//! `static`, route the runtime's default allocations through the engine
//! via [`GlobalAlloc`], or feed any number of [`TypedAllocator`]
//! handles.

use std::alloc::{GlobalAlloc, Layout};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::Mutex;

use crate::chunk::PAYLOAD_ALIGN;
use crate::engine::{ChunkAllocator, SearchMode};
use crate::error::AllocError;
use crate::region::BackendMode;

/// A mutex-guarded engine with a fixed configuration.
///
/// The engine is built lazily on first use, from backend memory only,
/// so a `static LockedEngine` works as `#[global_allocator]` without
/// ever recursing into itself.
///
/// ```rust,ignore
/// use chainalloc::{BackendMode, LockedEngine, SearchMode};
///
/// #[global_allocator]
/// static HEAP: LockedEngine =
///   LockedEngine::new(SearchMode::FreeList, BackendMode::MemoryMap);
/// ```
pub struct LockedEngine {
  search_mode: SearchMode,
  backend_mode: BackendMode,
  inner: Mutex<Option<ChunkAllocator>>,
}

impl LockedEngine {
  pub const fn new(
    search_mode: SearchMode,
    backend_mode: BackendMode,
  ) -> Self {
    Self {
      search_mode,
      backend_mode,
      inner: Mutex::new(None),
    }
  }

  /// Runs `f` with exclusive access to the engine, building it first if
  /// this is the first use.
  pub fn with_engine<R>(
    &self,
    f: impl FnOnce(&mut ChunkAllocator) -> R,
  ) -> Result<R, AllocError> {
    let mut guard = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };

    if guard.is_none() {
      *guard = Some(ChunkAllocator::new(self.search_mode, self.backend_mode)?);
    }

    // Populated just above when empty.
    let engine = guard.as_mut().expect("engine was just initialised");
    Ok(f(engine))
  }

  /// Allocates `size` bytes through the shared engine.
  pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
    self.with_engine(|engine| engine.allocate(size))?
  }

  /// Frees a payload previously returned by [`LockedEngine::allocate`].
  ///
  /// Before the first allocation there is no engine and nothing this
  /// pointer could have come from, so the call is a no-op rather than a
  /// reason to build one.
  ///
  /// # Safety
  ///
  /// Same contract as [`ChunkAllocator::free`].
  pub unsafe fn free(&self, payload: *mut u8) {
    let mut guard = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(engine) = guard.as_mut() {
      unsafe { engine.free(payload) };
    }
  }

  /// Whether the engine has been built yet. It is created lazily on
  /// the first allocation.
  pub fn is_initialized(&self) -> bool {
    let guard = match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    guard.is_some()
  }
}

unsafe impl GlobalAlloc for LockedEngine {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    // Payloads are only ever 8-aligned; anything stricter is out of
    // scope for this allocator.
    if layout.align() > PAYLOAD_ALIGN {
      return ptr::null_mut();
    }

    match self.allocate(layout.size()) {
      Ok(payload) => payload.as_ptr(),
      Err(_) => ptr::null_mut(),
    }
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    if ptr.is_null() {
      return;
    }
    unsafe { self.free(ptr) };
  }
}

// All engine access goes through the mutex.
unsafe impl Send for LockedEngine {}
unsafe impl Sync for LockedEngine {}

/// Typed allocation handle for container-style callers: `allocate(n)`
/// obtains room for `n` values of `T`, `deallocate` gives it back.
///
/// Handles are cheap to copy; two handles compare equal exactly when
/// they share the same underlying engine, which is what allocator-aware
/// containers need for copy/move/swap.
pub struct TypedAllocator<'a, T> {
  engine: &'a LockedEngine,
  _marker: PhantomData<T>,
}

impl<'a, T> TypedAllocator<'a, T> {
  pub fn new(engine: &'a LockedEngine) -> Self {
    Self {
      engine,
      _marker: PhantomData,
    }
  }

  /// Allocates room for `count` values of `T` and returns a pointer to
  /// the first.
  pub fn allocate(&self, count: usize) -> Result<NonNull<T>, AllocError> {
    let bytes = count
      .checked_mul(mem::size_of::<T>())
      .ok_or(AllocError::OutOfMemory)?;

    Ok(self.engine.allocate(bytes)?.cast::<T>())
  }

  /// Returns an allocation obtained from [`TypedAllocator::allocate`].
  /// The count is not consulted; the chunk header already knows its
  /// size.
  ///
  /// # Safety
  ///
  /// Same contract as [`ChunkAllocator::free`].
  pub unsafe fn deallocate(
    &self,
    ptr: NonNull<T>,
    _count: usize,
  ) {
    unsafe { self.engine.free(ptr.cast::<u8>().as_ptr()) };
  }
}

impl<T> Clone for TypedAllocator<'_, T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for TypedAllocator<'_, T> {}

impl<T, U> PartialEq<TypedAllocator<'_, U>> for TypedAllocator<'_, T> {
  fn eq(&self, other: &TypedAllocator<'_, U>) -> bool {
    ptr::eq(self.engine, other.engine)
  }
}

impl<T> Eq for TypedAllocator<'_, T> {}

impl<T> Debug for TypedAllocator<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypedAllocator")
      .field("engine", &ptr::from_ref(self.engine))
      .finish()
  }
}
