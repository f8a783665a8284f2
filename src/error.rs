use thiserror::Error;

/// Errors surfaced by the allocator engine.
///
/// Caller contract violations (double free, freeing a foreign pointer,
/// use after free) are undefined behavior and are not detected, so they
/// have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The operating system refused to provide more memory. Never retried
  /// internally; surfaced to the immediate caller of `allocate`.
  #[error("the operating system could not provide the requested region")]
  OutOfMemory,

  /// The engine was built from a [`Config`](crate::Config) with no
  /// search mode selected.
  #[error("no search mode was selected")]
  InvalidConfiguration,
}
