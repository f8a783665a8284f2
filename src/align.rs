/// Minimum payload capacity of a chunk, in bytes.
pub const MIN_CHUNK_SIZE: usize = 8;

/// Rounds `size` up to the smallest power of two that is at least
/// [`MIN_CHUNK_SIZE`].
///
/// Every chunk capacity in the engine comes out of this function, which
/// is what makes best-fit's exact power-of-two class matching work.
///
/// # Examples
///
/// ```rust
/// use chainalloc::align::align;
///
/// assert_eq!(align(1), 8);
/// assert_eq!(align(13), 16);
/// assert_eq!(align(1000), 1024);
/// ```
pub const fn align(size: usize) -> usize {
  if size <= MIN_CHUNK_SIZE {
    MIN_CHUNK_SIZE
  } else {
    size.next_power_of_two()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_is_power_of_two() {
    for size in 1..=4096 {
      let aligned = align(size);

      assert!(aligned.is_power_of_two());
      assert!(aligned >= MIN_CHUNK_SIZE);
      assert!(aligned >= size);
      assert!(aligned < 2 * size.max(MIN_CHUNK_SIZE));
    }
  }

  #[test]
  fn test_align_boundaries() {
    assert_eq!(align(0), 8);
    assert_eq!(align(8), 8);
    assert_eq!(align(9), 16);
    assert_eq!(align(1000), 1024);
    assert_eq!(align(1024), 1024);
    assert_eq!(align(1025), 2048);
  }
}
