//! Head/tail descriptors over the record table.
//!
//! Both the live-chunk list and the free-chunk list are singly linked
//! through the `next` index of each record. Splicing a chunk between
//! lists is index reassignment here; no header memory is touched.

use crate::table::RecordTable;

/// One singly linked list of chunk records.
///
/// Invariant: the tail's `next` is always `None`, and head/tail agree
/// with a traversal from the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListLinks {
  pub head: Option<usize>,
  pub tail: Option<usize>,
}

impl ListLinks {
  pub const fn new() -> Self {
    Self {
      head: None,
      tail: None,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Appends the record at `index` to the tail, initialising the list
  /// if it was empty.
  pub fn push_back(
    &mut self,
    records: &mut RecordTable,
    index: usize,
  ) {
    records[index].next = None;

    match self.tail {
      Some(tail) => records[tail].next = Some(index),
      None => self.head = Some(index),
    }

    self.tail = Some(index);
  }

  /// Splices the record at `index` out of the list, repairing the
  /// predecessor's link and the head/tail descriptors. Does nothing if
  /// the record is not a member.
  pub fn unlink(
    &mut self,
    records: &mut RecordTable,
    index: usize,
  ) {
    let next = records[index].next;

    if self.head == Some(index) {
      self.head = next;
      if next.is_none() {
        self.tail = None;
      }
      records[index].next = None;
      return;
    }

    let mut cursor = self.head;
    while let Some(current) = cursor {
      if records[current].next == Some(index) {
        records[current].next = next;
        if self.tail == Some(index) {
          self.tail = Some(current);
        }
        records[index].next = None;
        return;
      }
      cursor = records[current].next;
    }
  }

  /// Whether the record at `index` is currently a member of this list.
  pub fn contains(
    &self,
    records: &RecordTable,
    index: usize,
  ) -> bool {
    self.iter(records).any(|member| member == index)
  }

  /// Head-to-tail traversal yielding record indices.
  pub fn iter<'a>(&self, records: &'a RecordTable) -> ListIter<'a> {
    ListIter {
      records,
      current: self.head,
    }
  }
}

pub(crate) struct ListIter<'a> {
  records: &'a RecordTable,
  current: Option<usize>,
}

impl Iterator for ListIter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let index = self.current?;
    self.current = self.records[index].next;
    Some(index)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::region::BackendMode;
  use crate::table::ChunkRecord;

  fn table_with(count: usize) -> RecordTable {
    let mut table = RecordTable::with_capacity(BackendMode::MemoryMap, count).unwrap();
    for i in 0..count {
      // List surgery never dereferences the header pointer, so any
      // distinct address works here.
      table
        .push(
          BackendMode::MemoryMap,
          ChunkRecord {
            header: (0x1000 + i * 0x100) as *mut _,
            next: None,
          },
        )
        .unwrap();
    }
    table
  }

  fn collect(list: &ListLinks, records: &RecordTable) -> Vec<usize> {
    list.iter(records).collect()
  }

  #[test]
  fn test_push_back_links_in_order() {
    let mut records = table_with(3);
    let mut list = ListLinks::new();

    assert!(list.is_empty());

    for i in 0..3 {
      list.push_back(&mut records, i);
    }

    assert_eq!(collect(&list, &records), vec![0, 1, 2]);
    assert_eq!(list.head, Some(0));
    assert_eq!(list.tail, Some(2));
    assert_eq!(records[2].next, None);
  }

  #[test]
  fn test_unlink_head() {
    let mut records = table_with(3);
    let mut list = ListLinks::new();
    for i in 0..3 {
      list.push_back(&mut records, i);
    }

    list.unlink(&mut records, 0);

    assert_eq!(collect(&list, &records), vec![1, 2]);
    assert_eq!(list.head, Some(1));
    assert_eq!(list.tail, Some(2));
  }

  #[test]
  fn test_unlink_middle() {
    let mut records = table_with(3);
    let mut list = ListLinks::new();
    for i in 0..3 {
      list.push_back(&mut records, i);
    }

    list.unlink(&mut records, 1);

    assert_eq!(collect(&list, &records), vec![0, 2]);
    assert_eq!(list.tail, Some(2));
  }

  #[test]
  fn test_unlink_tail() {
    let mut records = table_with(3);
    let mut list = ListLinks::new();
    for i in 0..3 {
      list.push_back(&mut records, i);
    }

    list.unlink(&mut records, 2);

    assert_eq!(collect(&list, &records), vec![0, 1]);
    assert_eq!(list.tail, Some(1));
    assert_eq!(records[1].next, None);
  }

  #[test]
  fn test_contains_tracks_membership() {
    let mut records = table_with(2);
    let mut list = ListLinks::new();
    list.push_back(&mut records, 0);

    assert!(list.contains(&records, 0));
    assert!(!list.contains(&records, 1));

    list.unlink(&mut records, 0);
    assert!(!list.contains(&records, 0));
  }

  #[test]
  fn test_unlink_sole_element_empties_list() {
    let mut records = table_with(1);
    let mut list = ListLinks::new();
    list.push_back(&mut records, 0);

    list.unlink(&mut records, 0);

    assert!(list.is_empty());
    assert_eq!(list.tail, None);
  }

  #[test]
  fn test_splice_between_lists() {
    let mut records = table_with(4);
    let mut live = ListLinks::new();
    let mut free = ListLinks::new();
    for i in 0..4 {
      live.push_back(&mut records, i);
    }

    // Move 1 and 3 across, the way free() does in free-list mode.
    for index in [1, 3] {
      live.unlink(&mut records, index);
      free.push_back(&mut records, index);
    }

    assert_eq!(collect(&live, &records), vec![0, 2]);
    assert_eq!(collect(&free, &records), vec![1, 3]);

    // And one back again, the way a free-list hit does.
    free.unlink(&mut records, 1);
    live.push_back(&mut records, 1);

    assert_eq!(collect(&live, &records), vec![0, 2, 1]);
    assert_eq!(collect(&free, &records), vec![3]);
    assert_eq!(live.tail, Some(1));
  }
}
