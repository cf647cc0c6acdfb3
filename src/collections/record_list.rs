//! Singly linked FIFO used while reading input files.
//!
//! The number of rows in an input file is unknown until EOF, so ingestion
//! accumulates parsed records here and then drains them, in insertion order,
//! into a dense table.
//!
//! Invariants:
//! - `len` equals the number of live nodes
//! - `tail` is `Some` iff `len > 0`
//! - a node's `next` is `None` iff that node is the tail

use std::marker::PhantomData;
use std::ptr::NonNull;

/// Errors reported by [`RecordList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("record list is empty")]
    Empty,
}

struct Node<T> {
    value: T,
    next: Option<NonNull<Node<T>>>,
}

/// Ordered container with O(1) `append` at the tail and O(1) `pop_front`.
///
/// Allocation failure aborts the process (global allocator behaviour), so
/// `append` has no error path.
pub struct RecordList<T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    _owns: PhantomData<Box<Node<T>>>,
}

impl<T> RecordList<T> {
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            _owns: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value` after the current tail.
    pub fn append(&mut self, value: T) {
        let node = NonNull::from(Box::leak(Box::new(Node { value, next: None })));
        match self.tail {
            // SAFETY: `tail` points at a live node owned by this list; nodes are
            // only freed in `pop_front`, which clears `tail` with the last node.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
    }

    /// Remove the head record and hand ownership back to the caller.
    pub fn pop_front(&mut self) -> Result<T, ListError> {
        let head = self.head.ok_or(ListError::Empty)?;
        // SAFETY: `head` was produced by `Box::leak` in `append` and is unlinked
        // from the list below, so it is reclaimed exactly once.
        let node = unsafe { Box::from_raw(head.as_ptr()) };
        self.head = node.next;
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Ok(node.value)
    }

    pub fn peek_front(&self) -> Option<&T> {
        // SAFETY: the head node stays alive for as long as `&self` is borrowed.
        self.head.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Pop every record into `visitor`, head first.
    ///
    /// Leaves the list empty. Draining an empty list does nothing.
    pub fn drain_all<F>(&mut self, mut visitor: F)
    where
        F: FnMut(T),
    {
        while let Ok(value) = self.pop_front() {
            visitor(value);
        }
    }
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RecordList<T> {
    fn drop(&mut self) {
        // Iterative so long chains don't recurse through nested boxes.
        while self.pop_front().is_ok() {}
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RecordList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordList")
            .field("len", &self.len)
            .field("front", &self.peek_front())
            .finish()
    }
}

/// By-value iterator yielding records in insertion order.
pub struct IntoIter<T>(RecordList<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.pop_front().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len, Some(self.0.len))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for RecordList<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter(self)
    }
}

impl<T> Extend<T> for RecordList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }
}

impl<T> FromIterator<T> for RecordList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_pop_preserves_insertion_order() {
        let mut list = RecordList::new();
        for i in 0..10 {
            list.append(vec![i as f64, i as f64 * 2.0]);
            assert_eq!(list.len(), i + 1);
        }
        for i in 0..10 {
            let rec = list.pop_front().unwrap();
            assert_eq!(rec, vec![i as f64, i as f64 * 2.0]);
            assert_eq!(list.len(), 9 - i);
        }
        assert!(list.is_empty());
    }

    #[test]
    fn pop_front_on_empty_is_an_error() {
        let mut list: RecordList<u32> = RecordList::new();
        assert_eq!(list.pop_front(), Err(ListError::Empty));
    }

    #[test]
    fn interleaved_appends_and_pops_track_size() {
        let mut list = RecordList::new();
        list.append(1);
        list.append(2);
        assert_eq!(list.pop_front(), Ok(1));
        list.append(3);
        assert_eq!(list.len(), 2);
        assert_eq!(list.peek_front(), Some(&2));
        assert_eq!(list.pop_front(), Ok(2));
        assert_eq!(list.pop_front(), Ok(3));
        assert_eq!(list.len(), 0);

        // The tail must be reset once the list empties, otherwise this append
        // would link onto a freed node.
        list.append(4);
        assert_eq!(list.peek_front(), Some(&4));
        assert_eq!(list.pop_front(), Ok(4));
    }

    #[test]
    fn drain_all_visits_in_order_and_empties() {
        let mut list: RecordList<usize> = (0..5).collect();
        let mut seen = Vec::new();
        list.drain_all(|v| seen.push(v));
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(list.is_empty());
        assert!(list.peek_front().is_none());
    }

    #[test]
    fn drain_all_on_empty_is_a_no_op() {
        let mut list: RecordList<String> = RecordList::new();
        let mut calls = 0;
        list.drain_all(|_| calls += 1);
        assert_eq!(calls, 0);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn into_iter_yields_fifo() {
        let list: RecordList<&str> = ["a", "b", "c"].into_iter().collect();
        let iter = list.into_iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn dropping_a_long_list_does_not_overflow_the_stack() {
        let mut list = RecordList::new();
        for i in 0..200_000u32 {
            list.append(i);
        }
        drop(list);
    }

    #[test]
    fn every_record_is_dropped_exactly_once() {
        use std::rc::Rc;

        let token = Rc::new(());
        let mut list = RecordList::new();
        for _ in 0..6 {
            list.append(Rc::clone(&token));
        }
        let popped = list.pop_front().unwrap();
        list.append(Rc::clone(&token));
        assert_eq!(Rc::strong_count(&token), 1 + 6 + 1);

        drop(popped);
        let mut drained = 0;
        list.drain_all(|_| drained += 1);
        assert_eq!(drained, 6);
        assert_eq!(Rc::strong_count(&token), 1);

        for _ in 0..3 {
            list.append(Rc::clone(&token));
        }
        drop(list);
        assert_eq!(Rc::strong_count(&token), 1);
    }
}
