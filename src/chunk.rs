//! Greedy partitioning of ordered texts into batches under a character budget.

use std::iter::Enumerate;
use std::slice::Iter;

/// Splits `items` into contiguous groups of indices whose combined length
/// stays strictly below `max_chars`.
///
/// Items are visited in order while a running character count is kept. An item
/// joins the current group if the count including it is still below the
/// budget. Otherwise the current group is emitted and the item starts a new
/// one. An item that alone reaches the budget still gets a group of its own.
/// Every index lands in exactly one group and no group is empty.
///
/// Lengths are counted in characters, not bytes.
pub fn partition<S: AsRef<str>>(max_chars: usize, items: &[S]) -> Partition<'_, S> {
    Partition {
        max_chars,
        items: items.iter().enumerate(),
        running: 0,
        current: Vec::new(),
    }
}

/// Lazy iterator returned by [`partition`].
#[derive(Debug)]
pub struct Partition<'a, S> {
    max_chars: usize,
    items: Enumerate<Iter<'a, S>>,
    running: usize,
    current: Vec<usize>,
}

impl<S: AsRef<str>> Iterator for Partition<'_, S> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, item) in self.items.by_ref() {
            let len = item.as_ref().chars().count();
            self.running += len;

            if self.running < self.max_chars {
                self.current.push(index);
                continue;
            }

            let full = std::mem::replace(&mut self.current, vec![index]);
            self.running = len;
            if !full.is_empty() {
                return Some(full);
            }
        }

        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}
