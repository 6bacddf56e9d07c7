//! Lazy, bounded element sequences read out of a resolved term.

use crate::block_size::BlockSize;
use std::sync::Arc;

enum Source<V> {
    Nothing,
    One(Option<V>),
    Slice {
        elements: Arc<[V]>,
        next: usize,
    },
    Cycle {
        header: Arc<[V]>,
        cycle: Arc<[V]>,
        next: usize,
    },
}

/// Iterator over at most `limit` elements of a term.
///
/// Elements are cloned one at a time as they are pulled, so taking a prefix
/// never touches the rest of the term.
pub struct Elements<V> {
    source: Source<V>,
    remaining: usize,
}

impl<V> Elements<V> {
    pub(crate) fn nothing() -> Self {
        Self {
            source: Source::Nothing,
            remaining: 0,
        }
    }

    pub(crate) fn one(value: V, limit: BlockSize) -> Self {
        Self {
            source: Source::One(Some(value)),
            remaining: limit.limit().map_or(1, |n| n.min(1)),
        }
    }

    pub(crate) fn slice(elements: Arc<[V]>, limit: BlockSize) -> Self {
        let len = elements.len();
        Self {
            source: Source::Slice { elements, next: 0 },
            remaining: limit.limit().map_or(len, |n| n.min(len)),
        }
    }

    /// With [`BlockSize::All`] a cycle stops after the header plus one full
    /// pass of the cycle.
    pub(crate) fn cycle(header: Arc<[V]>, cycle: Arc<[V]>, limit: BlockSize) -> Self {
        let one_pass = header.len() + cycle.len();
        Self {
            source: Source::Cycle {
                header,
                cycle,
                next: 0,
            },
            remaining: limit.limit().unwrap_or(one_pass),
        }
    }
}

impl<V: Clone> Iterator for Elements<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        if self.remaining == 0 {
            return None;
        }
        let item = match &mut self.source {
            Source::Nothing => None,
            Source::One(value) => value.take(),
            Source::Slice { elements, next } => {
                let item = elements.get(*next).cloned();
                *next += 1;
                item
            }
            Source::Cycle {
                header,
                cycle,
                next,
            } => {
                let item = if *next < header.len() {
                    header.get(*next).cloned()
                } else if cycle.is_empty() {
                    None
                } else {
                    cycle.get((*next - header.len()) % cycle.len()).cloned()
                };
                *next += 1;
                item
            }
        };
        match item {
            Some(_) => self.remaining -= 1,
            None => self.remaining = 0,
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V: Clone> ExactSizeIterator for Elements<V> {}

impl<V: Clone> std::iter::FusedIterator for Elements<V> {}
