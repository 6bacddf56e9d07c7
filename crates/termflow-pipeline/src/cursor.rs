//! Per-apply evaluation cursor.
//!
//! Operations hold no per-call state: every `apply` builds its own cursor
//! over the resolved input. The cursor lends elements by reference, so an
//! element is only ever cloned when an operation decides to keep it.
//!
//! Over a cyclical input the cursor never runs out on its own. It stops once
//! a whole pass of the cycle has been read without the operation producing
//! anything, since every further pass would be identical.

use termflow_term::{BlockSize, Cyclical, Idempotent, Term};

enum Source<'a, V> {
    Nothing,
    One(&'a V),
    Slice(&'a [V]),
    Cycle(&'a Cyclical<V>),
}

impl<V> Clone for Source<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Source<'_, V> {}

pub struct EvaluationCursor<'a, V> {
    source: Source<'a, V>,
    position: usize,
    /// Position just after the last element that produced output.
    productive_until: usize,
}

impl<'a, V> EvaluationCursor<'a, V> {
    pub fn new(input: &'a Idempotent<V>) -> Self {
        let source = match input.as_term() {
            Term::Single(value) => Source::One(value),
            Term::Many(many) => Source::Slice(many.as_slice()),
            Term::Cyclical(cyclical) => Source::Cycle(cyclical),
            Term::Empty | Term::Error(_) | Term::Pending(_) => Source::Nothing,
        };
        Self {
            source,
            position: 0,
            productive_until: 0,
        }
    }

    /// Number of input elements read so far.
    pub fn reads(&self) -> usize {
        self.position
    }

    pub fn is_cyclical(&self) -> bool {
        matches!(self.source, Source::Cycle(_))
    }

    /// Record that the most recently read element produced output.
    pub fn produced(&mut self) {
        self.productive_until = self.position;
    }

    /// True once a full cycle past the header has gone by without output.
    pub fn is_stalled(&self) -> bool {
        let Source::Cycle(cyclical) = &self.source else {
            return false;
        };
        let since = self.productive_until.max(cyclical.header().len());
        self.position >= since + cyclical.cycle().len()
    }

    /// Read until `limit` outputs have been produced or the input is
    /// exhausted. `step` maps one element to at most one output.
    pub fn evaluate<U>(
        &mut self,
        limit: BlockSize,
        mut step: impl FnMut(&'a V) -> Option<U>,
    ) -> Vec<U> {
        let mut produced = Vec::new();
        while !limit.is_satisfied_by(produced.len()) {
            let Some(element) = self.next() else {
                break;
            };
            if let Some(output) = step(element) {
                produced.push(output);
                self.produced();
            }
        }
        tracing::trace!(
            reads = self.position,
            produced = produced.len(),
            stalled = self.is_stalled(),
            "cursor pass finished"
        );
        produced
    }
}

impl<'a, V> Iterator for EvaluationCursor<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        let element = match self.source {
            Source::Nothing => None,
            Source::One(value) => (self.position == 0).then_some(value),
            Source::Slice(elements) => elements.get(self.position),
            Source::Cycle(cyclical) => {
                if self.is_stalled() {
                    None
                } else {
                    Some(cyclical.get(self.position))
                }
            }
        };
        if element.is_some() {
            self.position += 1;
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termflow_term::AwaitPolicy;

    #[test]
    fn finite_input_is_read_once() {
        let input = Term::from_elements(vec![1, 2, 3]).idempotent(AwaitPolicy::Immediate);
        let mut cursor = EvaluationCursor::new(&input);
        let doubled = cursor.evaluate(BlockSize::All, |n| Some(n * 2));
        assert_eq!(doubled, vec![2, 4, 6]);
        assert_eq!(cursor.reads(), 3);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn bounded_collection_reads_only_what_it_needs() {
        let input = Term::from_elements(vec![1, 2, 3, 4]).idempotent(AwaitPolicy::Immediate);
        let mut cursor = EvaluationCursor::new(&input);
        let evens = cursor.evaluate(BlockSize::Exactly(1), |n| (n % 2 == 0).then_some(*n));
        assert_eq!(evens, vec![2]);
        assert_eq!(cursor.reads(), 2);
    }

    #[test]
    fn unproductive_cycle_stops_the_cursor() {
        let input = Term::cyclical(vec![2, 4], vec![1, 3, 5])
            .expect("valid")
            .idempotent(AwaitPolicy::Immediate);
        let mut cursor = EvaluationCursor::new(&input);
        let evens = cursor.evaluate(BlockSize::Exactly(10), |n| (n % 2 == 0).then_some(*n));
        assert_eq!(evens, vec![2, 4]);
        assert!(cursor.is_stalled());
        assert_eq!(cursor.reads(), 5);
    }

    #[test]
    fn productive_cycle_keeps_going() {
        let input = Term::cyclical(vec![], vec![1, 2])
            .expect("valid")
            .idempotent(AwaitPolicy::Immediate);
        let mut cursor = EvaluationCursor::new(&input);
        let evens = cursor.evaluate(BlockSize::Exactly(3), |n| (n % 2 == 0).then_some(*n));
        assert_eq!(evens, vec![2, 2, 2]);
        assert_eq!(cursor.reads(), 6);
    }
}
