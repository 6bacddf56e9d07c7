use crate::cursor::EvaluationCursor;
use crate::operation::ElementalOperation;
use std::marker::PhantomData;
use termflow_contract::Filter as ElementFilter;
use termflow_term::{BlockSize, Idempotent, Term};

/// Keeps the elements a [`termflow_contract::Filter`] keeps.
///
/// A bounded read of a cyclical input stops after one unproductive pass of
/// the cycle, so filtering out every cycle element still terminates.
pub struct Filter<V, F> {
    name: String,
    filter: F,
    _element: PhantomData<fn(&V)>,
}

impl<V, F> Filter<V, F>
where
    F: ElementFilter<V>,
{
    pub fn new(name: impl Into<String>, filter: F) -> Self {
        Self {
            name: name.into(),
            filter,
            _element: PhantomData,
        }
    }
}

impl<V, F> Filter<V, F>
where
    V: Clone,
    F: ElementFilter<V>,
{
    fn keep(&self, elements: &[V]) -> Vec<V> {
        elements
            .iter()
            .filter(|element| self.filter.filter(element).is_kept())
            .cloned()
            .collect()
    }
}

impl<V, F> ElementalOperation for Filter<V, F>
where
    V: Clone + Send + Sync + 'static,
    F: ElementFilter<V> + Send + Sync,
{
    type Input = V;
    type Output = V;

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: &Idempotent<V>, limit: BlockSize) -> Term<V> {
        if let (Term::Cyclical(cyclical), BlockSize::All) = (input.as_term(), limit) {
            let header = self.keep(cyclical.header());
            let cycle = self.keep(cyclical.cycle());
            if cycle.is_empty() {
                return Term::from_elements(header);
            }
            return Term::cyclical(header, cycle).unwrap_or_else(Term::error);
        }
        let mut cursor = EvaluationCursor::new(input);
        let kept = cursor.evaluate(limit, |element| {
            self.filter.filter(element).is_kept().then(|| element.clone())
        });
        tracing::trace!(
            operation = %self.name,
            reads = cursor.reads(),
            kept = kept.len(),
            "filter pass"
        );
        Term::from_elements(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termflow_contract::{FilterExt, predicate};

    #[test]
    fn composed_predicates_drive_the_filter() {
        let small_evens = Filter::new(
            "small_evens",
            predicate(|n: &i64| n % 2 == 0).and(predicate(|n: &i64| *n < 10)),
        );
        let output = small_evens.apply(&Term::from_elements(vec![2, 3, 4, 12, 8]), BlockSize::All);
        assert_eq!(output, Term::from_elements(vec![2, 4, 8]));
    }

    #[test]
    fn bounded_filter_over_barren_cycle_terminates() {
        let evens = Filter::new("evens", predicate(|n: &i64| n % 2 == 0));
        let input = Term::cyclical(vec![2], vec![1, 3]).expect("valid");
        let output = evens.apply(&input, BlockSize::Exactly(5));
        assert_eq!(output, Term::single(2));
    }

    #[test]
    fn unbounded_filter_keeps_productive_cycle() {
        let evens = Filter::new("evens", predicate(|n: &i64| n % 2 == 0));
        let input = Term::cyclical(vec![1, 2], vec![3, 4, 6]).expect("valid");
        let output = evens.apply(&input, BlockSize::All);
        assert_eq!(output, Term::cyclical(vec![2], vec![4, 6]).expect("valid"));
    }

    #[test]
    fn filtering_everything_out_is_empty_not_error() {
        let none = Filter::new("none", predicate(|_: &i64| false));
        let output = none.apply(&Term::from_elements(vec![1, 2]), BlockSize::All);
        assert!(output.is_empty());
    }
}
