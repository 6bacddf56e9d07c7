use crate::contracts::SortInputMustBeFinite;
use crate::cursor::EvaluationCursor;
use crate::operation::ElementalOperation;
use std::cmp::Ordering;
use std::marker::PhantomData;
use termflow_contract::Advocate;
use termflow_term::{BlockSize, Idempotent, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

/// Stable sort by the element's total order.
///
/// Every input element must be read before the first output is known, so a
/// bound only limits how many sorted elements are cloned out. Cyclical input
/// is rejected.
pub struct Sort<V> {
    name: String,
    direction: Direction,
    _element: PhantomData<fn(&V)>,
}

impl<V: Ord> Sort<V> {
    pub fn ascending() -> Self {
        Self {
            name: "sort".to_string(),
            direction: Direction::Ascending,
            _element: PhantomData,
        }
    }

    pub fn descending() -> Self {
        Self {
            name: "sort_descending".to_string(),
            direction: Direction::Descending,
            _element: PhantomData,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn compare(&self, a: &V, b: &V) -> Ordering {
        match self.direction {
            Direction::Ascending => a.cmp(b),
            Direction::Descending => b.cmp(a),
        }
    }
}

impl<V> ElementalOperation for Sort<V>
where
    V: Ord + Clone + Send + Sync + 'static,
{
    type Input = V;
    type Output = V;

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: &Idempotent<V>, limit: BlockSize) -> Term<V> {
        if let Err(violation) =
            Advocate::new(self.name.as_str()).enforce(&SortInputMustBeFinite, input.as_term())
        {
            tracing::warn!(
                operation = %self.name,
                contract = %violation.contract,
                "sort input rejected"
            );
            return Term::error(violation);
        }
        let mut cursor = EvaluationCursor::new(input);
        let mut sorted: Vec<&V> = cursor.evaluate(BlockSize::All, Some);
        sorted.sort_by(|a, b| self.compare(a, b));
        let n = limit.limit().unwrap_or(sorted.len());
        Term::from_elements(sorted.into_iter().take(n).cloned().collect())
    }
}
