use crate::cursor::EvaluationCursor;
use crate::operation::ElementalOperation;
use std::marker::PhantomData;
use termflow_term::{BlockSize, Idempotent, Term};

/// One output element per input element.
pub struct Map<IN, OUT, F> {
    name: String,
    f: F,
    _types: PhantomData<fn(&IN) -> OUT>,
}

impl<IN, OUT, F> Map<IN, OUT, F>
where
    F: Fn(&IN) -> OUT,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _types: PhantomData,
        }
    }
}

impl<IN, OUT, F> ElementalOperation for Map<IN, OUT, F>
where
    IN: Clone + Send + Sync + 'static,
    OUT: Clone + Send + Sync + 'static,
    F: Fn(&IN) -> OUT + Send + Sync,
{
    type Input = IN;
    type Output = OUT;

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: &Idempotent<IN>, limit: BlockSize) -> Term<OUT> {
        if let (Term::Cyclical(cyclical), BlockSize::All) = (input.as_term(), limit) {
            let header = cyclical.header().iter().map(&self.f).collect();
            let cycle = cyclical.cycle().iter().map(&self.f).collect();
            return Term::cyclical(header, cycle).unwrap_or_else(Term::error);
        }
        let mut cursor = EvaluationCursor::new(input);
        Term::from_elements(cursor.evaluate(limit, |element| Some((self.f)(element))))
    }

    fn input_demand(&self, output: BlockSize) -> BlockSize {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn maps_a_bounded_prefix_of_a_cycle() {
        let calls = AtomicUsize::new(0);
        let square = Map::new("square", |n: &i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            n * n
        });
        let input = Term::cyclical(vec![1], vec![2, 3]).expect("valid");
        let output = square.apply(&input, BlockSize::Exactly(4));
        assert_eq!(output, Term::from_elements(vec![1, 4, 9, 4]));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn unbounded_map_keeps_the_cycle_structure() {
        let negate = Map::new("negate", |n: &i64| -n);
        let input = Term::cyclical(vec![1], vec![2, 3]).expect("valid");
        let output = negate.apply(&input, BlockSize::All);
        assert_eq!(output, Term::cyclical(vec![-1], vec![-2, -3]).expect("valid"));
    }

    #[test]
    fn changes_element_type() {
        let render = Map::new("render", |n: &i64| format!("#{n}"));
        let output = render.apply(&Term::from_elements(vec![1, 2]), BlockSize::All);
        assert_eq!(
            output,
            Term::from_elements(vec!["#1".to_string(), "#2".to_string()])
        );
    }
}
