//! Integration tests: bounded evaluation properties across the built-in
//! operations and pipelines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use termflow_contract::predicate;
use termflow_pipeline::{ElementalOperation, Filter, Insert, Map, Pipeline, Propagation, Sort};
use termflow_term::{BlockSize, Term};

/// An element that must never be copied.
#[derive(Debug, PartialEq, Eq)]
struct Fragile(i64);

impl Clone for Fragile {
    fn clone(&self) -> Self {
        panic!("Fragile({}) was cloned", self.0)
    }
}

fn fragile_many(len: i64) -> Term<Fragile> {
    Term::many((0..len).map(Fragile).collect()).expect("at least two elements")
}

fn prefix_of<V: Clone + Send + Sync + 'static>(term: &Term<V>, n: usize) -> Term<V> {
    Term::from_elements(term.elements(BlockSize::Exactly(n)).collect())
}

fn assert_prefix_agreement<O>(operation: &O, input: &Term<O::Input>)
where
    O: ElementalOperation,
    O::Output: PartialEq + std::fmt::Debug,
{
    let complete = operation.apply(input, BlockSize::All);
    for n in 0..8 {
        let bounded = operation.apply(input, BlockSize::Exactly(n));
        assert_eq!(
            bounded,
            prefix_of(&complete, n),
            "{} with exactly({n})",
            operation.name()
        );
    }
}

#[test]
fn zero_block_size_reads_nothing() {
    let keep_all = Filter::new("keep_all", predicate(|_: &Fragile| true));
    assert!(keep_all.apply(&fragile_many(100), BlockSize::Exactly(0)).is_empty());

    let cyclical = Term::cyclical(vec![Fragile(0)], vec![Fragile(1)]).expect("valid");
    assert!(keep_all.apply(&cyclical, BlockSize::Exactly(0)).is_empty());

    let single = Term::single(Fragile(7));
    assert!(keep_all.apply(&single, BlockSize::Exactly(0)).is_empty());

    let pipeline = Pipeline::new(Filter::new("keep_all", predicate(|_: &Fragile| true)));
    let output: Term<Fragile> = pipeline.apply(&fragile_many(10), BlockSize::Exactly(0));
    assert!(output.is_empty());
    let output: Term<Fragile> = pipeline.apply(&single, BlockSize::Exactly(0));
    assert!(output.is_empty());
}

#[test]
fn bounded_map_touches_only_the_prefix() {
    let calls = AtomicUsize::new(0);
    let unwrap = Map::new("unwrap", |fragile: &Fragile| {
        calls.fetch_add(1, Ordering::SeqCst);
        fragile.0
    });
    let output = unwrap.apply(&fragile_many(1000), BlockSize::Exactly(2));
    assert_eq!(output, Term::from_elements(vec![0, 1]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn bounded_results_are_prefixes_of_complete_results() {
    let finite = Term::from_elements(vec![4, 1, 8, 3, 6, 2, 7]);
    let cyclical = Term::cyclical(vec![5, 2], vec![1, 4, 3]).expect("valid");

    let triple = Map::new("triple", |n: &i64| n * 3);
    let even = Filter::new("even", predicate(|n: &i64| n % 2 == 0));
    let insert = Insert::new("insert", 3, vec![100, 200]);

    for input in [&finite, &cyclical] {
        assert_prefix_agreement(&triple, input);
        assert_prefix_agreement(&even, input);
        assert_prefix_agreement(&insert, input);
        let even_then_inc = Filter::new("even", predicate(|n: &i64| n % 2 == 0))
            .then(Map::new("inc", |n: &i64| n + 1));
        assert_prefix_agreement(&even_then_inc, input);
    }
    assert_prefix_agreement(&Sort::<i64>::ascending(), &finite);
}

#[test]
fn cyclical_inputs_never_run_forever() {
    let never = Filter::new("never", predicate(|_: &i64| false));
    let input = Term::cyclical(vec![1, 2], vec![3]).expect("valid");
    assert!(never.apply(&input, BlockSize::Exactly(1_000_000)).is_empty());
    assert!(never.apply(&input, BlockSize::All).is_empty());

    let triple = Map::new("triple", |n: &i64| n * 3);
    let output = triple.apply(&input, BlockSize::Exactly(5));
    assert_eq!(output, Term::from_elements(vec![3, 6, 9, 9, 9]));
}

#[test]
fn filter_that_empties_a_stage_fails_the_next_one() {
    let pipeline = Pipeline::new(Filter::new("never", predicate(|_: &i64| false)))
        .pipe(Map::new("double", |n: &i64| n * 2))
        .expect("well typed");
    let output: Term<i64> = pipeline.apply(&Term::from_elements(vec![1_i64, 2]), BlockSize::All);
    let violation = output.violation().expect("second stage rejects empty input");
    assert_eq!(violation.plaintiff, "double");
    assert_eq!(violation.evidence["variant"], "empty");
}

#[test]
fn shared_pipeline_applies_concurrently() {
    const THREADS: usize = 6;
    let pipeline = Arc::new(
        Pipeline::new(Map::new("inc", |n: &i64| n + 1))
            .pipe(Filter::new("odd", predicate(|n: &i64| n % 2 != 0)))
            .expect("well typed")
            .with_propagation(Propagation::Fused),
    );
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|offset| {
            let pipeline = Arc::clone(&pipeline);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let start = offset as i64;
                let input = Term::from_elements((start..start + 10).collect());
                barrier.wait();
                let output: Term<i64> = pipeline.apply(&input, BlockSize::Exactly(3));
                (start, output)
            })
        })
        .collect();

    for worker in workers {
        let (start, output) = worker.join().expect("worker thread");
        let expected: Vec<i64> = (start + 1..start + 11)
            .filter(|n| n % 2 != 0)
            .take(3)
            .collect();
        assert_eq!(output, Term::from_elements(expected));
    }
}
