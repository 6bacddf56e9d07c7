//! Integration tests: judging built-in and deliberately broken operations
//! through invocation contracts.

use insta::assert_json_snapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use termflow_contract::{Contract, Filter, Not, Or, predicate};
use termflow_harness::{
    ElementsMustMatch, Invocation, OperationMustFail, OperationOutputMustMeet, TermMustBeNonEmpty,
    TermMustEqual, TermMustHaveLength,
};
use termflow_pipeline::{ElementalOperation, Map, Sort};
use termflow_term::{BlockSize, Idempotent, Term};

/// Ignores the block size it was given.
struct Overproduce;

impl ElementalOperation for Overproduce {
    type Input = i64;
    type Output = i64;

    fn name(&self) -> &str {
        "overproduce"
    }

    fn transform(&self, _input: &Idempotent<i64>, _limit: BlockSize) -> Term<i64> {
        Term::from_elements(vec![1, 2, 3])
    }
}

/// Panics with a plain message instead of reporting a violation.
struct Explode;

impl ElementalOperation for Explode {
    type Input = i64;
    type Output = i64;

    fn name(&self) -> &str {
        "explode"
    }

    fn transform(&self, _input: &Idempotent<i64>, _limit: BlockSize) -> Term<i64> {
        panic!("explode always panics")
    }
}

fn double() -> Map<i64, i64, impl Fn(&i64) -> i64 + Send + Sync> {
    Map::new("double", |n: &i64| n * 2)
}

#[test]
fn successful_invocation_meets_output_contracts() {
    let invocation = Invocation::new(double(), Term::from_elements(vec![1, 2, 3]), BlockSize::All);

    invocation
        .verify(&OperationOutputMustMeet::new(TermMustBeNonEmpty))
        .expect("non-empty output");
    invocation
        .verify(&OperationOutputMustMeet::new(TermMustHaveLength::finite(3)))
        .expect("three elements");
    invocation
        .verify(&OperationOutputMustMeet::new(ElementsMustMatch::new(predicate(
            |n: &i64| n % 2 == 0,
        ))))
        .expect("doubled values are even");
    invocation
        .verify(&OperationOutputMustMeet::new(TermMustEqual::new(
            Term::from_elements(vec![2, 4, 6]),
        )))
        .expect("exact output");

    let violation = invocation
        .verify(&OperationMustFail)
        .expect_err("the invocation succeeds");
    assert_eq!(violation.contract.name, "operation_must_fail");
    assert_eq!(violation.evidence["output"]["length"], 3);
}

#[test]
fn rejected_inputs_satisfy_operation_must_fail() {
    let empty = Invocation::new(double(), Term::empty(), BlockSize::All);
    empty.verify(&OperationMustFail).expect("empty input is rejected");
    let failure = empty.execute().expect_err("empty input");
    assert_eq!(failure.contract.name, "term_must_be_non_empty");

    let cyclical = Term::cyclical(vec![3], vec![1, 2]).expect("valid");
    let sort = Invocation::new(Sort::<i64>::ascending(), cyclical, BlockSize::Exactly(2));
    sort.verify(&OperationMustFail).expect("cyclical input cannot be sorted");
}

#[test]
fn broken_guarantee_is_caught_as_a_failure() {
    let invocation = Invocation::new(Overproduce, Term::single(1), BlockSize::Exactly(1));
    let failure = invocation.execute().expect_err("overproduction escalates");
    assert_eq!(failure.contract.name, "operation_must_honor_block_size");
    assert!(failure.is_guarantee());
    assert_eq!(failure.plaintiff, "overproduce");
    invocation.verify(&OperationMustFail).expect("escalation counts as failure");
}

#[test]
fn plain_panics_are_reported_against_the_operation() {
    let invocation = Invocation::new(Explode, Term::single(1), BlockSize::All);
    let failure = invocation.execute().expect_err("panic is caught");
    assert_eq!(failure.contract.name, "operation_must_not_panic");
    assert!(failure.is_guarantee());
    assert_eq!(failure.evidence["panic"], "explode always panics");
}

#[test]
fn operation_runs_once_per_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = {
        let calls = Arc::clone(&calls);
        Map::new("counted", move |n: &i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            n * 2
        })
    };
    let invocation = Invocation::new(counted, Term::single(5), BlockSize::All);

    invocation
        .verify(&OperationMustFail)
        .expect_err("the invocation succeeds");
    invocation
        .verify(&OperationOutputMustMeet::new(TermMustHaveLength::finite(2)))
        .expect_err("one element, not two");
    invocation
        .verify(&OperationOutputMustMeet::new(TermMustBeNonEmpty))
        .expect("non-empty output");
    assert_eq!(invocation.execute().expect("succeeds").as_term(), &Term::single(10));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn invocation_contracts_compose() {
    let either = Or(
        OperationMustFail,
        OperationOutputMustMeet::new(TermMustHaveLength::finite(1)),
    );

    let single = Invocation::new(double(), Term::single(4), BlockSize::All);
    let empty = Invocation::new(double(), Term::empty(), BlockSize::All);
    let many = Invocation::new(double(), Term::from_elements(vec![1, 2]), BlockSize::All);

    assert!(either.filter(&single).is_kept());
    assert!(either.filter(&empty).is_kept());
    assert!(either.filter(&many).is_discarded());

    let succeeds = Not(OperationMustFail);
    assert!(succeeds.filter(&many).is_kept());
    assert!(succeeds.filter(&empty).is_discarded());
}

#[test]
fn execution_failure_is_nested_as_cause() {
    let invocation = Invocation::new(double(), Term::empty(), BlockSize::All);
    let contract = OperationOutputMustMeet::new(TermMustBeNonEmpty);
    let violation = invocation.verify(&contract).expect_err("empty input fails");

    assert_eq!(violation.depth(), 2);
    assert_eq!(violation.root_cause().contract.name, "term_must_be_non_empty");
    assert_eq!(violation.root_cause().plaintiff, "double");
    assert!(violation.involves("operation_output_must_meet"));
}

#[test]
fn output_violation_json_nests_the_output_contract() {
    let invocation = Invocation::new(double(), Term::single(3), BlockSize::All);
    let contract = OperationOutputMustMeet::new(TermMustHaveLength::finite(2));
    assert!(contract.check(&invocation).is_discarded());

    let violation = invocation.verify(&contract).expect_err("length mismatch");
    let value = serde_json::to_value(&violation).expect("violation serialises");

    assert_json_snapshot!(
        value,
        { ".witnessId" => "[witness]", ".cause.witnessId" => "[witness]" },
        @r#"
    {
      "cause": {
        "contract": {
          "kind": "obligation",
          "name": "term_must_have_length"
        },
        "description": "term must have the expected length",
        "evidence": {
          "actual": {
            "count": 1,
            "kind": "finite"
          },
          "expected": {
            "count": 2,
            "kind": "finite"
          },
          "term": {
            "length": 1,
            "variant": "single"
          }
        },
        "plaintiff": "double",
        "witnessId": "[witness]"
      },
      "contract": {
        "kind": "obligation",
        "name": "operation_output_must_meet"
      },
      "description": "operation must succeed with an output meeting the output contract: term must have the expected length",
      "evidence": {
        "blockSize": "all",
        "input": {
          "length": 1,
          "variant": "single"
        },
        "operation": "double",
        "outputContract": {
          "kind": "obligation",
          "name": "term_must_have_length"
        }
      },
      "plaintiff": "double",
      "witnessId": "[witness]"
    }
    "#
    );
}
