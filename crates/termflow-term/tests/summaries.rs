//! Integration tests: the JSON shapes terms and violations present to tooling.

use insta::assert_json_snapshot;
use std::time::Duration;
use termflow_term::{Asynchronous, Term};

#[test]
fn summaries_cover_every_variant() {
    let (pending, _resolver) = Term::<i64>::pending(Duration::from_millis(2));
    let summaries: Vec<_> = [
        Term::empty(),
        Term::single(1),
        Term::from_elements(vec![1, 2, 3]),
        Term::cyclical(vec![0], vec![1, 2]).expect("valid"),
        pending,
    ]
    .iter()
    .map(Term::summary)
    .collect();

    assert_json_snapshot!(summaries, @r#"
    [
      {
        "length": 0,
        "variant": "empty"
      },
      {
        "length": 1,
        "variant": "single"
      },
      {
        "length": 3,
        "variant": "many"
      },
      {
        "cycleLength": 2,
        "headerLength": 1,
        "variant": "cyclical"
      },
      {
        "maxBlockNanoseconds": 2000000,
        "variant": "pending"
      }
    ]
    "#);
}

#[test]
fn timeout_violation_json_is_stable() {
    let (term, _resolver) = Term::<i64>::pending(Duration::from_millis(1));
    let outcome = Asynchronous::new(term).await_for(Duration::ZERO);
    let violation = outcome.violation().expect("timed out");
    let value = serde_json::to_value(violation).expect("violation serialises");

    assert_json_snapshot!(value, { ".witnessId" => "[witness]" }, @r#"
    {
      "contract": {
        "kind": "obligation",
        "name": "pending_must_resolve_within_timeout"
      },
      "description": "pending term must resolve within the caller's timeout",
      "evidence": {
        "maxBlockNanoseconds": 1000000,
        "timeoutNanoseconds": 0
      },
      "plaintiff": "pending_term",
      "witnessId": "[witness]"
    }
    "#);
    assert!(violation.witness_id.starts_with("w1_"));
}
