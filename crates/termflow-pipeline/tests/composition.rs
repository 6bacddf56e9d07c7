//! Integration tests: composition-time type checking as tooling sees it.

use insta::assert_json_snapshot;
use termflow_pipeline::{ElementalOperation, Map, Pipeline};
use termflow_term::{BlockSize, Term};

#[test]
fn string_output_into_integer_input_fails_at_compose_time() {
    let describe = Pipeline::new(Map::new("describe", |n: &i64| format!("#{n}")));
    let violation = describe
        .pipe(Map::new("increment", |n: &i64| n + 1))
        .expect_err("String cannot feed i64");
    let value = serde_json::to_value(&violation).expect("violation serialises");

    assert_json_snapshot!(value, { ".witnessId" => "[witness]" }, @r#"
    {
      "contract": {
        "kind": "obligation",
        "name": "operations_must_be_compatible"
      },
      "description": "downstream operation input type must equal upstream output type",
      "evidence": {
        "downstreamInput": "i64",
        "downstreamStage": "increment",
        "upstreamOutput": "alloc::string::String",
        "upstreamStage": "describe"
      },
      "plaintiff": "pipeline",
      "witnessId": "[witness]"
    }
    "#);

    // The failed `pipe` leaves the original pipeline usable.
    assert_eq!(describe.len(), 1);
    let output: Term<String> = describe.apply(&Term::single(7_i64), BlockSize::All);
    assert_eq!(output, Term::single("#7".to_string()));
}

#[test]
fn static_composition_agrees_with_dynamic_composition() {
    let input = Term::from_elements(vec![1, 2, 3, 4]);
    let statically = Map::new("inc", |n: &i64| n + 1).then(Map::new("square", |n: &i64| n * n));
    let dynamically = Pipeline::new(Map::new("inc", |n: &i64| n + 1))
        .pipe(Map::new("square", |n: &i64| n * n))
        .expect("well typed");

    for limit in [BlockSize::All, BlockSize::Exactly(2)] {
        let dynamic: Term<i64> = dynamically.apply(&input, limit);
        assert_eq!(statically.apply(&input, limit), dynamic);
    }
    assert_eq!(statically.name(), "inc | square");
}
