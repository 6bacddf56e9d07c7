use crate::op_spec::{self, OpSpec};
use crate::support::{
    EXIT_REJECTED, describe_rendered, parse_block_size_or_exit, parse_elements_or_exit,
    parse_propagation_or_exit, print_json_or_exit, print_violation, render_term, usage_error,
};
use serde_json::{Value, json};
use termflow_contract::Violation;
use termflow_pipeline::{ElementType, Pipeline, Propagation, TermflowConfig};
use termflow_term::{BlockSize, Term};

pub const EVAL_SCHEMA: u64 = 1;
pub const EVAL_KIND: &str = "termflow.eval.v1";

pub struct Args {
    pub input: String,
    pub cycle: Option<String>,
    pub ops: Vec<String>,
    pub block_size: String,
    pub propagation: Option<String>,
    pub json: bool,
}

pub fn run(args: Args, config: &TermflowConfig) {
    let specs: Vec<OpSpec> = args
        .ops
        .iter()
        .map(|text| text.parse().unwrap_or_else(|err: String| usage_error(err)))
        .collect();
    let limit = parse_block_size_or_exit(&args.block_size);
    let propagation = args
        .propagation
        .as_deref()
        .map_or_else(|| config.propagation(), parse_propagation_or_exit);
    let header = parse_elements_or_exit(&args.input);
    let cycle = args.cycle.as_deref().map(parse_elements_or_exit);

    let mut payload = json!({
        "schema": EVAL_SCHEMA,
        "kind": EVAL_KIND,
        "stages": specs.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "blockSize": limit.to_string(),
        "propagation": propagation,
    });

    let outcome = evaluate(&specs, header, cycle, limit, propagation, &mut payload);
    let rejected = outcome.is_err();
    match &outcome {
        Ok(output) => {
            payload["result"] = json!("accepted");
            payload["output"] = output.clone();
        }
        Err(violation) => {
            payload["result"] = json!("rejected");
            payload["violation"] = json!(violation);
        }
    }

    if args.json {
        print_json_or_exit(&payload, "eval");
    } else {
        println!("termflow eval");
        println!("  Stages: {}", args.ops.join(" | "));
        println!("  Block size: {limit}");
        println!("  Propagation: {propagation}");
        match &outcome {
            Ok(output) => println!("  Output ({})", describe_rendered(output)),
            Err(violation) => print_violation(violation),
        }
    }

    if rejected {
        std::process::exit(EXIT_REJECTED);
    }
}

fn evaluate(
    specs: &[OpSpec],
    header: Vec<i64>,
    cycle: Option<Vec<i64>>,
    limit: BlockSize,
    propagation: Propagation,
    payload: &mut Value,
) -> Result<Value, Violation> {
    let pipeline = op_spec::build(specs)?
        .unwrap_or_else(|| usage_error("at least one --op is required"))
        .with_propagation(propagation);
    payload["stageLimits"] = json!(
        pipeline
            .stage_limits(limit)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );
    payload["outputType"] = json!(pipeline.output_type().short_name());

    let input = match cycle {
        Some(cycle) => Term::cyclical(header, cycle)?,
        None => Term::from_elements(header),
    };
    tracing::debug!(
        stages = pipeline.len(),
        input = %input.summary(),
        %limit,
        "evaluating pipeline"
    );
    apply(&pipeline, &input, limit)
}

fn apply(pipeline: &Pipeline, input: &Term<i64>, limit: BlockSize) -> Result<Value, Violation> {
    if pipeline.output_type() == ElementType::of::<String>() {
        render_term(&pipeline.apply::<i64, String>(input, limit))
    } else {
        render_term(&pipeline.apply::<i64, i64>(input, limit))
    }
}
