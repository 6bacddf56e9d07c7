//! Operation specs accepted by `termflow eval --op`.
//!
//! A spec is a lowercase name optionally followed by `:`-separated integer
//! arguments, e.g. `add:3` or `insert:1:99`. Stages over integers and over
//! strings are both available, so ill-typed chains such as
//! `to-string` then `add:1` are rejected when the pipeline is composed.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use termflow_contract::{Violation, predicate};
use termflow_pipeline::{ElementType, ElementalOperation, Insert, Map, Pipeline, Sort};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpSpec {
    Add(i64),
    Mul(i64),
    Even,
    Odd,
    Gt(i64),
    Insert { index: usize, value: i64 },
    Sort,
    SortDescending,
    ToString,
    Upper,
    Len,
}

fn op_spec_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>[a-z][a-z-]*)(?P<args>(?::-?[0-9]+)*)$")
            .expect("op spec regex must compile")
    })
}

impl FromStr for OpSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let captures = op_spec_re()
            .captures(spec)
            .ok_or_else(|| format!("invalid op spec: `{spec}` (expected name[:arg...])"))?;
        let name = &captures["name"];
        let args = captures["args"]
            .split(':')
            .skip(1)
            .map(|arg| {
                arg.parse::<i64>()
                    .map_err(|err| format!("invalid argument `{arg}` in `{spec}`: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let arity = |expected: usize| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(format!(
                    "`{name}` takes {expected} argument(s), got {} in `{spec}`",
                    args.len()
                ))
            }
        };

        match name {
            "add" => arity(1).map(|()| Self::Add(args[0])),
            "mul" => arity(1).map(|()| Self::Mul(args[0])),
            "gt" => arity(1).map(|()| Self::Gt(args[0])),
            "insert" => {
                arity(2)?;
                let index = usize::try_from(args[0])
                    .map_err(|_| format!("insert index must be non-negative in `{spec}`"))?;
                Ok(Self::Insert {
                    index,
                    value: args[1],
                })
            }
            "even" => arity(0).map(|()| Self::Even),
            "odd" => arity(0).map(|()| Self::Odd),
            "sort" => arity(0).map(|()| Self::Sort),
            "sort-desc" => arity(0).map(|()| Self::SortDescending),
            "to-string" => arity(0).map(|()| Self::ToString),
            "upper" => arity(0).map(|()| Self::Upper),
            "len" => arity(0).map(|()| Self::Len),
            other => Err(format!("unknown operation: `{other}`")),
        }
    }
}

impl fmt::Display for OpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(n) => write!(f, "add:{n}"),
            Self::Mul(n) => write!(f, "mul:{n}"),
            Self::Even => f.write_str("even"),
            Self::Odd => f.write_str("odd"),
            Self::Gt(n) => write!(f, "gt:{n}"),
            Self::Insert { index, value } => write!(f, "insert:{index}:{value}"),
            Self::Sort => f.write_str("sort"),
            Self::SortDescending => f.write_str("sort-desc"),
            Self::ToString => f.write_str("to-string"),
            Self::Upper => f.write_str("upper"),
            Self::Len => f.write_str("len"),
        }
    }
}

fn push<O>(pipeline: Option<Pipeline>, operation: O) -> Result<Pipeline, Violation>
where
    O: ElementalOperation + 'static,
{
    match pipeline {
        None => Ok(Pipeline::new(operation)),
        Some(pipeline) => pipeline.pipe(operation),
    }
}

/// Append the stage named by `spec` to `pipeline` (or start one).
///
/// `sort`, `sort-desc` and `insert` follow the element type flowing into
/// them; every other stage has a fixed signature.
pub fn append(pipeline: Option<Pipeline>, spec: &OpSpec) -> Result<Pipeline, Violation> {
    let name = spec.to_string();
    let strings = pipeline
        .as_ref()
        .is_some_and(|pipeline| pipeline.output_type() == ElementType::of::<String>());

    match *spec {
        OpSpec::Add(n) => push(pipeline, Map::new(name, move |x: &i64| x.saturating_add(n))),
        OpSpec::Mul(n) => push(pipeline, Map::new(name, move |x: &i64| x.saturating_mul(n))),
        OpSpec::Even => push(
            pipeline,
            termflow_pipeline::Filter::new(name, predicate(|x: &i64| x % 2 == 0)),
        ),
        OpSpec::Odd => push(
            pipeline,
            termflow_pipeline::Filter::new(name, predicate(|x: &i64| x % 2 != 0)),
        ),
        OpSpec::Gt(n) => push(
            pipeline,
            termflow_pipeline::Filter::new(name, predicate(move |x: &i64| *x > n)),
        ),
        OpSpec::Insert { index, value } if strings => {
            push(pipeline, Insert::new(name, index, vec![value.to_string()]))
        }
        OpSpec::Insert { index, value } => push(pipeline, Insert::new(name, index, vec![value])),
        OpSpec::Sort if strings => push(pipeline, Sort::<String>::ascending().named(name)),
        OpSpec::Sort => push(pipeline, Sort::<i64>::ascending().named(name)),
        OpSpec::SortDescending if strings => push(pipeline, Sort::<String>::descending().named(name)),
        OpSpec::SortDescending => push(pipeline, Sort::<i64>::descending().named(name)),
        OpSpec::ToString => push(pipeline, Map::new(name, |x: &i64| x.to_string())),
        OpSpec::Upper => push(pipeline, Map::new(name, |s: &String| s.to_uppercase())),
        OpSpec::Len => push(
            pipeline,
            Map::new(name, |s: &String| i64::try_from(s.chars().count()).unwrap_or(i64::MAX)),
        ),
    }
}

/// Build a pipeline from specs in order. `specs` must be non-empty.
pub fn build(specs: &[OpSpec]) -> Result<Option<Pipeline>, Violation> {
    let mut pipeline = None;
    for spec in specs {
        pipeline = Some(append(pipeline, spec)?);
    }
    Ok(pipeline)
}
