//! Type-erased, append-only pipelines of elemental operations.
//!
//! Stages are checked for element-type agreement when they are appended, so
//! a pipeline that exists is always well typed internally. Terms travel
//! between stages boxed as `dyn Any`; the caller's input is only borrowed
//! and the elements themselves are never copied by the erasure.

use crate::contracts::{
    OperationsMustBeCompatible, PipelineInputTypeMustMatch, PipelineOutputTypeMustMatch,
    StageJoint, TypeAgreement,
};
use crate::element_type::ElementType;
use crate::operation::ElementalOperation;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use termflow_contract::{Advocate, Contract, Violation};
use termflow_term::{BlockSize, Term};

/// Plaintiff recorded on composition and type-agreement violations.
pub const PIPELINE_PLAINTIFF: &str = "pipeline";

/// How the caller's bound reaches the stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Every stage but the last computes `All`; the last gets the bound.
    #[default]
    LastStage,
    /// The bound is pushed backwards through every stage's `input_demand`.
    Fused,
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastStage => f.write_str("last_stage"),
            Self::Fused => f.write_str("fused"),
        }
    }
}

impl std::str::FromStr for Propagation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "last_stage" | "last-stage" => Ok(Self::LastStage),
            "fused" => Ok(Self::Fused),
            other => Err(format!(
                "invalid propagation: {other} (expected `last_stage` or `fused`)"
            )),
        }
    }
}

type ErasedTerm = Box<dyn Any + Send>;

trait ErasedOperation: Send + Sync {
    fn name(&self) -> &str;
    fn input_type(&self) -> ElementType;
    fn output_type(&self) -> ElementType;
    fn input_demand(&self, output: BlockSize) -> BlockSize;
    fn apply_erased(&self, input: &dyn Any, limit: BlockSize) -> ErasedTerm;
}

impl<O: ElementalOperation> ErasedOperation for O {
    fn name(&self) -> &str {
        ElementalOperation::name(self)
    }

    fn input_type(&self) -> ElementType {
        ElementalOperation::input_type(self)
    }

    fn output_type(&self) -> ElementType {
        ElementalOperation::output_type(self)
    }

    fn input_demand(&self, output: BlockSize) -> BlockSize {
        ElementalOperation::input_demand(self, output)
    }

    fn apply_erased(&self, input: &dyn Any, limit: BlockSize) -> ErasedTerm {
        match input.downcast_ref::<Term<O::Input>>() {
            Some(term) => Box::new(self.apply(term, limit)),
            None => {
                // Unreachable for a pipeline built through `pipe`.
                let agreement = TypeAgreement {
                    declared: ElementalOperation::input_type(self),
                    requested: ElementType::of::<()>(),
                };
                let violation = PipelineInputTypeMustMatch.violation(
                    ElementalOperation::name(self),
                    &agreement,
                    None,
                );
                Box::new(Term::<O::Output>::error(violation))
            }
        }
    }
}

/// An ordered, append-only sequence of stages.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn ErasedOperation>>,
    propagation: Propagation,
}

impl Pipeline {
    pub fn new<O: ElementalOperation + 'static>(operation: O) -> Self {
        Self {
            stages: vec![Arc::new(operation)],
            propagation: Propagation::default(),
        }
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// A new pipeline with `operation` appended.
    ///
    /// Fails with an obligation violation naming both element types when
    /// `operation`'s input does not match the current output. `self` is left
    /// unchanged either way.
    pub fn pipe<O: ElementalOperation + 'static>(&self, operation: O) -> Result<Self, Violation> {
        let last = self.last_stage();
        let joint = StageJoint {
            upstream_stage: last.name().to_string(),
            upstream_output: last.output_type(),
            downstream_stage: ElementalOperation::name(&operation).to_string(),
            downstream_input: ElementalOperation::input_type(&operation),
        };
        Advocate::new(PIPELINE_PLAINTIFF).enforce(&OperationsMustBeCompatible, &joint)?;

        let mut stages = self.stages.clone();
        stages.push(Arc::new(operation));
        tracing::debug!(
            stages = stages.len(),
            appended = %joint.downstream_stage,
            element_type = %joint.downstream_input,
            "pipeline stage appended"
        );
        Ok(Self {
            stages,
            propagation: self.propagation,
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Never true: a pipeline always has at least one stage.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn input_type(&self) -> ElementType {
        self.first_stage().input_type()
    }

    pub fn output_type(&self) -> ElementType {
        self.last_stage().output_type()
    }

    /// The bound each stage is applied with for a final bound of `limit`.
    pub fn stage_limits(&self, limit: BlockSize) -> Vec<BlockSize> {
        PipelineRun::new(self, limit).limits
    }

    /// Run `input` through every stage.
    ///
    /// `IN` and `OUT` must be the pipeline's declared end types; a mismatch
    /// yields an Error term with an obligation violation and no stage runs.
    pub fn apply<IN, OUT>(&self, input: &Term<IN>, limit: BlockSize) -> Term<OUT>
    where
        IN: Clone + Send + Sync + 'static,
        OUT: Clone + Send + Sync + 'static,
    {
        let advocate = Advocate::new(PIPELINE_PLAINTIFF);
        let input_agreement = TypeAgreement {
            declared: self.input_type(),
            requested: ElementType::of::<IN>(),
        };
        if let Err(violation) = advocate.enforce(&PipelineInputTypeMustMatch, &input_agreement) {
            tracing::warn!(contract = %violation.contract, "pipeline input type rejected");
            return Term::error(violation);
        }
        let output_agreement = TypeAgreement {
            declared: self.output_type(),
            requested: ElementType::of::<OUT>(),
        };
        if let Err(violation) = advocate.enforce(&PipelineOutputTypeMustMatch, &output_agreement)
        {
            tracing::warn!(contract = %violation.contract, "pipeline output type rejected");
            return Term::error(violation);
        }

        let output = PipelineRun::new(self, limit).execute(input);
        match output.downcast::<Term<OUT>>() {
            Ok(term) => *term,
            Err(_) => Term::error(PipelineOutputTypeMustMatch.violation(
                PIPELINE_PLAINTIFF,
                &output_agreement,
                None,
            )),
        }
    }

    fn first_stage(&self) -> &Arc<dyn ErasedOperation> {
        &self.stages[0]
    }

    fn last_stage(&self) -> &Arc<dyn ErasedOperation> {
        &self.stages[self.stages.len() - 1]
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("propagation", &self.propagation)
            .finish()
    }
}

/// One evaluation of a pipeline: the per-stage bounds and progress.
///
/// Created fresh for every `apply`, so a pipeline can be shared across
/// threads and applied concurrently.
struct PipelineRun<'p> {
    pipeline: &'p Pipeline,
    limits: Vec<BlockSize>,
    completed: usize,
}

impl<'p> PipelineRun<'p> {
    fn new(pipeline: &'p Pipeline, limit: BlockSize) -> Self {
        let count = pipeline.stages.len();
        let mut limits = vec![BlockSize::All; count];
        if let Some(last) = limits.last_mut() {
            *last = limit;
        }
        if pipeline.propagation == Propagation::Fused {
            for index in (0..count.saturating_sub(1)).rev() {
                limits[index] = pipeline.stages[index + 1]
                    .input_demand(limits[index + 1])
                    .upstream();
            }
        }
        Self {
            pipeline,
            limits,
            completed: 0,
        }
    }

    fn execute(mut self, input: &dyn Any) -> ErasedTerm {
        let pipeline = self.pipeline;
        let mut current = self.run_stage(0, pipeline.first_stage(), input);
        for (index, stage) in pipeline.stages.iter().enumerate().skip(1) {
            current = self.run_stage(index, stage, &*current);
        }
        tracing::trace!(
            stages = self.completed,
            propagation = %self.pipeline.propagation,
            "pipeline run complete"
        );
        current
    }

    fn run_stage(
        &mut self,
        index: usize,
        stage: &Arc<dyn ErasedOperation>,
        input: &dyn Any,
    ) -> ErasedTerm {
        let limit = self.limits[index];
        tracing::debug!(stage = index, operation = stage.name(), %limit, "stage start");
        let output = stage.apply_erased(input, limit);
        self.completed += 1;
        tracing::debug!(stage = index, operation = stage.name(), "stage finish");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{
        OPERATIONS_MUST_BE_COMPATIBLE, PIPELINE_INPUT_TYPE_MUST_MATCH,
        PIPELINE_OUTPUT_TYPE_MUST_MATCH,
    };
    use crate::ops::{Filter, Insert, Map, Sort};
    use termflow_contract::predicate;

    fn evens_doubled() -> Pipeline {
        Pipeline::new(Filter::new("even", predicate(|n: &i64| n % 2 == 0)))
            .pipe(Map::new("double", |n: &i64| n * 2))
            .expect("i64 into i64")
    }

    #[test]
    fn string_output_cannot_feed_integer_input() {
        let render = Pipeline::new(Map::new("render", |n: &i64| n.to_string()));
        let violation = render
            .pipe(Map::new("double", |n: &i64| n * 2))
            .expect_err("String into i64 must be rejected");
        assert_eq!(violation.contract.name, OPERATIONS_MUST_BE_COMPATIBLE);
        let evidence = violation.evidence.to_string();
        assert!(evidence.contains("String"), "{evidence}");
        assert!(evidence.contains("i64"), "{evidence}");
        assert_eq!(render.len(), 1);
    }

    #[test]
    fn applies_every_stage_in_order() {
        let output: Term<i64> =
            evens_doubled().apply(&Term::from_elements(vec![1_i64, 2, 3, 4]), BlockSize::All);
        assert_eq!(output, Term::from_elements(vec![4, 8]));
    }

    #[test]
    fn wrong_end_types_yield_error_terms() {
        let pipeline = evens_doubled();
        let output: Term<i64> = pipeline.apply(&Term::single("1".to_string()), BlockSize::All);
        assert_eq!(
            output.violation().map(|v| v.contract.name.as_str()),
            Some(PIPELINE_INPUT_TYPE_MUST_MATCH)
        );
        let output: Term<String> = pipeline.apply(&Term::single(1_i64), BlockSize::All);
        assert_eq!(
            output.violation().map(|v| v.contract.name.as_str()),
            Some(PIPELINE_OUTPUT_TYPE_MUST_MATCH)
        );
    }

    #[test]
    fn fused_propagation_pushes_bounds_back() {
        let pipeline = Pipeline::new(Map::new("inc", |n: &i64| n + 1))
            .pipe(Insert::new("insert", 0, vec![0_i64]))
            .and_then(|p| p.pipe(Map::new("double", |n: &i64| n * 2)))
            .expect("well typed");
        assert_eq!(
            pipeline.stage_limits(BlockSize::Exactly(3)),
            vec![BlockSize::All, BlockSize::All, BlockSize::Exactly(3)]
        );
        let fused = pipeline.with_propagation(Propagation::Fused);
        assert_eq!(
            fused.stage_limits(BlockSize::Exactly(3)),
            vec![BlockSize::Exactly(3); 3]
        );
    }

    #[test]
    fn fused_and_last_stage_agree_on_results() {
        let pipeline = Pipeline::new(Filter::new("odd", predicate(|n: &i64| n % 2 != 0)))
            .pipe(Sort::<i64>::descending())
            .expect("well typed");
        let fused = pipeline.clone().with_propagation(Propagation::Fused);
        let input = Term::from_elements(vec![5_i64, 2, 9, 1, 7]);
        for limit in [BlockSize::Exactly(0), BlockSize::Exactly(2), BlockSize::All] {
            let a: Term<i64> = pipeline.apply(&input, limit);
            let b: Term<i64> = fused.apply(&input, limit);
            assert_eq!(a, b, "limit {limit}");
        }

        let maps = Pipeline::new(Map::new("inc", |n: &i64| n + 1))
            .pipe(Map::new("double", |n: &i64| n * 2))
            .expect("well typed");
        let fused_maps = maps.clone().with_propagation(Propagation::Fused);
        assert_eq!(
            fused_maps.stage_limits(BlockSize::Exactly(0)),
            vec![BlockSize::Exactly(1), BlockSize::Exactly(0)]
        );
        let input = Term::from_elements(vec![1_i64, 2, 3]);
        let a: Term<i64> = maps.apply(&input, BlockSize::Exactly(0));
        let b: Term<i64> = fused_maps.apply(&input, BlockSize::Exactly(0));
        assert_eq!(a, Term::empty());
        assert_eq!(b, Term::empty());
    }

    #[test]
    fn propagation_parses_from_config_text() {
        assert_eq!("fused".parse::<Propagation>(), Ok(Propagation::Fused));
        assert_eq!("last_stage".parse::<Propagation>(), Ok(Propagation::LastStage));
        assert!("eager".parse::<Propagation>().is_err());
    }
}
