//! Contracts raised while composing and applying operations.

use crate::element_type::ElementType;
use serde_json::{Value, json};
use termflow_contract::{Contract, ContractDescriptor, ContractKind, Filter, FilterState};
use termflow_term::{BlockSize, Length, Term};

pub const OPERATIONS_MUST_BE_COMPATIBLE: &str = "operations_must_be_compatible";
pub const PIPELINE_INPUT_TYPE_MUST_MATCH: &str = "pipeline_input_type_must_match";
pub const PIPELINE_OUTPUT_TYPE_MUST_MATCH: &str = "pipeline_output_type_must_match";
pub const OPERATION_MUST_HONOR_BLOCK_SIZE: &str = "operation_must_honor_block_size";
pub const SORT_INPUT_MUST_BE_FINITE: &str = "sort_input_must_be_finite";

pub const CONTRACTS: &[ContractDescriptor] = &[
    ContractDescriptor::obligation(
        OPERATIONS_MUST_BE_COMPATIBLE,
        "downstream operation input type must equal upstream output type",
    ),
    ContractDescriptor::obligation(
        PIPELINE_INPUT_TYPE_MUST_MATCH,
        "applied term element type must equal the pipeline input type",
    ),
    ContractDescriptor::obligation(
        PIPELINE_OUTPUT_TYPE_MUST_MATCH,
        "requested output element type must equal the pipeline output type",
    ),
    ContractDescriptor::guarantee(
        OPERATION_MUST_HONOR_BLOCK_SIZE,
        "operation must not produce more elements than requested",
    ),
    ContractDescriptor::obligation(
        SORT_INPUT_MUST_BE_FINITE,
        "an infinite term cannot be sorted",
    ),
];

fn describe(name: &str) -> String {
    CONTRACTS
        .iter()
        .find(|descriptor| descriptor.name == name)
        .map(|descriptor| descriptor.description.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// The joint between two adjacent stages.
#[derive(Debug, Clone)]
pub struct StageJoint {
    pub upstream_stage: String,
    pub upstream_output: ElementType,
    pub downstream_stage: String,
    pub downstream_input: ElementType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationsMustBeCompatible;

impl Filter<StageJoint> for OperationsMustBeCompatible {
    fn filter(&self, joint: &StageJoint) -> FilterState {
        FilterState::from_bool(joint.upstream_output == joint.downstream_input)
    }
}

impl Contract<StageJoint> for OperationsMustBeCompatible {
    fn name(&self) -> &str {
        OPERATIONS_MUST_BE_COMPATIBLE
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(OPERATIONS_MUST_BE_COMPATIBLE)
    }

    fn evidence(&self, joint: &StageJoint) -> Value {
        json!({
            "upstreamStage": joint.upstream_stage,
            "upstreamOutput": joint.upstream_output,
            "downstreamStage": joint.downstream_stage,
            "downstreamInput": joint.downstream_input,
        })
    }
}

/// Declared versus requested element type at one end of a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct TypeAgreement {
    pub declared: ElementType,
    pub requested: ElementType,
}

fn agreement_evidence(agreement: &TypeAgreement) -> Value {
    json!({
        "declared": agreement.declared,
        "requested": agreement.requested,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineInputTypeMustMatch;

impl Filter<TypeAgreement> for PipelineInputTypeMustMatch {
    fn filter(&self, agreement: &TypeAgreement) -> FilterState {
        FilterState::from_bool(agreement.declared == agreement.requested)
    }
}

impl Contract<TypeAgreement> for PipelineInputTypeMustMatch {
    fn name(&self) -> &str {
        PIPELINE_INPUT_TYPE_MUST_MATCH
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(PIPELINE_INPUT_TYPE_MUST_MATCH)
    }

    fn evidence(&self, agreement: &TypeAgreement) -> Value {
        agreement_evidence(agreement)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOutputTypeMustMatch;

impl Filter<TypeAgreement> for PipelineOutputTypeMustMatch {
    fn filter(&self, agreement: &TypeAgreement) -> FilterState {
        FilterState::from_bool(agreement.declared == agreement.requested)
    }
}

impl Contract<TypeAgreement> for PipelineOutputTypeMustMatch {
    fn name(&self) -> &str {
        PIPELINE_OUTPUT_TYPE_MUST_MATCH
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(PIPELINE_OUTPUT_TYPE_MUST_MATCH)
    }

    fn evidence(&self, agreement: &TypeAgreement) -> Value {
        agreement_evidence(agreement)
    }
}

/// Guarantee that an operation's output fits the requested block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationMustHonorBlockSize {
    pub limit: BlockSize,
}

impl<V> Filter<Term<V>> for OperationMustHonorBlockSize {
    fn filter(&self, output: &Term<V>) -> FilterState {
        FilterState::from_bool(self.limit.admits(output.length()))
    }
}

impl<V> Contract<Term<V>> for OperationMustHonorBlockSize {
    fn name(&self) -> &str {
        OPERATION_MUST_HONOR_BLOCK_SIZE
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Guarantee
    }

    fn description(&self) -> String {
        describe(OPERATION_MUST_HONOR_BLOCK_SIZE)
    }

    fn evidence(&self, output: &Term<V>) -> Value {
        json!({
            "blockSize": self.limit.to_string(),
            "produced": output.summary(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortInputMustBeFinite;

impl<V> Filter<Term<V>> for SortInputMustBeFinite {
    fn filter(&self, input: &Term<V>) -> FilterState {
        FilterState::from_bool(matches!(input.length(), Length::Finite(_)))
    }
}

impl<V> Contract<Term<V>> for SortInputMustBeFinite {
    fn name(&self) -> &str {
        SORT_INPUT_MUST_BE_FINITE
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(SORT_INPUT_MUST_BE_FINITE)
    }

    fn evidence(&self, input: &Term<V>) -> Value {
        input.summary()
    }
}
