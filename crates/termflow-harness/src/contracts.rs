//! Contracts over invocations and over the terms they produce.
//!
//! Invocation contracts are filters over [`Invocation`], so test suites can
//! combine them with `and` / `or` / `not` before enforcing them.

use crate::invocation::Invocation;
use serde_json::{Value, json};
use termflow_contract::{Contract, ContractDescriptor, ContractKind, Filter, FilterState, Violation};
use termflow_pipeline::ElementalOperation;
use termflow_term::{BlockSize, Length, Term};

pub const OPERATION_MUST_FAIL: &str = "operation_must_fail";
pub const OPERATION_OUTPUT_MUST_MEET: &str = "operation_output_must_meet";
pub const OPERATION_MUST_NOT_PANIC: &str = "operation_must_not_panic";
pub const TERM_MUST_HAVE_LENGTH: &str = "term_must_have_length";
pub const ELEMENTS_MUST_MATCH: &str = "elements_must_match";
pub const TERM_MUST_EQUAL: &str = "term_must_equal";

pub const CONTRACTS: &[ContractDescriptor] = &[
    ContractDescriptor::obligation(
        OPERATION_MUST_FAIL,
        "operation must reject the invocation",
    ),
    ContractDescriptor::obligation(
        OPERATION_OUTPUT_MUST_MEET,
        "operation must succeed with an output meeting the output contract",
    ),
    ContractDescriptor::guarantee(
        OPERATION_MUST_NOT_PANIC,
        "operation must report failures as violations instead of panicking",
    ),
    ContractDescriptor::obligation(
        TERM_MUST_HAVE_LENGTH,
        "term must have the expected length",
    ),
    ContractDescriptor::obligation(
        ELEMENTS_MUST_MATCH,
        "every element of the term must match the filter",
    ),
    ContractDescriptor::obligation(TERM_MUST_EQUAL, "term must equal the expected term"),
];

fn describe(name: &str) -> String {
    CONTRACTS
        .iter()
        .find(|descriptor| descriptor.name == name)
        .map(|descriptor| descriptor.description.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Raised for a panic whose payload is not a [`Violation`]. Evidence is the
/// panic message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationMustNotPanic;

impl Filter<str> for OperationMustNotPanic {
    fn filter(&self, _message: &str) -> FilterState {
        FilterState::Discarded
    }
}

impl Contract<str> for OperationMustNotPanic {
    fn name(&self) -> &str {
        OPERATION_MUST_NOT_PANIC
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Guarantee
    }

    fn description(&self) -> String {
        describe(OPERATION_MUST_NOT_PANIC)
    }

    fn evidence(&self, message: &str) -> Value {
        json!({ "panic": message })
    }
}

/// Kept iff executing the invocation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationMustFail;

impl<O: ElementalOperation> Filter<Invocation<O>> for OperationMustFail {
    fn filter(&self, invocation: &Invocation<O>) -> FilterState {
        FilterState::from_bool(invocation.outcome().is_err())
    }
}

impl<O: ElementalOperation> Contract<Invocation<O>> for OperationMustFail {
    fn name(&self) -> &str {
        OPERATION_MUST_FAIL
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(OPERATION_MUST_FAIL)
    }

    fn evidence(&self, invocation: &Invocation<O>) -> Value {
        let mut evidence = invocation.summary();
        if let Ok(output) = invocation.outcome() {
            evidence["output"] = output.summary();
        }
        evidence
    }
}

/// Kept iff the invocation succeeds and its output meets `output`.
///
/// The violation carries the reason as its cause: either the execution
/// failure or the output contract's own violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationOutputMustMeet<C> {
    output: C,
}

impl<C> OperationOutputMustMeet<C> {
    pub fn new(output: C) -> Self {
        Self { output }
    }

    pub fn output_contract(&self) -> &C {
        &self.output
    }
}

impl<O, C> Filter<Invocation<O>> for OperationOutputMustMeet<C>
where
    O: ElementalOperation,
    C: Contract<Term<O::Output>>,
{
    fn filter(&self, invocation: &Invocation<O>) -> FilterState {
        match invocation.outcome() {
            Ok(output) => self.output.check(output.as_term()),
            Err(_) => FilterState::Discarded,
        }
    }
}

impl<O, C> Contract<Invocation<O>> for OperationOutputMustMeet<C>
where
    O: ElementalOperation,
    C: Contract<Term<O::Output>>,
{
    fn name(&self) -> &str {
        OPERATION_OUTPUT_MUST_MEET
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        format!(
            "{}: {}",
            describe(OPERATION_OUTPUT_MUST_MEET),
            self.output.description()
        )
    }

    fn evidence(&self, invocation: &Invocation<O>) -> Value {
        let mut evidence = invocation.summary();
        evidence["outputContract"] = json!(self.output.id());
        evidence
    }

    fn violation(
        &self,
        plaintiff: &str,
        invocation: &Invocation<O>,
        cause: Option<Violation>,
    ) -> Violation {
        let reason = match invocation.outcome() {
            Err(failure) => Some(failure.clone()),
            Ok(output) if self.output.check(output.as_term()).is_discarded() => {
                Some(self.output.violation(plaintiff, output.as_term(), None))
            }
            Ok(_) => None,
        };
        let violation = Violation::new(
            <OperationOutputMustMeet<C> as Contract<Invocation<O>>>::id(self),
            <OperationOutputMustMeet<C> as Contract<Invocation<O>>>::description(self),
            plaintiff,
            self.evidence(invocation),
        );
        match reason.or(cause) {
            Some(reason) => violation.caused_by(reason),
            None => violation,
        }
    }
}

/// Kept iff the term's logical length equals `expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermMustHaveLength {
    expected: Length,
}

impl TermMustHaveLength {
    pub fn new(expected: Length) -> Self {
        Self { expected }
    }

    pub fn finite(count: usize) -> Self {
        Self::new(Length::Finite(count))
    }

    pub fn infinite() -> Self {
        Self::new(Length::Infinite)
    }
}

impl<V> Filter<Term<V>> for TermMustHaveLength {
    fn filter(&self, term: &Term<V>) -> FilterState {
        FilterState::from_bool(term.length() == self.expected)
    }
}

impl<V> Contract<Term<V>> for TermMustHaveLength {
    fn name(&self) -> &str {
        TERM_MUST_HAVE_LENGTH
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(TERM_MUST_HAVE_LENGTH)
    }

    fn evidence(&self, term: &Term<V>) -> Value {
        json!({
            "expected": self.expected,
            "actual": term.length(),
            "term": term.summary(),
        })
    }
}

/// Kept iff every element read from the term is kept by `filter`.
///
/// Cyclical terms are read through one pass of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementsMustMatch<F> {
    filter: F,
}

impl<F> ElementsMustMatch<F> {
    pub fn new(filter: F) -> Self {
        Self { filter }
    }

    fn first_mismatch<V>(&self, term: &Term<V>) -> Option<usize>
    where
        V: Clone + Send + Sync + 'static,
        F: Filter<V>,
    {
        term.elements(BlockSize::All)
            .position(|element| self.filter.filter(&element).is_discarded())
    }
}

impl<V, F> Filter<Term<V>> for ElementsMustMatch<F>
where
    V: Clone + Send + Sync + 'static,
    F: Filter<V>,
{
    fn filter(&self, term: &Term<V>) -> FilterState {
        FilterState::from_bool(self.first_mismatch(term).is_none())
    }
}

impl<V, F> Contract<Term<V>> for ElementsMustMatch<F>
where
    V: Clone + Send + Sync + 'static,
    F: Filter<V>,
{
    fn name(&self) -> &str {
        ELEMENTS_MUST_MATCH
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(ELEMENTS_MUST_MATCH)
    }

    fn evidence(&self, term: &Term<V>) -> Value {
        json!({
            "firstMismatch": self.first_mismatch(term),
            "term": term.summary(),
        })
    }
}

/// Kept iff the term equals `expected`, variant and elements alike.
#[derive(Debug, Clone)]
pub struct TermMustEqual<V> {
    expected: Term<V>,
}

impl<V> TermMustEqual<V> {
    pub fn new(expected: Term<V>) -> Self {
        Self { expected }
    }
}

impl<V: PartialEq> Filter<Term<V>> for TermMustEqual<V> {
    fn filter(&self, term: &Term<V>) -> FilterState {
        FilterState::from_bool(*term == self.expected)
    }
}

impl<V: PartialEq> Contract<Term<V>> for TermMustEqual<V> {
    fn name(&self) -> &str {
        TERM_MUST_EQUAL
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(TERM_MUST_EQUAL)
    }

    fn evidence(&self, term: &Term<V>) -> Value {
        json!({
            "expected": self.expected.summary(),
            "actual": term.summary(),
        })
    }
}
