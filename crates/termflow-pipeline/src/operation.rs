//! Elemental operations: pure, bounded maps from one term to another.
//!
//! An operation implements [`ElementalOperation::transform`] over an input
//! that is already resolved and non-empty; [`ElementalOperation::apply`]
//! wraps it with the shared protocol:
//!
//! 1. resolve the input (unbounded wait);
//! 2. Empty or Error input short-circuits to an Error term raised against
//!    `term_must_be_non_empty`, with the input's own violation as cause;
//! 3. `Exactly(0)` returns Empty without reading anything;
//! 4. otherwise `transform`, then two guarantees on its output: not
//!    pending, and no more elements than requested.

use crate::contracts::OperationMustHonorBlockSize;
use crate::element_type::ElementType;
use termflow_contract::{Advocate, Contract, escalate};
use termflow_term::{AwaitPolicy, BlockSize, Idempotent, Term, TermMustBeNonEmpty, TermMustNotBePending};

pub trait ElementalOperation: Send + Sync {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    /// Plaintiff name used in violations and logs.
    fn name(&self) -> &str;

    /// Produce at most `limit` output elements from `input`.
    ///
    /// `input` is never Pending, Empty or Error, and `limit` is never
    /// `Exactly(0)`. The result must not be Pending.
    fn transform(&self, input: &Idempotent<Self::Input>, limit: BlockSize) -> Term<Self::Output>;

    fn input_type(&self) -> ElementType {
        ElementType::of::<Self::Input>()
    }

    fn output_type(&self) -> ElementType {
        ElementType::of::<Self::Output>()
    }

    /// How many input elements are needed to produce `output` elements.
    /// `All` is always a safe answer.
    fn input_demand(&self, output: BlockSize) -> BlockSize {
        let _ = output;
        BlockSize::All
    }

    fn apply(&self, input: &Term<Self::Input>, limit: BlockSize) -> Term<Self::Output> {
        apply_operation(self, input, limit)
    }

    /// Compose statically; the element types must agree at compile time.
    fn then<B>(self, next: B) -> Then<Self, B>
    where
        Self: Sized,
        B: ElementalOperation<Input = Self::Output>,
    {
        Then::new(self, next)
    }
}

/// The shared apply protocol. See the module documentation.
pub fn apply_operation<O>(operation: &O, input: &Term<O::Input>, limit: BlockSize) -> Term<O::Output>
where
    O: ElementalOperation + ?Sized,
{
    let advocate = Advocate::new(operation.name());
    // Resolved inputs are only borrowed until a transform needs them.
    let waited = match input {
        Term::Pending(pending) => Some(pending.wait(AwaitPolicy::Unbounded)),
        _ => None,
    };
    let view = waited.as_ref().map_or(input, Idempotent::as_term);

    if let Err(violation) = advocate.enforce(&TermMustBeNonEmpty, view) {
        let violation = match view.violation() {
            Some(cause) => violation.caused_by(cause.clone()),
            None => violation,
        };
        tracing::warn!(
            operation = operation.name(),
            contract = %violation.contract,
            input = %view.summary(),
            "operation input rejected"
        );
        return Term::error(violation);
    }

    if limit.is_zero() {
        tracing::debug!(operation = operation.name(), "zero elements requested; input not read");
        return Term::empty();
    }

    let input = match waited {
        Some(input) => input,
        None => input.idempotent(AwaitPolicy::Unbounded),
    };
    let output = operation.transform(&input, limit);
    ensure(&advocate, &TermMustNotBePending, &output);
    ensure(&advocate, &OperationMustHonorBlockSize { limit }, &output);
    tracing::trace!(
        operation = operation.name(),
        %limit,
        output = %output.summary(),
        "operation applied"
    );
    output
}

/// Enforce a guarantee; escalation never returns.
fn ensure<V, C: Contract<Term<V>>>(advocate: &Advocate, contract: &C, output: &Term<V>) {
    if let Err(violation) = advocate.enforce(contract, output) {
        escalate(violation);
    }
}

/// `first` followed by `second`, with the bound on `second` propagated back
/// to `first` through `input_demand`.
pub struct Then<A, B> {
    name: String,
    first: A,
    second: B,
}

impl<A, B> Then<A, B>
where
    A: ElementalOperation,
    B: ElementalOperation<Input = A::Output>,
{
    pub fn new(first: A, second: B) -> Self {
        Self {
            name: format!("{} | {}", first.name(), second.name()),
            first,
            second,
        }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A, B> ElementalOperation for Then<A, B>
where
    A: ElementalOperation,
    B: ElementalOperation<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: &Idempotent<A::Input>, limit: BlockSize) -> Term<B::Output> {
        let middle = self
            .first
            .apply(input.as_term(), self.second.input_demand(limit).upstream());
        self.second.apply(&middle, limit)
    }

    fn input_demand(&self, output: BlockSize) -> BlockSize {
        self.first.input_demand(self.second.input_demand(output).upstream())
    }
}
