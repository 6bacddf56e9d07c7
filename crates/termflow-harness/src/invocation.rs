//! One call of an operation, captured so it can be run and judged.

use crate::contracts::OperationMustNotPanic;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use termflow_contract::{Advocate, Contract, Violation};
use termflow_pipeline::ElementalOperation;
use termflow_term::{BlockSize, Idempotent, Term, TermMustNotBePending, panic_message};

type Outcome<V> = Result<Idempotent<V>, Violation>;

/// `operation` applied to `input` with `block_size`.
///
/// The operation runs at most once; every contract checked against the
/// invocation judges the same recorded outcome.
pub struct Invocation<O: ElementalOperation> {
    operation: O,
    input: Term<O::Input>,
    block_size: BlockSize,
    outcome: OnceLock<Outcome<O::Output>>,
}

impl<O: ElementalOperation> Invocation<O> {
    pub fn new(operation: O, input: Term<O::Input>, block_size: BlockSize) -> Self {
        Self {
            operation,
            input,
            block_size,
            outcome: OnceLock::new(),
        }
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    pub fn input(&self) -> &Term<O::Input> {
        &self.input
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    /// Run the operation, or return the outcome of the earlier run.
    ///
    /// An Error output comes back as its violation. A broken guarantee is
    /// caught and returned as the escalated violation; any other panic is
    /// reported against `operation_must_not_panic`.
    pub fn execute(&self) -> Outcome<O::Output> {
        self.outcome().clone()
    }

    /// The recorded outcome, running the operation on first use.
    pub fn outcome(&self) -> &Outcome<O::Output> {
        self.outcome.get_or_init(|| self.run())
    }

    fn run(&self) -> Outcome<O::Output> {
        let applied = catch_unwind(AssertUnwindSafe(|| {
            self.operation.apply(&self.input, self.block_size)
        }));
        let output = match applied {
            Ok(output) => output,
            Err(payload) => {
                let violation = match payload.downcast::<Violation>() {
                    Ok(violation) => *violation,
                    Err(payload) => OperationMustNotPanic.violation(
                        self.operation.name(),
                        panic_message(payload.as_ref()).as_str(),
                        None,
                    ),
                };
                tracing::debug!(
                    operation = self.operation.name(),
                    contract = %violation.contract,
                    "invocation panicked"
                );
                return Err(violation);
            }
        };
        match output.violation() {
            Some(violation) => Err(violation.clone()),
            None => Idempotent::try_new(output).map_err(|pending| {
                TermMustNotBePending.violation(
                    self.operation.name(),
                    &Term::Pending(pending),
                    None,
                )
            }),
        }
    }

    /// Check `contract` against this invocation on behalf of the operation.
    pub fn verify<C>(&self, contract: &C) -> Result<(), Violation>
    where
        C: Contract<Self>,
    {
        Advocate::new(self.operation.name()).enforce(contract, self)
    }

    /// JSON description used as evidence by the harness contracts.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "operation": self.operation.name(),
            "input": self.input.summary(),
            "blockSize": self.block_size.to_string(),
        })
    }
}

impl<O: ElementalOperation> fmt::Debug for Invocation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("operation", &self.operation.name())
            .field("input", &self.input.variant_name())
            .field("block_size", &self.block_size)
            .finish()
    }
}
