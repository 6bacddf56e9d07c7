//! Contracts: named filters that know how to explain a failure.
//!
//! Two kinds of contract exist, distinguished by who is at fault:
//!
//! - **Obligation**: a precondition the *caller* must meet. Discovering a
//!   broken obligation is recoverable; the callee rejects the call or returns
//!   an Error term.
//! - **Guarantee**: a postcondition the *implementer* promised. Discovering a
//!   broken guarantee means the implementation is defective; the violation is
//!   escalated and never converted into an ordinary value.
//!
//! Contracts are stateless value types. Identity is the [`ContractId`] tag,
//! never the concrete Rust type.

use crate::filter::{Filter, FilterState};
use crate::violation::Violation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who is at fault when the contract is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Caller's fault. Recoverable.
    Obligation,
    /// Implementer's fault. Fatal to the operation that made the promise.
    Guarantee,
}

impl ContractKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Obligation => "obligation",
            Self::Guarantee => "guarantee",
        }
    }

    pub fn is_fatal(self) -> bool {
        self == Self::Guarantee
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tag identifying a contract: its stable name plus its kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub name: String,
    pub kind: ContractKind,
}

impl ContractId {
    pub fn new(name: impl Into<String>, kind: ContractKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn obligation(name: impl Into<String>) -> Self {
        Self::new(name, ContractKind::Obligation)
    }

    pub fn guarantee(name: impl Into<String>) -> Self {
        Self::new(name, ContractKind::Guarantee)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// A named rule over some evidence type `E`.
///
/// `check` is the filter; `violation` is the factory that turns discarded
/// evidence into a [`Violation`]. Implementors provide the filter plus
/// `name`, `kind`, `description` and `evidence`; the rest is derived.
pub trait Contract<E: ?Sized>: Filter<E> {
    /// Stable snake_case name. Part of the witness ID.
    fn name(&self) -> &str;

    fn kind(&self) -> ContractKind;

    /// Human-readable statement of the rule, e.g. "term must be non-empty".
    fn description(&self) -> String;

    /// Render the offending evidence as JSON for the violation record.
    fn evidence(&self, evidence: &E) -> Value;

    fn id(&self) -> ContractId {
        ContractId::new(self.name(), self.kind())
    }

    fn check(&self, evidence: &E) -> FilterState {
        self.filter(evidence)
    }

    fn violation(&self, plaintiff: &str, evidence: &E, cause: Option<Violation>) -> Violation {
        let violation = Violation::new(
            self.id(),
            self.description(),
            plaintiff,
            self.evidence(evidence),
        );
        match cause {
            Some(cause) => violation.caused_by(cause),
            None => violation,
        }
    }
}

impl<E: ?Sized, C: Contract<E> + ?Sized> Contract<E> for &C {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> ContractKind {
        (**self).kind()
    }

    fn description(&self) -> String {
        (**self).description()
    }

    fn evidence(&self, evidence: &E) -> Value {
        (**self).evidence(evidence)
    }

    fn violation(&self, plaintiff: &str, evidence: &E, cause: Option<Violation>) -> Violation {
        (**self).violation(plaintiff, evidence, cause)
    }
}

/// A contract assembled from an arbitrary filter, e.g. an `and`/`or`/`not`
/// composition. Evidence is rendered with the supplied closure.
pub struct Satisfies<F, R> {
    name: String,
    kind: ContractKind,
    description: String,
    filter: F,
    render: R,
}

impl<F, R> Satisfies<F, R> {
    pub fn new(
        name: impl Into<String>,
        kind: ContractKind,
        description: impl Into<String>,
        filter: F,
        render: R,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            filter,
            render,
        }
    }

    pub fn obligation(
        name: impl Into<String>,
        description: impl Into<String>,
        filter: F,
        render: R,
    ) -> Self {
        Self::new(name, ContractKind::Obligation, description, filter, render)
    }

    pub fn guarantee(
        name: impl Into<String>,
        description: impl Into<String>,
        filter: F,
        render: R,
    ) -> Self {
        Self::new(name, ContractKind::Guarantee, description, filter, render)
    }
}

impl<E: ?Sized, F: Filter<E>, R> Filter<E> for Satisfies<F, R> {
    fn filter(&self, value: &E) -> FilterState {
        self.filter.filter(value)
    }
}

impl<E: ?Sized, F: Filter<E>, R: Fn(&E) -> Value> Contract<E> for Satisfies<F, R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ContractKind {
        self.kind
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn evidence(&self, evidence: &E) -> Value {
        (self.render)(evidence)
    }
}

/// Enforces contracts on behalf of one plaintiff (the object under contract).
///
/// Obligations come back as `Err(Violation)` for the caller to handle.
/// Guarantees are escalated: logged at `error` and raised as a panic whose
/// payload is the [`Violation`] itself, so harnesses that catch the unwind
/// can recover the full record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advocate {
    plaintiff: String,
}

impl Advocate {
    pub fn new(plaintiff: impl Into<String>) -> Self {
        Self {
            plaintiff: plaintiff.into(),
        }
    }

    pub fn plaintiff(&self) -> &str {
        &self.plaintiff
    }

    /// Check `contract` against `evidence`.
    ///
    /// Returns `Ok(())` when kept. A discarded obligation returns the
    /// violation; a discarded guarantee never returns.
    pub fn enforce<E: ?Sized, C: Contract<E> + ?Sized>(
        &self,
        contract: &C,
        evidence: &E,
    ) -> Result<(), Violation> {
        if contract.check(evidence).is_kept() {
            return Ok(());
        }
        let violation = contract.violation(&self.plaintiff, evidence, None);
        match contract.kind() {
            ContractKind::Obligation => {
                tracing::debug!(
                    contract = %violation.contract,
                    plaintiff = %self.plaintiff,
                    witness_id = %violation.witness_id,
                    "obligation violated"
                );
                Err(violation)
            }
            ContractKind::Guarantee => escalate(violation),
        }
    }
}

/// Raise a guarantee violation. Never returns.
pub fn escalate(violation: Violation) -> ! {
    tracing::error!(
        contract = %violation.contract,
        plaintiff = %violation.plaintiff,
        witness_id = %violation.witness_id,
        evidence = %violation.evidence,
        "guarantee broken: {}",
        violation.description
    );
    std::panic::panic_any(violation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterExt, predicate};
    use serde_json::json;

    fn non_negative() -> impl Contract<i64> {
        Satisfies::obligation(
            "number_must_be_non_negative",
            "number must be >= 0",
            predicate(|n: &i64| *n >= 0),
            |n: &i64| json!(n),
        )
    }

    #[test]
    fn kept_evidence_passes() {
        let advocate = Advocate::new("counter");
        assert!(advocate.enforce(&non_negative(), &3).is_ok());
    }

    #[test]
    fn discarded_obligation_is_returned() {
        let advocate = Advocate::new("counter");
        let violation = advocate
            .enforce(&non_negative(), &-1)
            .expect_err("negative must be rejected");
        assert_eq!(violation.contract.name, "number_must_be_non_negative");
        assert_eq!(violation.contract.kind, ContractKind::Obligation);
        assert_eq!(violation.plaintiff, "counter");
        assert_eq!(violation.evidence, json!(-1));
    }

    #[test]
    fn discarded_guarantee_panics_with_violation_payload() {
        let contract = Satisfies::guarantee(
            "result_must_be_even",
            "result must be even",
            predicate(|n: &i64| n % 2 == 0),
            |n: &i64| json!(n),
        );
        let advocate = Advocate::new("doubler");
        let caught = std::panic::catch_unwind(|| {
            let _ = advocate.enforce(&contract, &7);
        })
        .expect_err("guarantee must escalate");
        let violation = caught
            .downcast::<Violation>()
            .expect("payload should be the violation");
        assert_eq!(violation.contract, ContractId::guarantee("result_must_be_even"));
        assert_eq!(violation.evidence, json!(7));
    }

    #[test]
    fn composed_filters_become_contracts() {
        let in_range = Satisfies::obligation(
            "index_must_be_in_range",
            "index must be within 0..10",
            predicate(|n: &i64| *n >= 0).and(predicate(|n: &i64| *n < 10)),
            |n: &i64| json!({"index": n}),
        );
        assert!(in_range.check(&9).is_kept());
        assert!(in_range.check(&10).is_discarded());

        let violation = in_range.violation("slice", &10, None);
        assert_eq!(violation.evidence, json!({"index": 10}));
        assert!(violation.cause.is_none());
    }
}
