//! Contracts raised by terms, pending cells and synchronicity wrappers.

use crate::term::Term;
use serde_json::{Value, json};
use std::time::Duration;
use termflow_contract::{Contract, ContractDescriptor, ContractKind, Filter, FilterState};

pub const TERM_MUST_BE_NON_EMPTY: &str = "term_must_be_non_empty";
pub const TERM_MUST_NOT_BE_PENDING: &str = "term_must_not_be_pending";
pub const MANY_MUST_HAVE_AT_LEAST_TWO_ELEMENTS: &str = "many_must_have_at_least_two_elements";
pub const CYCLE_MUST_NOT_BE_EMPTY: &str = "cycle_must_not_be_empty";
pub const PENDING_MUST_RESOLVE_WITHIN_TIMEOUT: &str = "pending_must_resolve_within_timeout";
pub const PENDING_MUST_RESOLVE_AT_MOST_ONCE: &str = "pending_must_resolve_at_most_once";
pub const PENDING_MUST_NOT_RESOLVE_TO_ITSELF: &str = "pending_must_not_resolve_to_itself";
pub const RESOLVER_MUST_RESOLVE_BEFORE_DROP: &str = "resolver_must_resolve_before_drop";
pub const WAIT_MUST_NOT_BE_CANCELLED: &str = "wait_must_not_be_cancelled";
pub const CONTINUATION_MUST_NOT_PANIC: &str = "continuation_must_not_panic";

/// Every contract this crate can raise.
pub const CONTRACTS: &[ContractDescriptor] = &[
    ContractDescriptor::obligation(TERM_MUST_BE_NON_EMPTY, "term must be non-empty"),
    ContractDescriptor::guarantee(TERM_MUST_NOT_BE_PENDING, "term must not be pending"),
    ContractDescriptor::obligation(
        MANY_MUST_HAVE_AT_LEAST_TWO_ELEMENTS,
        "a many term must have at least two elements",
    ),
    ContractDescriptor::obligation(
        CYCLE_MUST_NOT_BE_EMPTY,
        "a cyclical term must repeat at least one element",
    ),
    ContractDescriptor::obligation(
        PENDING_MUST_RESOLVE_WITHIN_TIMEOUT,
        "pending term must resolve within the caller's timeout",
    ),
    ContractDescriptor::obligation(
        PENDING_MUST_RESOLVE_AT_MOST_ONCE,
        "pending term must be resolved at most once",
    ),
    ContractDescriptor::obligation(
        PENDING_MUST_NOT_RESOLVE_TO_ITSELF,
        "pending term must not be resolved to itself",
    ),
    ContractDescriptor::obligation(
        RESOLVER_MUST_RESOLVE_BEFORE_DROP,
        "producer must resolve a pending term before dropping every resolver",
    ),
    ContractDescriptor::obligation(
        WAIT_MUST_NOT_BE_CANCELLED,
        "caller stopped waiting for the pending term",
    ),
    ContractDescriptor::guarantee(
        CONTINUATION_MUST_NOT_PANIC,
        "piped continuation must return a term instead of panicking",
    ),
];

fn describe(name: &str) -> String {
    CONTRACTS
        .iter()
        .find(|descriptor| descriptor.name == name)
        .map(|descriptor| descriptor.description.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Kept unless the term is empty, an error, or still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermMustBeNonEmpty;

impl<V> Filter<Term<V>> for TermMustBeNonEmpty {
    fn filter(&self, term: &Term<V>) -> FilterState {
        FilterState::from_bool(!(term.is_empty() || term.is_error() || term.is_pending()))
    }
}

impl<V> Contract<Term<V>> for TermMustBeNonEmpty {
    fn name(&self) -> &str {
        TERM_MUST_BE_NON_EMPTY
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(TERM_MUST_BE_NON_EMPTY)
    }

    fn evidence(&self, term: &Term<V>) -> Value {
        term.summary()
    }
}

/// Guarantee on anything that promised an idempotent result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermMustNotBePending;

impl<V> Filter<Term<V>> for TermMustNotBePending {
    fn filter(&self, term: &Term<V>) -> FilterState {
        FilterState::from_bool(!term.is_pending())
    }
}

impl<V> Contract<Term<V>> for TermMustNotBePending {
    fn name(&self) -> &str {
        TERM_MUST_NOT_BE_PENDING
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Guarantee
    }

    fn description(&self) -> String {
        describe(TERM_MUST_NOT_BE_PENDING)
    }

    fn evidence(&self, term: &Term<V>) -> Value {
        term.summary()
    }
}

/// Evidence is the element count handed to `Many::new`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManyMustHaveAtLeastTwoElements;

impl Filter<usize> for ManyMustHaveAtLeastTwoElements {
    fn filter(&self, length: &usize) -> FilterState {
        FilterState::from_bool(*length >= 2)
    }
}

impl Contract<usize> for ManyMustHaveAtLeastTwoElements {
    fn name(&self) -> &str {
        MANY_MUST_HAVE_AT_LEAST_TWO_ELEMENTS
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(MANY_MUST_HAVE_AT_LEAST_TWO_ELEMENTS)
    }

    fn evidence(&self, length: &usize) -> Value {
        json!({ "length": length })
    }
}

/// Evidence is the cycle length handed to `Cyclical::new`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleMustNotBeEmpty;

impl Filter<usize> for CycleMustNotBeEmpty {
    fn filter(&self, cycle_length: &usize) -> FilterState {
        FilterState::from_bool(*cycle_length > 0)
    }
}

impl Contract<usize> for CycleMustNotBeEmpty {
    fn name(&self) -> &str {
        CYCLE_MUST_NOT_BE_EMPTY
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(CYCLE_MUST_NOT_BE_EMPTY)
    }

    fn evidence(&self, cycle_length: &usize) -> Value {
        json!({ "cycleLength": cycle_length })
    }
}

/// What a waiter knew when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitEvidence {
    pub timeout: Duration,
    pub max_block: Duration,
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingMustResolveWithinTimeout;

impl Filter<WaitEvidence> for PendingMustResolveWithinTimeout {
    fn filter(&self, wait: &WaitEvidence) -> FilterState {
        FilterState::from_bool(wait.resolved)
    }
}

impl Contract<WaitEvidence> for PendingMustResolveWithinTimeout {
    fn name(&self) -> &str {
        PENDING_MUST_RESOLVE_WITHIN_TIMEOUT
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(PENDING_MUST_RESOLVE_WITHIN_TIMEOUT)
    }

    fn evidence(&self, wait: &WaitEvidence) -> Value {
        json!({
            "timeoutNanoseconds": nanos(wait.timeout),
            "maxBlockNanoseconds": nanos(wait.max_block),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitMustNotBeCancelled;

impl Filter<WaitEvidence> for WaitMustNotBeCancelled {
    fn filter(&self, wait: &WaitEvidence) -> FilterState {
        FilterState::from_bool(wait.resolved)
    }
}

impl Contract<WaitEvidence> for WaitMustNotBeCancelled {
    fn name(&self) -> &str {
        WAIT_MUST_NOT_BE_CANCELLED
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(WAIT_MUST_NOT_BE_CANCELLED)
    }

    fn evidence(&self, wait: &WaitEvidence) -> Value {
        json!({
            "cancelled": true,
            "maxBlockNanoseconds": nanos(wait.max_block),
        })
    }
}

/// Evidence for the resolution contracts: whether the cell was already
/// claimed when another resolution was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionEvidence {
    pub already_claimed: bool,
    pub self_reference: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingMustResolveAtMostOnce;

impl Filter<ResolutionEvidence> for PendingMustResolveAtMostOnce {
    fn filter(&self, attempt: &ResolutionEvidence) -> FilterState {
        FilterState::from_bool(!attempt.already_claimed)
    }
}

impl Contract<ResolutionEvidence> for PendingMustResolveAtMostOnce {
    fn name(&self) -> &str {
        PENDING_MUST_RESOLVE_AT_MOST_ONCE
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(PENDING_MUST_RESOLVE_AT_MOST_ONCE)
    }

    fn evidence(&self, attempt: &ResolutionEvidence) -> Value {
        json!({ "alreadyClaimed": attempt.already_claimed })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingMustNotResolveToItself;

impl Filter<ResolutionEvidence> for PendingMustNotResolveToItself {
    fn filter(&self, attempt: &ResolutionEvidence) -> FilterState {
        FilterState::from_bool(!attempt.self_reference)
    }
}

impl Contract<ResolutionEvidence> for PendingMustNotResolveToItself {
    fn name(&self) -> &str {
        PENDING_MUST_NOT_RESOLVE_TO_ITSELF
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(PENDING_MUST_NOT_RESOLVE_TO_ITSELF)
    }

    fn evidence(&self, attempt: &ResolutionEvidence) -> Value {
        json!({ "selfReference": attempt.self_reference })
    }
}

/// Raised on behalf of waiters when the last resolver disappears unused.
/// Evidence is the producer-declared bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverMustResolveBeforeDrop;

impl Filter<Duration> for ResolverMustResolveBeforeDrop {
    fn filter(&self, _max_block: &Duration) -> FilterState {
        FilterState::Discarded
    }
}

impl Contract<Duration> for ResolverMustResolveBeforeDrop {
    fn name(&self) -> &str {
        RESOLVER_MUST_RESOLVE_BEFORE_DROP
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Obligation
    }

    fn description(&self) -> String {
        describe(RESOLVER_MUST_RESOLVE_BEFORE_DROP)
    }

    fn evidence(&self, max_block: &Duration) -> Value {
        json!({ "maxBlockNanoseconds": nanos(*max_block) })
    }
}

/// Evidence is the panic message recovered from the unwind payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuationMustNotPanic;

impl Filter<str> for ContinuationMustNotPanic {
    fn filter(&self, _panic_message: &str) -> FilterState {
        FilterState::Discarded
    }
}

impl Contract<str> for ContinuationMustNotPanic {
    fn name(&self) -> &str {
        CONTINUATION_MUST_NOT_PANIC
    }

    fn kind(&self) -> ContractKind {
        ContractKind::Guarantee
    }

    fn description(&self) -> String {
        describe(CONTINUATION_MUST_NOT_PANIC)
    }

    fn evidence(&self, panic_message: &str) -> Value {
        json!({ "panic": panic_message })
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(violation) = payload.downcast_ref::<termflow_contract::Violation>() {
        violation.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_constant_is_registered_once() {
        let names = [
            TERM_MUST_BE_NON_EMPTY,
            TERM_MUST_NOT_BE_PENDING,
            MANY_MUST_HAVE_AT_LEAST_TWO_ELEMENTS,
            CYCLE_MUST_NOT_BE_EMPTY,
            PENDING_MUST_RESOLVE_WITHIN_TIMEOUT,
            PENDING_MUST_RESOLVE_AT_MOST_ONCE,
            PENDING_MUST_NOT_RESOLVE_TO_ITSELF,
            RESOLVER_MUST_RESOLVE_BEFORE_DROP,
            WAIT_MUST_NOT_BE_CANCELLED,
            CONTINUATION_MUST_NOT_PANIC,
        ];
        for name in names {
            assert_eq!(
                CONTRACTS.iter().filter(|d| d.name == name).count(),
                1,
                "{name} should be registered exactly once"
            );
        }
        assert_eq!(CONTRACTS.len(), names.len());
    }

    #[test]
    fn non_empty_rejects_empty_error_and_pending() {
        let contract = TermMustBeNonEmpty;
        assert!(contract.check(&Term::<i64>::empty()).is_discarded());
        assert!(contract.check(&Term::single(1)).is_kept());
        let (pending, _resolver) = Term::<i64>::pending(Duration::ZERO);
        assert!(contract.check(&pending).is_discarded());
    }

    #[test]
    fn timeout_evidence_reports_nanoseconds() {
        let wait = WaitEvidence {
            timeout: Duration::ZERO,
            max_block: Duration::from_millis(2),
            resolved: false,
        };
        let violation = PendingMustResolveWithinTimeout.violation("pending_term", &wait, None);
        assert_eq!(
            violation.evidence,
            json!({"timeoutNanoseconds": 0, "maxBlockNanoseconds": 2_000_000})
        );
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
