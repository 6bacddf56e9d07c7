//! Synchronicity: how a consumer obtains a term that may still be pending.
//!
//! A [`Synchronous`] value is already idempotent and reading it never
//! blocks. An [`Asynchronous`] value forces the caller to choose: block with
//! a bound ([`Asynchronous::await_for`]), attach a continuation
//! ([`Asynchronous::pipe`]), or give up ([`Asynchronous::cancel`]).

use crate::block_size::BlockSize;
use crate::contracts::{
    ContinuationMustNotPanic, WaitEvidence, WaitMustNotBeCancelled, panic_message,
};
use crate::pending::{AwaitPolicy, PENDING_PLAINTIFF, Resolver, pending};
use crate::term::{Idempotent, Term};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use termflow_contract::Contract;

/// Plaintiff recorded when a piped continuation panics.
pub const CONTINUATION_PLAINTIFF: &str = "continuation";

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// A term that is known not to be pending.
#[derive(Debug, Clone, PartialEq)]
pub struct Synchronous<V> {
    value: Idempotent<V>,
}

impl<V: Clone> Synchronous<V> {
    pub fn new(value: Idempotent<V>) -> Self {
        Self { value }
    }

    pub fn value(&self) -> Term<V> {
        self.value.as_term().clone()
    }

    pub fn into_value(self) -> Idempotent<V> {
        self.value
    }

    pub fn max_block(&self) -> Duration {
        Duration::ZERO
    }

    pub fn max_block_nanoseconds(&self) -> u64 {
        0
    }
}

/// A term that is, or may become, pending.
#[derive(Debug, Clone)]
pub struct Asynchronous<V> {
    term: Term<V>,
    ceiling: Option<Duration>,
}

impl<V: Clone + Send + Sync + 'static> Asynchronous<V> {
    pub fn new(term: Term<V>) -> Self {
        Self {
            term,
            ceiling: None,
        }
    }

    /// Bound [`await_max`](Self::await_max); `None` leaves it unbounded.
    pub fn with_ceiling(mut self, ceiling: Option<Duration>) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn term(&self) -> &Term<V> {
        &self.term
    }

    pub fn is_resolved(&self) -> bool {
        match &self.term {
            Term::Pending(pending) => pending.is_resolved(),
            _ => true,
        }
    }

    /// The producer's advisory bound on blocking.
    pub fn max_block(&self) -> Duration {
        match &self.term {
            Term::Pending(pending) => pending.max_block(),
            _ => Duration::ZERO,
        }
    }

    pub fn max_block_nanoseconds(&self) -> u64 {
        nanos(self.max_block())
    }

    /// Block for at most `timeout`. On timeout the result is an Error term
    /// whose partial is the untouched pending term.
    pub fn await_for(&self, timeout: Duration) -> Term<V> {
        let policy = if timeout.is_zero() {
            AwaitPolicy::Immediate
        } else {
            AwaitPolicy::Timeout(timeout)
        };
        self.term.idempotent(policy).into_term()
    }

    /// Block for as long as it takes, or until the configured ceiling.
    pub fn await_max(&self) -> Term<V> {
        match self.ceiling {
            Some(ceiling) => self.await_for(ceiling),
            None => self.term.idempotent(AwaitPolicy::Unbounded).into_term(),
        }
    }

    /// Run `continuation` exactly once on the resolved term.
    ///
    /// Runs inline when the term is already resolved. Otherwise returns a
    /// pending term that resolves to the continuation's output on the
    /// resolving thread. Either way a continuation that panics yields an
    /// Error carrying a guarantee violation.
    pub fn pipe<U, F>(&self, continuation: F) -> Term<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(Term<V>) -> Term<U> + Send + 'static,
    {
        let pending_input = match &self.term {
            Term::Pending(pending) => match pending.try_get() {
                Some(value) => return run_continuation(continuation, value.as_term().clone()),
                None => pending.clone(),
            },
            resolved => return run_continuation(continuation, resolved.clone()),
        };

        let (output, resolver) = pending::<U>(pending_input.max_block());
        pending_input.on_resolved(move |value| {
            let term = run_continuation(continuation, value.as_term().clone());
            if let Err(violation) = resolver.resolve(term) {
                tracing::warn!(contract = %violation.contract, "continuation output rejected");
            }
        });
        Term::Pending(output)
    }

    /// Stop waiting.
    ///
    /// A resolved term is returned as is. Otherwise the result is an Error
    /// carrying a cancellation violation, with the pending term as the
    /// partial; the producer is not interrupted.
    pub fn cancel(&self) -> Term<V> {
        let Term::Pending(pending) = &self.term else {
            return self.term.clone();
        };
        if let Some(value) = pending.try_get() {
            return value.as_term().clone();
        }
        let evidence = WaitEvidence {
            timeout: Duration::ZERO,
            max_block: pending.max_block(),
            resolved: false,
        };
        let violation = WaitMustNotBeCancelled.violation(PENDING_PLAINTIFF, &evidence, None);
        tracing::debug!(cell = %pending.id(), "wait cancelled");
        Term::error_with_partial(violation, self.term.clone())
    }

    /// One asynchronous value whose result is every part's elements in
    /// order.
    ///
    /// The first Error part wins. A Cyclical part ends the concatenation:
    /// everything before it becomes header. The joined bound is the largest
    /// part bound.
    pub fn join(parts: Vec<Asynchronous<V>>) -> Asynchronous<V> {
        let max_block = parts
            .iter()
            .map(Asynchronous::max_block)
            .max()
            .unwrap_or(Duration::ZERO);
        let (joined, resolver) = pending::<V>(max_block);
        let state = Arc::new(JoinState {
            remaining: AtomicUsize::new(parts.len()),
            parts: parts.iter().map(|part| part.term.clone()).collect(),
            resolver: Mutex::new(Some(resolver)),
        });
        if parts.is_empty() {
            state.finish();
        }
        for part in parts {
            match &part.term {
                Term::Pending(pending) => {
                    let state = Arc::clone(&state);
                    pending.on_resolved(move |_| state.arrive());
                }
                _ => state.arrive(),
            }
        }
        Asynchronous::new(Term::Pending(joined))
    }
}

struct JoinState<V> {
    remaining: AtomicUsize,
    parts: Vec<Term<V>>,
    resolver: Mutex<Option<Resolver<V>>>,
}

impl<V: Clone + Send + Sync + 'static> JoinState<V> {
    fn arrive(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        let resolver = self
            .resolver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(resolver) = resolver {
            if let Err(violation) = resolver.resolve(concatenate(&self.parts)) {
                tracing::warn!(contract = %violation.contract, "joined term rejected");
            }
        }
    }
}

/// Run a piped continuation, turning a panic into a guarantee violation.
fn run_continuation<V, U, F>(continuation: F, input: Term<V>) -> Term<U>
where
    F: FnOnce(Term<V>) -> Term<U>,
{
    match catch_unwind(AssertUnwindSafe(|| continuation(input))) {
        Ok(term) => term,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let violation =
                ContinuationMustNotPanic.violation(CONTINUATION_PLAINTIFF, message.as_str(), None);
            tracing::error!(
                contract = %violation.contract,
                witness_id = %violation.witness_id,
                panic = %message,
                "guarantee broken: piped continuation panicked"
            );
            Term::error(violation)
        }
    }
}

fn concatenate<V: Clone + Send + Sync + 'static>(parts: &[Term<V>]) -> Term<V> {
    let mut elements = Vec::new();
    for part in parts {
        match part.idempotent(AwaitPolicy::Unbounded).into_term() {
            Term::Error(error) => return Term::Error(error),
            Term::Cyclical(cyclical) => {
                elements.extend_from_slice(cyclical.header());
                return Term::cyclical(elements, cyclical.cycle().to_vec())
                    .unwrap_or_else(Term::error);
            }
            resolved => elements.extend(resolved.elements(BlockSize::All)),
        }
    }
    Term::from_elements(elements)
}

/// Either kind of value, chosen by [`Synchronicity::of`].
#[derive(Debug, Clone)]
pub enum Synchronicity<V> {
    Synchronous(Synchronous<V>),
    Asynchronous(Asynchronous<V>),
}

impl<V: Clone + Send + Sync + 'static> Synchronicity<V> {
    /// Synchronous unless the term is pending and still unresolved.
    pub fn of(term: Term<V>) -> Self {
        match Idempotent::try_new(term) {
            Ok(value) => Self::Synchronous(Synchronous::new(value)),
            Err(pending) => match pending.try_get() {
                Some(value) => Self::Synchronous(Synchronous::new(value.clone())),
                None => Self::Asynchronous(Asynchronous::new(Term::Pending(pending))),
            },
        }
    }

    pub fn is_synchronous(&self) -> bool {
        matches!(self, Self::Synchronous(_))
    }

    pub fn max_block(&self) -> Duration {
        match self {
            Self::Synchronous(sync) => sync.max_block(),
            Self::Asynchronous(asynchronous) => asynchronous.max_block(),
        }
    }

    pub fn max_block_nanoseconds(&self) -> u64 {
        nanos(self.max_block())
    }

    /// Any value can be consumed asynchronously.
    pub fn into_asynchronous(self) -> Asynchronous<V> {
        match self {
            Self::Synchronous(sync) => Asynchronous::new(sync.into_value().into_term()),
            Self::Asynchronous(asynchronous) => asynchronous,
        }
    }
}
