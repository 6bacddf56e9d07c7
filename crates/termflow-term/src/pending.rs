//! Pending terms: write-once cells resolved by a producer thread.
//!
//! A cell moves from unresolved to resolved exactly once. The producer holds
//! one or more [`Resolver`] handles; consumers hold [`Pending`] handles and
//! either block with [`Pending::wait`] or register a continuation with
//! [`Pending::on_resolved`]. Continuations run exactly once, after the value
//! is visible to every waiter.
//!
//! If the last resolver is dropped without resolving (including when the
//! producer panics), the cell resolves to an Error term so waiters are never
//! stranded.

use crate::contracts::{
    PendingMustNotResolveToItself, PendingMustResolveAtMostOnce,
    PendingMustResolveWithinTimeout, ResolutionEvidence, ResolverMustResolveBeforeDrop,
    WaitEvidence, panic_message,
};
use crate::term::{Idempotent, Term};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::{Duration, Instant};
use termflow_contract::{Advocate, Contract, Violation};
use uuid::Uuid;

/// Plaintiff recorded on violations raised by pending cells. Cell ids stay
/// out of witness material so witnesses are reproducible.
pub const PENDING_PLAINTIFF: &str = "pending_term";

/// How long a consumer is willing to block on a pending term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AwaitPolicy {
    /// Do not block: an unresolved term times out at once.
    Immediate,
    Timeout(Duration),
    #[default]
    Unbounded,
}

impl AwaitPolicy {
    /// `None` means no bound.
    pub fn timeout(self) -> Option<Duration> {
        match self {
            Self::Immediate => Some(Duration::ZERO),
            Self::Timeout(timeout) => Some(timeout),
            Self::Unbounded => None,
        }
    }
}

impl From<Option<Duration>> for AwaitPolicy {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(Duration::ZERO) => Self::Immediate,
            Some(timeout) => Self::Timeout(timeout),
            None => Self::Unbounded,
        }
    }
}

type Continuation<V> = Box<dyn FnOnce(&Idempotent<V>) + Send>;

struct Cell<V> {
    id: Uuid,
    max_block: Duration,
    claimed: AtomicBool,
    value: OnceLock<Idempotent<V>>,
    /// The cell this one was resolved to, while that one is unresolved.
    chained: OnceLock<Weak<Cell<V>>>,
    continuations: Mutex<Vec<Continuation<V>>>,
    resolved: Condvar,
    resolvers: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl<V> Cell<V> {
    /// Whether following unresolved chain links from `start` reaches `target`.
    fn leads_to(start: &Arc<Self>, target: &Arc<Self>) -> bool {
        let mut visited = HashSet::new();
        let mut current = Arc::clone(start);
        loop {
            if Arc::ptr_eq(&current, target) {
                return true;
            }
            if current.value.get().is_some() || !visited.insert(current.id) {
                return false;
            }
            let next = current.chained.get().and_then(Weak::upgrade);
            match next {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Publish the value, wake waiters, then run continuations outside the
    /// lock. Only the claimant calls this.
    fn complete(&self, value: Idempotent<V>) {
        let variant = value.variant_name();
        if self.value.set(value).is_err() {
            tracing::error!(cell = %self.id, "pending cell completed twice");
            return;
        }
        let continuations = std::mem::take(&mut *lock(&self.continuations));
        self.resolved.notify_all();
        tracing::debug!(
            cell = %self.id,
            variant,
            continuations = continuations.len(),
            "pending term resolved"
        );
        let Some(value) = self.value.get() else {
            return;
        };
        for continuation in continuations {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| continuation(value))) {
                tracing::error!(
                    cell = %self.id,
                    panic = %panic_message(payload.as_ref()),
                    "pending continuation panicked"
                );
            }
        }
    }
}

/// Consumer handle on a pending cell. Cloning shares the cell.
pub struct Pending<V> {
    cell: Arc<Cell<V>>,
}

impl<V> Pending<V> {
    /// Log correlation id. Not part of any violation.
    pub fn id(&self) -> Uuid {
        self.cell.id
    }

    /// The producer's declared upper bound on blocking.
    pub fn max_block(&self) -> Duration {
        self.cell.max_block
    }

    pub fn max_block_nanoseconds(&self) -> u64 {
        nanos(self.cell.max_block)
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.value.get().is_some()
    }

    /// The resolved value, without blocking.
    pub fn try_get(&self) -> Option<&Idempotent<V>> {
        self.cell.value.get()
    }

    pub fn same_cell(&self, other: &Pending<V>) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Run `continuation` once the cell resolves; inline if it already has.
    pub fn on_resolved<F>(&self, continuation: F)
    where
        F: FnOnce(&Idempotent<V>) + Send + 'static,
    {
        let mut continuations = lock(&self.cell.continuations);
        match self.cell.value.get() {
            Some(value) => {
                drop(continuations);
                continuation(value);
            }
            None => continuations.push(Box::new(continuation)),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Pending<V> {
    /// Block until resolved or until `policy` gives up.
    ///
    /// On timeout the result is an Error term whose partial is this pending
    /// term; the cell itself is unaffected and may still resolve later.
    pub fn wait(&self, policy: AwaitPolicy) -> Idempotent<V> {
        if let Some(value) = self.cell.value.get() {
            return value.clone();
        }
        let timeout = policy.timeout();
        // An unrepresentable deadline is as good as none.
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        let mut guard = lock(&self.cell.continuations);
        loop {
            if let Some(value) = self.cell.value.get() {
                return value.clone();
            }
            match deadline {
                None => {
                    guard = self
                        .cell
                        .resolved
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    let (next, _) = self
                        .cell
                        .resolved
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard = next;
                }
            }
        }
        drop(guard);

        let evidence = WaitEvidence {
            timeout: timeout.unwrap_or(Duration::MAX),
            max_block: self.cell.max_block,
            resolved: false,
        };
        let violation = PendingMustResolveWithinTimeout.violation(PENDING_PLAINTIFF, &evidence, None);
        tracing::warn!(
            cell = %self.cell.id,
            timeout_ns = nanos(evidence.timeout),
            max_block_ns = nanos(evidence.max_block),
            "timed out waiting for pending term"
        );
        Idempotent(Term::error_with_partial(violation, Term::Pending(self.clone())))
    }
}

impl<V> Clone for Pending<V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V> fmt::Debug for Pending<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("id", &self.cell.id)
            .field("max_block", &self.cell.max_block)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Producer handle. Every clone counts; the cell is abandoned when the last
/// one drops unresolved.
pub struct Resolver<V> {
    cell: Arc<Cell<V>>,
}

impl<V> Resolver<V> {
    pub fn id(&self) -> Uuid {
        self.cell.id
    }

    /// Whether any resolver has already claimed the cell.
    pub fn is_claimed(&self) -> bool {
        self.cell.claimed.load(Ordering::Acquire)
    }
}

impl<V: Clone + Send + Sync + 'static> Resolver<V> {
    /// Resolve the cell to `term`.
    ///
    /// Resolving to another pending term chains: this cell resolves when that
    /// one does. Resolving a cell to itself, directly or through a chain of
    /// unresolved cells, or resolving twice, is an obligation violation and
    /// leaves the cell untouched. Cycles closed by racing resolves on
    /// different threads are not detected.
    pub fn resolve(&self, term: Term<V>) -> Result<(), Violation> {
        let advocate = Advocate::new(PENDING_PLAINTIFF);
        let self_reference =
            matches!(&term, Term::Pending(next) if Cell::leads_to(&next.cell, &self.cell));
        advocate.enforce(
            &PendingMustNotResolveToItself,
            &ResolutionEvidence {
                already_claimed: false,
                self_reference,
            },
        )?;
        let already_claimed = self.cell.claimed.swap(true, Ordering::AcqRel);
        advocate.enforce(
            &PendingMustResolveAtMostOnce,
            &ResolutionEvidence {
                already_claimed,
                self_reference: false,
            },
        )?;

        match Idempotent::try_new(term) {
            Ok(value) => self.cell.complete(value),
            Err(next) => {
                tracing::trace!(cell = %self.cell.id, next = %next.id(), "chaining pending term");
                let _ = self.cell.chained.set(Arc::downgrade(&next.cell));
                let cell = Arc::clone(&self.cell);
                next.on_resolved(move |value| cell.complete(value.clone()));
            }
        }
        Ok(())
    }
}

impl<V> Clone for Resolver<V> {
    fn clone(&self) -> Self {
        self.cell.resolvers.fetch_add(1, Ordering::AcqRel);
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<V> Drop for Resolver<V> {
    fn drop(&mut self) {
        if self.cell.resolvers.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        if self.cell.claimed.swap(true, Ordering::AcqRel) {
            return;
        }
        let violation = ResolverMustResolveBeforeDrop.violation(
            PENDING_PLAINTIFF,
            &self.cell.max_block,
            None,
        );
        tracing::warn!(
            cell = %self.cell.id,
            witness_id = %violation.witness_id,
            "pending term abandoned by its producer"
        );
        self.cell.complete(Idempotent(Term::error(violation)));
    }
}

impl<V> fmt::Debug for Resolver<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("id", &self.cell.id)
            .field("claimed", &self.is_claimed())
            .finish()
    }
}

/// A fresh unresolved cell. `max_block` is the producer's declared bound on
/// how long consumers may have to wait.
pub fn pending<V>(max_block: Duration) -> (Pending<V>, Resolver<V>) {
    let cell = Arc::new(Cell {
        id: Uuid::new_v4(),
        max_block,
        claimed: AtomicBool::new(false),
        value: OnceLock::new(),
        chained: OnceLock::new(),
        continuations: Mutex::new(Vec::new()),
        resolved: Condvar::new(),
        resolvers: AtomicUsize::new(1),
    });
    tracing::trace!(cell = %cell.id, max_block_ns = nanos(max_block), "pending term created");
    (
        Pending {
            cell: Arc::clone(&cell),
        },
        Resolver { cell },
    )
}

/// Run `producer` on its own thread and return the pending term it resolves.
///
/// A producer that panics abandons the term, which then resolves to an
/// Error.
pub fn spawn_pending<V, F>(max_block: Duration, producer: F) -> Term<V>
where
    V: Clone + Send + Sync + 'static,
    F: FnOnce() -> Term<V> + Send + 'static,
{
    let (pending, resolver) = pending(max_block);
    let spawned = std::thread::Builder::new()
        .name("termflow-pending".to_string())
        .spawn(move || {
            let term = producer();
            if let Err(violation) = resolver.resolve(term) {
                tracing::warn!(witness_id = %violation.witness_id, "producer result rejected: {violation}");
            }
        });
    if let Err(err) = spawned {
        // The closure, and with it the resolver, was dropped: the cell is
        // already resolved to an abandonment error.
        tracing::warn!(error = %err, "failed to spawn pending producer");
    }
    Term::Pending(pending)
}
