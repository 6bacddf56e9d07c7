//! The term algebra.
//!
//! A [`Term`] is one of six variants: Empty, Single, Many, Cyclical, Error,
//! Pending. Exactly one is active. Only Pending may ever change identity,
//! and it does so at most once, to one of the other five.
//!
//! Element storage is shared (`Arc<[V]>`), so cloning a term never copies
//! elements.

use crate::block_size::{BlockSize, Length};
use crate::contracts::{CycleMustNotBeEmpty, ManyMustHaveAtLeastTwoElements};
use crate::elements::Elements;
use crate::pending::{AwaitPolicy, Pending, Resolver, pending};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use termflow_contract::{Advocate, Violation};

/// A finite, ordered sequence of at least two elements.
pub struct Many<V> {
    elements: Arc<[V]>,
}

impl<V> Many<V> {
    /// Fewer than two elements is an obligation violation: use
    /// [`Term::from_elements`] to normalise instead.
    pub fn new(elements: Vec<V>) -> Result<Self, Violation> {
        Advocate::new("many").enforce(&ManyMustHaveAtLeastTwoElements, &elements.len())?;
        Ok(Self {
            elements: elements.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn as_slice(&self) -> &[V] {
        &self.elements
    }

    pub(crate) fn shared(&self) -> Arc<[V]> {
        Arc::clone(&self.elements)
    }
}

impl<V> Clone for Many<V> {
    fn clone(&self) -> Self {
        Self {
            elements: Arc::clone(&self.elements),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Many<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.elements.iter()).finish()
    }
}

/// An infinite sequence: a finite header, then a non-empty cycle repeated
/// forever.
pub struct Cyclical<V> {
    header: Arc<[V]>,
    cycle: Arc<[V]>,
}

impl<V> Cyclical<V> {
    pub fn new(header: Vec<V>, cycle: Vec<V>) -> Result<Self, Violation> {
        Advocate::new("cyclical").enforce(&CycleMustNotBeEmpty, &cycle.len())?;
        Ok(Self {
            header: header.into(),
            cycle: cycle.into(),
        })
    }

    pub fn header(&self) -> &[V] {
        &self.header
    }

    pub fn cycle(&self) -> &[V] {
        &self.cycle
    }

    /// The element at logical position `index`.
    pub fn get(&self, index: usize) -> &V {
        if index < self.header.len() {
            &self.header[index]
        } else {
            &self.cycle[(index - self.header.len()) % self.cycle.len()]
        }
    }

    pub(crate) fn shared(&self) -> (Arc<[V]>, Arc<[V]>) {
        (Arc::clone(&self.header), Arc::clone(&self.cycle))
    }
}

impl<V> Clone for Cyclical<V> {
    fn clone(&self) -> Self {
        Self {
            header: Arc::clone(&self.header),
            cycle: Arc::clone(&self.cycle),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Cyclical<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cyclical")
            .field("header", &&*self.header)
            .field("cycle", &&*self.cycle)
            .finish()
    }
}

/// An error term: the violation that produced it, plus optionally a
/// partial term of the same element type (for a timed-out wait, the
/// still-pending term).
pub struct TermError<V> {
    violation: Arc<Violation>,
    partial: Option<Box<Term<V>>>,
}

impl<V> TermError<V> {
    pub fn violation(&self) -> &Violation {
        &self.violation
    }

    pub fn partial(&self) -> Option<&Term<V>> {
        self.partial.as_deref()
    }
}

impl<V: Clone> Clone for TermError<V> {
    fn clone(&self) -> Self {
        Self {
            violation: Arc::clone(&self.violation),
            partial: self.partial.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for TermError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermError")
            .field("violation", &self.violation)
            .field("partial", &self.partial)
            .finish()
    }
}

/// A value that is empty, single, many, cyclical, an error, or not yet known.
pub enum Term<V> {
    Empty,
    Single(V),
    Many(Many<V>),
    Cyclical(Cyclical<V>),
    Error(TermError<V>),
    Pending(Pending<V>),
}

impl<V> Term<V> {
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn single(value: V) -> Self {
        Self::Single(value)
    }

    /// Fewer than two elements is an obligation violation.
    pub fn many(elements: Vec<V>) -> Result<Self, Violation> {
        Many::new(elements).map(Self::Many)
    }

    /// An empty cycle is an obligation violation.
    pub fn cyclical(header: Vec<V>, cycle: Vec<V>) -> Result<Self, Violation> {
        Cyclical::new(header, cycle).map(Self::Cyclical)
    }

    /// Normalise a finite sequence: 0 → Empty, 1 → Single, otherwise Many.
    pub fn from_elements(elements: Vec<V>) -> Self {
        let mut elements = elements;
        match elements.len() {
            0 => Self::Empty,
            1 => match elements.pop() {
                Some(only) => Self::Single(only),
                None => Self::Empty,
            },
            _ => Self::Many(Many {
                elements: elements.into(),
            }),
        }
    }

    pub fn error(violation: Violation) -> Self {
        Self::Error(TermError {
            violation: Arc::new(violation),
            partial: None,
        })
    }

    pub fn error_with_partial(violation: Violation, partial: Term<V>) -> Self {
        Self::Error(TermError {
            violation: Arc::new(violation),
            partial: Some(Box::new(partial)),
        })
    }

    /// A fresh pending term plus the resolver its producer completes it with.
    pub fn pending(max_block: Duration) -> (Self, Resolver<V>) {
        let (pending, resolver) = pending(max_block);
        (Self::Pending(pending), resolver)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn is_cyclical(&self) -> bool {
        matches!(self, Self::Cyclical(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Single(_) => "single",
            Self::Many(_) => "many",
            Self::Cyclical(_) => "cyclical",
            Self::Error(_) => "error",
            Self::Pending(_) => "pending",
        }
    }

    /// Does not wait: a pending term reports [`Length::Unknown`].
    pub fn length(&self) -> Length {
        match self {
            Self::Empty | Self::Error(_) => Length::Finite(0),
            Self::Single(_) => Length::Finite(1),
            Self::Many(many) => Length::Finite(many.len()),
            Self::Cyclical(_) => Length::Infinite,
            Self::Pending(_) => Length::Unknown,
        }
    }

    /// The violation carried by an Error term.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::Error(error) => Some(error.violation()),
            _ => None,
        }
    }

    /// JSON description of the term's shape, usable as violation evidence
    /// without requiring the elements to be serialisable.
    pub fn summary(&self) -> Value {
        match self {
            Self::Empty => json!({"variant": "empty", "length": 0}),
            Self::Single(_) => json!({"variant": "single", "length": 1}),
            Self::Many(many) => json!({"variant": "many", "length": many.len()}),
            Self::Cyclical(cyclical) => json!({
                "variant": "cyclical",
                "headerLength": cyclical.header().len(),
                "cycleLength": cyclical.cycle().len(),
            }),
            Self::Error(error) => json!({
                "variant": "error",
                "contract": error.violation().contract.name,
                "witnessId": error.violation().witness_id,
            }),
            Self::Pending(pending) => json!({
                "variant": "pending",
                "maxBlockNanoseconds": pending.max_block_nanoseconds(),
            }),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Term<V> {
    /// This term with the guarantee that it is not pending.
    ///
    /// A pending term blocks according to `policy`; if the bound is
    /// exceeded the result is an Error term carrying a timeout violation,
    /// while the pending term itself is left untouched.
    pub fn idempotent(&self, policy: AwaitPolicy) -> Idempotent<V> {
        match self {
            Self::Pending(pending) => pending.wait(policy),
            resolved => Idempotent(resolved.clone()),
        }
    }

    pub fn into_idempotent(self, policy: AwaitPolicy) -> Idempotent<V> {
        match self {
            Self::Pending(pending) => pending.wait(policy),
            resolved => Idempotent(resolved),
        }
    }

    /// A lazy sequence of at most `limit` elements.
    ///
    /// Cyclical terms walk the header and then the cycle; with
    /// [`BlockSize::All`] they stop after one full cycle rather than run
    /// forever. Empty and Error terms yield nothing. A pending term is first
    /// resolved without a bound.
    pub fn elements(&self, limit: BlockSize) -> Elements<V> {
        match self {
            Self::Pending(pending) => pending.wait(AwaitPolicy::Unbounded).elements(limit),
            Self::Empty | Self::Error(_) => Elements::nothing(),
            Self::Single(value) => Elements::one(value.clone(), limit),
            Self::Many(many) => Elements::slice(many.shared(), limit),
            Self::Cyclical(cyclical) => {
                let (header, cycle) = cyclical.shared();
                Elements::cycle(header, cycle, limit)
            }
        }
    }

    /// The first element, if any.
    pub fn head(&self) -> Option<V> {
        self.elements(BlockSize::Exactly(1)).next()
    }

    /// The single element, or `default` for every other variant.
    pub fn or_default(&self, default: V) -> V {
        match self {
            Self::Single(value) => value.clone(),
            _ => default,
        }
    }
}

impl<V: Clone> Clone for Term<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Single(value) => Self::Single(value.clone()),
            Self::Many(many) => Self::Many(many.clone()),
            Self::Cyclical(cyclical) => Self::Cyclical(cyclical.clone()),
            Self::Error(error) => Self::Error(error.clone()),
            Self::Pending(pending) => Self::Pending(pending.clone()),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Term<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Single(value) => f.debug_tuple("Single").field(value).finish(),
            Self::Many(many) => f.debug_tuple("Many").field(many).finish(),
            Self::Cyclical(cyclical) => cyclical.fmt(f),
            Self::Error(error) => error.fmt(f),
            Self::Pending(pending) => pending.fmt(f),
        }
    }
}

/// Structural equality. Error terms compare by violation, pending terms by
/// identity of the underlying cell.
impl<V: PartialEq> PartialEq for Term<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Single(a), Self::Single(b)) => a == b,
            (Self::Many(a), Self::Many(b)) => a.as_slice() == b.as_slice(),
            (Self::Cyclical(a), Self::Cyclical(b)) => {
                a.header() == b.header() && a.cycle() == b.cycle()
            }
            (Self::Error(a), Self::Error(b)) => a.violation() == b.violation(),
            (Self::Pending(a), Self::Pending(b)) => a.same_cell(b),
            _ => false,
        }
    }
}

/// A term that is guaranteed not to be pending.
///
/// Obtained from [`Term::idempotent`] or [`Idempotent::try_new`]. Repeated
/// reads return identical results.
pub struct Idempotent<V>(pub(crate) Term<V>);

impl<V> Idempotent<V> {
    /// Hands the pending cell back when the term is still pending.
    pub fn try_new(term: Term<V>) -> Result<Self, Pending<V>> {
        match term {
            Term::Pending(pending) => Err(pending),
            resolved => Ok(Self(resolved)),
        }
    }

    pub fn as_term(&self) -> &Term<V> {
        &self.0
    }

    pub fn into_term(self) -> Term<V> {
        self.0
    }
}

impl<V> std::ops::Deref for Idempotent<V> {
    type Target = Term<V>;

    fn deref(&self) -> &Term<V> {
        &self.0
    }
}

impl<V: Clone> Clone for Idempotent<V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V: fmt::Debug> fmt::Debug for Idempotent<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<V: PartialEq> PartialEq for Idempotent<V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<V> From<Idempotent<V>> for Term<V> {
    fn from(idempotent: Idempotent<V>) -> Self {
        idempotent.0
    }
}
