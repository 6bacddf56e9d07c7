//! Filters: the keep/discard predicates contracts are built from.
//!
//! A filter never explains itself; it only says whether a value is kept.
//! Explanations (evidence, descriptions, causes) are the job of
//! [`Contract`](crate::Contract), which is a filter with a name and a
//! violation factory attached.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// The outcome of running a filter over one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterState {
    Kept,
    Discarded,
}

impl FilterState {
    pub fn from_bool(kept: bool) -> Self {
        if kept { Self::Kept } else { Self::Discarded }
    }

    pub fn is_kept(self) -> bool {
        self == Self::Kept
    }

    pub fn is_discarded(self) -> bool {
        self == Self::Discarded
    }

    /// Kept only if both are kept.
    pub fn and(self, other: Self) -> Self {
        Self::from_bool(self.is_kept() && other.is_kept())
    }

    /// Kept if either is kept.
    pub fn or(self, other: Self) -> Self {
        Self::from_bool(self.is_kept() || other.is_kept())
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Kept => Self::Discarded,
            Self::Discarded => Self::Kept,
        }
    }
}

impl std::fmt::Display for FilterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kept => write!(f, "kept"),
            Self::Discarded => write!(f, "discarded"),
        }
    }
}

/// Decides whether a value is kept or discarded.
///
/// Filters must be side-effect free: the same value always yields the same
/// state, so that contracts built on them can re-check evidence when they
/// construct a violation.
pub trait Filter<T: ?Sized> {
    fn filter(&self, value: &T) -> FilterState;
}

impl<T: ?Sized, F: Filter<T> + ?Sized> Filter<T> for &F {
    fn filter(&self, value: &T) -> FilterState {
        (**self).filter(value)
    }
}

impl<T: ?Sized, F: Filter<T> + ?Sized> Filter<T> for Box<F> {
    fn filter(&self, value: &T) -> FilterState {
        (**self).filter(value)
    }
}

impl<T: ?Sized, F: Filter<T> + ?Sized> Filter<T> for std::sync::Arc<F> {
    fn filter(&self, value: &T) -> FilterState {
        (**self).filter(value)
    }
}

/// A filter backed by a boolean closure.
pub struct Predicate<T: ?Sized, F> {
    function: F,
    _value: PhantomData<fn(&T)>,
}

/// Wrap a closure as a [`Filter`].
pub fn predicate<T: ?Sized, F>(function: F) -> Predicate<T, F>
where
    F: Fn(&T) -> bool,
{
    Predicate {
        function,
        _value: PhantomData,
    }
}

impl<T: ?Sized, F: Clone> Clone for Predicate<T, F> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: ?Sized, F> Filter<T> for Predicate<T, F>
where
    F: Fn(&T) -> bool,
{
    fn filter(&self, value: &T) -> FilterState {
        FilterState::from_bool((self.function)(value))
    }
}

/// Keeps every value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Always;

impl<T: ?Sized> Filter<T> for Always {
    fn filter(&self, _value: &T) -> FilterState {
        FilterState::Kept
    }
}

/// Discards every value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Never;

impl<T: ?Sized> Filter<T> for Never {
    fn filter(&self, _value: &T) -> FilterState {
        FilterState::Discarded
    }
}

/// Kept iff both inner filters keep the value. Short-circuits on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct And<A, B>(pub A, pub B);

impl<T: ?Sized, A: Filter<T>, B: Filter<T>> Filter<T> for And<A, B> {
    fn filter(&self, value: &T) -> FilterState {
        match self.0.filter(value) {
            FilterState::Discarded => FilterState::Discarded,
            FilterState::Kept => self.1.filter(value),
        }
    }
}

/// Kept iff either inner filter keeps the value. Short-circuits on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Or<A, B>(pub A, pub B);

impl<T: ?Sized, A: Filter<T>, B: Filter<T>> Filter<T> for Or<A, B> {
    fn filter(&self, value: &T) -> FilterState {
        match self.0.filter(value) {
            FilterState::Kept => FilterState::Kept,
            FilterState::Discarded => self.1.filter(value),
        }
    }
}

/// Inverts the inner filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Not<A>(pub A);

impl<T: ?Sized, A: Filter<T>> Filter<T> for Not<A> {
    fn filter(&self, value: &T) -> FilterState {
        self.0.filter(value).opposite()
    }
}

/// Kept iff every filter in the list keeps the value (vacuously kept).
pub struct AllOf<T: ?Sized> {
    filters: Vec<Box<dyn Filter<T> + Send + Sync>>,
}

impl<T: ?Sized> AllOf<T> {
    pub fn new(filters: Vec<Box<dyn Filter<T> + Send + Sync>>) -> Self {
        Self { filters }
    }
}

impl<T: ?Sized> Filter<T> for AllOf<T> {
    fn filter(&self, value: &T) -> FilterState {
        FilterState::from_bool(self.filters.iter().all(|f| f.filter(value).is_kept()))
    }
}

/// Kept iff at least one filter in the list keeps the value.
pub struct AnyOf<T: ?Sized> {
    filters: Vec<Box<dyn Filter<T> + Send + Sync>>,
}

impl<T: ?Sized> AnyOf<T> {
    pub fn new(filters: Vec<Box<dyn Filter<T> + Send + Sync>>) -> Self {
        Self { filters }
    }
}

impl<T: ?Sized> Filter<T> for AnyOf<T> {
    fn filter(&self, value: &T) -> FilterState {
        FilterState::from_bool(self.filters.iter().any(|f| f.filter(value).is_kept()))
    }
}

/// Combinator methods available on every sized filter.
pub trait FilterExt<T: ?Sized>: Filter<T> + Sized {
    fn and<B: Filter<T>>(self, other: B) -> And<Self, B> {
        And(self, other)
    }

    fn or<B: Filter<T>>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<T: ?Sized, F: Filter<T>> FilterExt<T> for F {}
