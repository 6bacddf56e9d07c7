//! # termflow-harness
//!
//! Contract testing for elemental operations.
//!
//! An [`Invocation`] captures "apply this operation to this input with this
//! block size". Expectations about it are contracts, and therefore filters:
//!
//! ```text
//! OperationMustFail                       ← kept iff execution fails
//! OperationOutputMustMeet(output)         ← kept iff execution succeeds and
//!                                           the output meets `output`
//! ```
//!
//! Output contracts ([`TermMustBeNonEmpty`], [`TermMustHaveLength`],
//! [`ElementsMustMatch`], [`TermMustEqual`]) are contracts over terms and
//! can be used on their own.

pub mod contracts;
pub mod invocation;

pub use contracts::{
    CONTRACTS, ElementsMustMatch, OperationMustFail, OperationMustNotPanic,
    OperationOutputMustMeet, TermMustEqual, TermMustHaveLength,
};
pub use invocation::Invocation;
pub use termflow_term::TermMustBeNonEmpty;
