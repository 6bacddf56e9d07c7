//! # termflow-term
//!
//! The value algebra and the discipline for consuming values that do not
//! exist yet.
//!
//! ```text
//! Term<V>          ← Empty | Single | Many | Cyclical | Error | Pending
//!     │
//! Pending<V>       ← write-once cell, resolved by a Resolver on another thread
//!     │
//! Idempotent<V>    ← proof of "not pending"; safe to read repeatedly
//!     │
//! Synchronicity<V> ← Synchronous (read now) | Asynchronous (await / pipe / cancel)
//! ```
//!
//! Element reads are bounded by a [`BlockSize`]: a cyclical term can be read
//! to any finite prefix without materialising its infinite tail.

pub mod block_size;
pub mod contracts;
pub mod elements;
pub mod pending;
pub mod synchronicity;
pub mod term;

pub use block_size::{BlockSize, Length};
pub use contracts::{CONTRACTS, TermMustBeNonEmpty, TermMustNotBePending, panic_message};
pub use elements::Elements;
pub use pending::{AwaitPolicy, PENDING_PLAINTIFF, Pending, Resolver, pending, spawn_pending};
pub use synchronicity::{Asynchronous, Synchronicity, Synchronous};
pub use term::{Cyclical, Idempotent, Many, Term, TermError};
