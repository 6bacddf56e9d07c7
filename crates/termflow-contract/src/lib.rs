//! # termflow-contract
//!
//! The design-by-contract substrate every other termflow crate reports
//! failures through.
//!
//! ```text
//! Filter<T>             ← keep / discard, composable with and / or / not
//!     │
//! Contract<E>           ← named filter + violation factory, Obligation | Guarantee
//!     │
//! Violation             ← {contract, plaintiff, evidence, cause?}, witness-addressed
//!     │
//! Advocate              ← enforcement: obligations return Err, guarantees escalate
//! ```
//!
//! Obligations are the caller's fault and recoverable. Guarantees are the
//! implementer's fault: a broken guarantee is logged and escalated as a panic
//! carrying the [`Violation`], never quietly turned into a value.

pub mod contract;
pub mod filter;
pub mod registry;
pub mod violation;
pub mod witness;

pub use contract::{Advocate, Contract, ContractId, ContractKind, Satisfies, escalate};
pub use filter::{
    AllOf, Always, And, AnyOf, Filter, FilterExt, FilterState, Never, Not, Or, Predicate,
    predicate,
};
pub use registry::{
    ContractDescriptor, contract_registry_json, lookup as lookup_contract, merge_registries,
};
pub use violation::{Chain, Violation};
pub use witness::compute_witness_id;
