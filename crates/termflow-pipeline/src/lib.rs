//! # termflow-pipeline
//!
//! Bounded element-wise operations and their composition.
//!
//! ```text
//! ElementalOperation       ← transform(Idempotent<IN>, BlockSize) -> Term<OUT>
//!     │  apply: resolve, reject empty/error input, Exactly(0) → Empty,
//!     │         guarantee: not pending, ≤ n elements
//!     │
//! Then<A, B>               ← static composition, types agreed by the compiler
//! Pipeline                 ← dynamic composition, types agreed at `pipe` time
//!     │
//! PipelineRun              ← per-apply bounds (LastStage | Fused) and progress
//! ```
//!
//! Every `apply` reads its input through a fresh [`EvaluationCursor`], so
//! operations and pipelines are stateless and can be shared across threads.

pub mod config;
pub mod contracts;
pub mod cursor;
pub mod element_type;
pub mod operation;
pub mod ops;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig, SynchronicityConfig, TermflowConfig};
pub use contracts::CONTRACTS;
pub use cursor::EvaluationCursor;
pub use element_type::ElementType;
pub use operation::{ElementalOperation, Then, apply_operation};
pub use ops::{Filter, Insert, Map, Sort};
pub use pipeline::{PIPELINE_PLAINTIFF, Pipeline, Propagation};
