//! Fusion model
//!
//! ```text
//! OperatorRegistry ──rules──▶ FusibilityMatrix   (may a, b fuse? how? into what?)
//!                              FusionBuilderTable (synthesize the fused behavior)
//! ```
//!
//! The matrix decides, the builder table constructs. A pair the matrix allows
//! but the table cannot build stays unfused.

pub mod behavior;
pub mod matrix;
pub mod builders;

pub use behavior::{Behavior, ExpandFn, MapFn, PartialFn, PredicateFn, StepFn};
pub use matrix::{standard_matrix, FusibilityEntry, FusibilityMatrix};
pub use builders::{FusionBuilder, FusionBuilderTable};
