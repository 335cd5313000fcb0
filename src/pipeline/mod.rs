//! Pipeline optimization
//!
//! ```text
//! parser ─▶ [map(f), map(g), filter(p), scan(h, 0)]
//!              │  sweep 1: map+map, filter, scan      (PipelineFuser)
//!              │  sweep 2: map+map+filter, scan
//!              │  sweep 3: no change ─▶ converged     (Optimizer)
//!              ▼
//!           result + trace + diagnostics ─▶ code generator / reporter
//! ```
//!
//! `Optimizer` is the public entry point. The single sweep is an
//! implementation step and is not exported.

pub mod ir;
pub mod provenance;
pub mod diagnostics;
mod fuser;
pub mod optimizer;
pub mod executor;

pub use ir::{op_names, same_shape, PipelineNode};
pub use provenance::{FusionProvenance, FusionTraceEntry, ProvenanceRecord};
pub use diagnostics::Diagnostic;
pub use optimizer::{optimize, OptimizationResult, Optimizer};
pub use executor::{run, ExecutionResult, ExecutionStats, Executor};
