//! streamfuse: operator-fusion optimizer for linear stream pipelines
//!
//! Rewrites adjacent fusible operators (`map`, `filter`, `scan`, `flatMap`,
//! `take`, ...) into single combined operators, iterating to a fixed point,
//! while preserving observable semantics and recording provenance.

pub mod error;
pub mod config;
pub mod operators;
pub mod fusion;
pub mod pipeline;
pub mod report;

pub use error::{FuseError, Result};
pub use config::OptimizerConfig;
pub use operators::{
    standard_registry, Category, FusionType, Multiplicity, OperatorDescriptor, OperatorRegistry,
};
pub use fusion::{standard_matrix, Behavior, FusibilityMatrix, FusionBuilderTable};
pub use pipeline::{
    optimize, Diagnostic, FusionProvenance, FusionTraceEntry, OptimizationResult, Optimizer, PipelineNode,
};
pub use report::FusionSummary;

/// Public API contract
///
/// Fails to compile if a type or entry point downstream code relies on is
/// removed or renamed.
#[cfg(test)]
mod api_contract_self_test {
    use super::*;

    #[test]
    fn node_constructors_api_contract() {
        let _map = PipelineNode::map(|x: i64| x);
        let _filter = PipelineNode::filter(|_: &i64| true);
        let _flat_map = PipelineNode::flat_map(|x: i64| vec![x]);
        let _scan = PipelineNode::scan(|a: i64, x| a + x, 0);
        let _take = PipelineNode::<i64>::take(1);
        let _skip = PipelineNode::<i64>::skip(1);
        let _opaque = PipelineNode::<i64>::opaque("custom");
    }

    #[test]
    fn optimizer_api_contract() {
        let out: OptimizationResult<i64> = optimize(&[], 10);
        assert!(out.converged);

        let builders = FusionBuilderTable::<i64>::standard();
        let _optimizer = Optimizer::new(standard_registry(), standard_matrix(), &builders)
            .with_config(OptimizerConfig::default());
    }
}
