//! Fixed-point optimizer
//!
//! Repeats fusion sweeps until a sweep leaves the op sequence unchanged or
//! the iteration budget runs out. Every productive sweep shortens the
//! pipeline, so an N-node input converges after at most N-1 productive
//! sweeps; the budget only guards against a misbehaving model.

use super::diagnostics::Diagnostic;
use super::fuser::PipelineFuser;
use super::ir::{same_shape, PipelineNode};
use super::provenance::FusionTraceEntry;
use crate::config::OptimizerConfig;
use crate::fusion::{standard_matrix, FusibilityMatrix, FusionBuilderTable};
use crate::operators::{standard_registry, OperatorRegistry};
use tracing::{debug, info};

/// Outcome of [`Optimizer::optimize`]
#[derive(Clone, Debug)]
pub struct OptimizationResult<T> {
    pub result: Vec<PipelineNode<T>>,
    /// Fusion events of every sweep, in order
    pub trace: Vec<FusionTraceEntry>,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of sweeps that fused at least one pair
    pub iterations: usize,
    /// `false` if the budget ran out while fusion was still possible
    pub converged: bool,
}

impl<T> OptimizationResult<T> {
    /// Nodes in the result that were produced by fusion
    pub fn fused_nodes(&self) -> usize {
        self.result.iter().filter(|node| node.is_fused()).count()
    }
}

/// Drives fusion sweeps to a fixed point
pub struct Optimizer<'a, T> {
    registry: &'a OperatorRegistry,
    matrix: &'a FusibilityMatrix,
    builders: &'a FusionBuilderTable<T>,
    config: OptimizerConfig,
}

impl<'a, T: Clone + Send + Sync + 'static> Optimizer<'a, T> {
    /// Optimizer over an explicit registry, matrix and builder table
    pub fn new(
        registry: &'a OperatorRegistry,
        matrix: &'a FusibilityMatrix,
        builders: &'a FusionBuilderTable<T>,
    ) -> Self {
        Optimizer {
            registry,
            matrix,
            builders,
            config: OptimizerConfig::default(),
        }
    }

    /// Optimizer over the standard registry and matrix
    pub fn standard(builders: &'a FusionBuilderTable<T>) -> Self {
        Self::new(standard_registry(), standard_matrix(), builders)
    }

    /// Replace the default configuration
    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration in effect
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize with the configured iteration budget
    pub fn optimize(&self, nodes: &[PipelineNode<T>]) -> OptimizationResult<T> {
        self.optimize_with_budget(nodes, self.config.max_iterations)
    }

    /// Fuse until a fixed point or until `max_iterations` productive sweeps
    /// have run. Once the budget is spent one more sweep checks whether the
    /// result is already a fixed point; it is not counted and its fusions are
    /// discarded. Running out of budget is not an error: the partial result is
    /// returned with `converged == false`.
    pub fn optimize_with_budget(&self, nodes: &[PipelineNode<T>], max_iterations: usize) -> OptimizationResult<T> {
        let fuser = PipelineFuser::new(self.registry, self.matrix, self.builders)
            .with_trace(self.config.trace)
            .with_diagnostics(self.config.record_diagnostics);

        let mut current = nodes.to_vec();
        let mut trace = Vec::new();
        let mut diagnostics = Vec::new();
        let mut iterations = 0;

        // No pair to look at
        let mut converged = current.len() < 2;

        while !converged {
            let sweep = fuser.fuse_once(&current, iterations + 1);

            if same_shape(&sweep.output, &current) {
                merge_diagnostics(&mut diagnostics, sweep.diagnostics);
                converged = true;
                break;
            }
            // Out of budget: the sweep only confirmed that fusion is still possible
            if iterations == max_iterations {
                debug!(budget = max_iterations, "iteration budget exhausted");
                break;
            }

            merge_diagnostics(&mut diagnostics, sweep.diagnostics);
            trace.extend(sweep.trace);
            debug!(
                pass = iterations + 1,
                before = current.len(),
                after = sweep.output.len(),
                "fusion pass"
            );
            current = sweep.output;
            iterations += 1;
            converged = current.len() < 2;
        }

        info!(
            input = nodes.len(),
            output = current.len(),
            iterations,
            converged,
            "pipeline optimized"
        );

        OptimizationResult {
            result: current,
            trace,
            diagnostics,
            iterations,
            converged,
        }
    }
}

fn merge_diagnostics(into: &mut Vec<Diagnostic>, found: Vec<Diagnostic>) {
    for diagnostic in found {
        if !into.contains(&diagnostic) {
            into.push(diagnostic);
        }
    }
}

/// Optimize `nodes` against the standard operator catalog.
///
/// This is the canonical entry point; single sweeps are an internal step.
pub fn optimize<T: Clone + Send + Sync + 'static>(
    nodes: &[PipelineNode<T>],
    max_iterations: usize,
) -> OptimizationResult<T> {
    let builders = FusionBuilderTable::standard();
    Optimizer::standard(&builders).optimize_with_budget(nodes, max_iterations)
}
