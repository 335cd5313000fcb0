//! Reference pipeline executor
//!
//! Pushes elements one at a time through a pipeline with fresh per-node state.
//! Host runtimes execute pipelines their own way; this one exists to check
//! that an optimized pipeline behaves exactly like its source.

use super::ir::PipelineNode;
use crate::error::{FuseError, Result};
use crate::fusion::{Behavior, ExpandFn, MapFn, PartialFn, PredicateFn, StepFn};
use std::sync::Arc;

/// Execution statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of stages in the executed pipeline
    pub stages: usize,

    /// Elements fed into the first stage
    pub elements_in: usize,

    /// Elements emitted by the last stage
    pub elements_out: usize,

    /// Stage invocations across all elements
    pub invocations: usize,
}

/// Result of running a pipeline
#[derive(Clone, Debug)]
pub struct ExecutionResult<T> {
    pub values: Vec<T>,
    pub stats: ExecutionStats,
}

/// Reference executor
pub struct Executor {
    stats: ExecutionStats,
}

impl Executor {
    pub fn new() -> Self {
        Executor {
            stats: ExecutionStats::default(),
        }
    }

    /// Run `input` through `nodes`
    pub fn execute<T: Clone + 'static>(
        &mut self,
        nodes: &[PipelineNode<T>],
        input: impl IntoIterator<Item = T>,
    ) -> Result<ExecutionResult<T>> {
        let mut stages = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| match &node.behavior {
                Some(behavior) => Ok(Stage::new(behavior)),
                None => Err(FuseError::MalformedNode {
                    op: node.op.clone(),
                    position,
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        self.stats = ExecutionStats {
            stages: stages.len(),
            ..ExecutionStats::default()
        };

        let mut values = Vec::new();
        for x in input {
            self.stats.elements_in += 1;
            feed(&mut stages, x, &mut values, &mut self.stats);
        }
        self.stats.elements_out = values.len();

        Ok(ExecutionResult {
            values,
            stats: self.stats.clone(),
        })
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `input` through `nodes` and return the emitted values
pub fn run<T: Clone + 'static>(nodes: &[PipelineNode<T>], input: impl IntoIterator<Item = T>) -> Result<Vec<T>> {
    Executor::new().execute(nodes, input).map(|r| r.values)
}

/// A behavior plus its running state
enum Stage<T> {
    Map(MapFn<T>),
    Filter(PredicateFn<T>),
    FilterMap(PartialFn<T>),
    FlatMap(ExpandFn<T>),
    Scan {
        step: StepFn<T>,
        acc: T,
        project: Option<MapFn<T>>,
    },
    Take {
        remaining: usize,
        f: Option<MapFn<T>>,
    },
    Skip {
        remaining: usize,
    },
}

impl<T: Clone> Stage<T> {
    fn new(behavior: &Behavior<T>) -> Self {
        match behavior {
            Behavior::Map(f) => Stage::Map(Arc::clone(f)),
            Behavior::Filter(p) => Stage::Filter(Arc::clone(p)),
            Behavior::FilterMap(f) => Stage::FilterMap(Arc::clone(f)),
            Behavior::FlatMap(f) => Stage::FlatMap(Arc::clone(f)),
            Behavior::Scan { step, seed, project } => Stage::Scan {
                step: Arc::clone(step),
                acc: seed.clone(),
                project: project.clone(),
            },
            Behavior::Take { count } => Stage::Take {
                remaining: *count,
                f: None,
            },
            Behavior::TakeMap { count, f } => Stage::Take {
                remaining: *count,
                f: Some(Arc::clone(f)),
            },
            Behavior::Skip { count } => Stage::Skip { remaining: *count },
        }
    }

    fn apply(&mut self, x: T, emit: &mut Vec<T>) {
        match self {
            Stage::Map(f) => emit.push(f(x)),
            Stage::Filter(p) => {
                if p(&x) {
                    emit.push(x);
                }
            }
            Stage::FilterMap(f) => emit.extend(f(x)),
            Stage::FlatMap(f) => emit.extend(f(x)),
            Stage::Scan { step, acc, project } => {
                *acc = step(acc.clone(), x);
                let out = acc.clone();
                emit.push(match project {
                    Some(p) => p(out),
                    None => out,
                });
            }
            Stage::Take { remaining, f } => {
                if *remaining > 0 {
                    *remaining -= 1;
                    emit.push(match f {
                        Some(f) => f(x),
                        None => x,
                    });
                }
            }
            Stage::Skip { remaining } => {
                if *remaining > 0 {
                    *remaining -= 1;
                } else {
                    emit.push(x);
                }
            }
        }
    }
}

/// Push one element through `stages`, depth first, so that every element
/// reaches the end of the pipeline before the next one starts.
fn feed<T: Clone>(stages: &mut [Stage<T>], x: T, out: &mut Vec<T>, stats: &mut ExecutionStats) {
    let Some((stage, rest)) = stages.split_first_mut() else {
        out.push(x);
        return;
    };
    stats.invocations += 1;
    let mut emitted = Vec::new();
    stage.apply(x, &mut emitted);
    for y in emitted {
        feed(rest, y, out, stats);
    }
}
