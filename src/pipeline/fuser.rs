//! Single fusion sweep
//!
//! Greedy left-to-right scan with a two-node window. A fused node is emitted
//! and the window jumps past both operands, so a node produced in this sweep
//! is never re-examined in the same sweep. Chains collapse over several
//! sweeps, driven by [`Optimizer`](super::Optimizer).

use super::diagnostics::Diagnostic;
use super::ir::PipelineNode;
use super::provenance::{FusionProvenance, FusionTraceEntry, ProvenanceRecord};
use crate::fusion::{FusibilityMatrix, FusionBuilderTable};
use crate::operators::{FusionType, OperatorRegistry};
use chrono::Utc;
use tracing::{debug, trace};

pub(crate) struct PipelineFuser<'a, T> {
    registry: &'a OperatorRegistry,
    matrix: &'a FusibilityMatrix,
    builders: &'a FusionBuilderTable<T>,
    trace: bool,
    record_diagnostics: bool,
}

/// Output of one sweep
pub(crate) struct Sweep<T> {
    pub output: Vec<PipelineNode<T>>,
    pub trace: Vec<FusionTraceEntry>,
    pub diagnostics: Vec<Diagnostic>,
    pub fusions: usize,
}

/// Where the window currently sits
struct Window {
    pass: usize,
    position: usize,
    step: usize,
}

impl<'a, T: Clone + Send + Sync + 'static> PipelineFuser<'a, T> {
    pub fn new(
        registry: &'a OperatorRegistry,
        matrix: &'a FusibilityMatrix,
        builders: &'a FusionBuilderTable<T>,
    ) -> Self {
        PipelineFuser {
            registry,
            matrix,
            builders,
            trace: true,
            record_diagnostics: true,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_diagnostics(mut self, record: bool) -> Self {
        self.record_diagnostics = record;
        self
    }

    /// Run one sweep over `nodes`. The input is never modified.
    pub fn fuse_once(&self, nodes: &[PipelineNode<T>], pass: usize) -> Sweep<T> {
        let mut sweep = Sweep {
            output: Vec::with_capacity(nodes.len()),
            trace: Vec::new(),
            diagnostics: Vec::new(),
            fusions: 0,
        };

        let mut i = 0;
        while i < nodes.len() {
            let a = &nodes[i];
            let window = Window {
                pass,
                position: i,
                step: sweep.fusions,
            };

            if let Some(diagnostic) = self.check_node(a, &window) {
                self.diagnose(&mut sweep, diagnostic);
            }

            if let Some(b) = nodes.get(i + 1) {
                match self.try_fuse(a, b, &window) {
                    Ok((fused, fusion_type)) => {
                        if self.trace {
                            let length_before = nodes.len() - sweep.fusions;
                            sweep.trace.push(FusionTraceEntry {
                                iteration: pass,
                                step: window.step,
                                position: i,
                                op1: a.op.clone(),
                                op2: b.op.clone(),
                                fused_op_name: fused.op.clone(),
                                length_before,
                                length_after: length_before - 1,
                                fusion_type,
                                timestamp: Utc::now(),
                            });
                        }
                        sweep.output.push(fused);
                        sweep.fusions += 1;
                        i += 2;
                        continue;
                    }
                    Err(Some(diagnostic)) => self.diagnose(&mut sweep, diagnostic),
                    Err(None) => {}
                }
            }

            sweep.output.push(a.clone());
            i += 1;
        }

        sweep
    }

    fn diagnose(&self, sweep: &mut Sweep<T>, diagnostic: Diagnostic) {
        if self.record_diagnostics {
            sweep.diagnostics.push(diagnostic);
        }
    }

    /// Problems with a node on its own. Reported once, when the node is the
    /// left side of the window.
    fn check_node(&self, node: &PipelineNode<T>, window: &Window) -> Option<Diagnostic> {
        if !self.registry.contains(&node.kind) {
            return Some(Diagnostic::UnknownOperator {
                pass: window.pass,
                position: window.position,
                op: node.op.clone(),
            });
        }
        if node.behavior.is_none() {
            return Some(Diagnostic::MalformedNode {
                pass: window.pass,
                position: window.position,
                op: node.op.clone(),
            });
        }
        None
    }

    /// Fuse `a` followed by `b`, or explain why not.
    ///
    /// `Err(None)` means the pair is simply not fusible (or one side is already
    /// covered by [`check_node`](Self::check_node)).
    fn try_fuse(
        &self,
        a: &PipelineNode<T>,
        b: &PipelineNode<T>,
        window: &Window,
    ) -> Result<(PipelineNode<T>, FusionType), Option<Diagnostic>> {
        let (Some(desc_a), Some(desc_b)) = (self.registry.lookup(&a.kind), self.registry.lookup(&b.kind)) else {
            return Err(None);
        };
        if a.behavior.is_none() || b.behavior.is_none() {
            return Err(None);
        }

        let entry = match self.matrix.entry(&a.kind, &b.kind) {
            Some(entry) if entry.can_fuse => entry,
            _ => {
                trace!(op1 = %a.op, op2 = %b.op, position = window.position, "pair not fusible");
                return Err(None);
            }
        };
        let Some(result_kind) = entry.result.as_deref() else {
            return Err(None);
        };

        if !self.builders.contains(&a.kind, &b.kind) {
            debug!(op1 = %a.kind, op2 = %b.kind, "fusible pair has no builder");
            return Err(Some(Diagnostic::MissingFusionBuilder {
                pass: window.pass,
                position: window.position,
                op1: a.op.clone(),
                op2: b.op.clone(),
            }));
        }
        let Some(behavior) = self.builders.build(a, b) else {
            debug!(op1 = %a.kind, op2 = %b.kind, "fusion builder rejected behaviors");
            return Err(Some(Diagnostic::BuilderRejected {
                pass: window.pass,
                position: window.position,
                op1: a.op.clone(),
                op2: b.op.clone(),
            }));
        };

        let timestamp = Utc::now();
        let mut history = Vec::new();
        for parent in [a, b] {
            if let Some(provenance) = &parent.provenance {
                history.extend(provenance.history.iter().cloned());
            }
        }
        history.push(ProvenanceRecord {
            pass: window.pass,
            step: window.step,
            position: window.position,
            op1: a.op.clone(),
            op2: b.op.clone(),
            fusion_type: entry.fusion_type,
            timestamp,
        });

        let mut annotations = a.annotations.clone();
        annotations.extend(b.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));

        let op = format!("{}+{}", a.op, b.op);
        debug!(
            op = %op,
            kind = result_kind,
            fusion_type = %entry.fusion_type,
            pass = window.pass,
            position = window.position,
            "fused pair"
        );

        let fused = PipelineNode {
            op,
            kind: result_kind.to_string(),
            behavior: Some(behavior),
            args: a.args.iter().chain(&b.args).cloned().collect(),
            annotations,
            provenance: Some(FusionProvenance {
                is_fused: true,
                pass: window.pass,
                step: window.step,
                original_operators: [a.op.clone(), b.op.clone()],
                original_positions: [window.position, window.position + 1],
                fusion_type: entry.fusion_type,
                multiplicity: self.matrix.combine_multiplicity(
                    &a.kind,
                    &b.kind,
                    desc_a.multiplicity,
                    desc_b.multiplicity,
                ),
                history,
            }),
        };
        Ok((fused, entry.fusion_type))
    }
}
