//! Human-readable and JSON summaries of an optimization run

use crate::operators::FusionType;
use crate::pipeline::{Diagnostic, FusionTraceEntry, OptimizationResult};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Summary of one [`OptimizationResult`]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionSummary {
    pub length_before: usize,
    pub length_after: usize,
    /// Fusion events across all passes
    pub fusions: usize,
    pub passes: usize,
    pub converged: bool,
    pub by_fusion_type: IndexMap<FusionType, usize>,
    pub warnings: Vec<Diagnostic>,
    pub trace: Vec<FusionTraceEntry>,
}

impl FusionSummary {
    pub fn new<T>(input_len: usize, outcome: &OptimizationResult<T>) -> Self {
        let mut by_fusion_type = IndexMap::new();
        for entry in &outcome.trace {
            *by_fusion_type.entry(entry.fusion_type).or_insert(0) += 1;
        }

        FusionSummary {
            length_before: input_len,
            length_after: outcome.result.len(),
            fusions: input_len.saturating_sub(outcome.result.len()),
            passes: outcome.iterations,
            converged: outcome.converged,
            by_fusion_type,
            warnings: outcome.diagnostics.clone(),
            trace: outcome.trace.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for FusionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes fused across {} passes ({} -> {} operators)",
            self.fusions, self.passes, self.length_before, self.length_after
        )?;
        if !self.converged {
            write!(f, ", iteration budget exhausted")?;
        }
        for (fusion_type, count) in &self.by_fusion_type {
            write!(f, "\n  {fusion_type}: {count}")?;
        }
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{optimize, PipelineNode};

    #[test]
    fn test_summary_counts() {
        let nodes = vec![
            PipelineNode::map(|x: i64| x + 1),
            PipelineNode::map(|x| x * 2),
            PipelineNode::filter(|x: &i64| *x > 3),
            PipelineNode::scan(|a, x| a + x, 0),
            PipelineNode::opaque("debounce"),
        ];
        let outcome = optimize(&nodes, 10);
        let summary = FusionSummary::new(nodes.len(), &outcome);

        assert_eq!(summary.length_before, 5);
        assert_eq!(summary.length_after, 3);
        assert_eq!(summary.fusions, 2);
        assert_eq!(summary.passes, 2);
        assert_eq!(summary.by_fusion_type[&FusionType::StatelessOnly], 2);

        let text = summary.to_string();
        assert!(text.starts_with("2 nodes fused across 2 passes (5 -> 3 operators)"));
        assert!(text.contains("warning: pass 1, position 4: unknown operator 'debounce'"));
    }

    #[test]
    fn test_summary_json() {
        let nodes = vec![PipelineNode::take(2), PipelineNode::map(|x: i64| x)];
        let outcome = optimize(&nodes, 10);
        let json: serde_json::Value =
            serde_json::from_str(&FusionSummary::new(nodes.len(), &outcome).to_json().unwrap()).unwrap();

        assert_eq!(json["fusions"], 1);
        assert_eq!(json["converged"], true);
        assert_eq!(json["trace"][0]["fusedOpName"], "take+map");
        assert_eq!(json["byFusionType"]["stateful-before-stateless"], 1);
    }

    #[test]
    fn test_budget_note() {
        let nodes: Vec<_> = (0..4).map(|n| PipelineNode::map(move |x: i64| x + n)).collect();
        let outcome = optimize(&nodes, 1);
        let text = FusionSummary::new(nodes.len(), &outcome).to_string();
        assert!(text.contains("iteration budget exhausted"));
    }
}
