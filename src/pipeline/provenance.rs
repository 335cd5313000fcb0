//! Fusion provenance and trace records
//!
//! Provenance travels with each fused node and keeps its full ancestry across
//! passes. The trace is a separate append-only log of fusion events. Neither
//! is read by any fusion decision.

use crate::operators::{FusionType, Multiplicity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One fusion step in a node's ancestry
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRecord {
    pub pass: usize,
    pub step: usize,
    /// Position of the left operand in that pass's input
    pub position: usize,
    pub op1: String,
    pub op2: String,
    pub fusion_type: FusionType,
    pub timestamp: DateTime<Utc>,
}

/// Where a fused node came from
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionProvenance {
    pub is_fused: bool,
    /// Pass that created this node
    pub pass: usize,
    /// Index of the fusion within that pass
    pub step: usize,
    pub original_operators: [String; 2],
    pub original_positions: [usize; 2],
    pub fusion_type: FusionType,
    /// Combined multiplicity of the fused operator
    pub multiplicity: Multiplicity,
    /// Parents' histories, left then right, followed by this fusion
    pub history: Vec<ProvenanceRecord>,
}

impl FusionProvenance {
    /// Number of source-level operators folded into this node
    pub fn operator_count(&self) -> usize {
        self.history.len() + 1
    }
}

/// One fusion event, as logged by a sweep
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionTraceEntry {
    pub iteration: usize,
    pub step: usize,
    pub position: usize,
    pub op1: String,
    pub op2: String,
    pub fused_op_name: String,
    pub length_before: usize,
    pub length_after: usize,
    pub fusion_type: FusionType,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pass: usize, op1: &str, op2: &str) -> ProvenanceRecord {
        ProvenanceRecord {
            pass,
            step: 0,
            position: 0,
            op1: op1.to_string(),
            op2: op2.to_string(),
            fusion_type: FusionType::StatelessOnly,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_operator_count() {
        let provenance = FusionProvenance {
            is_fused: true,
            pass: 2,
            step: 0,
            original_operators: ["map+map".to_string(), "map".to_string()],
            original_positions: [0, 1],
            fusion_type: FusionType::StatelessOnly,
            multiplicity: Multiplicity::Preserve,
            history: vec![record(1, "map", "map"), record(2, "map+map", "map")],
        };
        assert_eq!(provenance.operator_count(), 3);
    }

    #[test]
    fn test_trace_entry_serializes_camel_case() {
        let entry = FusionTraceEntry {
            iteration: 1,
            step: 0,
            position: 4,
            op1: "map".to_string(),
            op2: "filter".to_string(),
            fused_op_name: "map+filter".to_string(),
            length_before: 6,
            length_after: 5,
            fusion_type: FusionType::StatelessOnly,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["fusedOpName"], "map+filter");
        assert_eq!(json["lengthAfter"], 5);
        assert_eq!(json["fusionType"], "stateless-only");
    }
}
