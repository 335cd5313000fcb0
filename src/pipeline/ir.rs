//! Intermediate representation for operator pipelines
//!
//! A pipeline is a linear sequence of [`PipelineNode`]s, as produced by an
//! external parser or pipeline builder, before fusion.

use super::provenance::FusionProvenance;
use crate::fusion::Behavior;
use indexmap::IndexMap;
use serde_json::Value;

/// One operator invocation in a pipeline
#[derive(Clone, Debug)]
pub struct PipelineNode<T> {
    /// Display name. `"map"` for a source node, `"map+map"` once fused.
    pub op: String,

    /// Registry key used for every fusion decision
    pub kind: String,

    /// `None` marks a malformed node; it is passed through unfused
    pub behavior: Option<Behavior<T>>,

    /// Ordered auxiliary parameters (the count of `take`, ...)
    pub args: Vec<Value>,

    /// Free-form metadata. Carried along, never interpreted.
    pub annotations: IndexMap<String, Value>,

    pub provenance: Option<FusionProvenance>,
}

impl<T> PipelineNode<T> {
    /// Node whose label and registry key are both `kind`
    pub fn new(kind: &str, behavior: Behavior<T>) -> Self {
        PipelineNode {
            op: kind.to_string(),
            kind: kind.to_string(),
            behavior: Some(behavior),
            args: Vec::new(),
            annotations: IndexMap::new(),
            provenance: None,
        }
    }

    /// Node without a behavior
    pub fn opaque(kind: &str) -> Self {
        PipelineNode {
            op: kind.to_string(),
            kind: kind.to_string(),
            behavior: None,
            args: Vec::new(),
            annotations: IndexMap::new(),
            provenance: None,
        }
    }

    pub fn map(f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        Self::new("map", Behavior::map(f))
    }

    pub fn filter(p: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self::new("filter", Behavior::filter(p))
    }

    pub fn flat_map(f: impl Fn(T) -> Vec<T> + Send + Sync + 'static) -> Self {
        Self::new("flatMap", Behavior::flat_map(f))
    }

    pub fn scan(step: impl Fn(T, T) -> T + Send + Sync + 'static, seed: T) -> Self {
        Self::new("scan", Behavior::scan(step, seed))
    }

    pub fn take(count: usize) -> Self {
        Self::new("take", Behavior::Take { count }).with_arg(count)
    }

    pub fn skip(count: usize) -> Self {
        Self::new("skip", Behavior::Skip { count }).with_arg(count)
    }

    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_annotation(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.to_string(), value.into());
        self
    }

    pub fn is_fused(&self) -> bool {
        self.provenance.as_ref().is_some_and(|p| p.is_fused)
    }
}

/// Operator labels of a pipeline, in order
pub fn op_names<T>(nodes: &[PipelineNode<T>]) -> Vec<&str> {
    nodes.iter().map(|node| node.op.as_str()).collect()
}

/// Same length and same op labels in order. Behaviors are not compared.
pub fn same_shape<T>(a: &[PipelineNode<T>], b: &[PipelineNode<T>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.op == y.op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = PipelineNode::map(|x: i64| x + 1).with_annotation("line", 3);
        assert_eq!(node.op, "map");
        assert_eq!(node.kind, "map");
        assert!(node.behavior.is_some());
        assert!(!node.is_fused());
        assert_eq!(node.annotations["line"], Value::from(3));
    }

    #[test]
    fn test_take_carries_count_arg() {
        let node = PipelineNode::<i64>::take(4);
        assert_eq!(node.args, vec![Value::from(4)]);
        assert_eq!(node.behavior.as_ref().and_then(|b| b.count()), Some(4));
    }

    #[test]
    fn test_same_shape_ignores_behaviors() {
        let a = vec![PipelineNode::map(|x: i64| x + 1), PipelineNode::opaque("scan")];
        let b = vec![PipelineNode::map(|x: i64| x * 7), PipelineNode::opaque("scan")];
        let c = vec![PipelineNode::map(|x: i64| x + 1)];

        assert!(same_shape(&a, &b));
        assert!(!same_shape(&a, &c));
        assert_eq!(op_names(&a), vec!["map", "scan"]);
    }
}
