//! Error types
//!
//! Only configuration-time operations (registering operators and builders,
//! validating the fusibility model, loading config) and the reference executor
//! are fallible. Optimization itself never errors: degraded conditions are
//! reported as [`Diagnostic`](crate::pipeline::Diagnostic) values instead.

/// Result type alias for streamfuse operations
pub type Result<T> = std::result::Result<T, FuseError>;

/// Errors raised while building or validating the fusion model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FuseError {
    /// An operator with the same name is already registered
    #[error("operator '{0}' is already registered")]
    DuplicateOperator(String),

    /// A rule, builder or lookup names an operator the registry does not know
    #[error("unknown operator '{name}' referenced by {context}")]
    UnknownOperator { name: String, context: String },

    /// The matrix and the descriptors' adjacency lists disagree about a pair
    #[error("fusibility drift for {first}->{second}: {message}")]
    AdjacencyDrift {
        first: String,
        second: String,
        message: String,
    },

    /// A rule declares a fusion type its operators' categories do not allow
    #[error("invalid rule {first}->{second}: {message}")]
    InvalidRule {
        first: String,
        second: String,
        message: String,
    },

    /// A rule's multiplicity combinator disagrees with its result descriptor
    #[error(
        "multiplicity mismatch for {first}->{second}: rule yields {combined}, '{result}' declares {declared}"
    )]
    MultiplicityMismatch {
        first: String,
        second: String,
        result: String,
        combined: String,
        declared: String,
    },

    /// A builder was registered for a pair the matrix does not allow to fuse
    #[error("fusion builder registered for non-fusible pair {first}->{second}")]
    BuilderForNonFusiblePair { first: String, second: String },

    /// A node reached the reference executor without a behavior
    #[error("node {position} ('{op}') has no behavior")]
    MalformedNode { op: String, position: usize },

    /// Configuration value out of range or unparsable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FuseError::DuplicateOperator("map".to_string());
        assert_eq!(err.to_string(), "operator 'map' is already registered");

        let err = FuseError::MalformedNode {
            op: "filter".to_string(),
            position: 3,
        };
        assert_eq!(err.to_string(), "node 3 ('filter') has no behavior");
    }
}
