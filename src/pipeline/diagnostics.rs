//! Degraded conditions met while fusing
//!
//! None of these are errors. Each one means "this pair was left unfused" and
//! is returned alongside the result for a reporter to surface as a warning.

use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    /// Node's kind is not in the registry
    UnknownOperator { pass: usize, position: usize, op: String },

    /// Matrix allows the pair but no builder is registered for it
    MissingFusionBuilder {
        pass: usize,
        position: usize,
        op1: String,
        op2: String,
    },

    /// Node has no behavior
    MalformedNode { pass: usize, position: usize, op: String },

    /// A builder exists but did not accept the two behaviors
    BuilderRejected {
        pass: usize,
        position: usize,
        op1: String,
        op2: String,
    },
}

impl Diagnostic {
    pub fn pass(&self) -> usize {
        match self {
            Diagnostic::UnknownOperator { pass, .. }
            | Diagnostic::MissingFusionBuilder { pass, .. }
            | Diagnostic::MalformedNode { pass, .. }
            | Diagnostic::BuilderRejected { pass, .. } => *pass,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownOperator { pass, position, op } => {
                write!(f, "pass {pass}, position {position}: unknown operator '{op}' left unfused")
            }
            Diagnostic::MissingFusionBuilder { pass, position, op1, op2 } => write!(
                f,
                "pass {pass}, position {position}: no fusion builder for '{op1}' -> '{op2}'"
            ),
            Diagnostic::MalformedNode { pass, position, op } => {
                write!(f, "pass {pass}, position {position}: '{op}' has no behavior")
            }
            Diagnostic::BuilderRejected { pass, position, op1, op2 } => write!(
                f,
                "pass {pass}, position {position}: builder for '{op1}' -> '{op2}' rejected the behaviors"
            ),
        }
    }
}
