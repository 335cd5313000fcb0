//! Multiplicity impact of operators and the combinators used when fusing them
//!
//! There is no single closed-form algebra here. Each fusion rule picks the
//! combinator that matches what the fused operator actually does.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many outputs one input element may produce
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Multiplicity {
    /// Exactly one output per input
    Preserve,
    /// Zero or more outputs per input
    Increase,
    /// Zero or one output per input
    Conditional,
}

impl Multiplicity {
    /// Multiplicity of running `self` and then `next` as two separate stages
    pub fn then(self, next: Multiplicity) -> Multiplicity {
        use Multiplicity::*;
        match (self, next) {
            (Increase, _) | (_, Increase) => Increase,
            (Conditional, _) | (_, Conditional) => Conditional,
            (Preserve, Preserve) => Preserve,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Multiplicity::Preserve => "preserve",
            Multiplicity::Increase => "increase",
            Multiplicity::Conditional => "conditional",
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combines the multiplicities of a source and a target operator
pub type MultiplicityCombinator = fn(Multiplicity, Multiplicity) -> Multiplicity;

/// Stage-by-stage composition: `preserve∘preserve = preserve`, otherwise the
/// looser of the two wins.
pub fn sequential(source: Multiplicity, target: Multiplicity) -> Multiplicity {
    source.then(target)
}

/// An `increase` operator on either side makes the whole fused chain `increase`.
pub fn expanding(_source: Multiplicity, _target: Multiplicity) -> Multiplicity {
    Multiplicity::Increase
}

/// Filter/take-like compositions: either side may drop the element, so the
/// result is `conditional` unless something expands.
pub fn conditional(source: Multiplicity, target: Multiplicity) -> Multiplicity {
    match source.then(target) {
        Multiplicity::Increase => Multiplicity::Increase,
        _ => Multiplicity::Conditional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Multiplicity::*;

    #[test]
    fn test_sequential_preserve() {
        assert_eq!(sequential(Preserve, Preserve), Preserve);
        assert_eq!(sequential(Preserve, Conditional), Conditional);
        assert_eq!(sequential(Conditional, Preserve), Conditional);
    }

    #[test]
    fn test_increase_infects_chain() {
        for m in [Preserve, Increase, Conditional] {
            assert_eq!(sequential(Increase, m), Increase);
            assert_eq!(sequential(m, Increase), Increase);
            assert_eq!(expanding(m, Preserve), Increase);
        }
    }

    #[test]
    fn test_filter_filter_is_conditional() {
        assert_eq!(conditional(Conditional, Conditional), Conditional);
        assert_eq!(conditional(Preserve, Preserve), Conditional);
        assert_eq!(conditional(Conditional, Increase), Increase);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Conditional).unwrap();
        assert_eq!(json, "\"conditional\"");
    }
}
