//! Operator descriptors and their declarative fusion rules

use super::multiplicity::{sequential, Multiplicity, MultiplicityCombinator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Whether an operator carries state across elements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Stateless,
    Stateful,
}

/// Opaque tag describing the state an operator keeps
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateModel {
    None,
    /// Running accumulator (scan)
    Accumulator,
    /// Element counter (take, skip)
    Counter,
    /// Any other kind of state, named by the operator author
    Other(String),
}

/// How two adjacent operators combine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionType {
    StatelessOnly,
    StatelessBeforeStateful,
    StatefulBeforeStateless,
    /// Reserved: two stateful operators. Never fused.
    StatefulCombine,
    NotFusible,
}

impl FusionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionType::StatelessOnly => "stateless-only",
            FusionType::StatelessBeforeStateful => "stateless-before-stateful",
            FusionType::StatefulBeforeStateless => "stateful-before-stateless",
            FusionType::StatefulCombine => "stateful-combine",
            FusionType::NotFusible => "not-fusible",
        }
    }

    /// The fusion type implied by the categories of the two operators
    pub fn for_categories(source: Category, target: Category) -> FusionType {
        match (source, target) {
            (Category::Stateless, Category::Stateless) => FusionType::StatelessOnly,
            (Category::Stateless, Category::Stateful) => FusionType::StatelessBeforeStateful,
            (Category::Stateful, Category::Stateless) => FusionType::StatefulBeforeStateless,
            (Category::Stateful, Category::Stateful) => FusionType::StatefulCombine,
        }
    }
}

impl fmt::Display for FusionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether a rule applies to a concrete (source, target) pair
pub type RulePredicate = fn(&OperatorDescriptor, &OperatorDescriptor) -> bool;

pub fn always(_source: &OperatorDescriptor, _target: &OperatorDescriptor) -> bool {
    true
}

pub fn both_stateless(source: &OperatorDescriptor, target: &OperatorDescriptor) -> bool {
    source.is_stateless() && target.is_stateless()
}

/// At most one side carries state
pub fn single_state(source: &OperatorDescriptor, target: &OperatorDescriptor) -> bool {
    source.is_stateless() || target.is_stateless()
}

/// One fusion rule, declared on the source operator
#[derive(Clone)]
pub struct FusionRule {
    /// Operator that must immediately follow the source
    pub target: String,
    pub fusion_type: FusionType,
    pub applies: RulePredicate,
    pub combine: MultiplicityCombinator,
    /// Registry key of the operator the pair fuses into
    pub result: String,
    pub notes: String,
}

impl FusionRule {
    /// Unconditional rule using the sequential multiplicity combinator
    pub fn new(target: &str, fusion_type: FusionType, result: &str) -> Self {
        FusionRule {
            target: target.to_string(),
            fusion_type,
            applies: always,
            combine: sequential,
            result: result.to_string(),
            notes: String::new(),
        }
    }

    /// Restrict the rule with a predicate over the concrete pair
    pub fn when(mut self, predicate: RulePredicate) -> Self {
        self.applies = predicate;
        self
    }

    /// Override how the pair's multiplicities combine
    pub fn combine(mut self, combinator: MultiplicityCombinator) -> Self {
        self.combine = combinator;
        self
    }

    /// Attach a human-readable note
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }
}

impl fmt::Debug for FusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FusionRule")
            .field("target", &self.target)
            .field("fusion_type", &self.fusion_type)
            .field("result", &self.result)
            .field("notes", &self.notes)
            .finish_non_exhaustive()
    }
}

/// Named equivalence justifying a rewrite. Informational only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlgebraicLaw {
    pub name: String,
    pub pattern: String,
}

/// Static description of one operator kind
#[derive(Clone, Debug)]
pub struct OperatorDescriptor {
    pub name: String,
    pub category: Category,
    pub multiplicity: Multiplicity,
    pub state_model: StateModel,
    /// Operators this one may be fused with when it comes first
    pub fusible_before: BTreeSet<String>,
    /// Operators this one may be fused with when it comes second
    pub fusible_after: BTreeSet<String>,
    pub rules: Vec<FusionRule>,
    pub laws: Vec<AlgebraicLaw>,
}

impl OperatorDescriptor {
    /// Create a stateless descriptor
    pub fn stateless(name: &str, multiplicity: Multiplicity) -> Self {
        Self::new(name, Category::Stateless, multiplicity, StateModel::None)
    }

    /// Create a stateful descriptor
    pub fn stateful(name: &str, multiplicity: Multiplicity, state_model: StateModel) -> Self {
        Self::new(name, Category::Stateful, multiplicity, state_model)
    }

    fn new(name: &str, category: Category, multiplicity: Multiplicity, state_model: StateModel) -> Self {
        OperatorDescriptor {
            name: name.to_string(),
            category,
            multiplicity,
            state_model,
            fusible_before: BTreeSet::new(),
            fusible_after: BTreeSet::new(),
            rules: Vec::new(),
            laws: Vec::new(),
        }
    }

    /// Declare operators that may directly follow this one in a fusion
    pub fn before(mut self, targets: &[&str]) -> Self {
        self.fusible_before.extend(targets.iter().map(|t| t.to_string()));
        self
    }

    /// Declare operators that may directly precede this one in a fusion
    pub fn after(mut self, sources: &[&str]) -> Self {
        self.fusible_after.extend(sources.iter().map(|s| s.to_string()));
        self
    }

    /// Add a fusion rule
    pub fn rule(mut self, rule: FusionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Attach an algebraic law
    pub fn law(mut self, name: &str, pattern: &str) -> Self {
        self.laws.push(AlgebraicLaw {
            name: name.to_string(),
            pattern: pattern.to_string(),
        });
        self
    }

    /// True for stateless operators
    pub fn is_stateless(&self) -> bool {
        self.category == Category::Stateless
    }

    /// First rule targeting `target` whose predicate accepts the pair
    pub fn rule_for(&self, target: &OperatorDescriptor) -> Option<&FusionRule> {
        self.rules
            .iter()
            .find(|rule| rule.target == target.name && (rule.applies)(self, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::multiplicity::conditional;

    #[test]
    fn test_fusion_type_for_categories() {
        use Category::*;
        assert_eq!(FusionType::for_categories(Stateless, Stateless), FusionType::StatelessOnly);
        assert_eq!(
            FusionType::for_categories(Stateless, Stateful),
            FusionType::StatelessBeforeStateful
        );
        assert_eq!(
            FusionType::for_categories(Stateful, Stateless),
            FusionType::StatefulBeforeStateless
        );
        assert_eq!(FusionType::for_categories(Stateful, Stateful), FusionType::StatefulCombine);
    }

    #[test]
    fn test_rule_for_respects_predicate() {
        let filter = OperatorDescriptor::stateless("filter", Multiplicity::Conditional);
        let scan = OperatorDescriptor::stateful("scan", Multiplicity::Preserve, StateModel::Accumulator);
        let source = OperatorDescriptor::stateless("src", Multiplicity::Preserve)
            .rule(FusionRule::new("filter", FusionType::StatelessOnly, "filter").combine(conditional))
            .rule(FusionRule::new("scan", FusionType::StatelessOnly, "scan").when(both_stateless));

        assert!(source.rule_for(&filter).is_some());
        assert!(source.rule_for(&scan).is_none());
    }

    #[test]
    fn test_fusion_type_serializes_kebab_case() {
        let json = serde_json::to_string(&FusionType::StatelessBeforeStateful).unwrap();
        assert_eq!(json, "\"stateless-before-stateful\"");
        assert_eq!(FusionType::StatefulCombine.to_string(), "stateful-combine");
    }
}
