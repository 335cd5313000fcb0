//! Fusibility matrix
//!
//! Pairwise lookup of whether two operators fuse, how, and into what. Built
//! once from the descriptors' fusion rules and never from their adjacency
//! lists; [`FusibilityMatrix::validate`] checks the two have not drifted.

use crate::error::{FuseError, Result};
use crate::operators::multiplicity::sequential;
use crate::operators::{
    standard_registry, Category, FusionType, Multiplicity, MultiplicityCombinator, OperatorDescriptor,
    OperatorRegistry,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::warn;

/// Matrix cell for one ordered (source, target) pair
#[derive(Clone, Debug)]
pub struct FusibilityEntry {
    pub can_fuse: bool,
    pub fusion_type: FusionType,
    /// Operator kind the pair fuses into
    pub result: Option<String>,
    pub combine: MultiplicityCombinator,
    pub notes: String,
}

impl FusibilityEntry {
    fn reserved_stateful() -> Self {
        FusibilityEntry {
            can_fuse: false,
            fusion_type: FusionType::StatefulCombine,
            result: None,
            combine: sequential,
            notes: "complex state combination".to_string(),
        }
    }
}

/// Source -> target -> entry
#[derive(Clone, Debug, Default)]
pub struct FusibilityMatrix {
    entries: IndexMap<String, IndexMap<String, FusibilityEntry>>,
}

impl FusibilityMatrix {
    /// Derive the matrix from the registry's fusion rules.
    ///
    /// The first applicable rule for a pair wins. Rules naming unknown
    /// operators are skipped. Every stateful/stateful pair gets the reserved
    /// `stateful-combine` entry, whatever the rules say.
    pub fn from_registry(registry: &OperatorRegistry) -> Self {
        let mut matrix = FusibilityMatrix::default();

        for source in registry.iter() {
            for rule in &source.rules {
                let Some(target) = registry.lookup(&rule.target) else {
                    warn!(source = %source.name, target = %rule.target, "fusion rule names unknown operator");
                    continue;
                };
                if matrix.entry(&source.name, &target.name).is_some() || !(rule.applies)(source, target) {
                    continue;
                }
                if source.category == Category::Stateful && target.category == Category::Stateful {
                    warn!(source = %source.name, target = %target.name, "ignoring rule for two stateful operators");
                    continue;
                }
                let can_fuse = !matches!(
                    rule.fusion_type,
                    FusionType::NotFusible | FusionType::StatefulCombine
                );
                matrix.insert(
                    &source.name,
                    &target.name,
                    FusibilityEntry {
                        can_fuse,
                        fusion_type: rule.fusion_type,
                        result: Some(rule.result.clone()),
                        combine: rule.combine,
                        notes: rule.notes.clone(),
                    },
                );
            }
        }

        let stateful: Vec<&str> = registry
            .iter()
            .filter(|d| d.category == Category::Stateful)
            .map(|d| d.name.as_str())
            .collect();
        for source in &stateful {
            for target in &stateful {
                matrix.insert(source, target, FusibilityEntry::reserved_stateful());
            }
        }

        matrix
    }

    fn insert(&mut self, source: &str, target: &str, entry: FusibilityEntry) {
        self.entries
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string(), entry);
    }

    /// Cell for an ordered pair, if either operator has rules
    pub fn entry(&self, source: &str, target: &str) -> Option<&FusibilityEntry> {
        self.entries.get(source)?.get(target)
    }

    /// Whether the pair may be fused
    pub fn can_fuse(&self, source: &str, target: &str) -> bool {
        self.entry(source, target).is_some_and(|e| e.can_fuse)
    }

    /// Fusion type of the pair's cell
    pub fn fusion_type(&self, source: &str, target: &str) -> Option<FusionType> {
        self.entry(source, target).map(|e| e.fusion_type)
    }

    /// Multiplicity of the fused pair. Pairs without a fusible entry fall back
    /// to plain stage-by-stage composition.
    pub fn combine_multiplicity(
        &self,
        source: &str,
        target: &str,
        m_source: Multiplicity,
        m_target: Multiplicity,
    ) -> Multiplicity {
        match self.entry(source, target) {
            Some(entry) if entry.can_fuse => (entry.combine)(m_source, m_target),
            _ => sequential(m_source, m_target),
        }
    }

    /// All (source, target) pairs with `can_fuse == true`
    pub fn fusible_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(source, row)| {
            row.iter()
                .filter(|(_, entry)| entry.can_fuse)
                .map(move |(target, _)| (source.as_str(), target.as_str()))
        })
    }

    /// Number of populated cells
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    /// True if no cell is populated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cross-check the matrix against the registry it was built from.
    ///
    /// Fails on rules naming unknown operators, fusion types that contradict
    /// the operators' categories, multiplicity combinators that disagree with
    /// the result descriptor, and any drift between fusible pairs and the
    /// descriptors' `fusible_before`/`fusible_after` lists.
    pub fn validate(&self, registry: &OperatorRegistry) -> Result<()> {
        for source in registry.iter() {
            for rule in &source.rules {
                if !registry.contains(&rule.target) {
                    return Err(FuseError::UnknownOperator {
                        name: rule.target.clone(),
                        context: format!("fusion rule of '{}'", source.name),
                    });
                }
            }
        }

        for (source_name, row) in &self.entries {
            for (target_name, entry) in row.iter().filter(|(_, e)| e.can_fuse) {
                let source = lookup(registry, source_name)?;
                let target = lookup(registry, target_name)?;
                check_entry(registry, source, target, entry)?;
            }
        }

        for descriptor in registry.iter() {
            for target in &descriptor.fusible_before {
                if !self.can_fuse(&descriptor.name, target) {
                    return Err(drift(&descriptor.name, target, "listed in fusible_before but not fusible"));
                }
            }
            for source in &descriptor.fusible_after {
                if !self.can_fuse(source, &descriptor.name) {
                    return Err(drift(source, &descriptor.name, "listed in fusible_after but not fusible"));
                }
            }
        }

        Ok(())
    }
}

fn lookup<'r>(registry: &'r OperatorRegistry, name: &str) -> Result<&'r OperatorDescriptor> {
    registry.lookup(name).ok_or_else(|| FuseError::UnknownOperator {
        name: name.to_string(),
        context: "fusibility matrix".to_string(),
    })
}

fn check_entry(
    registry: &OperatorRegistry,
    source: &OperatorDescriptor,
    target: &OperatorDescriptor,
    entry: &FusibilityEntry,
) -> Result<()> {
    let expected = FusionType::for_categories(source.category, target.category);
    if entry.fusion_type != expected {
        return Err(FuseError::InvalidRule {
            first: source.name.clone(),
            second: target.name.clone(),
            message: format!("declared {}, categories imply {}", entry.fusion_type, expected),
        });
    }

    let result_name = entry.result.as_deref().unwrap_or_default();
    let result = registry.lookup(result_name).ok_or_else(|| FuseError::UnknownOperator {
        name: result_name.to_string(),
        context: format!("result of {}->{}", source.name, target.name),
    })?;
    let combined = (entry.combine)(source.multiplicity, target.multiplicity);
    if combined != result.multiplicity {
        return Err(FuseError::MultiplicityMismatch {
            first: source.name.clone(),
            second: target.name.clone(),
            result: result_name.to_string(),
            combined: combined.to_string(),
            declared: result.multiplicity.to_string(),
        });
    }

    if !source.fusible_before.contains(&target.name) {
        return Err(drift(&source.name, &target.name, "target missing from fusible_before"));
    }
    if !target.fusible_after.contains(&source.name) {
        return Err(drift(&source.name, &target.name, "source missing from fusible_after"));
    }
    Ok(())
}

fn drift(source: &str, target: &str, message: &str) -> FuseError {
    FuseError::AdjacencyDrift {
        first: source.to_string(),
        second: target.to_string(),
        message: message.to_string(),
    }
}

static STANDARD: Lazy<FusibilityMatrix> = Lazy::new(|| FusibilityMatrix::from_registry(standard_registry()));

/// Matrix for the standard registry, initialized on first use
pub fn standard_matrix() -> &'static FusibilityMatrix {
    &STANDARD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{FusionRule, OperatorDescriptor, StateModel};
    use Multiplicity::*;

    #[test]
    fn test_standard_matrix_validates() {
        standard_matrix().validate(standard_registry()).unwrap();
    }

    #[test]
    fn test_stateless_pairs() {
        let m = standard_matrix();
        assert!(m.can_fuse("map", "map"));
        assert_eq!(m.fusion_type("map", "map"), Some(FusionType::StatelessOnly));
        assert!(m.can_fuse("filter", "filter"));
        assert!(m.can_fuse("flatMap", "map"));
        assert_eq!(m.entry("map", "filter").unwrap().result.as_deref(), Some("mapFilter"));
        assert_eq!(m.entry("filter", "map").unwrap().result.as_deref(), Some("filterMap"));
    }

    #[test]
    fn test_mixed_pairs() {
        let m = standard_matrix();
        assert_eq!(m.fusion_type("map", "scan"), Some(FusionType::StatelessBeforeStateful));
        assert_eq!(m.fusion_type("scan", "map"), Some(FusionType::StatefulBeforeStateless));
        assert_eq!(m.fusion_type("take", "map"), Some(FusionType::StatefulBeforeStateless));
        assert!(!m.can_fuse("filter", "scan"));
        assert_eq!(m.fusion_type("filter", "scan"), None);
    }

    #[test]
    fn test_stateful_pairs_reserved() {
        let m = standard_matrix();
        for (a, b) in [("scan", "scan"), ("take", "scan"), ("scan", "take"), ("skip", "takeMap")] {
            assert!(!m.can_fuse(a, b), "{a}->{b}");
            let entry = m.entry(a, b).unwrap();
            assert_eq!(entry.fusion_type, FusionType::StatefulCombine);
            assert_eq!(entry.notes, "complex state combination");
        }
    }

    #[test]
    fn test_unknown_operators() {
        let m = standard_matrix();
        assert!(!m.can_fuse("map", "debounce"));
        assert_eq!(m.fusion_type("debounce", "map"), None);
    }

    #[test]
    fn test_combine_multiplicity() {
        let m = standard_matrix();
        assert_eq!(m.combine_multiplicity("map", "map", Preserve, Preserve), Preserve);
        assert_eq!(m.combine_multiplicity("filter", "filter", Conditional, Conditional), Conditional);
        assert_eq!(m.combine_multiplicity("flatMap", "map", Increase, Preserve), Increase);
        assert_eq!(m.combine_multiplicity("map", "flatMap", Preserve, Increase), Increase);
        assert_eq!(m.combine_multiplicity("take", "map", Conditional, Preserve), Conditional);
        assert_eq!(m.combine_multiplicity("scan", "scan", Preserve, Preserve), Preserve);
    }

    #[test]
    fn test_cell_count() {
        assert!(FusibilityMatrix::from_registry(&OperatorRegistry::new()).is_empty());

        let registry = OperatorRegistry::from_descriptors([
            OperatorDescriptor::stateless("a", Preserve)
                .before(&["a"])
                .after(&["a"])
                .rule(FusionRule::new("a", FusionType::StatelessOnly, "a")),
            OperatorDescriptor::stateful("debounce", Preserve, StateModel::Other("timer".to_string())),
        ])
        .unwrap();
        let matrix = FusibilityMatrix::from_registry(&registry);

        // a->a from its rule, debounce->debounce reserved
        assert_eq!(matrix.len(), 2);
        assert!(!matrix.is_empty());
        assert!(matrix.can_fuse("a", "a"));
        assert!(!matrix.can_fuse("debounce", "debounce"));
        matrix.validate(&registry).unwrap();
    }

    #[test]
    fn test_stateful_rule_ignored() {
        let registry = OperatorRegistry::from_descriptors([
            OperatorDescriptor::stateful("a", Preserve, StateModel::Counter)
                .before(&["b"])
                .rule(FusionRule::new("b", FusionType::StatefulCombine, "a")),
            OperatorDescriptor::stateful("b", Preserve, StateModel::Counter).after(&["a"]),
        ])
        .unwrap();
        let matrix = FusibilityMatrix::from_registry(&registry);

        assert!(!matrix.can_fuse("a", "b"));
        assert!(matches!(matrix.validate(&registry), Err(FuseError::AdjacencyDrift { .. })));
    }

    #[test]
    fn test_drift_detected() {
        let registry = OperatorRegistry::from_descriptors([
            OperatorDescriptor::stateless("a", Preserve).rule(FusionRule::new("b", FusionType::StatelessOnly, "b")),
            OperatorDescriptor::stateless("b", Preserve),
        ])
        .unwrap();
        let matrix = FusibilityMatrix::from_registry(&registry);

        assert!(matrix.can_fuse("a", "b"));
        let err = matrix.validate(&registry).unwrap_err();
        assert_eq!(
            err,
            FuseError::AdjacencyDrift {
                first: "a".to_string(),
                second: "b".to_string(),
                message: "target missing from fusible_before".to_string(),
            }
        );
    }

    #[test]
    fn test_multiplicity_mismatch_detected() {
        let registry = OperatorRegistry::from_descriptors([
            OperatorDescriptor::stateless("a", Conditional)
                .before(&["a"])
                .after(&["a"])
                .rule(FusionRule::new("a", FusionType::StatelessOnly, "b")),
            OperatorDescriptor::stateless("b", Preserve),
        ])
        .unwrap();
        let matrix = FusibilityMatrix::from_registry(&registry);

        assert!(matches!(
            matrix.validate(&registry),
            Err(FuseError::MultiplicityMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_fusion_type_detected() {
        let registry = OperatorRegistry::from_descriptors([
            OperatorDescriptor::stateless("a", Preserve)
                .before(&["s"])
                .rule(FusionRule::new("s", FusionType::StatelessOnly, "s")),
            OperatorDescriptor::stateful("s", Preserve, StateModel::Accumulator).after(&["a"]),
        ])
        .unwrap();
        let matrix = FusibilityMatrix::from_registry(&registry);

        assert!(matches!(matrix.validate(&registry), Err(FuseError::InvalidRule { .. })));
    }
}
