//! Fusion builder table
//!
//! One synthesis function per ordered operator pair, looked up by both kinds
//! together. A builder wraps the two input behaviors in a new closure; it must
//! not call either of them.

use super::behavior::{Behavior, ExpandFn, MapFn, PartialFn, PredicateFn};
use super::matrix::FusibilityMatrix;
use crate::error::{FuseError, Result};
use crate::operators::OperatorRegistry;
use crate::pipeline::PipelineNode;
use std::collections::HashMap;
use std::sync::Arc;

/// Synthesizes the fused behavior for an adjacent (source, target) pair.
///
/// Returns `None` when the nodes' behaviors do not have the expected shape.
pub type FusionBuilder<T> =
    Arc<dyn Fn(&PipelineNode<T>, &PipelineNode<T>) -> Option<Behavior<T>> + Send + Sync>;

/// Builders keyed by `(source kind, target kind)`
pub struct FusionBuilderTable<T> {
    builders: HashMap<(String, String), FusionBuilder<T>>,
}

const CONDITIONAL_EMIT: [&str; 2] = ["mapFilter", "filterMap"];

impl<T: Clone + Send + Sync + 'static> FusionBuilderTable<T> {
    /// Table with no builders
    pub fn new() -> Self {
        FusionBuilderTable {
            builders: HashMap::new(),
        }
    }

    /// Builders for every fusible pair of the standard catalog
    pub fn standard() -> Self {
        let mut table = Self::new();

        table.register(("map", "map"), map_map);
        table.register(("map", "filter"), map_filter);
        table.register(("filter", "map"), filter_map);
        table.register(("filter", "filter"), filter_filter);

        table.register(("flatMap", "map"), flat_map_map);
        table.register(("map", "flatMap"), map_flat_map);
        table.register(("filter", "flatMap"), filter_flat_map);
        table.register(("flatMap", "filter"), flat_map_filter);
        table.register(("flatMap", "flatMap"), flat_map_flat_map);

        for kind in CONDITIONAL_EMIT {
            for simple in ["map", "filter"] {
                table.register((kind, simple), partial_chain);
                table.register((simple, kind), partial_chain);
            }
            for other in CONDITIONAL_EMIT {
                table.register((kind, other), partial_chain);
            }
        }

        table.register(("map", "scan"), map_scan);
        table.register(("scan", "map"), scan_map);

        table.register(("take", "map"), take_map);
        table.register(("map", "take"), map_take);
        table.register(("takeMap", "map"), take_map_map);

        table
    }

    /// Register the builder for an ordered pair, replacing any previous one
    pub fn register<F>(&mut self, pair: (&str, &str), builder: F) -> Option<FusionBuilder<T>>
    where
        F: Fn(&PipelineNode<T>, &PipelineNode<T>) -> Option<Behavior<T>> + Send + Sync + 'static,
    {
        self.builders
            .insert((pair.0.to_string(), pair.1.to_string()), Arc::new(builder))
    }

    /// Drop the builder for a pair
    pub fn unregister(&mut self, source: &str, target: &str) -> Option<FusionBuilder<T>> {
        self.builders.remove(&(source.to_string(), target.to_string()))
    }

    /// Builder registered for an ordered pair
    pub fn get(&self, source: &str, target: &str) -> Option<&FusionBuilder<T>> {
        self.builders.get(&(source.to_string(), target.to_string()))
    }

    /// Whether a builder is registered for an ordered pair
    pub fn contains(&self, source: &str, target: &str) -> bool {
        self.get(source, target).is_some()
    }

    /// Synthesize the fused behavior of `a` followed by `b`.
    ///
    /// `None` if no builder is registered for the pair or the builder rejects
    /// the nodes.
    pub fn build(&self, a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
        let builder = self.get(&a.kind, &b.kind)?;
        builder(a, b)
    }

    /// Fusible pairs of `matrix` that have no builder
    pub fn missing(&self, matrix: &FusibilityMatrix) -> Vec<(String, String)> {
        matrix
            .fusible_pairs()
            .filter(|(source, target)| !self.contains(source, target))
            .map(|(source, target)| (source.to_string(), target.to_string()))
            .collect()
    }

    /// Every builder must name registered operators and a fusible pair
    pub fn validate(&self, registry: &OperatorRegistry, matrix: &FusibilityMatrix) -> Result<()> {
        let mut pairs: Vec<_> = self.builders.keys().collect();
        pairs.sort();
        for (source, target) in pairs {
            for name in [source, target] {
                if !registry.contains(name) {
                    return Err(FuseError::UnknownOperator {
                        name: name.clone(),
                        context: format!("fusion builder {}->{}", source, target),
                    });
                }
            }
            if !matrix.can_fuse(source, target) {
                return Err(FuseError::BuilderForNonFusiblePair {
                    first: source.clone(),
                    second: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Number of registered builders
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// True if no builder is registered
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for FusionBuilderTable<T> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<T> Clone for FusionBuilderTable<T> {
    fn clone(&self) -> Self {
        FusionBuilderTable {
            builders: self.builders.clone(),
        }
    }
}

fn behaviors<'n, T>(a: &'n PipelineNode<T>, b: &'n PipelineNode<T>) -> Option<(&'n Behavior<T>, &'n Behavior<T>)> {
    Some((a.behavior.as_ref()?, b.behavior.as_ref()?))
}

// Builders. `f` is always applied before `g`.

fn map_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Map(f), Behavior::Map(g)) = behaviors(a, b)? else {
        return None;
    };
    Some(Behavior::Map(compose(f, g)))
}

fn map_filter<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Map(f), Behavior::Filter(p)) = behaviors(a, b)? else {
        return None;
    };
    let (f, p) = (Arc::clone(f), Arc::clone(p));
    Some(Behavior::filter_map(move |x| {
        let v = f(x);
        if p(&v) {
            Some(v)
        } else {
            None
        }
    }))
}

fn filter_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Filter(p), Behavior::Map(f)) = behaviors(a, b)? else {
        return None;
    };
    let (p, f) = (Arc::clone(p), Arc::clone(f));
    Some(Behavior::filter_map(move |x| if p(&x) { Some(f(x)) } else { None }))
}

fn filter_filter<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Filter(p1), Behavior::Filter(p2)) = behaviors(a, b)? else {
        return None;
    };
    let (p1, p2): (PredicateFn<T>, PredicateFn<T>) = (Arc::clone(p1), Arc::clone(p2));
    Some(Behavior::filter(move |x| p1(x) && p2(x)))
}

fn flat_map_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::FlatMap(f), Behavior::Map(g)) = behaviors(a, b)? else {
        return None;
    };
    let (f, g) = (Arc::clone(f), Arc::clone(g));
    Some(Behavior::flat_map(move |x| f(x).into_iter().map(|v| g(v)).collect()))
}

fn map_flat_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Map(f), Behavior::FlatMap(g)) = behaviors(a, b)? else {
        return None;
    };
    let (f, g) = (Arc::clone(f), Arc::clone(g));
    Some(Behavior::flat_map(move |x| g(f(x))))
}

fn filter_flat_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Filter(p), Behavior::FlatMap(g)) = behaviors(a, b)? else {
        return None;
    };
    let (p, g) = (Arc::clone(p), Arc::clone(g));
    Some(Behavior::flat_map(move |x| if p(&x) { g(x) } else { Vec::new() }))
}

fn flat_map_filter<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::FlatMap(f), Behavior::Filter(p)) = behaviors(a, b)? else {
        return None;
    };
    let (f, p) = (Arc::clone(f), Arc::clone(p));
    Some(Behavior::flat_map(move |x| f(x).into_iter().filter(|v| p(v)).collect()))
}

fn flat_map_flat_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::FlatMap(f), Behavior::FlatMap(g)) = behaviors(a, b)? else {
        return None;
    };
    let (f, g): (ExpandFn<T>, ExpandFn<T>) = (Arc::clone(f), Arc::clone(g));
    Some(Behavior::flat_map(move |x| f(x).into_iter().flat_map(|v| g(v)).collect()))
}

/// Any two zero-or-one stateless behaviors chain as partial functions
fn partial_chain<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (first, second) = behaviors(a, b)?;
    let f: PartialFn<T> = first.as_partial()?;
    let g: PartialFn<T> = second.as_partial()?;
    Some(Behavior::filter_map(move |x| f(x).and_then(|v| g(v))))
}

fn map_scan<T: Clone + 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Map(f), Behavior::Scan { step, seed, project }) = behaviors(a, b)? else {
        return None;
    };
    let (f, g) = (Arc::clone(f), Arc::clone(step));
    Some(Behavior::Scan {
        step: Arc::new(move |acc: T, x: T| g(acc, f(x))),
        seed: seed.clone(),
        project: project.clone(),
    })
}

fn scan_map<T: Clone + 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Scan { step, seed, project }, Behavior::Map(f)) = behaviors(a, b)? else {
        return None;
    };
    let project = match project {
        Some(p) => compose(p, f),
        None => Arc::clone(f),
    };
    Some(Behavior::Scan {
        step: Arc::clone(step),
        seed: seed.clone(),
        project: Some(project),
    })
}

fn take_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Take { count }, Behavior::Map(f)) = behaviors(a, b)? else {
        return None;
    };
    Some(Behavior::TakeMap {
        count: *count,
        f: Arc::clone(f),
    })
}

fn map_take<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::Map(f), Behavior::Take { count }) = behaviors(a, b)? else {
        return None;
    };
    Some(Behavior::TakeMap {
        count: *count,
        f: Arc::clone(f),
    })
}

fn take_map_map<T: 'static>(a: &PipelineNode<T>, b: &PipelineNode<T>) -> Option<Behavior<T>> {
    let (Behavior::TakeMap { count, f }, Behavior::Map(g)) = behaviors(a, b)? else {
        return None;
    };
    Some(Behavior::TakeMap {
        count: *count,
        f: compose(f, g),
    })
}

fn compose<T: 'static>(f: &MapFn<T>, g: &MapFn<T>) -> MapFn<T> {
    let (f, g) = (Arc::clone(f), Arc::clone(g));
    Arc::new(move |x: T| g(f(x)))
}
