//! Composable operator behaviors
//!
//! A [`Behavior`] is the callable part of a pipeline node. The optimizer only
//! ever wraps behaviors inside new closures; it never calls them. Closures are
//! reference counted so a fused node can share them with its parents.

use std::fmt;
use std::sync::Arc;

pub type MapFn<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
pub type PredicateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type PartialFn<T> = Arc<dyn Fn(T) -> Option<T> + Send + Sync>;
pub type ExpandFn<T> = Arc<dyn Fn(T) -> Vec<T> + Send + Sync>;
pub type StepFn<T> = Arc<dyn Fn(T, T) -> T + Send + Sync>;

/// Executable part of an operator
pub enum Behavior<T> {
    /// One output per input
    Map(MapFn<T>),

    /// Keep the element iff the predicate holds
    Filter(PredicateFn<T>),

    /// Zero or one output per input (`mapFilter`, `filterMap`)
    FilterMap(PartialFn<T>),

    /// Zero or more outputs per input
    FlatMap(ExpandFn<T>),

    /// Running fold. `step` updates the accumulator; `project`, if present,
    /// transforms each emitted accumulator without touching the state.
    Scan {
        step: StepFn<T>,
        seed: T,
        project: Option<MapFn<T>>,
    },

    /// First `count` elements
    Take { count: usize },

    /// Everything after the first `count` elements
    Skip { count: usize },

    /// First `count` elements, each transformed once by `f`
    TakeMap { count: usize, f: MapFn<T> },
}

impl<T> Behavior<T> {
    pub fn map(f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        Behavior::Map(Arc::new(f))
    }

    pub fn filter(p: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Behavior::Filter(Arc::new(p))
    }

    pub fn filter_map(f: impl Fn(T) -> Option<T> + Send + Sync + 'static) -> Self {
        Behavior::FilterMap(Arc::new(f))
    }

    pub fn flat_map(f: impl Fn(T) -> Vec<T> + Send + Sync + 'static) -> Self {
        Behavior::FlatMap(Arc::new(f))
    }

    pub fn scan(step: impl Fn(T, T) -> T + Send + Sync + 'static, seed: T) -> Self {
        Behavior::Scan {
            step: Arc::new(step),
            seed,
            project: None,
        }
    }

    /// Variant name, for logs and debug output
    pub fn variant(&self) -> &'static str {
        match self {
            Behavior::Map(_) => "Map",
            Behavior::Filter(_) => "Filter",
            Behavior::FilterMap(_) => "FilterMap",
            Behavior::FlatMap(_) => "FlatMap",
            Behavior::Scan { .. } => "Scan",
            Behavior::Take { .. } => "Take",
            Behavior::Skip { .. } => "Skip",
            Behavior::TakeMap { .. } => "TakeMap",
        }
    }

    /// Seed of a scan behavior
    pub fn seed(&self) -> Option<&T> {
        match self {
            Behavior::Scan { seed, .. } => Some(seed),
            _ => None,
        }
    }

    /// Element count of a take/skip behavior
    pub fn count(&self) -> Option<usize> {
        match self {
            Behavior::Take { count } | Behavior::Skip { count } | Behavior::TakeMap { count, .. } => {
                Some(*count)
            }
            _ => None,
        }
    }
}

impl<T: 'static> Behavior<T> {
    /// View a stateless zero-or-one behavior as a partial function.
    ///
    /// `None` for behaviors that may emit more than once or keep state.
    pub fn as_partial(&self) -> Option<PartialFn<T>> {
        match self {
            Behavior::Map(f) => {
                let f = Arc::clone(f);
                Some(Arc::new(move |x| Some(f(x))))
            }
            Behavior::Filter(p) => {
                let p = Arc::clone(p);
                Some(Arc::new(move |x| if p(&x) { Some(x) } else { None }))
            }
            Behavior::FilterMap(f) => Some(Arc::clone(f)),
            _ => None,
        }
    }
}

impl<T: Clone> Clone for Behavior<T> {
    fn clone(&self) -> Self {
        match self {
            Behavior::Map(f) => Behavior::Map(Arc::clone(f)),
            Behavior::Filter(p) => Behavior::Filter(Arc::clone(p)),
            Behavior::FilterMap(f) => Behavior::FilterMap(Arc::clone(f)),
            Behavior::FlatMap(f) => Behavior::FlatMap(Arc::clone(f)),
            Behavior::Scan { step, seed, project } => Behavior::Scan {
                step: Arc::clone(step),
                seed: seed.clone(),
                project: project.clone(),
            },
            Behavior::Take { count } => Behavior::Take { count: *count },
            Behavior::Skip { count } => Behavior::Skip { count: *count },
            Behavior::TakeMap { count, f } => Behavior::TakeMap {
                count: *count,
                f: Arc::clone(f),
            },
        }
    }
}

impl<T> fmt::Debug for Behavior<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count() {
            Some(count) => write!(f, "{}({})", self.variant(), count),
            None => f.write_str(self.variant()),
        }
    }
}
