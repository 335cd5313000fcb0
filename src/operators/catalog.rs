//! Standard operator catalog
//!
//! The source-level operators (`map`, `filter`, `flatMap`, `scan`, `take`,
//! `skip`) plus the kinds that only appear as fusion results (`mapFilter`,
//! `filterMap`, `takeMap`). Registering the result kinds lets a fused node
//! fuse again on a later pass.
//!
//! `fusible_before`/`fusible_after` mirror the rules by hand. They are
//! documentation; `FusibilityMatrix::validate` checks they have not drifted.

use super::descriptor::{both_stateless, single_state, FusionRule, OperatorDescriptor, StateModel};
use super::multiplicity::{conditional, expanding, sequential, Multiplicity};
use super::FusionType::{StatefulBeforeStateless, StatelessBeforeStateful, StatelessOnly};

const CONDITIONAL_EMIT: [&str; 2] = ["mapFilter", "filterMap"];

pub fn standard_operators() -> Vec<OperatorDescriptor> {
    vec![map(), filter(), flat_map(), map_filter(), filter_map(), scan(), take(), skip(), take_map()]
}

fn map() -> OperatorDescriptor {
    OperatorDescriptor::stateless("map", Multiplicity::Preserve)
        .before(&["map", "filter", "flatMap", "mapFilter", "filterMap", "scan", "take"])
        .after(&["map", "filter", "flatMap", "mapFilter", "filterMap", "scan", "take", "takeMap"])
        .rule(
            FusionRule::new("map", StatelessOnly, "map")
                .when(both_stateless)
                .notes("pure composition"),
        )
        .rule(
            FusionRule::new("filter", StatelessOnly, "mapFilter")
                .combine(conditional)
                .notes("predicate sees the mapped value"),
        )
        .rule(FusionRule::new("flatMap", StatelessOnly, "flatMap").combine(expanding))
        .rule(FusionRule::new("mapFilter", StatelessOnly, "mapFilter").combine(conditional))
        .rule(FusionRule::new("filterMap", StatelessOnly, "filterMap").combine(conditional))
        .rule(
            FusionRule::new("scan", StatelessBeforeStateful, "scan")
                .when(single_state)
                .combine(sequential)
                .notes("seed unchanged"),
        )
        .rule(
            FusionRule::new("take", StatelessBeforeStateful, "takeMap")
                .when(single_state)
                .combine(conditional)
                .notes("map preserves count, so take may count the unmapped element"),
        )
        .law("map-fusion", "map(f) . map(g) = map(x => g(f(x)))")
        .law("map-identity", "map(x => x) = id")
}

fn filter() -> OperatorDescriptor {
    OperatorDescriptor::stateless("filter", Multiplicity::Conditional)
        .before(&["map", "filter", "flatMap", "mapFilter", "filterMap"])
        .after(&["map", "filter", "flatMap", "mapFilter", "filterMap"])
        .rule(
            FusionRule::new("map", StatelessOnly, "filterMap")
                .combine(conditional)
                .notes("predicate sees the original element"),
        )
        .rule(
            FusionRule::new("filter", StatelessOnly, "filter")
                .combine(conditional)
                .notes("short-circuit conjunction"),
        )
        .rule(FusionRule::new("flatMap", StatelessOnly, "flatMap").combine(expanding))
        .rule(FusionRule::new("mapFilter", StatelessOnly, "mapFilter").combine(conditional))
        .rule(FusionRule::new("filterMap", StatelessOnly, "filterMap").combine(conditional))
        .law("filter-conjunction", "filter(p) . filter(q) = filter(x => p(x) && q(x))")
}

fn flat_map() -> OperatorDescriptor {
    OperatorDescriptor::stateless("flatMap", Multiplicity::Increase)
        .before(&["map", "filter", "flatMap"])
        .after(&["map", "filter", "flatMap"])
        .rule(
            FusionRule::new("map", StatelessOnly, "flatMap")
                .combine(expanding)
                .notes("inner map over each expansion"),
        )
        .rule(FusionRule::new("filter", StatelessOnly, "flatMap").combine(expanding))
        .rule(FusionRule::new("flatMap", StatelessOnly, "flatMap").combine(expanding))
        .law("flatMap-map", "flatMap(f) . map(g) = flatMap(x => f(x).map(g))")
        .law("flatMap-assoc", "flatMap(f) . flatMap(g) = flatMap(x => f(x).flatMap(g))")
}

fn conditional_emit(name: &str) -> OperatorDescriptor {
    let mut descriptor = OperatorDescriptor::stateless(name, Multiplicity::Conditional)
        .before(&["map", "filter", "mapFilter", "filterMap"])
        .after(&["map", "filter", "mapFilter", "filterMap"])
        .rule(FusionRule::new("map", StatelessOnly, name).combine(conditional))
        .rule(FusionRule::new("filter", StatelessOnly, name).combine(conditional));
    for target in CONDITIONAL_EMIT {
        descriptor = descriptor.rule(FusionRule::new(target, StatelessOnly, "filterMap").combine(conditional));
    }
    descriptor
}

fn map_filter() -> OperatorDescriptor {
    conditional_emit("mapFilter").law("map-filter", "map(f) . filter(p) = mapFilter(f, p)")
}

fn filter_map() -> OperatorDescriptor {
    conditional_emit("filterMap").law("filter-map", "filter(p) . map(f) = filterMap(p, f)")
}

fn scan() -> OperatorDescriptor {
    OperatorDescriptor::stateful("scan", Multiplicity::Preserve, StateModel::Accumulator)
        .before(&["map"])
        .after(&["map"])
        .rule(
            FusionRule::new("map", StatefulBeforeStateless, "scan")
                .when(single_state)
                .notes("state untouched, map applied to each emitted accumulator"),
        )
        .law("map-scan", "map(f) . scan(g, s) = scan((a, x) => g(a, f(x)), s)")
        .law("scan-map", "scan(g, s) . map(f) = scan((a, x) => f(g(a, x)), s)")
}

fn take() -> OperatorDescriptor {
    OperatorDescriptor::stateful("take", Multiplicity::Conditional, StateModel::Counter)
        .before(&["map"])
        .after(&["map"])
        .rule(
            FusionRule::new("map", StatefulBeforeStateless, "takeMap")
                .when(single_state)
                .combine(conditional)
                .notes("counts elements before the transform"),
        )
        .law("take-map", "take(n) . map(f) = takeMap(n, f)")
}

fn skip() -> OperatorDescriptor {
    OperatorDescriptor::stateful("skip", Multiplicity::Conditional, StateModel::Counter)
}

fn take_map() -> OperatorDescriptor {
    OperatorDescriptor::stateful("takeMap", Multiplicity::Conditional, StateModel::Counter)
        .before(&["map"])
        .rule(
            FusionRule::new("map", StatefulBeforeStateless, "takeMap")
                .when(single_state)
                .combine(conditional),
        )
}
