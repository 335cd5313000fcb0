//! Operator model
//!
//! Descriptors for every operator kind the optimizer knows about, the
//! declarative fusion rules attached to them, and the registry that holds
//! them for the lifetime of the process.

pub mod multiplicity;
pub mod descriptor;
pub mod catalog;
pub mod registry;

pub use multiplicity::{Multiplicity, MultiplicityCombinator};
pub use descriptor::{AlgebraicLaw, Category, FusionRule, FusionType, OperatorDescriptor, RulePredicate, StateModel};
pub use catalog::standard_operators;
pub use registry::{standard_registry, OperatorRegistry};
