//! Optimizer configuration

use crate::error::{FuseError, Result};
use serde::Deserialize;

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

const ENV_MAX_ITERATIONS: &str = "STREAMFUSE_MAX_ITERATIONS";
const ENV_TRACE: &str = "STREAMFUSE_TRACE";

/// Knobs for [`Optimizer`](crate::pipeline::Optimizer)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Upper bound on fusion passes. A circuit breaker: any pipeline converges
    /// in at most `len - 1` productive passes.
    pub max_iterations: usize,

    /// Record a [`FusionTraceEntry`](crate::pipeline::FusionTraceEntry) per fusion
    pub trace: bool,

    /// Collect [`Diagnostic`](crate::pipeline::Diagnostic)s for pairs left unfused
    pub record_diagnostics: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            trace: true,
            record_diagnostics: true,
        }
    }
}

impl OptimizerConfig {
    /// Set the iteration budget
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Turn fusion trace recording on or off
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Turn diagnostic collection on or off
    pub fn with_diagnostics(mut self, record: bool) -> Self {
        self.record_diagnostics = record;
        self
    }

    /// Reject a zero iteration budget
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(FuseError::InvalidConfig("max_iterations must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Defaults overridden by `STREAMFUSE_MAX_ITERATIONS` and `STREAMFUSE_TRACE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = OptimizerConfig::default();

        if let Some(raw) = lookup(ENV_MAX_ITERATIONS) {
            config.max_iterations = raw.trim().parse().map_err(|_| {
                FuseError::InvalidConfig(format!("{ENV_MAX_ITERATIONS}={raw:?} is not a positive integer"))
            })?;
        }
        if let Some(raw) = lookup(ENV_TRACE) {
            config.trace = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(FuseError::InvalidConfig(format!("{ENV_TRACE}={raw:?} is not a boolean"))),
            };
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert!(config.trace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: OptimizerConfig = serde_json::from_str(r#"{"max_iterations": 3}"#).unwrap();
        assert_eq!(config, OptimizerConfig::default().with_max_iterations(3));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = OptimizerConfig::default().with_max_iterations(0).validate().unwrap_err();
        assert!(matches!(err, FuseError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_lookup() {
        let config =
            OptimizerConfig::from_lookup(lookup(&[("STREAMFUSE_MAX_ITERATIONS", "25"), ("STREAMFUSE_TRACE", "off")]))
                .unwrap();
        assert_eq!(config.max_iterations, 25);
        assert!(!config.trace);

        assert!(OptimizerConfig::from_lookup(lookup(&[("STREAMFUSE_MAX_ITERATIONS", "many")])).is_err());
        assert!(OptimizerConfig::from_lookup(lookup(&[("STREAMFUSE_TRACE", "maybe")])).is_err());
        assert_eq!(OptimizerConfig::from_lookup(lookup(&[])).unwrap(), OptimizerConfig::default());
    }
}
