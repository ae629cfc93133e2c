use crate::{Observation, VarResult, VariabilityResult};

/// Trait for light-curve variability engines
pub trait VariabilityAnalyzer: Send + Sync {
    fn analyze(&self, observations: &[Observation]) -> VarResult<VariabilityResult>;
}
