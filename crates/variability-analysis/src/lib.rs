pub mod classifier;
pub mod estimator;
pub mod guards;


pub use classifier::{classify, classify_observation, ClassifiedCurve};
pub use estimator::{
    excess_variance, fractional_variability, fractional_variability_error, modulation_index,
    variability_index, ExcessVariance, VariabilityEngine,
};
pub use guards::MIN_DETECTIONS;
