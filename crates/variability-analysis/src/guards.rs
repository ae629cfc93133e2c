//! Numeric edge-case guards shared by the estimators.
//! Stateless, no logging.

use lightcurve_core::{DetectionSet, Estimate, UndefinedReason, VarResult, VariabilityError};

/// Fewest detections with a finite-sample variance.
pub const MIN_DETECTIONS: usize = 2;

/// Fail with `InsufficientData` below `MIN_DETECTIONS`.
pub fn require_detections(detections: &DetectionSet) -> VarResult<usize> {
    let n = detections.len();
    if n < MIN_DETECTIONS {
        return Err(VariabilityError::InsufficientData { detections: n });
    }
    Ok(n)
}

/// Fail with `DegenerateMean` when the mean is exactly zero.
pub fn nonzero_mean(mean: f64) -> VarResult<f64> {
    if mean == 0.0 {
        return Err(VariabilityError::DegenerateMean);
    }
    Ok(mean)
}

/// `Value` for a finite result, `Undefined(NonFinite)` otherwise.
pub fn finite(value: f64) -> Estimate {
    if value.is_finite() {
        Estimate::Value(value)
    } else {
        Estimate::Undefined(UndefinedReason::NonFinite)
    }
}

/// Square root of a normalized excess variance, undefined for a negative radicand.
///
/// Divides by the mean twice; `mean * mean` underflows for tiny fluxes.
pub fn excess_sqrt(excess: f64, mean: f64) -> Estimate {
    if excess < 0.0 {
        return Estimate::Undefined(UndefinedReason::NegativeExcessVariance { excess });
    }
    finite((excess / mean / mean).sqrt())
}

/// Ratio against the mean, undefined when the mean is negative.
pub fn ratio_to_mean(numerator: f64, mean: f64) -> Estimate {
    if mean < 0.0 {
        return Estimate::Undefined(UndefinedReason::NonPositiveMean { mean });
    }
    finite(numerator / mean)
}
