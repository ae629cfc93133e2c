use lightcurve_core::{
    DetectionSet, Estimate, Observation, UndefinedReason, VarResult, VariabilityAnalyzer,
    VariabilityResult,
};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::classifier::{classify, ClassifiedCurve};
use crate::guards::{excess_sqrt, finite, nonzero_mean, ratio_to_mean, require_detections};

/// Intermediate moments of a detection set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExcessVariance {
    pub mean: f64,
    /// Unbiased sample variance (divisor N-1)
    pub sample_variance: f64,
    /// Mean of squared per-point uncertainties
    pub mean_sq_error: f64,
    pub excess: f64,
}

/// Population standard deviation (divisor N) over the mean flux.
pub fn modulation_index(detections: &DetectionSet) -> VarResult<Estimate> {
    require_detections(detections)?;
    let fluxes = detections.fluxes();
    let mean = nonzero_mean(fluxes.mean())?;
    Ok(ratio_to_mean(fluxes.population_std_dev(), mean))
}

/// Sample variance minus the mean squared measurement error.
pub fn excess_variance(detections: &DetectionSet) -> VarResult<ExcessVariance> {
    require_detections(detections)?;
    let fluxes = detections.fluxes();
    let mean = nonzero_mean(fluxes.mean())?;
    let sample_variance = fluxes.variance();
    let mean_sq_error = detections.errors().iter().map(|e| e * e).mean();

    Ok(ExcessVariance {
        mean,
        sample_variance,
        mean_sq_error,
        excess: sample_variance - mean_sq_error,
    })
}

/// `sqrt(excess / mean^2)`; undefined when the excess variance is negative.
pub fn fractional_variability(moments: &ExcessVariance) -> Estimate {
    excess_sqrt(moments.excess, moments.mean)
}

/// Propagated 1-sigma uncertainty of the fractional variability.
///
/// An undefined `frac_var` stays undefined with the same reason.
pub fn fractional_variability_error(frac_var: Estimate, moments: &ExcessVariance, n: usize) -> Estimate {
    let f = match frac_var {
        Estimate::Value(f) => f,
        undefined @ Estimate::Undefined(_) => return undefined,
    };

    let n = n as f64;
    let mu = moments.mean;
    let sigma_sq = moments.mean_sq_error;

    let relative_noise = sigma_sq / mu / mu;
    let noise_term = (2.0 / n) * relative_noise.powi(2);
    let signal_term = relative_noise * (2.0 * f).powi(2) / n;
    let aux = (noise_term + signal_term).sqrt();

    finite((f * f + aux).sqrt() - f)
}

/// Range-based index: flux spread net of the error range, over the flux sum
/// net of the error spread. Undefined when the denominator is zero.
pub fn variability_index(detections: &DetectionSet) -> VarResult<Estimate> {
    require_detections(detections)?;
    let (f_min, f_max) = bounds(detections.fluxes());
    let (e_min, e_max) = bounds(detections.errors());

    let numerator = (f_max - f_min) - (e_max + e_min);
    let denominator = (f_max + f_min) - (e_max - e_min);
    if denominator == 0.0 {
        return Ok(Estimate::Undefined(UndefinedReason::ZeroDenominator));
    }
    Ok(finite(numerator / denominator))
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Power of two near the largest absolute flux.
fn flux_scale(detections: &DetectionSet) -> f64 {
    let peak = detections.fluxes().iter().fold(0.0_f64, |m, f| m.max(f.abs()));
    if peak == 0.0 {
        return 1.0;
    }
    let exponent = (peak.log2().floor() as i32).clamp(-1022, 1023);
    2.0_f64.powi(exponent)
}

/// Fluxes and errors divided by `flux_scale`, with the factor used.
///
/// Division by a power of two is exact, so every ratio statistic is unchanged
/// while squares of very small or very large fluxes stay in range. Falls back
/// to the unscaled set (factor 1) if an error would overflow.
fn normalized(detections: &DetectionSet) -> (DetectionSet, f64) {
    let scale = flux_scale(detections);
    let fluxes = detections.fluxes().iter().map(|f| f / scale).collect();
    let errors = detections.errors().iter().map(|e| e / scale).collect();
    match DetectionSet::new(fluxes, errors) {
        Ok(scaled) => (scaled, scale),
        Err(_) => (detections.clone(), 1.0),
    }
}

/// Restore flux units in the quantities an undefined reason carries.
fn unscaled(estimate: Estimate, scale: f64) -> Estimate {
    match estimate {
        Estimate::Undefined(UndefinedReason::NegativeExcessVariance { excess }) => {
            Estimate::Undefined(UndefinedReason::NegativeExcessVariance {
                excess: excess * scale * scale,
            })
        }
        Estimate::Undefined(UndefinedReason::NonPositiveMean { mean }) => {
            Estimate::Undefined(UndefinedReason::NonPositiveMean { mean: mean * scale })
        }
        other => other,
    }
}

/// Light-curve variability engine: classification followed by estimation.
#[derive(Debug, Clone, Default)]
pub struct VariabilityEngine {
    include_variability_index: bool,
}

impl VariabilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also compute the range-based variability index.
    pub fn with_variability_index(mut self, enabled: bool) -> Self {
        self.include_variability_index = enabled;
        self
    }

    /// Estimate all statistics for one detection set.
    ///
    /// Works on fluxes rescaled by a power of two; all statistics are
    /// scale-free, so results match the unscaled formulas wherever those are
    /// representable.
    pub fn estimate(&self, detections: &DetectionSet) -> VarResult<VariabilityResult> {
        let n = require_detections(detections)?;
        let (scaled, scale) = normalized(detections);
        let moments = excess_variance(&scaled)?;

        let modulation_index = unscaled(modulation_index(&scaled)?, scale);
        let frac_var = fractional_variability(&moments);
        let frac_var_error = fractional_variability_error(frac_var, &moments, n);

        let variability_index = if self.include_variability_index {
            Some(variability_index(&scaled)?)
        } else {
            None
        };

        if let Estimate::Undefined(reason) = frac_var {
            tracing::debug!(
                n,
                sample_variance = moments.sample_variance * scale * scale,
                mean_sq_error = moments.mean_sq_error * scale * scale,
                "fractional variability undefined: {}",
                reason
            );
        }

        Ok(VariabilityResult {
            modulation_index,
            fractional_variability: unscaled(frac_var, scale),
            fractional_variability_error: unscaled(frac_var_error, scale),
            variability_index,
            detections: n,
            upper_limits: 0,
        })
    }

    /// Estimate for a classified curve, recording the upper-limit count.
    pub fn estimate_curve(&self, curve: &ClassifiedCurve) -> VarResult<VariabilityResult> {
        let mut result = self.estimate(&curve.detections)?;
        result.upper_limits = curve.censored.len();
        Ok(result)
    }
}

impl VariabilityAnalyzer for VariabilityEngine {
    fn analyze(&self, observations: &[Observation]) -> VarResult<VariabilityResult> {
        let curve = classify(observations)?;
        tracing::debug!(
            detections = curve.detections.len(),
            upper_limits = curve.censored.len(),
            "classified light curve"
        );
        self.estimate_curve(&curve)
    }
}
