use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{VarResult, VariabilityError};

/// Marker that prefixes an upper-limit flux in light-curve exports.
pub const UPPER_LIMIT_MARKER: char = '<';

/// One raw light-curve sample, as text, after unrelated columns are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub flux_raw: String,
    pub flux_error_raw: String,
}

impl Observation {
    pub fn new(flux_raw: impl Into<String>, flux_error_raw: impl Into<String>) -> Self {
        Self {
            flux_raw: flux_raw.into(),
            flux_error_raw: flux_error_raw.into(),
        }
    }
}

/// A classified sample. Decided once at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FluxPoint {
    Detection { flux: f64, error: f64 },
    UpperLimit { value: f64 },
}

/// Aligned fluxes and errors of the detected points of one light curve.
///
/// Construction enforces equal lengths, finite values and non-negative errors.
/// Length is not checked here; the estimator reports too-short sets itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSet {
    fluxes: Vec<f64>,
    errors: Vec<f64>,
}

impl DetectionSet {
    pub fn new(fluxes: Vec<f64>, errors: Vec<f64>) -> VarResult<Self> {
        if fluxes.len() != errors.len() {
            return Err(VariabilityError::InvalidDetections(format!(
                "{} fluxes but {} errors",
                fluxes.len(),
                errors.len()
            )));
        }
        if let Some(i) = fluxes.iter().position(|f| !f.is_finite()) {
            return Err(VariabilityError::InvalidDetections(format!(
                "flux at index {} is not finite",
                i
            )));
        }
        if let Some(i) = errors.iter().position(|e| !e.is_finite() || *e < 0.0) {
            return Err(VariabilityError::InvalidDetections(format!(
                "error at index {} is negative or not finite",
                i
            )));
        }
        Ok(Self { fluxes, errors })
    }

    pub fn fluxes(&self) -> &[f64] {
        &self.fluxes
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.fluxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluxes.is_empty()
    }
}

/// Upper limits of one light curve, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensoredSet {
    pub values: Vec<f64>,
}

impl CensoredSet {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Why a statistic has no numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UndefinedReason {
    /// Noise variance exceeds the sample variance; consistent with no variability.
    NegativeExcessVariance { excess: f64 },
    /// Mean flux is negative, so a ratio against it has no meaning.
    NonPositiveMean { mean: f64 },
    /// Range-based index with a zero denominator.
    ZeroDenominator,
    /// The value overflowed or lost all precision in double arithmetic.
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::NegativeExcessVariance { excess } => write!(
                f,
                "negative excess variance ({:e}), consistent with zero variability",
                excess
            ),
            UndefinedReason::NonPositiveMean { mean } => {
                write!(f, "non-positive mean flux ({:e})", mean)
            }
            UndefinedReason::ZeroDenominator => write!(f, "zero denominator"),
            UndefinedReason::NonFinite => write!(f, "not representable as a finite double"),
        }
    }
}

/// A statistic that is either computed or explicitly undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Estimate {
    Value(f64),
    Undefined(UndefinedReason),
}

impl Estimate {
    pub fn value(&self) -> Option<f64> {
        match self {
            Estimate::Value(v) => Some(*v),
            Estimate::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Estimate::Value(_))
    }

    pub fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Estimate::Value(_) => None,
            Estimate::Undefined(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Value(v) => write!(f, "{}", v),
            Estimate::Undefined(_) => write!(f, "undefined"),
        }
    }
}

/// Variability statistics of one light curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityResult {
    pub modulation_index: Estimate,
    pub fractional_variability: Estimate,
    pub fractional_variability_error: Estimate,
    #[serde(default)]
    pub variability_index: Option<Estimate>,
    pub detections: usize,
    pub upper_limits: usize,
}

impl VariabilityResult {
    /// Single comma-delimited line, no header: modulation index, fractional
    /// variability, fractional variability error.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{}",
            self.modulation_index, self.fractional_variability, self.fractional_variability_error
        )
    }

    /// Distinct undefined reasons across all fields, joined for display.
    pub fn note(&self) -> String {
        let mut reasons: Vec<String> = Vec::new();
        let fields = [
            Some(self.modulation_index),
            Some(self.fractional_variability),
            Some(self.fractional_variability_error),
            self.variability_index,
        ];
        for reason in fields.iter().flatten().filter_map(|e| e.reason()) {
            let text = reason.to_string();
            if !reasons.contains(&text) {
                reasons.push(text);
            }
        }
        reasons.join("; ")
    }

    pub fn is_fully_defined(&self) -> bool {
        self.modulation_index.is_defined()
            && self.fractional_variability.is_defined()
            && self.fractional_variability_error.is_defined()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computed(mi: f64, fv: f64, dfv: f64) -> VariabilityResult {
        VariabilityResult {
            modulation_index: Estimate::Value(mi),
            fractional_variability: Estimate::Value(fv),
            fractional_variability_error: Estimate::Value(dfv),
            variability_index: None,
            detections: 5,
            upper_limits: 0,
        }
    }

    #[test]
    fn test_detection_set_rejects_misaligned() {
        let err = DetectionSet::new(vec![1.0, 2.0], vec![0.1]).unwrap_err();
        assert!(matches!(err, VariabilityError::InvalidDetections(_)));
    }

    #[test]
    fn test_detection_set_rejects_negative_error() {
        let err = DetectionSet::new(vec![1.0, 2.0], vec![0.1, -0.1]).unwrap_err();
        assert!(matches!(err, VariabilityError::InvalidDetections(_)));
    }

    #[test]
    fn test_detection_set_rejects_nan_flux() {
        assert!(DetectionSet::new(vec![f64::NAN, 2.0], vec![0.1, 0.1]).is_err());
    }

    #[test]
    fn test_to_line_computed() {
        let result = computed(0.5, 0.25, 0.125);
        assert_eq!(result.to_line(), "0.5,0.25,0.125");
        assert!(result.note().is_empty());
        assert!(result.is_fully_defined());
    }

    #[test]
    fn test_to_line_undefined() {
        let reason = UndefinedReason::NegativeExcessVariance { excess: -25.0 };
        let result = VariabilityResult {
            fractional_variability: Estimate::Undefined(reason),
            fractional_variability_error: Estimate::Undefined(reason),
            ..computed(0.0, 0.0, 0.0)
        };
        assert_eq!(result.to_line(), "0,undefined,undefined");
        assert!(result.note().starts_with("negative excess variance"));
        // Same reason on two fields is reported once
        assert!(!result.note().contains(';'));
        assert!(!result.is_fully_defined());
    }

    #[test]
    fn test_non_finite_reason_in_note() {
        let result = VariabilityResult {
            fractional_variability_error: Estimate::Undefined(UndefinedReason::NonFinite),
            ..computed(0.5, 0.25, 0.0)
        };
        assert_eq!(result.to_line(), "0.5,0.25,undefined");
        assert_eq!(result.note(), "not representable as a finite double");
    }

    #[test]
    fn test_estimate_serializes_with_tag() {
        let json = serde_json::to_string(&Estimate::Value(1.5)).unwrap();
        assert_eq!(json, r#"{"Value":1.5}"#);
        let back: Estimate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Estimate::Value(1.5));
    }
}
