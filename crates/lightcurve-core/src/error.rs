use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which text field of an observation failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationField {
    Flux,
    FluxError,
    UpperLimit,
}

impl fmt::Display for ObservationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationField::Flux => write!(f, "flux"),
            ObservationField::FluxError => write!(f, "flux error"),
            ObservationField::UpperLimit => write!(f, "upper limit"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariabilityError {
    #[error("Malformed observation at row {row}: {field} value {text:?} is not a valid number")]
    MalformedObservation {
        row: usize,
        field: ObservationField,
        text: String,
    },

    #[error("Insufficient data: {detections} detection(s), need at least 2")]
    InsufficientData { detections: usize },

    #[error("Degenerate mean: mean flux is exactly zero")]
    DegenerateMean,

    #[error("Invalid detection set: {0}")]
    InvalidDetections(String),
}

pub type VarResult<T> = Result<T, VariabilityError>;
