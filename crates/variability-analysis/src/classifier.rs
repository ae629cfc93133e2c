use lightcurve_core::{
    CensoredSet, DetectionSet, FluxPoint, Observation, ObservationField, VarResult,
    VariabilityError, UPPER_LIMIT_MARKER,
};
use serde::Serialize;

/// A light curve split into detections and upper limits, each in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedCurve {
    pub detections: DetectionSet,
    pub censored: CensoredSet,
}

/// Classify one raw observation.
///
/// A flux starting with `<` is an upper limit. The export writes the marker
/// followed by one delimiter character before the number (`"< 1.2e-08"`);
/// that delimiter is skipped when present. A character that can start a
/// number is never treated as the delimiter, so `"<12"` is 12, not 2.
/// The error column of an upper limit is ignored.
pub fn classify_observation(row: usize, obs: &Observation) -> VarResult<FluxPoint> {
    let flux_text = obs.flux_raw.trim();

    if let Some(rest) = flux_text.strip_prefix(UPPER_LIMIT_MARKER) {
        let value = parse_decimal(row, ObservationField::UpperLimit, skip_delimiter(rest), &obs.flux_raw)?;
        return Ok(FluxPoint::UpperLimit { value });
    }

    let flux = parse_decimal(row, ObservationField::Flux, flux_text, &obs.flux_raw)?;
    let error = parse_decimal(
        row,
        ObservationField::FluxError,
        obs.flux_error_raw.trim(),
        &obs.flux_error_raw,
    )?;
    if error < 0.0 {
        return Err(malformed(row, ObservationField::FluxError, &obs.flux_error_raw));
    }

    Ok(FluxPoint::Detection { flux, error })
}

/// Partition observations into detections and upper limits.
///
/// Fails on the first malformed row; nothing is dropped or coerced.
pub fn classify(observations: &[Observation]) -> VarResult<ClassifiedCurve> {
    let mut fluxes = Vec::with_capacity(observations.len());
    let mut errors = Vec::with_capacity(observations.len());
    let mut censored = CensoredSet::default();

    for (row, obs) in observations.iter().enumerate() {
        match classify_observation(row, obs)? {
            FluxPoint::Detection { flux, error } => {
                fluxes.push(flux);
                errors.push(error);
            }
            FluxPoint::UpperLimit { value } => censored.values.push(value),
        }
    }

    Ok(ClassifiedCurve {
        detections: DetectionSet::new(fluxes, errors)?,
        censored,
    })
}

fn skip_delimiter(rest: &str) -> &str {
    match rest.chars().next() {
        Some(c) if !starts_number(c) => rest[c.len_utf8()..].trim_start(),
        _ => rest,
    }
}

fn starts_number(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '+' | '-')
}

fn parse_decimal(row: usize, field: ObservationField, text: &str, raw: &str) -> VarResult<f64> {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(malformed(row, field, raw)),
    }
}

fn malformed(row: usize, field: ObservationField, raw: &str) -> VariabilityError {
    VariabilityError::MalformedObservation {
        row,
        field,
        text: raw.to_string(),
    }
}
