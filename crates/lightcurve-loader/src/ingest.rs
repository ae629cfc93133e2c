//! Light-curve CSV ingestion.
//!
//! Keeps only the flux and flux-error columns of a light-curve export and
//! hands them to the classifier as raw text. Dates, spectral index, fit
//! diagnostics and the analysis log never leave this module.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use lightcurve_core::Observation;

use crate::error::{LoaderError, LoaderResult};

pub const DEFAULT_FLUX_COLUMN: &str = "Photon Flux [0.1-100 GeV](photons cm-2 s-1)";
pub const DEFAULT_FLUX_ERROR_COLUMN: &str = "Photon Flux Error(photons cm-2 s-1)";

/// Header names of the two columns the estimator consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub flux: String,
    pub flux_error: String,
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self {
            flux: DEFAULT_FLUX_COLUMN.to_string(),
            flux_error: DEFAULT_FLUX_ERROR_COLUMN.to_string(),
        }
    }
}

/// Parse a light-curve table into raw observations, in file order.
pub fn read_observations<R: Read>(
    reader: R,
    columns: &ColumnSelection,
) -> LoaderResult<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let flux_idx = column_index(&headers, &columns.flux)?;
    let error_idx = column_index(&headers, &columns.flux_error)?;

    let mut observations = Vec::new();
    for result in reader.records() {
        let record = result?;
        observations.push(Observation::new(
            record.get(flux_idx).unwrap_or(""),
            record.get(error_idx).unwrap_or(""),
        ));
    }

    Ok(observations)
}

/// Open and parse one light-curve file.
pub fn load_light_curve(path: &Path, columns: &ColumnSelection) -> LoaderResult<Vec<Observation>> {
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    read_observations(file, columns)
}

/// Source name from a light-curve file name: everything before the fourth
/// underscore counted from the right.
pub fn source_name(file_name: &str) -> &str {
    file_name.rsplitn(5, '_').last().unwrap_or(file_name)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> LoaderResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoaderError::MissingColumn(name.to_string()))
}
