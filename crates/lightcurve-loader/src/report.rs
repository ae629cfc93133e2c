use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::FileOutcome;
use crate::error::{LoaderError, LoaderResult};

pub const NAME_HEADER: &str = "Name";
pub const MODULATION_INDEX_HEADER: &str = "Modulation Index";
pub const FRAC_VAR_HEADER: &str = "Fractional Variability";
pub const FRAC_VAR_ERROR_HEADER: &str = "Fractional Variability Error";
pub const VARIABILITY_INDEX_HEADER: &str = "Variability Index";
pub const NOTE_HEADER: &str = "Note";

/// One row of an aggregate results table, read back for validation.
/// Undefined or empty numeric cells come back as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Modulation Index", deserialize_with = "csv::invalid_option")]
    pub modulation_index: Option<f64>,
    #[serde(rename = "Fractional Variability", deserialize_with = "csv::invalid_option")]
    pub fractional_variability: Option<f64>,
    #[serde(
        rename = "Fractional Variability Error",
        deserialize_with = "csv::invalid_option"
    )]
    pub fractional_variability_error: Option<f64>,
    #[serde(rename = "Note", default)]
    pub note: String,
}

/// Write the aggregate table: one row per outcome, always.
pub fn write_aggregate<W: Write>(
    writer: W,
    outcomes: &[FileOutcome],
    include_variability_index: bool,
) -> LoaderResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        NAME_HEADER,
        MODULATION_INDEX_HEADER,
        FRAC_VAR_HEADER,
        FRAC_VAR_ERROR_HEADER,
    ];
    if include_variability_index {
        header.push(VARIABILITY_INDEX_HEADER);
    }
    header.push(NOTE_HEADER);
    wtr.write_record(&header)?;

    for outcome in outcomes {
        let mut row: Vec<String> = match &outcome.result {
            Ok(result) => vec![
                outcome.source_name.clone(),
                result.modulation_index.to_string(),
                result.fractional_variability.to_string(),
                result.fractional_variability_error.to_string(),
            ],
            Err(_) => vec![outcome.file_name.clone(), String::new(), String::new(), String::new()],
        };
        if include_variability_index {
            let vi = match &outcome.result {
                Ok(result) => result
                    .variability_index
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                Err(_) => String::new(),
            };
            row.push(vi);
        }
        row.push(match &outcome.result {
            Ok(result) => result.note(),
            Err(e) => format!("Error: {}", e),
        });
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_aggregate_file(
    path: &Path,
    outcomes: &[FileOutcome],
    include_variability_index: bool,
) -> LoaderResult<()> {
    let file = File::create(path).map_err(|e| LoaderError::io(path, e))?;
    write_aggregate(file, outcomes, include_variability_index)
}

/// Read an aggregate table written by `write_aggregate`.
pub fn read_aggregate<R: Read>(reader: R) -> LoaderResult<Vec<AggregateRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

pub fn read_aggregate_file(path: &Path) -> LoaderResult<Vec<AggregateRow>> {
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    read_aggregate(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightcurve_core::{Estimate, UndefinedReason, VariabilityError, VariabilityResult};

    fn outcome(name: &str, result: Result<VariabilityResult, LoaderError>) -> FileOutcome {
        FileOutcome {
            file_name: format!("{}_a_b_c_lc.csv", name),
            source_name: name.to_string(),
            result,
        }
    }

    fn computed() -> VariabilityResult {
        VariabilityResult {
            modulation_index: Estimate::Value(0.5),
            fractional_variability: Estimate::Value(0.25),
            fractional_variability_error: Estimate::Value(0.125),
            variability_index: Some(Estimate::Value(0.1)),
            detections: 10,
            upper_limits: 2,
        }
    }

    fn sample_outcomes() -> Vec<FileOutcome> {
        let reason = UndefinedReason::NegativeExcessVariance { excess: -2.0 };
        vec![
            outcome("alpha", Ok(computed())),
            outcome(
                "beta",
                Err(LoaderError::Variability(VariabilityError::InsufficientData { detections: 1 })),
            ),
            outcome(
                "gamma",
                Ok(VariabilityResult {
                    fractional_variability: Estimate::Undefined(reason),
                    fractional_variability_error: Estimate::Undefined(reason),
                    ..computed()
                }),
            ),
        ]
    }

    fn render(outcomes: &[FileOutcome], vi: bool) -> String {
        let mut buf = Vec::new();
        write_aggregate(&mut buf, outcomes, vi).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_one_row_per_outcome() {
        let text = render(&sample_outcomes(), false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Name,Modulation Index,Fractional Variability,Fractional Variability Error,Note"
        );
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "alpha,0.5,0.25,0.125,");
        assert!(lines[2].starts_with("beta_a_b_c_lc.csv,,,,\"Error: Insufficient data"));
        assert!(lines[3].starts_with("gamma,0.5,undefined,undefined,"));
    }

    #[test]
    fn test_variability_index_column() {
        let text = render(&sample_outcomes(), true);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].ends_with("Variability Index,Note"));
        assert_eq!(lines[1], "alpha,0.5,0.25,0.125,0.1,");
    }

    #[test]
    fn test_read_back() {
        let text = render(&sample_outcomes(), true);
        let rows = read_aggregate(text.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "alpha");
        assert_eq!(rows[0].fractional_variability, Some(0.25));
        assert_eq!(rows[1].modulation_index, None);
        assert!(rows[1].note.starts_with("Error:"));
        assert_eq!(rows[2].fractional_variability, None);
        assert_eq!(rows[2].modulation_index, Some(0.5));
    }
}
