//! Reference catalog ingestion and validation.
//!
//! The catalog lists published fractional variability per source. It is read
//! from a CSV export of the catalog sheet, normalized, and used only to check
//! computed results; it never feeds the estimator.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::report::AggregateRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub flux_1_100_gev: Option<f64>,
    #[serde(default)]
    pub assoc_name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub frac_variability: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub frac_variability_error: Option<f64>,
    #[serde(default)]
    pub source_type: Option<String>,
}

impl CatalogEntry {
    /// Spaces in the name become underscores; the source type is lower-cased.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().replace(' ', "_");
        self.source_type = self.source_type.map(|t| t.trim().to_lowercase());
        self
    }
}

/// Catalog value next to the computed one for a single source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogComparison {
    pub name: String,
    pub source_type: Option<String>,
    pub catalog_frac_var: Option<f64>,
    pub computed_frac_var: Option<f64>,
    pub difference: Option<f64>,
    /// |difference| within the combined 1-sigma errors, when both errors are known
    pub within_error: Option<bool>,
}

/// Read and normalize catalog entries. Columns other than the catalog's own are ignored.
pub fn read_catalog<R: Read>(reader: R) -> LoaderResult<Vec<CatalogEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for result in rdr.deserialize::<CatalogEntry>() {
        entries.push(result?.normalized());
    }
    Ok(entries)
}

pub fn read_catalog_file(path: &Path) -> LoaderResult<Vec<CatalogEntry>> {
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    read_catalog(file)
}

pub fn write_catalog<W: Write>(writer: W, entries: &[CatalogEntry]) -> LoaderResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_catalog_file(path: &Path, entries: &[CatalogEntry]) -> LoaderResult<()> {
    let file = File::create(path).map_err(|e| LoaderError::io(path, e))?;
    write_catalog(file, entries)
}

/// Join computed results with the catalog by source name, in catalog order.
/// Catalog sources without a computed row are skipped.
pub fn compare(results: &[AggregateRow], catalog: &[CatalogEntry]) -> Vec<CatalogComparison> {
    let by_name: HashMap<&str, &AggregateRow> =
        results.iter().map(|r| (r.name.as_str(), r)).collect();

    let comparisons: Vec<CatalogComparison> = catalog
        .iter()
        .filter_map(|entry| {
            let row = by_name.get(entry.name.as_str())?;
            let difference = match (row.fractional_variability, entry.frac_variability) {
                (Some(computed), Some(reference)) => Some(computed - reference),
                _ => None,
            };
            let within_error = match (
                difference,
                row.fractional_variability_error,
                entry.frac_variability_error,
            ) {
                (Some(d), Some(e1), Some(e2)) => Some(d.abs() <= (e1 * e1 + e2 * e2).sqrt()),
                _ => None,
            };

            Some(CatalogComparison {
                name: entry.name.clone(),
                source_type: entry.source_type.clone(),
                catalog_frac_var: entry.frac_variability,
                computed_frac_var: row.fractional_variability,
                difference,
                within_error,
            })
        })
        .collect();

    tracing::debug!(
        "matched {} of {} catalog sources against {} results",
        comparisons.len(),
        catalog.len(),
        results.len()
    );
    comparisons
}

pub fn write_comparisons<W: Write>(writer: W, comparisons: &[CatalogComparison]) -> LoaderResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for comparison in comparisons {
        wtr.serialize(comparison)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
