use std::fs;
use std::path::{Path, PathBuf};

use lightcurve_core::{VariabilityAnalyzer, VariabilityResult};
use rayon::prelude::*;

use crate::error::{LoaderError, LoaderResult};
use crate::ingest::{load_light_curve, source_name, ColumnSelection};

/// Result of one light-curve file. Failures stay attached to their file.
#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub source_name: String,
    pub result: LoaderResult<VariabilityResult>,
}

/// Counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub computed: usize,
    pub undefined: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = BatchSummary {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match &outcome.result {
                Ok(r) if r.is_fully_defined() => summary.computed += 1,
                Ok(_) => summary.undefined += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// `*.csv` files directly inside `dir`, sorted by file name.
pub fn list_light_curves(dir: &Path) -> LoaderResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| LoaderError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LoaderError::io(dir, e))?.path();
        let is_csv = path.extension().map(|ext| ext == "csv").unwrap_or(false);
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load, classify and estimate a single light-curve file.
pub fn process_file<A: VariabilityAnalyzer>(
    analyzer: &A,
    path: &Path,
    columns: &ColumnSelection,
) -> LoaderResult<VariabilityResult> {
    let observations = load_light_curve(path, columns)?;
    Ok(analyzer.analyze(&observations)?)
}

/// Process every file in isolation. One outcome per file, in input order,
/// whether or not it succeeded.
pub fn run_batch<A: VariabilityAnalyzer>(
    analyzer: &A,
    files: &[PathBuf],
    columns: &ColumnSelection,
    parallel: bool,
) -> Vec<FileOutcome> {
    let total = files.len();
    let run_one = |(i, path): (usize, &PathBuf)| {
        let outcome = process_outcome(analyzer, path, columns);
        match &outcome.result {
            Ok(result) => tracing::info!(
                "[{}/{}] {} => {}",
                i + 1,
                total,
                outcome.file_name,
                result.to_line()
            ),
            Err(e) => tracing::warn!("[{}/{}] {} failed: {}", i + 1, total, outcome.file_name, e),
        }
        outcome
    };

    if parallel {
        files.par_iter().enumerate().map(run_one).collect()
    } else {
        files.iter().enumerate().map(run_one).collect()
    }
}

fn process_outcome<A: VariabilityAnalyzer>(
    analyzer: &A,
    path: &Path,
    columns: &ColumnSelection,
) -> FileOutcome {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    FileOutcome {
        source_name: source_name(&file_name).to_string(),
        result: process_file(analyzer, path, columns),
        file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightcurve_core::VariabilityError;
    use std::fs;
    use variability_analysis::VariabilityEngine;

    fn columns() -> ColumnSelection {
        ColumnSelection {
            flux: "Flux".to_string(),
            flux_error: "Flux Error".to_string(),
        }
    }

    fn write_curve(dir: &Path, name: &str, rows: &[(&str, &str)]) -> PathBuf {
        let mut body = String::from("Date(UTC),TS,Flux,Flux Error,Analysis Log\n");
        for (flux, err) in rows {
            body.push_str(&format!("2010-01-01,25.0,{},{},ok\n", flux, err));
        }
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_list_light_curves_sorted_csv_only() {
        let dir = tempfile::tempdir().unwrap();
        write_curve(dir.path(), "b_src.csv", &[]);
        write_curve(dir.path(), "a_src.csv", &[]);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_light_curves(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a_src.csv", "b_src.csv"]);
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_light_curves(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }

    #[test]
    fn test_batch_isolates_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let ramp = [("10", "1"), ("12", "1"), ("14", "1"), ("16", "1"), ("18", "1")];
        write_curve(dir.path(), "alpha_weekly_1-100GeV_x_lc.csv", &ramp);
        write_curve(dir.path(), "beta_weekly_1-100GeV_x_lc.csv", &[("1.0", "0.1"), ("abc", "0.1")]);
        write_curve(dir.path(), "gamma_weekly_1-100GeV_x_lc.csv", &ramp);

        let files = list_light_curves(dir.path()).unwrap();
        let engine = VariabilityEngine::new();

        for parallel in [false, true] {
            let outcomes = run_batch(&engine, &files, &columns(), parallel);

            assert_eq!(outcomes.len(), 3);
            assert_eq!(outcomes[0].source_name, "alpha");
            assert!(outcomes[0].result.is_ok());
            assert!(matches!(
                outcomes[1].result,
                Err(LoaderError::Variability(VariabilityError::MalformedObservation { row: 1, .. }))
            ));
            assert_eq!(outcomes[2].source_name, "gamma");
            assert!(outcomes[2].result.is_ok());

            let summary = BatchSummary::from_outcomes(&outcomes);
            assert_eq!(summary, BatchSummary { total: 3, computed: 2, undefined: 0, failed: 1 });
        }
    }

    #[test]
    fn test_summary_counts_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_curve(dir.path(), "flat.csv", &[("10", "5"), ("10", "5"), ("10", "5")]);

        let outcomes = run_batch(&VariabilityEngine::new(), &[path], &columns(), false);
        let summary = BatchSummary::from_outcomes(&outcomes);

        assert_eq!(summary.undefined, 1);
        assert_eq!(summary.failed, 0);
    }
}
