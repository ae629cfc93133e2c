use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::ingest::{ColumnSelection, DEFAULT_FLUX_COLUMN, DEFAULT_FLUX_ERROR_COLUMN};

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub light_curve_dir: PathBuf,     // LightCurves
    pub results_path: PathBuf,        // results.csv
    pub flux_column: String,
    pub flux_error_column: String,
    pub variability_index: bool,      // append the range-based index column
    pub parallel: bool,               // rayon across files
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            light_curve_dir: PathBuf::from("LightCurves"),
            results_path: PathBuf::from("results.csv"),
            flux_column: DEFAULT_FLUX_COLUMN.to_string(),
            flux_error_column: DEFAULT_FLUX_ERROR_COLUMN.to_string(),
            variability_index: false,
            parallel: true,
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            light_curve_dir: lookup("LIGHTCURVE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.light_curve_dir),
            results_path: lookup("RESULTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_path),
            flux_column: lookup("FLUX_COLUMN").unwrap_or(defaults.flux_column),
            flux_error_column: lookup("FLUX_ERROR_COLUMN").unwrap_or(defaults.flux_error_column),
            variability_index: lookup("VARIABILITY_INDEX")
                .unwrap_or_else(|| "false".to_string())
                .parse::<bool>()
                .context("VARIABILITY_INDEX must be true or false")?,
            parallel: lookup("BATCH_PARALLEL")
                .unwrap_or_else(|| "true".to_string())
                .parse::<bool>()
                .context("BATCH_PARALLEL must be true or false")?,
        })
    }

    /// Command-line flags override the environment.
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(dir) = flag_value(args, "--dir") {
            self.light_curve_dir = PathBuf::from(dir);
        }
        if let Some(out) = flag_value(args, "--out") {
            self.results_path = PathBuf::from(out);
        }
        if let Some(col) = flag_value(args, "--flux-column") {
            self.flux_column = col.to_string();
        }
        if let Some(col) = flag_value(args, "--flux-error-column") {
            self.flux_error_column = col.to_string();
        }
        if args.iter().any(|a| a == "--variability-index") {
            self.variability_index = true;
        }
        if args.iter().any(|a| a == "--sequential") {
            self.parallel = false;
        }
    }

    pub fn columns(&self) -> ColumnSelection {
        ColumnSelection {
            flux: self.flux_column.clone(),
            flux_error: self.flux_error_column.clone(),
        }
    }
}

/// Value following `flag`, if present.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = LoaderConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.columns(), ColumnSelection::default());
    }

    #[test]
    fn test_env_values() {
        let vars: HashMap<&str, &str> = [
            ("LIGHTCURVE_DIR", "/data/curves"),
            ("VARIABILITY_INDEX", "true"),
            ("BATCH_PARALLEL", "false"),
            ("FLUX_COLUMN", "Flux"),
        ]
        .into_iter()
        .collect();
        let config = LoaderConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.light_curve_dir, PathBuf::from("/data/curves"));
        assert!(config.variability_index);
        assert!(!config.parallel);
        assert_eq!(config.flux_column, "Flux");
        assert_eq!(config.flux_error_column, DEFAULT_FLUX_ERROR_COLUMN);
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let result = LoaderConfig::from_lookup(|k| (k == "BATCH_PARALLEL").then(|| "yes".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_args_override() {
        let mut config = LoaderConfig::default();
        config.apply_args(&args(&["batch", "--dir", "curves", "--out", "out.csv", "--sequential"]));

        assert_eq!(config.light_curve_dir, PathBuf::from("curves"));
        assert_eq!(config.results_path, PathBuf::from("out.csv"));
        assert!(!config.parallel);
        assert!(!config.variability_index);
    }
}
