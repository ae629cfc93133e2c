//! lightcurve-loader: variability statistics for Fermi-LAT light-curve exports.
//!
//! Reads one light-curve CSV per source, keeps the photon flux and its error,
//! and computes modulation index, fractional variability and its error.
//!
//! Usage:
//!   cargo run -p lightcurve-loader -- file LightCurves/source_lc.csv
//!   cargo run -p lightcurve-loader -- batch --dir LightCurves --out results.csv
//!   cargo run -p lightcurve-loader -- catalog --input browse_results_export.csv --out browse_results.csv
//!   cargo run -p lightcurve-loader -- compare --results results.csv --catalog browse_results.csv

mod batch;
mod catalog;
mod config;
mod error;
mod ingest;
mod report;

use std::path::Path;

use anyhow::{bail, Context};
use variability_analysis::VariabilityEngine;

use crate::batch::{list_light_curves, process_file, run_batch, BatchSummary};
use crate::config::{flag_value, LoaderConfig};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lightcurve_loader=info,variability_analysis=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = LoaderConfig::from_env()?;
    config.apply_args(&args);

    match args.first().map(|s| s.as_str()) {
        Some("file") => run_file(&config, &args),
        Some("batch") => run_batch_command(&config),
        Some("catalog") => run_catalog(&args),
        Some("compare") => run_compare(&args),
        _ => {
            eprintln!("Usage:");
            eprintln!("  lightcurve-loader file <csv> [--json]        Print one light curve's statistics");
            eprintln!("  lightcurve-loader batch                      Aggregate every *.csv in a directory");
            eprintln!("  lightcurve-loader catalog --input F --out G  Normalize the reference catalog");
            eprintln!("  lightcurve-loader compare --results F --catalog G [--out H]");
            eprintln!();
            eprintln!("Options:");
            eprintln!("  --dir PATH                 Light-curve directory (default: LightCurves)");
            eprintln!("  --out PATH                 Output table (default: results.csv)");
            eprintln!("  --flux-column NAME         Flux column header");
            eprintln!("  --flux-error-column NAME   Flux error column header");
            eprintln!("  --variability-index        Add the range-based variability index column");
            eprintln!("  --sequential               Process files one at a time");
            std::process::exit(1);
        }
    }
}

fn run_file(config: &LoaderConfig, args: &[String]) -> anyhow::Result<()> {
    let path = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(p) => Path::new(p),
        None => bail!("file: missing light-curve path"),
    };

    let engine = VariabilityEngine::new().with_variability_index(config.variability_index);
    let result = process_file(&engine, path, &config.columns())
        .with_context(|| format!("failed to process {}", path.display()))?;

    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("{}", result.to_line());
    }
    Ok(())
}

fn run_batch_command(config: &LoaderConfig) -> anyhow::Result<()> {
    let files = list_light_curves(&config.light_curve_dir)
        .with_context(|| format!("cannot list {}", config.light_curve_dir.display()))?;
    tracing::info!(
        "lightcurve-loader: {} files in {}, parallel={}",
        files.len(),
        config.light_curve_dir.display(),
        config.parallel
    );

    let engine = VariabilityEngine::new().with_variability_index(config.variability_index);
    let outcomes = run_batch(&engine, &files, &config.columns(), config.parallel);

    report::write_aggregate_file(&config.results_path, &outcomes, config.variability_index)
        .with_context(|| format!("cannot write {}", config.results_path.display()))?;

    let summary = BatchSummary::from_outcomes(&outcomes);
    tracing::info!(
        "Done! {} files: {} computed, {} consistent with zero, {} failed. Results saved in {}",
        summary.total,
        summary.computed,
        summary.undefined,
        summary.failed,
        config.results_path.display()
    );
    Ok(())
}

fn run_catalog(args: &[String]) -> anyhow::Result<()> {
    let input = flag_value(args, "--input").context("catalog: --input is required")?;
    let output = flag_value(args, "--out").unwrap_or("browse_results.csv");

    let entries = catalog::read_catalog_file(Path::new(input))?;
    catalog::write_catalog_file(Path::new(output), &entries)?;
    tracing::info!("normalized {} catalog entries into {}", entries.len(), output);
    Ok(())
}

fn run_compare(args: &[String]) -> anyhow::Result<()> {
    let results_path = flag_value(args, "--results").unwrap_or("results.csv");
    let catalog_path = flag_value(args, "--catalog").context("compare: --catalog is required")?;

    let results = report::read_aggregate_file(Path::new(results_path))?;
    let entries = catalog::read_catalog_file(Path::new(catalog_path))?;
    let comparisons = catalog::compare(&results, &entries);

    match flag_value(args, "--out") {
        Some(out) => {
            let file = std::fs::File::create(out).with_context(|| format!("cannot create {}", out))?;
            catalog::write_comparisons(file, &comparisons)?;
        }
        None => catalog::write_comparisons(std::io::stdout().lock(), &comparisons)?,
    }

    let agreeing = comparisons.iter().filter(|c| c.within_error == Some(true)).count();
    tracing::info!(
        "{} sources matched, {} agree within errors",
        comparisons.len(),
        agreeing
    );
    Ok(())
}
