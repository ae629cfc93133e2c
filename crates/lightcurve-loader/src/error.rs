use lightcurve_core::VariabilityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("{0}")]
    Variability(#[from] VariabilityError),
}

impl LoaderError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;
