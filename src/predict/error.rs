use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TleError {
    #[error("expected 2 or 3 non-empty lines, got {0}")]
    LineCount(usize),
    #[error("line {line}: expected 69 columns, got {len}")]
    LineLength { line: u8, len: usize },
    #[error("line {line}: must start with '{line} '")]
    LineNumber { line: u8 },
    #[error("line {line}: invalid {field}: {value:?}")]
    InvalidField {
        line: u8,
        field: &'static str,
        value: String,
    },
    #[error("catalog numbers disagree: line 1 has {line1}, line 2 has {line2}")]
    CatalogMismatch { line1: u32, line2: u32 },
    #[error("{field} out of bounds: {value}")]
    OutOfBounds { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("model rejected elements: {0}")]
    Initialization(String),
    #[error("propagation failed: {0}")]
    Model(String),
    #[error("satellite decayed (radius {radius_km:.1} km)")]
    Decayed { radius_km: f64 },
    #[error("instant is not representable relative to epoch")]
    InvalidInstant,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("TLE directory or file not found: {0}")]
    NotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {file}: {source}")]
    InvalidTle { file: String, source: TleError },
    #[error(transparent)]
    Tle(#[from] TleError),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
