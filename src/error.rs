use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Numeric layer
// ---------------------------------------------------------------------------

/// Failures of checked [`Matrix`](crate::data::matrix::Matrix) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("expected {expected} elements for a {rows}x{cols} matrix, got {actual}")]
    ElementCount {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    #[error("a {rows}x{cols} matrix is too large to address")]
    TooLarge { rows: usize, cols: usize },

    #[error("index ({row}, {col}) outside a {rows}x{cols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
}

/// Failures while partitioning or reducing pin-power stacks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReductionError {
    #[error("no pin-power matrices to reduce")]
    Empty,

    #[error("{matrices} matrices cannot be split evenly into {assemblies} assemblies")]
    Partition { matrices: usize, assemblies: usize },

    #[error("shape mismatch at assembly {assembly}, axial level {axial}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        assembly: usize,
        axial: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("layout mismatch: expected {expected_assemblies} assemblies x {expected_axial} axial levels, found {found_assemblies} x {found_axial}")]
    Layout {
        expected_assemblies: usize,
        expected_axial: usize,
        found_assemblies: usize,
        found_axial: usize,
    },

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact name '{0}'")]
    InvalidName(String),

    #[error("failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Why a strategy could not be built or did not execute successfully.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("feature '{feature}' is missing from {source_name}")]
    MissingFeature { feature: String, source_name: String },

    #[error("feature '{feature}' is malformed: {reason}")]
    MalformedFeature { feature: String, reason: String },

    #[error("a reference data set is required")]
    ReferenceRequired,

    #[error("unsupported value '{value}' for parameter '{parameter}'")]
    Unsupported { parameter: String, value: String },

    #[error("no sub-analysis is enabled")]
    NothingEnabled,

    #[error("strategy '{0}' has already been executed")]
    AlreadyExecuted(String),

    #[error(transparent)]
    Reduction(#[from] ReductionError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Why the registry refused to hand out a strategy.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("no data providers were supplied")]
    NoProviders,

    #[error("no builder registered under '{0}'")]
    UnknownStrategy(String),

    #[error("strategy '{0}' is not available for the loaded data")]
    Unavailable(String),

    #[error("invalid parameter '{parameter}' for '{strategy}': {reason}")]
    InvalidParameter {
        strategy: String,
        parameter: String,
        reason: String,
    },

    #[error("building '{name}' failed: {source}")]
    Build {
        name: String,
        #[source]
        source: StrategyError,
    },
}

// ---------------------------------------------------------------------------
// Document / configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("data provider '{0}' has no time steps")]
    EmptyProvider(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    Validation { field: String, message: String },
}
