//! Error types for portfolio construction, program configuration and data loading

use thiserror::Error;

/// Errors raised while assembling a portfolio or its securities
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PortfolioError {
    #[error("weights sum should be equal to 1, received {total}")]
    WeightsDoNotSumToOne { total: f64 },

    #[error("portfolio needs at least one security")]
    NoSecurities,

    #[error("correlation matrix must be {expected}x{expected}, received {rows}x{cols}")]
    CorrelationShape { expected: usize, rows: usize, cols: usize },

    #[error("correlation matrix diagonal at {index} is {value}, expected 1")]
    CorrelationDiagonal { index: usize, value: f64 },

    #[error("correlation matrix is not symmetric at ({i}, {j})")]
    CorrelationNotSymmetric { i: usize, j: usize },

    #[error("correlation matrix entry ({i}, {j}) is not finite")]
    CorrelationNotFinite { i: usize, j: usize },

    #[error("correlation matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("unknown portfolio structure id {0}")]
    UnknownStructureId(u32),

    #[error("portfolio structure has no column for security type {0}")]
    MissingStructureColumn(String),

    #[error("invalid security type {0}: expected the keyword \"bond\" or \"stock\"")]
    InvalidSecurityType(String),

    #[error("no calibration statistics supplied for security type {0}")]
    MissingCalibration(String),

    #[error("step size must be positive and not exceed the horizon, received {0}")]
    InvalidStepSize(f64),

    #[error("simulation {index} out of range, {available} simulated")]
    SimulationOutOfRange { index: usize, available: usize },
}

/// Errors raised by the savings program engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProgramError {
    #[error("payment_rate is required for relative payment mode")]
    MissingPaymentRate,

    #[error("fixed_payment is required for fixed payment mode")]
    MissingFixedPayment,

    #[error("initial_salary is required when contributions depend on salary")]
    MissingInitialSalary,

    #[error("horizon must be at least one year")]
    EmptyHorizon,

    #[error("rate series has {actual} values but the horizon needs {required}")]
    RatesTooShort { required: usize, actual: usize },

    #[error("invalid unemployment model: {0}")]
    InvalidUnemploymentModel(String),

    #[error("life table has no entry for age {age}")]
    MissingLifeTableAge { age: u32 },

    #[error("call run() before requesting {0}")]
    NotRun(&'static str),
}

/// Errors raised while loading tabular inputs from disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} in column {column}")]
    InvalidValue { column: String, value: String },

    #[error("missing column {0}")]
    MissingColumn(String),
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = std::result::Result<T, Error>;
