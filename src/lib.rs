//! Retirement Projection - Monte-Carlo engine for funded retirement-savings programs
//!
//! This library provides:
//! - Correlated stock/bond portfolio simulation (Cholesky + parallel Monte-Carlo)
//! - Salary and employment-shock macro models
//! - A six-stage contribution, co-financing and fee accrual pipeline
//! - Savings, ROI, IRR, TWR, pension and replacement-ratio metrics
//! - Scenario configuration and batch runs across simulated paths

pub mod config;
pub mod error;
pub mod life_table;
pub mod macro_models;
pub mod metrics;
pub mod program;
pub mod scenario;
pub mod securities;

// Re-export commonly used types
pub use config::ScenarioConfig;
pub use error::{Error, Result};
pub use life_table::LifeTable;
pub use metrics::{Metrics, METRIC_KEYS};
pub use program::{DetailedReport, ProgramEngine, ProgramInput, ProgramKind, Sex, Trajectory};
pub use scenario::{summarize, MetricSummary, ScenarioRunner};
pub use securities::{PortfolioModel, PortfolioPaths, Security, SimulationConfig};
