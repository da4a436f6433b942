//! Assemble portfolio securities from a fund structure table and market statistics
//!
//! A security type name decides the process: names containing `stock` become
//! equities, names containing `bond` become mean-reverting yields. Weights come
//! from the fund structure table; process parameters come from summary
//! statistics of historical series supplied by the caller.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{BondParameters, Security, StockParameters, TRADING_DAYS};
use crate::error::{LoadError, PortfolioError};

/// Default bond mean-reversion speed
pub const DEFAULT_MEAN_REVERSION: f64 = 0.1;

/// Default bond long-run mean yield
pub const DEFAULT_LONG_RUN_YIELD: f64 = 0.07;

/// Process family derived from a security type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityKind {
    Stock,
    Bond,
}

impl SecurityKind {
    pub fn from_type_name(name: &str) -> Result<Self, PortfolioError> {
        if name.contains("stock") {
            Ok(SecurityKind::Stock)
        } else if name.contains("bond") {
            Ok(SecurityKind::Bond)
        } else {
            Err(PortfolioError::InvalidSecurityType(name.to_string()))
        }
    }
}

/// One fund's allocation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRow {
    pub id: u32,
    /// Weight per security type, aligned with `PortfolioStructure::security_types`
    pub weights: Vec<f64>,
}

/// Portfolio allocation table: fund id x security type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStructure {
    pub security_types: Vec<String>,
    pub rows: Vec<StructureRow>,
}

impl PortfolioStructure {
    /// Load from a CSV with an `id` column followed by one column per security type
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_reader(File::open(path)?)
    }

    /// Load from any reader (e.g. string buffer)
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv::Reader::from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.get(0).map(str::trim) != Some("id") {
            return Err(LoadError::MissingColumn("id".to_string()));
        }
        let security_types: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let id = parse_field(&record, 0, "id")?;
            let weights = (1..record.len())
                .map(|i| parse_field(&record, i, &security_types[i - 1]))
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push(StructureRow { id, weights });
        }

        Ok(Self { security_types, rows })
    }

    /// Weight of `security_type`: averaged over rows of `id`, or over all rows when
    /// no id is given.
    pub fn weight(&self, security_type: &str, id: Option<u32>) -> Result<f64, PortfolioError> {
        let column = self
            .security_types
            .iter()
            .position(|t| t == security_type)
            .ok_or_else(|| PortfolioError::MissingStructureColumn(security_type.to_string()))?;

        let selected: Vec<f64> = self
            .rows
            .iter()
            .filter(|row| id.map_or(true, |id| row.id == id))
            .filter_map(|row| row.weights.get(column).copied())
            .collect();

        if selected.is_empty() {
            return Err(match id {
                Some(id) => PortfolioError::UnknownStructureId(id),
                None => PortfolioError::MissingStructureColumn(security_type.to_string()),
            });
        }

        Ok(selected.iter().sum::<f64>() / selected.len() as f64)
    }

    pub fn contains_id(&self, id: u32) -> bool {
        self.rows.iter().any(|row| row.id == id)
    }
}

fn parse_field<T: std::str::FromStr>(record: &csv::StringRecord, index: usize, column: &str) -> Result<T, LoadError> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse().map_err(|_| LoadError::InvalidValue {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Summary statistics of a daily equity return series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub mean_daily_return: f64,
    pub std_daily_return: f64,
}

impl ReturnStatistics {
    pub fn from_daily_returns(returns: &[f64]) -> Self {
        let (mean, std) = mean_and_sample_std(returns);
        Self { mean_daily_return: mean, std_daily_return: std }
    }
}

/// Summary statistics of a bond yield series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldStatistics {
    pub yield_std: f64,
    pub initial_yield: f64,
}

impl YieldStatistics {
    /// Uses the first observation as the initial yield
    pub fn from_yields(yields: &[f64]) -> Self {
        let (_, std) = mean_and_sample_std(yields);
        Self {
            yield_std: std,
            initial_yield: yields.first().copied().unwrap_or(0.0),
        }
    }
}

fn default_mean_reversion() -> f64 {
    DEFAULT_MEAN_REVERSION
}

fn default_long_run_yield() -> f64 {
    DEFAULT_LONG_RUN_YIELD
}

/// Market statistics keyed by security type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistics {
    #[serde(default)]
    pub returns: BTreeMap<String, ReturnStatistics>,
    #[serde(default)]
    pub yields: BTreeMap<String, YieldStatistics>,
    #[serde(default = "default_mean_reversion")]
    pub mean_reversion: f64,
    #[serde(default = "default_long_run_yield")]
    pub long_run_yield: f64,
}

impl Default for MarketStatistics {
    fn default() -> Self {
        Self {
            returns: BTreeMap::new(),
            yields: BTreeMap::new(),
            mean_reversion: DEFAULT_MEAN_REVERSION,
            long_run_yield: DEFAULT_LONG_RUN_YIELD,
        }
    }
}

/// Build one security per type name.
///
/// Stocks annualise daily statistics (`mu = mean * 252`, `sigma = std * sqrt(252)`);
/// bonds take the yield volatility and first yield directly.
pub fn build_securities(
    security_types: &[String],
    structure: &PortfolioStructure,
    statistics: &MarketStatistics,
    structure_id: Option<u32>,
) -> Result<Vec<Security>, PortfolioError> {
    if let Some(id) = structure_id {
        if !structure.contains_id(id) {
            return Err(PortfolioError::UnknownStructureId(id));
        }
    }

    let trading_days = TRADING_DAYS as f64;

    security_types
        .iter()
        .map(|security_type| {
            let weight = structure.weight(security_type, structure_id)?;
            let missing = || PortfolioError::MissingCalibration(security_type.clone());

            match SecurityKind::from_type_name(security_type)? {
                SecurityKind::Stock => {
                    let stats = statistics.returns.get(security_type).ok_or_else(missing)?;
                    Ok(Security::Stock(StockParameters {
                        weight,
                        mu: stats.mean_daily_return * trading_days,
                        sigma: stats.std_daily_return * trading_days.sqrt(),
                    }))
                }
                SecurityKind::Bond => {
                    let stats = statistics.yields.get(security_type).ok_or_else(missing)?;
                    Ok(Security::Bond(BondParameters {
                        weight,
                        sigma: stats.yield_std,
                        a: statistics.mean_reversion,
                        b: statistics.long_run_yield,
                        y0: stats.initial_yield,
                    }))
                }
            }
        })
        .collect()
}

/// Mean and sample (n - 1) standard deviation; zero for too-short series
fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}
