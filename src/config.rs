//! Scenario configuration loaded from JSON
//!
//! Every section has defaults, so `{}` is a valid scenario: a two-asset
//! portfolio over 15 years of daily steps and a relative-contribution program
//! for a 45-year-old saver.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::life_table::LifeTable;
use crate::macro_models::{SalaryModel, UnemploymentModel};
use crate::program::{PaymentMode, ProgramInput, ProgramKind, Sex};
use crate::securities::{
    build_securities, BondParameters, MarketStatistics, PortfolioModel, PortfolioStructure, Security,
    SimulationConfig, StockParameters,
};

/// Complete scenario: portfolio, simulation settings and program parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub portfolio: PortfolioConfig,
    pub simulation: SimulationConfig,
    pub program: ProgramConfig,
    /// Life table CSV (`age,M,F`); pensions are undefined without one
    pub life_table_path: Option<PathBuf>,
}

/// Portfolio universe: explicit securities or a calibration from market data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Used when no calibration is given
    pub securities: Vec<Security>,
    pub calibration: Option<CalibrationConfig>,
    pub correlation: Vec<Vec<f64>>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            securities: vec![
                Security::Stock(StockParameters { weight: 0.4, sigma: 0.2, mu: 0.08 }),
                Security::Bond(BondParameters { weight: 0.6, sigma: 0.01, a: 0.1, b: 0.07, y0: 0.08 }),
            ],
            calibration: None,
            correlation: vec![vec![1.0, 0.2], vec![0.2, 1.0]],
        }
    }
}

/// Inputs for `build_securities`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub security_types: Vec<String>,
    /// Portfolio structure CSV (`id,<security type>...`)
    pub structure_path: PathBuf,
    /// Fund id; weights are averaged over every row when absent
    #[serde(default)]
    pub structure_id: Option<u32>,
    pub statistics: MarketStatistics,
}

/// Program parameters; the horizon and rates come from the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub kind: ProgramKind,
    pub age: u32,
    pub sex: Sex,
    pub payment_mode: PaymentMode,
    pub payment_rate: Option<f64>,
    pub fixed_payment: Option<f64>,
    /// Monthly salary at entry
    pub initial_salary: Option<f64>,
    pub salary_model: Option<SalaryModel>,
    pub unemployment_model: Option<UnemploymentModel>,
    pub tax_deduction_rate: f64,
    pub seed: Option<u64>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            kind: ProgramKind::Iis3,
            age: 45,
            sex: Sex::Male,
            payment_mode: PaymentMode::Relative,
            payment_rate: Some(0.06),
            fixed_payment: None,
            initial_salary: Some(50_000.0),
            salary_model: Some(SalaryModel::Deterministic { annual_growth: 0.05 }),
            unemployment_model: None,
            tax_deduction_rate: 0.13,
            seed: None,
        }
    }
}

impl ProgramConfig {
    /// Program input for an `n`-year horizon over the given annual rates
    pub fn to_input(&self, n: usize, rates: Vec<f64>) -> ProgramInput {
        ProgramInput {
            n,
            age: self.age,
            sex: self.sex,
            rates,
            payment_mode: self.payment_mode,
            payment_rate: self.payment_rate,
            fixed_payment: self.fixed_payment,
            salary_model: self.salary_model,
            unemployment_model: self.unemployment_model.clone(),
            initial_salary: self.initial_salary,
            tax_deduction_rate: self.tax_deduction_rate,
            seed: self.seed,
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> std::result::Result<Self, LoadError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whole program years in the simulation horizon
    pub fn program_years(&self) -> usize {
        (self.simulation.horizon_years + 1e-9).floor() as usize
    }

    /// Simulation steps per program year
    pub fn steps_per_year(&self) -> usize {
        ((1.0 / self.simulation.step_size).round() as usize).max(1)
    }

    /// Securities from the calibration when present, otherwise the explicit list
    pub fn securities(&self) -> Result<Vec<Security>> {
        match &self.portfolio.calibration {
            Some(calibration) => {
                let structure = PortfolioStructure::from_csv_path(&calibration.structure_path)?;
                Ok(build_securities(
                    &calibration.security_types,
                    &structure,
                    &calibration.statistics,
                    calibration.structure_id,
                )?)
            }
            None => Ok(self.portfolio.securities.clone()),
        }
    }

    pub fn build_portfolio(&self) -> Result<PortfolioModel> {
        Ok(PortfolioModel::new(self.securities()?, &self.portfolio.correlation)?)
    }

    pub fn load_life_table(&self) -> Result<Option<Arc<LifeTable>>> {
        match &self.life_table_path {
            Some(path) => Ok(Some(Arc::new(LifeTable::from_csv_path(path)?))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = ScenarioConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(config.program_years(), 15);
        assert_eq!(config.steps_per_year(), 252);
        assert_eq!(config.simulation.num_simulations, 5);
        assert_eq!(config.program.age, 45);
        assert_eq!(config.program.tax_deduction_rate, 0.13);
        assert!(config.build_portfolio().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "simulation": { "horizon_years": 3, "num_simulations": 2, "seed": 9 },
            "program": {
                "kind": "pds",
                "sex": "F",
                "payment_mode": "fixed",
                "fixed_payment": 12000,
                "salary_model": null,
                "unemployment_model": {
                    "kind": "weibull", "p_exit": 0.05, "weibull_k": 1.2, "weibull_lambda": 5.0
                }
            },
            "portfolio": {
                "securities": [{ "kind": "stock", "weight": 1.0, "sigma": 0.15, "mu": 0.06 }],
                "correlation": [[1.0]]
            }
        }"#;
        let config = ScenarioConfig::from_json_str(json).unwrap();

        assert_eq!(config.program_years(), 3);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.program.kind, ProgramKind::Pds);
        assert_eq!(config.program.sex, Sex::Female);
        assert_eq!(config.program.payment_mode, PaymentMode::Fixed);
        assert_eq!(config.program.salary_model, None);
        assert_eq!(config.program.age, 45);
        assert_eq!(config.build_portfolio().unwrap().num_assets(), 1);

        let input = config.program.to_input(3, vec![0.05; 3]);
        assert_eq!(input.validate(), Ok(()));
        assert_eq!(input.fixed_payment, Some(12000.0));
    }

    #[test]
    fn test_invalid_weights_reported() {
        let json = r#"{ "portfolio": {
            "securities": [{ "kind": "stock", "weight": 0.5, "sigma": 0.15, "mu": 0.06 }],
            "correlation": [[1.0]]
        } }"#;
        let config = ScenarioConfig::from_json_str(json).unwrap();
        assert!(matches!(
            config.build_portfolio(),
            Err(crate::Error::Portfolio(crate::error::PortfolioError::WeightsDoNotSumToOne { .. }))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(ScenarioConfig::from_json_str("{ \"program\": 3 }"), Err(LoadError::Json(_))));
    }
}
