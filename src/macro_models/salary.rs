//! Salary trajectory models
//!
//! Every model returns `years + 1` annual salary figures. The last one is
//! always zero: it is the settlement period after the saver stops earning.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Salary growth model.
///
/// `initial_salary` is a monthly figure; the output is annual (x12).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SalaryModel {
    /// Constant annual growth
    Deterministic { annual_growth: f64 },
    /// Annual growth drawn from N(mean_growth, volatility^2) each year
    Stochastic { mean_growth: f64, volatility: f64 },
}

impl Default for SalaryModel {
    fn default() -> Self {
        SalaryModel::Deterministic { annual_growth: 0.05 }
    }
}

impl SalaryModel {
    pub fn simulate<R: Rng + ?Sized>(&self, years: usize, initial_salary: f64, rng: &mut R) -> Vec<f64> {
        let mut monthly = Vec::with_capacity(years);
        let mut current = initial_salary;

        for year in 0..years {
            if year > 0 {
                let growth = match *self {
                    SalaryModel::Deterministic { annual_growth } => annual_growth,
                    SalaryModel::Stochastic { mean_growth, volatility } => {
                        let z: f64 = StandardNormal.sample(&mut *rng);
                        mean_growth + volatility * z
                    }
                };
                current *= 1.0 + growth;
            }
            monthly.push(current);
        }

        let mut annual: Vec<f64> = monthly.into_iter().map(|m| m * 12.0).collect();
        annual.push(0.0);
        annual
    }
}

/// Salary path used when no model is configured.
///
/// The initial salary is taken as the annual figure and repeated unchanged.
pub fn flat_salaries(years: usize, initial_salary: f64) -> Vec<f64> {
    let mut annual = vec![initial_salary; years];
    annual.push(0.0);
    annual
}
