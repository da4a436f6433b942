//! Correlated multi-asset Monte-Carlo portfolio model

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::correlation::CholeskyFactor;
use super::model::{step_count, Security, TRADING_DAYS};
use crate::error::PortfolioError;

/// Tolerance on the sum of portfolio weights
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Settings for one Monte-Carlo run of the portfolio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Horizon in years
    pub horizon_years: f64,
    /// Number of independent simulations
    pub num_simulations: usize,
    /// Step size in years (1/252 for daily steps)
    pub step_size: f64,
    /// Base seed; simulation `i` uses `seed + i`. Drawn at random when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_years: 15.0,
            num_simulations: 5,
            step_size: 1.0 / TRADING_DAYS as f64,
            seed: None,
        }
    }
}

/// Portfolio return paths, one column per simulation
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPaths {
    /// `paths[sim][step]`
    paths: Vec<Vec<f64>>,
}

impl PortfolioPaths {
    pub fn num_simulations(&self) -> usize {
        self.paths.len()
    }

    pub fn num_steps(&self) -> usize {
        self.paths.first().map_or(0, Vec::len)
    }

    /// Full step-level path of one simulation
    pub fn simulation(&self, sim: usize) -> Option<&[f64]> {
        self.paths.get(sim).map(Vec::as_slice)
    }

    /// Value at `(step, sim)`
    pub fn get(&self, step: usize, sim: usize) -> Option<f64> {
        self.paths.get(sim).and_then(|p| p.get(step)).copied()
    }

    /// Every `steps_per_year`-th value of one simulation, starting at step 0.
    ///
    /// This turns a daily path into the annual rate series consumed by the
    /// savings program.
    pub fn annual_rates(&self, sim: usize, steps_per_year: usize) -> Option<Vec<f64>> {
        let stride = steps_per_year.max(1);
        self.simulation(sim)
            .map(|path| path.iter().step_by(stride).copied().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.paths.iter().map(Vec::as_slice)
    }
}

/// Weighted portfolio of correlated securities
#[derive(Debug, Clone)]
pub struct PortfolioModel {
    securities: Vec<Security>,
    cholesky: CholeskyFactor,
}

impl PortfolioModel {
    /// Build a portfolio, validating weights and the correlation structure
    pub fn new(securities: Vec<Security>, correlation: &[Vec<f64>]) -> Result<Self, PortfolioError> {
        if securities.is_empty() {
            return Err(PortfolioError::NoSecurities);
        }

        let total: f64 = securities.iter().map(Security::weight).sum();
        if !((total - 1.0).abs() <= WEIGHT_TOLERANCE) {
            return Err(PortfolioError::WeightsDoNotSumToOne { total });
        }

        if correlation.len() != securities.len() {
            return Err(PortfolioError::CorrelationShape {
                expected: securities.len(),
                rows: correlation.len(),
                cols: correlation.first().map_or(0, Vec::len),
            });
        }

        let cholesky = CholeskyFactor::from_correlation(correlation)?;

        Ok(Self { securities, cholesky })
    }

    pub fn securities(&self) -> &[Security] {
        &self.securities
    }

    pub fn num_assets(&self) -> usize {
        self.securities.len()
    }

    /// Run `num_simulations` independent correlated simulations in parallel
    pub fn simulate(&self, config: &SimulationConfig) -> Result<PortfolioPaths, PortfolioError> {
        let n_steps = step_count(config.horizon_years, config.step_size);
        if n_steps == 0 {
            return Err(PortfolioError::InvalidStepSize(config.step_size));
        }

        let base_seed = config.seed.unwrap_or_else(rand::random);
        info!(
            "Simulating {} paths of {} steps across {} assets (seed {})",
            config.num_simulations,
            n_steps,
            self.num_assets(),
            base_seed
        );

        let paths = (0..config.num_simulations)
            .into_par_iter()
            .map(|sim| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(sim as u64));
                self.simulate_one(&mut rng, n_steps, config)
            })
            .collect();

        Ok(PortfolioPaths { paths })
    }

    /// One weighted portfolio path; all time stepping is sequential
    fn simulate_one(&self, rng: &mut StdRng, n_steps: usize, config: &SimulationConfig) -> Vec<f64> {
        let independent: Vec<Vec<f64>> = (0..self.num_assets())
            .map(|_| (0..n_steps).map(|_| StandardNormal.sample(&mut *rng)).collect())
            .collect();
        let correlated = self.cholesky.correlate(&independent);

        let mut portfolio = vec![0.0; n_steps];
        for (security, shocks) in self.securities.iter().zip(&correlated) {
            let path = security.simulate_path(shocks, config.horizon_years, config.step_size);
            let weight = security.weight();
            for (acc, value) in portfolio.iter_mut().zip(&path) {
                *acc += value * weight;
            }
        }

        debug!("Simulated portfolio path, last value {:.6}", portfolio[n_steps - 1]);
        portfolio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::securities::{BondParameters, StockParameters};
    use approx::assert_relative_eq;

    fn stock(weight: f64) -> Security {
        Security::Stock(StockParameters { weight, sigma: 0.2, mu: 0.08 })
    }

    fn bond(weight: f64) -> Security {
        Security::Bond(BondParameters { weight, sigma: 0.01, a: 0.1, b: 0.07, y0: 0.09 })
    }

    fn two_asset(rho: f64) -> Vec<Vec<f64>> {
        vec![vec![1.0, rho], vec![rho, 1.0]]
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = PortfolioModel::new(vec![stock(0.5), bond(0.4)], &two_asset(0.1)).unwrap_err();
        assert!(matches!(err, PortfolioError::WeightsDoNotSumToOne { .. }));

        // Within tolerance
        assert!(PortfolioModel::new(vec![stock(0.6), bond(0.4 + 5e-7)], &two_asset(0.1)).is_ok());
    }

    #[test]
    fn test_nan_weight_is_rejected() {
        let err = PortfolioModel::new(vec![stock(f64::NAN)], &[vec![1.0]]).unwrap_err();
        assert!(matches!(err, PortfolioError::WeightsDoNotSumToOne { total } if total.is_nan()));

        let err = PortfolioModel::new(vec![stock(0.5), bond(f64::NAN)], &two_asset(0.1)).unwrap_err();
        assert!(matches!(err, PortfolioError::WeightsDoNotSumToOne { .. }));
    }

    #[test]
    fn test_rejects_mismatched_correlation() {
        let err = PortfolioModel::new(vec![stock(1.0)], &two_asset(0.0)).unwrap_err();
        assert!(matches!(err, PortfolioError::CorrelationShape { expected: 1, .. }));
        assert_eq!(
            PortfolioModel::new(vec![], &[]).unwrap_err(),
            PortfolioError::NoSecurities
        );
    }

    #[test]
    fn test_simulation_shape() {
        let model = PortfolioModel::new(vec![stock(0.7), bond(0.3)], &two_asset(-0.2)).unwrap();
        let config = SimulationConfig {
            horizon_years: 2.0,
            num_simulations: 4,
            seed: Some(7),
            ..Default::default()
        };
        let paths = model.simulate(&config).unwrap();

        assert_eq!(paths.num_simulations(), 4);
        assert_eq!(paths.num_steps(), 504);
        assert!(paths.iter().all(|p| p.iter().all(|v| v.is_finite())));

        let annual = paths.annual_rates(0, TRADING_DAYS).unwrap();
        assert_eq!(annual.len(), 2);
        assert_eq!(annual[1], paths.get(252, 0).unwrap());
    }

    #[test]
    fn test_seeded_simulation_is_reproducible() {
        let model = PortfolioModel::new(vec![stock(0.5), bond(0.5)], &two_asset(0.3)).unwrap();
        let config = SimulationConfig {
            horizon_years: 1.5,
            num_simulations: 3,
            seed: Some(42),
            ..Default::default()
        };

        let a = model.simulate(&config).unwrap();
        let b = model.simulate(&config).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.simulation(0), a.simulation(1));
    }

    #[test]
    fn test_deterministic_portfolio_is_weighted_sum() {
        let stock = Security::Stock(StockParameters { weight: 0.25, sigma: 0.0, mu: 0.1 });
        let bond = Security::Bond(BondParameters { weight: 0.75, sigma: 0.0, a: 0.0, b: 0.0, y0: 0.08 });
        let model = PortfolioModel::new(vec![stock, bond], &two_asset(0.5)).unwrap();
        let config = SimulationConfig {
            horizon_years: 1.0,
            num_simulations: 1,
            seed: Some(1),
            ..Default::default()
        };
        let paths = model.simulate(&config).unwrap();

        let dt = 1.0 / TRADING_DAYS as f64;
        let stock_year = (1.0 + 0.1 * dt).powi(252) - 1.0;
        assert_relative_eq!(paths.get(0, 0).unwrap(), 0.75 * 0.08, epsilon = 1e-12);
        assert_relative_eq!(paths.get(251, 0).unwrap(), 0.25 * stock_year + 0.75 * 0.08, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_steps_is_rejected() {
        let model = PortfolioModel::new(vec![stock(1.0)], &[vec![1.0]]).unwrap();
        let config = SimulationConfig { step_size: 0.0, ..Default::default() };
        assert_eq!(model.simulate(&config), Err(PortfolioError::InvalidStepSize(0.0)));
    }
}
