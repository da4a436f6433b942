//! Scenario runner for Monte-Carlo program projections
//!
//! Loads the life table once, simulates the portfolio, then runs the savings
//! program on any or every simulated path.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ScenarioConfig;
use crate::error::{PortfolioError, Result};
use crate::life_table::LifeTable;
use crate::metrics::{Metrics, METRIC_KEYS};
use crate::program::ProgramEngine;
use crate::securities::PortfolioPaths;

/// Pre-loaded scenario runner
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(ScenarioConfig::default())?;
/// let paths = runner.simulate_portfolio()?;
/// let metrics = runner.run_all(&paths)?;
/// let summary = summarize(&metrics);
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: ScenarioConfig,
    life_table: Option<Arc<LifeTable>>,
}

impl ScenarioRunner {
    /// Create runner, loading the configured life table
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        let life_table = config.load_life_table()?;
        Ok(Self { config, life_table })
    }

    /// Create runner with a pre-built life table
    pub fn with_life_table(config: ScenarioConfig, life_table: Option<Arc<LifeTable>>) -> Self {
        Self { config, life_table }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Build the portfolio and run every configured simulation
    pub fn simulate_portfolio(&self) -> Result<PortfolioPaths> {
        let portfolio = self.config.build_portfolio()?;
        Ok(portfolio.simulate(&self.config.simulation)?)
    }

    /// Run the program on one simulated path; the returned engine holds the trajectory
    pub fn run(&self, paths: &PortfolioPaths, sim: usize) -> Result<ProgramEngine> {
        let rates = paths
            .annual_rates(sim, self.config.steps_per_year())
            .ok_or(PortfolioError::SimulationOutOfRange {
                index: sim,
                available: paths.num_simulations(),
            })?;

        let mut input = self.config.program.to_input(self.config.program_years(), rates);
        input.seed = input.seed.map(|seed| seed.wrapping_add(sim as u64));

        let mut engine = ProgramEngine::for_kind(self.config.program.kind, input, self.life_table.clone())?;
        engine.run()?;
        Ok(engine)
    }

    /// Metrics for every simulated path, in simulation order
    pub fn run_all(&self, paths: &PortfolioPaths) -> Result<Vec<Metrics>> {
        info!("Running program on {} simulated paths", paths.num_simulations());

        (0..paths.num_simulations())
            .into_par_iter()
            .map(|sim| -> Result<Metrics> { Ok(self.run(paths, sim)?.compute_metrics()?) })
            .collect()
    }
}

/// Distribution of one metric across simulations (NaN values ignored)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub median: f64,
    pub p5: f64,
    pub p95: f64,
    /// Number of defined values
    pub count: usize,
}

impl MetricSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);

        if sorted.is_empty() {
            return Self {
                mean: f64::NAN,
                median: f64::NAN,
                p5: f64::NAN,
                p95: f64::NAN,
                count: 0,
            };
        }

        Self {
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median: percentile(&sorted, 0.5),
            p5: percentile(&sorted, 0.05),
            p95: percentile(&sorted, 0.95),
            count: sorted.len(),
        }
    }
}

/// Linear interpolation between closest ranks
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Summary per metric key
pub fn summarize(metrics: &[Metrics]) -> BTreeMap<&'static str, MetricSummary> {
    METRIC_KEYS
        .iter()
        .map(|&key| {
            let values: Vec<f64> = metrics.iter().filter_map(|m| m.get(key)).collect();
            (key, MetricSummary::from_values(&values))
        })
        .collect()
}
