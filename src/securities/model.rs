//! Single-asset path models driven by correlated standard-normal shocks
//!
//! Two processes are supported:
//! - Stock: daily geometric returns, reported as a trailing one-year compounded return
//! - Bond: discretised mean-reverting (Vasicek) yield level
//!
//! Both outputs are consumed by the portfolio as an annualised return proxy, so a
//! bond contributes its yield level with the same additive weighting as a stock
//! contributes its rolling return.

use serde::{Deserialize, Serialize};

/// Trading days in one year; also the rolling window of the stock return overlay
pub const TRADING_DAYS: usize = 252;

/// Number of simulation steps covering `horizon_years` at `step_size` years per step
pub fn step_count(horizon_years: f64, step_size: f64) -> usize {
    if step_size <= 0.0 || horizon_years <= 0.0 {
        return 0;
    }
    // Absorb representation error so 15 / (1/252) yields 3780 steps, not 3779
    (horizon_years / step_size + 1e-9).floor() as usize
}

/// Equity parameters: geometric drift and volatility (annualised)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockParameters {
    /// Fraction of portfolio capital
    pub weight: f64,
    /// Annualised volatility
    pub sigma: f64,
    /// Annualised drift
    pub mu: f64,
}

/// Bond parameters for the mean-reverting yield process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondParameters {
    /// Fraction of portfolio capital
    pub weight: f64,
    /// Yield volatility
    pub sigma: f64,
    /// Mean-reversion speed
    pub a: f64,
    /// Long-run mean yield
    pub b: f64,
    /// Initial yield
    pub y0: f64,
}

/// A security in the portfolio universe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Security {
    Stock(StockParameters),
    Bond(BondParameters),
}

impl Security {
    /// Portfolio weight of this security
    pub fn weight(&self) -> f64 {
        match self {
            Security::Stock(p) => p.weight,
            Security::Bond(p) => p.weight,
        }
    }

    /// Simulate one path of `step_count(horizon_years, step_size)` values.
    ///
    /// `shocks` must hold at least that many correlated standard-normal draws;
    /// any extra draws are ignored.
    pub fn simulate_path(&self, shocks: &[f64], horizon_years: f64, step_size: f64) -> Vec<f64> {
        let n_steps = step_count(horizon_years, step_size).min(shocks.len());
        let shocks = &shocks[..n_steps];

        match self {
            Security::Stock(p) => stock_rolling_returns(p, shocks, step_size),
            Security::Bond(p) => bond_yield_path(p, shocks, step_size),
        }
    }
}

/// Trailing one-year compounded return of a daily GBM-style return stream.
/// Steps without a full window report zero.
fn stock_rolling_returns(params: &StockParameters, shocks: &[f64], dt: f64) -> Vec<f64> {
    let drift = params.mu * dt;
    let diffusion = params.sigma * dt.sqrt();

    let growth: Vec<f64> = shocks
        .iter()
        .map(|z| 1.0 + drift + diffusion * z)
        .collect();

    let mut path = vec![0.0; growth.len()];
    for (start, window) in growth.windows(TRADING_DAYS).enumerate() {
        path[start + TRADING_DAYS - 1] = window.iter().product::<f64>() - 1.0;
    }
    path
}

/// Euler discretisation of dY = a(b - Y)dt + sigma dW, seeded at y0.
/// The shock at step 0 is unused.
fn bond_yield_path(params: &BondParameters, shocks: &[f64], dt: f64) -> Vec<f64> {
    if shocks.is_empty() {
        return Vec::new();
    }

    let diffusion = params.sigma * dt.sqrt();
    let mut path = Vec::with_capacity(shocks.len());
    path.push(params.y0);

    for z in &shocks[1..] {
        let prev = path[path.len() - 1];
        path.push(prev + params.a * (params.b - prev) * dt + diffusion * z);
    }
    path
}
