//! Employment shock models
//!
//! A shock is a multiplier in [0, 1] applied to the salary of one year
//! (1 = fully employed). Every model returns `years + 1` shocks; the first year
//! is always fully employed.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Employment shock model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnemploymentModel {
    /// Job loss with probability `p_exit` per year; the unemployment spell in
    /// months follows Weibull(`weibull_k`, `weibull_lambda`) and removes that
    /// share of the year's salary.
    Weibull {
        p_exit: f64,
        weibull_k: f64,
        weibull_lambda: f64,
    },
    /// A fixed sequence of multipliers, padded with full employment
    Scheduled { multipliers: Vec<f64> },
}

impl UnemploymentModel {
    /// Check parameters that would otherwise produce meaningless shocks
    pub fn validate(&self) -> Result<(), String> {
        match self {
            UnemploymentModel::Weibull { p_exit, weibull_k, weibull_lambda } => {
                if !(0.0..=1.0).contains(p_exit) {
                    return Err(format!("p_exit must be in [0, 1], received {}", p_exit));
                }
                if !(*weibull_k > 0.0) || !(*weibull_lambda > 0.0) {
                    return Err("Weibull shape and scale must be positive".to_string());
                }
            }
            UnemploymentModel::Scheduled { multipliers } => {
                if multipliers.iter().any(|m| !(0.0..=1.0).contains(m)) {
                    return Err("scheduled multipliers must be in [0, 1]".to_string());
                }
            }
        }
        Ok(())
    }

    pub fn simulate_shocks<R: Rng + ?Sized>(&self, years: usize, rng: &mut R) -> Vec<f64> {
        let mut shocks = vec![1.0; years + 1];

        match self {
            UnemploymentModel::Weibull { p_exit, weibull_k, weibull_lambda } => {
                for shock in shocks.iter_mut().skip(1) {
                    let exits = rng.gen::<f64>() < *p_exit;
                    let duration_months = weibull_duration(*weibull_k, *weibull_lambda, &mut *rng);
                    if exits {
                        *shock = 1.0 - (duration_months / 12.0).min(1.0);
                    }
                }
            }
            UnemploymentModel::Scheduled { multipliers } => {
                for (shock, m) in shocks.iter_mut().skip(1).zip(multipliers) {
                    *shock = *m;
                }
            }
        }

        shocks
    }
}

/// Inverse-transform draw: lambda * (-ln U)^(1/k)
fn weibull_duration<R: Rng + ?Sized>(k: f64, lambda: f64, rng: &mut R) -> f64 {
    // U in (0, 1] keeps the logarithm finite
    let u = 1.0 - rng.gen::<f64>();
    lambda * (-u.ln()).powf(1.0 / k)
}
