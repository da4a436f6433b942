//! Performance metrics over a finished savings trajectory
//!
//! Every function here is pure. Degenerate inputs (zero denominators, a
//! non-convergent IRR, no annuity factor) produce `f64::NAN` instead of an error.

mod irr;

pub use irr::{calculate_irr, npv_at_rate};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed metric keys, in report order
pub const METRIC_KEYS: [&str; 6] = ["savings", "roi", "irr", "twr", "pension", "kz"];

/// Metric values for one program run; undefined values are NaN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub savings: f64,
    pub roi: f64,
    pub irr: f64,
    pub twr: f64,
    pub pension: f64,
    pub kz: f64,
}

impl Metrics {
    /// Look up a metric by key
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "savings" => Some(self.savings),
            "roi" => Some(self.roi),
            "irr" => Some(self.irr),
            "twr" => Some(self.twr),
            "pension" => Some(self.pension),
            "kz" => Some(self.kz),
            _ => None,
        }
    }

    /// Key/value view in `METRIC_KEYS` order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        METRIC_KEYS.iter().map(move |&k| (k, self.get(k).unwrap_or(f64::NAN)))
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        self.iter().collect()
    }
}

pub fn savings(final_accumulation: f64) -> f64 {
    final_accumulation
}

/// Return on contributions; NaN when nothing was contributed
pub fn roi(final_accumulation: f64, total_contributed: f64) -> f64 {
    if total_contributed == 0.0 {
        return f64::NAN;
    }
    (final_accumulation - total_contributed) / total_contributed
}

/// IRR of `[-payments[0], ..., -payments[n-1], final]` where `payments` holds
/// n working periods plus the terminal settlement period.
pub fn irr(payments: &[f64], final_accumulation: f64) -> f64 {
    let n = payments.len().saturating_sub(1);
    let mut cashflows: Vec<f64> = payments[..n].iter().map(|p| -p).collect();
    cashflows.push(final_accumulation);

    calculate_irr(&cashflows).unwrap_or(f64::NAN)
}

/// Time-weighted return: geometric mean of the chained per-period returns
/// over the n working periods.
///
/// `balances` are end-of-period balances and `inflows` the money added at the
/// start of each period; both include the terminal settlement period, which is
/// not part of the chain.
pub fn twr(balances: &[f64], inflows: &[f64]) -> f64 {
    let periods = inflows.len().saturating_sub(1).min(balances.len());
    if periods == 0 {
        return f64::NAN;
    }

    let period_return = |end: f64, start: f64| if start != 0.0 { end / start - 1.0 } else { 0.0 };

    let growth: f64 = (0..periods)
        .map(|i| {
            let start = if i == 0 { inflows[0] } else { balances[i - 1] + inflows[i] };
            1.0 + period_return(balances[i], start)
        })
        .product();

    growth.powf(1.0 / periods as f64) - 1.0
}

/// Replacement ratio: monthly pension over the average monthly salary of the
/// n working periods (the terminal zero-salary period is excluded).
pub fn replacement_ratio(pension: Option<f64>, annual_salaries: &[f64], n: usize) -> f64 {
    let Some(pension) = pension else {
        return f64::NAN;
    };

    let end = annual_salaries.len().saturating_sub(1);
    let start = end.saturating_sub(n);
    let working = &annual_salaries[start..end];
    if working.is_empty() {
        return f64::NAN;
    }

    let avg_monthly = working.iter().map(|s| s / 12.0).sum::<f64>() / working.len() as f64;
    if avg_monthly == 0.0 {
        return f64::NAN;
    }
    pension / avg_monthly
}

/// Monthly pension from the final accumulation, if an annuity factor exists
pub fn pension(final_accumulation: f64, annuity_months: Option<f64>) -> Option<f64> {
    annuity_months.map(|months| final_accumulation / months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roi() {
        assert_relative_eq!(roi(3310.125, 3000.0), 0.103375, epsilon = 1e-12);
        assert!(roi(100.0, 0.0).is_nan());
    }

    #[test]
    fn test_irr_from_payments() {
        let payments = [1000.0, 1000.0, 1000.0, 0.0];
        assert_relative_eq!(irr(&payments, 3310.125), 0.05, epsilon = 1e-8);
        assert!(irr(&[0.0, 0.0], 0.0).is_nan());
    }

    #[test]
    fn test_twr_single_initial_inflow_is_geometric_growth() {
        let r: f64 = 0.04;
        let balances: Vec<f64> = (1..=5).map(|i| 1000.0 * (1.0 + r).powi(i)).collect();
        let mut inflows = vec![0.0; 6];
        inflows[0] = 1000.0;

        let mut terminal = balances.clone();
        terminal.push(balances[4]);
        assert_relative_eq!(twr(&terminal, &inflows), r, epsilon = 1e-12);
    }

    #[test]
    fn test_twr_ignores_cashflow_timing() {
        // Same 5% each year regardless of contributions
        let inflows = [1000.0, 1000.0, 1000.0, 0.0];
        let balances = [1050.0, 2152.5, 3310.125, 3310.125];
        assert_relative_eq!(twr(&balances, &inflows), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_twr_zero_base_contributes_zero_return() {
        let inflows = [0.0, 0.0, 0.0];
        let balances = [0.0, 0.0, 0.0];
        assert_relative_eq!(twr(&balances, &inflows), 0.0);
        assert!(twr(&[], &[]).is_nan());
        assert!(twr(&[5.0], &[5.0]).is_nan());
    }

    #[test]
    fn test_replacement_ratio() {
        let salaries = [120_000.0, 132_000.0, 0.0];
        // Average monthly salary over the working years is 10_500
        assert_relative_eq!(replacement_ratio(Some(2_100.0), &salaries, 2), 0.2, epsilon = 1e-12);
        assert!(replacement_ratio(Some(2_100.0), &[0.0, 0.0, 0.0], 2).is_nan());
        assert!(replacement_ratio(None, &salaries, 2).is_nan());
    }

    #[test]
    fn test_pension() {
        assert_eq!(pension(2640.0, Some(264.0)), Some(10.0));
        assert_eq!(pension(2640.0, None), None);
    }

    #[test]
    fn test_metrics_keys() {
        let metrics = Metrics { savings: 1.0, roi: 2.0, irr: 3.0, twr: 4.0, pension: f64::NAN, kz: 6.0 };
        let keys: Vec<&str> = metrics.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, METRIC_KEYS.to_vec());
        assert_eq!(metrics.get("twr"), Some(4.0));
        assert!(metrics.to_map()["pension"].is_nan());
        assert_eq!(metrics.get("unknown"), None);
    }
}
