//! Finished savings trajectory of one program run

use serde::{Deserialize, Serialize};

use super::report::{DetailedReport, ReportRow};
use crate::metrics::{self, Metrics};

/// Output of one pipeline run.
///
/// Every per-period vector has `years + 1` entries: `years` working periods
/// followed by the terminal settlement period, which has no salary, no
/// contribution and no return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Number of working periods
    pub years: usize,

    /// Annual salary after employment shocks
    pub annual_salaries: Vec<f64>,
    /// Employment multipliers (1 = fully employed)
    pub shocks: Vec<f64>,

    /// Saver's own contributions
    pub payments: Vec<f64>,
    pub tax_deductions: Vec<f64>,
    pub co_financing: Vec<f64>,
    /// payments + tax deductions + co-financing
    pub total_inflows: Vec<f64>,

    /// Annual return applied in each working period
    pub rates: Vec<f64>,
    /// Balance after the period's inflow, before the return is credited
    pub balance_before_return: Vec<f64>,
    pub interest: Vec<f64>,
    pub variable_fees: Vec<f64>,
    pub fixed_fees: Vec<f64>,
    pub total_fees: Vec<f64>,
    /// End-of-period balance after fees
    pub balances: Vec<f64>,

    /// Balance at retirement, including the terminal tax deduction
    pub final_accumulation: f64,
    /// Expected annuity months at retirement, when a life table was supplied
    pub annuity_months: Option<f64>,
    /// Monthly pension at retirement, when a life table was supplied
    pub first_pension: Option<f64>,
}

impl Trajectory {
    /// Sum of the saver's contributions over the working periods
    pub fn total_contributed(&self) -> f64 {
        self.payments[..self.years].iter().sum()
    }

    pub fn total_fees_paid(&self) -> f64 {
        self.total_fees.iter().sum()
    }

    pub fn total_co_financing(&self) -> f64 {
        self.co_financing.iter().sum()
    }

    /// Savings, ROI, IRR, TWR, pension and replacement ratio
    pub fn metrics(&self) -> Metrics {
        let final_accumulation = self.final_accumulation;
        let pension = metrics::pension(final_accumulation, self.annuity_months);

        Metrics {
            savings: metrics::savings(final_accumulation),
            roi: metrics::roi(final_accumulation, self.total_contributed()),
            irr: metrics::irr(&self.payments, final_accumulation),
            twr: metrics::twr(&self.balances, &self.total_inflows),
            pension: pension.unwrap_or(f64::NAN),
            kz: metrics::replacement_ratio(pension, &self.annual_salaries, self.years),
        }
    }

    /// One row per period, rounded to cents
    pub fn report(&self) -> DetailedReport {
        let rows = (0..=self.years)
            .map(|i| {
                let annual_salary = self.annual_salaries[i];
                ReportRow {
                    period: i as u32 + 1,
                    monthly_salary: annual_salary / 12.0,
                    annual_salary,
                    employment_shock: self.shocks[i],
                    payment: self.payments[i],
                    tax_deduction: self.tax_deductions[i],
                    co_financing: self.co_financing[i],
                    total_inflow: self.total_inflows[i],
                    balance_before_return: self.balance_before_return[i],
                    rate_pct: self.rates.get(i).map(|r| r * 100.0),
                    interest: self.interest[i],
                    variable_fee: self.variable_fees[i],
                    fixed_fee: self.fixed_fees[i],
                    total_fee: self.total_fees[i],
                    balance_after_fee: self.balances[i],
                }
                .rounded()
            })
            .collect();

        DetailedReport { rows }
    }
}
