//! Tabular per-period program report

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// One period of the detailed report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Period")]
    pub period: u32,
    #[serde(rename = "MonthlySalary")]
    pub monthly_salary: f64,
    #[serde(rename = "AnnualSalary")]
    pub annual_salary: f64,
    #[serde(rename = "EmploymentShock")]
    pub employment_shock: f64,
    #[serde(rename = "Payment")]
    pub payment: f64,
    #[serde(rename = "TaxDeduction")]
    pub tax_deduction: f64,
    #[serde(rename = "CoFinancing")]
    pub co_financing: f64,
    #[serde(rename = "TotalInflow")]
    pub total_inflow: f64,
    #[serde(rename = "BalanceBeforeReturn")]
    pub balance_before_return: f64,
    /// Annual rate in percent; empty for the settlement period
    #[serde(rename = "RatePct")]
    pub rate_pct: Option<f64>,
    #[serde(rename = "Interest")]
    pub interest: f64,
    #[serde(rename = "VariableFee")]
    pub variable_fee: f64,
    #[serde(rename = "FixedFee")]
    pub fixed_fee: f64,
    #[serde(rename = "TotalFee")]
    pub total_fee: f64,
    #[serde(rename = "BalanceAfterFee")]
    pub balance_after_fee: f64,
}

impl ReportRow {
    /// Round every monetary and rate column to 2 decimals
    pub fn rounded(self) -> Self {
        Self {
            monthly_salary: round2(self.monthly_salary),
            annual_salary: round2(self.annual_salary),
            employment_shock: round2(self.employment_shock),
            payment: round2(self.payment),
            tax_deduction: round2(self.tax_deduction),
            co_financing: round2(self.co_financing),
            total_inflow: round2(self.total_inflow),
            balance_before_return: round2(self.balance_before_return),
            rate_pct: self.rate_pct.map(round2),
            interest: round2(self.interest),
            variable_fee: round2(self.variable_fee),
            fixed_fee: round2(self.fixed_fee),
            total_fee: round2(self.total_fee),
            balance_after_fee: round2(self.balance_after_fee),
            ..self
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Complete per-period report (n + 1 rows)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedReport {
    pub rows: Vec<ReportRow>,
}

impl DetailedReport {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the report as CSV to any writer
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), LoadError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        self.write_csv(File::create(path)?)
    }

    /// Fixed-width text table for console output
    pub fn to_table(&self) -> String {
        let mut out = format!(
            "{:>4} {:>12} {:>6} {:>11} {:>10} {:>11} {:>11} {:>14} {:>8} {:>12} {:>10} {:>14}\n",
            "Year", "Salary/mo", "Shock", "Payment", "Tax", "CoFin", "Inflow",
            "Before ret.", "Rate %", "Interest", "Fee", "Balance",
        );
        out.push_str(&"-".repeat(140));
        out.push('\n');

        for row in &self.rows {
            let rate = row.rate_pct.map_or_else(|| "-".to_string(), |r| format!("{:.2}", r));
            out.push_str(&format!(
                "{:>4} {:>12.2} {:>6.2} {:>11.2} {:>10.2} {:>11.2} {:>11.2} {:>14.2} {:>8} {:>12.2} {:>10.2} {:>14.2}\n",
                row.period,
                row.monthly_salary,
                row.employment_shock,
                row.payment,
                row.tax_deduction,
                row.co_financing,
                row.total_inflow,
                row.balance_before_return,
                rate,
                row.interest,
                row.total_fee,
                row.balance_after_fee,
            ));
        }

        out
    }
}
