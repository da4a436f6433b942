//! Co-financing and fee policies plugged into the savings pipeline
//!
//! Programs share one accumulation pipeline and differ only in these two
//! strategies, so any combination (fee-only, matching-only, both) can be built.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::input::ProgramInput;
use crate::error::ProgramError;

/// Third-party contributions added on top of the saver's payments
pub trait CoFinancingPolicy: Debug + Send + Sync {
    /// Reject inputs the policy cannot price; called before the engine accepts the policy
    fn validate(&self, _input: &ProgramInput) -> Result<(), ProgramError> {
        Ok(())
    }

    /// Co-financing per period; `payments` has n + 1 entries and so must the result
    fn co_financing(&self, input: &ProgramInput, payments: &[f64]) -> Vec<f64>;
}

/// Management fee charged after each period's return is credited
pub trait FeePolicy: Debug + Send + Sync {
    /// * `interest` - return credited this period
    /// * `prev_balance` - balance after fees at the end of the previous period
    /// * `balance_after_return` - this period's balance before fees
    fn fee(&self, interest: f64, prev_balance: f64, balance_after_return: f64) -> FeeCharge;
}

/// Fee split into its return-based and balance-based parts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeCharge {
    pub variable: f64,
    pub fixed: f64,
}

impl FeeCharge {
    pub fn total(&self) -> f64 {
        self.variable + self.fixed
    }
}

/// No third-party contributions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoCoFinancing;

impl CoFinancingPolicy for NoCoFinancing {
    fn co_financing(&self, _input: &ProgramInput, payments: &[f64]) -> Vec<f64> {
        vec![0.0; payments.len()]
    }
}

/// Income-tiered matching of the previous period's contribution.
///
/// In periods `1..=max_periods` the match is
/// `min(cap, payments[i - 1] * share)`, where `share` is picked by the saver's
/// initial monthly salary from `brackets` (upper bound, share) and falls back to
/// `top_share` above the last bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedCoFinancing {
    pub cap: f64,
    pub brackets: Vec<(f64, f64)>,
    pub top_share: f64,
    pub max_periods: usize,
}

impl Default for MatchedCoFinancing {
    fn default() -> Self {
        Self {
            cap: 36_000.0,
            brackets: vec![(80_000.0, 1.0), (150_000.0, 0.5)],
            top_share: 0.25,
            max_periods: 10,
        }
    }
}

impl MatchedCoFinancing {
    pub fn share_for_salary(&self, monthly_salary: f64) -> f64 {
        self.brackets
            .iter()
            .find(|(upper, _)| monthly_salary < *upper)
            .map_or(self.top_share, |&(_, share)| share)
    }
}

impl CoFinancingPolicy for MatchedCoFinancing {
    /// The income bracket needs a salary
    fn validate(&self, input: &ProgramInput) -> Result<(), ProgramError> {
        match input.initial_salary {
            Some(_) => Ok(()),
            None => Err(ProgramError::MissingInitialSalary),
        }
    }

    fn co_financing(&self, input: &ProgramInput, payments: &[f64]) -> Vec<f64> {
        let mut co_financing = vec![0.0; payments.len()];
        let Some(salary) = input.initial_salary else {
            return co_financing;
        };
        let share = self.share_for_salary(salary);
        let last = self.max_periods.min(input.n).min(payments.len().saturating_sub(1));

        for i in 1..=last {
            co_financing[i] = self.cap.min(payments[i - 1] * share);
        }

        co_financing
    }
}

/// No fees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoFee;

impl FeePolicy for NoFee {
    fn fee(&self, _interest: f64, _prev_balance: f64, _balance_after_return: f64) -> FeeCharge {
        FeeCharge::default()
    }
}

/// Share of the credited return plus a rate on the average balance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManagementFee {
    pub variable_rate: f64,
    pub fixed_rate: f64,
}

impl Default for ManagementFee {
    fn default() -> Self {
        Self {
            variable_rate: 0.2,
            fixed_rate: 0.005,
        }
    }
}

impl FeePolicy for ManagementFee {
    fn fee(&self, interest: f64, prev_balance: f64, balance_after_return: f64) -> FeeCharge {
        FeeCharge {
            variable: self.variable_rate * interest,
            fixed: self.fixed_rate * (prev_balance + balance_after_return) / 2.0,
        }
    }
}

/// Preset program variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    /// Individual investment account: no co-financing, no fees
    #[default]
    Iis3,
    /// Long-term savings program: state matching plus management fees
    Pds,
}

impl ProgramKind {
    pub fn co_financing_policy(&self) -> Box<dyn CoFinancingPolicy> {
        match self {
            ProgramKind::Iis3 => Box::new(NoCoFinancing),
            ProgramKind::Pds => Box::new(MatchedCoFinancing::default()),
        }
    }

    pub fn fee_policy(&self) -> Box<dyn FeePolicy> {
        match self {
            ProgramKind::Iis3 => Box::new(NoFee),
            ProgramKind::Pds => Box::new(ManagementFee::default()),
        }
    }
}
