//! Savings program inputs

use serde::{Deserialize, Serialize};

use crate::error::ProgramError;
use crate::macro_models::{SalaryModel, UnemploymentModel};

/// Sex of the saver, used for the life-table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M", alias = "Male")]
    Male,
    #[serde(rename = "F", alias = "Female")]
    Female,
}

/// How the saver's own contribution is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// A flat annual amount (`fixed_payment`)
    Fixed,
    /// A share of salary (`payment_rate`)
    Relative,
}

/// Parameters of one program run. Validated when the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInput {
    /// Horizon in years (working periods)
    pub n: usize,
    /// Age at entry
    pub age: u32,
    pub sex: Sex,
    /// Realised annual portfolio return per working period; at least `n` values
    pub rates: Vec<f64>,

    pub payment_mode: PaymentMode,
    /// Share of salary contributed in relative mode
    #[serde(default)]
    pub payment_rate: Option<f64>,
    /// Annual contribution in fixed mode
    #[serde(default)]
    pub fixed_payment: Option<f64>,

    #[serde(default)]
    pub salary_model: Option<SalaryModel>,
    #[serde(default)]
    pub unemployment_model: Option<UnemploymentModel>,

    /// Salary at entry: monthly under a salary model, annual otherwise
    #[serde(default)]
    pub initial_salary: Option<f64>,

    /// Share of the previous contribution refunded as a tax deduction
    #[serde(default)]
    pub tax_deduction_rate: f64,

    /// Seed for the macro-model draws; drawn at random when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ProgramInput {
    /// Fixed annual contribution of `fixed_payment`
    pub fn fixed(n: usize, age: u32, sex: Sex, rates: Vec<f64>, fixed_payment: f64) -> Self {
        Self {
            n,
            age,
            sex,
            rates,
            payment_mode: PaymentMode::Fixed,
            payment_rate: None,
            fixed_payment: Some(fixed_payment),
            salary_model: None,
            unemployment_model: None,
            initial_salary: None,
            tax_deduction_rate: 0.0,
            seed: None,
        }
    }

    /// Contribution of `payment_rate` times a salary starting at `initial_salary`
    pub fn relative(
        n: usize,
        age: u32,
        sex: Sex,
        rates: Vec<f64>,
        payment_rate: f64,
        initial_salary: f64,
    ) -> Self {
        Self {
            payment_mode: PaymentMode::Relative,
            payment_rate: Some(payment_rate),
            fixed_payment: None,
            initial_salary: Some(initial_salary),
            ..Self::fixed(n, age, sex, rates, 0.0)
        }
    }

    pub fn with_salary_model(mut self, model: SalaryModel) -> Self {
        self.salary_model = Some(model);
        self
    }

    pub fn with_unemployment_model(mut self, model: UnemploymentModel) -> Self {
        self.unemployment_model = Some(model);
        self
    }

    pub fn with_initial_salary(mut self, initial_salary: f64) -> Self {
        self.initial_salary = Some(initial_salary);
        self
    }

    pub fn with_tax_deduction_rate(mut self, rate: f64) -> Self {
        self.tax_deduction_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject configurations the pipeline cannot run
    pub fn validate(&self) -> Result<(), ProgramError> {
        match self.payment_mode {
            PaymentMode::Relative => {
                if self.payment_rate.is_none() {
                    return Err(ProgramError::MissingPaymentRate);
                }
                if self.initial_salary.is_none() {
                    return Err(ProgramError::MissingInitialSalary);
                }
            }
            PaymentMode::Fixed => {
                if self.fixed_payment.is_none() {
                    return Err(ProgramError::MissingFixedPayment);
                }
            }
        }

        if self.n == 0 {
            return Err(ProgramError::EmptyHorizon);
        }

        if self.rates.len() < self.n {
            return Err(ProgramError::RatesTooShort {
                required: self.n,
                actual: self.rates.len(),
            });
        }

        if let Some(model) = &self.unemployment_model {
            model.validate().map_err(ProgramError::InvalidUnemploymentModel)?;
        }

        Ok(())
    }

    /// Age when the saver leaves the program
    pub fn retirement_age(&self) -> u32 {
        self.age + self.n as u32
    }
}
