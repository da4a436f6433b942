//! Six-stage savings pipeline
//!
//! salary -> employment shocks -> contributions -> co-financing ->
//! fee-bearing accumulation -> pension. Each stage produces a value that the
//! next one consumes; the finished `Trajectory` is frozen until the next `run()`.

use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::input::{PaymentMode, ProgramInput};
use super::policy::{CoFinancingPolicy, FeePolicy, ProgramKind};
use super::report::DetailedReport;
use super::trajectory::Trajectory;
use crate::error::ProgramError;
use crate::life_table::LifeTable;
use crate::macro_models::flat_salaries;
use crate::metrics::Metrics;

/// Saver contributions and tax deductions, n + 1 entries each
struct Contributions {
    payments: Vec<f64>,
    tax_deductions: Vec<f64>,
}

/// Output of the accumulation stage, n + 1 entries per vector
struct Accrual {
    total_inflows: Vec<f64>,
    balance_before_return: Vec<f64>,
    interest: Vec<f64>,
    variable_fees: Vec<f64>,
    fixed_fees: Vec<f64>,
    total_fees: Vec<f64>,
    balances: Vec<f64>,
    final_accumulation: f64,
}

/// Runs one savings program over a realised rate series
#[derive(Debug)]
pub struct ProgramEngine {
    input: ProgramInput,
    life_table: Option<Arc<LifeTable>>,
    co_financing: Box<dyn CoFinancingPolicy>,
    fee: Box<dyn FeePolicy>,
    trajectory: Option<Trajectory>,
}

impl ProgramEngine {
    /// Baseline engine: no co-financing, no fees
    pub fn new(input: ProgramInput, life_table: Option<Arc<LifeTable>>) -> Result<Self, ProgramError> {
        Self::for_kind(ProgramKind::Iis3, input, life_table)
    }

    /// Engine with the co-financing and fee policies of a preset program
    pub fn for_kind(
        kind: ProgramKind,
        input: ProgramInput,
        life_table: Option<Arc<LifeTable>>,
    ) -> Result<Self, ProgramError> {
        input.validate()?;
        let co_financing = kind.co_financing_policy();
        co_financing.validate(&input)?;

        Ok(Self {
            input,
            life_table,
            co_financing,
            fee: kind.fee_policy(),
            trajectory: None,
        })
    }

    /// Swap in a co-financing policy; fails when the input does not satisfy it
    pub fn with_co_financing(mut self, policy: Box<dyn CoFinancingPolicy>) -> Result<Self, ProgramError> {
        policy.validate(&self.input)?;
        self.co_financing = policy;
        self.trajectory = None;
        Ok(self)
    }

    pub fn with_fee_policy(mut self, policy: Box<dyn FeePolicy>) -> Self {
        self.fee = policy;
        self.trajectory = None;
        self
    }

    /// Execute the pipeline, replacing any previous trajectory
    pub fn run(&mut self) -> Result<&Trajectory, ProgramError> {
        let n = self.input.n;
        let mut rng = match self.input.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let salaries = self.project_salaries(&mut rng);
        let (annual_salaries, shocks) = self.apply_employment_shocks(salaries, &mut rng);
        let contributions = self.calculate_contributions(&annual_salaries, &shocks)?;

        let mut co_financing = self.co_financing.co_financing(&self.input, &contributions.payments);
        co_financing.resize(n + 1, 0.0);

        let accrual = self.accumulate(&contributions, &co_financing);
        debug!(
            "accumulated {:.2} over {} periods, fees {:.2}",
            accrual.final_accumulation,
            n,
            accrual.total_fees.iter().sum::<f64>()
        );

        let (annuity_months, first_pension) = self.finalize(accrual.final_accumulation)?;

        let trajectory = Trajectory {
            years: n,
            annual_salaries,
            shocks,
            payments: contributions.payments,
            tax_deductions: contributions.tax_deductions,
            co_financing,
            total_inflows: accrual.total_inflows,
            rates: self.input.rates[..n].to_vec(),
            balance_before_return: accrual.balance_before_return,
            interest: accrual.interest,
            variable_fees: accrual.variable_fees,
            fixed_fees: accrual.fixed_fees,
            total_fees: accrual.total_fees,
            balances: accrual.balances,
            final_accumulation: accrual.final_accumulation,
            annuity_months,
            first_pension,
        };

        info!(
            "program run complete: {} years, final accumulation {:.2}",
            n, trajectory.final_accumulation
        );

        Ok(&*self.trajectory.insert(trajectory))
    }

    /// Trajectory of the last `run()`
    pub fn trajectory(&self) -> Result<&Trajectory, ProgramError> {
        self.trajectory.as_ref().ok_or(ProgramError::NotRun("trajectory"))
    }

    pub fn compute_metrics(&self) -> Result<Metrics, ProgramError> {
        self.trajectory
            .as_ref()
            .map(Trajectory::metrics)
            .ok_or(ProgramError::NotRun("metrics"))
    }

    pub fn detailed_report(&self) -> Result<DetailedReport, ProgramError> {
        self.trajectory
            .as_ref()
            .map(Trajectory::report)
            .ok_or(ProgramError::NotRun("detailed report"))
    }

    /// Stage 1: annual salaries, n working years plus a zero settlement year
    fn project_salaries(&self, rng: &mut StdRng) -> Vec<f64> {
        let initial_salary = self.input.initial_salary.unwrap_or(0.0);
        match &self.input.salary_model {
            Some(model) => model.simulate(self.input.n, initial_salary, rng),
            None => flat_salaries(self.input.n, initial_salary),
        }
    }

    /// Stage 2: scale salaries by the employment multipliers
    fn apply_employment_shocks(&self, mut salaries: Vec<f64>, rng: &mut StdRng) -> (Vec<f64>, Vec<f64>) {
        let n = self.input.n;
        let shocks = match &self.input.unemployment_model {
            Some(model) => model.simulate_shocks(n, rng),
            None => vec![1.0; n + 1],
        };

        for (salary, shock) in salaries.iter_mut().zip(&shocks) {
            *salary *= shock;
        }

        (salaries, shocks)
    }

    /// Stage 3: saver contributions and the tax deductions they generate
    fn calculate_contributions(&self, salaries: &[f64], shocks: &[f64]) -> Result<Contributions, ProgramError> {
        let n = self.input.n;
        let tax_rate = self.input.tax_deduction_rate;

        match self.input.payment_mode {
            PaymentMode::Relative => {
                let payment_rate = self.input.payment_rate.ok_or(ProgramError::MissingPaymentRate)?;
                let mut payments: Vec<f64> = Vec::with_capacity(n + 1);
                let mut tax_deductions: Vec<f64> = Vec::with_capacity(n + 1);

                // Last year's deduction is reinvested with this year's contribution
                for i in 0..n {
                    let tax = if i == 0 { 0.0 } else { payments[i - 1] * tax_rate };
                    tax_deductions.push(tax);
                    payments.push(salaries[i] * payment_rate + tax);
                }
                tax_deductions.push(payments[n - 1] * tax_rate);
                payments.push(0.0);

                Ok(Contributions { payments, tax_deductions })
            }
            PaymentMode::Fixed => {
                let payment = self.input.fixed_payment.ok_or(ProgramError::MissingFixedPayment)?;
                let payments = (0..=n)
                    .map(|i| if i < n { payment * shocks[i] } else { 0.0 })
                    .collect();
                let tax_deductions = (0..=n)
                    .map(|i| if i == 0 { 0.0 } else { payment * tax_rate * shocks[i] })
                    .collect();

                Ok(Contributions { payments, tax_deductions })
            }
        }
    }

    /// Stage 5: credit returns and charge fees period by period
    fn accumulate(&self, contributions: &Contributions, co_financing: &[f64]) -> Accrual {
        let n = self.input.n;
        let rates = &self.input.rates;

        let total_inflows: Vec<f64> = (0..=n)
            .map(|i| contributions.payments[i] + contributions.tax_deductions[i] + co_financing[i])
            .collect();

        let mut balance_before_return = vec![0.0; n + 1];
        let mut interest = vec![0.0; n + 1];
        let mut variable_fees = vec![0.0; n + 1];
        let mut fixed_fees = vec![0.0; n + 1];
        let mut total_fees = vec![0.0; n + 1];
        let mut balances = vec![0.0; n + 1];

        let mut prev_balance = 0.0;
        for i in 0..n {
            let before = total_inflows[i] + prev_balance;
            let credited = before * rates[i];
            let after_return = before + credited;
            let charge = self.fee.fee(credited, prev_balance, after_return);

            balance_before_return[i] = before;
            interest[i] = credited;
            variable_fees[i] = charge.variable;
            fixed_fees[i] = charge.fixed;
            total_fees[i] = charge.total();
            balances[i] = after_return - charge.total();

            prev_balance = balances[i];
        }

        // Settlement: only the final tax deduction is credited
        let final_accumulation = prev_balance + contributions.tax_deductions[n];
        balance_before_return[n] = final_accumulation;
        balances[n] = final_accumulation;

        Accrual {
            total_inflows,
            balance_before_return,
            interest,
            variable_fees,
            fixed_fees,
            total_fees,
            balances,
            final_accumulation,
        }
    }

    /// Stage 6: annuity factor and first monthly pension
    fn finalize(&self, final_accumulation: f64) -> Result<(Option<f64>, Option<f64>), ProgramError> {
        let Some(table) = &self.life_table else {
            return Ok((None, None));
        };

        let age = self.input.retirement_age();
        let months = table
            .annuity_months(age, self.input.sex)
            .ok_or(ProgramError::MissingLifeTableAge { age })?;

        Ok((Some(months), Some(final_accumulation / months)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macro_models::{SalaryModel, UnemploymentModel};
    use crate::program::{ManagementFee, MatchedCoFinancing, Sex};
    use approx::assert_relative_eq;

    fn scenario() -> ProgramInput {
        ProgramInput::fixed(3, 60, Sex::Male, vec![0.05; 3], 1000.0)
    }

    fn life_table() -> Arc<LifeTable> {
        let mut table = LifeTable::new();
        table.insert(63, 240.0, 300.0);
        Arc::new(table)
    }

    #[test]
    fn test_fixed_payment_scenario() {
        let mut engine = ProgramEngine::new(scenario(), None).unwrap();
        let trajectory = engine.run().unwrap();

        let expected = [1050.0, 2152.5, 3310.125, 3310.125];
        for (balance, expected) in trajectory.balances.iter().zip(expected) {
            assert_relative_eq!(*balance, expected, epsilon = 1e-9);
        }
        assert_eq!(trajectory.payments, vec![1000.0, 1000.0, 1000.0, 0.0]);
        assert!(trajectory.tax_deductions.iter().all(|&t| t == 0.0));
        assert!(trajectory.first_pension.is_none());

        let metrics = engine.compute_metrics().unwrap();
        assert_relative_eq!(metrics.savings, 3310.125, epsilon = 1e-9);
        assert_relative_eq!(metrics.roi, 0.103375, epsilon = 1e-9);
        assert_relative_eq!(metrics.irr, 0.05, epsilon = 1e-8);
        assert_relative_eq!(metrics.twr, 0.05, epsilon = 1e-12);
        assert!(metrics.pension.is_nan());
        assert!(metrics.kz.is_nan());
    }

    #[test]
    fn test_annuity_due_closed_form() {
        let (n, r, p) = (20, 0.07, 2500.0);
        let input = ProgramInput::fixed(n, 40, Sex::Female, vec![r; n], p);
        let mut engine = ProgramEngine::new(input, None).unwrap();
        let trajectory = engine.run().unwrap();

        let expected = p * (1.0 + r) * ((1.0_f64 + r).powi(n as i32) - 1.0) / r;
        assert_relative_eq!(trajectory.final_accumulation, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_arrays_have_settlement_period() {
        let n = 7;
        let input = ProgramInput::relative(n, 45, Sex::Female, vec![0.03; n], 0.06, 50_000.0)
            .with_tax_deduction_rate(0.13)
            .with_salary_model(SalaryModel::Stochastic { mean_growth: 0.05, volatility: 0.02 })
            .with_unemployment_model(UnemploymentModel::Weibull {
                p_exit: 0.3,
                weibull_k: 1.5,
                weibull_lambda: 6.0,
            })
            .with_seed(11);
        let mut engine = ProgramEngine::for_kind(ProgramKind::Pds, input, None).unwrap();
        let t = engine.run().unwrap();

        for series in [
            &t.annual_salaries,
            &t.shocks,
            &t.payments,
            &t.tax_deductions,
            &t.co_financing,
            &t.total_inflows,
            &t.balance_before_return,
            &t.interest,
            &t.variable_fees,
            &t.fixed_fees,
            &t.total_fees,
            &t.balances,
        ] {
            assert_eq!(series.len(), n + 1);
        }
        assert_eq!(t.rates.len(), n);
        assert_eq!(t.annual_salaries[n], 0.0);
        assert_eq!(t.payments[n], 0.0);
        assert_eq!(engine.detailed_report().unwrap().len(), n + 1);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let input = ProgramInput::relative(10, 45, Sex::Male, vec![0.04; 10], 0.06, 50_000.0)
            .with_salary_model(SalaryModel::Stochastic { mean_growth: 0.05, volatility: 0.03 })
            .with_unemployment_model(UnemploymentModel::Weibull {
                p_exit: 0.5,
                weibull_k: 1.0,
                weibull_lambda: 4.0,
            })
            .with_seed(2024);

        let first = ProgramEngine::new(input.clone(), None).unwrap().run().unwrap().clone();
        let second = ProgramEngine::new(input, None).unwrap().run().unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_views_require_run() {
        let engine = ProgramEngine::new(scenario(), None).unwrap();
        assert_eq!(engine.compute_metrics(), Err(ProgramError::NotRun("metrics")));
        assert_eq!(engine.detailed_report(), Err(ProgramError::NotRun("detailed report")));
        assert!(engine.trajectory().is_err());
    }

    #[test]
    fn test_invalid_input_rejected_at_construction() {
        let mut input = scenario();
        input.fixed_payment = None;
        assert_eq!(
            ProgramEngine::new(input, None).unwrap_err(),
            ProgramError::MissingFixedPayment
        );
    }

    #[test]
    fn test_relative_mode_reinvests_tax_deduction() {
        let input = ProgramInput::relative(2, 45, Sex::Male, vec![0.0; 2], 0.1, 1000.0)
            .with_tax_deduction_rate(0.13);
        let mut engine = ProgramEngine::new(input, None).unwrap();
        let t = engine.run().unwrap();

        assert_relative_eq!(t.payments[0], 100.0, epsilon = 1e-9);
        assert_relative_eq!(t.tax_deductions[1], 13.0, epsilon = 1e-9);
        assert_relative_eq!(t.payments[1], 113.0, epsilon = 1e-9);
        assert_relative_eq!(t.tax_deductions[2], 14.69, epsilon = 1e-9);
        assert_eq!(t.payments[2], 0.0);

        assert_relative_eq!(t.balances[0], 100.0, epsilon = 1e-9);
        assert_relative_eq!(t.balances[1], 226.0, epsilon = 1e-9);
        assert_relative_eq!(t.final_accumulation, 240.69, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_salary_is_not_rescaled() {
        let input = ProgramInput::relative(1, 45, Sex::Male, vec![0.0], 0.1, 1000.0);
        let mut engine = ProgramEngine::new(input, None).unwrap();
        let t = engine.run().unwrap();

        assert_eq!(t.annual_salaries, vec![1000.0, 0.0]);
        assert_relative_eq!(t.payments[0], 100.0, epsilon = 1e-9);
        assert_eq!(t.payments[1], 0.0);
    }

    #[test]
    fn test_fixed_mode_applies_shocks() {
        let input = ProgramInput::fixed(3, 50, Sex::Male, vec![0.0; 3], 1000.0)
            .with_tax_deduction_rate(0.1)
            .with_unemployment_model(UnemploymentModel::Scheduled { multipliers: vec![0.5, 0.0] });
        let mut engine = ProgramEngine::new(input, None).unwrap();
        let t = engine.run().unwrap();

        assert_eq!(t.shocks, vec![1.0, 0.5, 0.0, 1.0]);
        assert_eq!(t.payments, vec![1000.0, 500.0, 0.0, 0.0]);
        assert_eq!(t.tax_deductions, vec![0.0, 50.0, 0.0, 100.0]);
        assert_relative_eq!(t.final_accumulation, 1650.0, epsilon = 1e-9);
    }

    #[test]
    fn test_co_financing_and_fees() {
        let input = ProgramInput::fixed(2, 60, Sex::Male, vec![0.1; 2], 1000.0)
            .with_initial_salary(50_000.0);
        let mut engine = ProgramEngine::new(input, None)
            .unwrap()
            .with_co_financing(Box::new(MatchedCoFinancing::default()))
            .unwrap()
            .with_fee_policy(Box::new(ManagementFee::default()));
        let t = engine.run().unwrap();

        assert_eq!(t.co_financing, vec![0.0, 1000.0, 1000.0]);
        assert_eq!(t.total_inflows, vec![1000.0, 2000.0, 1000.0]);

        assert_relative_eq!(t.variable_fees[0], 20.0, epsilon = 1e-9);
        assert_relative_eq!(t.fixed_fees[0], 2.75, epsilon = 1e-9);
        assert_relative_eq!(t.balances[0], 1077.25, epsilon = 1e-9);
        assert_relative_eq!(t.balance_before_return[1], 3077.25, epsilon = 1e-9);
        assert_relative_eq!(t.total_fees[1], 72.7005625, epsilon = 1e-9);
        // Settlement-period co-financing is not credited
        assert_relative_eq!(t.final_accumulation, 3312.2744375, epsilon = 1e-9);
    }

    #[test]
    fn test_matching_without_salary_is_rejected() {
        let input = ProgramInput::fixed(2, 60, Sex::Male, vec![0.1; 2], 1000.0);

        assert_eq!(
            ProgramEngine::for_kind(ProgramKind::Pds, input.clone(), None).unwrap_err(),
            ProgramError::MissingInitialSalary
        );
        assert_eq!(
            ProgramEngine::new(input, None)
                .unwrap()
                .with_co_financing(Box::new(MatchedCoFinancing::default()))
                .unwrap_err(),
            ProgramError::MissingInitialSalary
        );
    }

    #[test]
    fn test_preset_matches_explicit_policies() {
        let input = ProgramInput::fixed(4, 55, Sex::Female, vec![0.06; 4], 5000.0)
            .with_initial_salary(120_000.0)
            .with_tax_deduction_rate(0.13);

        let preset = ProgramEngine::for_kind(ProgramKind::Pds, input.clone(), None)
            .unwrap()
            .run()
            .unwrap()
            .clone();
        let explicit = ProgramEngine::new(input, None)
            .unwrap()
            .with_co_financing(Box::new(MatchedCoFinancing::default()))
            .unwrap()
            .with_fee_policy(Box::new(ManagementFee::default()))
            .run()
            .unwrap()
            .clone();

        assert_eq!(preset, explicit);
    }

    #[test]
    fn test_pension_and_replacement_ratio() {
        let input = scenario().with_initial_salary(1000.0);
        let mut engine = ProgramEngine::new(input, Some(life_table())).unwrap();
        let t = engine.run().unwrap();

        assert_eq!(t.annuity_months, Some(240.0));
        let pension = 3310.125 / 240.0;
        assert_relative_eq!(t.first_pension.unwrap(), pension, epsilon = 1e-12);

        let metrics = engine.compute_metrics().unwrap();
        assert_relative_eq!(metrics.pension, pension, epsilon = 1e-12);
        // A flat 1000 per year is 1000 / 12 per month
        assert_relative_eq!(metrics.kz, pension / (1000.0 / 12.0), epsilon = 1e-12);
    }

    #[test]
    fn test_replacement_ratio_undefined_without_salary() {
        let mut engine = ProgramEngine::new(scenario(), Some(life_table())).unwrap();
        engine.run().unwrap();

        let metrics = engine.compute_metrics().unwrap();
        assert!(metrics.pension.is_finite());
        assert!(metrics.kz.is_nan());
    }

    #[test]
    fn test_missing_life_table_age() {
        let input = ProgramInput::fixed(5, 60, Sex::Male, vec![0.05; 5], 1000.0);
        let mut engine = ProgramEngine::new(input, Some(life_table())).unwrap();
        assert_eq!(engine.run().unwrap_err(), ProgramError::MissingLifeTableAge { age: 65 });
    }

    #[test]
    fn test_report_settlement_row() {
        let mut engine = ProgramEngine::new(scenario(), None).unwrap();
        engine.run().unwrap();
        let report = engine.detailed_report().unwrap();

        assert_eq!(report.rows[0].period, 1);
        assert_eq!(report.rows[0].rate_pct, Some(5.0));
        assert_eq!(report.rows[0].interest, 50.0);
        assert_eq!(report.rows[3].rate_pct, None);
        assert_eq!(report.rows[3].interest, 0.0);
        assert_eq!(report.rows[3].payment, 0.0);
    }
}
