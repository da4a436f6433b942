//! Macro-economic plugins feeding the savings program: salary paths and
//! employment shocks

mod salary;
mod unemployment;

pub use salary::{flat_salaries, SalaryModel};
pub use unemployment::UnemploymentModel;
