//! Savings program: inputs, policies, the accrual pipeline and its outputs

mod engine;
mod input;
mod policy;
mod report;
mod trajectory;

pub use engine::ProgramEngine;
pub use input::{PaymentMode, ProgramInput, Sex};
pub use policy::{
    CoFinancingPolicy, FeeCharge, FeePolicy, ManagementFee, MatchedCoFinancing, NoCoFinancing, NoFee,
    ProgramKind,
};
pub use report::{DetailedReport, ReportRow};
pub use trajectory::Trajectory;
