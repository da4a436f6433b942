//! Security path models and the correlated Monte-Carlo portfolio

mod model;
mod correlation;
mod portfolio;
pub mod builder;

pub use model::{step_count, Security, StockParameters, BondParameters, TRADING_DAYS};
pub use correlation::CholeskyFactor;
pub use portfolio::{PortfolioModel, PortfolioPaths, SimulationConfig, WEIGHT_TOLERANCE};
pub use builder::{
    build_securities, MarketStatistics, PortfolioStructure, ReturnStatistics, SecurityKind,
    StructureRow, YieldStatistics,
};
