mod engine;
mod error;
mod history;
mod sampler;
mod simulator;
mod types;

pub use engine::{run_simulation, run_trials};
pub use error::{NestEggError, Result};
pub use history::{
    BONDS_FILE, HistoricalData, HistoricalSeries, INFLATION_FILE, SB_BLEND_FILE, SBC_BLEND_FILE,
    STOCKS_FILE,
};
pub use sampler::{RandomSource, Scenario, SeededSource, build_years, sample_duration, sample_scenario};
pub use simulator::simulate_trial;
pub use types::{
    AggregateResult, DurationBounds, InvestmentType, MAX_RETIREMENT_YEARS, SimulationParams,
    Summary, TrialOutcome, YearSample,
};
