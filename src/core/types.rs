use std::fmt;

use serde::Serialize;

use super::error::{NestEggError, Result};

/// Longest retirement the model accepts.
pub const MAX_RETIREMENT_YEARS: u32 = 98;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentType {
    Stocks,
    Bonds,
    SbBlend,
    SbcBlend,
}

impl InvestmentType {
    pub fn key(self) -> &'static str {
        match self {
            InvestmentType::Stocks => "stocks",
            InvestmentType::Bonds => "bonds",
            InvestmentType::SbBlend => "sb_blend",
            InvestmentType::SbcBlend => "sbc_blend",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InvestmentType::Stocks => "SP500",
            InvestmentType::Bonds => "10-yr Treasury Bond",
            InvestmentType::SbBlend => "50% SP500/50% TBond",
            InvestmentType::SbcBlend => "40% SP500/50% TBond/10% Cash",
        }
    }
}

impl fmt::Display for InvestmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Triangular retirement-length distribution, in whole years.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationBounds {
    pub min_years: u32,
    pub most_likely_years: u32,
    pub max_years: u32,
}

impl DurationBounds {
    /// Accepts any `min <= most_likely <= max`; the stricter ordering required
    /// of user input is enforced by [`SimulationParams::validate`].
    pub fn new(min_years: u32, most_likely_years: u32, max_years: u32) -> Result<Self> {
        if !(min_years <= most_likely_years && most_likely_years <= max_years) {
            return Err(NestEggError::configuration(format!(
                "duration bounds must satisfy min <= most likely <= max, got {min_years}-{most_likely_years}-{max_years}"
            )));
        }
        Ok(Self {
            min_years,
            most_likely_years,
            max_years,
        })
    }

    pub fn contains(&self, years: u32) -> bool {
        (self.min_years..=self.max_years).contains(&years)
    }

    /// Mean of the continuous distribution before truncation.
    pub fn theoretical_mean(&self) -> f64 {
        (self.min_years + self.most_likely_years + self.max_years) as f64 / 3.0
    }
}

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub investment_type: InvestmentType,
    pub start_value: i64,
    pub withdrawal: i64,
    pub duration: DurationBounds,
    pub num_cases: u32,
    pub seed: u64,
}

impl SimulationParams {
    pub fn validate(&self) -> Result<()> {
        if self.start_value <= 0 {
            return Err(NestEggError::configuration("starting value must be > 0"));
        }
        if self.withdrawal <= 0 {
            return Err(NestEggError::configuration("annual withdrawal must be > 0"));
        }

        let DurationBounds {
            min_years,
            most_likely_years,
            max_years,
        } = self.duration;
        if min_years == 0 {
            return Err(NestEggError::configuration(
                "minimum years in retirement must be > 0",
            ));
        }
        if !(min_years < most_likely_years && most_likely_years < max_years) {
            return Err(NestEggError::configuration(format!(
                "problem with input years {min_years}-{most_likely_years}-{max_years}: requires min < most likely < max"
            )));
        }
        if max_years > MAX_RETIREMENT_YEARS {
            return Err(NestEggError::configuration(format!(
                "maximum years in retirement must be <= {MAX_RETIREMENT_YEARS}, got {max_years}"
            )));
        }

        if self.num_cases == 0 {
            return Err(NestEggError::configuration("number of cases must be > 0"));
        }
        Ok(())
    }
}

/// One simulated calendar year drawn from history.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YearSample {
    pub return_rate: f64,
    pub inflation_rate: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TrialOutcome {
    /// Portfolio value at the end of the trial, 0 when insolvent.
    pub terminal_value: i64,
    pub insolvent: bool,
    pub years_simulated: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub num_cases: u32,
    pub bankrupt_count: u32,
    pub ruin_probability: f64,
    pub average_outcome: i64,
    pub min_outcome: i64,
    pub max_outcome: i64,
    pub mean_duration_years: f64,
}

#[derive(Debug, Clone)]
pub struct AggregateResult {
    /// Terminal value of every trial in trial order.
    pub outcomes: Vec<i64>,
    pub durations: Vec<u32>,
    pub bankrupt_count: u32,
    pub summary: Summary,
}
