use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{NestEggError, Result};
use super::types::InvestmentType;

pub const BONDS_FILE: &str = "10-yr_TBond_returns_1926-2013_pct.txt";
pub const STOCKS_FILE: &str = "SP500_returns_1926-2013_pct.txt";
pub const SB_BLEND_FILE: &str = "S-B_blend_1926-2013_pct.txt";
pub const SBC_BLEND_FILE: &str = "S-B-C_blend_1926-2013_pct.txt";
pub const INFLATION_FILE: &str = "annual_infl_rate_1926-2013_pct.txt";

/// Annual rates as decimal fractions, one entry per calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    name: String,
    rates: Vec<f64>,
}

impl HistoricalSeries {
    pub fn new(name: impl Into<String>, rates: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if rates.is_empty() {
            return Err(NestEggError::configuration(format!(
                "historical series `{name}` is empty"
            )));
        }
        Ok(Self { name, rates })
    }

    /// Parses one percentage per line, skipping blank lines.
    pub fn from_percent_text(name: impl Into<String>, path: &Path, text: &str) -> Result<Self> {
        let mut rates = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let pct = trimmed.parse::<f64>().map_err(|_| {
                NestEggError::data(path, format!("line {}: `{trimmed}` is not a number", idx + 1))
            })?;
            if !pct.is_finite() {
                return Err(NestEggError::data(
                    path,
                    format!("line {}: `{trimmed}` is not a finite number", idx + 1),
                ));
            }
            rates.push(percent_to_decimal(pct));
        }
        Self::new(name, rates)
    }

    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| NestEggError::data_io(path, e))?;
        let series = Self::from_percent_text(name, path, &text)?;
        debug!(
            series = %series.name,
            path = %path.display(),
            years = series.len(),
            "loaded historical series"
        );
        Ok(series)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Rate for a calendar offset that may run past the end of history.
    pub fn wrapped(&self, index: usize) -> f64 {
        self.rates[index % self.rates.len()]
    }
}

fn percent_to_decimal(pct: f64) -> f64 {
    (pct / 100.0 * 100_000.0).round() / 100_000.0
}

/// Every return series plus inflation, aligned on the same calendar years.
#[derive(Debug, Clone)]
pub struct HistoricalData {
    pub stocks: HistoricalSeries,
    pub bonds: HistoricalSeries,
    pub sb_blend: HistoricalSeries,
    pub sbc_blend: HistoricalSeries,
    pub inflation: HistoricalSeries,
}

impl HistoricalData {
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let path = |file: &str| -> PathBuf { dir.join(file) };
        Ok(Self {
            stocks: HistoricalSeries::load("stocks", &path(STOCKS_FILE))?,
            bonds: HistoricalSeries::load("bonds", &path(BONDS_FILE))?,
            sb_blend: HistoricalSeries::load("sb_blend", &path(SB_BLEND_FILE))?,
            sbc_blend: HistoricalSeries::load("sbc_blend", &path(SBC_BLEND_FILE))?,
            inflation: HistoricalSeries::load("inflation", &path(INFLATION_FILE))?,
        })
    }

    pub fn returns(&self, kind: InvestmentType) -> &HistoricalSeries {
        match kind {
            InvestmentType::Stocks => &self.stocks,
            InvestmentType::Bonds => &self.bonds,
            InvestmentType::SbBlend => &self.sb_blend,
            InvestmentType::SbcBlend => &self.sbc_blend,
        }
    }
}
