use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Triangular};

use super::history::HistoricalSeries;
use super::types::{DurationBounds, YearSample};

/// Source of the random draws a trial needs.
pub trait RandomSource {
    /// Uniform integer in `[0, upper)`. `upper` is never zero.
    fn uniform_index(&mut self, upper: usize) -> usize;

    /// Continuous triangular deviate over `[low, high]` peaking at `mode`.
    fn triangular(&mut self, low: f64, high: f64, mode: f64) -> f64;
}

pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Independent stream for one trial of a run.
    pub fn for_trial(base_seed: u64, case_id: u32) -> Self {
        Self::new(derive_seed(base_seed, case_id))
    }
}

impl RandomSource for SeededSource {
    fn uniform_index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }

    fn triangular(&mut self, low: f64, high: f64, mode: f64) -> f64 {
        if low >= high {
            return low;
        }
        match Triangular::new(low, high, mode) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => mode,
        }
    }
}

fn derive_seed(base_seed: u64, case_id: u32) -> u64 {
    splitmix64(base_seed ^ ((case_id as u64) << 17) ^ case_id as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub start_index: usize,
    pub years: Vec<YearSample>,
}

impl Scenario {
    pub fn duration(&self) -> u32 {
        self.years.len() as u32
    }
}

/// Draws a retirement length, truncating the continuous deviate toward zero.
pub fn sample_duration<R: RandomSource + ?Sized>(bounds: &DurationBounds, rng: &mut R) -> u32 {
    let deviate = rng.triangular(
        bounds.min_years as f64,
        bounds.max_years as f64,
        bounds.most_likely_years as f64,
    );
    let years = if deviate.is_finite() && deviate > 0.0 {
        deviate.trunc() as u32
    } else {
        0
    };
    years.clamp(bounds.min_years, bounds.max_years)
}

/// Year-ordered (return, inflation) pairs starting at `start_index`, wrapping
/// each series independently when the run outlasts recorded history.
pub fn build_years(
    returns: &HistoricalSeries,
    inflation: &HistoricalSeries,
    start_index: usize,
    duration: u32,
) -> Vec<YearSample> {
    (start_index..start_index + duration as usize)
        .map(|year| YearSample {
            return_rate: returns.wrapped(year),
            inflation_rate: inflation.wrapped(year),
        })
        .collect()
}

pub fn sample_scenario<R: RandomSource + ?Sized>(
    returns: &HistoricalSeries,
    inflation: &HistoricalSeries,
    bounds: &DurationBounds,
    rng: &mut R,
) -> Scenario {
    let start_index = rng.uniform_index(returns.len());
    let duration = sample_duration(bounds, rng);
    Scenario {
        start_index,
        years: build_years(returns, inflation, start_index, duration),
    }
}
