use tracing::{debug, info};

use super::error::{NestEggError, Result};
use super::history::{HistoricalData, HistoricalSeries};
use super::sampler::{RandomSource, SeededSource, sample_scenario};
use super::simulator::simulate_trial;
use super::types::{AggregateResult, SimulationParams, Summary, TrialOutcome};

const PROGRESS_EVERY: u32 = 10_000;
// Larger runs grow the outcome buffers as trials complete.
const PREALLOCATE_CASES: usize = 100_000;

/// Runs every trial for `params` against the series selected by its
/// investment type, seeding each trial from `params.seed`.
pub fn run_simulation(params: &SimulationParams, history: &HistoricalData) -> Result<AggregateResult> {
    let returns = history.returns(params.investment_type);
    run_trials(params, returns, &history.inflation, |case_id| {
        SeededSource::for_trial(params.seed, case_id)
    })
}

/// Driving loop with an injectable random source per trial.
pub fn run_trials<R, F>(
    params: &SimulationParams,
    returns: &HistoricalSeries,
    inflation: &HistoricalSeries,
    mut source_for_case: F,
) -> Result<AggregateResult>
where
    R: RandomSource,
    F: FnMut(u32) -> R,
{
    params.validate()?;
    for series in [returns, inflation] {
        if series.is_empty() {
            return Err(NestEggError::configuration(format!(
                "historical series `{}` is empty",
                series.name()
            )));
        }
    }

    info!(
        investment_type = %params.investment_type,
        start_value = params.start_value,
        withdrawal = params.withdrawal,
        min_years = params.duration.min_years,
        most_likely_years = params.duration.most_likely_years,
        max_years = params.duration.max_years,
        num_cases = params.num_cases,
        seed = params.seed,
        history_years = returns.len(),
        "Running retirement Monte Carlo"
    );

    let mut acc = OutcomeAccumulator::new(params.num_cases as usize);
    for case_id in 0..params.num_cases {
        let mut rng = source_for_case(case_id);
        let scenario = sample_scenario(returns, inflation, &params.duration, &mut rng);
        let outcome = simulate_trial(params.start_value, params.withdrawal, &scenario.years);
        acc.push(scenario.duration(), outcome);

        if (case_id + 1) % PROGRESS_EVERY == 0 {
            debug!(completed = case_id + 1, bankrupt = acc.bankrupt_count, "Monte Carlo progress");
        }
    }

    let result = acc.into_result()?;
    info!(
        ruin_probability = result.summary.ruin_probability,
        bankrupt = result.bankrupt_count,
        average_outcome = result.summary.average_outcome,
        "Monte Carlo finished"
    );
    Ok(result)
}

struct OutcomeAccumulator {
    outcomes: Vec<i64>,
    durations: Vec<u32>,
    bankrupt_count: u32,
}

impl OutcomeAccumulator {
    fn new(expected_cases: usize) -> Self {
        let expected_cases = expected_cases.min(PREALLOCATE_CASES);
        Self {
            outcomes: Vec::with_capacity(expected_cases),
            durations: Vec::with_capacity(expected_cases),
            bankrupt_count: 0,
        }
    }

    fn push(&mut self, duration: u32, outcome: TrialOutcome) {
        if outcome.insolvent {
            self.outcomes.push(0);
            self.bankrupt_count += 1;
        } else {
            self.outcomes.push(outcome.terminal_value);
        }
        self.durations.push(duration);
    }

    fn into_result(self) -> Result<AggregateResult> {
        let summary = summarize(&self.outcomes, &self.durations, self.bankrupt_count)?;
        Ok(AggregateResult {
            outcomes: self.outcomes,
            durations: self.durations,
            bankrupt_count: self.bankrupt_count,
            summary,
        })
    }
}

fn summarize(outcomes: &[i64], durations: &[u32], bankrupt_count: u32) -> Result<Summary> {
    let (Some(&min_outcome), Some(&max_outcome)) = (outcomes.iter().min(), outcomes.iter().max())
    else {
        return Err(NestEggError::configuration(
            "cannot summarize a run with no cases",
        ));
    };

    let n = outcomes.len();
    let total: i128 = outcomes.iter().map(|&v| v as i128).sum();
    let duration_total: u64 = durations.iter().map(|&d| d as u64).sum();

    Ok(Summary {
        num_cases: n as u32,
        bankrupt_count,
        ruin_probability: ruin_probability(bankrupt_count, n),
        average_outcome: total.div_euclid(n as i128) as i64,
        min_outcome,
        max_outcome,
        mean_duration_years: duration_total as f64 / durations.len().max(1) as f64,
    })
}

/// Percentage of bankrupt cases, rounded to one decimal place.
///
/// Rounds the stored `f64` exactly, so a percentage like 6.25 goes to the even
/// digit and 0.15 (stored just below) goes down.
fn ruin_probability(bankrupt_count: u32, num_cases: usize) -> f64 {
    let pct = 100.0 * bankrupt_count as f64 / num_cases as f64;
    format!("{pct:.1}").parse().unwrap_or(pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sampler::tests::ScriptedSource;
    use crate::core::types::{DurationBounds, InvestmentType};
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};

    fn params(num_cases: u32) -> SimulationParams {
        SimulationParams {
            investment_type: InvestmentType::Stocks,
            start_value: 10_000,
            withdrawal: 1_000,
            duration: DurationBounds::new(1, 2, 4).unwrap(),
            num_cases,
            seed: 42,
        }
    }

    fn series(name: &str, rates: &[f64]) -> HistoricalSeries {
        HistoricalSeries::new(name, rates.to_vec()).unwrap()
    }

    fn history(stocks: &[f64], inflation: &[f64]) -> HistoricalData {
        HistoricalData {
            stocks: series("stocks", stocks),
            bonds: series("bonds", &[0.0]),
            sb_blend: series("sb_blend", &[0.0]),
            sbc_blend: series("sbc_blend", &[0.0]),
            inflation: series("inflation", inflation),
        }
    }

    #[test]
    fn oracle_scripted_trials_aggregate_to_hand_calculation() {
        // returns: [0.5, -1.0, 0.0], inflation all 0
        // case 0: start 0, 2 years -> (10_000-1_000)*1.5 = 13_500; 12_500*0 = 0 -> bankrupt
        // case 1: start 2, 3 years -> 9_000; 8_000*1.5 = 12_000; 11_000*0 = 0 -> bankrupt
        // case 2: start 2, 1 year  -> 9_000
        // case 3: start 0, 1 year  -> 13_500
        let returns = series("r", &[0.5, -1.0, 0.0]);
        let inflation = series("i", &[0.0]);
        let mut script = vec![(0, 2.3), (2, 3.9), (2, 1.0), (0, 1.7)].into_iter();

        let result = run_trials(&params(4), &returns, &inflation, |_| {
            let (start, deviate) = script.next().expect("scripted case");
            ScriptedSource {
                starts: vec![start],
                deviates: vec![deviate],
            }
        })
        .expect("valid run");

        assert_eq!(result.outcomes, vec![0, 0, 9_000, 13_500]);
        assert_eq!(result.durations, vec![2, 3, 1, 1]);
        assert_eq!(result.bankrupt_count, 2);
        assert_eq!(
            result.summary,
            Summary {
                num_cases: 4,
                bankrupt_count: 2,
                ruin_probability: 50.0,
                average_outcome: 5_625,
                min_outcome: 0,
                max_outcome: 13_500,
                mean_duration_years: 1.75,
            }
        );
    }

    #[test]
    fn zero_cases_is_rejected_before_any_trial() {
        let returns = series("r", &[0.1]);
        let inflation = series("i", &[0.0]);
        let mut calls = 0;
        let err = run_trials(&params(0), &returns, &inflation, |_| {
            calls += 1;
            SeededSource::new(1)
        })
        .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(calls, 0);
    }

    #[test]
    fn invalid_year_ordering_is_rejected() {
        let mut p = params(10);
        p.duration = DurationBounds::new(5, 5, 5).unwrap();
        let err = run_simulation(&p, &history(&[0.1], &[0.0])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn fixed_seed_reruns_are_identical() {
        let data = history(&[0.12, -0.08, 0.2, 0.03, -0.3, 0.15], &[0.02, 0.03, 0.01]);
        let mut p = params(500);
        p.duration = DurationBounds::new(5, 12, 30).unwrap();
        p.withdrawal = 700;

        let a = run_simulation(&p, &data).unwrap();
        let b = run_simulation(&p, &data).unwrap();
        assert_eq!(a.outcomes, b.outcomes);
        assert_eq!(a.durations, b.durations);
        assert_eq!(a.summary, b.summary);

        p.seed += 1;
        let c = run_simulation(&p, &data).unwrap();
        assert_ne!(a.durations, c.durations);
    }

    #[test]
    fn uses_series_for_requested_investment_type() {
        let mut data = history(&[0.0], &[0.0]);
        data.bonds = series("bonds", &[1.0]);
        let mut p = params(20);
        p.investment_type = InvestmentType::Bonds;

        let result = run_simulation(&p, &data).unwrap();
        assert_eq!(result.bankrupt_count, 0);
        assert!(result.outcomes.iter().all(|&v| v >= 18_000));
    }

    #[test]
    fn reference_defaults_mean_duration_tracks_triangular_mean() {
        let data = history(&[0.05, 0.07, -0.02], &[0.02, 0.03]);
        let p = SimulationParams {
            investment_type: InvestmentType::Stocks,
            start_value: 2_000_000,
            withdrawal: 80_000,
            duration: DurationBounds::new(18, 25, 40).unwrap(),
            num_cases: 50_000,
            seed: 1926,
        };
        let result = run_simulation(&p, &data).unwrap();
        assert_eq!(result.outcomes.len(), 50_000);
        // Truncated durations sit about half a year below (18 + 25 + 40) / 3.
        let expected = p.duration.theoretical_mean() - 0.5;
        assert!(
            (result.summary.mean_duration_years - expected).abs() < 0.15,
            "mean duration {}",
            result.summary.mean_duration_years
        );
    }

    #[test]
    fn ruin_probability_rounds_to_one_decimal() {
        assert_eq!(ruin_probability(1, 3), 33.3);
        assert_eq!(ruin_probability(2, 3), 66.7);
        assert_eq!(ruin_probability(0, 7), 0.0);
        assert_eq!(ruin_probability(7, 7), 100.0);
    }

    #[test]
    fn ruin_probability_ties_follow_stored_float() {
        // 6.25 is exact and rounds to even; 0.15 is stored as 0.1499...
        assert_eq!(ruin_probability(1, 16), 6.2);
        assert_eq!(ruin_probability(3, 16), 18.8);
        assert_eq!(ruin_probability(75, 50_000), 0.1);
    }

    #[test]
    fn accumulator_caps_preallocation_for_huge_runs() {
        let acc = OutcomeAccumulator::new(u32::MAX as usize);
        assert!(acc.outcomes.capacity() <= PREALLOCATE_CASES);
        assert!(acc.durations.capacity() <= PREALLOCATE_CASES);
        assert!(OutcomeAccumulator::new(10).outcomes.capacity() >= 10);
    }

    #[test]
    fn average_outcome_floors() {
        let summary = summarize(&[0, 10, 11], &[1, 1, 1], 1).unwrap();
        assert_eq!(summary.average_outcome, 7);
        assert!(summarize(&[], &[], 0).is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_run_invariants_hold(
            seed in any::<u64>(),
            num_cases in 1_u32..400,
            start_value in 1_i64..3_000_000,
            withdrawal in 1_i64..200_000,
            rates in proptest::collection::vec(-0.5_f64..0.5, 1..40),
            inflation in proptest::collection::vec(-0.05_f64..0.15, 1..40),
        ) {
            let data = history(&rates, &inflation);
            let p = SimulationParams {
                investment_type: InvestmentType::Stocks,
                start_value,
                withdrawal,
                duration: DurationBounds::new(3, 10, 35).unwrap(),
                num_cases,
                seed,
            };
            let result = run_simulation(&p, &data).unwrap();

            prop_assert_eq!(result.outcomes.len(), num_cases as usize);
            prop_assert!(result.durations.iter().all(|&d| p.duration.contains(d)));
            let zeros = result.outcomes.iter().filter(|&&v| v == 0).count() as u32;
            prop_assert_eq!(zeros, result.bankrupt_count);

            let s = result.summary;
            prop_assert!((0.0..=100.0).contains(&s.ruin_probability));
            prop_assert_eq!(s.ruin_probability, ruin_probability(zeros, num_cases as usize));
            prop_assert!(s.min_outcome <= s.average_outcome);
            prop_assert!(s.average_outcome <= s.max_outcome);
            if result.bankrupt_count > 0 {
                prop_assert_eq!(s.min_outcome, 0);
            }
        }
    }
}
