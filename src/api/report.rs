use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::core::{NestEggError, Result, SimulationParams, Summary};

/// Only the first cases are charted; the full run can be far larger.
pub const CHART_CASE_LIMIT: usize = 3_000;

pub fn chart_outcomes(outcomes: &[i64]) -> &[i64] {
    &outcomes[..outcomes.len().min(CHART_CASE_LIMIT)]
}

pub fn render_report(params: &SimulationParams, summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Investment type: {} ({})",
        params.investment_type,
        params.investment_type.description()
    );
    let _ = writeln!(out, "Starting value: ${}", group_thousands(params.start_value));
    let _ = writeln!(out, "Annual withdrawal: ${}", group_thousands(params.withdrawal));
    let _ = writeln!(
        out,
        "Years in retirement (min-ml-max): {}-{}-{}",
        params.duration.min_years, params.duration.most_likely_years, params.duration.max_years
    );
    let _ = writeln!(
        out,
        "Number of runs: {}",
        group_thousands(summary.num_cases as i64)
    );
    let _ = writeln!(out, "Seed: {}", params.seed);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Odds of running out of money: {:.1}%",
        summary.ruin_probability
    );
    let _ = writeln!(
        out,
        "Average outcome: ${}",
        group_thousands(summary.average_outcome)
    );
    let _ = writeln!(
        out,
        "Minimum outcome: ${}",
        group_thousands(summary.min_outcome)
    );
    let _ = writeln!(
        out,
        "Maximum outcome: ${}",
        group_thousands(summary.max_outcome)
    );
    let _ = writeln!(
        out,
        "Average years simulated: {:.2}",
        summary.mean_duration_years
    );
    out
}

pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Writes `case,remaining` rows for the charted cases, numbering from 1.
pub fn write_chart_csv(path: &Path, outcomes: &[i64]) -> Result<()> {
    let mut body = String::from("case,remaining\n");
    for (idx, value) in chart_outcomes(outcomes).iter().enumerate() {
        let _ = writeln!(body, "{},{}", idx + 1, value);
    }
    fs::write(path, body).map_err(|e| NestEggError::output(path, e))
}
