use super::types::{TrialOutcome, YearSample};

/// Replays one retirement: withdraw first, then apply the year's return.
///
/// The withdrawal starts at `withdrawal` and is raised by each later year's
/// inflation. Both the withdrawal and the balance are truncated to whole
/// currency units every year, so rounding never compounds fractionally. The
/// trial stops at the first year the balance reaches zero or below.
pub fn simulate_trial(start_value: i64, withdrawal: i64, years: &[YearSample]) -> TrialOutcome {
    let mut balance = start_value;
    let mut year_withdrawal = withdrawal;

    for (index, year) in years.iter().enumerate() {
        if index > 0 {
            year_withdrawal = scale_truncated(year_withdrawal, year.inflation_rate);
        }

        balance -= year_withdrawal;
        balance = scale_truncated(balance, year.return_rate);

        if balance <= 0 {
            return TrialOutcome {
                terminal_value: 0,
                insolvent: true,
                years_simulated: index as u32 + 1,
            };
        }
    }

    TrialOutcome {
        terminal_value: balance,
        insolvent: false,
        years_simulated: years.len() as u32,
    }
}

// `as` saturates and truncates toward zero.
fn scale_truncated(amount: i64, rate: f64) -> i64 {
    (amount as f64 * (1.0 + rate)) as i64
}
