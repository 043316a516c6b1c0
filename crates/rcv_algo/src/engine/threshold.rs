//! Winning threshold formulas.

use rcv_core::{ContestRules, Decimal, RoundingMode};

/// Threshold for a round with `active` votes.
///
/// * Droop: `floor(active / (n + 1)) + unit`
/// * Hare: `ceil(active / n)`
/// * bottoms-up percentage: `active × pct`, exact
///
/// Flooring and ceiling happen at the configured decimal places when
/// non-integer thresholds are enabled, otherwise at whole votes. The result
/// is never below the minimum vote threshold.
pub fn winning_threshold(rules: &ContestRules, active: &Decimal) -> Decimal {
    let places = if rules.non_integer_winning_threshold {
        rules.decimal_places_for_vote_arithmetic
    } else {
        0
    };
    let threshold = match rules.bottoms_up_percentage() {
        Some(pct) => active * pct,
        None => {
            let seats = Decimal::from(rules.number_of_winners.max(1));
            if rules.hare_quota {
                active.checked_div(&seats, places, RoundingMode::Up).unwrap_or_default()
            } else {
                let divisor = &seats + &Decimal::one();
                let floor = active.checked_div(&divisor, places, RoundingMode::Down).unwrap_or_default();
                &floor + &Decimal::unit(places)
            }
        }
    };
    threshold.max(rules.minimum_vote_threshold.clone())
}
