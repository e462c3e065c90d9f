//! Worth and schedule engine.
//!
//! Worth is a credit model: a target implies a fixed amount per calendar day, each
//! day's amount is split evenly across the tasks active that day, and only completed
//! tasks are credited. Time passing on its own never moves the value.

use crate::model::{DayRecord, Target};
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Amount owed per calendar day to reach `target_amount` by `target_date`.
///
/// Returns zero for targets whose date is not after their creation.
pub fn daily_rate(target: &Target) -> Decimal {
    let span = target.target_date - target.created_at;
    if span <= Duration::ZERO {
        return Decimal::ZERO;
    }

    let span_millis = Decimal::from(span.whole_seconds()) * Decimal::ONE_THOUSAND
        + Decimal::from(span.subsec_milliseconds());
    let span_days = span_millis / Decimal::from(MILLIS_PER_DAY);

    target
        .target_amount
        .saturating_sub(target.start_amount)
        .checked_div(span_days)
        .unwrap_or(Decimal::ZERO)
}

/// Current worth for a history that includes today's partial tally.
///
/// Saturates at the `Decimal` bounds instead of overflowing.
pub fn current_worth(target: &Target, penalty_total: Decimal, history: &[DayRecord]) -> Decimal {
    let rate = daily_rate(target);

    let earned = history
        .iter()
        .filter(|day| day.tasks_total > 0)
        .fold(target.start_amount, |earned, day| {
            let completed = day.tasks_completed.min(day.tasks_total);
            let credit =
                (rate / Decimal::from(day.tasks_total)).saturating_mul(Decimal::from(completed));
            earned.saturating_add(credit)
        });

    earned.saturating_sub(penalty_total)
}

/// Time debt accumulated by missed tasks: each missed task costs its share of a day.
pub fn missed_time(past_history: &[DayRecord]) -> Duration {
    past_history
        .iter()
        .filter(|day| day.tasks_total > 0)
        .fold(Duration::ZERO, |missed, day| {
            missed + Duration::DAY * day.tasks_missed() / day.tasks_total
        })
}

/// Target date pushed back by the missed time of past days.
///
/// `past_history` must not contain today. `None` means the original date stands.
/// A shift past the last representable instant clamps to that instant.
pub fn adjusted_completion_date(
    target: &Target,
    past_history: &[DayRecord],
) -> Option<OffsetDateTime> {
    let missed = missed_time(past_history);
    if missed <= Duration::ZERO {
        return None;
    }

    Some(
        target
            .target_date
            .checked_add(missed)
            .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc()),
    )
}
