//! Weekly aggregation of nightly metrics.

use crate::{SleepMetrics, WeeklyMetrics};
use chrono::{Duration, NaiveDate};

/// Mean of the contributing values, or `None` if nothing contributed
fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Reduce the nights with `start <= sleep_date <= end` into a summary
///
/// The caller supplies already-fetched nights; nights outside the range are
/// ignored. `days_logged` counts the nights in range.
pub fn aggregate(nights: &[SleepMetrics], start: NaiveDate, end: NaiveDate) -> WeeklyMetrics {
    let in_range: Vec<&SleepMetrics> = nights
        .iter()
        .filter(|m| m.sleep_date >= start && m.sleep_date <= end)
        .collect();

    let field = |f: fn(&SleepMetrics) -> Option<f64>| mean(in_range.iter().map(|m| f(m)));

    let summary = WeeklyMetrics {
        start,
        end,
        avg_sleep_efficiency: field(|m| Some(f64::from(m.sleep_efficiency))),
        avg_total_sleep_time: field(|m| Some(f64::from(m.total_sleep_time))),
        avg_time_in_bed: field(|m| Some(f64::from(m.time_in_bed))),
        avg_sol: field(|m| Some(f64::from(m.sleep_onset_latency))),
        avg_waso: field(|m| Some(f64::from(m.waso_minutes))),
        days_logged: in_range.len() as u32,
    };

    tracing::debug!(
        "Aggregated {} nights for {}..={}: SE={:?}",
        summary.days_logged,
        start,
        end,
        summary.avg_sleep_efficiency
    );

    summary
}

/// The `window_days`-long window ending on `end` (inclusive)
pub fn window_ending(end: NaiveDate, window_days: u32) -> (NaiveDate, NaiveDate) {
    let span = i64::from(window_days.max(1)) - 1;
    (end - Duration::days(span), end)
}

/// Consecutive non-overlapping windows ending on `end`, oldest first
pub fn rolling_weeks(
    nights: &[SleepMetrics],
    end: NaiveDate,
    weeks: u32,
    window_days: u32,
) -> Vec<WeeklyMetrics> {
    let step = Duration::days(i64::from(window_days.max(1)));
    let mut summaries: Vec<WeeklyMetrics> = (0..weeks)
        .map(|i| {
            let (start, end) = window_ending(end - step * i as i32, window_days);
            aggregate(nights, start, end)
        })
        .collect();
    summaries.reverse();
    summaries
}
