//! Nightly sleep metric calculation.
//!
//! Turns one night's validated diary answers into anchored instants and the
//! standard CBT-I quantities:
//!
//! - TIB = (final awakening - sleep attempt) + early-morning-awakening minutes
//! - TWT = SOL + WASO + EMA
//! - TST = max(0, TIB - TWT)
//! - SE  = round(100 * TST / TIB), or 0 when TIB is not positive

use crate::clock::{minutes_between, DayBoundaryPolicy, TimeField, WallClock};
use crate::questions::awakenings_for_bucket;
use crate::validation::validate_entry;
use crate::{DiaryAnswers, Error, Result, SleepMetrics};
use chrono::NaiveDate;

/// Conventional SOL recorded when the patient reports falling asleep quickly
pub const QUICK_ONSET_SOL_MINUTES: u32 = 5;

/// The four diary times resolved against a sleep date
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnchoredTimes {
    pub bed_time: chrono::NaiveDateTime,
    pub sleep_attempt_time: chrono::NaiveDateTime,
    pub final_awakening_time: chrono::NaiveDateTime,
    pub out_of_bed_time: chrono::NaiveDateTime,
}

/// Parse and anchor the four diary times
///
/// Malformed "HH:MM" values fail with `Error::TimeFormat`.
pub fn anchor_times(
    answers: &DiaryAnswers,
    sleep_date: NaiveDate,
    policy: &DayBoundaryPolicy,
) -> Result<AnchoredTimes> {
    let resolve = |field: TimeField, raw: &str| -> Result<chrono::NaiveDateTime> {
        let clock = WallClock::parse(raw)?;
        Ok(policy.resolve(field, sleep_date, clock))
    };

    Ok(AnchoredTimes {
        bed_time: resolve(TimeField::ToBed, &answers.time_to_bed)?,
        sleep_attempt_time: resolve(TimeField::TrySleep, &answers.time_try_sleep)?,
        final_awakening_time: resolve(TimeField::FinalAwakening, &answers.time_final_awakening)?,
        out_of_bed_time: resolve(TimeField::OutOfBed, &answers.time_out_of_bed)?,
    })
}

/// Time in bed in whole minutes, as used by both the calculator and validator
pub fn time_in_bed_minutes(times: &AnchoredTimes, early_morning_awakening: u32) -> i64 {
    minutes_between(times.sleep_attempt_time, times.final_awakening_time)
        + i64::from(early_morning_awakening)
}

/// Resolved EMA minutes: zero unless the patient woke early
pub fn resolved_early_awakening(answers: &DiaryAnswers) -> Result<(u32, u32)> {
    if !answers.woke_early {
        return Ok((0, 0));
    }
    let minutes = answers
        .early_morning_awakening_minutes
        .ok_or_else(|| Error::MissingAnswer("earlyMorningAwakeningMinutes".into()))?;
    Ok((
        minutes,
        answers.early_morning_awakening_out_of_bed_minutes.unwrap_or(0),
    ))
}

/// Compute metrics for one night
///
/// Assumes the entry validator has already accepted the answers; use
/// [`record_night`] to do both.
pub fn compute_metrics(
    answers: &DiaryAnswers,
    sleep_date: NaiveDate,
    policy: &DayBoundaryPolicy,
) -> Result<SleepMetrics> {
    let times = anchor_times(answers, sleep_date, policy)?;

    let (sol, sol_out) = if answers.fell_asleep_quickly {
        (QUICK_ONSET_SOL_MINUTES, 0)
    } else {
        let sol = answers
            .sleep_onset_latency
            .ok_or_else(|| Error::MissingAnswer("sleepOnsetLatency".into()))?;
        (sol, answers.sleep_onset_latency_out_of_bed.unwrap_or(0))
    };

    let awakenings = awakenings_for_bucket(answers.awakening_count).ok_or_else(|| {
        Error::Other(format!(
            "Unknown awakening bucket {}",
            answers.awakening_count
        ))
    })?;

    // WASO is only meaningful when the patient woke at all
    let (waso, waso_out) = if awakenings == 0 {
        (0, 0)
    } else {
        let waso = answers
            .waso_minutes
            .ok_or_else(|| Error::MissingAnswer("wasoMinutes".into()))?;
        (waso, answers.waso_out_of_bed_minutes.unwrap_or(0))
    };

    let (ema, ema_out) = resolved_early_awakening(answers)?;

    let overflow = |what: &str| Error::Other(format!("{} overflows for {}", what, sleep_date));
    let time_in_bed = time_in_bed_minutes(&times, ema);
    let total_wake_time = sol
        .checked_add(waso)
        .and_then(|sum| sum.checked_add(ema))
        .ok_or_else(|| overflow("total wake time"))?;
    let total_wake_time_out_of_bed = sol_out
        .checked_add(waso_out)
        .and_then(|sum| sum.checked_add(ema_out))
        .ok_or_else(|| overflow("out-of-bed wake time"))?;
    let total_sleep_time = (time_in_bed - i64::from(total_wake_time)).max(0);
    let sleep_efficiency = if time_in_bed > 0 {
        (100.0 * total_sleep_time as f64 / time_in_bed as f64).round() as u32
    } else {
        0
    };

    tracing::debug!(
        "Computed metrics for {}: TIB={} TWT={} TST={} SE={}%",
        sleep_date,
        time_in_bed,
        total_wake_time,
        total_sleep_time,
        sleep_efficiency
    );

    Ok(SleepMetrics {
        sleep_date,
        bed_time: times.bed_time,
        sleep_attempt_time: times.sleep_attempt_time,
        final_awakening_time: times.final_awakening_time,
        out_of_bed_time: times.out_of_bed_time,
        sleep_onset_latency: sol,
        sleep_onset_latency_out_of_bed: sol_out,
        awakenings,
        waso_minutes: waso,
        waso_out_of_bed_minutes: waso_out,
        early_morning_awakening_minutes: ema,
        early_morning_awakening_out_of_bed_minutes: ema_out,
        quality_rating: answers.quality_rating,
        time_in_bed: i32::try_from(time_in_bed).map_err(|_| overflow("time in bed"))?,
        total_wake_time,
        total_wake_time_out_of_bed,
        total_sleep_time: total_sleep_time as u32,
        sleep_efficiency,
    })
}

/// Validate, then compute. Any violation rejects the whole entry.
pub fn record_night(
    answers: &DiaryAnswers,
    sleep_date: NaiveDate,
    policy: &DayBoundaryPolicy,
) -> Result<SleepMetrics> {
    let report = validate_entry(answers, sleep_date, policy)?;
    if !report.is_valid() {
        tracing::warn!(
            "Rejected diary entry for {}: {} violation(s)",
            sleep_date,
            report.violations.len()
        );
        return Err(Error::Rejected(report));
    }
    compute_metrics(answers, sleep_date, policy)
}
