//! Cross-field consistency checks for diary entries.
//!
//! Every rule is evaluated and every failure reported, so a client can show
//! all problems at once. Only unparseable input is an `Err`; rule failures
//! are values in the report.

use crate::clock::DayBoundaryPolicy;
use crate::metrics::{anchor_times, resolved_early_awakening, time_in_bed_minutes};
use crate::questions::{self, MAX_DURATION_MINUTES};
use crate::{DiaryAnswers, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on time in bed; anything longer spans more than one night
pub const MAX_TIME_IN_BED_MINUTES: i64 = 1440;

/// A single violated rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    SleepAttemptBeforeBed,
    WakeNotAfterSleepAttempt,
    OutOfBedBeforeWake,
    TimeInBedOutOfRange { minutes: i64 },
    DurationOutOfRange { field: String, minutes: u32 },
    SolOutOfBedExceedsSol { out_of_bed: u32, total: u32 },
    WasoOutOfBedExceedsWaso { out_of_bed: u32, total: u32 },
    EmaOutOfBedExceedsEma { out_of_bed: u32, total: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SleepAttemptBeforeBed => {
                write!(f, "Time you tried to sleep cannot be before the time you went to bed")
            }
            Violation::WakeNotAfterSleepAttempt => {
                write!(f, "Wake time must be after sleep time")
            }
            Violation::OutOfBedBeforeWake => {
                write!(f, "Time out of bed cannot be before your final awakening")
            }
            Violation::TimeInBedOutOfRange { minutes } => write!(
                f,
                "Time in bed must be between 1 and {} minutes, got {}",
                MAX_TIME_IN_BED_MINUTES, minutes
            ),
            Violation::DurationOutOfRange { field, minutes } => write!(
                f,
                "{} must be between 0 and {} minutes, got {}",
                field, MAX_DURATION_MINUTES, minutes
            ),
            Violation::SolOutOfBedExceedsSol { out_of_bed, total } => write!(
                f,
                "Time out of bed while falling asleep ({} min) cannot exceed time to fall asleep ({} min)",
                out_of_bed, total
            ),
            Violation::WasoOutOfBedExceedsWaso { out_of_bed, total } => write!(
                f,
                "Time out of bed during the night ({} min) cannot exceed time awake during the night ({} min)",
                out_of_bed, total
            ),
            Violation::EmaOutOfBedExceedsEma { out_of_bed, total } => write!(
                f,
                "Time out of bed after waking early ({} min) cannot exceed time awake early ({} min)",
                out_of_bed, total
            ),
        }
    }
}

/// Outcome of validating one entry
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Run every consistency rule against one night's answers
pub fn validate_entry(
    answers: &DiaryAnswers,
    sleep_date: NaiveDate,
    policy: &DayBoundaryPolicy,
) -> Result<ValidationReport> {
    let times = anchor_times(answers, sleep_date, policy)?;
    let mut violations = Vec::new();

    if times.sleep_attempt_time < times.bed_time {
        violations.push(Violation::SleepAttemptBeforeBed);
    }
    if times.final_awakening_time <= times.sleep_attempt_time {
        violations.push(Violation::WakeNotAfterSleepAttempt);
    }
    if times.out_of_bed_time < times.final_awakening_time {
        violations.push(Violation::OutOfBedBeforeWake);
    }

    let (ema, ema_out) = resolved_early_awakening(answers)?;
    let time_in_bed = time_in_bed_minutes(&times, ema);
    if time_in_bed <= 0 || time_in_bed > MAX_TIME_IN_BED_MINUTES {
        violations.push(Violation::TimeInBedOutOfRange {
            minutes: time_in_bed,
        });
    }

    let durations = [
        (
            !answers.fell_asleep_quickly,
            [
                (questions::SLEEP_ONSET_LATENCY, answers.sleep_onset_latency),
                (questions::SLEEP_ONSET_LATENCY_OUT_OF_BED, answers.sleep_onset_latency_out_of_bed),
            ],
        ),
        (
            answers.awakening_count > 0,
            [
                (questions::WASO_MINUTES, answers.waso_minutes),
                (questions::WASO_OUT_OF_BED_MINUTES, answers.waso_out_of_bed_minutes),
            ],
        ),
        (
            answers.woke_early,
            [
                (questions::EMA_MINUTES, answers.early_morning_awakening_minutes),
                (questions::EMA_OUT_OF_BED_MINUTES, answers.early_morning_awakening_out_of_bed_minutes),
            ],
        ),
    ];
    for (shown, fields) in durations {
        if !shown {
            continue;
        }
        for (field, value) in fields {
            match value {
                Some(minutes) if minutes > MAX_DURATION_MINUTES => {
                    violations.push(Violation::DurationOutOfRange {
                        field: field.to_string(),
                        minutes,
                    });
                }
                _ => {}
            }
        }
    }

    if !answers.fell_asleep_quickly {
        if let (Some(total), Some(out_of_bed)) = (
            answers.sleep_onset_latency,
            answers.sleep_onset_latency_out_of_bed,
        ) {
            if out_of_bed > total {
                violations.push(Violation::SolOutOfBedExceedsSol { out_of_bed, total });
            }
        }
    }

    if answers.awakening_count > 0 {
        if let (Some(total), Some(out_of_bed)) =
            (answers.waso_minutes, answers.waso_out_of_bed_minutes)
        {
            if out_of_bed > total {
                violations.push(Violation::WasoOutOfBedExceedsWaso { out_of_bed, total });
            }
        }
    }

    if answers.woke_early && ema_out > ema {
        violations.push(Violation::EmaOutOfBedExceedsEma {
            out_of_bed: ema_out,
            total: ema,
        });
    }

    for violation in &violations {
        tracing::debug!("Diary entry for {} violates: {}", sleep_date, violation);
    }

    Ok(ValidationReport { violations })
}
