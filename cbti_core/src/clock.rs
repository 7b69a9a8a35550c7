//! Wall-clock arithmetic and day-boundary anchoring.
//!
//! Diary times are entered as "HH:MM" with no date. This module turns them
//! into absolute instants relative to the night's sleep date, and provides
//! the modular (1440-minute) arithmetic the titration engine uses to shift
//! bedtimes and wake times across midnight.

use crate::{Error, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minutes in one wall-clock day
pub const MINUTES_PER_DAY: i32 = 1440;

/// A time of day with minute resolution, serialized as "HH:MM"
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallClock {
    minutes: u16,
}

impl WallClock {
    /// Build from hour and minute, rejecting out-of-range components
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::TimeFormat(format!("{}:{}", hour, minute)));
        }
        Ok(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Build from any minute offset, wrapping modulo one day
    pub fn from_minutes(minutes: i32) -> Self {
        Self {
            minutes: minutes.rem_euclid(MINUTES_PER_DAY) as u16,
        }
    }

    /// Parse "HH:MM" (24-hour)
    pub fn parse(s: &str) -> Result<Self> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| Error::TimeFormat(s.to_string()))?;
        Self::new(time.hour(), time.minute())
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes) / 60
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes) % 60
    }

    pub fn minutes_since_midnight(self) -> i32 {
        i32::from(self.minutes)
    }

    /// Shift by a signed number of minutes, wrapping around midnight
    pub fn shift(self, delta_minutes: i32) -> Self {
        Self::from_minutes(self.minutes_since_midnight() + delta_minutes)
    }

    /// Forward distance to `later`, treating an earlier clock value as the next day
    pub fn minutes_until(self, later: WallClock) -> i32 {
        (later.minutes_since_midnight() - self.minutes_since_midnight()).rem_euclid(MINUTES_PER_DAY)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for WallClock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WallClock {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<WallClock> for String {
    fn from(clock: WallClock) -> Self {
        clock.to_string()
    }
}

// ============================================================================
// Day-boundary anchoring
// ============================================================================

/// The four diary time fields that need a calendar anchor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeField {
    ToBed,
    TrySleep,
    FinalAwakening,
    OutOfBed,
}

/// How a wall-clock value is placed relative to the sleep date
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRule {
    /// Hours before the policy's rollover hour land on the next day
    EarlyHoursNextDay,
    /// Always the sleep date
    SameDay,
    /// Always the day after the sleep date
    NextDay,
}

/// Per-field anchoring rules
///
/// The default applies the before-noon rule to all four fields. Schedules
/// that break it (night-shift workers going to bed at 11:00) should override
/// the relevant fields rather than change the rule for everyone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayBoundaryPolicy {
    #[serde(default = "default_rule")]
    pub time_to_bed: AnchorRule,

    #[serde(default = "default_rule")]
    pub time_try_sleep: AnchorRule,

    #[serde(default = "default_rule")]
    pub time_final_awakening: AnchorRule,

    #[serde(default = "default_rule")]
    pub time_out_of_bed: AnchorRule,

    #[serde(default = "default_rollover_hour")]
    pub rollover_hour: u32,
}

fn default_rule() -> AnchorRule {
    AnchorRule::EarlyHoursNextDay
}

fn default_rollover_hour() -> u32 {
    12
}

impl Default for DayBoundaryPolicy {
    fn default() -> Self {
        Self {
            time_to_bed: default_rule(),
            time_try_sleep: default_rule(),
            time_final_awakening: default_rule(),
            time_out_of_bed: default_rule(),
            rollover_hour: default_rollover_hour(),
        }
    }
}

impl DayBoundaryPolicy {
    pub fn rule_for(&self, field: TimeField) -> AnchorRule {
        match field {
            TimeField::ToBed => self.time_to_bed,
            TimeField::TrySleep => self.time_try_sleep,
            TimeField::FinalAwakening => self.time_final_awakening,
            TimeField::OutOfBed => self.time_out_of_bed,
        }
    }

    /// Day delta (0 or 1) from the sleep date for this field's value
    pub fn day_offset(&self, field: TimeField, clock: WallClock) -> i64 {
        match self.rule_for(field) {
            AnchorRule::EarlyHoursNextDay => i64::from(clock.hour() < self.rollover_hour),
            AnchorRule::SameDay => 0,
            AnchorRule::NextDay => 1,
        }
    }

    /// Resolve a wall-clock value to an absolute instant
    pub fn resolve(&self, field: TimeField, sleep_date: NaiveDate, clock: WallClock) -> NaiveDateTime {
        sleep_date.and_time(clock.to_naive_time()) + Duration::days(self.day_offset(field, clock))
    }
}

/// Whole minutes from `start` to `end`, rounded to the nearest minute
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let seconds = (end - start).num_seconds();
    (seconds as f64 / 60.0).round() as i64
}
