//! Core domain types for the CBT-I sleep diary.
//!
//! This module defines the records that flow through the engine:
//! - Raw diary answers for one night
//! - Derived nightly sleep metrics and their weekly aggregate
//! - Therapist prescriptions (sleep windows)
//! - Titration recommendations and the concrete window they propose

use crate::clock::WallClock;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Diary Input
// ============================================================================

/// One patient-submitted questionnaire for one night
///
/// Time fields are raw "HH:MM" strings; they are parsed (and may fail) when
/// metrics are computed. Conditional durations are `None` when their
/// governing question was not shown.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiaryAnswers {
    pub time_to_bed: String,
    pub time_try_sleep: String,
    pub fell_asleep_quickly: bool,
    #[serde(default)]
    pub sleep_onset_latency: Option<u32>,
    #[serde(default)]
    pub sleep_onset_latency_out_of_bed: Option<u32>,
    /// Index into the awakening bucket table, not a raw count
    pub awakening_count: u8,
    #[serde(default)]
    pub waso_minutes: Option<u32>,
    #[serde(default)]
    pub waso_out_of_bed_minutes: Option<u32>,
    pub time_final_awakening: String,
    pub woke_early: bool,
    #[serde(default)]
    pub early_morning_awakening_minutes: Option<u32>,
    #[serde(default)]
    pub early_morning_awakening_out_of_bed_minutes: Option<u32>,
    pub time_out_of_bed: String,
    pub quality_rating: u8,
}

// ============================================================================
// Derived Metrics
// ============================================================================

/// Metrics derived from one night's answers. Immutable once computed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SleepMetrics {
    pub sleep_date: NaiveDate,

    pub bed_time: NaiveDateTime,
    pub sleep_attempt_time: NaiveDateTime,
    pub final_awakening_time: NaiveDateTime,
    pub out_of_bed_time: NaiveDateTime,

    pub sleep_onset_latency: u32,
    pub sleep_onset_latency_out_of_bed: u32,
    pub awakenings: u32,
    pub waso_minutes: u32,
    pub waso_out_of_bed_minutes: u32,
    pub early_morning_awakening_minutes: u32,
    pub early_morning_awakening_out_of_bed_minutes: u32,
    pub quality_rating: u8,

    pub time_in_bed: i32,
    pub total_wake_time: u32,
    pub total_wake_time_out_of_bed: u32,
    pub total_sleep_time: u32,
    /// Percentage, 0-100
    pub sleep_efficiency: u32,
}

/// Aggregate over the nights logged in a date range
///
/// Averages are `None` when no night contributed, which is distinct from a
/// measured zero.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeeklyMetrics {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub avg_sleep_efficiency: Option<f64>,
    pub avg_total_sleep_time: Option<f64>,
    pub avg_time_in_bed: Option<f64>,
    pub avg_sol: Option<f64>,
    pub avg_waso: Option<f64>,
    pub days_logged: u32,
}

/// A stored diary night, keyed by (patient, sleep date)
///
/// Corrections are appended as new entries; the latest `recorded_at` wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub patient_id: String,
    pub recorded_at: DateTime<Utc>,
    pub metrics: SleepMetrics,
}

impl DiaryEntry {
    pub fn new(patient_id: impl Into<String>, metrics: SleepMetrics) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            recorded_at: Utc::now(),
            metrics,
        }
    }

    pub fn sleep_date(&self) -> NaiveDate {
        self.metrics.sleep_date
    }
}

// ============================================================================
// Prescription and Titration Types
// ============================================================================

/// A therapist-authored sleep window, versioned by effective date
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prescription {
    pub bedtime: WallClock,
    pub wake_time: WallClock,
    pub window_minutes: u32,
    pub effective_date: NaiveDate,
    pub created_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Titration outcome
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TitrationAction {
    Increase,
    Maintain,
    Decrease,
    Review,
}

impl TitrationAction {
    /// Direction applied to the window length
    pub fn sign(self) -> i32 {
        match self {
            TitrationAction::Increase => 1,
            TitrationAction::Decrease => -1,
            TitrationAction::Maintain | TitrationAction::Review => 0,
        }
    }
}

impl fmt::Display for TitrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TitrationAction::Increase => "increase",
            TitrationAction::Maintain => "maintain",
            TitrationAction::Decrease => "decrease",
            TitrationAction::Review => "review",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(s)
    }
}

/// Recommendation for the therapist; computed per request, never stored
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitrationRecommendation {
    pub action: TitrationAction,
    /// Magnitude of the adjustment (0 or the configured increment)
    pub minutes: u32,
    pub reason: String,
    pub confidence: Confidence,
}

impl TitrationRecommendation {
    /// Adjustment with direction applied
    pub fn signed_minutes(&self) -> i32 {
        self.action.sign() * self.minutes as i32
    }
}

/// Which end of the sleep window stays fixed when it is resized
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// Keep the wake time, move the bedtime
    #[default]
    WakeTime,
    /// Keep the bedtime, move the wake time
    Bedtime,
}

/// A proposed sleep window
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWindow {
    pub bedtime: WallClock,
    pub wake_time: WallClock,
    pub window_minutes: i32,
}
