//! Diary history loading for a patient and date range.
//!
//! Resolves corrections (the most recently recorded entry for a night wins)
//! and hands the aggregator a complete, already-fetched set of nights.

use crate::{DiaryEntry, Result, SleepMetrics};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

/// Keep only the latest-recorded entry per (patient, sleep date)
///
/// Returns entries sorted by patient then sleep date.
pub fn latest_per_night(entries: Vec<DiaryEntry>) -> Vec<DiaryEntry> {
    let mut latest: BTreeMap<(String, NaiveDate), DiaryEntry> = BTreeMap::new();

    for entry in entries {
        let key = (entry.patient_id.clone(), entry.sleep_date());
        let superseded = latest
            .get(&key)
            .map_or(false, |existing| existing.recorded_at > entry.recorded_at);

        if superseded {
            tracing::debug!("Ignoring superseded entry {} for {:?}", entry.id, key);
        } else {
            latest.insert(key, entry);
        }
    }

    latest.into_values().collect()
}

/// A patient's nights with `start <= sleep_date <= end`, oldest first
pub fn nights_in_range(
    entries: &[DiaryEntry],
    patient_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<SleepMetrics> {
    let relevant: Vec<DiaryEntry> = entries
        .iter()
        .filter(|e| e.patient_id == patient_id)
        .filter(|e| e.sleep_date() >= start && e.sleep_date() <= end)
        .cloned()
        .collect();

    latest_per_night(relevant)
        .into_iter()
        .map(|e| e.metrics)
        .collect()
}

/// Load a patient's nights in a date range from the journal
pub fn load_nights(
    journal_path: &Path,
    patient_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<SleepMetrics>> {
    let entries = crate::journal::read_entries(journal_path)?;
    let nights = nights_in_range(&entries, patient_id, start, end);

    tracing::info!(
        "Loaded {} nights for {} between {} and {}",
        nights.len(),
        patient_id,
        start,
        end
    );

    Ok(nights)
}
