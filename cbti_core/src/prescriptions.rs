//! Versioned sleep-window prescriptions with file locking.
//!
//! Each patient has an append-only list of prescriptions ordered by
//! effective date. The one in force on a date is the latest version whose
//! effective date is on or before it.

use crate::clock::WallClock;
use crate::{Error, NewWindow, Prescription, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

impl Prescription {
    /// Create a prescription; the window length wraps past midnight
    ///
    /// Equal bedtime and wake time give an empty window and are rejected.
    pub fn new(
        bedtime: WallClock,
        wake_time: WallClock,
        effective_date: NaiveDate,
        created_by: impl Into<String>,
        notes: Option<String>,
    ) -> Result<Self> {
        let window_minutes = bedtime.minutes_until(wake_time);
        if window_minutes == 0 {
            return Err(Error::Prescription(format!(
                "bedtime {} and wake time {} leave no sleep window",
                bedtime, wake_time
            )));
        }

        Ok(Self {
            bedtime,
            wake_time,
            window_minutes: window_minutes as u32,
            effective_date,
            created_by: created_by.into(),
            notes,
        })
    }

    /// Next version of this prescription from an accepted window
    pub fn revise(
        &self,
        window: &NewWindow,
        effective_date: NaiveDate,
        created_by: impl Into<String>,
        notes: Option<String>,
    ) -> Result<Self> {
        if window.window_minutes <= 0 {
            return Err(Error::Prescription(format!(
                "window of {} minutes is not a valid sleep window",
                window.window_minutes
            )));
        }
        if effective_date < self.effective_date {
            return Err(Error::Prescription(format!(
                "revision effective {} predates current prescription ({})",
                effective_date, self.effective_date
            )));
        }

        Ok(Self {
            bedtime: window.bedtime,
            wake_time: window.wake_time,
            window_minutes: window.window_minutes as u32,
            effective_date,
            created_by: created_by.into(),
            notes,
        })
    }
}

/// Every patient's prescription history
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PrescriptionBook {
    pub patients: BTreeMap<String, Vec<Prescription>>,
}

impl PrescriptionBook {
    /// All versions for a patient, oldest first
    pub fn history(&self, patient_id: &str) -> &[Prescription] {
        self.patients
            .get(patient_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The prescription in force on `date`
    pub fn active_on(&self, patient_id: &str, date: NaiveDate) -> Option<&Prescription> {
        self.history(patient_id)
            .iter()
            .rev()
            .find(|p| p.effective_date <= date)
    }

    /// Append a new version; versions may not go back in time
    pub fn append(&mut self, patient_id: &str, prescription: Prescription) -> Result<()> {
        let history = self.patients.entry(patient_id.to_string()).or_default();

        if let Some(latest) = history.last() {
            if prescription.effective_date < latest.effective_date {
                return Err(Error::Prescription(format!(
                    "prescription effective {} is older than the latest one ({}) for {}",
                    prescription.effective_date, latest.effective_date, patient_id
                )));
            }
        }

        tracing::info!(
            "Prescribed {}-{} ({} min) for {} from {}",
            prescription.bedtime,
            prescription.wake_time,
            prescription.window_minutes,
            patient_id,
            prescription.effective_date
        );
        history.push(prescription);
        Ok(())
    }

    /// Load the book from a file with shared locking
    ///
    /// A missing file is an empty book. A corrupt file is an error rather
    /// than an empty book, so a later save cannot erase the history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No prescription file at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let book: PrescriptionBook = serde_json::from_str(&contents).map_err(|e| {
            tracing::warn!("Failed to parse prescription file {:?}: {}", path, e);
            Error::Json(e)
        })?;

        tracing::debug!("Loaded prescriptions from {:?}", path);
        Ok(book)
    }

    /// Save the book with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other("prescription path missing parent".into()))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved prescriptions to {:?}", path);
        Ok(())
    }

    /// Load, modify and save back
    ///
    /// The whole read-modify-write holds an exclusive lock on a sidecar
    /// `<path>.lock` file, so concurrent updates are serialized rather than
    /// overwriting each other.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut PrescriptionBook) -> Result<()>,
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        lock.lock_exclusive()?;

        let result = Self::load(path).and_then(|mut book| {
            f(&mut book)?;
            book.save(path)?;
            Ok(book)
        });

        lock.unlock()?;
        result
    }
}

/// Sidecar file guarding read-modify-write of the book at `path`
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn clock(s: &str) -> WallClock {
        WallClock::parse(s).unwrap()
    }

    fn rx(bed: &str, wake: &str, day: u32) -> Prescription {
        Prescription::new(clock(bed), clock(wake), date(day), "dr_lee", None).unwrap()
    }

    #[test]
    fn test_window_wraps_overnight() {
        assert_eq!(rx("23:45", "06:00", 1).window_minutes, 375);
        assert_eq!(rx("01:00", "06:00", 1).window_minutes, 300);
    }

    #[test]
    fn test_empty_window_rejected() {
        let err = Prescription::new(clock("06:00"), clock("06:00"), date(1), "dr_lee", None).unwrap_err();
        assert!(matches!(err, Error::Prescription(_)));
    }

    #[test]
    fn test_concurrent_updates_keep_every_patient() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prescriptions.json");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    PrescriptionBook::update(&path, |book| {
                        book.append(&format!("p{}", i), rx("23:30", "06:00", 1))
                    })
                    .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let book = PrescriptionBook::load(&path).unwrap();
        assert_eq!(book.patients.len(), 8);
        for i in 0..8 {
            assert_eq!(book.history(&format!("p{}", i)).len(), 1);
        }
    }

    #[test]
    fn test_active_on_picks_latest_effective() {
        let mut book = PrescriptionBook::default();
        book.append("p1", rx("00:00", "06:00", 1)).unwrap();
        book.append("p1", rx("23:45", "06:00", 8)).unwrap();
        book.append("p1", rx("23:30", "06:00", 15)).unwrap();

        assert!(book.active_on("p1", NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()).is_none());
        assert_eq!(book.active_on("p1", date(1)).unwrap().window_minutes, 360);
        assert_eq!(book.active_on("p1", date(14)).unwrap().window_minutes, 375);
        assert_eq!(book.active_on("p1", date(20)).unwrap().window_minutes, 390);
        assert!(book.active_on("p2", date(20)).is_none());
    }

    #[test]
    fn test_append_rejects_backdated_version() {
        let mut book = PrescriptionBook::default();
        book.append("p1", rx("00:00", "06:00", 8)).unwrap();
        let err = book.append("p1", rx("23:45", "06:00", 2)).unwrap_err();
        assert!(matches!(err, Error::Prescription(_)));
        assert_eq!(book.history("p1").len(), 1);
    }

    #[test]
    fn test_revise_from_window() {
        let current = rx("23:45", "06:00", 1);
        let window = NewWindow {
            bedtime: clock("23:30"),
            wake_time: clock("06:00"),
            window_minutes: 390,
        };
        let next = current.revise(&window, date(8), "dr_lee", Some("SE 92%".into())).unwrap();
        assert_eq!(next.window_minutes, 390);
        assert_eq!(next.effective_date, date(8));

        let bad = NewWindow {
            window_minutes: 0,
            ..window
        };
        assert!(current.revise(&bad, date(8), "dr_lee", None).is_err());
        assert!(current.revise(&window, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), "dr_lee", None).is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prescriptions.json");

        let mut book = PrescriptionBook::default();
        book.append("p1", rx("23:45", "06:00", 1)).unwrap();
        book.save(&path).unwrap();

        let loaded = PrescriptionBook::load(&path).unwrap();
        assert_eq!(loaded.history("p1"), book.history("p1"));
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let book = PrescriptionBook::load(&temp_dir.path().join("none.json")).unwrap();
        assert!(book.patients.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prescriptions.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(PrescriptionBook::load(&path), Err(Error::Json(_))));
    }

    #[test]
    fn test_update_pattern_and_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prescriptions.json");

        PrescriptionBook::update(&path, |book| book.append("p1", rx("23:00", "06:00", 1))).unwrap();
        PrescriptionBook::update(&path, |book| book.append("p1", rx("23:15", "06:00", 8))).unwrap();

        let loaded = PrescriptionBook::load(&path).unwrap();
        assert_eq!(loaded.history("p1").len(), 2);

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "prescriptions.json")
            .filter(|e| e.file_name() != "prescriptions.json.lock")
            .collect();
        assert!(extras.is_empty(), "stray temp files: {:?}", extras);
    }
}
