//! Integration tests for the cbti binary.
//!
//! These tests verify end-to-end behavior including:
//! - Logging nights from a file and from stdin prompts
//! - Rejection of inconsistent entries
//! - Weekly summaries
//! - Prescriptions and titration recommendations

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test data directory with an empty config
fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("config.toml"), "").expect("Failed to write config");
    dir
}

/// Helper to get the CLI pointed at a test directory
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cbti").expect("Failed to find cbti binary");
    cmd.arg("--data-dir")
        .arg(dir)
        .arg("--config")
        .arg(dir.join("config.toml"));
    cmd
}

fn good_night() -> Value {
    json!({
        "timeToBed": "22:00",
        "timeTrySleep": "22:15",
        "fellAsleepQuickly": true,
        "awakeningCount": 0,
        "timeFinalAwakening": "06:30",
        "wokeEarly": false,
        "timeOutOfBed": "06:40",
        "qualityRating": 4
    })
}

/// Two hours to fall asleep: SE 76%
fn poor_night() -> Value {
    json!({
        "timeToBed": "22:00",
        "timeTrySleep": "22:15",
        "fellAsleepQuickly": false,
        "sleepOnsetLatency": 120,
        "sleepOnsetLatencyOutOfBed": 30,
        "awakeningCount": 0,
        "timeFinalAwakening": "06:30",
        "wokeEarly": false,
        "timeOutOfBed": "06:40",
        "qualityRating": 2
    })
}

fn write_answers(dir: &Path, name: &str, answers: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, answers.to_string()).expect("Failed to write answers");
    path
}

fn log_night(dir: &Path, patient: &str, date: &str, answers: &Path) {
    cli(dir)
        .args(["log", "--patient", patient, "--date", date, "--answers"])
        .arg(answers)
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("cbti").expect("Failed to find cbti binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("CBT-I sleep diary"));
}

#[test]
fn test_questions_listed() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("questions")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeToBed"))
        .stdout(predicate::str::contains("qualityRating"));
}

#[test]
fn test_log_from_file() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let answers = write_answers(dir, "night.json", &good_night());

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10", "--answers"])
        .arg(&answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("Time in bed:       495 min"))
        .stdout(predicate::str::contains("Sleep efficiency:  99%"))
        .stdout(predicate::str::contains("Night logged"));

    let journal = fs::read_to_string(dir.join("diary.jsonl")).expect("Failed to read journal");
    assert_eq!(journal.lines().count(), 1);
    let entry: Value = serde_json::from_str(journal.lines().next().unwrap()).unwrap();
    assert_eq!(entry["patient_id"], "p1");
    assert_eq!(entry["metrics"]["total_sleep_time"], 490);
}

#[test]
fn test_dry_run_does_not_log() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let answers = write_answers(dir, "night.json", &good_night());

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10", "--dry-run", "--answers"])
        .arg(&answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert!(!dir.join("diary.jsonl").exists());
}

#[test]
fn test_inconsistent_entry_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let mut night = good_night();
    night["timeTrySleep"] = json!("23:00");
    night["timeFinalAwakening"] = json!("22:30");
    night["timeOutOfBed"] = json!("22:45");
    let answers = write_answers(dir, "bad.json", &night);

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10", "--answers"])
        .arg(&answers)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wake time must be after sleep time"));

    assert!(!dir.join("diary.jsonl").exists());
}

#[test]
fn test_out_of_range_answer_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let mut night = good_night();
    night["qualityRating"] = json!(9);
    let answers = write_answers(dir, "bad.json", &night);

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10", "--answers"])
        .arg(&answers)
        .assert()
        .failure()
        .stderr(predicate::str::contains("qualityRating must be between 1 and 5"));
}

#[test]
fn test_malformed_time_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    let mut night = good_night();
    night["timeToBed"] = json!("10pm");
    let answers = write_answers(dir, "bad.json", &night);

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10", "--answers"])
        .arg(&answers)
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeToBed must be a time as HH:MM"));
}

#[test]
fn test_interactive_log() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    // Quick onset, no awakenings and no early waking skip six follow-ups
    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10"])
        .write_stdin("22:00\n22:15\ny\n0\n06:30\nn\n06:40\n4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("How many times did you wake up"))
        .stdout(predicate::str::contains("How long did it take you to fall asleep").not())
        .stdout(predicate::str::contains("Sleep efficiency:  99%"));

    assert!(dir.join("diary.jsonl").exists());
}

#[test]
fn test_interactive_log_reprompts_bad_input() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10", "--dry-run"])
        .write_stdin("25:00\n22:00\n22:15\nmaybe\ny\n0\n06:30\nn\n06:40\n4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeToBed must be a time as HH:MM"))
        .stdout(predicate::str::contains("answer y or n"))
        .stdout(predicate::str::contains("Sleep efficiency:  99%"));
}

#[test]
fn test_interactive_log_incomplete_input_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["log", "--patient", "p1", "--date", "2024-03-10"])
        .write_stdin("22:00\n22:15\n")
        .assert()
        .failure();

    assert!(!dir.join("diary.jsonl").exists());
}

#[test]
fn test_week_summary() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    let good = write_answers(dir, "good.json", &good_night());

    for date in ["2024-03-04", "2024-03-05", "2024-03-06"] {
        log_night(dir, "p1", date, &good);
    }
    // Another patient's night is not counted
    log_night(dir, "p2", "2024-03-05", &good);

    cli(dir)
        .args(["week", "--patient", "p1", "--end", "2024-03-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-04 .. 2024-03-10  (3 nights logged)"))
        .stdout(predicate::str::contains("Sleep efficiency:  99.0%"));
}

#[test]
fn test_week_without_data_shows_no_averages() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["week", "--patient", "p1", "--end", "2024-03-10", "--weeks", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-02-26 .. 2024-03-03  (0 nights logged)"))
        .stdout(predicate::str::contains("Sleep efficiency:  n/a"));
}

#[test]
fn test_recommend_requires_prescription() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["recommend", "--patient", "p1", "--end", "2024-03-10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no prescription in force"));
}

#[test]
fn test_recommend_and_accept_decrease() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args([
            "prescribe", "--patient", "p1", "--bedtime", "00:30", "--wake", "06:00",
            "--effective", "2024-03-01", "--by", "dr_lee",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("00:30 - 06:00 (330 min)"));

    let poor = write_answers(dir, "poor.json", &poor_night());
    for day in 4..=9 {
        log_night(dir, "p1", &format!("2024-03-{:02}", day), &poor);
    }

    cli(dir)
        .args(["recommend", "--patient", "p1", "--end", "2024-03-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("decrease 15 min (high confidence)"))
        .stdout(predicate::str::contains("below 80%"))
        .stdout(predicate::str::contains("Proposed window: 00:45 - 06:00 (315 min)"));

    cli(dir)
        .args([
            "recommend", "--patient", "p1", "--end", "2024-03-10", "--accept", "--by", "dr_lee",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("effective 2024-03-11"));

    let book: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("prescriptions.json")).unwrap()).unwrap();
    let history = book["patients"]["p1"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["bedtime"], "00:45");
    assert_eq!(history[1]["window_minutes"], 315);
}

#[test]
fn test_recommend_with_sparse_data_keeps_window() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args([
            "prescribe", "--patient", "p1", "--bedtime", "23:45", "--wake", "06:00",
            "--effective", "2024-03-01", "--by", "dr_lee",
        ])
        .assert()
        .success();

    let good = write_answers(dir, "good.json", &good_night());
    log_night(dir, "p1", "2024-03-08", &good);

    cli(dir)
        .args([
            "recommend", "--patient", "p1", "--end", "2024-03-10", "--anchor", "bed",
            "--accept", "--by", "dr_lee",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("maintain 0 min (low confidence)"))
        .stdout(predicate::str::contains("No change to accept"));
}

#[test]
fn test_accept_requires_therapist() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["recommend", "--patient", "p1", "--accept"])
        .assert()
        .failure();
}

#[test]
fn test_week_count_out_of_range_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["week", "--patient", "p1", "--end", "2024-03-10", "--weeks", "4000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--weeks"));

    cli(temp_dir.path())
        .args(["week", "--patient", "p1", "--end", "2024-03-10", "--weeks", "0"])
        .assert()
        .failure();
}

#[test]
fn test_empty_window_not_prescribed() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args([
            "prescribe", "--patient", "p1", "--bedtime", "06:00", "--wake", "06:00",
            "--effective", "2024-03-01", "--by", "dr_lee",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("leave no sleep window"));

    assert!(!dir.join("prescriptions.json").exists());
}
