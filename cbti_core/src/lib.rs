#![forbid(unsafe_code)]

//! Core domain model and business logic for the cbti sleep diary.
//!
//! This crate provides:
//! - Domain types (diary answers, nightly and weekly metrics, prescriptions)
//! - The diary questionnaire and its visibility rules
//! - Metric calculation and entry validation
//! - Weekly aggregation
//! - The titration engine for the prescribed sleep window
//! - Persistence (journal, prescription book) and configuration

pub mod types;
pub mod error;
pub mod clock;
pub mod questions;
pub mod metrics;
pub mod validation;
pub mod aggregate;
pub mod titration;
pub mod config;
pub mod logging;
pub mod journal;
pub mod history;
pub mod prescriptions;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{AnchorRule, DayBoundaryPolicy, WallClock};
pub use config::{Config, TitrationConfig};
pub use questions::{AnswerValue, Answers};
pub use metrics::{compute_metrics, record_night};
pub use validation::{validate_entry, ValidationReport, Violation};
pub use aggregate::{aggregate, rolling_weeks};
pub use titration::{compute_new_window, recommend};
pub use journal::{EntrySink, JsonlJournal};
pub use history::load_nights;
pub use prescriptions::PrescriptionBook;
