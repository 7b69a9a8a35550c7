//! Titration engine for the prescribed sleep window.
//!
//! The recommendation comes from an ordered decision table built from the
//! configured thresholds; the first matching rule wins:
//!
//! | Condition                                  | Action   | Minutes   | Confidence          |
//! |--------------------------------------------|----------|-----------|---------------------|
//! | no SE, or fewer than `min_days_logged`     | maintain | 0         | low                 |
//! | SE >= increase threshold                   | increase | increment | high/medium by days |
//! | maintain threshold <= SE < increase        | maintain | 0         | high/medium by days |
//! | review threshold <= SE < maintain          | review   | 0         | medium              |
//! | SE < review, window above the floor        | decrease | increment | high/medium by days |
//! | SE < review, window at or below the floor  | review   | 0         | medium              |
//!
//! Applying an accepted action to a prescription is a separate step
//! ([`compute_new_window`]) that only does clock arithmetic.

use crate::config::TitrationConfig;
use crate::{
    Confidence, NewWindow, Prescription, TitrationAction, TitrationRecommendation, WeeklyMetrics,
    WindowAnchor,
};

/// What the decision table looks at
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TitrationInput {
    pub avg_sleep_efficiency: Option<f64>,
    pub days_logged: u32,
    pub current_window_minutes: u32,
}

impl TitrationInput {
    pub fn new(weekly: &WeeklyMetrics, current_window_minutes: u32) -> Self {
        Self {
            avg_sleep_efficiency: weekly.avg_sleep_efficiency,
            days_logged: weekly.days_logged,
            current_window_minutes,
        }
    }

    fn efficiency(&self) -> Option<f64> {
        self.avg_sleep_efficiency.filter(|se| se.is_finite())
    }
}

/// Condition column of the decision table
#[derive(Clone, Debug, PartialEq)]
pub enum RuleCondition {
    InsufficientData { min_days: u32 },
    EfficiencyAtLeast(f64),
    /// `low <= SE < high`
    EfficiencyInRange { low: f64, high: f64 },
    EfficiencyBelow {
        threshold: f64,
        floor_minutes: u32,
        above_floor: bool,
    },
}

impl RuleCondition {
    pub fn matches(&self, input: &TitrationInput) -> bool {
        let se = input.efficiency();
        match *self {
            RuleCondition::InsufficientData { min_days } => {
                se.is_none() || input.days_logged < min_days
            }
            RuleCondition::EfficiencyAtLeast(threshold) => se.map_or(false, |se| se >= threshold),
            RuleCondition::EfficiencyInRange { low, high } => {
                se.map_or(false, |se| se >= low && se < high)
            }
            RuleCondition::EfficiencyBelow {
                threshold,
                floor_minutes,
                above_floor,
            } => se.map_or(false, |se| {
                se < threshold && (input.current_window_minutes > floor_minutes) == above_floor
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceRule {
    Fixed(Confidence),
    /// High once `high_at` nights are logged, medium before that
    ByDaysLogged { high_at: u32 },
}

impl ConfidenceRule {
    fn grade(self, days_logged: u32) -> Confidence {
        match self {
            ConfidenceRule::Fixed(c) => c,
            ConfidenceRule::ByDaysLogged { high_at } if days_logged >= high_at => Confidence::High,
            ConfidenceRule::ByDaysLogged { .. } => Confidence::Medium,
        }
    }
}

/// One row of the decision table
#[derive(Clone)]
pub struct TitrationRule {
    pub condition: RuleCondition,
    pub action: TitrationAction,
    pub minutes: u32,
    pub confidence: ConfidenceRule,
    reason: fn(&TitrationRule, &TitrationInput) -> String,
}

impl std::fmt::Debug for TitrationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitrationRule")
            .field("condition", &self.condition)
            .field("action", &self.action)
            .field("minutes", &self.minutes)
            .field("confidence", &self.confidence)
            .finish()
    }
}

impl TitrationRule {
    fn outcome(&self, input: &TitrationInput) -> TitrationRecommendation {
        TitrationRecommendation {
            action: self.action,
            minutes: self.minutes,
            reason: (self.reason)(self, input),
            confidence: self.confidence.grade(input.days_logged),
        }
    }
}

fn se_text(input: &TitrationInput) -> String {
    input
        .efficiency()
        .map_or_else(|| "n/a".to_string(), |se| format!("{:.1}%", se))
}

fn reason_insufficient(rule: &TitrationRule, input: &TitrationInput) -> String {
    let min_days = match rule.condition {
        RuleCondition::InsufficientData { min_days } => min_days,
        _ => 0,
    };
    if input.efficiency().is_none() {
        format!(
            "No sleep efficiency data for this period; keep the current window until at least {} nights are logged",
            min_days
        )
    } else {
        format!(
            "Only {} night(s) logged, fewer than the {} needed to adjust the window; keep the current window",
            input.days_logged, min_days
        )
    }
}

fn reason_increase(rule: &TitrationRule, input: &TitrationInput) -> String {
    let threshold = match rule.condition {
        RuleCondition::EfficiencyAtLeast(t) => t,
        _ => 0.0,
    };
    format!(
        "Average sleep efficiency {} is at or above {}%; extend the window by {} minutes",
        se_text(input),
        threshold,
        rule.minutes
    )
}

fn reason_maintain(rule: &TitrationRule, input: &TitrationInput) -> String {
    let (low, high) = match rule.condition {
        RuleCondition::EfficiencyInRange { low, high } => (low, high),
        _ => (0.0, 0.0),
    };
    format!(
        "Average sleep efficiency {} is at least {}% and below {}%; keep the current window",
        se_text(input),
        low,
        high
    )
}

fn reason_borderline(rule: &TitrationRule, input: &TitrationInput) -> String {
    let (low, high) = match rule.condition {
        RuleCondition::EfficiencyInRange { low, high } => (low, high),
        _ => (0.0, 0.0),
    };
    format!(
        "Average sleep efficiency {} is at least {}% but below {}%; borderline, therapist review advised",
        se_text(input),
        low,
        high
    )
}

fn reason_decrease(rule: &TitrationRule, input: &TitrationInput) -> String {
    let threshold = match rule.condition {
        RuleCondition::EfficiencyBelow { threshold, .. } => threshold,
        _ => 0.0,
    };
    format!(
        "Average sleep efficiency {} is below {}%; shorten the window by {} minutes",
        se_text(input),
        threshold,
        rule.minutes
    )
}

fn reason_at_floor(rule: &TitrationRule, input: &TitrationInput) -> String {
    let (threshold, floor) = match rule.condition {
        RuleCondition::EfficiencyBelow {
            threshold,
            floor_minutes,
            ..
        } => (threshold, floor_minutes),
        _ => (0.0, 0),
    };
    format!(
        "Average sleep efficiency {} is below {}% but the {}-minute window is already at the {}-minute minimum; therapist review advised",
        se_text(input),
        threshold,
        input.current_window_minutes,
        floor
    )
}

/// The ordered decision table for a configuration
pub fn decision_table(config: &TitrationConfig) -> Vec<TitrationRule> {
    let by_days = ConfidenceRule::ByDaysLogged {
        high_at: config.high_confidence_days,
    };

    vec![
        TitrationRule {
            condition: RuleCondition::InsufficientData {
                min_days: config.min_days_logged,
            },
            action: TitrationAction::Maintain,
            minutes: 0,
            confidence: ConfidenceRule::Fixed(Confidence::Low),
            reason: reason_insufficient,
        },
        TitrationRule {
            condition: RuleCondition::EfficiencyAtLeast(config.increase_threshold),
            action: TitrationAction::Increase,
            minutes: config.increment_minutes,
            confidence: by_days,
            reason: reason_increase,
        },
        TitrationRule {
            condition: RuleCondition::EfficiencyInRange {
                low: config.maintain_threshold,
                high: config.increase_threshold,
            },
            action: TitrationAction::Maintain,
            minutes: 0,
            confidence: by_days,
            reason: reason_maintain,
        },
        TitrationRule {
            condition: RuleCondition::EfficiencyInRange {
                low: config.review_threshold,
                high: config.maintain_threshold,
            },
            action: TitrationAction::Review,
            minutes: 0,
            confidence: ConfidenceRule::Fixed(Confidence::Medium),
            reason: reason_borderline,
        },
        TitrationRule {
            condition: RuleCondition::EfficiencyBelow {
                threshold: config.review_threshold,
                floor_minutes: config.min_window_minutes,
                above_floor: true,
            },
            action: TitrationAction::Decrease,
            minutes: config.increment_minutes,
            confidence: by_days,
            reason: reason_decrease,
        },
        TitrationRule {
            condition: RuleCondition::EfficiencyBelow {
                threshold: config.review_threshold,
                floor_minutes: config.min_window_minutes,
                above_floor: false,
            },
            action: TitrationAction::Review,
            minutes: 0,
            confidence: ConfidenceRule::Fixed(Confidence::Medium),
            reason: reason_at_floor,
        },
    ]
}

/// Evaluate a decision table against an input; first match wins
pub fn evaluate(table: &[TitrationRule], input: &TitrationInput) -> TitrationRecommendation {
    match table.iter().find(|rule| rule.condition.matches(input)) {
        Some(rule) => rule.outcome(input),
        None => TitrationRecommendation {
            action: TitrationAction::Maintain,
            minutes: 0,
            reason: format!(
                "No titration rule applies to sleep efficiency {}; keep the current window",
                se_text(input)
            ),
            confidence: Confidence::Low,
        },
    }
}

/// Recommend a window change from a weekly summary and the current window
pub fn recommend(
    weekly: &WeeklyMetrics,
    current_window_minutes: u32,
    config: &TitrationConfig,
) -> TitrationRecommendation {
    let input = TitrationInput::new(weekly, current_window_minutes);
    let recommendation = evaluate(&decision_table(config), &input);

    tracing::info!(
        "Titration for {}..={}: {} {} min ({} confidence)",
        weekly.start,
        weekly.end,
        recommendation.action,
        recommendation.minutes,
        recommendation.confidence
    );

    recommendation
}

/// Apply an action to a prescription's clock times
///
/// With the wake time anchored the bedtime moves (earlier to lengthen the
/// window); with the bedtime anchored the wake time moves. Maintain, review
/// and zero-minute adjustments return the current window. The floor is not
/// enforced here.
pub fn compute_new_window(
    current: &Prescription,
    action: TitrationAction,
    minutes: u32,
    anchor: WindowAnchor,
) -> NewWindow {
    let delta = action.sign() * minutes as i32;
    let unchanged = NewWindow {
        bedtime: current.bedtime,
        wake_time: current.wake_time,
        window_minutes: current.window_minutes as i32,
    };
    if delta == 0 {
        return unchanged;
    }

    let window = match anchor {
        WindowAnchor::WakeTime => NewWindow {
            bedtime: current.bedtime.shift(-delta),
            ..unchanged
        },
        WindowAnchor::Bedtime => NewWindow {
            wake_time: current.wake_time.shift(delta),
            ..unchanged
        },
    };

    NewWindow {
        window_minutes: unchanged.window_minutes + delta,
        ..window
    }
}

/// True when a proposed window is shorter than the configured minimum
pub fn below_floor(window: &NewWindow, config: &TitrationConfig) -> bool {
    window.window_minutes < config.min_window_minutes as i32
}
