//! The diary questionnaire.
//!
//! Questions are declared once, in display order, in a cached table. Which
//! ones are shown is a pure function of the answers given so far, so a
//! step-by-step prompt and a single-shot validator walk the same sequence.

use crate::clock::WallClock;
use crate::{DiaryAnswers, Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Question Types
// ============================================================================

/// Section of the diary a question belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    GoingToBed,
    MiddleOfNight,
    WakingUp,
}

/// Input widget and its bounds
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputType {
    Time,
    YesNo,
    /// Minutes, inclusive bounds
    Duration { min: u32, max: u32 },
    MultipleChoice { options: Vec<&'static str> },
    FeelingScale { min: u8, max: u8 },
}

/// A single answer as collected from the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    /// Unparsed "HH:MM"
    Time(String),
    YesNo(bool),
    Minutes(u32),
    /// Option index
    Choice(u8),
    Scale(u8),
}

impl AnswerValue {
    fn as_number(&self) -> Option<u32> {
        match self {
            AnswerValue::Time(_) => None,
            AnswerValue::YesNo(b) => Some(u32::from(*b)),
            AnswerValue::Minutes(m) => Some(*m),
            AnswerValue::Choice(c) | AnswerValue::Scale(c) => Some(u32::from(*c)),
        }
    }
}

/// Answers collected so far, keyed by question id
pub type Answers = BTreeMap<String, AnswerValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    /// Numeric greater-or-equal; used for awakening follow-ups so that a
    /// higher bucket keeps every lower follow-up visible
    AtLeast,
}

/// "Show only if answer to `question_id` compares to `value`"
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub question_id: &'static str,
    pub comparison: Comparison,
    pub value: AnswerValue,
}

impl Condition {
    fn holds(&self, answers: &Answers) -> bool {
        let Some(given) = answers.get(self.question_id) else {
            return false;
        };
        match self.comparison {
            Comparison::Equals => given == &self.value,
            Comparison::AtLeast => match (given.as_number(), self.value.as_number()) {
                (Some(given), Some(threshold)) => given >= threshold,
                _ => false,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Question {
    pub id: &'static str,
    pub category: QuestionCategory,
    pub prompt: &'static str,
    pub input: InputType,
    pub required: bool,
    pub condition: Option<Condition>,
}

/// Structured outcome of validating one answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionCheck {
    pub question_id: &'static str,
    pub valid: bool,
    pub message: String,
}

impl QuestionCheck {
    fn pass(question: &Question) -> Self {
        Self {
            question_id: question.id,
            valid: true,
            message: "OK".into(),
        }
    }

    fn fail(question: &Question, message: String) -> Self {
        Self {
            question_id: question.id,
            valid: false,
            message,
        }
    }
}

// ============================================================================
// Awakening Buckets
// ============================================================================

/// An ordinal awakening-count choice and the count it stands for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AwakeningBucket {
    pub label: &'static str,
    pub count: u32,
}

/// Clinical bucket table; index is the stored `awakeningCount` answer
pub const AWAKENING_BUCKETS: &[AwakeningBucket] = &[
    AwakeningBucket { label: "0 times", count: 0 },
    AwakeningBucket { label: "1-2 times", count: 2 },
    AwakeningBucket { label: "3-4 times", count: 4 },
    AwakeningBucket { label: "5-6 times", count: 6 },
    AwakeningBucket { label: "7-10 times", count: 10 },
    AwakeningBucket { label: "11+ times", count: 11 },
];

/// Representative count for a bucket index
pub fn awakenings_for_bucket(index: u8) -> Option<u32> {
    AWAKENING_BUCKETS.get(usize::from(index)).map(|b| b.count)
}

// ============================================================================
// Questionnaire
// ============================================================================

pub const TIME_TO_BED: &str = "timeToBed";
pub const TIME_TRY_SLEEP: &str = "timeTrySleep";
pub const FELL_ASLEEP_QUICKLY: &str = "fellAsleepQuickly";
pub const SLEEP_ONSET_LATENCY: &str = "sleepOnsetLatency";
pub const SLEEP_ONSET_LATENCY_OUT_OF_BED: &str = "sleepOnsetLatencyOutOfBed";
pub const AWAKENING_COUNT: &str = "awakeningCount";
pub const WASO_MINUTES: &str = "wasoMinutes";
pub const WASO_OUT_OF_BED_MINUTES: &str = "wasoOutOfBedMinutes";
pub const TIME_FINAL_AWAKENING: &str = "timeFinalAwakening";
pub const WOKE_EARLY: &str = "wokeEarly";
pub const EMA_MINUTES: &str = "earlyMorningAwakeningMinutes";
pub const EMA_OUT_OF_BED_MINUTES: &str = "earlyMorningAwakeningOutOfBedMinutes";
pub const TIME_OUT_OF_BED: &str = "timeOutOfBed";
pub const QUALITY_RATING: &str = "qualityRating";

/// Upper bound for every minutes answer
pub const MAX_DURATION_MINUTES: u32 = 720;

static QUESTIONNAIRE: Lazy<Vec<Question>> = Lazy::new(build_questionnaire);

/// The ordered questionnaire
pub fn questionnaire() -> &'static [Question] {
    &QUESTIONNAIRE
}

pub fn find_question(id: &str) -> Option<&'static Question> {
    QUESTIONNAIRE.iter().find(|q| q.id == id)
}

fn build_questionnaire() -> Vec<Question> {
    use QuestionCategory::*;

    let minutes = InputType::Duration {
        min: 0,
        max: MAX_DURATION_MINUTES,
    };
    let when = |question_id, comparison, value| {
        Some(Condition {
            question_id,
            comparison,
            value,
        })
    };
    let slow_onset = || when(FELL_ASLEEP_QUICKLY, Comparison::Equals, AnswerValue::YesNo(false));
    let any_awakening = || when(AWAKENING_COUNT, Comparison::AtLeast, AnswerValue::Choice(1));
    let woke_early = || when(WOKE_EARLY, Comparison::Equals, AnswerValue::YesNo(true));

    let question = |id, category, prompt, input, condition| Question {
        id,
        category,
        prompt,
        input,
        required: true,
        condition,
    };

    vec![
        question(TIME_TO_BED, GoingToBed, "What time did you get into bed?", InputType::Time, None),
        question(
            TIME_TRY_SLEEP,
            GoingToBed,
            "What time did you try to go to sleep?",
            InputType::Time,
            None,
        ),
        question(
            FELL_ASLEEP_QUICKLY,
            GoingToBed,
            "Did you fall asleep within a few minutes?",
            InputType::YesNo,
            None,
        ),
        question(
            SLEEP_ONSET_LATENCY,
            GoingToBed,
            "How long did it take you to fall asleep (minutes)?",
            minutes.clone(),
            slow_onset(),
        ),
        question(
            SLEEP_ONSET_LATENCY_OUT_OF_BED,
            GoingToBed,
            "Of that time, how long were you out of bed (minutes)?",
            minutes.clone(),
            slow_onset(),
        ),
        question(
            AWAKENING_COUNT,
            MiddleOfNight,
            "How many times did you wake up during the night?",
            InputType::MultipleChoice {
                options: AWAKENING_BUCKETS.iter().map(|b| b.label).collect(),
            },
            None,
        ),
        question(
            WASO_MINUTES,
            MiddleOfNight,
            "In total, how long were you awake during the night (minutes)?",
            minutes.clone(),
            any_awakening(),
        ),
        question(
            WASO_OUT_OF_BED_MINUTES,
            MiddleOfNight,
            "Of that time, how long were you out of bed (minutes)?",
            minutes.clone(),
            any_awakening(),
        ),
        question(
            TIME_FINAL_AWAKENING,
            WakingUp,
            "What time was your final awakening?",
            InputType::Time,
            None,
        ),
        question(
            WOKE_EARLY,
            WakingUp,
            "Did you wake up earlier than you planned?",
            InputType::YesNo,
            None,
        ),
        question(
            EMA_MINUTES,
            WakingUp,
            "How much earlier than planned did you wake (minutes)?",
            minutes.clone(),
            woke_early(),
        ),
        question(
            EMA_OUT_OF_BED_MINUTES,
            WakingUp,
            "Of that time, how long were you out of bed (minutes)?",
            minutes,
            woke_early(),
        ),
        question(
            TIME_OUT_OF_BED,
            WakingUp,
            "What time did you get out of bed for the day?",
            InputType::Time,
            None,
        ),
        question(
            QUALITY_RATING,
            WakingUp,
            "How would you rate the quality of your sleep (1-5)?",
            InputType::FeelingScale { min: 1, max: 5 },
            None,
        ),
    ]
}

// ============================================================================
// Visibility and Validation
// ============================================================================

/// True when the question has no condition or its condition holds
pub fn is_visible(question: &Question, answers: &Answers) -> bool {
    question
        .condition
        .as_ref()
        .map_or(true, |condition| condition.holds(answers))
}

/// Questions to show for these answers, in order
pub fn visible_questions(answers: &Answers) -> Vec<&'static Question> {
    QUESTIONNAIRE
        .iter()
        .filter(|q| is_visible(q, answers))
        .collect()
}

/// First visible question that has not been answered yet
pub fn next_question(answers: &Answers) -> Option<&'static Question> {
    QUESTIONNAIRE
        .iter()
        .find(|q| is_visible(q, answers) && !answers.contains_key(q.id))
}

/// Check one answer against its question's input type and bounds
pub fn validate(question: &Question, value: Option<&AnswerValue>) -> QuestionCheck {
    let Some(value) = value else {
        return if question.required {
            QuestionCheck::fail(question, format!("{} is required", question.id))
        } else {
            QuestionCheck::pass(question)
        };
    };

    match (&question.input, value) {
        (InputType::Time, AnswerValue::Time(raw)) => match WallClock::parse(raw) {
            Ok(_) => QuestionCheck::pass(question),
            Err(_) => QuestionCheck::fail(
                question,
                format!("{} must be a time as HH:MM, got '{}'", question.id, raw),
            ),
        },
        (InputType::YesNo, AnswerValue::YesNo(_)) => QuestionCheck::pass(question),
        (InputType::Duration { min, max }, AnswerValue::Minutes(m)) => {
            if (*min..=*max).contains(m) {
                QuestionCheck::pass(question)
            } else {
                QuestionCheck::fail(
                    question,
                    format!(
                        "{} must be between {} and {} minutes, got {}",
                        question.id, min, max, m
                    ),
                )
            }
        }
        (InputType::MultipleChoice { options }, AnswerValue::Choice(c)) => {
            if usize::from(*c) < options.len() {
                QuestionCheck::pass(question)
            } else {
                QuestionCheck::fail(
                    question,
                    format!("{} has no option {}", question.id, c),
                )
            }
        }
        (InputType::FeelingScale { min, max }, AnswerValue::Scale(s)) => {
            if (*min..=*max).contains(s) {
                QuestionCheck::pass(question)
            } else {
                QuestionCheck::fail(
                    question,
                    format!("{} must be between {} and {}, got {}", question.id, min, max, s),
                )
            }
        }
        (input, _) => QuestionCheck::fail(
            question,
            format!("{} expects {}", question.id, describe_input(input)),
        ),
    }
}

/// Validate every visible question; returns only the failures
pub fn validate_answers(answers: &Answers) -> Vec<QuestionCheck> {
    visible_questions(answers)
        .into_iter()
        .map(|q| validate(q, answers.get(q.id)))
        .filter(|check| !check.valid)
        .collect()
}

/// Parse free text typed at a prompt into an answer for this question
pub fn parse_input(question: &Question, raw: &str) -> std::result::Result<AnswerValue, String> {
    let raw = raw.trim();
    match &question.input {
        InputType::Time => Ok(AnswerValue::Time(raw.to_string())),
        InputType::YesNo => match raw.to_lowercase().as_str() {
            "y" | "yes" => Ok(AnswerValue::YesNo(true)),
            "n" | "no" => Ok(AnswerValue::YesNo(false)),
            _ => Err("answer y or n".into()),
        },
        InputType::Duration { .. } => raw
            .parse()
            .map(AnswerValue::Minutes)
            .map_err(|_| "enter a whole number of minutes".into()),
        InputType::MultipleChoice { .. } => raw
            .parse()
            .map(AnswerValue::Choice)
            .map_err(|_| "enter the option number".into()),
        InputType::FeelingScale { .. } => raw
            .parse()
            .map(AnswerValue::Scale)
            .map_err(|_| "enter a number".into()),
    }
}

pub fn describe_input(input: &InputType) -> String {
    match input {
        InputType::Time => "a time (HH:MM)".into(),
        InputType::YesNo => "yes or no".into(),
        InputType::Duration { min, max } => format!("minutes ({}-{})", min, max),
        InputType::MultipleChoice { options } => options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}={}", i, o))
            .collect::<Vec<_>>()
            .join(", "),
        InputType::FeelingScale { min, max } => format!("a rating ({}-{})", min, max),
    }
}

// ============================================================================
// Conversion to and from DiaryAnswers
// ============================================================================

impl DiaryAnswers {
    /// Build typed answers from an answer map. Answers to hidden questions
    /// are ignored; a visible question with no answer is an error.
    pub fn from_answer_map(answers: &Answers) -> Result<Self> {
        let visible = |id: &str| find_question(id).map_or(false, |q| is_visible(q, answers));
        let missing = |id: &str| Error::MissingAnswer(id.to_string());
        let wrong = |id: &str| Error::Other(format!("Answer to {} has the wrong type", id));

        let time = |id: &'static str| match answers.get(id) {
            Some(AnswerValue::Time(t)) => Ok(t.clone()),
            Some(_) => Err(wrong(id)),
            None => Err(missing(id)),
        };
        let yes_no = |id: &'static str| match answers.get(id) {
            Some(AnswerValue::YesNo(b)) => Ok(*b),
            Some(_) => Err(wrong(id)),
            None => Err(missing(id)),
        };
        let conditional_minutes = |id: &'static str| -> Result<Option<u32>> {
            if !visible(id) {
                return Ok(None);
            }
            match answers.get(id) {
                Some(AnswerValue::Minutes(m)) => Ok(Some(*m)),
                Some(_) => Err(wrong(id)),
                None => Err(missing(id)),
            }
        };

        let awakening_count = match answers.get(AWAKENING_COUNT) {
            Some(AnswerValue::Choice(c)) => *c,
            Some(_) => return Err(wrong(AWAKENING_COUNT)),
            None => return Err(missing(AWAKENING_COUNT)),
        };
        let quality_rating = match answers.get(QUALITY_RATING) {
            Some(AnswerValue::Scale(s)) => *s,
            Some(_) => return Err(wrong(QUALITY_RATING)),
            None => return Err(missing(QUALITY_RATING)),
        };

        Ok(DiaryAnswers {
            time_to_bed: time(TIME_TO_BED)?,
            time_try_sleep: time(TIME_TRY_SLEEP)?,
            fell_asleep_quickly: yes_no(FELL_ASLEEP_QUICKLY)?,
            sleep_onset_latency: conditional_minutes(SLEEP_ONSET_LATENCY)?,
            sleep_onset_latency_out_of_bed: conditional_minutes(SLEEP_ONSET_LATENCY_OUT_OF_BED)?,
            awakening_count,
            waso_minutes: conditional_minutes(WASO_MINUTES)?,
            waso_out_of_bed_minutes: conditional_minutes(WASO_OUT_OF_BED_MINUTES)?,
            time_final_awakening: time(TIME_FINAL_AWAKENING)?,
            woke_early: yes_no(WOKE_EARLY)?,
            early_morning_awakening_minutes: conditional_minutes(EMA_MINUTES)?,
            early_morning_awakening_out_of_bed_minutes: conditional_minutes(EMA_OUT_OF_BED_MINUTES)?,
            time_out_of_bed: time(TIME_OUT_OF_BED)?,
            quality_rating,
        })
    }

    /// The answer map these answers correspond to
    pub fn to_answer_map(&self) -> Answers {
        let mut answers = Answers::new();
        let mut put = |id: &str, value: AnswerValue| {
            answers.insert(id.to_string(), value);
        };

        put(TIME_TO_BED, AnswerValue::Time(self.time_to_bed.clone()));
        put(TIME_TRY_SLEEP, AnswerValue::Time(self.time_try_sleep.clone()));
        put(FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(self.fell_asleep_quickly));
        put(AWAKENING_COUNT, AnswerValue::Choice(self.awakening_count));
        put(TIME_FINAL_AWAKENING, AnswerValue::Time(self.time_final_awakening.clone()));
        put(WOKE_EARLY, AnswerValue::YesNo(self.woke_early));
        put(TIME_OUT_OF_BED, AnswerValue::Time(self.time_out_of_bed.clone()));
        put(QUALITY_RATING, AnswerValue::Scale(self.quality_rating));

        let optional = [
            (SLEEP_ONSET_LATENCY, self.sleep_onset_latency),
            (SLEEP_ONSET_LATENCY_OUT_OF_BED, self.sleep_onset_latency_out_of_bed),
            (WASO_MINUTES, self.waso_minutes),
            (WASO_OUT_OF_BED_MINUTES, self.waso_out_of_bed_minutes),
            (EMA_MINUTES, self.early_morning_awakening_minutes),
            (EMA_OUT_OF_BED_MINUTES, self.early_morning_awakening_out_of_bed_minutes),
        ];
        for (id, minutes) in optional {
            if let Some(m) = minutes {
                put(id, AnswerValue::Minutes(m));
            }
        }

        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(answers: &mut Answers, id: &str, value: AnswerValue) {
        answers.insert(id.to_string(), value);
    }

    fn ids(questions: &[&Question]) -> Vec<&'static str> {
        questions.iter().map(|q| q.id).collect()
    }

    #[test]
    fn test_questionnaire_ids_unique() {
        let mut seen = std::collections::HashSet::new();
        for q in questionnaire() {
            assert!(seen.insert(q.id), "duplicate question id {}", q.id);
        }
        assert_eq!(questionnaire().len(), 14);
    }

    #[test]
    fn test_conditions_reference_earlier_questions() {
        for (i, q) in questionnaire().iter().enumerate() {
            if let Some(cond) = &q.condition {
                let pos = questionnaire()
                    .iter()
                    .position(|other| other.id == cond.question_id)
                    .unwrap();
                assert!(pos < i, "{} depends on a later question", q.id);
            }
        }
    }

    #[test]
    fn test_no_answers_hides_conditional_questions() {
        let visible = visible_questions(&Answers::new());
        let visible = ids(&visible);
        assert!(!visible.contains(&SLEEP_ONSET_LATENCY));
        assert!(!visible.contains(&WASO_MINUTES));
        assert!(!visible.contains(&EMA_MINUTES));
        assert_eq!(visible.len(), 8);
    }

    #[test]
    fn test_sol_follow_ups_shown_when_slow_to_fall_asleep() {
        let mut answers = Answers::new();
        answer(&mut answers, FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(false));
        let visible = visible_questions(&answers);
        assert!(ids(&visible).contains(&SLEEP_ONSET_LATENCY));
        assert!(ids(&visible).contains(&SLEEP_ONSET_LATENCY_OUT_OF_BED));

        answer(&mut answers, FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(true));
        assert!(!ids(&visible_questions(&answers)).contains(&SLEEP_ONSET_LATENCY));
    }

    #[test]
    fn test_awakening_follow_ups_use_at_least() {
        let waso = find_question(WASO_MINUTES).unwrap();
        let mut answers = Answers::new();

        answer(&mut answers, AWAKENING_COUNT, AnswerValue::Choice(0));
        assert!(!is_visible(waso, &answers));

        for bucket in 1..AWAKENING_BUCKETS.len() as u8 {
            answer(&mut answers, AWAKENING_COUNT, AnswerValue::Choice(bucket));
            assert!(is_visible(waso, &answers), "bucket {} should show WASO", bucket);
        }
    }

    #[test]
    fn test_visibility_is_deterministic() {
        let mut answers = Answers::new();
        answer(&mut answers, FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(false));
        answer(&mut answers, AWAKENING_COUNT, AnswerValue::Choice(2));
        answer(&mut answers, WOKE_EARLY, AnswerValue::YesNo(true));

        let first = ids(&visible_questions(&answers));
        let second = ids(&visible_questions(&answers));
        assert_eq!(first, second);
        assert_eq!(first.len(), questionnaire().len());
    }

    #[test]
    fn test_next_question_walks_in_order() {
        let mut answers = Answers::new();
        assert_eq!(next_question(&answers).unwrap().id, TIME_TO_BED);

        answer(&mut answers, TIME_TO_BED, AnswerValue::Time("22:00".into()));
        answer(&mut answers, TIME_TRY_SLEEP, AnswerValue::Time("22:15".into()));
        answer(&mut answers, FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(true));
        // SOL questions are skipped
        assert_eq!(next_question(&answers).unwrap().id, AWAKENING_COUNT);
    }

    #[test]
    fn test_validate_duration_bounds_inclusive() {
        let sol = find_question(SLEEP_ONSET_LATENCY).unwrap();
        assert!(validate(sol, Some(&AnswerValue::Minutes(0))).valid);
        assert!(validate(sol, Some(&AnswerValue::Minutes(720))).valid);

        let check = validate(sol, Some(&AnswerValue::Minutes(721)));
        assert!(!check.valid);
        assert!(check.message.contains("between 0 and 720"));
    }

    #[test]
    fn test_validate_required_and_type() {
        let bed = find_question(TIME_TO_BED).unwrap();
        assert!(!validate(bed, None).valid);
        assert!(!validate(bed, Some(&AnswerValue::Time("25:00".into()))).valid);
        assert!(!validate(bed, Some(&AnswerValue::YesNo(true))).valid);
        assert!(validate(bed, Some(&AnswerValue::Time("22:00".into()))).valid);

        let rating = find_question(QUALITY_RATING).unwrap();
        assert!(!validate(rating, Some(&AnswerValue::Scale(0))).valid);
        assert!(validate(rating, Some(&AnswerValue::Scale(5))).valid);
    }

    #[test]
    fn test_bucket_table() {
        assert_eq!(awakenings_for_bucket(0), Some(0));
        assert_eq!(awakenings_for_bucket(1), Some(2));
        assert_eq!(awakenings_for_bucket(5), Some(11));
        assert_eq!(awakenings_for_bucket(6), None);
    }

    #[test]
    fn test_answer_map_roundtrip_drops_hidden_answers() {
        let mut answers = Answers::new();
        answer(&mut answers, TIME_TO_BED, AnswerValue::Time("22:00".into()));
        answer(&mut answers, TIME_TRY_SLEEP, AnswerValue::Time("22:15".into()));
        answer(&mut answers, FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(true));
        // Hidden: fell asleep quickly, so this is ignored
        answer(&mut answers, SLEEP_ONSET_LATENCY, AnswerValue::Minutes(40));
        answer(&mut answers, AWAKENING_COUNT, AnswerValue::Choice(0));
        answer(&mut answers, TIME_FINAL_AWAKENING, AnswerValue::Time("06:30".into()));
        answer(&mut answers, WOKE_EARLY, AnswerValue::YesNo(false));
        answer(&mut answers, TIME_OUT_OF_BED, AnswerValue::Time("06:40".into()));
        answer(&mut answers, QUALITY_RATING, AnswerValue::Scale(4));

        assert!(validate_answers(&answers).is_empty());

        let diary = DiaryAnswers::from_answer_map(&answers).unwrap();
        assert_eq!(diary.sleep_onset_latency, None);
        assert_eq!(diary.quality_rating, 4);
        assert!(!diary.to_answer_map().contains_key(SLEEP_ONSET_LATENCY));
    }

    #[test]
    fn test_from_answer_map_requires_visible_follow_up() {
        let mut answers = Answers::new();
        answer(&mut answers, TIME_TO_BED, AnswerValue::Time("22:00".into()));
        answer(&mut answers, TIME_TRY_SLEEP, AnswerValue::Time("22:15".into()));
        answer(&mut answers, FELL_ASLEEP_QUICKLY, AnswerValue::YesNo(false));
        answer(&mut answers, AWAKENING_COUNT, AnswerValue::Choice(0));
        answer(&mut answers, TIME_FINAL_AWAKENING, AnswerValue::Time("06:30".into()));
        answer(&mut answers, WOKE_EARLY, AnswerValue::YesNo(false));
        answer(&mut answers, TIME_OUT_OF_BED, AnswerValue::Time("06:40".into()));
        answer(&mut answers, QUALITY_RATING, AnswerValue::Scale(3));

        let err = DiaryAnswers::from_answer_map(&answers).unwrap_err();
        assert!(matches!(err, Error::MissingAnswer(ref id) if id == SLEEP_ONSET_LATENCY));

        let failures = validate_answers(&answers);
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_parse_input() {
        let yes_no = find_question(WOKE_EARLY).unwrap();
        assert_eq!(parse_input(yes_no, "Y").unwrap(), AnswerValue::YesNo(true));
        assert!(parse_input(yes_no, "maybe").is_err());

        let sol = find_question(SLEEP_ONSET_LATENCY).unwrap();
        assert_eq!(parse_input(sol, " 25 ").unwrap(), AnswerValue::Minutes(25));
        assert!(parse_input(sol, "-5").is_err());
    }
}
