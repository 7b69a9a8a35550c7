use cbti_core::aggregate::window_ending;
use cbti_core::questions::{self, describe_input, next_question, parse_input, validate};
use cbti_core::titration::below_floor;
use cbti_core::*;
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cbti")]
#[command(about = "CBT-I sleep diary and sleep window titration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the diary questions
    Questions,

    /// Record one night's diary
    Log {
        #[arg(long)]
        patient: String,

        /// The date the patient went to bed (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// JSON file with the answers; prompts on stdin when omitted
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Show the metrics without recording the night
        #[arg(long)]
        dry_run: bool,
    },

    /// Show weekly sleep summaries
    Week {
        #[arg(long)]
        patient: String,

        /// Last night of the most recent week (defaults to today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Number of consecutive weeks to show
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_WEEKS))]
        weeks: u32,
    },

    /// Set a patient's sleep window
    Prescribe {
        #[arg(long)]
        patient: String,

        #[arg(long)]
        bedtime: WallClock,

        #[arg(long)]
        wake: WallClock,

        #[arg(long)]
        effective: NaiveDate,

        /// Prescribing therapist
        #[arg(long)]
        by: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Recommend a sleep window change from the last week of diaries
    Recommend {
        #[arg(long)]
        patient: String,

        /// Last night of the week to evaluate (defaults to today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Which end of the window stays fixed
        #[arg(long, value_enum)]
        anchor: Option<AnchorArg>,

        /// Record the proposed window as a new prescription
        #[arg(long, requires = "by")]
        accept: bool,

        /// Accepting therapist
        #[arg(long)]
        by: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
}

/// Ten years of weekly summaries
const MAX_WEEKS: i64 = 520;

#[derive(Clone, Copy, ValueEnum)]
enum AnchorArg {
    /// Keep the wake time, move the bedtime
    Wake,
    /// Keep the bedtime, move the wake time
    Bed,
}

impl From<AnchorArg> for WindowAnchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Wake => WindowAnchor::WakeTime,
            AnchorArg::Bed => WindowAnchor::Bedtime,
        }
    }
}

struct Paths {
    journal: PathBuf,
    prescriptions: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            journal: data_dir.join("diary.jsonl"),
            prescriptions: data_dir.join("prescriptions.json"),
        }
    }
}

fn main() -> Result<()> {
    cbti_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = Paths::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Commands::Questions => cmd_questions(),
        Commands::Log {
            patient,
            date,
            answers,
            dry_run,
        } => cmd_log(&paths, &config, &patient, date, answers.as_deref(), dry_run),
        Commands::Week {
            patient,
            end,
            weeks,
        } => cmd_week(&paths, &config, &patient, end.unwrap_or_else(today), weeks),
        Commands::Prescribe {
            patient,
            bedtime,
            wake,
            effective,
            by,
            notes,
        } => cmd_prescribe(&paths, &patient, Prescription::new(bedtime, wake, effective, by, notes)?),
        Commands::Recommend {
            patient,
            end,
            anchor,
            accept,
            by,
            notes,
        } => cmd_recommend(
            &paths,
            &config,
            &patient,
            end.unwrap_or_else(today),
            anchor.map(WindowAnchor::from),
            accept.then_some(by).flatten().map(|by| (by, notes)),
        ),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn cmd_questions() -> Result<()> {
    for (i, q) in questions::questionnaire().iter().enumerate() {
        let shown = match &q.condition {
            Some(cond) => format!("  (if {} {:?} {:?})", cond.question_id, cond.comparison, cond.value),
            None => String::new(),
        };
        println!("{:>2}. [{:?}] {} {}{}", i + 1, q.category, q.id, q.prompt, shown);
        println!("      answer: {}", describe_input(&q.input));
    }
    Ok(())
}

fn cmd_log(
    paths: &Paths,
    config: &Config,
    patient: &str,
    date: NaiveDate,
    answers_path: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let answers = match answers_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str::<DiaryAnswers>(&contents)?
        }
        None => prompt_answers()?,
    };

    let failures = questions::validate_answers(&answers.to_answer_map());
    if !failures.is_empty() {
        eprintln!("Invalid answers:");
        for failure in &failures {
            eprintln!("  - {}", failure.message);
        }
        return Err(Error::Other(format!("{} invalid answer(s)", failures.len())));
    }

    let metrics = match record_night(&answers, date, &config.day_boundary) {
        Ok(metrics) => metrics,
        Err(Error::Rejected(report)) => {
            eprintln!("Entry rejected:");
            for violation in &report.violations {
                eprintln!("  - {}", violation);
            }
            return Err(Error::Rejected(report));
        }
        Err(e) => return Err(e),
    };

    display_metrics(&metrics);

    if dry_run {
        println!("\n[Dry run - not logging entry]");
        return Ok(());
    }

    let mut journal = JsonlJournal::new(&paths.journal);
    journal.append(&DiaryEntry::new(patient, metrics))?;
    println!("\n✓ Night logged for {} ({})", patient, date);
    Ok(())
}

/// Walk the visible questions on stdin until the diary is complete
fn prompt_answers() -> Result<DiaryAnswers> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut answers = Answers::new();

    while let Some(question) = next_question(&answers) {
        print!("{} [{}]\n> ", question.prompt, describe_input(&question.input));
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Err(Error::MissingAnswer(question.id.to_string()));
        };
        let line = line?;

        let value = match parse_input(question, &line) {
            Ok(value) => value,
            Err(hint) => {
                println!("  ! {}", hint);
                continue;
            }
        };

        let check = validate(question, Some(&value));
        if !check.valid {
            println!("  ! {}", check.message);
            continue;
        }

        answers.insert(question.id.to_string(), value);
    }

    DiaryAnswers::from_answer_map(&answers)
}

fn cmd_week(paths: &Paths, config: &Config, patient: &str, end: NaiveDate, weeks: u32) -> Result<()> {
    let window_days = config.titration.window_days;
    let span = Duration::days(i64::from(window_days) * i64::from(weeks.max(1)) - 1);
    let start = end.checked_sub_signed(span).ok_or_else(|| {
        Error::Other(format!("{} weeks before {} is out of range", weeks, end))
    })?;
    let nights = load_nights(&paths.journal, patient, start, end)?;

    for week in rolling_weeks(&nights, end, weeks.max(1), window_days) {
        display_week(&week);
    }
    Ok(())
}

fn cmd_prescribe(paths: &Paths, patient: &str, prescription: Prescription) -> Result<()> {
    let line = format!(
        "✓ Sleep window for {}: {} - {} ({} min) from {}",
        patient,
        prescription.bedtime,
        prescription.wake_time,
        prescription.window_minutes,
        prescription.effective_date
    );
    PrescriptionBook::update(&paths.prescriptions, |book| book.append(patient, prescription))?;
    println!("{}", line);
    Ok(())
}

fn cmd_recommend(
    paths: &Paths,
    config: &Config,
    patient: &str,
    end: NaiveDate,
    anchor: Option<WindowAnchor>,
    accept: Option<(String, Option<String>)>,
) -> Result<()> {
    let titration = &config.titration;
    let (start, end) = window_ending(end, titration.window_days);

    let nights = load_nights(&paths.journal, patient, start, end)?;
    let weekly = aggregate(&nights, start, end);

    let book = PrescriptionBook::load(&paths.prescriptions)?;
    let current = book.active_on(patient, end).cloned().ok_or_else(|| {
        Error::Prescription(format!("no prescription in force for {} on {}", patient, end))
    })?;

    let recommendation = recommend(&weekly, current.window_minutes, titration);
    let anchor = anchor.unwrap_or(titration.default_anchor);
    let window = compute_new_window(&current, recommendation.action, recommendation.minutes, anchor);

    display_week(&weekly);
    println!();
    println!("  Current window:  {} - {} ({} min)", current.bedtime, current.wake_time, current.window_minutes);
    println!(
        "  Recommendation:  {} {} min ({} confidence)",
        recommendation.action, recommendation.minutes, recommendation.confidence
    );
    println!("  Reason:          {}", recommendation.reason);
    println!("  Proposed window: {} - {} ({} min)", window.bedtime, window.wake_time, window.window_minutes);

    let Some((by, notes)) = accept else {
        return Ok(());
    };

    if recommendation.signed_minutes() == 0 {
        println!("\nNo change to accept.");
        return Ok(());
    }
    if below_floor(&window, titration) {
        return Err(Error::Prescription(format!(
            "proposed window of {} min is below the {}-minute minimum",
            window.window_minutes, titration.min_window_minutes
        )));
    }

    let next = current.revise(&window, end + Duration::days(1), by, notes)?;
    let effective = next.effective_date;
    PrescriptionBook::update(&paths.prescriptions, |book| book.append(patient, next))?;
    println!("\n✓ Prescription updated, effective {}", effective);
    Ok(())
}

fn display_metrics(m: &SleepMetrics) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  NIGHT OF {}", m.sleep_date);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Time in bed:       {} min", m.time_in_bed);
    println!("  Total sleep time:  {} min", m.total_sleep_time);
    println!(
        "  Total wake time:   {} min ({} min out of bed)",
        m.total_wake_time, m.total_wake_time_out_of_bed
    );
    println!("  Sleep efficiency:  {}%", m.sleep_efficiency);
    println!(
        "  SOL / WASO / EMA:  {} / {} / {} min",
        m.sleep_onset_latency, m.waso_minutes, m.early_morning_awakening_minutes
    );
    println!("  Awakenings:        {}", m.awakenings);
    println!("  Quality:           {}/5", m.quality_rating);
}

fn display_week(week: &WeeklyMetrics) {
    let avg = |value: Option<f64>, unit: &str| match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "n/a".to_string(),
    };

    println!("{} .. {}  ({} nights logged)", week.start, week.end, week.days_logged);
    println!("  Sleep efficiency:  {}", avg(week.avg_sleep_efficiency, "%"));
    println!("  Total sleep time:  {}", avg(week.avg_total_sleep_time, " min"));
    println!("  Time in bed:       {}", avg(week.avg_time_in_bed, " min"));
    println!("  SOL:               {}", avg(week.avg_sol, " min"));
    println!("  WASO:              {}", avg(week.avg_waso, " min"));
}
