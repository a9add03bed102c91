use std::fmt;

use chrono::{DateTime, Duration, Utc};
use exam_core::model::{
    AnswerOption, Difficulty, QuestionDraft, QuestionId, Subject, SubjectQuotas, TestDefinition,
    TestId,
};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    test_id: TestId,
    title: String,
    duration_minutes: u32,
    per_subject: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTestId { raw: String },
    InvalidDuration { raw: String },
    InvalidPerSubject { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTestId { raw } => write!(f, "invalid --test-id value: {raw}"),
            ArgsError::InvalidDuration { raw } => write!(f, "invalid --duration value: {raw}"),
            ArgsError::InvalidPerSubject { raw } => {
                write!(f, "invalid --per-subject value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .unwrap_or_else(|_| "sqlite://exam.sqlite3?mode=rwc".into());
        let mut test_id = std::env::var("EXAM_TEST_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| TestId::new(1), TestId::new);
        let mut title =
            std::env::var("EXAM_TEST_TITLE").unwrap_or_else(|_| "Full Syllabus Mock 1".into());
        let mut duration_minutes = env_u32("EXAM_DURATION_MINUTES", 180);
        let mut per_subject = env_u32("EXAM_PER_SUBJECT", 5);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--test-id" => {
                    let value = require_value(&mut args, "--test-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTestId { raw: value.clone() })?;
                    test_id = TestId::new(parsed);
                }
                "--title" => {
                    title = require_value(&mut args, "--title")?;
                }
                "--duration" => {
                    let value = require_value(&mut args, "--duration")?;
                    duration_minutes = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDuration { raw: value.clone() })?;
                }
                "--per-subject" => {
                    let value = require_value(&mut args, "--per-subject")?;
                    per_subject = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidPerSubject { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            test_id,
            title,
            duration_minutes,
            per_subject,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://exam.sqlite3?mode=rwc)");
    eprintln!("  --test-id <id>            Test id to upsert (default: 1)");
    eprintln!("  --title <text>            Test title (default: Full Syllabus Mock 1)");
    eprintln!("  --duration <minutes>      Test duration in minutes (default: 180)");
    eprintln!("  --per-subject <n>         Questions per subject (default: 5)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  EXAM_DB_URL, EXAM_TEST_ID, EXAM_TEST_TITLE, EXAM_DURATION_MINUTES, EXAM_PER_SUBJECT"
    );
}

fn sample_bank(subject: Subject) -> &'static [(&'static str, &'static str)] {
    match subject {
        Subject::Physics => &[
            ("Kinematics", "A body starts from rest with uniform acceleration. Distance covered is proportional to"),
            ("Work and Energy", "The SI unit of power is"),
            ("Optics", "The focal length of a plane mirror is"),
            ("Electrostatics", "Electric field inside a charged conducting sphere is"),
            ("Thermodynamics", "In an isothermal process the change in internal energy of an ideal gas is"),
        ],
        Subject::Chemistry => &[
            ("Atomic Structure", "The maximum number of electrons in the n = 2 shell is"),
            ("Chemical Bonding", "The hybridisation of carbon in methane is"),
            ("Equilibrium", "Adding a catalyst to a system at equilibrium"),
            ("Organic Chemistry", "The functional group of an aldehyde is"),
            ("Periodic Table", "Across a period from left to right, atomic radius generally"),
        ],
        Subject::Mathematics => &[
            ("Calculus", "The derivative of sin x is"),
            ("Algebra", "The sum of the roots of x^2 - 5x + 6 = 0 is"),
            ("Probability", "The probability of getting a head in a fair coin toss is"),
            ("Trigonometry", "The value of sin^2 x + cos^2 x is"),
            ("Coordinate Geometry", "The slope of the line y = 3x + 2 is"),
        ],
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let test = TestDefinition::new(
        args.test_id,
        args.title.clone(),
        Some("Physics, Chemistry and Mathematics with +4 / -1 marking".into()),
        args.duration_minutes,
        SubjectQuotas::uniform(args.per_subject),
        now,
    )?;
    storage.catalog.upsert_test(&test).await?;

    let difficulties = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
    let mut next_id: u64 = 1;
    for subject in Subject::ALL {
        let bank = sample_bank(subject);
        for i in 0..args.per_subject {
            let idx = usize::try_from(i).unwrap_or(0) % bank.len();
            let (topic, text) = bank[idx];
            let correct = AnswerOption::ALL[idx % AnswerOption::ALL.len()];
            let question = QuestionDraft {
                subject,
                topic: topic.to_string(),
                text: format!("{text} ({})", i + 1),
                options: [
                    "Option one".into(),
                    "Option two".into(),
                    "Option three".into(),
                    "Option four".into(),
                ],
                correct,
                marks: 4,
                negative_marks: -1,
                difficulty: difficulties[idx % difficulties.len()],
            }
            .validate(QuestionId::new(next_id), now - Duration::minutes(1))?;
            storage.catalog.upsert_question(&question).await?;
            next_id += 1;
        }
    }

    tracing::info!(
        test_id = args.test_id.value(),
        questions = next_id - 1,
        db_url = %args.db_url,
        "seeded test catalog"
    );
    println!(
        "Seeded test {} with {} questions per subject into {}",
        args.test_id.value(),
        args.per_subject,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
