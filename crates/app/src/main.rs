use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::model::{BookCatalog, BookId, BookStatus, QuestionBank};
use services::{AppServices, LocalPurchaseBackend, PurchaseResult};
use storage::question_bank::{load_question_bank, parse_question_bank};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod play;

const BUNDLED_BANK: &str = include_str!("../assets/trivia.json");
const DEFAULT_DATA_DIR: &str = "quiz-data";
const DEFAULT_LOG_FILTER: &str = "app=info,services=info,storage=warn";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingBook { command: &'static str },
    InvalidBook { raw: String },
    InvalidSeed { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingBook { command } => write!(f, "{command} requires a book number"),
            ArgsError::InvalidBook { raw } => write!(f, "invalid book number: {raw}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play            [options]");
    eprintln!("  cargo run -p app -- books           [options]");
    eprintln!("  cargo run -p app -- toggle <book>   [options]");
    eprintln!("  cargo run -p app -- buy <book>      [options]");
    eprintln!("  cargo run -p app -- scores          [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --data-dir <dir>   where store.json and scores.json live (default ./{DEFAULT_DATA_DIR})");
    eprintln!("  --bank <path>      question bank JSON (default: bundled bank)");
    eprintln!("  --seed <u64>       deterministic question order");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DATA_DIR, QUIZ_BANK_PATH, QUIZ_SEED, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Books,
    Toggle(BookId),
    Buy(BookId),
    Scores,
}

#[derive(Debug)]
struct Args {
    command: Command,
    data_dir: PathBuf,
    bank_path: Option<PathBuf>,
    seed: Option<u64>,
}

impl Args {
    fn parse(
        mut args: impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let command = match args.next().as_deref() {
            None | Some("play") => Command::Play,
            Some("books") => Command::Books,
            Some("scores") => Command::Scores,
            Some("toggle") => Command::Toggle(parse_book(&mut args, "toggle")?),
            Some("buy") => Command::Buy(parse_book(&mut args, "buy")?),
            Some(other) => return Err(ArgsError::UnknownArg(other.to_owned())),
        };

        let mut data_dir = env("QUIZ_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let mut bank_path = env("QUIZ_BANK_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let mut seed = env("QUIZ_SEED").and_then(|v| v.trim().parse::<u64>().ok());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" => data_dir = PathBuf::from(require_value(&mut args, "--data-dir")?),
                "--bank" => bank_path = Some(PathBuf::from(require_value(&mut args, "--bank")?)),
                "--seed" => {
                    let value = require_value(&mut args, "--seed")?;
                    let parsed = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            command,
            data_dir,
            bank_path,
            seed,
        })
    }
}

fn parse_book(
    args: &mut impl Iterator<Item = String>,
    command: &'static str,
) -> Result<BookId, ArgsError> {
    let raw = args.next().ok_or(ArgsError::MissingBook { command })?;
    raw.parse().map_err(|_| ArgsError::InvalidBook { raw })
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn load_bank(path: Option<&PathBuf>) -> Result<QuestionBank, Box<dyn std::error::Error>> {
    let bank = match path {
        Some(path) => load_question_bank(path).await?,
        None => parse_question_bank(BUNDLED_BANK)?,
    };
    Ok(bank)
}

fn status_label(status: BookStatus) -> &'static str {
    match status {
        BookStatus::Enabled => "[x]",
        BookStatus::Disabled => "[ ]",
        BookStatus::Locked => "[locked]",
    }
}

async fn print_books(services: &AppServices) {
    let store = services.store();
    for (index, status) in store.statuses().await.into_iter().enumerate() {
        let book = BookId::from_index(index);
        match store.product_for_book(book).await {
            Some(product) if status.is_locked() => println!(
                "{} Book {book}  ({} {})",
                status_label(status),
                product.display_name,
                product.display_price
            ),
            _ => println!("{} Book {book}", status_label(status)),
        }
    }
    if !store.questions_available().await {
        println!("No books enabled: enable one with `toggle <book>` to play.");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()).map_err(
        |e| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;

    let bank = Arc::new(load_bank(args.bank_path.as_ref()).await?);
    let catalog = BookCatalog::standard();
    let backend = Arc::new(LocalPurchaseBackend::for_catalog(&catalog));
    let mut services =
        AppServices::new(Storage::json(&args.data_dir), bank, catalog, backend).await;
    if let Some(seed) = args.seed {
        services = services.with_seed(seed);
    }
    tracing::debug!(data_dir = %args.data_dir.display(), command = ?args.command, "starting");

    match args.command {
        Command::Play => {
            let stdin = std::io::stdin();
            play::play(&mut services, stdin.lock(), std::io::stdout()).await?;
        }
        Command::Books => print_books(&services).await,
        Command::Toggle(book) => match services.store().toggle(book).await {
            Some(BookStatus::Locked) => println!("Book {book} is locked; buy it first."),
            Some(status) => println!("Book {book} is now {}", status_label(status)),
            None => println!("There is no book {book}."),
        },
        Command::Buy(book) => match services.store().purchase(book).await {
            PurchaseResult::Unlocked(book) => println!("Book {book} unlocked."),
            PurchaseResult::NotLocked => println!("You already own book {book}."),
            PurchaseResult::UnknownBook => println!("Book {book} is not for sale."),
            PurchaseResult::Unverified => println!("The purchase could not be verified."),
            PurchaseResult::Cancelled => println!("Purchase cancelled."),
            PurchaseResult::Pending => println!("Purchase pending approval."),
            PurchaseResult::Failed => println!("The store is unavailable, try again later."),
        },
        Command::Scores => {
            let [latest, previous, oldest] = services.session().recent_scores().as_array();
            println!("Recent scores: {latest}  {previous}  {oldest}");
        }
    }

    services.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_owned()), |_| None)
    }

    #[test]
    fn defaults_to_play_in_local_data_dir() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Command::Play);
        assert_eq!(args.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(args.bank_path.is_none());
        assert!(args.seed.is_none());
    }

    #[test]
    fn parses_book_commands_and_flags() {
        let args = parse(&["buy", "5", "--data-dir", "/tmp/q", "--seed", "9"]).unwrap();
        assert_eq!(args.command, Command::Buy(BookId::new(5)));
        assert_eq!(args.data_dir, PathBuf::from("/tmp/q"));
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn env_supplies_defaults_and_flags_override() {
        let env = |key: &str| match key {
            "QUIZ_DATA_DIR" => Some("/env/dir".to_owned()),
            "QUIZ_SEED" => Some("3".to_owned()),
            _ => None,
        };
        let args = Args::parse(
            ["scores", "--seed", "4"].iter().map(|s| (*s).to_owned()),
            env,
        )
        .unwrap();
        assert_eq!(args.data_dir, PathBuf::from("/env/dir"));
        assert_eq!(args.seed, Some(4));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            parse(&["toggle"]),
            Err(ArgsError::MissingBook { command: "toggle" })
        ));
        assert!(matches!(parse(&["toggle", "0"]), Err(ArgsError::InvalidBook { .. })));
        assert!(matches!(parse(&["dance"]), Err(ArgsError::UnknownArg(_))));
        assert!(matches!(
            parse(&["play", "--seed"]),
            Err(ArgsError::MissingValue { flag: "--seed" })
        ));
    }

    #[test]
    fn bundled_bank_is_valid() {
        let bank = parse_question_bank(BUNDLED_BANK).unwrap();
        assert!(!bank.is_empty());
        let catalog = BookCatalog::standard();
        assert!(
            bank.questions()
                .iter()
                .all(|q| q.book().index().is_some_and(|i| i < catalog.book_count()))
        );
    }
}
