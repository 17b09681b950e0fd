use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use course_core::model::{Catalog, UserId};
use services::{Clock, CourseApi};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CATALOG_ENV: &str = "QA_COURSE_CATALOG";
const USER_ID_ENV: &str = "QA_COURSE_USER_ID";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidCatalogPath { raw: String },
    InvalidEnv { name: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidCatalogPath { raw } => write!(f, "invalid --catalog value: {raw}"),
            ArgsError::InvalidEnv { name, raw } => write!(f, "invalid {name} value: {raw:?}"),
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
    eprintln!("  cargo run -p app -- serve   [--catalog <path>] [--user-id <id>]");
    eprintln!("  cargo run -p app -- catalog [--catalog <path>]");
    eprintln!();
    eprintln!("serve reads one JSON request per line on stdin and answers on stdout.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --catalog <built-in course>");
    eprintln!("  --user-id 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {CATALOG_ENV}, {USER_ID_ENV}, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Catalog,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "catalog" => Some(Self::Catalog),
            _ => None,
        }
    }
}

/// Runtime settings: environment first, flags override.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AppConfig {
    catalog_path: Option<PathBuf>,
    user_id: UserId,
}

impl AppConfig {
    fn from_env() -> Result<Self, ArgsError> {
        Self::from_vars(
            std::env::var(CATALOG_ENV).ok(),
            std::env::var(USER_ID_ENV).ok(),
        )
    }

    fn from_vars(catalog: Option<String>, user_id: Option<String>) -> Result<Self, ArgsError> {
        let catalog_path = catalog
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let user_id = match user_id {
            Some(raw) => parse_user_id(&raw).ok_or(ArgsError::InvalidEnv {
                name: USER_ID_ENV,
                raw,
            })?,
            None => UserId::new(1),
        };
        Ok(Self {
            catalog_path,
            user_id,
        })
    }

    fn parse(mut self, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--catalog" => {
                    let value = require_value(args, "--catalog")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidCatalogPath { raw: value });
                    }
                    self.catalog_path = Some(PathBuf::from(value));
                }
                "--user-id" => {
                    let value = require_value(args, "--user-id")?;
                    self.user_id = parse_user_id(&value)
                        .ok_or_else(|| ArgsError::InvalidUserId { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(self)
    }
}

fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.parse::<UserId>().ok().filter(|id| id.value() > 0)
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Catalog::from_json(&json).map_err(course_core::Error::from)?
        }
        None => Catalog::builtin().map_err(course_core::Error::from)?,
    };
    Ok(catalog)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        // stdout carries responses, so logs go to stderr
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_catalog(catalog: &Catalog) {
    for module in catalog.modules() {
        let quiz = module.quiz().map_or_else(
            || "no quiz".to_string(),
            |quiz| {
                format!(
                    "{} questions, pass at {}%",
                    quiz.questions.len(),
                    quiz.passing_score
                )
            },
        );
        println!(
            "{:>2}  {}  ({}; {quiz})",
            module.id.value(),
            module.title,
            module.duration
        );
    }
}

async fn serve(api: CourseApi) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = api.handle_json(&line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    info!("stdin closed, shutting down");
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means serve.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let config = AppConfig::from_env()
        .and_then(|config| config.parse(&mut argv.into_iter()))
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    let catalog = load_catalog(config.catalog_path.as_ref())?;

    match cmd {
        Command::Catalog => {
            print_catalog(&catalog);
            Ok(())
        }
        Command::Serve => {
            info!(
                modules = catalog.len(),
                user_id = %config.user_id,
                custom_catalog = config.catalog_path.is_some(),
                "course api ready"
            );
            let storage = Storage::in_memory();
            let api = CourseApi::new(
                &storage,
                Arc::new(catalog),
                Clock::system(),
                config.user_id,
            );
            serve(api).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
