use std::fmt;
use std::path::PathBuf;

use services::{AppServices, DataDir, LoadReport, SourceOutcome, StoreMode};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod session;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDataDir { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDataDir { raw } => write!(f, "invalid --data-dir value: {raw:?}"),
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
    eprintln!("  tracker load    [--data-dir <dir>]   rebuild lists from <dir>/raw/*.csv");
    eprintln!("  tracker session [--data-dir <dir>]   interactive tracker (default)");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --data-dir ./data");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRACKER_DATA_DIR, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Load,
    Session,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "load" => Some(Self::Load),
            "session" => Some(Self::Session),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Help,
    Run { command: Command, data_dir: Option<PathBuf> },
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<Parsed, ArgsError> {
    let mut args = argv.into_iter().peekable();

    // No subcommand (or only flags) means `session`.
    let command = match args.peek().map(String::as_str) {
        None => Command::Session,
        Some(first) if first.starts_with('-') => Command::Session,
        Some(first) => {
            let command = Command::from_arg(first)
                .ok_or_else(|| ArgsError::UnknownCommand(first.to_string()))?;
            args.next();
            command
        }
    };

    let mut data_dir = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => {
                let value = require_value(&mut args, "--data-dir")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDataDir { raw: value });
                }
                data_dir = Some(PathBuf::from(value));
            }
            "--help" | "-h" => return Ok(Parsed::Help),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    Ok(Parsed::Run { command, data_dir })
}

fn init_tracing() {
    // Logs go to stderr so session output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_load_report(report: &LoadReport) {
    for source in &report.sources {
        match source {
            SourceOutcome::Loaded {
                list,
                entries,
                skipped_rows,
                duplicates,
            } => println!(
                "loaded  {:<24} {entries:>5} problems ({skipped_rows} skipped, {duplicates} duplicates)",
                list.as_str()
            ),
            SourceOutcome::Skipped { list, reason } => {
                println!("skipped {:<24} {reason}", list.as_str());
            }
        }
    }
    println!();
    for count in &report.counts {
        println!("{:<24} {:>6} rows", count.table, count.rows);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (command, data_dir) = match parse_args(std::env::args().skip(1))? {
        Parsed::Help => {
            print_usage();
            return Ok(());
        }
        Parsed::Run { command, data_dir } => (command, data_dir),
    };

    init_tracing();
    let data = DataDir::from_env(data_dir);
    info!(data_dir = %data.root().display(), ?command, "starting");

    match command {
        Command::Load => {
            let app = AppServices::open(&data, StoreMode::Create).await?;
            let report = app.loader().run().await;
            app.close().await;
            print_load_report(&report?);
        }
        Command::Session => {
            let app = AppServices::open(&data, StoreMode::RequireExisting).await?;
            let tracker = app.tracker();
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let result = session::run(&tracker, input, tokio::io::stdout()).await;
            app.close().await;
            result?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        if err.is::<ArgsError>() {
            print_usage();
        }
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn defaults_to_session() {
        assert_eq!(
            parse_args(args(&[])).unwrap(),
            Parsed::Run {
                command: Command::Session,
                data_dir: None
            }
        );
        assert_eq!(
            parse_args(args(&["--data-dir", "/tmp/x"])).unwrap(),
            Parsed::Run {
                command: Command::Session,
                data_dir: Some(PathBuf::from("/tmp/x"))
            }
        );
    }

    #[test]
    fn load_with_data_dir() {
        assert_eq!(
            parse_args(args(&["load", "--data-dir", "d"])).unwrap(),
            Parsed::Run {
                command: Command::Load,
                data_dir: Some(PathBuf::from("d"))
            }
        );
        assert_eq!(parse_args(args(&["load", "-h"])).unwrap(), Parsed::Help);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            parse_args(args(&["seed"])).unwrap_err(),
            ArgsError::UnknownCommand(_)
        ));
        assert!(matches!(
            parse_args(args(&["load", "--data-dir"])).unwrap_err(),
            ArgsError::MissingValue { .. }
        ));
        assert!(matches!(
            parse_args(args(&["session", "--verbose"])).unwrap_err(),
            ArgsError::UnknownArg(_)
        ));
        assert!(matches!(
            parse_args(args(&["load", "--data-dir", " "])).unwrap_err(),
            ArgsError::InvalidDataDir { .. }
        ));
    }

    #[test]
    fn argument_errors_are_distinguished_from_runtime_errors() {
        let err: Box<dyn std::error::Error> = parse_args(args(&["seed"])).unwrap_err().into();
        assert!(err.is::<ArgsError>());
        assert_eq!(err.to_string(), "unknown command: seed");

        let err: Box<dyn std::error::Error> = std::io::Error::other("closed").into();
        assert!(!err.is::<ArgsError>());
    }
}
