//! CLI entry point for `mailreader`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};

use mailreader::client::MailReader;
use mailreader::config::{self, LoggingConfig};
use mailreader::search::SearchCriteria;

#[derive(Parser)]
#[command(
    name = "mailreader",
    version,
    about = "Read an IMAP mailbox once: log plain-text bodies and save attachments"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (default: $MAILREADER_SETTINGS, then ./settings.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Raw IMAP SEARCH criteria, e.g. '(SUBJECT "Hello")'
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["since", "from", "subject", "unseen"])]
    criteria: Option<String>,

    /// Only messages sent on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    since: Option<NaiveDate>,

    /// Only messages from this sender
    #[arg(long, value_name = "ADDRESS")]
    from: Option<String>,

    /// Only messages whose subject contains this text
    #[arg(long, value_name = "TEXT")]
    subject: Option<String>,

    /// Only unseen messages
    #[arg(long)]
    unseen: bool,

    /// Print the run summary as JSON instead of "Done"
    #[arg(long)]
    json: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        None => {}
    }

    let settings_path = config::settings_file_path(cli.settings.as_deref());

    let logging = config::load_logging_config(&settings_path);
    let log_level = match cli.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &logging);

    cmd_run(&cli, &settings_path)
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, logging: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match log_file_dir(logging) {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::never(log_dir, "mailreader.log");
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }
}

/// Directory for the log file, created if needed.
///
/// `None` when file logging is off or the directory cannot be created.
fn log_file_dir(logging: &LoggingConfig) -> Option<&Path> {
    let log_dir = logging.dir.as_deref()?;
    match std::fs::create_dir_all(log_dir) {
        Ok(()) => Some(log_dir),
        Err(e) => {
            eprintln!(
                "Cannot create log directory {}, logging to stderr only: {e}",
                log_dir.display()
            );
            None
        }
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailreader", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    man.render(&mut std::io::stdout())?;
    Ok(())
}

/// Run one full pass over the configured mailbox.
fn cmd_run(cli: &Cli, settings_path: &Path) -> anyhow::Result<()> {
    let mut reader_config = config::load_reader_config(settings_path)?;
    if let Some(criteria) = search_override(cli) {
        reader_config.search = criteria;
    }

    let mut reader = MailReader::new(reader_config)?;
    let summary = reader.process()?;

    tracing::info!(
        messages = summary.messages,
        bodies = summary.bodies_logged,
        attachments = summary.attachments_saved,
        "Finished"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Done");
    }
    Ok(())
}

/// Search criteria from the command line, if any were given.
fn search_override(cli: &Cli) -> Option<String> {
    if let Some(raw) = &cli.criteria {
        return Some(raw.clone());
    }

    let mut criteria = SearchCriteria::all();
    if let Some(date) = cli.since {
        criteria = criteria.since(date);
    }
    if let Some(from) = &cli.from {
        criteria = criteria.from_address(from);
    }
    if let Some(subject) = &cli.subject {
        criteria = criteria.subject(subject);
    }
    if cli.unseen {
        criteria = criteria.unseen();
    }

    if criteria.keys().is_empty() {
        None
    } else {
        Some(criteria.to_string())
    }
}
