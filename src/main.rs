//! CLI entry point for `mailnorm`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use serde::Serialize;

use mailnorm::config::{self, Config};
use mailnorm::export::attachment::save_attachments;
use mailnorm::model::envelope::{InputFormat, MessageEnvelope};
use mailnorm::normalize::normalize;
use mailnorm::source::{resolve_attachments, DirectorySource, MessageSource, Session};
use mailnorm::summary::{summarize, SummaryOptions};

/// Account name used for the local, file-backed source.
const LOCAL_ACCOUNT: &str = "local";

#[derive(Parser)]
#[command(
    name = "mailnorm",
    version,
    about = "Normalize Gmail API messages into a canonical JSON record"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Input format: auto, full (structured payload) or raw (RFC 822)
    #[arg(long, global = true, value_name = "FORMAT")]
    format: Option<InputFormat>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a message (.json envelope or raw .eml) and print it as JSON
    Parse {
        path: PathBuf,
        /// Single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Print subject, sender, recipients and body of a message
    Summary {
        path: PathBuf,
        /// Convert an HTML-only body to plain text
        #[arg(long)]
        strip_html: bool,
        #[arg(long)]
        json: bool,
    },
    /// List the most recent messages in a directory of envelopes
    List {
        dir: PathBuf,
        #[arg(short = 'n', long, default_value_t = 20)]
        max_results: usize,
        /// Only messages carrying all of these label ids
        #[arg(short, long, value_delimiter = ',')]
        labels: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Save the attachments of a message to a directory
    Attachments {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Envelope directory to fetch non-inlined attachment bytes from
        #[arg(long, value_name = "DIR")]
        source_dir: Option<PathBuf>,
    },
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

    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let format = cli.format.unwrap_or(config.normalize.default_format);

    match cli.command {
        Commands::Parse { path, compact } => cmd_parse(&path, format, !compact && config.output.pretty),
        Commands::Summary {
            path,
            strip_html,
            json,
        } => {
            let mut options = config.summary.options();
            options.strip_html |= strip_html;
            cmd_summary(&path, format, &options, json, config.output.pretty)
        }
        Commands::List {
            dir,
            max_results,
            labels,
            json,
        } => cmd_list(&dir, format, max_results, &labels, json, config.output.pretty),
        Commands::Attachments {
            path,
            output,
            source_dir,
        } => cmd_attachments(&path, format, &output, source_dir.as_deref()),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailnorm.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailnorm", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Read a message file: `.json` is an API envelope, anything else raw RFC 822.
fn load_envelope(path: &Path) -> anyhow::Result<MessageEnvelope> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        return Ok(MessageEnvelope::from_path(path)?);
    }

    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("message");
    Ok(MessageEnvelope::from_raw_bytes(id, id, &bytes))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

/// Normalize one message and print the canonical record.
fn cmd_parse(path: &Path, format: InputFormat, pretty: bool) -> anyhow::Result<()> {
    let envelope = load_envelope(path)?;
    let message = normalize(&envelope, format)?;
    print_json(&message, pretty)
}

/// Print a short summary of one message.
fn cmd_summary(
    path: &Path,
    format: InputFormat,
    options: &SummaryOptions,
    json: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let envelope = load_envelope(path)?;
    let summary = summarize(&normalize(&envelope, format)?, options);

    if json {
        return print_json(&summary, pretty);
    }

    println!();
    println!("  {:<10} {}", "Subject", summary.subject);
    println!("  {:<10} {}", "From", summary.from);
    println!("  {:<10} {}", "To", summary.to.join(", "));
    if !summary.cc.is_empty() {
        println!("  {:<10} {}", "Cc", summary.cc.join(", "));
    }
    println!();
    println!("{}", summary.body);
    Ok(())
}

/// List recent messages from an envelope directory.
fn cmd_list(
    dir: &Path,
    format: InputFormat,
    max_results: usize,
    labels: &[String],
    json: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let source = DirectorySource::open(dir)?;
    let session = Session::new(LOCAL_ACCOUNT, "");
    let ids = source.list_message_ids(&session, max_results, labels)?;

    let mut messages = Vec::with_capacity(ids.len());
    for id in &ids {
        let envelope = match source.fetch_message(&session, id, format) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Could not fetch message, skipping");
                continue;
            }
        };
        match normalize(&envelope, format) {
            Ok(message) => messages.push(message),
            Err(e) => tracing::warn!(id = %id, error = %e, "Skipping message"),
        }
    }

    if json {
        return print_json(&messages, pretty);
    }

    println!();
    println!("  {} message(s)", messages.len());
    println!();
    if messages.is_empty() {
        return Ok(());
    }

    println!(
        "  {:<18} {:<26} {:<25} {:<40} {:>5}",
        "Id", "Date", "From", "Subject", "Att."
    );
    println!("  {}", "-".repeat(118));

    for msg in &messages {
        let id: String = msg.message_id.chars().take(17).collect();
        let date: String = msg.date.as_deref().unwrap_or("").chars().take(25).collect();
        let from: String = msg.from.chars().take(24).collect();
        let subject: String = msg.subject.chars().take(39).collect();
        println!(
            "  {:<18} {:<26} {:<25} {:<40} {:>5}",
            id,
            date,
            from,
            subject,
            msg.attachments.len()
        );
    }
    println!();
    Ok(())
}

/// Save a message's attachments, fetching remote ones from `source_dir`.
fn cmd_attachments(
    path: &Path,
    format: InputFormat,
    output: &Path,
    source_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let envelope = load_envelope(path)?;
    let mut message = normalize(&envelope, format)?;

    if message.attachments.is_empty() {
        println!("  No attachments found.");
        return Ok(());
    }

    if let Some(dir) = source_dir {
        let source = DirectorySource::open(dir)?;
        let report = resolve_attachments(&mut message, &Session::new(LOCAL_ACCOUNT, ""), &source);
        if !report.is_complete() {
            eprintln!(
                "  Could not fetch {} attachment(s): {}",
                report.failed.len(),
                report.failed.join(", ")
            );
        }
    }

    let pending = message.pending_attachments().count();
    if pending > 0 && source_dir.is_none() {
        eprintln!("  {pending} attachment(s) are not inlined; pass --source-dir to fetch them");
    }

    let paths = save_attachments(&message, output)?;

    println!();
    for path in &paths {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!("  {:>10}  {}", format_size(size, BINARY), path.display());
    }
    println!();
    println!(
        "  Saved {} attachment(s) to {}",
        paths.len(),
        output.display()
    );

    Ok(())
}
