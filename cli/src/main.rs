use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tgocr::config::{default_config_path, load_settings, validate_settings, Settings, SettingsOverrides};
use tgocr::pipeline::{BarProgress, NoopProgress, ProgressReporter, RunController, RunOptions, RunSummary};
use tgocr::processor::OcrProcessor;
use tgocr::records::open_store;
use tgocr::sanitize::redact_path;
use tgocr::secrets::resolve_secret;
use tgocr::telegram::{GroupRef, LoginPrompt, TelegramCredentials, TelegramSession};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Scan a Telegram group for images, OCR them, and append the text to a spreadsheet.
#[derive(Debug, Parser)]
#[command(name = "tgocr", version, about)]
struct Args {
    /// Group to scan: @username, username, t.me link or numeric chat id
    #[arg(short, long)]
    group: Option<String>,

    /// Telegram API id from my.telegram.org
    #[arg(long, env = "TELEGRAM_API_ID")]
    api_id: Option<i32>,

    /// Telegram API hash. Falls back to --api-hash-file, then $TELEGRAM_API_HASH
    #[arg(long)]
    api_hash: Option<String>,

    /// File containing the Telegram API hash
    #[arg(long)]
    api_hash_file: Option<String>,

    /// Phone number used for the first login
    #[arg(long, env = "TELEGRAM_PHONE")]
    phone: Option<String>,

    /// Session file [default: tgocr.session]
    #[arg(long)]
    session: Option<PathBuf>,

    /// Maximum number of images to process; 0 means no limit
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output spreadsheet, .xlsx or .csv [default: parsed_data.xlsx]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR languages, e.g. `ukr rus` or `uk ru en` [default: ukr rus]
    #[arg(long, num_args = 1..)]
    languages: Option<Vec<String>>,

    /// Resolution hint passed to Tesseract [default: 300]
    #[arg(long)]
    dpi: Option<u32>,

    /// Stop at this message id; it and older messages are not processed
    #[arg(long)]
    start_from_id: Option<i32>,

    /// Only scan messages older than this id
    #[arg(long)]
    before_id: Option<i32>,

    /// Settings file (.json, .yaml or .yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            group: self.group.clone(),
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            api_hash_file: self.api_hash_file.clone(),
            phone: self.phone.clone(),
            session_file: self.session.clone(),
            languages: self.languages.clone(),
            dpi: self.dpi,
            output: self.output.clone(),
            limit: self.limit,
            start_from_id: self.start_from_id,
            before_id: self.before_id,
        }
    }
}

/// Reads login answers from the terminal.
struct StdinPrompt;

impl StdinPrompt {
    fn ask(&self, question: &str) -> std::io::Result<String> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{}", question)?;
        stderr.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl LoginPrompt for StdinPrompt {
    fn phone(&self) -> std::io::Result<String> {
        self.ask("Phone number (international format): ")
    }

    fn code(&self) -> std::io::Result<String> {
        self.ask("Login code: ")
    }

    fn password(&self, hint: Option<&str>) -> std::io::Result<String> {
        match hint {
            Some(hint) => self.ask(&format!("Two-step verification password (hint: {}): ", hint)),
            None => self.ask("Two-step verification password: "),
        }
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        ),
    }
    .context("failed to install tracing subscriber")?;

    // The Telegram layer logs through `log`.
    tracing_log::LogTracer::init().context("failed to bridge log records")?;
    Ok(())
}

fn load_effective_settings(args: &Args) -> Result<Settings> {
    let config_path = args.config.clone().or_else(default_config_path);

    let settings = match config_path {
        Some(path) => {
            info!("Loading settings from {}", redact_path(&path));
            load_settings(&path)?
        }
        None => Settings::default(),
    };

    let settings = settings.apply(args.overrides());
    validate_settings(&settings)?;
    Ok(settings)
}

fn print_summary(summary: &RunSummary, as_json: bool) -> Result<()> {
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("failed to serialize summary")?
        );
        return Ok(());
    }

    println!("Group:              {}", summary.chat);
    println!("Messages examined:  {}", summary.messages_examined);
    println!("Images found:       {}", summary.images_found);
    println!("Images processed:   {}", summary.images_processed);
    println!("Already present:    {}", summary.skipped_present);
    println!("Rows written:       {}", summary.records_written);
    if !summary.failed_ids.is_empty() {
        let ids: Vec<String> = summary.failed_ids.iter().map(|id| id.to_string()).collect();
        println!("Failed messages:    {}", ids.join(", "));
    }
    println!("Stopped because:    {:?}", summary.stop_reason);
    Ok(())
}

/// Sets `flag` on the first Ctrl-C so the scan can save and stop; a second one exits at once.
fn install_interrupt_handler(flag: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("Stopping after the current message, press Ctrl-C again to abort");
    });
    if let Err(e) = result {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }
}

async fn run(args: Args) -> Result<RunSummary> {
    let settings = load_effective_settings(&args)?;

    let group = settings
        .group
        .as_deref()
        .ok_or_else(|| anyhow!("no group given (pass --group or set `group` in the config file)"))?;
    let group = GroupRef::parse(group)?;

    // Loaded before connecting so a bad output file fails ahead of the login prompt.
    let store = open_store(&settings.output.path)?;
    let existing = store.load()?;
    info!(
        "Output file {} has {} rows",
        redact_path(store.path()),
        existing.len()
    );

    let ocr = OcrProcessor::new(&settings.ocr.languages, settings.ocr.dpi);
    ocr.verify()?;
    info!("OCR languages: {} at {} dpi", ocr.languages(), ocr.dpi());

    let api_id = settings
        .telegram
        .api_id
        .ok_or_else(|| anyhow!("Telegram API id is required (pass --api-id or set TELEGRAM_API_ID)"))?;
    let api_hash = resolve_secret(
        settings.telegram.api_hash_insecure.as_deref(),
        settings.telegram.api_hash_file.as_deref(),
        settings.telegram.api_hash_env_var.as_deref(),
    )
    .context("Telegram API hash is required (pass --api-hash, --api-hash-file or set TELEGRAM_API_HASH)")?;

    let credentials = TelegramCredentials {
        api_id,
        api_hash,
        phone: settings.telegram.phone.clone(),
        session_file: settings.telegram.session_file.clone(),
    };

    let session = TelegramSession::open(&credentials, &StdinPrompt).await?;

    let result = async {
        let resolved = session.resolve_group(&group).await?;
        let options = RunOptions::from_settings(&settings);
        let mut messages = session.messages(&resolved, options.before_id);

        let progress: Box<dyn ProgressReporter> = if args.no_progress || args.json {
            Box::new(NoopProgress)
        } else {
            Box::new(BarProgress::new())
        };

        let controller = RunController::new(Arc::new(ocr), options);
        install_interrupt_handler(controller.interrupt_flag());
        let summary = controller
            .run_with_existing(&mut messages, store.as_ref(), existing, progress.as_ref())
            .await?;
        Ok::<_, anyhow::Error>(summary)
    }
    .await;

    if let Err(e) = session.close() {
        warn!("{}", e);
    }

    result
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_format) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let as_json = args.json;
    match runtime.block_on(run(args)) {
        Ok(summary) => {
            if let Err(e) = print_summary(&summary, as_json) {
                error!("{:#}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_overrides() {
        let args = Args::try_parse_from([
            "tgocr",
            "--group",
            "@somegroup",
            "--limit",
            "0",
            "--languages",
            "uk",
            "en",
            "--start-from-id",
            "100",
            "--output",
            "out.csv",
        ])
        .unwrap();

        let settings = Settings::default().apply(args.overrides());
        assert_eq!(settings.group.as_deref(), Some("@somegroup"));
        assert_eq!(settings.scan.effective_limit(), None);
        assert_eq!(settings.ocr.languages, vec!["uk", "en"]);
        assert_eq!(settings.scan.start_from_id, Some(100));
        assert_eq!(settings.output.path, PathBuf::from("out.csv"));
    }

    #[test]
    fn test_unset_flags_keep_defaults() {
        let args = Args::try_parse_from(["tgocr", "-g", "somegroup"]).unwrap();
        let settings = Settings::default().apply(args.overrides());
        assert_eq!(settings.ocr.languages, vec!["ukr", "rus"]);
        assert_eq!(settings.output.path, PathBuf::from("parsed_data.xlsx"));
        assert!(!args.json);
    }
}
