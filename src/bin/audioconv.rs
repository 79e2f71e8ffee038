//! CLI binary for audioconv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, runs one conversion session, and prints the result.

use anyhow::{Context, Result};
use audioconv::pipeline::download;
use audioconv::{
    validate, AudioFile, ClientConfig, ClientError, CompletedConversion, ConversionSummary,
    HttpConversionApi, SessionController, SessionError, SessionObserver, TaskId,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while uploading, then a 0–100 % bar while
/// the server converts.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Switch to the percentage bar once the server accepted the task.
    fn activate_bar(&self) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.set_position(10);
    }
}

impl SessionObserver for CliObserver {
    fn on_upload_start(&self, file_name: &str, size: u64) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!(
            "{file_name} {}",
            dim(&audioconv::format_file_size(size))
        ));
    }

    fn on_task_accepted(&self, task_id: &TaskId) {
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Task {task_id} accepted"))));
        self.activate_bar();
    }

    fn on_progress(&self, _task_id: &TaskId, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_complete(&self, _task_id: &TaskId, _summary: &ConversionSummary) {
        self.bar.set_position(100);
        self.bar.finish_and_clear();
    }

    fn on_error(&self, _error: &SessionError) {
        self.bar.finish_and_clear();
    }

    fn on_reset(&self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert and print the download link
  audioconv voicemail.mp3

  # Convert and save the mono 8 kHz WAV
  audioconv voicemail.mp3 -o voicemail_8k.wav

  # Talk to a remote service
  audioconv --server https://convert.example.com interview.wav -o out.wav

  # Check a file locally without uploading it
  audioconv --check-only recording.wav

  # Machine-readable summary
  audioconv --json take.wav

VALIDATION:
  Accepted media types: audio/mpeg, audio/wav, audio/x-wav, audio/mp3
  Accepted extensions:  .mp3, .wav (used when --content-type is absent or not recognised)
  Size:                 1 byte to 100 MiB

ENVIRONMENT VARIABLES:
  AUDIOCONV_SERVER        Service base URL
  AUDIOCONV_OUTPUT        Default output path
  RUST_LOG                Override log filtering (e.g. audioconv=debug)

Press Ctrl-C while converting to cancel. The server is not notified.
"#;

/// Upper bound for `--max-size-mib`.
const MAX_SIZE_MIB: u64 = 1024 * 1024;

/// Convert MP3/WAV files to mono 8 kHz 16-bit WAV via a conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "audioconv",
    version,
    about = "Convert MP3/WAV files to mono 8 kHz 16-bit WAV via a conversion service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local MP3 or WAV file.
    input: PathBuf,

    /// Conversion service base URL.
    #[arg(short, long, env = "AUDIOCONV_SERVER", default_value = audioconv::config::DEFAULT_BASE_URL)]
    server: String,

    /// Save the converted file here.
    #[arg(short, long, env = "AUDIOCONV_OUTPUT")]
    output: Option<PathBuf>,

    /// Declared media type of the input (e.g. audio/mpeg).
    #[arg(long, env = "AUDIOCONV_CONTENT_TYPE")]
    content_type: Option<String>,

    /// Delay between status requests in milliseconds.
    #[arg(long, env = "AUDIOCONV_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Largest accepted input in MiB (at most 1048576, i.e. 1 TiB).
    #[arg(long, env = "AUDIOCONV_MAX_SIZE_MIB", default_value_t = 100,
          value_parser = clap::value_parser!(u64).range(1..=MAX_SIZE_MIB))]
    max_size_mib: u64,

    /// Upload timeout in seconds.
    #[arg(long, env = "AUDIOCONV_UPLOAD_TIMEOUT", default_value_t = 300)]
    upload_timeout: u64,

    /// Per-request status timeout in seconds.
    #[arg(long, env = "AUDIOCONV_STATUS_TIMEOUT", default_value_t = 30)]
    status_timeout: u64,

    /// Download timeout in seconds.
    #[arg(long, env = "AUDIOCONV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Validate the file locally and exit; nothing is uploaded.
    #[arg(long)]
    check_only: bool,

    /// Print the completion summary as JSON.
    #[arg(long, env = "AUDIOCONV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "AUDIOCONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AUDIOCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "AUDIOCONV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Describe input ───────────────────────────────────────────────────
    let mut file = AudioFile::from_path(&cli.input)
        .await
        .context("Failed to open input")?;
    if let Some(ref ct) = cli.content_type {
        file = file.with_media_type(ct);
    }

    // ── Check-only mode ──────────────────────────────────────────────────
    if cli.check_only {
        validate(Some(&file.meta()), max_size_bytes(&cli)?).context("File rejected")?;
        if !cli.quiet {
            println!(
                "{} {}  {}",
                green("✔"),
                bold(file.name()),
                dim(&audioconv::format_file_size(file.size()))
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let observer = show_progress.then(CliObserver::new);
    let config = build_config(&cli, observer)?;
    let api = Arc::new(HttpConversionApi::new(&config).context("Failed to create HTTP client")?);
    let controller = SessionController::new(api.clone(), config.clone());

    // ── Run session (Ctrl-C cancels) ─────────────────────────────────────
    let outcome = tokio::select! {
        outcome = controller.run(file) => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel();
            Err(ClientError::Cancelled)
        }
    };

    let done = match outcome {
        Ok(done) => done,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{} {}", red("✘"), e);
            }
            return Err(anyhow::Error::new(e).context("Conversion failed"));
        }
    };

    // ── Optional download ────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let bytes = download::save_to_file(
            api.client(),
            &done.download_url,
            output_path,
            config.download_timeout_secs,
        )
        .await
        .context("Failed to save converted file")?;

        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {}  →  {}",
                green("✔"),
                dim(&audioconv::format_file_size(bytes)),
                bold(&output_path.display().to_string()),
            );
        }
    }

    print_outcome(&cli, &controller, &done)?;
    Ok(())
}

fn max_size_bytes(cli: &Cli) -> Result<u64> {
    cli.max_size_mib
        .checked_mul(1024 * 1024)
        .context("--max-size-mib is too large")
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, observer: Option<Arc<CliObserver>>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(cli.server.clone())
        .poll_interval_ms(cli.poll_interval_ms)
        .max_file_size(max_size_bytes(cli)?)
        .upload_timeout_secs(cli.upload_timeout)
        .status_timeout_secs(cli.status_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ob) = observer {
        builder = builder.observer(ob as Arc<dyn SessionObserver>);
    }

    builder.build().context("Invalid configuration")
}

fn print_outcome(cli: &Cli, controller: &SessionController, done: &CompletedConversion) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(done).context("Failed to serialise summary")?;
        println!("{json}");
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    println!("{} {}", green("✔"), bold("Conversion complete"));
    if let Some(info) = controller.view().file_info {
        for line in info.lines() {
            println!("   {line}");
        }
    }
    println!("   Download: {}", done.download_url);
    Ok(())
}
