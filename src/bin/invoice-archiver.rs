//! CLI binary for invoice-archiver.
//!
//! A thin shim over the library crate: reads the settings file, applies CLI
//! overrides, runs one pass and prints the results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice_archiver::{
    default_settings_path, ArchiveConfig, ArchiveProgressCallback, Archiver, ImageOutcome,
    ImageReport, ProgressCallback, RunSummary, SettingsFile, TokenVerification,
};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the scanned images plus one result line per image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Archiving");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ArchiveProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
    }

    fn on_image_start(&self, _index: usize, _total: usize, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_image_complete(&self, _index: usize, _total: usize, report: &ImageReport) {
        let name = report
            .image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let elapsed = dim(&format!("{:.1}s", report.duration_ms as f64 / 1000.0));

        let line = match &report.outcome {
            ImageOutcome::Archived { target } => format!(
                "  {} {}  →  {}  {}",
                green("✓"),
                name,
                bold(&target.display().to_string()),
                elapsed
            ),
            ImageOutcome::Duplicate { target } => format!(
                "  {} {}  duplicate of {}, image deleted  {}",
                yellow("≡"),
                name,
                target.display(),
                elapsed
            ),
            ImageOutcome::NoQrCode => format!(
                "  {} {}  {}  {}",
                yellow("?"),
                name,
                yellow("no QR code detected"),
                elapsed
            ),
            ImageOutcome::DecodeFailed { errors } => format!(
                "  {} {}  {}  {}",
                red("✗"),
                name,
                red(&errors
                    .first()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "QR payload rejected".into())),
                elapsed
            ),
            ImageOutcome::Failed { error } => format!(
                "  {} {}  {}  {}",
                red("✗"),
                name,
                red(&error.to_string()),
                elapsed
            ),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        print_summary(summary);
    }
}

fn print_summary(summary: &RunSummary) {
    let mark = if summary.failed + summary.decode_failed > 0 {
        red("✘")
    } else if summary.no_qr_code > 0 {
        yellow("⚠")
    } else {
        green("✔")
    };
    eprintln!(
        "{} {} archived, {} duplicate(s), {} left for review  {}",
        mark,
        bold(&summary.archived.to_string()),
        summary.duplicates,
        summary.retained(),
        dim(&format!("{}ms", summary.total_duration_ms)),
    );
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run with the settings file in the default location
  invoice-archiver

  # Use a specific settings file
  invoice-archiver --config /etc/invoice-archiver.toml

  # Override the directories for one run
  invoice-archiver --input-dir ~/Scans --save-dir ~/Invoices

  # Only accept QR tokens signed with the issuer's secret
  INVOICE_ARCHIVER_TOKEN_SECRET=... invoice-archiver

  # Machine-readable run summary
  invoice-archiver --json > run.json

SETTINGS FILE:
  [Directories]
  input_directory = "/srv/scans/in"
  save_directory = "/srv/scans/archive"

  The file is created with empty values on first run; fill in both paths and
  run again.

ENVIRONMENT VARIABLES:
  INVOICE_ARCHIVER_CONFIG        Settings file path
  INVOICE_ARCHIVER_TOKEN_SECRET  HS256 secret; enables signature verification
  PDFIUM_LIB_PATH                Path to an existing libpdfium
  RUST_LOG                       Log filter (overrides --verbose / --quiet)
"#;

/// Archive scanned invoice images as PDFs named from their QR code.
#[derive(Parser, Debug)]
#[command(
    name = "invoice-archiver",
    version,
    about = "Archive scanned invoice images as PDFs named from their QR code",
    long_about = "Reads the signed QR token printed on each scanned invoice in the input \
directory, and files the image as <DocNo>_<DocDt>.pdf in the save directory. Scans whose \
PDF already exists are deleted as duplicates; scans without a readable QR code are left in \
place.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Settings file (TOML with a [Directories] table).
    #[arg(short, long, env = "INVOICE_ARCHIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Override input_directory from the settings file.
    #[arg(long, env = "INVOICE_ARCHIVER_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Override save_directory from the settings file.
    #[arg(long, env = "INVOICE_ARCHIVER_SAVE_DIR")]
    save_dir: Option<PathBuf>,

    /// Verify QR token signatures with this HS256 secret.
    #[arg(
        long,
        env = "INVOICE_ARCHIVER_TOKEN_SECRET",
        hide_env_values = true,
        long_help = "Shared HS256 secret of the invoice issuer. When set, tokens whose \
          signature does not match are rejected and their images left in place.\n\
          When unset, token signatures are not checked."
    )]
    verify_secret: Option<String>,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar; log every event instead.
    #[arg(long, env = "INVOICE_ARCHIVER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active, per-image INFO events would duplicate
    // the result lines the bar prints.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    // ── Settings ─────────────────────────────────────────────────────────
    let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
    let created = !settings_path.exists();
    let settings = SettingsFile::load_or_create(&settings_path)
        .context("Failed to load configuration")?;
    if created && !cli.quiet {
        eprintln!(
            "{} Created configuration file {}; set input_directory and save_directory.",
            yellow("⚠"),
            bold(&settings_path.display().to_string())
        );
    }

    let config = build_config(&cli, &settings);

    // ── Run ──────────────────────────────────────────────────────────────
    // The bar is only drawn once the configuration has been accepted.
    let mut archiver = Archiver::new(config).context("Cannot start archive run")?;
    if show_progress {
        let progress: ProgressCallback = CliProgressCallback::new();
        archiver = archiver.with_progress_callback(progress);
    }
    let summary = archiver.run().context("Archive run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet && !show_progress {
        print_summary(&summary);
    }

    Ok(())
}

/// Map settings and CLI overrides to `ArchiveConfig`.
fn build_config(cli: &Cli, settings: &SettingsFile) -> ArchiveConfig {
    let mut builder = ArchiveConfig::builder().settings(settings);

    if let Some(ref dir) = cli.input_dir {
        builder = builder.input_directory(dir);
    }
    if let Some(ref dir) = cli.save_dir {
        builder = builder.save_directory(dir);
    }
    if let Some(secret) = cli.verify_secret.clone().filter(|s| !s.is_empty()) {
        builder = builder.verification(TokenVerification::Hs256 { secret });
    }
    builder.build()
}
