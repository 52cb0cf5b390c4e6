//! CLI binary for edgequake-pdfclean.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CleanConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfclean::{
    clean_to_file, inspect, load_preview, load_source, CleanConfig, CleanProgressCallback,
    Operation, PdfCleanError, ProgressCallback, Threshold,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Percent bar plus one log line per cleaned page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: std::sync::Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Cleaning");
        bar.set_message("opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: std::sync::Mutex::new(None),
        })
    }
}

impl CleanProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_pages: usize) {
        self.bar.set_position(0);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Cleaning {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, percent: u8) {
        let elapsed_ms = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.set_position(percent as u64);
    }

    fn on_export_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }

    fn on_export_failed(&self, _error: &str) {
        self.bar.abandon_with_message(red("failed"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean with the default threshold (128), writes cleaned-scan.pdf
  pdfclean scan.pdf

  # Whiten more aggressively, write into a directory
  pdfclean -t 190 scan.pdf -o out/

  # Try a threshold on page 1 first
  pdfclean -t 170 --preview page1.png scan.pdf

  # Higher export resolution
  pdfclean --scale 3.0 scan.pdf -o scan-clean.pdf

  # Inspect only
  pdfclean --inspect-only --json scan.pdf

HOW IT WORKS:
  Every page is rendered at --scale (2.0 = 144 DPI). Each pixel whose mean
  of R, G and B is below the threshold becomes white; all other pixels are
  kept. The result is re-embedded as one image per page at the original
  page size. Text in the output is not selectable.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Override log filtering (e.g. edgequake_pdfclean=debug)
"#;

/// Whiten everything darker than a brightness threshold in a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdfclean",
    version,
    about = "Clean up scanned PDFs with a brightness threshold",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file.
    input: PathBuf,

    /// Output file or directory. Default: cleaned-<name> in the current directory.
    #[arg(short, long, env = "PDFCLEAN_OUTPUT")]
    output: Option<PathBuf>,

    /// Brightness threshold (0–255). Darker pixels become white.
    #[arg(short, long, env = "PDFCLEAN_THRESHOLD", default_value_t = Threshold::DEFAULT.value())]
    threshold: u8,

    /// Export render scale (1.0 = 72 DPI).
    #[arg(long, env = "PDFCLEAN_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Write the filtered page-1 preview to this PNG instead of exporting.
    #[arg(long, value_name = "PNG")]
    preview: Option<PathBuf>,

    /// Preview render scale.
    #[arg(long, env = "PDFCLEAN_PREVIEW_SCALE", default_value_t = 0.8)]
    preview_scale: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFCLEAN_PASSWORD")]
    password: Option<String>,

    /// Print stats (or inspect info) as JSON on stdout.
    #[arg(long, env = "PDFCLEAN_JSON")]
    json: bool,

    /// Print document info only, no cleaning.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFCLEAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCLEAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCLEAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    if let Err(e) = run(&cli, show_progress).await {
        let operation = if cli.preview.is_some() {
            Operation::Preview
        } else {
            Operation::Export
        };
        let message = e
            .chain()
            .find_map(|c| c.downcast_ref::<PdfCleanError>())
            .map(|err| err.user_message_for(operation))
            .unwrap_or(operation.failure_message());
        eprintln!("{} {}", red("✘"), bold(message));
        if !cli.quiet {
            eprintln!("  {}", dim(&format!("{e:#}")));
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.name);
            println!("Pages:        {}", info.page_count);
            if let Some(size) = info.first_page {
                println!(
                    "Page 1:       {:.1} x {:.1} pt",
                    size.width_points, size.height_points
                );
            }
            println!("PDF Version:  {}", info.pdf_version);
            println!("Size:         {} bytes", info.file_size);
        }
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress && cli.preview.is_none() {
        Some(CliProgressCallback::new() as Arc<dyn CleanProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;

    // ── Preview mode ─────────────────────────────────────────────────────
    if let Some(ref png_path) = cli.preview {
        let source = load_source(&cli.input).await.context("Failed to load PDF")?;
        let preview = load_preview(&source, &config)
            .await
            .context("Failed to create preview")?;
        let frame = preview
            .current_frame()
            .context("Preview render produced no frame")?;
        let png = frame.to_png().context("Failed to encode preview")?;
        tokio::fs::write(png_path, &png)
            .await
            .with_context(|| format!("Failed to write preview to {}", png_path.display()))?;

        if !cli.quiet {
            eprintln!(
                "{}  page 1 at threshold {}  {}x{} px  →  {}",
                green("✔"),
                frame.threshold,
                frame.image.width(),
                frame.image.height(),
                bold(&png_path.display().to_string()),
            );
        }
        return Ok(());
    }

    // ── Export ───────────────────────────────────────────────────────────
    let (written, stats) = clean_to_file(&cli.input, cli.output.as_deref(), &config)
        .await
        .context("Cleaning failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} pages  threshold {}  {}ms  →  {}",
            green("✔"),
            stats.total_pages,
            stats.threshold,
            stats.total_duration_ms,
            bold(&written.display().to_string()),
        );
        eprintln!(
            "   {} px whitened  /  {} bytes",
            dim(&stats.whitened_pixels.to_string()),
            dim(&stats.output_bytes.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `CleanConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CleanConfig> {
    let mut builder = CleanConfig::builder()
        .threshold(Threshold::new(cli.threshold))
        .export_scale(cli.scale)
        .preview_scale(cli.preview_scale);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
