//! CLI binary for pdf2xml.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig` and prints the resulting XML.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2xml::convert::write_atomic;
use pdf2xml::pipeline::extract::is_pdf;
use pdf2xml::upload::PDF_MIME_TYPE;
use pdf2xml::{
    validate_mime_type, validate_upload_size, ConversionProgressCallback, ConversionRecord,
    ConversionRequest, ConversionResult, ConversionStatus, ConversionStore, Converter,
    ConverterConfig, MemoryStore, PipelineState, ProgressCallback, StoreConfig, StructureLevel,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit status when the conversion ran but ended in `Failed`.
const EXIT_CONVERSION_FAILED: u8 = 2;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing which pipeline stage the conversion is in.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_state(&self, state: PipelineState) {
        self.bar.set_message(state.to_string());
    }

    fn on_stage_error(&self, state: PipelineState, error: &str) {
        self.bar
            .println(format!("  {} {}  {}", red("✗"), bold(&state.to_string()), red(error)));
    }

    fn on_conversion_complete(&self, status: ConversionStatus, xml_len: usize) {
        self.bar.finish_and_clear();
        match status {
            ConversionStatus::Completed => {
                eprintln!("{} converted  ({xml_len} bytes of XML)", green("✔"))
            }
            ConversionStatus::Failed => eprintln!("{} conversion failed", red("✘")),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  pdf2xml https://example.com/report.pdf

  # Sections detected from headings, written to a file
  pdf2xml --structure advanced https://example.com/report.pdf -o report.xml

  # Convert a local file (applies the upload checks)
  pdf2xml --file document.pdf

  # JSON record with status and XML
  pdf2xml --json https://example.com/report.pdf > record.json

ENVIRONMENT VARIABLES:
  PDF2XML_STORE_CLOUD_NAME   Content-store cloud name
  PDF2XML_STORE_API_KEY      Content-store API key
  PDF2XML_STORE_API_SECRET   Content-store API secret

  With all three set, URLs pointing into the content store are fetched
  through a signed, time-limited download URL. Other URLs are fetched as is.

EXIT STATUS:
  0  conversion completed
  1  configuration or I/O error
  2  conversion failed (the fallback XML is still written)
"#;

/// Convert PDF files and URLs to structured XML.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2xml",
    version,
    about = "Convert PDF files and URLs to structured XML",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS URL, or a local path with --file.
    source: String,

    /// Structure level: basic (paragraphs) or advanced (sections).
    #[arg(long, env = "PDF2XML_STRUCTURE", default_value = "basic")]
    structure: StructureLevel,

    /// Write XML to this file instead of stdout.
    #[arg(short, long, env = "PDF2XML_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the stored conversion record as JSON instead of the XML.
    #[arg(long, env = "PDF2XML_JSON")]
    json: bool,

    /// Treat SOURCE as a local PDF file.
    #[arg(long)]
    file: bool,

    /// Owner recorded on the conversion record.
    #[arg(long, env = "PDF2XML_OWNER", default_value = "local")]
    owner: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2XML_TIMEOUT", default_value_t = pdf2xml::config::DEFAULT_FETCH_TIMEOUT_SECS)]
    timeout: u64,

    /// Download size cap in bytes.
    #[arg(long, env = "PDF2XML_MAX_BYTES", default_value_t = pdf2xml::config::DEFAULT_MAX_DOWNLOAD_BYTES)]
    max_bytes: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2XML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2XML_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2XML_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let converter = Converter::new(&config).context("Failed to build converter")?;

    // ── Run conversion ───────────────────────────────────────────────────
    // Output files are always written atomically (temp file + rename).
    let output = cli.output.as_deref();
    let result = if cli.file {
        let bytes = read_upload(Path::new(&cli.source)).await?;
        let result = converter.convert_bytes(bytes, cli.structure).await;
        if let Some(path) = output {
            write_atomic(path, &result.xml)
                .await
                .context("Failed to write output")?;
        }
        result
    } else {
        let request = ConversionRequest::new(cli.source.as_str(), cli.structure);
        match output {
            Some(path) => converter
                .convert_to_file(request, path)
                .await
                .context("Failed to write output")?,
            None => converter.convert(request).await,
        }
    };

    let filename = Path::new(&cli.source)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.source.clone());

    let store = MemoryStore::new();
    let record = ConversionRecord::new(cli.owner.as_str(), filename, cli.source.as_str(), &result);
    let id = store
        .save(record)
        .await
        .context("Failed to save conversion record")?;

    if let (Some(output_path), false) = (output, cli.quiet) {
        eprintln!("   →  {}", bold(&output_path.display().to_string()));
    }

    if cli.json {
        let record = store
            .find_by_id(id)
            .await
            .context("Failed to load conversion record")?
            .context("Conversion record disappeared")?;
        let json = serde_json::to_string_pretty(&record).context("Failed to serialise record")?;
        println!("{json}");
    } else if cli.output.is_none() {
        write_stdout(&result)?;
    }

    if !cli.quiet && !show_progress {
        if let Some(ref error) = result.error {
            eprintln!("Conversion failed: {error}");
        }
    }

    Ok(match result.status {
        ConversionStatus::Completed => ExitCode::SUCCESS,
        ConversionStatus::Failed => ExitCode::from(EXIT_CONVERSION_FAILED),
    })
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .fetch_timeout_secs(cli.timeout)
        .max_download_bytes(cli.max_bytes)
        .maybe_store(StoreConfig::from_env());

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Read a local PDF and apply the upload checks to it.
async fn read_upload(path: &Path) -> Result<Vec<u8>> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    validate_upload_size(meta.len())?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mime = if is_pdf(&bytes) {
        PDF_MIME_TYPE
    } else {
        "application/octet-stream"
    };
    validate_mime_type(mime).with_context(|| format!("Rejected {}", path.display()))?;
    Ok(bytes)
}

fn write_stdout(result: &ConversionResult) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(result.xml.as_bytes())
        .context("Failed to write to stdout")?;
    if !result.xml.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
