//! CLI binary for pdf-workbench.
//!
//! A thin shim over the library crate: one workspace directory, one
//! subcommand per operation, results on stdout and diagnostics on stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_workbench::{
    Collaborators, ErrorKind, MarkdownRequest, MergeRequest, OcrRequest, OutputMode,
    PageProgress, PageSelection, SplitRequest, TextOutput, Toolkit, WorkbenchConfig,
    WorkbenchError, WorkerPool, Workspace,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
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

// ── CLI progress using indicatif ─────────────────────────────────────────────

/// Renders a progress bar for OCR and Markdown runs, one log line per page.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PageProgress for CliProgress {
    fn on_start(&self, operation: &str, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(match operation {
            "ocr" => "OCR",
            _ => "Converting",
        });
        self.bar.reset_eta();
    }

    fn on_page_done(&self, page_num: u32, total_pages: usize, output_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{output_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_finish(&self, _operation: &str, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages processed",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Bring PDFs into ./workspace/input
  pdfwb ingest scans/*.pdf https://arxiv.org/pdf/1706.03762

  # OCR the only PDF in input/, one text file per page
  pdfwb ocr --output pages

  # Markdown from the text layer where present, vision model elsewhere
  pdfwb to-md report.pdf

  # Pages 2-5 as one PDF, then pages 2, 7 and 11 as separate PDFs
  pdfwb split-pages --pdf report.pdf --range 2-5 --combined
  pdfwb split-pages --pdf report.pdf --pages 2 7 11

  # Merge in order
  pdfwb merge a.pdf b.pdf --out final.pdf

  # Locate an artifact, or bundle everything
  pdfwb find report_p0003.md
  pdfwb zip

EXIT CODES:
  0  success             3  ambiguous selection   5  I/O error
  1  internal error      4  invalid request       6  collaborator failure
  2  not found

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (OCR / Markdown via vision model)
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium for page rendering
"#;

/// Work with PDFs in a local workspace: ingest, OCR, Markdown, split, merge.
#[derive(Parser, Debug)]
#[command(
    name = "pdfwb",
    version,
    about = "Work with PDFs in a local workspace: ingest, OCR, Markdown, split, merge",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Workspace base directory.
    #[arg(long, env = "PDFWB_BASE", default_value = "./workspace")]
    base: PathBuf,

    /// Override the input directory (default: <base>/input).
    #[arg(long, env = "PDFWB_INPUT")]
    input: Option<PathBuf>,

    /// Override the output root (default: <base>/output).
    #[arg(long, env = "PDFWB_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering DPI for OCR and vision Markdown (72–600).
    #[arg(long, env = "PDFWB_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Vision model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Print results as JSON.
    #[arg(long, env = "PDFWB_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFWB_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFWB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "PDFWB_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy local PDFs (or download URLs) into the input directory.
    Ingest {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// OCR a PDF into text.
    Ocr {
        /// Input PDF; may be omitted when input/ holds exactly one.
        pdf: Option<String>,
        /// full = one joined file, pages = one file per page.
        #[arg(long = "output", default_value = "full")]
        mode: OutputMode,
        /// Skip grayscale/blur/binarisation before recognition.
        #[arg(long)]
        no_pre: bool,
        /// Name of the full-mode output file.
        #[arg(long)]
        out: Option<String>,
    },

    /// Convert a PDF to Markdown.
    #[command(name = "to-md")]
    ToMd {
        pdf: Option<String>,
        #[arg(long = "output", default_value = "full")]
        mode: OutputMode,
        /// Ignore any embedded text layer.
        #[arg(long)]
        force_ocr: bool,
        #[arg(long)]
        out: Option<String>,
    },

    /// Extract pages into new PDFs.
    #[command(name = "split-pages")]
    SplitPages {
        #[arg(long)]
        pdf: Option<String>,
        /// Explicit 1-based pages, e.g. `--pages 2 7 11`.
        #[arg(long, num_args = 1..)]
        pages: Option<Vec<u32>>,
        /// Inclusive range `A-B`; wins over --pages.
        #[arg(long)]
        range: Option<String>,
        /// One combined PDF instead of one per page.
        #[arg(long)]
        combined: bool,
    },

    /// Concatenate PDFs in order.
    Merge {
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long)]
        out: Option<String>,
    },

    /// Locate an artifact by file name.
    Find { name: String },

    /// Zip the outputs (or the whole workspace if there are none).
    Zip,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The progress bar gives all the feedback that matters, so library INFO
    // logs are suppressed while it is active.
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

    match run(cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", red("error:"));
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<WorkbenchError>().map(WorkbenchError::kind) {
        Some(ErrorKind::NotFound) => 2,
        Some(ErrorKind::Ambiguous) => 3,
        Some(ErrorKind::InvalidSelection) => 4,
        Some(ErrorKind::Io) => 5,
        Some(ErrorKind::Upstream) => 6,
        Some(ErrorKind::Internal) | None => 1,
    }
}

async fn run(cli: Cli, show_progress: bool) -> Result<()> {
    let config = Arc::new(build_config(&cli)?);
    let workspace = Workspace::open(&cli.base, cli.input.as_deref(), cli.output.as_deref())
        .context("Failed to prepare workspace")?;
    let toolkit = Toolkit::new(workspace, Collaborators::from_config(&config), Arc::clone(&config));
    // Only the per-page operations report progress.
    let with_bar = |toolkit: Toolkit| {
        if show_progress {
            toolkit.with_progress(CliProgress::new())
        } else {
            toolkit
        }
    };

    // Vision collaborators block on the runtime, so document work must run
    // on the blocking pool rather than on this task.
    let pool = WorkerPool::new(1);
    let json = cli.json;
    let quiet = cli.quiet;

    match cli.command {
        Command::Ingest { files } => {
            let ingested = toolkit.ingest(&files).await.context("Ingest failed")?;
            print_paths(&ingested, json)?;
        }

        Command::Ocr { pdf, mode, no_pre, out } => {
            let req = OcrRequest {
                selector: pdf,
                preprocess: !no_pre,
                output: mode,
                out_name: out,
            };
            let toolkit = with_bar(toolkit);
            let out = pool
                .run(move || toolkit.ocr_pdf(&req))
                .await
                .context("OCR failed")?;
            print_text(&out, json, quiet)?;
        }

        Command::ToMd { pdf, mode, force_ocr, out } => {
            let req = MarkdownRequest {
                selector: pdf,
                force_ocr,
                output: mode,
                out_name: out,
            };
            let toolkit = with_bar(toolkit);
            let out = pool
                .run(move || toolkit.pdf_to_markdown(&req))
                .await
                .context("Markdown conversion failed")?;
            print_text(&out, json, quiet)?;
        }

        Command::SplitPages { pdf, pages, range, combined } => {
            let req = SplitRequest {
                selector: pdf,
                selection: PageSelection::from_parts(pages, range.as_deref())?,
                combined,
            };
            let outputs = pool
                .run(move || toolkit.split_pages(&req))
                .await
                .context("Split failed")?;
            print_paths(&outputs, json)?;
        }

        Command::Merge { files, out } => {
            let req = MergeRequest { files, out_name: out };
            let output = pool
                .run(move || toolkit.merge_pdfs(&req))
                .await
                .context("Merge failed")?;
            print_paths(&[output], json)?;
        }

        Command::Find { name } => {
            let artifacts = toolkit.artifacts();
            let base = artifacts.layout().base.clone();
            let lookup = name.clone();
            let best = pool.run(move || artifacts.find_best(&lookup)).await?;
            if let Some(note) = best.note(&base, &name) {
                if !quiet {
                    eprintln!("{}", dim(&note));
                }
            }
            print_paths(&[best.path], json)?;
        }

        Command::Zip => {
            let artifacts = toolkit.artifacts();
            let archive = pool
                .run(move || artifacts.zip_all())
                .await
                .context("Failed to build archive")?;
            let archive = archive.keep().context("Failed to keep archive")?;
            print_paths(&[archive], json)?;
        }
    }
    Ok(())
}

/// Map CLI args to `WorkbenchConfig`.
fn build_config(cli: &Cli) -> Result<WorkbenchConfig> {
    let mut builder = WorkbenchConfig::builder().dpi(cli.dpi);
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    builder.build().context("Invalid configuration")
}

fn print_paths(paths: &[PathBuf], json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        let body = serde_json::to_string_pretty(paths).context("Failed to serialise output")?;
        writeln!(handle, "{body}")?;
    } else {
        for p in paths {
            writeln!(handle, "{}", p.display())?;
        }
    }
    Ok(())
}

/// Full mode prints the joined text; pages mode prints the written paths.
fn print_text(out: &TextOutput, json: bool, quiet: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        let body = serde_json::to_string_pretty(out).context("Failed to serialise output")?;
        writeln!(handle, "{body}")?;
        return Ok(());
    }

    match out {
        TextOutput::Full { text, file_path } => {
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            if !quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&file_path.display().to_string()));
            }
        }
        TextOutput::Pages { file_paths, .. } => {
            for p in file_paths {
                writeln!(handle, "{}", p.display())?;
            }
        }
    }
    Ok(())
}
