//! # pdf-workbench
//!
//! Session-scoped PDF workspaces: ingest PDFs, run OCR, convert to Markdown,
//! split pages, merge files, and hand the results back one by one or zipped.
//!
//! ## Why this crate?
//!
//! A document toolkit that is called from many places (a CLI, an HTTP API,
//! scripts) needs one set of rules for where inputs come from and where
//! outputs land. Every operation here works against a [`Workspace`]: a base
//! directory with fixed `input/` and `output/{ocr,markdown,splits,merged}`
//! subdirectories. Artifact names are a pure function of the source name and
//! the operation, so re-running an operation overwrites instead of piling up
//! copies.
//!
//! ## Pipeline Overview
//!
//! ```text
//! selector ─┐
//!           ├─ 1. Resolve   selector → one PDF in input/ (or a literal path)
//!           ├─ 2. Work      render / OCR / convert / split / merge
//!           │               on the bounded worker pool
//!           ├─ 3. Name      <stem>.ocr.txt, <stem>_p0003.md, <stem>_pages_0002-0005.pdf …
//!           ├─ 4. Write     atomically under output/<kind>/
//!           └─ 5. Retrieve  by exact basename, best match, or zip-all
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_workbench::{
//!     Collaborators, SplitRequest, PageSelection, Toolkit, WorkbenchConfig, Workspace,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(WorkbenchConfig::default());
//!     let workspace = Workspace::open("./workspace", None, None)?;
//!     let toolkit = Toolkit::new(workspace, Collaborators::from_config(&config), config);
//!
//!     let files = toolkit.split_pages(&SplitRequest {
//!         selector: Some("report.pdf".into()),
//!         selection: PageSelection::parse_range("2-5")?,
//!         combined: true,
//!     })?;
//!     println!("{}", files[0].display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`    | on | Enables the `pdfwb` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on | Enables the [`server`] module and the `pdfwb-server` binary (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! pdf-workbench = { version = "0.3", default-features = false }
//! ```
//!
//! ## Collaborators
//!
//! Rendering (pdfium), OCR and Markdown transcription (a vision model via
//! `edgequake-llm`) sit behind the [`PageRenderer`], [`OcrEngine`] and
//! [`MarkdownConverter`] traits. Split, merge and text-layer extraction use
//! `lopdf` directly and need neither pdfium nor an API key.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod prompts;
pub mod selection;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod toolkit;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OutputMode, WorkbenchConfig, WorkbenchConfigBuilder};
pub use error::{ErrorKind, Result, WorkbenchError};
pub use pipeline::{MarkdownConverter, OcrEngine, OcrLine, PageRenderer};
pub use pool::WorkerPool;
pub use progress::{NoopProgress, PageProgress, ProgressHandle};
pub use selection::PageSelection;
pub use session::{
    cleanup_older_than, MemorySessionStore, Session, SessionConfig, SessionId, SessionStore,
};
pub use toolkit::{
    Collaborators, MarkdownRequest, MergeRequest, OcrRequest, SplitRequest, TextOutput, Toolkit,
};
pub use workspace::{ArtifactStore, BestMatch, LayoutPaths, PathResolver, Workspace};
