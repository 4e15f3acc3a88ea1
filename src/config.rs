//! Configuration for workspace operations.
//!
//! Every tunable lives in [`WorkbenchConfig`], built via its
//! [`WorkbenchConfigBuilder`]. The config is shared read-only between the
//! toolkit, the vision collaborators and the worker pool, so it is `Clone`
//! and cheap to wrap in an `Arc`.

use crate::error::WorkbenchError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a [`crate::Toolkit`] and the HTTP server.
///
/// # Example
/// ```rust
/// use pdf_workbench::WorkbenchConfig;
///
/// let config = WorkbenchConfig::builder()
///     .dpi(200)
///     .workers(4)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Clone)]
pub struct WorkbenchConfig {
    /// Rendering DPI for OCR and the vision Markdown path. Range: 72–600. Default: 300.
    ///
    /// OCR needs more pixels than Markdown transcription: small glyphs below
    /// ~20 px tall lose recognisable strokes after binarisation.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 3000.
    pub max_rendered_pixels: u32,

    /// Size of the blocking worker pool. Default: available parallelism.
    pub workers: usize,

    /// Vision model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0 (transcription, not generation).
    pub temperature: f32,

    /// Maximum tokens per page response. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a transient vision-model failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Directory under which each session gets `<root>/<session_id>`.
    /// Default: `<system temp>/pdf_processing`.
    pub sessions_root: PathBuf,

    /// Download timeout for URL ingest in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 3000,
            workers: default_workers(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            sessions_root: std::env::temp_dir().join("pdf_processing"),
            download_timeout_secs: 120,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl fmt::Debug for WorkbenchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkbenchConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("workers", &self.workers)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("sessions_root", &self.sessions_root)
            .finish()
    }
}

impl WorkbenchConfig {
    /// Create a new builder for `WorkbenchConfig`.
    pub fn builder() -> WorkbenchConfigBuilder {
        WorkbenchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WorkbenchConfig`].
#[derive(Debug)]
pub struct WorkbenchConfigBuilder {
    config: WorkbenchConfig,
}

impl WorkbenchConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn sessions_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.sessions_root = root.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkbenchConfig, WorkbenchError> {
        let c = &self.config;
        if c.workers == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "worker pool size must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.sessions_root.as_os_str().is_empty() {
            return Err(WorkbenchError::InvalidConfig(
                "sessions_root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Shape of OCR and Markdown results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One joined document with page-break markers. (default)
    #[default]
    Full,
    /// One artifact per page.
    Pages,
}

impl FromStr for OutputMode {
    type Err = WorkbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(OutputMode::Full),
            "pages" => Ok(OutputMode::Pages),
            other => Err(WorkbenchError::InvalidSelection(format!(
                "output must be 'full' or 'pages', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Full => write!(f, "full"),
            OutputMode::Pages => write!(f, "pages"),
        }
    }
}
