//! OCR engine and Markdown converter backed by a vision language model.
//!
//! ## Retry Strategy
//!
//! 429 and 5xx responses are common under concurrent load and usually
//! transient. Each call retries with exponential backoff
//! (`retry_backoff_ms * 2^attempt`). When retries run out the last provider
//! message is surfaced verbatim as an upstream failure.
//!
//! ## Sync over async
//!
//! The collaborator traits are synchronous because they run on the blocking
//! worker pool. The provider client is async, so each call is driven with
//! the ambient runtime's `Handle::block_on`, which is legal on blocking-pool
//! threads. Outside any runtime a private current-thread runtime is used.

use crate::config::WorkbenchConfig;
use crate::error::{Result, WorkbenchError};
use crate::pipeline::encode::encode_png;
use crate::pipeline::postprocess::{clean_markdown, clean_ocr_text};
use crate::pipeline::{pdf, MarkdownConverter, OcrEngine, OcrLine, PageRenderer};
use crate::prompts::{MARKDOWN_PROMPT, OCR_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const COLLABORATOR: &str = "vision model";
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Shared VLM access: lazily resolved provider plus retry policy.
pub struct VisionClient {
    config: Arc<WorkbenchConfig>,
    provider: OnceCell<Arc<dyn LLMProvider>>,
}

impl VisionClient {
    /// The provider is not resolved until the first call, so building a
    /// client never fails for lack of API keys.
    pub fn new(config: Arc<WorkbenchConfig>) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    fn provider(&self) -> Result<Arc<dyn LLMProvider>> {
        self.provider
            .get_or_try_init(|| resolve_provider(&self.config))
            .map(Arc::clone)
    }

    /// Send one page image with `system_prompt`, retrying transient failures.
    pub async fn transcribe(&self, system_prompt: &str, image: &DynamicImage) -> Result<String> {
        let provider = self.provider()?;
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images("", vec![encode_png(image)?]),
        ];
        let options = build_options(&self.config);
        let start = Instant::now();

        let mut last_err = String::from("no attempt made");
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    attempt,
                    max = self.config.max_retries,
                    backoff_ms = backoff,
                    "Retrying vision call"
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        input_tokens = response.prompt_tokens,
                        output_tokens = response.completion_tokens,
                        elapsed = ?start.elapsed(),
                        "Vision call succeeded"
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    last_err = e.to_string();
                    warn!(attempt = attempt + 1, error = %last_err, "Vision call failed");
                }
            }
        }
        Err(WorkbenchError::upstream(COLLABORATOR, last_err))
    }

    fn transcribe_blocking(&self, system_prompt: &str, image: &DynamicImage) -> Result<String> {
        block_on(self.transcribe(system_prompt, image))?
    }
}

fn build_options(config: &WorkbenchConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Resolve the provider, most specific first: an injected provider, an
/// explicit provider name, the `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`
/// pair, an OpenAI key, then full auto-detection.
fn resolve_provider(config: &WorkbenchConfig) -> Result<Arc<dyn LLMProvider>> {
    if let Some(provider) = &config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(name) = &config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm, _embedding) = ProviderFactory::from_env().map_err(|e| {
        WorkbenchError::upstream(
            COLLABORATOR,
            format!(
                "no provider could be auto-detected; set OPENAI_API_KEY, \
                 ANTHROPIC_API_KEY or EDGEQUAKE_LLM_PROVIDER ({e})"
            ),
        )
    })?;
    Ok(llm)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        WorkbenchError::upstream(COLLABORATOR, format!("provider '{name}' not configured: {e}"))
    })
}

fn block_on<F: Future>(fut: F) -> Result<F::Output> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(fut)),
        Err(_) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| WorkbenchError::Internal(format!("cannot start runtime: {e}")))?;
            Ok(rt.block_on(fut))
        }
    }
}

/// Split a transcript into OCR lines. Models do not report confidence.
fn transcript_to_lines(transcript: &str) -> Vec<OcrLine> {
    clean_ocr_text(transcript)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(OcrLine::new)
        .collect()
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// [`OcrEngine`] that asks the vision model for a plain transcription.
pub struct VisionOcrEngine {
    client: Arc<VisionClient>,
}

impl VisionOcrEngine {
    pub fn new(client: Arc<VisionClient>) -> Self {
        Self { client }
    }
}

impl OcrEngine for VisionOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>> {
        let transcript = self.client.transcribe_blocking(OCR_PROMPT, image)?;
        Ok(transcript_to_lines(&transcript))
    }
}

// ── Markdown ─────────────────────────────────────────────────────────────

/// [`MarkdownConverter`] that uses the embedded text layer where one exists
/// and the vision model for everything else.
pub struct VisionMarkdownConverter {
    client: Arc<VisionClient>,
    renderer: Arc<dyn PageRenderer>,
    dpi: u32,
}

impl VisionMarkdownConverter {
    pub fn new(client: Arc<VisionClient>, renderer: Arc<dyn PageRenderer>, dpi: u32) -> Self {
        Self {
            client,
            renderer,
            dpi,
        }
    }
}

impl MarkdownConverter for VisionMarkdownConverter {
    fn convert(&self, pdf_path: &Path, force_ocr: bool) -> Result<String> {
        let layers: Vec<String> = if force_ocr {
            Vec::new()
        } else {
            let total = pdf::page_count(pdf_path)?;
            (1..=total)
                .map(|p| pdf::text_layer(pdf_path, p))
                .collect::<Result<_>>()?
        };

        if !layers.is_empty() && layers.iter().all(|t| !t.is_empty()) {
            debug!(path = %pdf_path.display(), "Using embedded text layer");
            return Ok(clean_markdown(&layers.join("\n\n")));
        }

        let images = self.renderer.render_page_images(pdf_path, self.dpi)?;
        let mut parts = Vec::with_capacity(images.len());
        for (idx, image) in images.iter().enumerate() {
            match layers.get(idx).filter(|t| !t.is_empty()) {
                Some(text) => parts.push(text.clone()),
                None => parts.push(self.client.transcribe_blocking(MARKDOWN_PROMPT, image)?),
            }
        }
        Ok(clean_markdown(&parts.join("\n\n")))
    }
}
