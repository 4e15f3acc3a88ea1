//! Collaborators that do the heavy lifting behind each operation.
//!
//! The workspace layer decides *which* files to read and *where* results go;
//! everything in here does the actual work and knows nothing about sessions.
//! Rendering, OCR and Markdown conversion sit behind traits so the toolkit
//! can be driven by test doubles or a different backend.
//!
//! ## Data Flow
//!
//! ```text
//!             ┌─▶ render ──▶ preprocess ──▶ OcrEngine ───────▶ text
//! input PDF ──┤
//!             └─▶ pdf::extract_pages ──▶ MarkdownConverter ──▶ markdown
//!                                          (text layer or render ──▶ vision)
//! ```
//!
//! 1. [`input`]      local copy or URL download into `input/`
//! 2. [`pdf`]        page count, page extraction, merge, text layer (lopdf)
//! 3. [`render`]     rasterise pages via pdfium
//! 4. [`preprocess`] grayscale, blur, binarise before OCR
//! 5. [`encode`]     PNG → base64 for the vision request body
//! 6. [`vision`]     OCR engine and Markdown converter backed by a VLM
//! 7. [`postprocess`] deterministic cleanup of model output
//!
//! All trait methods are synchronous. They are called from the blocking
//! worker pool, never from an async task directly.

pub mod encode;
pub mod input;
pub mod pdf;
pub mod postprocess;
pub mod preprocess;
pub mod render;
pub mod vision;

use crate::error::Result;
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;

/// Rasterises every page of a PDF.
pub trait PageRenderer: Send + Sync {
    /// One image per page, in page order.
    fn render_page_images(&self, pdf: &Path, dpi: u32) -> Result<Vec<DynamicImage>>;
}

/// One recognised line or region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrLine {
    pub text: String,
    /// Engine confidence in `[0, 1]`, when the engine reports one.
    pub confidence: Option<f32>,
}

impl OcrLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Recognises text in a page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>>;
}

/// Converts a (typically single-page) PDF to Markdown.
pub trait MarkdownConverter: Send + Sync {
    /// With `force_ocr` the converter must ignore any embedded text layer
    /// and read the rendered page instead.
    fn convert(&self, pdf: &Path, force_ocr: bool) -> Result<String>;
}

/// Join recognised lines into page text: non-empty lines, `\n`-separated,
/// trimmed.
pub fn lines_to_text(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.trim_end())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
