//! Per-operation entry points over one workspace.
//!
//! Every operation follows the same path: resolve the selector to one input
//! PDF, do the work through the collaborators, write artifacts under the
//! matching `output/` subdirectory with deterministic names, and return the
//! inline result together with the artifact paths.
//!
//! The document operations are synchronous and meant to be run on a
//! [`crate::WorkerPool`]. Only [`Toolkit::ingest`] is async, because URL
//! sources are downloaded.

use crate::config::{OutputMode, WorkbenchConfig};
use crate::error::{Result, WorkbenchError};
use crate::pipeline::input::{copy_into, download_into, is_url};
use crate::pipeline::preprocess::prepare_for_ocr;
use crate::pipeline::render::PdfiumRenderer;
use crate::pipeline::vision::{VisionClient, VisionMarkdownConverter, VisionOcrEngine};
use crate::pipeline::{lines_to_text, pdf, MarkdownConverter, OcrEngine, PageRenderer};
use crate::progress::{NoopProgress, ProgressHandle};
use crate::selection::PageSelection;
use crate::workspace::naming::{self, MARKDOWN_SUFFIX, OCR_SUFFIX};
use crate::workspace::resolve::has_pdf_extension;
use crate::workspace::{ArtifactStore, Workspace};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// The external collaborators an operation may call.
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn PageRenderer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub markdown: Arc<dyn MarkdownConverter>,
}

impl Collaborators {
    /// pdfium rendering plus a vision model for OCR and Markdown.
    pub fn from_config(config: &Arc<WorkbenchConfig>) -> Self {
        let renderer: Arc<dyn PageRenderer> =
            Arc::new(PdfiumRenderer::new(config.max_rendered_pixels));
        let client = Arc::new(VisionClient::new(Arc::clone(config)));
        Self {
            ocr: Arc::new(VisionOcrEngine::new(Arc::clone(&client))),
            markdown: Arc::new(VisionMarkdownConverter::new(
                client,
                Arc::clone(&renderer),
                config.dpi,
            )),
            renderer,
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub selector: Option<String>,
    /// Grayscale, blur and binarise before recognition. Default: true.
    pub preprocess: bool,
    pub output: OutputMode,
    /// Overrides the full-mode artifact name.
    pub out_name: Option<String>,
}

impl Default for OcrRequest {
    fn default() -> Self {
        Self {
            selector: None,
            preprocess: true,
            output: OutputMode::Full,
            out_name: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownRequest {
    pub selector: Option<String>,
    pub force_ocr: bool,
    pub output: OutputMode,
    pub out_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SplitRequest {
    pub selector: Option<String>,
    pub selection: PageSelection,
    /// One combined PDF instead of one file per page.
    pub combined: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    /// Selectors, merged in this order.
    pub files: Vec<String>,
    pub out_name: Option<String>,
}

// ── Results ──────────────────────────────────────────────────────────────

/// Inline result of OCR or Markdown conversion plus what was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TextOutput {
    Full { text: String, file_path: PathBuf },
    Pages { pages: Vec<String>, file_paths: Vec<PathBuf> },
}

impl TextOutput {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            TextOutput::Full { file_path, .. } => vec![file_path.as_path()],
            TextOutput::Pages { file_paths, .. } => {
                file_paths.iter().map(PathBuf::as_path).collect()
            }
        }
    }
}

// ── Toolkit ──────────────────────────────────────────────────────────────

/// Operations bound to one workspace. Cheap to clone.
#[derive(Clone)]
pub struct Toolkit {
    workspace: Workspace,
    collaborators: Collaborators,
    config: Arc<WorkbenchConfig>,
    progress: ProgressHandle,
}

impl Toolkit {
    pub fn new(
        workspace: Workspace,
        collaborators: Collaborators,
        config: Arc<WorkbenchConfig>,
    ) -> Self {
        Self {
            workspace,
            collaborators,
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = progress;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn artifacts(&self) -> ArtifactStore {
        self.workspace.artifacts()
    }

    /// Bring PDFs into `input/`.
    ///
    /// Local paths that do not exist or lack a `.pdf` extension are skipped
    /// with a warning. A file already in `input/` is accepted as is. URLs are
    /// downloaded and must carry PDF magic bytes.
    pub async fn ingest(&self, sources: &[String]) -> Result<Vec<PathBuf>> {
        let input = &self.workspace.layout().input;
        let input_real = input.canonicalize().map_err(|e| WorkbenchError::io(input, e))?;
        let mut ingested = Vec::new();

        for source in sources {
            if is_url(source) {
                let dest =
                    download_into(source, input, self.config.download_timeout_secs).await?;
                ingested.push(dest);
                continue;
            }

            let path = Path::new(source);
            if !path.is_file() || !has_pdf_extension(path) {
                warn!(source = %source, "Skipping: not an existing .pdf file");
                continue;
            }

            let already_in_input = path
                .parent()
                .and_then(|p| p.canonicalize().ok())
                .is_some_and(|p| p == input_real);
            if already_in_input {
                ingested.push(path.to_path_buf());
            } else {
                ingested.push(copy_into(path, input).await?);
            }
        }

        info!(count = ingested.len(), "Ingested PDFs");
        Ok(ingested)
    }

    /// Render, optionally preprocess, recognise, and write text artifacts.
    pub fn ocr_pdf(&self, req: &OcrRequest) -> Result<TextOutput> {
        let source = self.workspace.resolve_input(req.selector.as_deref())?;
        let out_name = req.out_name.as_deref().map(naming::sanitize_file_name).transpose()?;
        let stem = naming::stem_of(&source);

        let images = self
            .collaborators
            .renderer
            .render_page_images(&source, self.config.dpi)?;
        self.progress.on_start("ocr", images.len());

        let mut pages = Vec::with_capacity(images.len());
        for (idx, image) in images.iter().enumerate() {
            let page_num = idx as u32 + 1;
            let lines = if req.preprocess {
                self.collaborators.ocr.recognize(&prepare_for_ocr(image))?
            } else {
                self.collaborators.ocr.recognize(image)?
            };
            let text = lines_to_text(&lines);
            self.progress.on_page_done(page_num, images.len(), text.len());
            pages.push((page_num, text));
        }
        self.progress.on_finish("ocr", pages.len());

        let out = self.write_text(
            &self.workspace.layout().ocr,
            &stem,
            OCR_SUFFIX,
            req.output,
            out_name,
            pages,
            false,
        )?;
        info!(source = %source.display(), mode = %req.output, "OCR complete");
        Ok(out)
    }

    /// Convert page by page through single-page temporaries.
    pub fn pdf_to_markdown(&self, req: &MarkdownRequest) -> Result<TextOutput> {
        let source = self.workspace.resolve_input(req.selector.as_deref())?;
        let out_name = req.out_name.as_deref().map(naming::sanitize_file_name).transpose()?;
        let stem = naming::stem_of(&source);

        let doc = pdf::load(&source)?;
        let total = doc.get_pages().len();
        self.progress.on_start("markdown", total);

        let mut pages = Vec::with_capacity(total);
        for page_num in 1..=total as u32 {
            let tmp = ScratchFile(
                self.workspace
                    .layout()
                    .temp
                    .join(naming::temp_page_name(&stem, page_num)),
            );
            pdf::extract_pages(&doc, &[page_num], &tmp.0)?;
            let md = self.collaborators.markdown.convert(&tmp.0, req.force_ocr)?;
            let md = md.trim().to_string();
            self.progress.on_page_done(page_num, total, md.len());
            pages.push((page_num, md));
        }
        self.progress.on_finish("markdown", total);

        let out = self.write_text(
            &self.workspace.layout().markdown,
            &stem,
            MARKDOWN_SUFFIX,
            req.output,
            out_name,
            pages,
            true,
        )?;
        info!(source = %source.display(), mode = %req.output, "Markdown conversion complete");
        Ok(out)
    }

    /// Extract the selected pages as one combined PDF or one PDF per page.
    pub fn split_pages(&self, req: &SplitRequest) -> Result<Vec<PathBuf>> {
        let source = self.workspace.resolve_input(req.selector.as_deref())?;
        let stem = naming::stem_of(&source);
        let doc = pdf::load(&source)?;
        let total = doc.get_pages().len() as u32;
        let targets = req.selection.resolve(total)?;
        let splits = &self.workspace.layout().splits;

        let outputs = if req.combined {
            let name = naming::combined_split_name(&stem, &targets, req.selection.is_range());
            let dest = splits.join(name);
            pdf::extract_pages(&doc, &targets, &dest)?;
            vec![dest]
        } else {
            let mut outputs = Vec::with_capacity(targets.len());
            for page in &targets {
                let dest = splits.join(naming::page_name(&stem, *page, "pdf"));
                pdf::extract_pages(&doc, &[*page], &dest)?;
                outputs.push(dest);
            }
            outputs
        };

        info!(
            source = %source.display(),
            selection = %req.selection,
            combined = req.combined,
            files = outputs.len(),
            "Split complete"
        );
        Ok(outputs)
    }

    /// Concatenate the given PDFs in order into `output/merged/`.
    pub fn merge_pdfs(&self, req: &MergeRequest) -> Result<PathBuf> {
        if req.files.is_empty() {
            return Err(WorkbenchError::InvalidSelection(
                "merge needs at least one file".into(),
            ));
        }
        let name = naming::sanitize_file_name(
            req.out_name.as_deref().unwrap_or(naming::DEFAULT_MERGE_NAME),
        )?;
        let sources = req
            .files
            .iter()
            .map(|f| self.workspace.resolve_input(Some(f)))
            .collect::<Result<Vec<_>>>()?;

        let dest = self.workspace.layout().merged.join(name);
        let pages = pdf::merge(&sources, &dest)?;
        info!(dest = %dest.display(), inputs = sources.len(), pages, "Merge complete");
        Ok(dest)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_text(
        &self,
        dir: &Path,
        stem: &str,
        suffix: &str,
        mode: OutputMode,
        out_name: Option<String>,
        pages: Vec<(u32, String)>,
        blank_after_marker: bool,
    ) -> Result<TextOutput> {
        match mode {
            OutputMode::Full => {
                let text = naming::join_pages(&pages, blank_after_marker);
                let name = out_name.unwrap_or_else(|| naming::full_name(stem, suffix));
                let file_path = dir.join(name);
                write_atomic(&file_path, text.as_bytes())?;
                Ok(TextOutput::Full { text, file_path })
            }
            OutputMode::Pages => {
                let mut file_paths = Vec::with_capacity(pages.len());
                for (page, body) in &pages {
                    let path = dir.join(naming::page_name(stem, *page, suffix));
                    write_atomic(&path, body.as_bytes())?;
                    file_paths.push(path);
                }
                Ok(TextOutput::Pages {
                    pages: pages.into_iter().map(|(_, body)| body).collect(),
                    file_paths,
                })
            }
        }
    }
}

/// Temp file removed on drop, whether or not conversion succeeded.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| WorkbenchError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| WorkbenchError::io(path, e))?;
    tmp.persist(path).map_err(|e| WorkbenchError::io(path, e.error))?;
    Ok(())
}
