//! Page rasterisation via pdfium.
//!
//! pdfium is a C++ library with thread-local state; calls happen on the
//! blocking worker pool, never on a Tokio worker. The library is bound per
//! call from `PDFIUM_LIB_PATH` when set, then from the working directory,
//! then from the system library path.

use crate::error::{Result, WorkbenchError};
use crate::pipeline::PageRenderer;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

const COLLABORATOR: &str = "PDF renderer";

/// [`PageRenderer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    /// Longest edge cap, independent of DPI, so a poster-sized page cannot
    /// exhaust memory.
    max_pixels: u32,
    library: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(max_pixels: u32) -> Self {
        Self {
            max_pixels,
            library: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Bind to an explicit pdfium shared library file.
    pub fn with_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| WorkbenchError::upstream(COLLABORATOR, format!("cannot load pdfium: {e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl Default for PdfiumRenderer {
    fn default() -> Self {
        Self::new(3000)
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_page_images(&self, pdf: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_file(pdf, None).map_err(|e| {
            WorkbenchError::upstream(COLLABORATOR, format!("{}: {e:?}", pdf.display()))
        })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                WorkbenchError::upstream(COLLABORATOR, format!("page {}: {e:?}", idx + 1))
            })?;
            let image = bitmap.as_image();
            debug!(
                page = idx + 1,
                width = image.width(),
                height = image.height(),
                "Rendered page"
            );
            images.push(image);
        }
        Ok(images)
    }
}
