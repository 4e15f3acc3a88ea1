//! Shared fixtures: synthetic PDFs and collaborator doubles.
#![allow(dead_code)]

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_workbench::{
    Collaborators, MarkdownConverter, OcrEngine, OcrLine, PageRenderer, Result, Toolkit,
    WorkbenchConfig, WorkbenchError, Workspace,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Image width offset; the page number is `width - WIDTH_BASE`.
const WIDTH_BASE: u32 = 16;

/// Write an `n`-page PDF whose page `i` shows the text `"{label} page i"`.
pub fn write_pdf(dir: &Path, name: &str, n: u32, label: &str) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 1..=n {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("{label} page {i}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(n),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

/// Text drawn on each page, in order.
pub fn page_texts(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    pages
        .iter()
        .map(|p| doc.extract_text(&[*p]).unwrap_or_default().trim().to_string())
        .collect()
}

// ── Collaborator doubles ────────────────────────────────────────────────────

/// Produces one small blank image per page, encoding the page number in
/// the image width.
pub struct BlankRenderer;

impl PageRenderer for BlankRenderer {
    fn render_page_images(&self, pdf: &Path, _dpi: u32) -> Result<Vec<DynamicImage>> {
        let doc = Document::load(pdf)
            .map_err(|e| WorkbenchError::upstream("PDF renderer", e))?;
        let n = doc.get_pages().len() as u32;
        Ok((1..=n)
            .map(|i| DynamicImage::new_rgb8(WIDTH_BASE + i, 8))
            .collect())
    }
}

/// Reads the page number back out of the image width.
#[derive(Default)]
pub struct EchoOcr {
    pub calls: AtomicUsize,
}

impl OcrEngine for EchoOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = image.width() - WIDTH_BASE;
        Ok(vec![
            OcrLine::new(format!("text of page {page}")),
            OcrLine::new("   "),
            OcrLine::new("second line"),
        ])
    }
}

/// Turns the single-page PDF's text layer into a heading.
#[derive(Default)]
pub struct HeadingMarkdown {
    pub seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl MarkdownConverter for HeadingMarkdown {
    fn convert(&self, pdf: &Path, force_ocr: bool) -> Result<String> {
        assert!(pdf.exists(), "temp page must exist during conversion");
        self.seen.lock().unwrap().push((pdf.to_path_buf(), force_ocr));
        let texts = page_texts(pdf);
        assert_eq!(texts.len(), 1, "converter must receive a single page");
        Ok(format!("# {}\n\n", texts[0]))
    }
}

/// Always fails, like a model that is down.
pub struct FailingOcr;

impl OcrEngine for FailingOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrLine>> {
        Err(WorkbenchError::upstream("vision model", "HTTP 503"))
    }
}

pub fn fake_collaborators() -> Collaborators {
    Collaborators {
        renderer: Arc::new(BlankRenderer),
        ocr: Arc::new(EchoOcr::default()),
        markdown: Arc::new(HeadingMarkdown::default()),
    }
}

pub fn test_config() -> Arc<WorkbenchConfig> {
    Arc::new(WorkbenchConfig::builder().workers(2).build().unwrap())
}

/// A workspace rooted at `base` plus a toolkit over it.
pub fn toolkit_at(base: &Path) -> Toolkit {
    let workspace = Workspace::open(base, None, None).unwrap();
    Toolkit::new(workspace, fake_collaborators(), test_config())
}
