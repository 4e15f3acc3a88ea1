//! Per-page progress events for OCR and Markdown operations.
//!
//! Pass an `Arc<dyn PageProgress>` to [`crate::Toolkit::with_progress`]; the
//! CLI forwards events to an `indicatif` bar, the server leaves the default
//! no-op in place. Events fire on worker-pool threads, hence `Send + Sync`.

use std::sync::Arc;

/// Every method defaults to a no-op so implementors override only what
/// they need.
pub trait PageProgress: Send + Sync {
    /// Before the first page. `operation` is `"ocr"` or `"markdown"`.
    fn on_start(&self, operation: &str, total_pages: usize) {
        let _ = (operation, total_pages);
    }

    /// After page `page_num` (1-based) produced `output_len` bytes.
    fn on_page_done(&self, page_num: u32, total_pages: usize, output_len: usize) {
        let _ = (page_num, total_pages, output_len);
    }

    /// After the last page, before artifacts are written.
    fn on_finish(&self, operation: &str, total_pages: usize) {
        let _ = (operation, total_pages);
    }
}

pub struct NoopProgress;

impl PageProgress for NoopProgress {}

pub type ProgressHandle = Arc<dyn PageProgress>;
