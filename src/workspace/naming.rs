//! Artifact naming.
//!
//! Names are a pure function of the source stem, the operation and the page
//! selection, so a repeated request overwrites its earlier artifact instead of
//! accumulating copies, and a client can predict a name without the response.

use crate::error::{Result, WorkbenchError};
use std::path::Path;

/// Suffix of OCR text artifacts: `<stem>.ocr.txt`.
pub const OCR_SUFFIX: &str = "ocr.txt";
/// Suffix of Markdown artifacts: `<stem>.md`.
pub const MARKDOWN_SUFFIX: &str = "md";
/// Default merge output name.
pub const DEFAULT_MERGE_NAME: &str = "merged.pdf";

/// How many page numbers a `_pages_sel_` name spells out.
const MAX_SEL_IN_NAME: usize = 10;

/// File stem of a source PDF, falling back to `"document"` for odd paths.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// `<stem>.<suffix>`: the single full-mode artifact.
pub fn full_name(stem: &str, suffix: &str) -> String {
    format!("{stem}.{suffix}")
}

/// `<stem>_pNNNN.<suffix>`: one artifact per 1-based page.
pub fn page_name(stem: &str, page: u32, suffix: &str) -> String {
    format!("{stem}_p{page:04}.{suffix}")
}

/// Combined split output.
///
/// A range gives `<stem>_pages_NNNN-NNNN.pdf` from the first and last page.
/// An explicit list gives `<stem>_pages_sel_02_07_11.pdf`, spelling out the
/// first ten pages and appending `_plusK` for the rest.
pub fn combined_split_name(stem: &str, pages: &[u32], from_range: bool) -> String {
    let (first, last) = match (pages.first(), pages.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return format!("{stem}_pages_none.pdf"),
    };

    if from_range {
        return format!("{stem}_pages_{first:04}-{last:04}.pdf");
    }

    let listed: Vec<String> = pages
        .iter()
        .take(MAX_SEL_IN_NAME)
        .map(|p| format!("{p:02}"))
        .collect();
    let mut name = format!("{stem}_pages_sel_{}", listed.join("_"));
    if pages.len() > MAX_SEL_IN_NAME {
        name.push_str(&format!("_plus{}", pages.len() - MAX_SEL_IN_NAME));
    }
    name.push_str(".pdf");
    name
}

/// Scratch single-page PDF used while converting page by page.
pub fn temp_page_name(stem: &str, page: u32) -> String {
    format!("{stem}_tmp_p{page:04}.pdf")
}

/// Marker placed before each page body in full-mode output.
pub fn page_marker(page: u32) -> String {
    format!("--------- Page {page} ---------")
}

/// Join per-page bodies into one document.
///
/// Each block is the marker, a newline (two with `blank_line`), then the
/// body; blocks are right-trimmed and separated by a blank line, and the
/// whole result is trimmed.
pub fn join_pages<S: AsRef<str>>(pages: &[(u32, S)], blank_line: bool) -> String {
    let gap = if blank_line { "\n\n" } else { "\n" };
    pages
        .iter()
        .map(|(n, body)| {
            let block = format!("{}{gap}{}", page_marker(*n), body.as_ref());
            block.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

/// Validate a caller-supplied output or upload name.
///
/// The name must be a single path component: non-empty, no separators,
/// not `.` or `..`.
pub fn sanitize_file_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let reason = if trimmed.is_empty() {
        Some("must not be empty")
    } else if trimmed.contains(['/', '\\']) {
        Some("path separators are not allowed")
    } else if trimmed == "." || trimmed == ".." {
        Some("reserved name")
    } else if trimmed.contains('\0') {
        Some("NUL bytes are not allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(WorkbenchError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(trimmed.to_string()),
    }
}

/// Name to store an uploaded file under: the last component of whatever
/// path the client sent, then sanitized.
pub fn upload_file_name(client_name: &str) -> Result<String> {
    let base = client_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(client_name);
    sanitize_file_name(base).map_err(|_| WorkbenchError::InvalidName {
        name: client_name.to_string(),
        reason: "upload needs a plain file name",
    })
}
