//! Turn an input selector into exactly one PDF on disk.
//!
//! ## Resolution order
//!
//! * No selector: the single `*.pdf` directly under `input/`. Zero
//!   candidates is `NotFound`; two or more is `AmbiguousSelection`. The
//!   resolver never guesses.
//! * A selector: the literal path, then `input/<selector>`, then
//!   `input/<basename>`. First existing file wins, so callers can pass a bare
//!   name or a path copied from an earlier response.
//!
//! When confined to a root (the HTTP layer confines to the session base),
//! relative literal paths are taken relative to that root and any candidate
//! that canonicalizes outside it is treated as absent.

use crate::error::{Result, WorkbenchError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How many candidate names an ambiguity error lists before summarising.
const MAX_LISTED: usize = 10;

#[derive(Debug, Clone)]
pub struct PathResolver {
    input: PathBuf,
    confine: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            confine: None,
        }
    }

    /// Only accept files under `root`; relative literals are joined to it.
    pub fn confined_to(mut self, root: impl Into<PathBuf>) -> Self {
        self.confine = Some(root.into());
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    pub fn resolve(&self, selector: Option<&str>) -> Result<PathBuf> {
        match selector.filter(|s| !s.trim().is_empty()) {
            None => self.pick_single(),
            Some(sel) => self.resolve_named(sel),
        }
    }

    fn pick_single(&self) -> Result<PathBuf> {
        let mut pdfs = list_pdfs(&self.input)?;
        match pdfs.len() {
            0 => Err(WorkbenchError::not_found(
                "input PDF",
                format!(
                    "no PDFs in {}; ingest or upload one first",
                    self.input.display()
                ),
            )),
            1 => Ok(pdfs.remove(0)),
            n => {
                let names: Vec<String> = pdfs
                    .iter()
                    .take(MAX_LISTED)
                    .map(|p| display_name(p))
                    .collect();
                let mut listing = names.join(", ");
                if n > MAX_LISTED {
                    listing.push_str(&format!(" (+{} more)", n - MAX_LISTED));
                }
                Err(WorkbenchError::AmbiguousSelection {
                    dir: self.input.clone(),
                    listing,
                })
            }
        }
    }

    fn resolve_named(&self, sel: &str) -> Result<PathBuf> {
        let literal = Path::new(sel);
        let literal = match &self.confine {
            Some(root) if literal.is_relative() => root.join(literal),
            _ => literal.to_path_buf(),
        };

        let mut candidates = vec![literal, self.input.join(sel)];
        if let Some(base) = Path::new(sel).file_name() {
            candidates.push(self.input.join(base));
        }
        candidates.dedup();

        for candidate in &candidates {
            if candidate.is_file() && self.is_allowed(candidate) {
                debug!(selector = sel, path = %candidate.display(), "Resolved input");
                return Ok(candidate.clone());
            }
        }

        let tried: Vec<String> = candidates
            .iter()
            .map(|c| format!("'{}'", c.display()))
            .collect();
        Err(WorkbenchError::not_found(
            "input PDF",
            format!("'{sel}' (tried {})", tried.join(", ")),
        ))
    }

    fn is_allowed(&self, candidate: &Path) -> bool {
        let Some(root) = &self.confine else {
            return true;
        };
        match (root.canonicalize(), candidate.canonicalize()) {
            (Ok(root), Ok(candidate)) => candidate.starts_with(root),
            _ => false,
        }
    }
}

/// `*.pdf` files directly under `dir`, sorted by name. A missing directory
/// has no PDFs.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WorkbenchError::io(dir, e)),
    };

    let mut pdfs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| WorkbenchError::io(dir, e))?.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
